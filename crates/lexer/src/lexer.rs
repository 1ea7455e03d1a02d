use std::time::{Duration, Instant};

use crate::config::{CdnifyRule, DEFAULT_MAX_SETASIDE, LexerConfig, MinifyRules};
use crate::content_type::GrammarKind;
use crate::error::{ErrorLocation, LexError};
use crate::grammar::GrammarState;
use crate::pool::{HeapPool, Pool};
use crate::scan::{ScanContext, Scanned};
use crate::setaside::SetAside;
use crate::stats::LexerStats;
use crate::stream::{OutputStream, Sink};

/// Streaming minifier for one document.
///
/// Feed the document in order through [`Lexer::scan`], flagging the last call
/// with `is_eof`. Output is written to `W` as tokens complete; at most
/// `max_setaside` bytes of an unfinished token are held between calls.
///
/// Once the grammar meets input it cannot classify, the lexer switches to
/// failsafe mode and copies everything after that point verbatim.
#[derive(Debug)]
pub struct Lexer<W: OutputStream, P: Pool = HeapPool> {
    kind: GrammarKind,
    grammar: GrammarState,
    pool: P,
    out: W,
    rules: MinifyRules,
    cdnify: Vec<CdnifyRule>,
    setaside: SetAside,
    failsafe: bool,
    error: Option<ErrorLocation>,
    setaside_overflow: bool,
    bytes_in: u64,
    bytes_out: u64,
    elapsed: Duration,
    stats: LexerStats,
}

impl<W: OutputStream> Lexer<W, HeapPool> {
    /// Lexer backed by the heap pool.
    pub fn with_heap(kind: GrammarKind, out: W) -> Self {
        Self::new(kind, HeapPool, out)
    }
}

impl<W: OutputStream, P: Pool> Lexer<W, P> {
    pub fn new(kind: GrammarKind, pool: P, out: W) -> Self {
        log::debug!(target: "lexer.core", "creating {kind} lexer");
        Self {
            kind,
            grammar: GrammarState::new(kind),
            pool,
            out,
            rules: MinifyRules::default(),
            cdnify: Vec::new(),
            setaside: SetAside::new(DEFAULT_MAX_SETASIDE),
            failsafe: false,
            error: None,
            setaside_overflow: false,
            bytes_in: 0,
            bytes_out: 0,
            elapsed: Duration::ZERO,
            stats: LexerStats::default(),
        }
    }

    /// Lexer for a MIME type, or `None` when no grammar handles it and the
    /// content should pass through untouched.
    pub fn for_content_type(content_type: &str, pool: P, out: W) -> Option<Self> {
        GrammarKind::from_content_type(content_type).map(|kind| Self::new(kind, pool, out))
    }

    pub fn with_config(mut self, config: LexerConfig) -> Self {
        self.set_minify_rules(config.rules);
        self.set_max_setaside(config.max_setaside);
        self.cdnify = config.cdnify;
        self
    }

    pub fn grammar(&self) -> GrammarKind {
        self.kind
    }

    pub fn minify_rules(&self) -> MinifyRules {
        self.rules
    }

    pub fn set_minify_rules(&mut self, rules: MinifyRules) {
        self.rules = rules;
    }

    pub fn max_setaside(&self) -> usize {
        self.setaside.max()
    }

    /// Change the set-aside limit. Takes effect deterministically only before
    /// the first `scan`.
    pub fn set_max_setaside(&mut self, max: usize) {
        self.setaside.set_max(max, &self.pool);
    }

    /// Register a link rewriting rule. Rules keep insertion order.
    pub fn add_cdnify_rule(&mut self, prefix: impl Into<String>, replacement: Option<String>) {
        self.cdnify.push(CdnifyRule {
            prefix: prefix.into(),
            replacement,
        });
    }

    pub fn cdnify_rules(&self) -> &[CdnifyRule] {
        &self.cdnify
    }

    /// Scan the next buffer of the document.
    ///
    /// Returns the number of bytes consumed, which is always `data.len()`:
    /// bytes of an unfinished token are held in the set-aside and count as
    /// consumed. An `Err` means the output stream or pool failed; the document
    /// should be abandoned.
    pub fn scan(&mut self, data: &[u8], is_eof: bool) -> Result<usize, LexError> {
        let started = Instant::now();
        self.error = None;
        self.setaside_overflow = false;
        let result = self.scan_inner(data, is_eof);
        self.elapsed += started.elapsed();
        let consumed = result?;
        self.bytes_in = self.bytes_in.saturating_add(consumed as u64);
        Ok(consumed)
    }

    fn scan_inner(&mut self, data: &[u8], is_eof: bool) -> Result<usize, LexError> {
        let start_offset = self.bytes_in;
        let sink = Sink::new(&mut self.out, &mut self.bytes_out, self.rules);
        let mut ctx = ScanContext::new(
            sink,
            &mut self.setaside,
            &self.pool,
            &mut self.stats,
            start_offset,
        );
        let grammar = self.grammar.as_grammar();

        if self.failsafe {
            ctx.spill(data, grammar.transform())?;
            return Ok(data.len());
        }

        match grammar.tokenize(&mut ctx, data, is_eof)? {
            Scanned::Complete => {
                if is_eof {
                    ctx.spill(data, grammar.transform())?;
                } else {
                    self.setaside_overflow = ctx.carry_leftover(data, grammar.transform())?;
                }
            }
            Scanned::Malformed { at } => {
                let location = ErrorLocation {
                    buffer_index: at,
                    document_offset: start_offset + at as u64,
                };
                log::warn!(
                    target: "lexer.core",
                    "unparseable {} input at offset {}; entering failsafe mode",
                    self.kind,
                    location.document_offset
                );
                ctx.spill(data, grammar.transform())?;
                self.failsafe = true;
                self.error = Some(location);
                self.stats.failsafe_entries = self.stats.failsafe_entries.saturating_add(1);
            }
        }
        Ok(data.len())
    }

    /// Where the last `scan` call entered failsafe mode, if it did.
    pub fn error(&self) -> Option<ErrorLocation> {
        self.error
    }

    pub fn is_failsafe(&self) -> bool {
        self.failsafe
    }

    /// Whether the last `scan` call had to flush a partial token that did not
    /// fit the set-aside.
    pub fn setaside_overflowed(&self) -> bool {
        self.setaside_overflow
    }

    pub fn bytes_in(&self) -> u64 {
        self.bytes_in
    }

    pub fn bytes_out(&self) -> u64 {
        self.bytes_out
    }

    /// Wall-clock time spent inside `scan`, summed over all calls.
    pub fn processing_time(&self) -> Duration {
        self.elapsed
    }

    pub fn stats(&self) -> LexerStats {
        self.stats
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn output_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }
}

impl<W: OutputStream, P: Pool> Drop for Lexer<W, P> {
    fn drop(&mut self) {
        if let Some(buf) = self.setaside.take_buffer() {
            if !buf.is_empty() {
                log::debug!(
                    target: "lexer.core",
                    "dropping {} unflushed set-aside bytes",
                    buf.len()
                );
            }
            self.pool.release(buf);
        }
    }
}

/// Convenience: minify a complete document in one call.
pub fn minify(kind: GrammarKind, rules: MinifyRules, input: &[u8]) -> Result<Vec<u8>, LexError> {
    let mut out = Vec::with_capacity(input.len());
    let mut lexer = Lexer::with_heap(kind, &mut out);
    lexer.set_minify_rules(rules);
    lexer.scan(input, true)?;
    drop(lexer);
    Ok(out)
}
