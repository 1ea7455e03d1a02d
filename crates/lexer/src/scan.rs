//! Per-call scanning context shared by the grammar state machines.
//!
//! Scanners work on indices into the buffer of the current `scan` call. A
//! token is pending from `token_start` (or from the set-aside, if it began in an
//! earlier call) until the scanner calls [`ScanContext::end_token`].

use crate::error::LexError;
use crate::pool::Pool;
use crate::setaside::SetAside;
use crate::stats::LexerStats;
use crate::stream::Sink;
use crate::token::{Token, TokenKind};

/// Decides what to write for each completed token.
pub(crate) trait Transform {
    fn apply(&mut self, sink: &mut Sink<'_>, token: &Token<'_>) -> Result<(), LexError>;
}

/// Outcome of feeding one byte position to a scanner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Step {
    /// The byte (and possibly a run after it) was consumed.
    Advance(usize),
    /// State changed without consuming; feed the same byte again.
    Retry,
    /// The byte cannot be classified.
    Malformed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Scanned {
    Complete,
    Malformed { at: usize },
}

pub(crate) struct ScanContext<'a> {
    sink: Sink<'a>,
    setaside: &'a mut SetAside,
    pool: &'a dyn Pool,
    stats: &'a mut LexerStats,
    /// Document offset of the first byte of this call's buffer.
    start_offset: u64,
    token_start: usize,
}

impl<'a> ScanContext<'a> {
    pub(crate) fn new(
        sink: Sink<'a>,
        setaside: &'a mut SetAside,
        pool: &'a dyn Pool,
        stats: &'a mut LexerStats,
        start_offset: u64,
    ) -> Self {
        Self {
            sink,
            setaside,
            pool,
            stats,
            start_offset,
            token_start: 0,
        }
    }

    pub(crate) fn doc_offset(&self, index: usize) -> u64 {
        self.start_offset + index as u64
    }

    pub(crate) fn token_start(&self) -> usize {
        self.token_start
    }

    /// Document offset of the first byte of the pending token.
    pub(crate) fn token_offset(&self) -> u64 {
        if self.setaside.is_empty() {
            self.doc_offset(self.token_start)
        } else {
            self.setaside.offset()
        }
    }

    /// Complete the pending token at `end` (exclusive) and hand it to
    /// `transform`.
    ///
    /// A token that began in an earlier call is rebuilt from the set-aside
    /// when the whole thing fits; otherwise both halves go out as misc.
    pub(crate) fn end_token(
        &mut self,
        data: &[u8],
        end: usize,
        kind: TokenKind,
        transform: &mut dyn Transform,
    ) -> Result<(), LexError> {
        let start = self.token_start;
        let piece = &data[start..end];
        let piece_offset = self.doc_offset(start);
        self.token_start = end;

        if self.setaside.take_degraded() {
            return emit(
                &mut self.sink,
                self.stats,
                transform,
                Token::new(TokenKind::Misc, piece, piece_offset),
            );
        }
        if self.setaside.is_empty() {
            return emit(
                &mut self.sink,
                self.stats,
                transform,
                Token::new(kind, piece, piece_offset),
            );
        }

        if self.setaside.fits(piece.len()) {
            self.setaside.store(self.pool, piece_offset, piece)?;
            self.note_setaside_len();
            let token = Token::new(kind, self.setaside.bytes(), self.setaside.offset());
            emit(&mut self.sink, self.stats, transform, token)?;
        } else {
            self.stats.setaside_overflows = self.stats.setaside_overflows.saturating_add(1);
            log::debug!(
                target: "lexer.core",
                "token at offset {} exceeds set-aside limit {}; flushing as misc",
                self.setaside.offset(),
                self.setaside.limit()
            );
            let held = Token::new(TokenKind::Misc, self.setaside.bytes(), self.setaside.offset());
            emit(&mut self.sink, self.stats, transform, held)?;
            emit(
                &mut self.sink,
                self.stats,
                transform,
                Token::new(TokenKind::Misc, piece, piece_offset),
            )?;
        }
        self.setaside.clear();
        Ok(())
    }

    /// Carry the unfinished token at the end of the buffer into the next call.
    ///
    /// Returns `true` when the token did not fit and was flushed as misc
    /// instead. Tokenizing carries on; the rest of that token is flushed as
    /// misc too.
    pub(crate) fn carry_leftover(
        &mut self,
        data: &[u8],
        transform: &mut dyn Transform,
    ) -> Result<bool, LexError> {
        let start = self.token_start;
        let rest = &data[start..];
        let rest_offset = self.doc_offset(start);
        self.token_start = data.len();
        if rest.is_empty() {
            return Ok(false);
        }

        if self.setaside.is_degraded() {
            emit(
                &mut self.sink,
                self.stats,
                transform,
                Token::new(TokenKind::Misc, rest, rest_offset),
            )?;
            return Ok(false);
        }

        if self.setaside.fits(rest.len()) {
            self.setaside.store(self.pool, rest_offset, rest)?;
            self.note_setaside_len();
            return Ok(false);
        }

        self.stats.setaside_overflows = self.stats.setaside_overflows.saturating_add(1);
        log::debug!(
            target: "lexer.core",
            "partial token at offset {} exceeds set-aside limit {}; flushing as misc",
            self.token_offset(),
            self.setaside.limit()
        );
        let held = Token::new(TokenKind::Misc, self.setaside.bytes(), self.setaside.offset());
        emit(&mut self.sink, self.stats, transform, held)?;
        self.setaside.clear();
        emit(
            &mut self.sink,
            self.stats,
            transform,
            Token::new(TokenKind::Misc, rest, rest_offset),
        )?;
        self.setaside.set_degraded();
        Ok(true)
    }

    /// Flush everything not yet emitted (held bytes, then the rest of the
    /// buffer) as misc.
    pub(crate) fn spill(
        &mut self,
        data: &[u8],
        transform: &mut dyn Transform,
    ) -> Result<(), LexError> {
        let held = Token::new(TokenKind::Misc, self.setaside.bytes(), self.setaside.offset());
        emit(&mut self.sink, self.stats, transform, held)?;
        self.setaside.clear();
        self.setaside.take_degraded();

        let start = self.token_start;
        self.token_start = data.len();
        let offset = self.doc_offset(start);
        emit(
            &mut self.sink,
            self.stats,
            transform,
            Token::new(TokenKind::Misc, &data[start..], offset),
        )
    }

    fn note_setaside_len(&mut self) {
        let len = self.setaside.len();
        if len > self.stats.setaside_peak {
            self.stats.setaside_peak = len;
        }
    }
}

fn emit(
    sink: &mut Sink<'_>,
    stats: &mut LexerStats,
    transform: &mut dyn Transform,
    token: Token<'_>,
) -> Result<(), LexError> {
    if token.bytes.is_empty() {
        return Ok(());
    }
    stats.tokens_emitted = stats.tokens_emitted.saturating_add(1);
    #[cfg(any(test, feature = "debug-stats"))]
    log::trace!(
        target: "lexer.core",
        "emit {:?} offset={} len={}",
        token.kind,
        token.offset,
        token.bytes.len()
    );
    transform.apply(sink, &token)
}
