//! Drive a [`Lexer`] over whole or chunked input.

use std::io;

use lexer::{DEFAULT_MAX_SETASIDE, ErrorLocation, GrammarKind, Lexer, LexerStats, MinifyRules, OutputStream};

use crate::chunker::ChunkPlan;

#[derive(Clone, Copy, Debug)]
pub struct RunConfig {
    pub kind: GrammarKind,
    pub rules: MinifyRules,
    pub max_setaside: usize,
}

impl RunConfig {
    pub fn new(kind: GrammarKind, rules: MinifyRules) -> Self {
        Self {
            kind,
            rules,
            max_setaside: DEFAULT_MAX_SETASIDE,
        }
    }

    pub fn with_max_setaside(mut self, max_setaside: usize) -> Self {
        self.max_setaside = max_setaside;
        self
    }
}

#[derive(Clone, Debug)]
pub struct RunOutput {
    pub bytes: Vec<u8>,
    pub failsafe: bool,
    /// First failsafe location reported by any `scan` call.
    pub error: Option<ErrorLocation>,
    pub overflowed: bool,
    pub stats: LexerStats,
}

pub fn run_whole(config: RunConfig, input: &[u8]) -> RunOutput {
    run_chunks(config, &[input])
}

/// Feed the chunks of `plan`, then an empty final `scan` with `is_eof`.
pub fn run_chunked(config: RunConfig, input: &[u8], plan: &ChunkPlan) -> RunOutput {
    let mut chunks = plan.chunks(input);
    chunks.push(&[]);
    run_chunks(config, &chunks)
}

/// Feed `chunks` in order; the last one is flagged `is_eof`.
pub fn run_chunks(config: RunConfig, chunks: &[&[u8]]) -> RunOutput {
    let mut out = Vec::new();
    let mut lexer = Lexer::with_heap(config.kind, &mut out);
    lexer.set_minify_rules(config.rules);
    lexer.set_max_setaside(config.max_setaside);

    let mut error = None;
    let mut overflowed = false;
    let last = chunks.len().saturating_sub(1);
    for (idx, chunk) in chunks.iter().enumerate() {
        let consumed = lexer
            .scan(chunk, idx == last)
            .unwrap_or_else(|err| panic!("scan failed on chunk {idx}: {err}"));
        assert_eq!(consumed, chunk.len(), "scan must consume every byte");
        if error.is_none() {
            error = lexer.error();
        }
        overflowed |= lexer.setaside_overflowed();
    }
    if chunks.is_empty() {
        lexer
            .scan(&[], true)
            .unwrap_or_else(|err| panic!("scan failed: {err}"));
    }
    let failsafe = lexer.is_failsafe();
    let stats = lexer.stats();
    drop(lexer);
    RunOutput {
        bytes: out,
        failsafe,
        error,
        overflowed,
        stats,
    }
}

/// Output stream that accepts at most `budget` bytes in total, then starts
/// short-writing.
#[derive(Debug, Default)]
pub struct LimitedStream {
    pub written: Vec<u8>,
    budget: usize,
}

impl LimitedStream {
    pub fn new(budget: usize) -> Self {
        Self {
            written: Vec::new(),
            budget,
        }
    }
}

impl OutputStream for LimitedStream {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let take = bytes.len().min(self.budget);
        self.written.extend_from_slice(&bytes[..take]);
        self.budget -= take;
        Ok(take)
    }
}

/// Output stream whose every write fails.
#[derive(Debug, Default)]
pub struct FailingStream;

impl OutputStream for FailingStream {
    fn write(&mut self, _bytes: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
    }
}
