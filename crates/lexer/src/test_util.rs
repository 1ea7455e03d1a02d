//! Drives a single scanner over one buffer and records what it emits.

use crate::config::{DEFAULT_MAX_SETASIDE, MinifyRules};
use crate::error::LexError;
use crate::pool::HeapPool;
use crate::scan::{ScanContext, Step, Transform};
use crate::setaside::SetAside;
use crate::stats::LexerStats;
use crate::stream::Sink;
use crate::token::{Token, TokenKind};

struct Recorder<'a> {
    tokens: &'a mut Vec<(TokenKind, Vec<u8>)>,
}

impl Transform for Recorder<'_> {
    fn apply(&mut self, _sink: &mut Sink<'_>, token: &Token<'_>) -> Result<(), LexError> {
        self.tokens.push((token.kind, token.bytes.to_vec()));
        Ok(())
    }
}

pub(crate) fn collect_tokens(
    data: &[u8],
    tokens: &mut Vec<(TokenKind, Vec<u8>)>,
    mut step: impl FnMut(&mut ScanContext<'_>, &[u8], usize, &mut dyn Transform) -> Result<Step, LexError>,
) {
    let mut setaside = SetAside::new(DEFAULT_MAX_SETASIDE);
    let mut stats = LexerStats::default();
    let mut out = Vec::new();
    let mut bytes_out = 0;
    let mut recorder = Recorder { tokens };
    let sink = Sink::new(&mut out, &mut bytes_out, MinifyRules::NONE);
    let mut ctx = ScanContext::new(sink, &mut setaside, &HeapPool, &mut stats, 0);
    let mut i = 0;
    while i < data.len() {
        match step(&mut ctx, data, i, &mut recorder).unwrap() {
            Step::Advance(n) => i += n,
            Step::Retry => {}
            Step::Malformed => panic!("malformed input at {i}"),
        }
    }
}
