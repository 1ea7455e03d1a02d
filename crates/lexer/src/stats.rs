//! Counters for instrumentation.

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LexerStats {
    /// Tokens handed to the transform, including failsafe passthrough.
    pub tokens_emitted: u64,
    /// Tokens that outgrew the set-aside and were flushed as misc.
    pub setaside_overflows: u64,
    pub failsafe_entries: u64,
    /// Largest number of bytes held in the set-aside at once.
    pub setaside_peak: usize,
}
