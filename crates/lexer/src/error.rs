use std::collections::TryReserveError;
use std::io;

use thiserror::Error;

/// A pool could not provide the requested storage.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("pool allocation of {size} bytes failed")]
pub struct AllocError {
    pub size: usize,
}

/// Hard failures that end processing of the current document.
///
/// Grammar-level problems are never reported here: they switch the lexer into
/// failsafe passthrough and are visible through [`crate::Lexer::error`].
#[derive(Debug, Error)]
pub enum LexError {
    #[error("output stream rejected write: {0}")]
    Output(#[from] io::Error),
    #[error("output stream accepted {written} of {len} bytes")]
    ShortWrite { written: usize, len: usize },
    #[error(transparent)]
    Alloc(#[from] AllocError),
    #[error("scratch storage could not grow: {0}")]
    Reserve(#[from] TryReserveError),
}

/// Where the most recent `scan` call gave up on the grammar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ErrorLocation {
    /// Index into the buffer passed to that `scan` call.
    pub buffer_index: usize,
    /// Byte offset from the start of the document.
    pub document_offset: u64,
}
