//! Streaming HTML, CSS and JavaScript minifier.
//!
//! A [`Lexer`] is created per document and fed arbitrary slices of it in
//! order. Each grammar is a resumable byte-level state machine; tokens that
//! straddle a slice boundary are carried in a bounded set-aside buffer, so
//! memory use does not grow with the document and the output does not depend
//! on how the input was split.

mod config;
mod content_type;
mod css;
mod error;
mod grammar;
mod html;
mod js;
mod lexer;
mod pool;
mod scan;
mod setaside;
mod stats;
mod stream;
#[cfg(test)]
mod test_util;
mod token;

pub use crate::config::{CdnifyRule, DEFAULT_MAX_SETASIDE, LexerConfig, MinifyRules};
pub use crate::content_type::GrammarKind;
pub use crate::error::{AllocError, ErrorLocation, LexError};
pub use crate::lexer::{Lexer, minify};
pub use crate::pool::{HeapPool, Pool, TrackingPool};
pub use crate::stats::LexerStats;
pub use crate::stream::{IoOutputStream, OutputStream};
pub use crate::token::{CssToken, HtmlToken, JsToken, Token, TokenKind};
