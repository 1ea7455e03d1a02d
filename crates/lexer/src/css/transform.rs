use crate::error::LexError;
use crate::scan::Transform;
use crate::stream::Sink;
use crate::token::{CssToken, Token, TokenKind};

/// Drops optional whitespace and comments. Everything else, required
/// whitespace included, is written as is.
#[derive(Debug, Default)]
pub(crate) struct CssTransform;

impl Transform for CssTransform {
    fn apply(&mut self, sink: &mut Sink<'_>, token: &Token<'_>) -> Result<(), LexError> {
        let rules = sink.rules();
        match token.kind {
            TokenKind::Css(CssToken::OptionalSpace) if rules.remove_space => Ok(()),
            TokenKind::Css(CssToken::Comment) if rules.remove_comments => Ok(()),
            _ => sink.write(token.bytes),
        }
    }
}
