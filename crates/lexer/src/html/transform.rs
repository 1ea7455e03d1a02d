use crate::error::LexError;
use crate::scan::Transform;
use crate::stream::Sink;
use crate::token::{CssToken, HtmlToken, Token, TokenKind};

use super::tag::{TagInfo, write_minimal};

/// Output rules for HTML and the CSS embedded in `<style>`.
#[derive(Debug, Default)]
pub(crate) struct HtmlTransform {
    /// Kind of the last token written.
    last: Option<TokenKind>,
    /// Open `<pre>`/`<textarea>` elements; whitespace inside is kept.
    preformatted: u32,
}

impl HtmlTransform {
    fn apply_with_tag(
        &mut self,
        sink: &mut Sink<'_>,
        token: &Token<'_>,
        tag: Option<&mut TagInfo>,
    ) -> Result<(), LexError> {
        let rules = sink.rules();
        match token.kind {
            TokenKind::Html(HtmlToken::Space { newline })
                if rules.remove_space && self.preformatted == 0 =>
            {
                sink.write(if newline { b"\n" } else { b" " })?;
            }
            TokenKind::Html(HtmlToken::Comment { conditional: false }) if rules.remove_comments => {
                sink.write(b" ")?;
            }
            TokenKind::Css(CssToken::Comment) if rules.remove_comments => return Ok(()),
            TokenKind::Css(CssToken::OptionalSpace) if rules.remove_space => return Ok(()),
            TokenKind::Css(CssToken::Selector | CssToken::Term)
                if rules.remove_space && self.last == Some(token.kind) =>
            {
                // The whitespace dropped between them was needed.
                sink.write(b" ")?;
                sink.write(token.bytes)?;
            }
            TokenKind::Html(kind) if kind.is_tag() && rules.remove_space => match tag {
                Some(tag) => write_minimal(sink, token, tag)?,
                None => sink.write(token.bytes)?,
            },
            _ => sink.write(token.bytes)?,
        }
        self.last = Some(token.kind);
        Ok(())
    }

    /// Track `<pre>`/`<textarea>` nesting after `tag` was written.
    pub(crate) fn note_tag(&mut self, tag: &TagInfo) {
        if !(tag.name_is(b"pre") || tag.name_is(b"textarea")) {
            return;
        }
        if tag.is_end_tag() {
            self.preformatted = self.preformatted.saturating_sub(1);
        } else if !tag.is_self_closing() {
            self.preformatted = self.preformatted.saturating_add(1);
        }
    }
}

impl Transform for HtmlTransform {
    fn apply(&mut self, sink: &mut Sink<'_>, token: &Token<'_>) -> Result<(), LexError> {
        self.apply_with_tag(sink, token, None)
    }
}

/// Applies [`HtmlTransform`] to a tag token with its attribute record.
pub(crate) struct TagTransform<'a> {
    pub(crate) html: &'a mut HtmlTransform,
    pub(crate) tag: &'a mut TagInfo,
}

impl Transform for TagTransform<'_> {
    fn apply(&mut self, sink: &mut Sink<'_>, token: &Token<'_>) -> Result<(), LexError> {
        self.html.apply_with_tag(sink, token, Some(&mut *self.tag))
    }
}
