//! Tag records collected while scanning and the minimal-spacing rewrite.

use tools::array::ScratchArray;

use crate::error::LexError;
use crate::stream::Sink;
use crate::token::{HtmlToken, Token};

const TAG_NAME_HEAD: usize = 16;

/// Where a span starts. Spans are recorded against the document while the
/// tag streams in (it may straddle `scan` calls) and resolved against the
/// finished tag token before use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SpanStart {
    Document(u64),
    Token(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Span {
    pub(crate) start: SpanStart,
    pub(crate) len: usize,
}

impl Default for Span {
    fn default() -> Self {
        Self::at(0)
    }
}

impl Span {
    pub(crate) fn at(offset: u64) -> Self {
        Self {
            start: SpanStart::Document(offset),
            len: 0,
        }
    }

    fn resolve(&mut self, token: &Token<'_>) -> bool {
        let SpanStart::Document(offset) = self.start else {
            return true;
        };
        let Some(rel) = offset
            .checked_sub(token.offset)
            .and_then(|rel| usize::try_from(rel).ok())
        else {
            return false;
        };
        if rel.saturating_add(self.len) > token.bytes.len() {
            return false;
        }
        self.start = SpanStart::Token(rel);
        true
    }

    fn slice<'t>(&self, bytes: &'t [u8]) -> &'t [u8] {
        match self.start {
            SpanStart::Token(at) => bytes.get(at..at + self.len).unwrap_or(&[]),
            SpanStart::Document(_) => &[],
        }
    }
}

/// One `key[=value]` pair.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Attribute {
    pub(crate) key: Span,
    pub(crate) value: Option<Span>,
    /// `0` for an unquoted value.
    pub(crate) quote: u8,
}

#[derive(Debug, Default)]
pub(crate) struct TagInfo {
    name: Span,
    lower: [u8; TAG_NAME_HEAD],
    leading_slash: bool,
    trailing_slash: bool,
    attrs: ScratchArray<Attribute>,
    resolved: bool,
}

impl TagInfo {
    /// Start a new tag whose name begins at document offset `name_offset`.
    /// Attribute storage is reused.
    pub(crate) fn begin(&mut self, name_offset: u64, leading_slash: bool) {
        self.name = Span::at(name_offset);
        self.leading_slash = leading_slash;
        self.trailing_slash = false;
        self.attrs.clear();
        self.resolved = false;
    }

    pub(crate) fn push_name(&mut self, b: u8) {
        if self.name.len < TAG_NAME_HEAD {
            self.lower[self.name.len] = b.to_ascii_lowercase();
        }
        self.name.len += 1;
    }

    pub(crate) fn name_is(&self, name: &[u8]) -> bool {
        self.name.len == name.len() && &self.lower[..name.len()] == name
    }

    pub(crate) fn is_end_tag(&self) -> bool {
        self.leading_slash
    }

    pub(crate) fn is_self_closing(&self) -> bool {
        self.trailing_slash
    }

    pub(crate) fn set_self_closing(&mut self) {
        self.trailing_slash = true;
    }

    /// A `/` seen before this attribute was not the closing marker.
    pub(crate) fn start_attr(&mut self, key_offset: u64) -> Result<(), LexError> {
        self.trailing_slash = false;
        let attr = self.attrs.push()?;
        attr.key = Span::at(key_offset);
        attr.key.len = 1;
        Ok(())
    }

    pub(crate) fn extend_key(&mut self, by: usize) {
        if let Some(attr) = self.attrs.last_mut() {
            attr.key.len += by;
        }
    }

    pub(crate) fn start_value(&mut self, value_offset: u64, quote: u8) {
        if let Some(attr) = self.attrs.last_mut() {
            attr.value = Some(Span::at(value_offset));
            attr.quote = quote;
        }
    }

    pub(crate) fn extend_value(&mut self, by: usize) {
        if let Some(value) = self.attrs.last_mut().and_then(|attr| attr.value.as_mut()) {
            value.len += by;
        }
    }

    pub(crate) fn attrs(&self) -> &ScratchArray<Attribute> {
        &self.attrs
    }

    pub(crate) fn kind(&self) -> HtmlToken {
        if self.leading_slash {
            return HtmlToken::Tag;
        }
        if self.name_is(b"a") {
            HtmlToken::AnchorOpen
        } else if self.name_is(b"img") {
            HtmlToken::ImgOpen
        } else if self.name_is(b"link") {
            HtmlToken::LinkOpen
        } else if self.name_is(b"script") {
            HtmlToken::ScriptOpen
        } else {
            HtmlToken::Tag
        }
    }

    /// Rebase every span onto the finished tag token. Runs once per tag.
    fn resolve(&mut self, token: &Token<'_>) -> bool {
        if self.resolved {
            return true;
        }
        if !self.name.resolve(token) {
            return false;
        }
        let mut idx = 0;
        while let Some(attr) = self.attrs.get_mut(idx) {
            if !attr.key.resolve(token) {
                return false;
            }
            if let Some(value) = attr.value.as_mut()
                && !value.resolve(token)
            {
                return false;
            }
            idx += 1;
        }
        self.resolved = true;
        true
    }
}

/// Write `token` rebuilt from its attributes with single spaces.
///
/// Falls back to the original bytes if the recorded spans do not line up with
/// the token.
pub(crate) fn write_minimal(
    sink: &mut Sink<'_>,
    token: &Token<'_>,
    tag: &mut TagInfo,
) -> Result<(), LexError> {
    if !tag.resolve(token) {
        log::debug!(
            target: "lexer.html",
            "tag at offset {} did not resolve; writing verbatim",
            token.offset
        );
        return sink.write(token.bytes);
    }
    let bytes = token.bytes;
    sink.write(if tag.leading_slash { b"</" } else { b"<" })?;
    sink.write(tag.name.slice(bytes))?;
    let mut unquoted_last = false;
    for attr in &tag.attrs {
        sink.write(b" ")?;
        sink.write(attr.key.slice(bytes))?;
        unquoted_last = false;
        if let Some(value) = attr.value {
            sink.write(b"=")?;
            if attr.quote == 0 {
                sink.write(value.slice(bytes))?;
                unquoted_last = true;
            } else {
                let quote = [attr.quote];
                sink.write(&quote)?;
                sink.write(value.slice(bytes))?;
                sink.write(&quote)?;
            }
        }
    }
    if tag.trailing_slash {
        // `<a href=x/>` would read the slash as part of the value.
        if unquoted_last {
            sink.write(b" ")?;
        }
        sink.write(b"/")?;
    }
    sink.write(b">")
}

#[cfg(test)]
mod tests {
    use super::{Span, SpanStart, TagInfo};
    use crate::token::{HtmlToken, Token, TokenKind};

    #[test]
    fn spans_resolve_relative_to_the_token() {
        let token = Token::new(TokenKind::Html(HtmlToken::Tag), b"<p a=b>", 100);
        let mut span = Span::at(103);
        span.len = 1;
        assert!(span.resolve(&token));
        assert_eq!(span.start, SpanStart::Token(3));
        assert_eq!(span.slice(token.bytes), b"a");
    }

    #[test]
    fn spans_outside_the_token_do_not_resolve() {
        let token = Token::new(TokenKind::Html(HtmlToken::Tag), b"<p>", 100);
        let mut before = Span::at(99);
        assert!(!before.resolve(&token));
        let mut past = Span::at(101);
        past.len = 5;
        assert!(!past.resolve(&token));
    }

    #[test]
    fn tag_kind_depends_on_name_and_slash() {
        let mut tag = TagInfo::default();
        tag.begin(1, false);
        for &b in b"IMG" {
            tag.push_name(b);
        }
        assert_eq!(tag.kind(), HtmlToken::ImgOpen);

        tag.begin(2, true);
        tag.push_name(b'a');
        assert_eq!(tag.kind(), HtmlToken::Tag);
        assert!(tag.is_end_tag());
    }

    #[test]
    fn slash_before_an_attribute_is_not_self_closing() {
        let mut tag = TagInfo::default();
        tag.begin(1, false);
        tag.set_self_closing();
        tag.start_attr(4).unwrap();
        assert!(!tag.is_self_closing());
        tag.set_self_closing();
        assert!(tag.is_self_closing());
    }

    #[test]
    fn begin_resets_attributes() {
        let mut tag = TagInfo::default();
        tag.begin(1, false);
        tag.start_attr(3).unwrap();
        tag.start_attr(5).unwrap();
        assert_eq!(tag.attrs().len(), 2);
        tag.begin(10, false);
        assert!(tag.attrs().is_empty());
    }
}
