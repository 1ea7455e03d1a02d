//! Token classification shared by all grammars.
//!
//! Determinism contract: for a given document the sequence of tokens (kind,
//! bytes, offset) handed to a transform is the same no matter how the document
//! was split into `scan` calls, as long as no token is longer than the
//! set-aside limit.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// Unclassified bytes; always written verbatim. Failsafe passthrough and
    /// degraded set-aside flushes use this kind too.
    Misc,
    Css(CssToken),
    Html(HtmlToken),
    Js(JsToken),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CssToken {
    Comment,
    OptionalSpace,
    RequiredSpace,
    Url,
    Selector,
    Term,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HtmlToken {
    Comment { conditional: bool },
    Space { newline: bool },
    Tag,
    AnchorOpen,
    ImgOpen,
    LinkOpen,
    ScriptOpen,
}

impl HtmlToken {
    pub fn is_tag(self) -> bool {
        matches!(
            self,
            HtmlToken::Tag
                | HtmlToken::AnchorOpen
                | HtmlToken::ImgOpen
                | HtmlToken::LinkOpen
                | HtmlToken::ScriptOpen
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JsToken {
    Space,
    Newline,
    BlockComment,
    LineComment,
}

/// One classified span. Borrowed from either the caller's buffer or the
/// set-aside, so it only lives for one transform call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub bytes: &'a [u8],
    /// Offset of `bytes[0]` from the start of the document.
    pub offset: u64,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind, bytes: &'a [u8], offset: u64) -> Self {
        Self {
            kind,
            bytes,
            offset,
        }
    }

    pub fn end_offset(&self) -> u64 {
        self.offset + self.bytes.len() as u64
    }
}
