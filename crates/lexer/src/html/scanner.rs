//! Resumable HTML tokenizer.
//!
//! Splits markup into whitespace runs, text, tags, comments and declarations.
//! `<script>` content is passed through line by line; `<style>` content is
//! handed to the embedded CSS scanner until `</style`.

use memchr::{memchr, memchr2};

use crate::css::{CssScanner, is_space};
use crate::error::LexError;
use crate::scan::{ScanContext, Step};
use crate::token::{HtmlToken, TokenKind};

use super::tag::TagInfo;
use super::transform::{HtmlTransform, TagTransform};

const CLOSE_SCRIPT: &[u8] = b"</script";
const CLOSE_STYLE: &[u8] = b"</style";
const COMMENT_HEAD: usize = 9;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Data,
    Text,
    Space { newline: bool },
    TagOpen,
    EndTagOpen,
    TagName,
    BeforeAttr,
    SelfClosing,
    AttrName,
    AfterAttrName,
    BeforeValue,
    ValueQuoted(u8),
    ValueUnquoted,
    /// `<!`
    MarkupOpen,
    /// `<!-`
    MarkupDash,
    Comment,
    /// `<!DOCTYPE ...>`, `<?...>` and bogus comments.
    Decl,
    ScriptData,
    /// `matched` bytes of `</script` seen.
    ScriptClose { matched: usize },
    StyleData,
    StyleClose { matched: usize },
}

#[derive(Debug, Default)]
struct CommentHead {
    bytes: [u8; COMMENT_HEAD],
    len: usize,
    dashes: u8,
}

impl CommentHead {
    fn is_conditional(&self) -> bool {
        let head = &self.bytes[..self.len];
        (head.len() >= 3 && head[..3].eq_ignore_ascii_case(b"[if")) || head == b"<![endif]"
    }
}

#[derive(Debug)]
pub(crate) struct HtmlScanner {
    state: State,
    tag: TagInfo,
    comment: CommentHead,
    css: CssScanner,
    /// Progress through `</style` while the CSS scanner is inside a literal.
    literal_close: usize,
}

impl Default for HtmlScanner {
    fn default() -> Self {
        Self {
            state: State::Data,
            tag: TagInfo::default(),
            comment: CommentHead::default(),
            css: CssScanner::new(),
            literal_close: 0,
        }
    }
}

impl HtmlScanner {
    pub(crate) fn step(
        &mut self,
        ctx: &mut ScanContext<'_>,
        data: &[u8],
        i: usize,
        transform: &mut HtmlTransform,
    ) -> Result<Step, LexError> {
        let b = data[i];
        match self.state {
            State::Data => {
                self.state = match b {
                    b'<' => State::TagOpen,
                    _ if is_space(b) => State::Space {
                        newline: is_newline(b),
                    },
                    _ => State::Text,
                };
            }
            State::Text => {
                if b == b'<' || is_space(b) {
                    ctx.end_token(data, i, TokenKind::Misc, transform)?;
                    self.state = State::Data;
                    return Ok(Step::Retry);
                }
                let run = data[i..]
                    .iter()
                    .position(|&c| c == b'<' || is_space(c))
                    .unwrap_or(data.len() - i);
                return Ok(Step::Advance(run));
            }
            State::Space { newline } => {
                if !is_space(b) {
                    let kind = TokenKind::Html(HtmlToken::Space { newline });
                    ctx.end_token(data, i, kind, transform)?;
                    self.state = State::Data;
                    return Ok(Step::Retry);
                }
                self.state = State::Space {
                    newline: newline || is_newline(b),
                };
            }
            State::TagOpen => match b {
                _ if b.is_ascii_alphabetic() => self.begin_tag(ctx, i, b, false),
                b'/' => self.state = State::EndTagOpen,
                b'!' => self.state = State::MarkupOpen,
                b'?' => self.state = State::Decl,
                _ => {
                    self.state = State::Text;
                    return Ok(Step::Retry);
                }
            },
            State::EndTagOpen => {
                if !b.is_ascii_alphabetic() {
                    self.state = State::Text;
                    return Ok(Step::Retry);
                }
                self.begin_tag(ctx, i, b, true);
            }
            State::TagName => match b {
                _ if is_space(b) => self.state = State::BeforeAttr,
                b'/' => self.state = State::SelfClosing,
                b'>' => return self.finish_tag(ctx, data, i, transform),
                b'<' | 0 => return Ok(Step::Malformed),
                _ => self.tag.push_name(b),
            },
            State::BeforeAttr => match b {
                _ if is_space(b) => {}
                b'/' => self.state = State::SelfClosing,
                b'>' => return self.finish_tag(ctx, data, i, transform),
                b'<' | 0 => return Ok(Step::Malformed),
                _ => {
                    self.tag.start_attr(ctx.doc_offset(i))?;
                    self.state = State::AttrName;
                }
            },
            State::SelfClosing => {
                // Kept only if nothing but whitespace follows before `>`.
                self.tag.set_self_closing();
                if b != b'>' {
                    self.state = State::BeforeAttr;
                    return Ok(Step::Retry);
                }
                return self.finish_tag(ctx, data, i, transform);
            }
            State::AttrName => match b {
                _ if is_space(b) => self.state = State::AfterAttrName,
                b'=' => self.state = State::BeforeValue,
                b'/' => self.state = State::SelfClosing,
                b'>' => return self.finish_tag(ctx, data, i, transform),
                b'<' | 0 => return Ok(Step::Malformed),
                _ => self.tag.extend_key(1),
            },
            State::AfterAttrName => match b {
                _ if is_space(b) => {}
                b'=' => self.state = State::BeforeValue,
                b'/' => self.state = State::SelfClosing,
                b'>' => return self.finish_tag(ctx, data, i, transform),
                b'<' | 0 => return Ok(Step::Malformed),
                _ => {
                    self.tag.start_attr(ctx.doc_offset(i))?;
                    self.state = State::AttrName;
                }
            },
            State::BeforeValue => match b {
                _ if is_space(b) => {}
                b'"' | b'\'' => {
                    self.tag.start_value(ctx.doc_offset(i + 1), b);
                    self.state = State::ValueQuoted(b);
                }
                b'>' => {
                    self.tag.start_value(ctx.doc_offset(i), 0);
                    return self.finish_tag(ctx, data, i, transform);
                }
                b'<' | 0 => return Ok(Step::Malformed),
                _ => {
                    self.tag.start_value(ctx.doc_offset(i), 0);
                    self.tag.extend_value(1);
                    self.state = State::ValueUnquoted;
                }
            },
            State::ValueQuoted(quote) => {
                if b == quote {
                    self.state = State::BeforeAttr;
                } else {
                    let run = memchr(quote, &data[i..]).unwrap_or(data.len() - i);
                    self.tag.extend_value(run);
                    return Ok(Step::Advance(run));
                }
            }
            State::ValueUnquoted => match b {
                _ if is_space(b) => self.state = State::BeforeAttr,
                b'>' => return self.finish_tag(ctx, data, i, transform),
                b'<' | 0 => return Ok(Step::Malformed),
                _ => self.tag.extend_value(1),
            },
            State::MarkupOpen => {
                if b != b'-' {
                    self.state = State::Decl;
                    return Ok(Step::Retry);
                }
                self.state = State::MarkupDash;
            }
            State::MarkupDash => {
                if b != b'-' {
                    self.state = State::Decl;
                    return Ok(Step::Retry);
                }
                self.comment = CommentHead::default();
                self.state = State::Comment;
            }
            State::Comment => return self.comment_byte(ctx, data, i, transform),
            State::Decl => match memchr(b'>', &data[i..]) {
                Some(rel) => {
                    ctx.end_token(data, i + rel + 1, TokenKind::Misc, transform)?;
                    self.state = State::Data;
                    return Ok(Step::Advance(rel + 1));
                }
                None => return Ok(Step::Advance(data.len() - i)),
            },
            State::ScriptData => return self.script_byte(ctx, data, i, transform),
            State::ScriptClose { matched } => {
                if matched == CLOSE_SCRIPT.len() && ends_close_tag(b) {
                    return Ok(self.close_raw_text(ctx, CLOSE_SCRIPT));
                }
                if matched == CLOSE_SCRIPT.len() || b.to_ascii_lowercase() != CLOSE_SCRIPT[matched] {
                    self.state = State::ScriptData;
                    return Ok(Step::Retry);
                }
                self.state = State::ScriptClose {
                    matched: matched + 1,
                };
            }
            State::StyleData => return self.style_byte(ctx, data, i, transform),
            State::StyleClose { matched } => {
                if matched == CLOSE_STYLE.len() && ends_close_tag(b) {
                    return Ok(self.close_raw_text(ctx, CLOSE_STYLE));
                }
                if matched == CLOSE_STYLE.len() || b.to_ascii_lowercase() != CLOSE_STYLE[matched] {
                    // Not a close tag: the prefix goes out as-is and the CSS
                    // scanner resumes after it.
                    ctx.end_token(data, i, TokenKind::Misc, transform)?;
                    self.css.note_foreign(CLOSE_STYLE[matched - 1]);
                    self.state = State::StyleData;
                    return Ok(Step::Retry);
                }
                self.state = State::StyleClose {
                    matched: matched + 1,
                };
            }
        }
        Ok(Step::Advance(1))
    }

    /// Flush the pending token at end of input.
    pub(crate) fn finish(
        &mut self,
        ctx: &mut ScanContext<'_>,
        data: &[u8],
        transform: &mut HtmlTransform,
    ) -> Result<(), LexError> {
        let end = data.len();
        match self.state {
            State::Data => {}
            State::Space { newline } => {
                ctx.end_token(data, end, TokenKind::Html(HtmlToken::Space { newline }), transform)?;
            }
            State::StyleData => self.css.finish(ctx, data, transform)?,
            _ => ctx.end_token(data, end, TokenKind::Misc, transform)?,
        }
        self.state = State::Data;
        Ok(())
    }

    fn begin_tag(&mut self, ctx: &ScanContext<'_>, i: usize, first: u8, end_tag: bool) {
        self.tag.begin(ctx.doc_offset(i), end_tag);
        self.tag.push_name(first);
        self.state = State::TagName;
    }

    fn finish_tag(
        &mut self,
        ctx: &mut ScanContext<'_>,
        data: &[u8],
        i: usize,
        transform: &mut HtmlTransform,
    ) -> Result<Step, LexError> {
        let kind = TokenKind::Html(self.tag.kind());
        let mut tag_transform = TagTransform {
            html: &mut *transform,
            tag: &mut self.tag,
        };
        ctx.end_token(data, i + 1, kind, &mut tag_transform)?;
        transform.note_tag(&self.tag);

        self.state = if self.tag.is_end_tag() || self.tag.is_self_closing() {
            State::Data
        } else if self.tag.name_is(b"script") {
            State::ScriptData
        } else if self.tag.name_is(b"style") {
            self.css = CssScanner::new();
            self.literal_close = 0;
            State::StyleData
        } else {
            State::Data
        };
        Ok(Step::Advance(1))
    }

    fn comment_byte(
        &mut self,
        ctx: &mut ScanContext<'_>,
        data: &[u8],
        i: usize,
        transform: &mut HtmlTransform,
    ) -> Result<Step, LexError> {
        let b = data[i];
        let comment = &mut self.comment;
        if comment.len == COMMENT_HEAD && comment.dashes == 0 && b != b'-' {
            let run = memchr(b'-', &data[i..]).unwrap_or(data.len() - i);
            return Ok(Step::Advance(run));
        }
        if comment.len < COMMENT_HEAD {
            comment.bytes[comment.len] = b;
            comment.len += 1;
        }
        match b {
            b'-' => comment.dashes = comment.dashes.saturating_add(1),
            b'>' if comment.dashes >= 2 => {
                let conditional = comment.is_conditional();
                let kind = TokenKind::Html(HtmlToken::Comment { conditional });
                ctx.end_token(data, i + 1, kind, transform)?;
                self.state = State::Data;
            }
            _ => comment.dashes = 0,
        }
        Ok(Step::Advance(1))
    }

    /// Script bodies go out verbatim, one token per line, split before any
    /// `<` that could start `</script`.
    fn script_byte(
        &mut self,
        ctx: &mut ScanContext<'_>,
        data: &[u8],
        i: usize,
        transform: &mut HtmlTransform,
    ) -> Result<Step, LexError> {
        match memchr2(b'<', b'\n', &data[i..]) {
            Some(0) if data[i] == b'\n' => {
                ctx.end_token(data, i + 1, TokenKind::Misc, transform)?;
                Ok(Step::Advance(1))
            }
            Some(0) => {
                ctx.end_token(data, i, TokenKind::Misc, transform)?;
                self.state = State::ScriptClose { matched: 1 };
                Ok(Step::Advance(1))
            }
            Some(rel) => Ok(Step::Advance(rel)),
            None => Ok(Step::Advance(data.len() - i)),
        }
    }

    fn style_byte(
        &mut self,
        ctx: &mut ScanContext<'_>,
        data: &[u8],
        i: usize,
        transform: &mut HtmlTransform,
    ) -> Result<Step, LexError> {
        let b = data[i];
        if self.css.is_literal() {
            self.literal_close = match b {
                b'<' => 1,
                _ if self.literal_close > 0
                    && self.literal_close < CLOSE_STYLE.len()
                    && b.to_ascii_lowercase() == CLOSE_STYLE[self.literal_close] =>
                {
                    self.literal_close + 1
                }
                _ => 0,
            };
            if self.literal_close == CLOSE_STYLE.len() {
                return Ok(Step::Malformed);
            }
            // One byte at a time, so `</style` is seen inside comments too.
            return self.css.step(ctx, &data[..=i], i, transform);
        }
        self.literal_close = 0;
        if b == b'<' {
            self.css.interrupt(ctx, data, i, b, transform)?;
            self.state = State::StyleClose { matched: 1 };
            return Ok(Step::Advance(1));
        }
        self.css.step(ctx, data, i, transform)
    }

    /// `close` (`</script` or `</style`) was followed by a delimiter: the
    /// pending token continues as that end tag.
    fn close_raw_text(&mut self, ctx: &ScanContext<'_>, close: &[u8]) -> Step {
        self.tag.begin(ctx.token_offset() + 2, true);
        for &c in &close[2..] {
            self.tag.push_name(c);
        }
        self.state = State::TagName;
        Step::Retry
    }
}

fn is_newline(b: u8) -> bool {
    matches!(b, b'\n' | b'\r')
}

fn ends_close_tag(b: u8) -> bool {
    is_space(b) || b == b'/' || b == b'>'
}
