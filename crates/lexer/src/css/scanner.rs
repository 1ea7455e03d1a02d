//! Resumable CSS tokenizer.
//!
//! Every piece of state needed to classify the next byte lives on
//! [`CssScanner`], so a buffer may end anywhere. Tokens:
//! - whitespace runs, required when removing them could fuse the neighbours
//! - comments, `url(...)`
//! - words: selectors in preludes, terms in declaration values, misc in
//!   property names
//! - strings and single punctuation bytes as misc
//!
//! Known limitations (intentional):
//! - no validation; unbalanced blocks are tolerated
//! - nesting deeper than 64 blocks is treated as a declaration block

use memchr::memchr;

use crate::error::LexError;
use crate::scan::{ScanContext, Step, Transform};
use crate::token::{CssToken, TokenKind};

const WORD_HEAD: usize = 16;
const MAX_TRACKED_DEPTH: u32 = 64;

/// At-rules whose blocks contain rules rather than declarations.
const GROUP_AT_RULES: &[&[u8]] = &[
    b"@media",
    b"@supports",
    b"@document",
    b"@layer",
    b"@container",
    b"@scope",
    b"@starting-style",
    b"@-moz-document",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Start,
    Space,
    Word,
    WordEscape,
    Slash,
    Comment,
    CommentStar,
    Str { quote: u8, escaped: bool },
    /// `quote` is 0 outside a quoted argument.
    Url { quote: u8, escaped: bool },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Context {
    /// Selector list or at-rule prelude.
    Prelude,
    DeclName,
    DeclValue,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Prelude {
    Fresh,
    Plain,
    GroupAtRule,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Block {
    Group,
    Rule,
}

#[derive(Clone, Copy, Debug, Default)]
struct BlockStack {
    bits: u64,
    depth: u32,
}

impl BlockStack {
    fn push(&mut self, block: Block) {
        if self.depth < MAX_TRACKED_DEPTH {
            let bit = 1u64 << self.depth;
            if block == Block::Group {
                self.bits |= bit;
            } else {
                self.bits &= !bit;
            }
        }
        self.depth = self.depth.saturating_add(1);
    }

    fn pop(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn top(&self) -> Option<Block> {
        if self.depth == 0 {
            return None;
        }
        let idx = self.depth - 1;
        if idx < MAX_TRACKED_DEPTH && self.bits & (1u64 << idx) != 0 {
            Some(Block::Group)
        } else {
            Some(Block::Rule)
        }
    }
}

#[derive(Debug)]
pub(crate) struct CssScanner {
    state: State,
    /// Last byte consumed.
    last: u8,
    /// Last byte of the last token that was neither whitespace nor a comment.
    prev: Option<u8>,
    /// A required whitespace run was emitted since `prev`.
    spaced: bool,
    word: [u8; WORD_HEAD],
    word_len: usize,
    context: Context,
    prelude: Prelude,
    blocks: BlockStack,
}

impl Default for CssScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl CssScanner {
    pub(crate) fn new() -> Self {
        Self {
            state: State::Start,
            last: 0,
            prev: None,
            spaced: false,
            word: [0; WORD_HEAD],
            word_len: 0,
            context: Context::Prelude,
            prelude: Prelude::Fresh,
            blocks: BlockStack::default(),
        }
    }

    /// Inside a comment, string, url or escape, where `<` is plain content.
    pub(crate) fn is_literal(&self) -> bool {
        matches!(
            self.state,
            State::Comment
                | State::CommentStar
                | State::Str { .. }
                | State::Url { .. }
                | State::WordEscape
        )
    }

    pub(crate) fn step(
        &mut self,
        ctx: &mut ScanContext<'_>,
        data: &[u8],
        i: usize,
        transform: &mut dyn Transform,
    ) -> Result<Step, LexError> {
        let b = data[i];
        match self.state {
            State::Start => return self.start(ctx, data, i, transform),
            State::Space => {
                if !is_space(b) {
                    self.end_space(ctx, data, i, Some(b), transform)?;
                    self.state = State::Start;
                    return Ok(Step::Retry);
                }
            }
            State::Word => {
                if b == b'\\' {
                    self.state = State::WordEscape;
                } else if b == b'(' && self.word_is(b"url") {
                    self.state = State::Url {
                        quote: 0,
                        escaped: false,
                    };
                } else if is_word_byte(b) {
                    self.push_word(b);
                } else {
                    self.end_word(ctx, data, i, transform)?;
                    self.state = State::Start;
                    return Ok(Step::Retry);
                }
            }
            State::WordEscape => {
                self.push_word(b);
                self.state = State::Word;
            }
            State::Slash => {
                if b == b'*' {
                    self.state = State::Comment;
                } else {
                    ctx.end_token(data, i, TokenKind::Misc, transform)?;
                    self.mark_significant(b'/');
                    self.state = State::Start;
                    return Ok(Step::Retry);
                }
            }
            State::Comment => {
                return Ok(match memchr(b'*', &data[i..]) {
                    Some(rel) => {
                        self.state = State::CommentStar;
                        self.last = b'*';
                        Step::Advance(rel + 1)
                    }
                    None => {
                        self.last = data[data.len() - 1];
                        Step::Advance(data.len() - i)
                    }
                });
            }
            State::CommentStar => match b {
                b'/' => {
                    ctx.end_token(data, i + 1, TokenKind::Css(CssToken::Comment), transform)?;
                    self.state = State::Start;
                }
                b'*' => {}
                _ => self.state = State::Comment,
            },
            State::Str { quote, escaped } => {
                if escaped {
                    self.state = State::Str {
                        quote,
                        escaped: false,
                    };
                } else if b == b'\\' {
                    self.state = State::Str {
                        quote,
                        escaped: true,
                    };
                } else if b == quote {
                    ctx.end_token(data, i + 1, TokenKind::Misc, transform)?;
                    self.mark_significant(b);
                    self.state = State::Start;
                    return Ok(Step::Advance(1));
                } else if matches!(b, b'\n' | b'\r' | 0x0c) {
                    return Ok(Step::Malformed);
                }
            }
            State::Url { quote, escaped } => {
                if escaped {
                    self.state = State::Url {
                        quote,
                        escaped: false,
                    };
                } else if b == b'\\' {
                    self.state = State::Url {
                        quote,
                        escaped: true,
                    };
                } else if quote != 0 {
                    if b == quote {
                        self.state = State::Url {
                            quote: 0,
                            escaped: false,
                        };
                    }
                } else if b == b'"' || b == b'\'' {
                    self.state = State::Url { quote: b, escaped };
                } else if b == b')' {
                    ctx.end_token(data, i + 1, TokenKind::Css(CssToken::Url), transform)?;
                    self.mark_significant(b);
                    self.state = State::Start;
                    return Ok(Step::Advance(1));
                }
            }
        }
        self.last = b;
        Ok(Step::Advance(1))
    }

    fn start(
        &mut self,
        ctx: &mut ScanContext<'_>,
        data: &[u8],
        i: usize,
        transform: &mut dyn Transform,
    ) -> Result<Step, LexError> {
        let b = data[i];
        match b {
            0 => return Ok(Step::Malformed),
            b'/' => self.state = State::Slash,
            b'"' | b'\'' => {
                self.state = State::Str {
                    quote: b,
                    escaped: false,
                }
            }
            b'\\' => {
                self.word_len = 0;
                self.state = State::WordEscape;
            }
            _ if is_space(b) => self.state = State::Space,
            _ if is_word_byte(b) => {
                self.word_len = 0;
                self.push_word(b);
                self.state = State::Word;
            }
            _ => {
                ctx.end_token(data, i + 1, TokenKind::Misc, transform)?;
                self.punctuation(b);
                self.mark_significant(b);
            }
        }
        self.last = b;
        Ok(Step::Advance(1))
    }

    /// Complete whatever token is pending at `end`, as if `next` followed it.
    ///
    /// Used when an embedding grammar takes over at a byte this scanner
    /// never sees. Must not be called while [`CssScanner::is_literal`].
    pub(crate) fn interrupt(
        &mut self,
        ctx: &mut ScanContext<'_>,
        data: &[u8],
        end: usize,
        next: u8,
        transform: &mut dyn Transform,
    ) -> Result<(), LexError> {
        debug_assert!(!self.is_literal());
        match self.state {
            State::Space => self.end_space(ctx, data, end, Some(next), transform)?,
            State::Word => self.end_word(ctx, data, end, transform)?,
            State::Slash => {
                ctx.end_token(data, end, TokenKind::Misc, transform)?;
                self.mark_significant(b'/');
            }
            _ => {}
        }
        self.state = State::Start;
        Ok(())
    }

    /// Bytes handled outside this scanner ended with `last`.
    pub(crate) fn note_foreign(&mut self, last: u8) {
        self.mark_significant(last);
        self.last = last;
    }

    /// Flush the pending token at end of input.
    pub(crate) fn finish(
        &mut self,
        ctx: &mut ScanContext<'_>,
        data: &[u8],
        transform: &mut dyn Transform,
    ) -> Result<(), LexError> {
        let end = data.len();
        match self.state {
            State::Start => {}
            State::Space => self.end_space(ctx, data, end, None, transform)?,
            State::Word | State::WordEscape => self.end_word(ctx, data, end, transform)?,
            State::Slash
            | State::Comment
            | State::CommentStar
            | State::Str { .. }
            | State::Url { .. } => ctx.end_token(data, end, TokenKind::Misc, transform)?,
        }
        self.state = State::Start;
        Ok(())
    }

    fn end_space(
        &mut self,
        ctx: &mut ScanContext<'_>,
        data: &[u8],
        end: usize,
        next: Option<u8>,
        transform: &mut dyn Transform,
    ) -> Result<(), LexError> {
        let fuses = !self.spaced
            && self.prev.is_some_and(joins_left)
            && next.is_some_and(|n| self.joins_right(n));
        let kind = if fuses {
            CssToken::RequiredSpace
        } else {
            CssToken::OptionalSpace
        };
        ctx.end_token(data, end, TokenKind::Css(kind), transform)?;
        self.spaced |= fuses;
        Ok(())
    }

    fn end_word(
        &mut self,
        ctx: &mut ScanContext<'_>,
        data: &[u8],
        end: usize,
        transform: &mut dyn Transform,
    ) -> Result<(), LexError> {
        let kind = match self.context {
            Context::Prelude => TokenKind::Css(CssToken::Selector),
            Context::DeclValue => TokenKind::Css(CssToken::Term),
            Context::DeclName => TokenKind::Misc,
        };
        if self.context == Context::Prelude && self.prelude == Prelude::Fresh {
            let head = &self.word[..self.word_len.min(WORD_HEAD)];
            let grouping = self.word_len <= WORD_HEAD && GROUP_AT_RULES.iter().any(|name| *name == head);
            self.prelude = if grouping {
                Prelude::GroupAtRule
            } else {
                Prelude::Plain
            };
        }
        ctx.end_token(data, end, kind, transform)?;
        self.mark_significant(self.last);
        Ok(())
    }

    fn punctuation(&mut self, b: u8) {
        match b {
            b'{' => {
                if self.context == Context::Prelude && self.prelude == Prelude::GroupAtRule {
                    self.blocks.push(Block::Group);
                    self.context = Context::Prelude;
                } else {
                    self.blocks.push(Block::Rule);
                    self.context = Context::DeclName;
                }
                self.prelude = Prelude::Fresh;
            }
            b'}' => {
                self.blocks.pop();
                self.context = self.outer_context();
                self.prelude = Prelude::Fresh;
            }
            b';' => {
                self.context = self.outer_context();
                self.prelude = Prelude::Fresh;
            }
            b':' if self.context == Context::DeclName => self.context = Context::DeclValue,
            _ => {}
        }
    }

    fn outer_context(&self) -> Context {
        match self.blocks.top() {
            Some(Block::Rule) => Context::DeclName,
            None | Some(Block::Group) => Context::Prelude,
        }
    }

    fn mark_significant(&mut self, last: u8) {
        self.prev = Some(last);
        self.spaced = false;
    }

    fn push_word(&mut self, b: u8) {
        if self.word_len < WORD_HEAD {
            self.word[self.word_len] = b.to_ascii_lowercase();
        }
        self.word_len = self.word_len.saturating_add(1);
    }

    fn word_is(&self, name: &[u8]) -> bool {
        self.word_len == name.len() && &self.word[..name.len()] == name
    }

    fn joins_right(&self, next: u8) -> bool {
        is_word_byte(next)
            || matches!(next, b'(' | b'[' | b'"' | b'\'' | b'*' | b'+' | b'/' | b'\\')
            || (next == b':' && self.context == Context::Prelude)
    }
}

pub(crate) fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0c)
}

fn is_word_byte(b: u8) -> bool {
    b >= 0x80
        || b.is_ascii_alphanumeric()
        || matches!(b, b'-' | b'_' | b'.' | b'#' | b'%' | b'@' | b'&')
}

fn joins_left(prev: u8) -> bool {
    is_word_byte(prev) || matches!(prev, b')' | b']' | b'"' | b'\'' | b'*' | b'+')
}
