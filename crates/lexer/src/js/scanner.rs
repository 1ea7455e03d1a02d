//! Resumable JavaScript tokenizer.
//!
//! Only whitespace, newlines and comments are classified; identifiers,
//! punctuation and literals are misc and pass through untouched. Literals are
//! still tracked so that comment markers inside them are not mistaken for
//! comments.
//!
//! `<!--` anywhere, and `-->` first on a line, open a line comment as legacy
//! browsers read them.
//!
//! Known limitations (intentional):
//! - `/` is read as a regular expression after punctuation that cannot end an
//!   expression and after a handful of keywords; anything else is division
//! - template literals end at the next unescaped backtick, so a nested
//!   template inside `${...}` ends the outer one early (harmless, as both
//!   halves are passed through)

use memchr::{memchr, memchr2};

use crate::error::LexError;
use crate::scan::{ScanContext, Step, Transform};
use crate::token::{JsToken, TokenKind};

const KEYWORD_HEAD: usize = 10;

const HTML_OPEN: &[u8] = b"<!--";
const HTML_CLOSE: &[u8] = b"-->";

/// Keywords after which `/` starts a regular expression.
const REGEX_KEYWORDS: &[&[u8]] = &[
    b"return",
    b"typeof",
    b"case",
    b"do",
    b"else",
    b"in",
    b"of",
    b"void",
    b"delete",
    b"throw",
    b"new",
    b"instanceof",
    b"yield",
    b"await",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Start,
    Space,
    Newline,
    Word,
    Slash,
    BlockComment,
    BlockCommentStar,
    LineComment,
    /// `matched` bytes of `<!--` read so far.
    HtmlOpen { matched: usize },
    /// `matched` bytes of `-->` read so far.
    HtmlClose { matched: usize },
    /// `cr` is set right after an escaped carriage return, where a line feed
    /// still belongs to the line continuation.
    Str { quote: u8, escaped: bool, cr: bool },
    Template { escaped: bool },
    Regex { class: bool, escaped: bool },
}

#[derive(Debug)]
pub(crate) struct JsScanner {
    state: State,
    last: u8,
    /// Last byte of the last token that was not whitespace or a comment.
    prev: Option<u8>,
    /// That token was an identifier or keyword, held in `word`.
    prev_word: bool,
    word: [u8; KEYWORD_HEAD],
    word_len: usize,
    /// Nothing but whitespace and comments since the last newline.
    line_start: bool,
}

impl Default for JsScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl JsScanner {
    pub(crate) fn new() -> Self {
        Self {
            state: State::Start,
            last: 0,
            prev: None,
            prev_word: false,
            word: [0; KEYWORD_HEAD],
            word_len: 0,
            line_start: true,
        }
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
                    ctx.end_token(data, i, TokenKind::Js(JsToken::Space), transform)?;
                    self.state = State::Start;
                    return Ok(Step::Retry);
                }
            }
            State::Newline => {
                if !is_newline(b) {
                    ctx.end_token(data, i, TokenKind::Js(JsToken::Newline), transform)?;
                    self.state = State::Start;
                    return Ok(Step::Retry);
                }
            }
            State::Word => {
                if is_ident_char(b) {
                    self.push_word(b);
                } else {
                    ctx.end_token(data, i, TokenKind::Misc, transform)?;
                    self.mark_significant(self.last, true);
                    self.state = State::Start;
                    return Ok(Step::Retry);
                }
            }
            State::Slash => match b {
                b'/' => self.state = State::LineComment,
                b'*' => self.state = State::BlockComment,
                _ if self.regex_allowed() => {
                    self.state = State::Regex {
                        class: false,
                        escaped: false,
                    };
                    return Ok(Step::Retry);
                }
                _ => {
                    ctx.end_token(data, i, TokenKind::Misc, transform)?;
                    self.mark_significant(b'/', false);
                    self.state = State::Start;
                    return Ok(Step::Retry);
                }
            },
            State::HtmlOpen { matched } => {
                return self.html_marker(ctx, data, i, transform, HTML_OPEN, matched);
            }
            State::HtmlClose { matched } => {
                return self.html_marker(ctx, data, i, transform, HTML_CLOSE, matched);
            }
            State::LineComment => {
                return Ok(match memchr2(b'\n', b'\r', &data[i..]) {
                    Some(0) => {
                        ctx.end_token(data, i, TokenKind::Js(JsToken::LineComment), transform)?;
                        self.state = State::Start;
                        Step::Retry
                    }
                    Some(rel) => {
                        self.last = data[i + rel - 1];
                        Step::Advance(rel)
                    }
                    None => {
                        self.last = data[data.len() - 1];
                        Step::Advance(data.len() - i)
                    }
                });
            }
            State::BlockComment => {
                return Ok(match memchr(b'*', &data[i..]) {
                    Some(rel) => {
                        self.state = State::BlockCommentStar;
                        self.last = b'*';
                        Step::Advance(rel + 1)
                    }
                    None => {
                        self.last = data[data.len() - 1];
                        Step::Advance(data.len() - i)
                    }
                });
            }
            State::BlockCommentStar => match b {
                b'/' => {
                    ctx.end_token(data, i + 1, TokenKind::Js(JsToken::BlockComment), transform)?;
                    self.state = State::Start;
                }
                b'*' => {}
                _ => self.state = State::BlockComment,
            },
            State::Str { quote, escaped, cr } => {
                if escaped {
                    self.state = State::Str {
                        quote,
                        escaped: false,
                        cr: b == b'\r',
                    };
                } else if cr && b == b'\n' {
                    self.state = State::Str {
                        quote,
                        escaped: false,
                        cr: false,
                    };
                } else if b == b'\\' {
                    self.state = State::Str {
                        quote,
                        escaped: true,
                        cr: false,
                    };
                } else if b == quote {
                    ctx.end_token(data, i + 1, TokenKind::Misc, transform)?;
                    self.mark_significant(b, false);
                    self.state = State::Start;
                } else if is_newline(b) {
                    return Ok(Step::Malformed);
                } else if cr {
                    self.state = State::Str {
                        quote,
                        escaped: false,
                        cr: false,
                    };
                }
            }
            State::Template { escaped } => {
                if escaped {
                    self.state = State::Template { escaped: false };
                } else if b == b'\\' {
                    self.state = State::Template { escaped: true };
                } else if b == b'`' {
                    ctx.end_token(data, i + 1, TokenKind::Misc, transform)?;
                    self.mark_significant(b, false);
                    self.state = State::Start;
                }
            }
            State::Regex { class, escaped } => {
                if escaped {
                    self.state = State::Regex {
                        class,
                        escaped: false,
                    };
                } else if is_newline(b) {
                    return Ok(Step::Malformed);
                } else if b == b'\\' {
                    self.state = State::Regex {
                        class,
                        escaped: true,
                    };
                } else if b == b'[' {
                    self.state = State::Regex {
                        class: true,
                        escaped: false,
                    };
                } else if b == b']' {
                    self.state = State::Regex {
                        class: false,
                        escaped: false,
                    };
                } else if b == b'/' && !class {
                    ctx.end_token(data, i + 1, TokenKind::Misc, transform)?;
                    self.mark_significant(b, false);
                    self.state = State::Start;
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
            b'<' => self.state = State::HtmlOpen { matched: 1 },
            b'-' if self.line_start => self.state = State::HtmlClose { matched: 1 },
            b'"' | b'\'' => {
                self.state = State::Str {
                    quote: b,
                    escaped: false,
                    cr: false,
                }
            }
            b'`' => self.state = State::Template { escaped: false },
            _ if is_space(b) => self.state = State::Space,
            _ if is_newline(b) => {
                self.line_start = true;
                self.state = State::Newline;
            }
            _ if is_ident_char(b) => {
                self.word_len = 0;
                self.push_word(b);
                self.state = State::Word;
            }
            _ => {
                ctx.end_token(data, i + 1, TokenKind::Misc, transform)?;
                self.mark_significant(b, false);
            }
        }
        self.last = b;
        Ok(Step::Advance(1))
    }

    pub(crate) fn finish(
        &mut self,
        ctx: &mut ScanContext<'_>,
        data: &[u8],
        transform: &mut dyn Transform,
    ) -> Result<(), LexError> {
        let end = data.len();
        let kind = match self.state {
            State::Start => None,
            State::Space => Some(TokenKind::Js(JsToken::Space)),
            State::Newline => Some(TokenKind::Js(JsToken::Newline)),
            State::LineComment => Some(TokenKind::Js(JsToken::LineComment)),
            State::Word
            | State::Slash
            | State::HtmlOpen { .. }
            | State::HtmlClose { .. }
            | State::BlockComment
            | State::BlockCommentStar
            | State::Str { .. }
            | State::Template { .. }
            | State::Regex { .. } => Some(TokenKind::Misc),
        };
        if let Some(kind) = kind {
            ctx.end_token(data, end, kind, transform)?;
        }
        self.state = State::Start;
        Ok(())
    }

    /// Continues matching `marker`; a full match turns into a line comment
    /// and anything short of it is punctuation.
    fn html_marker(
        &mut self,
        ctx: &mut ScanContext<'_>,
        data: &[u8],
        i: usize,
        transform: &mut dyn Transform,
        marker: &[u8],
        matched: usize,
    ) -> Result<Step, LexError> {
        let b = data[i];
        if marker.get(matched) != Some(&b) {
            ctx.end_token(data, i, TokenKind::Misc, transform)?;
            self.mark_significant(self.last, false);
            self.state = State::Start;
            return Ok(Step::Retry);
        }
        let matched = matched + 1;
        self.state = if matched == marker.len() {
            State::LineComment
        } else if marker == HTML_OPEN {
            State::HtmlOpen { matched }
        } else {
            State::HtmlClose { matched }
        };
        self.last = b;
        Ok(Step::Advance(1))
    }

    fn regex_allowed(&self) -> bool {
        match self.prev {
            None => true,
            Some(_) if self.prev_word => {
                self.word_len <= KEYWORD_HEAD
                    && REGEX_KEYWORDS
                        .iter()
                        .any(|kw| *kw == &self.word[..self.word_len])
            }
            Some(b) => matches!(
                b,
                b'(' | b','
                    | b'='
                    | b':'
                    | b'['
                    | b'!'
                    | b'&'
                    | b'|'
                    | b'?'
                    | b'{'
                    | b'}'
                    | b';'
                    | b'+'
                    | b'-'
                    | b'*'
                    | b'%'
                    | b'<'
                    | b'>'
                    | b'~'
                    | b'^'
            ),
        }
    }

    fn mark_significant(&mut self, last: u8, word: bool) {
        self.prev = Some(last);
        self.prev_word = word;
        self.line_start = false;
    }

    fn push_word(&mut self, b: u8) {
        if self.word_len < KEYWORD_HEAD {
            self.word[self.word_len] = b;
        }
        self.word_len = self.word_len.saturating_add(1);
    }
}

/// Identifier-class byte, including escapes and anything outside ASCII.
pub(crate) fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b == b'\\' || b >= 127
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | 0x0b | 0x0c)
}

fn is_newline(b: u8) -> bool {
    matches!(b, b'\n' | b'\r')
}

#[cfg(test)]
mod tests {
    use super::JsScanner;
    use crate::test_util::collect_tokens;
    use crate::token::{JsToken, TokenKind};

    fn tokens(input: &str) -> Vec<(TokenKind, String)> {
        let mut raw = Vec::new();
        let mut scanner = JsScanner::new();
        collect_tokens(input.as_bytes(), &mut raw, |ctx, data, i, t| {
            scanner.step(ctx, data, i, t)
        });
        raw.into_iter()
            .map(|(kind, bytes)| (kind, String::from_utf8(bytes).unwrap()))
            .collect()
    }

    #[test]
    fn comments_and_whitespace_are_classified() {
        let stream = tokens("a /* b */\n// c\nd");
        let kinds: Vec<TokenKind> = stream.iter().map(|(kind, _)| *kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Misc,
                TokenKind::Js(JsToken::Space),
                TokenKind::Js(JsToken::BlockComment),
                TokenKind::Js(JsToken::Newline),
                TokenKind::Js(JsToken::LineComment),
                TokenKind::Js(JsToken::Newline),
            ],
            "got: {stream:?}"
        );
        assert_eq!(stream[4].1, "// c");
    }

    #[test]
    fn html_comment_markers_open_line_comments() {
        let stream = tokens("<!-- x\ny\n-->z\n");
        assert_eq!(stream[0], (TokenKind::Js(JsToken::LineComment), "<!-- x".to_string()));
        assert_eq!(stream[2], (TokenKind::Misc, "y".to_string()));
        assert_eq!(stream[4], (TokenKind::Js(JsToken::LineComment), "-->z".to_string()));
    }

    #[test]
    fn partial_html_comment_markers_are_punctuation() {
        let stream = tokens("a<!b;\n--i;\nx-->y;\n");
        assert!(stream.contains(&(TokenKind::Misc, "<!".to_string())), "got: {stream:?}");
        assert!(stream.contains(&(TokenKind::Misc, "--".to_string())), "got: {stream:?}");
        assert!(
            stream
                .iter()
                .all(|(kind, _)| *kind != TokenKind::Js(JsToken::LineComment)),
            "got: {stream:?}"
        );
    }

    #[test]
    fn division_after_identifier() {
        let stream = tokens("a / b;");
        assert!(
            stream.contains(&(TokenKind::Misc, "/".to_string())),
            "expected a lone slash, got: {stream:?}"
        );
    }

    #[test]
    fn regex_after_assignment() {
        let stream = tokens("x = /a b\\/[/]/g;");
        assert!(
            stream.contains(&(TokenKind::Misc, "/a b\\/[/]/".to_string())),
            "expected one regex token, got: {stream:?}"
        );
    }

    #[test]
    fn regex_after_keyword() {
        let stream = tokens("return /x/.test(y);");
        assert!(
            stream.contains(&(TokenKind::Misc, "/x/".to_string())),
            "expected one regex token, got: {stream:?}"
        );
    }

    #[test]
    fn comment_markers_inside_strings_are_literal() {
        let stream = tokens("s = '/* no */' + \"// no\";");
        assert!(
            stream
                .iter()
                .all(|(kind, _)| !matches!(kind, TokenKind::Js(JsToken::BlockComment | JsToken::LineComment))),
            "got: {stream:?}"
        );
    }
}
