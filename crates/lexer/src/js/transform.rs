use crate::error::LexError;
use crate::scan::Transform;
use crate::stream::Sink;
use crate::token::{JsToken, Token, TokenKind};

use super::scanner::is_ident_char;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pending {
    Space,
    Newline,
}

/// Whitespace elision with one byte of output memory.
///
/// Whitespace is held back as `pending` until the next real token shows
/// whether it separates two things that would otherwise fuse. Pending
/// whitespace at end of input is dropped.
#[derive(Debug)]
pub(crate) struct JsTransform {
    last_written: u8,
    pending: Option<Pending>,
    /// A kept line comment is open; its newline is always written.
    in_line_comment: bool,
}

impl Default for JsTransform {
    fn default() -> Self {
        Self {
            last_written: b'\n',
            pending: None,
            in_line_comment: false,
        }
    }
}

impl Transform for JsTransform {
    fn apply(&mut self, sink: &mut Sink<'_>, token: &Token<'_>) -> Result<(), LexError> {
        let rules = sink.rules();
        let (kind, bytes) = match token.kind {
            TokenKind::Js(JsToken::BlockComment) if rules.remove_comments => {
                (TokenKind::Js(JsToken::Space), &b" "[..])
            }
            TokenKind::Js(JsToken::LineComment) if rules.remove_comments => {
                (TokenKind::Js(JsToken::Newline), &b"\n"[..])
            }
            kind => (kind, token.bytes),
        };

        if !rules.remove_space {
            sink.write(bytes)?;
            if let Some(&last) = bytes.iter().rev().find(|&&b| b != b' ' && b != b'\t') {
                self.last_written = last;
            }
            return Ok(());
        }

        match kind {
            TokenKind::Js(JsToken::Space) => {
                if self.pending.is_none()
                    && (is_ident_char(self.last_written) || matches!(self.last_written, b'+' | b'-' | b'/'))
                {
                    self.pending = Some(Pending::Space);
                }
            }
            TokenKind::Js(JsToken::Newline) if self.in_line_comment => {
                self.in_line_comment = false;
                self.pending = None;
                sink.write(b"\n")?;
                self.last_written = b'\n';
            }
            TokenKind::Js(JsToken::Newline) => match self.pending {
                Some(Pending::Space) => self.pending = Some(Pending::Newline),
                Some(Pending::Newline) => {}
                None => {
                    if is_ident_char(self.last_written)
                        || matches!(self.last_written, b'}' | b']' | b')' | b'+' | b'-' | b'"' | b'\'')
                    {
                        self.pending = Some(Pending::Newline);
                    }
                }
            },
            _ => {
                let Some((&first, _)) = bytes.split_first() else {
                    return Ok(());
                };
                match self.pending.take() {
                    Some(Pending::Newline)
                        if is_ident_char(first) || matches!(first, b'{' | b'[' | b'(' | b'+' | b'-') =>
                    {
                        sink.write(b"\n")?;
                        self.last_written = b'\n';
                    }
                    Some(Pending::Space) if fuses(self.last_written, first) => sink.write(b" ")?,
                    _ => {}
                }
                if kind == TokenKind::Js(JsToken::LineComment) {
                    // `-->` only opens a comment first on a line.
                    if bytes.starts_with(b"-->") && self.last_written != b'\n' {
                        sink.write(b"\n")?;
                    }
                    self.in_line_comment = true;
                }
                sink.write(bytes)?;
                if let Some(&last) = bytes.last() {
                    self.last_written = last;
                }
            }
        }
        Ok(())
    }
}

/// `a` and `b` written side by side would read as one token.
fn fuses(a: u8, b: u8) -> bool {
    (is_ident_char(a) && is_ident_char(b)) || (a == b && matches!(a, b'+' | b'-' | b'/'))
}
