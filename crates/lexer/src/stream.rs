//! Output seam: the lexer never performs I/O itself.

use std::io;

pub trait OutputStream {
    /// Write `data`, returning how many bytes were accepted.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;
}

impl OutputStream for Vec<u8> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.extend_from_slice(data);
        Ok(data.len())
    }
}

impl<T: OutputStream + ?Sized> OutputStream for &mut T {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        (**self).write(data)
    }
}

/// Adapts any [`io::Write`] (stdout, a file, a socket) into an output stream.
///
/// Each call uses `write_all`, so the stream either accepts everything or
/// reports the error.
#[derive(Debug)]
pub struct IoOutputStream<W> {
    inner: W,
}

impl<W: io::Write> IoOutputStream<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: io::Write> OutputStream for IoOutputStream<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.inner.write_all(data)?;
        Ok(data.len())
    }
}

/// Tracks how much has been written to the wrapped stream and the minification
/// rules in force, for the duration of one `scan` call.
pub(crate) struct Sink<'a> {
    out: &'a mut dyn OutputStream,
    bytes_out: &'a mut u64,
    rules: crate::MinifyRules,
}

impl<'a> Sink<'a> {
    pub(crate) fn new(
        out: &'a mut dyn OutputStream,
        bytes_out: &'a mut u64,
        rules: crate::MinifyRules,
    ) -> Self {
        Self {
            out,
            bytes_out,
            rules,
        }
    }

    pub(crate) fn rules(&self) -> crate::MinifyRules {
        self.rules
    }

    pub(crate) fn write(&mut self, data: &[u8]) -> Result<(), crate::LexError> {
        if data.is_empty() {
            return Ok(());
        }
        let written = self.out.write(data)?;
        *self.bytes_out = self.bytes_out.saturating_add(written.min(data.len()) as u64);
        if written < data.len() {
            return Err(crate::LexError::ShortWrite {
                written,
                len: data.len(),
            });
        }
        Ok(())
    }
}
