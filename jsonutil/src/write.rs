//! Output sinks for the encoder.

use alloc::string::String;
use alloc::vec::Vec;

/// A sink the encoder writes JSON text into.
///
/// The encoder only ever hands whole UTF-8 sequences to the sink, so
/// implementations that store text may assume each `write` call is valid
/// UTF-8 on its own.
pub trait JsonWrite {
    /// Write a buffer to the sink.
    fn write(&mut self, buf: &[u8]);

    /// Write a string slice to the sink.
    fn write_str(&mut self, s: &str) {
        self.write(s.as_bytes());
    }

    /// If the sink supports it, reserve space for `additional` bytes.
    fn reserve(&mut self, additional: usize);
}

impl JsonWrite for Vec<u8> {
    fn write(&mut self, buf: &[u8]) {
        self.extend_from_slice(buf);
    }

    fn reserve(&mut self, additional: usize) {
        Vec::reserve(self, additional);
    }
}

impl JsonWrite for String {
    fn write(&mut self, buf: &[u8]) {
        self.push_str(&String::from_utf8_lossy(buf));
    }

    fn write_str(&mut self, s: &str) {
        self.push_str(s);
    }

    fn reserve(&mut self, additional: usize) {
        String::reserve(self, additional);
    }
}

impl<W: JsonWrite + ?Sized> JsonWrite for &mut W {
    fn write(&mut self, buf: &[u8]) {
        (**self).write(buf);
    }

    fn write_str(&mut self, s: &str) {
        (**self).write_str(s);
    }

    fn reserve(&mut self, additional: usize) {
        (**self).reserve(additional);
    }
}

/// Adapter that wraps a `std::io::Write` to implement [`JsonWrite`].
///
/// The first I/O error is recorded and every later write is dropped.
pub struct StdWriteAdapter<W> {
    writer: W,
    error: Option<std::io::Error>,
}

impl<W: std::io::Write> StdWriteAdapter<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            error: None,
        }
    }

    /// Flush the writer and surface the first error seen, if any.
    pub fn into_result(mut self) -> std::io::Result<W> {
        match self.error {
            Some(e) => Err(e),
            None => {
                self.writer.flush()?;
                Ok(self.writer)
            }
        }
    }
}

impl<W: std::io::Write> JsonWrite for StdWriteAdapter<W> {
    fn write(&mut self, buf: &[u8]) {
        if self.error.is_none()
            && let Err(e) = self.writer.write_all(buf)
        {
            self.error = Some(e);
        }
    }

    fn reserve(&mut self, _additional: usize) {
        // std::io::Write doesn't have a reserve method, so this is a no-op
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_sink_keeps_text() {
        let mut s = String::new();
        s.write_str("{\"x\":");
        s.write("\u{1F4A9}".as_bytes());
        s.write(b"}");
        assert_eq!(s, "{\"x\":\u{1F4A9}}");
    }

    #[test]
    fn std_adapter_records_first_error() {
        struct Broken;
        impl std::io::Write for Broken {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("nope"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut adapter = StdWriteAdapter::new(Broken);
        adapter.write(b"a");
        adapter.write(b"b");
        let err = adapter.into_result().err().map(|e| e.to_string());
        assert_eq!(err.as_deref(), Some("nope"));
    }
}
