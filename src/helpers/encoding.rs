//! `--outputencoding` support: transcodes the CSV sink's UTF-8 text into the
//! caller-requested output encoding before it reaches the underlying writer.
//!
//! Grounded on the teacher's own `&'static Encoding` field (`Biff8Reader`,
//! `helpers/biff8.rs`) — same `encoding_rs` crate, used here for writing
//! rather than decoding legacy codepages.

use encoding_rs::Encoding;
use std::io::{self, Write};

/// Wraps a `Write` sink, re-encoding every UTF-8 chunk passed through
/// `write()` into `encoding` before forwarding it. A multi-byte UTF-8
/// sequence split across two `write()` calls (possible once `csv::Writer`'s
/// internal buffer fills mid-record) is held in `pending` until the rest of
/// it arrives, rather than rejected.
pub(crate) struct EncodingWriter<W: Write> {
    inner: W,
    encoding: &'static Encoding,
    pending: Vec<u8>,
}

impl<W: Write> EncodingWriter<W> {
    pub(crate) fn new(inner: W, encoding: &'static Encoding) -> EncodingWriter<W> {
        EncodingWriter { inner, encoding, pending: Vec::new() }
    }

    pub(crate) fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for EncodingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);

        let (text, valid_len) = match std::str::from_utf8(&self.pending) {
            Ok(text) => (text, self.pending.len()),
            Err(error) => {
                let valid_len = error.valid_up_to();
                let text = std::str::from_utf8(&self.pending[..valid_len]).expect("valid_up_to is a UTF-8 boundary");
                (text, valid_len)
            }
        };

        let (encoded, _, _) = self.encoding.encode(text);
        self.inner.write_all(&encoded)?;
        self.pending.drain(..valid_len);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Boxes `writer`, wrapping it in an [`EncodingWriter`] unless `encoding` is
/// already UTF-8 (the common case, where the wrapper would be pure overhead).
pub(crate) fn wrap_output(writer: Box<dyn Write>, encoding: &'static Encoding) -> Box<dyn Write> {
    if encoding == encoding_rs::UTF_8 {
        writer
    } else {
        Box::new(EncodingWriter::new(writer, encoding))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_passthrough_is_unwrapped() {
        let wrapped = wrap_output(Box::new(Vec::new()), encoding_rs::UTF_8);
        // A no-op wrap for UTF-8 — just confirm it still writes correctly.
        let mut wrapped = wrapped;
        wrapped.write_all(b"hello").unwrap();
    }

    #[test]
    fn transcodes_into_a_single_byte_encoding() {
        let mut writer = EncodingWriter::new(Vec::new(), encoding_rs::WINDOWS_1252);
        writer.write_all("café".as_bytes()).unwrap();
        let bytes = writer.into_inner();
        assert_eq!(bytes, vec![b'c', b'a', b'f', 0xE9]);
    }
}
