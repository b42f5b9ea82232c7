//! Encodes a byte stream using OpenPGP's partial body encoding.
//!
//! The body is cut into power-of-two chunks, each preceded by a
//! partial length octet; the final chunk uses a definite length,
//! which may be zero.

use std::io;

use crate::Result;
use crate::packet::BodyLength;

// The chunk size used for intermediate chunks.  The standard allows
// powers of two up to 1 GB; buffering more than this before writing
// just costs memory.
const CHUNK_SIZE: usize = 1 << 16;

/// A `Write`r framing its input as a partial body.
///
/// The caller writes the packet's CTB, then streams the body through
/// this filter.  [`finish`] emits the final definite-length chunk and
/// returns the sink without closing it.
///
///   [`finish`]: PartialBodyWriter::finish
pub(crate) struct PartialBodyWriter<W: io::Write> {
    inner: Option<W>,
    buffer: Vec<u8>,
}

impl<W: io::Write> PartialBodyWriter<W> {
    /// Returns a new partial body encoder writing to `inner`.
    pub fn new(inner: W) -> Self {
        PartialBodyWriter {
            inner: Some(inner),
            buffer: Vec::with_capacity(CHUNK_SIZE),
        }
    }

    fn write_chunks(&mut self, done: bool) -> Result<()> {
        let inner = match self.inner.as_mut() {
            Some(inner) => inner,
            None => return Ok(()),
        };

        let mut offset = 0;
        while self.buffer.len() - offset >= CHUNK_SIZE {
            BodyLength::Partial(CHUNK_SIZE as u32)
                .serialize_new_format(inner)?;
            inner.write_all(&self.buffer[offset..offset + CHUNK_SIZE])?;
            offset += CHUNK_SIZE;
        }
        self.buffer.drain(..offset);

        if done {
            // The last chunk must have a definite length, even if it
            // is zero bytes long.
            BodyLength::Full(self.buffer.len() as u32)
                .serialize_new_format(inner)?;
            inner.write_all(&self.buffer)?;
            self.buffer.clear();
        }
        Ok(())
    }

    /// Writes the final chunk and returns the sink.
    pub fn finish(&mut self) -> Result<W> {
        self.write_chunks(true)?;
        self.inner.take().ok_or_else(
            || io::Error::new(io::ErrorKind::BrokenPipe,
                              "inner writer was taken").into())
    }
}

impl<W: io::Write> io::Write for PartialBodyWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        if self.buffer.len() >= CHUNK_SIZE {
            self.write_chunks(false).map_err(
                |e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Only whole chunks can be written out early; anything
        // shorter stays buffered for the final chunk.
        if let Some(ref mut inner) = self.inner {
            inner.flush()
        } else {
            Ok(())
        }
    }
}

impl<W: io::Write> Drop for PartialBodyWriter<W> {
    fn drop(&mut self) {
        if self.inner.is_some() {
            let _ = self.write_chunks(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn small_body_is_one_full_chunk() {
        let mut out = Vec::new();
        let mut w = PartialBodyWriter::new(&mut out);
        w.write_all(b"hello").unwrap();
        w.finish().unwrap();
        drop(w);
        assert_eq!(&out[..], &[5, b'h', b'e', b'l', b'l', b'o']);
    }

    #[test]
    fn empty_body_is_a_zero_length_chunk() {
        let mut out = Vec::new();
        PartialBodyWriter::new(&mut out).finish().unwrap();
        assert_eq!(&out[..], &[0]);
    }

    #[test]
    fn long_body_uses_power_of_two_chunks() {
        let mut out = Vec::new();
        let mut w = PartialBodyWriter::new(&mut out);
        w.write_all(&vec![0xaa; CHUNK_SIZE + 10]).unwrap();
        w.finish().unwrap();
        drop(w);

        // One partial chunk of 2^16, then a 10 byte full chunk.
        assert_eq!(out[0], 224 + 16);
        assert_eq!(out.len(), 1 + CHUNK_SIZE + 1 + 10);
        assert_eq!(out[1 + CHUNK_SIZE], 10);
    }

    #[test]
    fn reader_reassembles_writer_output() {
        let mut out = Vec::new();
        let mut w = PartialBodyWriter::new(&mut out);
        let body: Vec<u8> =
            (0..CHUNK_SIZE * 2 + 300).map(|i| i as u8).collect();
        w.write_all(&body).unwrap();
        w.finish().unwrap();
        drop(w);

        // Strip the first chunk header by hand, as the packet header
        // parser would.
        let inner =
            Box::new(buffered_reader::Memory::with_cookie(&out[1..], ()));
        let mut reader = crate::parse::partial_body::PartialBodyReader::new(
            inner, CHUNK_SIZE as u32);
        use buffered_reader::BufferedReader;
        assert_eq!(reader.steal_eof().unwrap(), body);
    }
}
