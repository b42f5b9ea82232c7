//! A `BufferedReader` that transparently reassembles a partial body.
//!
//! New format packets may split their body into chunks, each
//! prefixed by a partial length header; every chunk but the last is
//! a power of two in size.  This filter hides the chunk headers from
//! the packet body parsers.

use std::cmp;
use std::fmt;
use std::io;

use buffered_reader::BufferedReader;

use crate::packet::BodyLength;

pub(crate) struct PartialBodyReader<'a> {
    reader: Box<dyn BufferedReader<()> + 'a>,

    // Number of unread bytes in the current chunk.
    chunk_bytes: u32,
    // Whether the current chunk is the final, non-partial one.
    last: bool,

    // Data read across chunk boundaries that the caller has not
    // consumed yet.
    buffer: Option<Box<[u8]>>,
    cursor: usize,

    cookie: (),
}

impl<'a> fmt::Display for PartialBodyReader<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("PartialBodyReader")
    }
}

impl<'a> fmt::Debug for PartialBodyReader<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PartialBodyReader")
            .field("chunk_bytes", &self.chunk_bytes)
            .field("last", &self.last)
            .field("buffered", &self.buffered().len())
            .finish()
    }
}

impl<'a> PartialBodyReader<'a> {
    /// Creates a new filter over `reader`.
    ///
    /// The caller has already parsed the packet header;
    /// `first_chunk` is the length of the first partial chunk.
    pub fn new(reader: Box<dyn BufferedReader<()> + 'a>, first_chunk: u32)
               -> Self {
        PartialBodyReader {
            reader,
            chunk_bytes: first_chunk,
            last: false,
            buffer: None,
            cursor: 0,
            cookie: (),
        }
    }

    fn buffered(&self) -> &[u8] {
        match self.buffer {
            Some(ref buffer) => &buffer[self.cursor..],
            None => &b""[..],
        }
    }

    /// Reads the next chunk's length header.
    fn next_chunk(&mut self) -> io::Result<()> {
        debug_assert_eq!(self.chunk_bytes, 0);
        debug_assert!(!self.last);

        match BodyLength::parse_new_format(&mut *self.reader) {
            Ok(BodyLength::Full(l)) => {
                self.chunk_bytes = l;
                self.last = true;
                Ok(())
            }
            Ok(BodyLength::Partial(l)) => {
                self.chunk_bytes = l;
                Ok(())
            }
            Ok(BodyLength::Indeterminate) => unreachable!(
                "new format lengths are never indeterminate"),
            Err(e) => Err(match e.downcast::<io::Error>() {
                Ok(e) => e,
                Err(e) => io::Error::new(io::ErrorKind::InvalidData,
                                         e.to_string()),
            }),
        }
    }

    fn data_helper(&mut self, amount: usize, hard: bool, and_consume: bool)
                   -> io::Result<&[u8]> {
        if self.buffered().len() < amount
            && !(self.last && self.chunk_bytes == 0)
        {
            // Refill: keep the unconsumed leftover and append data
            // from the chunk chain.
            let mut buf = Vec::with_capacity(amount);
            buf.extend_from_slice(self.buffered());
            self.buffer = None;
            self.cursor = 0;

            let mut error = None;
            while buf.len() < amount {
                if self.chunk_bytes == 0 {
                    if self.last {
                        break;
                    }
                    if let Err(e) = self.next_chunk() {
                        error = Some(e);
                        break;
                    }
                    continue;
                }

                let want = cmp::min(self.chunk_bytes as usize,
                                    amount - buf.len());
                match self.reader.data(want) {
                    Ok(data) if data.is_empty() => {
                        // Truncated mid-chunk.
                        error = Some(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "truncated partial body"));
                        break;
                    }
                    Ok(data) => {
                        let got = cmp::min(data.len(), want);
                        buf.extend_from_slice(&data[..got]);
                        self.reader.consume(got);
                        self.chunk_bytes -= got as u32;
                    }
                    Err(e) => {
                        error = Some(e);
                        break;
                    }
                }
            }

            self.buffer = Some(buf.into_boxed_slice());

            if let Some(e) = error {
                if self.buffered().len() < amount {
                    return Err(e);
                }
            }
        }

        let buffered = self.buffered().len();
        if hard && buffered < amount {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof,
                                      "unexpected EOF in partial body"));
        }
        if and_consume {
            let n = cmp::min(amount, buffered);
            self.cursor += n;
            match self.buffer {
                Some(ref buffer) => Ok(&buffer[self.cursor - n..]),
                None => Ok(&b""[..]),
            }
        } else {
            Ok(self.buffered())
        }
    }
}

impl<'a> io::Read for PartialBodyReader<'a> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        buffered_reader::buffered_reader_generic_read_impl(self, buf)
    }
}

impl<'a> BufferedReader<()> for PartialBodyReader<'a> {
    fn buffer(&self) -> &[u8] {
        self.buffered()
    }

    fn data(&mut self, amount: usize) -> io::Result<&[u8]> {
        self.data_helper(amount, false, false)
    }

    fn data_hard(&mut self, amount: usize) -> io::Result<&[u8]> {
        self.data_helper(amount, true, false)
    }

    fn consume(&mut self, amount: usize) -> &[u8] {
        assert!(amount <= self.buffered().len(),
                "consuming more than buffered; call data() first");
        self.cursor += amount;
        match self.buffer {
            Some(ref buffer) => &buffer[self.cursor - amount..],
            None => &b""[..],
        }
    }

    fn data_consume(&mut self, amount: usize) -> io::Result<&[u8]> {
        self.data_helper(amount, false, true)
    }

    fn data_consume_hard(&mut self, amount: usize) -> io::Result<&[u8]> {
        self.data_helper(amount, true, true)
    }

    fn get_mut(&mut self) -> Option<&mut dyn BufferedReader<()>> {
        Some(&mut *self.reader)
    }

    fn get_ref(&self) -> Option<&dyn BufferedReader<()>> {
        Some(&*self.reader)
    }

    fn into_inner<'b>(self: Box<Self>)
                      -> Option<Box<dyn BufferedReader<()> + 'b>>
    where
        Self: 'b,
    {
        Some(self.reader)
    }

    fn cookie_set(&mut self, cookie: ()) {
        self.cookie = cookie;
    }

    fn cookie_ref(&self) -> &() {
        &self.cookie
    }

    fn cookie_mut(&mut self) -> &mut () {
        &mut self.cookie
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Assembles a partial body stream: chunks of the given sizes
    // (all but the last must be powers of two), then `trailing`
    // following the packet.
    fn stream(chunks: &[&[u8]], trailing: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let length = if i + 1 == chunks.len() {
                BodyLength::Full(chunk.len() as u32)
            } else {
                BodyLength::Partial(chunk.len() as u32)
            };
            // The first chunk's header is parsed by the packet
            // header parser, not the filter.
            if i > 0 {
                length.serialize_new_format(&mut out).unwrap();
            }
            out.extend_from_slice(chunk);
        }
        out.extend_from_slice(trailing);
        out
    }

    #[test]
    fn reassembles_chunks() {
        let data = stream(&[&[1u8; 16], &[2u8; 4], &[3u8; 3]], b"rest");
        let inner = Box::new(buffered_reader::Memory::with_cookie(&data, ()));
        let mut reader = PartialBodyReader::new(inner, 16);

        let body = reader.steal_eof().unwrap();
        assert_eq!(body.len(), 23);
        assert_eq!(&body[..16], &[1u8; 16][..]);
        assert_eq!(&body[16..20], &[2u8; 4][..]);
        assert_eq!(&body[20..], &[3u8; 3][..]);

        // The bytes after the final chunk stay in the inner reader.
        let mut inner = Box::new(reader).into_inner().unwrap();
        assert_eq!(inner.steal_eof().unwrap(), b"rest");
    }

    #[test]
    fn zero_length_final_chunk() {
        let data = stream(&[&[9u8; 2], &[]], b"x");
        let inner = Box::new(buffered_reader::Memory::with_cookie(&data, ()));
        let mut reader = PartialBodyReader::new(inner, 2);
        assert_eq!(reader.steal_eof().unwrap(), &[9u8; 2][..]);
    }

    #[test]
    fn truncation_is_an_io_error() {
        // Promises 16 bytes, delivers 5.
        let data = [0u8; 5];
        let inner = Box::new(buffered_reader::Memory::with_cookie(&data, ()));
        let mut reader = PartialBodyReader::new(inner, 16);
        assert!(reader.data_hard(16).is_err());
    }
}
