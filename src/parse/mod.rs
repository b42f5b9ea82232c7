//! Packet stream parsing.
//!
//! [`PacketReader`] walks a raw packet stream: it parses each
//! header, confines the body behind a limitor or a partial body
//! filter, and dispatches to the packet types' body parsers.
//! [`ObjectFactory`] sits on top and groups packet runs into the
//! higher-level objects.
//!
//! Truncation surfaces as `std::io::Error` at the point of use;
//! structural violations as [`Error::MalformedPacket`].
//!
//!   [`Error::MalformedPacket`]: crate::Error::MalformedPacket

mod factory;
pub(crate) mod partial_body;

pub use self::factory::{
    CompressedDataReader, LiteralData, Object, ObjectFactory,
    OnePassSignatureList, SignatureList,
};

use std::cmp;
use std::fmt;
use std::io;

use buffered_reader::BufferedReader;

use crate::Error;
use crate::Result;
use crate::packet::header::{CTB, Header};

// Enables tracing for this module.
const TRACE: bool = false;
use crate::packet::{
    BodyLength, CompressedData, Key, Literal, Marker, MDC, OnePassSig,
    Packet, PKESK3, SED, SEIP, Signature, SKESK4, Tag, Trust, Unknown,
    UserAttribute, UserID,
};
use self::partial_body::PartialBodyReader;

/// A `BufferedReader` confining a packet body of known length.
///
/// Unlike a generic limitor, popping it returns the inner reader
/// without another layer of boxing, which matters when thousands of
/// packets are read from one stream.
struct LimitedReader<'a> {
    reader: Box<dyn BufferedReader<()> + 'a>,
    remaining: u64,
    cookie: (),
}

impl<'a> fmt::Display for LimitedReader<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("LimitedReader")
    }
}

impl<'a> fmt::Debug for LimitedReader<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("LimitedReader")
            .field("remaining", &self.remaining)
            .finish()
    }
}

impl<'a> LimitedReader<'a> {
    fn new(reader: Box<dyn BufferedReader<()> + 'a>, limit: u64) -> Self {
        LimitedReader { reader, remaining: limit, cookie: () }
    }

    fn data_helper(&mut self, amount: usize, hard: bool, and_consume: bool)
                   -> io::Result<&[u8]> {
        let amount = cmp::min(amount as u64, self.remaining) as usize;

        let available = {
            let data = if hard {
                self.reader.data_hard(amount)?
            } else {
                self.reader.data(amount)?
            };
            cmp::min(data.len() as u64, self.remaining) as usize
        };

        if and_consume {
            let n = cmp::min(amount, available);
            self.remaining -= n as u64;
            Ok(&self.reader.consume(n)[..n])
        } else {
            Ok(&self.reader.buffer()[..available])
        }
    }
}

impl<'a> io::Read for LimitedReader<'a> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        buffered_reader::buffered_reader_generic_read_impl(self, buf)
    }
}

impl<'a> BufferedReader<()> for LimitedReader<'a> {
    fn buffer(&self) -> &[u8] {
        let buf = self.reader.buffer();
        &buf[..cmp::min(buf.len() as u64, self.remaining) as usize]
    }

    fn data(&mut self, amount: usize) -> io::Result<&[u8]> {
        self.data_helper(amount, false, false)
    }

    fn data_hard(&mut self, amount: usize) -> io::Result<&[u8]> {
        if amount as u64 > self.remaining {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof,
                                      "request past the packet boundary"));
        }
        self.data_helper(amount, true, false)
    }

    fn consume(&mut self, amount: usize) -> &[u8] {
        assert!(amount as u64 <= self.remaining);
        self.remaining -= amount as u64;
        &self.reader.consume(amount)[..amount]
    }

    fn data_consume(&mut self, amount: usize) -> io::Result<&[u8]> {
        self.data_helper(amount, false, true)
    }

    fn data_consume_hard(&mut self, amount: usize) -> io::Result<&[u8]> {
        if amount as u64 > self.remaining {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof,
                                      "request past the packet boundary"));
        }
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

/// How the current packet's body is confined.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Framing {
    /// Behind a `LimitedReader`.
    Limited,
    /// Behind a `PartialBodyReader`.
    Partial,
    /// Runs to the end of the input (old format indeterminate
    /// length).
    Bare,
}

/// A sequential reader of framed packets.
pub struct PacketReader<'a> {
    reader: Option<Box<dyn BufferedReader<()> + 'a>>,
    framing: Option<Framing>,
}

impl<'a> PacketReader<'a> {
    /// Creates a reader over a `BufferedReader` stack.
    pub fn from_buffered_reader(reader: Box<dyn BufferedReader<()> + 'a>)
                                -> Self {
        PacketReader { reader: Some(reader), framing: None }
    }

    /// Creates a reader over a byte slice.
    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        Self::from_buffered_reader(
            Box::new(buffered_reader::Memory::with_cookie(bytes, ())))
    }

    /// Creates a reader over an `io::Read`er.
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: io::Read + Send + Sync + 'a,
    {
        Self::from_buffered_reader(
            Box::new(buffered_reader::Generic::with_cookie(
                reader, None, ())))
    }

    /// Returns the tag of the next packet without consuming it, or
    /// `None` at the end of the stream.
    ///
    /// An unconsumed streaming body from the previous packet is
    /// skipped first.
    pub fn peek_tag(&mut self) -> Result<Option<Tag>> {
        self.pop_body()?;
        let reader = self.reader.as_mut().expect("reader stack intact");
        let data = reader.data(1)?;
        if data.is_empty() {
            return Ok(None);
        }
        Ok(Some(CTB::from_ptag(data[0])?.tag()))
    }

    /// Parses the next packet header and confines its body.
    ///
    /// Returns `None` at the end of the stream.  After the body has
    /// been read (or is to be skipped), call [`pop_body`].
    ///
    ///   [`pop_body`]: PacketReader::pop_body
    pub(crate) fn push_body(&mut self) -> Result<Option<Header>> {
        tracer!(TRACE, "PacketReader::push_body");
        self.pop_body()?;
        let mut reader = self.reader.take().expect("reader stack intact");

        if reader.data(1)?.is_empty() {
            self.reader = Some(reader);
            return Ok(None);
        }

        let ctb = CTB::from_ptag(reader.data_consume_hard(1)?[0])?;
        let length = match ctb {
            CTB::New { .. } => BodyLength::parse_new_format(&mut *reader)?,
            CTB::Old { length_type, .. } =>
                BodyLength::parse_old_format(&mut *reader, length_type)?,
        };
        t!("{} ({:?}), {:?}", ctb.tag(), ctb, length);

        match length {
            BodyLength::Full(l) => {
                self.reader =
                    Some(Box::new(LimitedReader::new(reader, l as u64)));
                self.framing = Some(Framing::Limited);
            }
            BodyLength::Partial(l) => {
                self.reader =
                    Some(Box::new(PartialBodyReader::new(reader, l)));
                self.framing = Some(Framing::Partial);
            }
            BodyLength::Indeterminate => {
                self.reader = Some(reader);
                self.framing = Some(Framing::Bare);
            }
        }

        Ok(Some(Header { ctb, length }))
    }

    /// Returns the reader over the current packet's body.
    pub(crate) fn body_reader(&mut self) -> &mut dyn BufferedReader<()> {
        &mut **self.reader.as_mut().expect("reader stack intact")
    }

    /// Skips the rest of the current packet's body and restores the
    /// outer reader.
    pub(crate) fn pop_body(&mut self) -> Result<()> {
        let framing = match self.framing.take() {
            Some(framing) => framing,
            None => return Ok(()),
        };
        let mut reader = self.reader.take().expect("reader stack intact");

        // Drain whatever the body parser left behind.
        loop {
            let n = reader.data(4096)?.len();
            if n == 0 {
                break;
            }
            reader.consume(n);
        }

        self.reader = Some(match framing {
            Framing::Limited | Framing::Partial =>
                reader.into_inner().expect("filters have an inner reader"),
            Framing::Bare => reader,
        });
        Ok(())
    }

    /// Reads the next packet.
    ///
    /// Streaming containers (literal, compressed, encrypted data)
    /// yield their headers; the body is skipped when the next packet
    /// is read.  Returns `None` at the end of the stream.
    pub fn read_packet(&mut self) -> Result<Option<Packet>> {
        let header = match self.push_body()? {
            Some(header) => header,
            None => return Ok(None),
        };

        let tag = header.ctb.tag();
        let old_ctb = header.ctb.is_old();
        let packet: Packet = {
            let reader = self.body_reader();
            match tag {
                Tag::Signature =>
                    Signature::parse_with_ctb(reader, old_ctb)?.into(),
                Tag::OnePassSig =>
                    OnePassSig::parse(reader, old_ctb)?.into(),
                Tag::PublicKey | Tag::SecretKey
                | Tag::PublicSubkey | Tag::SecretSubkey =>
                    Key::parse(reader, tag, old_ctb)?.into(),
                Tag::Marker => Marker::parse(reader, old_ctb)?.into(),
                Tag::Trust => Trust::parse(reader, old_ctb)?.into(),
                Tag::UserID => UserID::parse(reader, old_ctb)?.into(),
                Tag::UserAttribute =>
                    UserAttribute::parse(reader, old_ctb)?.into(),
                Tag::SKESK => SKESK4::parse(reader, old_ctb)?.into(),
                Tag::PKESK => PKESK3::parse(reader, old_ctb)?.into(),
                Tag::MDC => MDC::parse(reader)?.into(),
                Tag::Literal =>
                    Literal::parse_header(reader, old_ctb)?.into(),
                Tag::CompressedData =>
                    CompressedData::parse_header(reader, old_ctb)?.into(),
                Tag::SEIP => SEIP::parse_header(reader, old_ctb)?.into(),
                Tag::SED => {
                    let mut sed = SED::new();
                    sed.old_ctb = old_ctb;
                    sed.into()
                }
                Tag::Reserved =>
                    return Err(Error::MalformedPacket(
                        "the reserved packet tag must not be used".into())
                        .into()),
                Tag::Private(_) | Tag::Unknown(_) =>
                    Packet::Unknown(Unknown::parse(reader, tag, old_ctb)?),
            }
        };

        // Eagerly parsed packets have consumed their whole body;
        // streaming containers are skipped here unless the caller
        // took over the body through the factory.
        match packet {
            Packet::Literal(_) | Packet::CompressedData(_)
            | Packet::SEIP(_) | Packet::SED(_) => (),
            _ => self.pop_body()?,
        }

        Ok(Some(packet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::Serialize;

    #[test]
    fn packet_sequence_roundtrip() {
        let mut stream = Vec::new();
        crate::packet::Marker::new().serialize(&mut stream).unwrap();
        UserID::from("Tom").serialize(&mut stream).unwrap();
        Trust::new(&[1, 2, 3]).serialize(&mut stream).unwrap();

        let mut reader = PacketReader::from_bytes(&stream);
        assert_eq!(reader.peek_tag().unwrap(), Some(Tag::Marker));
        match reader.read_packet().unwrap() {
            Some(Packet::Marker(_)) => (),
            p => panic!("expected a marker, got {:?}", p),
        }
        assert_eq!(reader.peek_tag().unwrap(), Some(Tag::UserID));
        match reader.read_packet().unwrap() {
            Some(Packet::UserID(id)) => assert_eq!(id.value(), b"Tom"),
            p => panic!("expected a user id, got {:?}", p),
        }
        match reader.read_packet().unwrap() {
            Some(Packet::Trust(t)) => assert_eq!(t.value(), &[1, 2, 3]),
            p => panic!("expected a trust packet, got {:?}", p),
        }
        assert!(reader.read_packet().unwrap().is_none());
        assert_eq!(reader.peek_tag().unwrap(), None);
    }

    #[test]
    fn streaming_bodies_are_skipped() {
        // A literal packet with body, followed by a marker.
        let mut stream = Vec::new();
        {
            use std::io::Write;
            let mut gen = crate::serialize::stream::LiteralDataGenerator::new(
                Literal::new(crate::types::DataFormat::Binary),
                &mut stream, None).unwrap();
            gen.write_all(b"some content").unwrap();
            gen.finish().unwrap();
        }
        crate::packet::Marker::new().serialize(&mut stream).unwrap();

        let mut reader = PacketReader::from_bytes(&stream);
        match reader.read_packet().unwrap() {
            Some(Packet::Literal(_)) => (),
            p => panic!("expected a literal, got {:?}", p),
        }
        // The unread body is skipped transparently.
        match reader.read_packet().unwrap() {
            Some(Packet::Marker(_)) => (),
            p => panic!("expected a marker, got {:?}", p),
        }
    }

    #[test]
    fn truncated_packets_error_at_use() {
        // A user id packet promising 10 bytes, delivering 3.
        let stream = [0xcd, 10, b'a', b'b', b'c'];
        let mut reader = PacketReader::from_bytes(&stream);
        assert!(reader.read_packet().is_err());
    }
}
