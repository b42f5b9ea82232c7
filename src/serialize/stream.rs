//! Streaming packet generators.
//!
//! The generators frame literal, compressed, and encrypted data
//! packets around a caller-supplied sink.  Each hands back a writer;
//! closing it via `finish()` flushes the protocol trailers (final
//! partial chunk, compressor finish, MDC) and returns the sink.  The
//! sink itself is never closed.
//!
//! A generator that fails mid-write leaves its sink in an undefined
//! state; the output must be discarded, not retried.

use std::io;
use std::io::Write;

use crate::Error;
use crate::Result;
use crate::crypto::SessionKey;
use crate::crypto::engines::{
    DataEncryptorBuilder, Digest, KeyEncryptionMethodGenerator,
};
use crate::crypto::symmetric::Encryptor;
use crate::packet::header::write_header;
use crate::packet::{BodyLength, Literal, Packet, Tag};
use crate::serialize::Serialize;
use crate::serialize::partial_body::PartialBodyWriter;
use crate::types::CompressionAlgorithm;

/// A `Write`r enforcing the body length declared in the packet
/// header.
struct ExactWriter<W: io::Write> {
    inner: Option<W>,
    remaining: u64,
}

impl<W: io::Write> ExactWriter<W> {
    fn new(inner: W, len: u64) -> Self {
        ExactWriter { inner: Some(inner), remaining: len }
    }

    fn finish(&mut self) -> Result<W> {
        if self.remaining > 0 {
            return Err(Error::InvalidOperation(
                format!("packet closed {} bytes short of its declared \
                         length", self.remaining)).into());
        }
        self.inner.take().ok_or_else(
            || io::Error::new(io::ErrorKind::BrokenPipe,
                              "inner writer was taken").into())
    }
}

impl<W: io::Write> io::Write for ExactWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let inner = self.inner.as_mut().ok_or_else(
            || io::Error::new(io::ErrorKind::BrokenPipe,
                              "inner writer was taken"))?;
        if buf.len() as u64 > self.remaining {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "write exceeds the packet's declared length"));
        }
        inner.write_all(buf)?;
        self.remaining -= buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner {
            Some(ref mut inner) => inner.flush(),
            None => Ok(()),
        }
    }
}

/// The framed body of a streamed packet: a single definite-length
/// packet, or a partial body chunk sequence.
enum Body<W: io::Write> {
    Fixed(ExactWriter<W>),
    Partial(PartialBodyWriter<W>),
}

impl<W: io::Write> Body<W> {
    /// Opens a packet body: the caller either declares the body
    /// length up front or streams through partial chunks.
    fn open(mut sink: W, tag: Tag, length: Option<u64>) -> Result<Self> {
        match length {
            Some(len) => {
                if len > u32::MAX as u64 {
                    return Err(Error::InvalidArgument(
                        "a definite-length packet is limited to 2^32-1 \
                         bytes".into()).into());
                }
                write_header(&mut sink, tag, false,
                             BodyLength::Full(len as u32))?;
                Ok(Body::Fixed(ExactWriter::new(sink, len)))
            }
            None => {
                sink.write_all(&[0b1100_0000 | u8::from(tag)])?;
                Ok(Body::Partial(PartialBodyWriter::new(sink)))
            }
        }
    }

    fn finish(&mut self) -> Result<W> {
        match self {
            Body::Fixed(w) => w.finish(),
            Body::Partial(w) => w.finish(),
        }
    }
}

impl<W: io::Write> io::Write for Body<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Body::Fixed(w) => w.write(buf),
            Body::Partial(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Body::Fixed(w) => w.flush(),
            Body::Partial(w) => w.flush(),
        }
    }
}

/// Writes a literal data packet around a stream of content.
pub struct LiteralDataGenerator<W: io::Write> {
    body: Body<W>,
}

impl<W: io::Write> LiteralDataGenerator<W> {
    /// Opens a literal data packet.
    ///
    /// `length` is the length of the content; `None` streams the
    /// packet as a partial body.
    pub fn new(literal: Literal, sink: W, length: Option<u32>)
               -> Result<Self> {
        let mut body = Body::open(
            sink, Tag::Literal,
            length.map(|l| l as u64 + literal.header_len() as u64))?;
        literal.serialize_header(&mut body)?;
        Ok(LiteralDataGenerator { body })
    }

    /// Finishes the packet and returns the sink.
    pub fn finish(&mut self) -> Result<W> {
        self.body.finish()
    }
}

impl<W: io::Write> io::Write for LiteralDataGenerator<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.body.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.body.flush()
    }
}

enum Compressor<W: io::Write> {
    Uncompressed(Option<W>),
    #[cfg(feature = "compression-deflate")]
    Zip(flate2::write::DeflateEncoder<W>),
    #[cfg(feature = "compression-deflate")]
    Zlib(flate2::write::ZlibEncoder<W>),
    #[cfg(feature = "compression-bzip2")]
    BZip2(bzip2::write::BzEncoder<W>),
}

/// Writes a compressed data packet around a stream of content.
///
/// The packet is always framed as a partial body, since the
/// compressed size is not known up front.
pub struct CompressedDataGenerator<W: io::Write> {
    inner: Compressor<PartialBodyWriter<W>>,
}

impl<W: io::Write> CompressedDataGenerator<W> {
    /// Opens a compressed data packet using `algo`.
    pub fn new(algo: CompressionAlgorithm, mut sink: W) -> Result<Self> {
        sink.write_all(&[0b1100_0000 | u8::from(Tag::CompressedData)])?;
        let mut body = PartialBodyWriter::new(sink);
        body.write_all(&[algo.into()])?;

        let inner = match algo {
            CompressionAlgorithm::Uncompressed =>
                Compressor::Uncompressed(Some(body)),
            #[cfg(feature = "compression-deflate")]
            CompressionAlgorithm::Zip => Compressor::Zip(
                flate2::write::DeflateEncoder::new(
                    body, flate2::Compression::default())),
            #[cfg(feature = "compression-deflate")]
            CompressionAlgorithm::Zlib => Compressor::Zlib(
                flate2::write::ZlibEncoder::new(
                    body, flate2::Compression::default())),
            #[cfg(feature = "compression-bzip2")]
            CompressionAlgorithm::BZip2 => Compressor::BZip2(
                bzip2::write::BzEncoder::new(
                    body, bzip2::Compression::default())),
            algo => return Err(
                Error::UnsupportedCompressionAlgorithm(algo).into()),
        };
        Ok(CompressedDataGenerator { inner })
    }

    /// Finishes the compressor and the packet, returning the sink.
    pub fn finish(&mut self) -> Result<W> {
        let inner = std::mem::replace(
            &mut self.inner, Compressor::Uncompressed(None));
        let mut body = match inner {
            Compressor::Uncompressed(w) => w.ok_or_else(
                || io::Error::new(io::ErrorKind::BrokenPipe,
                                  "inner writer was taken"))?,
            #[cfg(feature = "compression-deflate")]
            Compressor::Zip(w) => w.finish()?,
            #[cfg(feature = "compression-deflate")]
            Compressor::Zlib(w) => w.finish()?,
            #[cfg(feature = "compression-bzip2")]
            Compressor::BZip2(w) => w.finish()?,
        };
        body.finish()
    }
}

impl<W: io::Write> io::Write for CompressedDataGenerator<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.inner {
            Compressor::Uncompressed(w) => match w.as_mut() {
                Some(w) => w.write(buf),
                None => Err(io::Error::new(io::ErrorKind::BrokenPipe,
                                           "inner writer was taken")),
            },
            #[cfg(feature = "compression-deflate")]
            Compressor::Zip(w) => w.write(buf),
            #[cfg(feature = "compression-deflate")]
            Compressor::Zlib(w) => w.write(buf),
            #[cfg(feature = "compression-bzip2")]
            Compressor::BZip2(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            Compressor::Uncompressed(w) => match w.as_mut() {
                Some(w) => w.flush(),
                None => Ok(()),
            },
            #[cfg(feature = "compression-deflate")]
            Compressor::Zip(w) => w.flush(),
            #[cfg(feature = "compression-deflate")]
            Compressor::Zlib(w) => w.flush(),
            #[cfg(feature = "compression-bzip2")]
            Compressor::BZip2(w) => w.flush(),
        }
    }
}

/// Generates an encrypted data packet with its encrypted session key
/// packets.
///
/// Key encryption methods are registered first; [`open`] writes the
/// session key packets, the container header, and the quick-check
/// prefix, and hands back the plaintext writer.
///
///   [`open`]: EncryptedDataGenerator::open
pub struct EncryptedDataGenerator {
    builder: Box<dyn DataEncryptorBuilder>,
    methods: Vec<Box<dyn KeyEncryptionMethodGenerator>>,
    opened: bool,
}

impl EncryptedDataGenerator {
    /// Creates a generator using the given encryptor builder.
    pub fn new(builder: Box<dyn DataEncryptorBuilder>) -> Self {
        EncryptedDataGenerator {
            builder,
            methods: Vec::new(),
            opened: false,
        }
    }

    /// Registers a key encryption method.
    pub fn add_method(&mut self, method: Box<dyn KeyEncryptionMethodGenerator>) {
        self.methods.push(method);
    }

    /// Opens the encrypted container.
    ///
    /// `length` is the plaintext length for a definite-length
    /// packet; `None` streams the ciphertext as power-of-two partial
    /// chunks.
    ///
    /// If exactly one password-based method is registered, the
    /// passphrase-derived key becomes the message key and no session
    /// key is generated; otherwise a fresh session key is wrapped
    /// once per method.
    pub fn open<W: io::Write>(&mut self, mut sink: W, length: Option<u64>)
                              -> Result<EncryptedWriter<W>> {
        if self.opened {
            return Err(Error::InvalidOperation(
                "generator already in open state".into()).into());
        }
        if self.methods.is_empty() {
            return Err(Error::InvalidOperation(
                "no key encryption method has been added".into()).into());
        }
        self.opened = true;

        let algo = self.builder.algorithm();
        let integrity = self.builder.with_integrity_protection();
        let bs = algo.block_size()?;

        let (key, esks) = if self.methods.len() == 1 {
            match self.methods[0].passphrase_derived_key(algo) {
                Some(key) => {
                    let key = key?;
                    let esk = self.methods[0].generate(algo, None)?;
                    (key, vec![esk])
                }
                None => self.generate_session_key(algo)?,
            }
        } else {
            self.generate_session_key(algo)?
        };

        for esk in &esks {
            esk.serialize(&mut sink)?;
        }

        let tag = if integrity { Tag::SEIP } else { Tag::SED };
        // On the wire, a definite-length container also covers the
        // version octet, the quick-check prefix, and the MDC packet.
        let overhead =
            (if integrity { 1 + 22 } else { 0 }) + bs as u64 + 2;
        let mut body =
            Body::open(sink, tag, length.map(|len| len + overhead))?;

        if integrity {
            // Version octet, in the clear.
            body.write_all(&[1])?;
        }

        let mut cipher = self.builder.build(&key)?;
        let mut digest = cipher.take_integrity_digest();

        // The quick-check prefix: a block of random bytes whose last
        // two repeat, giving a reader a cheap wrong-key test.
        let mut prefix = vec![0u8; bs + 2];
        self.builder.random(&mut prefix[..bs])?;
        prefix[bs] = prefix[bs - 2];
        prefix[bs + 1] = prefix[bs - 1];

        if let Some(d) = digest.as_mut() {
            d.update(&prefix);
        }
        let mut ct = prefix;
        cipher.encrypt(&mut ct)?;
        body.write_all(&ct)?;
        if !integrity {
            cipher.resync(&ct[2..])?;
        }

        Ok(EncryptedWriter {
            enc: Encryptor::new(cipher, body),
            digest,
        })
    }

    fn generate_session_key(&self, algo: crate::SymmetricAlgorithm)
                            -> Result<(SessionKey, Vec<Packet>)> {
        let mut key = vec![0u8; algo.key_size()?];
        self.builder.random(&mut key)?;
        let key: SessionKey = key.into();

        let esks = self.methods.iter()
            .map(|m| m.generate(algo, Some(&key)))
            .collect::<Result<Vec<_>>>()?;
        Ok((key, esks))
    }
}

/// The plaintext writer handed out by [`EncryptedDataGenerator`].
pub struct EncryptedWriter<W: io::Write> {
    enc: Encryptor<Body<W>>,
    digest: Option<Box<dyn Digest>>,
}

impl<W: io::Write> EncryptedWriter<W> {
    /// Writes the integrity trailer and the framing trailer, and
    /// returns the sink.
    pub fn finish(&mut self) -> Result<W> {
        if let Some(mut digest) = self.digest.take() {
            // The digest covers the MDC packet's own header.
            digest.update(&[0xd3, 0x14]);
            let mut mdc = vec![0xd3, 0x14];
            mdc.resize(22, 0);
            digest.digest(&mut mdc[2..])?;
            self.enc.write_all(&mdc)?;
        }
        self.enc.finish()?.finish()
    }
}

impl<W: io::Write> io::Write for EncryptedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.enc.write_all(buf)?;
        if let Some(d) = self.digest.as_mut() {
            d.update(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.enc.flush()
    }
}
