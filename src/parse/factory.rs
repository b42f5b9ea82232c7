//! The packet object factory.
//!
//! [`ObjectFactory`] turns a flat packet stream into typed objects:
//! complete key rings, signature lists, and the streaming containers.
//! Grouping is tag driven: the factory looks one packet ahead to
//! decide where a run ends, never at counts.

use std::io;
use std::io::Read;

use buffered_reader::BufferedReader;

use crate::Error;
use crate::Result;
use crate::crypto::engines::FingerprintCalculator;
use crate::encrypted::{EncryptedDataList, Esk};
use crate::key::{
    BoundSignature, IdentityPacket, PublicKey, SecretKey, UserIdentity,
};
use crate::keyring::{PublicKeyRing, SecretKeyRing};
use crate::packet::{
    CompressedData, Literal, OnePassSig, Packet, Signature, Tag, Trust,
};
use crate::parse::PacketReader;
use crate::types::{CompressionAlgorithm, DataFormat};

// Enables tracing for this module.
const TRACE: bool = false;

/// A run of consecutive signature packets.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct SignatureList {
    sigs: Vec<Signature>,
}

impl SignatureList {
    /// Returns the signatures in stream order.
    pub fn signatures(&self) -> &[Signature] {
        &self.sigs
    }

    /// Consumes the list.
    pub fn into_vec(self) -> Vec<Signature> {
        self.sigs
    }
}

/// A run of consecutive one-pass signature packets.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct OnePassSignatureList {
    sigs: Vec<OnePassSig>,
}

impl OnePassSignatureList {
    /// Returns the one-pass signatures in stream order.
    pub fn signatures(&self) -> &[OnePassSig] {
        &self.sigs
    }

    /// Consumes the list.
    pub fn into_vec(self) -> Vec<OnePassSig> {
        self.sigs
    }
}

/// One object read from a packet stream.
///
/// The streaming variants borrow the factory; the factory can only
/// continue once they are finished or dropped.
pub enum Object<'f, 'a> {
    /// A complete public key ring.
    PublicKeyRing(PublicKeyRing),
    /// A complete secret key ring.
    SecretKeyRing(SecretKeyRing),
    /// A run of signature packets.
    SignatureList(SignatureList),
    /// A run of one-pass signature packets.
    OnePassSignatureList(OnePassSignatureList),
    /// A literal data packet with its streamed content.
    Literal(LiteralData<'f, 'a>),
    /// A compressed data packet with its streamed content.
    CompressedData(CompressedDataReader<'f, 'a>),
    /// Encrypted session keys and their encrypted container.
    EncryptedDataList(EncryptedDataList<'f, 'a>),
}

/// Reads typed objects off a packet stream.
pub struct ObjectFactory<'a> {
    pub(crate) reader: PacketReader<'a>,
    pub(crate) calculator: &'a dyn FingerprintCalculator,
}

impl<'a> ObjectFactory<'a> {
    /// Creates a factory over a `BufferedReader` stack.
    pub fn from_buffered_reader(reader: Box<dyn BufferedReader<()> + 'a>,
                                calculator: &'a dyn FingerprintCalculator)
                                -> Self {
        ObjectFactory {
            reader: PacketReader::from_buffered_reader(reader),
            calculator,
        }
    }

    /// Creates a factory over a byte slice.
    pub fn from_bytes(bytes: &'a [u8],
                      calculator: &'a dyn FingerprintCalculator) -> Self {
        ObjectFactory {
            reader: PacketReader::from_bytes(bytes),
            calculator,
        }
    }

    /// Creates a factory over an `io::Read`er.
    pub fn from_reader<R>(reader: R,
                          calculator: &'a dyn FingerprintCalculator) -> Self
    where
        R: io::Read + Send + Sync + 'a,
    {
        ObjectFactory {
            reader: PacketReader::from_reader(reader),
            calculator,
        }
    }

    /// Reads the next object, or `None` at the end of the stream.
    ///
    /// Marker packets are skipped.  An unexpected packet at the top
    /// level fails with [`Error::MalformedMessage`]; an
    /// uninterpretable tag with [`Error::UnknownPacketTag`].
    ///
    ///   [`Error::MalformedMessage`]: crate::Error::MalformedMessage
    ///   [`Error::UnknownPacketTag`]: crate::Error::UnknownPacketTag
    pub fn read_object(&mut self) -> Result<Option<Object<'_, 'a>>> {
        tracer!(TRACE, "ObjectFactory::read_object");
        loop {
            let tag = match self.reader.peek_tag()? {
                Some(tag) => tag,
                None => return Ok(None),
            };
            t!("next object starts with {}", tag);

            return match tag {
                Tag::Marker => {
                    self.reader.read_packet()?;
                    continue;
                }
                Tag::PublicKey =>
                    Ok(Some(Object::PublicKeyRing(self.read_public_ring()?))),
                Tag::SecretKey =>
                    Ok(Some(Object::SecretKeyRing(self.read_secret_ring()?))),
                Tag::Signature => {
                    let mut sigs = Vec::new();
                    while self.reader.peek_tag()? == Some(Tag::Signature) {
                        sigs.push(self.expect_signature()?);
                    }
                    Ok(Some(Object::SignatureList(SignatureList { sigs })))
                }
                Tag::OnePassSig => {
                    let mut sigs = Vec::new();
                    while self.reader.peek_tag()? == Some(Tag::OnePassSig) {
                        match self.reader.read_packet()? {
                            Some(Packet::OnePassSig(ops)) => sigs.push(ops),
                            _ => unreachable!("peeked tag"),
                        }
                    }
                    Ok(Some(Object::OnePassSignatureList(
                        OnePassSignatureList { sigs })))
                }
                Tag::SKESK | Tag::PKESK | Tag::SEIP | Tag::SED =>
                    Ok(Some(Object::EncryptedDataList(
                        self.read_encrypted()?))),
                Tag::Literal => {
                    let header = self.reader.push_body()?
                        .expect("peeked tag");
                    let packet = Literal::parse_header(
                        self.reader.body_reader(), header.ctb.is_old())?;
                    Ok(Some(Object::Literal(LiteralData {
                        packet,
                        factory: self,
                    })))
                }
                Tag::CompressedData => {
                    let header = self.reader.push_body()?
                        .expect("peeked tag");
                    let packet = CompressedData::parse_header(
                        self.reader.body_reader(), header.ctb.is_old())?;
                    Ok(Some(Object::CompressedData(CompressedDataReader {
                        packet,
                        factory: self,
                    })))
                }
                Tag::Private(_) | Tag::Unknown(_) =>
                    Err(Error::UnknownPacketTag(tag).into()),
                tag =>
                    Err(Error::MalformedMessage(
                        format!("unexpected {} at the top level", tag))
                        .into()),
            };
        }
    }

    fn expect_signature(&mut self) -> Result<Signature> {
        match self.reader.read_packet()? {
            Some(Packet::Signature(sig)) => Ok(sig),
            _ => unreachable!("peeked tag"),
        }
    }

    fn read_optional_trust(&mut self) -> Result<Option<Trust>> {
        if self.reader.peek_tag()? == Some(Tag::Trust) {
            match self.reader.read_packet()? {
                Some(Packet::Trust(trust)) => Ok(Some(trust)),
                _ => unreachable!("peeked tag"),
            }
        } else {
            Ok(None)
        }
    }

    /// Reads a run of signatures, each with its optional trust
    /// packet.
    fn read_bound_signatures(&mut self) -> Result<Vec<BoundSignature>> {
        let mut sigs = Vec::new();
        while self.reader.peek_tag()? == Some(Tag::Signature) {
            let sig = self.expect_signature()?;
            let trust = self.read_optional_trust()?;
            sigs.push(BoundSignature::with_trust(sig, trust));
        }
        Ok(sigs)
    }

    fn expect_key(&mut self) -> Result<crate::packet::Key> {
        match self.reader.read_packet()? {
            Some(Packet::Key(key)) => Ok(key),
            _ => unreachable!("peeked tag"),
        }
    }

    /// Reads one master key with everything hanging off it: the
    /// optional trust packet, the direct certifications, the
    /// identities with their certification runs, and the trailing
    /// subkeys.
    fn read_keys(&mut self, subkey_tag: Tag) -> Result<Vec<PublicKey>> {
        let packet = self.expect_key()?;
        let trust = self.read_optional_trust()?;
        let direct = self.read_bound_signatures()?;

        let mut identities = Vec::new();
        loop {
            let id: IdentityPacket = match self.reader.peek_tag()? {
                Some(Tag::UserID) => match self.reader.read_packet()? {
                    Some(Packet::UserID(id)) => id.into(),
                    _ => unreachable!("peeked tag"),
                },
                Some(Tag::UserAttribute) =>
                    match self.reader.read_packet()? {
                        Some(Packet::UserAttribute(ua)) => ua.into(),
                        _ => unreachable!("peeked tag"),
                    },
                _ => break,
            };
            let trust = self.read_optional_trust()?;
            let certifications = self.read_bound_signatures()?;
            identities.push(UserIdentity::new(id, trust, certifications));
        }

        let mut keys = vec![PublicKey::from_parts(
            packet, trust, direct, identities, self.calculator)?];

        while self.reader.peek_tag()? == Some(subkey_tag) {
            let packet = self.expect_key()?;
            let trust = self.read_optional_trust()?;
            let sub_sigs = self.read_bound_signatures()?;
            keys.push(PublicKey::subkey_from_parts(
                packet, trust, sub_sigs, self.calculator)?);
        }

        Ok(keys)
    }

    fn read_public_ring(&mut self) -> Result<PublicKeyRing> {
        PublicKeyRing::new(self.read_keys(Tag::PublicSubkey)?)
    }

    fn read_secret_ring(&mut self) -> Result<SecretKeyRing> {
        let keys = self.read_keys(Tag::SecretSubkey)?
            .into_iter()
            .map(SecretKey::new)
            .collect::<Result<Vec<_>>>()?;
        SecretKeyRing::new(keys)
    }

    /// Reads the encrypted session key run and positions the reader
    /// at the container's ciphertext.
    fn read_encrypted(&mut self) -> Result<EncryptedDataList<'_, 'a>> {
        let mut methods = Vec::new();
        loop {
            match self.reader.peek_tag()? {
                Some(Tag::SKESK) => match self.reader.read_packet()? {
                    Some(Packet::SKESK(p)) => methods.push(Esk::Skesk(p)),
                    _ => unreachable!("peeked tag"),
                },
                Some(Tag::PKESK) => match self.reader.read_packet()? {
                    Some(Packet::PKESK(p)) => methods.push(Esk::Pkesk(p)),
                    _ => unreachable!("peeked tag"),
                },
                _ => break,
            }
        }

        let integrity = match self.reader.peek_tag()? {
            Some(Tag::SEIP) => {
                let header = self.reader.push_body()?.expect("peeked tag");
                crate::packet::SEIP::parse_header(
                    self.reader.body_reader(), header.ctb.is_old())?;
                true
            }
            Some(Tag::SED) => {
                self.reader.push_body()?.expect("peeked tag");
                false
            }
            _ => return Err(Error::MalformedMessage(
                "encrypted session keys without an encrypted \
                 container".into()).into()),
        };

        Ok(EncryptedDataList::new(self, methods, integrity))
    }
}

/// A literal data packet whose content is read off the stream.
///
/// Reading past the end of the packet yields EOF; [`finish`] (or
/// dropping the object) returns control to the factory, which skips
/// any unread content.
///
///   [`finish`]: LiteralData::finish
pub struct LiteralData<'f, 'a> {
    packet: Literal,
    factory: &'f mut ObjectFactory<'a>,
}

impl<'f, 'a> LiteralData<'f, 'a> {
    /// Returns the format hint.
    pub fn format(&self) -> DataFormat {
        self.packet.format()
    }

    /// Returns the filename hint.
    pub fn filename(&self) -> &[u8] {
        self.packet.filename()
    }

    /// Returns the date hint.
    pub fn date(&self) -> u32 {
        self.packet.date()
    }

    /// Skips any unread content and releases the factory.
    pub fn finish(self) -> Result<()> {
        self.factory.reader.pop_body()
    }
}

impl<'f, 'a> io::Read for LiteralData<'f, 'a> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.factory.reader.body_reader().read(buf)
    }
}

/// An `io::Read`er yielding one extra zero octet at the end of its
/// input.
///
/// Raw deflate ("nowrap") inflaters may request input past the
/// logical end of the compressed stream; the pad keeps such a read
/// from turning into a spurious EOF error.
struct ZeroPad<R: io::Read> {
    inner: R,
    padded: bool,
}

impl<R: io::Read> ZeroPad<R> {
    fn new(inner: R) -> Self {
        ZeroPad { inner, padded: false }
    }
}

impl<R: io::Read> io::Read for ZeroPad<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.inner.read(buf)? {
            0 if !self.padded => {
                self.padded = true;
                buf[0] = 0;
                Ok(1)
            }
            n => Ok(n),
        }
    }
}

/// A compressed data packet whose decompressed content is exposed as
/// a nested packet stream.
pub struct CompressedDataReader<'f, 'a> {
    packet: CompressedData,
    factory: &'f mut ObjectFactory<'a>,
}

impl<'f, 'a> CompressedDataReader<'f, 'a> {
    /// Returns the compression algorithm.
    pub fn algo(&self) -> CompressionAlgorithm {
        self.packet.algo()
    }

    /// Returns a factory over the decompressed content.
    pub fn data_stream(&mut self) -> Result<ObjectFactory<'_>> {
        let calculator = self.factory.calculator;
        let algo = self.packet.algo();
        let body = self.factory.reader.body_reader();

        let reader: Box<dyn BufferedReader<()> + '_> = match algo {
            CompressionAlgorithm::Uncompressed =>
                Box::new(buffered_reader::Generic::with_cookie(
                    body, None, ())),
            #[cfg(feature = "compression-deflate")]
            CompressionAlgorithm::Zip =>
                Box::new(buffered_reader::Generic::with_cookie(
                    flate2::read::DeflateDecoder::new(ZeroPad::new(body)),
                    None, ())),
            #[cfg(feature = "compression-deflate")]
            CompressionAlgorithm::Zlib =>
                Box::new(buffered_reader::Generic::with_cookie(
                    flate2::read::ZlibDecoder::new(body), None, ())),
            #[cfg(feature = "compression-bzip2")]
            CompressionAlgorithm::BZip2 =>
                Box::new(buffered_reader::Generic::with_cookie(
                    bzip2::read::BzDecoder::new(body), None, ())),
            algo => return Err(
                Error::UnsupportedCompressionAlgorithm(algo).into()),
        };

        Ok(ObjectFactory {
            reader: PacketReader::from_buffered_reader(reader),
            calculator,
        })
    }

    /// Skips any unread content and releases the factory.
    pub fn finish(self) -> Result<()> {
        self.factory.reader.pop_body()
    }
}
