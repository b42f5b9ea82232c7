//! Signature packets.
//!
//! See [Section 5.2 of RFC 4880] for details.
//!
//!   [Section 5.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2

use std::fmt;
use std::io::Write;

use buffered_reader::BufferedReader;

use crate::Error;
use crate::KeyID;
use crate::Result;
use crate::crypto::mpi;
use crate::packet::subpacket::{SubpacketArea, SubpacketTag, SubpacketValue};
use crate::types::{HashAlgorithm, PublicKeyAlgorithm, SignatureType};

/// A signature packet.
///
/// Two incompatible wire versions are in circulation; version 4 is
/// the current one, version 3 is long obsolete but still found on old
/// keys.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Signature {
    /// A version 3 signature.
    V3(Signature3),
    /// A version 4 signature.
    V4(Signature4),
}

impl Signature {
    /// Returns the version of the signature packet.
    pub fn version(&self) -> u8 {
        match self {
            Signature::V3(_) => 3,
            Signature::V4(_) => 4,
        }
    }

    /// Returns the signature type.
    pub fn sig_type(&self) -> SignatureType {
        match self {
            Signature::V3(s) => s.sig_type,
            Signature::V4(s) => s.sig_type,
        }
    }

    /// Returns the public key algorithm.
    pub fn pk_algo(&self) -> PublicKeyAlgorithm {
        match self {
            Signature::V3(s) => s.pk_algo,
            Signature::V4(s) => s.pk_algo,
        }
    }

    /// Returns the hash algorithm.
    pub fn hash_algo(&self) -> HashAlgorithm {
        match self {
            Signature::V3(s) => s.hash_algo,
            Signature::V4(s) => s.hash_algo,
        }
    }

    /// Returns the left two bytes of the hash.
    pub fn hash_prefix(&self) -> &[u8; 2] {
        match self {
            Signature::V3(s) => &s.hash_prefix,
            Signature::V4(s) => &s.hash_prefix,
        }
    }

    /// Returns the algorithm-specific signature value.
    pub fn mpis(&self) -> &mpi::Signature {
        match self {
            Signature::V3(s) => &s.mpis,
            Signature::V4(s) => &s.mpis,
        }
    }

    /// Returns the issuer's key ID, if known.
    ///
    /// For version 4 signatures, the hashed subpacket area is
    /// consulted before the unhashed one.
    pub fn issuer(&self) -> Option<KeyID> {
        match self {
            Signature::V3(s) => Some(s.issuer.clone()),
            Signature::V4(s) =>
                s.hashed_area.lookup(SubpacketTag::Issuer)
                .or_else(|| s.unhashed_area.lookup(SubpacketTag::Issuer))
                .and_then(|sp| match sp.value() {
                    SubpacketValue::Issuer(id) => Some(id.clone()),
                    _ => None,
                }),
        }
    }

    /// Returns the time the signature was made, in seconds since the
    /// epoch, if known.
    pub fn creation_time(&self) -> Option<u32> {
        match self {
            Signature::V3(s) => Some(s.creation_time),
            Signature::V4(s) =>
                s.hashed_area.lookup(SubpacketTag::SignatureCreationTime)
                .and_then(|sp| match sp.value() {
                    SubpacketValue::SignatureCreationTime(t) => Some(*t),
                    _ => None,
                }),
        }
    }

    /// Returns the key expiration period from the hashed area, if
    /// present.
    pub fn key_expiration_time(&self) -> Option<u32> {
        match self {
            Signature::V3(_) => None,
            Signature::V4(s) =>
                s.hashed_area.lookup(SubpacketTag::KeyExpirationTime)
                .and_then(|sp| match sp.value() {
                    SubpacketValue::KeyExpirationTime(t) => Some(*t),
                    _ => None,
                }),
        }
    }

    /// Returns the trailer that is appended to the hashed content
    /// when computing or checking this signature.
    ///
    /// The bytes are hash input and must match the wire encoding
    /// exactly; they are taken from the signature, never recomputed.
    pub(crate) fn trailer(&self) -> Result<Vec<u8>> {
        match self {
            Signature::V3(s) => Ok(v3_trailer(s.sig_type, s.creation_time)
                                   .to_vec()),
            Signature::V4(s) => v4_trailer(s.sig_type, s.pk_algo,
                                           s.hash_algo, &s.hashed_area),
        }
    }

    /// Whether this packet was read from an old format header.
    pub(crate) fn old_ctb(&self) -> bool {
        match self {
            Signature::V3(s) => s.old_ctb,
            Signature::V4(s) => s.old_ctb,
        }
    }

    /// Parses a signature packet body from `reader`.
    pub(crate) fn parse(reader: &mut dyn BufferedReader<()>)
                        -> Result<Self> {
        Self::parse_with_ctb(reader, false)
    }

    pub(crate) fn parse_with_ctb(reader: &mut dyn BufferedReader<()>,
                                 old_ctb: bool) -> Result<Self> {
        match reader.data_consume_hard(1)?[0] {
            3 => Signature3::parse(reader, old_ctb).map(Signature::V3),
            4 => Signature4::parse(reader, old_ctb).map(Signature::V4),
            v => Err(Error::MalformedPacket(
                format!("Unsupported signature version {}", v)).into()),
        }
    }

    /// Serializes the packet body to `w`.
    pub(crate) fn serialize_body(&self, w: &mut dyn Write) -> Result<()> {
        match self {
            Signature::V3(s) => s.serialize_body(w),
            Signature::V4(s) => s.serialize_body(w),
        }
    }
}

/// A version 4 signature packet.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Signature4 {
    pub(crate) old_ctb: bool,
    sig_type: SignatureType,
    pk_algo: PublicKeyAlgorithm,
    hash_algo: HashAlgorithm,
    hashed_area: SubpacketArea,
    unhashed_area: SubpacketArea,
    hash_prefix: [u8; 2],
    mpis: mpi::Signature,
}

impl fmt::Debug for Signature4 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Signature4")
            .field("sig_type", &self.sig_type)
            .field("pk_algo", &self.pk_algo)
            .field("hash_algo", &self.hash_algo)
            .field("hashed_area", &self.hashed_area)
            .field("unhashed_area", &self.unhashed_area)
            .field("hash_prefix",
                   &crate::fmt::to_hex(&self.hash_prefix, false))
            .field("mpis", &self.mpis)
            .finish()
    }
}

impl Signature4 {
    /// Creates a new version 4 signature packet.
    pub fn new(sig_type: SignatureType, pk_algo: PublicKeyAlgorithm,
               hash_algo: HashAlgorithm, hashed_area: SubpacketArea,
               unhashed_area: SubpacketArea, hash_prefix: [u8; 2],
               mpis: mpi::Signature) -> Self {
        Signature4 {
            old_ctb: false,
            sig_type, pk_algo, hash_algo,
            hashed_area, unhashed_area,
            hash_prefix, mpis,
        }
    }

    /// Returns the signature type.
    pub fn sig_type(&self) -> SignatureType {
        self.sig_type
    }

    /// Returns the hashed subpacket area.
    pub fn hashed_area(&self) -> &SubpacketArea {
        &self.hashed_area
    }

    /// Returns the unhashed subpacket area.
    pub fn unhashed_area(&self) -> &SubpacketArea {
        &self.unhashed_area
    }

    fn parse(reader: &mut dyn BufferedReader<()>, old_ctb: bool)
             -> Result<Self> {
        let header = reader.data_consume_hard(3)?;
        let sig_type = header[0].into();
        let pk_algo = header[1].into();
        let hash_algo = header[2].into();

        let hashed_len = reader.read_be_u16()? as usize;
        let hashed_area = SubpacketArea::parse(reader, hashed_len)?;
        let unhashed_len = reader.read_be_u16()? as usize;
        let unhashed_area = SubpacketArea::parse(reader, unhashed_len)?;

        let mut hash_prefix = [0u8; 2];
        hash_prefix.copy_from_slice(reader.data_consume_hard(2)?);

        let mpis = mpi::Signature::parse(pk_algo, reader)?;

        Ok(Signature4 {
            old_ctb,
            sig_type, pk_algo, hash_algo,
            hashed_area, unhashed_area,
            hash_prefix, mpis,
        })
    }

    fn serialize_body(&self, w: &mut dyn Write) -> Result<()> {
        w.write_all(&[4, self.sig_type.into(), self.pk_algo.into(),
                      self.hash_algo.into()])?;

        w.write_all(&(self.hashed_area.serialized_len() as u16)
                    .to_be_bytes())?;
        self.hashed_area.serialize(w)?;
        w.write_all(&(self.unhashed_area.serialized_len() as u16)
                    .to_be_bytes())?;
        self.unhashed_area.serialize(w)?;

        w.write_all(&self.hash_prefix)?;
        self.mpis.serialize(w)?;
        Ok(())
    }
}

/// A version 3 signature packet.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Signature3 {
    pub(crate) old_ctb: bool,
    sig_type: SignatureType,
    creation_time: u32,
    issuer: KeyID,
    pk_algo: PublicKeyAlgorithm,
    hash_algo: HashAlgorithm,
    hash_prefix: [u8; 2],
    mpis: mpi::Signature,
}

impl Signature3 {
    /// Creates a new version 3 signature packet.
    pub fn new(sig_type: SignatureType, creation_time: u32, issuer: KeyID,
               pk_algo: PublicKeyAlgorithm, hash_algo: HashAlgorithm,
               hash_prefix: [u8; 2], mpis: mpi::Signature) -> Self {
        Signature3 {
            old_ctb: false,
            sig_type, creation_time, issuer,
            pk_algo, hash_algo,
            hash_prefix, mpis,
        }
    }

    /// Returns the signature type.
    pub fn sig_type(&self) -> SignatureType {
        self.sig_type
    }

    /// Returns the time the signature was made.
    pub fn creation_time(&self) -> u32 {
        self.creation_time
    }

    /// Returns the issuer's key ID.
    pub fn issuer(&self) -> &KeyID {
        &self.issuer
    }

    fn parse(reader: &mut dyn BufferedReader<()>, old_ctb: bool)
             -> Result<Self> {
        // The length of the hashed material is fixed in version 3.
        let len = reader.data_consume_hard(1)?[0];
        if len != 5 {
            return Err(Error::MalformedPacket(
                format!("Hashed material must be 5 bytes, got {}", len))
                .into());
        }

        let sig_type = reader.data_consume_hard(1)?[0].into();
        let creation_time = reader.read_be_u32()?;
        let issuer = KeyID::from_bytes(reader.data_consume_hard(8)?);
        let pk_algo: PublicKeyAlgorithm =
            reader.data_consume_hard(1)?[0].into();
        let hash_algo = reader.data_consume_hard(1)?[0].into();

        let mut hash_prefix = [0u8; 2];
        hash_prefix.copy_from_slice(reader.data_consume_hard(2)?);

        let mpis = mpi::Signature::parse(pk_algo, reader)?;

        Ok(Signature3 {
            old_ctb,
            sig_type, creation_time, issuer,
            pk_algo, hash_algo,
            hash_prefix, mpis,
        })
    }

    fn serialize_body(&self, w: &mut dyn Write) -> Result<()> {
        w.write_all(&[3, 5, self.sig_type.into()])?;
        w.write_all(&self.creation_time.to_be_bytes())?;
        w.write_all(self.issuer.as_bytes())?;
        w.write_all(&[self.pk_algo.into(), self.hash_algo.into()])?;
        w.write_all(&self.hash_prefix)?;
        self.mpis.serialize(w)?;
        Ok(())
    }
}

/// Computes the version 4 signature trailer.
///
/// The trailer is the hashed signature data (version through the
/// hashed subpacket area) followed by `0x04 0xFF` and the length of
/// that data.  It is appended to the hashed content when a signature
/// is computed, so it must match the wire encoding bit for bit.
pub(crate) fn v4_trailer(sig_type: SignatureType,
                         pk_algo: PublicKeyAlgorithm,
                         hash_algo: HashAlgorithm,
                         hashed_area: &SubpacketArea) -> Result<Vec<u8>> {
    let mut trailer = vec![
        4, sig_type.into(), pk_algo.into(), hash_algo.into(),
    ];
    trailer.extend_from_slice(
        &(hashed_area.serialized_len() as u16).to_be_bytes());
    hashed_area.serialize(&mut trailer)?;

    let len = trailer.len() as u32;
    trailer.extend_from_slice(&[0x04, 0xff]);
    trailer.extend_from_slice(&len.to_be_bytes());
    Ok(trailer)
}

/// Computes the version 3 signature trailer: the signature type and
/// the creation time.
pub(crate) fn v3_trailer(sig_type: SignatureType, creation_time: u32)
                         -> [u8; 5] {
    let t = creation_time.to_be_bytes();
    [sig_type.into(), t[0], t[1], t[2], t[3]]
}
