//! Signature subpackets.
//!
//! Signatures of version 4 carry two bags of typed options, the
//! hashed and the unhashed subpacket areas.  Only the hashed area is
//! covered by the signature.  See [Section 5.2.3.1 of RFC 4880].
//!
//!   [Section 5.2.3.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2.3.1

use std::fmt;
use std::io::Write;

use buffered_reader::BufferedReader;

use crate::Error;
use crate::KeyID;
use crate::Fingerprint;
use crate::Result;
use crate::packet::Signature;
use crate::types::{
    CompressionAlgorithm, HashAlgorithm, PublicKeyAlgorithm,
    SymmetricAlgorithm,
};

#[cfg(test)]
use quickcheck::{Arbitrary, Gen};

/// The subpacket types as defined in [Section 5.2.3.1 of RFC 4880].
///
///   [Section 5.2.3.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2.3.1
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[allow(missing_docs)]
pub enum SubpacketTag {
    SignatureCreationTime,
    SignatureExpirationTime,
    ExportableCertification,
    TrustSignature,
    RegularExpression,
    Revocable,
    KeyExpirationTime,
    PreferredSymmetricAlgorithms,
    RevocationKey,
    Issuer,
    NotationData,
    PreferredHashAlgorithms,
    PreferredCompressionAlgorithms,
    KeyServerPreferences,
    PreferredKeyServer,
    PrimaryUserID,
    PolicyURI,
    KeyFlags,
    SignersUserID,
    ReasonForRevocation,
    Features,
    SignatureTarget,
    EmbeddedSignature,
    IssuerFingerprint,
    /// Private or experimental subpacket tag.
    Private(u8),
    /// Unknown subpacket tag.
    Unknown(u8),
}

impl From<u8> for SubpacketTag {
    fn from(u: u8) -> Self {
        use self::SubpacketTag::*;
        match u {
            2 => SignatureCreationTime,
            3 => SignatureExpirationTime,
            4 => ExportableCertification,
            5 => TrustSignature,
            6 => RegularExpression,
            7 => Revocable,
            9 => KeyExpirationTime,
            11 => PreferredSymmetricAlgorithms,
            12 => RevocationKey,
            16 => Issuer,
            20 => NotationData,
            21 => PreferredHashAlgorithms,
            22 => PreferredCompressionAlgorithms,
            23 => KeyServerPreferences,
            24 => PreferredKeyServer,
            25 => PrimaryUserID,
            26 => PolicyURI,
            27 => KeyFlags,
            28 => SignersUserID,
            29 => ReasonForRevocation,
            30 => Features,
            31 => SignatureTarget,
            32 => EmbeddedSignature,
            33 => IssuerFingerprint,
            100..=110 => Private(u),
            u => Unknown(u),
        }
    }
}

impl From<SubpacketTag> for u8 {
    fn from(t: SubpacketTag) -> u8 {
        use self::SubpacketTag::*;
        match t {
            SignatureCreationTime => 2,
            SignatureExpirationTime => 3,
            ExportableCertification => 4,
            TrustSignature => 5,
            RegularExpression => 6,
            Revocable => 7,
            KeyExpirationTime => 9,
            PreferredSymmetricAlgorithms => 11,
            RevocationKey => 12,
            Issuer => 16,
            NotationData => 20,
            PreferredHashAlgorithms => 21,
            PreferredCompressionAlgorithms => 22,
            KeyServerPreferences => 23,
            PreferredKeyServer => 24,
            PrimaryUserID => 25,
            PolicyURI => 26,
            KeyFlags => 27,
            SignersUserID => 28,
            ReasonForRevocation => 29,
            Features => 30,
            SignatureTarget => 31,
            EmbeddedSignature => 32,
            IssuerFingerprint => 33,
            Private(u) => u,
            Unknown(u) => u,
        }
    }
}

/// The value of a subpacket.
///
/// Times are expressed as seconds since the epoch, durations as
/// seconds.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum SubpacketValue {
    /// The time the signature was made.
    SignatureCreationTime(u32),
    /// The validity period of the signature.
    SignatureExpirationTime(u32),
    /// Whether the certification may be exported.
    ExportableCertification(bool),
    /// A trust signature's depth and amount.
    TrustSignature {
        /// Trust level, or depth.
        level: u8,
        /// Amount of trust.
        trust: u8,
    },
    /// A regular expression limiting the scope of a trust signature.
    ///
    /// The value is kept verbatim, including any trailing NUL.
    RegularExpression(Vec<u8>),
    /// Whether the signature is revocable.
    Revocable(bool),
    /// The validity period of the key.
    KeyExpirationTime(u32),
    /// The symmetric algorithms the key holder prefers.
    PreferredSymmetricAlgorithms(Vec<SymmetricAlgorithm>),
    /// A key authorized to issue revocations for this key.
    RevocationKey {
        /// Class octet; bit 0x80 must be set.
        class: u8,
        /// The revoker key's algorithm.
        pk_algo: PublicKeyAlgorithm,
        /// The revoker key's fingerprint.
        fingerprint: Box<[u8]>,
    },
    /// The key ID of the key issuing the signature.
    Issuer(KeyID),
    /// A notation: a name/value pair.
    NotationData {
        /// Four octets of flags.
        flags: [u8; 4],
        /// The notation's name.
        name: Vec<u8>,
        /// The notation's value.
        value: Vec<u8>,
    },
    /// The hash algorithms the key holder prefers.
    PreferredHashAlgorithms(Vec<HashAlgorithm>),
    /// The compression algorithms the key holder prefers.
    PreferredCompressionAlgorithms(Vec<CompressionAlgorithm>),
    /// Key server preference bits.
    KeyServerPreferences(Vec<u8>),
    /// The key holder's preferred key server.
    PreferredKeyServer(Vec<u8>),
    /// Whether the certified user ID is the primary one.
    PrimaryUserID(bool),
    /// A URI of a policy document.
    PolicyURI(Vec<u8>),
    /// The key's capability bits.
    KeyFlags(Vec<u8>),
    /// The user ID on whose behalf the signature was issued.
    SignersUserID(Vec<u8>),
    /// Why the key or certification was revoked.
    ReasonForRevocation {
        /// Machine-readable reason code.
        code: u8,
        /// Human-readable explanation.
        reason: Vec<u8>,
    },
    /// Feature bits advertised by the key holder.
    Features(Vec<u8>),
    /// Identifies the target of a signature revocation.
    SignatureTarget {
        /// The target signature's public key algorithm.
        pk_algo: PublicKeyAlgorithm,
        /// The target signature's hash algorithm.
        hash_algo: HashAlgorithm,
        /// The target signature's digest.
        digest: Vec<u8>,
    },
    /// A complete signature carried inside a signature.
    ///
    /// Used to embed the primary key binding signature in a
    /// signing-capable subkey's binding signature.
    EmbeddedSignature(Box<Signature>),
    /// The fingerprint of the key issuing the signature.
    IssuerFingerprint(Fingerprint),
    /// An uninterpreted subpacket, kept byte for byte.
    Unknown {
        /// The subpacket's tag.
        tag: SubpacketTag,
        /// The subpacket's body.
        body: Vec<u8>,
    },
}

impl SubpacketValue {
    /// Returns the subpacket's tag.
    pub fn tag(&self) -> SubpacketTag {
        use self::SubpacketValue::*;
        match self {
            SignatureCreationTime(_) => SubpacketTag::SignatureCreationTime,
            SignatureExpirationTime(_) =>
                SubpacketTag::SignatureExpirationTime,
            ExportableCertification(_) =>
                SubpacketTag::ExportableCertification,
            TrustSignature { .. } => SubpacketTag::TrustSignature,
            RegularExpression(_) => SubpacketTag::RegularExpression,
            Revocable(_) => SubpacketTag::Revocable,
            KeyExpirationTime(_) => SubpacketTag::KeyExpirationTime,
            PreferredSymmetricAlgorithms(_) =>
                SubpacketTag::PreferredSymmetricAlgorithms,
            RevocationKey { .. } => SubpacketTag::RevocationKey,
            Issuer(_) => SubpacketTag::Issuer,
            NotationData { .. } => SubpacketTag::NotationData,
            PreferredHashAlgorithms(_) =>
                SubpacketTag::PreferredHashAlgorithms,
            PreferredCompressionAlgorithms(_) =>
                SubpacketTag::PreferredCompressionAlgorithms,
            KeyServerPreferences(_) => SubpacketTag::KeyServerPreferences,
            PreferredKeyServer(_) => SubpacketTag::PreferredKeyServer,
            PrimaryUserID(_) => SubpacketTag::PrimaryUserID,
            PolicyURI(_) => SubpacketTag::PolicyURI,
            KeyFlags(_) => SubpacketTag::KeyFlags,
            SignersUserID(_) => SubpacketTag::SignersUserID,
            ReasonForRevocation { .. } => SubpacketTag::ReasonForRevocation,
            Features(_) => SubpacketTag::Features,
            SignatureTarget { .. } => SubpacketTag::SignatureTarget,
            EmbeddedSignature(_) => SubpacketTag::EmbeddedSignature,
            IssuerFingerprint(_) => SubpacketTag::IssuerFingerprint,
            Unknown { tag, .. } => *tag,
        }
    }

    /// Serializes the value (without length and tag octets) to `w`.
    fn serialize(&self, w: &mut dyn Write) -> Result<()> {
        use self::SubpacketValue::*;
        match self {
            SignatureCreationTime(t) | SignatureExpirationTime(t)
            | KeyExpirationTime(t) =>
                w.write_all(&t.to_be_bytes())?,
            ExportableCertification(v) | Revocable(v) | PrimaryUserID(v) =>
                w.write_all(&[*v as u8])?,
            TrustSignature { level, trust } =>
                w.write_all(&[*level, *trust])?,
            RegularExpression(v) | KeyServerPreferences(v)
            | PreferredKeyServer(v) | PolicyURI(v) | KeyFlags(v)
            | SignersUserID(v) | Features(v) =>
                w.write_all(v)?,
            PreferredSymmetricAlgorithms(v) =>
                for a in v {
                    w.write_all(&[u8::from(*a)])?;
                },
            PreferredHashAlgorithms(v) =>
                for a in v {
                    w.write_all(&[u8::from(*a)])?;
                },
            PreferredCompressionAlgorithms(v) =>
                for a in v {
                    w.write_all(&[u8::from(*a)])?;
                },
            RevocationKey { class, pk_algo, fingerprint } => {
                w.write_all(&[*class, u8::from(*pk_algo)])?;
                w.write_all(fingerprint)?;
            }
            Issuer(id) => w.write_all(id.as_bytes())?,
            NotationData { flags, name, value } => {
                w.write_all(flags)?;
                w.write_all(&(name.len() as u16).to_be_bytes())?;
                w.write_all(&(value.len() as u16).to_be_bytes())?;
                w.write_all(name)?;
                w.write_all(value)?;
            }
            ReasonForRevocation { code, reason } => {
                w.write_all(&[*code])?;
                w.write_all(reason)?;
            }
            SignatureTarget { pk_algo, hash_algo, digest } => {
                w.write_all(&[u8::from(*pk_algo), u8::from(*hash_algo)])?;
                w.write_all(digest)?;
            }
            EmbeddedSignature(sig) => sig.serialize_body(w)?,
            IssuerFingerprint(fp) => {
                let version = match fp {
                    Fingerprint::V4(_) => 4,
                    Fingerprint::V3(_) => 3,
                    Fingerprint::Invalid(_) => 0,
                };
                w.write_all(&[version])?;
                w.write_all(fp.as_bytes())?;
            }
            Unknown { body, .. } => w.write_all(body)?,
        }
        Ok(())
    }

    /// Parses the value for `tag` from the `len` bytes long body.
    fn parse(tag: SubpacketTag, reader: &mut dyn BufferedReader<()>,
             len: usize) -> Result<Self> {
        use self::SubpacketValue::*;

        let malformed = || Error::MalformedPacket(
            format!("Short subpacket body for {:?}", tag));

        Ok(match tag {
            SubpacketTag::SignatureCreationTime =>
                SignatureCreationTime(reader.read_be_u32()?),
            SubpacketTag::SignatureExpirationTime =>
                SignatureExpirationTime(reader.read_be_u32()?),
            SubpacketTag::ExportableCertification =>
                ExportableCertification(
                    reader.data_consume_hard(1)?[0] != 0),
            SubpacketTag::TrustSignature => {
                let b = reader.data_consume_hard(2)?;
                TrustSignature { level: b[0], trust: b[1] }
            }
            SubpacketTag::RegularExpression =>
                RegularExpression(reader.steal(len)?),
            SubpacketTag::Revocable =>
                Revocable(reader.data_consume_hard(1)?[0] != 0),
            SubpacketTag::KeyExpirationTime =>
                KeyExpirationTime(reader.read_be_u32()?),
            SubpacketTag::PreferredSymmetricAlgorithms =>
                PreferredSymmetricAlgorithms(
                    reader.steal(len)?.into_iter().map(Into::into)
                        .collect()),
            SubpacketTag::RevocationKey => {
                if len < 2 {
                    return Err(malformed().into());
                }
                let b = reader.data_consume_hard(2)?;
                let (class, pk_algo) = (b[0], b[1].into());
                RevocationKey {
                    class, pk_algo,
                    fingerprint: reader.steal(len - 2)?.into_boxed_slice(),
                }
            }
            SubpacketTag::Issuer =>
                Issuer(KeyID::from_bytes(&reader.steal(len)?)),
            SubpacketTag::NotationData => {
                let header = reader.data_consume_hard(8)?;
                let name_len =
                    u16::from_be_bytes([header[4], header[5]]) as usize;
                let value_len =
                    u16::from_be_bytes([header[6], header[7]]) as usize;
                if len != 8 + name_len + value_len {
                    return Err(Error::MalformedPacket(
                        "Inconsistent notation lengths".into()).into());
                }
                let flags = [header[0], header[1], header[2], header[3]];
                NotationData {
                    flags,
                    name: reader.steal(name_len)?,
                    value: reader.steal(value_len)?,
                }
            }
            SubpacketTag::PreferredHashAlgorithms =>
                PreferredHashAlgorithms(
                    reader.steal(len)?.into_iter().map(Into::into)
                        .collect()),
            SubpacketTag::PreferredCompressionAlgorithms =>
                PreferredCompressionAlgorithms(
                    reader.steal(len)?.into_iter().map(Into::into)
                        .collect()),
            SubpacketTag::KeyServerPreferences =>
                KeyServerPreferences(reader.steal(len)?),
            SubpacketTag::PreferredKeyServer =>
                PreferredKeyServer(reader.steal(len)?),
            SubpacketTag::PrimaryUserID =>
                PrimaryUserID(reader.data_consume_hard(1)?[0] != 0),
            SubpacketTag::PolicyURI => PolicyURI(reader.steal(len)?),
            SubpacketTag::KeyFlags => KeyFlags(reader.steal(len)?),
            SubpacketTag::SignersUserID => SignersUserID(reader.steal(len)?),
            SubpacketTag::ReasonForRevocation => {
                if len < 1 {
                    return Err(malformed().into());
                }
                ReasonForRevocation {
                    code: reader.data_consume_hard(1)?[0],
                    reason: reader.steal(len - 1)?,
                }
            }
            SubpacketTag::Features => Features(reader.steal(len)?),
            SubpacketTag::SignatureTarget => {
                if len < 2 {
                    return Err(malformed().into());
                }
                let b = reader.data_consume_hard(2)?;
                let (pk_algo, hash_algo) = (b[0].into(), b[1].into());
                SignatureTarget {
                    pk_algo, hash_algo,
                    digest: reader.steal(len - 2)?,
                }
            }
            SubpacketTag::EmbeddedSignature => {
                let body = reader.steal(len)?;
                let mut r = buffered_reader::Memory::with_cookie(&body, ());
                EmbeddedSignature(Box::new(Signature::parse(&mut r)?))
            }
            SubpacketTag::IssuerFingerprint => {
                if len < 1 {
                    return Err(malformed().into());
                }
                let version = reader.data_consume_hard(1)?[0];
                IssuerFingerprint(Fingerprint::from_bytes(
                    version, &reader.steal(len - 1)?))
            }
            tag => Unknown { tag, body: reader.steal(len)? },
        })
    }
}

/// A typed option attached to a signature.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Subpacket {
    /// Whether implementations that do not understand this subpacket
    /// must consider the signature in error.
    critical: bool,
    /// The subpacket's value.
    value: SubpacketValue,
}

impl Subpacket {
    /// Creates a new non-critical subpacket.
    pub fn new(value: SubpacketValue) -> Self {
        Self::with_criticality(value, false)
    }

    /// Creates a new subpacket with explicit criticality.
    pub fn with_criticality(value: SubpacketValue, critical: bool) -> Self {
        Subpacket { critical, value }
    }

    /// Returns whether the critical bit is set.
    pub fn critical(&self) -> bool {
        self.critical
    }

    /// Returns the subpacket's value.
    pub fn value(&self) -> &SubpacketValue {
        &self.value
    }

    /// Returns the subpacket's tag.
    pub fn tag(&self) -> SubpacketTag {
        self.value.tag()
    }

    fn parse(reader: &mut dyn BufferedReader<()>) -> Result<Self> {
        // Subpacket lengths use the one, two, and five octet forms;
        // there are no partial lengths.
        let octet1 = reader.data_consume_hard(1)?[0] as u32;
        let len = match octet1 {
            0..=191 => octet1,
            192..=254 => {
                let octet2 = reader.data_consume_hard(1)?[0] as u32;
                ((octet1 - 192) << 8) + octet2 + 192
            }
            255 => reader.read_be_u32()?,
            _ => unreachable!(),
        } as usize;

        if len == 0 {
            return Err(Error::MalformedPacket(
                "Subpacket without type octet".into()).into());
        }

        let raw_tag = reader.data_consume_hard(1)?[0];
        let critical = raw_tag & 0x80 != 0;
        let value = SubpacketValue::parse(
            (raw_tag & 0x7f).into(), reader, len - 1)?;

        Ok(Subpacket { critical, value })
    }

    fn serialize(&self, w: &mut dyn Write) -> Result<()> {
        let mut body = Vec::new();
        self.value.serialize(&mut body)?;

        let len = 1 + body.len() as u32;
        match len {
            0..=191 => w.write_all(&[len as u8])?,
            192..=16319 => {
                let v = len - 192;
                w.write_all(&[(v >> 8) as u8 + 192, (v & 0xff) as u8])?;
            }
            _ => {
                w.write_all(&[255])?;
                w.write_all(&len.to_be_bytes())?;
            }
        }

        let mut tag = u8::from(self.tag());
        if self.critical {
            tag |= 0x80;
        }
        w.write_all(&[tag])?;
        w.write_all(&body)?;
        Ok(())
    }
}

/// An ordered set of subpackets.
///
/// Duplicates are preserved: adding a subpacket never replaces an
/// existing one, and [`lookup`] returns the first match.
///
///   [`lookup`]: SubpacketArea::lookup
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct SubpacketArea {
    packets: Vec<Subpacket>,
}

impl fmt::Debug for SubpacketArea {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.packets.iter()).finish()
    }
}

impl SubpacketArea {
    /// Returns an empty subpacket area.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `subpacket` at the end of the area.
    pub fn add(&mut self, subpacket: Subpacket) {
        self.packets.push(subpacket);
    }

    /// Returns the first subpacket with the given tag, if any.
    ///
    /// If the area holds several subpackets of one type, the
    /// trailing ones are not consulted; use [`iter`] to see all of
    /// them.
    ///
    ///   [`iter`]: SubpacketArea::iter
    pub fn lookup(&self, tag: SubpacketTag) -> Option<&Subpacket> {
        self.packets.iter().find(|sp| sp.tag() == tag)
    }

    /// Iterates over all subpackets in order.
    pub fn iter(&self) -> impl Iterator<Item = &Subpacket> {
        self.packets.iter()
    }

    /// Returns the number of subpackets.
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// Returns whether the area is empty.
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Parses a subpacket area of `len` bytes.
    pub(crate) fn parse(reader: &mut dyn BufferedReader<()>, len: usize)
                        -> Result<Self> {
        let body = reader.steal(len)?;
        let mut reader = buffered_reader::Memory::with_cookie(&body, ());

        let mut packets = Vec::new();
        while !reader.data(1)?.is_empty() {
            packets.push(Subpacket::parse(&mut reader)?);
        }
        Ok(SubpacketArea { packets })
    }

    /// Serializes the subpackets (without the area's length prefix)
    /// to `w`.
    pub(crate) fn serialize(&self, w: &mut dyn Write) -> Result<()> {
        for sp in &self.packets {
            sp.serialize(w)?;
        }
        Ok(())
    }

    /// The length of the serialized form in bytes.
    pub(crate) fn serialized_len(&self) -> usize {
        let mut buf = Vec::new();
        // Subpacket serialization into a Vec cannot fail.
        self.serialize(&mut buf).expect("writing to a Vec");
        buf.len()
    }
}

#[cfg(test)]
impl Arbitrary for Subpacket {
    fn arbitrary(g: &mut Gen) -> Self {
        use self::SubpacketValue::*;

        // Embedded signatures and other deep values are exercised by
        // the signature tests; keep the generator to flat values.
        let value = match u8::arbitrary(g) % 10 {
            0 => SignatureCreationTime(u32::arbitrary(g)),
            1 => SignatureExpirationTime(u32::arbitrary(g)),
            2 => KeyExpirationTime(u32::arbitrary(g)),
            3 => ExportableCertification(bool::arbitrary(g)),
            4 => Issuer(KeyID::from(u64::arbitrary(g))),
            5 => PreferredSymmetricAlgorithms(
                Vec::<u8>::arbitrary(g).into_iter().map(Into::into)
                    .collect()),
            6 => NotationData {
                flags: [0x80, 0, 0, 0],
                name: Vec::<u8>::arbitrary(g),
                value: Vec::<u8>::arbitrary(g),
            },
            7 => KeyFlags(vec![u8::arbitrary(g)]),
            8 => ReasonForRevocation {
                code: u8::arbitrary(g),
                reason: Vec::<u8>::arbitrary(g),
            },
            _ => Unknown {
                tag: SubpacketTag::Unknown(34 + u8::arbitrary(g) % 60),
                body: Vec::<u8>::arbitrary(g),
            },
        };
        Subpacket::with_criticality(value, bool::arbitrary(g))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    quickcheck! {
        fn wire_roundtrip(sp: Subpacket) -> bool {
            let mut buf = Vec::new();
            sp.serialize(&mut buf).unwrap();

            let mut reader =
                buffered_reader::Memory::with_cookie(&buf, ());
            sp == Subpacket::parse(&mut reader).unwrap()
        }
    }

    #[test]
    fn area_preserves_duplicates_and_order() {
        let mut area = SubpacketArea::new();
        area.add(Subpacket::new(
            SubpacketValue::SignatureCreationTime(100)));
        area.add(Subpacket::new(
            SubpacketValue::SignatureCreationTime(200)));
        assert_eq!(area.len(), 2);

        // Lookup returns the first match.
        match area.lookup(SubpacketTag::SignatureCreationTime)
            .unwrap().value()
        {
            SubpacketValue::SignatureCreationTime(100) => (),
            v => panic!("expected the first subpacket, got {:?}", v),
        }
    }

    #[test]
    fn critical_unknown_subpackets_are_preserved() {
        // 3 octets long, critical tag 77, body [0xaa, 0xbb].
        let raw = [3, 77 | 0x80, 0xaa, 0xbb];
        let mut reader = buffered_reader::Memory::with_cookie(&raw, ());
        let area = SubpacketArea::parse(&mut reader, raw.len()).unwrap();

        let sp = area.lookup(SubpacketTag::Unknown(77)).unwrap();
        assert!(sp.critical());

        let mut buf = Vec::new();
        area.serialize(&mut buf).unwrap();
        assert_eq!(&buf[..], &raw[..]);
    }

    #[test]
    fn two_octet_lengths() {
        let sp = Subpacket::new(SubpacketValue::PolicyURI(vec![b'x'; 300]));
        let mut buf = Vec::new();
        sp.serialize(&mut buf).unwrap();
        assert_eq!(buf.len(), 2 + 1 + 300);

        let mut reader = buffered_reader::Memory::with_cookie(&buf, ());
        assert_eq!(sp, Subpacket::parse(&mut reader).unwrap());
    }
}
