//! Packet and key ring serialization.
//!
//! The [`Serialize`] trait writes a complete, framed packet.  Packets
//! parsed from old format headers are re-framed in the old format so
//! rings round-trip byte for byte; constructed packets use the new
//! format.
//!
//! The streaming generators for literal, compressed, and encrypted
//! data live in [`stream`].

pub(crate) mod partial_body;
pub mod stream;

use std::io::Write;

use crate::Error;
use crate::Result;
use crate::key::{IdentityPacket, PublicKey};
use crate::keyring::{
    PublicKeyRing, PublicKeyRingCollection, SecretKeyRing,
    SecretKeyRingCollection,
};
use crate::packet::header::write_header;
use crate::packet::{BodyLength, Packet, Tag};

/// Serialization into a `Write`r.
pub trait Serialize {
    /// Writes a serialized version of the object to `w`.
    fn serialize(&self, w: &mut dyn Write) -> Result<()>;

    /// Serializes the object into a fresh vector.
    fn to_vec(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.serialize(&mut buf)?;
        Ok(buf)
    }
}

/// Writes one definite-length packet: header, then body.
pub(crate) fn write_packet(w: &mut dyn Write, tag: Tag, old_ctb: bool,
                           body: &[u8]) -> Result<()> {
    write_header(w, tag, old_ctb, BodyLength::Full(body.len() as u32))?;
    w.write_all(body)?;
    Ok(())
}

macro_rules! impl_serialize {
    ($typ:ty, $tag:expr) => {
        impl Serialize for $typ {
            fn serialize(&self, w: &mut dyn Write) -> Result<()> {
                let mut body = Vec::new();
                self.serialize_body(&mut body)?;
                write_packet(w, $tag, self.old_ctb, &body)
            }
        }
    };
}

impl_serialize!(crate::packet::OnePassSig, Tag::OnePassSig);
impl_serialize!(crate::packet::Marker, Tag::Marker);
impl_serialize!(crate::packet::Trust, Tag::Trust);
impl_serialize!(crate::packet::UserID, Tag::UserID);
impl_serialize!(crate::packet::UserAttribute, Tag::UserAttribute);
impl_serialize!(crate::packet::PKESK3, Tag::PKESK);
impl_serialize!(crate::packet::SKESK4, Tag::SKESK);

impl Serialize for crate::packet::Signature {
    fn serialize(&self, w: &mut dyn Write) -> Result<()> {
        let mut body = Vec::new();
        self.serialize_body(&mut body)?;
        write_packet(w, Tag::Signature, self.old_ctb(), &body)
    }
}

impl Serialize for crate::packet::Key {
    fn serialize(&self, w: &mut dyn Write) -> Result<()> {
        let mut body = Vec::new();
        self.serialize_body(&mut body)?;
        write_packet(w, self.tag(), self.old_ctb, &body)
    }
}

impl Serialize for crate::packet::MDC {
    fn serialize(&self, w: &mut dyn Write) -> Result<()> {
        let mut body = Vec::new();
        self.serialize_body(&mut body)?;
        write_packet(w, Tag::MDC, false, &body)
    }
}

impl Serialize for crate::packet::Unknown {
    fn serialize(&self, w: &mut dyn Write) -> Result<()> {
        let mut body = Vec::new();
        self.serialize_body(&mut body)?;
        write_packet(w, self.tag(), self.old_ctb, &body)
    }
}

impl Serialize for Packet {
    fn serialize(&self, w: &mut dyn Write) -> Result<()> {
        match self {
            Packet::Signature(p) => p.serialize(w),
            Packet::OnePassSig(p) => p.serialize(w),
            Packet::Key(p) => p.serialize(w),
            Packet::Marker(p) => p.serialize(w),
            Packet::Trust(p) => p.serialize(w),
            Packet::UserID(p) => p.serialize(w),
            Packet::UserAttribute(p) => p.serialize(w),
            Packet::PKESK(p) => p.serialize(w),
            Packet::SKESK(p) => p.serialize(w),
            Packet::MDC(p) => p.serialize(w),
            Packet::Unknown(p) => p.serialize(w),
            Packet::Literal(_) | Packet::CompressedData(_)
            | Packet::SEIP(_) | Packet::SED(_) =>
                Err(Error::InvalidOperation(
                    "streaming packets are written through the stream \
                     generators".into()).into()),
        }
    }
}

fn serialize_key(w: &mut dyn Write, key: &PublicKey, for_transfer: bool)
                 -> Result<()> {
    key.packet().serialize(w)?;
    if !for_transfer {
        if let Some(trust) = key.trust() {
            trust.serialize(w)?;
        }
    }

    let bound = |w: &mut dyn Write,
                 bs: &crate::key::BoundSignature| -> Result<()> {
        bs.signature().serialize(w)?;
        if !for_transfer {
            if let Some(trust) = bs.trust() {
                trust.serialize(w)?;
            }
        }
        Ok(())
    };

    for bs in key.direct_certifications() {
        bound(w, bs)?;
    }
    for bs in key.sub_signatures() {
        bound(w, bs)?;
    }
    for identity in key.identities() {
        match identity.id() {
            IdentityPacket::ID(id) => id.serialize(w)?,
            IdentityPacket::Attribute(ua) => ua.serialize(w)?,
        }
        if !for_transfer {
            if let Some(trust) = identity.trust() {
                trust.serialize(w)?;
            }
        }
        for bs in identity.certifications() {
            bound(w, bs)?;
        }
    }
    Ok(())
}

impl PublicKeyRing {
    /// Serializes the ring without trust packets, the form used to
    /// transfer keys between implementations.
    pub fn serialize_for_transfer(&self, w: &mut dyn Write) -> Result<()> {
        for key in self.keys() {
            serialize_key(w, key, true)?;
        }
        Ok(())
    }
}

impl Serialize for PublicKeyRing {
    fn serialize(&self, w: &mut dyn Write) -> Result<()> {
        for key in self.keys() {
            serialize_key(w, key, false)?;
        }
        Ok(())
    }
}

impl SecretKeyRing {
    /// Serializes the ring without trust packets.
    pub fn serialize_for_transfer(&self, w: &mut dyn Write) -> Result<()> {
        for key in self.keys() {
            serialize_key(w, key.public_key(), true)?;
        }
        Ok(())
    }
}

impl Serialize for SecretKeyRing {
    fn serialize(&self, w: &mut dyn Write) -> Result<()> {
        for key in self.keys() {
            serialize_key(w, key.public_key(), false)?;
        }
        Ok(())
    }
}

impl Serialize for PublicKeyRingCollection {
    fn serialize(&self, w: &mut dyn Write) -> Result<()> {
        for ring in self.rings() {
            ring.serialize(w)?;
        }
        Ok(())
    }
}

impl Serialize for SecretKeyRingCollection {
    fn serialize(&self, w: &mut dyn Write) -> Result<()> {
        for ring in self.rings() {
            ring.serialize(w)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{Marker, UserID};

    #[test]
    fn framed_packet() {
        let buf = UserID::from("x").to_vec().unwrap();
        // New format CTB for tag 13, one octet length, body.
        assert_eq!(&buf[..], &[0xcd, 1, b'x']);
    }

    #[test]
    fn marker() {
        assert_eq!(&Marker::new().to_vec().unwrap()[..],
                   &[0xca, 3, b'P', b'G', b'P']);
    }
}
