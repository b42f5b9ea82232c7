//! One-pass signature packets.
//!
//! A forward declaration of a trailing signature, emitted before the
//! signed content so a reader can hash while streaming.  See
//! [Section 5.4 of RFC 4880].
//!
//!   [Section 5.4 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.4

use std::io::Write;

use buffered_reader::BufferedReader;

use crate::Error;
use crate::KeyID;
use crate::Result;
use crate::types::{HashAlgorithm, PublicKeyAlgorithm, SignatureType};

/// A one-pass signature packet, version 3.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct OnePassSig {
    pub(crate) old_ctb: bool,
    sig_type: SignatureType,
    hash_algo: HashAlgorithm,
    pk_algo: PublicKeyAlgorithm,
    issuer: KeyID,
    last: bool,
}

impl OnePassSig {
    /// Creates a new one-pass signature packet.
    ///
    /// `last` clears the nesting flag: a zero flag announces that
    /// another one-pass signature covering the same content follows.
    pub fn new(sig_type: SignatureType, hash_algo: HashAlgorithm,
               pk_algo: PublicKeyAlgorithm, issuer: KeyID, last: bool)
               -> Self {
        OnePassSig {
            old_ctb: false,
            sig_type, hash_algo, pk_algo, issuer, last,
        }
    }

    /// Returns the type of the announced signature.
    pub fn sig_type(&self) -> SignatureType {
        self.sig_type
    }

    /// Returns the hash algorithm of the announced signature.
    pub fn hash_algo(&self) -> HashAlgorithm {
        self.hash_algo
    }

    /// Returns the public key algorithm of the announced signature.
    pub fn pk_algo(&self) -> PublicKeyAlgorithm {
        self.pk_algo
    }

    /// Returns the issuer's key ID.
    pub fn issuer(&self) -> &KeyID {
        &self.issuer
    }

    /// Returns whether this is the last one-pass signature packet
    /// before the content.
    pub fn last(&self) -> bool {
        self.last
    }

    pub(crate) fn parse(reader: &mut dyn BufferedReader<()>, old_ctb: bool)
                        -> Result<Self> {
        let version = reader.data_consume_hard(1)?[0];
        if version != 3 {
            return Err(Error::MalformedPacket(
                format!("Unsupported one-pass signature version {}",
                        version)).into());
        }

        let header = reader.data_consume_hard(3)?;
        let (sig_type, hash_algo, pk_algo) =
            (header[0].into(), header[1].into(), header[2].into());
        let issuer = KeyID::from_bytes(reader.data_consume_hard(8)?);
        let last = reader.data_consume_hard(1)?[0] != 0;

        Ok(OnePassSig {
            old_ctb, sig_type, hash_algo, pk_algo, issuer, last,
        })
    }

    pub(crate) fn serialize_body(&self, w: &mut dyn Write) -> Result<()> {
        w.write_all(&[3, self.sig_type.into(), self.hash_algo.into(),
                      self.pk_algo.into()])?;
        w.write_all(self.issuer.as_bytes())?;
        w.write_all(&[self.last as u8])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let ops = OnePassSig::new(
            SignatureType::Binary, HashAlgorithm::SHA256,
            PublicKeyAlgorithm::RSAEncryptSign,
            KeyID::from(0x0102030405060708u64), true);

        let mut buf = Vec::new();
        ops.serialize_body(&mut buf).unwrap();
        assert_eq!(buf.len(), 13);

        let mut reader = buffered_reader::Memory::with_cookie(&buf, ());
        assert_eq!(ops, OnePassSig::parse(&mut reader, false).unwrap());
    }
}
