//! Symmetric-key encrypted session key packets.
//!
//! See [Section 5.3 of RFC 4880].
//!
//!   [Section 5.3 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.3

use std::fmt;
use std::io::Write;

use buffered_reader::BufferedReader;

use crate::Error;
use crate::Result;
use crate::crypto::s2k::S2K;
use crate::types::SymmetricAlgorithm;

/// A version 4 symmetric-key encrypted session key packet.
///
/// If the packet carries no encrypted session key, the key derived
/// from the passphrase is the message key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SKESK4 {
    pub(crate) old_ctb: bool,
    sym_algo: SymmetricAlgorithm,
    s2k: S2K,
    esk: Option<Box<[u8]>>,
}

impl fmt::Debug for SKESK4 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SKESK4")
            .field("sym_algo", &self.sym_algo)
            .field("s2k", &self.s2k)
            .field("esk", &self.esk.as_ref()
                   .map(|esk| crate::fmt::to_hex(esk, false)))
            .finish()
    }
}

impl SKESK4 {
    /// Creates a new SKESK packet.
    pub fn new(sym_algo: SymmetricAlgorithm, s2k: S2K,
               esk: Option<Box<[u8]>>) -> Self {
        SKESK4 { old_ctb: false, sym_algo, s2k, esk }
    }

    /// Returns the symmetric algorithm.
    ///
    /// When no encrypted session key is present, this is the message
    /// key's algorithm; otherwise it also keys the ESK decryption.
    pub fn symmetric_algo(&self) -> SymmetricAlgorithm {
        self.sym_algo
    }

    /// Returns the S2K specifier.
    pub fn s2k(&self) -> &S2K {
        &self.s2k
    }

    /// Returns the encrypted session key, if present.
    pub fn esk(&self) -> Option<&[u8]> {
        self.esk.as_deref()
    }

    pub(crate) fn parse(reader: &mut dyn BufferedReader<()>, old_ctb: bool)
                        -> Result<Self> {
        let version = reader.data_consume_hard(1)?[0];
        if version != 4 {
            return Err(Error::MalformedPacket(
                format!("Unsupported SKESK version {}", version)).into());
        }

        let sym_algo = reader.data_consume_hard(1)?[0].into();
        let s2k = S2K::parse(reader)?;
        let esk = reader.steal_eof()?;

        Ok(SKESK4 {
            old_ctb,
            sym_algo,
            s2k,
            esk: if esk.is_empty() {
                None
            } else {
                Some(esk.into_boxed_slice())
            },
        })
    }

    pub(crate) fn serialize_body(&self, w: &mut dyn Write) -> Result<()> {
        w.write_all(&[4, self.sym_algo.into()])?;
        self.s2k.serialize(w)?;
        if let Some(ref esk) = self.esk {
            w.write_all(esk)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HashAlgorithm;

    #[test]
    fn roundtrip_without_esk() {
        let skesk = SKESK4::new(
            SymmetricAlgorithm::AES256,
            S2K::Salted {
                hash: HashAlgorithm::SHA256,
                salt: [8, 7, 6, 5, 4, 3, 2, 1],
            },
            None);

        let mut buf = Vec::new();
        skesk.serialize_body(&mut buf).unwrap();

        let mut reader = buffered_reader::Memory::with_cookie(&buf, ());
        let parsed = SKESK4::parse(&mut reader, false).unwrap();
        assert_eq!(skesk, parsed);
        assert!(parsed.esk().is_none());
    }

    #[test]
    fn roundtrip_with_esk() {
        let skesk = SKESK4::new(
            SymmetricAlgorithm::AES128,
            S2K::Simple { hash: HashAlgorithm::SHA1 },
            Some(vec![0xaa; 17].into_boxed_slice()));

        let mut buf = Vec::new();
        skesk.serialize_body(&mut buf).unwrap();

        let mut reader = buffered_reader::Memory::with_cookie(&buf, ());
        assert_eq!(skesk, SKESK4::parse(&mut reader, false).unwrap());
    }
}
