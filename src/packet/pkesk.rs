//! Public-key encrypted session key packets.
//!
//! See [Section 5.1 of RFC 4880].
//!
//!   [Section 5.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.1

use std::io::Write;

use buffered_reader::BufferedReader;

use crate::Error;
use crate::KeyID;
use crate::Result;
use crate::crypto::mpi;
use crate::types::PublicKeyAlgorithm;

/// A version 3 public-key encrypted session key packet.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct PKESK3 {
    pub(crate) old_ctb: bool,
    recipient: KeyID,
    pk_algo: PublicKeyAlgorithm,
    esk: mpi::Ciphertext,
}

impl PKESK3 {
    /// Creates a new PKESK packet.
    ///
    /// The recipient may be the wildcard key ID to obscure who can
    /// decrypt the message.
    pub fn new(recipient: KeyID, pk_algo: PublicKeyAlgorithm,
               esk: mpi::Ciphertext) -> Self {
        PKESK3 { old_ctb: false, recipient, pk_algo, esk }
    }

    /// Returns the recipient's key ID.
    pub fn recipient(&self) -> &KeyID {
        &self.recipient
    }

    /// Returns the public key algorithm.
    pub fn pk_algo(&self) -> PublicKeyAlgorithm {
        self.pk_algo
    }

    /// Returns the wrapped session key.
    pub fn esk(&self) -> &mpi::Ciphertext {
        &self.esk
    }

    pub(crate) fn parse(reader: &mut dyn BufferedReader<()>, old_ctb: bool)
                        -> Result<Self> {
        let version = reader.data_consume_hard(1)?[0];
        if version != 3 {
            return Err(Error::MalformedPacket(
                format!("Unsupported PKESK version {}", version)).into());
        }

        let recipient = KeyID::from_bytes(reader.data_consume_hard(8)?);
        let pk_algo: PublicKeyAlgorithm =
            reader.data_consume_hard(1)?[0].into();
        let esk = mpi::Ciphertext::parse(pk_algo, reader)?;

        Ok(PKESK3 { old_ctb, recipient, pk_algo, esk })
    }

    pub(crate) fn serialize_body(&self, w: &mut dyn Write) -> Result<()> {
        w.write_all(&[3])?;
        w.write_all(self.recipient.as_bytes())?;
        w.write_all(&[self.pk_algo.into()])?;
        self.esk.serialize(w)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::mpi::MPI;

    #[test]
    fn roundtrip() {
        let pkesk = PKESK3::new(
            KeyID::from(0x1122334455667788u64),
            PublicKeyAlgorithm::RSAEncryptSign,
            mpi::Ciphertext::RSA { c: MPI::new(&[0x17; 128]) });

        let mut buf = Vec::new();
        pkesk.serialize_body(&mut buf).unwrap();

        let mut reader = buffered_reader::Memory::with_cookie(&buf, ());
        assert_eq!(pkesk, PKESK3::parse(&mut reader, false).unwrap());
    }

    #[test]
    fn wildcard_recipient() {
        let pkesk = PKESK3::new(
            KeyID::wildcard(), PublicKeyAlgorithm::RSAEncryptSign,
            mpi::Ciphertext::RSA { c: MPI::new(&[1]) });
        assert!(pkesk.recipient().is_wildcard());
    }
}
