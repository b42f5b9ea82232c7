//! Key packets.
//!
//! One body layout serves four tags: public and secret, primary and
//! subkey.  See [Section 5.5 of RFC 4880].
//!
//!   [Section 5.5 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.5

use std::io::Write;

use buffered_reader::BufferedReader;

use crate::Error;
use crate::Result;
use crate::crypto::checksum;
use crate::crypto::mpi;
use crate::crypto::s2k::S2K;
use crate::packet::Tag;
use crate::types::{HashAlgorithm, PublicKeyAlgorithm, SymmetricAlgorithm};

/// How encrypted secret key material is checksummed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SecretKeyChecksum {
    /// A SHA-1 digest over the plaintext (S2K usage 254).
    SHA1,
    /// A two-octet additive checksum over the plaintext (S2K usage
    /// 255, or a legacy usage octet).
    Sum16,
}

/// Secret key material, as stored in a secret key packet.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum SecretKeyMaterial {
    /// Unprotected secret parameters.
    Unencrypted {
        /// The algorithm-specific secret parameters.
        mpis: mpi::SecretKeyMaterial,
    },
    /// Passphrase-protected secret parameters.
    Encrypted(Encrypted),
}

/// The encrypted-on-disk form of secret key material.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Encrypted {
    algo: SymmetricAlgorithm,
    checksum: SecretKeyChecksum,
    s2k: S2K,
    iv: Box<[u8]>,
    ciphertext: Box<[u8]>,
    // Whether the packet used the legacy usage octet, where the
    // octet names the cipher and the S2K is an implied simple MD5.
    legacy_usage: bool,
}

impl Encrypted {
    /// Creates encrypted secret key material.
    pub fn new(algo: SymmetricAlgorithm, checksum: SecretKeyChecksum,
               s2k: S2K, iv: Box<[u8]>, ciphertext: Box<[u8]>) -> Self {
        Encrypted { algo, checksum, s2k, iv, ciphertext,
                    legacy_usage: false }
    }

    /// Returns the symmetric algorithm protecting the material.
    pub fn algo(&self) -> SymmetricAlgorithm {
        self.algo
    }

    /// Returns the checksum kind appended to the plaintext.
    pub fn checksum(&self) -> SecretKeyChecksum {
        self.checksum
    }

    /// Returns the S2K specifier deriving the protection key.
    pub fn s2k(&self) -> &S2K {
        &self.s2k
    }

    /// Returns the initialization vector.
    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    /// Returns the raw ciphertext.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }
}

/// A key packet.
///
/// The packet covers all four key tags; whether it is a primary key
/// or a subkey, public or secret, is recorded alongside the body.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Key {
    pub(crate) old_ctb: bool,
    version: u8,
    creation_time: u32,
    // Only used by version 2 and 3 keys.
    validity_days: u16,
    pk_algo: PublicKeyAlgorithm,
    mpis: mpi::PublicKey,
    secret: Option<SecretKeyMaterial>,
    subkey: bool,
}

impl Key {
    /// Creates a new version 4 primary public key packet.
    pub fn new(creation_time: u32, pk_algo: PublicKeyAlgorithm,
               mpis: mpi::PublicKey) -> Self {
        Key {
            old_ctb: false,
            version: 4,
            creation_time,
            validity_days: 0,
            pk_algo,
            mpis,
            secret: None,
            subkey: false,
        }
    }

    /// Attaches secret key material, turning this into a secret key
    /// packet.
    pub fn with_secret(mut self, secret: SecretKeyMaterial) -> Self {
        self.secret = Some(secret);
        self
    }

    /// Marks this packet as a subkey.
    pub fn into_subkey(mut self) -> Self {
        self.subkey = true;
        self
    }

    /// Returns a copy without the secret key material.
    pub fn without_secret(&self) -> Self {
        let mut key = self.clone();
        key.secret = None;
        key
    }

    /// Returns the packet version.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Returns the time the key was created, in seconds since the
    /// epoch.
    pub fn creation_time(&self) -> u32 {
        self.creation_time
    }

    /// Returns the validity period in days (version 3 keys only; 0
    /// means the key never expires).
    pub fn validity_days(&self) -> u16 {
        self.validity_days
    }

    /// Returns the public key algorithm.
    pub fn algo(&self) -> PublicKeyAlgorithm {
        self.pk_algo
    }

    /// Returns the algorithm-specific public parameters.
    pub fn mpis(&self) -> &mpi::PublicKey {
        &self.mpis
    }

    /// Returns the secret key material, if any.
    pub fn secret(&self) -> Option<&SecretKeyMaterial> {
        self.secret.as_ref()
    }

    /// Returns whether this packet is a subkey.
    pub fn is_subkey(&self) -> bool {
        self.subkey
    }

    /// Returns the packet's tag.
    pub fn tag(&self) -> Tag {
        match (self.subkey, self.secret.is_some()) {
            (false, false) => Tag::PublicKey,
            (false, true) => Tag::SecretKey,
            (true, false) => Tag::PublicSubkey,
            (true, true) => Tag::SecretSubkey,
        }
    }

    /// Serializes the public portion of the packet body.
    ///
    /// This is the byte string fingerprints and certifications are
    /// computed over.
    pub fn public_encoded(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.serialize_public(&mut buf)?;
        Ok(buf)
    }

    /// Parses a key packet body for one of the four key tags.
    pub(crate) fn parse(reader: &mut dyn BufferedReader<()>, tag: Tag,
                        old_ctb: bool) -> Result<Self> {
        let version = reader.data_consume_hard(1)?[0];
        if !(2..=4).contains(&version) {
            return Err(Error::MalformedPacket(
                format!("Unsupported key version {}", version)).into());
        }

        let creation_time = reader.read_be_u32()?;
        let validity_days = if version <= 3 {
            reader.read_be_u16()?
        } else {
            0
        };
        let pk_algo: PublicKeyAlgorithm =
            reader.data_consume_hard(1)?[0].into();
        let mpis = mpi::PublicKey::parse(pk_algo, reader)?;

        let secret = match tag {
            Tag::SecretKey | Tag::SecretSubkey =>
                Some(Self::parse_secret(reader, pk_algo)?),
            _ => None,
        };

        Ok(Key {
            old_ctb,
            version,
            creation_time,
            validity_days,
            pk_algo,
            mpis,
            secret,
            subkey: matches!(tag, Tag::PublicSubkey | Tag::SecretSubkey),
        })
    }

    fn parse_secret(reader: &mut dyn BufferedReader<()>,
                    pk_algo: PublicKeyAlgorithm)
                    -> Result<SecretKeyMaterial> {
        let usage = reader.data_consume_hard(1)?[0];
        match usage {
            0 => {
                let mpis = mpi::SecretKeyMaterial::parse(pk_algo, reader)?;
                if let mpi::SecretKeyMaterial::Unknown { .. } = mpis {
                    // The trailing checksum is indistinguishable from
                    // the opaque parameters and remains part of them.
                    return Ok(SecretKeyMaterial::Unencrypted { mpis });
                }

                let expected = reader.read_be_u16()?;
                let mut plain = Vec::new();
                mpis.serialize(&mut plain)?;
                if checksum(&plain) != expected {
                    return Err(Error::MalformedPacket(
                        "Secret key checksum mismatch".into()).into());
                }
                Ok(SecretKeyMaterial::Unencrypted { mpis })
            }
            254 | 255 => {
                let algo: SymmetricAlgorithm =
                    reader.data_consume_hard(1)?[0].into();
                let s2k = S2K::parse(reader)?;
                let iv = reader.steal(algo.block_size()?)?;
                let ciphertext = reader.steal_eof()?;
                Ok(SecretKeyMaterial::Encrypted(Encrypted {
                    algo,
                    checksum: if usage == 254 {
                        SecretKeyChecksum::SHA1
                    } else {
                        SecretKeyChecksum::Sum16
                    },
                    s2k,
                    iv: iv.into_boxed_slice(),
                    ciphertext: ciphertext.into_boxed_slice(),
                    legacy_usage: false,
                }))
            }
            u => {
                // Legacy usage octet: it names the cipher, and the
                // S2K is an implied simple MD5.
                let algo: SymmetricAlgorithm = u.into();
                let iv = reader.steal(algo.block_size()?)?;
                let ciphertext = reader.steal_eof()?;
                Ok(SecretKeyMaterial::Encrypted(Encrypted {
                    algo,
                    checksum: SecretKeyChecksum::Sum16,
                    s2k: S2K::Simple { hash: HashAlgorithm::MD5 },
                    iv: iv.into_boxed_slice(),
                    ciphertext: ciphertext.into_boxed_slice(),
                    legacy_usage: true,
                }))
            }
        }
    }

    fn serialize_public(&self, w: &mut dyn Write) -> Result<()> {
        w.write_all(&[self.version])?;
        w.write_all(&self.creation_time.to_be_bytes())?;
        if self.version <= 3 {
            w.write_all(&self.validity_days.to_be_bytes())?;
        }
        w.write_all(&[self.pk_algo.into()])?;
        self.mpis.serialize(w)?;
        Ok(())
    }

    /// Serializes the packet body to `w`.
    pub(crate) fn serialize_body(&self, w: &mut dyn Write) -> Result<()> {
        self.serialize_public(w)?;

        match &self.secret {
            None => (),
            Some(SecretKeyMaterial::Unencrypted { mpis }) => {
                w.write_all(&[0])?;
                let mut plain = Vec::new();
                mpis.serialize(&mut plain)?;
                w.write_all(&plain)?;
                if !matches!(mpis, mpi::SecretKeyMaterial::Unknown { .. }) {
                    w.write_all(&checksum(&plain).to_be_bytes())?;
                }
            }
            Some(SecretKeyMaterial::Encrypted(e)) => {
                if e.legacy_usage {
                    w.write_all(&[e.algo.into()])?;
                } else {
                    w.write_all(&[match e.checksum {
                        SecretKeyChecksum::SHA1 => 254,
                        SecretKeyChecksum::Sum16 => 255,
                    }])?;
                    w.write_all(&[e.algo.into()])?;
                    e.s2k.serialize(w)?;
                }
                w.write_all(&e.iv)?;
                w.write_all(&e.ciphertext)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::mpi::MPI;

    fn rsa_mpis() -> mpi::PublicKey {
        mpi::PublicKey::RSA {
            e: MPI::new(&[0x01, 0x00, 0x01]),
            n: MPI::new(&[0xd5; 64]),
        }
    }

    fn rsa_secret_mpis() -> mpi::SecretKeyMaterial {
        mpi::SecretKeyMaterial::RSA {
            d: MPI::new(&[0x11; 64]),
            p: MPI::new(&[0x13; 32]),
            q: MPI::new(&[0x17; 32]),
            u: MPI::new(&[0x19; 32]),
        }
    }

    fn roundtrip(key: &Key) -> Key {
        let mut buf = Vec::new();
        key.serialize_body(&mut buf).unwrap();
        let mut reader = buffered_reader::Memory::with_cookie(&buf, ());
        Key::parse(&mut reader, key.tag(), false).unwrap()
    }

    #[test]
    fn public_roundtrip() {
        let key = Key::new(1234567890, PublicKeyAlgorithm::RSAEncryptSign,
                           rsa_mpis());
        assert_eq!(key.tag(), Tag::PublicKey);
        assert_eq!(roundtrip(&key), key);
    }

    #[test]
    fn unencrypted_secret_roundtrip() {
        let key = Key::new(1234567890, PublicKeyAlgorithm::RSAEncryptSign,
                           rsa_mpis())
            .with_secret(SecretKeyMaterial::Unencrypted {
                mpis: rsa_secret_mpis(),
            })
            .into_subkey();
        assert_eq!(key.tag(), Tag::SecretSubkey);
        assert_eq!(roundtrip(&key), key);
    }

    #[test]
    fn corrupted_secret_checksum_is_rejected() {
        let key = Key::new(1, PublicKeyAlgorithm::RSAEncryptSign, rsa_mpis())
            .with_secret(SecretKeyMaterial::Unencrypted {
                mpis: rsa_secret_mpis(),
            });
        let mut buf = Vec::new();
        key.serialize_body(&mut buf).unwrap();
        let last = buf.len() - 1;
        buf[last] ^= 1;

        let mut reader = buffered_reader::Memory::with_cookie(&buf, ());
        assert!(Key::parse(&mut reader, Tag::SecretKey, false).is_err());
    }

    #[test]
    fn encrypted_secret_roundtrip() {
        let key = Key::new(99, PublicKeyAlgorithm::RSAEncryptSign,
                           rsa_mpis())
            .with_secret(SecretKeyMaterial::Encrypted(Encrypted::new(
                SymmetricAlgorithm::AES128,
                SecretKeyChecksum::SHA1,
                S2K::Salted {
                    hash: HashAlgorithm::SHA1,
                    salt: [1, 2, 3, 4, 5, 6, 7, 8],
                },
                vec![0u8; 16].into_boxed_slice(),
                vec![0xab; 140].into_boxed_slice())));
        assert_eq!(key.tag(), Tag::SecretKey);
        assert_eq!(roundtrip(&key), key);
    }

    #[test]
    fn stripping_the_secret_changes_the_tag() {
        let key = Key::new(7, PublicKeyAlgorithm::RSAEncryptSign, rsa_mpis())
            .with_secret(SecretKeyMaterial::Unencrypted {
                mpis: rsa_secret_mpis(),
            });
        assert_eq!(key.tag(), Tag::SecretKey);
        assert_eq!(key.without_secret().tag(), Tag::PublicKey);
        assert_eq!(key.public_encoded().unwrap(),
                   key.without_secret().public_encoded().unwrap());
    }
}
