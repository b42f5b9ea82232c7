//! String-to-Key (S2K) specifiers.
//!
//! String-to-key (S2K) specifiers are used to convert password
//! strings into symmetric-key encryption/decryption keys.  See
//! [Section 3.7 of RFC 4880].
//!
//!   [Section 3.7 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-3.7

use std::cmp;
use std::fmt;
use std::io::Write;

use buffered_reader::BufferedReader;

use crate::Error;
use crate::Result;
use crate::crypto::{Password, SessionKey};
use crate::crypto::engines::DigestProvider;
use crate::types::HashAlgorithm;

#[cfg(test)]
use quickcheck::{Arbitrary, Gen};

/// String-to-Key (S2K) specifiers.
///
/// The hash function itself is injected through a
/// [`DigestProvider`]; the specifier only carries the parameters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum S2K {
    /// Simply hashes the password.
    Simple {
        /// Hash used for key derivation.
        hash: HashAlgorithm,
    },
    /// Hashes the password with a public `salt` value.
    Salted {
        /// Hash used for key derivation.
        hash: HashAlgorithm,
        /// Public salt value mixed into the password.
        salt: [u8; 8],
    },
    /// Repeatedly hashes the password with a public `salt` value.
    Iterated {
        /// Hash used for key derivation.
        hash: HashAlgorithm,
        /// Public salt value mixed into the password.
        salt: [u8; 8],
        /// Number of bytes to hash.
        hash_bytes: u32,
    },
    /// Private S2K algorithm.
    Private(u8),
    /// Unknown S2K algorithm.
    Unknown(u8),
}

impl S2K {
    /// Converts the password to a key using the S2K's parameters.
    pub fn derive_key(&self, engine: &dyn DigestProvider, password: &Password,
                      key_size: usize) -> Result<SessionKey> {
        match self {
            S2K::Simple { hash } | S2K::Salted { hash, .. }
            | S2K::Iterated { hash, .. } => {
                let mut ctx = engine.digest(*hash)?;

                // If the digest is shorter than the key, multiple
                // digests are concatenated, the i-th one preloaded
                // with i zero octets.
                let digest_size = ctx.digest_size();
                let mut zeros = Vec::new();
                let mut key = vec![0u8; key_size];

                for chunk in key.chunks_mut(digest_size) {
                    ctx.update(&zeros);

                    match self {
                        S2K::Simple { .. } => {
                            ctx.update(password);
                        }
                        S2K::Salted { salt, .. } => {
                            ctx.update(salt);
                            ctx.update(password);
                        }
                        S2K::Iterated { salt, hash_bytes, .. } => {
                            let mut data: SessionKey =
                                vec![0u8; salt.len() + password.len()].into();
                            data[..salt.len()].copy_from_slice(salt);
                            data[salt.len()..].copy_from_slice(password);

                            // The whole salt and password are always
                            // hashed at least once, independent of
                            // the hash count.
                            let count = cmp::max(*hash_bytes as usize,
                                                 data.len());
                            for _ in 0..count / data.len() {
                                ctx.update(&data);
                            }
                            ctx.update(&data[..count % data.len()]);
                        }
                        S2K::Private(_) | S2K::Unknown(_) => unreachable!(),
                    }

                    ctx.digest(chunk)?;
                    zeros.push(0);
                }

                Ok(key.into())
            }
            S2K::Private(u) | S2K::Unknown(u) =>
                Err(Error::MalformedPacket(
                    format!("Unknown S2K type {:#x}", u)).into()),
        }
    }

    /// Reads an S2K specifier from `reader`.
    pub(crate) fn parse(reader: &mut dyn BufferedReader<()>) -> Result<Self> {
        let kind = reader.data_consume_hard(1)?[0];
        Ok(match kind {
            0 => S2K::Simple {
                hash: reader.data_consume_hard(1)?[0].into(),
            },
            1 => S2K::Salted {
                hash: reader.data_consume_hard(1)?[0].into(),
                salt: Self::read_salt(reader)?,
            },
            3 => S2K::Iterated {
                hash: reader.data_consume_hard(1)?[0].into(),
                salt: Self::read_salt(reader)?,
                hash_bytes:
                    S2K::decode_count(reader.data_consume_hard(1)?[0]),
            },
            100..=110 => S2K::Private(kind),
            u => S2K::Unknown(u),
        })
    }

    fn read_salt(reader: &mut dyn BufferedReader<()>) -> Result<[u8; 8]> {
        let mut salt = [0u8; 8];
        salt.copy_from_slice(reader.data_consume_hard(8)?);
        Ok(salt)
    }

    /// Writes the S2K specifier to `w`.
    pub(crate) fn serialize(&self, w: &mut dyn Write) -> Result<()> {
        match self {
            S2K::Simple { hash } => {
                w.write_all(&[0, u8::from(*hash)])?;
            }
            S2K::Salted { hash, salt } => {
                w.write_all(&[1, u8::from(*hash)])?;
                w.write_all(salt)?;
            }
            S2K::Iterated { hash, salt, hash_bytes } => {
                w.write_all(&[3, u8::from(*hash)])?;
                w.write_all(salt)?;
                w.write_all(&[S2K::encode_count(*hash_bytes)?])?;
            }
            S2K::Private(u) | S2K::Unknown(u) => {
                w.write_all(&[*u])?;
            }
        }
        Ok(())
    }

    /// The length of the serialized form in bytes.
    pub(crate) fn serialized_len(&self) -> usize {
        match self {
            S2K::Simple { .. } => 2,
            S2K::Salted { .. } => 10,
            S2K::Iterated { .. } => 11,
            S2K::Private(_) | S2K::Unknown(_) => 1,
        }
    }

    /// Returns an encodable iteration count larger or equal
    /// `hash_bytes`.
    ///
    /// Not all iteration counts are encodable as *Iterated and
    /// Salted S2K*.  The largest encodable hash count is `0x3e00000`.
    pub fn nearest_hash_count(hash_bytes: usize) -> u32 {
        match hash_bytes {
            0..=1024 => 1024,
            0x3e00001..=usize::MAX => 0x3e00000,
            hash_bytes => {
                let mut coded = 0;
                while S2K::decode_count(coded) < hash_bytes as u32 {
                    coded += 1;
                }
                S2K::decode_count(coded)
            }
        }
    }

    /// Decodes the OpenPGP encoding of the number of bytes to hash.
    pub fn decode_count(coded: u8) -> u32 {
        let mantissa = 16 + (coded as u32 & 15);
        let exp = (coded as u32 >> 4) + 6;

        mantissa << cmp::min(32 - 5, exp)
    }

    /// Converts `hash_bytes` into the coded count representation.
    ///
    /// # Errors
    ///
    /// Fails with `Error::InvalidArgument` if `hash_bytes` cannot be
    /// encoded exactly.  See also [`S2K::nearest_hash_count()`].
    pub fn encode_count(hash_bytes: u32) -> Result<u8> {
        // eeee.mmmm -> (16 + mmmm) * 2^(6 + e)
        for coded in 0..0x100u32 {
            if S2K::decode_count(coded as u8) == hash_bytes {
                return Ok(coded as u8);
            }
        }

        Err(Error::InvalidArgument(
            format!("S2K: cannot encode iteration count of {}", hash_bytes))
            .into())
    }
}

impl fmt::Display for S2K {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            S2K::Simple { hash } =>
                write!(f, "Simple S2K with {}", hash),
            S2K::Salted { hash, salt } =>
                write!(f, "Salted S2K with {} and salt {}",
                       hash, crate::fmt::to_hex(salt, false)),
            S2K::Iterated { hash, salt, hash_bytes } =>
                write!(f, "Iterated and Salted S2K with {}, salt {} and \
                           {} bytes to hash",
                       hash, crate::fmt::to_hex(salt, false), hash_bytes),
            S2K::Private(u) =>
                write!(f, "Private/Experimental S2K {}", u),
            S2K::Unknown(u) =>
                write!(f, "Unknown S2K {}", u),
        }
    }
}

#[cfg(test)]
impl Arbitrary for S2K {
    fn arbitrary(g: &mut Gen) -> Self {
        let hash = HashAlgorithm::arbitrary(g);
        let mut salt = [0u8; 8];
        for b in salt.iter_mut() {
            *b = u8::arbitrary(g);
        }

        match u8::arbitrary(g) % 5 {
            0 => S2K::Simple { hash },
            1 => S2K::Salted { hash, salt },
            2 => S2K::Iterated {
                hash, salt,
                hash_bytes:
                    S2K::nearest_hash_count(usize::arbitrary(g) % 0x400_0000),
            },
            3 => S2K::Private(100 + u8::arbitrary(g) % 11),
            _ => S2K::Unknown(4 + u8::arbitrary(g) % 96),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    #[test]
    fn coded_count_roundtrip() {
        for coded in 0..0x100usize {
            let hash_bytes = S2K::decode_count(coded as u8);
            assert!(hash_bytes >= 1024);
            assert_eq!(S2K::encode_count(hash_bytes).unwrap(), coded as u8);
        }
    }

    quickcheck! {
        fn coded_count_approximation(i: usize) -> bool {
            let approx = S2K::nearest_hash_count(i);
            let coded = S2K::encode_count(approx).unwrap();

            (approx as usize >= i || i > 0x3e00000)
                && S2K::decode_count(coded) == approx
        }
    }

    quickcheck! {
        fn wire_roundtrip(s2k: S2K) -> bool {
            let mut buf = Vec::new();
            s2k.serialize(&mut buf).unwrap();
            assert_eq!(buf.len(), s2k.serialized_len());

            let mut reader = buffered_reader::Memory::with_cookie(&buf, ());
            s2k == S2K::parse(&mut reader).unwrap()
        }
    }

    #[cfg(feature = "crypto-rust")]
    mod derivation {
        use super::*;
        use crate::crypto::backend::Backend;

        // Expected keys computed with GnuPG.
        #[test]
        fn simple_sha1_aes256() {
            let backend = Backend::default();
            let s2k = S2K::Simple { hash: HashAlgorithm::SHA1 };
            let key = s2k.derive_key(&backend, &"1234".into(), 32).unwrap();
            assert_eq!(
                crate::fmt::to_hex(&key, false),
                "7110EDA4D09E062AA5E4A390B0A572AC\
                 0D2C0220F352B0D292B65164C2A67301");
        }

        #[test]
        fn salted_sha1_aes256() {
            let backend = Backend::default();
            let s2k = S2K::Salted {
                hash: HashAlgorithm::SHA1,
                salt: [0xa8, 0x42, 0xa7, 0xa9, 0x59, 0xfa, 0x42, 0x2a],
            };
            let key = s2k.derive_key(&backend, &"123456".into(), 32).unwrap();
            assert_eq!(
                crate::fmt::to_hex(&key, false),
                "8B79077CA448F6FB3D3AD2A264D3B938\
                 D357C9FB3E41219FD962DF960A9AFA08");
        }

        #[test]
        fn iterated_sha1_aes256() {
            let backend = Backend::default();
            let s2k = S2K::Iterated {
                hash: HashAlgorithm::SHA1,
                salt: [0x78, 0x45, 0xf0, 0x5b, 0x55, 0xf7, 0xb4, 0x9e],
                hash_bytes: S2K::decode_count(241),
            };
            let key = s2k.derive_key(&backend, &"qwerty".into(), 32).unwrap();
            assert_eq!(
                crate::fmt::to_hex(&key, false),
                "575AD156187A3F8CEC11108309236EB4\
                 99F1E682F0D1AFADFAC4ECF97613108A");
        }
    }
}
