//! Multiprecision integers (MPIs).
//!
//! Algorithm-specific key, signature, and ciphertext parameters are
//! made up of MPIs: big-endian integers prefixed with their length in
//! bits.  See [Section 3.2 of RFC 4880].
//!
//!   [Section 3.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-3.2

use std::fmt;
use std::io::Write;

use buffered_reader::BufferedReader;

use crate::Error;
use crate::Result;
use crate::types::{Curve, HashAlgorithm, PublicKeyAlgorithm, SymmetricAlgorithm};

/// A multiprecision integer.
///
/// The stored value is normalized: leading zero octets are stripped
/// on construction and on parsing.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MPI {
    value: Box<[u8]>,
}

impl MPI {
    /// Creates a new MPI, stripping leading zero octets.
    pub fn new(value: &[u8]) -> Self {
        let mut leading_zeros = 0;
        for b in value {
            if *b != 0 {
                break;
            }
            leading_zeros += 1;
        }

        MPI {
            value: value[leading_zeros..].to_vec().into_boxed_slice(),
        }
    }

    /// Returns the length of the MPI in bits.
    pub fn bits(&self) -> usize {
        self.value.len() * 8
            - self.value.get(0).map(|&b| b.leading_zeros() as usize)
                  .unwrap_or(0)
    }

    /// Returns the value of this MPI.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Returns the value of this MPI zero-padded to the given length.
    ///
    /// Some consumers (e.g. RSA implementations) expect the integer
    /// to have exactly the length of the modulus.
    pub fn value_padded(&self, to: usize) -> Result<Vec<u8>> {
        if self.value.len() > to {
            return Err(Error::InvalidArgument(
                format!("MPI is larger than {} bytes", to)).into());
        }

        let mut v = vec![0; to];
        v[to - self.value.len()..].copy_from_slice(&self.value);
        Ok(v)
    }

    /// Parses an MPI from `reader`.
    pub(crate) fn parse(name: &str,
                        reader: &mut dyn BufferedReader<()>)
                        -> Result<Self> {
        let bits = reader.read_be_u16()? as usize;
        if bits == 0 {
            return Ok(MPI { value: Vec::new().into_boxed_slice() });
        }

        let bytes = (bits + 7) / 8;
        let value = reader.steal(bytes)?;

        // Make sure the specified length is consistent with the
        // leading octet.
        let unused_bits = bytes * 8 - bits;
        if unused_bits > 0 && value[0] >> (8 - unused_bits) != 0 {
            return Err(Error::MalformedMPI(
                format!("{}: leading bits of the MPI are not zero", name))
                .into());
        }
        if value[0] == 0 {
            return Err(Error::MalformedMPI(
                format!("{}: leading octet of the MPI is zero", name))
                .into());
        }

        Ok(MPI { value: value.into_boxed_slice() })
    }

    /// Serializes the MPI to `w`.
    pub(crate) fn serialize(&self, w: &mut dyn Write) -> Result<()> {
        let bits = self.bits() as u16;
        w.write_all(&bits.to_be_bytes())?;
        w.write_all(&self.value)?;
        Ok(())
    }

    /// The length of the serialized form in bytes.
    pub(crate) fn serialized_len(&self) -> usize {
        2 + self.value.len()
    }
}

impl fmt::Debug for MPI {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} bits: {}", self.bits(),
               crate::fmt::to_hex(&self.value, true))
    }
}

impl From<Vec<u8>> for MPI {
    fn from(v: Vec<u8>) -> Self {
        MPI::new(&v)
    }
}

/// Reads a curve OID: a one-octet size followed by the OID body.
fn parse_oid(reader: &mut dyn BufferedReader<()>) -> Result<Curve> {
    let len = reader.data_consume_hard(1)?[0] as usize;
    if len == 0 || len == 0xff {
        return Err(Error::MalformedPacket(
            format!("Invalid OID length: {}", len)).into());
    }
    let oid = reader.steal(len)?;
    Ok(Curve::from_oid(&oid))
}

fn serialize_oid(w: &mut dyn Write, curve: &Curve) -> Result<()> {
    let oid = curve.oid();
    w.write_all(&[oid.len() as u8])?;
    w.write_all(oid)?;
    Ok(())
}

/// Swallows any remaining MPIs and trailing bytes of a key or
/// signature with an unknown algorithm.
fn parse_unknown(reader: &mut dyn BufferedReader<()>)
                 -> Result<(Box<[MPI]>, Box<[u8]>)> {
    let mut mpis = Vec::new();
    loop {
        let header = {
            let data = reader.data(2)?;
            if data.len() < 2 {
                break;
            }
            [data[0], data[1]]
        };
        let bits = ((header[0] as usize) << 8) | header[1] as usize;
        if bits == 0 {
            break;
        }

        let bytes = (bits + 7) / 8;
        if reader.data(2 + bytes)?.len() < 2 + bytes {
            break;
        }

        // Stop if the leading octet contradicts the declared bit
        // count; what follows is not an MPI.
        let leading = reader.buffer()[2];
        let unused = bytes * 8 - bits;
        if leading == 0 || (unused > 0 && leading >> (8 - unused) != 0) {
            break;
        }

        reader.consume(2);
        let value = reader.steal(bytes)?;
        mpis.push(MPI { value: value.into_boxed_slice() });
    }

    let rest = reader.steal_eof()?;
    Ok((mpis.into_boxed_slice(), rest.into_boxed_slice()))
}

/// The public parameters of a key.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum PublicKey {
    /// RSA public key.
    RSA {
        /// Public exponent.
        e: MPI,
        /// Modulus.
        n: MPI,
    },
    /// DSA public key.
    DSA {
        /// Prime of the ring Zp.
        p: MPI,
        /// Order of `g` in Zp.
        q: MPI,
        /// Generator of Zp.
        g: MPI,
        /// Public key.
        y: MPI,
    },
    /// ElGamal public key.
    ElGamal {
        /// Prime of the ring Zp.
        p: MPI,
        /// Generator of Zp.
        g: MPI,
        /// Public key.
        y: MPI,
    },
    /// EdDSA public key.
    EdDSA {
        /// Curve this key is on.
        curve: Curve,
        /// Compressed point.
        q: MPI,
    },
    /// ECDSA public key.
    ECDSA {
        /// Curve this key is on.
        curve: Curve,
        /// Point.
        q: MPI,
    },
    /// ECDH public key.
    ECDH {
        /// Curve this key is on.
        curve: Curve,
        /// Point.
        q: MPI,
        /// Hash algorithm used for key derivation.
        hash: HashAlgorithm,
        /// Algorithm used to encrypt the session key.
        sym: SymmetricAlgorithm,
    },
    /// Unknown parameters, held as opaque bytes.
    Unknown {
        /// Anything that parsed as MPIs.
        mpis: Box<[MPI]>,
        /// Any remaining data.
        rest: Box<[u8]>,
    },
}

impl PublicKey {
    /// Returns the length of the dominant parameter in bits.
    ///
    /// For finite-field algorithms this is the modulus or prime, for
    /// elliptic curve algorithms the size of the underlying field.
    /// `None` if the curve or the algorithm is unknown.
    pub fn bits(&self) -> Option<usize> {
        use self::PublicKey::*;
        match self {
            RSA { n, .. } => Some(n.bits()),
            DSA { p, .. } => Some(p.bits()),
            ElGamal { p, .. } => Some(p.bits()),
            EdDSA { curve, .. } => curve.bits(),
            ECDSA { curve, .. } => curve.bits(),
            ECDH { curve, .. } => curve.bits(),
            Unknown { .. } => None,
        }
    }

    /// Returns the curve, if any.
    pub fn curve(&self) -> Option<&Curve> {
        use self::PublicKey::*;
        match self {
            EdDSA { curve, .. }
            | ECDSA { curve, .. }
            | ECDH { curve, .. } => Some(curve),
            _ => None,
        }
    }

    /// Parses the public parameters for `algo` from `reader`.
    pub(crate) fn parse(algo: PublicKeyAlgorithm,
                        reader: &mut dyn BufferedReader<()>)
                        -> Result<Self> {
        use crate::types::PublicKeyAlgorithm::*;

        #[allow(deprecated)]
        match algo {
            RSAEncryptSign | RSAEncrypt | RSASign => Ok(PublicKey::RSA {
                n: MPI::parse("rsa_n", reader)?,
                e: MPI::parse("rsa_e", reader)?,
            }),

            DSA => Ok(PublicKey::DSA {
                p: MPI::parse("dsa_p", reader)?,
                q: MPI::parse("dsa_q", reader)?,
                g: MPI::parse("dsa_g", reader)?,
                y: MPI::parse("dsa_y", reader)?,
            }),

            ElGamalEncrypt | ElGamalEncryptSign => Ok(PublicKey::ElGamal {
                p: MPI::parse("elgamal_p", reader)?,
                g: MPI::parse("elgamal_g", reader)?,
                y: MPI::parse("elgamal_y", reader)?,
            }),

            EdDSA => Ok(PublicKey::EdDSA {
                curve: parse_oid(reader)?,
                q: MPI::parse("eddsa_q", reader)?,
            }),

            ECDSA => Ok(PublicKey::ECDSA {
                curve: parse_oid(reader)?,
                q: MPI::parse("ecdsa_q", reader)?,
            }),

            ECDH => {
                let curve = parse_oid(reader)?;
                let q = MPI::parse("ecdh_q", reader)?;

                // KDF parameters: size, reserved, hash, cipher.
                let kdf_len = reader.data_consume_hard(1)?[0];
                if kdf_len != 3 {
                    return Err(Error::MalformedPacket(
                        "wrong size of the ECDH KDF parameter field".into())
                        .into());
                }
                let reserved = reader.data_consume_hard(1)?[0];
                if reserved != 1 {
                    return Err(Error::MalformedPacket(
                        format!("Reserved ECDH KDF octet must be 1, got {}",
                                reserved)).into());
                }
                let hash = reader.data_consume_hard(1)?[0].into();
                let sym = reader.data_consume_hard(1)?[0].into();

                Ok(PublicKey::ECDH { curve, q, hash, sym })
            }

            Private(_) | Unknown(_) => {
                let (mpis, rest) = parse_unknown(reader)?;
                Ok(PublicKey::Unknown { mpis, rest })
            }
        }
    }

    /// Serializes the public parameters to `w`.
    pub(crate) fn serialize(&self, w: &mut dyn Write) -> Result<()> {
        use self::PublicKey::*;
        match self {
            RSA { e, n } => {
                n.serialize(w)?;
                e.serialize(w)?;
            }
            DSA { p, q, g, y } => {
                p.serialize(w)?;
                q.serialize(w)?;
                g.serialize(w)?;
                y.serialize(w)?;
            }
            ElGamal { p, g, y } => {
                p.serialize(w)?;
                g.serialize(w)?;
                y.serialize(w)?;
            }
            EdDSA { curve, q } => {
                serialize_oid(w, curve)?;
                q.serialize(w)?;
            }
            ECDSA { curve, q } => {
                serialize_oid(w, curve)?;
                q.serialize(w)?;
            }
            ECDH { curve, q, hash, sym } => {
                serialize_oid(w, curve)?;
                q.serialize(w)?;
                w.write_all(&[3, 1, u8::from(*hash), u8::from(*sym)])?;
            }
            Unknown { mpis, rest } => {
                for mpi in mpis.iter() {
                    mpi.serialize(w)?;
                }
                w.write_all(rest)?;
            }
        }
        Ok(())
    }
}

/// The secret parameters of a key.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum SecretKeyMaterial {
    /// RSA secret key.
    RSA {
        /// Secret exponent, inverse of e in Phi(N).
        d: MPI,
        /// Smaller secret prime.
        p: MPI,
        /// Larger secret prime.
        q: MPI,
        /// Inverse of p mod q.
        u: MPI,
    },
    /// DSA secret key.
    DSA {
        /// Secret key log_g(y) in Zp.
        x: MPI,
    },
    /// ElGamal secret key.
    ElGamal {
        /// Secret key log_g(y) in Zp.
        x: MPI,
    },
    /// EdDSA secret key.
    EdDSA {
        /// Secret scalar.
        scalar: MPI,
    },
    /// ECDSA secret key.
    ECDSA {
        /// Secret scalar.
        scalar: MPI,
    },
    /// ECDH secret key.
    ECDH {
        /// Secret scalar.
        scalar: MPI,
    },
    /// Unknown parameters, held as opaque bytes.
    Unknown {
        /// Anything that parsed as MPIs.
        mpis: Box<[MPI]>,
        /// Any remaining data.
        rest: Box<[u8]>,
    },
}

impl SecretKeyMaterial {
    /// Parses the secret parameters for `algo` from `reader`.
    pub(crate) fn parse(algo: PublicKeyAlgorithm,
                        reader: &mut dyn BufferedReader<()>)
                        -> Result<Self> {
        use crate::types::PublicKeyAlgorithm::*;

        #[allow(deprecated)]
        match algo {
            RSAEncryptSign | RSAEncrypt | RSASign =>
                Ok(SecretKeyMaterial::RSA {
                    d: MPI::parse("rsa_d", reader)?,
                    p: MPI::parse("rsa_p", reader)?,
                    q: MPI::parse("rsa_q", reader)?,
                    u: MPI::parse("rsa_u", reader)?,
                }),

            DSA => Ok(SecretKeyMaterial::DSA {
                x: MPI::parse("dsa_x", reader)?,
            }),

            ElGamalEncrypt | ElGamalEncryptSign =>
                Ok(SecretKeyMaterial::ElGamal {
                    x: MPI::parse("elgamal_x", reader)?,
                }),

            EdDSA => Ok(SecretKeyMaterial::EdDSA {
                scalar: MPI::parse("eddsa_scalar", reader)?,
            }),

            ECDSA => Ok(SecretKeyMaterial::ECDSA {
                scalar: MPI::parse("ecdsa_scalar", reader)?,
            }),

            ECDH => Ok(SecretKeyMaterial::ECDH {
                scalar: MPI::parse("ecdh_scalar", reader)?,
            }),

            Private(_) | Unknown(_) => {
                let (mpis, rest) = parse_unknown(reader)?;
                Ok(SecretKeyMaterial::Unknown { mpis, rest })
            }
        }
    }

    /// Serializes the secret parameters to `w`.
    pub(crate) fn serialize(&self, w: &mut dyn Write) -> Result<()> {
        use self::SecretKeyMaterial::*;
        match self {
            RSA { d, p, q, u } => {
                d.serialize(w)?;
                p.serialize(w)?;
                q.serialize(w)?;
                u.serialize(w)?;
            }
            DSA { x } => x.serialize(w)?,
            ElGamal { x } => x.serialize(w)?,
            EdDSA { scalar } => scalar.serialize(w)?,
            ECDSA { scalar } => scalar.serialize(w)?,
            ECDH { scalar } => scalar.serialize(w)?,
            Unknown { mpis, rest } => {
                for mpi in mpis.iter() {
                    mpi.serialize(w)?;
                }
                w.write_all(rest)?;
            }
        }
        Ok(())
    }
}

/// A cryptographic signature.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Signature {
    /// RSA signature: a single integer.
    RSA {
        /// Signature m^d mod N.
        s: MPI,
    },
    /// DSA signature: an integer pair.
    DSA {
        /// `r` value.
        r: MPI,
        /// `s` value.
        s: MPI,
    },
    /// ECDSA signature: an integer pair.
    ECDSA {
        /// `r` value.
        r: MPI,
        /// `s` value.
        s: MPI,
    },
    /// EdDSA signature: an integer pair.
    EdDSA {
        /// `R` value.
        r: MPI,
        /// `S` value.
        s: MPI,
    },
    /// Unknown signature parameters.
    Unknown {
        /// Anything that parsed as MPIs.
        mpis: Box<[MPI]>,
        /// Any remaining data.
        rest: Box<[u8]>,
    },
}

impl Signature {
    /// Parses the signature parameters for `algo` from `reader`.
    pub(crate) fn parse(algo: PublicKeyAlgorithm,
                        reader: &mut dyn BufferedReader<()>)
                        -> Result<Self> {
        use crate::types::PublicKeyAlgorithm::*;

        #[allow(deprecated)]
        match algo {
            RSAEncryptSign | RSAEncrypt | RSASign => Ok(Signature::RSA {
                s: MPI::parse("rsa_s", reader)?,
            }),

            DSA => Ok(Signature::DSA {
                r: MPI::parse("dsa_r", reader)?,
                s: MPI::parse("dsa_s", reader)?,
            }),

            ECDSA => Ok(Signature::ECDSA {
                r: MPI::parse("ecdsa_r", reader)?,
                s: MPI::parse("ecdsa_s", reader)?,
            }),

            EdDSA => Ok(Signature::EdDSA {
                r: MPI::parse("eddsa_r", reader)?,
                s: MPI::parse("eddsa_s", reader)?,
            }),

            ElGamalEncrypt | ElGamalEncryptSign | ECDH
            | Private(_) | Unknown(_) => {
                let (mpis, rest) = parse_unknown(reader)?;
                Ok(Signature::Unknown { mpis, rest })
            }
        }
    }

    /// Serializes the signature parameters to `w`.
    pub(crate) fn serialize(&self, w: &mut dyn Write) -> Result<()> {
        use self::Signature::*;
        match self {
            RSA { s } => s.serialize(w)?,
            DSA { r, s } | ECDSA { r, s } | EdDSA { r, s } => {
                r.serialize(w)?;
                s.serialize(w)?;
            }
            Unknown { mpis, rest } => {
                for mpi in mpis.iter() {
                    mpi.serialize(w)?;
                }
                w.write_all(rest)?;
            }
        }
        Ok(())
    }
}

/// An encrypted session key.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Ciphertext {
    /// RSA ciphertext.
    RSA {
        /// m^e mod N.
        c: MPI,
    },
    /// ElGamal ciphertext.
    ElGamal {
        /// Ephemeral key.
        e: MPI,
        /// Ciphertext.
        c: MPI,
    },
    /// ECDH ciphertext.
    ECDH {
        /// Ephemeral key.
        e: MPI,
        /// Wrapped symmetric key.
        key: Box<[u8]>,
    },
    /// Unknown ciphertext parameters.
    Unknown {
        /// Anything that parsed as MPIs.
        mpis: Box<[MPI]>,
        /// Any remaining data.
        rest: Box<[u8]>,
    },
}

impl Ciphertext {
    /// Parses the ciphertext parameters for `algo` from `reader`.
    pub(crate) fn parse(algo: PublicKeyAlgorithm,
                        reader: &mut dyn BufferedReader<()>)
                        -> Result<Self> {
        use crate::types::PublicKeyAlgorithm::*;

        #[allow(deprecated)]
        match algo {
            RSAEncryptSign | RSAEncrypt => Ok(Ciphertext::RSA {
                c: MPI::parse("rsa_c", reader)?,
            }),

            ElGamalEncrypt | ElGamalEncryptSign => Ok(Ciphertext::ElGamal {
                e: MPI::parse("elgamal_e", reader)?,
                c: MPI::parse("elgamal_c", reader)?,
            }),

            ECDH => {
                let e = MPI::parse("ecdh_e", reader)?;
                let len = reader.data_consume_hard(1)?[0] as usize;
                let key = reader.steal(len)?;
                Ok(Ciphertext::ECDH {
                    e, key: key.into_boxed_slice(),
                })
            }

            RSASign | DSA | EdDSA | ECDSA
            | Private(_) | Unknown(_) => {
                let (mpis, rest) = parse_unknown(reader)?;
                Ok(Ciphertext::Unknown { mpis, rest })
            }
        }
    }

    /// Serializes the ciphertext parameters to `w`.
    pub(crate) fn serialize(&self, w: &mut dyn Write) -> Result<()> {
        use self::Ciphertext::*;
        match self {
            RSA { c } => c.serialize(w)?,
            ElGamal { e, c } => {
                e.serialize(w)?;
                c.serialize(w)?;
            }
            ECDH { e, key } => {
                e.serialize(w)?;
                w.write_all(&[key.len() as u8])?;
                w.write_all(key)?;
            }
            Unknown { mpis, rest } => {
                for mpi in mpis.iter() {
                    mpi.serialize(w)?;
                }
                w.write_all(rest)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(data: &[u8]) -> impl BufferedReader<()> + '_ {
        buffered_reader::Memory::with_cookie(data, ())
    }

    #[test]
    fn mpi_roundtrip() {
        let mpi = MPI::new(&[0x01, 0xff, 0x00]);
        assert_eq!(mpi.bits(), 17);

        let mut buf = Vec::new();
        mpi.serialize(&mut buf).unwrap();
        assert_eq!(&buf, &[0x00, 0x11, 0x01, 0xff, 0x00]);

        let mut r = reader(&buf);
        let mpi2 = MPI::parse("test", &mut r).unwrap();
        assert_eq!(mpi, mpi2);
    }

    #[test]
    fn mpi_normalizes_leading_zeros() {
        let mpi = MPI::new(&[0x00, 0x00, 0x80]);
        assert_eq!(mpi.bits(), 8);
        assert_eq!(mpi.value(), &[0x80]);
    }

    #[test]
    fn mpi_rejects_wrong_bit_count() {
        // Claims 9 bits, but the leading octet has more.
        let mut r = reader(&[0x00, 0x09, 0xff, 0xff]);
        assert!(MPI::parse("test", &mut r).is_err());
    }

    #[test]
    fn mpi_padding() {
        let mpi = MPI::new(&[0x01, 0x02]);
        assert_eq!(mpi.value_padded(4).unwrap(), vec![0, 0, 1, 2]);
        assert!(mpi.value_padded(1).is_err());
    }

    #[test]
    fn rsa_public_roundtrip() {
        let pk = PublicKey::RSA {
            e: MPI::new(&[0x01, 0x00, 0x01]),
            n: MPI::new(&[0xaa; 128]),
        };
        assert_eq!(pk.bits(), Some(1024));

        let mut buf = Vec::new();
        pk.serialize(&mut buf).unwrap();
        let mut r = reader(&buf);
        let pk2 = PublicKey::parse(
            PublicKeyAlgorithm::RSAEncryptSign, &mut r).unwrap();
        assert_eq!(pk, pk2);
    }

    #[test]
    fn ecdsa_public_roundtrip() {
        let pk = PublicKey::ECDSA {
            curve: Curve::NistP256,
            q: MPI::new(&[0x04, 0x01, 0x02]),
        };
        assert_eq!(pk.bits(), Some(256));

        let mut buf = Vec::new();
        pk.serialize(&mut buf).unwrap();
        let mut r = reader(&buf);
        let pk2 = PublicKey::parse(PublicKeyAlgorithm::ECDSA, &mut r).unwrap();
        assert_eq!(pk, pk2);
    }

    #[test]
    fn unknown_curve_has_no_bits() {
        let pk = PublicKey::ECDSA {
            curve: Curve::Unknown(vec![1, 2, 3].into_boxed_slice()),
            q: MPI::new(&[0x04, 0x01, 0x02]),
        };
        assert_eq!(pk.bits(), None);
    }
}
