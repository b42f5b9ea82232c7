use std::fmt;

use crate::Error;
use crate::Fingerprint;
use crate::Result;

/// Holds a KeyID.
///
/// A KeyID is a fingerprint fragment.  It identifies a public key,
/// but is easy to forge.  For more details about how a KeyID is
/// generated, see [Section 12.2 of RFC 4880].
///
///   [Section 12.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-12.2
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyID {
    /// Lower 8 bytes of a fingerprint, or the low 64 bits of a
    /// version 3 key's RSA modulus.
    Long([u8; 8]),
    /// Used for holding key IDs that we don't understand.  For
    /// instance, the Issuer subpacket can contain the wrong number
    /// of bytes.
    Invalid(Box<[u8]>),
}

impl fmt::Display for KeyID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for KeyID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("KeyID")
            .field(&self.to_hex())
            .finish()
    }
}

impl From<u64> for KeyID {
    fn from(id: u64) -> Self {
        KeyID::Long(id.to_be_bytes())
    }
}

impl From<&Fingerprint> for KeyID {
    fn from(fpr: &Fingerprint) -> Self {
        match fpr {
            Fingerprint::V4(fpr) =>
                KeyID::from_bytes(&fpr[fpr.len() - 8..]),
            Fingerprint::V3(_) | Fingerprint::Invalid(_) =>
                KeyID::Invalid(fpr.as_bytes().to_vec().into_boxed_slice()),
        }
    }
}

impl KeyID {
    /// Converts a byte slice to a KeyID.
    ///
    /// The bytes are taken verbatim; anything but 8 bytes yields an
    /// invalid KeyID.
    pub fn from_bytes(raw: &[u8]) -> KeyID {
        if raw.len() == 8 {
            let mut keyid = [0; 8];
            keyid.copy_from_slice(raw);
            KeyID::Long(keyid)
        } else {
            KeyID::Invalid(raw.to_vec().into_boxed_slice())
        }
    }

    /// Returns a reference to the raw KeyID.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            KeyID::Long(id) => id,
            KeyID::Invalid(id) => id,
        }
    }

    /// Returns the KeyID as a 64-bit number, if it is well formed.
    pub fn as_u64(&self) -> Result<u64> {
        match self {
            KeyID::Long(id) => Ok(u64::from_be_bytes(*id)),
            KeyID::Invalid(_) =>
                Err(Error::InvalidArgument("malformed key ID".into()).into()),
        }
    }

    /// Returns a wildcard KeyID, used to obscure the recipient of an
    /// encrypted session key.
    pub fn wildcard() -> Self {
        KeyID::from(0u64)
    }

    /// Returns true if this is the wildcard KeyID.
    pub fn is_wildcard(&self) -> bool {
        self == &KeyID::wildcard()
    }

    /// Converts this key ID to its hexadecimal representation.
    pub fn to_hex(&self) -> String {
        crate::fmt::to_hex(self.as_bytes(), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u64_roundtrip() {
        let id = KeyID::from(0x123456789ABCDEF0u64);
        assert_eq!(id.as_bytes(),
                   &[0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0]);
        assert_eq!(id.as_u64().unwrap(), 0x123456789ABCDEF0);
        assert_eq!(id.to_hex(), "123456789ABCDEF0");
    }

    #[test]
    fn from_fingerprint() {
        let mut raw = [0u8; 20];
        for (i, b) in raw.iter_mut().enumerate() {
            *b = i as u8;
        }
        let fpr = Fingerprint::from_bytes(4, &raw);
        let keyid = KeyID::from(&fpr);
        assert_eq!(keyid.as_bytes(), &raw[12..]);
    }

    #[test]
    fn invalid() {
        let id = KeyID::from_bytes(b"too long to be a key id");
        assert!(id.as_u64().is_err());
    }
}
