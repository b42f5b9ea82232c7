use std::fmt;

/// Holds a fingerprint.
///
/// A fingerprint uniquely identifies a public key.  For more details
/// about how a fingerprint is generated, see [Section 12.2 of RFC
/// 4880].
///
///   [Section 12.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-12.2
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Fingerprint {
    /// A 20 byte SHA-1 hash of the public key packet.
    V4([u8; 20]),
    /// A 16 byte MD5 hash over the version ≤ 3 RSA key material.
    V3([u8; 16]),
    /// Used for holding fingerprints that we don't understand.
    Invalid(Box<[u8]>),
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Fingerprint")
            .field(&self.to_hex())
            .finish()
    }
}

impl Fingerprint {
    /// Reads a fingerprint from a raw byte slice.
    ///
    /// The slice is interpreted according to the key version it was
    /// computed for.  Only slice lengths matching the version's
    /// digest are considered well formed.
    pub fn from_bytes(version: u8, raw: &[u8]) -> Fingerprint {
        match (version, raw.len()) {
            (4, 20) => {
                let mut fp = [0u8; 20];
                fp.copy_from_slice(raw);
                Fingerprint::V4(fp)
            }
            (2, 16) | (3, 16) => {
                let mut fp = [0u8; 16];
                fp.copy_from_slice(raw);
                Fingerprint::V3(fp)
            }
            _ => Fingerprint::Invalid(raw.to_vec().into_boxed_slice()),
        }
    }

    /// Returns a reference to the raw fingerprint.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Fingerprint::V4(fp) => fp,
            Fingerprint::V3(fp) => fp,
            Fingerprint::Invalid(fp) => fp,
        }
    }

    /// Converts this fingerprint to its hexadecimal representation.
    pub fn to_hex(&self) -> String {
        crate::fmt::to_hex(self.as_bytes(), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyID;

    #[test]
    fn v4_keyid_derivation() {
        let raw: Vec<u8> = (0..20).collect();
        let fpr = Fingerprint::from_bytes(4, &raw);
        match &fpr {
            Fingerprint::V4(_) => (),
            _ => panic!("expected a V4 fingerprint"),
        }
        assert_eq!(KeyID::from(&fpr).as_bytes(), &raw[12..]);
    }

    #[test]
    fn v3_is_not_truncated_to_a_keyid() {
        let raw = [0u8; 16];
        let fpr = Fingerprint::from_bytes(3, &raw);
        match KeyID::from(&fpr) {
            KeyID::Invalid(_) => (),
            id => panic!("v3 fingerprints have no key ID fragment: {:?}", id),
        }
    }

    #[test]
    fn bad_length_is_invalid() {
        match Fingerprint::from_bytes(4, &[1, 2, 3]) {
            Fingerprint::Invalid(_) => (),
            _ => panic!("expected an invalid fingerprint"),
        }
    }
}
