//! Symmetrically encrypted data packets.
//!
//! The legacy encrypted container without integrity protection.  See
//! [Section 5.7 of RFC 4880].
//!
//!   [Section 5.7 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.7

/// The header of a symmetrically encrypted data packet.
///
/// The packet has no header fields; the whole body is ciphertext and
/// is streamed, not stored.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct SED {
    pub(crate) old_ctb: bool,
}

impl SED {
    /// Creates a new SED packet header.
    pub fn new() -> Self {
        Self::default()
    }
}
