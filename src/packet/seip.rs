//! Symmetrically encrypted integrity protected data packets.
//!
//! See [Section 5.13 of RFC 4880].
//!
//!   [Section 5.13 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.13

use buffered_reader::BufferedReader;

use crate::Error;
use crate::Result;

/// The header of a version 1 SEIP packet.
///
/// The ciphertext is streamed, not stored.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct SEIP {
    pub(crate) old_ctb: bool,
}

impl SEIP {
    /// Creates a new SEIP packet header.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the version octet, leaving `reader` at the ciphertext.
    pub(crate) fn parse_header(reader: &mut dyn BufferedReader<()>,
                               old_ctb: bool) -> Result<Self> {
        let version = reader.data_consume_hard(1)?[0];
        if version != 1 {
            return Err(Error::MalformedPacket(
                format!("Unsupported SEIP version {}", version)).into());
        }
        Ok(SEIP { old_ctb })
    }
}
