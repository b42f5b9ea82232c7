//! Marker packets.
//!
//! The marker packet carries the literal bytes `PGP` and is ignored
//! on receipt.  See [Section 5.8 of RFC 4880].
//!
//!   [Section 5.8 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.8

use std::io::Write;

use buffered_reader::BufferedReader;

use crate::Error;
use crate::Result;

const MARKER: &[u8] = b"PGP";

/// A marker packet.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Marker {
    pub(crate) old_ctb: bool,
}

impl Marker {
    /// Creates a new marker packet.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn parse(reader: &mut dyn BufferedReader<()>, old_ctb: bool)
                        -> Result<Self> {
        if reader.data_consume_hard(MARKER.len())? != MARKER {
            return Err(Error::MalformedPacket(
                "Invalid marker packet".into()).into());
        }
        Ok(Marker { old_ctb })
    }

    pub(crate) fn serialize_body(&self, w: &mut dyn Write) -> Result<()> {
        w.write_all(MARKER)?;
        Ok(())
    }
}
