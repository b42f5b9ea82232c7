//! Trust packets.
//!
//! Trust packets hold implementation-defined data that local key
//! rings attach to keys and certifications; they are never emitted
//! when a ring is exported for transfer.  See [Section 5.10 of RFC
//! 4880].
//!
//!   [Section 5.10 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.10

use std::fmt;
use std::io::Write;

use buffered_reader::BufferedReader;

use crate::Result;

/// A trust packet; the value is opaque.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Trust {
    pub(crate) old_ctb: bool,
    value: Box<[u8]>,
}

impl fmt::Debug for Trust {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Trust")
            .field(&crate::fmt::to_hex(&self.value, false))
            .finish()
    }
}

impl Trust {
    /// Creates a new trust packet.
    pub fn new(value: &[u8]) -> Self {
        Trust {
            old_ctb: false,
            value: value.to_vec().into_boxed_slice(),
        }
    }

    /// Returns the packet's value.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub(crate) fn parse(reader: &mut dyn BufferedReader<()>, old_ctb: bool)
                        -> Result<Self> {
        Ok(Trust {
            old_ctb,
            value: reader.steal_eof()?.into_boxed_slice(),
        })
    }

    pub(crate) fn serialize_body(&self, w: &mut dyn Write) -> Result<()> {
        w.write_all(&self.value)?;
        Ok(())
    }
}
