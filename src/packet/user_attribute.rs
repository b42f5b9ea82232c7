//! User attribute packets.
//!
//! A user attribute is a bag of subpackets bound to a key the same
//! way a user ID is; the only standardized subpacket is an image.
//! The value is kept opaque.  See [Section 5.12 of RFC 4880].
//!
//!   [Section 5.12 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.12

use std::fmt;
use std::io::Write;

use buffered_reader::BufferedReader;

use crate::Result;

/// A user attribute packet.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct UserAttribute {
    pub(crate) old_ctb: bool,
    value: Box<[u8]>,
}

impl fmt::Debug for UserAttribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("UserAttribute")
            .field(&crate::fmt::to_hex(&self.value, false))
            .finish()
    }
}

impl UserAttribute {
    /// Creates a new user attribute packet.
    pub fn new(value: &[u8]) -> Self {
        UserAttribute {
            old_ctb: false,
            value: value.to_vec().into_boxed_slice(),
        }
    }

    /// Returns the raw value.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub(crate) fn parse(reader: &mut dyn BufferedReader<()>, old_ctb: bool)
                        -> Result<Self> {
        Ok(UserAttribute {
            old_ctb,
            value: reader.steal_eof()?.into_boxed_slice(),
        })
    }

    pub(crate) fn serialize_body(&self, w: &mut dyn Write) -> Result<()> {
        w.write_all(&self.value)?;
        Ok(())
    }
}
