//! User ID packets.
//!
//! See [Section 5.11 of RFC 4880].
//!
//!   [Section 5.11 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.11

use std::fmt;
use std::io::Write;

use buffered_reader::BufferedReader;

use crate::Result;

/// A user ID packet, conventionally an RFC 2822 mail name-addr.
///
/// The value is kept as raw bytes; it is not guaranteed to be valid
/// UTF-8.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct UserID {
    pub(crate) old_ctb: bool,
    value: Box<[u8]>,
}

impl fmt::Debug for UserID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("UserID")
            .field(&String::from_utf8_lossy(&self.value))
            .finish()
    }
}

impl From<&str> for UserID {
    fn from(value: &str) -> Self {
        UserID::new(value.as_bytes())
    }
}

impl UserID {
    /// Creates a new user ID packet.
    pub fn new(value: &[u8]) -> Self {
        UserID {
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
        Ok(UserID {
            old_ctb,
            value: reader.steal_eof()?.into_boxed_slice(),
        })
    }

    pub(crate) fn serialize_body(&self, w: &mut dyn Write) -> Result<()> {
        w.write_all(&self.value)?;
        Ok(())
    }
}
