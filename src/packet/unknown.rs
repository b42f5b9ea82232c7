//! Packets with unknown tags.

use std::fmt;
use std::io::Write;

use buffered_reader::BufferedReader;

use crate::Result;
use crate::packet::Tag;

/// A packet whose tag this crate does not interpret.
///
/// The body is kept byte for byte so streams containing private or
/// experimental packets round-trip.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Unknown {
    pub(crate) old_ctb: bool,
    tag: Tag,
    body: Box<[u8]>,
}

impl fmt::Debug for Unknown {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Unknown")
            .field("tag", &self.tag)
            .field("body", &format!("{} bytes", self.body.len()))
            .finish()
    }
}

impl Unknown {
    /// Returns the packet's tag.
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Returns the packet's body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub(crate) fn parse(reader: &mut dyn BufferedReader<()>, tag: Tag,
                        old_ctb: bool) -> Result<Self> {
        Ok(Unknown {
            old_ctb,
            tag,
            body: reader.steal_eof()?.into_boxed_slice(),
        })
    }

    pub(crate) fn serialize_body(&self, w: &mut dyn Write) -> Result<()> {
        w.write_all(&self.body)?;
        Ok(())
    }
}
