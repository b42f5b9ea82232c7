//! Modification detection code packets.
//!
//! The MDC packet trails the plaintext inside an integrity protected
//! container and holds a SHA-1 digest over it.  See [Section 5.14 of
//! RFC 4880].
//!
//!   [Section 5.14 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.14

use std::fmt;
use std::io::Write;

use buffered_reader::BufferedReader;

use crate::Result;

/// A modification detection code packet.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MDC {
    digest: [u8; 20],
}

impl fmt::Debug for MDC {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("MDC")
            .field(&crate::fmt::to_hex(&self.digest, false))
            .finish()
    }
}

impl MDC {
    /// Creates a new MDC packet from the given digest.
    pub fn new(digest: [u8; 20]) -> Self {
        MDC { digest }
    }

    /// Returns the digest.
    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    pub(crate) fn parse(reader: &mut dyn BufferedReader<()>)
                        -> Result<Self> {
        let mut digest = [0u8; 20];
        digest.copy_from_slice(reader.data_consume_hard(20)?);
        Ok(MDC { digest })
    }

    pub(crate) fn serialize_body(&self, w: &mut dyn Write) -> Result<()> {
        w.write_all(&self.digest)?;
        Ok(())
    }
}
