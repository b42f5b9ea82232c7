//! Compressed data packets.
//!
//! See [Section 5.6 of RFC 4880].
//!
//!   [Section 5.6 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.6

use std::io::Write;

use buffered_reader::BufferedReader;

use crate::Result;
use crate::types::CompressionAlgorithm;

/// The header of a compressed data packet.
///
/// The compressed body is streamed, not stored.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct CompressedData {
    pub(crate) old_ctb: bool,
    algo: CompressionAlgorithm,
}

impl CompressedData {
    /// Creates a new compressed data packet header.
    pub fn new(algo: CompressionAlgorithm) -> Self {
        CompressedData { old_ctb: false, algo }
    }

    /// Returns the compression algorithm.
    pub fn algo(&self) -> CompressionAlgorithm {
        self.algo
    }

    /// Parses the header, leaving `reader` at the compressed stream.
    pub(crate) fn parse_header(reader: &mut dyn BufferedReader<()>,
                               old_ctb: bool) -> Result<Self> {
        Ok(CompressedData {
            old_ctb,
            algo: reader.data_consume_hard(1)?[0].into(),
        })
    }

    /// Serializes the header (the algorithm octet) to `w`.
    pub(crate) fn serialize_header(&self, w: &mut dyn Write) -> Result<()> {
        w.write_all(&[self.algo.into()])?;
        Ok(())
    }
}
