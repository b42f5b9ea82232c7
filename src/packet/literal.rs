//! Literal data packets.
//!
//! See [Section 5.9 of RFC 4880].
//!
//!   [Section 5.9 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.9

use std::io::Write;

use buffered_reader::BufferedReader;

use crate::Error;
use crate::Result;
use crate::types::DataFormat;

/// The header of a literal data packet.
///
/// The packet's body is streamed, not stored; parsing yields this
/// header and leaves the reader positioned at the content.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Literal {
    pub(crate) old_ctb: bool,
    format: DataFormat,
    filename: Vec<u8>,
    date: u32,
}

impl Literal {
    /// Creates a new literal data packet header.
    pub fn new(format: DataFormat) -> Self {
        Literal {
            old_ctb: false,
            format,
            filename: Vec::new(),
            date: 0,
        }
    }

    /// Sets the filename hint.
    ///
    /// The field is advisory and at most 255 bytes long.
    pub fn with_filename(mut self, filename: &[u8]) -> Result<Self> {
        if filename.len() > 255 {
            return Err(Error::InvalidArgument(
                "filenames must not exceed 255 bytes".into()).into());
        }
        self.filename = filename.to_vec();
        Ok(self)
    }

    /// Sets the modification date hint, in seconds since the epoch.
    pub fn with_date(mut self, date: u32) -> Self {
        self.date = date;
        self
    }

    /// Returns the format hint.
    pub fn format(&self) -> DataFormat {
        self.format
    }

    /// Returns the filename hint.
    pub fn filename(&self) -> &[u8] {
        &self.filename
    }

    /// Returns the date hint.
    pub fn date(&self) -> u32 {
        self.date
    }

    /// Parses the literal header, leaving `reader` at the content.
    pub(crate) fn parse_header(reader: &mut dyn BufferedReader<()>,
                               old_ctb: bool) -> Result<Self> {
        let format = reader.data_consume_hard(1)?[0].into();
        let filename_len = reader.data_consume_hard(1)?[0] as usize;
        let filename = reader.steal(filename_len)?;
        let date = reader.read_be_u32()?;
        Ok(Literal { old_ctb, format, filename, date })
    }

    /// Serializes the header (format, filename, date) to `w`.
    pub(crate) fn serialize_header(&self, w: &mut dyn Write) -> Result<()> {
        w.write_all(&[self.format.into(), self.filename.len() as u8])?;
        w.write_all(&self.filename)?;
        w.write_all(&self.date.to_be_bytes())?;
        Ok(())
    }

    /// The length of the serialized header in bytes.
    pub(crate) fn header_len(&self) -> usize {
        1 + 1 + self.filename.len() + 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip() {
        let literal = Literal::new(DataFormat::Binary)
            .with_filename(b"demo.bin").unwrap()
            .with_date(1234);

        let mut buf = Vec::new();
        literal.serialize_header(&mut buf).unwrap();
        assert_eq!(buf.len(), literal.header_len());

        let mut reader = buffered_reader::Memory::with_cookie(&buf, ());
        assert_eq!(literal,
                   Literal::parse_header(&mut reader, false).unwrap());
    }

    #[test]
    fn long_filenames_are_rejected() {
        assert!(Literal::new(DataFormat::Binary)
                .with_filename(&[b'a'; 300]).is_err());
    }
}
