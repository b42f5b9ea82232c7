//! Packet framing: the Cipher Type Byte and body lengths.
//!
//! See [Section 4.2 of RFC 4880] for more details.
//!
//!   [Section 4.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4.2

use std::io::Write;

use buffered_reader::BufferedReader;

use crate::Error;
use crate::Result;
use crate::packet::Tag;

/// The size of a packet's body, as declared by its header.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum BodyLength {
    /// The packet's size is known.
    Full(u32),
    /// The parameter is the number of bytes in the current chunk.
    ///
    /// This type is only used with new format packets, and all
    /// chunks but the last one must be a power of two in size.
    Partial(u32),
    /// The packet extends until an EOF is encountered.
    ///
    /// This type is only used with old format packets.
    Indeterminate,
}

impl BodyLength {
    /// Decodes a new format body length as described in
    /// [Section 4.2.2 of RFC 4880].
    ///
    ///   [Section 4.2.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4.2.2
    pub(crate) fn parse_new_format(reader: &mut dyn BufferedReader<()>)
                                   -> Result<BodyLength> {
        let octet1 = reader.data_consume_hard(1)?[0] as u32;
        Ok(match octet1 {
            0..=191 => BodyLength::Full(octet1),
            192..=223 => {
                let octet2 = reader.data_consume_hard(1)?[0] as u32;
                BodyLength::Full(((octet1 - 192) << 8) + octet2 + 192)
            }
            224..=254 => BodyLength::Partial(1 << (octet1 - 224)),
            255 => BodyLength::Full(reader.read_be_u32()?),
            _ => unreachable!(),
        })
    }

    /// Decodes an old format body length as described in
    /// [Section 4.2.1 of RFC 4880].
    ///
    ///   [Section 4.2.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4.2.1
    pub(crate) fn parse_old_format(reader: &mut dyn BufferedReader<()>,
                                   length_type: PacketLengthType)
                                   -> Result<BodyLength> {
        Ok(match length_type {
            PacketLengthType::OneOctet =>
                BodyLength::Full(reader.data_consume_hard(1)?[0] as u32),
            PacketLengthType::TwoOctets =>
                BodyLength::Full(reader.read_be_u16()? as u32),
            PacketLengthType::FourOctets =>
                BodyLength::Full(reader.read_be_u32()?),
            PacketLengthType::Indeterminate => BodyLength::Indeterminate,
        })
    }

    /// Writes the new format encoding to `w`.
    ///
    /// Partial lengths must be powers of two between 1 and 2^30.
    pub(crate) fn serialize_new_format(&self, w: &mut dyn Write)
                                       -> Result<()> {
        match self {
            BodyLength::Full(l) => {
                let l = *l;
                if l <= 191 {
                    w.write_all(&[l as u8])?;
                } else if l <= 8383 {
                    let v = l - 192;
                    w.write_all(&[(v >> 8) as u8 + 192, (v & 0xff) as u8])?;
                } else {
                    w.write_all(&[0xff])?;
                    w.write_all(&l.to_be_bytes())?;
                }
            }
            BodyLength::Partial(l) => {
                let l = *l;
                if l > (1 << 30) || !l.is_power_of_two() {
                    return Err(Error::InvalidArgument(
                        format!("Partial length {} is not a power of two \
                                 up to 2^30", l)).into());
                }
                w.write_all(&[224 + l.trailing_zeros() as u8])?;
            }
            BodyLength::Indeterminate =>
                return Err(Error::InvalidArgument(
                    "Indeterminate lengths are an old format \
                     construction".into()).into()),
        }
        Ok(())
    }
}

/// The `PacketLengthType` is used as part of the old CTB, and is
/// partially used to determine the packet's size.
///
/// See [Section 4.2.1 of RFC 4880] for more details.
///
///   [Section 4.2.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4.2.1
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PacketLengthType {
    /// A one-octet Body Length header encodes a length of 0 to 191 octets.
    OneOctet,
    /// A two-octet Body Length header encodes a length of 192 to
    /// 16383 octets.
    TwoOctets,
    /// A four-octet Body Length header encodes a length of up to
    /// 4,294,967,295 (0xFFFFFFFF) octets in length.
    FourOctets,
    /// The packet is of indeterminate length.
    Indeterminate,
}

impl From<PacketLengthType> for u8 {
    fn from(l: PacketLengthType) -> Self {
        match l {
            PacketLengthType::OneOctet => 0,
            PacketLengthType::TwoOctets => 1,
            PacketLengthType::FourOctets => 2,
            PacketLengthType::Indeterminate => 3,
        }
    }
}

impl From<u8> for PacketLengthType {
    fn from(u: u8) -> Self {
        match u & 3 {
            0 => PacketLengthType::OneOctet,
            1 => PacketLengthType::TwoOctets,
            2 => PacketLengthType::FourOctets,
            3 => PacketLengthType::Indeterminate,
            _ => unreachable!(),
        }
    }
}

/// A parsed Cipher Type Byte.
///
/// OpenPGP defines two packet formats: the old and the new format.
/// Both include the packet's tag; the old format additionally fixes
/// how the body length is encoded.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum CTB {
    /// A new format CTB.
    New {
        /// The packet's tag.
        tag: Tag,
    },
    /// An old format CTB.
    Old {
        /// The packet's tag.  Old format CTBs can only express tags
        /// up to 15.
        tag: Tag,
        /// How the body length is encoded.
        length_type: PacketLengthType,
    },
}

impl CTB {
    /// Decodes the CTB from its wire representation.
    ///
    /// Fails unless the most significant bit is set.
    pub(crate) fn from_ptag(ptag: u8) -> Result<CTB> {
        if ptag & 0b1000_0000 == 0 {
            return Err(Error::MalformedPacket(
                format!("Malformed CTB: MSB of ptag ({:#x}) not set", ptag))
                .into());
        }

        Ok(if ptag & 0b0100_0000 != 0 {
            CTB::New { tag: (ptag & 0b0011_1111).into() }
        } else {
            CTB::Old {
                tag: ((ptag & 0b0011_1100) >> 2).into(),
                length_type: (ptag & 0b0000_0011).into(),
            }
        })
    }

    /// Returns the packet's tag.
    pub fn tag(&self) -> Tag {
        match self {
            CTB::New { tag } | CTB::Old { tag, .. } => *tag,
        }
    }

    /// Returns whether this is an old format CTB.
    pub fn is_old(&self) -> bool {
        matches!(self, CTB::Old { .. })
    }
}

/// A packet header: the CTB and the declared body length.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Header {
    /// The cipher type byte.
    pub ctb: CTB,
    /// The length of the first body chunk.
    pub length: BodyLength,
}

/// Writes a packet header for a body of the given length.
///
/// `old_ctb` requests the old packet format; it is honored for tags
/// up to 15 and non-partial lengths, preserving the framing of
/// packets parsed from legacy streams.
pub(crate) fn write_header(w: &mut dyn Write, tag: Tag, old_ctb: bool,
                           length: BodyLength) -> Result<()> {
    let tag_value = u8::from(tag);
    if old_ctb && tag_value <= 15
        && !matches!(length, BodyLength::Partial(_))
    {
        let (length_type, encoded): (PacketLengthType, Vec<u8>) =
            match length {
                BodyLength::Full(l) if l <= 0xff =>
                    (PacketLengthType::OneOctet, vec![l as u8]),
                BodyLength::Full(l) if l <= 0xffff =>
                    (PacketLengthType::TwoOctets,
                     (l as u16).to_be_bytes().to_vec()),
                BodyLength::Full(l) =>
                    (PacketLengthType::FourOctets, l.to_be_bytes().to_vec()),
                BodyLength::Indeterminate =>
                    (PacketLengthType::Indeterminate, Vec::new()),
                BodyLength::Partial(_) => unreachable!(),
            };
        w.write_all(&[0b1000_0000 | (tag_value << 2)
                      | u8::from(length_type)])?;
        w.write_all(&encoded)?;
    } else {
        if matches!(length, BodyLength::Indeterminate) {
            return Err(Error::InvalidArgument(
                "Indeterminate lengths are an old format \
                 construction".into()).into());
        }
        w.write_all(&[0b1100_0000 | tag_value])?;
        length.serialize_new_format(w)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(data: &[u8]) -> impl BufferedReader<()> + '_ {
        buffered_reader::Memory::with_cookie(data, ())
    }

    #[test]
    fn ctb_decoding() {
        // 0x99 = old format public key packet, two-octet length.
        match CTB::from_ptag(0x99).unwrap() {
            CTB::Old { tag, length_type } => {
                assert_eq!(tag, Tag::PublicKey);
                assert_eq!(length_type, PacketLengthType::TwoOctets);
            }
            ctb => panic!("expected an old format packet, got {:?}", ctb),
        }

        // 0xcb = new format literal.
        match CTB::from_ptag(0xcb).unwrap() {
            CTB::New { tag } => assert_eq!(tag, Tag::Literal),
            ctb => panic!("expected a new format packet, got {:?}", ctb),
        }

        // MSB clear is not a CTB.
        assert!(CTB::from_ptag(0x3f).is_err());
    }

    #[test]
    fn new_format_lengths() {
        for (length, expect) in [
            (BodyLength::Full(100), &[100][..]),
            (BodyLength::Full(191), &[191][..]),
            (BodyLength::Full(192), &[192, 0][..]),
            (BodyLength::Full(8383), &[223, 255][..]),
            (BodyLength::Full(8384), &[255, 0, 0, 0x20, 0xc0][..]),
            (BodyLength::Partial(512), &[233][..]),
        ].iter() {
            let mut buf = Vec::new();
            length.serialize_new_format(&mut buf).unwrap();
            assert_eq!(&buf[..], *expect);

            let mut r = reader(&buf);
            assert_eq!(BodyLength::parse_new_format(&mut r).unwrap(),
                       *length);
        }
    }

    #[test]
    fn partial_lengths_must_be_a_power_of_two() {
        let mut buf = Vec::new();
        assert!(BodyLength::Partial(768).serialize_new_format(&mut buf)
                .is_err());
        assert!(BodyLength::Partial(1 << 31).serialize_new_format(&mut buf)
                .is_err());
    }

    #[test]
    fn old_format_headers() {
        let mut buf = Vec::new();
        write_header(&mut buf, Tag::PublicKey, true, BodyLength::Full(525))
            .unwrap();
        assert_eq!(&buf[..], &[0x99, 0x02, 0x0d]);

        // Tags above 15 fall back to the new format.
        let mut buf = Vec::new();
        write_header(&mut buf, Tag::UserAttribute, true, BodyLength::Full(5))
            .unwrap();
        assert_eq!(&buf[..], &[0xd1, 5]);
    }
}
