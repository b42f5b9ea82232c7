//! Packet data types and their wire codecs.
//!
//! Every packet type owns its body's parse and serialize routines;
//! the framing (tag and body length) is handled by [`crate::parse`]
//! and [`crate::serialize`].  The [`Packet`] enum is the closed sum
//! over all packet types this crate interprets.

mod compressed_data;
pub(crate) mod header;
mod key;
mod literal;
mod marker;
mod mdc;
mod one_pass_sig;
mod pkesk;
mod sed;
mod seip;
mod signature;
mod skesk;
pub mod subpacket;
mod tag;
mod trust;
mod unknown;
mod user_attribute;
mod userid;

pub use self::compressed_data::CompressedData;
pub use self::header::{BodyLength, CTB};
pub use self::key::{Encrypted, Key, SecretKeyChecksum, SecretKeyMaterial};
pub use self::literal::Literal;
pub use self::marker::Marker;
pub use self::mdc::MDC;
pub use self::one_pass_sig::OnePassSig;
pub use self::pkesk::PKESK3;
pub use self::sed::SED;
pub use self::seip::SEIP;
pub use self::signature::{Signature, Signature3, Signature4};
pub use self::skesk::SKESK4;
pub use self::tag::Tag;
pub use self::trust::Trust;
pub use self::unknown::Unknown;
pub use self::user_attribute::UserAttribute;
pub use self::userid::UserID;

pub(crate) use self::signature::{v3_trailer, v4_trailer};

/// A packet with a parsed body.
///
/// The streaming containers (literal, compressed, and encrypted
/// data) appear here with their headers only; their bodies are
/// consumed through the reader objects handed out by
/// [`crate::parse::ObjectFactory`].
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Packet {
    /// A signature packet.
    Signature(Signature),
    /// A one-pass signature packet.
    OnePassSig(OnePassSig),
    /// Any of the four key packets.
    Key(Key),
    /// A marker packet.
    Marker(Marker),
    /// A trust packet.
    Trust(Trust),
    /// A user ID packet.
    UserID(UserID),
    /// A user attribute packet.
    UserAttribute(UserAttribute),
    /// A literal data packet header.
    Literal(Literal),
    /// A compressed data packet header.
    CompressedData(CompressedData),
    /// A public-key encrypted session key packet.
    PKESK(PKESK3),
    /// A symmetric-key encrypted session key packet.
    SKESK(SKESK4),
    /// An integrity protected encrypted container header.
    SEIP(SEIP),
    /// A plain encrypted container header.
    SED(SED),
    /// A modification detection code packet.
    MDC(MDC),
    /// An uninterpreted packet.
    Unknown(Unknown),
}

impl Packet {
    /// Returns the packet's tag.
    pub fn tag(&self) -> Tag {
        match self {
            Packet::Signature(_) => Tag::Signature,
            Packet::OnePassSig(_) => Tag::OnePassSig,
            Packet::Key(k) => k.tag(),
            Packet::Marker(_) => Tag::Marker,
            Packet::Trust(_) => Tag::Trust,
            Packet::UserID(_) => Tag::UserID,
            Packet::UserAttribute(_) => Tag::UserAttribute,
            Packet::Literal(_) => Tag::Literal,
            Packet::CompressedData(_) => Tag::CompressedData,
            Packet::PKESK(_) => Tag::PKESK,
            Packet::SKESK(_) => Tag::SKESK,
            Packet::SEIP(_) => Tag::SEIP,
            Packet::SED(_) => Tag::SED,
            Packet::MDC(_) => Tag::MDC,
            Packet::Unknown(u) => u.tag(),
        }
    }
}

macro_rules! impl_from {
    ($variant:ident, $typ:ty) => {
        impl From<$typ> for Packet {
            fn from(p: $typ) -> Self {
                Packet::$variant(p)
            }
        }
    };
}

impl_from!(Signature, Signature);
impl_from!(OnePassSig, OnePassSig);
impl_from!(Key, Key);
impl_from!(Marker, Marker);
impl_from!(Trust, Trust);
impl_from!(UserID, UserID);
impl_from!(UserAttribute, UserAttribute);
impl_from!(Literal, Literal);
impl_from!(CompressedData, CompressedData);
impl_from!(PKESK, PKESK3);
impl_from!(SKESK, SKESK4);
impl_from!(SEIP, SEIP);
impl_from!(SED, SED);
impl_from!(MDC, MDC);
