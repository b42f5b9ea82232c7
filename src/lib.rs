//! OpenPGP data types and associated machinery.
//!
//! This crate implements the OpenPGP message format as described in
//! [RFC 4880]: typed packet parsing, key ring modeling, streaming
//! encryption and decryption with integrity protection, and digital
//! signature generation and verification.
//!
//!   [RFC 4880]: https://tools.ietf.org/html/rfc4880
//!
//! The crate is built around a small number of layers:
//!
//!   - [`packet`]: the packet data types and their wire codecs,
//!   - [`parse`]: the packet reader and the object factory, which
//!     groups packet runs into the higher-level objects,
//!   - [`serialize`]: the `Serialize` trait and the streaming
//!     generators,
//!   - [`key`] and [`keyring`]: the immutable key and key ring model,
//!   - [`sign`]: signature generation and verification,
//!   - [`encrypted`]: the encrypted data readers.
//!
//! All cryptographic primitives are injected through the engine
//! contracts in [`crypto::engines`].  A default engine set built on
//! pure-Rust cryptographic crates is available behind the
//! `crypto-rust` feature (enabled by default), see
//! [`crypto::backend`].

#![warn(missing_docs)]

#[macro_use]
mod macros;

pub mod crypto;
pub mod encrypted;
mod fingerprint;
pub(crate) mod fmt;
pub mod key;
mod keyid;
pub mod keyring;
pub mod packet;
pub mod parse;
pub mod serialize;
pub mod sign;
pub mod types;

pub use crate::fingerprint::Fingerprint;
pub use crate::keyid::KeyID;
pub use crate::packet::Packet;
pub use crate::types::{
    CompressionAlgorithm,
    HashAlgorithm,
    PublicKeyAlgorithm,
    SignatureType,
    SymmetricAlgorithm,
};

/// Result type for fallible operations.
///
/// The error carrier is [`anyhow::Error`]; structured errors can be
/// recovered with [`anyhow::Error::downcast_ref`]:
///
/// ```
/// use larch_openpgp::{Error, Result};
///
/// fn is_wrong_passphrase(r: &Result<()>) -> bool {
///     match r {
///         Err(e) => matches!(e.downcast_ref::<Error>(),
///                            Some(Error::KeyValidation(_))),
///         Ok(_) => false,
///     }
/// }
/// ```
pub type Result<T> = ::std::result::Result<T, anyhow::Error>;

/// Errors returned by this crate.
///
/// Note: This enum cannot be exhaustively matched to allow future
/// extensions.
#[non_exhaustive]
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid operation.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A malformed packet.
    #[error("Malformed packet: {0}")]
    MalformedPacket(String),

    /// A malformed MPI.
    #[error("Malformed MPI: {0}")]
    MalformedMPI(String),

    /// A malformed packet sequence.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// A checksum or quick-check mismatch, most likely caused by a
    /// wrong key.
    #[error("Data validation failed: {0}")]
    DataValidation(String),

    /// A secret key checksum mismatch, most likely caused by a wrong
    /// passphrase.
    #[error("Key checksum validation failed: {0}")]
    KeyValidation(String),

    /// Unknown packet tag.
    #[error("Unknown packet type: {0}")]
    UnknownPacketTag(packet::Tag),

    /// Unsupported hash algorithm identifier.
    #[error("Unsupported hash algorithm: {0}")]
    UnsupportedHashAlgorithm(HashAlgorithm),

    /// Unsupported public key algorithm identifier.
    #[error("Unsupported public key algorithm: {0}")]
    UnsupportedPublicKeyAlgorithm(PublicKeyAlgorithm),

    /// Unsupported symmetric key algorithm.
    #[error("Unsupported symmetric algorithm: {0}")]
    UnsupportedSymmetricAlgorithm(SymmetricAlgorithm),

    /// Unsupported compression algorithm.
    #[error("Unsupported compression algorithm: {0}")]
    UnsupportedCompressionAlgorithm(CompressionAlgorithm),

    /// Unsupported signature type.
    #[error("Unsupported signature type: {0}")]
    UnsupportedSignatureType(SignatureType),

    /// Unsupported elliptic curve ASN.1 OID.
    #[error("Unsupported elliptic curve: {0}")]
    UnsupportedEllipticCurve(types::Curve),

    /// Index out of range.
    #[error("Index out of range")]
    IndexOutOfRange,

    /// A signing or verification engine failed.
    ///
    /// This is distinct from a verification that cleanly returns
    /// `false`.
    #[error("Bad signature: {0}")]
    BadSignature(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downcast() {
        let e: anyhow::Error =
            Error::InvalidOperation("already open".into()).into();
        match e.downcast_ref::<Error>() {
            Some(Error::InvalidOperation(_)) => (),
            _ => panic!("expected to downcast to Error"),
        }
    }
}
