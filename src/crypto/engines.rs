//! Engine contracts.
//!
//! The core of this crate is algorithm-agnostic: all cryptographic
//! primitives — digests, ciphers, signature math, randomness — are
//! reached through the trait objects defined here.  Production use
//! injects a concrete engine set; the [`crate::crypto::backend`]
//! module provides one built on pure-Rust cryptographic crates.

use crate::KeyID;
use crate::Result;
use crate::crypto::{Password, Protected, SessionKey};
use crate::crypto::mpi;
use crate::crypto::s2k::S2K;
use crate::key;
use crate::packet;
use crate::types::{
    HashAlgorithm, PublicKeyAlgorithm, SignatureType, SymmetricAlgorithm,
};

/// A streaming message digest.
pub trait Digest {
    /// Returns the algorithm.
    fn algo(&self) -> HashAlgorithm;

    /// Size of the digest in bytes.
    fn digest_size(&self) -> usize;

    /// Adds data to the digest.
    fn update(&mut self, data: &[u8]);

    /// Finalizes the digest and writes it into `digest`.
    ///
    /// Resets the hash function contexts.  `digest` must be at least
    /// `digest_size` bytes large, otherwise the digest will be
    /// truncated.
    fn digest(&mut self, digest: &mut [u8]) -> Result<()>;
}

/// Creates digest contexts.
pub trait DigestProvider {
    /// Returns a fresh context for `algo`.
    fn digest(&self, algo: HashAlgorithm) -> Result<Box<dyn Digest>>;
}

/// Computes key fingerprints.
///
/// The raw digest is returned; its interpretation depends on the key
/// packet's version (MD5 over the key material for version 3, SHA-1
/// over the framed packet body for version 4).
pub trait FingerprintCalculator {
    /// Computes the fingerprint of `key`.
    fn calculate(&self, key: &packet::Key) -> Result<Vec<u8>>;
}

/// A one-shot signing operation bound to a key and a hash.
///
/// Content is streamed through [`update`], then the caller finalizes
/// via [`digest`] and [`signature`].
///
///   [`update`]: ContentSigner::update
///   [`digest`]: ContentSigner::digest
///   [`signature`]: ContentSigner::signature
pub trait ContentSigner {
    /// The signing key's public key algorithm.
    fn public_key_algorithm(&self) -> PublicKeyAlgorithm;

    /// The hash algorithm being computed.
    fn hash_algorithm(&self) -> HashAlgorithm;

    /// The signing key's key ID.
    fn key_id(&self) -> KeyID;

    /// Adds content to the hash.
    fn update(&mut self, data: &[u8]);

    /// Finalizes the hash and returns the digest.
    ///
    /// Repeated calls return the same digest.
    fn digest(&mut self) -> Result<Vec<u8>>;

    /// Signs the finalized digest.
    fn signature(&mut self) -> Result<mpi::Signature>;
}

/// Builds [`ContentSigner`]s for a private key.
pub trait ContentSignerBuilder {
    /// Creates a signing operation of the given type for `key`.
    fn build(&self, sig_type: SignatureType, key: &key::PrivateKey)
             -> Result<Box<dyn ContentSigner>>;
}

/// A one-shot verification operation bound to a key and a hash.
pub trait ContentVerifier {
    /// Adds content to the hash.
    fn update(&mut self, data: &[u8]);

    /// Finalizes the hash and returns the digest.
    ///
    /// Repeated calls return the same digest.
    fn digest(&mut self) -> Result<Vec<u8>>;

    /// Verifies `sig` over the finalized digest.
    fn verify(&mut self, sig: &mpi::Signature) -> Result<bool>;
}

/// Builds [`ContentVerifier`]s for a public key.
pub trait ContentVerifierBuilder {
    /// Creates a verification operation for `key`.
    fn build(&self, key: &key::PublicKey) -> Result<Box<dyn ContentVerifier>>;
}

/// Dispenses [`ContentVerifierBuilder`]s by algorithm pair.
pub trait ContentVerifierBuilderProvider {
    /// Returns a builder for the given algorithm combination.
    fn get(&self, pk_algo: PublicKeyAlgorithm, hash_algo: HashAlgorithm)
           -> Result<Box<dyn ContentVerifierBuilder>>;
}

/// A keyed symmetric cipher encrypting in OpenPGP CFB mode.
pub trait DataEncryptor {
    /// The cipher algorithm.
    fn algorithm(&self) -> SymmetricAlgorithm;

    /// The cipher's block size in bytes.
    fn block_size(&self) -> usize;

    /// Encrypts `data` in place, advancing the feedback register.
    fn encrypt(&mut self, data: &mut [u8]) -> Result<()>;

    /// Reloads the feedback register with `iv`.
    ///
    /// Packets without integrity protection resynchronize the cipher
    /// after the quick-check prefix, see [Section 5.7 of RFC 4880].
    ///
    ///   [Section 5.7 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.7
    fn resync(&mut self, iv: &[u8]) -> Result<()>;

    /// Takes the integrity digest, if integrity protection was
    /// requested.
    fn take_integrity_digest(&mut self) -> Option<Box<dyn Digest>>;
}

/// Configures and builds [`DataEncryptor`]s.
pub trait DataEncryptorBuilder {
    /// The cipher algorithm encryptors will use.
    fn algorithm(&self) -> SymmetricAlgorithm;

    /// Whether built encryptors carry an integrity digest.
    fn with_integrity_protection(&self) -> bool;

    /// Fills `buf` with random bytes.
    ///
    /// Used for session keys, S2K salts, and the quick-check prefix.
    fn random(&self, buf: &mut [u8]) -> Result<()>;

    /// Builds an encryptor keyed with `key` and a zero IV.
    fn build(&self, key: &SessionKey) -> Result<Box<dyn DataEncryptor>>;
}

/// A keyed symmetric cipher decrypting in OpenPGP CFB mode.
pub trait DataDecryptor {
    /// The cipher's block size in bytes.
    fn block_size(&self) -> usize;

    /// Decrypts `data` in place, advancing the feedback register.
    fn decrypt(&mut self, data: &mut [u8]) -> Result<()>;

    /// Reloads the feedback register with `iv`.
    fn resync(&mut self, iv: &[u8]) -> Result<()>;

    /// Takes the integrity digest, if one was requested at creation.
    fn take_integrity_digest(&mut self) -> Option<Box<dyn Digest>>;
}

/// Builds [`DataDecryptor`]s once a session key has been recovered.
pub trait DataDecryptorFactory {
    /// Builds a decryptor keyed with `key` and `iv`.
    ///
    /// If `with_integrity` is set, the decryptor carries a digest
    /// context for checking the trailing integrity code.
    fn create_decryptor(&self, algo: SymmetricAlgorithm, key: &SessionKey,
                        iv: &[u8], with_integrity: bool)
                        -> Result<Box<dyn DataDecryptor>>;
}

/// Recovers session keys from password-based key encryption.
///
/// Also used to decrypt the protected material of secret keys, which
/// uses the same passphrase-to-key derivation.
pub trait PbeDecryptorFactory: DataDecryptorFactory {
    /// Derives a symmetric key from `passphrase` using `s2k`.
    fn make_key_from_passphrase(&self, algo: SymmetricAlgorithm, s2k: &S2K,
                                passphrase: &Password) -> Result<SessionKey>;

    /// Returns a digest context for secret key checksums.
    fn checksum_digest(&self, algo: HashAlgorithm) -> Result<Box<dyn Digest>>;
}

/// Recovers session keys wrapped to a public key.
pub trait PublicKeyDecryptorFactory: DataDecryptorFactory {
    /// The key ID of the decryption key.
    fn key_id(&self) -> KeyID;

    /// Unwraps `ciphertext`, returning the session data: an algorithm
    /// octet, the session key, and a two-octet additive checksum.
    fn recover_session_data(&self, ciphertext: &mpi::Ciphertext)
                            -> Result<Protected>;
}

/// Produces one encrypted-session-key packet for a message.
pub trait KeyEncryptionMethodGenerator {
    /// For password-based methods, returns the key derived from the
    /// passphrase.
    ///
    /// When such a method is the only one registered, the derived key
    /// is used as the message key directly and no separate session
    /// key is generated.  Public-key methods return `None`.
    fn passphrase_derived_key(&self, algo: SymmetricAlgorithm)
                              -> Option<Result<SessionKey>>;

    /// Produces the encrypted-session-key packet.
    ///
    /// `session_key` is `None` when the passphrase-derived key
    /// doubles as the message key; the emitted packet then carries no
    /// encrypted session key.
    fn generate(&self, algo: SymmetricAlgorithm,
                session_key: Option<&SessionKey>) -> Result<packet::Packet>;
}
