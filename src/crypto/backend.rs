//! Default engine set built on pure-Rust cryptographic crates.
//!
//! The [`Backend`] type implements the provider-side engine contracts
//! from [`crate::crypto::engines`] and hands out the per-operation
//! objects (signers, verifiers, encryptors, key encryption methods).
//!
//! Algorithm support is intentionally narrow: the RustCrypto CFB
//! cipher set (TripleDES, CAST5, Blowfish, AES, Twofish), the MD5,
//! SHA-1 and SHA-2 digest families, and RSA signature and session key
//! math.  Other public key algorithms report
//! [`crate::Error::UnsupportedPublicKeyAlgorithm`].

use std::cmp;

use cfb_mode::{BufDecryptor, BufEncryptor};
use cipher::KeyIvInit;
use digest::Digest as _;
use num_bigint_dig::BigUint;
use rand::RngCore;
use rand::rngs::OsRng;
use rsa::{Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};

use crate::Error;
use crate::KeyID;
use crate::Result;
use crate::crypto::{Password, Protected, SessionKey, checksum};
use crate::crypto::engines::{
    ContentSigner, ContentSignerBuilder, ContentVerifier,
    ContentVerifierBuilder, ContentVerifierBuilderProvider, DataDecryptor,
    DataDecryptorFactory, DataEncryptor, DataEncryptorBuilder, Digest,
    DigestProvider, FingerprintCalculator, KeyEncryptionMethodGenerator,
    PbeDecryptorFactory, PublicKeyDecryptorFactory,
};
use crate::crypto::mpi;
use crate::crypto::mpi::MPI;
use crate::crypto::s2k::S2K;
use crate::key;
use crate::packet;
use crate::packet::{PKESK3, Packet, SKESK4};
use crate::types::{
    HashAlgorithm, PublicKeyAlgorithm, SignatureType, SymmetricAlgorithm,
};

/// The pure-Rust engine set.
#[derive(Clone, Copy, Debug, Default)]
pub struct Backend(());

impl Backend {
    /// Fills `buf` with random bytes from the OS generator.
    pub fn random(&self, buf: &mut [u8]) -> Result<()> {
        OsRng.fill_bytes(buf);
        Ok(())
    }

    /// Returns a builder for bulk data encryptors.
    pub fn data_encryptor_builder(&self, algo: SymmetricAlgorithm,
                                  with_integrity: bool)
                                  -> Result<Box<dyn DataEncryptorBuilder>> {
        // Fail early on algorithms the cipher set cannot provide.
        algo.key_size()?;
        Ok(Box::new(CfbEncryptorBuilder { algo, with_integrity }))
    }

    /// Returns a password-based key encryption method.
    ///
    /// The salt is drawn from the OS generator; the iteration count
    /// is the largest encodable one.
    pub fn pbe_method<P>(&self, password: P)
                         -> Result<Box<dyn KeyEncryptionMethodGenerator>>
    where
        P: Into<Password>,
    {
        let mut salt = [0u8; 8];
        self.random(&mut salt)?;
        Ok(Box::new(PbeMethod {
            password: password.into(),
            s2k: S2K::Iterated {
                hash: HashAlgorithm::SHA256,
                salt,
                hash_bytes: S2K::decode_count(255),
            },
        }))
    }

    /// Returns a public-key key encryption method for `key`.
    pub fn key_method(&self, key: &key::PublicKey)
                      -> Result<Box<dyn KeyEncryptionMethodGenerator>> {
        Ok(Box::new(KeyMethod {
            key_id: key.key_id().clone(),
            pk_algo: key.algo(),
            key: rsa_public(key.algo(), key.mpis())?,
        }))
    }

    /// Returns a builder for RSA content signers hashing with `hash`.
    pub fn signer_builder(&self, hash: HashAlgorithm)
                          -> Box<dyn ContentSignerBuilder> {
        Box::new(RsaSignerBuilder { hash })
    }

    /// Returns a session key decryptor factory for `key`.
    pub fn key_decryptor(&self, key: &key::PrivateKey)
                         -> Result<Box<dyn PublicKeyDecryptorFactory>> {
        Ok(Box::new(KeyDecryptor {
            key_id: key.key_id().clone(),
            key: rsa_private(key.algo(), key.public_mpis(), key.mpis())?,
        }))
    }
}

fn digest_context(algo: HashAlgorithm) -> Result<DigestContext> {
    use self::DigestContext::*;
    match algo {
        HashAlgorithm::MD5 => Ok(MD5(md5::Md5::new())),
        HashAlgorithm::SHA1 => Ok(SHA1(sha1collisiondetection::Sha1CD::new())),
        HashAlgorithm::SHA224 => Ok(SHA224(sha2::Sha224::new())),
        HashAlgorithm::SHA256 => Ok(SHA256(sha2::Sha256::new())),
        HashAlgorithm::SHA384 => Ok(SHA384(sha2::Sha384::new())),
        HashAlgorithm::SHA512 => Ok(SHA512(sha2::Sha512::new())),
        algo => Err(Error::UnsupportedHashAlgorithm(algo).into()),
    }
}

enum DigestContext {
    MD5(md5::Md5),
    SHA1(sha1collisiondetection::Sha1CD),
    SHA224(sha2::Sha224),
    SHA256(sha2::Sha256),
    SHA384(sha2::Sha384),
    SHA512(sha2::Sha512),
}

struct BackendDigest {
    algo: HashAlgorithm,
    ctx: DigestContext,
}

macro_rules! for_each_digest {
    ($ctx:expr, $inner:ident, $body:expr) => {
        match $ctx {
            DigestContext::MD5($inner) => $body,
            DigestContext::SHA1($inner) => $body,
            DigestContext::SHA224($inner) => $body,
            DigestContext::SHA256($inner) => $body,
            DigestContext::SHA384($inner) => $body,
            DigestContext::SHA512($inner) => $body,
        }
    };
}

impl Digest for BackendDigest {
    fn algo(&self) -> HashAlgorithm {
        self.algo
    }

    fn digest_size(&self) -> usize {
        self.algo.digest_size().expect("constructed from a known algorithm")
    }

    fn update(&mut self, data: &[u8]) {
        for_each_digest!(&mut self.ctx, ctx, digest::Update::update(ctx, data))
    }

    fn digest(&mut self, digest: &mut [u8]) -> Result<()> {
        let d: Vec<u8> = for_each_digest!(
            &mut self.ctx, ctx, {
                let taken = std::mem::take(ctx);
                digest::FixedOutput::finalize_fixed(taken).to_vec()
            });
        let n = cmp::min(d.len(), digest.len());
        digest[..n].copy_from_slice(&d[..n]);
        Ok(())
    }
}

impl DigestProvider for Backend {
    fn digest(&self, algo: HashAlgorithm) -> Result<Box<dyn Digest>> {
        Ok(Box::new(BackendDigest { algo, ctx: digest_context(algo)? }))
    }
}

impl FingerprintCalculator for Backend {
    fn calculate(&self, key: &packet::Key) -> Result<Vec<u8>> {
        if key.version() <= 3 {
            // MD5 over the raw RSA modulus and exponent bytes.
            let (n, e) = match key.mpis() {
                mpi::PublicKey::RSA { n, e } => (n, e),
                _ => return Err(Error::InvalidArgument(
                    "version 3 keys are always RSA".into()).into()),
            };
            let mut ctx = md5::Md5::new();
            digest::Update::update(&mut ctx, n.value());
            digest::Update::update(&mut ctx, e.value());
            Ok(ctx.finalize().to_vec())
        } else {
            // SHA-1 over the framed public key packet body.
            let body = key.public_encoded()?;
            let mut ctx = sha1collisiondetection::Sha1CD::new();
            digest::Update::update(&mut ctx, &[0x99]);
            digest::Update::update(&mut ctx, &(body.len() as u16).to_be_bytes());
            digest::Update::update(&mut ctx, &body);
            Ok(ctx.finalize().to_vec())
        }
    }
}

// Symmetric ciphers.

enum CfbEnc {
    TripleDES(BufEncryptor<des::TdesEde3>),
    CAST5(BufEncryptor<cast5::Cast5>),
    Blowfish(BufEncryptor<blowfish::Blowfish>),
    Aes128(BufEncryptor<aes::Aes128>),
    Aes192(BufEncryptor<aes::Aes192>),
    Aes256(BufEncryptor<aes::Aes256>),
    Twofish(BufEncryptor<twofish::Twofish>),
}

enum CfbDec {
    TripleDES(BufDecryptor<des::TdesEde3>),
    CAST5(BufDecryptor<cast5::Cast5>),
    Blowfish(BufDecryptor<blowfish::Blowfish>),
    Aes128(BufDecryptor<aes::Aes128>),
    Aes192(BufDecryptor<aes::Aes192>),
    Aes256(BufDecryptor<aes::Aes256>),
    Twofish(BufDecryptor<twofish::Twofish>),
}

macro_rules! make_cfb {
    ($mode:ident, $wrap:ident) => {
        fn make(algo: SymmetricAlgorithm, key: &[u8], iv: &[u8])
                -> Result<$mode> {
            let bad_key = |_| Error::InvalidArgument(
                format!("invalid key or IV size for {}", algo));
            Ok(match algo {
                SymmetricAlgorithm::TripleDES => $mode::TripleDES(
                    $wrap::<des::TdesEde3>::new_from_slices(key, iv)
                        .map_err(bad_key)?),
                SymmetricAlgorithm::CAST5 => $mode::CAST5(
                    $wrap::<cast5::Cast5>::new_from_slices(key, iv)
                        .map_err(bad_key)?),
                SymmetricAlgorithm::Blowfish => $mode::Blowfish(
                    $wrap::<blowfish::Blowfish>::new_from_slices(key, iv)
                        .map_err(bad_key)?),
                SymmetricAlgorithm::AES128 => $mode::Aes128(
                    $wrap::<aes::Aes128>::new_from_slices(key, iv)
                        .map_err(bad_key)?),
                SymmetricAlgorithm::AES192 => $mode::Aes192(
                    $wrap::<aes::Aes192>::new_from_slices(key, iv)
                        .map_err(bad_key)?),
                SymmetricAlgorithm::AES256 => $mode::Aes256(
                    $wrap::<aes::Aes256>::new_from_slices(key, iv)
                        .map_err(bad_key)?),
                SymmetricAlgorithm::Twofish => $mode::Twofish(
                    $wrap::<twofish::Twofish>::new_from_slices(key, iv)
                        .map_err(bad_key)?),
                algo =>
                    return Err(
                        Error::UnsupportedSymmetricAlgorithm(algo).into()),
            })
        }
    };
}

macro_rules! cfb_apply {
    ($mode:ident, $this:expr, $inner:ident, $body:expr) => {
        match $this {
            $mode::TripleDES($inner) => $body,
            $mode::CAST5($inner) => $body,
            $mode::Blowfish($inner) => $body,
            $mode::Aes128($inner) => $body,
            $mode::Aes192($inner) => $body,
            $mode::Aes256($inner) => $body,
            $mode::Twofish($inner) => $body,
        }
    };
}

impl CfbEnc {
    make_cfb!(CfbEnc, BufEncryptor);

    fn encrypt(&mut self, data: &mut [u8]) {
        cfb_apply!(CfbEnc, self, c, c.encrypt(data))
    }
}

impl CfbDec {
    make_cfb!(CfbDec, BufDecryptor);

    fn decrypt(&mut self, data: &mut [u8]) {
        cfb_apply!(CfbDec, self, c, c.decrypt(data))
    }
}

struct CfbEncryptorBuilder {
    algo: SymmetricAlgorithm,
    with_integrity: bool,
}

impl DataEncryptorBuilder for CfbEncryptorBuilder {
    fn algorithm(&self) -> SymmetricAlgorithm {
        self.algo
    }

    fn with_integrity_protection(&self) -> bool {
        self.with_integrity
    }

    fn random(&self, buf: &mut [u8]) -> Result<()> {
        Backend::default().random(buf)
    }

    fn build(&self, key: &SessionKey) -> Result<Box<dyn DataEncryptor>> {
        let iv = vec![0u8; self.algo.block_size()?];
        Ok(Box::new(CfbDataEncryptor {
            algo: self.algo,
            key: Protected::from(&key[..]),
            cipher: CfbEnc::make(self.algo, key, &iv)?,
            digest: if self.with_integrity {
                Some(Backend::default().digest(HashAlgorithm::SHA1)?)
            } else {
                None
            },
        }))
    }
}

struct CfbDataEncryptor {
    algo: SymmetricAlgorithm,
    // Retained for resynchronization.
    key: Protected,
    cipher: CfbEnc,
    digest: Option<Box<dyn Digest>>,
}

impl DataEncryptor for CfbDataEncryptor {
    fn algorithm(&self) -> SymmetricAlgorithm {
        self.algo
    }

    fn block_size(&self) -> usize {
        self.algo.block_size().expect("constructed from a known algorithm")
    }

    fn encrypt(&mut self, data: &mut [u8]) -> Result<()> {
        self.cipher.encrypt(data);
        Ok(())
    }

    fn resync(&mut self, iv: &[u8]) -> Result<()> {
        self.cipher = CfbEnc::make(self.algo, &self.key, iv)?;
        Ok(())
    }

    fn take_integrity_digest(&mut self) -> Option<Box<dyn Digest>> {
        self.digest.take()
    }
}

struct CfbDataDecryptor {
    algo: SymmetricAlgorithm,
    key: Protected,
    cipher: CfbDec,
    digest: Option<Box<dyn Digest>>,
}

impl DataDecryptor for CfbDataDecryptor {
    fn block_size(&self) -> usize {
        self.algo.block_size().expect("constructed from a known algorithm")
    }

    fn decrypt(&mut self, data: &mut [u8]) -> Result<()> {
        self.cipher.decrypt(data);
        Ok(())
    }

    fn resync(&mut self, iv: &[u8]) -> Result<()> {
        self.cipher = CfbDec::make(self.algo, &self.key, iv)?;
        Ok(())
    }

    fn take_integrity_digest(&mut self) -> Option<Box<dyn Digest>> {
        self.digest.take()
    }
}

impl DataDecryptorFactory for Backend {
    fn create_decryptor(&self, algo: SymmetricAlgorithm, key: &SessionKey,
                        iv: &[u8], with_integrity: bool)
                        -> Result<Box<dyn DataDecryptor>> {
        Ok(Box::new(CfbDataDecryptor {
            algo,
            key: Protected::from(&key[..]),
            cipher: CfbDec::make(algo, key, iv)?,
            digest: if with_integrity {
                Some(self.digest(HashAlgorithm::SHA1)?)
            } else {
                None
            },
        }))
    }
}

impl PbeDecryptorFactory for Backend {
    fn make_key_from_passphrase(&self, algo: SymmetricAlgorithm, s2k: &S2K,
                                passphrase: &Password) -> Result<SessionKey> {
        s2k.derive_key(self, passphrase, algo.key_size()?)
    }

    fn checksum_digest(&self, algo: HashAlgorithm) -> Result<Box<dyn Digest>> {
        self.digest(algo)
    }
}

// RSA math.

fn rsa_public(algo: PublicKeyAlgorithm, mpis: &mpi::PublicKey)
              -> Result<RsaPublicKey> {
    match mpis {
        mpi::PublicKey::RSA { e, n } => RsaPublicKey::new(
            BigUint::from_bytes_be(n.value()),
            BigUint::from_bytes_be(e.value()))
            .map_err(|e| Error::InvalidArgument(
                format!("bad RSA public key: {}", e)).into()),
        _ => Err(Error::UnsupportedPublicKeyAlgorithm(algo).into()),
    }
}

fn rsa_private(algo: PublicKeyAlgorithm, public: &mpi::PublicKey,
               secret: &mpi::SecretKeyMaterial) -> Result<RsaPrivateKey> {
    match (public, secret) {
        (mpi::PublicKey::RSA { e, n },
         mpi::SecretKeyMaterial::RSA { d, p, q, .. }) =>
            RsaPrivateKey::from_components(
                BigUint::from_bytes_be(n.value()),
                BigUint::from_bytes_be(e.value()),
                BigUint::from_bytes_be(d.value()),
                vec![BigUint::from_bytes_be(p.value()),
                     BigUint::from_bytes_be(q.value())])
            .map_err(|e| Error::InvalidArgument(
                format!("bad RSA private key: {}", e)).into()),
        _ => Err(Error::UnsupportedPublicKeyAlgorithm(algo).into()),
    }
}

/// DER-encoded DigestInfo prefixes for PKCS#1 v1.5 signatures.
fn digest_info_prefix(algo: HashAlgorithm) -> Result<&'static [u8]> {
    match algo {
        HashAlgorithm::MD5 => Ok(&[
            0x30, 0x20, 0x30, 0x0c, 0x06, 0x08, 0x2a, 0x86, 0x48, 0x86,
            0xf7, 0x0d, 0x02, 0x05, 0x05, 0x00, 0x04, 0x10,
        ]),
        HashAlgorithm::SHA1 => Ok(&[
            0x30, 0x21, 0x30, 0x09, 0x06, 0x05, 0x2b, 0x0e, 0x03, 0x02,
            0x1a, 0x05, 0x00, 0x04, 0x14,
        ]),
        HashAlgorithm::SHA224 => Ok(&[
            0x30, 0x2d, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01,
            0x65, 0x03, 0x04, 0x02, 0x04, 0x05, 0x00, 0x04, 0x1c,
        ]),
        HashAlgorithm::SHA256 => Ok(&[
            0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01,
            0x65, 0x03, 0x04, 0x02, 0x01, 0x05, 0x00, 0x04, 0x20,
        ]),
        HashAlgorithm::SHA384 => Ok(&[
            0x30, 0x41, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01,
            0x65, 0x03, 0x04, 0x02, 0x02, 0x05, 0x00, 0x04, 0x30,
        ]),
        HashAlgorithm::SHA512 => Ok(&[
            0x30, 0x51, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01,
            0x65, 0x03, 0x04, 0x02, 0x03, 0x05, 0x00, 0x04, 0x40,
        ]),
        algo => Err(Error::UnsupportedHashAlgorithm(algo).into()),
    }
}

struct RsaSignerBuilder {
    hash: HashAlgorithm,
}

impl ContentSignerBuilder for RsaSignerBuilder {
    fn build(&self, _sig_type: SignatureType, key: &key::PrivateKey)
             -> Result<Box<dyn ContentSigner>> {
        if !key.algo().for_signing() {
            return Err(Error::UnsupportedPublicKeyAlgorithm(key.algo())
                       .into());
        }
        Ok(Box::new(RsaSigner {
            pk_algo: key.algo(),
            hash: self.hash,
            key_id: key.key_id().clone(),
            key: rsa_private(key.algo(), key.public_mpis(), key.mpis())?,
            ctx: Backend::default().digest(self.hash)?,
            digest: None,
        }))
    }
}

struct RsaSigner {
    pk_algo: PublicKeyAlgorithm,
    hash: HashAlgorithm,
    key_id: KeyID,
    key: RsaPrivateKey,
    ctx: Box<dyn Digest>,
    digest: Option<Vec<u8>>,
}

impl ContentSigner for RsaSigner {
    fn public_key_algorithm(&self) -> PublicKeyAlgorithm {
        self.pk_algo
    }

    fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash
    }

    fn key_id(&self) -> KeyID {
        self.key_id.clone()
    }

    fn update(&mut self, data: &[u8]) {
        self.ctx.update(data);
    }

    fn digest(&mut self) -> Result<Vec<u8>> {
        if self.digest.is_none() {
            let mut digest = vec![0u8; self.ctx.digest_size()];
            self.ctx.digest(&mut digest)?;
            self.digest = Some(digest);
        }
        Ok(self.digest.clone().unwrap())
    }

    fn signature(&mut self) -> Result<mpi::Signature> {
        let digest = self.digest()?;
        let mut digest_info = digest_info_prefix(self.hash)?.to_vec();
        digest_info.extend_from_slice(&digest);

        let sig = self.key.sign(Pkcs1v15Sign::new_unprefixed(), &digest_info)
            .map_err(|e| Error::BadSignature(
                format!("RSA signing failed: {}", e)))?;
        Ok(mpi::Signature::RSA { s: MPI::new(&sig) })
    }
}

impl ContentVerifierBuilderProvider for Backend {
    fn get(&self, pk_algo: PublicKeyAlgorithm, hash_algo: HashAlgorithm)
           -> Result<Box<dyn ContentVerifierBuilder>> {
        if !pk_algo.for_signing() {
            return Err(Error::UnsupportedPublicKeyAlgorithm(pk_algo).into());
        }
        Ok(Box::new(RsaVerifierBuilder { hash: hash_algo }))
    }
}

struct RsaVerifierBuilder {
    hash: HashAlgorithm,
}

impl ContentVerifierBuilder for RsaVerifierBuilder {
    fn build(&self, key: &key::PublicKey) -> Result<Box<dyn ContentVerifier>> {
        Ok(Box::new(RsaVerifier {
            hash: self.hash,
            key: rsa_public(key.algo(), key.mpis())?,
            ctx: Backend::default().digest(self.hash)?,
            digest: None,
        }))
    }
}

struct RsaVerifier {
    hash: HashAlgorithm,
    key: RsaPublicKey,
    ctx: Box<dyn Digest>,
    digest: Option<Vec<u8>>,
}

impl ContentVerifier for RsaVerifier {
    fn update(&mut self, data: &[u8]) {
        self.ctx.update(data);
    }

    fn digest(&mut self) -> Result<Vec<u8>> {
        if self.digest.is_none() {
            let mut digest = vec![0u8; self.ctx.digest_size()];
            self.ctx.digest(&mut digest)?;
            self.digest = Some(digest);
        }
        Ok(self.digest.clone().unwrap())
    }

    fn verify(&mut self, sig: &mpi::Signature) -> Result<bool> {
        let s = match sig {
            mpi::Signature::RSA { s } => s,
            _ => return Ok(false),
        };

        let digest = self.digest()?;
        let mut digest_info = digest_info_prefix(self.hash)?.to_vec();
        digest_info.extend_from_slice(&digest);

        match self.key.verify(Pkcs1v15Sign::new_unprefixed(), &digest_info,
                              s.value()) {
            Ok(()) => Ok(true),
            Err(_) => Ok(false),
        }
    }
}

// Key encryption methods.

struct PbeMethod {
    password: Password,
    s2k: S2K,
}

impl KeyEncryptionMethodGenerator for PbeMethod {
    fn passphrase_derived_key(&self, algo: SymmetricAlgorithm)
                              -> Option<Result<SessionKey>> {
        Some(Backend::default()
             .make_key_from_passphrase(algo, &self.s2k, &self.password))
    }

    fn generate(&self, algo: SymmetricAlgorithm,
                session_key: Option<&SessionKey>) -> Result<Packet> {
        let esk = match session_key {
            None => None,
            Some(sk) => {
                // The session key travels encrypted under the
                // passphrase-derived key, prefixed by its algorithm
                // octet.
                let key = Backend::default().make_key_from_passphrase(
                    algo, &self.s2k, &self.password)?;
                let mut esk = Vec::with_capacity(1 + sk.len());
                esk.push(algo.into());
                esk.extend_from_slice(sk);
                let iv = vec![0u8; algo.block_size()?];
                CfbEnc::make(algo, &key, &iv)?.encrypt(&mut esk);
                Some(esk.into_boxed_slice())
            }
        };

        Ok(Packet::SKESK(SKESK4::new(algo, self.s2k, esk)))
    }
}

struct KeyMethod {
    key_id: KeyID,
    pk_algo: PublicKeyAlgorithm,
    key: RsaPublicKey,
}

impl KeyEncryptionMethodGenerator for KeyMethod {
    fn passphrase_derived_key(&self, _algo: SymmetricAlgorithm)
                              -> Option<Result<SessionKey>> {
        None
    }

    fn generate(&self, algo: SymmetricAlgorithm,
                session_key: Option<&SessionKey>) -> Result<Packet> {
        let sk = session_key.ok_or_else(|| Error::InvalidOperation(
            "public key methods require a session key".into()))?;

        let mut session_info = Vec::with_capacity(sk.len() + 3);
        session_info.push(algo.into());
        session_info.extend_from_slice(sk);
        session_info.extend_from_slice(&checksum(sk).to_be_bytes());

        let ct = self.key.encrypt(&mut OsRng, Pkcs1v15Encrypt, &session_info)
            .map_err(|e| Error::InvalidArgument(
                format!("RSA encryption failed: {}", e)))?;

        Ok(Packet::PKESK(PKESK3::new(
            self.key_id.clone(), self.pk_algo,
            mpi::Ciphertext::RSA { c: MPI::new(&ct) })))
    }
}

struct KeyDecryptor {
    key_id: KeyID,
    key: RsaPrivateKey,
}

impl DataDecryptorFactory for KeyDecryptor {
    fn create_decryptor(&self, algo: SymmetricAlgorithm, key: &SessionKey,
                        iv: &[u8], with_integrity: bool)
                        -> Result<Box<dyn DataDecryptor>> {
        Backend::default().create_decryptor(algo, key, iv, with_integrity)
    }
}

impl PublicKeyDecryptorFactory for KeyDecryptor {
    fn key_id(&self) -> KeyID {
        self.key_id.clone()
    }

    fn recover_session_data(&self, ciphertext: &mpi::Ciphertext)
                            -> Result<Protected> {
        let c = match ciphertext {
            mpi::Ciphertext::RSA { c } => c,
            _ => return Err(Error::UnsupportedPublicKeyAlgorithm(
                PublicKeyAlgorithm::Unknown(0)).into()),
        };

        // A padding failure here almost certainly means the wrong
        // key was used.
        let m = self.key.decrypt(Pkcs1v15Encrypt, c.value())
            .map_err(|_| Error::DataValidation(
                "session key decryption failed".into()))?;
        Ok(Protected::from(m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha1_vector() {
        let backend = Backend::default();
        let mut ctx = backend.digest(HashAlgorithm::SHA1).unwrap();
        ctx.update(b"abc");
        let mut digest = vec![0u8; ctx.digest_size()];
        ctx.digest(&mut digest).unwrap();
        assert_eq!(crate::fmt::to_hex(&digest, false),
                   "A9993E364706816ABA3E25717850C26C9CD0D89D");
    }

    #[test]
    fn aes128_cfb_vector() {
        // NIST SP 800-38A, F.3.13.
        let key = crate::fmt::from_hex(
            "2b7e151628aed2a6abf7158809cf4f3c", false).unwrap();
        let iv = crate::fmt::from_hex(
            "000102030405060708090a0b0c0d0e0f", false).unwrap();
        let mut data = crate::fmt::from_hex(
            "6bc1bee22e409f96e93d7e117393172a", false).unwrap();

        let mut cipher =
            CfbEnc::make(SymmetricAlgorithm::AES128, &key, &iv).unwrap();
        cipher.encrypt(&mut data);
        assert_eq!(crate::fmt::to_hex(&data, false),
                   "3B3FD92EB72DAD20333449F8E83CFB4A");
    }

    #[test]
    fn rsa_sign_verify() {
        let key = RsaPrivateKey::new(&mut OsRng, 1024).unwrap();
        let digest_info = {
            let mut v = digest_info_prefix(HashAlgorithm::SHA256).unwrap()
                .to_vec();
            v.extend_from_slice(&[0xab; 32]);
            v
        };
        let sig = key.sign(Pkcs1v15Sign::new_unprefixed(), &digest_info)
            .unwrap();
        assert!(RsaPublicKey::from(&key)
                .verify(Pkcs1v15Sign::new_unprefixed(), &digest_info, &sig)
                .is_ok());
    }
}
