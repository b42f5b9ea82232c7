//! Encrypted data readers.
//!
//! [`EncryptedDataList`] is handed out by the object factory when it
//! encounters encrypted session key packets followed by an encrypted
//! container.  Opening it with a recovered session key validates the
//! quick-check prefix and returns an [`EncryptedDataReader`] over the
//! plaintext.
//!
//! Integrity protected containers withhold the trailing MDC packet
//! from the consumer; after the stream is drained, [`verify`]
//! recomputes the digest and compares it in constant time.  Whether
//! the stream is *readable* and whether it is *authentic* are
//! deliberately separate questions: `verify` returns a boolean, it
//! does not throw.
//!
//!   [`verify`]: EncryptedDataReader::verify

use std::cmp;
use std::io;
use std::io::Read;

use crate::Error;
use crate::Result;
use crate::crypto::{Protected, SessionKey, checksum};
use crate::crypto::engines::{
    DataDecryptor, Digest, PbeDecryptorFactory, PublicKeyDecryptorFactory,
};
use crate::crypto::mem::secure_eq;
use crate::crypto::Password;
use crate::packet::{PKESK3, SKESK4};
use crate::parse::ObjectFactory;
use crate::types::SymmetricAlgorithm;

// The MDC packet: a two-octet header and a SHA-1 digest.
const MDC_LEN: usize = 22;

/// One parsed encrypted session key packet.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Esk {
    /// A password-based method.
    Skesk(SKESK4),
    /// A public-key-based method.
    Pkesk(PKESK3),
}

/// Encrypted session key packets together with their encrypted
/// container, positioned at the ciphertext.
pub struct EncryptedDataList<'f, 'a> {
    factory: &'f mut ObjectFactory<'a>,
    methods: Vec<Esk>,
    integrity: bool,
}

impl<'f, 'a> EncryptedDataList<'f, 'a> {
    pub(crate) fn new(factory: &'f mut ObjectFactory<'a>,
                      methods: Vec<Esk>, integrity: bool) -> Self {
        EncryptedDataList { factory, methods, integrity }
    }

    /// Returns the key encryption methods in stream order.
    pub fn methods(&self) -> &[Esk] {
        &self.methods
    }

    /// Returns whether the container carries a trailing integrity
    /// code.
    pub fn integrity_protected(&self) -> bool {
        self.integrity
    }

    /// Opens the container with a passphrase, using the
    /// password-based method at `index`.
    ///
    /// The session key is re-derived from the passphrase.  A failed
    /// quick check fails with [`Error::KeyValidation`]: without an
    /// independent check on the recovered key, a bad prefix most
    /// likely means a wrong passphrase.
    pub fn open_with_password(self, engine: &dyn PbeDecryptorFactory,
                              password: &Password, index: usize)
                              -> Result<EncryptedDataReader<'f, 'a>> {
        let skesk = match self.methods.get(index) {
            None => return Err(Error::IndexOutOfRange.into()),
            Some(Esk::Pkesk(_)) => return Err(Error::InvalidArgument(
                "the method at this index is not password based".into())
                .into()),
            Some(Esk::Skesk(skesk)) => skesk,
        };

        let algo = skesk.symmetric_algo();
        let derived =
            engine.make_key_from_passphrase(algo, skesk.s2k(), password)?;

        let (algo, key) = match skesk.esk() {
            // Without an encrypted session key, the derived key is
            // the message key.
            None => (algo, derived),
            Some(esk) => {
                if esk.len() < 2 {
                    return Err(Error::MalformedPacket(
                        "encrypted session key too short".into()).into());
                }
                let mut esk = Protected::from(esk);
                let iv = vec![0u8; algo.block_size()?];
                engine.create_decryptor(algo, &derived, &iv, false)?
                    .decrypt(&mut esk)?;
                (esk[0].into(), SessionKey::from(&esk[1..]))
            }
        };

        EncryptedDataReader::open(self.factory, engine, algo, key,
                                  self.integrity, Error::KeyValidation)
    }

    /// Opens the container with a decryption key, using the
    /// public-key method at `index`.
    ///
    /// The additive checksum embedded in the recovered session data
    /// is validated first; a mismatch, like a failed quick check,
    /// fails with [`Error::DataValidation`].  No further detail is
    /// attached to either failure, to avoid serving as a padding or
    /// format oracle.
    pub fn open_with_key(self, engine: &dyn PublicKeyDecryptorFactory,
                         index: usize)
                         -> Result<EncryptedDataReader<'f, 'a>> {
        let pkesk = match self.methods.get(index) {
            None => return Err(Error::IndexOutOfRange.into()),
            Some(Esk::Skesk(_)) => return Err(Error::InvalidArgument(
                "the method at this index is not public-key based".into())
                .into()),
            Some(Esk::Pkesk(pkesk)) => pkesk,
        };

        let data = engine.recover_session_data(pkesk.esk())?;
        if data.len() < 3 {
            return Err(Error::DataValidation(
                "session data check failed".into()).into());
        }
        let algo: SymmetricAlgorithm = data[0].into();
        let key = &data[1..data.len() - 2];
        let expected = u16::from_be_bytes([
            data[data.len() - 2], data[data.len() - 1]]);
        if checksum(key) != expected {
            return Err(Error::DataValidation(
                "session data check failed".into()).into());
        }

        EncryptedDataReader::open(self.factory, engine, algo,
                                  SessionKey::from(key), self.integrity,
                                  Error::DataValidation)
    }
}

/// A plaintext stream over an encrypted container.
///
/// Readers share the underlying ciphertext stream's position;
/// driving more than one reader derived from the same stream is not
/// supported.
pub struct EncryptedDataReader<'f, 'a> {
    factory: &'f mut ObjectFactory<'a>,
    cipher: Box<dyn DataDecryptor>,
    digest: Option<Box<dyn Digest>>,
    // Decrypted bytes not yet released; integrity protected streams
    // keep the trailing MDC packet here, away from the consumer.
    holdback: Vec<u8>,
    eof: bool,
    verified: Option<bool>,
}

impl<'f, 'a> EncryptedDataReader<'f, 'a> {
    fn open<E>(factory: &'f mut ObjectFactory<'a>, engine: &E,
               algo: SymmetricAlgorithm, key: SessionKey, integrity: bool,
               wrong_key: fn(String) -> Error) -> Result<Self>
    where
        E: crate::crypto::engines::DataDecryptorFactory + ?Sized,
    {
        if key.len() != algo.key_size().map_err(
            |_| wrong_key("data check failed".into()))?
        {
            return Err(wrong_key("data check failed".into()).into());
        }

        let bs = algo.block_size()?;
        let iv = vec![0u8; bs];
        let mut cipher = engine.create_decryptor(algo, &key, &iv,
                                                 integrity)?;
        let mut digest = cipher.take_integrity_digest();

        // The quick-check prefix: block size + 2 bytes whose last two
        // repeat the two before them.  An all-zero prefix is accepted
        // for legacy reasons.  Nothing beyond pass/fail is reported.
        let ct: Vec<u8> = factory.reader.body_reader()
            .data_consume_hard(bs + 2)?[..bs + 2].to_vec();
        let mut prefix = ct.clone();
        cipher.decrypt(&mut prefix)?;

        let repeats = prefix[bs] == prefix[bs - 2]
            && prefix[bs + 1] == prefix[bs - 1];
        let all_zero = prefix.iter().all(|&b| b == 0);
        if !repeats && !all_zero {
            return Err(wrong_key("data check failed".into()).into());
        }

        if let Some(d) = digest.as_mut() {
            d.update(&prefix);
        }
        if !integrity {
            cipher.resync(&ct[2..])?;
        }

        Ok(EncryptedDataReader {
            factory,
            cipher,
            digest,
            holdback: Vec::new(),
            eof: false,
            verified: None,
        })
    }

    /// Checks the trailing integrity code.
    ///
    /// Only valid once the plaintext stream has been fully drained;
    /// calling it earlier fails with [`Error::InvalidOperation`].
    /// Returns whether the recomputed digest matches the one
    /// recovered from the stream tail; the comparison is constant
    /// time.
    pub fn verify(&mut self) -> Result<bool> {
        if let Some(result) = self.verified {
            return Ok(result);
        }

        let mut digest = match self.digest.take() {
            Some(digest) => digest,
            None => return Err(Error::InvalidOperation(
                "the container carries no integrity code".into()).into()),
        };
        if !self.eof || self.holdback.len() > MDC_LEN {
            self.digest = Some(digest);
            return Err(Error::InvalidOperation(
                "verify is only valid once the stream is drained".into())
                .into());
        }

        let result = if self.holdback.len() < MDC_LEN {
            // Truncated: the integrity code is missing.
            false
        } else {
            // The MDC packet's header is part of the digest input.
            digest.update(&self.holdback[..2]);
            let mut computed = vec![0u8; 20];
            digest.digest(&mut computed)?;
            let header_ok = self.holdback[0] == 0xd3
                && self.holdback[1] == 0x14;
            secure_eq(&computed, &self.holdback[2..]) & header_ok
        };

        self.verified = Some(result);
        Ok(result)
    }

    /// Skips any unread ciphertext and releases the factory.
    pub fn finish(self) -> Result<()> {
        self.factory.reader.pop_body()
    }
}

impl<'f, 'a> io::Read for EncryptedDataReader<'f, 'a> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        if self.digest.is_none() && self.verified.is_none() {
            // No integrity code: decrypt straight into the caller's
            // buffer.
            let n = self.factory.reader.body_reader().read(buf)?;
            self.cipher.decrypt(&mut buf[..n]).map_err(
                |e| io::Error::new(io::ErrorKind::InvalidData,
                                   e.to_string()))?;
            return Ok(n);
        }

        // Keep at least the MDC packet's worth of decrypted bytes
        // back.
        while self.holdback.len() < MDC_LEN + buf.len() && !self.eof {
            let mut chunk = [0u8; 4096];
            let want = cmp::min(chunk.len(),
                                MDC_LEN + buf.len() - self.holdback.len());
            let n = self.factory.reader.body_reader()
                .read(&mut chunk[..want])?;
            if n == 0 {
                self.eof = true;
                break;
            }
            self.cipher.decrypt(&mut chunk[..n]).map_err(
                |e| io::Error::new(io::ErrorKind::InvalidData,
                                   e.to_string()))?;
            self.holdback.extend_from_slice(&chunk[..n]);
        }

        let releasable = self.holdback.len().saturating_sub(MDC_LEN);
        let n = cmp::min(releasable, buf.len());
        if n == 0 {
            return Ok(0);
        }

        buf[..n].copy_from_slice(&self.holdback[..n]);
        if let Some(d) = self.digest.as_mut() {
            d.update(&self.holdback[..n]);
        }
        self.holdback.drain(..n);
        Ok(n)
    }
}
