//! Symmetric encryption streams.
//!
//! Adapters connecting the in-place [`DataEncryptor`] and
//! [`DataDecryptor`] engine objects to `std::io` streams.
//!
//!   [`DataEncryptor`]: crate::crypto::engines::DataEncryptor
//!   [`DataDecryptor`]: crate::crypto::engines::DataDecryptor

use std::cmp;
use std::io;

use crate::crypto::engines::{DataDecryptor, DataEncryptor};

// Encrypting in place requires a scratch copy of the caller's data;
// bound it so large writes do not balloon.
const SCRATCH_SIZE: usize = 4096;

/// A `Write`r for symmetrically encrypting data.
///
/// Closing the writer does not close the wrapped sink; use
/// [`finish`] to recover it.
///
///   [`finish`]: Encryptor::finish
pub struct Encryptor<W: io::Write> {
    inner: Option<W>,
    cipher: Box<dyn DataEncryptor>,
    scratch: Vec<u8>,
}

impl<W: io::Write> Encryptor<W> {
    /// Instantiates a new symmetric encryptor writing to `sink`.
    pub fn new(cipher: Box<dyn DataEncryptor>, sink: W) -> Self {
        Encryptor {
            inner: Some(sink),
            cipher,
            scratch: vec![0u8; SCRATCH_SIZE],
        }
    }

    /// Finishes encryption and returns the sink.
    pub fn finish(&mut self) -> io::Result<W> {
        self.inner.take().ok_or_else(
            || io::Error::new(io::ErrorKind::BrokenPipe,
                              "inner writer was taken"))
    }
}

impl<W: io::Write> io::Write for Encryptor<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let inner = self.inner.as_mut().ok_or_else(
            || io::Error::new(io::ErrorKind::BrokenPipe,
                              "inner writer was taken"))?;

        for chunk in buf.chunks(self.scratch.len()) {
            let scratch = &mut self.scratch[..chunk.len()];
            scratch.copy_from_slice(chunk);
            self.cipher.encrypt(scratch).map_err(
                |e| io::Error::new(io::ErrorKind::InvalidInput,
                                   e.to_string()))?;
            inner.write_all(scratch)?;
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(ref mut inner) = self.inner {
            inner.flush()
        } else {
            Err(io::Error::new(io::ErrorKind::BrokenPipe,
                               "inner writer was taken"))
        }
    }
}

/// A `Read`er for decrypting symmetrically encrypted data.
pub struct Decryptor<R: io::Read> {
    source: R,
    cipher: Box<dyn DataDecryptor>,
}

impl<R: io::Read> Decryptor<R> {
    /// Instantiates a new symmetric decryptor reading from `source`.
    pub fn new(cipher: Box<dyn DataDecryptor>, source: R) -> Self {
        Decryptor { source, cipher }
    }
}

impl<R: io::Read> io::Read for Decryptor<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // Read as much ciphertext as the caller's buffer holds, then
        // decrypt it in place.  The feedback register keeps byte
        // granularity, so short reads need no realignment.
        let mut amount = 0;
        while amount < buf.len() {
            match self.source.read(&mut buf[amount..]) {
                Ok(0) => break,
                Ok(n) => amount += n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted =>
                    continue,
                Err(e) => {
                    if amount > 0 {
                        break;
                    } else {
                        return Err(e);
                    }
                }
            }
        }

        self.cipher.decrypt(&mut buf[..amount]).map_err(
            |e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
        Ok(amount)
    }
}

#[cfg(test)]
#[cfg(feature = "crypto-rust")]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    use crate::crypto::backend::Backend;
    use crate::crypto::engines::{DataDecryptorFactory, DataEncryptorBuilder};
    use crate::types::SymmetricAlgorithm;

    const TEXT: &[u8] =
        b"Spread and scatter, fall back to the treeline, and hold.";

    #[test]
    fn roundtrip() {
        let backend = Backend::default();
        for algo in [SymmetricAlgorithm::TripleDES,
                     SymmetricAlgorithm::CAST5,
                     SymmetricAlgorithm::Blowfish,
                     SymmetricAlgorithm::AES128,
                     SymmetricAlgorithm::AES192,
                     SymmetricAlgorithm::AES256,
                     SymmetricAlgorithm::Twofish].iter().cloned() {
            let builder =
                backend.data_encryptor_builder(algo, false).unwrap();
            let mut key = vec![0u8; algo.key_size().unwrap()];
            builder.random(&mut key).unwrap();
            let key = key.into();
            let iv = vec![0u8; algo.block_size().unwrap()];

            let mut ciphertext = Vec::new();
            let mut encryptor = Encryptor::new(
                builder.build(&key).unwrap(), &mut ciphertext);
            // Write bytewise to exercise the streaming cipher state.
            for b in TEXT.chunks(1) {
                encryptor.write_all(b).unwrap();
            }
            encryptor.finish().unwrap();
            assert_eq!(ciphertext.len(), TEXT.len());
            assert!(&ciphertext[..] != TEXT);

            let mut plaintext = Vec::new();
            let mut decryptor = Decryptor::new(
                backend.create_decryptor(algo, &key, &iv, false).unwrap(),
                &ciphertext[..]);
            decryptor.read_to_end(&mut plaintext).unwrap();
            assert_eq!(&plaintext[..], TEXT);
        }
    }

    #[test]
    fn resync_restarts_the_feedback_register() {
        let backend = Backend::default();
        let algo = SymmetricAlgorithm::AES128;
        let builder = backend.data_encryptor_builder(algo, false).unwrap();
        let key = vec![7u8; 16].into();

        let mut one = builder.build(&key).unwrap();
        let mut buf = TEXT[..16].to_vec();
        one.encrypt(&mut buf).unwrap();
        one.resync(&buf.clone()).unwrap();
        let mut tail = TEXT[16..32].to_vec();
        one.encrypt(&mut tail).unwrap();

        // A fresh cipher keyed with the same key and the ciphertext
        // of the first block as IV produces the same stream.
        let mut two = backend.create_decryptor(algo, &key, &buf, false)
            .unwrap();
        two.decrypt(&mut tail).unwrap();
        assert_eq!(&tail[..], &TEXT[16..32]);
    }
}
