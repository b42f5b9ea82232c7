//! End-to-end tests for the encrypted data engine.

#![cfg(feature = "crypto-rust")]

mod common;

use std::io::{Read, Write};

use larch_openpgp::Error;
use larch_openpgp::crypto::backend::Backend;
use larch_openpgp::parse::{Object, ObjectFactory};
use larch_openpgp::serialize::stream::EncryptedDataGenerator;
use larch_openpgp::types::SymmetricAlgorithm;

use crate::common::failed_with;

fn encrypt_with_password(passphrase: &str, plaintext: &[u8],
                         integrity: bool, length: Option<u64>) -> Vec<u8> {
    let backend = Backend::default();
    let mut generator = EncryptedDataGenerator::new(
        backend.data_encryptor_builder(SymmetricAlgorithm::AES256,
                                       integrity).unwrap());
    generator.add_method(backend.pbe_method(passphrase).unwrap());

    let mut out = Vec::new();
    let mut w = generator.open(&mut out, length).unwrap();
    w.write_all(plaintext).unwrap();
    w.finish().unwrap();
    drop(w);
    out
}

fn decrypt_with_password(message: &[u8], passphrase: &str)
                         -> larch_openpgp::Result<(Vec<u8>, bool)> {
    let backend = Backend::default();
    let mut factory = ObjectFactory::from_bytes(message, &backend);
    let list = match factory.read_object()? {
        Some(Object::EncryptedDataList(list)) => list,
        _ => panic!("expected an encrypted data list"),
    };
    let integrity = list.integrity_protected();
    let mut reader =
        list.open_with_password(&backend, &passphrase.into(), 0)?;

    let mut plaintext = Vec::new();
    reader.read_to_end(&mut plaintext)?;
    let verified = if integrity { reader.verify()? } else { false };
    Ok((plaintext, verified))
}

// The canonical scenario: AES-256, integrity protected, a single
// password recipient, literal bytes "hello".
#[test]
fn password_roundtrip() {
    let message = encrypt_with_password("correct horse", b"hello",
                                        true, None);
    let (plaintext, verified) =
        decrypt_with_password(&message, "correct horse").unwrap();
    assert_eq!(plaintext, b"hello");
    assert!(verified);
}

#[test]
fn wrong_passphrase_fails_before_any_plaintext() {
    let message = encrypt_with_password("correct horse", b"hello",
                                        true, None);
    let r = decrypt_with_password(&message, "battery staple");
    assert!(failed_with(&r, |e| matches!(e, Error::KeyValidation(_))));
}

#[test]
fn fixed_length_framing_roundtrip() {
    let plaintext = vec![0x5a; 1000];
    let message = encrypt_with_password("pw", &plaintext, true,
                                        Some(plaintext.len() as u64));
    let (out, verified) = decrypt_with_password(&message, "pw").unwrap();
    assert_eq!(out, plaintext);
    assert!(verified);
}

#[test]
fn plain_container_roundtrip() {
    // The legacy SED form: no version byte, no trailing MDC.
    let message = encrypt_with_password("pw", b"plain old data",
                                        false, None);
    let (out, _) = decrypt_with_password(&message, "pw").unwrap();
    assert_eq!(out, b"plain old data");
}

#[test]
fn verify_before_draining_is_an_error() {
    let message = encrypt_with_password("pw", &vec![7u8; 4096], true, None);
    let backend = Backend::default();
    let mut factory = ObjectFactory::from_bytes(&message, &backend);
    let list = match factory.read_object().unwrap() {
        Some(Object::EncryptedDataList(list)) => list,
        _ => panic!("expected an encrypted data list"),
    };
    let mut reader =
        list.open_with_password(&backend, &"pw".into(), 0).unwrap();

    let mut first = [0u8; 100];
    reader.read_exact(&mut first).unwrap();
    let r = reader.verify();
    assert!(failed_with(&r, |e| matches!(e, Error::InvalidOperation(_))));
}

#[test]
fn declared_length_is_enforced() {
    let backend = Backend::default();
    let mut generator = EncryptedDataGenerator::new(
        backend.data_encryptor_builder(SymmetricAlgorithm::AES256, true)
            .unwrap());
    generator.add_method(backend.pbe_method("pw").unwrap());

    let mut out = Vec::new();
    let mut w = generator.open(&mut out, Some(100)).unwrap();
    w.write_all(&[0u8; 50]).unwrap();
    // 50 bytes short of the declared plaintext length.
    let r = w.finish();
    assert!(failed_with(&r, |e| matches!(e, Error::InvalidOperation(_))));
}

#[test]
fn open_without_methods_is_an_error() {
    let backend = Backend::default();
    let mut generator = EncryptedDataGenerator::new(
        backend.data_encryptor_builder(SymmetricAlgorithm::AES256, true)
            .unwrap());
    let r = generator.open(Vec::new(), None);
    assert!(match r {
        Err(e) => matches!(e.downcast_ref::<Error>(),
                           Some(Error::InvalidOperation(_))),
        Ok(_) => false,
    });
}

#[test]
fn open_twice_is_an_error() {
    let backend = Backend::default();
    let mut generator = EncryptedDataGenerator::new(
        backend.data_encryptor_builder(SymmetricAlgorithm::AES256, true)
            .unwrap());
    generator.add_method(backend.pbe_method("pw").unwrap());

    let mut one = Vec::new();
    let mut w = generator.open(&mut one, None).unwrap();
    w.write_all(b"x").unwrap();
    w.finish().unwrap();

    let r = generator.open(Vec::new(), None);
    assert!(match r {
        Err(e) => matches!(e.downcast_ref::<Error>(),
                           Some(Error::InvalidOperation(_))),
        Ok(_) => false,
    });
}

mod public_key {
    use super::*;
    use crate::common::rsa_key;
    use larch_openpgp::encrypted::Esk;

    fn encrypt_to_key(key: &larch_openpgp::key::PublicKey,
                      plaintext: &[u8]) -> Vec<u8> {
        let backend = Backend::default();
        let mut generator = EncryptedDataGenerator::new(
            backend.data_encryptor_builder(SymmetricAlgorithm::AES256,
                                           true).unwrap());
        generator.add_method(backend.key_method(key).unwrap());

        let mut out = Vec::new();
        let mut w = generator.open(&mut out, None).unwrap();
        w.write_all(plaintext).unwrap();
        w.finish().unwrap();
        drop(w);
        out
    }

    #[test]
    fn key_roundtrip() {
        let backend = Backend::default();
        let (public, private) = rsa_key(1_600_000_000, false);
        let message = encrypt_to_key(&public, b"for your eyes only");

        let mut factory = ObjectFactory::from_bytes(&message, &backend);
        let list = match factory.read_object().unwrap() {
            Some(Object::EncryptedDataList(list)) => list,
            _ => panic!("expected an encrypted data list"),
        };
        match &list.methods()[0] {
            Esk::Pkesk(pkesk) =>
                assert_eq!(pkesk.recipient(), public.key_id()),
            esk => panic!("expected a public key method, got {:?}", esk),
        }

        let decryptor = backend.key_decryptor(&private).unwrap();
        let mut reader = list.open_with_key(&*decryptor, 0).unwrap();
        let mut plaintext = Vec::new();
        reader.read_to_end(&mut plaintext).unwrap();
        assert_eq!(plaintext, b"for your eyes only");
        assert!(reader.verify().unwrap());
    }

    #[test]
    fn wrong_key_fails_at_session_key_recovery() {
        let backend = Backend::default();
        let (public, _) = rsa_key(1_600_000_000, false);
        let (_, other_private) = rsa_key(1_600_000_001, false);
        let message = encrypt_to_key(&public, b"secret");

        let mut factory = ObjectFactory::from_bytes(&message, &backend);
        let list = match factory.read_object().unwrap() {
            Some(Object::EncryptedDataList(list)) => list,
            _ => panic!("expected an encrypted data list"),
        };

        let decryptor = backend.key_decryptor(&other_private).unwrap();
        let r = list.open_with_key(&*decryptor, 0);
        assert!(match r {
            Err(e) => matches!(e.downcast_ref::<Error>(),
                               Some(Error::DataValidation(_))),
            Ok(_) => false,
        });
    }

    #[test]
    fn tampered_ciphertext_reads_but_does_not_verify() {
        let backend = Backend::default();
        let (public, private) = rsa_key(1_600_000_000, false);
        let plaintext = vec![0x42u8; 100];
        let mut message = encrypt_to_key(&public, &plaintext);

        // Flip one ciphertext byte well inside the plaintext region,
        // clear of the quick-check prefix and the trailing MDC.
        let n = message.len();
        message[n - 40] ^= 0x01;

        let mut factory = ObjectFactory::from_bytes(&message, &backend);
        let list = match factory.read_object().unwrap() {
            Some(Object::EncryptedDataList(list)) => list,
            _ => panic!("expected an encrypted data list"),
        };
        let decryptor = backend.key_decryptor(&private).unwrap();
        let mut reader = list.open_with_key(&*decryptor, 0).unwrap();

        // The stream stays readable; only the verdict changes.
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out.len(), plaintext.len());
        assert!(!reader.verify().unwrap());
    }

    #[test]
    fn corrupted_quick_check_fails_at_open() {
        let backend = Backend::default();
        let (public, private) = rsa_key(1_600_000_000, false);
        let plaintext = b"prefix checked";

        // A definite-length message so the prefix offset is known.
        let mut generator = EncryptedDataGenerator::new(
            backend.data_encryptor_builder(SymmetricAlgorithm::AES256,
                                           true).unwrap());
        generator.add_method(backend.key_method(&public).unwrap());
        let mut message = Vec::new();
        let mut w = generator.open(&mut message,
                                   Some(plaintext.len() as u64)).unwrap();
        w.write_all(plaintext).unwrap();
        w.finish().unwrap();
        drop(w);

        // SEIP body: version octet, then the 18 byte prefix.
        let body_len = 1 + 18 + plaintext.len() + 22;
        let prefix_start = message.len() - body_len + 1;
        // Corrupt the repeated suffix byte.
        message[prefix_start + 16] ^= 0x01;

        let mut factory = ObjectFactory::from_bytes(&message, &backend);
        let list = match factory.read_object().unwrap() {
            Some(Object::EncryptedDataList(list)) => list,
            _ => panic!("expected an encrypted data list"),
        };
        let decryptor = backend.key_decryptor(&private).unwrap();
        let r = list.open_with_key(&*decryptor, 0);
        assert!(match r {
            Err(e) => matches!(e.downcast_ref::<Error>(),
                               Some(Error::DataValidation(_))),
            Ok(_) => false,
        });
    }

    #[test]
    fn multiple_recipients_share_one_session_key() {
        let backend = Backend::default();
        let (public, private) = rsa_key(1_600_000_000, false);

        let mut generator = EncryptedDataGenerator::new(
            backend.data_encryptor_builder(SymmetricAlgorithm::AES256,
                                           true).unwrap());
        generator.add_method(backend.pbe_method("shared pw").unwrap());
        generator.add_method(backend.key_method(&public).unwrap());
        let mut message = Vec::new();
        let mut w = generator.open(&mut message, None).unwrap();
        w.write_all(b"either way in").unwrap();
        w.finish().unwrap();
        drop(w);

        // Via the passphrase.  With a second method registered, the
        // SKESK must carry a wrapped session key.
        {
            let mut factory = ObjectFactory::from_bytes(&message, &backend);
            let list = match factory.read_object().unwrap() {
                Some(Object::EncryptedDataList(list)) => list,
                _ => panic!("expected an encrypted data list"),
            };
            assert_eq!(list.methods().len(), 2);
            match &list.methods()[0] {
                Esk::Skesk(skesk) => assert!(skesk.esk().is_some()),
                esk => panic!("expected a password method, got {:?}", esk),
            }
            let mut reader = list.open_with_password(
                &backend, &"shared pw".into(), 0).unwrap();
            let mut out = Vec::new();
            reader.read_to_end(&mut out).unwrap();
            assert_eq!(out, b"either way in");
            assert!(reader.verify().unwrap());
        }

        // Via the key.
        {
            let mut factory = ObjectFactory::from_bytes(&message, &backend);
            let list = match factory.read_object().unwrap() {
                Some(Object::EncryptedDataList(list)) => list,
                _ => panic!("expected an encrypted data list"),
            };
            let decryptor = backend.key_decryptor(&private).unwrap();
            let mut reader = list.open_with_key(&*decryptor, 1).unwrap();
            let mut out = Vec::new();
            reader.read_to_end(&mut out).unwrap();
            assert_eq!(out, b"either way in");
            assert!(reader.verify().unwrap());
        }
    }
}

#[test]
fn single_password_skesk_carries_no_esk() {
    let backend = Backend::default();
    let message = encrypt_with_password("only me", b"x", true, None);
    let mut factory = ObjectFactory::from_bytes(&message, &backend);
    let list = match factory.read_object().unwrap() {
        Some(Object::EncryptedDataList(list)) => list,
        _ => panic!("expected an encrypted data list"),
    };
    match &list.methods()[0] {
        larch_openpgp::encrypted::Esk::Skesk(skesk) =>
            assert!(skesk.esk().is_none()),
        esk => panic!("expected a password method, got {:?}", esk),
    }
}
