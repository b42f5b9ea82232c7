//! Message layouts: literal data, compression, one-pass signatures.

#![cfg(feature = "crypto-rust")]

mod common;

use std::io::{Read, Write};

use larch_openpgp::crypto::backend::Backend;
use larch_openpgp::packet::Literal;
use larch_openpgp::parse::{Object, ObjectFactory};
use larch_openpgp::serialize::Serialize;
use larch_openpgp::serialize::stream::{
    CompressedDataGenerator, LiteralDataGenerator,
};
use larch_openpgp::sign::SignatureGenerator;
use larch_openpgp::types::{
    CompressionAlgorithm, DataFormat, HashAlgorithm, SignatureType,
};

use crate::common::rsa_key;

const CONTENT: &[u8] =
    b"There is no such thing as a harmless packet format quirk.\n";

fn literal_message(length: Option<u32>) -> Vec<u8> {
    let mut out = Vec::new();
    let literal = Literal::new(DataFormat::Binary)
        .with_filename(b"quip.txt").unwrap()
        .with_date(1_650_000_000);
    let mut gen = LiteralDataGenerator::new(
        literal, &mut out, length).unwrap();
    gen.write_all(CONTENT).unwrap();
    gen.finish().unwrap();
    drop(gen);
    out
}

#[test]
fn literal_roundtrip() {
    let backend = Backend::default();
    for length in [None, Some(CONTENT.len() as u32)].iter() {
        let message = literal_message(*length);

        let mut factory = ObjectFactory::from_bytes(&message, &backend);
        let mut literal = match factory.read_object().unwrap() {
            Some(Object::Literal(literal)) => literal,
            _ => panic!("expected literal data"),
        };
        assert_eq!(literal.filename(), b"quip.txt");
        assert_eq!(literal.date(), 1_650_000_000);

        let mut content = Vec::new();
        literal.read_to_end(&mut content).unwrap();
        assert_eq!(content, CONTENT);
        literal.finish().unwrap();

        assert!(factory.read_object().unwrap().is_none());
    }
}

#[test]
fn compression_roundtrip() {
    let backend = Backend::default();
    let mut algos = vec![CompressionAlgorithm::Uncompressed];
    #[cfg(feature = "compression-deflate")]
    {
        algos.push(CompressionAlgorithm::Zip);
        algos.push(CompressionAlgorithm::Zlib);
    }
    #[cfg(feature = "compression-bzip2")]
    algos.push(CompressionAlgorithm::BZip2);

    for algo in algos.iter().cloned() {
        let mut message = Vec::new();
        let mut gen =
            CompressedDataGenerator::new(algo, &mut message).unwrap();
        gen.write_all(&literal_message(None)).unwrap();
        gen.finish().unwrap();
        drop(gen);

        let mut factory = ObjectFactory::from_bytes(&message, &backend);
        let mut compressed = match factory.read_object().unwrap() {
            Some(Object::CompressedData(c)) => c,
            _ => panic!("expected compressed data"),
        };
        assert_eq!(compressed.algo(), algo);

        {
            let mut inner = compressed.data_stream().unwrap();
            let mut literal = match inner.read_object().unwrap() {
                Some(Object::Literal(literal)) => literal,
                _ => panic!("expected literal data"),
            };
            let mut content = Vec::new();
            literal.read_to_end(&mut content).unwrap();
            assert_eq!(content, CONTENT);
        }
        compressed.finish().unwrap();
    }
}

#[test]
fn unknown_compression_algorithm_is_rejected() {
    let r = CompressedDataGenerator::new(
        CompressionAlgorithm::Unknown(42), Vec::new());
    assert!(match r {
        Err(e) => matches!(
            e.downcast_ref::<larch_openpgp::Error>(),
            Some(larch_openpgp::Error::
                 UnsupportedCompressionAlgorithm(_))),
        Ok(_) => false,
    });
}

/// A one-pass signed message: the one-pass packet announces the
/// signature, the literal data follows, the signature packet trails.
fn one_pass_message(private: &larch_openpgp::key::PrivateKey) -> Vec<u8> {
    let backend = Backend::default();
    let builder = backend.signer_builder(HashAlgorithm::SHA256);
    let mut gen = SignatureGenerator::new(
        &*builder, SignatureType::Binary, private).unwrap();

    let mut out = Vec::new();
    gen.one_pass_signature(true).serialize(&mut out).unwrap();

    let mut lit = LiteralDataGenerator::new(
        Literal::new(DataFormat::Binary), &mut out, None).unwrap();
    lit.write_all(CONTENT).unwrap();
    lit.finish().unwrap();
    drop(lit);

    gen.update(CONTENT);
    gen.generate().unwrap().serialize(&mut out).unwrap();
    out
}

#[test]
fn one_pass_signed_message_verifies_while_streaming() {
    let backend = Backend::default();
    let (public, private) = rsa_key(1_650_000_000, false);
    let message = one_pass_message(&private);

    let mut factory = ObjectFactory::from_bytes(&message, &backend);

    let ops_list = match factory.read_object().unwrap() {
        Some(Object::OnePassSignatureList(list)) => list,
        _ => panic!("expected one-pass signatures"),
    };
    assert_eq!(ops_list.signatures().len(), 1);
    let ops = &ops_list.signatures()[0];
    assert_eq!(ops.issuer(), public.key_id());

    // Hashing starts before the trailing signature arrives.
    let mut verifier = ops.verifier(&backend, &public).unwrap();
    let mut literal = match factory.read_object().unwrap() {
        Some(Object::Literal(literal)) => literal,
        _ => panic!("expected literal data"),
    };
    let mut content = Vec::new();
    literal.read_to_end(&mut content).unwrap();
    verifier.update(&content);
    literal.finish().unwrap();

    let sigs = match factory.read_object().unwrap() {
        Some(Object::SignatureList(list)) => list,
        _ => panic!("expected signatures"),
    };
    assert_eq!(sigs.signatures().len(), 1);

    // Pairing is positional: the first one-pass packet pairs with
    // the first trailing signature.
    assert!(verifier.verify(&sigs.signatures()[0]).unwrap());
}

#[cfg(feature = "compression-deflate")]
#[test]
fn one_pass_message_inside_a_compressed_container() {
    let backend = Backend::default();
    let (public, private) = rsa_key(1_650_000_000, false);

    let mut message = Vec::new();
    let mut gen = CompressedDataGenerator::new(
        CompressionAlgorithm::Zip, &mut message).unwrap();
    gen.write_all(&one_pass_message(&private)).unwrap();
    gen.finish().unwrap();
    drop(gen);

    let mut factory = ObjectFactory::from_bytes(&message, &backend);
    let mut compressed = match factory.read_object().unwrap() {
        Some(Object::CompressedData(c)) => c,
        _ => panic!("expected compressed data"),
    };
    let mut inner = compressed.data_stream().unwrap();

    let ops_list = match inner.read_object().unwrap() {
        Some(Object::OnePassSignatureList(list)) => list,
        _ => panic!("expected one-pass signatures"),
    };
    let mut verifier = ops_list.signatures()[0]
        .verifier(&backend, &public).unwrap();

    let mut literal = match inner.read_object().unwrap() {
        Some(Object::Literal(literal)) => literal,
        _ => panic!("expected literal data"),
    };
    let mut content = Vec::new();
    literal.read_to_end(&mut content).unwrap();
    verifier.update(&content);
    literal.finish().unwrap();

    let sigs = match inner.read_object().unwrap() {
        Some(Object::SignatureList(list)) => list,
        _ => panic!("expected signatures"),
    };
    assert!(verifier.verify(&sigs.signatures()[0]).unwrap());
}

#[test]
fn stray_packets_at_the_top_level_are_malformed() {
    let backend = Backend::default();
    // A lone user id packet does not form an object.
    let mut bytes = Vec::new();
    larch_openpgp::packet::UserID::from("stray")
        .serialize(&mut bytes).unwrap();

    let mut factory = ObjectFactory::from_bytes(&bytes, &backend);
    let r = factory.read_object();
    assert!(match r {
        Err(e) => matches!(e.downcast_ref::<larch_openpgp::Error>(),
                           Some(larch_openpgp::Error::MalformedMessage(_))),
        _ => false,
    });
}
