//! Key ring construction, serialization, and re-parsing.

#![cfg(feature = "crypto-rust")]

mod common;

use larch_openpgp::Error;
use larch_openpgp::crypto::backend::Backend;
use larch_openpgp::key::{IdentityPacket, PublicKey, SecretKey};
use larch_openpgp::keyring::PublicKeyRing;
use larch_openpgp::packet::{Packet, Trust, UserID};
use larch_openpgp::parse::{Object, ObjectFactory, PacketReader};
use larch_openpgp::serialize::Serialize;
use larch_openpgp::sign::SignatureGenerator;
use larch_openpgp::types::{HashAlgorithm, SignatureType};

use crate::common::{failed_with, rsa_key};

/// Builds a ring: a certified identity on the master key, one bound
/// subkey.
fn build_ring(with_trust: bool) -> PublicKeyRing {
    let backend = Backend::default();
    let (master, master_private) = rsa_key(1_650_000_000, false);
    let (subkey, _) = rsa_key(1_650_000_100, true);

    // Public ring: strip the generated secret material.
    let master = PublicKey::new(
        master.packet().without_secret(),
        if with_trust { Some(Trust::new(&[3])) } else { None },
        &backend).unwrap();
    let subkey = PublicKey::subkey_from_parts(
        subkey.packet().without_secret(), None, Vec::new(), &backend)
        .unwrap();

    let id: IdentityPacket = UserID::from("Erin <erin@example.org>").into();
    let builder = backend.signer_builder(HashAlgorithm::SHA256);

    let cert = SignatureGenerator::new(
        &*builder, SignatureType::PositiveCertification, &master_private)
        .unwrap()
        .generate_certification(&master, &id).unwrap();
    let master = master.add_certification(&id, cert).unwrap();

    let binding = SignatureGenerator::new(
        &*builder, SignatureType::SubkeyBinding, &master_private).unwrap()
        .generate_subkey_binding(&master, &subkey).unwrap();
    let subkey = subkey.add_binding_signature(binding).unwrap();

    PublicKeyRing::new(vec![master, subkey]).unwrap()
}

#[test]
fn encode_parse_encode_is_stable() {
    let backend = Backend::default();
    let ring = build_ring(false);
    let bytes = ring.to_vec().unwrap();

    let mut factory = ObjectFactory::from_bytes(&bytes, &backend);
    let parsed = match factory.read_object().unwrap() {
        Some(Object::PublicKeyRing(ring)) => ring,
        _ => panic!("expected a public key ring"),
    };
    assert!(factory.read_object().unwrap().is_none());

    assert_eq!(parsed.keys().len(), 2);
    assert_eq!(parsed.to_vec().unwrap(), bytes);
}

#[test]
fn transfer_serialization_drops_trust_packets() {
    let backend = Backend::default();
    let ring = build_ring(true);

    let mut full = Vec::new();
    ring.serialize(&mut full).unwrap();
    let mut transfer = Vec::new();
    ring.serialize_for_transfer(&mut transfer).unwrap();
    assert!(transfer.len() < full.len());

    // The transfer form re-parses without the trust packet, and the
    // full form round-trips with it.
    let mut factory = ObjectFactory::from_bytes(&transfer, &backend);
    let parsed = match factory.read_object().unwrap() {
        Some(Object::PublicKeyRing(ring)) => ring,
        _ => panic!("expected a public key ring"),
    };
    assert!(parsed.master().trust().is_none());

    let mut factory = ObjectFactory::from_bytes(&full, &backend);
    let parsed = match factory.read_object().unwrap() {
        Some(Object::PublicKeyRing(ring)) => ring,
        _ => panic!("expected a public key ring"),
    };
    assert_eq!(parsed.master().trust().map(|t| t.value()),
               Some(&[3u8][..]));
    assert_eq!(parsed.to_vec().unwrap(), full);
}

#[test]
fn parsed_derivations_match_the_originals() {
    let backend = Backend::default();
    let ring = build_ring(false);
    let bytes = ring.to_vec().unwrap();

    let mut factory = ObjectFactory::from_bytes(&bytes, &backend);
    let parsed = match factory.read_object().unwrap() {
        Some(Object::PublicKeyRing(ring)) => ring,
        _ => panic!("expected a public key ring"),
    };

    for (a, b) in ring.keys().iter().zip(parsed.keys()) {
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.key_id(), b.key_id());
        assert_eq!(a.strength(), b.strength());
    }

    // The parsed certifications still verify.
    let master = parsed.master();
    let id = master.identities()[0].id();
    let cert = master.certifications_for_id(id).unwrap()[0].signature();
    assert!(cert.verify_certification(&backend, master, master, id)
            .unwrap());

    let subkey = &parsed.keys()[1];
    let binding = subkey.sub_signatures()[0].signature();
    assert!(binding.verify_subkey_binding(&backend, master, subkey)
            .unwrap());
}

#[test]
fn old_format_framing_is_preserved() {
    let (master, _) = rsa_key(1_650_000_000, false);
    let public_packet = master.packet().without_secret();

    // Reframe the packet with an old format header.
    let new_framed = public_packet.to_vec().unwrap();
    assert_eq!(new_framed[0], 0xc6);
    let body = &new_framed[2..];
    let mut old_framed = vec![0x98, body.len() as u8];
    old_framed.extend_from_slice(body);

    let mut reader = PacketReader::from_bytes(&old_framed);
    let key = match reader.read_packet().unwrap() {
        Some(Packet::Key(key)) => key,
        p => panic!("expected a key packet, got {:?}", p),
    };
    assert_eq!(key.to_vec().unwrap(), old_framed);
}

#[test]
fn secret_ring_reencryption() {
    let backend = Backend::default();
    let (public, private) = rsa_key(1_650_000_000, false);
    let secret = SecretKey::new(public).unwrap();

    let builder = backend
        .data_encryptor_builder(larch_openpgp::SymmetricAlgorithm::AES256,
                                false).unwrap();
    let locked = secret.copy_with_new_password(
        &backend, &*builder, None, &"hunter2".into()).unwrap();

    // The wrong passphrase must never yield key material.
    let r = locked.extract_private_key(&backend,
                                       Some(&"wrong".into()));
    assert!(failed_with(&r, |e| matches!(e, Error::KeyValidation(_))));

    let unlocked = locked.extract_private_key(&backend,
                                              Some(&"hunter2".into()))
        .unwrap();
    assert_eq!(unlocked.mpis(), private.mpis());

    // The re-encrypted key survives a serialization round trip.
    let bytes = locked.public_key().packet().to_vec().unwrap();
    let mut reader = PacketReader::from_bytes(&bytes);
    let packet = match reader.read_packet().unwrap() {
        Some(Packet::Key(key)) => key,
        p => panic!("expected a key packet, got {:?}", p),
    };
    let reparsed = SecretKey::new(
        PublicKey::new(packet, None, &backend).unwrap()).unwrap();
    let unlocked = reparsed.extract_private_key(
        &backend, Some(&"hunter2".into())).unwrap();
    assert_eq!(unlocked.mpis(), private.mpis());
}

#[test]
fn secret_ring_roundtrip() {
    let backend = Backend::default();
    let (master, _) = rsa_key(1_650_000_000, false);
    let (subkey, _) = rsa_key(1_650_000_100, true);
    let ring = larch_openpgp::keyring::SecretKeyRing::new(vec![
        SecretKey::new(master).unwrap(),
        SecretKey::new(subkey).unwrap(),
    ]).unwrap();

    let bytes = ring.to_vec().unwrap();
    let mut factory = ObjectFactory::from_bytes(&bytes, &backend);
    let parsed = match factory.read_object().unwrap() {
        Some(Object::SecretKeyRing(ring)) => ring,
        _ => panic!("expected a secret key ring"),
    };
    assert_eq!(parsed.keys().len(), 2);
    assert_eq!(parsed.to_vec().unwrap(), bytes);

    // Secret keys extract after the round trip.
    parsed.master().extract_private_key(&backend, None).unwrap();
}
