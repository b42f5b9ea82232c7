//! Signature generation and verification.
//!
//! A signature binds a running hash over a document, a key, a
//! key/identity pair, or a key/key pair to a signature type; the
//! actual signature math is delegated to the injected
//! [`ContentSigner`] and [`ContentVerifier`] engines.
//!
//! The trailer appended to the hash is wire-format data: generation
//! computes it from the generator's state, verification replays it
//! from the signature packet, never recomputing it.
//!
//!   [`ContentSigner`]: crate::crypto::engines::ContentSigner
//!   [`ContentVerifier`]: crate::crypto::engines::ContentVerifier

use std::time::{SystemTime, UNIX_EPOCH};

use crate::Result;
use crate::crypto::engines::{
    ContentSigner, ContentSignerBuilder, ContentVerifier,
    ContentVerifierBuilderProvider,
};
use crate::key::{IdentityPacket, PrivateKey, PublicKey};
use crate::packet::subpacket::{
    Subpacket, SubpacketArea, SubpacketTag, SubpacketValue,
};
use crate::packet::{
    OnePassSig, Signature, Signature3, Signature4, v3_trailer, v4_trailer,
};
use crate::types::SignatureType;

/// Streams `data` into `sink`, converting bare LF line endings to
/// CRLF as required for canonical text signatures.  CR is passed
/// through, so CRLF stays CRLF.
///
/// `last_was_cr` carries the line-ending state across calls.
pub(crate) fn canonicalize_text(data: &[u8], last_was_cr: &mut bool,
                                sink: &mut dyn FnMut(&[u8])) {
    for b in data {
        match b {
            b'\n' if !*last_was_cr => sink(b"\r\n"),
            b => sink(std::slice::from_ref(b)),
        }
        *last_was_cr = *b == b'\r';
    }
}

fn now() -> u32 {
    SystemTime::now().duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

/// Hashes a public key the way certifications frame it: a 0x99
/// octet, a two-octet length, and the raw public key body.
fn hash_key(update: &mut dyn FnMut(&[u8]), key: &PublicKey) -> Result<()> {
    let body = key.packet().public_encoded()?;
    update(&[0x99]);
    update(&(body.len() as u16).to_be_bytes());
    update(&body);
    Ok(())
}

/// Hashes a bound identity.  Version 4 signatures frame the value
/// with a type octet and a four-octet length; version 3 signatures
/// hash the raw bytes.
fn hash_identity(update: &mut dyn FnMut(&[u8]), id: &IdentityPacket,
                 framed: bool) {
    let (header, value) = match id {
        IdentityPacket::ID(id) => (0xb4u8, id.value()),
        IdentityPacket::Attribute(ua) => (0xd1u8, ua.value()),
    };
    if framed {
        update(&[header]);
        update(&(value.len() as u32).to_be_bytes());
    }
    update(value);
}

/// Generates version 4 signatures.
///
/// Content is streamed through [`update`]; the certification entry
/// points hash their key and identity framing before the trailer.
///
///   [`update`]: SignatureGenerator::update
pub struct SignatureGenerator {
    signer: Box<dyn ContentSigner>,
    sig_type: SignatureType,
    hashed: SubpacketArea,
    unhashed: SubpacketArea,
    last_was_cr: bool,
}

impl SignatureGenerator {
    /// Creates a generator for a signature of the given type.
    pub fn new(builder: &dyn ContentSignerBuilder, sig_type: SignatureType,
               key: &PrivateKey) -> Result<Self> {
        Ok(SignatureGenerator {
            signer: builder.build(sig_type, key)?,
            sig_type,
            hashed: SubpacketArea::new(),
            unhashed: SubpacketArea::new(),
            last_was_cr: false,
        })
    }

    /// Adds a subpacket to the hashed area.
    ///
    /// Subpackets are caller controlled and never deduplicated.
    pub fn add_hashed_subpacket(&mut self, subpacket: Subpacket) {
        self.hashed.add(subpacket);
    }

    /// Adds a subpacket to the unhashed area.
    pub fn add_unhashed_subpacket(&mut self, subpacket: Subpacket) {
        self.unhashed.add(subpacket);
    }

    /// Adds content to the signature.
    ///
    /// Canonical text signatures normalize line endings on the fly.
    pub fn update(&mut self, data: &[u8]) {
        let signer = &mut self.signer;
        if self.sig_type == SignatureType::Text {
            canonicalize_text(data, &mut self.last_was_cr,
                              &mut |b| signer.update(b));
        } else {
            signer.update(data);
        }
    }

    /// Returns the one-pass packet announcing this signature.
    ///
    /// `last` clears the nesting flag; emit it before the signed
    /// content so a reader can hash while streaming.  Pairing with
    /// the trailing signature is positional.
    pub fn one_pass_signature(&self, last: bool) -> OnePassSig {
        OnePassSig::new(self.sig_type, self.signer.hash_algorithm(),
                        self.signer.public_key_algorithm(),
                        self.signer.key_id(), last)
    }

    /// Finalizes the signature over the streamed content.
    pub fn generate(self) -> Result<Signature> {
        self.finalize()
    }

    /// Generates a certification over a key and one of its
    /// identities.
    pub fn generate_certification(mut self, key: &PublicKey,
                                  id: &IdentityPacket) -> Result<Signature> {
        let signer = &mut self.signer;
        hash_key(&mut |b| signer.update(b), key)?;
        hash_identity(&mut |b| signer.update(b), id, true);
        self.finalize()
    }

    /// Generates a signature directly on a key.
    pub fn generate_direct_key(mut self, key: &PublicKey)
                               -> Result<Signature> {
        let signer = &mut self.signer;
        hash_key(&mut |b| signer.update(b), key)?;
        self.finalize()
    }

    /// Generates a subkey binding or revocation signature.
    pub fn generate_subkey_binding(mut self, master: &PublicKey,
                                   subkey: &PublicKey) -> Result<Signature> {
        let signer = &mut self.signer;
        hash_key(&mut |b| signer.update(b), master)?;
        hash_key(&mut |b| signer.update(b), subkey)?;
        self.finalize()
    }

    fn finalize(mut self) -> Result<Signature> {
        // A signature must state when it was made and who made it;
        // fill in what the caller did not.
        if self.hashed.lookup(SubpacketTag::SignatureCreationTime)
            .is_none()
        {
            self.hashed.add(Subpacket::new(
                SubpacketValue::SignatureCreationTime(now())));
        }
        if self.hashed.lookup(SubpacketTag::Issuer).is_none()
            && self.unhashed.lookup(SubpacketTag::Issuer).is_none()
        {
            self.unhashed.add(Subpacket::new(
                SubpacketValue::Issuer(self.signer.key_id())));
        }

        let trailer = v4_trailer(self.sig_type,
                                 self.signer.public_key_algorithm(),
                                 self.signer.hash_algorithm(),
                                 &self.hashed)?;
        self.signer.update(&trailer);

        let digest = self.signer.digest()?;
        let mpis = self.signer.signature()?;

        Ok(Signature::V4(Signature4::new(
            self.sig_type,
            self.signer.public_key_algorithm(),
            self.signer.hash_algorithm(),
            self.hashed,
            self.unhashed,
            [digest[0], digest[1]],
            mpis)))
    }
}

/// Generates version 3 signatures.
///
/// The version 3 trailer is five bytes, the signature type and the
/// creation time; there are no subpackets.  The format is obsolete
/// but still required to interoperate with old keys.
pub struct V3SignatureGenerator {
    signer: Box<dyn ContentSigner>,
    sig_type: SignatureType,
    last_was_cr: bool,
}

impl V3SignatureGenerator {
    /// Creates a generator for a signature of the given type.
    pub fn new(builder: &dyn ContentSignerBuilder, sig_type: SignatureType,
               key: &PrivateKey) -> Result<Self> {
        Ok(V3SignatureGenerator {
            signer: builder.build(sig_type, key)?,
            sig_type,
            last_was_cr: false,
        })
    }

    /// Adds content to the signature.
    pub fn update(&mut self, data: &[u8]) {
        let signer = &mut self.signer;
        if self.sig_type == SignatureType::Text {
            canonicalize_text(data, &mut self.last_was_cr,
                              &mut |b| signer.update(b));
        } else {
            signer.update(data);
        }
    }

    /// Finalizes the signature, dated `creation_time`.
    pub fn generate(mut self, creation_time: u32) -> Result<Signature> {
        self.signer.update(&v3_trailer(self.sig_type, creation_time));

        let digest = self.signer.digest()?;
        let mpis = self.signer.signature()?;

        Ok(Signature::V3(Signature3::new(
            self.sig_type,
            creation_time,
            self.signer.key_id(),
            self.signer.public_key_algorithm(),
            self.signer.hash_algorithm(),
            [digest[0], digest[1]],
            mpis)))
    }
}

/// Verifies one signature over streamed content.
///
/// Built either from the signature itself, or from a one-pass
/// packet so hashing can start before the trailing signature
/// arrives.
pub struct SignatureVerifier {
    verifier: Box<dyn ContentVerifier>,
    sig_type: SignatureType,
    last_was_cr: bool,
}

impl SignatureVerifier {
    /// Creates a verifier for `sig`, checking against `key`.
    pub fn from_signature(provider: &dyn ContentVerifierBuilderProvider,
                          sig: &Signature, key: &PublicKey) -> Result<Self> {
        Ok(SignatureVerifier {
            verifier: provider
                .get(sig.pk_algo(), sig.hash_algo())?
                .build(key)?,
            sig_type: sig.sig_type(),
            last_was_cr: false,
        })
    }

    /// Adds content to the hash.
    pub fn update(&mut self, data: &[u8]) {
        let verifier = &mut self.verifier;
        if self.sig_type == SignatureType::Text {
            canonicalize_text(data, &mut self.last_was_cr,
                              &mut |b| verifier.update(b));
        } else {
            verifier.update(data);
        }
    }

    /// Checks `sig` over the streamed content.
    ///
    /// The trailer is taken from the signature packet.  The two-byte
    /// hash prefix is compared first and short-circuits to `false`
    /// on mismatch.
    pub fn verify(mut self, sig: &Signature) -> Result<bool> {
        let trailer = sig.trailer()?;
        self.verifier.update(&trailer);

        let digest = self.verifier.digest()?;
        if digest[..2] != sig.hash_prefix()[..] {
            return Ok(false);
        }
        self.verifier.verify(sig.mpis())
    }
}

impl OnePassSig {
    /// Returns a verifier primed from this forward declaration.
    ///
    /// The announced algorithms select the engine; the verdict comes
    /// from [`SignatureVerifier::verify`] once the positionally
    /// paired signature packet arrives.
    pub fn verifier(&self, provider: &dyn ContentVerifierBuilderProvider,
                    key: &PublicKey) -> Result<SignatureVerifier> {
        Ok(SignatureVerifier {
            verifier: provider
                .get(self.pk_algo(), self.hash_algo())?
                .build(key)?,
            sig_type: self.sig_type(),
            last_was_cr: false,
        })
    }
}

impl Signature {
    /// Verifies this signature over a complete document.
    pub fn verify_document(&self,
                           provider: &dyn ContentVerifierBuilderProvider,
                           key: &PublicKey, data: &[u8]) -> Result<bool> {
        let mut v = SignatureVerifier::from_signature(provider, self, key)?;
        v.update(data);
        v.verify(self)
    }

    /// Verifies this signature as a certification of `id` on `key`.
    ///
    /// `signer` is the key that allegedly made the signature; for
    /// self certifications it is `key` itself.
    pub fn verify_certification(
        &self, provider: &dyn ContentVerifierBuilderProvider,
        signer: &PublicKey, key: &PublicKey, id: &IdentityPacket)
        -> Result<bool>
    {
        let mut v =
            SignatureVerifier::from_signature(provider, self, signer)?;
        let verifier = &mut v.verifier;
        hash_key(&mut |b| verifier.update(b), key)?;
        hash_identity(&mut |b| verifier.update(b), id, self.version() == 4);
        v.verify(self)
    }

    /// Verifies this signature as a direct key signature on `key`.
    pub fn verify_direct_key(
        &self, provider: &dyn ContentVerifierBuilderProvider,
        signer: &PublicKey, key: &PublicKey) -> Result<bool>
    {
        let mut v =
            SignatureVerifier::from_signature(provider, self, signer)?;
        let verifier = &mut v.verifier;
        hash_key(&mut |b| verifier.update(b), key)?;
        v.verify(self)
    }

    /// Verifies this signature as a subkey binding or revocation.
    pub fn verify_subkey_binding(
        &self, provider: &dyn ContentVerifierBuilderProvider,
        master: &PublicKey, subkey: &PublicKey) -> Result<bool>
    {
        let mut v =
            SignatureVerifier::from_signature(provider, self, master)?;
        let verifier = &mut v.verifier;
        hash_key(&mut |b| verifier.update(b), master)?;
        hash_key(&mut |b| verifier.update(b), subkey)?;
        v.verify(self)
    }

    /// Verifies this signature as a primary key binding made by
    /// `subkey` over the master/subkey pair.
    ///
    /// Used to check the embedded signature by which a signing
    /// subkey vouches for its master key.
    pub fn verify_primary_key_binding(
        &self, provider: &dyn ContentVerifierBuilderProvider,
        master: &PublicKey, subkey: &PublicKey) -> Result<bool>
    {
        let mut v =
            SignatureVerifier::from_signature(provider, self, subkey)?;
        let verifier = &mut v.verifier;
        hash_key(&mut |b| verifier.update(b), master)?;
        hash_key(&mut |b| verifier.update(b), subkey)?;
        v.verify(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_newlines_become_crlf() {
        let mut out = Vec::new();
        let mut cr = false;
        canonicalize_text(b"A\nB", &mut cr,
                          &mut |b| out.extend_from_slice(b));
        assert_eq!(&out, b"A\r\nB");
    }

    #[test]
    fn crlf_is_preserved() {
        let mut out = Vec::new();
        let mut cr = false;
        canonicalize_text(b"A\r\nB\rC", &mut cr,
                          &mut |b| out.extend_from_slice(b));
        assert_eq!(&out, b"A\r\nB\rC");
    }

    #[test]
    fn state_spans_updates() {
        let mut out = Vec::new();
        let mut cr = false;
        canonicalize_text(b"A\r", &mut cr,
                          &mut |b| out.extend_from_slice(b));
        canonicalize_text(b"\nB", &mut cr,
                          &mut |b| out.extend_from_slice(b));
        assert_eq!(&out, b"A\r\nB");
    }

    #[cfg(feature = "crypto-rust")]
    mod engine {
        use super::super::*;
        use crate::crypto::backend::Backend;
        use crate::crypto::mpi;
        use crate::crypto::mpi::MPI;
        use crate::key::SecretKey;
        use crate::packet::{Key, SecretKeyMaterial, UserID};
        use crate::types::{HashAlgorithm, PublicKeyAlgorithm};

        /// Generates a fresh RSA key pair wrapped in the key model.
        pub(crate) fn test_key(subkey: bool) -> (PublicKey, PrivateKey) {
            use num_bigint_dig::ModInverse;
            use rand::rngs::OsRng;
            use rsa::traits::{PrivateKeyParts, PublicKeyParts};

            let rsa = rsa::RsaPrivateKey::new(&mut OsRng, 1024).unwrap();
            let (p, q) = (&rsa.primes()[0], &rsa.primes()[1]);
            let u = p.clone().mod_inverse(q).unwrap()
                .to_biguint().unwrap();

            let mut packet = Key::new(
                1_600_000_000, PublicKeyAlgorithm::RSAEncryptSign,
                mpi::PublicKey::RSA {
                    e: MPI::new(&rsa.e().to_bytes_be()),
                    n: MPI::new(&rsa.n().to_bytes_be()),
                });
            if subkey {
                packet = packet.into_subkey();
            }
            let packet = packet.with_secret(
                SecretKeyMaterial::Unencrypted {
                    mpis: mpi::SecretKeyMaterial::RSA {
                        d: MPI::new(&rsa.d().to_bytes_be()),
                        p: MPI::new(&p.to_bytes_be()),
                        q: MPI::new(&q.to_bytes_be()),
                        u: MPI::new(&u.to_bytes_be()),
                    },
                });

            let backend = Backend::default();
            let public = if subkey {
                PublicKey::subkey_from_parts(packet, None, Vec::new(),
                                             &backend).unwrap()
            } else {
                PublicKey::new(packet, None, &backend).unwrap()
            };
            let private = SecretKey::new(public.clone()).unwrap()
                .extract_private_key(&backend, None).unwrap();
            (public, private)
        }

        #[test]
        fn document_roundtrip() {
            let backend = Backend::default();
            let (public, private) = test_key(false);

            let builder = backend.signer_builder(HashAlgorithm::SHA256);
            let mut gen = SignatureGenerator::new(
                &*builder, SignatureType::Binary, &private).unwrap();
            gen.update(b"the quick brown fox");
            let sig = gen.generate().unwrap();

            assert!(sig.verify_document(&backend, &public,
                                        b"the quick brown fox").unwrap());
            assert!(!sig.verify_document(&backend, &public,
                                         b"the quick brown fax").unwrap());
        }

        #[test]
        fn auto_inserted_subpackets() {
            let backend = Backend::default();
            let (_, private) = test_key(false);

            let builder = backend.signer_builder(HashAlgorithm::SHA256);
            let gen = SignatureGenerator::new(
                &*builder, SignatureType::Binary, &private).unwrap();
            let sig = match gen.generate().unwrap() {
                Signature::V4(sig) => sig,
                _ => unreachable!(),
            };

            assert!(sig.hashed_area()
                    .lookup(SubpacketTag::SignatureCreationTime).is_some());
            assert!(sig.unhashed_area()
                    .lookup(SubpacketTag::Issuer).is_some());
        }

        #[test]
        fn caller_subpackets_are_kept_verbatim() {
            let backend = Backend::default();
            let (_, private) = test_key(false);

            let builder = backend.signer_builder(HashAlgorithm::SHA256);
            let mut gen = SignatureGenerator::new(
                &*builder, SignatureType::Binary, &private).unwrap();
            // Two identical subpackets: no deduplication.
            gen.add_hashed_subpacket(Subpacket::new(
                SubpacketValue::SignatureCreationTime(1111)));
            gen.add_hashed_subpacket(Subpacket::new(
                SubpacketValue::SignatureCreationTime(1111)));
            let sig = match gen.generate().unwrap() {
                Signature::V4(sig) => sig,
                _ => unreachable!(),
            };

            let times = sig.hashed_area().iter()
                .filter(|sp| sp.tag()
                        == SubpacketTag::SignatureCreationTime)
                .count();
            assert_eq!(times, 2);
        }

        #[test]
        fn canonical_text_matches_either_line_ending() {
            let backend = Backend::default();
            let (public, private) = test_key(false);

            let builder = backend.signer_builder(HashAlgorithm::SHA256);
            let mut gen = SignatureGenerator::new(
                &*builder, SignatureType::Text, &private).unwrap();
            gen.update(b"line one\nline two");
            let sig = gen.generate().unwrap();

            for text in [&b"line one\nline two"[..],
                         &b"line one\r\nline two"[..]].iter() {
                let mut v = SignatureVerifier::from_signature(
                    &backend, &sig, &public).unwrap();
                v.update(text);
                assert!(v.verify(&sig).unwrap());
            }
        }

        #[test]
        fn certification_roundtrip() {
            let backend = Backend::default();
            let (public, private) = test_key(false);
            let id: IdentityPacket = UserID::from("Dora <d@example.org>")
                .into();

            let builder = backend.signer_builder(HashAlgorithm::SHA256);
            let gen = SignatureGenerator::new(
                &*builder, SignatureType::PositiveCertification, &private)
                .unwrap();
            let sig = gen.generate_certification(&public, &id).unwrap();

            assert!(sig.verify_certification(&backend, &public, &public,
                                             &id).unwrap());

            let other: IdentityPacket = UserID::from("Mallory").into();
            assert!(!sig.verify_certification(&backend, &public, &public,
                                              &other).unwrap());
        }

        #[test]
        fn subkey_binding_roundtrip() {
            let backend = Backend::default();
            let (master, master_private) = test_key(false);
            let (subkey, _) = test_key(true);

            let builder = backend.signer_builder(HashAlgorithm::SHA256);
            let gen = SignatureGenerator::new(
                &*builder, SignatureType::SubkeyBinding, &master_private)
                .unwrap();
            let sig = gen.generate_subkey_binding(&master, &subkey)
                .unwrap();

            assert!(sig.verify_subkey_binding(&backend, &master, &subkey)
                    .unwrap());
            // Rebinding to another subkey fails.
            let (other, _) = test_key(true);
            assert!(!sig.verify_subkey_binding(&backend, &master, &other)
                    .unwrap());
        }

        #[test]
        fn v3_roundtrip() {
            let backend = Backend::default();
            let (public, private) = test_key(false);

            let builder = backend.signer_builder(HashAlgorithm::SHA1);
            let mut gen = V3SignatureGenerator::new(
                &*builder, SignatureType::Binary, &private).unwrap();
            gen.update(b"legacy message");
            let sig = gen.generate(1_500_000_000).unwrap();

            assert_eq!(sig.version(), 3);
            assert_eq!(sig.creation_time(), Some(1_500_000_000));
            assert!(sig.verify_document(&backend, &public,
                                        b"legacy message").unwrap());
        }

        #[test]
        fn one_pass_pairing() {
            let backend = Backend::default();
            let (public, private) = test_key(false);

            let builder = backend.signer_builder(HashAlgorithm::SHA256);
            let mut gen = SignatureGenerator::new(
                &*builder, SignatureType::Binary, &private).unwrap();
            let ops = gen.one_pass_signature(true);
            assert!(ops.last());
            assert_eq!(ops.issuer(), private.key_id());

            gen.update(b"streamed content");
            let sig = gen.generate().unwrap();

            // The reader side: prime a verifier from the one-pass
            // packet, hash while streaming, then check the trailing
            // signature.
            let mut v = ops.verifier(&backend, &public).unwrap();
            v.update(b"streamed content");
            assert!(v.verify(&sig).unwrap());
        }
    }
}
