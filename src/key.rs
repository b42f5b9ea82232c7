//! The key model.
//!
//! [`PublicKey`] wraps a key packet together with its derived
//! fingerprint, key ID and strength, and the certifications bound to
//! it.  [`SecretKey`] adds the encrypted-on-disk secret material;
//! [`PrivateKey`] is the decrypted form handed to signing engines.
//!
//! All values are immutable: every "edit" returns a new value and
//! leaves the receiver untouched, so keys can be shared freely.

use crate::Error;
use crate::Fingerprint;
use crate::KeyID;
use crate::Result;
use crate::crypto::{Password, checksum};
use crate::crypto::engines::{
    DataEncryptorBuilder, FingerprintCalculator, PbeDecryptorFactory,
};
use crate::crypto::mem::secure_eq;
use crate::crypto::mpi;
use crate::crypto::s2k::S2K;
use crate::packet;
use crate::packet::{
    Encrypted, SecretKeyChecksum, SecretKeyMaterial, Signature, Trust,
    UserAttribute, UserID,
};
use crate::types::{HashAlgorithm, PublicKeyAlgorithm, SignatureType};

/// A signature bound to a key, together with the optional trust
/// packet a local key ring attached to it.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct BoundSignature {
    signature: Signature,
    trust: Option<Trust>,
}

impl BoundSignature {
    /// Wraps a signature without trust data.
    pub fn new(signature: Signature) -> Self {
        BoundSignature { signature, trust: None }
    }

    /// Wraps a signature with its trust packet.
    pub fn with_trust(signature: Signature, trust: Option<Trust>) -> Self {
        BoundSignature { signature, trust }
    }

    /// Returns the signature.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Returns the trust packet, if any.
    pub fn trust(&self) -> Option<&Trust> {
        self.trust.as_ref()
    }
}

/// An identity bound to a key: a user ID or a user attribute.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum IdentityPacket {
    /// A user ID.
    ID(UserID),
    /// A user attribute.
    Attribute(UserAttribute),
}

impl From<UserID> for IdentityPacket {
    fn from(id: UserID) -> Self {
        IdentityPacket::ID(id)
    }
}

impl From<UserAttribute> for IdentityPacket {
    fn from(ua: UserAttribute) -> Self {
        IdentityPacket::Attribute(ua)
    }
}

/// An identity with its trust packet and certification list.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct UserIdentity {
    id: IdentityPacket,
    trust: Option<Trust>,
    certifications: Vec<BoundSignature>,
}

impl UserIdentity {
    /// Creates a new identity binding.
    pub fn new(id: IdentityPacket, trust: Option<Trust>,
               certifications: Vec<BoundSignature>) -> Self {
        UserIdentity { id, trust, certifications }
    }

    /// Returns the identity packet.
    pub fn id(&self) -> &IdentityPacket {
        &self.id
    }

    /// Returns the trust packet, if any.
    pub fn trust(&self) -> Option<&Trust> {
        self.trust.as_ref()
    }

    /// Returns the certifications on this identity.
    pub fn certifications(&self) -> &[BoundSignature] {
        &self.certifications
    }
}

/// Distinguishes a master key's certification lists from a subkey's
/// flat signature list.
///
/// A key is either a master key or a subkey, never both.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
enum Role {
    Master {
        direct: Vec<BoundSignature>,
        identities: Vec<UserIdentity>,
    },
    Subkey {
        sub_sigs: Vec<BoundSignature>,
    },
}

/// A public key with its certifications.
///
/// The fingerprint, key ID and strength are derived once at
/// construction through the injected [`FingerprintCalculator`].
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct PublicKey {
    packet: packet::Key,
    trust: Option<Trust>,
    fingerprint: Fingerprint,
    key_id: KeyID,
    strength: Option<usize>,
    role: Role,
}

impl PublicKey {
    /// Creates a master key without certifications.
    pub fn new(packet: packet::Key, trust: Option<Trust>,
               calculator: &dyn FingerprintCalculator) -> Result<Self> {
        Self::from_parts(packet, trust, Vec::new(), Vec::new(), calculator)
    }

    /// Creates a master key from its packets.
    pub fn from_parts(packet: packet::Key, trust: Option<Trust>,
                      direct: Vec<BoundSignature>,
                      identities: Vec<UserIdentity>,
                      calculator: &dyn FingerprintCalculator)
                      -> Result<Self> {
        if packet.is_subkey() {
            return Err(Error::InvalidArgument(
                "expected a primary key packet".into()).into());
        }
        Self::derive(packet, trust, Role::Master { direct, identities },
                     calculator)
    }

    /// Creates a subkey from its packets.
    pub fn subkey_from_parts(packet: packet::Key, trust: Option<Trust>,
                             sub_sigs: Vec<BoundSignature>,
                             calculator: &dyn FingerprintCalculator)
                             -> Result<Self> {
        if !packet.is_subkey() {
            return Err(Error::InvalidArgument(
                "expected a subkey packet".into()).into());
        }
        Self::derive(packet, trust, Role::Subkey { sub_sigs }, calculator)
    }

    fn derive(packet: packet::Key, trust: Option<Trust>, role: Role,
              calculator: &dyn FingerprintCalculator) -> Result<Self> {
        let fingerprint = Fingerprint::from_bytes(
            packet.version(), &calculator.calculate(&packet)?);

        let (key_id, strength) = if packet.version() <= 3 {
            // The key ID of a version 3 key is the low 64 bits of
            // the RSA modulus; the strength is the modulus size.
            match packet.mpis() {
                mpi::PublicKey::RSA { n, .. } => {
                    let v = n.value();
                    if v.len() < 8 {
                        return Err(Error::MalformedPacket(
                            "version 3 RSA modulus too short".into())
                            .into());
                    }
                    (KeyID::from_bytes(&v[v.len() - 8..]), Some(n.bits()))
                }
                _ => return Err(Error::MalformedPacket(
                    "version 3 keys are always RSA".into()).into()),
            }
        } else {
            (KeyID::from(&fingerprint), packet.mpis().bits())
        };

        Ok(PublicKey {
            packet, trust, fingerprint, key_id, strength, role,
        })
    }

    /// Returns the key packet.
    pub fn packet(&self) -> &packet::Key {
        &self.packet
    }

    /// Returns the trust packet, if any.
    pub fn trust(&self) -> Option<&Trust> {
        self.trust.as_ref()
    }

    /// Returns the key's fingerprint.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Returns the key's key ID.
    pub fn key_id(&self) -> &KeyID {
        &self.key_id
    }

    /// Returns the bit length of the key's dominant parameter, or
    /// `None` if the curve or algorithm is unknown.
    pub fn strength(&self) -> Option<usize> {
        self.strength
    }

    /// Returns the public key algorithm.
    pub fn algo(&self) -> PublicKeyAlgorithm {
        self.packet.algo()
    }

    /// Returns the algorithm-specific public parameters.
    pub fn mpis(&self) -> &mpi::PublicKey {
        self.packet.mpis()
    }

    /// Returns the packet version.
    pub fn version(&self) -> u8 {
        self.packet.version()
    }

    /// Returns whether this is a master key.
    pub fn is_master(&self) -> bool {
        matches!(self.role, Role::Master { .. })
    }

    /// Returns the identities bound to this master key.
    ///
    /// Subkeys have no identities.
    pub fn identities(&self) -> &[UserIdentity] {
        match &self.role {
            Role::Master { identities, .. } => identities,
            Role::Subkey { .. } => &[],
        }
    }

    /// Returns the direct certifications on this master key.
    pub fn direct_certifications(&self) -> &[BoundSignature] {
        match &self.role {
            Role::Master { direct, .. } => direct,
            Role::Subkey { .. } => &[],
        }
    }

    /// Returns a subkey's binding and revocation signatures.
    pub fn sub_signatures(&self) -> &[BoundSignature] {
        match &self.role {
            Role::Master { .. } => &[],
            Role::Subkey { sub_sigs } => sub_sigs,
        }
    }

    /// Returns the certifications on the first binding of `id`.
    ///
    /// Lookup is first-match: if the same identity is bound more than
    /// once, the later bindings are not consulted.
    pub fn certifications_for_id(&self, id: &IdentityPacket)
                                 -> Option<&[BoundSignature]> {
        self.identities().iter()
            .find(|ui| &ui.id == id)
            .map(|ui| ui.certifications())
    }

    /// Iterates over all signatures attached to this key.
    pub fn signatures(&self) -> impl Iterator<Item = &Signature> {
        let (direct, identities, subs) = match &self.role {
            Role::Master { direct, identities } =>
                (&direct[..], &identities[..], &[][..]),
            Role::Subkey { sub_sigs } => (&[][..], &[][..], &sub_sigs[..]),
        };
        direct.iter()
            .chain(identities.iter().flat_map(|ui| ui.certifications.iter()))
            .chain(subs.iter())
            .map(|bs| bs.signature())
    }

    /// Returns the number of seconds this key is valid for after its
    /// creation; 0 means it never expires.
    ///
    /// For version 4 master keys, the self certifications are
    /// scanned in the order positive, casual, persona, generic; when
    /// several apply, the one made last wins.  For subkeys, the
    /// subkey binding signatures are scanned.
    pub fn valid_seconds(&self) -> u64 {
        if self.packet.version() <= 3 {
            return self.packet.validity_days() as u64 * 86400;
        }

        match &self.role {
            Role::Master { identities, .. } => {
                for sig_type in [
                    SignatureType::PositiveCertification,
                    SignatureType::CasualCertification,
                    SignatureType::PersonaCertification,
                    SignatureType::GenericCertification,
                ].iter() {
                    let latest = identities.iter()
                        .flat_map(|ui| ui.certifications.iter())
                        .map(|bs| bs.signature())
                        .filter(|sig| sig.sig_type() == *sig_type)
                        .filter(|sig| sig.issuer().as_ref()
                                == Some(&self.key_id))
                        .max_by_key(|sig| sig.creation_time().unwrap_or(0));
                    if let Some(sig) = latest {
                        return sig.key_expiration_time().unwrap_or(0)
                            as u64;
                    }
                }
                0
            }
            Role::Subkey { sub_sigs } => {
                sub_sigs.iter()
                    .map(|bs| bs.signature())
                    .filter(|sig|
                            sig.sig_type() == SignatureType::SubkeyBinding)
                    .max_by_key(|sig| sig.creation_time().unwrap_or(0))
                    .and_then(|sig| sig.key_expiration_time())
                    .unwrap_or(0) as u64
            }
        }
    }

    /// Returns whether a revocation signature is attached to this
    /// key.
    ///
    /// This only checks for the presence of a KEY_REVOCATION (master
    /// key) or SUBKEY_REVOCATION (subkey) signature; the signature is
    /// NOT cryptographically verified, so this must not be treated as
    /// an authenticated revocation status.
    pub fn is_revoked(&self) -> bool {
        match &self.role {
            Role::Master { direct, .. } => direct.iter().any(
                |bs| bs.signature().sig_type()
                    == SignatureType::KeyRevocation),
            Role::Subkey { sub_sigs } => sub_sigs.iter().any(
                |bs| bs.signature().sig_type()
                    == SignatureType::SubkeyRevocation),
        }
    }

    /// Returns a copy of this key with `sig` added to the
    /// certifications of `id`.
    ///
    /// A binding for `id` is created if none exists.  The receiver is
    /// unchanged.
    pub fn add_certification(&self, id: &IdentityPacket, sig: Signature)
                             -> Result<Self> {
        let mut key = self.clone();
        match &mut key.role {
            Role::Master { identities, .. } => {
                match identities.iter_mut().find(|ui| &ui.id == id) {
                    Some(ui) =>
                        ui.certifications.push(BoundSignature::new(sig)),
                    None => identities.push(UserIdentity::new(
                        id.clone(), None,
                        vec![BoundSignature::new(sig)])),
                }
                Ok(key)
            }
            Role::Subkey { .. } => Err(Error::InvalidOperation(
                "subkeys carry no identity certifications".into()).into()),
        }
    }

    /// Returns a copy of this key with `sig` removed from the
    /// certifications of `id`, or `None` if it was not present.
    ///
    /// Only the first binding of `id` is consulted, mirroring
    /// [`certifications_for_id`].
    ///
    ///   [`certifications_for_id`]: PublicKey::certifications_for_id
    pub fn remove_certification(&self, id: &IdentityPacket, sig: &Signature)
                                -> Option<Self> {
        let mut key = self.clone();
        match &mut key.role {
            Role::Master { identities, .. } => {
                let ui = identities.iter_mut().find(|ui| &ui.id == id)?;
                let pos = ui.certifications.iter()
                    .position(|bs| bs.signature() == sig)?;
                ui.certifications.remove(pos);
                Some(key)
            }
            Role::Subkey { .. } => None,
        }
    }

    /// Returns a copy of this master key with a direct certification
    /// added.
    pub fn add_direct_certification(&self, sig: Signature) -> Result<Self> {
        let mut key = self.clone();
        match &mut key.role {
            Role::Master { direct, .. } => {
                direct.push(BoundSignature::new(sig));
                Ok(key)
            }
            Role::Subkey { .. } => Err(Error::InvalidOperation(
                "use add_binding_signature for subkeys".into()).into()),
        }
    }

    /// Returns a copy of this subkey with a binding or revocation
    /// signature added.
    pub fn add_binding_signature(&self, sig: Signature) -> Result<Self> {
        let mut key = self.clone();
        match &mut key.role {
            Role::Subkey { sub_sigs } => {
                sub_sigs.push(BoundSignature::new(sig));
                Ok(key)
            }
            Role::Master { .. } => Err(Error::InvalidOperation(
                "use add_direct_certification for master keys".into())
                .into()),
        }
    }
}

/// The decrypted form of a secret key, as consumed by signing
/// engines.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct PrivateKey {
    key_id: KeyID,
    // The public packet provides algorithm context.
    packet: packet::Key,
    mpis: mpi::SecretKeyMaterial,
}

impl PrivateKey {
    /// Creates a private key from its parts.
    pub fn new(key_id: KeyID, packet: packet::Key,
               mpis: mpi::SecretKeyMaterial) -> Self {
        PrivateKey { key_id, packet: packet.without_secret(), mpis }
    }

    /// Returns the key ID.
    pub fn key_id(&self) -> &KeyID {
        &self.key_id
    }

    /// Returns the public key algorithm.
    pub fn algo(&self) -> PublicKeyAlgorithm {
        self.packet.algo()
    }

    /// Returns the corresponding public key packet.
    pub fn packet(&self) -> &packet::Key {
        &self.packet
    }

    /// Returns the algorithm-specific public parameters.
    pub fn public_mpis(&self) -> &mpi::PublicKey {
        self.packet.mpis()
    }

    /// Returns the algorithm-specific secret parameters.
    pub fn mpis(&self) -> &mpi::SecretKeyMaterial {
        &self.mpis
    }
}

/// A secret key: a public key whose packet carries secret key
/// material, normally encrypted under a passphrase.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct SecretKey {
    key: PublicKey,
}

impl SecretKey {
    /// Wraps a public key whose packet carries secret material.
    pub fn new(key: PublicKey) -> Result<Self> {
        if key.packet.secret().is_none() {
            return Err(Error::InvalidArgument(
                "the key packet carries no secret material".into()).into());
        }
        Ok(SecretKey { key })
    }

    /// Returns the public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.key
    }

    /// Extracts the private key.
    ///
    /// Unencrypted material extracts without a passphrase.  For
    /// encrypted material, the passphrase is converted to a key via
    /// the packet's S2K, the material is decrypted, and the appended
    /// checksum is validated; a mismatch fails with
    /// [`Error::KeyValidation`] and never yields key material.
    pub fn extract_private_key(&self, engine: &dyn PbeDecryptorFactory,
                               password: Option<&Password>)
                               -> Result<PrivateKey> {
        let secret = self.key.packet.secret()
            .expect("checked at construction");

        let mpis = match secret {
            SecretKeyMaterial::Unencrypted { mpis } => mpis.clone(),
            SecretKeyMaterial::Encrypted(e) => {
                let password = password.ok_or_else(
                    || Error::InvalidOperation(
                        "the secret key material is encrypted; \
                         a passphrase is required".into()))?;
                if self.key.packet.version() <= 3 {
                    self.decrypt_v3(e, engine, password)?
                } else {
                    self.decrypt_v4(e, engine, password)?
                }
            }
        };

        Ok(PrivateKey::new(self.key.key_id.clone(),
                           self.key.packet.clone(), mpis))
    }

    fn decrypt_v4(&self, e: &Encrypted, engine: &dyn PbeDecryptorFactory,
                  password: &Password) -> Result<mpi::SecretKeyMaterial> {
        let key = engine.make_key_from_passphrase(
            e.algo(), e.s2k(), password)?;
        let mut plain = e.ciphertext().to_vec();
        engine.create_decryptor(e.algo(), &key, e.iv(), false)?
            .decrypt(&mut plain)?;

        let body_len = match e.checksum() {
            SecretKeyChecksum::SHA1 => {
                if plain.len() < 20 {
                    return Err(Error::KeyValidation(
                        "secret key material too short".into()).into());
                }
                let body_len = plain.len() - 20;
                let mut ctx =
                    engine.checksum_digest(HashAlgorithm::SHA1)?;
                ctx.update(&plain[..body_len]);
                let mut digest = vec![0u8; 20];
                ctx.digest(&mut digest)?;
                if !secure_eq(&digest, &plain[body_len..]) {
                    return Err(Error::KeyValidation(
                        "secret key digest mismatch".into()).into());
                }
                body_len
            }
            SecretKeyChecksum::Sum16 => {
                if plain.len() < 2 {
                    return Err(Error::KeyValidation(
                        "secret key material too short".into()).into());
                }
                let body_len = plain.len() - 2;
                let expected = u16::from_be_bytes(
                    [plain[body_len], plain[body_len + 1]]);
                if checksum(&plain[..body_len]) != expected {
                    return Err(Error::KeyValidation(
                        "secret key checksum mismatch".into()).into());
                }
                body_len
            }
        };

        let mut reader =
            buffered_reader::Memory::with_cookie(&plain[..body_len], ());
        mpi::SecretKeyMaterial::parse(self.key.algo(), &mut reader)
    }

    /// Version 3 keys encrypt each RSA component separately: the MPI
    /// length prefixes stay in the clear, and the trailing ciphertext
    /// block of each component is the IV of the next.
    fn decrypt_v3(&self, e: &Encrypted, engine: &dyn PbeDecryptorFactory,
                  password: &Password) -> Result<mpi::SecretKeyMaterial> {
        let key = engine.make_key_from_passphrase(
            e.algo(), e.s2k(), password)?;
        let bs = e.algo().block_size()?;
        let cipher = e.ciphertext();

        let mut iv = e.iv().to_vec();
        let mut plain = Vec::with_capacity(cipher.len());
        let mut pos = 0;
        for _ in 0..4 {
            if pos + 2 > cipher.len() {
                return Err(Error::MalformedPacket(
                    "truncated version 3 secret key material".into())
                    .into());
            }
            let bits = u16::from_be_bytes([cipher[pos], cipher[pos + 1]])
                as usize;
            let len = (bits + 7) / 8;
            if pos + 2 + len > cipher.len() || len < bs {
                return Err(Error::MalformedPacket(
                    "truncated version 3 secret key material".into())
                    .into());
            }

            let body = &cipher[pos + 2..pos + 2 + len];
            let mut decrypted = body.to_vec();
            engine.create_decryptor(e.algo(), &key, &iv, false)?
                .decrypt(&mut decrypted)?;

            plain.extend_from_slice(&cipher[pos..pos + 2]);
            plain.extend_from_slice(&decrypted);

            iv.clear();
            iv.extend_from_slice(&body[len - bs..]);
            pos += 2 + len;
        }

        if pos + 2 > cipher.len() {
            return Err(Error::MalformedPacket(
                "version 3 secret key material lacks a checksum".into())
                .into());
        }
        let expected = u16::from_be_bytes([cipher[pos], cipher[pos + 1]]);
        if checksum(&plain) != expected {
            return Err(Error::KeyValidation(
                "secret key checksum mismatch".into()).into());
        }

        let mut reader = buffered_reader::Memory::with_cookie(&plain, ());
        mpi::SecretKeyMaterial::parse(self.key.algo(), &mut reader)
    }

    /// Returns a copy of this key re-encrypted under a new
    /// passphrase.
    ///
    /// `old_password` must decrypt the current material; `None` is
    /// only valid for unencrypted material.  The new material uses
    /// the builder's cipher, an iterated and salted S2K, and a SHA-1
    /// checksum.
    pub fn copy_with_new_password(&self, engine: &dyn PbeDecryptorFactory,
                                  builder: &dyn DataEncryptorBuilder,
                                  old_password: Option<&Password>,
                                  new_password: &Password)
                                  -> Result<SecretKey> {
        let private = self.extract_private_key(engine, old_password)?;

        let mut plain = Vec::new();
        private.mpis().serialize(&mut plain)?;
        let mut ctx = engine.checksum_digest(HashAlgorithm::SHA1)?;
        ctx.update(&plain);
        let mut digest = vec![0u8; 20];
        ctx.digest(&mut digest)?;
        plain.extend_from_slice(&digest);

        let algo = builder.algorithm();
        let mut salt = [0u8; 8];
        builder.random(&mut salt)?;
        let s2k = S2K::Iterated {
            hash: HashAlgorithm::SHA256,
            salt,
            hash_bytes: S2K::decode_count(255),
        };
        let key = engine.make_key_from_passphrase(algo, &s2k,
                                                  new_password)?;
        let mut iv = vec![0u8; algo.block_size()?];
        builder.random(&mut iv)?;

        let mut cipher = builder.build(&key)?;
        cipher.resync(&iv)?;
        cipher.encrypt(&mut plain)?;

        let packet = self.key.packet.without_secret().with_secret(
            SecretKeyMaterial::Encrypted(Encrypted::new(
                algo, SecretKeyChecksum::SHA1, s2k,
                iv.into_boxed_slice(), plain.into_boxed_slice())));

        let mut key = self.key.clone();
        key.packet = packet;
        Ok(SecretKey { key })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::crypto::mpi::MPI;
    use crate::packet::Key;
    use crate::packet::subpacket::{
        Subpacket, SubpacketArea, SubpacketValue,
    };
    use crate::packet::{Signature4, UserID};
    use crate::types::HashAlgorithm;

    /// A fingerprint calculator for model tests: it returns the
    /// creation time repeated, which is stable and version-sized.
    pub(crate) struct FakeCalculator;

    impl FingerprintCalculator for FakeCalculator {
        fn calculate(&self, key: &packet::Key) -> Result<Vec<u8>> {
            let n = if key.version() <= 3 { 16 } else { 20 };
            let t = key.creation_time().to_be_bytes();
            Ok(t.iter().cycle().take(n).cloned().collect())
        }
    }

    pub(crate) fn rsa_packet(creation_time: u32) -> Key {
        Key::new(creation_time, PublicKeyAlgorithm::RSAEncryptSign,
                 mpi::PublicKey::RSA {
                     e: MPI::new(&[1, 0, 1]),
                     n: MPI::new(&[0xc0; 128]),
                 })
    }

    pub(crate) fn self_sig(key: &PublicKey, sig_type: SignatureType,
                           creation: u32, expiry: Option<u32>) -> Signature {
        let mut hashed = SubpacketArea::new();
        hashed.add(Subpacket::new(
            SubpacketValue::SignatureCreationTime(creation)));
        if let Some(e) = expiry {
            hashed.add(Subpacket::new(
                SubpacketValue::KeyExpirationTime(e)));
        }
        let mut unhashed = SubpacketArea::new();
        unhashed.add(Subpacket::new(
            SubpacketValue::Issuer(key.key_id().clone())));

        Signature::V4(Signature4::new(
            sig_type, PublicKeyAlgorithm::RSAEncryptSign,
            HashAlgorithm::SHA256, hashed, unhashed, [0, 0],
            mpi::Signature::RSA { s: MPI::new(&[3]) }))
    }

    #[test]
    fn derivation_is_stable() {
        let key = PublicKey::new(rsa_packet(7), None, &FakeCalculator)
            .unwrap();
        let again = PublicKey::new(rsa_packet(7), None, &FakeCalculator)
            .unwrap();
        assert_eq!(key.fingerprint(), again.fingerprint());
        assert_eq!(key.key_id(), again.key_id());
        assert_eq!(key.strength(), Some(1024));
    }

    #[test]
    fn add_certification_is_copy_on_write() {
        let key = PublicKey::new(rsa_packet(7), None, &FakeCalculator)
            .unwrap();
        let id: IdentityPacket = UserID::from("Alice <alice@example.org>")
            .into();
        let sig = self_sig(&key, SignatureType::PositiveCertification,
                           10, None);

        let certified = key.add_certification(&id, sig.clone()).unwrap();
        assert_eq!(key.identities().len(), 0);
        assert_eq!(certified.identities().len(), 1);
        assert_eq!(certified.certifications_for_id(&id).unwrap().len(), 1);

        let removed = certified.remove_certification(&id, &sig).unwrap();
        assert_eq!(removed.certifications_for_id(&id).unwrap().len(), 0);
        assert_eq!(certified.certifications_for_id(&id).unwrap().len(), 1);
    }

    #[test]
    fn valid_seconds_priority_and_latest_win() {
        let key = PublicKey::new(rsa_packet(7), None, &FakeCalculator)
            .unwrap();
        let id: IdentityPacket = UserID::from("Bob").into();

        // A generic certification with an expiration loses to a
        // positive one without.
        let key = key.add_certification(
            &id, self_sig(&key, SignatureType::GenericCertification,
                          5, Some(1000))).unwrap();
        let key = key.add_certification(
            &id, self_sig(&key, SignatureType::PositiveCertification,
                          6, Some(2000))).unwrap();
        // A later positive certification overrides an earlier one.
        let key = key.add_certification(
            &id, self_sig(&key, SignatureType::PositiveCertification,
                          9, Some(3000))).unwrap();
        assert_eq!(key.valid_seconds(), 3000);
    }

    #[test]
    fn missing_expiration_means_never() {
        let key = PublicKey::new(rsa_packet(7), None, &FakeCalculator)
            .unwrap();
        let id: IdentityPacket = UserID::from("Carol").into();
        let key = key.add_certification(
            &id, self_sig(&key, SignatureType::PositiveCertification,
                          5, None)).unwrap();
        assert_eq!(key.valid_seconds(), 0);
    }

    #[test]
    fn revocation_check_is_presence_only() {
        let key = PublicKey::new(rsa_packet(7), None, &FakeCalculator)
            .unwrap();
        assert!(!key.is_revoked());

        let revoked = key.add_direct_certification(
            self_sig(&key, SignatureType::KeyRevocation, 8, None))
            .unwrap();
        assert!(revoked.is_revoked());
        assert!(!key.is_revoked());
    }

    #[test]
    fn role_constraints() {
        let master = PublicKey::new(rsa_packet(7), None, &FakeCalculator)
            .unwrap();
        assert!(master.add_binding_signature(
            self_sig(&master, SignatureType::SubkeyBinding, 1, None))
                .is_err());

        let subkey = PublicKey::subkey_from_parts(
            rsa_packet(8).into_subkey(), None, Vec::new(), &FakeCalculator)
            .unwrap();
        assert!(!subkey.is_master());
        assert!(subkey.add_direct_certification(
            self_sig(&master, SignatureType::DirectKey, 1, None)).is_err());
    }

    #[test]
    fn subkey_packets_cannot_make_masters() {
        assert!(PublicKey::new(rsa_packet(7).into_subkey(), None,
                               &FakeCalculator).is_err());
    }
}
