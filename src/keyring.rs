//! Key rings and key ring collections.
//!
//! A key ring is an ordered aggregate of one master key and its
//! subkeys; a collection holds many rings keyed by their master
//! key's key ID.  Like the keys themselves, rings are immutable;
//! every edit returns a new ring.

use crate::Error;
use crate::Fingerprint;
use crate::KeyID;
use crate::Result;
use crate::key::{PublicKey, SecretKey};

fn check_ring_shape<'a, I>(keys: I) -> Result<()>
where
    I: Iterator<Item = &'a PublicKey>,
{
    for (i, key) in keys.enumerate() {
        if i == 0 && !key.is_master() {
            return Err(Error::InvalidArgument(
                "the first key in a ring must be a master key".into())
                .into());
        }
        if i > 0 && key.is_master() {
            return Err(Error::InvalidArgument(
                "all keys after the first must be subkeys".into()).into());
        }
    }
    Ok(())
}

/// An ordered sequence of one master key and its subkeys.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct PublicKeyRing {
    keys: Vec<PublicKey>,
}

impl PublicKeyRing {
    /// Creates a ring, enforcing that the key at index 0 is a master
    /// key and all others are subkeys.
    pub fn new(keys: Vec<PublicKey>) -> Result<Self> {
        if keys.is_empty() {
            return Err(Error::InvalidArgument(
                "a key ring holds at least a master key".into()).into());
        }
        check_ring_shape(keys.iter())?;
        Ok(PublicKeyRing { keys })
    }

    /// Returns the master key.
    pub fn master(&self) -> &PublicKey {
        &self.keys[0]
    }

    /// Returns all keys in parse order.
    pub fn keys(&self) -> &[PublicKey] {
        &self.keys
    }

    /// Returns the key with the given key ID, if present.
    pub fn key_by_id(&self, id: &KeyID) -> Option<&PublicKey> {
        self.keys.iter().find(|k| k.key_id() == id)
    }

    /// Returns the key with the given fingerprint, if present.
    pub fn key_by_fingerprint(&self, fpr: &Fingerprint)
                              -> Option<&PublicKey> {
        self.keys.iter().find(|k| k.fingerprint() == fpr)
    }

    /// Returns a copy of this ring with `key` inserted.
    ///
    /// A key with the same key ID is replaced in place; otherwise
    /// the key is appended.
    pub fn insert_key(&self, key: PublicKey) -> Result<Self> {
        let mut keys = self.keys.clone();
        match keys.iter().position(|k| k.key_id() == key.key_id()) {
            Some(i) => keys[i] = key,
            None => keys.push(key),
        }
        Self::new(keys)
    }

    /// Returns a copy of this ring without the key with the given
    /// key ID, or `None` if it is not present.
    pub fn remove_key(&self, id: &KeyID) -> Option<Self> {
        let i = self.keys.iter().position(|k| k.key_id() == id)?;
        let mut keys = self.keys.clone();
        keys.remove(i);
        Self::new(keys).ok()
    }
}

/// An ordered sequence of one secret master key and its secret
/// subkeys.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct SecretKeyRing {
    keys: Vec<SecretKey>,
}

impl SecretKeyRing {
    /// Creates a ring, enforcing the same shape as
    /// [`PublicKeyRing::new`].
    pub fn new(keys: Vec<SecretKey>) -> Result<Self> {
        if keys.is_empty() {
            return Err(Error::InvalidArgument(
                "a key ring holds at least a master key".into()).into());
        }
        check_ring_shape(keys.iter().map(|k| k.public_key()))?;
        Ok(SecretKeyRing { keys })
    }

    /// Returns the master key.
    pub fn master(&self) -> &SecretKey {
        &self.keys[0]
    }

    /// Returns all keys in parse order.
    pub fn keys(&self) -> &[SecretKey] {
        &self.keys
    }

    /// Returns the key with the given key ID, if present.
    pub fn key_by_id(&self, id: &KeyID) -> Option<&SecretKey> {
        self.keys.iter().find(|k| k.public_key().key_id() == id)
    }

    /// Returns a copy of this ring with `key` inserted, replacing
    /// any key with the same key ID.
    pub fn insert_key(&self, key: SecretKey) -> Result<Self> {
        let mut keys = self.keys.clone();
        match keys.iter().position(
            |k| k.public_key().key_id() == key.public_key().key_id())
        {
            Some(i) => keys[i] = key,
            None => keys.push(key),
        }
        Self::new(keys)
    }

    /// Returns a copy of this ring without the key with the given
    /// key ID, or `None` if it is not present.
    pub fn remove_key(&self, id: &KeyID) -> Option<Self> {
        let i = self.keys.iter()
            .position(|k| k.public_key().key_id() == id)?;
        let mut keys = self.keys.clone();
        keys.remove(i);
        Self::new(keys).ok()
    }
}

/// A collection of public key rings, addressed by key ID.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct PublicKeyRingCollection {
    rings: Vec<PublicKeyRing>,
}

impl PublicKeyRingCollection {
    /// Creates a collection from the given rings.
    pub fn new(rings: Vec<PublicKeyRing>) -> Self {
        PublicKeyRingCollection { rings }
    }

    /// Returns the rings in order.
    pub fn rings(&self) -> &[PublicKeyRing] {
        &self.rings
    }

    /// Returns the ring whose master key has the given key ID.
    pub fn ring_by_master_id(&self, id: &KeyID) -> Option<&PublicKeyRing> {
        self.rings.iter().find(|r| r.master().key_id() == id)
    }

    /// Returns the first ring containing a key (master or subkey)
    /// with the given key ID.
    pub fn ring_containing(&self, id: &KeyID) -> Option<&PublicKeyRing> {
        self.rings.iter().find(|r| r.key_by_id(id).is_some())
    }

    /// Returns a copy with `ring` added, replacing any ring with the
    /// same master key ID.
    pub fn insert_ring(&self, ring: PublicKeyRing) -> Self {
        let mut rings = self.rings.clone();
        match rings.iter().position(
            |r| r.master().key_id() == ring.master().key_id())
        {
            Some(i) => rings[i] = ring,
            None => rings.push(ring),
        }
        PublicKeyRingCollection { rings }
    }

    /// Returns a copy without the ring whose master key has the
    /// given key ID, or `None` if it is not present.
    pub fn remove_ring(&self, id: &KeyID) -> Option<Self> {
        let i = self.rings.iter()
            .position(|r| r.master().key_id() == id)?;
        let mut rings = self.rings.clone();
        rings.remove(i);
        Some(PublicKeyRingCollection { rings })
    }
}

/// A collection of secret key rings, addressed by key ID.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct SecretKeyRingCollection {
    rings: Vec<SecretKeyRing>,
}

impl SecretKeyRingCollection {
    /// Creates a collection from the given rings.
    pub fn new(rings: Vec<SecretKeyRing>) -> Self {
        SecretKeyRingCollection { rings }
    }

    /// Returns the rings in order.
    pub fn rings(&self) -> &[SecretKeyRing] {
        &self.rings
    }

    /// Returns the ring whose master key has the given key ID.
    pub fn ring_by_master_id(&self, id: &KeyID) -> Option<&SecretKeyRing> {
        self.rings.iter()
            .find(|r| r.master().public_key().key_id() == id)
    }

    /// Returns the first ring containing a key (master or subkey)
    /// with the given key ID.
    pub fn ring_containing(&self, id: &KeyID) -> Option<&SecretKeyRing> {
        self.rings.iter().find(|r| r.key_by_id(id).is_some())
    }

    /// Returns a copy with `ring` added, replacing any ring with the
    /// same master key ID.
    pub fn insert_ring(&self, ring: SecretKeyRing) -> Self {
        let mut rings = self.rings.clone();
        match rings.iter().position(
            |r| r.master().public_key().key_id()
                == ring.master().public_key().key_id())
        {
            Some(i) => rings[i] = ring,
            None => rings.push(ring),
        }
        SecretKeyRingCollection { rings }
    }

    /// Returns a copy without the ring whose master key has the
    /// given key ID, or `None` if it is not present.
    pub fn remove_ring(&self, id: &KeyID) -> Option<Self> {
        let i = self.rings.iter()
            .position(|r| r.master().public_key().key_id() == id)?;
        let mut rings = self.rings.clone();
        rings.remove(i);
        Some(SecretKeyRingCollection { rings })
    }
}
