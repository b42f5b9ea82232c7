//! Shared fixtures for the integration tests.

use larch_openpgp::Result;
use larch_openpgp::crypto::backend::Backend;
use larch_openpgp::crypto::mpi;
use larch_openpgp::crypto::mpi::MPI;
use larch_openpgp::key::{PrivateKey, PublicKey, SecretKey};
use larch_openpgp::packet::{Key, SecretKeyMaterial};
use larch_openpgp::types::PublicKeyAlgorithm;

/// Generates a fresh 1024 bit RSA key wrapped in the key model.
///
/// Small by modern standards, but these are throwaway test keys and
/// generation time adds up.
pub fn rsa_key(creation_time: u32, subkey: bool)
               -> (PublicKey, PrivateKey) {
    use num_bigint_dig::ModInverse;
    use rand::rngs::OsRng;
    use rsa::traits::{PrivateKeyParts, PublicKeyParts};

    let rsa = rsa::RsaPrivateKey::new(&mut OsRng, 1024).unwrap();
    let (p, q) = (&rsa.primes()[0], &rsa.primes()[1]);
    let u = p.clone().mod_inverse(q).unwrap().to_biguint().unwrap();

    let mut packet = Key::new(
        creation_time, PublicKeyAlgorithm::RSAEncryptSign,
        mpi::PublicKey::RSA {
            e: MPI::new(&rsa.e().to_bytes_be()),
            n: MPI::new(&rsa.n().to_bytes_be()),
        });
    if subkey {
        packet = packet.into_subkey();
    }
    let packet = packet.with_secret(SecretKeyMaterial::Unencrypted {
        mpis: mpi::SecretKeyMaterial::RSA {
            d: MPI::new(&rsa.d().to_bytes_be()),
            p: MPI::new(&p.to_bytes_be()),
            q: MPI::new(&q.to_bytes_be()),
            u: MPI::new(&u.to_bytes_be()),
        },
    });

    let backend = Backend::default();
    let public = if subkey {
        PublicKey::subkey_from_parts(packet, None, Vec::new(), &backend)
            .unwrap()
    } else {
        PublicKey::new(packet, None, &backend).unwrap()
    };
    let private = SecretKey::new(public.clone()).unwrap()
        .extract_private_key(&backend, None).unwrap();
    (public, private)
}

/// Returns whether `r` failed with the given structured error.
#[allow(dead_code)]
pub fn failed_with<T>(r: &Result<T>,
                      check: fn(&larch_openpgp::Error) -> bool) -> bool {
    match r {
        Err(e) => e.downcast_ref::<larch_openpgp::Error>()
            .map(check).unwrap_or(false),
        Ok(_) => false,
    }
}
