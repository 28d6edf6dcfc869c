//! Long-term key material (spec §6 "Persisted state"): a Schnorr keypair
//! plus a Paillier keypair, loaded once at startup and never rewritten.
//! Loading bytes off disk is out of scope; callers hand us the bytes.

use std::io::Write as _;

use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};
use crate::group::{Point, Scalar};
use crate::paillier;

/// Everything a single role needs to speak the protocol: its own Schnorr
/// and Paillier keypairs, plus the other party's Paillier public key (the
/// one whose ciphertexts it must be able to parse and homomorphically
/// combine).
#[derive(Clone, Serialize, Deserialize)]
pub struct KeyBundle {
    pub schnorr_secret: Scalar,
    pub schnorr_public: Point,
    pub paillier_secret: Option<paillier::SecretKey>,
    pub paillier_public: paillier::PublicKey,
    pub counterparty_paillier_public: paillier::PublicKey,
    /// The other promise-phase party's long-term Schnorr public key share.
    /// The joint public key the two-party signature verifies against is
    /// `schnorr_public + counterparty_schnorr_public` (spec §4.5).
    pub counterparty_schnorr_public: Point,
}

impl KeyBundle {
    /// Generates a fresh bundle. Bob and Alice pass `own_paillier = None`
    /// sourcing ciphertexts only; the Tumbler is the one role that holds
    /// `Some(secret)` since it alone decrypts (spec §4.4).
    pub fn generate<R: RngCore + CryptoRng>(
        rng: &mut R,
        holds_paillier_secret: bool,
        counterparty_paillier_public: paillier::PublicKey,
        counterparty_schnorr_public: Point,
    ) -> KeyBundle {
        let schnorr_secret = Scalar::random(rng);
        let schnorr_public = Point::mul_gen(&schnorr_secret);
        let (sk, pk) = paillier::keygen(rng);
        KeyBundle {
            schnorr_secret,
            schnorr_public,
            paillier_secret: if holds_paillier_secret { Some(sk) } else { None },
            paillier_public: pk,
            counterparty_paillier_public,
            counterparty_schnorr_public,
        }
    }

    /// The joint public key the combined promise-phase signature must
    /// verify against.
    pub fn joint_schnorr_public(&self) -> Point {
        self.schnorr_public + self.counterparty_schnorr_public
    }

    pub fn save_to_writer<W: std::io::Write>(&self, mut w: W) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| ProtocolError::CryptoError(format!("key bundle serialization: {e}")))?;
        w.write_all(&json)
            .map_err(|e| ProtocolError::TransportError(format!("key file write: {e}")))
    }

    pub fn load_from_slice(bytes: &[u8]) -> Result<KeyBundle> {
        serde_json::from_slice(bytes)
            .map_err(|e| ProtocolError::CryptoError(format!("key bundle deserialization: {e}")))
    }

    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .map_err(|e| ProtocolError::TransportError(format!("creating key file: {e}")))?;
        self.save_to_writer(file)
    }

    pub fn load_from_file(path: &std::path::Path) -> Result<KeyBundle> {
        let bytes = std::fs::read(path)
            .map_err(|e| ProtocolError::TransportError(format!("reading key file: {e}")))?;
        Self::load_from_slice(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let mut rng = rand::thread_rng();
        let (_, their_pk) = paillier::keygen_with_bits(&mut rng, 256);
        let their_schnorr_pk = Point::mul_gen(&Scalar::random(&mut rng));
        let bundle = KeyBundle::generate(&mut rng, true, their_pk, their_schnorr_pk);

        let mut buf = Vec::new();
        bundle.save_to_writer(&mut buf).unwrap();
        let back = KeyBundle::load_from_slice(&buf).unwrap();

        assert_eq!(back.schnorr_public, bundle.schnorr_public);
        assert_eq!(back.paillier_public, bundle.paillier_public);
        assert!(back.paillier_secret.is_some());
    }

    #[test]
    fn bob_and_alice_hold_no_paillier_secret() {
        let mut rng = rand::thread_rng();
        let (_, their_pk) = paillier::keygen_with_bits(&mut rng, 256);
        let their_schnorr_pk = Point::mul_gen(&Scalar::random(&mut rng));
        let bundle = KeyBundle::generate(&mut rng, false, their_pk, their_schnorr_pk);
        assert!(bundle.paillier_secret.is_none());
    }
}
