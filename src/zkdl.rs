//! Schnorr proof of knowledge of a discrete log (spec §4.2).
//!
//! Grounded on `examples/other_examples/86ef6f2c_sitetester-schnorr-dlog-zkp__src-dlog_proof.rs.rs`,
//! adapted from the non-interactive session/participant-bound hash to the
//! plain `H(g ‖ X ‖ a)` transcript this spec calls for.

use sha2::{Digest, Sha256};

use crate::error::{ProtocolError, Result};
use crate::group::{Point, Scalar};

/// `π = (a, z)`: proof that the prover knows `x` with `X = g^x`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ZkProof {
    pub a: Point,
    pub z: Scalar,
}

fn challenge(g: &Point, x: &Point, a: &Point) -> Scalar {
    let mut hasher = Sha256::new();
    hasher.update(g.to_bytes());
    hasher.update(x.to_bytes());
    hasher.update(a.to_bytes());
    let digest = hasher.finalize();
    crate::schnorr::hash_to_scalar(&digest)
}

/// `prove(X, x) -> π`
pub fn prove<R: rand_core::RngCore + rand_core::CryptoRng>(
    rng: &mut R,
    x_point: &Point,
    x: &Scalar,
) -> ZkProof {
    let g = Point::generator();
    let k = Scalar::random(rng);
    let a = Point::mul_gen(&k);
    let e = challenge(&g, x_point, &a);
    let z = k + e * *x;
    ZkProof { a, z }
}

/// `verify(π, X) -> bool`
pub fn verify(proof: &ZkProof, x_point: &Point) -> Result<()> {
    let g = Point::generator();
    let e = challenge(&g, x_point, &proof.a);
    let lhs = Point::mul_gen(&proof.z);
    let rhs = proof.a + (*x_point * e);
    if lhs == rhs {
        Ok(())
    } else {
        Err(ProtocolError::InvalidProof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn honest_proof_verifies() {
        let mut rng = rand::thread_rng();
        let x = Scalar::random(&mut rng);
        let x_point = Point::mul_gen(&x);
        let proof = prove(&mut rng, &x_point, &x);
        assert!(verify(&proof, &x_point).is_ok());
    }

    #[test]
    fn tampered_z_rejected() {
        let mut rng = rand::thread_rng();
        let x = Scalar::random(&mut rng);
        let x_point = Point::mul_gen(&x);
        let mut proof = prove(&mut rng, &x_point, &x);
        proof.z = proof.z + Scalar::random(&mut rng);
        assert!(verify(&proof, &x_point).is_err());
    }

    #[test]
    fn tampered_a_rejected() {
        let mut rng = rand::thread_rng();
        let x = Scalar::random(&mut rng);
        let x_point = Point::mul_gen(&x);
        let mut proof = prove(&mut rng, &x_point, &x);
        let junk = Scalar::random(&mut rng);
        proof.a = Point::mul_gen(&junk);
        assert!(verify(&proof, &x_point).is_err());
    }

    #[test]
    fn wrong_statement_rejected() {
        let mut rng = rand::thread_rng();
        let x = Scalar::random(&mut rng);
        let x_point = Point::mul_gen(&x);
        let proof = prove(&mut rng, &x_point, &x);
        let other_point = Point::mul_gen(&Scalar::random(&mut rng));
        assert!(verify(&proof, &other_point).is_err());
    }
}
