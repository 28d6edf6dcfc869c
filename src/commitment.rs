//! Hash-based commitment to a curve point (spec §4.3).

use rand_core::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::{ProtocolError, Result};
use crate::group::Point;
use crate::schnorr::hash_to_scalar;

/// `Com = (c, r)`: opens to `X` iff `c == H(X ‖ r)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Commitment {
    pub c: crate::group::Scalar,
    pub r: Point,
}

fn digest(x: &Point, r: &Point) -> crate::group::Scalar {
    let mut hasher = Sha256::new();
    hasher.update(x.to_bytes());
    hasher.update(r.to_bytes());
    hash_to_scalar(&hasher.finalize())
}

/// `commit(X) -> Com`. The opening randomness `r` travels inside `Com`
/// itself (spec §4.3 note: "the concrete commitment structure shipped
/// stores (c, r) together").
pub fn commit<R: RngCore + CryptoRng>(rng: &mut R, x: &Point) -> Commitment {
    let blinder = crate::group::Scalar::random(rng);
    let r = Point::mul_gen(&blinder);
    let c = digest(x, &r);
    Commitment { c, r }
}

/// `decommit(com, X) -> Ok|Err`, comparing in constant time.
pub fn decommit(com: &Commitment, x: &Point) -> Result<()> {
    let recomputed = digest(x, &com.r);
    if recomputed.to_bytes().ct_eq(&com.c.to_bytes()).into() {
        Ok(())
    } else {
        Err(ProtocolError::InvalidCommitment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::Scalar;

    #[test]
    fn honest_commitment_opens() {
        let mut rng = rand::thread_rng();
        let x = Point::mul_gen(&Scalar::random(&mut rng));
        let com = commit(&mut rng, &x);
        assert!(decommit(&com, &x).is_ok());
    }

    #[test]
    fn flipped_point_rejected() {
        let mut rng = rand::thread_rng();
        let x = Point::mul_gen(&Scalar::random(&mut rng));
        let other = Point::mul_gen(&Scalar::random(&mut rng));
        let com = commit(&mut rng, &x);
        assert!(decommit(&com, &other).is_err());
    }

    #[test]
    fn flipped_c_rejected() {
        let mut rng = rand::thread_rng();
        let x = Point::mul_gen(&Scalar::random(&mut rng));
        let mut com = commit(&mut rng, &x);
        com.c = com.c + Scalar::random(&mut rng);
        assert!(decommit(&com, &x).is_err());
    }

    #[test]
    fn flipped_r_rejected() {
        let mut rng = rand::thread_rng();
        let x = Point::mul_gen(&Scalar::random(&mut rng));
        let mut com = commit(&mut rng, &x);
        com.r = Point::mul_gen(&Scalar::random(&mut rng));
        assert!(decommit(&com, &x).is_err());
    }
}
