//! Paillier adapter (spec §4.4): encrypt a scalar, add ciphertexts
//! homomorphically. Bob never decrypts; the secret key lives only with the
//! Tumbler.
//!
//! Grounded on `examples/other_examples/2c25920c_bnb-chain-tss-lib__src-crypto-paillier-paillier.rs.rs`,
//! which is itself a `num-bigint-dig`-based Paillier implementation; we keep
//! its crate choice (`num-bigint-dig` + `num-integer` + `num-traits`) and
//! its `PublicKey`/`PrivateKey` split, simplified to the textbook scheme
//! (`g = n + 1`) since this spec has no use for the GG18-style range proofs
//! that file also carries.

use num_bigint_dig::{BigUint, RandBigInt, RandPrime};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};

/// Default Paillier modulus size. Real deployments would use 2048+; tests
/// use a smaller override via `keygen_with_bits` for speed.
pub const DEFAULT_MODULUS_BITS: usize = 1024;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    #[serde(with = "biguint_hex")]
    pub n: BigUint,
}

impl PublicKey {
    fn n_sq(&self) -> BigUint {
        &self.n * &self.n
    }

    /// Byte width of a ciphertext under this key (spec's `CT_BYTES`,
    /// derived from the deployment's chosen modulus rather than a
    /// compile-time constant).
    pub fn ct_bytes(&self) -> usize {
        (self.n_sq().bits() as usize + 7) / 8
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SecretKey {
    pub public: PublicKey,
    #[serde(with = "biguint_hex")]
    lambda: BigUint,
    #[serde(with = "biguint_hex")]
    mu: BigUint,
}

/// A Paillier ciphertext: an integer mod `n^2`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ct(pub BigUint);

impl Ct {
    pub fn to_bytes(&self, pk: &PublicKey) -> Vec<u8> {
        let width = pk.ct_bytes();
        let raw = self.0.to_bytes_be();
        let mut out = vec![0u8; width - raw.len()];
        out.extend_from_slice(&raw);
        out
    }

    pub fn from_bytes(pk: &PublicKey, bytes: &[u8]) -> Result<Ct> {
        if bytes.len() != pk.ct_bytes() {
            return Err(ProtocolError::InvalidMessage(
                "malformed ciphertext length".into(),
            ));
        }
        let v = BigUint::from_bytes_be(bytes);
        if v >= pk.n_sq() {
            return Err(ProtocolError::CryptoError(
                "ciphertext not reduced mod n^2".into(),
            ));
        }
        Ok(Ct(v))
    }
}

/// Generates a keypair with the default modulus size.
pub fn keygen<R: RngCore + CryptoRng>(rng: &mut R) -> (SecretKey, PublicKey) {
    keygen_with_bits(rng, DEFAULT_MODULUS_BITS)
}

pub fn keygen_with_bits<R: RngCore + CryptoRng>(rng: &mut R, bits: usize) -> (SecretKey, PublicKey) {
    let prime_bits = bits / 2;
    let (p, q, n) = loop {
        let p = rng.gen_prime(prime_bits);
        let q = rng.gen_prime(prime_bits);
        if p == q {
            continue;
        }
        let n = &p * &q;
        break (p, q, n);
    };

    let one = BigUint::one();
    let p_minus_1 = &p - &one;
    let q_minus_1 = &q - &one;
    let lambda = (&p_minus_1 * &q_minus_1) / p_minus_1.gcd(&q_minus_1);

    // g = n + 1, so g^lambda mod n^2 = 1 + lambda*n mod n^2, and
    // L(g^lambda mod n^2) = lambda; mu = lambda^-1 mod n.
    let mu = mod_inverse(&lambda, &n).expect("lambda is invertible mod n for valid p, q");

    let public = PublicKey { n };
    (SecretKey { public: public.clone(), lambda, mu }, public)
}

fn mod_inverse(a: &BigUint, modulus: &BigUint) -> Option<BigUint> {
    let (g, x, _) = extended_gcd(
        &num_bigint_dig::BigInt::from(a.clone()),
        &num_bigint_dig::BigInt::from(modulus.clone()),
    );
    if g != num_bigint_dig::BigInt::one() {
        return None;
    }
    let m = num_bigint_dig::BigInt::from(modulus.clone());
    let x_mod = ((x % &m) + &m) % &m;
    x_mod.to_biguint()
}

fn extended_gcd(
    a: &num_bigint_dig::BigInt,
    b: &num_bigint_dig::BigInt,
) -> (
    num_bigint_dig::BigInt,
    num_bigint_dig::BigInt,
    num_bigint_dig::BigInt,
) {
    use num_bigint_dig::BigInt;
    if b.is_zero() {
        (a.clone(), BigInt::one(), BigInt::zero())
    } else {
        let (g, x, y) = extended_gcd(b, &(a % b));
        (g.clone(), y.clone(), x - (a / b) * y)
    }
}

/// `enc(pk, m) -> c`. Probabilistic; randomness is internal.
pub fn encrypt<R: RngCore + CryptoRng>(rng: &mut R, pk: &PublicKey, m: &BigUint) -> Result<Ct> {
    if m >= &pk.n {
        return Err(ProtocolError::CryptoError(
            "plaintext must be smaller than the modulus".into(),
        ));
    }
    let n_sq = pk.n_sq();
    let r = loop {
        let candidate = rng.gen_biguint_below(&pk.n);
        if !candidate.is_zero() && candidate.gcd(&pk.n) == BigUint::one() {
            break candidate;
        }
    };
    // c = (1 + m*n) * r^n mod n^2
    let one_plus_mn = (BigUint::one() + m * &pk.n) % &n_sq;
    let r_to_n = r.modpow(&pk.n, &n_sq);
    Ok(Ct((one_plus_mn * r_to_n) % &n_sq))
}

/// Decrypts a ciphertext. Only the Tumbler holds the secret key needed to
/// call this; Bob never does (spec §4.4).
pub fn decrypt(sk: &SecretKey, c: &Ct) -> BigUint {
    let n_sq = sk.public.n_sq();
    let x = c.0.modpow(&sk.lambda, &n_sq);
    let l = (&x - BigUint::one()) / &sk.public.n;
    (l * &sk.mu) % &sk.public.n
}

/// Ciphertext multiplication implements plaintext addition mod `n`:
/// `mul(pk, c1, c2) -> Enc(m1 + m2)`.
pub fn add(pk: &PublicKey, c1: &Ct, c2: &Ct) -> Ct {
    let n_sq = pk.n_sq();
    Ct((&c1.0 * &c2.0) % &n_sq)
}

mod biguint_hex {
    use num_bigint_dig::BigUint;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &BigUint, ser: S) -> std::result::Result<S::Ok, S::Error> {
        hex::encode(v.to_bytes_be()).serialize(ser)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<BigUint, D::Error> {
        let s = String::deserialize(de)?;
        let bytes = hex::decode(s).map_err(serde::de::Error::custom)?;
        Ok(BigUint::from_bytes_be(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_keypair() -> (SecretKey, PublicKey) {
        let mut rng = rand::thread_rng();
        keygen_with_bits(&mut rng, 256)
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let (sk, pk) = test_keypair();
        let mut rng = rand::thread_rng();
        let m = BigUint::from(42u32);
        let c = encrypt(&mut rng, &pk, &m).unwrap();
        assert_eq!(decrypt(&sk, &c), m);
    }

    #[test]
    fn homomorphic_add_matches_plaintext_add() {
        let (sk, pk) = test_keypair();
        let mut rng = rand::thread_rng();
        let a = BigUint::from(17u32);
        let b = BigUint::from(99u32);
        let ca = encrypt(&mut rng, &pk, &a).unwrap();
        let cb = encrypt(&mut rng, &pk, &b).unwrap();
        let sum_ct = add(&pk, &ca, &cb);
        assert_eq!(decrypt(&sk, &sum_ct), (&a + &b) % &pk.n);
    }

    #[test]
    fn ciphertext_round_trips_through_bytes() {
        let (_, pk) = test_keypair();
        let mut rng = rand::thread_rng();
        let m = BigUint::from(7u32);
        let c = encrypt(&mut rng, &pk, &m).unwrap();
        let bytes = c.to_bytes(&pk);
        assert_eq!(bytes.len(), pk.ct_bytes());
        let back = Ct::from_bytes(&pk, &bytes).unwrap();
        assert_eq!(back, c);
    }
}
