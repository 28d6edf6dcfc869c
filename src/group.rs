//! Scalar and point newtypes over secp256k1, with manual (de)serializers in
//! the style of the teacher's `common.rs`. Swapped from Ristretto to
//! secp256k1 because the Schnorr core (`schnorr.rs`) needs an affine
//! x-coordinate to build the challenge — see DESIGN.md.

use k256::elliptic_curve::{
    group::GroupEncoding,
    sec1::{FromEncodedPoint, ToEncodedPoint},
    Field, PrimeField,
};
use k256::{AffinePoint, ProjectivePoint, Scalar as K256Scalar};
use rand_core::{CryptoRng, RngCore};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ProtocolError, Result};

/// Width in bytes of a canonically-encoded scalar on the wire.
pub const SCALAR_BYTES: usize = 32;
/// Width in bytes of a compressed point on the wire (SEC1, with parity byte).
pub const POINT_BYTES: usize = 33;

fn ser_bytes<S: Serializer>(bytes: &[u8], ser: S) -> std::result::Result<S::Ok, S::Error> {
    ser.serialize_bytes(bytes)
}

fn de_bytes<'de, D: Deserializer<'de>, const N: usize>(
    de: D,
) -> std::result::Result<[u8; N], D::Error> {
    let v: Vec<u8> = serde_bytes_vec(de)?;
    if v.len() != N {
        return Err(D::Error::invalid_length(v.len(), &"fixed-width buffer"));
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&v);
    Ok(out)
}

fn serde_bytes_vec<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<Vec<u8>, D::Error> {
    struct V;
    impl<'de> serde::de::Visitor<'de> for V {
        type Value = Vec<u8>;
        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a byte string")
        }
        fn visit_bytes<E: serde::de::Error>(self, v: &[u8]) -> std::result::Result<Vec<u8>, E> {
            Ok(v.to_vec())
        }
        fn visit_seq<A: serde::de::SeqAccess<'de>>(
            self,
            mut seq: A,
        ) -> std::result::Result<Vec<u8>, A::Error> {
            let mut out = Vec::new();
            while let Some(b) = seq.next_element()? {
                out.push(b);
            }
            Ok(out)
        }
    }
    de.deserialize_bytes(V)
}

/// A scalar modulo the secp256k1 group order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Scalar(pub K256Scalar);

impl Scalar {
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
        Scalar(K256Scalar::random(rng))
    }

    pub fn zero() -> Scalar {
        Scalar(K256Scalar::ZERO)
    }

    pub fn to_bytes(&self) -> [u8; SCALAR_BYTES] {
        self.0.to_bytes().into()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Scalar> {
        if bytes.len() != SCALAR_BYTES {
            return Err(ProtocolError::InvalidMessage(
                "malformed scalar length".into(),
            ));
        }
        let mut repr = k256::FieldBytes::default();
        repr.copy_from_slice(bytes);
        Option::<K256Scalar>::from(K256Scalar::from_repr(repr))
            .map(Scalar)
            .ok_or_else(|| ProtocolError::CryptoError("scalar is not canonically reduced".into()))
    }

    pub fn is_zero(&self) -> bool {
        bool::from(self.0.is_zero())
    }

    /// Big-endian unsigned integer view of this scalar, for handing to the
    /// Paillier adapter (whose plaintext domain is `BigUint`, not `Scalar`).
    pub fn to_biguint(&self) -> num_bigint_dig::BigUint {
        num_bigint_dig::BigUint::from_bytes_be(&self.to_bytes())
    }

    /// Inverse of [`Scalar::to_biguint`], reducing mod the curve order if
    /// the value is wider than the group (as happens after the Paillier
    /// homomorphic sum, whose modulus exceeds the curve order).
    pub fn from_biguint_reduced(v: &num_bigint_dig::BigUint) -> Scalar {
        crate::schnorr::biguint_mod_q_to_scalar(v)
    }
}

impl std::ops::Add for Scalar {
    type Output = Scalar;
    fn add(self, rhs: Scalar) -> Scalar {
        Scalar(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Scalar {
    type Output = Scalar;
    fn sub(self, rhs: Scalar) -> Scalar {
        Scalar(self.0 - rhs.0)
    }
}

impl std::ops::Mul for Scalar {
    type Output = Scalar;
    fn mul(self, rhs: Scalar) -> Scalar {
        Scalar(self.0 * rhs.0)
    }
}

impl std::ops::Neg for Scalar {
    type Output = Scalar;
    fn neg(self) -> Scalar {
        Scalar(-self.0)
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, ser: S) -> std::result::Result<S::Ok, S::Error> {
        ser_bytes(&self.to_bytes(), ser)
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(de: D) -> std::result::Result<Self, D::Error> {
        let bytes: [u8; SCALAR_BYTES] = de_bytes(de)?;
        Scalar::from_bytes(&bytes).map_err(D::Error::custom)
    }
}

/// A point on the secp256k1 curve (the generator's group).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Point(pub ProjectivePoint);

impl Point {
    pub fn generator() -> Point {
        Point(ProjectivePoint::GENERATOR)
    }

    /// `g^x`
    pub fn mul_gen(x: &Scalar) -> Point {
        Point(ProjectivePoint::GENERATOR * x.0)
    }

    pub fn to_bytes(&self) -> [u8; POINT_BYTES] {
        let encoded = self.0.to_affine().to_encoded_point(true);
        let mut out = [0u8; POINT_BYTES];
        out.copy_from_slice(encoded.as_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Point> {
        if bytes.len() != POINT_BYTES {
            return Err(ProtocolError::InvalidMessage(
                "malformed point length".into(),
            ));
        }
        let encoded = k256::EncodedPoint::from_bytes(bytes)
            .map_err(|_| ProtocolError::CryptoError("malformed point encoding".into()))?;
        let affine: Option<AffinePoint> = AffinePoint::from_encoded_point(&encoded).into();
        affine
            .map(|a| Point(ProjectivePoint::from(a)))
            .ok_or_else(|| ProtocolError::CryptoError("point is not on the curve".into()))
    }

    /// The affine x-coordinate, as used by the Schnorr challenge (§4.5).
    /// `None` for the point at infinity.
    pub fn x_coordinate(&self) -> Option<[u8; 32]> {
        let encoded = self.0.to_affine().to_encoded_point(false);
        encoded.x().map(|x| {
            let mut out = [0u8; 32];
            out.copy_from_slice(x.as_slice());
            out
        })
    }
}

impl std::ops::Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point(self.0 + rhs.0)
    }
}

impl std::ops::Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point(-self.0)
    }
}

impl std::ops::Mul<Scalar> for Point {
    type Output = Point;
    fn mul(self, rhs: Scalar) -> Point {
        Point(self.0 * rhs.0)
    }
}

impl Serialize for Point {
    fn serialize<S: Serializer>(&self, ser: S) -> std::result::Result<S::Ok, S::Error> {
        ser_bytes(&self.to_bytes(), ser)
    }
}

impl<'de> Deserialize<'de> for Point {
    fn deserialize<D: Deserializer<'de>>(de: D) -> std::result::Result<Self, D::Error> {
        let bytes: [u8; POINT_BYTES] = de_bytes(de)?;
        Point::from_bytes(&bytes).map_err(D::Error::custom)
    }
}
