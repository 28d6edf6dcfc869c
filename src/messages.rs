//! The message type catalog and body layouts (spec §6), defined once and
//! shared by the Tumbler, Alice and Bob roles — "adding a field is a
//! single-point change" (spec §9 design note).

use crate::error::{ProtocolError, Result};
use crate::group::{Point, Scalar, POINT_BYTES, SCALAR_BYTES};
use crate::paillier::{self, Ct};
use crate::zkdl::ZkProof;

pub mod msg_type {
    pub const PROMISE_INIT: &str = "promise_init";
    pub const PROMISE_INIT_DONE: &str = "promise_init_done";
    pub const PROMISE_SIGN: &str = "promise_sign";
    pub const PROMISE_SIGN_DONE: &str = "promise_sign_done";
    pub const PROMISE_END: &str = "promise_end";
    pub const PROMISE_END_DONE: &str = "promise_end_done";
    pub const PUZZLE_SHARE: &str = "puzzle_share";
    pub const PUZZLE_SHARE_DONE: &str = "puzzle_share_done";
    pub const PUZZLE_SOLUTION_SHARE: &str = "puzzle_solution_share";
}

fn take<'a>(buf: &'a [u8], offset: &mut usize, len: usize) -> Result<&'a [u8]> {
    if *offset + len > buf.len() {
        return Err(ProtocolError::InvalidMessage(
            "message body shorter than its fixed layout".into(),
        ));
    }
    let slice = &buf[*offset..*offset + len];
    *offset += len;
    Ok(slice)
}

fn expect_exhausted(buf: &[u8], offset: usize) -> Result<()> {
    if offset != buf.len() {
        return Err(ProtocolError::InvalidMessage(
            "message body longer than its fixed layout".into(),
        ));
    }
    Ok(())
}

/// Body of `promise_init_done`: `P ‖ S ‖ P ‖ P ‖ S ‖ CT`.
pub struct PromiseInitDone {
    pub g_to_the_alpha: Point,
    pub com_c: Scalar,
    pub com_r: Point,
    pub pi_alpha: ZkProof,
    pub ctx_alpha: Ct,
}

impl PromiseInitDone {
    pub fn encode(&self, pk: &paillier::PublicKey) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.g_to_the_alpha.to_bytes());
        out.extend_from_slice(&self.com_c.to_bytes());
        out.extend_from_slice(&self.com_r.to_bytes());
        out.extend_from_slice(&self.pi_alpha.a.to_bytes());
        out.extend_from_slice(&self.pi_alpha.z.to_bytes());
        out.extend_from_slice(&self.ctx_alpha.to_bytes(pk));
        out
    }

    pub fn decode(buf: &[u8], pk: &paillier::PublicKey) -> Result<Self> {
        let mut off = 0;
        let g_to_the_alpha = Point::from_bytes(take(buf, &mut off, POINT_BYTES)?)?;
        let com_c = Scalar::from_bytes(take(buf, &mut off, SCALAR_BYTES)?)?;
        let com_r = Point::from_bytes(take(buf, &mut off, POINT_BYTES)?)?;
        let pi_a = Point::from_bytes(take(buf, &mut off, POINT_BYTES)?)?;
        let pi_z = Scalar::from_bytes(take(buf, &mut off, SCALAR_BYTES)?)?;
        let ctx_alpha = Ct::from_bytes(pk, take(buf, &mut off, pk.ct_bytes())?)?;
        expect_exhausted(buf, off)?;
        Ok(PromiseInitDone {
            g_to_the_alpha,
            com_c,
            com_r,
            pi_alpha: ZkProof { a: pi_a, z: pi_z },
            ctx_alpha,
        })
    }
}

/// Body of `promise_sign`: `P ‖ P ‖ S` (R_1', π.a, π.z).
pub struct PromiseSign {
    pub r_prime: Point,
    pub proof: ZkProof,
}

impl PromiseSign {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.r_prime.to_bytes());
        out.extend_from_slice(&self.proof.a.to_bytes());
        out.extend_from_slice(&self.proof.z.to_bytes());
        out
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut off = 0;
        let r_prime = Point::from_bytes(take(buf, &mut off, POINT_BYTES)?)?;
        let a = Point::from_bytes(take(buf, &mut off, POINT_BYTES)?)?;
        let z = Scalar::from_bytes(take(buf, &mut off, SCALAR_BYTES)?)?;
        expect_exhausted(buf, off)?;
        Ok(PromiseSign {
            r_prime,
            proof: ZkProof { a, z },
        })
    }
}

/// Body of `promise_sign_done`: `P ‖ P ‖ S ‖ S` (R_2', π.a, π.z, s_2').
pub struct PromiseSignDone {
    pub r_prime: Point,
    pub proof: ZkProof,
    pub s_partial: Scalar,
}

impl PromiseSignDone {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.r_prime.to_bytes());
        out.extend_from_slice(&self.proof.a.to_bytes());
        out.extend_from_slice(&self.proof.z.to_bytes());
        out.extend_from_slice(&self.s_partial.to_bytes());
        out
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut off = 0;
        let r_prime = Point::from_bytes(take(buf, &mut off, POINT_BYTES)?)?;
        let a = Point::from_bytes(take(buf, &mut off, POINT_BYTES)?)?;
        let z = Scalar::from_bytes(take(buf, &mut off, SCALAR_BYTES)?)?;
        let s_partial = Scalar::from_bytes(take(buf, &mut off, SCALAR_BYTES)?)?;
        expect_exhausted(buf, off)?;
        Ok(PromiseSignDone {
            r_prime,
            proof: ZkProof { a, z },
            s_partial,
        })
    }
}

/// Body of `promise_end`: `S` (s').
pub struct PromiseEnd {
    pub s_prime: Scalar,
}

impl PromiseEnd {
    pub fn encode(&self) -> Vec<u8> {
        self.s_prime.to_bytes().to_vec()
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut off = 0;
        let s_prime = Scalar::from_bytes(take(buf, &mut off, SCALAR_BYTES)?)?;
        expect_exhausted(buf, off)?;
        Ok(PromiseEnd { s_prime })
    }
}

/// Body of `puzzle_share`: `P ‖ CT` (g^{alpha+beta}, ct_{alpha+beta}).
pub struct PuzzleShare {
    pub g_to_the_alpha_plus_beta: Point,
    pub ctx_alpha_plus_beta: Ct,
}

impl PuzzleShare {
    pub fn encode(&self, pk: &paillier::PublicKey) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.g_to_the_alpha_plus_beta.to_bytes());
        out.extend_from_slice(&self.ctx_alpha_plus_beta.to_bytes(pk));
        out
    }

    pub fn decode(buf: &[u8], pk: &paillier::PublicKey) -> Result<Self> {
        let mut off = 0;
        let g_to_the_alpha_plus_beta = Point::from_bytes(take(buf, &mut off, POINT_BYTES)?)?;
        let ctx_alpha_plus_beta = Ct::from_bytes(pk, take(buf, &mut off, pk.ct_bytes())?)?;
        expect_exhausted(buf, off)?;
        Ok(PuzzleShare {
            g_to_the_alpha_plus_beta,
            ctx_alpha_plus_beta,
        })
    }
}

/// Body of `puzzle_solution_share`: `S` (α̂).
pub struct PuzzleSolutionShare {
    pub alpha_hat: Scalar,
}

impl PuzzleSolutionShare {
    pub fn encode(&self) -> Vec<u8> {
        self.alpha_hat.to_bytes().to_vec()
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut off = 0;
        let alpha_hat = Scalar::from_bytes(take(buf, &mut off, SCALAR_BYTES)?)?;
        expect_exhausted(buf, off)?;
        Ok(PuzzleSolutionShare { alpha_hat })
    }
}
