//! Per-counterparty session state (spec §3, §9): the protocol's progress is
//! tracked as explicit phase flags carried on the session rather than
//! inferred from which optional fields happen to be populated — the
//! redesign the spec's design notes call for.

use crate::commitment::Commitment;
use crate::group::{Point, Scalar};
use crate::keys::KeyBundle;
use crate::paillier::Ct;

/// Where a Bob session sits in the promise/puzzle lifecycle. Handlers check
/// this before touching any session field, so a replayed or out-of-order
/// message is rejected before it can read state that was never set.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BobPhase {
    /// Waiting for `promise_init_done` from the Tumbler.
    AwaitingPromiseInit,
    /// Commitment received and opened; waiting for `promise_sign_done`.
    AwaitingPromiseSign,
    /// Partial signature combined; waiting for `promise_end_done`.
    AwaitingPromiseEnd,
    /// Promise phase complete; ready to hand the puzzle off to Alice.
    PromiseCompleted,
    /// Puzzle handed to Alice; waiting for her `puzzle_share_done`.
    PuzzleShared,
    /// Randomized puzzle acknowledged; waiting for Alice's solution.
    AwaitingSolution,
    /// Solution received, checked against the signature, and forwarded.
    PuzzleSolved,
    /// Solution received but the recovered signature did not verify; a
    /// terminal failure state, distinct from `AwaitingSolution`, so a
    /// retried or replayed `puzzle_solution_share` is rejected by the
    /// phase guard rather than re-checked (spec §4.8 S7→S8: the terminal
    /// flag is still set on a bad solution, just with failure reported).
    SolutionRejected,
}

/// State Bob accumulates while running the protocol against one Tumbler and
/// one Alice counterparty (spec §3's attribute list).
pub struct BobSession {
    pub phase: BobPhase,
    pub keys: KeyBundle,
    pub tx: Vec<u8>,

    /// `g^alpha`, received from the Tumbler in `promise_init_done`.
    pub g_to_the_alpha: Option<Point>,
    /// The Tumbler's committed `ctx_alpha = Enc(alpha)`.
    pub ctx_alpha: Option<Ct>,
    /// Commitment to `g^alpha`, opened once Bob has `g^alpha` itself.
    pub com: Option<Commitment>,

    /// Bob's own nonce for the joint signature.
    pub k_1_prime: Option<Scalar>,
    /// Bob's nonce point `R_1' = g^{k_1'}`.
    pub r_1_prime: Option<Point>,
    /// The Tumbler's nonce point `R_2'`.
    pub r_2_prime: Option<Point>,
    /// Combined challenge `e' = H(tx ‖ R_1' + R_2' + g^alpha)`.
    pub e_prime: Option<Scalar>,
    /// Bob's own partial signature share.
    pub s_1_prime: Option<Scalar>,
    /// The completed two-party adaptor signature `s' = s_1' + s_2'`.
    pub s_prime: Option<Scalar>,

    /// Bob's own randomizer, chosen when handing the puzzle to Alice.
    pub beta: Option<Scalar>,
    /// `g^{alpha+beta}`, sent to Alice.
    pub g_to_the_alpha_plus_beta: Option<Point>,
    /// `ctx_{alpha+beta} = ctx_alpha (+) Enc(beta)`, sent to Alice.
    pub ctx_alpha_plus_beta: Option<Ct>,
}

impl BobSession {
    pub fn new(keys: KeyBundle, tx: Vec<u8>) -> BobSession {
        BobSession {
            phase: BobPhase::AwaitingPromiseInit,
            keys,
            tx,
            g_to_the_alpha: None,
            ctx_alpha: None,
            com: None,
            k_1_prime: None,
            r_1_prime: None,
            r_2_prime: None,
            e_prime: None,
            s_1_prime: None,
            s_prime: None,
            beta: None,
            g_to_the_alpha_plus_beta: None,
            ctx_alpha_plus_beta: None,
        }
    }
}

/// Where a Tumbler session sits, mirroring `BobPhase` from the other side
/// of the promise exchange.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TumblerPhase {
    AwaitingPromiseInit,
    AwaitingPromiseSign,
    AwaitingPromiseEnd,
    PromiseCompleted,
}

pub struct TumblerSession {
    pub phase: TumblerPhase,
    pub keys: KeyBundle,
    pub tx: Vec<u8>,

    pub alpha: Option<Scalar>,
    pub g_to_the_alpha: Option<Point>,
    pub ctx_alpha: Option<Ct>,

    pub k_2_prime: Option<Scalar>,
    pub r_2_prime: Option<Point>,
    pub r_1_prime: Option<Point>,
    pub e_prime: Option<Scalar>,
    pub s_2_prime: Option<Scalar>,
}

impl TumblerSession {
    pub fn new(keys: KeyBundle, tx: Vec<u8>) -> TumblerSession {
        TumblerSession {
            phase: TumblerPhase::AwaitingPromiseInit,
            keys,
            tx,
            alpha: None,
            g_to_the_alpha: None,
            ctx_alpha: None,
            k_2_prime: None,
            r_2_prime: None,
            r_1_prime: None,
            e_prime: None,
            s_2_prime: None,
        }
    }
}

/// Where an Alice session sits in the puzzle hand-off (spec §4.13's scope:
/// Alice's promise sub-protocol with the Tumbler is modeled as a value
/// Alice already holds, not re-run here — see SPEC_FULL.md).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AlicePhase {
    /// Holds the signature `(e', s')` from her own promise phase, waiting
    /// for Bob's `puzzle_share`.
    AwaitingPuzzleShare,
    /// Randomized puzzle sent back to Bob; protocol complete on her side.
    PuzzleShareDone,
}

pub struct AliceSession {
    pub phase: AlicePhase,
    pub keys: KeyBundle,
    pub tx: Vec<u8>,

    /// The adaptor signature challenge/response from Alice's own promise
    /// phase with the Tumbler, injected rather than derived here.
    pub e_prime: Scalar,
    pub s_prime: Scalar,

    pub g_to_the_alpha_plus_beta: Option<Point>,
    pub ctx_alpha_plus_beta: Option<Ct>,
    /// Alice's own randomizer `gamma`, folded into the puzzle before
    /// handing it back.
    pub gamma: Option<Scalar>,
}

impl AliceSession {
    pub fn new(keys: KeyBundle, tx: Vec<u8>, e_prime: Scalar, s_prime: Scalar) -> AliceSession {
        AliceSession {
            phase: AlicePhase::AwaitingPuzzleShare,
            keys,
            tx,
            e_prime,
            s_prime,
            g_to_the_alpha_plus_beta: None,
            ctx_alpha_plus_beta: None,
            gamma: None,
        }
    }
}
