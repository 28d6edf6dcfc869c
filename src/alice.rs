//! Alice's side of the puzzle hand-off (SPEC_FULL.md §C14). Alice's own
//! promise sub-protocol with the Tumbler mirrors `bob.rs`'s client steps
//! exactly and is out of scope here (see SPEC_FULL.md's Open Question
//! decision); an `AliceSession` is constructed already holding the
//! `(e', s')` pair that sub-protocol would have produced.

use rand_core::{CryptoRng, RngCore};
use tracing::{debug, info, instrument};

use crate::codec::Message;
use crate::error::{ProtocolError, Result};
use crate::group::{Point, Scalar};
use crate::messages::{msg_type, PuzzleShare, PuzzleSolutionShare};
use crate::paillier;
use crate::router::Router;
use crate::session::{AlicePhase, AliceSession};

fn require_phase(session: &AliceSession, expected: AlicePhase) -> Result<()> {
    if session.phase != expected {
        return Err(ProtocolError::StateError(format!(
            "expected phase {:?}, session is in {:?}",
            expected, session.phase
        )));
    }
    Ok(())
}

/// `puzzle_share`: Bob hands Alice the randomized puzzle. Alice folds in
/// her own randomizer `gamma` before handing it back — the layer of
/// indirection that keeps Bob from linking this payment to the one he
/// ran with the Tumbler (spec §4.6's anonymity property).
#[instrument(skip_all)]
fn handle_puzzle_share<R: RngCore + CryptoRng>(
    rng: &mut R,
    session: &mut AliceSession,
    msg: &Message,
) -> Result<Option<Message>> {
    require_phase(session, AlicePhase::AwaitingPuzzleShare)?;

    let body = PuzzleShare::decode(&msg.data, &session.keys.counterparty_paillier_public)?;
    debug!("puzzle_share received, folding in gamma");

    let gamma = Scalar::random(rng);
    session.gamma = Some(gamma);
    session.g_to_the_alpha_plus_beta = Some(body.g_to_the_alpha_plus_beta);
    session.ctx_alpha_plus_beta = Some(body.ctx_alpha_plus_beta);
    session.phase = AlicePhase::PuzzleShareDone;

    Ok(Some(Message::new(msg_type::PUZZLE_SHARE_DONE, vec![])))
}

/// After completing the payment that the puzzle gates, Alice learns
/// `alpha + beta` and sends it back to Bob as `puzzle_solution_share`.
/// Outside this crate's scope: the on-chain/off-chain mechanism that
/// actually reveals the exponent to her.
#[instrument(skip_all)]
pub fn send_puzzle_solution(
    session: &AliceSession,
    alpha_hat: Scalar,
    transport: &dyn crate::transport::Transport,
) -> Result<()> {
    require_phase(session, AlicePhase::PuzzleShareDone)?;
    let body = PuzzleSolutionShare { alpha_hat }.encode();
    transport.request(&Message::new(msg_type::PUZZLE_SOLUTION_SHARE, body))?;
    info!("puzzle solution handed back to Bob");
    Ok(())
}

/// Recovers the joint point Bob should expect: used by callers that want
/// to sanity-check their own `alpha_hat` before sending it.
pub fn expected_point(session: &AliceSession) -> Option<Point> {
    session.g_to_the_alpha_plus_beta
}

/// The dispatch table Alice's HTTP listener runs for Bob's hand-off.
pub fn router() -> Router<AliceSession> {
    Router::new().on(msg_type::PUZZLE_SHARE, |session, msg| {
        let mut rng = rand::thread_rng();
        handle_puzzle_share(&mut rng, session, msg)
    })
}
