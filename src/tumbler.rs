//! The Tumbler's side of the promise phase (spec §9/SPEC_FULL.md §C13):
//! the mirror image of `bob.rs`'s client-side steps, run as a server that
//! Bob connects to. Grounded on the same `bob.c` handler sequence, read
//! from the other socket's perspective.

use rand_core::{CryptoRng, RngCore};
use tracing::{debug, info, instrument};

use crate::codec::Message;
use crate::commitment;
use crate::error::{ProtocolError, Result};
use crate::group::{Point, Scalar};
use crate::messages::{msg_type, PromiseEnd, PromiseInitDone, PromiseSign, PromiseSignDone};
use crate::paillier;
use crate::router::Router;
use crate::schnorr;
use crate::session::{TumblerPhase, TumblerSession};
use crate::zkdl;

fn require_phase(session: &TumblerSession, expected: TumblerPhase) -> Result<()> {
    if session.phase != expected {
        return Err(ProtocolError::StateError(format!(
            "expected phase {:?}, session is in {:?}",
            expected, session.phase
        )));
    }
    Ok(())
}

/// `promise_init`: picks a fresh puzzle secret `alpha`, commits to
/// `g^alpha`, encrypts it, and proves knowledge of it. `tx` is shared
/// config the session already carries, not wire data, so the request
/// frame is expected to be empty.
#[instrument(skip_all)]
fn handle_promise_init<R: RngCore + CryptoRng>(
    rng: &mut R,
    session: &mut TumblerSession,
    msg: &Message,
) -> Result<Option<Message>> {
    require_phase(session, TumblerPhase::AwaitingPromiseInit)?;
    if !msg.data.is_empty() {
        return Err(ProtocolError::InvalidMessage(
            "promise_init body must be empty, tx is shared config".into(),
        ));
    }

    let alpha = Scalar::random(rng);
    let g_to_the_alpha = Point::mul_gen(&alpha);
    let com = commitment::commit(rng, &g_to_the_alpha);
    let pi_alpha = zkdl::prove(rng, &g_to_the_alpha, &alpha);
    let ctx_alpha = paillier::encrypt(rng, &session.keys.paillier_public, &alpha.to_biguint())?;

    debug!("promise_init: puzzle committed");
    let reply = PromiseInitDone {
        g_to_the_alpha,
        com_c: com.c,
        com_r: com.r,
        pi_alpha,
        ctx_alpha: ctx_alpha.clone(),
    }
    .encode(&session.keys.paillier_public);

    session.alpha = Some(alpha);
    session.g_to_the_alpha = Some(g_to_the_alpha);
    session.ctx_alpha = Some(ctx_alpha);
    session.phase = TumblerPhase::AwaitingPromiseSign;
    Ok(Some(Message::new(msg_type::PROMISE_INIT_DONE, reply)))
}

/// `promise_sign`: Bob's nonce arrives; the Tumbler replies with its own
/// nonce and partial signature share.
#[instrument(skip_all)]
fn handle_promise_sign<R: RngCore + CryptoRng>(
    rng: &mut R,
    session: &mut TumblerSession,
    msg: &Message,
) -> Result<Option<Message>> {
    require_phase(session, TumblerPhase::AwaitingPromiseSign)?;

    let body = PromiseSign::decode(&msg.data)?;
    zkdl::verify(&body.proof, &body.r_prime)?;

    let k_2_prime = Scalar::random(rng);
    let r_2_prime = Point::mul_gen(&k_2_prime);
    let proof = zkdl::prove(rng, &r_2_prime, &k_2_prime);
    let g_to_the_alpha = session
        .g_to_the_alpha
        .ok_or_else(|| ProtocolError::StateError("promise_sign run before promise_init".into()))?;
    let combined_nonce = body.r_prime + r_2_prime + g_to_the_alpha;
    let e_prime = schnorr::challenge(&session.tx, &combined_nonce)?;
    let s_2_prime = schnorr::partial_sign(&k_2_prime, &session.keys.schnorr_secret, &e_prime);

    info!("promise_sign: nonce exchanged, partial signature issued");
    session.k_2_prime = Some(k_2_prime);
    session.r_2_prime = Some(r_2_prime);
    session.r_1_prime = Some(body.r_prime);
    session.e_prime = Some(e_prime);
    session.s_2_prime = Some(s_2_prime);
    session.phase = TumblerPhase::AwaitingPromiseEnd;

    let reply = PromiseSignDone { r_prime: r_2_prime, proof, s_partial: s_2_prime }.encode();
    Ok(Some(Message::new(msg_type::PROMISE_SIGN_DONE, reply)))
}

/// `promise_end`: Bob hands back the combined pre-signature; the Tumbler
/// checks it verifies against the base nonce (without `g^alpha` folded
/// in) before acknowledging — `s'` is an adaptor pre-signature, not yet a
/// complete one, until `alpha` is added in (spec §4.8 S6→S7).
#[instrument(skip_all)]
fn handle_promise_end(session: &mut TumblerSession, msg: &Message) -> Result<Option<Message>> {
    require_phase(session, TumblerPhase::AwaitingPromiseEnd)?;

    let body = PromiseEnd::decode(&msg.data)?;
    let e_prime = session
        .e_prime
        .ok_or_else(|| ProtocolError::StateError("promise_end before promise_sign".into()))?;
    let r_1_prime = session
        .r_1_prime
        .ok_or_else(|| ProtocolError::StateError("promise_end before promise_sign".into()))?;
    let r_2_prime = session
        .r_2_prime
        .ok_or_else(|| ProtocolError::StateError("promise_end before promise_sign".into()))?;
    let joint_pk = session.keys.joint_schnorr_public();
    schnorr::verify_presignature(&(r_1_prime + r_2_prime), &joint_pk, &e_prime, &body.s_prime)?;

    info!("promise_end: combined signature verified");
    session.phase = TumblerPhase::PromiseCompleted;
    Ok(Some(Message::new(msg_type::PROMISE_END_DONE, vec![])))
}

/// The dispatch table the Tumbler's HTTP listener runs against for each
/// `client_id` session, closing over a thread-safe RNG the way the
/// teacher's `make_server_func` closes over `csprng` per request.
pub fn router() -> Router<TumblerSession> {
    Router::new()
        .on(msg_type::PROMISE_INIT, |session, msg| {
            let mut rng = rand::thread_rng();
            handle_promise_init(&mut rng, session, msg)
        })
        .on(msg_type::PROMISE_SIGN, |session, msg| {
            let mut rng = rand::thread_rng();
            handle_promise_sign(&mut rng, session, msg)
        })
        .on(msg_type::PROMISE_END, handle_promise_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyBundle;

    fn new_tumbler_session(rng: &mut impl RngCore) -> (TumblerSession, Scalar) {
        let (_, bob_paillier_pk) = paillier::keygen_with_bits(rng, 256);
        let bob_schnorr_sk = Scalar::random(rng);
        let bob_schnorr_pk = Point::mul_gen(&bob_schnorr_sk);
        let keys = KeyBundle::generate(rng, true, bob_paillier_pk, bob_schnorr_pk);
        (TumblerSession::new(keys, b"tx".to_vec()), bob_schnorr_sk)
    }

    #[test]
    fn rejects_promise_sign_before_promise_init() {
        let mut rng = rand::thread_rng();
        let (mut session, _sk) = new_tumbler_session(&mut rng);
        let msg = Message::new(msg_type::PROMISE_SIGN, vec![0; 10]);
        assert!(handle_promise_sign(&mut rng, &mut session, &msg).is_err());
    }

    #[test]
    fn rejects_nonempty_promise_init_body() {
        let mut rng = rand::thread_rng();
        let (mut session, _sk) = new_tumbler_session(&mut rng);
        let msg = Message::new(msg_type::PROMISE_INIT, b"tx should not be sent here".to_vec());
        assert!(handle_promise_init(&mut rng, &mut session, &msg).is_err());
    }

    #[test]
    fn full_round_trip_with_bob_as_counterparty() {
        let mut rng = rand::thread_rng();
        let (mut session, bob_schnorr_sk) = new_tumbler_session(&mut rng);

        let init = handle_promise_init(&mut rng, &mut session, &Message::new(msg_type::PROMISE_INIT, Vec::new()))
            .unwrap()
            .unwrap();
        let init_body = PromiseInitDone::decode(&init.data, &session.keys.paillier_public).unwrap();
        zkdl::verify(&init_body.pi_alpha, &init_body.g_to_the_alpha).unwrap();

        let k_1_prime = Scalar::random(&mut rng);
        let r_1_prime = Point::mul_gen(&k_1_prime);
        let proof = zkdl::prove(&mut rng, &r_1_prime, &k_1_prime);
        let sign_req = PromiseSign { r_prime: r_1_prime, proof }.encode();
        let sign_reply = handle_promise_sign(&mut rng, &mut session, &Message::new(msg_type::PROMISE_SIGN, sign_req))
            .unwrap()
            .unwrap();
        let sign_body = PromiseSignDone::decode(&sign_reply.data).unwrap();
        zkdl::verify(&sign_body.proof, &sign_body.r_prime).unwrap();

        let combined_nonce = r_1_prime + sign_body.r_prime + init_body.g_to_the_alpha;
        let e_prime = schnorr::challenge(b"tx", &combined_nonce).unwrap();
        let s_1_prime = schnorr::partial_sign(&k_1_prime, &bob_schnorr_sk, &e_prime);
        let s_prime = schnorr::combine(&s_1_prime, &sign_body.s_partial);

        let end_req = PromiseEnd { s_prime }.encode();
        let end_reply = handle_promise_end(&mut session, &Message::new(msg_type::PROMISE_END, end_req))
            .unwrap()
            .unwrap();
        assert_eq!(end_reply.msg_type, msg_type::PROMISE_END_DONE);
        assert_eq!(session.phase, TumblerPhase::PromiseCompleted);
    }
}
