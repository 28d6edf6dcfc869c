//! Transport glue (spec §4.9, out-of-scope items per spec: TLS, peer auth,
//! retries beyond the server-busy backoff). One message in flight per
//! session; the wire format is the codec's framed bytes carried as an
//! HTTP body, matching the teacher's `rouille`/`reqwest` pairing in
//! `webservers.rs`.
//!
//! A second, in-memory implementation exists purely for deterministic
//! integration tests (SPEC_FULL.md §C15) — no sockets, no timing.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering::SeqCst};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

use crate::codec::Message;
use crate::error::{ProtocolError, Result};
use crate::router::Router;

/// Milliseconds a client backs off for after a 409 (another session for
/// this client_id is still in flight on the server).
const CLIENT_BACKOFF_MS: u64 = 75;

/// What a Bob or Alice process uses to talk to its counterparty: a single
/// blocking request/reply call per protocol step.
pub trait Transport: Send + Sync {
    fn request(&self, msg: &Message) -> Result<Message>;
}

/// HTTP client transport: POSTs the framed message bytes to `base_url`,
/// tagged with a `client_id` header so the server can find this session's
/// state, retrying on `409 Conflict` (server-busy) as the teacher's
/// `make_client` does.
pub struct HttpClientTransport {
    base_url: String,
    client_id: String,
}

impl HttpClientTransport {
    pub fn new(base_url: impl Into<String>, client_id: impl Into<String>) -> HttpClientTransport {
        HttpClientTransport {
            base_url: base_url.into(),
            client_id: client_id.into(),
        }
    }
}

impl Transport for HttpClientTransport {
    fn request(&self, msg: &Message) -> Result<Message> {
        let body = msg.serialize();
        loop {
            let res = reqwest::blocking::Client::new()
                .post(&self.base_url)
                .header("client_id", &self.client_id)
                .body(body.clone())
                .send()
                .map_err(|e| ProtocolError::TransportError(e.to_string()))?;

            if res.status() == reqwest::StatusCode::CONFLICT {
                std::thread::sleep(Duration::from_millis(CLIENT_BACKOFF_MS));
                continue;
            }
            if !res.status().is_success() {
                return Err(ProtocolError::TransportError(format!(
                    "server returned {}",
                    res.status()
                )));
            }
            let bytes = res
                .bytes()
                .map_err(|e| ProtocolError::TransportError(e.to_string()))?;
            return Message::deserialize(&bytes);
        }
    }
}

/// Runs an HTTP server dispatching every request through `router`,
/// keeping one `S` per `client_id` in `sessions`. Mirrors
/// `webservers::start_schnorr_server`'s pool-size-1, poll-loop-with-a-
/// stop-flag shape rather than rouille's default thread-per-request mode,
/// since the protocol assumes at most one message in flight per session.
pub fn serve<S>(
    addr: &str,
    router: Arc<Router<S>>,
    sessions: Arc<DashMap<String, S>>,
    make_session: impl Fn(&str) -> Result<S> + Send + Sync + 'static,
) -> Arc<AtomicBool>
where
    S: Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let stop_for_server = stop.clone();

    let handler = move |req: &rouille::Request| -> rouille::Response {
        let client_id = match req.header("client_id") {
            Some(id) => id.to_string(),
            None => return rouille::Response::text("missing client_id header").with_status_code(400),
        };

        let mut reader = match req.data() {
            Some(r) => r,
            None => return rouille::Response::text("request body already taken").with_status_code(400),
        };
        let mut body = Vec::new();
        if reader.read_to_end(&mut body).is_err() {
            return rouille::Response::text("failed to read body").with_status_code(400);
        }

        let msg = match Message::deserialize(&body) {
            Ok(m) => m,
            Err(_) => return rouille::Response::text("malformed frame").with_status_code(400),
        };

        if !sessions.contains_key(&client_id) {
            match make_session(&client_id) {
                Ok(s) => {
                    sessions.insert(client_id.clone(), s);
                }
                Err(e) => return rouille::Response::text(e.to_string()).with_status_code(400),
            }
        }

        let mut session = sessions.get_mut(&client_id).expect("just inserted or already present");
        match router.dispatch(&mut *session, &msg) {
            Ok(Some(reply)) => rouille::Response::from_data("application/octet-stream", reply.serialize()),
            Ok(None) => rouille::Response::empty_204(),
            Err(e) => rouille::Response::text(e.to_string()).with_status_code(422),
        }
    };

    let addr = addr.to_string();
    std::thread::spawn(move || {
        let server = rouille::Server::new(&addr, handler)
            .expect("failed to bind transport listener")
            .pool_size(1);

        while !stop_for_server.load(SeqCst) {
            server.poll();
            std::thread::sleep(Duration::from_millis(10));
        }
    });

    stop
}

/// An in-process channel pair standing in for the HTTP transport in tests:
/// same `Transport` contract, zero sockets, zero timing dependence.
pub struct InMemoryTransport {
    outbound: Sender<Message>,
    inbound: Receiver<Message>,
}

impl InMemoryTransport {
    /// Builds a connected pair: whatever is sent on one end's `request`
    /// arrives for the other end to answer via `respond`.
    pub fn pair() -> (InMemoryTransport, InMemoryTransport) {
        let (tx_a, rx_a) = std::sync::mpsc::channel();
        let (tx_b, rx_b) = std::sync::mpsc::channel();
        (
            InMemoryTransport { outbound: tx_a, inbound: rx_b },
            InMemoryTransport { outbound: tx_b, inbound: rx_a },
        )
    }

    /// Blocks for the next message sent by the peer, without sending one
    /// of our own first — used by the side that plays "server" in a test.
    pub fn recv(&self) -> Result<Message> {
        self.inbound
            .recv()
            .map_err(|_| ProtocolError::TransportError("peer disconnected".into()))
    }

    /// Sends a reply without expecting one back.
    pub fn send(&self, msg: Message) -> Result<()> {
        self.outbound
            .send(msg)
            .map_err(|_| ProtocolError::TransportError("peer disconnected".into()))
    }
}

impl Transport for InMemoryTransport {
    fn request(&self, msg: &Message) -> Result<Message> {
        self.send(msg.clone())?;
        self.recv()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_pair_round_trips_a_request_reply() {
        let (a, b) = InMemoryTransport::pair();
        let handle = std::thread::spawn(move || {
            let req = b.recv().unwrap();
            b.send(Message::new("pong", req.data)).unwrap();
        });
        let reply = a.request(&Message::new("ping", vec![1, 2, 3])).unwrap();
        assert_eq!(reply.msg_type, "pong");
        assert_eq!(reply.data, vec![1, 2, 3]);
        handle.join().unwrap();
    }
}
