//! Message router (spec §4.7): a static lookup from message type to
//! handler. Dispatch on an unregistered type is a fatal, session-ending
//! error rather than a silent no-op.

use crate::codec::Message;
use crate::error::{ProtocolError, Result};

type Handler<S> = Box<dyn Fn(&mut S, &Message) -> Result<Option<Message>> + Send + Sync>;

/// Built once per role at startup and shared across every session of that
/// role, since the table itself carries no session-specific state.
pub struct Router<S> {
    handlers: Vec<(&'static str, Handler<S>)>,
}

impl<S> Router<S> {
    pub fn new() -> Router<S> {
        Router { handlers: Vec::new() }
    }

    /// Registers the handler for `msg_type`. Registering the same type
    /// twice is a programmer error, caught at startup rather than at
    /// dispatch time.
    pub fn on(
        mut self,
        msg_type: &'static str,
        handler: impl Fn(&mut S, &Message) -> Result<Option<Message>> + Send + Sync + 'static,
    ) -> Router<S> {
        assert!(
            !self.handlers.iter().any(|(t, _)| *t == msg_type),
            "duplicate handler registered for message type {msg_type}"
        );
        self.handlers.push((msg_type, Box::new(handler)));
        self
    }

    pub fn dispatch(&self, state: &mut S, msg: &Message) -> Result<Option<Message>> {
        for (msg_type, handler) in &self.handlers {
            if *msg_type == msg.msg_type {
                return handler(state, msg);
            }
        }
        Err(ProtocolError::InvalidMessage(format!(
            "unknown message type: {}",
            msg.msg_type
        )))
    }
}

impl<S> Default for Router<S> {
    fn default() -> Router<S> {
        Router::new()
    }
}
