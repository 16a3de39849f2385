//! Events emitted by the gateway session.

use std::time::Duration;

use corvid_proto::{Interaction, Ready};
use serde_json::Value;

/// Events emitted by a running gateway session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The handshake completed and the session is live.
    Ready(Ready),
    /// An interaction arrived and was decoded.
    Interaction(Interaction),
    /// A dispatch this client does not decode further.
    Event {
        /// Event name from the `t` field.
        name: String,
        /// Raw event body.
        data: Value,
    },
    /// The connection dropped. A reconnect follows if budget remains.
    Disconnected {
        /// Why the connection ended.
        reason: String,
    },
    /// Waiting out a backoff delay before the next connect attempt.
    Reconnecting {
        /// 1-based attempt number.
        attempt: u32,
        /// Delay before the attempt.
        delay: Duration,
    },
    /// The reconnect budget is exhausted and the session is closed.
    ReconnectFailed {
        /// Attempts made before giving up.
        attempts: u32,
        /// Error from the final attempt.
        last_error: String,
    },
}
