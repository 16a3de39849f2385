//! Gateway WebSocket session.
//!
//! Manages the connection between a bot and the platform gateway: the
//! hello/identify handshake, heartbeats, dispatch decoding, and
//! automatic reconnection with exponential backoff.

mod events;
mod heartbeat;
mod reconnect;
mod session;
mod state;

pub use events::SessionEvent;
pub use heartbeat::{start_heartbeat_task, HeartbeatCommand, HeartbeatConfig, HeartbeatHandle};
pub use reconnect::ReconnectPolicy;
pub use session::GatewaySession;
pub use state::{AtomicSessionState, SessionState};
