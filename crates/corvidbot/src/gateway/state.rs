//! Session state types.

use std::sync::atomic::{AtomicU32, Ordering};

/// State of the gateway session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No socket open.
    Disconnected,
    /// TCP and WebSocket handshake in progress.
    Connecting,
    /// Socket open; waiting for hello and sending identify.
    Identifying,
    /// READY received; heartbeats running and events flowing.
    Connected,
    /// Connection lost; waiting out a backoff delay.
    Reconnecting,
    /// Terminal: stopped or reconnect budget exhausted.
    Closed,
}

/// Atomic wrapper for session state.
#[derive(Debug)]
pub struct AtomicSessionState(AtomicU32);

impl AtomicSessionState {
    /// Create a new atomic state.
    #[must_use]
    pub const fn new(state: SessionState) -> Self {
        Self(AtomicU32::new(state as u32))
    }

    /// Load the current state.
    #[must_use]
    pub fn load(&self) -> SessionState {
        match self.0.load(Ordering::SeqCst) {
            0 => SessionState::Disconnected,
            1 => SessionState::Connecting,
            2 => SessionState::Identifying,
            3 => SessionState::Connected,
            4 => SessionState::Reconnecting,
            _ => SessionState::Closed,
        }
    }

    /// Store a new state.
    pub fn store(&self, state: SessionState) {
        self.0.store(state as u32, Ordering::SeqCst);
    }
}
