//! Module `state`
//!
//! Per-connection session state: `Unauthenticated` → `Authenticated` →
//! `Closed`. Authentication is one-way; there is no logout.

use std::net::SocketAddr;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated { username: String },
    Closed,
}

/// Represents the state of one connected client.
///
/// Owned by the session task; never shared with other connections.
#[derive(Debug)]
pub struct Client {
    client_addr: SocketAddr,
    state: SessionState,
}

impl Client {
    pub fn new(client_addr: SocketAddr) -> Self {
        Self {
            client_addr,
            state: SessionState::Unauthenticated,
        }
    }

    pub fn client_addr(&self) -> &SocketAddr {
        &self.client_addr
    }

    /// Returns whether the client has passed USER.
    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated { .. })
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// Username of an authenticated client
    pub fn username(&self) -> Option<&str> {
        match &self.state {
            SessionState::Authenticated { username } => Some(username.as_str()),
            _ => None,
        }
    }

    /// Moves `Unauthenticated` to `Authenticated`. No effect in any other state.
    pub fn authenticate(&mut self, username: &str) {
        if self.state == SessionState::Unauthenticated {
            self.state = SessionState::Authenticated {
                username: username.to_string(),
            };
        }
    }

    /// Terminal transition.
    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }
}
