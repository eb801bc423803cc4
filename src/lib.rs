//! Gatehouse: the authentication gate in front of a local automation host.
//!
//! Layered trust model: long-lived API key > medium-lived session >
//! short-lived connection token. The gate classifies every inbound request
//! before it can reach the automation surface behind it.

pub mod auth;
pub mod config;
pub mod error;
pub mod server;

use std::sync::Arc;

use auth::{AuthGate, KeyValidator, SessionStore};
use config::Config;

/// Shared per-process state: immutable config plus the session store and
/// the decision gate built over it.
pub struct Gatehouse {
    pub config: Config,
    pub sessions: Arc<SessionStore>,
    pub gate: AuthGate,
}

impl Gatehouse {
    pub fn new(config: Config) -> Self {
        let sessions = Arc::new(SessionStore::new(
            config::SESSION_TTL,
            config::CONNECTION_TOKEN_TTL,
        ));
        let gate = AuthGate::new(
            KeyValidator::new(config.api_key.as_deref()),
            sessions.clone(),
        );
        Gatehouse {
            config,
            sessions,
            gate,
        }
    }
}

pub type AppState = Arc<Gatehouse>;
