//! In-memory session and connection-token store.
//!
//! The store is the single source of truth for both record kinds — nothing
//! else inserts, mutates, or removes them. All accessors go through the
//! store's methods, each a short critical section behind a `Mutex`, so a
//! `get` racing an `invalidate` of the same token deterministically sees
//! the record as present or absent, never torn; once `invalidate` returns,
//! every subsequent `get` observes absence.
//!
//! # Token format
//!
//! - Session tokens: `sess_` + 40 Base62 characters
//! - Connection tokens: `conn_` + 40 Base62 characters
//!
//! Base62 = `[0-9A-Za-z]`, so 40 random characters yield
//! `log2(62^40) ≈ 238` bits of entropy from a CSPRNG. The prefixes keep the
//! two namespaces disjoint: a connection token can never be replayed as a
//! session token or vice versa.
//!
//! # Expiry
//!
//! Reclamation is lazy: an expired record is evicted when it is next looked
//! up, and each `create`/`issue` sweeps its map with `retain` first, so
//! abandoned records cannot accumulate without bound. There is no background
//! task and nothing to stop at shutdown.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rand::Rng;

use crate::error::GatehouseError;

const SESSION_PREFIX: &str = "sess_";
const CONNECTION_PREFIX: &str = "conn_";

/// Number of random Base62 characters after the prefix (~238 bits).
const TOKEN_RANDOM_LEN: usize = 40;

const BASE62_CHARS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Generate an unguessable token: `prefix` + 40 random Base62 characters.
/// `rand::rng()` is CSPRNG-backed; if the entropy source is catastrophically
/// broken it aborts the process, which is the only acceptable outcome here.
fn generate_token(prefix: &str) -> String {
    let mut rng = rand::rng();
    let random_part: String = (0..TOKEN_RANDOM_LEN)
        .map(|_| {
            let idx = rng.random_range(0..BASE62_CHARS.len());
            BASE62_CHARS[idx] as char
        })
        .collect();
    format!("{prefix}{random_part}")
}

// ── Records ────────────────────────────────────────────────────

/// One logged-in client.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub created_at: Instant,
    pub expires_at: Instant,
}

/// A short-lived credential for handshake-only authentication, derived from
/// a session at issue time.
#[derive(Debug, Clone)]
pub struct ConnectionToken {
    pub token: String,
    /// The session this token was derived from. Back-reference only — the
    /// parent is not consulted again at redemption time.
    pub issued_for: String,
    pub expires_at: Instant,
}

// ── Store ──────────────────────────────────────────────────────

pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    connection_tokens: Mutex<HashMap<String, ConnectionToken>>,
    session_ttl: Duration,
    connection_token_ttl: Duration,
}

impl SessionStore {
    pub fn new(session_ttl: Duration, connection_token_ttl: Duration) -> Self {
        SessionStore {
            sessions: Mutex::new(HashMap::new()),
            connection_tokens: Mutex::new(HashMap::new()),
            session_ttl,
            connection_token_ttl,
        }
    }

    // ── Sessions ───────────────────────────────────────────────

    /// Create a new session and return its token.
    pub fn create(&self) -> String {
        let token = generate_token(SESSION_PREFIX);
        let now = Instant::now();
        let session = Session {
            token: token.clone(),
            created_at: now,
            expires_at: now + self.session_ttl,
        };

        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.retain(|_, s| now < s.expires_at);
        sessions.insert(token.clone(), session);
        token
    }

    /// Look up a session. Present but expired counts as absent, and the
    /// stale entry is evicted on the way out.
    pub fn get(&self, token: &str) -> Option<Session> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        match sessions.get(token) {
            Some(s) if Instant::now() < s.expires_at => Some(s.clone()),
            Some(_) => {
                sessions.remove(token);
                None
            }
            None => None,
        }
    }

    /// Remove a session. Unknown tokens are a no-op — logout is idempotent.
    pub fn invalidate(&self, token: &str) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(s) = sessions.remove(token) {
            log::info!(
                "AUDIT session_invalidated age_secs={}",
                s.created_at.elapsed().as_secs()
            );
        }
    }

    // ── Connection tokens ──────────────────────────────────────

    /// Mint a connection token bound to `session_token`. Fails unless the
    /// session is currently valid.
    pub fn issue_connection_token(
        &self,
        session_token: &str,
    ) -> Result<ConnectionToken, GatehouseError> {
        if self.get(session_token).is_none() {
            return Err(GatehouseError::NotAuthenticated);
        }

        let token = generate_token(CONNECTION_PREFIX);
        let now = Instant::now();
        let record = ConnectionToken {
            token: token.clone(),
            issued_for: session_token.to_string(),
            expires_at: now + self.connection_token_ttl,
        };

        let mut tokens = self
            .connection_tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        tokens.retain(|_, t| now < t.expires_at);
        tokens.insert(token, record.clone());
        Ok(record)
    }

    /// True iff the connection token exists and its TTL has not elapsed.
    ///
    /// Redemption is TTL-only: it does not consume the token, does not
    /// consult the parent session, and never extends any expiry. A token
    /// issued from a since-invalidated session stays redeemable until its
    /// own TTL runs out — the handshake must not race session renewal.
    pub fn redeem_connection_token(&self, token: &str) -> bool {
        let mut tokens = self
            .connection_tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        match tokens.get(token) {
            Some(t) if Instant::now() < t.expires_at => true,
            Some(_) => {
                tokens.remove(token);
                false
            }
            None => false,
        }
    }
}
