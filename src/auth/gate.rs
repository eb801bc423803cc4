//! The authorization decision used by the gating middleware and the status
//! endpoint.
//!
//! A request can carry a credential over three channels, checked in fixed
//! precedence order:
//!
//! 1. **API key** — `x-api-key` header (the long-lived shared secret)
//! 2. **Session cookie** — set by `POST /api/auth/login`
//! 3. **Session-token header** — `x-session-token`, the cookie-free carry
//!    for cross-origin clients
//!
//! Extraction stops at the first *structurally present* credential,
//! independent of whether it turns out to be valid. Validation then yields
//! an explicit outcome value — never thrown control flow — so callers
//! compose the deny reason into the right HTTP status.

use axum::http::{header, HeaderMap};

use std::sync::Arc;

use crate::auth::keys::KeyValidator;
use crate::auth::store::SessionStore;
use crate::config;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Alternate session carry for clients that cannot use cookies.
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

// ── Credential extraction ──────────────────────────────────────

/// A credential as presented on the wire, before any validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    ApiKey(String),
    SessionCookie(String),
    SessionHeader(String),
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k == name).then(|| v.to_string())
    })
}

fn api_key_header(headers: &HeaderMap) -> Option<Credential> {
    header_value(headers, API_KEY_HEADER).map(Credential::ApiKey)
}

fn session_cookie(headers: &HeaderMap) -> Option<Credential> {
    cookie_value(headers, config::SESSION_COOKIE).map(Credential::SessionCookie)
}

fn session_token_header(headers: &HeaderMap) -> Option<Credential> {
    header_value(headers, SESSION_TOKEN_HEADER).map(Credential::SessionHeader)
}

/// Extraction strategies in precedence order. The first one that produces a
/// candidate wins; later channels are not consulted.
const EXTRACTORS: &[fn(&HeaderMap) -> Option<Credential>] =
    &[api_key_header, session_cookie, session_token_header];

/// The first structurally present credential on the request, if any.
pub fn extract_credential(headers: &HeaderMap) -> Option<Credential> {
    EXTRACTORS.iter().find_map(|extract| extract(headers))
}

/// The session token presented on the request (cookie first, then header),
/// regardless of which channel would win overall precedence.
pub fn presented_session(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, config::SESSION_COOKIE)
        .or_else(|| header_value(headers, SESSION_TOKEN_HEADER))
}

// ── Decision ───────────────────────────────────────────────────

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No credential of any kind was presented.
    MissingCredentials,
    /// An API key was presented but does not match the secret.
    InvalidApiKey,
    /// A session token was presented but is unknown or expired.
    InvalidOrExpiredSession,
}

/// Outcome of [`AuthGate::authenticate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    Authenticated,
    Unauthenticated(DenyReason),
}

/// The composed decision function: key validation plus session lookup.
pub struct AuthGate {
    validator: KeyValidator,
    sessions: Arc<SessionStore>,
}

impl AuthGate {
    pub fn new(validator: KeyValidator, sessions: Arc<SessionStore>) -> Self {
        AuthGate {
            validator,
            sessions,
        }
    }

    /// Classify the request. The first structurally present credential is
    /// the one that gets validated; a wrong API key is not excused by a
    /// valid cookie further down the precedence order.
    pub fn authenticate(&self, headers: &HeaderMap) -> AuthDecision {
        match extract_credential(headers) {
            None => AuthDecision::Unauthenticated(DenyReason::MissingCredentials),
            Some(Credential::ApiKey(key)) => {
                if self.validator.validate(&key) {
                    AuthDecision::Authenticated
                } else {
                    AuthDecision::Unauthenticated(DenyReason::InvalidApiKey)
                }
            }
            Some(Credential::SessionCookie(token)) | Some(Credential::SessionHeader(token)) => {
                if self.sessions.get(&token).is_some() {
                    AuthDecision::Authenticated
                } else {
                    AuthDecision::Unauthenticated(DenyReason::InvalidOrExpiredSession)
                }
            }
        }
    }

    /// Report-only form of [`authenticate`](Self::authenticate) for the
    /// status endpoint — never rejects.
    pub fn is_authenticated(&self, headers: &HeaderMap) -> bool {
        matches!(self.authenticate(headers), AuthDecision::Authenticated)
    }

    /// Direct key check for the login flow, before any session exists.
    pub fn validate_key(&self, presented: &str) -> bool {
        self.validator.validate(presented)
    }
}
