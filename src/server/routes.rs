//! Session endpoints: login, logout, status, and connection-token issuance.
//!
//! These are the only routes mounted outside the gating middleware — login
//! and status must be reachable before authentication, logout must stay
//! idempotent for stale clients, and the token endpoint does its own
//! (report-style) auth check so it can answer 401 uniformly.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::gate::{self, AuthDecision};
use crate::config;
use crate::AppState;

// ── Request / response types ───────────────────────────────────

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub api_key: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    /// Also returned in-body for clients that cannot rely on cross-origin
    /// cookies; they carry it in the `x-session-token` header instead.
    pub token: String,
}

#[derive(Serialize, ToSchema)]
pub struct StatusResponse {
    pub success: bool,
    pub authenticated: bool,
    pub required: bool,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrantResponse {
    pub success: bool,
    pub token: String,
    pub expires_in: u64,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

pub(crate) fn error_response(status: StatusCode, error: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            success: false,
            error: error.to_string(),
        }),
    )
        .into_response()
}

// ── Cookie helpers ─────────────────────────────────────────────

fn session_cookie(state: &AppState, token: &str, max_age_secs: u64) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Strict; Max-Age={}",
        config::SESSION_COOKIE,
        token,
        max_age_secs
    );
    if state.config.secure_cookies {
        cookie.push_str("; Secure");
    }
    cookie
}

fn clear_session_cookie(state: &AppState) -> String {
    session_cookie(state, "", 0)
}

// ── Handlers ───────────────────────────────────────────────────

/// Report the caller's authentication state. Never rejects.
#[utoipa::path(
    get,
    path = "/api/auth/status",
    tag = "auth",
    responses(
        (status = 200, description = "Current authentication state", body = StatusResponse),
    )
)]
pub async fn status(State(state): State<AppState>, headers: HeaderMap) -> Json<StatusResponse> {
    Json(StatusResponse {
        success: true,
        authenticated: state.gate.is_authenticated(&headers),
        required: true,
    })
}

/// Exchange the API key for a session.
///
/// `POST /api/auth/login`
///
/// On success the session token is set as an HTTP-only `SameSite=Strict`
/// cookie and echoed in the body.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; session cookie set", body = LoginResponse),
        (status = 400, description = "No API key in the request body", body = ErrorResponse),
        (status = 401, description = "API key does not match", body = ErrorResponse),
        (status = 429, description = "Too many login attempts", body = ErrorResponse),
    )
)]
pub async fn login(State(state): State<AppState>, body: Bytes) -> Response {
    // Parsed leniently: a missing body, a non-JSON body, and a JSON body
    // without the field all mean the same thing to the caller.
    let api_key = serde_json::from_slice::<LoginRequest>(&body)
        .ok()
        .and_then(|r| r.api_key);

    let Some(api_key) = api_key else {
        return error_response(StatusCode::BAD_REQUEST, "API key is required.");
    };

    if !state.gate.validate_key(&api_key) {
        log::warn!("AUDIT LOGIN_FAILED reason=invalid_key");
        return error_response(StatusCode::UNAUTHORIZED, "Invalid API key.");
    }

    let token = state.sessions.create();
    log::info!("AUDIT LOGIN session={}…", &token[..12]);

    (
        StatusCode::OK,
        [(
            header::SET_COOKIE,
            session_cookie(&state, &token, config::SESSION_TTL.as_secs()),
        )],
        Json(LoginResponse {
            success: true,
            message: "Logged in successfully.".to_string(),
            token,
        }),
    )
        .into_response()
}

/// Invalidate the presented session and clear the cookie. Always 200 —
/// logging out twice, or without ever logging in, is not an error.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Session invalidated (if any); cookie cleared", body = MessageResponse),
    )
)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = gate::presented_session(&headers) {
        state.sessions.invalidate(&token);
    }

    (
        StatusCode::OK,
        [(header::SET_COOKIE, clear_session_cookie(&state))],
        Json(MessageResponse {
            success: true,
            message: "Logged out successfully.".to_string(),
        }),
    )
        .into_response()
}

/// Mint a short-lived connection token for handshake-only authentication
/// (streaming/upgrade connections that cannot carry cookies or headers).
///
/// `GET /api/auth/token` — requires prior authentication.
#[utoipa::path(
    get,
    path = "/api/auth/token",
    tag = "auth",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Connection token, valid for five minutes", body = TokenGrantResponse),
        (status = 401, description = "Caller is not authenticated", body = ErrorResponse),
    )
)]
pub async fn token(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let AuthDecision::Unauthenticated(reason) = state.gate.authenticate(&headers) {
        log::warn!("AUDIT TOKEN_DENIED reason={:?}", reason);
        return error_response(StatusCode::UNAUTHORIZED, "Authentication required.");
    }

    // Bind the token to the presented session when there is a live one. A
    // caller authenticated by raw API key gets a fresh backing session so
    // the token always has an issuing session.
    let session_token = gate::presented_session(&headers)
        .filter(|t| state.sessions.get(t).is_some())
        .unwrap_or_else(|| {
            log::info!("AUDIT SESSION_MINTED reason=api_key_token_request");
            state.sessions.create()
        });

    match state.sessions.issue_connection_token(&session_token) {
        Ok(grant) => {
            log::info!("AUDIT CONNECTION_TOKEN_ISSUED token={}…", &grant.token[..12]);
            Json(TokenGrantResponse {
                success: true,
                token: grant.token,
                expires_in: config::CONNECTION_TOKEN_TTL.as_secs(),
            })
            .into_response()
        }
        // The session raced to expiry between the gate check and issuance.
        Err(_) => error_response(StatusCode::UNAUTHORIZED, "Authentication required."),
    }
}
