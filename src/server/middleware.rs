use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;

use crate::auth::gate::{AuthDecision, DenyReason};
use crate::server::routes::error_response;
use crate::AppState;

/// Gating middleware for every route outside `/api/auth`.
///
/// 401 means "no attempt" (nothing presented), 403 means "failed attempt"
/// (a credential was presented and rejected). Connection tokens are not a
/// credential here — they are consumed only by the handshake collaborator.
pub async fn require_auth(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    match state.gate.authenticate(req.headers()) {
        AuthDecision::Authenticated => next.run(req).await,
        AuthDecision::Unauthenticated(reason) => {
            log::warn!(
                "AUDIT DENIED method={} path={} reason={:?}",
                req.method(),
                req.uri().path(),
                reason
            );
            match reason {
                DenyReason::MissingCredentials => {
                    error_response(StatusCode::UNAUTHORIZED, "Authentication required.")
                }
                DenyReason::InvalidApiKey | DenyReason::InvalidOrExpiredSession => {
                    error_response(StatusCode::FORBIDDEN, "Invalid API key.")
                }
            }
        }
    }
}
