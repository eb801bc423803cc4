//! End-to-end tests for the auth lifecycle, exercising the assembled router:
//! login → cookie carry → gated route → token issuance → logout, plus the
//! rejection paths of the gating middleware.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::{routing, Json, Router};
use tower::ServiceExt;

use gatehouse::config::Config;
use gatehouse::{server, AppState, Gatehouse};

const TEST_KEY: &str = "gh-integration-test-key";

fn test_state() -> AppState {
    Arc::new(Gatehouse::new(Config {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        api_key: Some(TEST_KEY.to_string()),
        secure_cookies: false,
    }))
}

async fn ping() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "success": true, "message": "pong" }))
}

fn test_app(state: AppState) -> Router {
    let api = Router::new().route("/api/ping", routing::get(ping));
    server::router(state, api)
}

async fn body_json(resp: Response) -> serde_json::Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn login_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Log in with the test key and return the session cookie pair
/// (`gatehouse_session=sess_…`) plus the in-body token.
async fn login(app: &Router) -> (String, String) {
    let resp = app
        .clone()
        .oneshot(login_request(&format!(r#"{{"apiKey":"{}"}}"#, TEST_KEY)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let cookie = resp
        .headers()
        .get("set-cookie")
        .expect("login must set the session cookie")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Logged in successfully.");
    let token = body["token"].as_str().unwrap().to_string();
    assert!(token.starts_with("sess_"));

    (cookie, token)
}

// =========================================================================
// Status
// =========================================================================

#[tokio::test]
async fn status_before_login_reports_unauthenticated() {
    let app = test_app(test_state());

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["authenticated"], false);
    assert_eq!(body["required"], true);
}

#[tokio::test]
async fn status_after_login_reports_authenticated() {
    let app = test_app(test_state());
    let (cookie, _) = login(&app).await;

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/status")
                .header("cookie", cookie.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["authenticated"], true);
}

// =========================================================================
// Login
// =========================================================================

#[tokio::test]
async fn login_with_wrong_key_is_rejected_without_cookie() {
    let app = test_app(test_state());

    let resp = app
        .oneshot(login_request(r#"{"apiKey":"not-the-key"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().get("set-cookie").is_none());
    let body = body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Invalid API key.");
}

#[tokio::test]
async fn login_without_api_key_is_bad_request() {
    let app = test_app(test_state());

    for body in ["", "{}", r#"{"apiKey":null}"#, "not json"] {
        let resp = app.clone().oneshot(login_request(body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {:?}", body);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "API key is required.");
    }
}

#[tokio::test]
async fn login_when_no_key_configured_fails_closed() {
    let state = Arc::new(Gatehouse::new(Config {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        api_key: None,
        secure_cookies: false,
    }));
    let app = test_app(state);

    let resp = app
        .oneshot(login_request(r#"{"apiKey":"anything"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// =========================================================================
// Gating middleware
// =========================================================================

#[tokio::test]
async fn gated_route_without_credentials_is_401() {
    let app = test_app(test_state());

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/ping")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "Authentication required.");
}

#[tokio::test]
async fn gated_route_with_wrong_key_is_403() {
    let app = test_app(test_state());

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/ping")
                .header("x-api-key", "wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "Invalid API key.");
}

#[tokio::test]
async fn api_key_header_opens_the_gate() {
    let app = test_app(test_state());

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/ping")
                .header("x-api-key", TEST_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["message"], "pong");
}

#[tokio::test]
async fn session_token_header_opens_the_gate() {
    let app = test_app(test_state());
    let (_, token) = login(&app).await;

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/ping")
                .header("x-session-token", token.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn unmatched_paths_are_gated_too() {
    let app = test_app(test_state());

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/definitely/not/a/route")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // With a valid credential the same path is a plain 404
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/definitely/not/a/route")
                .header("x-api-key", TEST_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// =========================================================================
// Full lifecycle: login → gated route → logout → stale cookie
// =========================================================================

#[tokio::test]
async fn full_session_lifecycle() {
    let app = test_app(test_state());

    // 1. Login — cookie set, token in body
    let (cookie, _) = login(&app).await;

    // 2. Cookie opens the gate
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/ping")
                .header("cookie", cookie.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // 3. Logout — cookie cleared
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .header("cookie", cookie.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let set_cookie = resp
        .headers()
        .get("set-cookie")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.contains("Max-Age=0"));
    let body = body_json(resp).await;
    assert_eq!(body["message"], "Logged out successfully.");

    // 4. The stale cookie is now a presented-but-invalid credential
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/ping")
                .header("cookie", cookie.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // 5. Logging out again is still 200
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .header("cookie", cookie.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// =========================================================================
// Connection tokens
// =========================================================================

#[tokio::test]
async fn token_endpoint_requires_authentication() {
    let app = test_app(test_state());

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "Authentication required.");
}

#[tokio::test]
async fn session_gets_a_redeemable_connection_token() {
    let state = test_state();
    let app = test_app(state.clone());
    let (cookie, _) = login(&app).await;

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/token")
                .header("cookie", cookie.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["expiresIn"], 300);

    let token = body["token"].as_str().unwrap();
    assert!(token.starts_with("conn_"));

    // Redeemed by the handshake collaborator via the store, not over HTTP
    assert!(state.sessions.redeem_connection_token(token));
}

#[tokio::test]
async fn api_key_caller_gets_a_connection_token_too() {
    let state = test_state();
    let app = test_app(state.clone());

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/token")
                .header("x-api-key", TEST_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert!(state
        .sessions
        .redeem_connection_token(body["token"].as_str().unwrap()));
}

#[tokio::test]
async fn connection_token_is_not_accepted_by_the_gate() {
    let state = test_state();
    let app = test_app(state.clone());
    let (cookie, _) = login(&app).await;

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/token")
                .header("cookie", cookie.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(resp).await;
    let conn_token = body["token"].as_str().unwrap().to_string();

    // A connection token presented over a session channel is just an
    // unknown session token.
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/ping")
                .header("x-session-token", conn_token.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

// =========================================================================
// Login rate limiting
// =========================================================================

#[tokio::test]
async fn repeated_login_failures_are_throttled() {
    let app = test_app(test_state());

    // Without ConnectInfo every request lands in the shared bucket, so the
    // window holds exactly LOGIN_MAX_ATTEMPTS requests.
    for _ in 0..10 {
        let resp = app
            .clone()
            .oneshot(login_request(r#"{"apiKey":"wrong"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    let resp = app
        .oneshot(login_request(r#"{"apiKey":"wrong"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "Too many login attempts.");
}
