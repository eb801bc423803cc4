pub mod middleware;
pub mod rate_limit;
pub mod routes;

use std::net::SocketAddr;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware as axum_middleware;
use axum::response::Response;
use axum::{routing, Extension, Json, Router};
use tower_http::cors::{Any, CorsLayer};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::AppState;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(
                    crate::auth::gate::API_KEY_HEADER,
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Gatehouse API",
        description = "Authentication gate in front of a local automation host. \
                       Log in with the configured API key to obtain a session; \
                       exchange a session for a short-lived connection token \
                       where cookies and headers cannot be carried.",
        version = "0.1.0",
        license(name = "MIT")
    ),
    paths(routes::status, routes::login, routes::logout, routes::token),
    components(schemas(
        routes::LoginRequest,
        routes::LoginResponse,
        routes::StatusResponse,
        routes::TokenGrantResponse,
        routes::MessageResponse,
        routes::ErrorResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Session lifecycle and connection tokens")
    )
)]
pub struct ApiDoc;

async fn openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn not_found() -> Response {
    routes::error_response(StatusCode::NOT_FOUND, "Not found.")
}

/// Assemble the full application router.
///
/// `/api/auth/*` is mounted outside the gate; `api_routes` — the downstream
/// automation surface — and every unmatched path go through `require_auth`,
/// so an unauthenticated request can never reach (or probe for) anything
/// else.
pub fn router(state: AppState, api_routes: Router<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let limiter = rate_limit::RateLimiter::new(
        rate_limit::LOGIN_MAX_ATTEMPTS,
        rate_limit::LOGIN_WINDOW,
    );

    let auth_routes = Router::new()
        .route("/status", routing::get(routes::status))
        .route(
            "/login",
            routing::post(routes::login)
                .layer(axum_middleware::from_fn(rate_limit::login_rate_limit)),
        )
        .route("/logout", routing::post(routes::logout))
        .route("/token", routing::get(routes::token))
        .layer(Extension(limiter))
        // Auth bodies are tiny; anything bigger is not a login request.
        .layer(DefaultBodyLimit::max(64 * 1024));

    let gated = api_routes
        .route("/api/openapi.json", routing::get(openapi_spec))
        .fallback(not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .merge(gated)
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn start(state: AppState, api_routes: Router<AppState>) -> std::io::Result<()> {
    let addr = state.config.bind_addr;
    let app = router(state, api_routes);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Gatehouse listening on {}", addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}
