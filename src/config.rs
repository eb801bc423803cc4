//! Process configuration: the shared secret, bind address, and cookie policy.
//!
//! The API key is resolved once at startup and is immutable for the process
//! lifetime. Resolution order:
//!
//! 1. `GATEHOUSE_API_KEY` env var
//! 2. `api_key` file in the data directory
//!
//! A missing key is a valid (degraded) configuration: the validator fails
//! closed and every authentication attempt is rejected. Startup logs a
//! warning but never refuses to boot over it.

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::error::{GatehouseError, GatehouseResult};

/// Name of the session cookie set by `POST /api/auth/login`.
pub const SESSION_COOKIE: &str = "gatehouse_session";

/// Fixed maximum session lifetime.
pub const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Fixed connection-token lifetime. Not renewable.
pub const CONNECTION_TOKEN_TTL: Duration = Duration::from_secs(5 * 60);

pub const API_KEY_ENV: &str = "GATEHOUSE_API_KEY";
pub const ADDR_ENV: &str = "GATEHOUSE_ADDR";
pub const SECURE_COOKIES_ENV: &str = "GATEHOUSE_SECURE_COOKIES";

const API_KEY_FILE: &str = "api_key";
const DEFAULT_ADDR: &str = "127.0.0.1:9610";

#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address. Defaults to loopback; exposing the gate beyond
    /// localhost is an explicit operator decision.
    pub bind_addr: SocketAddr,
    /// The configured secret. `None` means fail-closed mode.
    pub api_key: Option<String>,
    /// Append the `Secure` attribute to session cookies (deployment mode).
    pub secure_cookies: bool,
}

impl Config {
    /// Resolve configuration from the environment and `data_dir`.
    pub fn load(data_dir: &Path) -> GatehouseResult<Self> {
        let api_key = resolve_api_key(std::env::var(API_KEY_ENV).ok(), data_dir)?;
        if api_key.is_none() {
            log::warn!(
                "No API key configured ({} or {}/{}) — all authentication attempts will be rejected",
                API_KEY_ENV,
                data_dir.display(),
                API_KEY_FILE,
            );
        }

        let addr = std::env::var(ADDR_ENV).unwrap_or_else(|_| DEFAULT_ADDR.to_string());
        let bind_addr = addr
            .parse()
            .map_err(|_| GatehouseError::Config(format!("invalid listen address '{addr}'")))?;

        let secure_cookies = std::env::var(SECURE_COOKIES_ENV)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Config {
            bind_addr,
            api_key,
            secure_cookies,
        })
    }
}

/// Env var wins; otherwise fall back to the `api_key` file. Whitespace is
/// trimmed, an empty value counts as unconfigured.
fn resolve_api_key(env_value: Option<String>, data_dir: &Path) -> GatehouseResult<Option<String>> {
    if let Some(v) = env_value {
        let v = v.trim();
        if !v.is_empty() {
            return Ok(Some(v.to_string()));
        }
    }

    match std::fs::read_to_string(data_dir.join(API_KEY_FILE)) {
        Ok(s) => {
            let s = s.trim();
            Ok((!s.is_empty()).then(|| s.to_string()))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
