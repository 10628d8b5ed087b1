//! Bearer-token authentication
//!
//! A single shared API key gates every route except CORS preflights. The
//! header must be exactly `Bearer <token>`; the token is compared in
//! constant time.

use axum::http::{HeaderMap, header::AUTHORIZATION};
use subtle::ConstantTimeEq;

use crate::config::ServerConfig;

/// Why a request failed authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No `Authorization` header
    MissingHeader,
    /// Header present but not `Bearer <token>`
    MalformedHeader,
    /// Token does not match the configured key
    InvalidToken,
}

impl AuthRejection {
    /// Message returned to the client
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::MissingHeader => {
                "Missing Authorization header. Use: Authorization: Bearer <token>"
            }
            Self::MalformedHeader => "Invalid Authorization header format. Use: Bearer <token>",
            Self::InvalidToken => "Invalid API key",
        }
    }
}

/// Check the request headers against the config.
///
/// Always passes when auth is disabled.
pub fn authorize(config: &ServerConfig, headers: &HeaderMap) -> Result<(), AuthRejection> {
    if !config.enable_auth {
        return Ok(());
    }

    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthRejection::MissingHeader)?
        .to_str()
        .map_err(|_| AuthRejection::MalformedHeader)?;

    let token = parse_bearer(header)?;

    if token_matches(token, &config.api_key) {
        Ok(())
    } else {
        Err(AuthRejection::InvalidToken)
    }
}

/// Extract the token from `Bearer <token>`.
fn parse_bearer(header: &str) -> Result<&str, AuthRejection> {
    let parts: Vec<&str> = header.split(' ').collect();
    match parts.as_slice() {
        ["Bearer", token] => Ok(token),
        _ => Err(AuthRejection::MalformedHeader),
    }
}

fn token_matches(token: &str, api_key: &str) -> bool {
    // An empty configured key never authenticates anything
    if api_key.is_empty() || token.is_empty() {
        return false;
    }
    token.as_bytes().ct_eq(api_key.as_bytes()).into()
}
