use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use std::sync::Arc;

use crate::config::Config;
use crate::errors::AppError;
use crate::handlers::AppState;

/// Header the identity proxy uses to prove it set the user header.
pub const PROXY_TOKEN_HEADER: &str = "x-auth-proxy-token";

/// Usernames follow the identity provider's limit.
const MAX_USERNAME_LEN: usize = 150;

/// The authenticated user on whose behalf a screen runs.
///
/// Session handling lives in the upstream identity proxy; this service only
/// reads the username it forwards and uses it to stamp `created_by`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActingUser {
    pub username: String,
}

impl ActingUser {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    /// Resolves the acting user from request headers.
    pub fn from_headers(headers: &HeaderMap, config: &Config) -> Result<Self, AppError> {
        if let Some(ref expected) = config.auth_proxy_secret {
            let token = headers
                .get(PROXY_TOKEN_HEADER)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| AppError::Unauthorized("Missing proxy token".to_string()))?;

            if !constant_time_compare(token, expected) {
                return Err(AppError::Unauthorized("Invalid proxy token".to_string()));
            }
        }

        let username = headers
            .get(config.auth_user_header.as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                AppError::Unauthorized(format!("Missing {} header", config.auth_user_header))
            })?;

        if username.chars().count() > MAX_USERNAME_LEN {
            return Err(AppError::Unauthorized("Username too long".to_string()));
        }

        Ok(Self::new(username))
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for ActingUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = Self::from_headers(&parts.headers, &state.config)?;
        tracing::debug!("Acting user: {}", user.username);
        Ok(user)
    }
}

/// Constant-time string comparison
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes().iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn config(secret: Option<&str>) -> Config {
        Config {
            database_url: "postgres://localhost/foi".to_string(),
            port: 3000,
            db_max_connections: 1,
            auth_user_header: "x-remote-user".to_string(),
            auth_proxy_secret: secret.map(str::to_string),
            rate_limit_per_second: 10,
            rate_limit_burst: 20,
        }
    }

    #[test]
    fn test_reads_username_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-remote-user", HeaderValue::from_static(" jsmith "));

        let user = ActingUser::from_headers(&headers, &config(None)).unwrap();
        assert_eq!(user, ActingUser::new("jsmith"));
    }

    #[test]
    fn test_missing_username_rejected() {
        let err = ActingUser::from_headers(&HeaderMap::new(), &config(None)).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let mut headers = HeaderMap::new();
        headers.insert("x-remote-user", HeaderValue::from_static("   "));
        assert!(ActingUser::from_headers(&headers, &config(None)).is_err());
    }

    #[test]
    fn test_proxy_token_enforced_when_configured() {
        let mut headers = HeaderMap::new();
        headers.insert("x-remote-user", HeaderValue::from_static("jsmith"));
        assert!(ActingUser::from_headers(&headers, &config(Some("s3cret"))).is_err());

        headers.insert(PROXY_TOKEN_HEADER, HeaderValue::from_static("wrong!"));
        assert!(ActingUser::from_headers(&headers, &config(Some("s3cret"))).is_err());

        headers.insert(PROXY_TOKEN_HEADER, HeaderValue::from_static("s3cret"));
        assert!(ActingUser::from_headers(&headers, &config(Some("s3cret"))).is_ok());
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }
}
