//! # Admin Guard
//!
//! Requires `x-admin-token` on every admin route when a token is
//! configured. This is a deployment guard for a single shared secret, not a
//! user authentication system.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

pub async fn require_admin_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    if let Some(expected) = state.admin_token() {
        let provided = request
            .headers()
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok());

        if !provided.is_some_and(|p| constant_time_eq(p.as_bytes(), expected.as_bytes())) {
            warn!(path = %request.uri().path(), "Rejected admin request");
            return Err(ApiError::unauthorized());
        }
    }

    Ok(next.run(request).await)
}

/// Compares without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"s3cret", b"s3cret"));
        assert!(!constant_time_eq(b"s3cret", b"s3creT"));
        assert!(!constant_time_eq(b"s3cret", b"s3cret!"));
        assert!(!constant_time_eq(b"", b"x"));
    }
}
