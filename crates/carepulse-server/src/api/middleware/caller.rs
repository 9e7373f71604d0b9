//! Caller identity middleware.
//!
//! Every write is attributed to an explicit caller. The identity comes from the
//! `X-Caller-Id` header and is injected as [`CallerContext`] for handlers.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::CallerContext;

pub const CALLER_HEADER: &str = "X-Caller-Id";

const MAX_CALLER_LEN: usize = 128;

/// Reject requests without a usable caller identity.
pub async fn require_caller(mut req: Request<axum::body::Body>, next: Next) -> Response {
    let caller_id = match caller_from_headers(req.headers()) {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };

    tracing::debug!(caller = %caller_id, method = %req.method(), path = %req.uri().path(), "Caller identified");
    req.extensions_mut().insert(CallerContext { caller_id });
    next.run(req).await
}

fn caller_from_headers(headers: &axum::http::HeaderMap) -> Result<String, ApiError> {
    let raw = headers
        .get(CALLER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::Unauthorized)?;

    if raw.len() > MAX_CALLER_LEN || raw.chars().any(char::is_control) {
        return Err(ApiError::BadRequest("X-Caller-Id is malformed".into()));
    }

    Ok(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue};

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CALLER_HEADER, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn caller_is_trimmed() {
        assert_eq!(caller_from_headers(&headers("  nurse-1 ")).unwrap(), "nurse-1");
    }

    #[test]
    fn missing_or_blank_caller_is_unauthorized() {
        assert!(matches!(caller_from_headers(&HeaderMap::new()), Err(ApiError::Unauthorized)));
        assert!(matches!(caller_from_headers(&headers("   ")), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn overlong_caller_is_rejected() {
        let long = "x".repeat(MAX_CALLER_LEN + 1);
        assert!(matches!(caller_from_headers(&headers(&long)), Err(ApiError::BadRequest(_))));
    }
}
