use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::handlers::explain::ExplainError;
use crate::services::AppState;

/// Reads the bearer token from an `Authorization` header value.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Compares credentials without short-circuiting on the first differing byte.
pub fn credential_matches(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Requires `Authorization: Bearer <api_key>` on proxied routes.
pub async fn bearer_auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, ExplainError> {
    match bearer_token(&headers) {
        Some(token) if credential_matches(token, &state.settings.api_key) => {
            Ok(next.run(request).await)
        }
        Some(_) => {
            tracing::warn!("Rejected request with invalid bearer credential");
            Err(ExplainError::Unauthorized(
                "Invalid bearer credential".to_string(),
            ))
        }
        None => Err(ExplainError::Unauthorized(
            "Missing authorization token".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn parses_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn credentials_compare_whole_value() {
        assert!(credential_matches("anon-key", "anon-key"));
        assert!(!credential_matches("anon-kez", "anon-key"));
        assert!(!credential_matches("anon-key!", "anon-key"));
        assert!(!credential_matches("", "anon-key"));
    }
}
