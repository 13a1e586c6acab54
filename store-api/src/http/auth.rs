use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use tracing::{debug, warn};

use crate::models::UserModel;

use super::error::ApiError;
use super::state::AppState;

/// Validate the access token on a protected request and load its user.
pub fn ensure_authorized(state: &AppState, headers: &HeaderMap) -> Result<UserModel, ApiError> {
    let result = authorize(state, headers);
    match &result {
        Ok(user) => debug!(username = %user.username, "authorized request using token"),
        Err(ApiError::Database(_)) => {}
        Err(err) => warn!(reason = %err, "unauthorized request"),
    }
    result
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<UserModel, ApiError> {
    let token = extract_token(headers)?;
    let claims = state.tokens.verify(token)?;
    UserModel::find_by_id(&state.db, claims.identity)?.ok_or(ApiError::UnknownIdentity)
}

/// Accepts `JWT <token>` and `Bearer <token>`; the scheme is case-insensitive.
pub fn extract_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let raw = headers
        .get(AUTHORIZATION)
        .ok_or(ApiError::MissingToken)?
        .to_str()
        .map_err(|_| ApiError::UnsupportedAuthScheme)?;
    let mut parts = raw.split_whitespace();
    let scheme = parts.next().ok_or(ApiError::MissingToken)?;
    if !scheme.eq_ignore_ascii_case("jwt") && !scheme.eq_ignore_ascii_case("bearer") {
        return Err(ApiError::UnsupportedAuthScheme);
    }
    let token = parts.next().ok_or(ApiError::UnsupportedAuthScheme)?;
    if parts.next().is_some() {
        return Err(ApiError::UnsupportedAuthScheme);
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use axum::http::header::AUTHORIZATION;
    use axum::http::{HeaderMap, HeaderValue};

    use super::extract_token;
    use crate::http::error::ApiError;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn accepts_jwt_and_bearer_schemes() {
        assert_eq!(extract_token(&headers("JWT abc")).ok(), Some("abc"));
        assert_eq!(extract_token(&headers("bearer abc")).ok(), Some("abc"));
    }

    #[test]
    fn missing_header_is_missing_token() {
        assert!(matches!(
            extract_token(&HeaderMap::new()),
            Err(ApiError::MissingToken)
        ));
    }

    #[test]
    fn rejects_other_schemes_and_extra_parts() {
        assert!(matches!(
            extract_token(&headers("Basic YWRtaW46c2VjcmV0")),
            Err(ApiError::UnsupportedAuthScheme)
        ));
        assert!(matches!(
            extract_token(&headers("JWT")),
            Err(ApiError::UnsupportedAuthScheme)
        ));
        assert!(matches!(
            extract_token(&headers("JWT a b")),
            Err(ApiError::UnsupportedAuthScheme)
        ));
    }
}
