use std::collections::BTreeMap;

use axum::http::header::WWW_AUTHENTICATE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::TokenError;
use crate::db::DbError;

/// Field name -> message for each missing or blank field of a request body.
pub type FieldErrors = BTreeMap<&'static str, &'static str>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request does not contain an access token")]
    MissingToken,
    #[error("Unsupported authorization type")]
    UnsupportedAuthScheme,
    #[error("{0}")]
    Token(#[from] TokenError),
    #[error("User does not exist")]
    UnknownIdentity,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid credentials")]
    MalformedCredentials,
    #[error("request body is missing required fields")]
    Validation(FieldErrors),
    #[error("{0}")]
    InvalidBody(String),
    #[error("An item with name '{0}' already exists.")]
    ItemExists(String),
    #[error("A store with name '{0}' already exists.")]
    StoreExists(String),
    #[error("A user with that username already exists")]
    UserExists,
    #[error("A store with id {0} does not exist.")]
    UnknownStore(i64),
    #[error("Item not found")]
    ItemNotFound,
    #[error("Store not found")]
    StoreNotFound,
    #[error("An error occurred while accessing the database.")]
    Database(#[from] DbError),
    #[error("An error occurred while issuing the access token.")]
    TokenIssue,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingToken
            | ApiError::UnsupportedAuthScheme
            | ApiError::Token(_)
            | ApiError::UnknownIdentity
            | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::MalformedCredentials
            | ApiError::Validation(_)
            | ApiError::InvalidBody(_)
            | ApiError::ItemExists(_)
            | ApiError::StoreExists(_)
            | ApiError::UserExists
            | ApiError::UnknownStore(_) => StatusCode::BAD_REQUEST,
            ApiError::ItemNotFound | ApiError::StoreNotFound => StatusCode::NOT_FOUND,
            ApiError::Database(_) | ApiError::TokenIssue => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Rejections of a protected request, which carry a `WWW-Authenticate`
    /// challenge. A failed `/auth` login is not one of them.
    pub fn is_token_rejection(&self) -> bool {
        matches!(
            self,
            ApiError::MissingToken
                | ApiError::UnsupportedAuthScheme
                | ApiError::Token(_)
                | ApiError::UnknownIdentity
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Database(err) = &self {
            error!(error = %err, "database operation failed");
        }

        let body = match &self {
            ApiError::Validation(fields) => Json(json!({ "message": fields })),
            other => Json(json!({ "message": other.to_string() })),
        };
        let mut response = (self.status(), body).into_response();
        if self.is_token_rejection() {
            response.headers_mut().insert(
                WWW_AUTHENTICATE,
                HeaderValue::from_static("JWT realm=\"Login Required\""),
            );
        }
        response
    }
}
