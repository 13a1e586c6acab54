//! Request bodies and the extractor that reads them as JSON or as a form.

use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use axum::{Form, Json};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::error::{ApiError, FieldErrors};

const BLANK_FIELD: &str = "This field cannot be left blank!";
const MISSING_STORE_ID: &str = "Every item needs a store id.";
const NON_FINITE_PRICE: &str = "Price must be a finite number.";

/// Deserializes `application/json` bodies as JSON and anything else as an
/// urlencoded form.
#[derive(Debug, Clone)]
pub struct JsonOrForm<T>(pub T);

impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.trim_start().starts_with("application/json"));

        if is_json {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|rejection| ApiError::InvalidBody(rejection.body_text()))?;
            Ok(Self(value))
        } else {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|rejection| ApiError::InvalidBody(rejection.body_text()))?;
            Ok(Self(value))
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemPayload {
    pub price: Option<f64>,
    pub store_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemFields {
    pub price: f64,
    pub store_id: i64,
}

impl ItemPayload {
    pub fn validate(self) -> Result<ItemFields, ApiError> {
        let mut invalid = FieldErrors::new();
        match self.price {
            None => {
                invalid.insert("price", BLANK_FIELD);
            }
            Some(price) if !price.is_finite() => {
                invalid.insert("price", NON_FINITE_PRICE);
            }
            Some(_) => {}
        }
        if self.store_id.is_none() {
            invalid.insert("store_id", MISSING_STORE_ID);
        }
        match (self.price, self.store_id) {
            (Some(price), Some(store_id)) if invalid.is_empty() => {
                Ok(ItemFields { price, store_id })
            }
            _ => Err(ApiError::Validation(invalid)),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UserPayload {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl UserPayload {
    /// Both fields must be present and non-blank.
    pub fn validate(self) -> Result<(String, String), ApiError> {
        let username = self.username.filter(|value| !value.trim().is_empty());
        let password = self.password.filter(|value| !value.is_empty());
        let mut missing = FieldErrors::new();
        if username.is_none() {
            missing.insert("username", BLANK_FIELD);
        }
        if password.is_none() {
            missing.insert("password", BLANK_FIELD);
        }
        match (username, password) {
            (Some(username), Some(password)) => Ok((username, password)),
            _ => Err(ApiError::Validation(missing)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}
