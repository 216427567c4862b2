//! Custom Extractors
//!
//! Axum extractors for the opaque Authorization token, validated JSON
//! bodies, and validated query strings, plus the success envelope.

use axum::{
    async_trait,
    extract::{rejection::QueryRejection, FromRequest, FromRequestParts, Query, Request},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use validator::Validate;

use crate::shared::error::ErrorBody;

/// The raw Authorization header value, with an optional `Bearer ` prefix
/// stripped.
///
/// Extraction never fails: a missing header yields an empty token, which no
/// backend resolves, so each operation surfaces its own invalid-token tag.
#[derive(Debug, Clone)]
pub struct AuthToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for AuthToken
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let token = raw.strip_prefix("Bearer ").unwrap_or(raw);
        Ok(AuthToken(token.to_string()))
    }
}

/// Rejection carrying the standard validation-failure envelope.
#[derive(Debug)]
pub struct ValidationFailure {
    errors: Vec<String>,
}

impl ValidationFailure {
    fn new(errors: Vec<String>) -> Self {
        Self { errors }
    }
}

impl IntoResponse for ValidationFailure {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: "Invalid parameters".to_string(),
            validation_errors: Some(self.errors),
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// JSON body that must deserialize and pass `validator` checks.
#[derive(Debug)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ValidationFailure;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ValidationFailure::new(vec![rejection.body_text()]))?;

        value
            .validate()
            .map_err(|errors| ValidationFailure::new(flatten_errors(&errors)))?;

        Ok(ValidJson(value))
    }
}

/// Query string that must deserialize and pass `validator` checks.
#[derive(Debug)]
pub struct ValidQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ValidationFailure;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection: QueryRejection| {
                ValidationFailure::new(vec![rejection.body_text()])
            })?;

        value
            .validate()
            .map_err(|errors| ValidationFailure::new(flatten_errors(&errors)))?;

        Ok(ValidQuery(value))
    }
}

fn flatten_errors(errors: &validator::ValidationErrors) -> Vec<String> {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, list)| {
            list.iter().map(move |error| {
                match &error.message {
                    Some(message) => format!("{field}: {message}"),
                    None => format!("{field}: {}", error.code),
                }
            })
        })
        .collect()
}

/// Success envelope: `{"success": true, "data": <payload>}`.
#[derive(Debug, Serialize)]
pub struct ApiSuccess<T> {
    pub success: bool,
    pub data: T,
}

/// Wrap a payload in the success envelope.
pub fn ok<T: Serialize>(data: T) -> Json<ApiSuccess<T>> {
    Json(ApiSuccess {
        success: true,
        data,
    })
}

/// Success with a null payload, for mutations with nothing to report.
pub fn ok_empty() -> Json<ApiSuccess<Option<()>>> {
    ok(None)
}
