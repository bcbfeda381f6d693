//! The JSON envelope shared by every endpoint: `{success, message?, data?}` on success and
//! `{success: false, message, errors?}` on failure.

use std::borrow::Cow;
use std::error::Error;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use error_stack::Report;
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

pub type Message = Cow<'static, str>;

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    #[serde(skip)]
    status_code: StatusCode,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    message: Option<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self::new(StatusCode::OK, None, Some(data))
    }

    pub fn ok_with_message(message: impl Into<Message>, data: T) -> Self {
        Self::new(StatusCode::OK, Some(message.into()), Some(data))
    }

    pub fn created(message: impl Into<Message>, data: T) -> Self {
        Self::new(StatusCode::CREATED, Some(message.into()), Some(data))
    }

    fn new(status_code: StatusCode, message: Option<Message>, data: Option<T>) -> Self {
        Self {
            status_code,
            success: true,
            message,
            data,
        }
    }
}

impl ApiResponse<()> {
    /// A successful response that only carries a message.
    pub fn done(message: impl Into<Message>) -> Self {
        Self::new(StatusCode::OK, Some(message.into()), None)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status_code, Json(self)).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    #[serde(skip)]
    status_code: StatusCode,
    success: bool,
    #[schema(value_type = String)]
    message: Message,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<FieldError>,
}

pub const VALIDATION_FAILED: &str = "Validation failed";

impl ApiError {
    pub fn new(status_code: StatusCode, message: impl Into<Message>) -> Self {
        Self {
            status_code,
            success: false,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn bad_request(message: impl Into<Message>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<Message>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<Message>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<Message>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn validation(errors: Vec<FieldError>) -> Self {
        Self {
            errors,
            ..Self::bad_request(VALIDATION_FAILED)
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code, Json(self)).into_response()
    }
}

/// Returned by handlers when a service fails. The full report is logged, the client only
/// sees the message of the failed operation.
#[derive(thiserror::Error)]
#[error("there was an error running the endpoint")]
pub struct EndpointError<E>(Report<E>)
where
    E: Error + Send + Sync + 'static;

impl<E> std::fmt::Debug for EndpointError<E>
where
    E: Error + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl<E> From<Report<E>> for EndpointError<E>
where
    E: Error + Send + Sync + 'static,
{
    fn from(value: Report<E>) -> Self {
        Self(value)
    }
}

impl<E> IntoResponse for EndpointError<E>
where
    E: Error + Send + Sync + 'static,
{
    fn into_response(self) -> Response {
        error!("{:?}", self.0);
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            self.0.current_context().to_string(),
        )
        .into_response()
    }
}
