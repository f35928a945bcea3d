//! HTTP error mapping

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use df_core::Error;
use df_protocol::ErrorResponse;
use thiserror::Error as ThisError;
use tracing::{debug, error};

/// Error returned by every handler
#[derive(Debug, ThisError)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] Error),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Core(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            ApiError::Core(Error::AlreadyExists(_)) => StatusCode::CONFLICT,
            ApiError::Core(Error::ValidationError(_) | Error::Decode(_)) => StatusCode::BAD_REQUEST,
            ApiError::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::InvalidBody(_) => "INVALID_BODY",
            ApiError::Core(e) => match e {
                Error::EntityNotFound(_) => "ENTITY_NOT_FOUND",
                Error::AttributeNotFound(_) => "ATTRIBUTE_NOT_FOUND",
                Error::RelationshipNotFound(_) => "RELATIONSHIP_NOT_FOUND",
                Error::AlreadyExists(_) => "ALREADY_EXISTS",
                Error::ValidationError(_) => "VALIDATION_ERROR",
                Error::Decode(_) => "DECODE_ERROR",
                Error::Storage(_) | Error::DataCorruption(_) | Error::Io(_) => "STORAGE_ERROR",
                _ => "INTERNAL_ERROR",
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            debug!("Request rejected ({}): {}", status, self);
        }

        let body = ErrorResponse::new(self.error_code(), self.to_string());
        (status, Json(body)).into_response()
    }
}
