use actix_web::error::JsonPayloadError;
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use log::error;
use serde_json::json;
use thiserror::Error;

/// A chat request the handler refuses to process.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("messages must be a non-empty array")]
    MissingMessages,
    #[error("messages must include a user message with non-empty content")]
    NoUserMessage,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("malformed request body: {0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => {
                HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
            }
            Self::Internal(message) => {
                error!("Unhandled error: {}", message);
                HttpResponse::build(self.status_code()).json(json!({
                    "error": "Internal server error",
                    "message": message
                }))
            }
        }
    }
}

/// Routes JSON extractor failures to the same 400 body as validation errors.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::BadRequest(err.to_string()).into()
}
