use actix_web::{http::StatusCode, HttpRequest, HttpResponse, ResponseError};
use serde::Serialize;

use crate::repo::RepoError;

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ApiErrorBody {
    pub success: bool,
    pub error: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")] Validation(String),
    #[error("{0}")] Unauthorized(String),
    #[error("{0}")] NotFound(String),
    #[error("{0}")] Conflict(String),
    #[error("{0}")] PayloadTooLarge(String),
    #[error("internal server error")] Internal,
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self { ApiError::Validation(msg.into()) }
    pub fn not_found(msg: impl Into<String>) -> Self { ApiError::NotFound(msg.into()) }
    pub fn conflict(msg: impl Into<String>) -> Self { ApiError::Conflict(msg.into()) }

    /// Login failures share one response whatever the cause.
    pub fn invalid_credentials() -> Self { ApiError::Unauthorized("invalid credentials".into()) }
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => ApiError::not_found("not found"),
            RepoError::Conflict => ApiError::conflict("conflict"),
            RepoError::Invalid(msg) => ApiError::Validation(msg),
            RepoError::Internal(detail) => {
                tracing::error!(%detail, "repository failure");
                ApiError::Internal
            }
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ApiErrorBody { success: false, error: self.to_string() })
    }
}

/// Turn JSON extractor failures into the same 400 body as other validation errors.
pub fn json_error_handler(err: actix_web::error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::Validation(format!("invalid JSON body: {err}")).into()
}
