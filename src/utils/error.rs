//! Request error taxonomy and its JSON rendering.

use std::sync::OnceLock;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::data::database::is_unique_violation;
use crate::utils::enums::ParseEnumError;

pub type ApiResult<T> = Result<T, ApiError>;

static HIDE_INTERNAL_DETAILS: OnceLock<bool> = OnceLock::new();

/// Decides once, at startup, whether internal error details stay out of
/// responses. Later calls are ignored.
pub fn hide_internal_details(hide: bool) {
    let _ = HIDE_INTERNAL_DETAILS.set(hide);
}

fn internal_details_hidden() -> bool {
    HIDE_INTERNAL_DETAILS.get().copied().unwrap_or(false)
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn server(msg: impl Into<String>) -> Self {
        Self::Server(msg.into())
    }

    /// Maps a unique-constraint failure to `Conflict(msg)`, anything else to a database error.
    pub fn conflict_on_unique(err: rusqlite::Error, msg: impl Into<String>) -> Self {
        if is_unique_violation(&err) {
            Self::Conflict(msg.into())
        } else {
            Self::Database(err)
        }
    }

    fn is_internal(&self) -> bool {
        matches!(self, ApiError::Server(_) | ApiError::Database(_))
    }

    fn render(&self, hide_details: bool) -> HttpResponse {
        let body = if self.is_internal() {
            error!("Request failed: {}", self);
            ErrorBody {
                success: false,
                message: "Server error".to_string(),
                error: (!hide_details).then(|| self.to_string()),
            }
        } else {
            ErrorBody {
                success: false,
                message: self.to_string(),
                error: None,
            }
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<ParseEnumError> for ApiError {
    fn from(err: ParseEnumError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Server(_) | ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        self.render(internal_details_hidden())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn renders_message_and_status() {
        let resp = ApiError::forbidden("Not your job").error_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let bytes = to_bytes(resp.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Not your job");
        assert!(body.get("error").is_none());
    }

    #[actix_web::test]
    async fn internal_errors_use_generic_message() {
        let resp = ApiError::server("disk on fire").error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = to_bytes(resp.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Server error");
    }

    #[actix_web::test]
    async fn internal_details_follow_the_flag() {
        let err = ApiError::server("disk on fire");

        let bytes = to_bytes(err.render(false).into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Server error: disk on fire");

        let bytes = to_bytes(err.render(true).into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Server error");
        assert!(body.get("error").is_none());
    }

    #[test]
    fn enum_parse_failures_are_validation_errors() {
        let err: ApiError = "Gig".parse::<crate::utils::enums::JobType>().unwrap_err().into();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
