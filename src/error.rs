use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing webhook signature")]
    MissingSignature,

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Rate limited: {message}")]
    RateLimited {
        title: &'static str,
        message: String,
        retry_after: i64,
    },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<i64>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::MissingSignature => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    error: "Unauthorized: Missing signature".to_string(),
                    message: None,
                    retry_after: None,
                },
            ),
            AppError::InvalidSignature => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    error: "Unauthorized: Invalid signature".to_string(),
                    message: None,
                    retry_after: None,
                },
            ),
            AppError::RateLimited {
                title,
                message,
                retry_after,
            } => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorBody {
                    error: title.to_string(),
                    message: Some(message),
                    retry_after: Some(retry_after),
                },
            ),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "Bad request".to_string(),
                    message: Some(msg),
                    retry_after: None,
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error: "Not found".to_string(),
                    message: Some(msg),
                    retry_after: None,
                },
            ),
            AppError::ExternalApi(ref msg) | AppError::Internal(ref msg) => {
                // The detail is logged; the wire only carries a generic body.
                tracing::error!("Unhandled error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "Internal server error".to_string(),
                        message: Some("Something went wrong".to_string()),
                        retry_after: None,
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::ExternalApi(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
