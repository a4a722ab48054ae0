use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;

/// Application-level error type
#[derive(Debug)]
pub enum AppError {
    /// Malformed input that never reached the network (bad URL, bad body)
    Validation(String),
    /// Resource does not exist, or the caller is not allowed to know it does
    NotFound(String),
    /// The upstream host refused access to the repository
    AccessDenied(String),
    /// The upstream host reported rate limiting
    RateLimited(String),
    /// The repository exists but cannot be analyzed (empty, no default branch)
    Unprocessable(String),
    /// Transient upstream failure that survived retry (timeout, 5xx, network)
    Upstream(String),
    /// Database error
    Database(sqlx::Error),
    /// Internal server error
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
    meta: ErrorMeta,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

#[derive(Serialize)]
struct ErrorMeta {
    request_id: String,
}

impl AppError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::AccessDenied(_) => "ACCESS_DENIED",
            Self::RateLimited(_) => "RATE_LIMITED",
            Self::Unprocessable(_) => "UNPROCESSABLE",
            Self::Upstream(_) => "UPSTREAM_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "{msg}"),
            Self::NotFound(msg) => write!(f, "{msg}"),
            Self::AccessDenied(msg) => write!(f, "{msg}"),
            Self::RateLimited(msg) => write!(f, "{msg}"),
            Self::Unprocessable(msg) => write!(f, "{msg}"),
            Self::Upstream(msg) => write!(f, "{msg}"),
            Self::Database(e) => write!(f, "Database error: {e}"),
            Self::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        if matches!(self, Self::Database(_) | Self::Internal(_)) {
            tracing::error!("request failed: {self}");
        }

        // Database/internal detail stays in the log; the client gets one
        // generic sentence.
        let message = match self {
            Self::Database(_) | Self::Internal(_) => {
                "Something went wrong on our side. Please try again.".to_string()
            }
            other => other.to_string(),
        };

        let error_response = ErrorResponse {
            error: ErrorBody {
                code: self.error_code().to_string(),
                message,
            },
            meta: ErrorMeta {
                request_id: uuid::Uuid::new_v4().to_string(),
            },
        };

        match self {
            Self::Validation(_) => HttpResponse::BadRequest().json(error_response),
            Self::NotFound(_) => HttpResponse::NotFound().json(error_response),
            Self::AccessDenied(_) => HttpResponse::Forbidden().json(error_response),
            Self::RateLimited(_) => HttpResponse::TooManyRequests().json(error_response),
            Self::Unprocessable(_) => HttpResponse::UnprocessableEntity().json(error_response),
            Self::Upstream(_) => HttpResponse::BadGateway().json(error_response),
            Self::Database(_) | Self::Internal(_) => {
                HttpResponse::InternalServerError().json(error_response)
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err)
    }
}

impl From<crate::services::storage::StorageError> for AppError {
    fn from(err: crate::services::storage::StorageError) -> Self {
        match err {
            crate::services::storage::StorageError::NotFound(msg) => Self::NotFound(msg),
            crate::services::storage::StorageError::Database(e) => Self::Database(e),
        }
    }
}
