use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Expired(String),

    #[error("Read time limit exceeded. Remaining: {remaining} minutes.")]
    TimeLimitExceeded { remaining: f64 },

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn invalid_otp() -> Self {
        AppError::Unauthorized("Invalid or expired OTP".to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_time: Option<f64>,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) | AppError::Expired(_) => StatusCode::UNAUTHORIZED,
            AppError::TimeLimitExceeded { .. } | AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::TimeLimitExceeded { remaining } => ErrorBody {
                message: self.to_string(),
                remaining_time: Some(*remaining),
            },
            AppError::Storage(_) | AppError::Internal(_) => {
                error!(error = %self, "request failed");
                ErrorBody {
                    message: "Server error".to_string(),
                    remaining_time: None,
                }
            }
            _ => ErrorBody {
                message: self.to_string(),
                remaining_time: None,
            },
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}
