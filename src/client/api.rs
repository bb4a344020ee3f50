use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::{
    error::ErrorBody,
    models::{
        otp::{ReadTimeResponse, ValidateOtpResponse},
        report::GatedReportResponse,
    },
};

#[derive(Debug, Error)]
pub enum ApiError {
    /// Unknown, expired or stale OTP.
    #[error("{0}")]
    Unauthorized(String),

    #[error("Read time limit exceeded. Remaining: {remaining} minutes.")]
    TimeLimitExceeded { remaining: f64 },

    #[error("{0}")]
    Rejected(String),

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("no active OTP session")]
    NoSession,

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

impl ApiError {
    /// Errors after which the reader has to enter a new OTP.
    pub fn ends_session(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthorized(_) | ApiError::TimeLimitExceeded { .. }
        )
    }
}

/// Calls the session controller makes against the server.
#[async_trait]
pub trait ReadAccessApi: Send + Sync + 'static {
    async fn validate_otp(&self, otp: &str) -> Result<ValidateOtpResponse, ApiError>;

    async fn update_read_time(
        &self,
        otp: &str,
        session_minutes: f64,
    ) -> Result<ReadTimeResponse, ApiError>;

    async fn list_reports(
        &self,
        otp: &str,
        search: Option<&str>,
        page: u32,
        limit: u32,
    ) -> Result<GatedReportResponse, ApiError>;
}

#[derive(Serialize)]
struct ReportsQuery<'a> {
    otp: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    search: Option<&'a str>,
    page: u32,
    limit: u32,
}

#[derive(Debug, Clone)]
pub struct HttpReadAccessApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpReadAccessApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let fallback = status.canonical_reason().unwrap_or("request failed");
    let body = response.json::<ErrorBody>().await.unwrap_or_else(|_| ErrorBody {
        message: fallback.to_string(),
        remaining_time: None,
    });
    debug!(%status, message = %body.message, "request rejected");

    Err(match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized(body.message),
        StatusCode::FORBIDDEN => match body.remaining_time {
            Some(remaining) => ApiError::TimeLimitExceeded { remaining },
            None => ApiError::Rejected(body.message),
        },
        s if s.is_server_error() => ApiError::Server {
            status: s.as_u16(),
            message: body.message,
        },
        _ => ApiError::Rejected(body.message),
    })
}

#[async_trait]
impl ReadAccessApi for HttpReadAccessApi {
    async fn validate_otp(&self, otp: &str) -> Result<ValidateOtpResponse, ApiError> {
        let response = self
            .client
            .post(self.url("/api/otp/validate-otp"))
            .json(&json!({ "otpValue": otp }))
            .send()
            .await?;
        decode(response).await
    }

    async fn update_read_time(
        &self,
        otp: &str,
        session_minutes: f64,
    ) -> Result<ReadTimeResponse, ApiError> {
        let response = self
            .client
            .post(self.url("/api/otp/update-read-time"))
            .json(&json!({ "otpValue": otp, "sessionMinutes": session_minutes }))
            .send()
            .await?;
        decode(response).await
    }

    async fn list_reports(
        &self,
        otp: &str,
        search: Option<&str>,
        page: u32,
        limit: u32,
    ) -> Result<GatedReportResponse, ApiError> {
        let response = self
            .client
            .get(self.url("/api/reports/getByOtp"))
            .query(&ReportsQuery {
                otp,
                search,
                page,
                limit,
            })
            .send()
            .await?;
        decode(response).await
    }
}
