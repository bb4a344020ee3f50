use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Cumulative read time a single OTP may grant, in minutes.
pub const READ_TIME_CEILING_MINUTES: f64 = 30.0;

/// Age after which an OTP is swept to expired on its next use.
pub const OTP_RETENTION_DAYS: i64 = 30;

pub const OTP_LENGTH: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OtpRecord {
    pub id: Uuid,
    pub value: String,
    pub city: String,

    // NULL means "unset" and counts as zero.
    #[serde(rename = "usedTime")]
    pub used_time_minutes: Option<f64>,
    pub is_expired: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OtpRecord {
    pub fn used_minutes(&self) -> f64 {
        self.used_time_minutes.unwrap_or(0.0)
    }

    pub fn remaining_minutes(&self) -> f64 {
        READ_TIME_CEILING_MINUTES - self.used_minutes()
    }

    /// True once the record is older than the retention window.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at > Duration::days(OTP_RETENTION_DAYS)
    }

    pub fn has_time_left(&self) -> bool {
        self.used_minutes() < READ_TIME_CEILING_MINUTES
    }

    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired && self.has_time_left() && !self.is_stale(now)
    }
}

/// Insert payload built by the issuance service.
#[derive(Debug, Clone)]
pub struct NewOtp {
    pub value: String,
    pub city: String,
    pub created_at: DateTime<Utc>,
}

/// Returns true for exactly six ASCII digits.
pub fn is_valid_otp_value(value: &str) -> bool {
    value.len() == OTP_LENGTH && value.bytes().all(|b| b.is_ascii_digit())
}

/// OTP values arrive either as JSON strings or JSON numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OtpInput {
    Text(String),
    Number(u64),
}

impl OtpInput {
    pub fn into_value(self) -> String {
        match self {
            OtpInput::Text(text) => text.trim().to_string(),
            OtpInput::Number(number) => number.to_string(),
        }
    }
}

/// `sessionMinutes` as a JSON number or a numeric string such as `"5"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MinutesInput {
    Number(f64),
    Text(String),
}

impl MinutesInput {
    pub fn into_minutes(self) -> AppResult<f64> {
        match self {
            MinutesInput::Number(minutes) => Ok(minutes),
            MinutesInput::Text(text) => text.trim().parse().map_err(|_| {
                AppError::Validation("sessionMinutes must be a non-negative number".to_string())
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOtpRequest {
    pub value: Option<OtpInput>,
    pub city: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OtpSummary {
    pub id: Uuid,
    pub value: String,
    pub city: String,
}

impl From<&OtpRecord> for OtpSummary {
    fn from(record: &OtpRecord) -> Self {
        Self {
            id: record.id,
            value: record.value.clone(),
            city: record.city.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateOtpResponse {
    pub message: String,
    pub otp: OtpSummary,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateOtpRequest {
    pub otp_value: Option<OtpInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateOtpResponse {
    pub message: String,
    pub otp: String,
    pub city: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReadTimeRequest {
    pub otp_value: Option<OtpInput>,
    pub session_minutes: Option<MinutesInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadTimeResponse {
    pub message: String,
    pub used_time: f64,
    pub remaining_time: f64,
    pub city: String,
}

/// Counts derived from one page of OTPs, not the whole table.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpPageStats {
    pub active: usize,
    pub used: usize,
    pub expired: usize,
}

impl OtpPageStats {
    pub fn from_page(otps: &[OtpRecord]) -> Self {
        let mut stats = Self::default();
        for otp in otps {
            if otp.is_expired {
                stats.expired += 1;
            }
            if otp.used_minutes() > 0.0 {
                stats.used += 1;
            } else if !otp.is_expired {
                stats.active += 1;
            }
        }
        stats
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpListResponse {
    pub otps: Vec<OtpRecord>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
    pub stats: OtpPageStats,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuggestedOtpResponse {
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(used: Option<f64>, expired: bool, age_days: i64) -> OtpRecord {
        let now = Utc::now();
        OtpRecord {
            id: Uuid::new_v4(),
            value: "123456".to_string(),
            city: "Lahore".to_string(),
            used_time_minutes: used,
            is_expired: expired,
            created_at: now - Duration::days(age_days),
            updated_at: now,
        }
    }

    #[test]
    fn test_otp_value_format() {
        assert!(is_valid_otp_value("123456"));
        assert!(is_valid_otp_value("012345"));
        assert!(!is_valid_otp_value("12345"));
        assert!(!is_valid_otp_value("1234567"));
        assert!(!is_valid_otp_value("12a456"));
        assert!(!is_valid_otp_value("-12345"));
    }

    #[test]
    fn test_unset_used_time_counts_as_zero() {
        let otp = record(None, false, 0);
        assert_eq!(otp.used_minutes(), 0.0);
        assert_eq!(otp.remaining_minutes(), 30.0);
    }

    #[test]
    fn test_usability() {
        let now = Utc::now();
        assert!(record(Some(29.5), false, 1).is_usable(now));
        assert!(!record(Some(30.0), false, 1).is_usable(now));
        assert!(!record(Some(0.0), true, 1).is_usable(now));
        assert!(!record(Some(0.0), false, 31).is_usable(now));
    }

    #[test]
    fn test_page_stats() {
        let page = vec![
            record(None, false, 0),
            record(Some(4.0), false, 0),
            record(Some(0.0), true, 0),
        ];
        assert_eq!(
            OtpPageStats::from_page(&page),
            OtpPageStats {
                active: 1,
                used: 1,
                expired: 1
            }
        );
    }

    #[test]
    fn test_otp_input_accepts_numbers() {
        let text: OtpInput = serde_json::from_str("\" 123456 \"").unwrap();
        let number: OtpInput = serde_json::from_str("123456").unwrap();
        assert_eq!(text.into_value(), "123456");
        assert_eq!(number.into_value(), "123456");
    }

    #[test]
    fn test_minutes_input_accepts_numeric_strings() {
        let parse = |raw: &str| serde_json::from_str::<MinutesInput>(raw).unwrap().into_minutes();
        assert_eq!(parse("5").unwrap(), 5.0);
        assert_eq!(parse("2.5").unwrap(), 2.5);
        assert_eq!(parse("\" 5 \"").unwrap(), 5.0);
        assert!(matches!(parse("\"five\""), Err(AppError::Validation(_))));
    }
}
