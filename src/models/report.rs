use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(type_name = "report_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    New,
    #[sqlx(rename = "in-progress")]
    #[serde(rename = "in-progress")]
    InProgress,
    Closed,
}

impl ReportStatus {
    pub fn to_str(&self) -> &str {
        match self {
            ReportStatus::New => "new",
            ReportStatus::InProgress => "in-progress",
            ReportStatus::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,

    pub reporter_name: String,
    pub reporter_business: Option<String>,
    pub reporter_mobile: String,
    pub reporter_visiting_card: Option<String>,

    pub buyer_type: String,
    pub fraud_type: Option<String>,
    pub person_name: String,
    pub fraud_mobile1: String,
    pub fraud_mobile2: Option<String>,
    pub fraud_mobile3: Option<String>,
    pub fraud_business_name: Option<String>,
    pub fraud_province: Option<String>,
    pub fraud_city: String,
    pub custom_city: Option<String>,
    pub cnic_number: String,
    pub more_details: String,

    // Evidence image URLs, already hosted by the image store.
    pub shop_pic: Option<String>,
    pub man_pic: Option<String>,
    pub other_pic: Option<String>,

    pub status: ReportStatus,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    #[validate(length(min = 1, max = 200))]
    pub reporter_name: String,
    pub reporter_business: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub reporter_mobile: String,
    #[validate(url)]
    pub reporter_visiting_card: Option<String>,

    #[validate(length(min = 1))]
    pub buyer_type: String,
    pub fraud_type: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub person_name: String,
    #[validate(length(min = 1, max = 32))]
    pub fraud_mobile1: String,
    pub fraud_mobile2: Option<String>,
    pub fraud_mobile3: Option<String>,
    pub fraud_business_name: Option<String>,
    pub fraud_province: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub fraud_city: String,
    pub custom_city: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub cnic_number: String,
    #[validate(length(min = 1))]
    pub more_details: String,

    #[validate(url)]
    pub shop_pic: Option<String>,
    #[validate(url)]
    pub man_pic: Option<String>,
    #[validate(url)]
    pub other_pic: Option<String>,
}

/// Partial admin edit; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReport {
    pub reporter_name: Option<String>,
    pub reporter_business: Option<String>,
    pub reporter_mobile: Option<String>,
    pub buyer_type: Option<String>,
    pub fraud_type: Option<String>,
    pub person_name: Option<String>,
    pub fraud_mobile1: Option<String>,
    pub fraud_mobile2: Option<String>,
    pub fraud_mobile3: Option<String>,
    pub fraud_business_name: Option<String>,
    pub fraud_province: Option<String>,
    pub fraud_city: Option<String>,
    pub custom_city: Option<String>,
    pub cnic_number: Option<String>,
    pub more_details: Option<String>,
    #[validate(url)]
    pub shop_pic: Option<String>,
    #[validate(url)]
    pub man_pic: Option<String>,
    #[validate(url)]
    pub other_pic: Option<String>,
    pub status: Option<ReportStatus>,
}

/// Filter shared by the admin listing and the OTP-gated listing.
///
/// `city` and `search` are expected in normalized form (see [`normalize_text`]).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
    pub approved_only: bool,
    pub city: Option<String>,
    pub search: Option<String>,
}

impl ReportFilter {
    pub fn matches(&self, report: &Report) -> bool {
        if self.approved_only && !report.is_approved {
            return false;
        }
        if let Some(status) = self.status {
            if report.status != status {
                return false;
            }
        }
        if let Some(city) = &self.city {
            if normalize_text(&report.fraud_city) != *city {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let hit = [
                Some(&report.reporter_name),
                Some(&report.person_name),
                report.fraud_business_name.as_ref(),
            ]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(search.as_str()));
            if !hit {
                return false;
            }
        }
        true
    }
}

/// Lowercases, trims and collapses internal ASCII whitespace runs to one
/// space. Same rule as the Postgres `regexp_replace(.., '\s+', ' ')` filter.
pub fn normalize_text(raw: &str) -> String {
    raw.split_ascii_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Normalizes an optional search term, dropping it when blank.
pub fn normalize_search(raw: Option<&str>) -> Option<String> {
    raw.map(normalize_text).filter(|s| !s.is_empty())
}

#[derive(Debug, Deserialize)]
pub struct ReportListQuery {
    pub status: Option<ReportStatus>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct GatedReportQuery {
    pub otp: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportListResponse {
    pub reports: Vec<Report>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatedReportResponse {
    pub message: String,
    pub reports: Vec<Report>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
    pub city: String,
    pub remaining_time: f64,
    pub used_time: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportMessage {
    pub message: String,
    pub report: Report,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(city: &str, approved: bool, person: &str) -> Report {
        let now = Utc::now();
        Report {
            id: Uuid::new_v4(),
            reporter_name: "Ali".to_string(),
            reporter_business: None,
            reporter_mobile: "03001234567".to_string(),
            reporter_visiting_card: None,
            buyer_type: "wholesale".to_string(),
            fraud_type: None,
            person_name: person.to_string(),
            fraud_mobile1: "03007654321".to_string(),
            fraud_mobile2: None,
            fraud_mobile3: None,
            fraud_business_name: Some("Star Traders".to_string()),
            fraud_province: None,
            fraud_city: city.to_string(),
            custom_city: None,
            cnic_number: "3520212345671".to_string(),
            more_details: "did not pay".to_string(),
            shop_pic: None,
            man_pic: None,
            other_pic: None,
            status: ReportStatus::New,
            is_approved: approved,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Dera   Ghazi\tKhan "), "dera ghazi khan");
        assert_eq!(normalize_search(Some("   ")), None);
    }

    #[test]
    fn test_normalize_text_keeps_non_ascii_spaces() {
        assert_eq!(normalize_text("La\u{a0}hore"), "la\u{a0}hore");
        assert_ne!(normalize_text("La\u{a0}hore"), normalize_text("La hore"));
    }

    #[test]
    fn test_city_filter_ignores_case_and_spacing() {
        let filter = ReportFilter {
            approved_only: true,
            city: Some(normalize_text("Dera Ghazi Khan")),
            ..Default::default()
        };
        assert!(filter.matches(&report(" dera  GHAZI khan", true, "Bilal")));
        assert!(!filter.matches(&report("Dera Ghazi Khan", false, "Bilal")));
        assert!(!filter.matches(&report("Karachi", true, "Bilal")));
    }

    #[test]
    fn test_search_is_conjoined_with_city() {
        let filter = ReportFilter {
            approved_only: true,
            city: Some("lahore".to_string()),
            search: normalize_search(Some("STAR")),
            ..Default::default()
        };
        assert!(filter.matches(&report("Lahore", true, "Bilal")));
        assert!(!filter.matches(&report("Karachi", true, "Bilal")));

        let by_person = ReportFilter {
            search: normalize_search(Some("bil")),
            ..filter
        };
        assert!(by_person.matches(&report("Lahore", true, "Bilal")));
    }

    #[test]
    fn test_status_serializes_with_hyphen() {
        let json = serde_json::to_string(&ReportStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        assert_eq!(ReportStatus::InProgress.to_str(), "in-progress");
    }
}
