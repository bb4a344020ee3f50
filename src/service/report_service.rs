use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    clock::Clock,
    error::{AppError, AppResult},
    models::{
        pagination::PageRequest,
        report::{
            normalize_search, normalize_text, GatedReportResponse, NewReport, Report,
            ReportFilter, ReportListResponse, ReportStatus, UpdateReport,
        },
    },
    service::otp_service::OtpService,
    store::ReportStore,
};

pub struct ReportService {
    pub store: Arc<dyn ReportStore>,
    pub clock: Arc<dyn Clock>,
}

impl ReportService {
    pub fn new(store: Arc<dyn ReportStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Public submission. New reports start unapproved with status `new`.
    pub async fn submit(&self, report: NewReport) -> AppResult<Report> {
        report.validate()?;
        let report = self.store.insert_report(report, self.clock.now()).await?;
        info!(report_id = %report.id, city = %report.fraud_city, "report submitted");
        Ok(report)
    }

    pub async fn list(
        &self,
        status: Option<ReportStatus>,
        search: Option<&str>,
        page: PageRequest,
    ) -> AppResult<ReportListResponse> {
        let filter = ReportFilter {
            status,
            search: normalize_search(search),
            ..Default::default()
        };
        let (reports, total) = self.store.list_reports(&filter, page).await?;

        Ok(ReportListResponse {
            reports,
            total,
            page: page.page,
            limit: page.limit,
            total_pages: page.total_pages(total),
        })
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Report> {
        self.store.get_report(id).await?.ok_or_else(not_found)
    }

    pub async fn update(&self, id: Uuid, update: UpdateReport) -> AppResult<Report> {
        update.validate()?;
        let report = self
            .store
            .update_report(id, update, self.clock.now())
            .await?
            .ok_or_else(not_found)?;
        info!(report_id = %id, status = report.status.to_str(), "report updated");
        Ok(report)
    }

    pub async fn approve(&self, id: Uuid) -> AppResult<Report> {
        let report = self
            .store
            .approve_report(id, self.clock.now())
            .await?
            .ok_or_else(not_found)?;
        info!(report_id = %id, "report approved");
        Ok(report)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if !self.store.delete_report(id).await? {
            return Err(not_found());
        }
        info!(report_id = %id, "report deleted");
        Ok(())
    }

    /// Approved reports in the OTP's city, for anonymous readers.
    ///
    /// Refuses once the OTP's read time is spent, even if the client never
    /// flushed, and never charges time itself.
    #[instrument(skip(self, otps, otp))]
    pub async fn list_by_otp(
        &self,
        otps: &OtpService,
        otp: &str,
        search: Option<&str>,
        page: PageRequest,
    ) -> AppResult<GatedReportResponse> {
        let otp = otps.resolve_for_use(otp).await?;

        if !otp.has_time_left() {
            warn!(otp_id = %otp.id, "gated listing refused, no read time left");
            return Err(AppError::TimeLimitExceeded { remaining: 0.0 });
        }

        let filter = ReportFilter {
            approved_only: true,
            city: Some(normalize_text(&otp.city)),
            search: normalize_search(search),
            ..Default::default()
        };
        let (reports, total) = self.store.list_reports(&filter, page).await?;

        let remaining = otp.remaining_minutes();
        Ok(GatedReportResponse {
            message: format!(
                "Reports for {} (Remaining read time: {} minutes)",
                otp.city,
                remaining.ceil()
            ),
            reports,
            total,
            page: page.page,
            limit: page.limit,
            total_pages: page.total_pages(total),
            city: otp.city.clone(),
            remaining_time: remaining,
            used_time: otp.used_minutes(),
        })
    }
}

fn not_found() -> AppError {
    AppError::NotFound("Report not found".to_string())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::{
        clock::ManualClock,
        config::crypto::CryptoService,
        models::otp::OtpRecord,
        store::{MemoryStore, OtpStore},
    };

    struct Fixture {
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        otps: OtpService,
        reports: ReportService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::default());
        Fixture {
            otps: OtpService::new(store.clone(), CryptoService, clock.clone()),
            reports: ReportService::new(store.clone(), clock.clone()),
            store,
            clock,
        }
    }

    fn new_report(city: &str, person: &str) -> NewReport {
        NewReport {
            reporter_name: "Ali Raza".to_string(),
            reporter_business: None,
            reporter_mobile: "03001234567".to_string(),
            reporter_visiting_card: None,
            buyer_type: "retail".to_string(),
            fraud_type: Some("cheque bounce".to_string()),
            person_name: person.to_string(),
            fraud_mobile1: "03007654321".to_string(),
            fraud_mobile2: None,
            fraud_mobile3: None,
            fraud_business_name: Some("Crescent Cloth House".to_string()),
            fraud_province: Some("Punjab".to_string()),
            fraud_city: city.to_string(),
            custom_city: None,
            cnic_number: "3520212345671".to_string(),
            more_details: "Took goods on credit and vanished".to_string(),
            shop_pic: None,
            man_pic: None,
            other_pic: None,
        }
    }

    async fn approved(f: &Fixture, city: &str, person: &str) -> Report {
        let report = f.reports.submit(new_report(city, person)).await.unwrap();
        f.clock.advance(Duration::seconds(1));
        f.reports.approve(report.id).await.unwrap()
    }

    #[tokio::test]
    async fn test_gated_listing_scopes_to_city_and_approval() {
        let f = fixture();
        f.otps
            .create(Some("123456".into()), Some("Lahore".into()))
            .await
            .unwrap();
        assert_eq!(f.otps.validate("123456").await.unwrap().city, "Lahore");

        for city in ["lahore", "LAHORE", " Lahore ", "LaHoRe", "lahore"] {
            approved(&f, city, "Bilal").await;
        }
        for _ in 0..2 {
            approved(&f, "Karachi", "Bilal").await;
        }
        f.reports.submit(new_report("Lahore", "Bilal")).await.unwrap();

        let page = f
            .reports
            .list_by_otp(&f.otps, "123456", None, PageRequest::new(Some(1), Some(10)).unwrap())
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.reports.len(), 5);
        assert!(page
            .reports
            .iter()
            .all(|r| r.is_approved && normalize_text(&r.fraud_city) == "lahore"));
        assert_eq!(page.city, "Lahore");
        assert_eq!(page.remaining_time, 30.0);
        assert_eq!(page.total_pages, 1);
    }

    #[tokio::test]
    async fn test_gated_listing_is_newest_first_and_paginated() {
        let f = fixture();
        f.otps
            .create(Some("123456".into()), Some("Lahore".into()))
            .await
            .unwrap();
        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(approved(&f, "Lahore", &format!("Person {i}")).await.id);
        }

        let page = f
            .reports
            .list_by_otp(&f.otps, "123456", None, PageRequest::new(Some(2), Some(2)).unwrap())
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
        let got: Vec<_> = page.reports.iter().map(|r| r.id).collect();
        assert_eq!(got, vec![ids[2], ids[1]]);
    }

    #[tokio::test]
    async fn test_gated_search_keeps_city_filter() {
        let f = fixture();
        f.otps
            .create(Some("123456".into()), Some("Lahore".into()))
            .await
            .unwrap();
        approved(&f, "Lahore", "Bilal Ahmed").await;
        approved(&f, "Lahore", "Usman").await;
        approved(&f, "Karachi", "Bilal Khan").await;

        let page = f
            .reports
            .list_by_otp(&f.otps, "123456", Some("  BILAL "), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.reports[0].person_name, "Bilal Ahmed");
    }

    #[tokio::test]
    async fn test_gated_listing_refuses_spent_otp_without_charging() {
        let f = fixture();
        f.otps
            .create(Some("123456".into()), Some("Lahore".into()))
            .await
            .unwrap();
        f.otps.accumulate("123456", Some(12.5)).await.unwrap();

        let page = f
            .reports
            .list_by_otp(&f.otps, "123456", None, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.used_time, 12.5);
        assert_eq!(page.remaining_time, 17.5);

        f.otps.accumulate("123456", Some(17.5)).await.unwrap();
        match f
            .reports
            .list_by_otp(&f.otps, "123456", None, PageRequest::default())
            .await
        {
            Err(AppError::TimeLimitExceeded { remaining }) => assert_eq!(remaining, 0.0),
            other => panic!("expected time limit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_gated_listing_sweeps_stale_otp() {
        let f = fixture();
        let now = f.clock.now();
        let record = OtpRecord {
            id: Uuid::new_v4(),
            value: "123456".to_string(),
            city: "Lahore".to_string(),
            used_time_minutes: None,
            is_expired: false,
            created_at: now - Duration::days(31),
            updated_at: now - Duration::days(31),
        };
        f.store.put_otp(record.clone());

        let result = f
            .reports
            .list_by_otp(&f.otps, "123456", None, PageRequest::default())
            .await;
        assert!(matches!(result, Err(AppError::Expired(_))));

        let stored = f.store.get_otp(record.id).await.unwrap().unwrap();
        assert!(stored.is_expired);
    }

    #[tokio::test]
    async fn test_admin_lifecycle() {
        let f = fixture();
        let report = f.reports.submit(new_report("Multan", "Zafar")).await.unwrap();
        assert_eq!(report.status, ReportStatus::New);
        assert!(!report.is_approved);

        let updated = f
            .reports
            .update(
                report.id,
                UpdateReport {
                    status: Some(ReportStatus::InProgress),
                    more_details: Some("Confirmed by two traders".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, ReportStatus::InProgress);
        assert_eq!(updated.person_name, "Zafar");

        let listed = f
            .reports
            .list(Some(ReportStatus::InProgress), None, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(listed.total, 1);

        f.reports.delete(report.id).await.unwrap();
        assert!(matches!(f.reports.get(report.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(f.reports.delete(report.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_submit_rejects_missing_fields() {
        let f = fixture();
        let mut report = new_report("Lahore", "Bilal");
        report.reporter_name = String::new();
        assert!(matches!(f.reports.submit(report).await, Err(AppError::Validation(_))));
    }
}
