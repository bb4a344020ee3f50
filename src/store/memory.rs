use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use super::{AdminStore, OtpStore, ReportStore, StoreResult};
use crate::models::{
    admin::{Admin, AdminChanges, AdminRow},
    otp::{NewOtp, OtpRecord},
    pagination::PageRequest,
    report::{NewReport, Report, ReportFilter, ReportStatus, UpdateReport},
};

/// Thread-safe in-memory store.
///
/// Every mutation happens under one write lock, which makes each
/// read-modify-write atomic with respect to concurrent requests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    otps: RwLock<HashMap<Uuid, OtpRecord>>,
    reports: RwLock<HashMap<Uuid, Report>>,
    admins: RwLock<HashMap<Uuid, Admin>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record as-is, bypassing issuance. Used to seed fixtures.
    pub fn put_otp(&self, record: OtpRecord) {
        self.otps.write().insert(record.id, record);
    }
}

fn paginate<T: Clone>(mut rows: Vec<T>, page: PageRequest) -> (Vec<T>, i64) {
    let total = rows.len() as i64;
    let offset = page.offset() as usize;
    if offset >= rows.len() {
        return (Vec::new(), total);
    }
    let end = (offset + page.limit as usize).min(rows.len());
    (rows.drain(offset..end).collect(), total)
}

#[async_trait]
impl OtpStore for MemoryStore {
    async fn insert_otp(&self, otp: NewOtp) -> StoreResult<OtpRecord> {
        let record = OtpRecord {
            id: Uuid::new_v4(),
            value: otp.value,
            city: otp.city,
            used_time_minutes: Some(0.0),
            is_expired: false,
            created_at: otp.created_at,
            updated_at: otp.created_at,
        };
        self.otps.write().insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_otp(&self, id: Uuid) -> StoreResult<Option<OtpRecord>> {
        Ok(self.otps.read().get(&id).cloned())
    }

    async fn find_live_otp(&self, value: &str) -> StoreResult<Option<OtpRecord>> {
        Ok(self
            .otps
            .read()
            .values()
            .filter(|otp| otp.value == value && !otp.is_expired)
            .max_by_key(|otp| otp.created_at)
            .cloned())
    }

    async fn mark_otp_expired(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<()> {
        if let Some(otp) = self.otps.write().get_mut(&id) {
            otp.is_expired = true;
            otp.updated_at = now;
        }
        Ok(())
    }

    async fn add_used_time(
        &self,
        id: Uuid,
        delta: f64,
        ceiling: f64,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<OtpRecord>> {
        let mut otps = self.otps.write();
        let Some(otp) = otps.get_mut(&id) else {
            return Ok(None);
        };
        let new_used = otp.used_minutes() + delta;
        if otp.is_expired || new_used > ceiling {
            return Ok(None);
        }
        otp.used_time_minutes = Some(new_used);
        otp.updated_at = now;
        Ok(Some(otp.clone()))
    }

    async fn list_otps(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> StoreResult<(Vec<OtpRecord>, i64)> {
        let search = search.map(str::to_lowercase);
        let mut rows: Vec<OtpRecord> = self
            .otps
            .read()
            .values()
            .filter(|otp| match &search {
                Some(term) => {
                    otp.value.contains(term.as_str()) || otp.city.to_lowercase().contains(term.as_str())
                }
                None => true,
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(rows, page))
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn insert_report(&self, report: NewReport, now: DateTime<Utc>) -> StoreResult<Report> {
        let report = Report {
            id: Uuid::new_v4(),
            reporter_name: report.reporter_name,
            reporter_business: report.reporter_business,
            reporter_mobile: report.reporter_mobile,
            reporter_visiting_card: report.reporter_visiting_card,
            buyer_type: report.buyer_type,
            fraud_type: report.fraud_type,
            person_name: report.person_name,
            fraud_mobile1: report.fraud_mobile1,
            fraud_mobile2: report.fraud_mobile2,
            fraud_mobile3: report.fraud_mobile3,
            fraud_business_name: report.fraud_business_name,
            fraud_province: report.fraud_province,
            fraud_city: report.fraud_city,
            custom_city: report.custom_city,
            cnic_number: report.cnic_number,
            more_details: report.more_details,
            shop_pic: report.shop_pic,
            man_pic: report.man_pic,
            other_pic: report.other_pic,
            status: ReportStatus::New,
            is_approved: false,
            created_at: now,
            updated_at: now,
        };
        self.reports.write().insert(report.id, report.clone());
        Ok(report)
    }

    async fn get_report(&self, id: Uuid) -> StoreResult<Option<Report>> {
        Ok(self.reports.read().get(&id).cloned())
    }

    async fn list_reports(
        &self,
        filter: &ReportFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<Report>, i64)> {
        let mut rows: Vec<Report> = self
            .reports
            .read()
            .values()
            .filter(|report| filter.matches(report))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(rows, page))
    }

    async fn update_report(
        &self,
        id: Uuid,
        update: UpdateReport,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Report>> {
        let mut reports = self.reports.write();
        let Some(report) = reports.get_mut(&id) else {
            return Ok(None);
        };

        macro_rules! apply {
            ($($field:ident),* ; $($opt:ident),*) => {
                $(if let Some(value) = update.$field { report.$field = value; })*
                $(if let Some(value) = update.$opt { report.$opt = Some(value); })*
            };
        }
        apply!(
            reporter_name, reporter_mobile, buyer_type, person_name, fraud_mobile1,
            fraud_city, cnic_number, more_details, status;
            reporter_business, fraud_type, fraud_mobile2, fraud_mobile3, fraud_business_name,
            fraud_province, custom_city, shop_pic, man_pic, other_pic
        );
        report.updated_at = now;
        Ok(Some(report.clone()))
    }

    async fn approve_report(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<Option<Report>> {
        let mut reports = self.reports.write();
        Ok(reports.get_mut(&id).map(|report| {
            report.is_approved = true;
            report.updated_at = now;
            report.clone()
        }))
    }

    async fn delete_report(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.reports.write().remove(&id).is_some())
    }
}

#[async_trait]
impl AdminStore for MemoryStore {
    async fn insert_admin(&self, row: AdminRow) -> StoreResult<Admin> {
        let admin = Admin {
            id: Uuid::new_v4(),
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            is_super_admin: row.is_super_admin,
            created_at: row.created_at,
            updated_at: row.created_at,
        };
        self.admins.write().insert(admin.id, admin.clone());
        Ok(admin)
    }

    async fn find_admin_by_email(&self, email: &str) -> StoreResult<Option<Admin>> {
        Ok(self
            .admins
            .read()
            .values()
            .find(|admin| admin.email == email)
            .cloned())
    }

    async fn find_admin_by_identity(
        &self,
        username: &str,
        email: &str,
        exclude: Option<Uuid>,
    ) -> StoreResult<Option<Admin>> {
        Ok(self
            .admins
            .read()
            .values()
            .filter(|admin| Some(admin.id) != exclude)
            .find(|admin| admin.username == username || admin.email == email)
            .cloned())
    }

    async fn get_admin(&self, id: Uuid) -> StoreResult<Option<Admin>> {
        Ok(self.admins.read().get(&id).cloned())
    }

    async fn find_super_admin(&self) -> StoreResult<Option<Admin>> {
        Ok(self
            .admins
            .read()
            .values()
            .find(|admin| admin.is_super_admin)
            .cloned())
    }

    async fn update_super_admin(&self, id: Uuid, row: AdminRow) -> StoreResult<Admin> {
        let mut admins = self.admins.write();
        let admin = admins.get_mut(&id).ok_or(sqlx::Error::RowNotFound)?;
        admin.username = row.username;
        admin.email = row.email;
        admin.password_hash = row.password_hash;
        admin.is_super_admin = true;
        admin.updated_at = row.created_at;
        Ok(admin.clone())
    }

    async fn update_admin(
        &self,
        id: Uuid,
        changes: AdminChanges,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Admin>> {
        let mut admins = self.admins.write();
        let Some(admin) = admins.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(username) = changes.username {
            admin.username = username;
        }
        if let Some(email) = changes.email {
            admin.email = email;
        }
        if let Some(password_hash) = changes.password_hash {
            admin.password_hash = password_hash;
        }
        admin.updated_at = now;
        Ok(Some(admin.clone()))
    }

    async fn list_admins(&self, search: Option<&str>) -> StoreResult<Vec<Admin>> {
        let search = search.map(str::to_lowercase);
        let mut rows: Vec<Admin> = self
            .admins
            .read()
            .values()
            .filter(|admin| match &search {
                Some(term) => {
                    admin.username.to_lowercase().contains(term.as_str())
                        || admin.email.to_lowercase().contains(term.as_str())
                }
                None => true,
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn delete_admin(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.admins.write().remove(&id).is_some())
    }
}
