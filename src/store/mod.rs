//! Persistence seams for OTPs, reports and admins.
//!
//! [`PgStore`] is the production backend; [`MemoryStore`] backs tests and
//! `STORE=memory` development runs. Both honour the same contracts, in
//! particular the atomic ceiling on [`OtpStore::add_used_time`].

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    admin::{Admin, AdminChanges, AdminRow},
    otp::{NewOtp, OtpRecord},
    pagination::PageRequest,
    report::{NewReport, Report, ReportFilter, UpdateReport},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, sqlx::Error>;

#[async_trait]
pub trait OtpStore: Send + Sync {
    async fn insert_otp(&self, otp: NewOtp) -> StoreResult<OtpRecord>;

    async fn get_otp(&self, id: Uuid) -> StoreResult<Option<OtpRecord>>;

    /// Most recently created non-expired record carrying `value`.
    async fn find_live_otp(&self, value: &str) -> StoreResult<Option<OtpRecord>>;

    async fn mark_otp_expired(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<()>;

    /// Adds `delta` minutes in one atomic step, only if the record is still
    /// live and the new total stays within `ceiling`. Returns `None` when the
    /// update was refused; nothing is written in that case.
    async fn add_used_time(
        &self,
        id: Uuid,
        delta: f64,
        ceiling: f64,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<OtpRecord>>;

    /// Newest first; `search` matches value or city, case-insensitively.
    async fn list_otps(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> StoreResult<(Vec<OtpRecord>, i64)>;
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn insert_report(&self, report: NewReport, now: DateTime<Utc>) -> StoreResult<Report>;

    async fn get_report(&self, id: Uuid) -> StoreResult<Option<Report>>;

    /// Newest first, with the total match count before pagination.
    async fn list_reports(
        &self,
        filter: &ReportFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<Report>, i64)>;

    async fn update_report(
        &self,
        id: Uuid,
        update: UpdateReport,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Report>>;

    async fn approve_report(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<Option<Report>>;

    /// Returns false when no report had that id.
    async fn delete_report(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait AdminStore: Send + Sync {
    async fn insert_admin(&self, admin: AdminRow) -> StoreResult<Admin>;

    async fn find_admin_by_email(&self, email: &str) -> StoreResult<Option<Admin>>;

    /// Any admin holding `username` or `email`, other than `exclude`.
    async fn find_admin_by_identity(
        &self,
        username: &str,
        email: &str,
        exclude: Option<Uuid>,
    ) -> StoreResult<Option<Admin>>;

    async fn get_admin(&self, id: Uuid) -> StoreResult<Option<Admin>>;

    async fn find_super_admin(&self) -> StoreResult<Option<Admin>>;

    async fn update_super_admin(&self, id: Uuid, admin: AdminRow) -> StoreResult<Admin>;

    async fn update_admin(
        &self,
        id: Uuid,
        changes: AdminChanges,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Admin>>;

    async fn list_admins(&self, search: Option<&str>) -> StoreResult<Vec<Admin>>;

    async fn delete_admin(&self, id: Uuid) -> StoreResult<bool>;
}

/// One backend serving every collection.
pub trait Store: OtpStore + ReportStore + AdminStore {}

impl<T: OtpStore + ReportStore + AdminStore> Store for T {}

/// Escapes `%`, `_` and `\` so user text is matched literally by `ILIKE`.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
