use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{like_pattern, AdminStore, OtpStore, ReportStore, StoreResult};
use crate::models::{
    admin::{Admin, AdminChanges, AdminRow},
    otp::{NewOtp, OtpRecord},
    pagination::PageRequest,
    report::{NewReport, Report, ReportFilter, UpdateReport},
};

/// Normalized form of `fraud_city`, matching `normalize_text` on the Rust side.
const NORMALIZED_CITY: &str = r"btrim(regexp_replace(lower(fraud_city), '\s+', ' ', 'g'))";

#[derive(Debug, Clone)]
pub struct PgStore {
    pub pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_otp_search(qb: &mut QueryBuilder<'_, Postgres>, search: Option<&str>) {
    if let Some(term) = search {
        let pattern = like_pattern(term);
        qb.push(" WHERE (value ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR city ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn push_report_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ReportFilter) {
    qb.push(" WHERE TRUE");
    if filter.approved_only {
        qb.push(" AND is_approved = TRUE");
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(city) = &filter.city {
        qb.push(" AND ")
            .push(NORMALIZED_CITY)
            .push(" = ")
            .push_bind(city.clone());
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        qb.push(" AND (reporter_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR person_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR fraud_business_name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl OtpStore for PgStore {
    async fn insert_otp(&self, otp: NewOtp) -> StoreResult<OtpRecord> {
        sqlx::query_as::<_, OtpRecord>(
            r#"
                INSERT INTO otps (id, value, city, used_time_minutes, is_expired, created_at, updated_at)
                VALUES ($1, $2, $3, 0, FALSE, $4, $4)
                RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&otp.value)
        .bind(&otp.city)
        .bind(otp.created_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_otp(&self, id: Uuid) -> StoreResult<Option<OtpRecord>> {
        sqlx::query_as::<_, OtpRecord>("SELECT * FROM otps WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_live_otp(&self, value: &str) -> StoreResult<Option<OtpRecord>> {
        sqlx::query_as::<_, OtpRecord>(
            r#"
                SELECT *
                FROM otps
                WHERE value = $1 AND is_expired = FALSE
                ORDER BY created_at DESC
                LIMIT 1
            "#,
        )
        .bind(value)
        .fetch_optional(&self.pool)
        .await
    }

    async fn mark_otp_expired(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query("UPDATE otps SET is_expired = TRUE, updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn add_used_time(
        &self,
        id: Uuid,
        delta: f64,
        ceiling: f64,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<OtpRecord>> {
        // Check and increment in one statement so concurrent flushes cannot
        // both pass the ceiling.
        sqlx::query_as::<_, OtpRecord>(
            r#"
                UPDATE otps
                SET used_time_minutes = COALESCE(used_time_minutes, 0) + $2,
                    updated_at = $4
                WHERE id = $1
                  AND is_expired = FALSE
                  AND COALESCE(used_time_minutes, 0) + $2 <= $3
                RETURNING *
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(ceiling)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_otps(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> StoreResult<(Vec<OtpRecord>, i64)> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM otps");
        push_otp_search(&mut qb, search);
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset());
        let otps = qb.build_query_as::<OtpRecord>().fetch_all(&self.pool).await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM otps");
        push_otp_search(&mut count, search);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        Ok((otps, total))
    }
}

#[async_trait]
impl ReportStore for PgStore {
    async fn insert_report(&self, report: NewReport, now: DateTime<Utc>) -> StoreResult<Report> {
        sqlx::query_as::<_, Report>(
            r#"
                INSERT INTO reports (
                    id,
                    reporter_name,
                    reporter_business,
                    reporter_mobile,
                    reporter_visiting_card,
                    buyer_type,
                    fraud_type,
                    person_name,
                    fraud_mobile1,
                    fraud_mobile2,
                    fraud_mobile3,
                    fraud_business_name,
                    fraud_province,
                    fraud_city,
                    custom_city,
                    cnic_number,
                    more_details,
                    shop_pic,
                    man_pic,
                    other_pic,
                    status,
                    is_approved,
                    created_at,
                    updated_at
                )
                VALUES (
                    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, $17, $18, $19, $20, 'new', FALSE, $21, $21
                )
                RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&report.reporter_name)
        .bind(&report.reporter_business)
        .bind(&report.reporter_mobile)
        .bind(&report.reporter_visiting_card)
        .bind(&report.buyer_type)
        .bind(&report.fraud_type)
        .bind(&report.person_name)
        .bind(&report.fraud_mobile1)
        .bind(&report.fraud_mobile2)
        .bind(&report.fraud_mobile3)
        .bind(&report.fraud_business_name)
        .bind(&report.fraud_province)
        .bind(&report.fraud_city)
        .bind(&report.custom_city)
        .bind(&report.cnic_number)
        .bind(&report.more_details)
        .bind(&report.shop_pic)
        .bind(&report.man_pic)
        .bind(&report.other_pic)
        .bind(now)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_report(&self, id: Uuid) -> StoreResult<Option<Report>> {
        sqlx::query_as::<_, Report>("SELECT * FROM reports WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_reports(
        &self,
        filter: &ReportFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<Report>, i64)> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM reports");
        push_report_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset());
        let reports = qb.build_query_as::<Report>().fetch_all(&self.pool).await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM reports");
        push_report_filter(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        Ok((reports, total))
    }

    async fn update_report(
        &self,
        id: Uuid,
        update: UpdateReport,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Report>> {
        sqlx::query_as::<_, Report>(
            r#"
                UPDATE reports
                SET reporter_name = COALESCE($2, reporter_name),
                    reporter_business = COALESCE($3, reporter_business),
                    reporter_mobile = COALESCE($4, reporter_mobile),
                    buyer_type = COALESCE($5, buyer_type),
                    fraud_type = COALESCE($6, fraud_type),
                    person_name = COALESCE($7, person_name),
                    fraud_mobile1 = COALESCE($8, fraud_mobile1),
                    fraud_mobile2 = COALESCE($9, fraud_mobile2),
                    fraud_mobile3 = COALESCE($10, fraud_mobile3),
                    fraud_business_name = COALESCE($11, fraud_business_name),
                    fraud_province = COALESCE($12, fraud_province),
                    fraud_city = COALESCE($13, fraud_city),
                    custom_city = COALESCE($14, custom_city),
                    cnic_number = COALESCE($15, cnic_number),
                    more_details = COALESCE($16, more_details),
                    shop_pic = COALESCE($17, shop_pic),
                    man_pic = COALESCE($18, man_pic),
                    other_pic = COALESCE($19, other_pic),
                    status = COALESCE($20, status),
                    updated_at = $21
                WHERE id = $1
                RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.reporter_name)
        .bind(update.reporter_business)
        .bind(update.reporter_mobile)
        .bind(update.buyer_type)
        .bind(update.fraud_type)
        .bind(update.person_name)
        .bind(update.fraud_mobile1)
        .bind(update.fraud_mobile2)
        .bind(update.fraud_mobile3)
        .bind(update.fraud_business_name)
        .bind(update.fraud_province)
        .bind(update.fraud_city)
        .bind(update.custom_city)
        .bind(update.cnic_number)
        .bind(update.more_details)
        .bind(update.shop_pic)
        .bind(update.man_pic)
        .bind(update.other_pic)
        .bind(update.status)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
    }

    async fn approve_report(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<Option<Report>> {
        sqlx::query_as::<_, Report>(
            "UPDATE reports SET is_approved = TRUE, updated_at = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_report(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM reports WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl AdminStore for PgStore {
    async fn insert_admin(&self, row: AdminRow) -> StoreResult<Admin> {
        sqlx::query_as::<_, Admin>(
            r#"
                INSERT INTO admins (id, username, email, password_hash, is_super_admin, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $6)
                RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.username)
        .bind(&row.email)
        .bind(&row.password_hash)
        .bind(row.is_super_admin)
        .bind(row.created_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn find_admin_by_email(&self, email: &str) -> StoreResult<Option<Admin>> {
        sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_admin_by_identity(
        &self,
        username: &str,
        email: &str,
        exclude: Option<Uuid>,
    ) -> StoreResult<Option<Admin>> {
        sqlx::query_as::<_, Admin>(
            r#"
                SELECT *
                FROM admins
                WHERE (username = $1 OR email = $2)
                  AND ($3::uuid IS NULL OR id <> $3)
                LIMIT 1
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(exclude)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_admin(&self, id: Uuid) -> StoreResult<Option<Admin>> {
        sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_super_admin(&self) -> StoreResult<Option<Admin>> {
        sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE is_super_admin = TRUE LIMIT 1")
            .fetch_optional(&self.pool)
            .await
    }

    async fn update_super_admin(&self, id: Uuid, row: AdminRow) -> StoreResult<Admin> {
        sqlx::query_as::<_, Admin>(
            r#"
                UPDATE admins
                SET username = $2,
                    email = $3,
                    password_hash = $4,
                    is_super_admin = TRUE,
                    updated_at = $5
                WHERE id = $1
                RETURNING *
            "#,
        )
        .bind(id)
        .bind(&row.username)
        .bind(&row.email)
        .bind(&row.password_hash)
        .bind(row.created_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_admin(
        &self,
        id: Uuid,
        changes: AdminChanges,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Admin>> {
        sqlx::query_as::<_, Admin>(
            r#"
                UPDATE admins
                SET username = COALESCE($2, username),
                    email = COALESCE($3, email),
                    password_hash = COALESCE($4, password_hash),
                    updated_at = $5
                WHERE id = $1
                RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.username)
        .bind(changes.email)
        .bind(changes.password_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_admins(&self, search: Option<&str>) -> StoreResult<Vec<Admin>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM admins");
        if let Some(term) = search {
            let pattern = like_pattern(term);
            qb.push(" WHERE username ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR email ILIKE ")
                .push_bind(pattern);
        }
        qb.push(" ORDER BY created_at DESC");
        qb.build_query_as::<Admin>().fetch_all(&self.pool).await
    }

    async fn delete_admin(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM admins WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// These run against a real database: `DATABASE_URL=... cargo test -- --ignored`.
#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::models::report::normalize_text;

    fn new_report(city: &str, person: &str) -> NewReport {
        NewReport {
            reporter_name: "Ali Raza".to_string(),
            reporter_business: None,
            reporter_mobile: "03001234567".to_string(),
            reporter_visiting_card: None,
            buyer_type: "retail".to_string(),
            fraud_type: None,
            person_name: person.to_string(),
            fraud_mobile1: "03007654321".to_string(),
            fraud_mobile2: None,
            fraud_mobile3: None,
            fraud_business_name: None,
            fraud_province: None,
            fraud_city: city.to_string(),
            custom_city: None,
            cnic_number: "3520212345671".to_string(),
            more_details: "Took goods on credit and vanished".to_string(),
            shop_pic: None,
            man_pic: None,
            other_pic: None,
        }
    }

    async fn new_otp(store: &PgStore, value: &str, created_at: DateTime<Utc>) -> OtpRecord {
        store
            .insert_otp(NewOtp {
                value: value.to_string(),
                city: "Lahore".to_string(),
                created_at,
            })
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn test_concurrent_increments_respect_ceiling(pool: PgPool) {
        let store = PgStore::new(pool);
        let id = new_otp(&store, "123456", Utc::now()).await.id;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.add_used_time(id, 20.0, 30.0, Utc::now()).await })
            })
            .collect();

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().is_some() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);

        let stored = store.get_otp(id).await.unwrap().unwrap();
        assert_eq!(stored.used_minutes(), 20.0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn test_refused_increment_writes_nothing(pool: PgPool) {
        let store = PgStore::new(pool);
        let otp = new_otp(&store, "123456", Utc::now()).await;

        let first = store.add_used_time(otp.id, 30.0, 30.0, Utc::now()).await.unwrap();
        assert_eq!(first.unwrap().used_minutes(), 30.0);
        assert!(store
            .add_used_time(otp.id, 0.5, 30.0, Utc::now())
            .await
            .unwrap()
            .is_none());

        store.mark_otp_expired(otp.id, Utc::now()).await.unwrap();
        assert!(store
            .add_used_time(otp.id, 0.0, 30.0, Utc::now())
            .await
            .unwrap()
            .is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn test_live_lookup_prefers_newest(pool: PgPool) {
        let store = PgStore::new(pool);
        let now = Utc::now();
        let older = new_otp(&store, "123456", now - Duration::minutes(5)).await;
        let newer = new_otp(&store, "123456", now).await;
        new_otp(&store, "654321", now + Duration::minutes(1)).await;

        let found = store.find_live_otp("123456").await.unwrap().unwrap();
        assert_eq!(found.id, newer.id);

        store.mark_otp_expired(newer.id, now).await.unwrap();
        let found = store.find_live_otp("123456").await.unwrap().unwrap();
        assert_eq!(found.id, older.id);

        assert!(store.find_live_otp("12345").await.unwrap().is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn test_city_filter_matches_normalized_city(pool: PgPool) {
        let store = PgStore::new(pool);
        let now = Utc::now();

        let cities = ["Lahore", "  LAHORE  ", "\tLaHoRe", "Karachi", "Dera   Ghazi\tKhan"];
        for (i, city) in cities.iter().enumerate() {
            let at = now + Duration::seconds(i as i64);
            let report = store.insert_report(new_report(city, "Bilal"), at).await.unwrap();
            store.approve_report(report.id, at).await.unwrap();
        }
        store
            .insert_report(new_report("Lahore", "Bilal"), now)
            .await
            .unwrap();

        let lahore = ReportFilter {
            approved_only: true,
            city: Some(normalize_text("Lahore")),
            ..Default::default()
        };
        let (reports, total) = store
            .list_reports(&lahore, PageRequest::new(None, None).unwrap())
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert!(reports.iter().all(|r| r.is_approved));
        assert!(reports.windows(2).all(|w| w[0].created_at >= w[1].created_at));

        let dg_khan = ReportFilter {
            city: Some(normalize_text("dera ghazi khan")),
            ..lahore.clone()
        };
        let (_, total) = store
            .list_reports(&dg_khan, PageRequest::new(None, None).unwrap())
            .await
            .unwrap();
        assert_eq!(total, 1);

        let searched = ReportFilter {
            search: Some("bil".to_string()),
            ..lahore
        };
        let (_, total) = store
            .list_reports(&searched, PageRequest::new(None, None).unwrap())
            .await
            .unwrap();
        assert_eq!(total, 3);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn test_admin_identity_excludes_self(pool: PgPool) {
        let store = PgStore::new(pool);
        let admin = store
            .insert_admin(AdminRow {
                username: "moderator".to_string(),
                email: "mod@example.com".to_string(),
                password_hash: "hash".to_string(),
                is_super_admin: false,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        assert!(store
            .find_admin_by_identity("moderator", "other@example.com", None)
            .await
            .unwrap()
            .is_some());
        assert!(store
            .find_admin_by_identity("moderator", "mod@example.com", Some(admin.id))
            .await
            .unwrap()
            .is_none());

        let updated = store
            .update_admin(
                admin.id,
                AdminChanges {
                    email: Some("lead@example.com".to_string()),
                    ..Default::default()
                },
                Utc::now(),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.username, "moderator");
        assert_eq!(updated.email, "lead@example.com");
        assert_eq!(updated.password_hash, "hash");
    }
}
