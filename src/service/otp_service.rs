use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::{
    clock::Clock,
    config::crypto::CryptoService,
    error::{AppError, AppResult},
    models::{
        otp::{
            is_valid_otp_value, NewOtp, OtpListResponse, OtpPageStats, OtpRecord,
            READ_TIME_CEILING_MINUTES,
        },
        pagination::PageRequest,
    },
    store::OtpStore,
};

/// Minutes charged when a client omits `sessionMinutes`.
pub const DEFAULT_SESSION_MINUTES: f64 = 5.0;

/// Outcome of a successful read-time accumulation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadTimeUpdate {
    pub used_minutes: f64,
    pub remaining_minutes: f64,
    pub city: String,
}

pub struct OtpService {
    pub store: Arc<dyn OtpStore>,
    pub crypto: CryptoService,
    pub clock: Arc<dyn Clock>,
}

impl OtpService {
    pub fn new(store: Arc<dyn OtpStore>, crypto: CryptoService, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            crypto,
            clock,
        }
    }

    /// Admin issuance. Live values are not checked for collisions.
    #[instrument(skip(self))]
    pub async fn create(&self, value: Option<String>, city: Option<String>) -> AppResult<OtpRecord> {
        let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
        let city = city.map(|c| c.trim().to_string()).unwrap_or_default();

        if value.is_empty() || city.is_empty() {
            return Err(AppError::Validation(
                "OTP value and city are required".to_string(),
            ));
        }
        if !is_valid_otp_value(&value) {
            return Err(AppError::Validation(
                "OTP must be a 6-digit number".to_string(),
            ));
        }

        let otp = self
            .store
            .insert_otp(NewOtp {
                value,
                city,
                created_at: self.clock.now(),
            })
            .await?;

        info!(otp_id = %otp.id, city = %otp.city, "OTP issued");
        Ok(otp)
    }

    pub async fn list(&self, search: Option<&str>, page: PageRequest) -> AppResult<OtpListResponse> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        let (otps, total) = self.store.list_otps(search, page).await?;

        Ok(OtpListResponse {
            stats: OtpPageStats::from_page(&otps),
            otps,
            total,
            page: page.page,
            limit: page.limit,
            total_pages: page.total_pages(total),
        })
    }

    pub fn suggest_value(&self) -> String {
        self.crypto.generate_otp_code()
    }

    /// Existence and non-expiry check. Never mutates the record.
    #[instrument(skip(self, candidate))]
    pub async fn validate(&self, candidate: &str) -> AppResult<OtpRecord> {
        let candidate = required_otp(candidate)?;

        let otp = self
            .store
            .find_live_otp(candidate)
            .await?
            .ok_or_else(AppError::invalid_otp)?;

        if otp.is_stale(self.clock.now()) {
            warn!(otp_id = %otp.id, "stale OTP presented for validation");
            return Err(expired());
        }

        info!(otp_id = %otp.id, "OTP validated");
        Ok(otp)
    }

    /// Looks up a live OTP for use, sweeping it to expired once it is older
    /// than the retention window.
    pub async fn resolve_for_use(&self, candidate: &str) -> AppResult<OtpRecord> {
        let candidate = required_otp(candidate)?;

        let otp = self
            .store
            .find_live_otp(candidate)
            .await?
            .ok_or_else(AppError::invalid_otp)?;

        let now = self.clock.now();
        if otp.is_stale(now) {
            self.store.mark_otp_expired(otp.id, now).await?;
            warn!(otp_id = %otp.id, "OTP expired after retention window");
            return Err(expired());
        }

        Ok(otp)
    }

    /// Adds `session_minutes` to the OTP's cumulative read time.
    ///
    /// The ceiling check and increment happen atomically in the store; a
    /// refused increment leaves the record untouched.
    #[instrument(skip(self, candidate))]
    pub async fn accumulate(
        &self,
        candidate: &str,
        session_minutes: Option<f64>,
    ) -> AppResult<ReadTimeUpdate> {
        let delta = session_minutes.unwrap_or(DEFAULT_SESSION_MINUTES);
        if !delta.is_finite() || delta < 0.0 {
            return Err(AppError::Validation(
                "sessionMinutes must be a non-negative number".to_string(),
            ));
        }

        let otp = self.resolve_for_use(candidate).await?;
        let now = self.clock.now();

        match self
            .store
            .add_used_time(otp.id, delta, READ_TIME_CEILING_MINUTES, now)
            .await?
        {
            Some(updated) => {
                info!(
                    otp_id = %updated.id,
                    used = updated.used_minutes(),
                    "read time updated"
                );
                Ok(ReadTimeUpdate {
                    used_minutes: updated.used_minutes(),
                    remaining_minutes: updated.remaining_minutes(),
                    city: updated.city,
                })
            }
            None => {
                // Re-read so a concurrent winner is reflected in what we report.
                let current = self
                    .store
                    .get_otp(otp.id)
                    .await?
                    .ok_or_else(AppError::invalid_otp)?;
                if current.is_expired {
                    return Err(AppError::invalid_otp());
                }

                warn!(
                    otp_id = %current.id,
                    used = current.used_minutes(),
                    requested = delta,
                    "read time limit exceeded"
                );
                Err(AppError::TimeLimitExceeded {
                    remaining: current.remaining_minutes().max(0.0),
                })
            }
        }
    }
}

fn required_otp(candidate: &str) -> AppResult<&str> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return Err(AppError::Validation("OTP is required".to_string()));
    }
    Ok(candidate)
}

fn expired() -> AppError {
    AppError::Expired("OTP expired after 30 days".to_string())
}
