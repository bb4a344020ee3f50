use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    client::{
        api::{ApiError, ReadAccessApi},
        storage::{SessionStorage, StoredSession},
    },
    clock::Clock,
    models::{otp::READ_TIME_CEILING_MINUTES, report::GatedReportResponse},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoOtp,
    AwaitingValidation,
    Active,
    Suspended,
    Terminated,
}

/// Session-ending error seen by a background flush, tagged with its OTP.
type FlushOutcome = Arc<Mutex<Option<(String, ApiError)>>>;

/// Tracks one reader's OTP session and reports elapsed read time.
///
/// Lifecycle hooks (`on_hidden`, `on_visible`, `on_unload`) are called by the
/// host. Elapsed time is measured from the last flush point, so a flush never
/// reports the same interval twice, and at most one flush is in flight.
pub struct SessionController<A: ReadAccessApi, S: SessionStorage> {
    api: Arc<A>,
    storage: S,
    clock: Arc<dyn Clock>,
    state: SessionState,
    session: Option<StoredSession>,
    last_flush: Option<DateTime<Utc>>,
    pending: Option<JoinHandle<()>>,
    outcome: FlushOutcome,
}

impl<A: ReadAccessApi, S: SessionStorage> SessionController<A, S> {
    pub fn new(api: Arc<A>, storage: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            api,
            storage,
            clock,
            state: SessionState::NoOtp,
            session: None,
            last_flush: None,
            pending: None,
            outcome: Arc::new(Mutex::new(None)),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn otp(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.otp.as_str())
    }

    pub fn city(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.city.as_str())
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Resumes a stored session with a fresh flush point.
    pub fn restore(&mut self) -> bool {
        match self.storage.load() {
            Ok(Some(session)) => {
                info!(city = %session.city, "restored OTP session");
                self.session = Some(session);
                self.last_flush = Some(self.clock.now());
                self.state = SessionState::Active;
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "could not read stored session");
                false
            }
        }
    }

    /// Validates a candidate OTP and starts a session on success.
    pub async fn submit_otp(&mut self, candidate: &str) -> Result<String, ApiError> {
        if matches!(self.state, SessionState::Active | SessionState::Suspended) {
            self.flush();
        }
        self.state = SessionState::AwaitingValidation;

        match self.api.validate_otp(candidate.trim()).await {
            Ok(validated) => {
                let session = StoredSession {
                    otp: validated.otp,
                    city: validated.city.clone(),
                };
                if let Err(e) = self.storage.save(&session) {
                    warn!(error = %e, "could not persist OTP session");
                }
                self.session = Some(session);
                self.last_flush = Some(self.clock.now());
                self.state = SessionState::Active;
                info!(city = %validated.city, "OTP session started");
                Ok(validated.city)
            }
            Err(e) => {
                if e.ends_session() {
                    self.terminate();
                } else {
                    self.state = SessionState::NoOtp;
                }
                Err(e)
            }
        }
    }

    /// One page of reports for the session's city. Never touches the timer.
    pub async fn fetch_reports(
        &mut self,
        search: Option<&str>,
        page: u32,
        limit: u32,
    ) -> Result<GatedReportResponse, ApiError> {
        if let Some(e) = self.take_flush_outcome() {
            return Err(e);
        }
        let otp = self.otp().ok_or(ApiError::NoSession)?.to_string();

        let result = self.api.list_reports(&otp, search, page, limit).await;
        if let Err(e) = &result {
            if e.ends_session() {
                self.terminate();
            }
        }
        result
    }

    pub fn on_hidden(&mut self) {
        if self.state == SessionState::Active {
            self.flush();
            if self.state == SessionState::Active {
                self.state = SessionState::Suspended;
            }
        }
    }

    /// Back in view. The flush point is kept as is.
    pub fn on_visible(&mut self) {
        self.take_flush_outcome();
        if self.state == SessionState::Suspended {
            self.state = SessionState::Active;
        }
    }

    /// Navigation away or teardown.
    pub fn on_unload(&mut self) {
        if matches!(self.state, SessionState::Active | SessionState::Suspended) {
            self.flush();
            if self.state == SessionState::Active {
                self.state = SessionState::Suspended;
            }
        }
    }

    /// Sends whole elapsed minutes since the last flush point, if any.
    ///
    /// Returns whether a request was dispatched. The request runs detached;
    /// failures are logged, and a session-ending failure terminates the
    /// session the next time the controller is used.
    pub fn flush(&mut self) -> bool {
        if self.take_flush_outcome().is_some() {
            return false;
        }
        let (Some(session), Some(last_flush)) = (&self.session, self.last_flush) else {
            return false;
        };
        if self.pending.as_ref().is_some_and(|h| !h.is_finished()) {
            debug!("flush already in flight, skipping");
            return false;
        }

        let elapsed = (self.clock.now() - last_flush).num_minutes();
        if elapsed < 1 {
            return false;
        }
        let minutes = elapsed.min(READ_TIME_CEILING_MINUTES as i64);
        self.last_flush = Some(last_flush + Duration::minutes(minutes));

        let api = self.api.clone();
        let otp = session.otp.clone();
        let outcome = self.outcome.clone();
        self.pending = Some(tokio::spawn(async move {
            match api.update_read_time(&otp, minutes as f64).await {
                Ok(update) => debug!(
                    used = update.used_time,
                    remaining = update.remaining_time,
                    "read time flushed"
                ),
                Err(e) => {
                    warn!(error = %e, minutes, "read time flush failed");
                    if e.ends_session() {
                        *outcome.lock() = Some((otp, e));
                    }
                }
            }
        }));
        true
    }

    /// Waits for the in-flight flush, then applies its outcome.
    pub async fn join_pending_flush(&mut self) {
        if let Some(handle) = self.pending.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "flush task failed");
            }
        }
        self.take_flush_outcome();
    }

    /// Drops the session and its stored copy.
    pub fn terminate(&mut self) {
        if let Err(e) = self.storage.clear() {
            warn!(error = %e, "could not clear stored session");
        }
        self.session = None;
        self.last_flush = None;
        self.state = SessionState::Terminated;
    }

    fn take_flush_outcome(&mut self) -> Option<ApiError> {
        let (otp, error) = self.outcome.lock().take()?;
        if self.otp() != Some(otp.as_str()) {
            return None;
        }
        info!(error = %error, "session ended by read time flush");
        self.terminate();
        Some(error)
    }
}
