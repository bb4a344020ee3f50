use std::sync::Arc;

use crate::{
    clock::Clock,
    config::{auth::JwtService, crypto::CryptoService},
    service::{admin_service::AdminService, otp_service::OtpService, report_service::ReportService},
    store::Store,
};

/// Shared by every handler through `web::Data`.
pub struct AppState {
    pub otp_service: OtpService,
    pub report_service: ReportService,
    pub admin_service: AdminService,
    pub jwt: JwtService,
}

impl AppState {
    pub fn new<S: Store + 'static>(store: Arc<S>, clock: Arc<dyn Clock>, jwt: JwtService) -> Self {
        let crypto = CryptoService;
        Self {
            otp_service: OtpService::new(store.clone(), crypto.clone(), clock.clone()),
            report_service: ReportService::new(store.clone(), clock.clone()),
            admin_service: AdminService::new(store, crypto, clock),
            jwt,
        }
    }
}
