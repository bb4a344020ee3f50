use actix_web::{
    error::{JsonPayloadError, PathError, QueryPayloadError},
    web, HttpRequest,
};
use tracing::warn;

use crate::{
    controllers::{
        admin_controller::AdminController, health_check, otp_controller::OtpController,
        report_controller::ReportController,
    },
    error::AppError,
};

// Extractor rejections go through `AppError` so every error body is JSON.
fn json_error(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    warn!(path = %req.path(), error = %err, "rejected request body");
    AppError::Validation(format!("Invalid request body: {err}")).into()
}

fn query_error(err: QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    warn!(path = %req.path(), error = %err, "rejected query string");
    AppError::Validation(format!("Invalid query: {err}")).into()
}

fn path_error(err: PathError, req: &HttpRequest) -> actix_web::Error {
    warn!(path = %req.path(), error = %err, "rejected path");
    AppError::Validation("Invalid id".to_string()).into()
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .app_data(web::PathConfig::default().error_handler(path_error))
        .route("/health", web::get().to(health_check))
        .route("/api/otp/create", web::post().to(OtpController::create))
        .route("/api/otp/get-by-filter", web::get().to(OtpController::list))
        .route("/api/otp/suggest", web::get().to(OtpController::suggest))
        .route("/api/otp/validate-otp", web::post().to(OtpController::validate))
        .route(
            "/api/otp/update-read-time",
            web::post().to(OtpController::update_read_time),
        )
        // Registered ahead of `/api/reports/{id}` so the literal segment wins.
        .route(
            "/api/reports/getByOtp",
            web::get().to(ReportController::list_by_otp),
        )
        .route("/api/reports", web::post().to(ReportController::submit))
        .route("/api/reports", web::get().to(ReportController::list))
        .route("/api/reports/{id}", web::get().to(ReportController::get))
        .route("/api/reports/{id}", web::put().to(ReportController::update))
        .route("/api/reports/{id}", web::delete().to(ReportController::delete))
        .route(
            "/api/reports/{id}/approve",
            web::patch().to(ReportController::approve),
        )
        .route("/api/admin/login", web::post().to(AdminController::login))
        .route("/api/admin", web::get().to(AdminController::list))
        .route("/api/admin", web::post().to(AdminController::create))
        .route("/api/admin/{id}", web::get().to(AdminController::get))
        .route("/api/admin/{id}", web::put().to(AdminController::update))
        .route("/api/admin/{id}", web::delete().to(AdminController::delete));
}
