use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::{
    config::auth::AdminClaims,
    error::AppResult,
    models::{
        pagination::PageRequest,
        report::{GatedReportQuery, NewReport, ReportListQuery, ReportMessage, UpdateReport},
    },
    state::AppState,
};

pub struct ReportController;

impl ReportController {
    pub async fn submit(
        state: web::Data<AppState>,
        report: web::Json<NewReport>,
    ) -> AppResult<HttpResponse> {
        let report = state.report_service.submit(report.into_inner()).await?;
        Ok(HttpResponse::Created().json(ReportMessage {
            message: "Report created".to_string(),
            report,
        }))
    }

    pub async fn list(
        _admin: AdminClaims,
        state: web::Data<AppState>,
        query: web::Query<ReportListQuery>,
    ) -> AppResult<HttpResponse> {
        let page = PageRequest::new(query.page, query.limit)?;
        let reports = state
            .report_service
            .list(query.status, query.search.as_deref(), page)
            .await?;
        Ok(HttpResponse::Ok().json(reports))
    }

    pub async fn list_by_otp(
        state: web::Data<AppState>,
        query: web::Query<GatedReportQuery>,
    ) -> AppResult<HttpResponse> {
        let page = PageRequest::new(query.page, query.limit)?;
        let reports = state
            .report_service
            .list_by_otp(
                &state.otp_service,
                query.otp.as_deref().unwrap_or_default(),
                query.search.as_deref(),
                page,
            )
            .await?;
        Ok(HttpResponse::Ok().json(reports))
    }

    pub async fn get(
        _admin: AdminClaims,
        state: web::Data<AppState>,
        id: web::Path<Uuid>,
    ) -> AppResult<HttpResponse> {
        let report = state.report_service.get(id.into_inner()).await?;
        Ok(HttpResponse::Ok().json(report))
    }

    pub async fn update(
        _admin: AdminClaims,
        state: web::Data<AppState>,
        id: web::Path<Uuid>,
        update: web::Json<UpdateReport>,
    ) -> AppResult<HttpResponse> {
        let report = state
            .report_service
            .update(id.into_inner(), update.into_inner())
            .await?;
        Ok(HttpResponse::Ok().json(ReportMessage {
            message: "Report updated successfully".to_string(),
            report,
        }))
    }

    pub async fn approve(
        _admin: AdminClaims,
        state: web::Data<AppState>,
        id: web::Path<Uuid>,
    ) -> AppResult<HttpResponse> {
        let report = state.report_service.approve(id.into_inner()).await?;
        Ok(HttpResponse::Ok().json(ReportMessage {
            message: "Report approved".to_string(),
            report,
        }))
    }

    pub async fn delete(
        _admin: AdminClaims,
        state: web::Data<AppState>,
        id: web::Path<Uuid>,
    ) -> AppResult<HttpResponse> {
        state.report_service.delete(id.into_inner()).await?;
        Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Deleted successfully"
        })))
    }
}
