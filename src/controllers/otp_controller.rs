use actix_web::{web, HttpResponse};

use crate::{
    config::auth::AdminClaims,
    error::AppResult,
    models::{
        otp::{
            CreateOtpRequest, CreateOtpResponse, MinutesInput, OtpInput, OtpSummary,
            ReadTimeResponse, SuggestedOtpResponse, UpdateReadTimeRequest, ValidateOtpRequest,
            ValidateOtpResponse,
        },
        pagination::{PageQuery, PageRequest},
    },
    state::AppState,
};

pub struct OtpController;

fn otp_value(input: Option<OtpInput>) -> String {
    input.map(OtpInput::into_value).unwrap_or_default()
}

impl OtpController {
    pub async fn create(
        _admin: AdminClaims,
        state: web::Data<AppState>,
        request: web::Json<CreateOtpRequest>,
    ) -> AppResult<HttpResponse> {
        let request = request.into_inner();
        let otp = state
            .otp_service
            .create(request.value.map(OtpInput::into_value), request.city)
            .await?;

        Ok(HttpResponse::Created().json(CreateOtpResponse {
            message: "OTP created successfully".to_string(),
            otp: OtpSummary::from(&otp),
        }))
    }

    pub async fn list(
        _admin: AdminClaims,
        state: web::Data<AppState>,
        query: web::Query<PageQuery>,
    ) -> AppResult<HttpResponse> {
        let page = PageRequest::new(query.page, query.limit)?;
        let otps = state
            .otp_service
            .list(query.search.as_deref(), page)
            .await?;
        Ok(HttpResponse::Ok().json(otps))
    }

    pub async fn suggest(_admin: AdminClaims, state: web::Data<AppState>) -> HttpResponse {
        HttpResponse::Ok().json(SuggestedOtpResponse {
            value: state.otp_service.suggest_value(),
        })
    }

    pub async fn validate(
        state: web::Data<AppState>,
        request: web::Json<ValidateOtpRequest>,
    ) -> AppResult<HttpResponse> {
        let value = otp_value(request.into_inner().otp_value);
        let otp = state.otp_service.validate(&value).await?;

        Ok(HttpResponse::Ok().json(ValidateOtpResponse {
            message: "OTP validated successfully".to_string(),
            otp: otp.value,
            city: otp.city,
        }))
    }

    pub async fn update_read_time(
        state: web::Data<AppState>,
        request: web::Json<UpdateReadTimeRequest>,
    ) -> AppResult<HttpResponse> {
        let request = request.into_inner();
        let value = otp_value(request.otp_value);
        let session_minutes = request
            .session_minutes
            .map(MinutesInput::into_minutes)
            .transpose()?;
        let update = state
            .otp_service
            .accumulate(&value, session_minutes)
            .await?;

        Ok(HttpResponse::Ok().json(ReadTimeResponse {
            message: "Read time updated successfully".to_string(),
            used_time: update.used_minutes,
            remaining_time: update.remaining_minutes,
            city: update.city,
        }))
    }
}
