use actix_web::{cookie::Cookie, web, HttpResponse};
use uuid::Uuid;

use crate::{
    config::auth::{AdminClaims, ACCESS_COOKIE},
    error::AppResult,
    models::admin::{
        AdminMessage, AdminSearchQuery, LoginRequest, LoginResponse, NewAdmin, UpdateAdmin,
    },
    state::AppState,
};

pub struct AdminController;

impl AdminController {
    pub async fn login(
        state: web::Data<AppState>,
        request: web::Json<LoginRequest>,
    ) -> AppResult<HttpResponse> {
        let (admin, token) = state
            .admin_service
            .login(&request.email, &request.password, &state.jwt)
            .await?;

        let access_cookie = Cookie::build(ACCESS_COOKIE, token.clone())
            .http_only(true)
            .secure(true)
            .same_site(actix_web::cookie::SameSite::Lax)
            .max_age(time::Duration::minutes(state.jwt.ttl().num_minutes()))
            .finish();

        Ok(HttpResponse::Ok().cookie(access_cookie).json(LoginResponse {
            message: "Login successful".to_string(),
            token,
            admin,
        }))
    }

    pub async fn list(
        _admin: AdminClaims,
        state: web::Data<AppState>,
        query: web::Query<AdminSearchQuery>,
    ) -> AppResult<HttpResponse> {
        let admins = state.admin_service.list(query.search.as_deref()).await?;
        Ok(HttpResponse::Ok().json(admins))
    }

    pub async fn create(
        _admin: AdminClaims,
        state: web::Data<AppState>,
        request: web::Json<NewAdmin>,
    ) -> AppResult<HttpResponse> {
        let admin = state.admin_service.create(request.into_inner()).await?;
        Ok(HttpResponse::Created().json(AdminMessage {
            message: "Admin created successfully".to_string(),
            admin,
        }))
    }

    pub async fn get(
        _admin: AdminClaims,
        state: web::Data<AppState>,
        id: web::Path<Uuid>,
    ) -> AppResult<HttpResponse> {
        let admin = state.admin_service.get(id.into_inner()).await?;
        Ok(HttpResponse::Ok().json(admin))
    }

    pub async fn update(
        _admin: AdminClaims,
        state: web::Data<AppState>,
        id: web::Path<Uuid>,
        request: web::Json<UpdateAdmin>,
    ) -> AppResult<HttpResponse> {
        let admin = state
            .admin_service
            .update(id.into_inner(), request.into_inner())
            .await?;
        Ok(HttpResponse::Ok().json(AdminMessage {
            message: "Admin updated successfully".to_string(),
            admin,
        }))
    }

    pub async fn delete(
        _admin: AdminClaims,
        state: web::Data<AppState>,
        id: web::Path<Uuid>,
    ) -> AppResult<HttpResponse> {
        state.admin_service.delete(id.into_inner()).await?;
        Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Admin deleted successfully"
        })))
    }
}
