use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{error::AppError, models::admin::Admin, state::AppState};

pub const ACCESS_COOKIE: &str = "access_token";
pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub role: String,
    pub exp: usize,
}

/// Issues and verifies admin bearer tokens.
#[derive(Clone)]
pub struct JwtService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtService {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, admin: &Admin) -> Result<String, AppError> {
        let claims = Claims {
            sub: admin.id.to_string(),
            username: admin.username.clone(),
            role: ADMIN_ROLE.to_string(),
            exp: (Utc::now() + self.ttl).timestamp() as usize,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                warn!(error = %e, "rejected admin token");
                AppError::Forbidden("Invalid token".to_string())
            })
    }
}

/// Extractor guarding admin-only handlers.
///
/// Reads `Authorization: Bearer <token>` first, then the `access_token` cookie.
#[derive(Debug, Clone)]
pub struct AdminClaims(pub Claims);

fn bearer_token(req: &HttpRequest) -> Result<Option<String>, AppError> {
    let Some(value) = req.headers().get(header::AUTHORIZATION) else {
        return Ok(req.cookie(ACCESS_COOKIE).map(|c| c.value().to_string()));
    };

    let value = value
        .to_str()
        .map_err(|_| AppError::Unauthorized("Malformed token".to_string()))?;
    match value.split_once(' ') {
        Some((_, token)) if !token.trim().is_empty() => Ok(Some(token.trim().to_string())),
        _ => Err(AppError::Unauthorized("Malformed token".to_string())),
    }
}

fn authorize(req: &HttpRequest) -> Result<AdminClaims, AppError> {
    let token = bearer_token(req)?
        .ok_or_else(|| AppError::Unauthorized("Missing auth token".to_string()))?;

    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("application state missing".to_string()))?;

    let claims = state.jwt.verify(&token)?;
    if claims.role != ADMIN_ROLE {
        return Err(AppError::Forbidden("Admin only".to_string()));
    }

    Ok(AdminClaims(claims))
}

impl FromRequest for AdminClaims {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authorize(req))
    }
}
