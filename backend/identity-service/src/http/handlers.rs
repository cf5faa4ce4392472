/// Auth handlers - HTTP endpoints for the authority
use actix_middleware::AuthenticatedUser;
use actix_web::{web, HttpResponse};
use crypto_core::jwt::TokenPair;
use serde::Serialize;
use serde_json::json;
use tracing::info;
use validator::Validate;

use crate::error::Result;
use crate::models::{LoginRequest, RefreshTokenRequest, RegisterRequest, UpdateProfileRequest};
use crate::services::AuthService;

/// Token pair as returned to HTTP clients
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: &'static str,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        let expires_in = pair.expires_in();
        Self {
            access_token: pair.access.token,
            refresh_token: pair.refresh.token,
            expires_in,
            token_type: "Bearer",
        }
    }
}

pub async fn register(
    auth: web::Data<AuthService>,
    req: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    let user = auth.register(req.into_inner()).await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "User registered successfully",
        "user": user,
    })))
}

pub async fn login(
    auth: web::Data<AuthService>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    let pair = auth.login(req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(TokenResponse::from(pair)))
}

pub async fn refresh_token(
    auth: web::Data<AuthService>,
    req: web::Json<RefreshTokenRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let pair = auth.refresh_token(&req.refresh_token).await?;
    Ok(HttpResponse::Ok().json(TokenResponse::from(pair)))
}

pub async fn logout(
    auth: web::Data<AuthService>,
    user: AuthenticatedUser,
    req: web::Json<RefreshTokenRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let removed = auth.logout(&req.refresh_token).await?;
    info!(user_id = %user.user_id, removed, "Logout requested");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Logged out successfully",
    })))
}

pub async fn logout_all(
    auth: web::Data<AuthService>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    let removed = auth.logout_all(&user.token).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "sessions_removed": removed,
    })))
}

/// Resolved identity of the bearer, for callers verifying over HTTP
pub async fn verify(user: AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "valid": true,
        "user": user,
    }))
}

pub async fn get_profile(
    auth: web::Data<AuthService>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    let profile = auth.get_profile(user.user_id).await?;
    Ok(HttpResponse::Ok().json(profile))
}

pub async fn update_profile(
    auth: web::Data<AuthService>,
    user: AuthenticatedUser,
    req: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse> {
    let profile = auth.update_profile(user.user_id, req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(profile))
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}
