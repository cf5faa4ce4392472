/// gRPC server implementation for identity-service
///
/// Implements the RPCs from auth_service.proto:
/// - Authentication: Register, Login, RefreshToken
/// - Token validation: ValidateToken
/// - Session teardown: Logout, LogoutAll
use crate::models;
use crate::services::AuthService;
use crypto_core::jwt::TokenPair;
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::warn;

// Import generated protobuf types
pub mod portal {
    pub mod auth {
        tonic::include_proto!("portal.auth.v1");
    }
}

use portal::auth::auth_service_server::AuthService as AuthServiceRpc;
use portal::auth::*;

/// Identity service gRPC server
#[derive(Clone)]
pub struct IdentityServiceServer {
    auth: Arc<AuthService>,
}

impl IdentityServiceServer {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self { auth }
    }
}

#[tonic::async_trait]
impl AuthServiceRpc for IdentityServiceServer {
    async fn register(
        &self,
        request: Request<RegisterRequest>,
    ) -> Result<Response<RegisterResponse>, Status> {
        let req = request.into_inner();
        let role = Some(req.role).filter(|r| !r.is_empty());

        let user = self
            .auth
            .register(models::RegisterRequest {
                email: req.email,
                password: req.password,
                full_name: req.full_name,
                role,
            })
            .await?;

        Ok(Response::new(RegisterResponse {
            user: Some(user_to_proto(&user)),
        }))
    }

    async fn login(
        &self,
        request: Request<LoginRequest>,
    ) -> Result<Response<TokenPairResponse>, Status> {
        let req = request.into_inner();
        let pair = self
            .auth
            .login(models::LoginRequest {
                email: req.email,
                password: req.password,
            })
            .await?;

        Ok(Response::new(pair_to_proto(&pair)))
    }

    async fn validate_token(
        &self,
        request: Request<ValidateTokenRequest>,
    ) -> Result<Response<ValidateTokenResponse>, Status> {
        let req = request.into_inner();
        if req.token.is_empty() {
            return Err(Status::unauthenticated("Invalid or expired token"));
        }

        let claims = self.auth.validate_token(&req.token).await.map_err(|e| {
            warn!(error = %e, "Token validation failed");
            Status::from(e)
        })?;

        Ok(Response::new(ValidateTokenResponse {
            valid: true,
            user_id: claims.user_id.to_string(),
            email: claims.email,
            role: claims.role,
            permissions: claims.permissions,
            expires_at: claims.exp,
            token_id: claims.jti,
        }))
    }

    async fn refresh_token(
        &self,
        request: Request<RefreshTokenRequest>,
    ) -> Result<Response<TokenPairResponse>, Status> {
        let req = request.into_inner();
        let pair = self.auth.refresh_token(&req.refresh_token).await?;

        Ok(Response::new(pair_to_proto(&pair)))
    }

    async fn logout(
        &self,
        request: Request<LogoutRequest>,
    ) -> Result<Response<LogoutResponse>, Status> {
        let req = request.into_inner();
        let removed = self.auth.logout(&req.refresh_token).await?;

        Ok(Response::new(LogoutResponse {
            success: true,
            sessions_removed: u64::from(removed),
        }))
    }

    async fn logout_all(
        &self,
        request: Request<LogoutAllRequest>,
    ) -> Result<Response<LogoutResponse>, Status> {
        let req = request.into_inner();
        let removed = self.auth.logout_all(&req.access_token).await?;

        Ok(Response::new(LogoutResponse {
            success: true,
            sessions_removed: removed,
        }))
    }
}

fn user_to_proto(user: &models::UserSummary) -> User {
    User {
        id: user.id.to_string(),
        email: user.email.clone(),
        full_name: user.full_name.clone(),
        role: user.role.clone(),
        created_at: user.created_at.timestamp(),
        updated_at: user.updated_at.timestamp(),
    }
}

fn pair_to_proto(pair: &TokenPair) -> TokenPairResponse {
    TokenPairResponse {
        access_token: pair.access.token.clone(),
        refresh_token: pair.refresh.token.clone(),
        expires_in: pair.expires_in(),
        token_type: "Bearer".to_string(),
    }
}
