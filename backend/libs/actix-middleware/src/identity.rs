use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest};
use chrono::{DateTime, Utc};
use crypto_core::jwt::Claims;
use futures::future::{ready, Ready};
use serde::Serialize;
use uuid::Uuid;

use crate::rejection::unauthorized;

/// Caller identity resolved by `JwtAuthMiddleware`
///
/// Inserted into request extensions once per request; handlers take it as an
/// extractor argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
    pub permissions: Vec<String>,
    pub token_id: String,
    pub expires_at: DateTime<Utc>,
    /// Raw bearer token, for handlers that forward it downstream
    #[serde(skip)]
    pub token: String,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: Claims, token: impl Into<String>) -> Self {
        let expires_at = claims.expires_at();
        Self {
            user_id: claims.user_id,
            email: claims.email,
            role: claims.role,
            permissions: claims.permissions,
            token_id: claims.jti,
            expires_at,
            token: token.into(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(unauthorized())),
        }
    }
}
