use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use crypto_core::jwt::{TokenCodec, TokenKind};
use grpc_clients::{AuthClient, ServiceError};
use std::sync::Arc;
use uuid::Uuid;

use crate::identity::AuthenticatedUser;

/// Why a request could not be authenticated. Never shown to the caller.
#[derive(Debug, thiserror::Error)]
pub enum AuthFailure {
    #[error("missing Authorization header")]
    MissingHeader,
    #[error("malformed Authorization header")]
    MalformedHeader,
    #[error("token rejected: {0}")]
    Rejected(String),
    #[error("verifier unavailable: {0}")]
    Unavailable(String),
}

/// Resolves a bearer token into a caller identity.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthFailure>;
}

/// Lookup into the shared revocation registry.
///
/// An `Err` means the registry could not answer; the guard fails closed.
#[async_trait]
pub trait RevocationCheck: Send + Sync {
    async fn is_revoked(&self, token_id: &str) -> Result<bool, String>;
}

/// Verifies tokens in-process with the shared signing secret.
///
/// Checks signature, validity window and kind. Without a revocation check,
/// revoked access tokens are accepted until they expire.
#[derive(Clone)]
pub struct LocalTokenVerifier {
    codec: TokenCodec,
    revocations: Option<Arc<dyn RevocationCheck>>,
}

impl LocalTokenVerifier {
    pub fn new(codec: TokenCodec) -> Self {
        Self {
            codec,
            revocations: None,
        }
    }

    pub fn with_revocation_check(mut self, revocations: Arc<dyn RevocationCheck>) -> Self {
        self.revocations = Some(revocations);
        self
    }
}

#[async_trait]
impl TokenVerifier for LocalTokenVerifier {
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthFailure> {
        let claims = self
            .codec
            .verify(token, TokenKind::Access)
            .map_err(|e| AuthFailure::Rejected(e.to_string()))?;

        if let Some(revocations) = &self.revocations {
            if revocations
                .is_revoked(&claims.jti)
                .await
                .map_err(AuthFailure::Unavailable)?
            {
                return Err(AuthFailure::Rejected("token revoked".into()));
            }
        }

        Ok(AuthenticatedUser::from_claims(claims, token))
    }
}

/// Delegates the decision to the authority over gRPC.
///
/// The client's request deadline bounds every call; timeouts and transport
/// errors are reported as `Unavailable`, which the guard turns into a 401.
#[derive(Clone)]
pub struct RemoteTokenVerifier {
    client: AuthClient,
}

impl RemoteTokenVerifier {
    pub fn new(client: AuthClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TokenVerifier for RemoteTokenVerifier {
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthFailure> {
        let response = self.client.validate_token(token).await.map_err(|e| match e {
            ServiceError::Unauthenticated(msg) => AuthFailure::Rejected(msg),
            other => AuthFailure::Unavailable(other.to_string()),
        })?;

        let user_id = Uuid::parse_str(&response.user_id)
            .map_err(|_| AuthFailure::Rejected("authority returned malformed user_id".into()))?;
        let expires_at = Utc
            .timestamp_opt(response.expires_at, 0)
            .single()
            .ok_or_else(|| AuthFailure::Rejected("authority returned bad expiry".into()))?;

        Ok(AuthenticatedUser {
            user_id,
            email: response.email,
            role: response.role,
            permissions: response.permissions,
            token_id: response.token_id,
            expires_at,
            token: token.to_string(),
        })
    }
}
