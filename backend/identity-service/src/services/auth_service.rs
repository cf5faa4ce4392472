/// Authority orchestration: registration, login, token validation, rotation
/// and logout over the credential store and the two Redis registries.
use crate::config::JwtSettings;
use crate::db::UserRepository;
use crate::error::{IdentityError, Result};
use crate::models::{
    LoginRequest, NewUser, ProfileUpdate, RegisterRequest, UpdateProfileRequest, User,
    UserSummary,
};
use crate::security::{PasswordHasherService, RevocationStore, SessionStore};
use actix_middleware::{AuthFailure, AuthenticatedUser, TokenVerifier};
use async_trait::async_trait;
use chrono::Utc;
use crypto_core::jwt::{Claims, TokenCodec, TokenKind, TokenPair, TokenSubject};
use crypto_core::Role;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

/// Access and refresh token lifetimes
#[derive(Debug, Clone, Copy)]
pub struct TokenLifetimes {
    pub access: chrono::Duration,
    pub refresh: chrono::Duration,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access: chrono::Duration::minutes(15),
            refresh: chrono::Duration::days(7),
        }
    }
}

impl From<&JwtSettings> for TokenLifetimes {
    fn from(settings: &JwtSettings) -> Self {
        Self {
            access: settings.access_ttl,
            refresh: settings.refresh_ttl,
        }
    }
}

fn to_std(duration: chrono::Duration) -> Duration {
    duration.to_std().unwrap_or(Duration::ZERO)
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionStore>,
    revocations: Arc<dyn RevocationStore>,
    codec: TokenCodec,
    hasher: PasswordHasherService,
    lifetimes: TokenLifetimes,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionStore>,
        revocations: Arc<dyn RevocationStore>,
        codec: TokenCodec,
        hasher: PasswordHasherService,
        lifetimes: TokenLifetimes,
    ) -> Self {
        Self {
            users,
            sessions,
            revocations,
            codec,
            hasher,
            lifetimes,
        }
    }

    pub fn lifetimes(&self) -> TokenLifetimes {
        self.lifetimes
    }

    /// Create a user account. No tokens are issued.
    pub async fn register(&self, mut req: RegisterRequest) -> Result<UserSummary> {
        req.email = req.email.trim().to_lowercase();
        req.full_name = req.full_name.trim().to_string();
        req.validate()?;

        let role = match req.role.as_deref() {
            Some(name) => name
                .parse::<Role>()
                .map_err(|_| IdentityError::validation("role", "unknown role"))?,
            None => Role::User,
        };

        if self.users.find_by_email(&req.email).await?.is_some() {
            return Err(IdentityError::AlreadyExists);
        }

        let password_hash = self.hasher.hash(&req.password)?;
        // The store's unique constraint settles races between concurrent registrations
        let user = self
            .users
            .create(NewUser {
                email: req.email,
                password_hash,
                full_name: req.full_name,
                role,
            })
            .await?;

        info!(user_id = %user.id, role = %user.role, "User registered");
        Ok(user.summary())
    }

    /// Check credentials and open a new session.
    ///
    /// Unknown email and wrong password fail identically, and both pay for
    /// one password verification.
    pub async fn login(&self, req: LoginRequest) -> Result<TokenPair> {
        req.validate()?;

        let email = req.email.trim().to_lowercase();
        let user = match self.users.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                self.hasher.verify_dummy(&req.password);
                warn!("Login failed: invalid credentials");
                return Err(IdentityError::InvalidCredentials);
            }
        };

        if !self.hasher.verify(&req.password, &user.password_hash)? {
            warn!(user_id = %user.id, "Login failed: invalid credentials");
            return Err(IdentityError::InvalidCredentials);
        }

        let pair = self.issue_pair(&user)?;
        self.sessions
            .save(user.id, &pair.refresh.claims.jti, to_std(self.lifetimes.refresh))
            .await?;

        info!(user_id = %user.id, "User logged in");
        Ok(pair)
    }

    /// Verify an access token and make sure it has not been revoked.
    pub async fn validate_token(&self, access_token: &str) -> Result<Claims> {
        let claims = self.codec.verify(access_token, TokenKind::Access)?;

        if self.revocations.is_revoked(&claims.jti).await? {
            return Err(IdentityError::TokenRevoked);
        }

        Ok(claims)
    }

    /// Exchange a refresh token for a new pair. Each refresh token rotates
    /// at most once.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = self.codec.verify(refresh_token, TokenKind::Refresh)?;

        if !self.sessions.exists(claims.user_id, &claims.jti).await? {
            warn!(user_id = %claims.user_id, "Refresh rejected: no session");
            return Err(IdentityError::SessionNotFound);
        }

        // Re-read so role changes and deletions take effect on rotation
        let user = self
            .users
            .find_by_id(claims.user_id)
            .await?
            .ok_or(IdentityError::UserNotFound)?;

        let pair = self.issue_pair(&user)?;
        let new_id = &pair.refresh.claims.jti;
        self.sessions
            .save(user.id, new_id, to_std(self.lifetimes.refresh))
            .await?;

        // Compare-and-delete: only the caller that removes the old record wins
        let removed = match self.sessions.delete(user.id, &claims.jti).await {
            Ok(removed) => removed,
            Err(e) => {
                self.discard_session(user.id, new_id).await;
                return Err(e);
            }
        };
        if !removed {
            self.discard_session(user.id, new_id).await;
            warn!(user_id = %user.id, "Refresh rejected: token already rotated");
            return Err(IdentityError::SessionNotFound);
        }

        info!(user_id = %user.id, "Tokens refreshed");
        Ok(pair)
    }

    /// Best-effort removal of a session no token will ever reach.
    async fn discard_session(&self, user_id: Uuid, refresh_id: &str) {
        if let Err(e) = self.sessions.delete(user_id, refresh_id).await {
            warn!(user_id = %user_id, error = %e, "Failed to drop unused session");
        }
    }

    /// End the session behind a refresh token.
    ///
    /// Returns whether a session was removed. The access token from the same
    /// login stays valid until it expires.
    pub async fn logout(&self, refresh_token: &str) -> Result<bool> {
        let claims = self.codec.verify(refresh_token, TokenKind::Refresh)?;
        let removed = self.sessions.delete(claims.user_id, &claims.jti).await?;

        info!(user_id = %claims.user_id, removed, "User logged out");
        Ok(removed)
    }

    /// End every session of the token's owner and revoke the presented
    /// access token.
    pub async fn logout_all(&self, access_token: &str) -> Result<u64> {
        let claims = self.validate_token(access_token).await?;
        let removed = self.sessions.delete_all(claims.user_id).await?;
        self.revoke_claims(&claims).await?;

        info!(user_id = %claims.user_id, removed, "User logged out everywhere");
        Ok(removed)
    }

    /// Invalidate an access token before its natural expiry.
    pub async fn revoke_access_token(&self, access_token: &str) -> Result<()> {
        let claims = self.codec.verify(access_token, TokenKind::Access)?;
        self.revoke_claims(&claims).await
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<UserSummary> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(|user| user.summary())
            .ok_or(IdentityError::UserNotFound)
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        mut req: UpdateProfileRequest,
    ) -> Result<UserSummary> {
        req.email = req.email.map(|e| e.trim().to_lowercase());
        req.full_name = req.full_name.map(|n| n.trim().to_string());
        req.validate()?;

        let update = ProfileUpdate {
            email: req.email,
            full_name: req.full_name,
        };
        if update.is_empty() {
            return self.get_profile(user_id).await;
        }

        let user = self.users.update_profile(user_id, update).await?;
        info!(user_id = %user.id, "Profile updated");
        Ok(user.summary())
    }

    fn issue_pair(&self, user: &User) -> Result<TokenPair> {
        let subject = TokenSubject::new(user.id, user.email.clone(), user.role.clone());
        Ok(self
            .codec
            .issue_pair(&subject, self.lifetimes.access, self.lifetimes.refresh)?)
    }

    async fn revoke_claims(&self, claims: &Claims) -> Result<()> {
        let ttl = to_std(claims.remaining_ttl(Utc::now()));
        self.revocations.revoke(&claims.jti, ttl).await
    }
}

/// Lets the authority guard its own HTTP routes with full revocation checks.
#[async_trait]
impl TokenVerifier for AuthService {
    async fn verify(&self, token: &str) -> std::result::Result<AuthenticatedUser, AuthFailure> {
        match self.validate_token(token).await {
            Ok(claims) => Ok(AuthenticatedUser::from_claims(claims, token)),
            Err(e @ (IdentityError::UpstreamUnavailable(_) | IdentityError::Internal(_))) => {
                Err(AuthFailure::Unavailable(e.to_string()))
            }
            Err(e) => Err(AuthFailure::Rejected(e.to_string())),
        }
    }
}
