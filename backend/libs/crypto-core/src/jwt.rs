/// HS256 token codec for the portal services
///
/// Issues and verifies the two token kinds used across the platform:
/// short-lived access tokens and long-lived refresh tokens. Verification is
/// pure: it checks signature, validity window and kind, but never consults
/// the session or revocation registries.
///
/// ## Usage
///
/// ```rust
/// use chrono::Duration;
/// use crypto_core::jwt::{TokenCodec, TokenKind, TokenSubject};
/// use uuid::Uuid;
///
/// let codec = TokenCodec::new(b"0123456789abcdef0123456789abcdef").unwrap();
/// let subject = TokenSubject::new(Uuid::new_v4(), "a@x.com", "user");
/// let issued = codec.issue(&subject, TokenKind::Access, Duration::minutes(15)).unwrap();
/// let claims = codec.verify(&issued.token, TokenKind::Access).unwrap();
/// assert_eq!(claims.email, "a@x.com");
/// ```
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

use crate::roles::permissions_for;

/// Only HS256 is accepted; tokens signed with anything else are rejected.
const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

/// Minimum secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token signature is invalid")]
    SignatureInvalid,
    #[error("token has expired")]
    Expired,
    #[error("token is not yet valid")]
    NotYetValid,
    #[error("token kind mismatch: expected {expected}, got {actual}")]
    KindMismatch { expected: TokenKind, actual: TokenKind },
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("failed to encode token: {0}")]
    Encoding(String),
    #[error("JWT secret too short: need at least {MIN_SECRET_LEN} bytes")]
    WeakSecret,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claim set carried inside every token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
    /// Derived from `role` at issuance
    pub permissions: Vec<String>,
    pub token_type: TokenKind,
    /// Unique token id (UUIDv4)
    pub jti: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Lifetime left at `now`, zero once expired.
    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> Duration {
        let secs = self.exp - now.timestamp();
        Duration::seconds(secs.max(0))
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

/// Identity a token is issued for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
}

impl TokenSubject {
    pub fn new(user_id: Uuid, email: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
            role: role.into(),
        }
    }
}

/// A signed token together with the claims it carries
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

impl TokenPair {
    /// Seconds until the access token expires, counted from its issue time.
    pub fn expires_in(&self) -> i64 {
        self.access.claims.exp - self.access.claims.iat
    }
}

/// Stateless HS256 encoder/decoder
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Result<Self, TokenError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(TokenError::WeakSecret);
        }

        // exp / nbf are checked by hand in `verify_at` against an explicit clock
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::new();

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        })
    }

    pub fn issue(
        &self,
        subject: &TokenSubject,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<IssuedToken, TokenError> {
        self.issue_at(subject, kind, ttl, Utc::now())
    }

    /// Issue a token as if the current time were `now`. `ttl` may be negative.
    pub fn issue_at(
        &self,
        subject: &TokenSubject,
        kind: TokenKind,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let iat = now.timestamp();
        let claims = Claims {
            user_id: subject.user_id,
            email: subject.email.clone(),
            role: subject.role.clone(),
            permissions: permissions_for(&subject.role),
            token_type: kind,
            jti: Uuid::new_v4().to_string(),
            iat,
            nbf: iat,
            exp: iat + ttl.num_seconds(),
        };

        let token = encode(&Header::new(JWT_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;

        Ok(IssuedToken { token, claims })
    }

    /// Issue an access/refresh pair for the same subject.
    pub fn issue_pair(
        &self,
        subject: &TokenSubject,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Result<TokenPair, TokenError> {
        let now = Utc::now();
        Ok(TokenPair {
            access: self.issue_at(subject, TokenKind::Access, access_ttl, now)?,
            refresh: self.issue_at(subject, TokenKind::Refresh, refresh_ttl, now)?,
        })
    }

    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        self.verify_at(token, expected, Utc::now())
    }

    /// Verify signature, validity window and kind at `now`.
    ///
    /// A token is expired at exactly `exp`.
    pub fn verify_at(
        &self,
        token: &str,
        expected: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::SignatureInvalid
                }
                _ => TokenError::Malformed(e.to_string()),
            }
        })?;
        let claims = data.claims;
        let now = now.timestamp();

        if claims.exp <= now {
            return Err(TokenError::Expired);
        }
        if claims.nbf > now {
            return Err(TokenError::NotYetValid);
        }
        if claims.token_type != expected {
            return Err(TokenError::KindMismatch {
                expected,
                actual: claims.token_type,
            });
        }

        Ok(claims)
    }
}

// ============================================================================
// Tests
// ============================================================================
