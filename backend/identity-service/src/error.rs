use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use crypto_core::jwt::TokenError;
use redis_utils::RedisOpError;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tonic::{Code, Status};

pub type Result<T> = std::result::Result<T, IdentityError>;

/// One rejected input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Every failure the authority can report. Transports map by kind.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Validation failed: {0:?}")]
    Validation(Vec<FieldViolation>),

    #[error("Email already exists")]
    AlreadyExists,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token: {0}")]
    TokenInvalid(TokenError),

    #[error("Token revoked")]
    TokenRevoked,

    #[error("Session not found")]
    SessionNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IdentityError {
    pub fn validation(field: &str, message: &str) -> Self {
        IdentityError::Validation(vec![FieldViolation::new(field, message)])
    }

    /// Message safe to show a caller. Authentication failures are generic;
    /// upstream and internal details stay in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            IdentityError::Validation(_) => "Validation failed",
            IdentityError::AlreadyExists => "Email already exists",
            IdentityError::InvalidCredentials => "Invalid credentials",
            IdentityError::TokenInvalid(_)
            | IdentityError::TokenRevoked
            | IdentityError::SessionNotFound => "Invalid or expired token",
            IdentityError::UserNotFound => "User not found",
            IdentityError::UpstreamUnavailable(_) => "Service temporarily unavailable",
            IdentityError::Internal(_) => "Internal server error",
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            IdentityError::Validation(_) => "validation_error",
            IdentityError::AlreadyExists => "already_exists",
            IdentityError::InvalidCredentials => "invalid_credentials",
            IdentityError::TokenInvalid(_)
            | IdentityError::TokenRevoked
            | IdentityError::SessionNotFound => "unauthorized",
            IdentityError::UserNotFound => "not_found",
            IdentityError::UpstreamUnavailable(_) => "unavailable",
            IdentityError::Internal(_) => "internal_error",
        }
    }

    /// Convert to gRPC Status for wire protocol
    pub fn to_status(&self) -> Status {
        let code = match self {
            IdentityError::Validation(_) => Code::InvalidArgument,
            IdentityError::AlreadyExists => Code::AlreadyExists,
            IdentityError::InvalidCredentials
            | IdentityError::TokenInvalid(_)
            | IdentityError::TokenRevoked
            | IdentityError::SessionNotFound => Code::Unauthenticated,
            IdentityError::UserNotFound => Code::NotFound,
            IdentityError::UpstreamUnavailable(_) => Code::Unavailable,
            IdentityError::Internal(_) => Code::Internal,
        };

        match self {
            IdentityError::Validation(violations) => {
                let detail = violations
                    .iter()
                    .map(|v| format!("{}: {}", v.field, v.message))
                    .collect::<Vec<_>>()
                    .join("; ");
                Status::new(code, detail)
            }
            other => Status::new(code, other.public_message()),
        }
    }
}

impl ResponseError for IdentityError {
    fn status_code(&self) -> StatusCode {
        match self {
            IdentityError::Validation(_) => StatusCode::BAD_REQUEST,
            IdentityError::AlreadyExists => StatusCode::CONFLICT,
            IdentityError::InvalidCredentials
            | IdentityError::TokenInvalid(_)
            | IdentityError::TokenRevoked
            | IdentityError::SessionNotFound => StatusCode::UNAUTHORIZED,
            IdentityError::UserNotFound => StatusCode::NOT_FOUND,
            IdentityError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            IdentityError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            IdentityError::Validation(violations) => json!({ "errors": violations }),
            other => json!({
                "error": other.kind(),
                "message": other.public_message(),
            }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

// Conversions from external error types
impl From<TokenError> for IdentityError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Encoding(_) | TokenError::WeakSecret => {
                tracing::error!("Token codec error: {}", err);
                IdentityError::Internal(err.to_string())
            }
            other => IdentityError::TokenInvalid(other),
        }
    }
}

impl From<sqlx::Error> for IdentityError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {}", err);
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Tls(_) => IdentityError::UpstreamUnavailable(err.to_string()),
            other => IdentityError::Internal(other.to_string()),
        }
    }
}

impl From<RedisOpError> for IdentityError {
    fn from(err: RedisOpError) -> Self {
        tracing::error!("Redis error: {}", err);
        IdentityError::UpstreamUnavailable(err.to_string())
    }
}

impl From<redis::RedisError> for IdentityError {
    fn from(err: redis::RedisError) -> Self {
        RedisOpError::from(err).into()
    }
}

impl From<validator::ValidationErrors> for IdentityError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut violations: Vec<FieldViolation> = err
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string());
                    FieldViolation::new(field.to_string(), message)
                })
            })
            .collect();
        violations.sort_by(|a, b| a.field.cmp(&b.field));
        IdentityError::Validation(violations)
    }
}

// gRPC Status conversion
impl From<IdentityError> for Status {
    fn from(err: IdentityError) -> Self {
        err.to_status()
    }
}
