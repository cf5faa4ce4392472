/// Security module for authentication and authorization
///
/// Provides core security primitives for identity-service:
/// - Password hashing and verification (Argon2id)
/// - Refresh-token session registry (Redis)
/// - Access token revocation registry (Redis)
///
/// Token encoding itself lives in `crypto_core::jwt`.
pub use crypto_core::jwt;
pub use crypto_core::jwt::{Claims, TokenCodec, TokenKind, TokenPair};

pub mod password;
pub mod session_store;
pub mod token_revocation;

pub use password::PasswordHasherService;
pub use session_store::{InMemorySessionStore, RedisSessionStore, SessionStore};
pub use token_revocation::{InMemoryRevocationStore, RedisRevocationStore, RevocationStore};
