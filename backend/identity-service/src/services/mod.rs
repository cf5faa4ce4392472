/// Service layer for identity-service
///
/// - Auth service: register, login, token validation, refresh rotation,
///   logout and profile management over the credential store and registries
pub mod auth_service;

pub use auth_service::{AuthService, TokenLifetimes};
