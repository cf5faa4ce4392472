/// Identity Service Library
///
/// Issues and validates session tokens for the portal and guards its own
/// HTTP surface with them.
///
/// ## Modules
///
/// - `config`: Service configuration
/// - `db`: Credential store (users)
/// - `error`: Error types and transport mappings
/// - `grpc`: gRPC server implementation
/// - `http`: actix-web routes and handlers
/// - `models`: Data models and request DTOs
/// - `security`: Password hashing, session and revocation registries
/// - `services`: Authority orchestration
/// - `validators`: Input validation
pub mod config;
pub mod db;
pub mod error;
pub mod grpc;
pub mod http;
pub mod models;
pub mod security;
pub mod services;
pub mod validators;

// Re-export commonly used types
pub use error::{IdentityError, Result};
pub use grpc::IdentityServiceServer;
pub use services::{AuthService, TokenLifetimes};
