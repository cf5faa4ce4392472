//! # Actix Middleware Library
//!
//! Request authentication for portal services running actix-web
//!
//! ## Modules
//! - `identity`: typed caller identity and its extractor
//! - `verifier`: local (codec) and remote (authority RPC) token verification
//! - `jwt_auth`: perimeter guard resolving the bearer token into an identity
//! - `role_gate`: per-route role / permission allow-lists

pub mod identity;
pub mod jwt_auth;
pub mod role_gate;
pub mod verifier;

mod rejection;

pub use identity::AuthenticatedUser;
pub use jwt_auth::{extract_bearer, JwtAuthMiddleware};
pub use role_gate::RoleGate;
pub use verifier::{
    AuthFailure, LocalTokenVerifier, RemoteTokenVerifier, RevocationCheck, TokenVerifier,
};
