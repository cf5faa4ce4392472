//! gRPC client for the identity (authority) service
//!
//! Perimeter components use this crate to delegate token decisions to the
//! authority over the network:
//! - `config`: endpoint and deadline settings
//! - `auth_client`: lazily connected, time-bounded `AuthService` client

pub mod auth_client;
pub mod config;

pub use auth_client::{AuthClient, ServiceError};
pub use config::AuthClientConfig;

// Generated client stubs
pub mod proto {
    pub mod auth {
        tonic::include_proto!("portal.auth.v1");
    }
}
