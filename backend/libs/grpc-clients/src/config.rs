/// Authority endpoint configuration
///
/// Loaded from the environment by every service that verifies tokens
/// remotely. Missing variables fall back to development defaults.
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AuthClientConfig {
    /// Authority gRPC endpoint, e.g. `http://identity-service:8081`
    pub endpoint: String,

    /// TCP/HTTP2 connect timeout
    pub connect_timeout: Duration,

    /// Deadline for a single verification call
    pub request_timeout: Duration,
}

impl Default for AuthClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://identity-service:8081".to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(3),
        }
    }
}

impl AuthClientConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            endpoint: env::var("AUTH_SERVICE_URL").unwrap_or(defaults.endpoint),
            connect_timeout: env::var("AUTH_CONNECT_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.connect_timeout),
            request_timeout: env::var("AUTH_VERIFY_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_timeout),
        }
    }
}
