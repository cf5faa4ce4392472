use std::time::Duration;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Status};
use tracing::debug;

use crate::config::AuthClientConfig;
use crate::proto::auth::auth_service_client::AuthServiceClient;
use crate::proto::auth::{ValidateTokenRequest, ValidateTokenResponse};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("{service} did not answer within {timeout:?}")]
    Timeout { service: String, timeout: Duration },

    #[error("{service} unavailable: {message}")]
    Unavailable { service: String, message: String },

    #[error("rejected by authority: {0}")]
    Unauthenticated(String),

    #[error("gRPC error {code:?}: {message}")]
    Rpc { code: Code, message: String },
}

impl From<Status> for ServiceError {
    fn from(status: Status) -> Self {
        match status.code() {
            Code::Unauthenticated => ServiceError::Unauthenticated(status.message().to_string()),
            Code::Unavailable | Code::DeadlineExceeded => ServiceError::Unavailable {
                service: SERVICE_NAME.to_string(),
                message: status.message().to_string(),
            },
            code => ServiceError::Rpc {
                code,
                message: status.message().to_string(),
            },
        }
    }
}

const SERVICE_NAME: &str = "identity-service";

/// Client for the authority's `AuthService`
///
/// The channel connects lazily on first use and is shared by clones, so one
/// `AuthClient` per process is enough. Every call runs under
/// `request_timeout`; a call that does not finish in time is dropped.
#[derive(Clone)]
pub struct AuthClient {
    channel: Channel,
    request_timeout: Duration,
}

impl AuthClient {
    pub fn new(config: &AuthClientConfig) -> Result<Self, ServiceError> {
        let channel = Endpoint::from_shared(config.endpoint.clone())
            .map_err(|e| ServiceError::InvalidEndpoint {
                endpoint: config.endpoint.clone(),
                reason: e.to_string(),
            })?
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .http2_keep_alive_interval(Duration::from_secs(60))
            .keep_alive_timeout(Duration::from_secs(20))
            .keep_alive_while_idle(true)
            .connect_lazy();

        Ok(Self::from_channel(channel, config.request_timeout))
    }

    pub fn from_channel(channel: Channel, request_timeout: Duration) -> Self {
        Self {
            channel,
            request_timeout,
        }
    }

    /// Raw generated client sharing this channel.
    pub fn client(&self) -> AuthServiceClient<Channel> {
        AuthServiceClient::new(self.channel.clone())
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Ask the authority whether an access token is currently valid.
    pub async fn validate_token(&self, token: &str) -> Result<ValidateTokenResponse, ServiceError> {
        let mut client = self.client();
        let request = ValidateTokenRequest {
            token: token.to_string(),
        };

        let response = tokio::time::timeout(self.request_timeout, client.validate_token(request))
            .await
            .map_err(|_| ServiceError::Timeout {
                service: SERVICE_NAME.to_string(),
                timeout: self.request_timeout,
            })??
            .into_inner();

        if !response.valid {
            debug!("authority answered valid=false without an error status");
            return Err(ServiceError::Unauthenticated("token not valid".to_string()));
        }

        Ok(response)
    }
}
