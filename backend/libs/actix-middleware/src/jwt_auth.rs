use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, AUTHORIZATION},
    Error, HttpMessage,
};
use futures::future::{ready, Ready};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::rejection::unauthorized;
use crate::verifier::{AuthFailure, TokenVerifier};

/// Upper bound on a single verification, local or remote.
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(3);

/// Pull the token out of `Authorization: Bearer <token>`.
///
/// The header must split on single spaces into exactly two parts with the
/// scheme `Bearer`.
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthFailure> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthFailure::MissingHeader)?
        .to_str()
        .map_err(|_| AuthFailure::MalformedHeader)?;

    let parts: Vec<&str> = value.split(' ').collect();
    match parts.as_slice() {
        ["Bearer", token] if !token.is_empty() => Ok(*token),
        _ => Err(AuthFailure::MalformedHeader),
    }
}

/// Perimeter guard
///
/// Resolves the bearer token through the configured `TokenVerifier` and
/// inserts `AuthenticatedUser` into request extensions. Any failure,
/// including a verifier that does not answer within the deadline, ends the
/// request with the same 401.
#[derive(Clone)]
pub struct JwtAuthMiddleware {
    verifier: Arc<dyn TokenVerifier>,
    verify_timeout: Duration,
}

impl JwtAuthMiddleware {
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            verifier,
            verify_timeout: DEFAULT_VERIFY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, verify_timeout: Duration) -> Self {
        self.verify_timeout = verify_timeout;
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = JwtAuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddlewareService {
            service: Rc::new(service),
            verifier: self.verifier.clone(),
            verify_timeout: self.verify_timeout,
        }))
    }
}

pub struct JwtAuthMiddlewareService<S> {
    service: Rc<S>,
    verifier: Arc<dyn TokenVerifier>,
    verify_timeout: Duration,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let verifier = self.verifier.clone();
        let verify_timeout = self.verify_timeout;

        Box::pin(async move {
            let token = match extract_bearer(req.headers()) {
                Ok(token) => token.to_string(),
                Err(failure) => {
                    tracing::warn!(path = %req.path(), reason = %failure, "Rejected request");
                    return Err(unauthorized());
                }
            };

            let user = match timeout(verify_timeout, verifier.verify(&token)).await {
                Ok(Ok(user)) => user,
                Ok(Err(failure)) => {
                    tracing::warn!(path = %req.path(), reason = %failure, "Token verification failed");
                    return Err(unauthorized());
                }
                Err(_) => {
                    tracing::warn!(
                        path = %req.path(),
                        timeout_ms = verify_timeout.as_millis() as u64,
                        "Token verification timed out, rejecting"
                    );
                    return Err(unauthorized());
                }
            };

            tracing::debug!(user_id = %user.user_id, role = %user.role, "Authenticated request");
            req.extensions_mut().insert(user);

            service.call(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        map
    }

    #[test]
    fn test_extract_bearer_ok() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_extract_bearer_rejects_bad_shapes() {
        for value in [
            "abc.def.ghi",
            "Basic abc",
            "bearer abc",
            "Bearer",
            "Bearer ",
            "Bearer a b",
            "Bearer  abc",
        ] {
            assert!(
                matches!(extract_bearer(&headers(value)), Err(AuthFailure::MalformedHeader)),
                "accepted {:?}",
                value
            );
        }
    }

    #[test]
    fn test_extract_bearer_missing() {
        assert!(matches!(
            extract_bearer(&HeaderMap::new()),
            Err(AuthFailure::MissingHeader)
        ));
    }
}
