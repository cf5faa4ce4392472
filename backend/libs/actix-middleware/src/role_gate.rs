use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::{ready, Ready};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use crate::identity::AuthenticatedUser;
use crate::rejection::forbidden;

#[derive(Debug, Clone)]
enum Requirement {
    /// Role must be one of these; no hierarchy between roles
    AnyRole(Vec<String>),
    Permission(String),
}

impl Requirement {
    fn admits(&self, user: &AuthenticatedUser) -> bool {
        match self {
            Requirement::AnyRole(roles) => roles.iter().any(|r| user.has_role(r)),
            Requirement::Permission(permission) => user.has_permission(permission),
        }
    }
}

/// Per-route allow-list layered after `JwtAuthMiddleware`.
///
/// actix runs the last `.wrap()` first, so register the gate before the
/// guard:
///
/// ```ignore
/// web::scope("/admin")
///     .wrap(RoleGate::roles(["admin", "editor"]))
///     .wrap(JwtAuthMiddleware::new(verifier))
/// ```
///
/// Requests without a resolved identity are refused with 403.
#[derive(Debug, Clone)]
pub struct RoleGate {
    requirement: Requirement,
}

impl RoleGate {
    pub fn roles<I, R>(roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            requirement: Requirement::AnyRole(roles.into_iter().map(Into::into).collect()),
        }
    }

    pub fn permission(permission: impl Into<String>) -> Self {
        Self {
            requirement: Requirement::Permission(permission.into()),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RoleGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RoleGateService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RoleGateService {
            service: Rc::new(service),
            requirement: Rc::new(self.requirement.clone()),
        }))
    }
}

pub struct RoleGateService<S> {
    service: Rc<S>,
    requirement: Rc<Requirement>,
}

impl<S, B> Service<ServiceRequest> for RoleGateService<S>
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
        let requirement = self.requirement.clone();

        Box::pin(async move {
            let admitted = match req.extensions().get::<AuthenticatedUser>() {
                Some(user) => {
                    let ok = requirement.admits(user);
                    if !ok {
                        tracing::warn!(
                            user_id = %user.user_id,
                            role = %user.role,
                            path = %req.path(),
                            "Access denied by role gate"
                        );
                    }
                    ok
                }
                None => {
                    tracing::warn!(path = %req.path(), "Role gate reached without identity");
                    false
                }
            };

            if !admitted {
                return Err(forbidden());
            }

            service.call(req).await
        })
    }
}
