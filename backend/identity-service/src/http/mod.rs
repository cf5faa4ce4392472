/// HTTP surface for browser and admin clients
///
/// Public routes live under `/api/v1`; session-bound routes sit behind the
/// perimeter guard, which resolves tokens through the authority itself so
/// revoked tokens are refused.
pub mod handlers;

use crate::error::IdentityError;
use crate::services::AuthService;
use actix_middleware::{JwtAuthMiddleware, TokenVerifier};
use actix_web::web;
use std::sync::Arc;

pub use handlers::TokenResponse;

/// Register every route on `cfg`.
///
/// Usage: `App::new().configure(|cfg| http::configure(cfg, auth.clone()))`
pub fn configure(cfg: &mut web::ServiceConfig, auth: Arc<AuthService>) {
    let verifier: Arc<dyn TokenVerifier> = auth.clone();
    let guard = JwtAuthMiddleware::new(verifier);

    cfg.app_data(web::Data::from(auth))
        .app_data(json_config())
        .route("/health", web::get().to(handlers::health))
        .service(
            web::scope("/api/v1")
                .route("/register", web::post().to(handlers::register))
                .route("/login", web::post().to(handlers::login))
                .route("/refresh-token", web::post().to(handlers::refresh_token))
                .service(
                    web::resource("/logout")
                        .wrap(guard.clone())
                        .route(web::post().to(handlers::logout)),
                )
                .service(
                    web::resource("/logout-all")
                        .wrap(guard.clone())
                        .route(web::post().to(handlers::logout_all)),
                )
                .service(
                    web::resource("/verify")
                        .wrap(guard.clone())
                        .route(web::get().to(handlers::verify)),
                )
                .service(
                    web::resource("/profile")
                        .wrap(guard)
                        .route(web::get().to(handlers::get_profile))
                        .route(web::put().to(handlers::update_profile)),
                ),
        );
}

/// Unparseable bodies get the same 400 shape as field violations
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        tracing::debug!(error = %err, "Rejected request body");
        IdentityError::validation("body", "invalid request body").into()
    })
}
