use actix_web::error::InternalError;
use actix_web::HttpResponse;
use serde_json::json;

/// Uniform 401 for every authentication failure; the cause is only logged.
pub(crate) fn unauthorized() -> actix_web::Error {
    InternalError::from_response(
        "unauthorized",
        HttpResponse::Unauthorized().json(json!({
            "error": "unauthorized",
            "message": "Invalid or expired token",
        })),
    )
    .into()
}

pub(crate) fn forbidden() -> actix_web::Error {
    InternalError::from_response(
        "forbidden",
        HttpResponse::Forbidden().json(json!({
            "error": "forbidden",
            "message": "Insufficient permissions",
        })),
    )
    .into()
}
