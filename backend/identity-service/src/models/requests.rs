use crate::validators::{validate_email_shape, validate_password_policy, validate_role_name};
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(custom(function = "validate_email_shape"))]
    pub email: String,
    #[validate(custom(function = "validate_password_policy"))]
    pub password: String,
    #[validate(length(min = 2, max = 100, message = "full name must be 2-100 characters"))]
    pub full_name: String,
    /// Defaults to `user`
    #[validate(custom(function = "validate_role_name"))]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "refresh_token is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(custom(function = "validate_email_shape"))]
    pub email: Option<String>,
    #[validate(length(min = 2, max = 100, message = "full name must be 2-100 characters"))]
    pub full_name: Option<String>,
}
