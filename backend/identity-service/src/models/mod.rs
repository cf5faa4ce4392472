/// Data models for identity and authentication
pub mod requests;
pub mod user;

pub use requests::{LoginRequest, RefreshTokenRequest, RegisterRequest, UpdateProfileRequest};
pub use user::{NewUser, ProfileUpdate, User, UserSummary};
