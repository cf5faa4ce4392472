//! Token primitives shared by the portal services.
//!
//! - `jwt`: HS256 token codec (issue / verify access and refresh tokens)
//! - `roles`: the role catalogue and its static permission table

pub mod jwt;
pub mod roles;

pub use jwt::{Claims, IssuedToken, TokenCodec, TokenError, TokenKind, TokenPair, TokenSubject};
pub use roles::{permissions_for, Role};
