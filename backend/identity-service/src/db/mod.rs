/// Database operations for identity service
pub mod users;

pub use users::{InMemoryUserRepository, PgUserRepository, UserRepository};
