#![allow(dead_code)]

use async_trait::async_trait;
use crypto_core::jwt::TokenCodec;
use identity_service::config::PasswordSettings;
use identity_service::db::InMemoryUserRepository;
use identity_service::error::{IdentityError, Result};
use identity_service::models::{LoginRequest, RegisterRequest};
use identity_service::security::{
    InMemoryRevocationStore, InMemorySessionStore, PasswordHasherService, RevocationStore,
    SessionStore,
};
use identity_service::{AuthService, TokenLifetimes};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const SECRET: &[u8] = b"identity-test-secret-0123456789abcdef";
pub const PASSWORD: &str = "Passw0rd!";

/// In-memory collaborators, kept so tests can inspect or tamper with them
pub struct TestHarness {
    pub auth: Arc<AuthService>,
    pub users: Arc<InMemoryUserRepository>,
    pub sessions: Arc<InMemorySessionStore>,
    pub revocations: Arc<InMemoryRevocationStore>,
    pub codec: TokenCodec,
}

pub fn fast_hasher() -> PasswordHasherService {
    PasswordHasherService::new(PasswordSettings {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
    .expect("test hasher")
}

pub fn harness() -> TestHarness {
    harness_with_lifetimes(TokenLifetimes::default())
}

pub fn harness_with_lifetimes(lifetimes: TokenLifetimes) -> TestHarness {
    let users = Arc::new(InMemoryUserRepository::new());
    let sessions = Arc::new(InMemorySessionStore::new());
    let revocations = Arc::new(InMemoryRevocationStore::new());
    let codec = TokenCodec::new(SECRET).expect("test codec");

    let auth = Arc::new(AuthService::new(
        users.clone(),
        sessions.clone(),
        revocations.clone(),
        codec.clone(),
        fast_hasher(),
        lifetimes,
    ));

    TestHarness {
        auth,
        users,
        sessions,
        revocations,
        codec,
    }
}

/// Service whose Redis registries are both unreachable
pub fn harness_with_registry_outage() -> Arc<AuthService> {
    Arc::new(AuthService::new(
        Arc::new(InMemoryUserRepository::new()),
        Arc::new(UnreachableSessionStore),
        Arc::new(UnreachableRevocationStore),
        TokenCodec::new(SECRET).expect("test codec"),
        fast_hasher(),
        TokenLifetimes::default(),
    ))
}

/// Service over a session registry that can be told to fail its next write
pub fn harness_with_flaky_sessions() -> (TestHarness, Arc<FlakySessionStore>) {
    let users = Arc::new(InMemoryUserRepository::new());
    let sessions = Arc::new(InMemorySessionStore::new());
    let flaky = Arc::new(FlakySessionStore::new(sessions.clone()));
    let revocations = Arc::new(InMemoryRevocationStore::new());
    let codec = TokenCodec::new(SECRET).expect("test codec");

    let auth = Arc::new(AuthService::new(
        users.clone(),
        flaky.clone(),
        revocations.clone(),
        codec.clone(),
        fast_hasher(),
        TokenLifetimes::default(),
    ));

    let harness = TestHarness {
        auth,
        users,
        sessions,
        revocations,
        codec,
    };
    (harness, flaky)
}

pub fn register_request(email: &str, role: Option<&str>) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: PASSWORD.to_string(),
        full_name: "Test User".to_string(),
        role: role.map(str::to_string),
    }
}

pub fn login_request(email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    }
}

/// Every call fails the way a timed-out Redis round trip does
pub struct UnreachableSessionStore;

fn outage() -> IdentityError {
    IdentityError::UpstreamUnavailable("redis command timed out after 2s".into())
}

#[async_trait]
impl SessionStore for UnreachableSessionStore {
    async fn save(&self, _user_id: Uuid, _refresh_id: &str, _ttl: Duration) -> Result<()> {
        Err(outage())
    }

    async fn exists(&self, _user_id: Uuid, _refresh_id: &str) -> Result<bool> {
        Err(outage())
    }

    async fn delete(&self, _user_id: Uuid, _refresh_id: &str) -> Result<bool> {
        Err(outage())
    }

    async fn delete_all(&self, _user_id: Uuid) -> Result<u64> {
        Err(outage())
    }
}

pub struct UnreachableRevocationStore;

#[async_trait]
impl RevocationStore for UnreachableRevocationStore {
    async fn revoke(&self, _token_id: &str, _ttl: Duration) -> Result<()> {
        Err(outage())
    }

    async fn is_revoked(&self, _token_id: &str) -> Result<bool> {
        Err(outage())
    }
}

/// Delegates to an in-memory registry; each armed flag fails one call
pub struct FlakySessionStore {
    inner: Arc<InMemorySessionStore>,
    fail_next_save: AtomicBool,
    fail_next_delete: AtomicBool,
}

impl FlakySessionStore {
    pub fn new(inner: Arc<InMemorySessionStore>) -> Self {
        Self {
            inner,
            fail_next_save: AtomicBool::new(false),
            fail_next_delete: AtomicBool::new(false),
        }
    }

    pub fn fail_next_save(&self) {
        self.fail_next_save.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_delete(&self) {
        self.fail_next_delete.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionStore for FlakySessionStore {
    async fn save(&self, user_id: Uuid, refresh_id: &str, ttl: Duration) -> Result<()> {
        if self.fail_next_save.swap(false, Ordering::SeqCst) {
            return Err(outage());
        }
        self.inner.save(user_id, refresh_id, ttl).await
    }

    async fn exists(&self, user_id: Uuid, refresh_id: &str) -> Result<bool> {
        self.inner.exists(user_id, refresh_id).await
    }

    async fn delete(&self, user_id: Uuid, refresh_id: &str) -> Result<bool> {
        if self.fail_next_delete.swap(false, Ordering::SeqCst) {
            return Err(outage());
        }
        self.inner.delete(user_id, refresh_id).await
    }

    async fn delete_all(&self, user_id: Uuid) -> Result<u64> {
        self.inner.delete_all(user_id).await
    }
}
