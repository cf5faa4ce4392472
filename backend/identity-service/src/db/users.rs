/// Credential store for identity-service
use crate::error::{IdentityError, Result};
use crate::models::{NewUser, ProfileUpdate, User};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use sqlx::PgPool;
use uuid::Uuid;

/// Durable user records. Emails are stored and looked up lowercased.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user; `AlreadyExists` when the email is taken.
    async fn create(&self, new_user: NewUser) -> Result<User>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Apply the non-empty fields of `update`; `UserNotFound` for unknown ids.
    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<User>;
}

fn map_unique_violation(err: sqlx::Error) -> IdentityError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            IdentityError::AlreadyExists
        }
        _ => err.into(),
    }
}

/// PostgreSQL-backed repository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, new_user: NewUser) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, full_name, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING id, email, password_hash, full_name, role, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_user.email.to_lowercase())
        .bind(&new_user.password_hash)
        .bind(&new_user.full_name)
        .bind(new_user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, full_name, role, created_at, updated_at
            FROM users WHERE LOWER(email) = LOWER($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, full_name, role, created_at, updated_at
            FROM users WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email = COALESCE($2, email),
                full_name = COALESCE($3, full_name),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, password_hash, full_name, role, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(update.email.map(|e| e.to_lowercase()))
        .bind(update.full_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        user.ok_or(IdentityError::UserNotFound)
    }
}

/// In-process repository for tests and single-node development
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: DashMap<Uuid, User>,
    by_email: DashMap<String, Uuid>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a user, as an administrator deleting the account would.
    pub fn remove(&self, id: Uuid) -> Option<User> {
        let (_, user) = self.users.remove(&id)?;
        self.by_email.remove(&user.email);
        Some(user)
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, new_user: NewUser) -> Result<User> {
        let email = new_user.email.to_lowercase();
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.clone(),
            password_hash: new_user.password_hash,
            full_name: new_user.full_name,
            role: new_user.role.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };

        match self.by_email.entry(email) {
            Entry::Occupied(_) => return Err(IdentityError::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(user.id);
            }
        }
        self.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let id = match self.by_email.get(&email.to_lowercase()) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<User> {
        let current = self
            .users
            .get(&id)
            .map(|u| u.clone())
            .ok_or(IdentityError::UserNotFound)?;

        let mut updated = current.clone();
        if let Some(email) = update.email.map(|e| e.to_lowercase()) {
            if email != current.email {
                match self.by_email.entry(email.clone()) {
                    Entry::Occupied(_) => return Err(IdentityError::AlreadyExists),
                    Entry::Vacant(slot) => {
                        slot.insert(id);
                    }
                }
                self.by_email.remove(&current.email);
                updated.email = email;
            }
        }
        if let Some(full_name) = update.full_name {
            updated.full_name = full_name;
        }
        updated.updated_at = Utc::now();

        self.users.insert(id, updated.clone());
        Ok(updated)
    }
}
