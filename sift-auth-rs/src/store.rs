// sift-auth-rs/src/store.rs
//
// Credential storage backend abstraction
// Provides:
// - Account and API key persistence behind one trait
// - In-memory implementation for development and tests
// - PostgreSQL implementation for production
// - A factory that retries the database and falls back to memory

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AuthError;
use crate::models::{ApiKeyRecord, Tier, UserRecord};

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Prepare the backend (create tables where that applies).
    async fn initialize(&self) -> Result<(), AuthError>;

    /// Insert a new account. Fails with `EmailTaken` when the email is
    /// already registered.
    async fn create_user(&self, user: &UserRecord) -> Result<(), AuthError>;

    async fn user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, AuthError>;

    async fn user_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError>;

    async fn insert_key(&self, key: &ApiKeyRecord) -> Result<(), AuthError>;

    /// Look up a key by its secret value, active or not.
    async fn key_by_value(&self, key: &str) -> Result<Option<ApiKeyRecord>, AuthError>;

    async fn keys_for_user(&self, user_id: Uuid) -> Result<Vec<ApiKeyRecord>, AuthError>;

    /// Record when a key was last used for authentication.
    async fn touch_key(&self, id: Uuid, when: DateTime<Utc>) -> Result<(), AuthError>;

    /// Deactivate a key without deleting it. Returns false when the key
    /// does not exist or belongs to another account.
    async fn revoke_key(&self, id: Uuid, user_id: Uuid) -> Result<bool, AuthError>;

    /// Remove a key permanently. Same ownership rule as `revoke_key`.
    async fn delete_key(&self, id: Uuid, user_id: Uuid) -> Result<bool, AuthError>;
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, UserRecord>,
    keys: HashMap<Uuid, ApiKeyRecord>,
}

/// Credential store held entirely in process memory. Contents are lost
/// on restart; intended for development and tests.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    inner: RwLock<MemoryState>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn initialize(&self) -> Result<(), AuthError> {
        Ok(())
    }

    async fn create_user(&self, user: &UserRecord) -> Result<(), AuthError> {
        let mut state = self.inner.write().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(AuthError::EmailTaken);
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, AuthError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        let state = self.inner.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn insert_key(&self, key: &ApiKeyRecord) -> Result<(), AuthError> {
        self.inner.write().await.keys.insert(key.id, key.clone());
        Ok(())
    }

    async fn key_by_value(&self, key: &str) -> Result<Option<ApiKeyRecord>, AuthError> {
        let state = self.inner.read().await;
        Ok(state.keys.values().find(|k| k.key == key).cloned())
    }

    async fn keys_for_user(&self, user_id: Uuid) -> Result<Vec<ApiKeyRecord>, AuthError> {
        let state = self.inner.read().await;
        let mut keys: Vec<ApiKeyRecord> = state
            .keys
            .values()
            .filter(|k| k.user_id == user_id)
            .cloned()
            .collect();
        keys.sort_by_key(|k| k.created_at);
        Ok(keys)
    }

    async fn touch_key(&self, id: Uuid, when: DateTime<Utc>) -> Result<(), AuthError> {
        if let Some(key) = self.inner.write().await.keys.get_mut(&id) {
            key.last_used = Some(when);
        }
        Ok(())
    }

    async fn revoke_key(&self, id: Uuid, user_id: Uuid) -> Result<bool, AuthError> {
        let mut state = self.inner.write().await;
        match state.keys.get_mut(&id) {
            Some(key) if key.user_id == user_id => {
                key.is_active = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_key(&self, id: Uuid, user_id: Uuid) -> Result<bool, AuthError> {
        let mut state = self.inner.write().await;
        match state.keys.get(&id) {
            Some(key) if key.user_id == user_id => {
                state.keys.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

// ---------------------------------------------------------------------------
// PostgreSQL backend
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    tier: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        UserRecord {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            tier: Tier::parse(&row.tier),
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct KeyRow {
    id: Uuid,
    key: String,
    name: String,
    user_id: Uuid,
    is_active: bool,
    created_at: DateTime<Utc>,
    last_used: Option<DateTime<Utc>>,
    permissions: Vec<String>,
    rate_limit: Option<i32>,
}

impl From<KeyRow> for ApiKeyRecord {
    fn from(row: KeyRow) -> Self {
        ApiKeyRecord {
            id: row.id,
            key: row.key,
            name: row.name,
            user_id: row.user_id,
            is_active: row.is_active,
            created_at: row.created_at,
            last_used: row.last_used,
            permissions: row.permissions,
            rate_limit: row.rate_limit,
        }
    }
}

pub struct PostgresCredentialStore {
    pool: sqlx::PgPool,
}

impl PostgresCredentialStore {
    pub async fn connect(database_url: &str) -> Result<Self, AuthError> {
        let pool = sqlx::PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    async fn initialize(&self) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                tier TEXT NOT NULL DEFAULT 'free',
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS api_keys (
                id UUID PRIMARY KEY,
                key TEXT UNIQUE NOT NULL,
                name TEXT NOT NULL,
                user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL,
                last_used TIMESTAMPTZ,
                permissions TEXT[] NOT NULL DEFAULT '{}',
                rate_limit INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_api_keys_user_id ON api_keys(user_id)")
            .execute(&self.pool)
            .await?;

        info!("credential tables ready");
        Ok(())
    }

    async fn create_user(&self, user: &UserRecord) -> Result<(), AuthError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, tier, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.tier.to_string())
        .bind(user.is_active)
        .bind(user.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(AuthError::EmailTaken)
            }
            Err(err) => Err(AuthError::Database(err)),
        }
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, tier, is_active, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(UserRecord::from))
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, tier, is_active, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(UserRecord::from))
    }

    async fn insert_key(&self, key: &ApiKeyRecord) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            INSERT INTO api_keys
                (id, key, name, user_id, is_active, created_at, last_used, permissions, rate_limit)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(key.id)
        .bind(&key.key)
        .bind(&key.name)
        .bind(key.user_id)
        .bind(key.is_active)
        .bind(key.created_at)
        .bind(key.last_used)
        .bind(&key.permissions)
        .bind(key.rate_limit)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn key_by_value(&self, key: &str) -> Result<Option<ApiKeyRecord>, AuthError> {
        let row = sqlx::query_as::<_, KeyRow>(
            r#"
            SELECT id, key, name, user_id, is_active, created_at, last_used, permissions, rate_limit
            FROM api_keys WHERE key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ApiKeyRecord::from))
    }

    async fn keys_for_user(&self, user_id: Uuid) -> Result<Vec<ApiKeyRecord>, AuthError> {
        let rows = sqlx::query_as::<_, KeyRow>(
            r#"
            SELECT id, key, name, user_id, is_active, created_at, last_used, permissions, rate_limit
            FROM api_keys WHERE user_id = $1 ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ApiKeyRecord::from).collect())
    }

    async fn touch_key(&self, id: Uuid, when: DateTime<Utc>) -> Result<(), AuthError> {
        sqlx::query("UPDATE api_keys SET last_used = $2 WHERE id = $1")
            .bind(id)
            .bind(when)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn revoke_key(&self, id: Uuid, user_id: Uuid) -> Result<bool, AuthError> {
        let result =
            sqlx::query("UPDATE api_keys SET is_active = FALSE WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_key(&self, id: Uuid, user_id: Uuid) -> Result<bool, AuthError> {
        let result = sqlx::query("DELETE FROM api_keys WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

const CONNECT_ATTEMPTS: u32 = 3;

/// Connect to the configured database, retrying with doubling delays.
/// Without a database URL, or once every attempt fails, the in-memory
/// store is used so the service still comes up.
pub async fn connect_store(database_url: Option<&str>) -> Arc<dyn CredentialStore> {
    if let Some(url) = database_url {
        let mut delay = Duration::from_secs(1);
        for attempt in 1..=CONNECT_ATTEMPTS {
            info!(
                "connecting to credential database (attempt {}/{})",
                attempt, CONNECT_ATTEMPTS
            );
            match PostgresCredentialStore::connect(url).await {
                Ok(store) => match store.initialize().await {
                    Ok(()) => {
                        info!("credential store ready (postgres)");
                        return Arc::new(store);
                    }
                    Err(err) => warn!("failed to initialize credential tables: {}", err),
                },
                Err(err) => warn!("credential database connection failed: {}", err),
            }
            if attempt < CONNECT_ATTEMPTS {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }
        warn!("credential database unreachable, falling back to in-memory store");
    }
    info!("credential store ready (in-memory)");
    Arc::new(InMemoryCredentialStore::new())
}
