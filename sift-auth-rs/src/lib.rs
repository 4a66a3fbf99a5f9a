// sift-auth-rs/src/lib.rs
//
// Credentials for the sift gateway
// Provides:
// - Account and API key records
// - Argon2id password hashing
// - HS256 session tokens
// - Pluggable credential storage (in-memory, PostgreSQL)

pub mod error;
pub mod models;
pub mod password;
pub mod store;
pub mod token;

pub use error::AuthError;
pub use models::{generate_key, ApiKeyRecord, Tier, UserRecord, KEY_PREFIX};
pub use store::{
    connect_store, CredentialStore, InMemoryCredentialStore, PostgresCredentialStore,
};
pub use token::{Claims, TokenSigner};
