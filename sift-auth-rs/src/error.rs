// sift-auth-rs/src/error.rs
//
// Error type shared by the credential store and token signer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Registration attempted with an email that already has an account.
    #[error("Email already registered")]
    EmailTaken,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("token signing failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}
