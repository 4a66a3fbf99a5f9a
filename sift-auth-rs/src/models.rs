// sift-auth-rs/src/models.rs
//
// Account and API key records
// Provides:
// - UserRecord: a registered account with a hashed password
// - ApiKeyRecord: a bearer credential owned by an account
// - API key generation with the service prefix

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix on every issued API key, so keys are recognizable in logs
/// and support tickets without revealing the secret part.
pub const KEY_PREFIX: &str = "sift_";

/// Account tier. Only `free` is assigned automatically; the others are
/// set by operators directly in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Pro,
    Enterprise,
}

impl Tier {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pro" => Tier::Pro,
            "enterprise" => Tier::Enterprise,
            _ => Tier::Free,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Free => write!(f, "free"),
            Tier::Pro => write!(f, "pro"),
            Tier::Enterprise => write!(f, "enterprise"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub tier: Tier,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            tier: Tier::Free,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub id: Uuid,
    pub key: String,
    pub name: String,
    pub user_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
    /// Named operations this key may perform beyond plain analysis.
    pub permissions: Vec<String>,
    /// Per-key request budget; None means the tier default applies.
    pub rate_limit: Option<i32>,
}

impl ApiKeyRecord {
    pub fn new(user_id: Uuid, name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            key: generate_key(),
            name: name.to_string(),
            user_id,
            is_active: true,
            created_at: Utc::now(),
            last_used: None,
            permissions: vec!["analyze".to_string()],
            rate_limit: None,
        }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

pub fn generate_key() -> String {
    format!("{}{}", KEY_PREFIX, Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_carry_prefix_and_are_unique() {
        let a = generate_key();
        let b = generate_key();
        assert!(a.starts_with(KEY_PREFIX));
        assert_eq!(a.len(), KEY_PREFIX.len() + 32);
        assert_ne!(a, b);
    }

    #[test]
    fn new_key_defaults() {
        let user = UserRecord::new("a@example.com".into(), "hash".into());
        let key = ApiKeyRecord::new(user.id, "Default");
        assert!(key.is_active);
        assert!(key.last_used.is_none());
        assert!(key.has_permission("analyze"));
        assert!(!key.has_permission("admin"));
        assert!(key.rate_limit.is_none());
    }

    #[test]
    fn new_user_starts_active_on_free_tier() {
        let user = UserRecord::new("a@example.com".into(), "hash".into());
        assert!(user.is_active);
        assert_eq!(user.tier, Tier::Free);
    }

    #[test]
    fn tier_parse_round_trips() {
        for tier in [Tier::Free, Tier::Pro, Tier::Enterprise] {
            assert_eq!(Tier::parse(&tier.to_string()), tier);
        }
        assert_eq!(Tier::parse("unknown"), Tier::Free);
    }
}
