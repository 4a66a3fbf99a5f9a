// sift-gateway-rs/src/config.rs
//
// Gateway configuration
// Everything is read from environment variables with working defaults,
// so a bare `sift-gateway` starts an offline development instance.

use std::env;
use std::fmt::Display;
use std::str::FromStr;

use tracing::warn;

use sift_analyzer::{DEFAULT_API_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};

const DEV_SECRET: &str = "default_secret_key_for_development_only";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Listen port.
    pub port: u16,
    /// Gemini API key; absent means the keyword fallback analyzer.
    pub gemini_api_key: Option<String>,
    pub gemini_api_url: String,
    pub gemini_model: String,
    pub analyzer_timeout_secs: u64,
    /// Requests per window for anonymous callers.
    pub rate_limit: u32,
    pub rate_window_secs: u64,
    /// Requests per window for authenticated callers.
    pub auth_rate_limit: u32,
    pub auth_rate_window_secs: u64,
    /// When set, unauthenticated analysis requests are rejected.
    pub api_key_required: bool,
    /// Operator key accepted for admin operations without a stored account.
    pub admin_api_key: Option<String>,
    pub admin_key_required: bool,
    /// Session token signing secret.
    pub secret_key: String,
    pub access_token_expire_minutes: u64,
    pub cache_max_size: usize,
    pub redis_url: Option<String>,
    pub database_url: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            gemini_api_key: None,
            gemini_api_url: DEFAULT_API_URL.to_string(),
            gemini_model: DEFAULT_MODEL.to_string(),
            analyzer_timeout_secs: DEFAULT_TIMEOUT_SECS,
            rate_limit: 100,
            rate_window_secs: 3600,
            auth_rate_limit: 1000,
            auth_rate_window_secs: 3600,
            api_key_required: false,
            admin_api_key: None,
            admin_key_required: true,
            secret_key: DEV_SECRET.to_string(),
            access_token_expire_minutes: 30,
            cache_max_size: 100,
            redis_url: None,
            database_url: None,
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let secret_key = match env_opt("SECRET_KEY") {
            Some(secret) => secret,
            None => {
                warn!("SECRET_KEY is not set, using the development default");
                defaults.secret_key
            }
        };

        Self {
            port: parse_env("PORT", defaults.port),
            gemini_api_key: env_opt("GEMINI_API_KEY"),
            gemini_api_url: env_opt("GEMINI_API_URL").unwrap_or(defaults.gemini_api_url),
            gemini_model: env_opt("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            analyzer_timeout_secs: parse_env(
                "ANALYZER_TIMEOUT_SECS",
                defaults.analyzer_timeout_secs,
            ),
            rate_limit: parse_env("RATE_LIMIT", defaults.rate_limit),
            rate_window_secs: parse_env("RATE_WINDOW", defaults.rate_window_secs),
            auth_rate_limit: parse_env("AUTH_RATE_LIMIT", defaults.auth_rate_limit),
            auth_rate_window_secs: parse_env("AUTH_RATE_WINDOW", defaults.auth_rate_window_secs),
            api_key_required: parse_env("API_KEY_REQUIRED", defaults.api_key_required),
            admin_api_key: env_opt("ADMIN_API_KEY"),
            admin_key_required: parse_env("ADMIN_KEY_REQUIRED", defaults.admin_key_required),
            secret_key,
            access_token_expire_minutes: parse_env(
                "ACCESS_TOKEN_EXPIRE_MINUTES",
                defaults.access_token_expire_minutes,
            ),
            cache_max_size: parse_env("CACHE_MAX_SIZE", defaults.cache_max_size),
            redis_url: env_opt("REDIS_URL"),
            database_url: env_opt("DATABASE_URL"),
        }
    }

    pub fn token_ttl_secs(&self) -> u64 {
        self.access_token_expire_minutes * 60
    }
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: FromStr + Display>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(
                    "invalid value {:?} for {}, using default {}",
                    raw, name, default
                );
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_an_offline_instance() {
        let config = GatewayConfig::default();
        assert_eq!(config.port, 8000);
        assert!(config.gemini_api_key.is_none());
        assert_eq!(config.rate_limit, 100);
        assert_eq!(config.auth_rate_limit, 1000);
        assert!(!config.api_key_required);
        assert!(config.admin_key_required);
        assert_eq!(config.token_ttl_secs(), 1800);
        assert_eq!(config.cache_max_size, 100);
    }

    #[test]
    fn environment_overrides_are_parsed() {
        env::set_var("RATE_LIMIT", "7");
        env::set_var("API_KEY_REQUIRED", "true");
        let config = GatewayConfig::from_env();
        assert_eq!(config.rate_limit, 7);
        assert!(config.api_key_required);
        env::remove_var("RATE_LIMIT");
        env::remove_var("API_KEY_REQUIRED");
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        env::set_var("CACHE_MAX_SIZE", "lots");
        let config = GatewayConfig::from_env();
        assert_eq!(config.cache_max_size, 100);
        env::remove_var("CACHE_MAX_SIZE");
    }

    #[test]
    fn blank_optionals_count_as_unset() {
        env::set_var("ADMIN_API_KEY", "   ");
        let config = GatewayConfig::from_env();
        assert!(config.admin_api_key.is_none());
        env::remove_var("ADMIN_API_KEY");
    }
}
