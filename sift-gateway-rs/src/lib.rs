// sift-gateway-rs/src/lib.rs
//
// Gateway assembly
// Provides:
// - AppState: every shared subsystem behind one Arc
// - Analyzer selection (Gemini when a key is configured, else keyword)
// - Router construction with auth and rate limit middleware

pub mod auth;
pub mod auth_routes;
pub mod cache;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use sift_analyzer::{Analyzer, GeminiAnalyzer, GeminiConfig, KeywordAnalyzer};
use sift_auth::{connect_store, CredentialStore, TokenSigner};

use cache::ResultCache;
use config::GatewayConfig;
use rate_limit::RateLimitBackend;

/// Request body cap; analysis inputs are short.
pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

pub struct AppState {
    pub config: GatewayConfig,
    pub analyzer: Arc<dyn Analyzer>,
    pub cache: ResultCache,
    pub limiter: Arc<dyn RateLimitBackend>,
    pub store: Arc<dyn CredentialStore>,
    pub tokens: TokenSigner,
}

impl AppState {
    /// Wire every subsystem from configuration. Backends that need a
    /// network (Redis, PostgreSQL) degrade to in-memory equivalents
    /// when unreachable.
    pub async fn from_config(config: GatewayConfig) -> Self {
        let analyzer = build_analyzer(&config);
        let limiter = rate_limit::build_limiter(config.redis_url.as_deref()).await;
        let store = connect_store(config.database_url.as_deref()).await;
        let tokens = TokenSigner::new(&config.secret_key, config.token_ttl_secs());
        let cache = ResultCache::new(config.cache_max_size);
        Self {
            config,
            analyzer,
            cache,
            limiter,
            store,
            tokens,
        }
    }
}

pub fn build_analyzer(config: &GatewayConfig) -> Arc<dyn Analyzer> {
    match &config.gemini_api_key {
        Some(api_key) => Arc::new(GeminiAnalyzer::new(GeminiConfig {
            api_key: api_key.clone(),
            api_url: config.gemini_api_url.clone(),
            model: config.gemini_model.clone(),
            timeout: Duration::from_secs(config.analyzer_timeout_secs),
        })),
        None => {
            warn!("GEMINI_API_KEY is not set, using the offline keyword analyzer");
            Arc::new(KeywordAnalyzer::new())
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    // Outermost layer runs first: authentication resolves the caller,
    // then rate limiting charges the right budget.
    let api_routes = Router::new()
        .route("/analyze", post(routes::analyze))
        .route("/analyze/batch", post(routes::analyze_batch))
        .route("/stats", get(routes::stats))
        .route("/cache/flush", post(routes::flush_cache))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::authenticate,
        ));

    let account_routes = Router::new()
        .route("/register", post(auth_routes::register))
        .route("/token", post(auth_routes::token))
        .route("/login", post(auth_routes::login))
        .route("/me", get(auth_routes::me))
        .route(
            "/api-keys",
            post(auth_routes::create_key).get(auth_routes::list_keys),
        )
        .route("/api-keys/:key_id", delete(auth_routes::delete_key))
        .route("/api-keys/:key_id/revoke", post(auth_routes::revoke_key));

    Router::new()
        .route("/health", get(routes::health))
        .nest("/api", api_routes)
        .nest("/auth", account_routes)
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_PAYLOAD_SIZE))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
