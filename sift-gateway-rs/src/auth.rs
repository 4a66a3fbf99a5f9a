// sift-gateway-rs/src/auth.rs
//
// Request authentication
// Resolves every API request to a Caller before rate limiting runs:
// - X-API-Key header, validated against the credential store
// - Authorization: Bearer session token
// - the configured operator key, accepted without a stored account
// - otherwise anonymous, identified by client address
// A presented credential that fails validation is always a 401, even
// when anonymous access would have been allowed.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{Extensions, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use tracing::{debug, warn};

use sift_auth::{ApiKeyRecord, UserRecord};

use crate::error::ApiError;
use crate::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Who is making this request. Inserted into request extensions by the
/// authentication middleware.
#[derive(Debug, Clone)]
pub enum Caller {
    /// Validated stored API key.
    ApiKey { record: ApiKeyRecord },
    /// Valid session token for an active account.
    Token { user: UserRecord },
    /// The operator key from configuration.
    Admin { key: String },
    /// No credential presented.
    Anonymous { addr: String },
}

impl Caller {
    pub fn unknown() -> Self {
        Caller::Anonymous {
            addr: "unknown".to_string(),
        }
    }

    /// Bucket key for rate limiting.
    pub fn limit_identifier(&self) -> String {
        match self {
            Caller::ApiKey { record } => format!("key:{}", record.key),
            Caller::Token { user } => format!("key:{}", user.id),
            Caller::Admin { key } => format!("key:{}", key),
            Caller::Anonymous { addr } => format!("ip:{}", addr),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Caller::Anonymous { .. })
    }

    /// Per-key budget override, when one is configured on the key.
    pub fn rate_limit_override(&self) -> Option<u32> {
        match self {
            Caller::ApiKey { record } => record
                .rate_limit
                .filter(|limit| *limit > 0)
                .map(|limit| limit as u32),
            _ => None,
        }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        match self {
            Caller::ApiKey { record } => record.has_permission(permission),
            Caller::Admin { .. } => true,
            _ => false,
        }
    }

    fn presented_key(&self) -> Option<&str> {
        match self {
            Caller::ApiKey { record } => Some(&record.key),
            Caller::Admin { key } => Some(key),
            _ => None,
        }
    }
}

pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let caller = resolve_caller(&state, request.headers(), request.extensions()).await?;
    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

async fn resolve_caller(
    state: &AppState,
    headers: &HeaderMap,
    extensions: &Extensions,
) -> Result<Caller, ApiError> {
    if let Some(raw_key) = header_value(headers, API_KEY_HEADER) {
        if state.config.admin_api_key.as_deref() == Some(raw_key) {
            return Ok(Caller::Admin {
                key: raw_key.to_string(),
            });
        }
        return match validate_api_key(state, raw_key).await {
            Some(record) => Ok(Caller::ApiKey { record }),
            None => Err(ApiError::Unauthorized("Invalid API key".to_string())),
        };
    }

    if let Some(token) = bearer_from_headers(headers) {
        return match validate_token(state, token).await {
            Some(user) => Ok(Caller::Token { user }),
            None => Err(ApiError::Unauthorized(
                "Invalid authentication credentials".to_string(),
            )),
        };
    }

    if state.config.api_key_required {
        return Err(ApiError::Unauthorized("API key required".to_string()));
    }

    Ok(Caller::Anonymous {
        addr: client_addr(headers, extensions),
    })
}

/// A key authenticates only while it and its owning account are both
/// active; anything else validates as absent. Lookup failures also
/// validate as absent, so store trouble can never admit a caller.
async fn validate_api_key(state: &AppState, raw_key: &str) -> Option<ApiKeyRecord> {
    let record = match state.store.key_by_value(raw_key).await {
        Ok(Some(record)) => record,
        Ok(None) => return None,
        Err(err) => {
            warn!("API key lookup failed: {}", err);
            return None;
        }
    };
    if !record.is_active {
        debug!("rejected deactivated API key");
        return None;
    }
    match state.store.user_by_id(record.user_id).await {
        Ok(Some(owner)) if owner.is_active => {}
        Ok(_) => {
            debug!("rejected API key of missing or deactivated account");
            return None;
        }
        Err(err) => {
            warn!("API key owner lookup failed: {}", err);
            return None;
        }
    }
    if let Err(err) = state.store.touch_key(record.id, Utc::now()).await {
        warn!("failed to update key last_used: {}", err);
    }
    Some(record)
}

async fn validate_token(state: &AppState, token: &str) -> Option<UserRecord> {
    let user_id = state.tokens.verify(token)?;
    match state.store.user_by_id(user_id).await {
        Ok(Some(user)) if user.is_active => Some(user),
        Ok(_) => None,
        Err(err) => {
            warn!("session account lookup failed: {}", err);
            None
        }
    }
}

/// Admin gate for privileged operations. Satisfied by the operator key
/// from configuration or a stored key carrying the admin permission.
pub fn require_admin(state: &AppState, caller: &Caller) -> Result<(), ApiError> {
    if !state.config.admin_key_required {
        return Ok(());
    }
    if let (Some(expected), Some(presented)) =
        (state.config.admin_api_key.as_deref(), caller.presented_key())
    {
        if expected == presented {
            return Ok(());
        }
    }
    if caller.has_permission("admin") {
        return Ok(());
    }
    Err(ApiError::Forbidden(
        "Admin API key required for this operation".to_string(),
    ))
}

pub fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

pub fn bearer_from_headers(headers: &HeaderMap) -> Option<&str> {
    let value = header_value(headers, "authorization")?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Client identity for anonymous callers: the first X-Forwarded-For
/// hop, then the socket address, then a shared "unknown" bucket.
fn client_addr(headers: &HeaderMap, extensions: &Extensions) -> String {
    if let Some(forwarded) = header_value(headers, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use uuid::Uuid;

    #[test]
    fn identifiers_separate_keys_from_addresses() {
        let user = UserRecord::new("a@example.com".into(), "hash".into());
        let record = ApiKeyRecord::new(user.id, "Default");
        let expected = format!("key:{}", record.key);
        assert_eq!(
            Caller::ApiKey { record }.limit_identifier(),
            expected
        );
        assert_eq!(
            Caller::Token { user: user.clone() }.limit_identifier(),
            format!("key:{}", user.id)
        );
        assert_eq!(
            Caller::Anonymous { addr: "1.2.3.4".into() }.limit_identifier(),
            "ip:1.2.3.4"
        );
    }

    #[test]
    fn override_ignores_non_positive_budgets() {
        let user_id = Uuid::new_v4();
        let mut record = ApiKeyRecord::new(user_id, "Default");
        record.rate_limit = Some(0);
        assert_eq!(Caller::ApiKey { record: record.clone() }.rate_limit_override(), None);
        record.rate_limit = Some(50);
        assert_eq!(Caller::ApiKey { record }.rate_limit_override(), Some(50));
        assert_eq!(Caller::unknown().rate_limit_override(), None);
    }

    #[test]
    fn admin_caller_holds_every_permission() {
        let admin = Caller::Admin { key: "op".into() };
        assert!(admin.has_permission("admin"));
        assert!(admin.has_permission("analyze"));
        assert!(!Caller::unknown().has_permission("analyze"));
    }

    #[test]
    fn bearer_parsing_requires_the_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_from_headers(&headers), Some("abc.def.ghi"));

        headers.insert("authorization", HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(bearer_from_headers(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_from_headers(&headers), None);
    }
}
