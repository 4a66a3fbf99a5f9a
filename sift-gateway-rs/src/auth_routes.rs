// sift-gateway-rs/src/auth_routes.rs
//
// Account endpoints under /auth
// Provides:
// - POST /auth/register: create an account plus its default API key
// - POST /auth/token: OAuth2-style form login
// - POST /auth/login: JSON login, also sets the session cookie
// - GET  /auth/me: profile for the presented session token
// - POST/GET/DELETE /auth/api-keys: key management
// Login failures never say whether the email or the password was
// wrong.

use std::sync::Arc;

use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::extract::{Path, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use sift_auth::{password, ApiKeyRecord, Tier, UserRecord};

use crate::auth::bearer_from_headers;
use crate::error::ApiError;
use crate::AppState;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex"));

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// OAuth2 password-grant form: the email travels as `username`.
#[derive(Debug, Deserialize)]
pub struct TokenForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiKeyCreate {
    #[serde(default = "default_key_name")]
    pub name: String,
}

fn default_key_name() -> String {
    "Default".to_string()
}

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub tier: Tier,
    pub created_at: DateTime<Utc>,
    pub api_keys: Vec<String>,
}

impl UserProfile {
    fn from_parts(user: UserRecord, keys: Vec<ApiKeyRecord>) -> Self {
        Self {
            id: user.id,
            email: user.email,
            tier: user.tier,
            created_at: user.created_at,
            api_keys: keys.into_iter().map(|key| key.key).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiKeyView {
    pub id: Uuid,
    pub key: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
}

impl From<ApiKeyRecord> for ApiKeyView {
    fn from(record: ApiKeyRecord) -> Self {
        Self {
            id: record.id,
            key: record.key,
            name: record.name,
            is_active: record.is_active,
            created_at: record.created_at,
            last_used: record.last_used,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserProfile,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(bad_body)?;
    let email = payload.email.trim().to_lowercase();
    if !EMAIL.is_match(&email) {
        return Err(ApiError::BadRequest("Invalid email address".to_string()));
    }
    if payload.password.is_empty() {
        return Err(ApiError::BadRequest("Password must not be empty".to_string()));
    }

    let password_hash = password::hash_password(&payload.password)?;
    let user = UserRecord::new(email, password_hash);
    state.store.create_user(&user).await?;

    let key = ApiKeyRecord::new(user.id, "Default");
    state.store.insert_key(&key).await?;
    info!("registered account {}", user.id);

    Ok((
        StatusCode::CREATED,
        Json(UserProfile::from_parts(user, vec![key])),
    ))
}

pub async fn token(
    State(state): State<Arc<AppState>>,
    form: Result<Form<TokenForm>, FormRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Form(form) = form.map_err(|err| ApiError::BadRequest(err.body_text()))?;
    let response = login_flow(&state, &form.username, &form.password).await?;
    Ok(Json(response))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.map_err(bad_body)?;
    let body = login_flow(&state, &payload.email, &payload.password).await?;

    let cookie = format!(
        "access_token={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        body.access_token,
        state.tokens.ttl_secs()
    );
    let mut response = Json(body).into_response();
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            response.headers_mut().insert(SET_COOKIE, value);
        }
        Err(err) => warn!("failed to set session cookie: {}", err),
    }
    Ok(response)
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<UserProfile>, ApiError> {
    let user = current_user(&state, &headers).await?;
    let keys = state.store.keys_for_user(user.id).await?;
    Ok(Json(UserProfile::from_parts(user, keys)))
}

pub async fn create_key(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<ApiKeyCreate>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let user = current_user(&state, &headers).await?;
    let Json(payload) = payload.map_err(bad_body)?;
    let name = if payload.name.trim().is_empty() {
        default_key_name()
    } else {
        payload.name.trim().to_string()
    };

    let key = ApiKeyRecord::new(user.id, &name);
    state.store.insert_key(&key).await?;
    info!("issued API key {} for account {}", key.id, user.id);
    Ok((StatusCode::CREATED, Json(ApiKeyView::from(key))))
}

pub async fn list_keys(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ApiKeyView>>, ApiError> {
    let user = current_user(&state, &headers).await?;
    let keys = state.store.keys_for_user(user.id).await?;
    Ok(Json(keys.into_iter().map(ApiKeyView::from).collect()))
}

pub async fn revoke_key(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(key_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = current_user(&state, &headers).await?;
    if !state.store.revoke_key(key_id, user.id).await? {
        return Err(ApiError::NotFound("API key not found".to_string()));
    }
    info!("revoked API key {} for account {}", key_id, user.id);
    Ok(Json(json!({"status": "success", "message": "API key revoked"})))
}

pub async fn delete_key(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(key_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = current_user(&state, &headers).await?;
    if !state.store.delete_key(key_id, user.id).await? {
        return Err(ApiError::NotFound("API key not found".to_string()));
    }
    info!("deleted API key {} for account {}", key_id, user.id);
    Ok(Json(json!({"status": "success", "message": "API key deleted"})))
}

async fn login_flow(
    state: &AppState,
    email: &str,
    password_input: &str,
) -> Result<LoginResponse, ApiError> {
    let email = email.trim().to_lowercase();
    let user = match state.store.user_by_email(&email).await? {
        Some(user) if user.is_active => user,
        _ => return Err(bad_login()),
    };
    if !password::verify_password(password_input, &user.password_hash) {
        return Err(bad_login());
    }

    let access_token = state.tokens.issue(user.id)?;
    let keys = state.store.keys_for_user(user.id).await?;
    info!("account {} logged in", user.id);
    Ok(LoginResponse {
        access_token,
        token_type: "bearer".to_string(),
        user: UserProfile::from_parts(user, keys),
    })
}

/// Resolve the account behind a session token, denying on any doubt.
async fn current_user(state: &AppState, headers: &HeaderMap) -> Result<UserRecord, ApiError> {
    let token = bearer_from_headers(headers).ok_or_else(invalid_credentials)?;
    let user_id = state.tokens.verify(token).ok_or_else(invalid_credentials)?;
    match state.store.user_by_id(user_id).await {
        Ok(Some(user)) if user.is_active => Ok(user),
        Ok(_) => Err(invalid_credentials()),
        Err(err) => {
            warn!("session account lookup failed: {}", err);
            Err(invalid_credentials())
        }
    }
}

fn bad_body(rejection: JsonRejection) -> ApiError {
    ApiError::BadRequest(rejection.body_text())
}

fn bad_login() -> ApiError {
    ApiError::Unauthorized("Incorrect email or password".to_string())
}

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid authentication credentials".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_pattern_accepts_plausible_addresses() {
        for good in ["a@b.co", "first.last@example.com", "x+tag@sub.domain.org"] {
            assert!(EMAIL.is_match(good), "{good} should match");
        }
        for bad in ["", "plain", "a@b", "a b@c.com", "@example.com", "a@.com "] {
            assert!(!EMAIL.is_match(bad), "{bad} should not match");
        }
    }

    #[test]
    fn key_create_name_defaults() {
        let payload: ApiKeyCreate = serde_json::from_str("{}").unwrap();
        assert_eq!(payload.name, "Default");
        let payload: ApiKeyCreate = serde_json::from_str(r#"{"name": "ci"}"#).unwrap();
        assert_eq!(payload.name, "ci");
    }

    #[test]
    fn profile_exposes_key_strings_only() {
        let user = UserRecord::new("a@example.com".into(), "hash".into());
        let key = ApiKeyRecord::new(user.id, "Default");
        let expected = key.key.clone();
        let profile = UserProfile::from_parts(user, vec![key]);
        assert_eq!(profile.api_keys, vec![expected]);
        let value = serde_json::to_value(&profile).unwrap();
        assert!(value.get("password_hash").is_none());
        assert_eq!(value["tier"], "free");
    }
}
