/**
 * Authentication Routes
 * Session sign-in with JWT access tokens and rotating refresh tokens
 */
use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Duration;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::identity::tokens::{generate_refresh_token, hash_refresh_token, REFRESH_TOKEN_EXPIRY_DAYS};
use crate::identity::{Claims, Identity, Session};
use crate::state::AppState;

lazy_static::lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(r"^\S+@\S+\.\S+$").unwrap();
}

// ============================================================================
// Types
// ============================================================================

/// User info returned to frontend
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Option<String>,
}

impl UserInfo {
    fn new(identity: Identity, role: Option<String>) -> Self {
        Self {
            uid: identity.uid,
            email: identity.email,
            display_name: identity.display_name,
            role,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    /// Field-scoped checks made before the identity backend is contacted.
    pub fn validate(&self) -> Result<(), AppError> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(AppError::validation("email", "Email is required"));
        }
        if !EMAIL_REGEX.is_match(email) {
            return Err(AppError::validation("email", "Email is invalid"));
        }
        if self.password.is_empty() {
            return Err(AppError::validation("password", "Password is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub user: UserInfo,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub success: bool,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

// ============================================================================
// Extractors
// ============================================================================

/// Extract bearer token from Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// A verified access token whose session is still signed in.
pub struct AuthSession {
    pub identity: Identity,
    pub session: Arc<Session>,
    pub claims: Claims,
}

impl AuthSession {
    fn resolve(headers: &HeaderMap, state: &AppState) -> Result<Self, AppError> {
        let token = extract_bearer_token(headers)
            .ok_or_else(|| AppError::Unauthenticated("Authorization required".to_string()))?;
        let claims = state
            .tokens
            .verify(token)
            .map_err(|_| AppError::Unauthenticated("Invalid or expired token".to_string()))?;

        let session = state
            .sessions
            .get(&claims.sid, state.clock.now())
            .ok_or_else(|| AppError::Unauthenticated("Session has ended".to_string()))?;
        let identity = session
            .current_user()
            .ok_or_else(|| AppError::Unauthenticated("Session has ended".to_string()))?;

        Ok(Self {
            identity,
            session,
            claims,
        })
    }
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Self::resolve(&parts.headers, state)
    }
}

/// Like [`AuthSession`] but never rejects; handlers decide what a missing
/// identity means.
pub struct MaybeSession(pub Option<AuthSession>);

impl MaybeSession {
    pub fn identity(&self) -> Option<&Identity> {
        self.0.as_ref().map(|s| &s.identity)
    }
}

impl FromRequestParts<AppState> for MaybeSession {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeSession(AuthSession::resolve(&parts.headers, state).ok()))
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let session = Arc::new(Session::new(state.identity.clone()));
    let identity = session.sign_in(payload.email.trim(), &payload.password).await?;

    let now = state.clock.now();
    let refresh_token = generate_refresh_token();
    state.sessions.register(
        session.clone(),
        hash_refresh_token(&refresh_token),
        now + Duration::days(REFRESH_TOKEN_EXPIRY_DAYS),
        now,
    );

    let access_token = state
        .tokens
        .issue(&identity, session.id(), now)
        .map_err(|e| AppError::Internal(format!("Failed to create access token: {}", e)))?;

    Ok((
        StatusCode::OK,
        Json(LoginResponse {
            success: true,
            user: UserInfo::new(identity, session.role()),
            access_token,
            refresh_token,
        }),
    ))
}

/// POST /api/auth/refresh
/// Issues a new access token and rotates the refresh token.
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.refresh_token.is_empty() {
        return Err(AppError::validation("refreshToken", "Refresh token is required"));
    }

    let now = state.clock.now();
    let session = state
        .sessions
        .find_by_refresh(&hash_refresh_token(&payload.refresh_token), now)
        .ok_or_else(|| AppError::Unauthenticated("Invalid or expired refresh token".to_string()))?;
    let identity = session
        .current_user()
        .ok_or_else(|| AppError::Unauthenticated("Session has ended".to_string()))?;

    let refresh_token = generate_refresh_token();
    state.sessions.rotate(
        session.id(),
        hash_refresh_token(&refresh_token),
        now + Duration::days(REFRESH_TOKEN_EXPIRY_DAYS),
    );
    let access_token = state
        .tokens
        .issue(&identity, session.id(), now)
        .map_err(|e| AppError::Internal(format!("Failed to create access token: {}", e)))?;

    Ok(Json(RefreshResponse {
        success: true,
        access_token,
        refresh_token,
    }))
}

/// POST /api/auth/logout
/// Signs out the session named by the refresh token or the bearer token.
/// Always succeeds.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let payload: LogoutRequest = serde_json::from_slice(&body).unwrap_or_default();
    let now = state.clock.now();

    let by_refresh = payload
        .refresh_token
        .filter(|t| !t.is_empty())
        .and_then(|t| state.sessions.find_by_refresh(&hash_refresh_token(&t), now));
    let by_bearer = extract_bearer_token(&headers)
        .and_then(|t| state.tokens.verify(t).ok())
        .and_then(|claims| state.sessions.get(&claims.sid, now));

    for session in by_refresh.into_iter().chain(by_bearer) {
        session.sign_out();
    }

    (StatusCode::OK, Json(LogoutResponse { success: true }))
}

/// GET /api/auth/me
pub async fn me(auth: AuthSession) -> impl IntoResponse {
    Json(UserInfo::new(auth.identity, auth.session.role()))
}
