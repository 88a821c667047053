//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user signup, login, and logout.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::middleware::session_cookie;
use crate::web::state::AppState;
use attendance_core::ports::AuthUser;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub uid: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: String,
}

//=========================================================================================
// Helpers
//=========================================================================================

const AUTH_SESSION_DAYS: i64 = 30;

fn session_set_cookie(auth_session_id: &str) -> String {
    format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        auth_session_id,
        Duration::days(AUTH_SESSION_DAYS).num_seconds()
    )
}

/// Opens an auth session for `auth_user` and makes sure a profile exists
/// (first sign-ins get the default student profile here).
async fn establish_session(
    state: &AppState,
    auth_user: &AuthUser,
) -> Result<(String, AuthResponse), (StatusCode, String)> {
    let expires_at = Utc::now() + Duration::days(AUTH_SESSION_DAYS);
    let auth_session_id = state
        .identity
        .open_auth_session(auth_user.uid, expires_at)
        .await
        .map_err(|e| {
            error!("Failed to open auth session: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create session".to_string(),
            )
        })?;

    let profile = state
        .store
        .get_or_create_profile(auth_user.uid, &auth_user.email, &auth_user.display_name)
        .await
        .map_err(|e| {
            error!("Failed to load user profile: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load profile".to_string(),
            )
        })?;

    let response = AuthResponse {
        uid: profile.uid,
        email: profile.email,
        display_name: profile.display_name,
        role: profile.role.as_str().to_string(),
    };
    Ok((auth_session_id, response))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let auth_user = state
        .identity
        .register(&req.email, &req.password, &req.display_name)
        .await
        .map_err(|e| {
            error!("Failed to register user: {:?}", e);
            (
                StatusCode::BAD_REQUEST,
                "Failed to create account".to_string(),
            )
        })?;

    let (auth_session_id, response) = establish_session(&state, &auth_user).await?;

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, session_set_cookie(&auth_session_id))],
        Json(response),
    ))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let auth_user = state
        .identity
        .authenticate(&req.email, &req.password)
        .await
        .map_err(|_| {
            (
                StatusCode::UNAUTHORIZED,
                "Invalid email or password".to_string(),
            )
        })?;

    let (auth_session_id, response) = establish_session(&state, &auth_user).await?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, session_set_cookie(&auth_session_id))],
        Json(response),
    ))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let auth_session_id = session_cookie(&headers)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    state
        .identity
        .close_auth_session(auth_session_id)
        .await
        .map_err(|e| {
            error!("Failed to close auth session: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to logout".to_string(),
            )
        })?;

    // Clear the cookie.
    let cookie = "session=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0";

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie.to_string())]))
}
