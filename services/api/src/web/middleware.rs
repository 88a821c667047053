//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::error;

use crate::web::state::AppState;

/// Pulls the auth-session id out of the `Cookie` header, if present.
pub fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
}

/// Middleware that resolves the auth session cookie to a user profile.
///
/// The profile is fetched from the store - and created with the default
/// student role if this identity has never been seen before - then inserted
/// into request extensions for handlers to use. An invalid or missing
/// session yields 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // 1. Extract the auth-session id from the cookie.
    let auth_session_id =
        session_cookie(req.headers()).ok_or(StatusCode::UNAUTHORIZED)?.to_string();

    // 2. Resolve it with the identity provider.
    let auth_user = state
        .identity
        .resolve_auth_session(&auth_session_id)
        .await
        .map_err(|e| {
            error!("Failed to resolve auth session: {:?}", e);
            StatusCode::UNAUTHORIZED
        })?;

    // 3. Fetch (or lazily create) the profile for this identity.
    let profile = state
        .store
        .get_or_create_profile(auth_user.uid, &auth_user.email, &auth_user.display_name)
        .await
        .map_err(|e| {
            error!("Failed to load user profile: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    // 4. Insert the profile into request extensions.
    req.extensions_mut().insert(profile);

    // 5. Continue to the handler.
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn session_cookie_is_found_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=abc-123; lang=en"),
        );
        assert_eq!(session_cookie(&headers), Some("abc-123"));
    }

    #[test]
    fn missing_or_foreign_cookies_yield_none() {
        assert_eq!(session_cookie(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(session_cookie(&headers), None);
    }
}
