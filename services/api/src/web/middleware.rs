//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::web::auth::session_cookie;
use crate::web::state::{is_expired, AppState, SessionState};

/// Extracts the session id from a `Cookie` header value.
pub fn session_id_from_cookie(cookie_header: &str) -> Option<Uuid> {
    cookie_header
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
        .and_then(|id| Uuid::parse_str(id).ok())
}

/// Middleware that validates the session cookie and resolves it to a live session.
///
/// If valid, refreshes the session's activity and inserts the `SessionState` into
/// request extensions for handlers to use. A missing, unknown or expired session
/// returns 401 Unauthorized. Responses that set no cookie of their own get the
/// session cookie again with a fresh `Max-Age`.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // 1. Parse the session id from the cookie
    let session_id = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(session_id_from_cookie)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    // 2. Look up the live session
    let session = state
        .sessions
        .get(session_id)
        .await
        .ok_or(StatusCode::UNAUTHORIZED)?;

    // 3. Enforce the inactivity timeout
    let now = Utc::now().timestamp_millis();
    if is_expired(session.last_activity_millis(), now, state.config.session_timeout) {
        state.sessions.remove(session.id).await;
        state
            .record_event(&session.identity.username, "Session expired")
            .await;
        info!("Session for {} expired.", session.identity.username);
        return Err(StatusCode::UNAUTHORIZED);
    }
    session.touch(now);

    // 4. Insert the session into request extensions
    let session_id = session.id;
    req.extensions_mut().insert(session);

    let mut response = next.run(req).await;

    // 5. Slide the browser's cookie expiry along with the activity
    if !response.headers().contains_key(header::SET_COOKIE) {
        let cookie = session_cookie(session_id, state.config.session_timeout);
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
    }

    Ok(response)
}

/// Middleware for the admin routes. Must run after `require_auth`.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, StatusCode> {
    let session = req
        .extensions()
        .get::<Arc<SessionState>>()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !session.identity.is_admin() {
        warn!(
            "{} attempted to use an admin endpoint.",
            session.identity.username
        );
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_is_found_among_others() {
        let id = Uuid::new_v4();
        let header = format!("theme=dark; session={}; lang=pt", id);
        assert_eq!(session_id_from_cookie(&header), Some(id));
        assert_eq!(session_id_from_cookie("session=not-a-uuid"), None);
        assert_eq!(session_id_from_cookie("theme=dark"), None);
    }
}
