//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for login and logout, plus the password helpers
//! shared with account administration.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use translation_workflow_core::domain::{Identity, Role, UserAccount};
use translation_workflow_core::ports::{AccountStore, PortError, PortResult};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::state::{AppState, SessionState};

/// The account created at startup when the store is empty.
pub const BOOTSTRAP_ADMIN_USERNAME: &str = "admin";

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub username: String,
    pub role: String,
    /// False when no oracle API key is configured; workflow actions will fail.
    pub oracle_configured: bool,
}

//=========================================================================================
// Password and Account Helpers
//=========================================================================================

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            error!("Failed to parse password hash: {:?}", e);
            false
        }
    }
}

/// Resolves a username and password to an identity.
///
/// Unknown users and wrong passwords both surface as `PortError::Unauthorized`.
pub async fn authenticate(
    accounts: &dyn AccountStore,
    username: &str,
    password: &str,
) -> PortResult<Identity> {
    let account = match accounts.get_account(username).await {
        Ok(account) => account,
        Err(PortError::NotFound(_)) => {
            return Err(PortError::Unauthorized("Invalid username or password".to_string()))
        }
        Err(e) => return Err(e),
    };

    if !verify_password(password, &account.password_hash) {
        return Err(PortError::Unauthorized("Invalid username or password".to_string()));
    }

    Ok(Identity {
        username: account.username,
        role: account.role,
    })
}

/// Creates the bootstrap `admin` account when the store has no accounts at all.
/// Returns whether an account was created.
pub async fn ensure_admin_account(
    accounts: &dyn AccountStore,
    admin_password: Option<&str>,
) -> PortResult<bool> {
    if !accounts.list_accounts().await?.is_empty() {
        return Ok(false);
    }
    let Some(password) = admin_password else {
        warn!("The user database is empty and ADMIN_PASSWORD is not set; nobody can log in.");
        return Ok(false);
    };

    let password_hash =
        hash_password(password).map_err(|e| PortError::Unexpected(e.to_string()))?;
    accounts
        .create_account(UserAccount {
            username: BOOTSTRAP_ADMIN_USERNAME.to_string(),
            password_hash,
            role: Role::Admin,
        })
        .await?;
    info!("Created bootstrap account '{}'.", BOOTSTRAP_ADMIN_USERNAME);
    Ok(true)
}

/// The `Set-Cookie` value for a live session, re-issued on every authenticated response.
pub fn session_cookie(session_id: Uuid, timeout: Duration) -> String {
    format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        session_id,
        timeout.as_secs()
    )
}

fn role_name(role: Role) -> String {
    match role {
        Role::User => "user".to_string(),
        Role::Admin => "admin".to_string(),
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/login - Login with an existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Please enter username and password".to_string(),
        ));
    }

    // 1. Verify the credentials
    let identity = authenticate(state.accounts.as_ref(), username, &req.password)
        .await
        .map_err(|e| match e {
            PortError::Unauthorized(msg) => {
                warn!("Failed login attempt for {}", username);
                (StatusCode::UNAUTHORIZED, msg)
            }
            other => {
                error!("Failed to load account {}: {:?}", username, other);
                (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error".to_string())
            }
        })?;

    if !state.workflow.has_credential() {
        error!("No oracle API key is configured; translation actions will fail.");
    }

    // 2. Drop abandoned sessions, then open one with a fresh project
    let now = Utc::now().timestamp_millis();
    for expired in state
        .sessions
        .sweep_expired(now, state.config.session_timeout)
        .await
    {
        state
            .record_event(&expired.identity.username, "Session expired")
            .await;
        info!("Session for {} expired.", expired.identity.username);
    }
    let session = state.sessions.create(identity.clone()).await;
    state.record_event(&identity.username, "Logged in").await;
    info!("{} logged in.", identity.username);

    // 3. Create session cookie
    let cookie = session_cookie(session.id, state.config.session_timeout);

    let response = AuthResponse {
        username: identity.username,
        role: role_name(identity.role),
        oracle_configured: state.workflow.has_credential(),
    };

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(response)))
}

/// POST /auth/logout - Logout and discard the session's project
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
    Extension(session): Extension<Arc<SessionState>>,
) -> impl IntoResponse {
    state.sessions.remove(session.id).await;
    state
        .record_event(&session.identity.username, "Logged out")
        .await;
    info!("{} logged out.", session.identity.username);

    let cookie = "session=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0";
    (StatusCode::OK, [(header::SET_COOKIE, cookie.to_string())])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_verify_only_their_password() {
        let hash = hash_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("S3cret", &hash));
        assert!(!verify_password("s3cret", "not a phc string"));
    }
}
