//! services/api/src/web/admin.rs
//!
//! Account administration and access-log endpoints. Mounted behind
//! `require_auth` and `require_admin`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use translation_workflow_core::domain::{Role, UserAccount};
use translation_workflow_core::ports::PortError;
use utoipa::ToSchema;

use crate::web::auth::hash_password;
use crate::web::state::{AppState, SessionState};

/// The username admin actions are recorded under in the access log.
pub const ADMIN_EVENT_USER: &str = "ADMIN";

#[derive(Deserialize, ToSchema)]
pub struct AddUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub admin: bool,
}

#[derive(Serialize, ToSchema)]
pub struct UserSummary {
    pub username: String,
    pub role: String,
}

impl From<UserAccount> for UserSummary {
    fn from(account: UserAccount) -> Self {
        let role = match account.role {
            Role::Admin => "admin",
            Role::User => "user",
        };
        Self {
            username: account.username,
            role: role.to_string(),
        }
    }
}

fn internal(context: &str, e: PortError) -> (StatusCode, String) {
    error!("{}: {:?}", context, e);
    (StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
}

/// GET /admin/users - List every account
#[utoipa::path(
    get,
    path = "/admin/users",
    responses(
        (status = 200, description = "All accounts", body = [UserSummary]),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let accounts = state
        .accounts
        .list_accounts()
        .await
        .map_err(|e| internal("Failed to list users", e))?;
    let users: Vec<UserSummary> = accounts.into_iter().map(UserSummary::from).collect();
    Ok(Json(users))
}

/// POST /admin/users - Create an account
#[utoipa::path(
    post,
    path = "/admin/users",
    request_body = AddUserRequest,
    responses(
        (status = 201, description = "User created", body = UserSummary),
        (status = 400, description = "Username or password missing"),
        (status = 403, description = "Not an admin"),
        (status = 409, description = "Username already taken")
    )
)]
pub async fn add_user_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddUserRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let username = req.username.trim().to_string();
    if username.is_empty() || req.password.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Username and password cannot be empty".to_string(),
        ));
    }

    let password_hash = hash_password(&req.password).map_err(|e| {
        error!("Failed to hash password: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password".to_string())
    })?;
    let account = UserAccount {
        username: username.clone(),
        password_hash,
        role: if req.admin { Role::Admin } else { Role::User },
    };

    state
        .accounts
        .create_account(account.clone())
        .await
        .map_err(|e| match e {
            PortError::Conflict(_) => (
                StatusCode::CONFLICT,
                format!("User {} already exists", username),
            ),
            other => internal("Failed to create user", other),
        })?;

    state
        .record_event(ADMIN_EVENT_USER, &format!("Created new user: {}", username))
        .await;
    info!("Created user {}.", username);

    Ok((StatusCode::CREATED, Json(UserSummary::from(account))))
}

/// DELETE /admin/users/{username} - Remove an account
#[utoipa::path(
    delete,
    path = "/admin/users/{username}",
    params(
        ("username" = String, Path, description = "The account to delete.")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Admins cannot delete their own account"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "No such user")
    )
)]
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<SessionState>>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if username == session.identity.username {
        return Err((
            StatusCode::BAD_REQUEST,
            "You cannot delete the account you are logged in with".to_string(),
        ));
    }

    state
        .accounts
        .delete_account(&username)
        .await
        .map_err(|e| match e {
            PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            other => internal("Failed to delete user", other),
        })?;

    let ended = state.sessions.remove_user(&username).await;
    state
        .record_event(ADMIN_EVENT_USER, &format!("Deleted user: {}", username))
        .await;
    info!("Deleted user {} and ended {} live session(s).", username, ended);

    Ok(StatusCode::NO_CONTENT)
}

/// GET /admin/events - Read the parsed access log
#[utoipa::path(
    get,
    path = "/admin/events",
    responses(
        (status = 200, description = "Access events in the order they were recorded"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_events_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let events = state
        .events
        .read_events()
        .await
        .map_err(|e| internal("Failed to read the access log", e))?;
    Ok(Json(events))
}
