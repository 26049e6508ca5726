pub mod admin;
pub mod auth;
pub mod middleware;
pub mod rest;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

pub use middleware::{require_admin, require_auth};
use state::AppState;

/// Uploads (source plus gold-standard documents) are capped per request.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Builds the API router: public login, session-protected project routes and
/// admin-only routes.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new().route("/auth/login", post(auth::login_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout_handler))
        .route(
            "/project",
            get(rest::get_project_handler).post(rest::start_project_handler),
        )
        .route("/project/translate", post(rest::translate_handler))
        .route(
            "/project/edit",
            post(rest::ai_edit_handler).put(rest::manual_edit_handler),
        )
        .route("/project/proofread", post(rest::proofread_handler))
        .route("/project/prompts/{kind}", put(rest::override_prompt_handler))
        .route("/project/model", put(rest::select_model_handler))
        .route("/project/download", get(rest::download_handler))
        .route("/project/archive", post(rest::archive_handler))
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Admin routes (auth and admin role required)
    let admin_routes = Router::new()
        .route(
            "/admin/users",
            get(admin::list_users_handler).post(admin::add_user_handler),
        )
        .route("/admin/users/{username}", delete(admin::delete_user_handler))
        .route("/admin/events", get(admin::list_events_handler))
        .route_layer(axum_middleware::from_fn(require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(app_state)
}
