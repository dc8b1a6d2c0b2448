pub mod admin;
pub mod auth;
pub mod gate;
pub mod media;
pub mod profiles;
pub mod saved;
pub mod session;
pub mod uploads;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, patch, post},
};

use stockroom_db::Database;
use stockroom_storage::Storage;

use crate::session::SessionKeys;

/// 50 MB upload limit for media files
pub const MAX_FILE_SIZE: usize = 50 * 1024 * 1024;

/// Every capability a handler may touch, constructed once at startup and
/// threaded through axum state, never retrieved from ambient scope.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub storage: Arc<Storage>,
    pub sessions: Arc<SessionKeys>,
}

/// The application router: all routes below pass through the request gate;
/// stored objects are served separately (outside the gate) by the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(media::home))
        .route("/login", get(auth::login_page))
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/media", get(media::list_assets))
        .route("/media/{id}", get(media::get_asset))
        .route("/media/{id}/save", post(saved::toggle_saved))
        .route("/saved", get(saved::list_saved))
        .route("/categories", get(media::list_categories))
        .route("/profile", get(profiles::get_profile))
        .route("/profile", patch(profiles::update_profile))
        .route("/profile/avatar", post(profiles::upload_avatar))
        .route("/admin", get(media::admin_dashboard))
        .route("/admin/assets", post(uploads::create_asset))
        .route("/admin/assets/{id}", patch(media::update_asset))
        .route("/admin/assets/{id}", delete(media::delete_asset))
        .layer(DefaultBodyLimit::max(MAX_FILE_SIZE + 1024 * 1024))
        .layer(middleware::from_fn_with_state(state.clone(), gate::request_gate))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
