pub mod appresult;
pub mod auth;
pub mod authz;
pub mod config;
pub mod db;
pub mod index;
pub mod profiles;
pub mod res;
pub mod rooms;
pub mod session;
pub mod store;

use axum::{extract::FromRef, Router};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

pub use appresult::{AppError, AppResult};
use config::Listing;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub listing: Listing,
}

pub fn session_layer(minutes: i64, secure: bool) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_secure(secure)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(minutes)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(index::router())
        .merge(auth::router())
        .nest("/r", rooms::router())
        .nest("/m", rooms::message_router())
        .nest("/p", profiles::router())
}

pub fn app(state: AppState, sessions: SessionManagerLayer<MemoryStore>) -> Router {
    router()
        .with_state(state)
        .layer(sessions)
        .layer(TraceLayer::new_for_http())
}
