pub mod appresult;
pub mod broadcast;
pub mod chat;
pub mod db;
pub mod identity;
pub mod notifications;
pub mod presence;
pub mod relay;
pub mod rooms;
pub mod session;
pub mod ws;

pub use appresult::{AppError, AppResult};

use axum::{extract::FromRef, Router};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

use broadcast::EventBus;
use presence::Presence;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub events: EventBus,
    pub presence: Presence,
}

impl AppState {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self {
            db_pool,
            events: broadcast::new_event_bus(256),
            presence: Presence::new(),
        }
    }
}

/// Full application: REST surface, notification records, identity session and
/// the WebSocket transport, with the session and CORS layers applied.
pub fn app(state: AppState) -> Router {
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(30)));

    Router::new()
        .merge(identity::router())
        .merge(chat::router())
        .merge(notifications::router())
        .merge(ws::router())
        .with_state(state)
        .layer(session_layer)
        .layer(CorsLayer::permissive())
}
