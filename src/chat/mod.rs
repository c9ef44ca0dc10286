mod history;
mod read;
mod send;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/conversation/{peer_id}", get(history::conversation))
        .route("/conversations", get(history::conversations))
        .route("/send", post(send::send))
        .route("/mark-read/{peer_id}", post(read::mark_read))
        .route("/unread-count/{peer_id}", get(read::unread_count))
}
