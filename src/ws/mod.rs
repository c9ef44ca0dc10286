mod conn;
pub mod protocol;

use axum::{routing::get, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(conn::upgrade))
}
