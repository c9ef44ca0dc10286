use axum::{
    debug_handler,
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::db;
use crate::session::require_user;
use crate::AppResult;

/// POST /mark-read/{peer_id} — flip everything peer→caller to read.
#[debug_handler(state = crate::AppState)]
pub async fn mark_read(
    Path(peer_id): Path<String>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Value>> {
    let user_id = require_user(&session).await?;
    let updated = db::mark_read(&db_pool, &user_id, &peer_id).await?;
    Ok(Json(json!({ "updated": updated })))
}

/// GET /unread-count/{peer_id}
#[debug_handler(state = crate::AppState)]
pub async fn unread_count(
    Path(peer_id): Path<String>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Value>> {
    let user_id = require_user(&session).await?;
    let count = db::unread_count(&db_pool, &user_id, &peer_id).await?;
    Ok(Json(json!({ "count": count })))
}
