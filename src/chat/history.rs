use axum::{
    debug_handler,
    extract::{Path, State},
    Json,
};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::db::{self, ConversationSummary, Message};
use crate::session::require_user;
use crate::AppResult;

/// GET /conversation/{peer_id} — full history with one peer, oldest first.
#[debug_handler(state = crate::AppState)]
pub async fn conversation(
    Path(peer_id): Path<String>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Vec<Message>>> {
    let user_id = require_user(&session).await?;
    let messages = db::conversation(&db_pool, &user_id, &peer_id).await?;
    Ok(Json(messages))
}

/// GET /conversations — last message and unread count per peer.
#[debug_handler(state = crate::AppState)]
pub async fn conversations(
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Vec<ConversationSummary>>> {
    let user_id = require_user(&session).await?;
    let summaries = db::conversation_summaries(&db_pool, &user_id).await?;
    Ok(Json(summaries))
}
