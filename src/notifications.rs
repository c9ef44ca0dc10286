//! Durable notification records. The real-time path only fans notices out
//! (see `broadcast::broadcast_notification`); anything that should survive a
//! refresh is written here by the REST surface.

use axum::{
    debug_handler,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::db::{self, Notification};
use crate::session::require_user;
use crate::{AppResult, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list).post(create))
        .route("/notifications/read", post(mark_all_read))
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum NotificationKind {
    #[serde(rename = "like")]
    Like,
    #[serde(rename = "comment")]
    Comment,
    #[serde(rename = "friendRequest")]
    FriendRequest,
}

impl NotificationKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Comment => "comment",
            Self::FriendRequest => "friendRequest",
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBody {
    user_id: String,
    kind: NotificationKind,
    message: String,
    link: Option<String>,
}

/// POST /notifications — durable record; the session user is the actor.
#[debug_handler(state = crate::AppState)]
async fn create(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(body): Json<CreateBody>,
) -> AppResult<Json<Notification>> {
    let actor = require_user(&session).await?;
    let notification = Notification {
        id: Uuid::now_v7().to_string(),
        user_id: body.user_id,
        actor,
        kind: body.kind.as_str().to_owned(),
        message: body.message,
        link: body.link,
        is_read: false,
        timestamp: db::now_millis(),
    };
    db::insert_notification(&db_pool, &notification).await?;
    Ok(Json(notification))
}

/// GET /notifications — caller's notifications, newest first.
#[debug_handler(state = crate::AppState)]
async fn list(
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Vec<Notification>>> {
    let user_id = require_user(&session).await?;
    let notifications = db::notifications_for(&db_pool, &user_id).await?;
    Ok(Json(notifications))
}

/// POST /notifications/read — mark all of the caller's notifications read.
#[debug_handler(state = crate::AppState)]
async fn mark_all_read(
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Json<Value>> {
    let user_id = require_user(&session).await?;
    let updated = db::mark_notifications_read(&db_pool, &user_id).await?;
    Ok(Json(json!({ "updated": updated })))
}
