//! Session identity for the REST surface. No password here — account
//! management lives elsewhere in the platform; this just binds the session to
//! a user id so REST handlers can 401 unidentified callers.

use axum::{debug_handler, extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::appresult::AppError;
use crate::db;
use crate::session::USER_ID;
use crate::{AppResult, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/identity", post(identify))
        .route("/logout", post(logout))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentifyBody {
    user_id: String,
}

#[debug_handler(state = crate::AppState)]
async fn identify(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(IdentifyBody { user_id }): Json<IdentifyBody>,
) -> AppResult<Json<Value>> {
    let user_id = user_id.trim().to_owned();
    if user_id.is_empty() {
        return Err(AppError::bad_request("userId must not be empty"));
    }

    db::ensure_user(&db_pool, &user_id).await?;
    session.insert(USER_ID, &user_id).await?;
    Ok(Json(json!({ "userId": user_id })))
}

#[debug_handler(state = crate::AppState)]
async fn logout(session: Session) -> AppResult<Json<Value>> {
    session.flush().await?;
    Ok(Json(json!({ "ok": true })))
}
