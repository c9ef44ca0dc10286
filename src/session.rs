use tower_sessions::Session;

use crate::appresult::{AppError, AppResult};

pub const USER_ID: &str = "user_id";

/// Pulls the signed-in user id out of the session, or 401s.
pub async fn require_user(session: &Session) -> AppResult<String> {
    session
        .get::<String>(USER_ID)
        .await?
        .ok_or_else(|| AppError::unauthorized("not signed in"))
}
