use axum::{debug_handler, extract::State, Json};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::broadcast::EventBus;
use crate::db::{self, Message};
use crate::presence::Presence;
use crate::relay::validate_text;
use crate::rooms::canonical_room_id;
use crate::session::require_user;
use crate::ws::protocol::ServerEvent;
use crate::{broadcast, AppResult};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SendBody {
    receiver_id: String,
    text: String,
}

/// POST /send — synchronous fallback for when the socket is unavailable.
/// Same validation and read heuristic as the relay, but the write is awaited
/// and failures surface to the caller. A connected peer still gets the room
/// event after the write lands.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn send(
    State(db_pool): State<SqlitePool>,
    State(events): State<EventBus>,
    State(presence): State<Presence>,
    session: Session,
    Json(SendBody { receiver_id, text }): Json<SendBody>,
) -> AppResult<Json<Message>> {
    let sender_id = require_user(&session).await?;
    let text = validate_text(&text)?;

    let read = presence.is_online(&receiver_id);
    let message = Message::new(sender_id, receiver_id, text, read);
    db::insert_message(&db_pool, &message).await?;

    broadcast::emit_to_room(
        &events,
        canonical_room_id(&message.sender, &message.receiver),
        ServerEvent::MessageReceived {
            message: message.clone(),
        },
    );

    Ok(Json(message))
}
