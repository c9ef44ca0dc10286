//! Emit-first message delivery.
//!
//! A relayed message goes out to the room synchronously; the durable write is
//! scheduled afterwards as a detached task. A slow or failing store never
//! delays delivery and never retracts an already-emitted event.

use sqlx::SqlitePool;

use crate::appresult::{AppError, AppResult};
use crate::broadcast::{self, EventBus};
use crate::db::{self, Message};
use crate::presence::Presence;
use crate::rooms::canonical_room_id;
use crate::ws::protocol::ServerEvent;

pub const MAX_TEXT_LEN: usize = 1000;

/// Shared by the real-time and REST send paths: trimmed, non-empty, bounded.
pub fn validate_text(text: &str) -> AppResult<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::bad_request("message text must not be empty"));
    }
    if text.chars().count() > MAX_TEXT_LEN {
        return Err(AppError::bad_request(format!(
            "message text exceeds {MAX_TEXT_LEN} characters"
        )));
    }
    Ok(text.to_owned())
}

/// Validates, emits to the pair's room, then schedules persistence. The `read`
/// flag is a heuristic: whether the receiver is in the presence set right now,
/// not whether they have the conversation open.
pub fn relay(
    db_pool: &SqlitePool,
    events: &EventBus,
    presence: &Presence,
    sender_id: String,
    receiver_id: String,
    text: &str,
) -> AppResult<Message> {
    let text = validate_text(text)?;
    let read = presence.is_online(&receiver_id);
    let room = canonical_room_id(&sender_id, &receiver_id);
    let message = Message::new(sender_id, receiver_id, text, read);

    broadcast::emit_to_room(
        events,
        room,
        ServerEvent::MessageReceived {
            message: message.clone(),
        },
    );
    schedule_persist(db_pool.clone(), message.clone());

    Ok(message)
}

/// Fire-and-forget durable write. Failure is logged; the emitted event stands.
pub fn schedule_persist(db_pool: SqlitePool, message: Message) {
    tokio::spawn(async move {
        if let Err(err) = db::insert_message(&db_pool, &message).await {
            tracing::error!(
                message_id = %message.id,
                error = %err,
                "failed to persist relayed message"
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::new_event_bus;
    use sqlx::sqlite::SqlitePoolOptions;
    use uuid::Uuid;

    async fn test_pool() -> SqlitePool {
        let db_pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        db::init(&db_pool).await.unwrap();
        db_pool
    }

    #[test]
    fn validate_trims_and_bounds() {
        assert_eq!(validate_text("  hi  ").unwrap(), "hi");
        assert!(validate_text("   ").is_err());
        assert!(validate_text("").is_err());
        assert!(validate_text(&"x".repeat(MAX_TEXT_LEN)).is_ok());
        assert!(validate_text(&"x".repeat(MAX_TEXT_LEN + 1)).is_err());
    }

    #[tokio::test]
    async fn emits_before_persistence_resolves() {
        let db_pool = test_pool().await;
        let events = new_event_bus(16);
        let presence = Presence::new();
        let mut rx = events.subscribe();

        let sent = relay(
            &db_pool,
            &events,
            &presence,
            "u1".into(),
            "u2".into(),
            "hi",
        )
        .unwrap();

        // The room event is already on the bus when relay returns, whether or
        // not the spawned insert has run yet.
        let outbound = rx.try_recv().unwrap();
        assert_eq!(outbound.room.as_deref(), Some("u1-u2"));
        match outbound.event {
            ServerEvent::MessageReceived { message } => {
                assert_eq!(message.id, sent.id);
                assert_eq!(message.text, "hi");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn read_flag_follows_presence_at_relay_time() {
        let db_pool = test_pool().await;
        let events = new_event_bus(16);
        let presence = Presence::new();

        let offline = relay(&db_pool, &events, &presence, "u1".into(), "u2".into(), "a").unwrap();
        assert!(!offline.read);

        presence.mark_online("u2", Uuid::now_v7(), &events);
        let online = relay(&db_pool, &events, &presence, "u1".into(), "u2".into(), "b").unwrap();
        assert!(online.read);
    }

    #[tokio::test]
    async fn rejects_invalid_text_without_emitting() {
        let db_pool = test_pool().await;
        let events = new_event_bus(16);
        let presence = Presence::new();
        let mut rx = events.subscribe();

        assert!(relay(&db_pool, &events, &presence, "u1".into(), "u2".into(), "  ").is_err());
        assert!(rx.try_recv().is_err());
    }
}
