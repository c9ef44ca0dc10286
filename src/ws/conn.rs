use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use axum::{
    debug_handler,
    extract::{ws::{Message as WsMessage, WebSocket, WebSocketUpgrade}, State},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::broadcast;
use crate::relay;
use crate::rooms::canonical_room_id;
use crate::ws::protocol::ClientEvent;
use crate::AppState;

#[debug_handler]
pub async fn upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |stream| handle_connection(stream, state))
}

/// One task per connection. The writer half forwards bus events, filtering
/// room-scoped ones against this connection's joined set; the reader half
/// dispatches client events. Handler errors are logged and never close the
/// connection; only the transport ends it.
async fn handle_connection(stream: WebSocket, state: AppState) {
    let connection_id = Uuid::now_v7();
    let mut rx = state.events.subscribe();
    let (mut sender, mut receiver) = stream.split();

    // Joined rooms are volatile, owned by this connection, gone on disconnect.
    let joined = Arc::new(Mutex::new(HashSet::<String>::new()));

    tracing::debug!(%connection_id, "connection opened");

    let writer_joined = joined.clone();
    let forward_task = tokio::spawn(async move {
        loop {
            let outbound = match rx.recv().await {
                Ok(outbound) => outbound,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "connection lagged behind event bus");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            if let Some(room) = &outbound.room {
                if !writer_joined.lock().unwrap().contains(room) {
                    continue;
                }
            }

            let Ok(text) = serde_json::to_string(&outbound.event) else {
                continue;
            };
            if sender.send(WsMessage::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(frame)) = receiver.next().await {
        let Ok(event) = serde_json::from_slice::<ClientEvent>(&frame.into_data()) else {
            continue;
        };

        match event {
            ClientEvent::AnnounceIdentity { user_id } => {
                state.presence.mark_online(&user_id, connection_id, &state.events);
            }
            ClientEvent::GoOffline { user_id } => {
                state.presence.mark_offline(&user_id, &state.db_pool, &state.events);
            }
            ClientEvent::JoinRoom { user_id, peer_id } => {
                joined
                    .lock()
                    .unwrap()
                    .insert(canonical_room_id(&user_id, &peer_id));
            }
            ClientEvent::LeaveRoom { user_id, peer_id } => {
                joined
                    .lock()
                    .unwrap()
                    .remove(&canonical_room_id(&user_id, &peer_id));
            }
            ClientEvent::SendMessage {
                sender_id,
                receiver_id,
                text,
            } => {
                if let Err(err) = relay::relay(
                    &state.db_pool,
                    &state.events,
                    &state.presence,
                    sender_id,
                    receiver_id,
                    &text,
                ) {
                    tracing::warn!(%connection_id, error = %err.error, "dropped invalid message");
                }
            }
            ClientEvent::SendNotification { payload } => {
                broadcast::broadcast_notification(&state.events, payload);
            }
        }
    }

    forward_task.abort();
    state
        .presence
        .disconnect(connection_id, &state.db_pool, &state.events);
    tracing::debug!(%connection_id, "connection closed");
}
