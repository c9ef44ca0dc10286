//! Fan-out bus shared by every live connection.
//!
//! One process-wide `tokio::sync::broadcast` channel carries every outbound
//! event; each WebSocket connection holds a subscriber and filters room-scoped
//! events against its own joined set. Sending never waits on persistence and
//! never fails loudly: with no subscribers the send result is discarded.

use serde_json::Value;
use tokio::sync::broadcast;

use crate::ws::protocol::ServerEvent;

/// An event on the bus, optionally scoped to a single room. `room: None`
/// means every connection delivers it.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub room: Option<String>,
    pub event: ServerEvent,
}

pub type EventBus = broadcast::Sender<Outbound>;

pub fn new_event_bus(capacity: usize) -> EventBus {
    broadcast::channel(capacity).0
}

pub fn emit_to_room(events: &EventBus, room: String, event: ServerEvent) {
    let _ = events.send(Outbound {
        room: Some(room),
        event,
    });
}

pub fn broadcast_online_users(events: &EventBus, users: Vec<String>) {
    let _ = events.send(Outbound {
        room: None,
        event: ServerEvent::OnlineUsersChanged { users },
    });
}

/// Global notice fan-out: every connected client gets it, relevance filtering
/// is the client's problem. Nothing is persisted on this path.
pub fn broadcast_notification(events: &EventBus, payload: Value) {
    let _ = events.send(Outbound {
        room: None,
        event: ServerEvent::NotificationReceived { payload },
    });
}
