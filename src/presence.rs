//! Who is reachable over the real-time transport right now.
//!
//! The registry owns the only shared mutable state in this subsystem: a map of
//! user id to the connection currently speaking for that user. Reconnects are
//! last-writer-wins. Offline transitions stamp a best-effort `last_seen` and
//! re-broadcast the full online set to everyone.

use std::sync::Arc;

use dashmap::DashMap;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::broadcast::{self, EventBus};
use crate::db;

#[derive(Clone, Default)]
pub struct Presence {
    connections: Arc<DashMap<String, Uuid>>,
}

impl Presence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the connection for this user, overwriting any previous one,
    /// and broadcasts the updated online set. Idempotent.
    pub fn mark_online(&self, user_id: &str, connection_id: Uuid, events: &EventBus) {
        self.connections.insert(user_id.to_owned(), connection_id);
        tracing::debug!(user_id, %connection_id, "user online");
        broadcast::broadcast_online_users(events, self.online_users());
    }

    /// Drops the user's entry if present, stamps `last_seen` fire-and-forget,
    /// and broadcasts the online set. Unknown ids only re-broadcast.
    pub fn mark_offline(&self, user_id: &str, db_pool: &SqlitePool, events: &EventBus) {
        if self.connections.remove(user_id).is_some() {
            tracing::debug!(user_id, "user offline");
            schedule_last_seen(db_pool.clone(), user_id.to_owned());
        }
        broadcast::broadcast_online_users(events, self.online_users());
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.connections.contains_key(user_id)
    }

    pub fn online_users(&self) -> Vec<String> {
        self.connections
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Transport-level disconnect with no explicit go-offline: reverse-lookup
    /// the connection id (linear scan, the map is small) and run the same
    /// offline transition. If the user already reconnected the stored id no
    /// longer matches and the newer session is left alone.
    pub fn disconnect(&self, connection_id: Uuid, db_pool: &SqlitePool, events: &EventBus) {
        let owner = self
            .connections
            .iter()
            .find(|entry| *entry.value() == connection_id)
            .map(|entry| entry.key().clone());

        if let Some(user_id) = owner {
            self.connections
                .remove_if(&user_id, |_, stored| *stored == connection_id);
            tracing::debug!(user_id, %connection_id, "connection dropped");
            schedule_last_seen(db_pool.clone(), user_id);
            broadcast::broadcast_online_users(events, self.online_users());
        }
    }
}

/// Best-effort: the client is already gone, so failures only get logged.
fn schedule_last_seen(db_pool: SqlitePool, user_id: String) {
    tokio::spawn(async move {
        let at = db::now_millis();
        if let Err(err) = db::touch_last_seen(&db_pool, &user_id, at).await {
            tracing::warn!(user_id, error = %err, "failed to persist last_seen");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::new_event_bus;
    use crate::ws::protocol::ServerEvent;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let db_pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        db::init(&db_pool).await.unwrap();
        db_pool
    }

    fn online_set(event: &crate::broadcast::Outbound) -> Vec<String> {
        match &event.event {
            ServerEvent::OnlineUsersChanged { users } => {
                let mut users = users.clone();
                users.sort();
                users
            }
            other => panic!("expected online set broadcast, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn mark_online_is_idempotent() {
        let presence = Presence::new();
        let events = new_event_bus(16);
        let mut rx = events.subscribe();
        let conn = Uuid::now_v7();

        presence.mark_online("u1", conn, &events);
        presence.mark_online("u1", conn, &events);

        assert!(presence.is_online("u1"));
        assert_eq!(presence.online_users().len(), 1);
        assert_eq!(online_set(&rx.recv().await.unwrap()), vec!["u1"]);
        assert_eq!(online_set(&rx.recv().await.unwrap()), vec!["u1"]);
    }

    #[tokio::test]
    async fn reconnect_overwrites_last_writer_wins() {
        let presence = Presence::new();
        let events = new_event_bus(16);

        presence.mark_online("u1", Uuid::now_v7(), &events);
        let newer = Uuid::now_v7();
        presence.mark_online("u1", newer, &events);

        assert_eq!(presence.online_users(), vec!["u1".to_string()]);
    }

    #[tokio::test]
    async fn mark_offline_unknown_user_is_a_noop() {
        let presence = Presence::new();
        let events = new_event_bus(16);
        let mut rx = events.subscribe();
        let db_pool = test_pool().await;

        presence.mark_offline("ghost", &db_pool, &events);

        // Still broadcasts the (empty) set, nothing else happens.
        assert!(online_set(&rx.recv().await.unwrap()).is_empty());
        assert!(!presence.is_online("ghost"));
    }

    #[tokio::test]
    async fn stale_disconnect_leaves_newer_session_online() {
        let presence = Presence::new();
        let events = new_event_bus(16);
        let db_pool = test_pool().await;

        let old_conn = Uuid::now_v7();
        presence.mark_online("u1", old_conn, &events);
        let new_conn = Uuid::now_v7();
        presence.mark_online("u1", new_conn, &events);

        // The old socket finally closes; its connection id no longer owns u1.
        presence.disconnect(old_conn, &db_pool, &events);
        assert!(presence.is_online("u1"));

        presence.disconnect(new_conn, &db_pool, &events);
        assert!(!presence.is_online("u1"));
    }
}
