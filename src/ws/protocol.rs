//! JSON wire events. Tags are kebab-case, field names camelCase to match the
//! single-page-app client.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::Message;

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    AnnounceIdentity { user_id: String },
    #[serde(rename_all = "camelCase")]
    GoOffline { user_id: String },
    #[serde(rename_all = "camelCase")]
    JoinRoom { user_id: String, peer_id: String },
    #[serde(rename_all = "camelCase")]
    LeaveRoom { user_id: String, peer_id: String },
    #[serde(rename_all = "camelCase")]
    SendMessage {
        sender_id: String,
        receiver_id: String,
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    SendNotification { payload: Value },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    OnlineUsersChanged { users: Vec<String> },
    #[serde(rename_all = "camelCase")]
    MessageReceived { message: Message },
    #[serde(rename_all = "camelCase")]
    NotificationReceived { payload: Value },
}
