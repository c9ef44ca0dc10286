use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

/// A durable chat message. `timestamp` is unix milliseconds, set once at
/// creation and never updated.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Message {
    pub id: String,
    pub sender: String,
    pub receiver: String,
    pub text: String,
    pub read: bool,
    pub timestamp: i64,
}

impl Message {
    pub fn new(sender: String, receiver: String, text: String, read: bool) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            sender,
            receiver,
            text,
            read,
            timestamp: now_millis(),
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub actor: String,
    pub kind: String,
    pub message: String,
    pub link: Option<String>,
    pub is_read: bool,
    pub timestamp: i64,
}

/// Last message + unread count for one peer, as returned by GET /conversations.
#[derive(Debug, Serialize)]
pub struct ConversationSummary {
    pub peer: String,
    pub last_message: Message,
    pub unread: i64,
}

pub fn now_millis() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

pub async fn init(db_pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            last_seen INTEGER
        )",
    )
    .execute(db_pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            sender TEXT NOT NULL,
            receiver TEXT NOT NULL,
            text TEXT NOT NULL,
            read INTEGER NOT NULL DEFAULT 0,
            timestamp INTEGER NOT NULL
        )",
    )
    .execute(db_pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS notifications (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            actor TEXT NOT NULL,
            kind TEXT NOT NULL,
            message TEXT NOT NULL,
            link TEXT,
            is_read INTEGER NOT NULL DEFAULT 0,
            timestamp INTEGER NOT NULL
        )",
    )
    .execute(db_pool)
    .await?;

    Ok(())
}

pub async fn insert_message(db_pool: &SqlitePool, msg: &Message) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO messages (id,sender,receiver,text,read,timestamp) VALUES (?,?,?,?,?,?)")
        .bind(&msg.id)
        .bind(&msg.sender)
        .bind(&msg.receiver)
        .bind(&msg.text)
        .bind(msg.read)
        .bind(msg.timestamp)
        .execute(db_pool)
        .await?;
    Ok(())
}

pub async fn ensure_user(db_pool: &SqlitePool, user_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT OR IGNORE INTO users (id) VALUES (?)")
        .bind(user_id)
        .execute(db_pool)
        .await?;
    Ok(())
}

pub async fn touch_last_seen(
    db_pool: &SqlitePool,
    user_id: &str,
    at: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO users (id,last_seen) VALUES (?,?)
         ON CONFLICT(id) DO UPDATE SET last_seen=excluded.last_seen",
    )
    .bind(user_id)
    .bind(at)
    .execute(db_pool)
    .await?;
    Ok(())
}

pub async fn conversation(
    db_pool: &SqlitePool,
    user_id: &str,
    peer_id: &str,
) -> Result<Vec<Message>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id,sender,receiver,text,read,timestamp FROM messages
         WHERE (sender=? AND receiver=?) OR (sender=? AND receiver=?)
         ORDER BY timestamp ASC, id ASC",
    )
    .bind(user_id)
    .bind(peer_id)
    .bind(peer_id)
    .bind(user_id)
    .fetch_all(db_pool)
    .await
}

/// One summary per peer the caller has exchanged messages with, newest
/// conversation first.
pub async fn conversation_summaries(
    db_pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<ConversationSummary>, sqlx::Error> {
    let msgs: Vec<Message> = sqlx::query_as(
        "SELECT id,sender,receiver,text,read,timestamp FROM messages
         WHERE sender=? OR receiver=?
         ORDER BY timestamp ASC, id ASC",
    )
    .bind(user_id)
    .bind(user_id)
    .fetch_all(db_pool)
    .await?;

    let mut by_peer: Vec<ConversationSummary> = Vec::new();
    for msg in msgs {
        let peer = if msg.sender == user_id {
            msg.receiver.clone()
        } else {
            msg.sender.clone()
        };
        let inbound_unread = msg.receiver == user_id && !msg.read;

        match by_peer.iter_mut().find(|s| s.peer == peer) {
            Some(summary) => {
                if inbound_unread {
                    summary.unread += 1;
                }
                summary.last_message = msg;
            }
            None => by_peer.push(ConversationSummary {
                peer,
                unread: if inbound_unread { 1 } else { 0 },
                last_message: msg,
            }),
        }
    }

    by_peer.sort_by(|a, b| b.last_message.timestamp.cmp(&a.last_message.timestamp));
    Ok(by_peer)
}

/// Flips `read` on everything the peer sent the caller. Returns rows changed.
pub async fn mark_read(
    db_pool: &SqlitePool,
    user_id: &str,
    peer_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE messages SET read=1 WHERE sender=? AND receiver=? AND read=0")
        .bind(peer_id)
        .bind(user_id)
        .execute(db_pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn unread_count(
    db_pool: &SqlitePool,
    user_id: &str,
    peer_id: &str,
) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM messages WHERE sender=? AND receiver=? AND read=0")
            .bind(peer_id)
            .bind(user_id)
            .fetch_one(db_pool)
            .await?;
    Ok(count)
}

pub async fn insert_notification(
    db_pool: &SqlitePool,
    notification: &Notification,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO notifications (id,user_id,actor,kind,message,link,is_read,timestamp)
         VALUES (?,?,?,?,?,?,?,?)",
    )
    .bind(&notification.id)
    .bind(&notification.user_id)
    .bind(&notification.actor)
    .bind(&notification.kind)
    .bind(&notification.message)
    .bind(&notification.link)
    .bind(notification.is_read)
    .bind(notification.timestamp)
    .execute(db_pool)
    .await?;
    Ok(())
}

pub async fn notifications_for(
    db_pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<Notification>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id,user_id,actor,kind,message,link,is_read,timestamp FROM notifications
         WHERE user_id=? ORDER BY timestamp DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(db_pool)
    .await
}

pub async fn mark_notifications_read(
    db_pool: &SqlitePool,
    user_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE notifications SET is_read=1 WHERE user_id=? AND is_read=0")
        .bind(user_id)
        .execute(db_pool)
        .await?;
    Ok(result.rows_affected())
}
