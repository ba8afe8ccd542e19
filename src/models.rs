//! Data models for messages, edit history, and notifications
//!
//! This module contains all data structures used throughout the crate,
//! including persisted rows, creation payloads, and thread trees.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A registered user reference.
///
/// Identity management (credentials, profiles) lives outside this crate; the
/// row exists so foreign keys have something to cascade from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Database primary key
    pub id: i64,
    /// Unique username
    pub username: String,
    /// Timestamp when the user was registered
    pub created_at: NaiveDateTime,
}

/// A message sent between two users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Database primary key
    pub id: i64,
    /// User who sent the message
    pub sender_id: i64,
    /// User who receives the message
    pub receiver_id: i64,
    /// Message this one replies to, if any
    pub parent_message_id: Option<i64>,
    /// Message text content
    pub content: String,
    /// Timestamp when the message was created (immutable)
    pub timestamp: NaiveDateTime,
    /// True once the receiver has read the message
    pub is_read: bool,
    /// True iff at least one history row exists for this message
    pub edited: bool,
    /// Timestamp of the last edit, if any
    pub edited_at: Option<NaiveDateTime>,
}

/// Data for creating a new message.
#[derive(Debug, Clone)]
pub struct NewMessage {
    /// User sending the message
    pub sender_id: i64,
    /// User receiving the message
    pub receiver_id: i64,
    /// Message being replied to, if any
    pub parent_message_id: Option<i64>,
    /// Message text content
    pub content: String,
    /// Creation timestamp (optional, defaults to now)
    pub timestamp: Option<NaiveDateTime>,
    /// Read flag as supplied by the caller. New messages are always stored
    /// unread; a true value here is forced back to false on creation.
    pub is_read: bool,
}

impl NewMessage {
    /// Convenience constructor for a plain (non-reply) message.
    #[must_use]
    pub fn new(sender_id: i64, receiver_id: i64, content: impl Into<String>) -> Self {
        Self {
            sender_id,
            receiver_id,
            parent_message_id: None,
            content: content.into(),
            timestamp: None,
            is_read: false,
        }
    }

    /// Mark this message as a reply to `parent_message_id`.
    #[must_use]
    pub const fn reply_to(mut self, parent_message_id: i64) -> Self {
        self.parent_message_id = Some(parent_message_id);
        self
    }
}

/// One entry in a message's append-only edit log.
///
/// Rows are never updated or deleted except via cascade when the parent
/// message or the editing user is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageHistory {
    /// Database primary key
    pub id: i64,
    /// Message this history entry belongs to
    pub message_id: i64,
    /// Content of the message before the edit
    pub old_content: String,
    /// User who made the edit
    pub edited_by_id: i64,
    /// Timestamp when the edit was made
    pub edited_at: NaiveDateTime,
    /// Version number (1 = first edit), contiguous per message
    pub version: i64,
}

/// Kind of notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    /// Notification about a newly received message
    Message,
    /// System-generated notification with no backing message
    System,
}

impl NotificationType {
    /// Stable string form, used as the stored column value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::System => "system",
        }
    }

    /// Parse the stored column value.
    #[must_use]
    pub fn from_str_or_default(value: &str) -> Self {
        match value {
            "system" => Self::System,
            _ => Self::Message,
        }
    }
}

/// A notification targeted at a single user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Database primary key
    pub id: i64,
    /// User who receives the notification
    pub user_id: i64,
    /// Message that triggered the notification (None = system notification)
    pub message_id: Option<i64>,
    /// Notification kind
    pub notification_type: NotificationType,
    /// Notification title
    pub title: String,
    /// Notification body
    pub content: String,
    /// True once the user has read the notification
    pub is_read: bool,
    /// Timestamp when the notification was created
    pub created_at: NaiveDateTime,
}

/// An unread message with its sender's identity attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreadMessage {
    /// The unread message row
    pub message: Message,
    /// Username of the sender
    pub sender_username: String,
}

/// One node of a reply tree: a message, its depth below the thread root,
/// and its own replies in (timestamp, id) order.
///
/// Direct replies of the root have depth 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadNode {
    /// The reply message
    pub message: Message,
    /// Nesting depth below the thread root
    pub depth: usize,
    /// Ordered child replies
    pub replies: Vec<ThreadNode>,
}

/// A fully reconstructed thread: the root message plus the nested tree of
/// every reply transitively below it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageThread {
    /// The ancestor-most message of the thread
    pub root: Message,
    /// Nested replies below the root
    pub replies: Vec<ThreadNode>,
}

impl MessageThread {
    /// Total number of replies in the thread (root excluded).
    #[must_use]
    pub fn reply_count(&self) -> usize {
        // Iterative count, same worklist discipline as the tree build.
        let mut count = 0;
        let mut stack: Vec<&ThreadNode> = self.replies.iter().collect();
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.replies.iter());
        }
        count
    }
}

/// Counts of the rows that deleting a user would remove.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UserDeletionStats {
    /// Messages the user sent
    pub sent_messages: usize,
    /// Messages the user received
    pub received_messages: usize,
    /// Notifications targeted at the user
    pub notifications: usize,
    /// History rows the user authored as editor
    pub message_histories: usize,
}

impl UserDeletionStats {
    /// Total dependent rows across all tables.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.sent_messages + self.received_messages + self.notifications + self.message_histories
    }
}
