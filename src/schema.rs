//! Database schema definitions
//!
//! This module provides constants for table and column names used with
//! rusqlite, so queries never hard-code identifiers inline.

/// Users table schema
pub mod users {
    /// Table name
    pub const TABLE: &str = "users";
    /// Primary key column
    pub const ID: &str = "id";
    /// Username column
    pub const USERNAME: &str = "username";
    /// Creation timestamp column
    pub const CREATED_AT: &str = "created_at";
}

/// Messages table schema
pub mod messages {
    /// Table name
    pub const TABLE: &str = "messages";
    /// Primary key column
    pub const ID: &str = "id";
    /// Sending user column
    pub const SENDER_ID: &str = "sender_id";
    /// Receiving user column
    pub const RECEIVER_ID: &str = "receiver_id";
    /// Parent message column (reply threading, nullable)
    pub const PARENT_MESSAGE_ID: &str = "parent_message_id";
    /// Message text content column
    pub const CONTENT: &str = "content";
    /// Message creation timestamp column
    pub const TIMESTAMP: &str = "timestamp";
    /// Flag indicating the receiver has read the message
    pub const IS_READ: &str = "is_read";
    /// Flag indicating the message has been edited
    pub const EDITED: &str = "edited";
    /// Last edit timestamp column (nullable)
    pub const EDITED_AT: &str = "edited_at";
}

/// Message history table schema
pub mod message_history {
    /// Table name
    pub const TABLE: &str = "message_history";
    /// Primary key column
    pub const ID: &str = "id";
    /// Foreign key to messages table
    pub const MESSAGE_ID: &str = "message_id";
    /// Snapshot of the content before the edit
    pub const OLD_CONTENT: &str = "old_content";
    /// User who made the edit
    pub const EDITED_BY_ID: &str = "edited_by_id";
    /// Edit timestamp column
    pub const EDITED_AT: &str = "edited_at";
    /// Per-message version counter column
    pub const VERSION: &str = "version";
}

/// Notifications table schema
pub mod notifications {
    /// Table name
    pub const TABLE: &str = "notifications";
    /// Primary key column
    pub const ID: &str = "id";
    /// Notified user column
    pub const USER_ID: &str = "user_id";
    /// Foreign key to messages table (NULL for system notifications)
    pub const MESSAGE_ID: &str = "message_id";
    /// Notification type column ('message' or 'system')
    pub const NOTIFICATION_TYPE: &str = "notification_type";
    /// Notification title column
    pub const TITLE: &str = "title";
    /// Notification body column
    pub const CONTENT: &str = "content";
    /// Flag indicating the notification has been read
    pub const IS_READ: &str = "is_read";
    /// Creation timestamp column
    pub const CREATED_AT: &str = "created_at";
}
