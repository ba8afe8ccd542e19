//! Database operations and connection pooling
//!
//! The [`Database`] owns an r2d2 pool of SQLite connections. Plain reads go
//! through the `&self` methods, which borrow a pooled connection internally.
//! Write paths that must be atomic (send, edit, delete) use
//! [`Database::get_connection`] and the connection-scoped associated
//! functions, so every step runs inside one transaction.

use std::fs;
use std::path::Path;

use chrono::{NaiveDateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::error::Result;
use crate::models::{
    Message, MessageHistory, NewMessage, Notification, NotificationType, UnreadMessage, User,
    UserDeletionStats,
};
use crate::schema::{message_history, messages, notifications, users};

/// Type alias for the database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;
/// Type alias for a pooled connection
pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Database manager for handling connections and operations
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Create a new database connection pool at `database_path`.
    ///
    /// Every pooled connection enables foreign-key enforcement; the cascade
    /// behavior of the schema depends on it.
    pub fn new(database_path: &str) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = Path::new(database_path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
            conn.execute_batch(
                "PRAGMA foreign_keys = ON;
                 PRAGMA journal_mode = WAL;
                 PRAGMA busy_timeout = 5000;",
            )
        });
        let pool = Pool::builder().build(manager)?;

        let conn = pool.get()?;
        Self::run_migrations(&conn)?;

        Ok(Self { pool })
    }

    /// Run database migrations
    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(include_str!(
            "../migrations/2025-07-20-000000_create_tables/up.sql"
        ))?;
        debug!("Migrations applied");
        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> Result<DbConnection> {
        Ok(self.pool.get()?)
    }

    // ----- users -----

    /// Insert a user row. The username must be unique.
    pub(crate) fn insert_user(conn: &Connection, username: &str) -> Result<User> {
        let created_at = Utc::now().naive_utc();
        conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}) VALUES (?, ?)",
                users::TABLE,
                users::USERNAME,
                users::CREATED_AT
            ),
            params![username, created_at],
        )?;
        Ok(User {
            id: conn.last_insert_rowid(),
            username: username.to_string(),
            created_at,
        })
    }

    /// Look up a user by id within an open connection.
    pub(crate) fn user_by_id(conn: &Connection, user_id: i64) -> Result<Option<User>> {
        let user = conn
            .query_row(
                &format!(
                    "SELECT * FROM {} WHERE {} = ?",
                    users::TABLE,
                    users::ID
                ),
                params![user_id],
                Self::map_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Get a user by id
    pub fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let conn = self.get_connection()?;
        Self::user_by_id(&conn, user_id)
    }

    /// Get a user by username
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.get_connection()?;
        let user = conn
            .query_row(
                &format!(
                    "SELECT * FROM {} WHERE {} = ?",
                    users::TABLE,
                    users::USERNAME
                ),
                params![username],
                Self::map_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Delete a user row, returning the number of rows removed (0 or 1).
    ///
    /// Foreign keys do the heavy lifting: messages sent or received by the
    /// user, notifications targeted at them, and history rows they authored
    /// all go with the row.
    pub(crate) fn delete_user_row(conn: &Connection, user_id: i64) -> Result<usize> {
        let removed = conn.execute(
            &format!("DELETE FROM {} WHERE {} = ?", users::TABLE, users::ID),
            params![user_id],
        )?;
        Ok(removed)
    }

    // ----- messages -----

    /// Look up a message by id within an open connection.
    pub(crate) fn message_by_id(conn: &Connection, message_id: i64) -> Result<Option<Message>> {
        let message = conn
            .query_row(
                &format!(
                    "SELECT * FROM {} WHERE {} = ?",
                    messages::TABLE,
                    messages::ID
                ),
                params![message_id],
                Self::map_message,
            )
            .optional()?;
        Ok(message)
    }

    /// Get a message by id
    pub fn get_message(&self, message_id: i64) -> Result<Option<Message>> {
        let conn = self.get_connection()?;
        Self::message_by_id(&conn, message_id)
    }

    /// Insert a message row and return the persisted form.
    pub(crate) fn insert_message(conn: &Connection, new_message: &NewMessage) -> Result<Message> {
        let timestamp = new_message
            .timestamp
            .unwrap_or_else(|| Utc::now().naive_utc());

        conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}, {}, {}, {}) VALUES (?, ?, ?, ?, ?, ?)",
                messages::TABLE,
                messages::SENDER_ID,
                messages::RECEIVER_ID,
                messages::PARENT_MESSAGE_ID,
                messages::CONTENT,
                messages::TIMESTAMP,
                messages::IS_READ,
            ),
            params![
                new_message.sender_id,
                new_message.receiver_id,
                new_message.parent_message_id,
                new_message.content,
                timestamp,
                new_message.is_read,
            ],
        )?;

        Ok(Message {
            id: conn.last_insert_rowid(),
            sender_id: new_message.sender_id,
            receiver_id: new_message.receiver_id,
            parent_message_id: new_message.parent_message_id,
            content: new_message.content.clone(),
            timestamp,
            is_read: new_message.is_read,
            edited: false,
            edited_at: None,
        })
    }

    /// Overwrite a message's content and stamp it edited.
    pub(crate) fn apply_edit(
        conn: &Connection,
        message_id: i64,
        new_content: &str,
        edited_at: NaiveDateTime,
    ) -> Result<usize> {
        let updated = conn.execute(
            &format!(
                "UPDATE {} SET {} = ?, {} = 1, {} = ? WHERE {} = ?",
                messages::TABLE,
                messages::CONTENT,
                messages::EDITED,
                messages::EDITED_AT,
                messages::ID,
            ),
            params![new_content, edited_at, message_id],
        )?;
        Ok(updated)
    }

    /// Force a message row back to unread. Returns true if the row changed.
    pub(crate) fn force_unread(conn: &Connection, message_id: i64) -> Result<bool> {
        let updated = conn.execute(
            &format!(
                "UPDATE {} SET {} = 0 WHERE {} = ? AND {} = 1",
                messages::TABLE,
                messages::IS_READ,
                messages::ID,
                messages::IS_READ,
            ),
            params![message_id],
        )?;
        Ok(updated > 0)
    }

    /// Delete a message row, returning the number of rows removed (0 or 1).
    /// Replies, history, and notifications cascade.
    pub(crate) fn delete_message_row(conn: &Connection, message_id: i64) -> Result<usize> {
        let removed = conn.execute(
            &format!(
                "DELETE FROM {} WHERE {} = ?",
                messages::TABLE,
                messages::ID
            ),
            params![message_id],
        )?;
        Ok(removed)
    }

    /// Direct replies to `parent_id`, ordered by (timestamp, id).
    ///
    /// The id tie-break keeps sibling order deterministic when timestamps
    /// collide.
    pub(crate) fn replies_to(conn: &Connection, parent_id: i64) -> Result<Vec<Message>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} WHERE {} = ? ORDER BY {} ASC, {} ASC",
            messages::TABLE,
            messages::PARENT_MESSAGE_ID,
            messages::TIMESTAMP,
            messages::ID,
        ))?;
        let rows = stmt.query_map(params![parent_id], Self::map_message)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    // ----- message history -----

    /// Highest version recorded for a message, or 0 when it has no history.
    pub(crate) fn max_history_version(conn: &Connection, message_id: i64) -> Result<i64> {
        let version = conn.query_row(
            &format!(
                "SELECT COALESCE(MAX({}), 0) FROM {} WHERE {} = ?",
                message_history::VERSION,
                message_history::TABLE,
                message_history::MESSAGE_ID,
            ),
            params![message_id],
            |row| row.get(0),
        )?;
        Ok(version)
    }

    /// Append a history row. Fails with a unique violation when the
    /// (message, version) slot is already taken.
    pub(crate) fn insert_history(
        conn: &Connection,
        message_id: i64,
        old_content: &str,
        edited_by_id: i64,
        edited_at: NaiveDateTime,
        version: i64,
    ) -> Result<MessageHistory> {
        conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}, {}, {}) VALUES (?, ?, ?, ?, ?)",
                message_history::TABLE,
                message_history::MESSAGE_ID,
                message_history::OLD_CONTENT,
                message_history::EDITED_BY_ID,
                message_history::EDITED_AT,
                message_history::VERSION,
            ),
            params![message_id, old_content, edited_by_id, edited_at, version],
        )?;

        Ok(MessageHistory {
            id: conn.last_insert_rowid(),
            message_id,
            old_content: old_content.to_string(),
            edited_by_id,
            edited_at,
            version,
        })
    }

    /// Full edit history of a message, oldest version first.
    pub fn history_for_message(&self, message_id: i64) -> Result<Vec<MessageHistory>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} WHERE {} = ? ORDER BY {} ASC",
            message_history::TABLE,
            message_history::MESSAGE_ID,
            message_history::VERSION,
        ))?;
        let rows = stmt.query_map(params![message_id], Self::map_history)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    // ----- notifications -----

    /// Insert a notification row.
    pub(crate) fn insert_notification(
        conn: &Connection,
        user_id: i64,
        message_id: Option<i64>,
        notification_type: NotificationType,
        title: &str,
        content: &str,
    ) -> Result<Notification> {
        let created_at = Utc::now().naive_utc();
        conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}, {}, {}, {}) VALUES (?, ?, ?, ?, ?, ?)",
                notifications::TABLE,
                notifications::USER_ID,
                notifications::MESSAGE_ID,
                notifications::NOTIFICATION_TYPE,
                notifications::TITLE,
                notifications::CONTENT,
                notifications::CREATED_AT,
            ),
            params![
                user_id,
                message_id,
                notification_type.as_str(),
                title,
                content,
                created_at
            ],
        )?;

        Ok(Notification {
            id: conn.last_insert_rowid(),
            user_id,
            message_id,
            notification_type,
            title: title.to_string(),
            content: content.to_string(),
            is_read: false,
            created_at,
        })
    }

    /// All notifications for a user, newest first.
    pub fn notifications_for_user(&self, user_id: i64) -> Result<Vec<Notification>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} WHERE {} = ? ORDER BY {} DESC, {} DESC",
            notifications::TABLE,
            notifications::USER_ID,
            notifications::CREATED_AT,
            notifications::ID,
        ))?;
        let rows = stmt.query_map(params![user_id], Self::map_notification)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Count of unread notifications for a user.
    pub fn unread_notification_count(&self, user_id: i64) -> Result<usize> {
        let conn = self.get_connection()?;
        let count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE {} = ? AND {} = 0",
                notifications::TABLE,
                notifications::USER_ID,
                notifications::IS_READ,
            ),
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Mark every unread notification for a user as read. Returns the number
    /// of rows updated.
    pub fn mark_all_notifications_read(&self, user_id: i64) -> Result<usize> {
        let conn = self.get_connection()?;
        let updated = conn.execute(
            &format!(
                "UPDATE {} SET {} = 1 WHERE {} = ? AND {} = 0",
                notifications::TABLE,
                notifications::IS_READ,
                notifications::USER_ID,
                notifications::IS_READ,
            ),
            params![user_id],
        )?;
        Ok(updated)
    }

    // ----- unread message queries -----

    /// Unread received messages for a user, newest first, with the sender's
    /// username attached.
    pub fn unread_for(&self, user_id: i64) -> Result<Vec<UnreadMessage>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT m.*, u.{username} FROM {msgs} m \
             JOIN {users} u ON u.{uid} = m.{sender} \
             WHERE m.{receiver} = ? AND m.{is_read} = 0 \
             ORDER BY m.{ts} DESC, m.{id} DESC",
            username = users::USERNAME,
            msgs = messages::TABLE,
            users = users::TABLE,
            uid = users::ID,
            sender = messages::SENDER_ID,
            receiver = messages::RECEIVER_ID,
            is_read = messages::IS_READ,
            ts = messages::TIMESTAMP,
            id = messages::ID,
        ))?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(UnreadMessage {
                message: Self::map_message(row)?,
                sender_username: row.get(users::USERNAME)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Count of unread received messages for a user, without materializing
    /// the rows.
    pub fn unread_count(&self, user_id: i64) -> Result<usize> {
        let conn = self.get_connection()?;
        let count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE {} = ? AND {} = 0",
                messages::TABLE,
                messages::RECEIVER_ID,
                messages::IS_READ,
            ),
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Mark unread received messages as read for a user.
    ///
    /// With `message_ids` given, only that subset is touched; ids that do not
    /// match the receiver/unread precondition are silently excluded from the
    /// returned count rather than treated as errors.
    pub fn mark_read(&self, user_id: i64, message_ids: Option<&[i64]>) -> Result<usize> {
        let conn = self.get_connection()?;

        let mut query = format!(
            "UPDATE {} SET {} = 1 WHERE {} = ? AND {} = 0",
            messages::TABLE,
            messages::IS_READ,
            messages::RECEIVER_ID,
            messages::IS_READ,
        );
        let mut query_params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id)];

        if let Some(ids) = message_ids {
            if ids.is_empty() {
                return Ok(0);
            }
            let placeholders = vec!["?"; ids.len()].join(", ");
            query.push_str(&format!(" AND {} IN ({placeholders})", messages::ID));
            for id in ids {
                query_params.push(Box::new(*id));
            }
        }

        let updated = conn.execute(&query, rusqlite::params_from_iter(query_params.iter()))?;
        Ok(updated)
    }

    // ----- defensive cleanup and stats -----

    /// Remove any message rows still referencing a deleted user. Zero-row
    /// deletes are the expected case once the cascade has run.
    pub(crate) fn purge_messages_of_user(conn: &Connection, user_id: i64) -> Result<usize> {
        let removed = conn.execute(
            &format!(
                "DELETE FROM {} WHERE {} = ? OR {} = ?",
                messages::TABLE,
                messages::SENDER_ID,
                messages::RECEIVER_ID,
            ),
            params![user_id, user_id],
        )?;
        Ok(removed)
    }

    /// Remove any history rows still referencing a deleted editor.
    pub(crate) fn purge_history_of_user(conn: &Connection, user_id: i64) -> Result<usize> {
        let removed = conn.execute(
            &format!(
                "DELETE FROM {} WHERE {} = ?",
                message_history::TABLE,
                message_history::EDITED_BY_ID,
            ),
            params![user_id],
        )?;
        Ok(removed)
    }

    /// Counts of the rows a user deletion would remove.
    pub(crate) fn deletion_stats(conn: &Connection, user_id: i64) -> Result<UserDeletionStats> {
        let count = |table: &str, column: &str| -> Result<usize> {
            let n: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM {table} WHERE {column} = ?"),
                params![user_id],
                |row| row.get(0),
            )?;
            Ok(n as usize)
        };

        Ok(UserDeletionStats {
            sent_messages: count(messages::TABLE, messages::SENDER_ID)?,
            received_messages: count(messages::TABLE, messages::RECEIVER_ID)?,
            notifications: count(notifications::TABLE, notifications::USER_ID)?,
            message_histories: count(message_history::TABLE, message_history::EDITED_BY_ID)?,
        })
    }

    // ----- row mappers -----

    /// Map a database row to a User
    fn map_user(row: &Row) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(users::ID)?,
            username: row.get(users::USERNAME)?,
            created_at: row.get(users::CREATED_AT)?,
        })
    }

    /// Map a database row to a Message
    pub(crate) fn map_message(row: &Row) -> rusqlite::Result<Message> {
        Ok(Message {
            id: row.get(messages::ID)?,
            sender_id: row.get(messages::SENDER_ID)?,
            receiver_id: row.get(messages::RECEIVER_ID)?,
            parent_message_id: row.get(messages::PARENT_MESSAGE_ID)?,
            content: row.get(messages::CONTENT)?,
            timestamp: row.get(messages::TIMESTAMP)?,
            is_read: row.get(messages::IS_READ)?,
            edited: row.get(messages::EDITED)?,
            edited_at: row.get(messages::EDITED_AT)?,
        })
    }

    /// Map a database row to a MessageHistory
    fn map_history(row: &Row) -> rusqlite::Result<MessageHistory> {
        Ok(MessageHistory {
            id: row.get(message_history::ID)?,
            message_id: row.get(message_history::MESSAGE_ID)?,
            old_content: row.get(message_history::OLD_CONTENT)?,
            edited_by_id: row.get(message_history::EDITED_BY_ID)?,
            edited_at: row.get(message_history::EDITED_AT)?,
            version: row.get(message_history::VERSION)?,
        })
    }

    /// Map a database row to a Notification
    fn map_notification(row: &Row) -> rusqlite::Result<Notification> {
        let type_str: String = row.get(notifications::NOTIFICATION_TYPE)?;
        Ok(Notification {
            id: row.get(notifications::ID)?,
            user_id: row.get(notifications::USER_ID)?,
            message_id: row.get(notifications::MESSAGE_ID)?,
            notification_type: NotificationType::from_str_or_default(&type_str),
            title: row.get(notifications::TITLE)?,
            content: row.get(notifications::CONTENT)?,
            is_read: row.get(notifications::IS_READ)?,
            created_at: row.get(notifications::CREATED_AT)?,
        })
    }
}

/// Open the database at the configured path, falling back to the
/// `DATABASE_PATH` environment variable when set.
pub fn establish_connection(configured_path: &str) -> Result<Database> {
    let database_path =
        std::env::var("DATABASE_PATH").unwrap_or_else(|_| configured_path.to_string());
    Database::new(&database_path)
}
