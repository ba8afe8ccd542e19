//! Message operations: the write path and its hooks
//!
//! Every mutation runs through [`MessageService`] as one IMMEDIATE
//! transaction, with the history capture, notification fanout, and cascade
//! cleanup invoked as explicit steps inside it. Two concurrent edits of the
//! same message serialize here; if one still loses the version race, the
//! unique (message, version) constraint surfaces it as
//! [`ChatLedgerError::EditConflict`] instead of silently dropping a snapshot.
//!
//! There is no ambient "current user": every operation takes the acting
//! user explicitly.

use chrono::Utc;
use rusqlite::{Connection, TransactionBehavior};
use tracing::{debug, info, warn};

use crate::db::Database;
use crate::error::{is_unique_violation, ChatLedgerError, Result};
use crate::metrics::{MetricsCollector, MetricsTimer};
use crate::models::{
    Message, MessageHistory, MessageThread, NewMessage, Notification, NotificationType,
    UnreadMessage, User, UserDeletionStats,
};
use crate::thread;
use crate::validation::InputValidator;

/// Number of content characters included in a notification preview.
const NOTIFICATION_PREVIEW_CHARS: usize = 50;

/// High-level operations over the message store.
pub struct MessageService {
    db: Database,
    metrics: MetricsCollector,
}

impl MessageService {
    /// Wrap a database in the service layer.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self {
            db,
            metrics: MetricsCollector::default(),
        }
    }

    /// Access the underlying database.
    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.db
    }

    // ----- users -----

    /// Register a user reference row.
    ///
    /// Credentials and profiles are owned by an auth system elsewhere; this
    /// only anchors the foreign keys.
    pub fn register_user(&self, username: &str) -> Result<User> {
        InputValidator::validate_username(username)?;
        let trimmed = username.trim();

        let conn = self.db.get_connection()?;
        match Database::insert_user(&conn, trimmed) {
            Ok(user) => {
                info!(user_id = user.id, username = %user.username, "user registered");
                Ok(user)
            }
            Err(ChatLedgerError::Database(e)) if is_unique_violation(&e) => Err(
                ChatLedgerError::InvalidInput(format!("Username '{trimmed}' is already taken")),
            ),
            Err(e) => Err(e),
        }
    }

    /// Fetch a user by id, erroring when absent.
    pub fn get_user(&self, user_id: i64) -> Result<User> {
        self.db
            .get_user(user_id)?
            .ok_or(ChatLedgerError::UserNotFound(user_id))
    }

    /// Delete a user and everything that references them.
    ///
    /// The foreign keys cascade inside the same transaction; a defensive
    /// second pass re-checks for stragglers afterwards. Failures in that pass
    /// are logged and swallowed; the deletion itself must stand.
    pub fn delete_user(&self, user_id: i64) -> Result<()> {
        let mut conn = self.db.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let removed = Database::delete_user_row(&tx, user_id)?;
        if removed == 0 {
            return Err(ChatLedgerError::UserNotFound(user_id));
        }

        Self::cleanup_after_user_delete(&tx, user_id);

        tx.commit()?;
        self.metrics.record_user_deleted();
        info!(user_id, "user deleted");
        Ok(())
    }

    /// Defensive pass of the cascade cleaner.
    ///
    /// The cascade has normally removed everything already; these re-checks
    /// are idempotent and zero-row deletes are expected. Errors here must
    /// never roll back the user deletion, so they are logged and dropped.
    fn cleanup_after_user_delete(conn: &Connection, user_id: i64) {
        match Database::purge_messages_of_user(conn, user_id) {
            Ok(0) => {}
            Ok(rows) => warn!(user_id, rows, "cascade left message rows behind; purged"),
            Err(e) => warn!(user_id, error = %e, "defensive message cleanup failed"),
        }

        match Database::purge_history_of_user(conn, user_id) {
            Ok(0) => {}
            Ok(rows) => warn!(user_id, rows, "cascade left history rows behind; purged"),
            Err(e) => warn!(user_id, error = %e, "defensive history cleanup failed"),
        }
    }

    /// Counts of the rows deleting `user_id` would remove.
    pub fn deletion_stats(&self, user_id: i64) -> Result<UserDeletionStats> {
        let conn = self.db.get_connection()?;
        if Database::user_by_id(&conn, user_id)?.is_none() {
            return Err(ChatLedgerError::UserNotFound(user_id));
        }
        Database::deletion_stats(&conn, user_id)
    }

    // ----- sending -----

    /// Create a message and fan out its notification, atomically.
    ///
    /// The notification dispatcher runs only here, never on edits, so each
    /// message produces exactly one notification for its receiver.
    pub fn send_message(&self, new_message: NewMessage) -> Result<Message> {
        InputValidator::validate_message_content(&new_message.content)?;

        let mut conn = self.db.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let sender = Database::user_by_id(&tx, new_message.sender_id)?
            .ok_or(ChatLedgerError::UserNotFound(new_message.sender_id))?;
        if Database::user_by_id(&tx, new_message.receiver_id)?.is_none() {
            return Err(ChatLedgerError::UserNotFound(new_message.receiver_id));
        }
        if let Some(parent_id) = new_message.parent_message_id {
            // The parent must already be persisted, which also rules out a
            // message ever becoming its own ancestor.
            if Database::message_by_id(&tx, parent_id)?.is_none() {
                return Err(ChatLedgerError::MessageNotFound(parent_id));
            }
        }

        let mut message = Database::insert_message(&tx, &new_message)?;
        let notification = Self::dispatch_created(&tx, &sender, &mut message)?;

        tx.commit()?;
        self.metrics.record_message_sent();
        self.metrics.record_notification_created();
        info!(
            message_id = message.id,
            sender_id = message.sender_id,
            receiver_id = message.receiver_id,
            notification_id = notification.id,
            "message sent"
        );
        Ok(message)
    }

    /// Notification dispatcher, run once per created message.
    ///
    /// Also enforces the creation invariant: a freshly created message is
    /// always unread, whatever the caller put in the payload.
    fn dispatch_created(
        conn: &Connection,
        sender: &User,
        message: &mut Message,
    ) -> Result<Notification> {
        if Database::force_unread(conn, message.id)? {
            debug!(message_id = message.id, "new message arrived marked read; forced unread");
            message.is_read = false;
        }

        let title = format!("New message from {}", sender.username);
        let content = format!(
            "You have received a new message: '{}'",
            content_preview(&message.content)
        );
        Database::insert_notification(
            conn,
            message.receiver_id,
            Some(message.id),
            NotificationType::Message,
            &title,
            &content,
        )
    }

    // ----- editing -----

    /// Edit a message's content, snapshotting the prior content first.
    ///
    /// `editor` is the user making the edit; when absent, the message's
    /// sender is recorded, matching the store's historical behavior. An
    /// unchanged content is a no-op: no history row, `edited` untouched.
    pub fn edit_message(
        &self,
        message_id: i64,
        new_content: &str,
        editor: Option<i64>,
    ) -> Result<Message> {
        InputValidator::validate_message_content(new_content)?;

        let mut conn = self.db.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let persisted = Database::message_by_id(&tx, message_id)?
            .ok_or(ChatLedgerError::MessageNotFound(message_id))?;

        if let Some(editor_id) = editor {
            // Sender and receiver are the only users who may touch a message;
            // both necessarily exist while the message does.
            if editor_id != persisted.sender_id && editor_id != persisted.receiver_id {
                return Err(ChatLedgerError::PermissionDenied(format!(
                    "user {editor_id} is neither sender nor receiver of message {message_id}"
                )));
            }
        }

        let edited_at = Utc::now().naive_utc();
        let Some(history) = Self::capture_edit_history(&tx, message_id, new_content, editor, edited_at)?
        else {
            // Unchanged content (or the row vanished underneath us): nothing
            // to write, nothing to mark.
            tx.commit()?;
            return Ok(persisted);
        };

        Database::apply_edit(&tx, message_id, new_content, edited_at)?;

        tx.commit()?;
        self.metrics.record_message_edited();
        info!(
            message_id,
            version = history.version,
            edited_by = history.edited_by_id,
            "message edited"
        );
        Ok(Message {
            content: new_content.to_string(),
            edited: true,
            edited_at: Some(edited_at),
            ..persisted
        })
    }

    /// Edit interceptor: capture the pre-change content as a history row.
    ///
    /// Reads the currently-persisted content (not any in-memory value) and
    /// compares. Returns `None` without writing when the content is
    /// unchanged, or when the message cannot be found, degrading a race with
    /// a concurrent delete to a no-op rather than failing the write.
    fn capture_edit_history(
        conn: &Connection,
        message_id: i64,
        new_content: &str,
        editor: Option<i64>,
        edited_at: chrono::NaiveDateTime,
    ) -> Result<Option<MessageHistory>> {
        let Some(persisted) = Database::message_by_id(conn, message_id)? else {
            debug!(message_id, "message vanished before history capture; skipping");
            return Ok(None);
        };

        if persisted.content == new_content {
            return Ok(None);
        }

        let version = Database::max_history_version(conn, message_id)? + 1;
        let edited_by = editor.unwrap_or(persisted.sender_id);

        match Database::insert_history(
            conn,
            message_id,
            &persisted.content,
            edited_by,
            edited_at,
            version,
        ) {
            Ok(history) => Ok(Some(history)),
            Err(ChatLedgerError::Database(e)) if is_unique_violation(&e) => {
                Err(ChatLedgerError::EditConflict {
                    message_id,
                    version,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Full edit history of a message, oldest version first.
    pub fn message_history(&self, message_id: i64) -> Result<Vec<MessageHistory>> {
        if self.db.get_message(message_id)?.is_none() {
            return Err(ChatLedgerError::MessageNotFound(message_id));
        }
        self.db.history_for_message(message_id)
    }

    // ----- deletion -----

    /// Delete a message. Only its sender or receiver may do so. Replies,
    /// history, and notifications cascade with it.
    pub fn delete_message(&self, message_id: i64, actor: i64) -> Result<()> {
        let mut conn = self.db.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let message = Database::message_by_id(&tx, message_id)?
            .ok_or(ChatLedgerError::MessageNotFound(message_id))?;
        if actor != message.sender_id && actor != message.receiver_id {
            return Err(ChatLedgerError::PermissionDenied(format!(
                "user {actor} is neither sender nor receiver of message {message_id}"
            )));
        }

        Database::delete_message_row(&tx, message_id)?;
        tx.commit()?;
        info!(message_id, actor, "message deleted");
        Ok(())
    }

    // ----- threads -----

    /// Reconstruct the thread containing `message_id`.
    ///
    /// The access check runs before any traversal: only the sender or
    /// receiver of the given message may view its thread. Both the root walk
    /// and the tree build share one transaction, so the result is a
    /// consistent snapshot.
    pub fn fetch_thread(&self, message_id: i64, actor: i64) -> Result<MessageThread> {
        let timer = MetricsTimer::new(self.metrics, "fetch_thread");
        let result = self.fetch_thread_inner(message_id, actor);
        timer.finish(result.is_ok());
        result
    }

    fn fetch_thread_inner(&self, message_id: i64, actor: i64) -> Result<MessageThread> {
        let conn = self.db.get_connection()?;
        let tx = conn.unchecked_transaction()?;

        let message = Database::message_by_id(&tx, message_id)?
            .ok_or(ChatLedgerError::MessageNotFound(message_id))?;
        if actor != message.sender_id && actor != message.receiver_id {
            return Err(ChatLedgerError::PermissionDenied(format!(
                "user {actor} may not view the thread of message {message_id}"
            )));
        }

        let result = thread::build_thread(&tx, message_id)?;
        tx.commit()?;
        self.metrics.record_thread_built(result.reply_count());
        Ok(result)
    }

    // ----- unread queries -----

    /// Unread received messages for a user, newest first, sender attached.
    pub fn unread_for(&self, user_id: i64) -> Result<Vec<UnreadMessage>> {
        self.db.unread_for(user_id)
    }

    /// Count of unread received messages for a user.
    pub fn unread_count(&self, user_id: i64) -> Result<usize> {
        self.db.unread_count(user_id)
    }

    /// Mark some or all of a user's unread received messages as read.
    /// Returns the number of rows actually updated.
    pub fn mark_read(&self, user_id: i64, message_ids: Option<&[i64]>) -> Result<usize> {
        let updated = self.db.mark_read(user_id, message_ids)?;
        debug!(user_id, updated, "messages marked read");
        Ok(updated)
    }

    // ----- notifications -----

    /// All notifications for a user, newest first.
    pub fn notifications_for(&self, user_id: i64) -> Result<Vec<Notification>> {
        self.db.notifications_for_user(user_id)
    }

    /// Count of unread notifications for a user.
    pub fn unread_notification_count(&self, user_id: i64) -> Result<usize> {
        self.db.unread_notification_count(user_id)
    }

    /// Mark every notification for a user as read; returns rows updated.
    pub fn mark_all_notifications_read(&self, user_id: i64) -> Result<usize> {
        self.db.mark_all_notifications_read(user_id)
    }

    /// Create a system notification: no backing message, type `system`.
    pub fn create_system_notification(
        &self,
        user_id: i64,
        title: &str,
        content: &str,
    ) -> Result<Notification> {
        InputValidator::validate_notification_title(title)?;

        let conn = self.db.get_connection()?;
        if Database::user_by_id(&conn, user_id)?.is_none() {
            return Err(ChatLedgerError::UserNotFound(user_id));
        }
        let notification = Database::insert_notification(
            &conn,
            user_id,
            None,
            NotificationType::System,
            title,
            content,
        )?;
        self.metrics.record_notification_created();
        Ok(notification)
    }
}

/// Truncated content preview used in notification bodies: the first
/// [`NOTIFICATION_PREVIEW_CHARS`] characters, with an ellipsis marker when
/// anything was cut.
fn content_preview(content: &str) -> String {
    let preview: String = content.chars().take(NOTIFICATION_PREVIEW_CHARS).collect();
    if content.chars().count() > NOTIFICATION_PREVIEW_CHARS {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::content_preview;

    #[test]
    fn preview_keeps_short_content_intact() {
        assert_eq!(content_preview("Hello"), "Hello");
    }

    #[test]
    fn preview_truncates_at_fifty_chars() {
        let long = "a".repeat(60);
        let preview = content_preview(&long);
        assert_eq!(preview, format!("{}...", "a".repeat(50)));
    }

    #[test]
    fn preview_counts_chars_not_bytes() {
        let long = "é".repeat(51);
        let preview = content_preview(&long);
        assert_eq!(preview.chars().count(), 53);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn preview_exact_boundary_has_no_ellipsis() {
        let exact = "b".repeat(50);
        assert_eq!(content_preview(&exact), exact);
    }
}
