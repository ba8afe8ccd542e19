//! Tests for notification fanout: exactly one per created message, preview
//! formatting, the forced-unread invariant, and system notifications.

use chat_ledger::db::Database;
use chat_ledger::models::{NewMessage, NotificationType};
use chat_ledger::service::MessageService;
use tempfile::TempDir;

fn setup() -> (TempDir, MessageService) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = dir.path().join("test.db");
    let db = Database::new(db_path.to_str().expect("utf-8 path")).expect("Failed to create database");
    (dir, MessageService::new(db))
}

fn two_users(service: &MessageService) -> (i64, i64) {
    let alice = service.register_user("alice").expect("register alice");
    let bob = service.register_user("bob").expect("register bob");
    (alice.id, bob.id)
}

#[test]
fn sending_creates_exactly_one_notification_for_the_receiver() {
    let (_dir, service) = setup();
    let (alice, bob) = two_users(&service);

    let message = service
        .send_message(NewMessage::new(alice, bob, "Hello"))
        .expect("send");

    let for_bob = service.notifications_for(bob).expect("notifications");
    assert_eq!(for_bob.len(), 1);

    let notification = &for_bob[0];
    assert_eq!(notification.user_id, bob);
    assert_eq!(notification.message_id, Some(message.id));
    assert_eq!(notification.notification_type, NotificationType::Message);
    assert!(!notification.is_read);
    assert_eq!(notification.title, "New message from alice");
    assert_eq!(
        notification.content,
        "You have received a new message: 'Hello'"
    );

    assert!(service
        .notifications_for(alice)
        .expect("notifications")
        .is_empty());
}

#[test]
fn edits_never_create_additional_notifications() {
    let (_dir, service) = setup();
    let (alice, bob) = two_users(&service);

    let message = service
        .send_message(NewMessage::new(alice, bob, "Hello"))
        .expect("send");
    service
        .edit_message(message.id, "Hello there", None)
        .expect("edit");
    service
        .edit_message(message.id, "Hi", None)
        .expect("edit again");

    assert_eq!(service.notifications_for(bob).expect("notifications").len(), 1);
}

#[test]
fn long_content_is_previewed_at_fifty_chars_with_ellipsis() {
    let (_dir, service) = setup();
    let (alice, bob) = two_users(&service);

    let long_content = "x".repeat(80);
    service
        .send_message(NewMessage::new(alice, bob, long_content.clone()))
        .expect("send");

    let notification = &service.notifications_for(bob).expect("notifications")[0];
    let expected_preview = "x".repeat(50);
    assert_eq!(
        notification.content,
        format!("You have received a new message: '{expected_preview}...'")
    );
}

#[test]
fn fifty_char_content_is_not_truncated() {
    let (_dir, service) = setup();
    let (alice, bob) = two_users(&service);

    let exact = "y".repeat(50);
    service
        .send_message(NewMessage::new(alice, bob, exact.clone()))
        .expect("send");

    let notification = &service.notifications_for(bob).expect("notifications")[0];
    assert_eq!(
        notification.content,
        format!("You have received a new message: '{exact}'")
    );
}

#[test]
fn messages_arriving_marked_read_are_forced_unread() {
    let (_dir, service) = setup();
    let (alice, bob) = two_users(&service);

    let mut payload = NewMessage::new(alice, bob, "imported");
    payload.is_read = true;

    let message = service.send_message(payload).expect("send");
    assert!(!message.is_read);

    let persisted = service
        .database()
        .get_message(message.id)
        .expect("fetch")
        .expect("exists");
    assert!(!persisted.is_read);
    assert_eq!(service.unread_count(bob).expect("count"), 1);
}

#[test]
fn system_notifications_have_no_backing_message() {
    let (_dir, service) = setup();
    let (alice, _bob) = two_users(&service);

    let notification = service
        .create_system_notification(alice, "Maintenance", "The service restarts at noon")
        .expect("system notification");

    assert_eq!(notification.message_id, None);
    assert_eq!(notification.notification_type, NotificationType::System);
    assert!(!notification.is_read);

    let listed = service.notifications_for(alice).expect("notifications");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].notification_type, NotificationType::System);
}

#[test]
fn unread_notification_count_and_mark_all_read() {
    let (_dir, service) = setup();
    let (alice, bob) = two_users(&service);

    for i in 0..3 {
        service
            .send_message(NewMessage::new(alice, bob, format!("message {i}")))
            .expect("send");
    }

    assert_eq!(service.unread_notification_count(bob).expect("count"), 3);

    let updated = service.mark_all_notifications_read(bob).expect("mark read");
    assert_eq!(updated, 3);
    assert_eq!(service.unread_notification_count(bob).expect("count"), 0);

    // A second pass has nothing left to update.
    assert_eq!(service.mark_all_notifications_read(bob).expect("mark read"), 0);
}
