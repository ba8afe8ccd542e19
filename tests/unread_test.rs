//! Tests for the unread queries: listing, counting, and mark-read.

use chat_ledger::db::Database;
use chat_ledger::models::NewMessage;
use chat_ledger::service::MessageService;
use chrono::NaiveDate;
use tempfile::TempDir;

fn setup() -> (TempDir, MessageService) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = dir.path().join("test.db");
    let db = Database::new(db_path.to_str().expect("utf-8 path")).expect("Failed to create database");
    (dir, MessageService::new(db))
}

fn timed(sender: i64, receiver: i64, content: &str, seconds: u32) -> NewMessage {
    let mut message = NewMessage::new(sender, receiver, content);
    message.timestamp = Some(
        NaiveDate::from_ymd_opt(2026, 1, 1)
            .expect("valid date")
            .and_hms_opt(9, 0, seconds)
            .expect("valid time"),
    );
    message
}

#[test]
fn count_always_matches_listing_length() {
    let (_dir, service) = setup();
    let alice = service.register_user("alice").expect("register").id;
    let bob = service.register_user("bob").expect("register").id;

    assert_eq!(service.unread_count(bob).expect("count"), 0);
    assert!(service.unread_for(bob).expect("list").is_empty());

    for i in 0..4 {
        service
            .send_message(timed(alice, bob, &format!("message {i}"), i))
            .expect("send");
        assert_eq!(
            service.unread_count(bob).expect("count"),
            service.unread_for(bob).expect("list").len()
        );
    }

    service.mark_read(bob, None).expect("mark all");
    assert_eq!(
        service.unread_count(bob).expect("count"),
        service.unread_for(bob).expect("list").len()
    );
    assert_eq!(service.unread_count(bob).expect("count"), 0);
}

#[test]
fn unread_listing_is_newest_first_with_sender_attached() {
    let (_dir, service) = setup();
    let alice = service.register_user("alice").expect("register").id;
    let bob = service.register_user("bob").expect("register").id;

    let oldest = service
        .send_message(timed(alice, bob, "oldest", 0))
        .expect("send");
    let newest = service
        .send_message(timed(alice, bob, "newest", 30))
        .expect("send");
    let middle = service
        .send_message(timed(alice, bob, "middle", 15))
        .expect("send");

    let unread = service.unread_for(bob).expect("list");
    let ids: Vec<i64> = unread.iter().map(|u| u.message.id).collect();
    assert_eq!(ids, vec![newest.id, middle.id, oldest.id]);

    for entry in &unread {
        assert_eq!(entry.sender_username, "alice");
        assert!(!entry.message.is_read);
    }
}

#[test]
fn sent_messages_do_not_count_as_unread_for_the_sender() {
    let (_dir, service) = setup();
    let alice = service.register_user("alice").expect("register").id;
    let bob = service.register_user("bob").expect("register").id;

    service
        .send_message(timed(alice, bob, "outbound", 0))
        .expect("send");

    assert_eq!(service.unread_count(alice).expect("count"), 0);
    assert_eq!(service.unread_count(bob).expect("count"), 1);
}

#[test]
fn mark_read_with_subset_only_touches_that_subset() {
    let (_dir, service) = setup();
    let alice = service.register_user("alice").expect("register").id;
    let bob = service.register_user("bob").expect("register").id;

    let first = service
        .send_message(timed(alice, bob, "one", 0))
        .expect("send");
    let second = service
        .send_message(timed(alice, bob, "two", 1))
        .expect("send");
    service
        .send_message(timed(alice, bob, "three", 2))
        .expect("send");

    let updated = service
        .mark_read(bob, Some(&[first.id, second.id]))
        .expect("mark subset");
    assert_eq!(updated, 2);
    assert_eq!(service.unread_count(bob).expect("count"), 1);
}

#[test]
fn mark_read_silently_excludes_non_matching_ids() {
    let (_dir, service) = setup();
    let alice = service.register_user("alice").expect("register").id;
    let bob = service.register_user("bob").expect("register").id;
    let carol = service.register_user("carol").expect("register").id;

    let for_bob = service
        .send_message(timed(alice, bob, "for bob", 0))
        .expect("send");
    let for_carol = service
        .send_message(timed(alice, carol, "for carol", 1))
        .expect("send");

    // Already read rows and other receivers' rows are not errors; they just
    // don't count.
    service.mark_read(bob, Some(&[for_bob.id])).expect("mark");
    let updated = service
        .mark_read(bob, Some(&[for_bob.id, for_carol.id, 9999]))
        .expect("mark again");
    assert_eq!(updated, 0);

    // Carol's message is still unread for carol.
    assert_eq!(service.unread_count(carol).expect("count"), 1);
}

#[test]
fn mark_read_with_empty_subset_updates_nothing() {
    let (_dir, service) = setup();
    let alice = service.register_user("alice").expect("register").id;
    let bob = service.register_user("bob").expect("register").id;

    service
        .send_message(timed(alice, bob, "pending", 0))
        .expect("send");

    let updated = service.mark_read(bob, Some(&[])).expect("mark empty");
    assert_eq!(updated, 0);
    assert_eq!(service.unread_count(bob).expect("count"), 1);
}

#[test]
fn mark_read_without_ids_clears_everything_and_reports_rows() {
    let (_dir, service) = setup();
    let alice = service.register_user("alice").expect("register").id;
    let bob = service.register_user("bob").expect("register").id;

    for i in 0..5 {
        service
            .send_message(timed(alice, bob, &format!("message {i}"), i))
            .expect("send");
    }

    let updated = service.mark_read(bob, None).expect("mark all");
    assert_eq!(updated, 5);
    assert_eq!(service.unread_count(bob).expect("count"), 0);

    // Second run has nothing to do.
    assert_eq!(service.mark_read(bob, None).expect("mark again"), 0);
}
