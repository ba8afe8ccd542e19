//! Unit tests for the validation module

use std::path::Path;

use chat_ledger::validation::{InputValidator, MAX_CONTENT_LENGTH, MAX_TITLE_LENGTH};

#[test]
fn test_validate_username_valid() {
    assert!(InputValidator::validate_username("alice").is_ok());
}

#[test]
fn test_validate_username_empty() {
    assert!(InputValidator::validate_username("").is_err());
}

#[test]
fn test_validate_username_whitespace_only() {
    assert!(InputValidator::validate_username("   ").is_err());
}

#[test]
fn test_validate_username_too_long() {
    let long_name = "a".repeat(101);
    assert!(InputValidator::validate_username(&long_name).is_err());
}

#[test]
fn test_validate_username_exactly_100_chars() {
    let name = "a".repeat(100);
    assert!(InputValidator::validate_username(&name).is_ok());
}

#[test]
fn test_validate_username_with_null_byte() {
    assert!(InputValidator::validate_username("ali\0ce").is_err());
}

#[test]
fn test_validate_username_with_newline() {
    assert!(InputValidator::validate_username("ali\nce").is_err());
}

#[test]
fn test_validate_content_valid() {
    assert!(InputValidator::validate_message_content("Hello there").is_ok());
}

#[test]
fn test_validate_content_empty() {
    assert!(InputValidator::validate_message_content("").is_err());
}

#[test]
fn test_validate_content_whitespace_only() {
    assert!(InputValidator::validate_message_content(" \t\n ").is_err());
}

#[test]
fn test_validate_content_at_limit() {
    let content = "x".repeat(MAX_CONTENT_LENGTH);
    assert!(InputValidator::validate_message_content(&content).is_ok());
}

#[test]
fn test_validate_content_over_limit() {
    let content = "x".repeat(MAX_CONTENT_LENGTH + 1);
    assert!(InputValidator::validate_message_content(&content).is_err());
}

#[test]
fn test_validate_content_counts_chars_not_bytes() {
    // Multi-byte characters up to the limit are fine.
    let content = "é".repeat(MAX_CONTENT_LENGTH);
    assert!(InputValidator::validate_message_content(&content).is_ok());
}

#[test]
fn test_validate_content_with_null_byte() {
    assert!(InputValidator::validate_message_content("bad\0content").is_err());
}

#[test]
fn test_validate_title_valid() {
    assert!(InputValidator::validate_notification_title("New message from alice").is_ok());
}

#[test]
fn test_validate_title_empty() {
    assert!(InputValidator::validate_notification_title("").is_err());
}

#[test]
fn test_validate_title_over_limit() {
    let title = "t".repeat(MAX_TITLE_LENGTH + 1);
    assert!(InputValidator::validate_notification_title(&title).is_err());
}

#[test]
fn test_validate_database_path_valid() {
    assert!(InputValidator::validate_database_path(Path::new("data/ledger.db")).is_ok());
}

#[test]
fn test_validate_database_path_empty() {
    assert!(InputValidator::validate_database_path(Path::new("")).is_err());
}

#[test]
fn test_validate_database_path_traversal() {
    assert!(InputValidator::validate_database_path(Path::new("../../etc/passwd")).is_err());
}

#[test]
fn test_sanitize_text_removes_control_chars() {
    let sanitized = InputValidator::sanitize_text("hello\u{0007} world");
    assert_eq!(sanitized, "hello world");
}

#[test]
fn test_sanitize_text_keeps_newlines_and_tabs() {
    let sanitized = InputValidator::sanitize_text("line one\n\tline two");
    assert_eq!(sanitized, "line one\n\tline two");
}

#[test]
fn test_sanitize_text_trims() {
    let sanitized = InputValidator::sanitize_text("  padded  ");
    assert_eq!(sanitized, "padded");
}
