//! Input validation and sanitization

use std::path::Path;

use crate::error::{ChatLedgerError, Result};

/// Maximum accepted message content length, in characters.
pub const MAX_CONTENT_LENGTH: usize = 10_000;

/// Maximum accepted notification title length, in characters.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Validation utilities for input sanitization and edge case handling
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate a username
    pub fn validate_username(username: &str) -> Result<()> {
        if username.trim().is_empty() {
            return Err(ChatLedgerError::InvalidInput(
                "Username cannot be empty".to_string(),
            ));
        }

        if username.len() > 100 {
            return Err(ChatLedgerError::InvalidInput(
                "Username too long (max 100 characters)".to_string(),
            ));
        }

        // Check for potentially dangerous characters
        if username.contains('\0') || username.contains('\r') || username.contains('\n') {
            return Err(ChatLedgerError::InvalidInput(
                "Username contains invalid characters".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate message content before any persistence occurs
    pub fn validate_message_content(content: &str) -> Result<()> {
        if content.trim().is_empty() {
            return Err(ChatLedgerError::InvalidInput(
                "Message content cannot be empty".to_string(),
            ));
        }

        if content.chars().count() > MAX_CONTENT_LENGTH {
            return Err(ChatLedgerError::InvalidInput(format!(
                "Message content too long (max {MAX_CONTENT_LENGTH} characters)"
            )));
        }

        if content.contains('\0') {
            return Err(ChatLedgerError::InvalidInput(
                "Message content contains invalid characters".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate a notification title
    pub fn validate_notification_title(title: &str) -> Result<()> {
        if title.trim().is_empty() {
            return Err(ChatLedgerError::InvalidInput(
                "Notification title cannot be empty".to_string(),
            ));
        }

        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(ChatLedgerError::InvalidInput(format!(
                "Notification title too long (max {MAX_TITLE_LENGTH} characters)"
            )));
        }

        Ok(())
    }

    /// Validate the database path
    pub fn validate_database_path(path: &Path) -> Result<()> {
        let path_str = path.to_string_lossy();

        if path_str.is_empty() {
            return Err(ChatLedgerError::InvalidInput(
                "Database path cannot be empty".to_string(),
            ));
        }

        // Check for path traversal attempts
        if path_str.contains("..") {
            return Err(ChatLedgerError::InvalidInput(
                "Database path contains potentially dangerous components".to_string(),
            ));
        }

        if path_str.len() > 4096 {
            return Err(ChatLedgerError::InvalidInput(
                "Database path too long (max 4096 characters)".to_string(),
            ));
        }

        Ok(())
    }

    /// Sanitize text input
    #[must_use]
    pub fn sanitize_text(text: &str) -> String {
        text.chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t' || *c == '\r')
            .collect::<String>()
            .trim()
            .to_string()
    }
}
