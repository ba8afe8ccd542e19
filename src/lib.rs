//! Chat Ledger - Message Store with Edit History and Threads
//!
//! A Rust library for storing messages between users with an append-only
//! edit history, automatic notification fanout, cascade cleanup on user
//! deletion, and reconstruction of nested reply threads.
//!
//! # Features
//!
//! - Versioned edit history: every content change snapshots the prior text
//! - One notification per created message, targeted at the receiver
//! - Cascade delete of everything referencing a removed user or message
//! - Iterative thread reconstruction with deterministic sibling order
//! - Unread queries: list, count, and mark-read for a receiver

/// Configuration management
pub mod config;
/// Database operations and connection pooling
pub mod db;
/// Error types
pub mod error;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Database schema definitions
pub mod schema;
/// Message operations and write-path hooks
pub mod service;
/// Thread reconstruction
pub mod thread;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use db::Database;
pub use error::{ChatLedgerError, Result};
pub use models::{
    Message, MessageHistory, MessageThread, NewMessage, Notification, NotificationType,
    ThreadNode, UnreadMessage, User,
};
pub use service::MessageService;
