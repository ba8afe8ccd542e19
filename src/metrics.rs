//! Metrics collection

use std::time::Duration;

use anyhow::Result;
use metrics::{counter, gauge, histogram};

/// Metrics collection and management
#[derive(Debug, Clone, Copy)]
pub struct MetricsCollector {
    /// Total database operations, labeled by operation and status
    pub db_operations_total: &'static str,
    /// Database operation latency histogram
    pub db_operation_duration: &'static str,

    /// Messages created
    pub messages_sent_total: &'static str,
    /// Content-changing edits recorded
    pub message_edits_total: &'static str,
    /// Notifications fanned out
    pub notifications_created_total: &'static str,
    /// Users deleted (with cascade)
    pub users_deleted_total: &'static str,
    /// Threads reconstructed
    pub threads_built_total: &'static str,
    /// Reply count per reconstructed thread
    pub thread_reply_count: &'static str,

    /// Errors, labeled by type and operation
    pub errors_total: &'static str,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            db_operations_total: "chat_ledger_db_operations_total",
            db_operation_duration: "chat_ledger_db_operation_duration_seconds",

            messages_sent_total: "chat_ledger_messages_sent_total",
            message_edits_total: "chat_ledger_message_edits_total",
            notifications_created_total: "chat_ledger_notifications_created_total",
            users_deleted_total: "chat_ledger_users_deleted_total",
            threads_built_total: "chat_ledger_threads_built_total",
            thread_reply_count: "chat_ledger_thread_reply_count",

            errors_total: "chat_ledger_errors_total",
        }
    }
}

impl MetricsCollector {
    /// Initialize metrics collection with a no-op recorder. A real exporter
    /// can be installed instead by the embedding application.
    pub fn init() -> Result<()> {
        metrics::set_global_recorder(metrics::NoopRecorder)
            .map_err(|e| anyhow::anyhow!("Failed to initialize metrics recorder: {e}"))?;
        Ok(())
    }

    /// Record database operation metrics
    pub fn record_db_operation(&self, operation: &str, duration: Duration, success: bool) {
        let status = if success { "success" } else { "error" };
        counter!(self.db_operations_total, "operation" => operation.to_string(), "status" => status)
            .increment(1);
        histogram!(self.db_operation_duration, "operation" => operation.to_string())
            .record(duration.as_secs_f64());

        if !success {
            counter!(self.errors_total, "type" => "database").increment(1);
        }
    }

    /// Record a created message
    pub fn record_message_sent(&self) {
        counter!(self.messages_sent_total).increment(1);
    }

    /// Record a content-changing edit
    pub fn record_message_edited(&self) {
        counter!(self.message_edits_total).increment(1);
    }

    /// Record a notification fanout
    pub fn record_notification_created(&self) {
        counter!(self.notifications_created_total).increment(1);
    }

    /// Record a user deletion
    pub fn record_user_deleted(&self) {
        counter!(self.users_deleted_total).increment(1);
    }

    /// Record a thread reconstruction and its size
    pub fn record_thread_built(&self, reply_count: usize) {
        counter!(self.threads_built_total).increment(1);
        gauge!(self.thread_reply_count).set(reply_count as f64);
    }

    /// Record error metrics
    pub fn record_error(&self, error_type: &str, operation: &str) {
        counter!(
            self.errors_total,
            "type" => error_type.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
    }
}

/// Performance timing wrapper for metrics
pub struct MetricsTimer {
    collector: MetricsCollector,
    operation: String,
    start: std::time::Instant,
}

impl MetricsTimer {
    /// Start timing `operation`.
    #[must_use]
    pub fn new(collector: MetricsCollector, operation: &str) -> Self {
        Self {
            collector,
            operation: operation.to_string(),
            start: std::time::Instant::now(),
        }
    }

    /// Stop timing and record the outcome.
    pub fn finish(self, success: bool) {
        let duration = self.start.elapsed();
        self.collector
            .record_db_operation(&self.operation, duration, success);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::default();
        assert_eq!(
            collector.messages_sent_total,
            "chat_ledger_messages_sent_total"
        );
    }

    #[test]
    fn test_recording_without_recorder_is_harmless() {
        let collector = MetricsCollector::default();
        collector.record_message_sent();
        collector.record_thread_built(3);
        collector.record_error("database", "send_message");
    }
}
