//! Optional sink for structured diagnostic events.
//!
//! Components take an `Arc<dyn DiagnosticsSink>` and default to
//! [`NullDiagnostics`]. Nothing in the pipeline depends on what a sink does.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

/// A structured event worth surfacing to an operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticEvent {
    /// No filter rule matched, so the path was included by default.
    IncludedByDefault {
        /// The filtered path, in display form.
        path: String,
    },
    /// A filter rule excluded the path.
    ExcludedByRule {
        /// The filtered path, in display form.
        path: String,
        /// Description of the matching rule.
        rule: String,
    },
    /// A filesystem watcher lost events and must rescan.
    WatcherBufferOverflow {
        /// The watched root.
        root: String,
    },
    /// An unexpected per-item failure was caught and skipped.
    UnexpectedError {
        /// What was being done.
        context: String,
        /// The error, in display form.
        error: String,
    },
}

impl fmt::Display for DiagnosticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticEvent::IncludedByDefault { path } => {
                write!(f, "{path} included: no filter rule matched")
            }
            DiagnosticEvent::ExcludedByRule { path, rule } => {
                write!(f, "{path} excluded by rule {rule}")
            }
            DiagnosticEvent::WatcherBufferOverflow { root } => {
                write!(f, "watcher buffer overflowed for {root}")
            }
            DiagnosticEvent::UnexpectedError { context, error } => {
                write!(f, "unexpected error while {context}: {error}")
            }
        }
    }
}

/// Receives diagnostic events.
pub trait DiagnosticsSink: Send + Sync {
    /// Record one event.
    fn record(&self, event: DiagnosticEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDiagnostics;

impl NullDiagnostics {
    /// A shared no-op sink.
    pub fn shared() -> Arc<dyn DiagnosticsSink> {
        Arc::new(NullDiagnostics)
    }
}

impl DiagnosticsSink for NullDiagnostics {
    fn record(&self, _event: DiagnosticEvent) {}
}

/// Re-emits events as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticsSink for TracingDiagnostics {
    fn record(&self, event: DiagnosticEvent) {
        match &event {
            DiagnosticEvent::IncludedByDefault { path } => {
                debug!(path = %path, "included by default");
            }
            DiagnosticEvent::ExcludedByRule { path, rule } => {
                debug!(path = %path, rule = %rule, "excluded by rule");
            }
            DiagnosticEvent::WatcherBufferOverflow { root } => {
                info!(root = %root, "watcher buffer overflow, rescanning");
            }
            DiagnosticEvent::UnexpectedError { context, error } => {
                warn!(context = %context, error = %error, "unexpected error");
            }
        }
    }
}
