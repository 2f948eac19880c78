// harvestgate-core/src/core/run_event.rs
// ============================================================================
// Module: RunEvent
// Description: Append-only log entry for a Run (spec §3 "RunEvent").
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::RunEventId;
use crate::core::identifiers::RunId;

/// Severity of a [`RunEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEventLevel {
    /// Routine progress.
    Info,
    /// Recoverable anomaly (an escalation, a retried attempt).
    Warn,
    /// A terminal or pause-worthy condition.
    Error,
}

/// One append-only log entry for a [`crate::core::run::Run`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    /// Opaque identifier.
    pub id: RunEventId,
    /// The Run this event belongs to.
    pub run_id: RunId,
    /// Severity.
    pub level: RunEventLevel,
    /// Human-readable message.
    pub message: String,
    /// Structured metadata bag (engine, signals, identifiers, ...).
    pub meta: serde_json::Value,
    /// When the event was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: time::OffsetDateTime,
}

impl RunEvent {
    /// Creates a new event at `now`.
    #[must_use]
    pub fn new(
        run_id: RunId,
        level: RunEventLevel,
        message: impl Into<String>,
        meta: serde_json::Value,
        now: time::OffsetDateTime,
    ) -> Self {
        Self {
            id: RunEventId::new(),
            run_id,
            level,
            message: message.into(),
            meta,
            timestamp: now,
        }
    }
}
