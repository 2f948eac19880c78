// harvestgate-core/src/core/page_snapshot.rs
// ============================================================================
// Module: PageSnapshot
// Description: First-class row indexing the truncated page HTML
//              carried inline in a `selector_fix` intervention's payload
//              (spec §4.6).
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::RunId;

/// Selector-drift payloads truncate the captured HTML to this many bytes
/// (spec §4.6: "a truncated page snapshot (<=50 KB)").
pub const MAX_SNAPSHOT_BYTES: usize = 50 * 1024;

/// A convenience index over a selector-fix intervention's page evidence.
/// The inline copy in [`crate::core::intervention::InterventionTask::payload`]
/// remains authoritative; this row exists only so selector-fix review can be
/// queried without deserializing every task payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSnapshot {
    /// The Run this snapshot was captured during.
    pub run_id: RunId,
    /// The field whose selector failed to match.
    pub field_name: String,
    /// When the snapshot was captured.
    #[serde(with = "time::serde::rfc3339")]
    pub captured_at: time::OffsetDateTime,
    /// The HTML, truncated to at most [`MAX_SNAPSHOT_BYTES`].
    pub truncated_html: String,
}

/// Truncates `html` to at most [`MAX_SNAPSHOT_BYTES`] bytes on a UTF-8
/// character boundary.
#[must_use]
pub fn truncate_snapshot(html: &str) -> String {
    if html.len() <= MAX_SNAPSHOT_BYTES {
        return html.to_string();
    }
    let mut end = MAX_SNAPSHOT_BYTES;
    while end > 0 && !html.is_char_boundary(end) {
        end -= 1;
    }
    html[..end].to_string()
}

impl PageSnapshot {
    /// Captures a new, truncated snapshot.
    #[must_use]
    pub fn new(run_id: RunId, field_name: impl Into<String>, html: &str, now: time::OffsetDateTime) -> Self {
        Self {
            run_id,
            field_name: field_name.into(),
            captured_at: now,
            truncated_html: truncate_snapshot(html),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_html_is_not_truncated() {
        let snapshot = PageSnapshot::new(RunId::new(), "title", "<h1>hi</h1>", time::OffsetDateTime::UNIX_EPOCH);
        assert_eq!(snapshot.truncated_html, "<h1>hi</h1>");
    }

    #[test]
    fn long_html_is_truncated_to_the_byte_cap() {
        let html = "x".repeat(MAX_SNAPSHOT_BYTES + 1000);
        let snapshot = PageSnapshot::new(RunId::new(), "title", &html, time::OffsetDateTime::UNIX_EPOCH);
        assert!(snapshot.truncated_html.len() <= MAX_SNAPSHOT_BYTES);
    }
}
