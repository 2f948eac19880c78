// harvestgate-core/src/classifier.rs
// ============================================================================
// Module: Classifier (C1)
// Description: Pure mapping from a transport error or HTTP status to the
//              closed failure-kind taxonomy (spec §4.1).
// ============================================================================

//! ## Overview
//! Total, stateless, I/O-free functions. Every terminal [`FailureKind`] a Run
//! may carry (spec §7) originates from one of these two mappings.

use crate::core::FailureKind;

/// A transport-level failure observed by an engine adapter before any HTTP
/// response was received (DNS failure, connection reset, TLS failure, a
/// timeout budget exceeded, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The adapter's timeout budget (spec §5: 20s http / 30s browser) was
    /// exceeded.
    Timeout,
    /// Any other connection-level failure (DNS, reset, refused, TLS).
    ConnectionFailed,
}

/// The result of classifying a failure: its machine-readable [`FailureKind`]
/// and a human-readable message (spec §4.1, §7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedFailure {
    /// The closed-taxonomy kind.
    pub kind: FailureKind,
    /// A human-readable counterpart, always populated (spec §7).
    pub message: String,
}

/// Classifies a transport-level exception. Total; no I/O.
#[must_use]
pub fn classify_transport_error(err: TransportError) -> ClassifiedFailure {
    match err {
        TransportError::Timeout => ClassifiedFailure {
            kind: FailureKind::Timeout,
            message: "the engine adapter's timeout budget was exceeded".to_string(),
        },
        TransportError::ConnectionFailed => ClassifiedFailure {
            kind: FailureKind::Network,
            message: "a network-level transport error occurred".to_string(),
        },
    }
}

/// Classifies an HTTP response by status code and an optional body
/// snippet. Total; no I/O.
///
/// Mapping (spec §4.1): 401/403 -> `blocked`; 429 -> `rate_limited`; other
/// 4xx/5xx -> `bad_response`; anything else (including 2xx, which should
/// never reach this function as a *failure*) -> `unknown`.
#[must_use]
pub fn classify_status(status: u16, body_snippet: Option<&str>) -> ClassifiedFailure {
    let message = match status {
        401 => "unauthorized: the target requires authentication".to_string(),
        403 => "forbidden: the target refused access".to_string(),
        429 => "rate limited: the target asked the client to back off".to_string(),
        400..=599 => format!("the target returned HTTP {status}"),
        _ => body_snippet
            .map(|snippet| format!("unrecognized status {status}: {snippet}"))
            .unwrap_or_else(|| format!("unrecognized status {status}")),
    };
    let kind = match status {
        401 | 403 => FailureKind::Blocked,
        429 => FailureKind::RateLimited,
        400..=599 => FailureKind::BadResponse,
        _ => FailureKind::Unknown,
    };
    ClassifiedFailure { kind, message }
}
