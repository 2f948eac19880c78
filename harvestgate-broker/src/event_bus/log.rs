// harvestgate-broker/src/event_bus/log.rs
// ============================================================================
// Module: Log event bus
// Description: Log-only `EventBus` (spec §6 "Event bus").
// Purpose: Record every orchestrator event via `tracing`, with no external
//          delivery.
// Dependencies: harvestgate-core, tracing, serde_json
// ============================================================================

//! ## Overview
//! Modeled on `LogSink` (`decision-gate-broker/src/sink/log.rs`):
//! structurally the same "write a record, never fail the caller" shape,
//! retargeted at [`OrchestratorEvent`] and `tracing` instead of an arbitrary
//! writer.

use harvestgate_core::interfaces::BrokerError;
use harvestgate_core::interfaces::EventBus;
use harvestgate_core::interfaces::OrchestratorEvent;

/// An [`EventBus`] that only logs events via `tracing::info!`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventBus;

impl LogEventBus {
    /// Builds a new log-only event bus.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl EventBus for LogEventBus {
    fn publish(&self, event: &OrchestratorEvent) -> Result<(), BrokerError> {
        let payload = serde_json::to_value(event).map_err(|err| BrokerError::Unavailable(err.to_string()))?;
        tracing::info!(event = %payload, "orchestrator event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_never_fails_for_a_well_formed_event() {
        let bus = LogEventBus::new();
        let event = OrchestratorEvent::RunStarted { run_id: harvestgate_core::RunId::new(), timestamp: time::OffsetDateTime::UNIX_EPOCH };
        assert!(bus.publish(&event).is_ok());
    }
}
