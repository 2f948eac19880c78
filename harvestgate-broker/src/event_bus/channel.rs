// harvestgate-broker/src/event_bus/channel.rs
// ============================================================================
// Module: Channel event bus
// Description: Channel-backed `EventBus`.
// Purpose: Fan out orchestrator events to an in-process consumer, leaving
//          any outward fan-out (SSE, webhooks) to a layer above this crate.
// Dependencies: harvestgate-core, std::sync::mpsc
// ============================================================================

//! ## Overview
//! Modeled on `ChannelSink` (`decision-gate-broker/src/sink/channel.rs`),
//! re-based on `std::sync::mpsc` instead of `tokio::sync::mpsc` since this
//! orchestrator runs synchronously rather than on an async runtime.

use std::sync::mpsc;

use harvestgate_core::interfaces::BrokerError;
use harvestgate_core::interfaces::EventBus;
use harvestgate_core::interfaces::OrchestratorEvent;

/// An [`EventBus`] that forwards every event into an `mpsc` channel.
#[derive(Debug, Clone)]
pub struct ChannelEventBus {
    sender: mpsc::Sender<OrchestratorEvent>,
}

impl ChannelEventBus {
    /// Builds an event bus over an existing sender, e.g. one feeding an SSE
    /// fan-out outside this crate's scope (spec §1).
    #[must_use]
    pub const fn new(sender: mpsc::Sender<OrchestratorEvent>) -> Self {
        Self { sender }
    }
}

impl EventBus for ChannelEventBus {
    fn publish(&self, event: &OrchestratorEvent) -> Result<(), BrokerError> {
        self.sender.send(event.clone()).map_err(|err| BrokerError::Unavailable(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn published_events_are_received_in_order() {
        let (sender, receiver) = mpsc::channel();
        let bus = ChannelEventBus::new(sender);
        let run_id = harvestgate_core::RunId::new();
        let event = OrchestratorEvent::RunStarted { run_id, timestamp: time::OffsetDateTime::UNIX_EPOCH };
        bus.publish(&event).expect("publish");
        let received = receiver.recv().expect("recv");
        assert!(matches!(received, OrchestratorEvent::RunStarted { run_id: received_id, .. } if received_id == run_id));
    }

    #[test]
    fn publish_fails_once_the_receiver_is_dropped() {
        let (sender, receiver) = mpsc::channel();
        drop(receiver);
        let bus = ChannelEventBus::new(sender);
        let event = OrchestratorEvent::RunStarted { run_id: harvestgate_core::RunId::new(), timestamp: time::OffsetDateTime::UNIX_EPOCH };
        assert!(bus.publish(&event).is_err());
    }
}
