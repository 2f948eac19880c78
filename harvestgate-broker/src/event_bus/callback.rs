// harvestgate-broker/src/event_bus/callback.rs
// ============================================================================
// Module: Callback event bus
// Description: Callback-backed `EventBus` (spec §6 "Event bus").
// Purpose: Let an embedder observe orchestrator events synchronously
//          without standing up a channel.
// Dependencies: harvestgate-core, std::sync::Arc
// ============================================================================

//! ## Overview
//! Modeled on `CallbackSink`
//! (`decision-gate-broker/src/sink/callback.rs`): a boxed `Fn` invoked
//! in-line with `publish`.

use std::sync::Arc;

use harvestgate_core::interfaces::BrokerError;
use harvestgate_core::interfaces::EventBus;
use harvestgate_core::interfaces::OrchestratorEvent;

/// Callback handler signature used by [`CallbackEventBus`].
type Handler = dyn Fn(&OrchestratorEvent) -> Result<(), BrokerError> + Send + Sync;

/// An [`EventBus`] that invokes a user-supplied callback for every event.
#[derive(Clone)]
pub struct CallbackEventBus {
    handler: Arc<Handler>,
}

impl CallbackEventBus {
    /// Builds an event bus from a handler function.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&OrchestratorEvent) -> Result<(), BrokerError> + Send + Sync + 'static,
    {
        Self { handler: Arc::new(handler) }
    }
}

impl EventBus for CallbackEventBus {
    fn publish(&self, event: &OrchestratorEvent) -> Result<(), BrokerError> {
        (self.handler)(event)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn callback_is_invoked_with_the_published_event() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let bus = CallbackEventBus::new(move |event| {
            #[allow(clippy::unwrap_used, reason = "test-only mutex, never contended")]
            seen_clone.lock().unwrap().push(event.clone());
            Ok(())
        });
        let run_id = harvestgate_core::RunId::new();
        let event = OrchestratorEvent::RunStarted { run_id, timestamp: time::OffsetDateTime::UNIX_EPOCH };
        bus.publish(&event).expect("publish");
        #[allow(clippy::unwrap_used, reason = "test-only mutex, never contended")]
        let recorded = seen.lock().unwrap();
        assert_eq!(recorded.len(), 1);
    }
}
