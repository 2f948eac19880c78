// harvestgate-broker/src/event_bus/mod.rs
// ============================================================================
// Module: Event bus implementations
// Description: Three `EventBus` implementations (spec §6 "Event bus"):
//              log, channel, callback.
// ============================================================================

//! ## Overview
//! Every implementation here is best-effort: spec §6 is explicit that "the
//! bus is not authoritative" and "consumers are free to drop events," so
//! none of these types ever cause [`Orchestrator::execute_run`] to fail —
//! [`EventBus::publish`] failures are logged by the orchestrator and
//! swallowed.
//!
//! [`Orchestrator::execute_run`]: harvestgate_core::orchestrator::Orchestrator::execute_run
//! [`EventBus::publish`]: harvestgate_core::interfaces::EventBus::publish

pub mod callback;
pub mod channel;
pub mod log;

pub use callback::CallbackEventBus;
pub use channel::ChannelEventBus;
pub use log::LogEventBus;
