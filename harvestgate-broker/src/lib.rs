// harvestgate-broker/src/lib.rs
// ============================================================================
// Module: Harvestgate Broker Library
// Description: Fire-and-forget run-execution broker and best-effort event
//              bus implementations (spec §6 "Broker contract", "Event bus").
// Purpose: Wire `harvestgate_core::interfaces::Broker` and `EventBus` to a
//          process-local worker loop without pulling in an async runtime.
// Dependencies: harvestgate-core, tracing
// ============================================================================

//! ## Overview
//! Every engine adapter in this workspace is synchronous
//! (`reqwest::blocking`), so the broker and event bus here are built on
//! `std::sync::mpsc` rather than `tokio`. [`broker`]
//! provides [`broker::ChannelBroker`], a channel-backed
//! [`harvestgate_core::interfaces::Broker`] a pool of workers can drain.
//! [`event_bus`] provides three [`harvestgate_core::interfaces::EventBus`]
//! implementations — log, channel, callback — mirroring the shape of
//! `decision-gate-broker/src/sink/*.rs`'s sink trio, retargeted at
//! [`harvestgate_core::interfaces::OrchestratorEvent`] instead of an
//! arbitrary disclosure payload.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod broker;
pub mod event_bus;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use broker::ChannelBroker;
pub use broker::ChannelBrokerError;
pub use event_bus::CallbackEventBus;
pub use event_bus::ChannelEventBus;
pub use event_bus::LogEventBus;
