// harvestgate-core/src/lib.rs
// ============================================================================
// Module: Harvestgate Core Library
// Description: Public API surface for the scrape orchestration core.
// Purpose: Expose the data model, the pure decision components (C1/C3/C4/C6),
//          the collaborator interfaces (§6), and the run-loop orchestrator
//          (C7).
// Dependencies: crate::{core, classifier, escalation, adaptive,
//               intervention_engine, interfaces, orchestrator}
// ============================================================================

//! ## Overview
//! Harvestgate core is a scrape orchestration engine: given a declarative
//! [`Job`], it selects an extraction engine, runs the extraction, classifies
//! failures, escalates between engines, learns per-domain performance,
//! pauses on human-interventionable conditions, and persists structured
//! [`Record`]s. It is backend-agnostic and integrates through the explicit
//! interfaces in [`interfaces`] rather than embedding a transport, database,
//! or browser driver directly.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod adaptive;
pub mod classifier;
pub mod confidence_filter;
pub mod core;
pub mod escalation;
pub mod interfaces;
pub mod intervention_engine;
pub mod orchestrator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::AttemptDecision;
pub use core::CrawlMode;
pub use core::DomainAccessClass;
pub use core::DomainConfig;
pub use core::DomainStats;
pub use core::Engine;
pub use core::EngineAttempt;
pub use core::EngineMode;
pub use core::FailureKind;
pub use core::FieldMap;
pub use core::FieldMapId;
pub use core::InterventionKind;
pub use core::InterventionPriority;
pub use core::InterventionStatus;
pub use core::InterventionTask;
pub use core::InterventionTaskId;
pub use core::Job;
pub use core::JobId;
pub use core::ListConfig;
pub use core::Record;
pub use core::RecordId;
pub use core::Resolution;
pub use core::RuleCandidate;
pub use core::RuleCandidateId;
pub use core::RuleCandidateKind;
pub use core::Run;
pub use core::RunEvent;
pub use core::RunEventId;
pub use core::RunEventLevel;
pub use core::RunId;
pub use core::RunStatus;
pub use core::SelectorHistoryEntry;
pub use core::SessionKey;
pub use core::SessionRequirement;
pub use core::SessionVault;
pub use core::TriggerReason;
pub use core::Viewport;

pub use classifier::ClassifiedFailure;
pub use classifier::TransportError;
pub use classifier::classify_status;
pub use classifier::classify_transport_error;

pub use confidence_filter::RecordDisposition;
pub use confidence_filter::filter_low_confidence;

pub use escalation::EscalationDecision;
pub use escalation::EscalationInput;
pub use escalation::decide_escalation;

pub use adaptive::EngineBias;
pub use adaptive::bias_initial_engine;
pub use adaptive::record_outcome;

pub use intervention_engine::BlockDecision;
pub use intervention_engine::InterventionSpec;
pub use intervention_engine::SessionPresence;
pub use intervention_engine::auth_expired;
pub use intervention_engine::classify_block;
pub use intervention_engine::hard_block;
pub use intervention_engine::low_confidence;
pub use intervention_engine::selector_drift;

pub use interfaces::AdapterError;
pub use interfaces::AdapterRequest;
pub use interfaces::AdapterResponse;
pub use interfaces::Broker;
pub use interfaces::BrokerError;
pub use interfaces::EngineAdapter;
pub use interfaces::EventBus;
pub use interfaces::OrchestratorEvent;
pub use interfaces::RawItem;
pub use interfaces::RunStore;
pub use interfaces::SessionPool;
pub use interfaces::SessionProbeOutcome;
pub use interfaces::SessionProber;
pub use interfaces::StoreError;

pub use orchestrator::MAX_ESCALATIONS;
pub use orchestrator::Orchestrator;
pub use orchestrator::OrchestratorConfig;
pub use orchestrator::OrchestratorError;
