// harvestgate-core/src/core/mod.rs
// ============================================================================
// Module: Harvestgate Core Types
// Description: Canonical scrape-orchestration schema (spec §3 data model).
// Purpose: Provide stable, serializable types shared by every component.
// Dependencies: harvestgate-fields, serde, time, uuid
// ============================================================================

//! ## Overview
//! These are the entities of spec §3 — Job, FieldMap, Run, Record, RunEvent,
//! SessionVault, DomainStats, DomainConfig, InterventionTask — plus two
//! supplemental entities (RuleCandidate, PageSnapshot). They are plain
//! data; the behavior that operates on them
//! (classification, escalation, adaptive bias, intervention, orchestration)
//! lives in the sibling top-level modules.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod domain_config;
pub mod domain_stats;
pub mod field_map;
pub mod identifiers;
pub mod intervention;
pub mod job;
pub mod page_snapshot;
pub mod record;
pub mod rule_candidate;
pub mod run;
pub mod run_event;
pub mod session_vault;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use domain_config::DomainAccessClass;
pub use domain_config::DomainConfig;
pub use domain_config::SessionRequirement;
pub use domain_stats::DomainStats;
pub use field_map::FieldMap;
pub use field_map::SelectorHistoryEntry;
pub use identifiers::FieldMapId;
pub use identifiers::InterventionTaskId;
pub use identifiers::JobId;
pub use identifiers::RecordId;
pub use identifiers::RuleCandidateId;
pub use identifiers::RunEventId;
pub use identifiers::RunId;
pub use intervention::InterventionKind;
pub use intervention::InterventionPriority;
pub use intervention::InterventionStatus;
pub use intervention::InterventionTask;
pub use intervention::Resolution;
pub use intervention::TriggerReason;
pub use job::CrawlMode;
pub use job::EngineMode;
pub use job::Job;
pub use job::ListConfig;
pub use page_snapshot::MAX_SNAPSHOT_BYTES;
pub use page_snapshot::PageSnapshot;
pub use page_snapshot::truncate_snapshot;
pub use record::Record;
pub use rule_candidate::RuleCandidate;
pub use rule_candidate::RuleCandidateKind;
pub use run::AttemptDecision;
pub use run::Engine;
pub use run::EngineAttempt;
pub use run::FailureKind;
pub use run::Run;
pub use run::RunStatus;
pub use run_event::RunEvent;
pub use run_event::RunEventLevel;
pub use session_vault::SessionKey;
pub use session_vault::SessionVault;
pub use session_vault::Viewport;
