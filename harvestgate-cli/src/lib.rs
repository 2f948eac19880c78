// harvestgate-cli/src/lib.rs
// ============================================================================
// Module: Harvestgate CLI Library
// Description: Shared, testable building blocks behind the `harvestgate`
//              binary: Job submission parsing and collaborator wiring.
// Purpose: Keep `main.rs` a thin argument dispatcher; everything it calls
//          is unit-testable without a process boundary.
// Dependencies: harvestgate-core, harvestgate-providers, harvestgate-sessions,
//               harvestgate-store-sqlite, harvestgate-broker, harvestgate-config
// ============================================================================

//! ## Overview
//! Two submodules back the CLI: [`submission`] turns a JSON Job description
//! into the `Job` + `FieldMap`s + `Run` triple the orchestrator needs, and
//! [`wiring`] assembles a concrete [`harvestgate_core::orchestrator::Orchestrator`]
//! from a loaded [`harvestgate_config::HarvestgateConfig`].

pub mod submission;
pub mod wiring;

pub use submission::JobSubmission;
pub use submission::SubmissionError;
pub use wiring::WiringError;
pub use wiring::build_orchestrator;
