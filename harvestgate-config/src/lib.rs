// harvestgate-config/src/lib.rs
// ============================================================================
// Module: Harvestgate Configuration
// Description: Fail-closed TOML configuration loading and validation.
// Purpose: Provide the one place `harvestgate-cli` turns a config file into
//          the tunables every collaborator crate needs (spec §6
//          "Configuration").
// Dependencies: harvestgate-providers, harvestgate-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Grounded on `decision-gate-config`'s fail-closed philosophy: unknown keys
//! and out-of-range values are rejected at load time, not at use time. Every
//! section uses `#[serde(deny_unknown_fields)]`; [`HarvestgateConfig::validate`]
//! additionally range-checks every numeric tunable. Recognized options cover
//! both the orchestration tunables and the ambient logging/storage
//! additions: `default_max_attempts`, `http_timeout_seconds`,
//! `browser_nav_timeout_ms`, `session_persistence_dir`,
//! `session_persistence_enabled`, provider API keys and preference order,
//! `log_level`/`log_format`, `sqlite_path`, `sqlite_busy_timeout_ms`.
//!
//! Not carried over: `docs.rs` (a config-documentation generator),
//! `schema.rs` (`jsonschema`-based validation), `policy.rs`, `examples.rs` —
//! all specific to an MCP dispatch-policy domain with no counterpart here.
//! See `DESIGN.md`.

pub mod config;

pub use config::ConfigError;
pub use config::HarvestgateConfig;
