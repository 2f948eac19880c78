// harvestgate-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Run Store
// Description: Durable RunStore backend using SQLite WAL.
// Purpose: Provide production-grade persistence for every Harvestgate entity
//          (spec §3, §6 "Store contract").
// Dependencies: harvestgate-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a `SQLite`-backed [`RunStore`](harvestgate_core::RunStore)
//! implementation. Every entity is stored as a canonical JSON blob alongside
//! the natural-key/indexed columns the store contract's query shapes need
//! (`Run.status`, `InterventionTask.status`, `(DomainStats.domain, engine)`).
//! Loads deserialize the blob directly; there is no hash-verification layer
//! here, since this entity set carries no tamper-evidence requirement.

pub mod schema;
pub mod store;

pub use store::SqliteRunStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
