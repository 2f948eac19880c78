// harvestgate-store-sqlite/src/schema.rs
// ============================================================================
// Module: Schema
// Description: DDL for every Harvestgate entity table.
// Purpose: Keep the `CREATE TABLE`/`CREATE INDEX` statements in one place,
//          applied once inside a transaction at store open time.
// Dependencies: rusqlite
// ============================================================================

//! ## Overview
//! Every entity is stored as a canonical JSON blob (`data`) next to the
//! natural-key/indexed columns the store contract's query shapes need (spec
//! §6: "indexes on `Run.status`, `InterventionTask.status`, and
//! `(DomainStats.domain, DomainStats.engine)`"). `FieldMap` and
//! `SessionVault` are keyed by their natural composite key rather than a
//! surrogate id, since `save_*` is documented as "insert or full replace"
//! against that key.

use rusqlite::Transaction;

/// Current schema version recorded in `store_meta`.
pub const SCHEMA_VERSION: i64 = 1;

/// Creates every table and index if they do not already exist.
pub fn create_tables(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS jobs (
            id TEXT PRIMARY KEY,
            data TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS field_maps (
            job_id TEXT NOT NULL,
            field_name TEXT NOT NULL,
            data TEXT NOT NULL,
            PRIMARY KEY (job_id, field_name)
        );

        CREATE TABLE IF NOT EXISTS runs (
            id TEXT PRIMARY KEY,
            job_id TEXT NOT NULL,
            status TEXT NOT NULL,
            data TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_runs_status ON runs (status);

        CREATE TABLE IF NOT EXISTS run_events (
            id TEXT PRIMARY KEY,
            run_id TEXT NOT NULL,
            data TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_run_events_run ON run_events (run_id, rowid);

        CREATE TABLE IF NOT EXISTS records (
            id TEXT PRIMARY KEY,
            run_id TEXT NOT NULL,
            sequence INTEGER NOT NULL,
            data TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_records_run ON records (run_id, sequence);

        CREATE TABLE IF NOT EXISTS session_vaults (
            site_domain TEXT NOT NULL,
            proxy_identity TEXT NOT NULL,
            data TEXT NOT NULL,
            PRIMARY KEY (site_domain, proxy_identity)
        );

        CREATE TABLE IF NOT EXISTS domain_stats (
            domain TEXT NOT NULL,
            engine TEXT NOT NULL,
            data TEXT NOT NULL,
            PRIMARY KEY (domain, engine)
        );

        CREATE TABLE IF NOT EXISTS domain_configs (
            domain TEXT PRIMARY KEY,
            data TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS intervention_tasks (
            id TEXT PRIMARY KEY,
            run_id TEXT NOT NULL,
            status TEXT NOT NULL,
            expires_at_unix_ms INTEGER,
            data TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_intervention_status ON intervention_tasks (status);
        CREATE INDEX IF NOT EXISTS idx_intervention_run ON intervention_tasks (run_id);

        CREATE TABLE IF NOT EXISTS rule_candidates (
            id TEXT PRIMARY KEY,
            job_id TEXT NOT NULL,
            data TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS page_snapshots (
            run_id TEXT NOT NULL,
            field_name TEXT NOT NULL,
            data TEXT NOT NULL,
            PRIMARY KEY (run_id, field_name)
        );",
    )
}
