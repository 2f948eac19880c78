// harvestgate-sessions/src/persistence.rs
// ============================================================================
// Module: Session disk persistence
// Description: One JSON file per (domain, proxy) key under a configured
//              directory (spec §4.5 "Disk persistence", §6 "Persisted state
//              layout").
// ============================================================================

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use harvestgate_core::SessionKey;
use harvestgate_core::SessionVault;
use thiserror::Error;

/// Sessions persisted to disk older than this many hours are dropped on
/// load (spec §4.5 `MAX_PERSISTED_AGE_HOURS=24`).
pub const MAX_PERSISTED_AGE_HOURS: i64 = 24;

/// Errors raised while reading or writing session files.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The directory or file could not be read/written.
    #[error("session persistence io error: {0}")]
    Io(#[from] io::Error),
    /// The stored JSON did not deserialize as a [`SessionVault`].
    #[error("session persistence decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Deterministically maps a [`SessionKey`] to a filename: a `.json` file
/// named after the hex SHA-256 of `"{site_domain}|{proxy_identity}"`, so
/// that neither component's content can escape the directory (cf.
/// `short_hash` in `harvestgate-core`'s intervention engine).
#[must_use]
pub fn file_name_for(key: &SessionKey) -> String {
    use sha2::Digest;
    let digest = sha2::Sha256::digest(format!("{}|{}", key.site_domain, key.proxy_identity).as_bytes());
    let hex: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
    format!("{hex}.json")
}

/// Writes `session` to `dir` as one JSON file per key, creating `dir` if it
/// does not yet exist.
///
/// # Errors
///
/// Returns [`PersistenceError`] if the directory cannot be created or the
/// file cannot be written.
pub fn save(dir: &Path, session: &SessionVault) -> Result<(), PersistenceError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name_for(&session.key));
    let encoded = serde_json::to_vec_pretty(session)?;
    fs::write(path, encoded)?;
    Ok(())
}

/// Deletes the persisted file for `key`, if any. Missing files are not an
/// error.
///
/// # Errors
///
/// Returns [`PersistenceError`] for any I/O failure other than "not found".
pub fn delete(dir: &Path, key: &SessionKey) -> Result<(), PersistenceError> {
    let path = dir.join(file_name_for(key));
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Loads every session file under `dir`, dropping (and not returning) any
/// whose `first_seen` is older than [`MAX_PERSISTED_AGE_HOURS`] relative to
/// `now` (spec §4.5: "On startup, load all session files; drop those older
/// than `MAX_PERSISTED_AGE_HOURS`").
///
/// A missing directory yields an empty result rather than an error, since a
/// fresh deployment has never persisted anything yet.
///
/// # Errors
///
/// Returns [`PersistenceError`] if `dir` exists but cannot be read, or a
/// stored file cannot be read once its directory entry is found.
pub fn load_all(dir: &Path, now: time::OffsetDateTime) -> Result<Vec<SessionVault>, PersistenceError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };

    let mut sessions = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path: PathBuf = entry.path();
        if path.extension().and_then(std::ffi::OsStr::to_str) != Some("json") {
            continue;
        }
        let bytes = fs::read(&path)?;
        let session: SessionVault = serde_json::from_slice(&bytes)?;
        let age_hours = (now - session.first_seen).whole_hours();
        if age_hours < MAX_PERSISTED_AGE_HOURS {
            sessions.push(session);
        }
    }
    Ok(sessions)
}
