//! Saves and restores the whole store as a local JSON file.
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use super::store::SessionStore;

/// Load the snapshot at `path`, or an empty store if there isn't one
/// yet. Pending flags are cleared since no request survives a restart.
pub fn load(path: &Path) -> Result<SessionStore> {
    if !path.exists() {
        tracing::debug!("No snapshot at {}, starting empty", path.display());
        return Ok(SessionStore::default());
    }
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    let mut store: SessionStore = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;
    store.clear_pending();
    Ok(store)
}

pub fn save(store: &SessionStore, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let data = serde_json::to_string_pretty(store)?;
    fs::write(path, data).with_context(|| format!("Failed to write snapshot {}", path.display()))?;
    tracing::debug!("Saved snapshot to {}", path.display());
    Ok(())
}
