//! Durable flow snapshot
//!
//! Active flow instances and session buckets live in memory; this module
//! writes them to a JSON file after every handled event and loads them
//! once at startup, so a process restart resumes users mid-flow instead
//! of silently dropping them. Instances whose state no longer parses are
//! treated as absent on load.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::AppResult;
use crate::flow::engine::InstanceSnapshot;
use crate::flow::session::BucketSnapshot;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowSnapshot {
    #[serde(default)]
    pub instances: Vec<InstanceSnapshot>,
    #[serde(default)]
    pub buckets: Vec<BucketSnapshot>,
}

/// Writes the snapshot atomically: a temp file in the same directory is
/// renamed over the target, so a crash mid-write leaves the previous
/// snapshot intact rather than a truncated file.
pub fn save(path: &str, snapshot: &FlowSnapshot) -> AppResult<()> {
    let json = serde_json::to_vec_pretty(snapshot)?;
    let tmp_path = format!("{path}.tmp");
    fs::write(&tmp_path, json)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Loads the snapshot. A missing file is a normal first start, not an
/// error; a corrupt file is logged and discarded rather than blocking
/// startup.
pub fn load(path: &str) -> FlowSnapshot {
    if !Path::new(path).exists() {
        return FlowSnapshot::default();
    }
    match fs::read(path).map_err(anyhow::Error::from).and_then(|bytes| {
        serde_json::from_slice::<FlowSnapshot>(&bytes).map_err(anyhow::Error::from)
    }) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            log::warn!("discarding unreadable snapshot {}: {}", path, err);
            FlowSnapshot::default()
        }
    }
}
