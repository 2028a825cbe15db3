//! Periodic backup of the database and snapshot files
//!
//! Copies land in `backups/` with timestamped names; copies older than the
//! retention window are pruned on every run. The job protects against
//! operator mistakes and disk-level loss — flow durability itself comes
//! from the per-event snapshot, not from here.

use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::config::backup;
use crate::core::error::AppResult;

const BACKUP_DIR: &str = "backups";
const TIMESTAMP_FMT: &str = "%Y%m%d_%H%M%S";

fn ensure_backup_dir(base: &Path) -> AppResult<PathBuf> {
    let backup_dir = base.join(BACKUP_DIR);
    if !backup_dir.exists() {
        fs::create_dir_all(&backup_dir)?;
        log::info!("Created backup directory: {}", backup_dir.display());
    }
    Ok(backup_dir)
}

/// Copies one file into the backup directory under a timestamped name and
/// prunes expired copies. Missing sources are skipped silently — on a
/// fresh deployment the snapshot file does not exist yet.
pub fn create_backup(source: &str) -> AppResult<Option<PathBuf>> {
    create_backup_in(Path::new("."), source)
}

pub(crate) fn create_backup_in(base: &Path, source: &str) -> AppResult<Option<PathBuf>> {
    let source_path = Path::new(source);
    if !source_path.exists() {
        log::debug!("backup source not found, skipping: {}", source);
        return Ok(None);
    }

    let backup_dir = ensure_backup_dir(base)?;
    let timestamp = Utc::now().format(TIMESTAMP_FMT);
    let file_name = source_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("backup");
    let backup_path = backup_dir.join(format!("{timestamp}_{file_name}"));

    fs::copy(source_path, &backup_path)?;
    log::info!("Created backup: {}", backup_path.display());

    cleanup_old_backups(&backup_dir)?;

    Ok(Some(backup_path))
}

/// Removes backups older than the retention window, judged by the
/// timestamp encoded in the file name.
fn cleanup_old_backups(backup_dir: &Path) -> AppResult<()> {
    let cutoff = Utc::now() - ChronoDuration::days(backup::RETENTION_DAYS);

    for entry in fs::read_dir(backup_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(created) = parse_backup_timestamp(&path) else {
            continue;
        };
        if created < cutoff {
            if let Err(e) = fs::remove_file(&path) {
                log::warn!("Failed to remove old backup {}: {}", path.display(), e);
            } else {
                log::info!("Removed old backup: {}", path.display());
            }
        }
    }

    Ok(())
}

fn parse_backup_timestamp(path: &Path) -> Option<DateTime<Utc>> {
    let file_name = path.file_name()?.to_str()?;
    // Format: YYYYMMDD_HHMMSS_<original name>
    let timestamp_part = file_name.get(0..15)?;
    NaiveDateTime::parse_from_str(timestamp_part, TIMESTAMP_FMT)
        .ok()
        .map(|dt| dt.and_utc())
}
