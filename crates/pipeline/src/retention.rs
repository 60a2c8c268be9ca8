//! Retention sweeper
//!
//! Uploads and results are short-lived by contract: any file older than the
//! retention window may be deleted at any time. Consumers must treat a
//! missing result as `NotFound`, never as a crash.

use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// Delete files in `dir` older than `max_age`; returns how many were removed
pub fn sweep_dir(dir: &Path, max_age: Duration) -> std::io::Result<usize> {
    let now = SystemTime::now();
    let mut removed = 0;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }

        let modified = metadata.modified().unwrap_or(now);
        let age = now.duration_since(modified).unwrap_or_default();
        if age <= max_age {
            continue;
        }

        match std::fs::remove_file(entry.path()) {
            Ok(()) => {
                debug!("Deleted old file: {:?}", entry.path());
                removed += 1;
            }
            Err(e) => warn!("Error deleting file {:?}: {}", entry.path(), e),
        }
    }

    Ok(removed)
}
