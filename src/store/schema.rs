//! Version-gated schema migrations for the on-disk cache layout.
//!
//! Every step is additive and idempotent: re-running a step must be a no-op,
//! and no step may destroy data written by an earlier version. The layout
//! history:
//!
//! - v1: cache root with one file per collection (`restaurants.json`,
//!   legacy flat `reviews_<id>.json`)
//! - v2: per-restaurant review files move under `reviews/<id>.json`

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

/// Current on-disk layout version.
pub const SCHEMA_VERSION: u32 = 2;

/// Name of the version marker file inside the cache root.
const VERSION_FILE: &str = "schema_version";

/// Subdirectory holding per-restaurant review snapshots (v2+).
pub const REVIEWS_DIR: &str = "reviews";

/// Bring the cache root up to `SCHEMA_VERSION`, applying each missing step
/// in order and recording progress after every step.
pub fn migrate(root: &Path) -> Result<()> {
    fs::create_dir_all(root)
        .with_context(|| format!("Failed to create cache directory: {}", root.display()))?;

    let mut version = read_version(root)?;
    while version < SCHEMA_VERSION {
        let next = version + 1;
        apply_step(root, next)?;
        write_version(root, next)?;
        info!(from = version, to = next, "Migrated cache schema");
        version = next;
    }
    Ok(())
}

fn apply_step(root: &Path, step: u32) -> Result<()> {
    match step {
        // v1: nothing beyond the root directory itself; collections are
        // created lazily on first save.
        1 => Ok(()),

        // v2: reviews move from flat `reviews_<id>.json` files into a
        // `reviews/` subdirectory.
        2 => {
            let reviews_dir = root.join(REVIEWS_DIR);
            fs::create_dir_all(&reviews_dir).with_context(|| {
                format!("Failed to create reviews directory: {}", reviews_dir.display())
            })?;

            for entry in fs::read_dir(root)? {
                let entry = entry?;
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if let Some(rest) = name.strip_prefix("reviews_") {
                    if let Some(id) = rest.strip_suffix(".json") {
                        let target = reviews_dir.join(format!("{}.json", id));
                        debug!(from = %name, to = %target.display(), "Moving legacy review file");
                        fs::rename(entry.path(), &target).with_context(|| {
                            format!("Failed to move legacy review file {}", name)
                        })?;
                    }
                }
            }
            Ok(())
        }

        other => Err(anyhow::anyhow!("Unknown schema migration step: {}", other)),
    }
}

fn read_version(root: &Path) -> Result<u32> {
    let path = root.join(VERSION_FILE);
    if !path.exists() {
        return Ok(0);
    }
    let contents = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read schema version file: {}", path.display()))?;
    contents
        .trim()
        .parse()
        .with_context(|| format!("Invalid schema version: {:?}", contents))
}

fn write_version(root: &Path, version: u32) -> Result<()> {
    let path = root.join(VERSION_FILE);
    fs::write(&path, version.to_string())
        .with_context(|| format!("Failed to write schema version file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_migrate_creates_layout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("cache");
        migrate(&root).expect("migrate");

        assert!(root.join(REVIEWS_DIR).is_dir());
        assert_eq!(read_version(&root).expect("version"), SCHEMA_VERSION);
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().to_path_buf();
        migrate(&root).expect("first migrate");
        migrate(&root).expect("second migrate");
        assert_eq!(read_version(&root).expect("version"), SCHEMA_VERSION);
    }

    #[test]
    fn test_legacy_review_files_moved() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().to_path_buf();
        fs::create_dir_all(&root).expect("mkdir");
        // Simulate a v1 layout with a flat review file and a restaurant snapshot.
        fs::write(root.join("schema_version"), "1").expect("version");
        fs::write(root.join("reviews_7.json"), "{\"data\":[],\"synced_at\":\"2020-01-01T00:00:00Z\"}")
            .expect("legacy file");
        fs::write(root.join("restaurants.json"), "{}").expect("restaurants");

        migrate(&root).expect("migrate");

        assert!(!root.join("reviews_7.json").exists());
        assert!(root.join(REVIEWS_DIR).join("7.json").exists());
        // Existing collections are untouched by the additive step.
        assert!(root.join("restaurants.json").exists());
    }
}
