//! On-disk template cache.
//!
//! One subdirectory per derived key, holding the fetched template tree
//! plus a sidecar metadata file recording the write timestamp and TTL.
//! Reads consult the sidecar without locking: two concurrent fetches of
//! the same uncached key may both fetch and both write, and the last
//! writer wins. Expired entries are treated as misses, not deleted.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::TemplateResult;

/// Sidecar file name inside each cache entry directory.
pub const SIDECAR_FILE: &str = ".stamp-cache.json";

/// Sidecar metadata for a cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntryMeta {
    pub timestamp: DateTime<Utc>,
    pub ttl_seconds: u64,
}

impl CacheEntryMeta {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.timestamp);
        age.num_seconds() >= 0 && (age.num_seconds() as u64) < self.ttl_seconds
    }
}

/// Content-keyed, TTL-bounded store of fetched template trees.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
    ttl_seconds: u64,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>, ttl_seconds: u64) -> Self {
        Self {
            root: root.into(),
            ttl_seconds,
        }
    }

    /// Directory a key's tree would live in, whether or not it exists.
    pub fn entry_dir(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Look up a valid (unexpired) entry. Expired or unreadable entries
    /// are misses and are left on disk.
    pub fn lookup(&self, key: &str) -> Option<PathBuf> {
        let dir = self.entry_dir(key);
        let sidecar = dir.join(SIDECAR_FILE);
        let content = fs::read_to_string(&sidecar).ok()?;
        let meta: CacheEntryMeta = match serde_json::from_str(&content) {
            Ok(meta) => meta,
            Err(e) => {
                warn!("Unreadable cache sidecar {:?}: {}", sidecar, e);
                return None;
            }
        };
        if meta.is_valid(Utc::now()) {
            debug!("Cache hit for key {}", key);
            Some(dir)
        } else {
            debug!("Cache entry for key {} expired, treating as miss", key);
            None
        }
    }

    /// Store `source_dir`'s tree under `key`, replacing any previous
    /// entry, then write the sidecar.
    pub fn store(&self, key: &str, source_dir: &Path) -> TemplateResult<PathBuf> {
        let dir = self.entry_dir(key);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        fs::create_dir_all(&dir)?;
        copy_tree(source_dir, &dir)?;

        let meta = CacheEntryMeta {
            timestamp: Utc::now(),
            ttl_seconds: self.ttl_seconds,
        };
        fs::write(dir.join(SIDECAR_FILE), serde_json::to_string_pretty(&meta)?)?;
        debug!("Cached template tree under key {}", key);
        Ok(dir)
    }

    /// Copy a cached entry's tree into `target_dir`, skipping the sidecar.
    pub fn copy_out(&self, key: &str, target_dir: &Path) -> TemplateResult<()> {
        let dir = self.entry_dir(key);
        fs::create_dir_all(target_dir)?;
        for entry in WalkDir::new(&dir).min_depth(1).into_iter().filter_map(|e| e.ok()) {
            let relative = entry.path().strip_prefix(&dir).unwrap();
            if relative.to_string_lossy() == SIDECAR_FILE {
                continue;
            }
            let target = target_dir.join(relative);
            if entry.path().is_dir() {
                fs::create_dir_all(&target)?;
            } else {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(entry.path(), &target)?;
            }
        }
        Ok(())
    }
}

/// Plain recursive copy of a directory's contents.
pub fn copy_tree(source: &Path, target: &Path) -> TemplateResult<()> {
    fs::create_dir_all(target)?;
    let options = fs_extra::dir::CopyOptions::new()
        .overwrite(true)
        .content_only(true);
    fs_extra::dir::copy(source, target, &options)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::tempdir;

    fn make_template(dir: &Path) {
        fs::create_dir_all(dir.join("src")).unwrap();
        fs::write(dir.join("package.json"), "{}").unwrap();
        fs::write(dir.join("src/index.js"), "// entry").unwrap();
    }

    #[test]
    fn test_store_then_lookup() {
        let cache_root = tempdir().unwrap();
        let template = tempdir().unwrap();
        make_template(template.path());

        let cache = CacheStore::new(cache_root.path(), 3600);
        cache.store("abc", template.path()).unwrap();

        let hit = cache.lookup("abc").unwrap();
        assert!(hit.join("package.json").exists());
        assert!(hit.join("src/index.js").exists());
    }

    #[test]
    fn test_lookup_missing_key() {
        let cache_root = tempdir().unwrap();
        let cache = CacheStore::new(cache_root.path(), 3600);
        assert!(cache.lookup("nope").is_none());
    }

    #[test]
    fn test_expired_entry_is_a_miss_and_left_on_disk() {
        let cache_root = tempdir().unwrap();
        let template = tempdir().unwrap();
        make_template(template.path());

        let cache = CacheStore::new(cache_root.path(), 3600);
        let dir = cache.store("abc", template.path()).unwrap();

        // Backdate the sidecar past the TTL.
        let meta = CacheEntryMeta {
            timestamp: Utc::now() - Duration::seconds(7200),
            ttl_seconds: 3600,
        };
        fs::write(dir.join(SIDECAR_FILE), serde_json::to_string(&meta).unwrap()).unwrap();

        assert!(cache.lookup("abc").is_none());
        assert!(dir.join("package.json").exists());
    }

    #[test]
    fn test_store_overwrites_previous_entry() {
        let cache_root = tempdir().unwrap();
        let first = tempdir().unwrap();
        make_template(first.path());
        let second = tempdir().unwrap();
        fs::write(second.path().join("only.txt"), "fresh").unwrap();

        let cache = CacheStore::new(cache_root.path(), 3600);
        cache.store("abc", first.path()).unwrap();
        let dir = cache.store("abc", second.path()).unwrap();

        assert!(dir.join("only.txt").exists());
        assert!(!dir.join("package.json").exists());
    }

    #[test]
    fn test_copy_out_skips_sidecar() {
        let cache_root = tempdir().unwrap();
        let template = tempdir().unwrap();
        make_template(template.path());

        let cache = CacheStore::new(cache_root.path(), 3600);
        cache.store("abc", template.path()).unwrap();

        let out = tempdir().unwrap();
        cache.copy_out("abc", out.path()).unwrap();
        assert!(out.path().join("src/index.js").exists());
        assert!(!out.path().join(SIDECAR_FILE).exists());
    }
}
