//! Fetch and cache configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default cache TTL: one day.
pub const DEFAULT_TTL_SECONDS: u64 = 24 * 60 * 60;

/// Default host for `owner/repo` shorthand sources.
pub const DEFAULT_HOST: &str = "github.com";

/// Entries excluded when copying a template tree and when rendering.
///
/// This is the single authoritative deny-list: the local-fetch filtered
/// copy and the renderer walk both consult it. The `.gitignore` written by
/// the git integrator is a separate, user-facing list.
pub const EXCLUDED_ENTRIES: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    "node_modules",
    "dist",
    "build",
    "coverage",
    ".DS_Store",
    "Thumbs.db",
    ".env",
    ".env.local",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "bun.lockb",
];

/// Descriptor file names recognized inside a template.
pub const DESCRIPTOR_FILES: &[&str] = &["template.yaml", "template.yml"];

/// Returns true when a path component must not be copied or rendered.
pub fn is_excluded(name: &str) -> bool {
    EXCLUDED_ENTRIES.contains(&name)
}

/// Returns true for the template's own descriptor file.
pub fn is_descriptor(name: &str) -> bool {
    DESCRIPTOR_FILES.contains(&name)
}

/// Configuration for the fetcher and its cache store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Root directory of the on-disk template cache.
    pub cache_root: PathBuf,
    /// Time-to-live for cache entries, in seconds.
    pub ttl_seconds: u64,
    /// Directory holding the bundled built-in templates.
    pub builtin_root: PathBuf,
    /// Host used to canonicalize `owner/repo` shorthand.
    pub host: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let cache_root = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("stamp")
            .join("templates");
        Self {
            cache_root,
            ttl_seconds: DEFAULT_TTL_SECONDS,
            builtin_root: PathBuf::from("templates"),
            host: DEFAULT_HOST.to_string(),
        }
    }
}

impl FetchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache_root = root.into();
        self
    }

    pub fn ttl_seconds(mut self, ttl: u64) -> Self {
        self.ttl_seconds = ttl;
        self
    }

    pub fn builtin_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.builtin_root = root.into();
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }
}
