//! Template retrieval.
//!
//! One strategy per [`SourceType`], selected by a match: every strategy
//! normalizes its input to "a local directory" at `target_dir`. Remote
//! strategies consult and populate the [`CacheStore`]; a cache hit
//! short-circuits network work entirely.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::cache::{copy_tree, CacheStore};
use crate::config::{is_descriptor, is_excluded, FetchConfig};
use crate::error::{TemplateError, TemplateResult};
use crate::metadata::TemplateMetadata;
use crate::source::{SourceType, TemplateSource, BUILTIN_TEMPLATES};

/// Hosts for which URL downloads skip the unknown-host warning.
const KNOWN_HOSTS: &[&str] = &["github.com", "gitlab.com", "bitbucket.org", "codeload.github.com"];

/// Archive extensions the URL strategy knows how to unpack.
const ARCHIVE_EXTENSIONS: &[&str] = &[".tar.gz", ".tgz", ".tar", ".zip"];

/// Result of a successful fetch.
#[derive(Debug)]
pub struct FetchOutcome {
    /// Directory the template now lives in (always `target_dir`).
    pub path: PathBuf,
    /// Metadata loaded from the fetched tree's descriptor.
    pub metadata: TemplateMetadata,
    /// Whether the fetch was served from the cache store.
    pub cache_hit: bool,
    /// Non-fatal notes collected along the way.
    pub warnings: Vec<String>,
}

/// Retrieves templates from any [`TemplateSource`] into a local directory.
#[derive(Debug)]
pub struct TemplateFetcher {
    config: FetchConfig,
    cache: CacheStore,
    client: reqwest::Client,
}

impl TemplateFetcher {
    pub fn new(config: FetchConfig) -> Self {
        let cache = CacheStore::new(config.cache_root.clone(), config.ttl_seconds);
        Self {
            config,
            cache,
            client: reqwest::Client::new(),
        }
    }

    /// Canonical URL for a hosted-repo source.
    pub fn hosted_url(&self, source: &TemplateSource) -> String {
        let mut url = format!("https://{}/{}", self.config.host, source.location);
        if let Some(reference) = &source.reference {
            url.push('#');
            url.push_str(reference);
        }
        if let Some(subdir) = &source.subdir {
            url.push('/');
            url.push_str(subdir);
        }
        url
    }

    /// Fetch `source` into `target_dir`.
    pub async fn fetch(
        &self,
        source: &TemplateSource,
        target_dir: &Path,
    ) -> TemplateResult<FetchOutcome> {
        info!("Fetching {} template '{}'", source.source_type, source.location);
        let outcome = match source.source_type {
            SourceType::Local => self.fetch_local(source, target_dir),
            SourceType::HostedRepo => self.fetch_hosted(source, target_dir).await,
            SourceType::Url => self.fetch_url(source, target_dir).await,
            SourceType::Builtin => self.fetch_builtin(source, target_dir),
        }?;
        debug!(
            "Fetched '{}' into {:?} (cache_hit: {})",
            source.location, outcome.path, outcome.cache_hit
        );
        Ok(outcome)
    }

    /// Local directory: filtered copy excluding version-control metadata,
    /// build output, lockfiles, descriptor and OS/secret files.
    fn fetch_local(&self, source: &TemplateSource, target_dir: &Path) -> TemplateResult<FetchOutcome> {
        let path = expand_home(&source.location);
        if !path.is_dir() {
            return Err(TemplateError::LocalPathInvalid(path));
        }
        let root = self.select_subdir(&path, source)?;

        let metadata = TemplateMetadata::load(&root);
        filtered_copy(&root, target_dir)?;

        Ok(FetchOutcome {
            path: target_dir.to_path_buf(),
            metadata,
            cache_hit: false,
            warnings: Vec::new(),
        })
    }

    /// Hosted repository: cache-then-clone.
    async fn fetch_hosted(
        &self,
        source: &TemplateSource,
        target_dir: &Path,
    ) -> TemplateResult<FetchOutcome> {
        let key = source.cache_key();
        if self.cache.lookup(&key).is_some() {
            self.cache.copy_out(&key, target_dir)?;
            let metadata = TemplateMetadata::load(target_dir);
            return Ok(FetchOutcome {
                path: target_dir.to_path_buf(),
                metadata,
                cache_hit: true,
                warnings: Vec::new(),
            });
        }

        let canonical = self.hosted_url(source);
        debug!("Cache miss for {}", canonical);
        let clone_url = format!("https://{}/{}.git", self.config.host, source.location);
        let scratch = tempfile::tempdir()?;
        clone_repository(&clone_url, source.reference.as_deref(), scratch.path()).map_err(
            |message| TemplateError::CloneFailed {
                location: canonical,
                message,
            },
        )?;

        let git_dir = scratch.path().join(".git");
        if git_dir.exists() {
            fs::remove_dir_all(&git_dir)?;
        }
        let root = self.select_subdir(scratch.path(), source)?;

        self.cache.store(&key, &root)?;
        self.cache.copy_out(&key, target_dir)?;

        let metadata = TemplateMetadata::load(target_dir);
        Ok(FetchOutcome {
            path: target_dir.to_path_buf(),
            metadata,
            cache_hit: false,
            warnings: Vec::new(),
        })
    }

    /// Remote archive: validate, then cache-then-download.
    async fn fetch_url(
        &self,
        source: &TemplateSource,
        target_dir: &Path,
    ) -> TemplateResult<FetchOutcome> {
        let mut warnings = validate_url(&source.location)?;

        let key = source.cache_key();
        if self.cache.lookup(&key).is_some() {
            self.cache.copy_out(&key, target_dir)?;
            let metadata = TemplateMetadata::load(target_dir);
            return Ok(FetchOutcome {
                path: target_dir.to_path_buf(),
                metadata,
                cache_hit: true,
                warnings,
            });
        }

        let scratch = tempfile::tempdir()?;
        let archive = scratch.path().join(archive_file_name(&source.location));
        self.download(&source.location, &archive).await?;

        let unpacked = scratch.path().join("unpacked");
        fs::create_dir_all(&unpacked)?;
        extract_archive(&archive, &unpacked).map_err(|message| TemplateError::ExtractionFailed {
            url: source.location.clone(),
            message,
        })?;

        // Archives commonly wrap their content in one top-level directory.
        let flattened = flatten_single_dir(&unpacked);
        let root = self.select_subdir(&flattened, source)?;

        self.cache.store(&key, &root)?;
        self.cache.copy_out(&key, target_dir)?;

        let metadata = TemplateMetadata::load(target_dir);
        if metadata.name == "unknown" {
            warnings.push("Downloaded template has no descriptor, using placeholder metadata".into());
        }
        Ok(FetchOutcome {
            path: target_dir.to_path_buf(),
            metadata,
            cache_hit: false,
            warnings,
        })
    }

    /// Built-in template: plain copy from the bundled directory, no cache.
    fn fetch_builtin(
        &self,
        source: &TemplateSource,
        target_dir: &Path,
    ) -> TemplateResult<FetchOutcome> {
        let dir = BUILTIN_TEMPLATES
            .iter()
            .find(|t| t.name == source.location)
            .map(|t| t.dir)
            .unwrap_or(source.location.as_str());
        let root = self.config.builtin_root.join(dir);
        if !root.is_dir() {
            return Err(TemplateError::BuiltinMissing(root));
        }

        let metadata = TemplateMetadata::load(&root);
        copy_tree(&root, target_dir)?;

        Ok(FetchOutcome {
            path: target_dir.to_path_buf(),
            metadata,
            cache_hit: false,
            warnings: Vec::new(),
        })
    }

    async fn download(&self, url: &str, target: &Path) -> TemplateResult<()> {
        debug!("Downloading {}", url);
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(TemplateError::DownloadFailed {
                url: url.to_string(),
                message: format!("server returned {}", response.status()),
            });
        }
        let bytes = response.bytes().await?;
        fs::write(target, &bytes)?;
        Ok(())
    }

    fn select_subdir(&self, root: &Path, source: &TemplateSource) -> TemplateResult<PathBuf> {
        match &source.subdir {
            None => Ok(root.to_path_buf()),
            Some(subdir) => {
                let selected = root.join(subdir);
                if selected.is_dir() {
                    Ok(selected)
                } else {
                    Err(TemplateError::SubdirMissing {
                        location: source.location.clone(),
                        subdir: subdir.clone(),
                    })
                }
            }
        }
    }
}

/// Validate a URL source ahead of any download. The protocol check is
/// fatal; archive-extension and known-host heuristics warn only.
pub fn validate_url(url: &str) -> TemplateResult<Vec<String>> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(TemplateError::UnsupportedProtocol { url: url.to_string() });
    }

    let mut warnings = Vec::new();
    if !ARCHIVE_EXTENSIONS.iter().any(|ext| url.ends_with(ext)) {
        warnings.push(format!(
            "URL '{}' does not end in a known archive extension ({})",
            url,
            ARCHIVE_EXTENSIONS.join(", ")
        ));
    }
    let host = url
        .split("://")
        .nth(1)
        .and_then(|rest| rest.split('/').next())
        .unwrap_or("");
    if !KNOWN_HOSTS.contains(&host) {
        warnings.push(format!("Host '{}' is not a recognized template host", host));
    }
    Ok(warnings)
}

/// Copy a template tree while skipping the shared deny-list and the
/// template's own descriptor.
pub fn filtered_copy(source: &Path, target: &Path) -> TemplateResult<()> {
    fs::create_dir_all(target)?;
    let walker = WalkDir::new(source)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| {
            e.file_name()
                .to_str()
                .map(|name| !is_excluded(name))
                .unwrap_or(true)
        });

    for entry in walker.filter_map(|e| e.ok()) {
        let relative = entry.path().strip_prefix(source).unwrap();
        let name = entry.file_name().to_string_lossy();
        if entry.path().is_file() && is_descriptor(&name) && relative.components().count() == 1 {
            continue;
        }

        let dest = target.join(relative);
        if entry.path().is_dir() {
            fs::create_dir_all(&dest)?;
        } else {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

fn clone_repository(url: &str, reference: Option<&str>, target: &Path) -> Result<(), String> {
    let mut args = vec!["clone", "--depth", "1"];
    if let Some(reference) = reference {
        args.push("--branch");
        args.push(reference);
    }
    let target_str = target.to_string_lossy();
    args.push(url);
    args.push(&target_str);

    let output = Command::new("git")
        .args(&args)
        .output()
        .map_err(|e| format!("failed to run git: {}", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("git clone failed: {}", stderr.trim()));
    }
    Ok(())
}

/// Unpack an archive with the system tar/unzip, mirroring how git is
/// invoked as an external executable.
fn extract_archive(archive: &Path, target: &Path) -> Result<(), String> {
    let name = archive.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let output = if name.ends_with(".zip") {
        Command::new("unzip")
            .arg("-q")
            .arg(archive)
            .arg("-d")
            .arg(target)
            .output()
    } else {
        Command::new("tar")
            .arg("-xf")
            .arg(archive)
            .arg("-C")
            .arg(target)
            .output()
    }
    .map_err(|e| format!("failed to run extractor: {}", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("extraction failed: {}", stderr.trim()));
    }
    Ok(())
}

/// When an unpacked archive holds exactly one directory and nothing else,
/// descend into it.
fn flatten_single_dir(dir: &Path) -> PathBuf {
    let entries: Vec<_> = match fs::read_dir(dir) {
        Ok(read) => read.filter_map(|e| e.ok()).collect(),
        Err(_) => return dir.to_path_buf(),
    };
    if entries.len() == 1 && entries[0].path().is_dir() {
        entries[0].path()
    } else {
        dir.to_path_buf()
    }
}

fn archive_file_name(url: &str) -> String {
    url.rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("template-archive")
        .to_string()
}

fn expand_home(location: &str) -> PathBuf {
    if let Some(rest) = location.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(location)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceResolver;
    use tempfile::tempdir;

    fn fetcher_with(cache_root: &Path, builtin_root: &Path) -> TemplateFetcher {
        TemplateFetcher::new(
            FetchConfig::new()
                .cache_root(cache_root)
                .builtin_root(builtin_root),
        )
    }

    fn git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn make_template(dir: &Path) {
        fs::create_dir_all(dir.join("src")).unwrap();
        fs::create_dir_all(dir.join("node_modules/dep")).unwrap();
        fs::create_dir_all(dir.join(".git")).unwrap();
        fs::write(dir.join("package.json"), "{\"name\": \"t\"}").unwrap();
        fs::write(dir.join("src/index.js"), "// entry").unwrap();
        fs::write(dir.join("template.yaml"), "name: fixture\ndescription: d\n").unwrap();
        fs::write(dir.join("yarn.lock"), "").unwrap();
        fs::write(dir.join(".env"), "SECRET=1").unwrap();
    }

    #[tokio::test]
    async fn test_fetch_local_filters_deny_list() {
        let template = tempdir().unwrap();
        make_template(template.path());
        let cache = tempdir().unwrap();
        let builtin = tempdir().unwrap();
        let target = tempdir().unwrap();

        let fetcher = fetcher_with(cache.path(), builtin.path());
        let source = SourceResolver::new()
            .resolve(&template.path().to_string_lossy(), None, None)
            .source;
        let outcome = fetcher.fetch(&source, target.path()).await.unwrap();

        assert!(!outcome.cache_hit);
        assert_eq!(outcome.metadata.name, "fixture");
        assert!(target.path().join("package.json").exists());
        assert!(target.path().join("src/index.js").exists());
        assert!(!target.path().join("node_modules").exists());
        assert!(!target.path().join(".git").exists());
        assert!(!target.path().join("yarn.lock").exists());
        assert!(!target.path().join(".env").exists());
        assert!(!target.path().join("template.yaml").exists());
    }

    #[tokio::test]
    async fn test_fetch_local_missing_path_errors() {
        let cache = tempdir().unwrap();
        let builtin = tempdir().unwrap();
        let target = tempdir().unwrap();

        let fetcher = fetcher_with(cache.path(), builtin.path());
        let source = SourceResolver::new()
            .resolve("./definitely-not-here", None, None)
            .source;
        let err = fetcher.fetch(&source, target.path()).await.unwrap_err();
        match err {
            TemplateError::LocalPathInvalid(path) => {
                assert!(path.to_string_lossy().contains("definitely-not-here"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_builtin_copies_bundled_dir() {
        let cache = tempdir().unwrap();
        let builtin = tempdir().unwrap();
        let library = builtin.path().join("library");
        fs::create_dir_all(&library).unwrap();
        fs::write(library.join("package.json"), "{}").unwrap();
        let target = tempdir().unwrap();

        let fetcher = fetcher_with(cache.path(), builtin.path());
        let source = TemplateSource::builtin("library");
        let outcome = fetcher.fetch(&source, target.path()).await.unwrap();

        assert!(!outcome.cache_hit);
        assert!(target.path().join("package.json").exists());
    }

    #[tokio::test]
    async fn test_fetch_builtin_missing_dir_errors() {
        let cache = tempdir().unwrap();
        let builtin = tempdir().unwrap();
        let target = tempdir().unwrap();

        let fetcher = fetcher_with(cache.path(), builtin.path());
        let source = TemplateSource::builtin("library");
        let err = fetcher.fetch(&source, target.path()).await.unwrap_err();
        assert!(matches!(err, TemplateError::BuiltinMissing(_)));
    }

    #[tokio::test]
    async fn test_fetch_hosted_served_from_cache() {
        let cache_root = tempdir().unwrap();
        let builtin = tempdir().unwrap();
        let target = tempdir().unwrap();

        let source = SourceResolver::new().resolve("my-org/my-template#v2", None, None).source;

        // Pre-populate the cache under the source's key; the fetch must
        // then short-circuit without any network or git work.
        let tree = tempdir().unwrap();
        fs::write(tree.path().join("package.json"), "{\"name\": \"cached\"}").unwrap();
        let store = crate::cache::CacheStore::new(cache_root.path(), 3600);
        store.store(&source.cache_key(), tree.path()).unwrap();

        let fetcher = fetcher_with(cache_root.path(), builtin.path());
        let outcome = fetcher.fetch(&source, target.path()).await.unwrap();

        assert!(outcome.cache_hit);
        assert!(target.path().join("package.json").exists());
    }

    #[tokio::test]
    async fn test_fetch_hosted_clone_failure_names_canonical_url() {
        if !git_available() {
            eprintln!("git not available, skipping test");
            return;
        }
        let cache = tempdir().unwrap();
        let builtin = tempdir().unwrap();
        let target = tempdir().unwrap();

        let fetcher = TemplateFetcher::new(
            FetchConfig::new()
                .cache_root(cache.path())
                .builtin_root(builtin.path())
                .host("host.invalid"),
        );
        let source = SourceResolver::new()
            .resolve("my-org/my-template#v2", None, None)
            .source;
        let err = fetcher.fetch(&source, target.path()).await.unwrap_err();
        match err {
            TemplateError::CloneFailed { location, .. } => {
                assert_eq!(location, "https://host.invalid/my-org/my-template#v2");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_validate_url_protocol_is_fatal() {
        let err = validate_url("ftp://example.com/t.tar.gz").unwrap_err();
        assert!(matches!(err, TemplateError::UnsupportedProtocol { .. }));
    }

    #[test]
    fn test_validate_url_heuristics_warn_only() {
        let warnings = validate_url("https://example.com/template").unwrap();
        assert_eq!(warnings.len(), 2);

        let warnings = validate_url("https://github.com/org/t/archive/main.tar.gz").unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_hosted_url_construction() {
        let fetcher = TemplateFetcher::new(FetchConfig::new());
        let mut source = SourceResolver::new().resolve("my-org/my-template#v2", None, None).source;
        source.subdir = Some("packages/base".into());
        assert_eq!(
            fetcher.hosted_url(&source),
            "https://github.com/my-org/my-template#v2/packages/base"
        );
    }

    #[test]
    fn test_flatten_single_dir() {
        let dir = tempdir().unwrap();
        let inner = dir.path().join("repo-main");
        fs::create_dir_all(&inner).unwrap();
        fs::write(inner.join("file.txt"), "x").unwrap();
        assert_eq!(flatten_single_dir(dir.path()), inner);

        fs::write(dir.path().join("extra.txt"), "y").unwrap();
        assert_eq!(flatten_single_dir(dir.path()), dir.path());
    }

    #[test]
    fn test_archive_file_name() {
        assert_eq!(archive_file_name("https://h/x/widget.tar.gz"), "widget.tar.gz");
        assert_eq!(archive_file_name("https://h/"), "template-archive");
    }
}
