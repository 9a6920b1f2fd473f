//! Template source classification.
//!
//! Turns a free-form identifier string into a typed [`TemplateSource`].
//! Classification is pure and total: it performs no I/O and never fails.
//! Unknown identifiers fall back to the default built-in template with a
//! warning so a bad argument never aborts project creation outright.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Which retrieval strategy a source requires.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SourceType {
    /// A directory on the local filesystem.
    Local,
    /// A remote archive URL.
    Url,
    /// An `owner/repo` shorthand for a hosted repository.
    HostedRepo,
    /// A template bundled with the tool.
    Builtin,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Local => "local",
            SourceType::Url => "url",
            SourceType::HostedRepo => "hosted-repo",
            SourceType::Builtin => "builtin",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A classified template source. Immutable once resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateSource {
    pub source_type: SourceType,
    /// Path, URL, `owner/repo` shorthand or built-in name.
    pub location: String,
    /// Branch/tag for hosted repositories.
    pub reference: Option<String>,
    /// Subdirectory within the fetched tree to use as the template root.
    pub subdir: Option<String>,
}

impl TemplateSource {
    pub fn builtin(name: impl Into<String>) -> Self {
        Self {
            source_type: SourceType::Builtin,
            location: name.into(),
            reference: None,
            subdir: None,
        }
    }

    /// Stable cache key derived from the identifying fields.
    pub fn cache_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.source_type.as_str());
        hasher.update(b"\0");
        hasher.update(&self.location);
        hasher.update(b"\0");
        hasher.update(self.reference.as_deref().unwrap_or(""));
        hasher.update(b"\0");
        hasher.update(self.subdir.as_deref().unwrap_or(""));
        let digest = hasher.finalize();
        format!("{:x}", digest)
    }
}

/// A built-in registry entry.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinTemplate {
    pub name: &'static str,
    /// Directory under the bundled templates root.
    pub dir: &'static str,
    pub description: &'static str,
}

/// Templates bundled with the tool.
pub const BUILTIN_TEMPLATES: &[BuiltinTemplate] = &[
    BuiltinTemplate {
        name: "library",
        dir: "library",
        description: "A plain library package with build and test tooling",
    },
    BuiltinTemplate {
        name: "cli",
        dir: "cli",
        description: "A command-line application package",
    },
    BuiltinTemplate {
        name: "react-app",
        dir: "react-app",
        description: "A React application package",
    },
    BuiltinTemplate {
        name: "node-service",
        dir: "node-service",
        description: "A Node HTTP service package",
    },
];

/// Name of the built-in used when an identifier cannot be classified.
pub const DEFAULT_BUILTIN: &str = "library";

/// Outcome of classifying an identifier.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub source: TemplateSource,
    /// Non-fatal notes, e.g. the built-in fallback firing.
    pub warnings: Vec<String>,
}

/// Classifies template identifiers into typed sources.
#[derive(Debug, Clone, Default)]
pub struct SourceResolver;

impl SourceResolver {
    pub fn new() -> Self {
        Self
    }

    /// Classify `identifier`. First match wins, no backtracking:
    /// URL protocol, then path prefix, then hosted-repo shorthand, then
    /// the built-in registry with fallback to [`DEFAULT_BUILTIN`].
    pub fn resolve(
        &self,
        identifier: &str,
        reference: Option<&str>,
        subdir: Option<&str>,
    ) -> Resolution {
        let identifier = identifier.trim();
        let mut warnings = Vec::new();

        let source = if identifier.starts_with("http://") || identifier.starts_with("https://") {
            TemplateSource {
                source_type: SourceType::Url,
                location: identifier.to_string(),
                reference: reference.map(String::from),
                subdir: subdir.map(String::from),
            }
        } else if is_path_like(identifier) {
            TemplateSource {
                source_type: SourceType::Local,
                location: identifier.to_string(),
                reference: None,
                subdir: subdir.map(String::from),
            }
        } else if let Some(rest) = identifier
            .strip_prefix("gh:")
            .or_else(|| identifier.strip_prefix("github:"))
        {
            self.hosted(rest, reference, subdir)
        } else if is_repo_shorthand(identifier) {
            self.hosted(identifier, reference, subdir)
        } else {
            if !BUILTIN_TEMPLATES.iter().any(|t| t.name == identifier) {
                warnings.push(format!(
                    "Unknown template '{}', falling back to built-in '{}'",
                    identifier, DEFAULT_BUILTIN
                ));
                TemplateSource::builtin(DEFAULT_BUILTIN)
            } else {
                TemplateSource::builtin(identifier)
            }
        };

        Resolution { source, warnings }
    }

    fn hosted(&self, spec: &str, reference: Option<&str>, subdir: Option<&str>) -> TemplateSource {
        // A trailing "#ref" segment overrides the hint.
        let (location, inline_ref) = match spec.split_once('#') {
            Some((loc, r)) if !r.is_empty() => (loc, Some(r.to_string())),
            Some((loc, _)) => (loc, None),
            None => (spec, None),
        };
        TemplateSource {
            source_type: SourceType::HostedRepo,
            location: location.to_string(),
            reference: inline_ref.or_else(|| reference.map(String::from)),
            subdir: subdir.map(String::from),
        }
    }
}

fn is_path_like(s: &str) -> bool {
    s.starts_with("./")
        || s.starts_with("../")
        || s.starts_with('/')
        || s.starts_with("~/")
        || s == "."
        || s == ".."
        || s.starts_with(".\\")
        || s.starts_with("..\\")
}

/// Matches `owner/repo` shorthand: exactly one slash, both segments
/// non-empty and free of whitespace, optionally with a `#ref` suffix.
fn is_repo_shorthand(s: &str) -> bool {
    let base = s.split('#').next().unwrap_or(s);
    let mut parts = base.splitn(3, '/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(repo), None) => {
            !owner.is_empty()
                && !repo.is_empty()
                && !owner.contains(char::is_whitespace)
                && !repo.contains(char::is_whitespace)
        }
        _ => false,
    }
}
