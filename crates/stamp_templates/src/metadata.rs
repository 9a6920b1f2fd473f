//! Template descriptor loading.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::DESCRIPTOR_FILES;

fn default_name() -> String {
    "unknown".to_string()
}

fn default_description() -> String {
    "No description provided".to_string()
}

fn default_version() -> String {
    "1.0.0".to_string()
}

/// Metadata loaded from a template's descriptor file.
///
/// A missing or malformed descriptor is never fatal; placeholder values
/// are used instead so an undescribed template still materializes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateMetadata {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Minimum Node runtime the template targets.
    #[serde(default)]
    pub node_version: Option<String>,
}

impl Default for TemplateMetadata {
    fn default() -> Self {
        Self {
            name: default_name(),
            description: default_description(),
            version: default_version(),
            author: None,
            tags: Vec::new(),
            node_version: None,
        }
    }
}

impl TemplateMetadata {
    /// Load metadata from the descriptor inside `template_dir`.
    ///
    /// Falls back to [`TemplateMetadata::default`] when no descriptor is
    /// present or it cannot be parsed.
    pub fn load(template_dir: &Path) -> Self {
        for candidate in DESCRIPTOR_FILES {
            let path = template_dir.join(candidate);
            if !path.exists() {
                continue;
            }
            match fs::read_to_string(&path) {
                Ok(content) => match serde_yaml::from_str::<TemplateMetadata>(&content) {
                    Ok(metadata) => {
                        debug!("Loaded template descriptor from {:?}", path);
                        return metadata;
                    }
                    Err(e) => {
                        warn!("Malformed descriptor {:?}: {}, using defaults", path, e);
                        return Self::default();
                    }
                },
                Err(e) => {
                    warn!("Unreadable descriptor {:?}: {}, using defaults", path, e);
                    return Self::default();
                }
            }
        }
        debug!("No descriptor in {:?}, using defaults", template_dir);
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_missing_descriptor_uses_defaults() {
        let dir = tempdir().unwrap();
        let metadata = TemplateMetadata::load(dir.path());
        assert_eq!(metadata.name, "unknown");
        assert_eq!(metadata.version, "1.0.0");
    }

    #[test]
    fn test_load_descriptor() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("template.yaml"),
            "name: widget\ndescription: A widget template\nversion: 2.0.0\ntags: [web]\nnode_version: \"20\"\n",
        )
        .unwrap();

        let metadata = TemplateMetadata::load(dir.path());
        assert_eq!(metadata.name, "widget");
        assert_eq!(metadata.version, "2.0.0");
        assert_eq!(metadata.tags, vec!["web"]);
        assert_eq!(metadata.node_version.as_deref(), Some("20"));
    }

    #[test]
    fn test_malformed_descriptor_is_not_fatal() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("template.yml"), "::: not yaml {{{").unwrap();

        let metadata = TemplateMetadata::load(dir.path());
        assert_eq!(metadata, TemplateMetadata::default());
    }
}
