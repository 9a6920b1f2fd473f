//! Structural validation of a fetched template.
//!
//! Read-only checks; the validator never mutates the filesystem. An
//! invalid report is the one fetch-adjacent condition the pipeline treats
//! as fatal, since an unusable template must not silently produce a
//! half-broken project.

use std::fs;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::config::{is_descriptor, is_excluded};
use crate::error::TemplateResult;

/// Outcome of validating a template directory.
#[derive(Debug)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
        self.valid = false;
    }

    fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }
}

/// Validates fetched template directories.
#[derive(Debug, Clone, Default)]
pub struct StructureValidator;

impl StructureValidator {
    pub fn new() -> Self {
        Self
    }

    /// Inspect `template_dir` for a minimum viable file set.
    pub fn validate(&self, template_dir: &Path) -> TemplateResult<ValidationReport> {
        let mut report = ValidationReport::new();

        if !template_dir.exists() {
            report.add_error(format!(
                "Template directory does not exist: {}",
                template_dir.display()
            ));
            return Ok(report);
        }
        if !template_dir.is_dir() {
            report.add_error(format!(
                "Template path is not a directory: {}",
                template_dir.display()
            ));
            return Ok(report);
        }

        let mut has_descriptor = false;
        let mut has_manifest = false;
        let mut file_count = 0usize;

        for entry in WalkDir::new(template_dir)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| {
                e.file_name()
                    .to_str()
                    .map(|name| !is_excluded(name))
                    .unwrap_or(true)
            })
            .filter_map(|e| e.ok())
        {
            if !entry.path().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if is_descriptor(&name) {
                has_descriptor = true;
                continue;
            }
            if name == "package.json" {
                has_manifest = true;
            }
            file_count += 1;
        }

        if file_count == 0 {
            report.add_error("Template contains no files besides its descriptor");
        }
        if !has_descriptor {
            report.add_warning("Template has no template.yaml descriptor, metadata will be placeholders");
        }
        if !has_manifest {
            report.add_warning("Template has no package.json manifest");
        }

        // Empty package.json would break downstream tooling.
        let manifest = template_dir.join("package.json");
        if manifest.is_file() {
            match fs::metadata(&manifest) {
                Ok(meta) if meta.len() == 0 => {
                    report.add_error("Template package.json is empty");
                }
                _ => {}
            }
        }

        debug!(
            "Validated {:?}: valid={} errors={} warnings={}",
            template_dir,
            report.valid,
            report.errors.len(),
            report.warnings.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_directory_is_error() {
        let report = StructureValidator::new()
            .validate(Path::new("/definitely/not/here"))
            .unwrap();
        assert!(!report.valid);
        assert!(!report.errors.is_empty());
    }

    #[test]
    fn test_empty_template_is_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("template.yaml"), "name: t\n").unwrap();

        let report = StructureValidator::new().validate(dir.path()).unwrap();
        assert!(!report.valid);
    }

    #[test]
    fn test_valid_template_with_warnings() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("index.js"), "// entry").unwrap();

        let report = StructureValidator::new().validate(dir.path()).unwrap();
        assert!(report.valid);
        // No descriptor, no package.json.
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn test_complete_template_is_clean() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("template.yaml"), "name: t\n").unwrap();
        fs::write(dir.path().join("package.json"), "{\"name\": \"t\"}").unwrap();

        let report = StructureValidator::new().validate(dir.path()).unwrap();
        assert!(report.valid);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_empty_manifest_is_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "").unwrap();
        fs::write(dir.path().join("index.js"), "// entry").unwrap();

        let report = StructureValidator::new().validate(dir.path()).unwrap();
        assert!(!report.valid);
    }

    #[test]
    fn test_validator_does_not_mutate() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("index.js"), "// entry").unwrap();
        let before = fs::read_dir(dir.path()).unwrap().count();

        StructureValidator::new().validate(dir.path()).unwrap();
        let after = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(before, after);
    }
}
