//! Caller-supplied context describing the project being materialized.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Dependency installer chosen for the generated project.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    #[default]
    Npm,
    Yarn,
    Pnpm,
    Bun,
}

impl PackageManager {
    /// Lockfile written by this installer.
    pub fn lockfile(&self) -> &'static str {
        match self {
            PackageManager::Npm => "package-lock.json",
            PackageManager::Yarn => "yarn.lock",
            PackageManager::Pnpm => "pnpm-lock.yaml",
            PackageManager::Bun => "bun.lockb",
        }
    }

    /// Executable name of the installer.
    pub fn command(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
            PackageManager::Pnpm => "pnpm",
            PackageManager::Bun => "bun",
        }
    }

    /// Arguments for a full dependency install.
    pub fn install_args(&self) -> &'static [&'static str] {
        match self {
            PackageManager::Npm => &["install"],
            PackageManager::Yarn => &["install"],
            PackageManager::Pnpm => &["install"],
            PackageManager::Bun => &["install"],
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "npm" => Some(PackageManager::Npm),
            "yarn" => Some(PackageManager::Yarn),
            "pnpm" => Some(PackageManager::Pnpm),
            "bun" => Some(PackageManager::Bun),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.command()
    }
}

impl std::fmt::Display for PackageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input to rendering and integration, created once per invocation.
///
/// The pipeline never mutates the context; derived variables (case
/// conversions of the project name) are computed into a separate map at
/// render time.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TemplateContext {
    /// Name of the project/package being created.
    pub project_name: String,
    /// Optional one-line description.
    pub description: Option<String>,
    /// Optional author identity ("Name <email>" or bare name).
    pub author: Option<String>,
    /// Initial version for the generated manifest.
    pub version: Option<String>,
    /// Installer the generated project should use.
    pub package_manager: Option<PackageManager>,
    /// Free-form variables substituted during rendering.
    pub variables: HashMap<String, String>,
}

impl TemplateContext {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn package_manager(mut self, pm: PackageManager) -> Self {
        self.package_manager = Some(pm);
        self
    }

    pub fn variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn variables(mut self, vars: HashMap<String, String>) -> Self {
        self.variables.extend(vars);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_builder() {
        let ctx = TemplateContext::new("widget")
            .description("A widget")
            .author("Ada <ada@example.com>")
            .version("0.1.0")
            .package_manager(PackageManager::Pnpm)
            .variable("license", "MIT");

        assert_eq!(ctx.project_name, "widget");
        assert_eq!(ctx.package_manager, Some(PackageManager::Pnpm));
        assert_eq!(ctx.variables.get("license"), Some(&"MIT".to_string()));
    }

    #[test]
    fn test_package_manager_lockfiles() {
        assert_eq!(PackageManager::Npm.lockfile(), "package-lock.json");
        assert_eq!(PackageManager::Yarn.lockfile(), "yarn.lock");
        assert_eq!(PackageManager::Pnpm.lockfile(), "pnpm-lock.yaml");
        assert_eq!(PackageManager::Bun.lockfile(), "bun.lockb");
    }

    #[test]
    fn test_package_manager_from_str() {
        assert_eq!(PackageManager::from_str("pnpm"), Some(PackageManager::Pnpm));
        assert_eq!(PackageManager::from_str("cargo"), None);
    }
}
