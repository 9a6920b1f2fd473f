//! Workspace integration for materialized projects.
//!
//! When the target directory sits inside a pnpm-style multi-package
//! workspace, registers the new package in the workspace manifest and
//! optionally triggers a dependency install. Every step is independently
//! warning-tolerant; a failed installer invocation is the only error.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use stamp_templates::{PackageManager, TemplateContext};

/// Workspace definition file this integrator recognizes.
pub const WORKSPACE_MANIFEST: &str = "pnpm-workspace.yaml";

/// Outcome flags and collected diagnostics for one workspace integration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkspaceResult {
    pub manifest_updated: bool,
    pub dependency_added: bool,
    pub dependencies_installed: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

/// Registers a materialized package inside a surrounding workspace.
#[derive(Debug)]
pub struct WorkspaceIntegrator {
    project_path: PathBuf,
}

impl WorkspaceIntegrator {
    pub fn new<P: AsRef<Path>>(project_path: P) -> Self {
        Self {
            project_path: project_path.as_ref().to_path_buf(),
        }
    }

    /// Walk up from the project directory looking for a workspace root.
    pub fn find_workspace_root(&self) -> Option<PathBuf> {
        self.project_path
            .ancestors()
            .skip(1)
            .find(|dir| dir.join(WORKSPACE_MANIFEST).is_file())
            .map(Path::to_path_buf)
    }

    /// Run the full integration: manifest entry, root dependency,
    /// optional install.
    pub fn integrate(&self, context: &TemplateContext, install: bool) -> WorkspaceResult {
        let mut result = WorkspaceResult::default();

        let root = match self.find_workspace_root() {
            Some(root) => root,
            None => {
                result.warnings.push(
                    "Target directory is not inside a workspace, skipping integration".to_string(),
                );
                return result;
            }
        };
        debug!("Workspace root: {:?}", root);

        let relative = match relative_package_path(&root, &self.project_path) {
            Some(relative) => relative,
            None => {
                result
                    .warnings
                    .push("Could not determine package path relative to workspace root".to_string());
                return result;
            }
        };

        match add_package_entry(&root.join(WORKSPACE_MANIFEST), &relative) {
            Ok(updated) => {
                result.manifest_updated = updated;
                if !updated {
                    debug!("'{}' already covered by the workspace manifest", relative);
                }
            }
            Err(message) => result
                .warnings
                .push(format!("could not update workspace manifest: {}", message)),
        }

        match add_root_dependency(&root, &context.project_name) {
            Ok(added) => result.dependency_added = added,
            Err(message) => result
                .warnings
                .push(format!("could not update root manifest: {}", message)),
        }

        if install {
            let package_manager = context.package_manager.unwrap_or_default();
            match run_installer(&root, package_manager) {
                Ok(()) => result.dependencies_installed = true,
                // The one fatal condition in this component.
                Err(message) => result
                    .errors
                    .push(format!("dependency installation failed: {}", message)),
            }
        }

        info!(
            "Workspace integration for {:?}: manifest_updated={} installed={}",
            self.project_path, result.manifest_updated, result.dependencies_installed
        );
        result
    }
}

fn relative_package_path(root: &Path, project: &Path) -> Option<String> {
    let relative = project.strip_prefix(root).ok()?;
    let text = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Insert `package_path` into the manifest's `packages:` list unless an
/// existing entry or glob pattern already covers it. Returns whether the
/// file changed. Untouched lines are preserved verbatim.
fn add_package_entry(manifest_path: &Path, package_path: &str) -> Result<bool, String> {
    let content = fs::read_to_string(manifest_path).map_err(|e| e.to_string())?;
    let lines: Vec<&str> = content.lines().collect();

    let packages_idx = lines
        .iter()
        .position(|line| line.trim_start().starts_with("packages:"))
        .ok_or_else(|| "no 'packages:' list in workspace manifest".to_string())?;

    // `packages: []` and other inline flow lists get no block entries; a
    // block insertion after them would corrupt the manifest. Rewrite the
    // inline value as a block list instead.
    let inline = lines[packages_idx]
        .trim_start()
        .strip_prefix("packages:")
        .map(str::trim)
        .unwrap_or("");
    if !inline.is_empty() && !inline.starts_with('#') {
        return rewrite_inline_packages(manifest_path, &content, packages_idx, inline, package_path);
    }

    // Collect the contiguous list entries following `packages:`.
    let mut entries: Vec<(usize, String)> = Vec::new();
    for (offset, line) in lines[packages_idx + 1..].iter().enumerate() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("- ") {
            let value = rest.trim().trim_matches(|c| c == '\'' || c == '"').to_string();
            entries.push((packages_idx + 1 + offset, value));
        } else if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        } else {
            break;
        }
    }

    if entries.iter().any(|(_, entry)| covers(entry, package_path)) {
        return Ok(false);
    }

    // Insert at the first entry that sorts after the new path, keeping
    // the list alphabetical-ish without reordering what's there.
    let quote = entries
        .first()
        .and_then(|(idx, _)| lines[*idx].trim_start().strip_prefix("- "))
        .map(|raw| if raw.trim().starts_with('"') { '"' } else { '\'' })
        .unwrap_or('\'');
    let indent = entries
        .first()
        .map(|(idx, _)| {
            let line = lines[*idx];
            line[..line.len() - line.trim_start().len()].to_string()
        })
        .unwrap_or_else(|| "  ".to_string());
    let new_line = format!("{}- {}{}{}", indent, quote, package_path, quote);

    let insert_at = entries
        .iter()
        .find(|(_, entry)| entry.as_str() > package_path)
        .map(|(idx, _)| *idx)
        .or_else(|| entries.last().map(|(idx, _)| idx + 1))
        .unwrap_or(packages_idx + 1);

    let mut new_lines: Vec<String> = lines.iter().map(|s| s.to_string()).collect();
    new_lines.insert(insert_at, new_line);

    let mut output = new_lines.join("\n");
    if content.ends_with('\n') {
        output.push('\n');
    }
    fs::write(manifest_path, output).map_err(|e| e.to_string())?;
    Ok(true)
}

/// Replace an inline `packages: [...]` flow list with an equivalent block
/// list that includes `package_path`, keeping the surrounding lines.
fn rewrite_inline_packages(
    manifest_path: &Path,
    content: &str,
    packages_idx: usize,
    inline: &str,
    package_path: &str,
) -> Result<bool, String> {
    let body = inline
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| format!("unrecognized 'packages:' value: '{}'", inline))?;
    let mut entries: Vec<String> = body
        .split(',')
        .map(|entry| {
            entry
                .trim()
                .trim_matches(|c| c == '\'' || c == '"')
                .to_string()
        })
        .filter(|entry| !entry.is_empty())
        .collect();

    if entries.iter().any(|entry| covers(entry, package_path)) {
        return Ok(false);
    }
    let insert_at = entries
        .iter()
        .position(|entry| entry.as_str() > package_path)
        .unwrap_or(entries.len());
    entries.insert(insert_at, package_path.to_string());

    let lines: Vec<&str> = content.lines().collect();
    let key_line = lines[packages_idx];
    let key_indent = &key_line[..key_line.len() - key_line.trim_start().len()];

    let mut new_lines: Vec<String> = lines.iter().map(|s| s.to_string()).collect();
    new_lines[packages_idx] = format!("{}packages:", key_indent);
    for (offset, entry) in entries.iter().enumerate() {
        new_lines.insert(
            packages_idx + 1 + offset,
            format!("{}  - '{}'", key_indent, entry),
        );
    }

    let mut output = new_lines.join("\n");
    if content.ends_with('\n') {
        output.push('\n');
    }
    fs::write(manifest_path, output).map_err(|e| e.to_string())?;
    Ok(true)
}

/// Whether a manifest entry (possibly a `/*` or `/**` glob) already
/// covers `path`.
fn covers(entry: &str, path: &str) -> bool {
    if entry == path {
        return true;
    }
    if let Some(prefix) = entry.strip_suffix("/**") {
        return path.starts_with(&format!("{}/", prefix));
    }
    if let Some(prefix) = entry.strip_suffix("/*") {
        if let Some(rest) = path.strip_prefix(&format!("{}/", prefix)) {
            return !rest.is_empty() && !rest.contains('/');
        }
    }
    false
}

/// Add the package as a `workspace:*` dependency in the root manifest,
/// but only when it follows the workspace's own npm scope and is absent.
fn add_root_dependency(root: &Path, package_name: &str) -> Result<bool, String> {
    let manifest_path = root.join("package.json");
    if !manifest_path.is_file() {
        return Ok(false);
    }
    let content = fs::read_to_string(&manifest_path).map_err(|e| e.to_string())?;
    let mut manifest: serde_json::Value =
        serde_json::from_str(&content).map_err(|e| e.to_string())?;

    let root_name = manifest
        .get("name")
        .and_then(|n| n.as_str())
        .unwrap_or_default();
    let scope = match root_name.split('/').next() {
        Some(scope) if scope.starts_with('@') => scope,
        _ => return Ok(false),
    };
    if !package_name.starts_with(&format!("{}/", scope)) {
        return Ok(false);
    }

    for section in ["dependencies", "devDependencies"] {
        if manifest
            .get(section)
            .and_then(|deps| deps.get(package_name))
            .is_some()
        {
            return Ok(false);
        }
    }

    let deps = manifest
        .as_object_mut()
        .ok_or_else(|| "root package.json is not an object".to_string())?
        .entry("dependencies")
        .or_insert_with(|| serde_json::json!({}));
    deps.as_object_mut()
        .ok_or_else(|| "'dependencies' is not an object".to_string())?
        .insert(
            package_name.to_string(),
            serde_json::Value::String("workspace:*".to_string()),
        );

    let output = serde_json::to_string_pretty(&manifest).map_err(|e| e.to_string())?;
    fs::write(&manifest_path, output + "\n").map_err(|e| e.to_string())?;
    Ok(true)
}

fn run_installer(root: &Path, package_manager: PackageManager) -> Result<(), String> {
    info!("Running {} install in {:?}", package_manager, root);
    let output = Command::new(package_manager.command())
        .args(package_manager.install_args())
        .current_dir(root)
        .output()
        .map_err(|e| format!("failed to run {}: {}", package_manager.command(), e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!("{} install failed: {}", package_manager, stderr.trim());
        return Err(format!(
            "{} install exited with {}",
            package_manager.command(),
            output.status
        ));
    }
    Ok(())
}
