//! Git integration for materialized projects.
//!
//! Runs after the pipeline: initializes a repository, writes an ignore
//! file and creates the initial commit. Steps are sequential and
//! warning-tolerant; the caller always gets a [`GitResult`] back, never
//! an error, and is expected to surface warnings rather than abort.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use stamp_templates::{PackageManager, TemplateContext};

/// Outcome flags and collected diagnostics for one git integration run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GitResult {
    pub initialized: bool,
    pub committed: bool,
    pub gitignore_added: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

/// Git operations for a materialized project directory.
#[derive(Debug)]
pub struct GitIntegrator {
    project_path: PathBuf,
}

impl GitIntegrator {
    pub fn new<P: AsRef<Path>>(project_path: P) -> Self {
        Self {
            project_path: project_path.as_ref().to_path_buf(),
        }
    }

    /// Check if git is available on the system.
    pub fn is_git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Check if the project directory is already under version control.
    pub fn is_repository(&self) -> bool {
        self.project_path.join(".git").exists()
    }

    /// Run the full integration: init, ignore file, initial commit.
    pub fn integrate(&self, context: &TemplateContext) -> GitResult {
        let mut result = GitResult::default();

        if !Self::is_git_available() {
            result
                .warnings
                .push("git executable not found, skipping repository setup".to_string());
            return result;
        }

        // Idempotent no-op on an existing repository.
        if self.is_repository() {
            debug!("{:?} is already a git repository", self.project_path);
            return result;
        }

        if let Err(message) = self.init(context) {
            // Nothing to write the ignore file or commit into.
            result.warnings.push(format!("git init failed: {}", message));
            return result;
        }
        result.initialized = true;

        match self.write_gitignore(context) {
            Ok(written) => result.gitignore_added = written,
            Err(message) => result
                .warnings
                .push(format!("could not write .gitignore: {}", message)),
        }

        match self.initial_commit(context) {
            Ok(()) => result.committed = true,
            Err(message) => result.errors.push(format!("initial commit failed: {}", message)),
        }

        info!(
            "Git integration for {:?}: initialized={} committed={}",
            self.project_path, result.initialized, result.committed
        );
        result
    }

    fn init(&self, context: &TemplateContext) -> Result<(), String> {
        run_git(&self.project_path, &["init"])?;

        // Local author identity so the initial commit succeeds on
        // machines without global git config.
        if let Some(author) = &context.author {
            let (name, email) = split_author(author);
            if let Err(e) = run_git(&self.project_path, &["config", "user.name", &name]) {
                warn!("Could not set git user.name: {}", e);
            }
            if let Some(email) = email {
                if let Err(e) = run_git(&self.project_path, &["config", "user.email", &email]) {
                    warn!("Could not set git user.email: {}", e);
                }
            }
        }
        Ok(())
    }

    /// Write the standard ignore file. Skipped (Ok(false)) when one
    /// already exists.
    fn write_gitignore(&self, context: &TemplateContext) -> Result<bool, String> {
        let path = self.project_path.join(".gitignore");
        if path.exists() {
            debug!(".gitignore already present, leaving it alone");
            return Ok(false);
        }
        let package_manager = context.package_manager.unwrap_or_default();
        fs::write(&path, gitignore_content(package_manager)).map_err(|e| e.to_string())?;
        Ok(true)
    }

    fn initial_commit(&self, context: &TemplateContext) -> Result<(), String> {
        run_git(&self.project_path, &["add", "-A"])?;
        let message = commit_message(context);
        run_git(&self.project_path, &["commit", "-m", &message])?;
        Ok(())
    }
}

fn run_git(dir: &Path, args: &[&str]) -> Result<(), String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| format!("failed to run git: {}", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("git {} failed: {}", args[0], stderr.trim()));
    }
    Ok(())
}

/// Split "Name <email>" into its parts.
fn split_author(author: &str) -> (String, Option<String>) {
    if let (Some(open), Some(close)) = (author.find('<'), author.rfind('>')) {
        if open < close {
            let name = author[..open].trim().to_string();
            let email = author[open + 1..close].trim().to_string();
            if !email.is_empty() {
                return (name, Some(email));
            }
        }
    }
    (author.trim().to_string(), None)
}

/// Initial commit message: conventional-commit headline, description
/// paragraph when present, and a fixed tooling summary.
pub fn commit_message(context: &TemplateContext) -> String {
    let headline = format!("feat: add {} package", context.project_name);
    match &context.description {
        Some(description) if !description.is_empty() => format!(
            "{}\n\n{}\n\n- Scaffolded from template\n- Build and test tooling preconfigured\n- Lint and format configuration included",
            headline, description
        ),
        _ => headline,
    }
}

/// Sectioned ignore file plus exactly one lockfile line for the chosen
/// installer.
pub fn gitignore_content(package_manager: PackageManager) -> String {
    format!(
        "# Dependencies\nnode_modules/\n\n# Build output\ndist/\nbuild/\ncoverage/\n.cache/\n\n# Editor and OS artifacts\n.DS_Store\nThumbs.db\n.idea/\n.vscode/\n*.swp\n\n# Environment\n.env\n.env.local\n.env.*.local\n\n# Lockfile\n{}\n",
        package_manager.lockfile()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_commit_message_with_description() {
        let ctx = TemplateContext::new("widget").description("A widget package");
        let message = commit_message(&ctx);
        assert!(message.starts_with("feat: add widget package\n\nA widget package"));
        assert!(message.contains("- Scaffolded from template"));
    }

    #[test]
    fn test_commit_message_without_description() {
        let ctx = TemplateContext::new("widget");
        assert_eq!(commit_message(&ctx), "feat: add widget package");
    }

    #[test]
    fn test_gitignore_has_one_lockfile_line() {
        let content = gitignore_content(PackageManager::Pnpm);
        assert!(content.contains("pnpm-lock.yaml"));
        assert!(!content.contains("package-lock.json"));
        assert!(!content.contains("yarn.lock"));
        assert!(content.contains("node_modules/"));
    }

    #[test]
    fn test_split_author() {
        assert_eq!(
            split_author("Ada Lovelace <ada@example.com>"),
            ("Ada Lovelace".to_string(), Some("ada@example.com".to_string()))
        );
        assert_eq!(split_author("Ada"), ("Ada".to_string(), None));
    }

    #[test]
    fn test_integrate_full_flow() {
        if !GitIntegrator::is_git_available() {
            println!("Git not available, skipping test");
            return;
        }

        let dir = tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();

        let ctx = TemplateContext::new("widget")
            .description("A widget package")
            .author("Test <test@example.com>");
        let integrator = GitIntegrator::new(dir.path());
        let result = integrator.integrate(&ctx);

        assert!(result.initialized);
        assert!(result.gitignore_added);
        assert!(result.committed, "errors: {:?}", result.errors);
        assert!(dir.path().join(".git").exists());
        assert!(dir.path().join(".gitignore").exists());
    }

    #[test]
    fn test_integrate_existing_repo_is_noop() {
        if !GitIntegrator::is_git_available() {
            println!("Git not available, skipping test");
            return;
        }

        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();

        let ctx = TemplateContext::new("widget");
        let result = GitIntegrator::new(dir.path()).integrate(&ctx);

        assert!(!result.initialized);
        assert!(!result.committed);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_existing_gitignore_is_preserved() {
        if !GitIntegrator::is_git_available() {
            println!("Git not available, skipping test");
            return;
        }

        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), "custom\n").unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();

        let ctx = TemplateContext::new("widget").author("Test <test@example.com>");
        let result = GitIntegrator::new(dir.path()).integrate(&ctx);

        assert!(result.initialized);
        assert!(!result.gitignore_added);
        assert_eq!(fs::read_to_string(dir.path().join(".gitignore")).unwrap(), "custom\n");
    }
}
