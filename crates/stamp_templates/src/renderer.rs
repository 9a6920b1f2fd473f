//! Content rendering with variable substitution.
//!
//! Walks a validated template tree, substitutes `<%= name %>` placeholders
//! in both file paths and text contents, and writes the result into the
//! target directory. Rendering is best-effort: a placeholder with no
//! matching variable is left as literal text rather than raising an error.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::{is_descriptor, is_excluded};
use crate::context::TemplateContext;
use crate::error::TemplateResult;

/// What the renderer did with one file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileAction {
    /// Text file written with placeholders substituted.
    Rendered,
    /// Binary file copied byte-for-byte.
    Copied,
}

/// Audit record of one write performed by the renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOperation {
    pub path: PathBuf,
    pub action: FileAction,
}

/// Renders template trees into target directories.
pub struct ContentRenderer {
    placeholder: Regex,
}

impl Default for ContentRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentRenderer {
    pub fn new() -> Self {
        Self {
            // Match <%= variable_name %>, whitespace-tolerant.
            placeholder: Regex::new(r"<%=\s*([a-zA-Z_][a-zA-Z0-9_]*)\s*%>").unwrap(),
        }
    }

    /// Render every file under `template_dir` into `target_dir`.
    pub fn render(
        &self,
        template_dir: &Path,
        target_dir: &Path,
        context: &TemplateContext,
    ) -> TemplateResult<Vec<FileOperation>> {
        let vars = build_variable_map(context);
        let mut operations = Vec::new();

        fs::create_dir_all(target_dir)?;
        let walker = WalkDir::new(template_dir)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| {
                e.file_name()
                    .to_str()
                    .map(|name| !is_excluded(name))
                    .unwrap_or(true)
            });

        for entry in walker.filter_map(|e| e.ok()) {
            let source = entry.path();
            let relative = source.strip_prefix(template_dir).unwrap();
            let name = entry.file_name().to_string_lossy();
            if source.is_file() && is_descriptor(&name) && relative.components().count() == 1 {
                continue;
            }

            let rendered_relative = self.render_path(relative, &vars);
            let target = target_dir.join(&rendered_relative);

            if source.is_dir() {
                fs::create_dir_all(&target)?;
                continue;
            }

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }

            if is_text_file(source) {
                let content = fs::read_to_string(source)?;
                let rendered = self.render_content(&content, &vars);
                fs::write(&target, rendered)?;
                debug!("Rendered {:?}", rendered_relative);
                operations.push(FileOperation {
                    path: target,
                    action: FileAction::Rendered,
                });
            } else {
                fs::copy(source, &target)?;
                debug!("Copied {:?}", rendered_relative);
                operations.push(FileOperation {
                    path: target,
                    action: FileAction::Copied,
                });
            }
        }

        info!("Rendered {} files into {:?}", operations.len(), target_dir);
        Ok(operations)
    }

    /// Substitute placeholders in text; unknown variables stay literal.
    pub fn render_content(&self, content: &str, vars: &HashMap<String, String>) -> String {
        self.placeholder
            .replace_all(content, |caps: &regex::Captures| {
                let name = &caps[1];
                vars.get(name)
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .to_string()
    }

    fn render_path(&self, path: &Path, vars: &HashMap<String, String>) -> PathBuf {
        let rendered = self.render_content(&path.to_string_lossy(), vars);
        PathBuf::from(rendered)
    }
}

/// Variable map for rendering: free-form variables, the context's named
/// fields, and case conversions of the project name.
pub fn build_variable_map(context: &TemplateContext) -> HashMap<String, String> {
    let mut vars = context.variables.clone();

    vars.insert("projectName".to_string(), context.project_name.clone());
    vars.insert(
        "description".to_string(),
        context.description.clone().unwrap_or_default(),
    );
    vars.insert("author".to_string(), context.author.clone().unwrap_or_default());
    vars.insert(
        "version".to_string(),
        context.version.clone().unwrap_or_else(|| "0.1.0".to_string()),
    );
    if let Some(pm) = context.package_manager {
        vars.insert("packageManager".to_string(), pm.to_string());
    }

    vars.insert(
        "projectNameSnake".to_string(),
        to_snake_case(&context.project_name),
    );
    vars.insert(
        "projectNamePascal".to_string(),
        to_pascal_case(&context.project_name),
    );
    vars.insert(
        "projectNameKebab".to_string(),
        to_kebab_case(&context.project_name),
    );

    vars
}

fn is_text_file(path: &Path) -> bool {
    let text_extensions = [
        "txt", "md", "yaml", "yml", "json", "toml", "xml", "html", "css", "scss", "js", "ts",
        "jsx", "tsx", "mjs", "cjs", "vue", "svelte", "sh", "bash", "env", "gitignore",
        "npmignore", "dockerignore", "editorconfig", "eslintrc", "prettierrc", "lock",
    ];

    if let Some(ext) = path.extension() {
        let ext_lower = ext.to_string_lossy().to_lowercase();
        return text_extensions.contains(&ext_lower.as_str());
    }

    if let Some(name) = path.file_name() {
        let name_lower = name.to_string_lossy().to_lowercase();
        return name_lower.starts_with('.')
            || ["dockerfile", "makefile", "license", "procfile"].contains(&name_lower.as_str());
    }

    false
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
        } else if c == '-' || c == ' ' {
            result.push('_');
        } else {
            result.push(c);
        }
    }
    result
}

fn to_pascal_case(s: &str) -> String {
    s.split(|c: char| c == '_' || c == '-' || c == ' ')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect()
}

fn to_kebab_case(s: &str) -> String {
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('-');
            }
            result.push(c.to_ascii_lowercase());
        } else if c == '_' || c == ' ' {
            result.push('-');
        } else {
            result.push(c);
        }
    }
    result
}
