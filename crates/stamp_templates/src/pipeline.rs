//! Pipeline orchestration.
//!
//! Four ordered stages: Resolve, Fetch, Validate, Render. Each stage is
//! timed, reported through a progress callback, and on failure wrapped
//! with its stage name and elapsed time. Later stages never run once one
//! fails. The pipeline never panics across its public boundary.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::context::TemplateContext;
use crate::error::TemplateError;
use crate::fetcher::TemplateFetcher;
use crate::metadata::TemplateMetadata;
use crate::renderer::{ContentRenderer, FileOperation};
use crate::source::{SourceResolver, TemplateSource};
use crate::validator::StructureValidator;

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Resolve,
    Fetch,
    Validate,
    Render,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Resolve => "resolve",
            Stage::Fetch => "fetch",
            Stage::Validate => "validate",
            Stage::Render => "render",
        }
    }

    /// Progress percentage range occupied by this stage.
    pub fn percent_range(&self) -> (u8, u8) {
        match self {
            Stage::Resolve => (0, 10),
            Stage::Fetch => (10, 40),
            Stage::Validate => (40, 50),
            Stage::Render => (70, 100),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stage failure carrying the stage name and elapsed time, so callers
/// can report "failed at render after 340ms" rather than a bare trace.
#[derive(Error, Debug)]
#[error("Pipeline failed at {stage} after {elapsed_ms}ms: {source}")]
pub struct StageError {
    pub stage: Stage,
    pub elapsed_ms: u128,
    #[source]
    pub source: TemplateError,
}

/// Progress callback: `(stage, percent_complete, message)`. Invoked at
/// least at stage start and stage completion for every stage that runs.
pub type ProgressFn<'a> = &'a dyn Fn(Stage, u8, &str);

fn no_progress(_: Stage, _: u8, _: &str) {}

/// Options controlling one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Skip the render stage entirely, reporting zero file operations.
    pub dry_run: bool,
    /// Ref hint passed through to source resolution.
    pub reference: Option<String>,
    /// Subdirectory hint passed through to source resolution.
    pub subdir: Option<String>,
}

/// The fetched-and-validated template the renderer consumed.
#[derive(Debug, Clone)]
pub struct ResolvedTemplate {
    pub metadata: TemplateMetadata,
    pub source: TemplateSource,
    pub path: PathBuf,
    pub context: TemplateContext,
}

/// Timing and counting statistics for a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStats {
    pub total_ms: u128,
    pub stage_timings: HashMap<Stage, u128>,
    pub files_processed: usize,
    pub cache_hit: bool,
}

/// Result of a successful pipeline run.
#[derive(Debug)]
pub struct PipelineResult {
    pub template: ResolvedTemplate,
    pub operations: Vec<FileOperation>,
    pub stats: PipelineStats,
    /// Warnings accumulated across stages.
    pub warnings: Vec<String>,
    /// Keeps the staging directory (and `template.path`) alive until the
    /// result is dropped.
    _staging: tempfile::TempDir,
}

/// Sequences Resolve, Fetch, Validate and Render over injected parts.
///
/// The four stage implementations are plain constructor-built values
/// supplied by the composition root; there are no shared module-level
/// instances and no lazy loading.
pub struct Pipeline {
    resolver: SourceResolver,
    fetcher: TemplateFetcher,
    validator: StructureValidator,
    renderer: ContentRenderer,
}

impl Pipeline {
    pub fn new(
        resolver: SourceResolver,
        fetcher: TemplateFetcher,
        validator: StructureValidator,
        renderer: ContentRenderer,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            validator,
            renderer,
        }
    }

    /// Materialize `identifier` into `target_dir` with `context`.
    pub async fn run(
        &self,
        identifier: &str,
        target_dir: &Path,
        context: &TemplateContext,
        options: &PipelineOptions,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<PipelineResult, StageError> {
        let progress = progress.unwrap_or(&no_progress);
        let run_start = Instant::now();
        let mut stage_timings = HashMap::new();
        let mut warnings = Vec::new();

        // Resolve. Pure and total: cannot fail.
        let (start, end) = Stage::Resolve.percent_range();
        progress(Stage::Resolve, start, "Resolving template source");
        let stage_start = Instant::now();
        let resolution =
            self.resolver
                .resolve(identifier, options.reference.as_deref(), options.subdir.as_deref());
        stage_timings.insert(Stage::Resolve, stage_start.elapsed().as_millis());
        warnings.extend(resolution.warnings.iter().cloned());
        for warning in &resolution.warnings {
            warn!("{}", warning);
        }
        progress(Stage::Resolve, end, "Template source resolved");
        let source = resolution.source;

        // Fetch into a staging directory so dry runs (and failed later
        // stages) never touch the target directory.
        let (start, end) = Stage::Fetch.percent_range();
        progress(Stage::Fetch, start, "Fetching template");
        let stage_start = Instant::now();
        let staging = tempfile::tempdir().map_err(|e| StageError {
            stage: Stage::Fetch,
            elapsed_ms: stage_start.elapsed().as_millis(),
            source: e.into(),
        })?;
        let fetch_result = self.fetcher.fetch(&source, staging.path()).await;
        let fetch_elapsed = stage_start.elapsed().as_millis();
        stage_timings.insert(Stage::Fetch, fetch_elapsed);
        let outcome = fetch_result.map_err(|source| StageError {
            stage: Stage::Fetch,
            elapsed_ms: fetch_elapsed,
            source,
        })?;
        warnings.extend(outcome.warnings.iter().cloned());
        progress(Stage::Fetch, end, "Template fetched");

        // Validate.
        let (start, end) = Stage::Validate.percent_range();
        progress(Stage::Validate, start, "Validating template structure");
        let stage_start = Instant::now();
        let validation = self.validator.validate(&outcome.path);
        let validate_elapsed = stage_start.elapsed().as_millis();
        stage_timings.insert(Stage::Validate, validate_elapsed);
        let report = validation.map_err(|source| StageError {
            stage: Stage::Validate,
            elapsed_ms: validate_elapsed,
            source,
        })?;
        warnings.extend(report.warnings.iter().cloned());
        if !report.valid {
            return Err(StageError {
                stage: Stage::Validate,
                elapsed_ms: validate_elapsed,
                source: TemplateError::ValidationFailed(report.errors.join("; ")),
            });
        }
        progress(Stage::Validate, end, "Template structure validated");

        // Render. Skipped entirely in dry-run mode.
        let operations = if options.dry_run {
            debug!("Dry run: skipping render stage");
            Vec::new()
        } else {
            let (start, end) = Stage::Render.percent_range();
            progress(Stage::Render, start, "Rendering template");
            let stage_start = Instant::now();
            let render_result = self.renderer.render(&outcome.path, target_dir, context);
            let render_elapsed = stage_start.elapsed().as_millis();
            stage_timings.insert(Stage::Render, render_elapsed);
            let operations = render_result.map_err(|source| StageError {
                stage: Stage::Render,
                elapsed_ms: render_elapsed,
                source,
            })?;
            progress(Stage::Render, end, "Template rendered");
            operations
        };

        let stats = PipelineStats {
            total_ms: run_start.elapsed().as_millis(),
            stage_timings,
            files_processed: operations.len(),
            cache_hit: outcome.cache_hit,
        };
        info!(
            "Materialized '{}' into {:?} ({} files, {}ms)",
            identifier, target_dir, stats.files_processed, stats.total_ms
        );

        Ok(PipelineResult {
            template: ResolvedTemplate {
                metadata: outcome.metadata,
                source,
                path: outcome.path,
                context: context.clone(),
            },
            operations,
            stats,
            warnings,
            _staging: staging,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_percent_ranges() {
        assert_eq!(Stage::Resolve.percent_range(), (0, 10));
        assert_eq!(Stage::Fetch.percent_range(), (10, 40));
        assert_eq!(Stage::Validate.percent_range(), (40, 50));
        assert_eq!(Stage::Render.percent_range(), (70, 100));
    }

    #[test]
    fn test_stage_error_display() {
        let err = StageError {
            stage: Stage::Render,
            elapsed_ms: 340,
            source: TemplateError::ValidationFailed("boom".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("render"));
        assert!(msg.contains("340ms"));
    }
}
