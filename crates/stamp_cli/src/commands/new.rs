//! New command - materialize a project from a template.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use stamp_project::{GitIntegrator, WorkspaceIntegrator};
use stamp_templates::{
    ContentRenderer, FetchConfig, PackageManager, Pipeline, PipelineOptions, SourceResolver,
    Stage, StructureValidator, TemplateContext, TemplateFetcher,
};

#[derive(Args)]
pub struct NewArgs {
    /// Name of the project to create
    name: String,

    /// Template identifier: built-in name, local path, owner/repo or URL
    #[arg(short, long, default_value = "library")]
    template: String,

    /// Branch or tag for hosted-repo templates
    #[arg(long)]
    r#ref: Option<String>,

    /// Subdirectory within the template to use
    #[arg(long)]
    subdir: Option<String>,

    /// One-line project description
    #[arg(short, long)]
    description: Option<String>,

    /// Author identity ("Name <email>")
    #[arg(long)]
    author: Option<String>,

    /// Dependency installer for the generated project
    #[arg(long, default_value = "npm")]
    package_manager: String,

    /// Template variables as key=value pairs
    #[arg(long = "var", value_parser = parse_key_value)]
    variables: Vec<(String, String)>,

    /// Output directory (defaults to ./<name>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Resolve, fetch and validate without writing the project
    #[arg(long)]
    dry_run: bool,

    /// Skip git repository setup
    #[arg(long)]
    no_git: bool,

    /// Skip dependency installation after workspace registration
    #[arg(long)]
    no_install: bool,
}

pub async fn execute(args: NewArgs) -> Result<()> {
    info!("Creating project: {}", args.name);

    let current_dir = std::env::current_dir()?;
    let output_path = args.output.unwrap_or_else(|| current_dir.join(&args.name));
    if output_path.exists() && output_path.read_dir()?.next().is_some() {
        anyhow::bail!("Output directory is not empty: {:?}", output_path);
    }

    let package_manager = PackageManager::from_str(&args.package_manager)
        .ok_or_else(|| anyhow::anyhow!("Unknown package manager: {}", args.package_manager))?;

    let mut context = TemplateContext::new(args.name.as_str())
        .package_manager(package_manager)
        .variables(args.variables.iter().cloned().collect::<HashMap<_, _>>());
    if let Some(description) = &args.description {
        context = context.description(description.as_str());
    }
    if let Some(author) = &args.author {
        context = context.author(author.as_str());
    }

    // Composition root: the pipeline takes its four stages as explicitly
    // constructed parts.
    let pipeline = Pipeline::new(
        SourceResolver::new(),
        TemplateFetcher::new(FetchConfig::new()),
        StructureValidator::new(),
        ContentRenderer::new(),
    );

    let options = PipelineOptions {
        dry_run: args.dry_run,
        reference: args.r#ref.clone(),
        subdir: args.subdir.clone(),
    };
    let progress = |stage: Stage, percent: u8, message: &str| {
        info!("[{:>3}%] {}: {}", percent, stage, message);
    };

    let result = pipeline
        .run(&args.template, &output_path, &context, &options, Some(&progress))
        .await
        .context("Failed to materialize template")?;

    for warning in &result.warnings {
        warn!("{}", warning);
    }
    info!(
        "Materialized '{}' v{} ({} files in {}ms{})",
        result.template.metadata.name,
        result.template.metadata.version,
        result.stats.files_processed,
        result.stats.total_ms,
        if result.stats.cache_hit { ", cached" } else { "" }
    );

    if args.dry_run {
        info!("Dry run complete, no files written");
        return Ok(());
    }

    if !args.no_git {
        let git_result = GitIntegrator::new(&output_path).integrate(&context);
        for warning in &git_result.warnings {
            warn!("git: {}", warning);
        }
        for error in &git_result.errors {
            warn!("git: {}", error);
        }
    }

    let ws_result = WorkspaceIntegrator::new(&output_path).integrate(&context, !args.no_install);
    for warning in &ws_result.warnings {
        warn!("workspace: {}", warning);
    }
    for error in &ws_result.errors {
        warn!("workspace: {}", error);
    }

    info!("Project created at {:?}", output_path);
    Ok(())
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}
