//! Integration tests for the materialization pipeline.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use stamp_templates::{
    ContentRenderer, FetchConfig, Pipeline, PipelineOptions, SourceResolver, Stage,
    StructureValidator, TemplateContext, TemplateFetcher,
};
use tempfile::tempdir;

fn make_template(dir: &Path) {
    fs::create_dir_all(dir.join("src")).unwrap();
    fs::write(
        dir.join("package.json"),
        "{\"name\": \"<%= projectName %>\", \"description\": \"<%= description %>\"}",
    )
    .unwrap();
    fs::write(dir.join("src/index.js"), "// <%= projectName %> entry\n").unwrap();
    fs::write(dir.join("README.md"), "# <%= projectName %>\n\n<%= missingVar %>\n").unwrap();
    fs::write(
        dir.join("template.yaml"),
        "name: fixture\ndescription: Fixture template\nversion: 1.2.3\n",
    )
    .unwrap();
}

fn pipeline(cache_root: &Path, builtin_root: &Path) -> Pipeline {
    Pipeline::new(
        SourceResolver::new(),
        TemplateFetcher::new(
            FetchConfig::new()
                .cache_root(cache_root)
                .builtin_root(builtin_root),
        ),
        StructureValidator::new(),
        ContentRenderer::new(),
    )
}

#[tokio::test]
async fn test_materialize_local_template() {
    let template = tempdir().unwrap();
    make_template(template.path());
    let cache = tempdir().unwrap();
    let builtin = tempdir().unwrap();
    let target = tempdir().unwrap();

    let context = TemplateContext::new("widget").description("A widget package");
    let result = pipeline(cache.path(), builtin.path())
        .run(
            &template.path().to_string_lossy(),
            target.path(),
            &context,
            &PipelineOptions::default(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(result.template.metadata.name, "fixture");
    assert_eq!(result.stats.files_processed, 3);
    assert!(!result.stats.cache_hit);

    let manifest = fs::read_to_string(target.path().join("package.json")).unwrap();
    assert!(manifest.contains("\"widget\""));
    assert!(manifest.contains("A widget package"));

    // Unresolved placeholders stay literal.
    let readme = fs::read_to_string(target.path().join("README.md")).unwrap();
    assert!(readme.contains("# widget"));
    assert!(readme.contains("<%= missingVar %>"));

    // Descriptor never lands in the project.
    assert!(!target.path().join("template.yaml").exists());
}

#[tokio::test]
async fn test_dry_run_touches_nothing() {
    let template = tempdir().unwrap();
    make_template(template.path());
    let cache = tempdir().unwrap();
    let builtin = tempdir().unwrap();
    let target = tempdir().unwrap();

    let options = PipelineOptions {
        dry_run: true,
        ..Default::default()
    };
    let context = TemplateContext::new("widget");
    let result = pipeline(cache.path(), builtin.path())
        .run(
            &template.path().to_string_lossy(),
            target.path(),
            &context,
            &options,
            None,
        )
        .await
        .unwrap();

    assert!(result.operations.is_empty());
    assert_eq!(result.stats.files_processed, 0);
    assert_eq!(fs::read_dir(target.path()).unwrap().count(), 0);

    // Earlier stages still ran and were timed.
    assert!(result.stats.stage_timings.contains_key(&Stage::Resolve));
    assert!(result.stats.stage_timings.contains_key(&Stage::Fetch));
    assert!(result.stats.stage_timings.contains_key(&Stage::Validate));
    assert!(!result.stats.stage_timings.contains_key(&Stage::Render));
}

#[tokio::test]
async fn test_fetch_failure_reports_stage_and_location() {
    let cache = tempdir().unwrap();
    let builtin = tempdir().unwrap();
    let target = tempdir().unwrap();

    let context = TemplateContext::new("widget");
    let err = pipeline(cache.path(), builtin.path())
        .run(
            "./no-such-template-dir",
            target.path(),
            &context,
            &PipelineOptions::default(),
            None,
        )
        .await
        .unwrap_err();

    assert_eq!(err.stage, Stage::Fetch);
    assert!(err.to_string().contains("no-such-template-dir"));
}

#[tokio::test]
async fn test_empty_template_fails_validation() {
    let template = tempdir().unwrap();
    fs::write(template.path().join("template.yaml"), "name: empty\n").unwrap();
    let cache = tempdir().unwrap();
    let builtin = tempdir().unwrap();
    let target = tempdir().unwrap();

    let context = TemplateContext::new("widget");
    let err = pipeline(cache.path(), builtin.path())
        .run(
            &template.path().to_string_lossy(),
            target.path(),
            &context,
            &PipelineOptions::default(),
            None,
        )
        .await
        .unwrap_err();

    assert_eq!(err.stage, Stage::Validate);
}

#[tokio::test]
async fn test_unknown_identifier_falls_back_with_warning() {
    let cache = tempdir().unwrap();
    let builtin = tempdir().unwrap();
    let library = builtin.path().join("library");
    fs::create_dir_all(&library).unwrap();
    fs::write(library.join("package.json"), "{\"name\": \"<%= projectName %>\"}").unwrap();
    let target = tempdir().unwrap();

    let context = TemplateContext::new("widget");
    let result = pipeline(cache.path(), builtin.path())
        .run(
            "not-a-real-template",
            target.path(),
            &context,
            &PipelineOptions::default(),
            None,
        )
        .await
        .unwrap();

    assert!(result
        .warnings
        .iter()
        .any(|w| w.contains("falling back to built-in")));
    assert!(target.path().join("package.json").exists());
}

#[tokio::test]
async fn test_progress_reported_for_every_stage() {
    let template = tempdir().unwrap();
    make_template(template.path());
    let cache = tempdir().unwrap();
    let builtin = tempdir().unwrap();
    let target = tempdir().unwrap();

    let calls = AtomicUsize::new(0);
    let progress = |_stage: Stage, _percent: u8, _message: &str| {
        calls.fetch_add(1, Ordering::SeqCst);
    };

    let context = TemplateContext::new("widget");
    pipeline(cache.path(), builtin.path())
        .run(
            &template.path().to_string_lossy(),
            target.path(),
            &context,
            &PipelineOptions::default(),
            Some(&progress),
        )
        .await
        .unwrap();

    // Start and completion for each of the four stages.
    assert_eq!(calls.load(Ordering::SeqCst), 8);
}
