//! # stamp_templates
//!
//! Template materialization for stamp: resolving a template identifier to
//! a typed source, fetching it (with an on-disk TTL cache), validating
//! the fetched structure, and rendering it into a target directory with
//! variable substitution.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use stamp_templates::{
//!     ContentRenderer, FetchConfig, Pipeline, PipelineOptions, SourceResolver,
//!     StructureValidator, TemplateContext, TemplateFetcher,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = Pipeline::new(
//!     SourceResolver::new(),
//!     TemplateFetcher::new(FetchConfig::new()),
//!     StructureValidator::new(),
//!     ContentRenderer::new(),
//! );
//!
//! let context = TemplateContext::new("my-widget").description("A widget package");
//! let result = pipeline
//!     .run(
//!         "my-org/my-template#v2",
//!         Path::new("./my-widget"),
//!         &context,
//!         &PipelineOptions::default(),
//!         None,
//!     )
//!     .await?;
//! println!("created {} files", result.stats.files_processed);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod fetcher;
pub mod metadata;
pub mod pipeline;
pub mod renderer;
pub mod source;
pub mod validator;

pub use cache::{CacheEntryMeta, CacheStore};
pub use config::FetchConfig;
pub use context::{PackageManager, TemplateContext};
pub use error::{TemplateError, TemplateResult};
pub use fetcher::{FetchOutcome, TemplateFetcher};
pub use metadata::TemplateMetadata;
pub use pipeline::{
    Pipeline, PipelineOptions, PipelineResult, PipelineStats, ResolvedTemplate, Stage, StageError,
};
pub use renderer::{ContentRenderer, FileAction, FileOperation};
pub use source::{Resolution, SourceResolver, SourceType, TemplateSource, BUILTIN_TEMPLATES};
pub use validator::{StructureValidator, ValidationReport};
