//! CLI command definitions.
//!
//! Each subcommand maps onto the materialization pipeline or the
//! template registry.

use clap::{Parser, Subcommand};

pub mod list;
pub mod new;

/// stamp - materialize new projects from templates
#[derive(Parser)]
#[command(name = "stamp")]
#[command(version, about = "stamp - materialize new projects from templates")]
#[command(long_about = r#"
stamp creates a new project on disk from a named template: a local
directory, a remote archive URL, an owner/repo shorthand, or one of the
built-in templates. Remote templates are cached on disk with a TTL.

COMMANDS:
  new   → Materialize a project from a template
  list  → List the built-in templates

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Fetch failure
  4 - Validation failure
  5 - Render failure
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Materialize a new project from a template
    New(new::NewArgs),

    /// List the built-in templates
    List(list::ListArgs),
}
