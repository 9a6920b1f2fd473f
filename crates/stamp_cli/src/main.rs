//! stamp CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Fetch failure
//! - 4: Validation failure
//! - 5: Render failure

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stamp_templates::{Stage, StageError};

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const FETCH_FAILURE: u8 = 3;
    pub const VALIDATION_FAILURE: u8 = 4;
    pub const RENDER_FAILURE: u8 = 5;
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(
            EnvFilter::from_default_env()
                .add_directive("stamp=info".parse().unwrap())
                .add_directive("warn".parse().unwrap()),
        )
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::New(args) => commands::new::execute(args).await,
        Commands::List(args) => commands::list::execute(args).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    // Pipeline failures carry their stage through the anyhow context
    // wrapper; match on it directly rather than on message text.
    if let Some(stage_error) = e.downcast_ref::<StageError>() {
        return match stage_error.stage {
            Stage::Fetch => ExitCodes::FETCH_FAILURE,
            Stage::Validate => ExitCodes::VALIDATION_FAILURE,
            Stage::Render => ExitCodes::RENDER_FAILURE,
            Stage::Resolve => ExitCodes::GENERAL_ERROR,
        };
    }

    // Everything else goes by the full message chain, not just the
    // outermost context.
    let msg = format!("{:#}", e).to_lowercase();
    if msg.contains("validation") {
        ExitCodes::VALIDATION_FAILURE
    } else if msg.contains("argument") || msg.contains("option") {
        ExitCodes::INVALID_ARGS
    } else {
        ExitCodes::GENERAL_ERROR
    }
}
