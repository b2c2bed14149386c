//! REST-to-PostgreSQL migration tool
//!
//! Exports tables from a hosted REST data API into timestamped SQL snapshots,
//! loads a snapshot into PostgreSQL, and verifies row counts on both sides.

// restmigrate/src/main.rs
mod config;
mod errors;
mod export;
mod import;
mod source;
mod target;
mod utils;
mod verify;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use config::{AppConfig, DEFAULT_CONFIG_PATH};
use errors::{AppError, INTERRUPTED_STATUS};
use export::snapshot::Snapshot;
use import::loader::{ClearMode, ExecutionMode, ImportOptions};

#[derive(Parser)]
#[command(name = "restmigrate")]
#[command(about = "Copy tables from a REST data API into PostgreSQL")]
#[command(version)]
struct Cli {
    /// Path to the env-style config file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every configured table into a new snapshot
    Export,
    /// Load a snapshot into the target database
    Import {
        #[command(flatten)]
        load: LoadArgs,
        /// Snapshot directory to import instead of the last export
        #[arg(long, value_name = "DIR")]
        snapshot: Option<PathBuf>,
    },
    /// Compare source and target row counts
    Verify,
    /// Export, import the new snapshot, then verify
    Full {
        #[command(flatten)]
        load: LoadArgs,
    },
}

#[derive(clap::Args, Debug, Clone, Copy)]
struct LoadArgs {
    /// Clear tables that already hold rows without asking
    #[arg(long, conflicts_with = "keep")]
    force: bool,
    /// Never clear; append to existing rows
    #[arg(long)]
    keep: bool,
    /// Stop a table's import at its first failing statement
    #[arg(long)]
    strict: bool,
}

impl LoadArgs {
    fn import_options(self, app_config: &AppConfig) -> ImportOptions {
        let clear_mode = if self.force {
            ClearMode::Force
        } else if self.keep {
            ClearMode::Keep
        } else {
            ClearMode::Ask
        };
        let execution = if self.strict {
            ExecutionMode::Strict
        } else {
            ExecutionMode::Tolerant {
                shown_errors: app_config.error_display_limit,
            }
        };
        ImportOptions {
            clear_mode,
            execution,
            reset_sequences: app_config.reset_sequences,
        }
    }
}

/// Main entry point for the migration tool
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let outcome = tokio::select! {
        outcome = run_app(cli) => outcome,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\n❌ {}", AppError::Cancelled("interrupted by user".to_string()));
            // The runtime would otherwise wait on a pending stdin read.
            std::process::exit(i32::from(INTERRUPTED_STATUS));
        }
    };

    match outcome {
        Ok(()) => {
            println!("✅ Operation completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            match errors::classify(&e) {
                Some(app_error) => app_error.exit_code(),
                None => ExitCode::FAILURE,
            }
        }
    }
}

async fn run_app(cli: Cli) -> Result<()> {
    let app_config = AppConfig::load(&cli.config).with_context(|| {
        format!(
            "Failed to load application configuration from {}",
            cli.config.display()
        )
    })?;
    tracing::info!(tables = ?app_config.tables, "configuration loaded");

    match cli.command {
        Commands::Export => {
            println!("🚀 Starting Export Process...");
            export::run_export_flow(&app_config)
                .await
                .context("Export process failed")?;
        }
        Commands::Import { load, snapshot } => {
            println!("🔄 Starting Import Process...");
            let snapshot = snapshot.as_deref().map(Snapshot::open).transpose()?;
            let options = load.import_options(&app_config);
            import::run_import_flow(&app_config, &options, snapshot)
                .await
                .context("Import process failed")?;
        }
        Commands::Verify => {
            println!("🔍 Starting Verification...");
            verify::run_verify_flow(&app_config)
                .await
                .context("Verification process failed")?;
        }
        Commands::Full { load } => {
            println!("🚀 Starting Full Migration...");
            let summary = export::run_export_flow(&app_config)
                .await
                .context("Export process failed")?;
            let options = load.import_options(&app_config);
            import::run_import_flow(&app_config, &options, Some(summary.snapshot))
                .await
                .context("Import process failed")?;
            verify::run_verify_flow(&app_config)
                .await
                .context("Verification process failed")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_force_and_keep_conflict() {
        let parsed = Cli::try_parse_from(["restmigrate", "import", "--force", "--keep"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_import_flags_parse() {
        let cli = Cli::try_parse_from([
            "restmigrate",
            "--config",
            "other.env",
            "import",
            "--keep",
            "--strict",
            "--snapshot",
            "migration/exports/export_20250101_120000",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("other.env"));
        match cli.command {
            Commands::Import { load, snapshot } => {
                assert!(load.keep && load.strict && !load.force);
                assert_eq!(
                    snapshot,
                    Some(PathBuf::from("migration/exports/export_20250101_120000"))
                );
            }
            _ => panic!("expected import command"),
        }
    }

    #[test]
    fn test_default_config_path() {
        let cli = Cli::try_parse_from(["restmigrate", "verify"]).unwrap();
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
    }
}
