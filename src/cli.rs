//! CLI module
//!
//! This module provides the command-line interface for replan.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use serde::de::DeserializeOwned;

use crate::api::{serve, AppState, ServerConfig};
use crate::config::OracleConfig;
use crate::error::{Error, Result};
use crate::models::{ProjectSummary, TaskSnapshot, TaskSummary};
use crate::optimizer::{OutcomeSource, ScheduleOptimizer};
use crate::oracle::{self, Oracle};
use crate::store::InMemoryStore;
use crate::suggestions::{SuggestionGenerator, DEFAULT_SUGGESTION_COUNT};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    oracle: OracleConfig,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the replan API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 3000)]
        port: u16,

        /// JSON file with initial projects and tasks
        #[arg(long)]
        seed: Option<PathBuf>,
    },

    /// Optimize the schedule of the tasks in a JSON file
    Optimize {
        /// JSON array of tasks
        tasks: PathBuf,

        /// Reference time (RFC 3339); defaults to the current time
        #[arg(long)]
        now: Option<String>,

        /// Skip the oracle and use the deterministic rebalancer
        #[arg(long)]
        offline: bool,
    },

    /// Suggest new tasks for a project
    Suggest {
        /// JSON file describing the project
        project: PathBuf,

        /// JSON array of the project's existing tasks
        #[arg(long)]
        tasks: Option<PathBuf>,

        /// Number of suggestions
        #[arg(short, long, default_value_t = DEFAULT_SUGGESTION_COUNT)]
        count: usize,

        /// Skip the oracle and use the template bank
        #[arg(long)]
        offline: bool,
    },

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Run the CLI application
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { port, seed } => {
            let store = match seed {
                Some(path) => InMemoryStore::load(path)?,
                None => InMemoryStore::new(),
            };

            let oracle = oracle::from_config(&cli.oracle);
            let timeout = cli.oracle.timeout();
            let state = AppState {
                optimizer: ScheduleOptimizer::new(oracle.clone(), timeout),
                generator: SuggestionGenerator::new(oracle, timeout),
                store: Arc::new(store),
            };

            println!("Starting replan API server on port {}...", port);
            let config = ServerConfig {
                address: ([127, 0, 0, 1], *port).into(),
            };
            serve(state, config).await?;
            Ok(())
        }

        Commands::Optimize {
            tasks,
            now,
            offline,
        } => {
            let tasks: Vec<TaskSnapshot> = read_json(tasks)?;
            let now = match now {
                Some(raw) => parse_now(raw)?,
                None => Utc::now(),
            };

            let optimizer =
                ScheduleOptimizer::new(build_oracle(&cli.oracle, *offline), cli.oracle.timeout());
            let outcome = optimizer.optimize_schedule_at(tasks, now).await;

            report_source(&outcome.source);
            println!("{}", serde_json::to_string_pretty(&outcome.tasks)?);
            Ok(())
        }

        Commands::Suggest {
            project,
            tasks,
            count,
            offline,
        } => {
            let project: ProjectSummary = read_json(project)?;
            let existing: Vec<TaskSummary> = match tasks {
                Some(path) => read_json::<Vec<TaskSnapshot>>(path)?
                    .iter()
                    .map(|t| t.summary())
                    .collect(),
                None => Vec::new(),
            };

            let generator =
                SuggestionGenerator::new(build_oracle(&cli.oracle, *offline), cli.oracle.timeout());
            let outcome = generator.suggest_tasks(&project, &existing, *count).await;

            report_source(&outcome.source);
            println!("{}", serde_json::to_string_pretty(&outcome.drafts)?);
            Ok(())
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}

fn build_oracle(config: &OracleConfig, offline: bool) -> Option<Arc<dyn Oracle>> {
    if offline {
        None
    } else {
        oracle::from_config(config)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn parse_now(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::InvalidArgument(format!("--now {:?}: {}", raw, e)))
}

/// Notes on stderr which path produced the result, keeping stdout pure JSON
fn report_source(source: &OutcomeSource) {
    match source {
        OutcomeSource::Oracle => eprintln!("{}", "Result from AI oracle".green()),
        OutcomeSource::Fallback(reason) => {
            eprintln!("{} {}", "Deterministic fallback:".yellow(), reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_now() {
        let parsed = parse_now("2024-06-01T12:00:00+02:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-06-01T10:00:00+00:00");
        assert!(matches!(
            parse_now("yesterday"),
            Err(Error::InvalidArgument(_))
        ));
    }
}
