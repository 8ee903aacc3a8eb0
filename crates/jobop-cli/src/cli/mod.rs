//! CLI for inspecting the jobop retry policy.

mod commands;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use jobop_core::config;
use jobop_core::retry::{ApiMethod, RetryPolicy, GLOBAL_FAILURE};
use std::path::PathBuf;

use commands::{run_backoff, run_classify, run_evaluate, ClassifyArgs};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "jobop")]
#[command(about = "jobop: failure classification and retry policy for job-cluster API calls", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Print the backoff delay for each attempt under the configured policy.
    Backoff {
        /// Number of attempts to show, starting at attempt 0.
        #[arg(long, default_value = "10", value_name = "N")]
        attempts: u32,
    },

    /// Classify a failed call and print the status record that would be persisted.
    Classify {
        /// Remote operation that failed (e.g. SubmitJob).
        method: ApiMethod,

        /// Machine-readable error code.
        #[arg(long, default_value = GLOBAL_FAILURE)]
        code: String,

        /// The failure is transient and may be retried.
        #[arg(long)]
        retryable: bool,

        /// Abort the reconciliation attempt regardless of retry budget.
        #[arg(long)]
        fail_fast: bool,

        /// Retry bound (defaults to the configured bound for retryable failures, else 0).
        #[arg(long, value_name = "N")]
        max_retries: Option<u32>,

        /// Underlying error message to wrap.
        #[arg(long)]
        cause: Option<String>,

        /// Stamp the record with the current time.
        #[arg(long)]
        stamp: bool,

        /// Free-form context appended to the message.
        context: Vec<String>,
    },

    /// Evaluate a persisted failure record (JSON) and print the retry decision.
    Evaluate {
        /// Path to the JSON status record.
        path: PathBuf,

        /// Attempts already made for this failure.
        #[arg(long, default_value = "0", value_name = "N")]
        attempt: u32,

        /// Override the record's last update time (RFC 3339).
        #[arg(long, value_name = "TIME")]
        last_update: Option<DateTime<Utc>>,
    },
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let retry_cfg = cfg.retry_config();
        let policy = RetryPolicy::from_config(&retry_cfg);

        match cli.command {
            CliCommand::Backoff { attempts } => run_backoff(&policy, attempts),
            CliCommand::Classify {
                method,
                code,
                retryable,
                fail_fast,
                max_retries,
                cause,
                stamp,
                context,
            } => run_classify(ClassifyArgs {
                method,
                code,
                retryable,
                fail_fast,
                max_retries: max_retries.unwrap_or(if retryable {
                    retry_cfg.default_max_retries
                } else {
                    0
                }),
                cause,
                stamp,
                context,
            })?,
            CliCommand::Evaluate {
                path,
                attempt,
                last_update,
            } => run_evaluate(&policy, &path, attempt, last_update)?,
        }

        Ok(())
    }
}
