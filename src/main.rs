//! # Forms LTS CLI (`lts`)
//!
//! ## Usage
//!
//! ```bash
//! lts --config ./config/lts.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lts init` | Create both databases and run schema migrations |
//! | `lts copy` | Copy one batch into the archive |
//! | `lts run` | Copy batches until the backlog is drained |
//! | `lts status` | Show the watermark, backlog and archive size |
//! | `lts list` | List archived submissions |
//! | `lts get <id>` | Show an archived submission |
//! | `lts notes <id>` | Show the notes of an archived submission |
//!
//! Logs go to stderr; set `RUST_LOG=debug` for one line per record.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use forms_lts::{config, copy_cmd, get, list, migrate, status};

/// Forms LTS: copy form submissions into long term storage with personal
/// data redacted.
#[derive(Parser)]
#[command(
    name = "lts",
    about = "Copy form submissions into long term storage with personal data redacted",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/lts.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the primary and archive schemas.
    ///
    /// Idempotent. This is the only command that creates the archive
    /// database; the others fail when it is missing.
    Init,

    /// Copy one batch of changed submissions.
    ///
    /// Prints the offset to pass next while the backlog is not drained.
    Copy {
        /// Records in this batch (default: `copy.batch_size`). Negative
        /// copies the whole backlog.
        #[arg(long, allow_negative_numbers = true)]
        limit: Option<i64>,

        /// Skip this many candidates of the current run.
        #[arg(long, default_value_t = 0)]
        offset: i64,

        /// Show what would be copied and redacted without writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Copy batches until the backlog is drained.
    Run {
        /// Records per batch (default: `copy.batch_size`). Negative
        /// copies the whole backlog in one batch.
        #[arg(long, allow_negative_numbers = true)]
        limit: Option<i64>,

        /// Stop after this many batches (default: `copy.max_batches`).
        #[arg(long)]
        max_batches: Option<usize>,
    },

    /// Show the copy pipeline's state.
    Status,

    /// List archived submissions.
    List {
        #[arg(long, default_value_t = 50)]
        limit: i64,

        #[arg(long, default_value_t = 0)]
        offset: i64,
    },

    /// Show one submission.
    Get {
        /// Submission id.
        id: i64,

        /// Read from the primary database instead of the archive.
        #[arg(long)]
        source: bool,

        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the notes of an archived submission.
    Notes {
        /// Submission id.
        id: i64,
    },

    /// Print a shell completion script.
    Completions {
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // No config needed
    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "lts", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Databases initialized successfully.");
        }
        Commands::Copy {
            limit,
            offset,
            dry_run,
        } => {
            copy_cmd::run_copy(&cfg, limit, offset, dry_run).await?;
        }
        Commands::Run { limit, max_batches } => {
            copy_cmd::run_drain(&cfg, limit, max_batches).await?;
        }
        Commands::Status => {
            status::run_status(&cfg).await?;
        }
        Commands::List { limit, offset } => {
            list::run_list(&cfg, limit, offset).await?;
        }
        Commands::Get { id, source, json } => {
            get::run_get(&cfg, id, source, json).await?;
        }
        Commands::Notes { id } => {
            get::run_notes(&cfg, id).await?;
        }
        Commands::Completions { .. } => unreachable!(),
    }

    Ok(())
}
