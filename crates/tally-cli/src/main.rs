mod config;
mod engine;
mod identity_cmd;
mod init_cmd;
mod log_cmd;
mod report_cmd;
mod sources_cmd;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use config::TallyConfig;
use report_cmd::ReportArgs;

#[derive(Parser)]
#[command(name = "tally", about = "Plan-aware timesheet reconciliation")]
struct Cli {
    /// Data directory (overrides discovery of the nearest .tally/)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the data directory and a starter config
    Init {
        /// Default identity to record in the config
        #[arg(long)]
        identity: Option<String>,
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Generate a reconciled timesheet
    Report {
        /// Identity context (overrides TALLY_IDENTITY and config)
        #[arg(long)]
        identity: Option<String>,
        /// Day to report on, YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<String>,
        /// First day of a multi-day report
        #[arg(long)]
        from: Option<String>,
        /// Last day of a multi-day report (inclusive)
        #[arg(long)]
        to: Option<String>,
        /// Audience to render for (repeatable; defaults from config)
        #[arg(long = "audience")]
        audiences: Vec<String>,
        /// Produce a report even when every plan source failed
        #[arg(long)]
        allow_empty_plan: bool,
        /// Write reports into this directory instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List registered plan sources and audiences
    Sources,
    /// Work log management
    Log {
        #[command(subcommand)]
        command: LogCommands,
    },
    /// Identity management
    Identity {
        #[command(subcommand)]
        command: IdentityCommands,
    },
}

#[derive(Subcommand)]
pub enum LogCommands {
    /// Append an entry to the work log
    Add {
        /// Day of the entry, YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<String>,
        /// Start time, HH:MM (UTC)
        #[arg(long)]
        start: String,
        /// End time, HH:MM (UTC); at or before start means the next day
        #[arg(long)]
        end: String,
        /// Tag for the entry (repeatable)
        #[arg(long)]
        tag: Vec<String>,
        /// What was done
        description: String,
    },
    /// Show the log for one day
    List {
        /// Day to show, YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum IdentityCommands {
    /// Create an identity file
    Create {
        /// Context name (also the file stem under identities/)
        name: String,
        /// Human-readable name used in reports
        #[arg(long)]
        display_name: String,
        /// Attribute as key=value (repeatable)
        #[arg(long)]
        attr: Vec<String>,
    },
    /// List stored identities
    List,
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

    match cli.command {
        Commands::Init { identity, force } => {
            init_cmd::run_init(cli.dir.as_deref(), identity, force)?;
        }
        Commands::Report {
            identity,
            date,
            from,
            to,
            audiences,
            allow_empty_plan,
            output,
        } => {
            let layout = config::locate_layout(cli.dir.as_deref())?;
            let resolved = TallyConfig::resolve(&layout, identity, audiences)?;
            let engine = engine::build(&layout, &resolved)?;
            let result = report_cmd::run_report(
                &engine,
                &resolved,
                ReportArgs {
                    date,
                    from,
                    to,
                    allow_empty_plan,
                    output,
                },
            )
            .await;
            engine.plugins.shutdown();
            result?;
        }
        Commands::Sources => {
            let layout = config::locate_layout(cli.dir.as_deref())?;
            let resolved = TallyConfig::resolve(&layout, None, vec![])?;
            let engine = engine::build(&layout, &resolved)?;
            let result = sources_cmd::run_sources(&engine.plugins);
            engine.plugins.shutdown();
            result?;
        }
        Commands::Log { command } => {
            let layout = config::locate_layout(cli.dir.as_deref())?;
            let store = tally_store::FileLogStore::new(layout);
            log_cmd::run_log_command(command, &store)?;
        }
        Commands::Identity { command } => {
            let layout = config::locate_layout(cli.dir.as_deref())?;
            let store = tally_store::FileIdentityStore::new(layout);
            identity_cmd::run_identity_command(command, &store)?;
        }
    }

    Ok(())
}
