//! # ns-cli
//!
//! Command-line interface for notion-sync.
//!
//! Projects GitHub webhook events into Notion databases, one record per
//! source entity:
//! - `notion-sync sync` — classify a payload and upsert every event
//! - `notion-sync cache show` — print the source → Notion page mapping

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Sync GitHub events into Notion, idempotently.
#[derive(Parser)]
#[command(name = "notion-sync", version, about)]
struct Cli {
    /// Log verbosity. `RUST_LOG` takes precedence when set.
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Log line format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dispatch one payload of events.
    Sync(commands::sync::SyncArgs),
    /// Inspect the identity cache.
    Cache {
        #[command(subcommand)]
        command: commands::cache::CacheCommands,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(level: LogLevel, format: LogFormat) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(level).into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level, cli.log_format);

    match &cli.command {
        Commands::Sync(args) => commands::sync::execute(args),
        Commands::Cache { command } => commands::cache::execute(command),
    }
}
