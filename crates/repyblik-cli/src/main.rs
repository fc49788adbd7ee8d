//! repyblik CLI
//!
//! Request a REPUBLIK session token by email and download newly published
//! articles as PDF documents.

mod commands;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use repyblik_core::Config;

#[derive(Parser)]
#[command(name = "repyblik")]
#[command(version, about = "Download new REPUBLIK articles as PDF")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// The email address you registered with the REPUBLIK (default: last used)
    #[arg(short = 'm', long, global = true, env = "REPYBLIK_EMAIL")]
    email: Option<String>,

    /// GraphQL API endpoint
    #[arg(long, global = true, env = "REPYBLIK_API_URL")]
    api_url: Option<String>,

    /// CDN serving the article PDFs
    #[arg(long, global = true, env = "REPYBLIK_CDN_URL")]
    cdn_url: Option<String>,

    /// More log output (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage authentication tokens
    #[command(subcommand)]
    Token(TokenCommands),

    /// List and download articles
    #[command(subcommand)]
    Articles(ArticleCommands),
}

#[derive(Subcommand)]
enum TokenCommands {
    /// Get a new token from the Republik API
    Request {
        /// Replace an existing token for this email address
        #[arg(long)]
        overwrite: bool,
    },

    /// Check that the stored token is still accepted
    Check,
}

#[derive(Subcommand)]
enum ArticleCommands {
    /// List the most recent articles
    List {
        /// Number of articles (default: fallback_count from the config)
        #[arg(short = 'n', long)]
        count: Option<u32>,
    },

    /// Download articles published since the last run
    Fetch {
        /// Download directory; its `.last` file records the sync checkpoint
        #[arg(short, long)]
        dir: PathBuf,

        /// Articles to fetch when the directory has no checkpoint yet
        #[arg(long)]
        fallback: Option<u32>,
    },
}

/// Initialize the tracing subscriber for logging.
/// The returned guard flushes the log file on drop and must be kept alive.
fn init_tracing(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let name = path
                .file_name()
                .context("--log-file must point to a file")?;
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.verbose, cli.log_file.as_deref())?;
    info!("repyblik starting");

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }
    if let Some(url) = cli.cdn_url {
        config.cdn_url = url;
    }

    let Some(email) = cli.email.or_else(|| config.last_email.clone()) else {
        Cli::command()
            .error(
                ErrorKind::MissingRequiredArgument,
                "no email address given: pass --email or set REPYBLIK_EMAIL",
            )
            .exit();
    };
    eprintln!("Using '{}' for this session...", email);

    match cli.command {
        Commands::Token(TokenCommands::Request { overwrite }) => {
            commands::token::request(&mut config, &email, overwrite).await
        }
        Commands::Token(TokenCommands::Check) => commands::token::check(&config, &email).await,
        Commands::Articles(ArticleCommands::List { count }) => {
            commands::articles::list(&config, &email, count).await
        }
        Commands::Articles(ArticleCommands::Fetch { dir, fallback }) => {
            commands::articles::fetch(&config, &email, &dir, fallback).await
        }
    }
}
