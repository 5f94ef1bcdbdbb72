//! Incognibro - privacy dashboard for tracker scans and block lists.
//!
//! The binary either runs the settings server (`incognibro serve`) or acts as
//! a client of it. With `--local` the client side talks to the local database
//! directly.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use incognibro_app::client::{HttpSettingsClient, DEFAULT_SERVER_URL};
use incognibro_app::commands::{Command, Session};
use incognibro_server::{Server, ServerConfig};
use incognibro_storage::{Database, LocalSettingsService};

/// Incognibro - scan domains for trackers and manage your block list
#[derive(Parser, Debug)]
#[command(name = "incognibro", version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Settings server URL
    #[arg(long, global = true, default_value = DEFAULT_SERVER_URL)]
    server: String,

    /// Principal whose settings to use (default: $INCOGNIBRO_PRINCIPAL or the OS user)
    #[arg(long, global = true)]
    principal: Option<String>,

    /// Use the local database instead of the settings server
    #[arg(long, global = true)]
    local: bool,

    /// Database path (default: the app data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

/// Get the logs directory path.
fn logs_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "incognibro", "incognibro").map(|dirs| dirs.data_dir().join("logs"))
}

/// Initialize logging: console always, plus a daily-rotated file when the
/// data directory is writable.
fn init_logging(args: &Args) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_level = if args.debug { "debug" } else { &args.log_level };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "incognibro={level},incognibro_app={level},incognibro_core={level},\
             incognibro_storage={level},incognibro_server={level},warn",
            level = log_level
        ))
    });

    if let Some(log_dir) = logs_dir() {
        if std::fs::create_dir_all(&log_dir).is_ok() {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(5)
                .filename_prefix("incognibro")
                .filename_suffix("log")
                .build(&log_dir)
                .ok();

            if let Some(appender) = file_appender {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);

                // Console output goes to stderr; stdout is for command output.
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().with_writer(std::io::stderr))
                    .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                    .init();

                tracing::debug!("Logging to {:?}", log_dir);
                return Some(guard);
            }
        }
    }

    // Fallback: console logging only
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("File logging unavailable, using console only");
    None
}

/// Principal from the flag, the environment, or the OS user.
fn resolve_principal(args: &Args) -> Option<String> {
    args.principal
        .clone()
        .or_else(|| std::env::var("INCOGNIBRO_PRINCIPAL").ok())
        .or_else(|| std::env::var("USER").ok())
        .or_else(|| std::env::var("USERNAME").ok())
        .filter(|p| !p.trim().is_empty())
}

fn open_database(args: &Args) -> Result<Database> {
    let db = match &args.db {
        Some(path) => Database::with_path(path),
        None => Database::new(),
    };
    db.context("Failed to open database")
}

async fn serve(args: &Args, host: String, port: u16) -> Result<()> {
    let db_path = match &args.db {
        Some(path) => path.clone(),
        None => Database::default_db_path()?,
    };

    let config = ServerConfig::with_db_path(db_path.to_string_lossy())
        .with_host(host)
        .with_port(port);

    let server = Server::new(config).await?;
    println!("Settings server listening on http://{}", server.addr());
    server.run().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging(&args);

    tracing::debug!("Incognibro v{} starting", env!("CARGO_PKG_VERSION"));

    if let Command::Serve { host, port } = &args.command {
        return serve(&args, host.clone(), *port).await;
    }

    let principal = resolve_principal(&args)
        .context("No principal given; pass --principal or set INCOGNIBRO_PRINCIPAL")?;
    let activity = open_database(&args)?;

    let session = if args.local {
        tracing::debug!(principal = %principal, "Using local settings");
        let service = LocalSettingsService::new(activity.clone(), principal);
        Session::new(Arc::new(service), activity)
    } else {
        tracing::debug!(principal = %principal, server = %args.server, "Using settings server");
        let client = HttpSettingsClient::new(args.server.clone(), principal)?;
        Session::new(Arc::new(client), activity)
    };

    session.run(args.command.clone()).await
}
