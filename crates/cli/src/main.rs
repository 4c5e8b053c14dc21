//! swarmstart - tracker reannounce recovery for remote torrent daemons.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use swarmstart_core::{
    load_config, Config, DelugeClient, DelugeConfig, QBittorrentClient, QBittorrentConfig,
    ReannounceController, ReannounceOutcome, StatusReporter, TorrentClient,
};

/// Config file consulted when --config is not given.
const DEFAULT_CONFIG_PATH: &str = "swarmstart.toml";

#[derive(Parser)]
#[command(name = "swarmstart", version)]
#[command(about = "Tracker reannounce recovery for remote torrent daemons")]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (repeatable)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Operate a qBittorrent daemon
    #[command(alias = "q")]
    Qbit {
        #[command(subcommand)]
        command: BackendCommands,
    },
    /// Operate a Deluge daemon
    #[command(alias = "d")]
    Deluge {
        #[command(subcommand)]
        command: BackendCommands,
    },
}

#[derive(Subcommand)]
enum BackendCommands {
    /// Reannounce a torrent until a tracker confirms it working
    #[command(aliases = ["re", "faststart"])]
    Reannounce(ReannounceArgs),
}

#[derive(Args)]
struct ReannounceArgs {
    /// Torrent info-hash
    hash: String,

    /// Number of reannounce attempts
    #[arg(short = 'a', long)]
    attempts: Option<u32>,

    /// Seconds between reannounce attempts
    #[arg(short = 'i', long)]
    interval: Option<u64>,

    /// Number of extra reannounce attempts after success
    #[arg(short = 'A', long)]
    extra_attempts: Option<u32>,

    /// Seconds between extra reannounce attempts
    #[arg(short = 'I', long)]
    extra_interval: Option<u64>,

    /// Maximum age of the torrent in seconds
    #[arg(short = 'm', long)]
    max_age: Option<u64>,

    /// Daemon URL override
    #[arg(long)]
    url: Option<String>,

    /// Daemon username override (qBittorrent only)
    #[arg(long)]
    username: Option<String>,

    /// Daemon password override
    #[arg(long)]
    password: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 | 1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Qbit {
            command: BackendCommands::Reannounce(args),
        } => {
            let backend = qbit_config(&config, &args)?;
            info!("Connecting to {} as user {}", backend.url, backend.username);
            let client = QBittorrentClient::new(backend);
            reannounce(&client, &args, &config, cli.verbose).await
        }
        Commands::Deluge {
            command: BackendCommands::Reannounce(args),
        } => {
            let backend = deluge_config(&config, &args)?;
            info!("Connecting to {}", backend.url);
            let client = DelugeClient::new(backend);
            reannounce(&client, &args, &config, cli.verbose).await
        }
    }
}

/// Load the named config file, or the default one, or built-in defaults
/// when neither exists.
fn resolve_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.exists() {
                load_config(default)
                    .with_context(|| format!("Failed to load config from {}", default.display()))
            } else {
                Ok(Config::default())
            }
        }
    }
}

fn qbit_config(config: &Config, args: &ReannounceArgs) -> Result<QBittorrentConfig> {
    let mut backend = match (&config.qbittorrent, &args.url) {
        (Some(backend), _) => backend.clone(),
        (None, Some(url)) => QBittorrentConfig {
            url: url.clone(),
            username: String::new(),
            password: String::new(),
            timeout_secs: 30,
        },
        (None, None) => {
            bail!("No [qbittorrent] section in config and no --url given")
        }
    };
    if let Some(url) = &args.url {
        backend.url = url.clone();
    }
    if let Some(username) = &args.username {
        backend.username = username.clone();
    }
    if let Some(password) = &args.password {
        backend.password = password.clone();
    }
    Ok(backend)
}

fn deluge_config(config: &Config, args: &ReannounceArgs) -> Result<DelugeConfig> {
    let mut backend = match (&config.deluge, &args.url) {
        (Some(backend), _) => backend.clone(),
        (None, Some(url)) => DelugeConfig {
            url: url.clone(),
            password: String::new(),
            timeout_secs: 30,
        },
        (None, None) => bail!("No [deluge] section in config and no --url given"),
    };
    if let Some(url) = &args.url {
        backend.url = url.clone();
    }
    if let Some(password) = &args.password {
        backend.password = password.clone();
    }
    Ok(backend)
}

async fn reannounce(
    client: &dyn TorrentClient,
    args: &ReannounceArgs,
    config: &Config,
    verbose: u8,
) -> Result<ExitCode> {
    let mut options = config.reannounce.clone();
    if let Some(v) = args.attempts {
        options.attempts = v;
    }
    if let Some(v) = args.interval {
        options.interval_secs = v;
    }
    if let Some(v) = args.extra_attempts {
        options.extra_attempts = v;
    }
    if let Some(v) = args.extra_interval {
        options.extra_interval_secs = v;
    }
    if let Some(v) = args.max_age {
        options.max_age_secs = v;
    }

    let controller = ReannounceController::new(options, StatusReporter::new(verbose));

    // Ctrl-C / SIGTERM unwind the controller instead of killing it mid-call.
    let shutdown = controller.shutdown_handle();
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown.send(());
    });

    let outcome = controller.run(client, &args.hash).await;

    match &outcome {
        ReannounceOutcome::Healthy { seeds } => {
            info!("{}: torrent is healthy with {} seeds", args.hash, seeds);
        }
        ReannounceOutcome::Exhausted => {
            info!("{}: reannounce attempts exhausted", args.hash);
        }
        ReannounceOutcome::Ineligible {
            age_secs,
            max_age_secs,
        } => {
            eprintln!(
                "{}: torrent is {}s old, max age is {}s",
                args.hash, age_secs, max_age_secs
            );
        }
        ReannounceOutcome::TransportError(e) => {
            eprintln!("{}: {}", args.hash, e);
        }
    }

    Ok(ExitCode::from(outcome.exit_code() as u8))
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_reannounce_with_overrides() {
        let cli = Cli::parse_from([
            "swarmstart",
            "qbit",
            "reannounce",
            "abc123",
            "-a",
            "10",
            "--max-age",
            "600",
        ]);

        match cli.command {
            Commands::Qbit {
                command: BackendCommands::Reannounce(args),
            } => {
                assert_eq!(args.hash, "abc123");
                assert_eq!(args.attempts, Some(10));
                assert_eq!(args.max_age, Some(600));
                assert_eq!(args.interval, None);
            }
            _ => panic!("expected qbit reannounce"),
        }
    }

    #[test]
    fn test_backend_config_requires_url_or_section() {
        let config = Config::default();
        let args = Cli::parse_from(["swarmstart", "deluge", "re", "abc123"]);
        let Commands::Deluge {
            command: BackendCommands::Reannounce(args),
        } = args.command
        else {
            panic!("expected deluge reannounce");
        };

        assert!(deluge_config(&config, &args).is_err());
    }
}
