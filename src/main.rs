use clap::{Parser, Subcommand};
use floe::aws::client::CREDENTIAL_EXIT_CODE;
use floe::cli::run::{RunError, RunOverrides};
use floe::engine::EngineError;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "floe")]
#[command(about = "Incremental AWS VPC Flow Log collector", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one collection pass (default).
    Run {
        /// Re-read objects already marked processed.
        #[arg(long)]
        reparse: bool,

        /// Scan-window lower bound, YYYYMMDD.
        #[arg(long)]
        only_logs_after: Option<String>,

        /// Restrict to these account ids (repeatable).
        #[arg(long = "account")]
        accounts: Vec<String>,

        /// Restrict to these regions (repeatable).
        #[arg(long = "region")]
        regions: Vec<String>,
    },
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a starter config file.
    Init {
        #[arg(long)]
        stdout: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "floe=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config_path = resolve_config_path(cli.config);

    match cli.command {
        Some(Commands::Run {
            reparse,
            only_logs_after,
            accounts,
            regions,
        }) => {
            let overrides = RunOverrides {
                reparse,
                only_logs_after,
                accounts,
                regions,
            };
            run_and_exit_on_bad_credentials(config_path, overrides).await?;
        }
        None => {
            run_and_exit_on_bad_credentials(config_path, RunOverrides::default()).await?;
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init { stdout } => {
                floe::cli::config::init(stdout)?;
            }
        },
    }

    Ok(())
}

/// The engine is exit-free; the credential hard-fail contract lives here.
async fn run_and_exit_on_bad_credentials(
    config_path: Option<PathBuf>,
    overrides: RunOverrides,
) -> Result<(), Box<dyn std::error::Error>> {
    match floe::cli::run::run(config_path, overrides).await {
        Ok(()) => Ok(()),
        Err(RunError::Engine(EngineError::Credentials(msg))) => {
            tracing::error!("invalid AWS credentials: {}", msg);
            std::process::exit(CREDENTIAL_EXIT_CODE);
        }
        Err(e) => Err(e.into()),
    }
}

fn resolve_config_path(explicit_path: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path);
    }

    if let Some(home_dir) = dirs::home_dir() {
        let user_config = home_dir.join(".config/floe/config.yml");
        if user_config.exists() {
            return Some(user_config);
        }
    }

    let system_config = PathBuf::from("/etc/floe/config.yml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}
