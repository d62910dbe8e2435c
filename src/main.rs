//! charter-push CLI - run push setup sessions and inspect local state.
//!
//! This is the main binary entry point. See the `charter_push` library
//! for the core functionality.

use std::io::Read;

use anyhow::{Context, Result};
use charter_push::{commands, Config};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;

/// Global allocator configured per M-MIMALLOC-APPS guideline.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

// CLI
#[derive(Parser)]
#[command(name = "charter-push")]
#[command(version)]
#[command(about = "Push notification provisioning for Charter Search")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a push setup session: subscribe and register this device
    Register {
        /// Re-register even if the endpoint is cached
        #[arg(long)]
        force: bool,
        /// Simulate the user refusing the permission prompt
        #[arg(long)]
        deny: bool,
    },
    /// Render a push payload through a local notification agent
    Render {
        /// JSON payload, `-` for stdin; omit for a payload-less push
        payload: Option<String>,
        /// Also click the rendered notification
        #[arg(long)]
        click: bool,
    },
    /// Inspect or clear the registration cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// VAPID key utilities
    Vapid {
        #[command(subcommand)]
        action: VapidAction,
    },
    /// Print the effective configuration
    Config,
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached endpoints
    Show,
    /// Remove one endpoint so it registers again next session
    Forget {
        /// Subscription endpoint to drop
        endpoint: String,
    },
    /// Remove every cached endpoint
    Clear,
}

#[derive(Subcommand)]
enum VapidAction {
    /// Generate a new P-256 keypair
    Generate,
    /// Validate an application server key (defaults to the configured one)
    Check {
        /// Base64url public key
        key: Option<String>,
    },
}

fn init_logging() {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format_timestamp_secs();

    if let Ok(path) = std::env::var("CHARTER_PUSH_LOG_FILE") {
        match std::fs::File::create(&path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("Failed to create log file at {path}: {e}"),
        }
    }
    builder.init();
}

fn read_payload(arg: Option<String>) -> Result<Option<String>> {
    match arg.as_deref() {
        Some("-") => {
            let mut payload = String::new();
            std::io::stdin()
                .read_to_string(&mut payload)
                .context("Failed to read payload from stdin")?;
            Ok(Some(payload))
        }
        _ => Ok(arg),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Register { force, deny } => {
            commands::session::register(&config, force, deny).await?;
        }
        Commands::Render { payload, click } => {
            commands::notify::render(&config, read_payload(payload)?, click).await?;
        }
        Commands::Cache { action } => match action {
            CacheAction::Show => commands::cache::show(&config)?,
            CacheAction::Forget { endpoint } => {
                commands::cache::forget(&config, &endpoint)?;
            }
            CacheAction::Clear => commands::cache::clear(&config)?,
        },
        Commands::Vapid { action } => match action {
            VapidAction::Generate => {
                commands::vapid::generate()?;
            }
            VapidAction::Check { key } => {
                commands::vapid::check(key.as_deref().unwrap_or(&config.application_server_key))?;
            }
        },
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
