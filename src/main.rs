use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sharedbucket::config::SharedBucketConfig;
use sharedbucket::ratelimit::{CancelToken, RateLimiter, RedisBucketStore, SystemClock};
use sharedbucket::SharedBucketError;

/// Exit code for an acquire interrupted by a signal.
const EXIT_CANCELLED: u8 = 130;

#[derive(Debug, Parser)]
#[command(name = "sharedbucket", version, about = "Distributed token bucket rate limiter")]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `info` or `sharedbucket=debug`
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Take permits if available, without waiting
    Try {
        #[arg(short, long, default_value_t = 1)]
        permits: u64,
    },
    /// Wait until permits are taken; Ctrl+C cancels
    Acquire {
        #[arg(short, long, default_value_t = 1)]
        permits: u64,
    },
    /// Print the persisted bucket state as JSON
    Inspect,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_writer(std::io::stderr);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let config = SharedBucketConfig::load(cli.config.as_deref())?;
    let key = config.limiter.key()?;
    info!(key = %key, "Configuration loaded");

    let store = RedisBucketStore::connect(&config.redis.url).await?;
    let limiter = RateLimiter::with_key(
        config.limiter.to_rate_limiter_config()?,
        key,
        store,
        Arc::new(SystemClock),
    );

    match cli.command {
        Command::Try { permits } => {
            if limiter.try_acquire(permits).await? {
                println!("admitted");
                Ok(ExitCode::SUCCESS)
            } else {
                println!("denied");
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Acquire { permits } => {
            let cancel = CancelToken::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                shutdown_signal().await;
                trigger.cancel();
            });

            match limiter.acquire_with_cancel(permits, &cancel).await {
                Ok(()) => {
                    println!("admitted");
                    Ok(ExitCode::SUCCESS)
                }
                Err(SharedBucketError::Cancelled) => {
                    warn!("Acquire cancelled before permits were granted");
                    Ok(ExitCode::from(EXIT_CANCELLED))
                }
                Err(e) => Err(e.into()),
            }
        }
        Command::Inspect => {
            let state = limiter.store().peek(&limiter.key().to_store_key()).await?;
            println!("{}", serde_json::to_string_pretty(&state)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, cancelling");
        }
        _ = terminate => {
            info!("Received SIGTERM, cancelling");
        }
    }
}
