//! FastOSC CLI - serve a parameter store over UDP and talk to FastOSC servers

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod params;
mod send;
mod server;
mod values;

use config::Config;

/// FastOSC - address-routed control messages over UDP
#[derive(Parser)]
#[command(name = "fastosc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "FASTOSC_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the parameter store
    Serve {
        /// Bind address
        #[arg(short, long)]
        bind: Option<String>,

        /// Port number
        #[arg(short = 'P', long)]
        port: Option<u16>,

        /// Base address prepended to every route
        #[arg(long)]
        base: Option<String>,

        /// Router namespace
        #[arg(short, long)]
        namespace: Option<String>,

        /// Pump the socket on a fixed interval instead of waiting for datagrams
        #[arg(long)]
        pull_interval_ms: Option<u64>,
    },

    /// Send one message and print the replies
    Send {
        /// Server address
        #[arg(short, long, default_value = "127.0.0.1:11000")]
        target: String,

        /// Message address
        address: String,

        /// Arguments (int, float, true, false, nil, or text; prefix with s: to force text)
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,

        /// How long to wait for replies
        #[arg(short = 'w', long, default_value = "1000")]
        wait_ms: u64,
    },

    /// List the routes the server would register
    Routes {
        /// Base address
        #[arg(long)]
        base: Option<String>,

        /// Router namespace
        #[arg(short, long)]
        namespace: Option<String>,

        /// Print descriptions as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli.log_level, cli.json_logs)?;

    // Handle Ctrl+C
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl+c: {}", e);
            return;
        }
        info!("Received shutdown signal");
        let _ = shutdown_tx.send(()).await;
    });

    match cli.command {
        Commands::Serve {
            bind,
            port,
            base,
            namespace,
            pull_interval_ms,
        } => {
            let config = Config::load(cli.config.as_deref())?.with_overrides(bind, port, base, namespace);
            let pull_interval = pull_interval_ms.map(Duration::from_millis);
            server::run_server(config, pull_interval, &mut shutdown_rx).await?;
        }

        Commands::Send {
            target,
            address,
            args,
            wait_ms,
        } => {
            let args = values::parse_args(&args);
            send::send_message(&target, &address, args, Duration::from_millis(wait_ms)).await?;
        }

        Commands::Routes {
            base,
            namespace,
            json,
        } => {
            let config = Config::load(cli.config.as_deref())?.with_overrides(None, None, base, namespace);
            server::print_routes(config, json)?;
        }
    }

    Ok(())
}

fn setup_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Failed to parse log level")?;

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).compact())
            .init();
    }

    Ok(())
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
    fn test_send_args() {
        let cli = Cli::try_parse_from(["fastosc", "send", "/set/param", "volume", "0.5"]).unwrap();
        match cli.command {
            Commands::Send { address, args, target, .. } => {
                assert_eq!(address, "/set/param");
                assert_eq!(args, vec!["volume", "0.5"]);
                assert_eq!(target, "127.0.0.1:11000");
            }
            _ => panic!("expected send"),
        }
    }
}
