//! Parameter store server

use anyhow::{Context, Result};
use colored::Colorize;
use fastosc_router::{Dispatcher, OscRouter};
use fastosc_transport::UdpServer;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

use crate::config::Config;
use crate::params::ParamStore;

/// Dispatcher with the parameter store routed under the configured namespace
pub fn build(config: &Config) -> Result<(Arc<Dispatcher>, Arc<ParamStore>, OscRouter)> {
    let dispatcher = Arc::new(Dispatcher::new(config.dispatcher.clone()));
    let store = ParamStore::new(config.params.clone());
    let router = OscRouter::for_service(Arc::clone(&dispatcher), &config.router.namespace, Arc::clone(&store))
        .context("Failed to register routes")?;
    Ok((dispatcher, store, router))
}

/// Serve until shutdown is signalled
pub async fn run_server(
    config: Config,
    pull_interval: Option<Duration>,
    shutdown_rx: &mut mpsc::Receiver<()>,
) -> Result<()> {
    let (dispatcher, store, router) = build(&config)?;

    let server = Arc::new(
        UdpServer::bind_with_config(config.server.clone())
            .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?,
    );
    dispatcher.set_sender(server.clone());

    println!(
        "{} Serving {} parameters on {} ({} routes)",
        "FastOSC".cyan().bold(),
        store.names().len(),
        server.local_addr()?.to_string().green(),
        router.addresses().len()
    );

    match pull_interval {
        Some(interval) => {
            println!("{} Pumping every {:?}", "OK".green().bold(), interval);
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        server.process(&*dispatcher);
                    }
                    Some(()) = shutdown_rx.recv() => break,
                }
            }
        }
        None => {
            println!("{} Waiting for datagrams", "OK".green().bold());
            tokio::select! {
                result = server.serve(&*dispatcher) => result?,
                Some(()) = shutdown_rx.recv() => server.shutdown(),
            }
        }
    }

    let cleared = router.clear_listeners();
    info!("Server stopped, {} listeners cleared", cleared);
    println!("{}", "Server stopped".yellow());
    Ok(())
}

/// Print the routes `serve` would register
pub fn print_routes(config: Config, json: bool) -> Result<()> {
    let (dispatcher, _store, _router) = build(&config)?;

    if json {
        println!("{}", dispatcher.descriptions_json()?);
        return Ok(());
    }

    for description in dispatcher.descriptions() {
        let params = description
            .params
            .iter()
            .map(|p| format!("{}:{}", p.name, p.kind))
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "{:<45}[{}] -> [{}]",
            description.address.yellow(),
            params,
            description.result_type
        );
    }
    Ok(())
}
