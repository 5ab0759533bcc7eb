mod actuator;
mod agent;
mod command;
mod config;
mod connection;
mod network;
mod transport;

use actuator::LoggingActuator;
use agent::Agent;
use anyhow::Result;
use config::AgentConfig;
use network::RouteAssociator;
use std::future::Future;
use std::io;
use std::path::Path;
use std::time::Instant;
use transport::WebSocketTransport;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Boot-time configuration file, read from the working directory
const CONFIG_PATH: &str = "rover-agent.toml";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = AgentConfig::load(Path::new(CONFIG_PATH))?;

    info!("Rover agent starting");
    info!("  Controller: {}", config.endpoint);
    info!("  Keepalive: {}ms", config.keepalive_interval_ms);
    if let Some(device_id) = &config.device_id {
        info!("  Device ID: {}", device_id);
    }

    let mut associator = RouteAssociator::for_endpoint(&config.endpoint)?;
    info!("  Route target: {}", associator.target());
    let transport = WebSocketTransport::new(config.connect_timeout());
    let mut agent = Agent::new(config, transport, LoggingActuator, Instant::now());

    tokio::select! {
        () = agent.run(&mut associator) => {}
        () = wait_for_shutdown(tokio::signal::ctrl_c()) => {
            info!("Shutdown requested");
        }
    }

    agent.shutdown();
    Ok(())
}

/// Resolve once `signal` reports a shutdown request
///
/// A signal listener that fails to install never resolves, so the agent keeps
/// running instead of exiting.
async fn wait_for_shutdown<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = signal.await {
        error!("Failed to listen for shutdown signal, running until power-off: {}", e);
        std::future::pending::<()>().await;
    }
}
