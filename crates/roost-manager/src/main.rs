//! Manager daemon: hosts the handler-facing and drone-facing tier routers.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Parser;

use roost_manager::{DroneTier, HandlerTier, ManagerConfig, MembershipRouter};
use roost_membership::{HandlerPool, MemberRole, MembershipTable};
use roost_transport::RoutedListener;

#[derive(Debug, Parser)]
#[command(name = "roost-manager", about = "Roost drone manager service")]
struct Cli {
    /// TOML configuration file; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bind address for the handler tier (host:port).
    #[arg(short = 'H', long)]
    listen_handlers: Option<String>,

    /// Bind address for the drone tier (host:port).
    #[arg(short = 'D', long)]
    listen_drones: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => ManagerConfig::load(path)?,
        None => ManagerConfig::default(),
    };
    if let Some(addr) = cli.listen_handlers {
        config.listen_handlers = addr;
    }
    if let Some(addr) = cli.listen_drones {
        config.listen_drones = addr;
    }

    let handler_listener = RoutedListener::bind(&config.listen_handlers)
        .await
        .with_context(|| format!("binding handler endpoint {}", config.listen_handlers))?;
    let drone_listener = RoutedListener::bind(&config.listen_drones)
        .await
        .with_context(|| format!("binding drone endpoint {}", config.listen_drones))?;

    let pool = Arc::new(Mutex::new(HandlerPool::new()));

    let handler_router = MembershipRouter::new(
        MembershipTable::new(MemberRole::Handler),
        HandlerTier::new(pool.clone()),
        config.eviction_timeout_secs,
        config.poll_interval_ms,
    );
    let drone_router = MembershipRouter::new(
        MembershipTable::new(MemberRole::Drone),
        DroneTier::new(pool),
        config.eviction_timeout_secs,
        config.poll_interval_ms,
    );

    let handlers = tokio::spawn(handler_router.run(handler_listener));
    let drones = tokio::spawn(drone_router.run(drone_listener));
    tokio::try_join!(handlers, drones).context("tier router task failed")?;
    Ok(())
}
