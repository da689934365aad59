//! Member agent process: a drone, or a handler that may also host its own
//! drone-facing endpoint.

use anyhow::Context;
use clap::{Parser, ValueEnum};

use roost_agent::MemberAgent;
use roost_manager::{MembershipRouter, RegistrationTier};
use roost_membership::{MemberRole, MembershipTable};
use roost_protocol::{MemberId, EVICTION_TIMEOUT_SECS, ROUTER_POLL_INTERVAL_MS};
use roost_transport::{RequestClient, RoutedListener};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Role {
    Drone,
    Handler,
}

impl From<Role> for MemberRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Drone => MemberRole::Drone,
            Role::Handler => MemberRole::Handler,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "roost-agent", about = "Roost member agent (drone or handler)")]
struct Cli {
    /// Manager tier endpoint to register with (host:port).
    #[arg(short = 'M', long)]
    manager: String,

    /// Member identity; generated when omitted.
    #[arg(short = 'I', long)]
    id: Option<String>,

    #[arg(long, value_enum, default_value = "drone")]
    role: Role,

    /// Handlers only: also host a drone-facing endpoint on this address.
    #[arg(long)]
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
    let id = cli.id.map(MemberId::new).unwrap_or_else(MemberId::random);

    if let Some(addr) = &cli.listen_drones {
        if cli.role != Role::Handler {
            anyhow::bail!("--listen-drones is only valid for --role handler");
        }
        let listener = RoutedListener::bind(addr)
            .await
            .with_context(|| format!("binding drone endpoint {addr}"))?;
        let router = MembershipRouter::new(
            MembershipTable::new(MemberRole::Drone),
            RegistrationTier::new("local-drones"),
            EVICTION_TIMEOUT_SECS,
            ROUTER_POLL_INTERVAL_MS,
        );
        tokio::spawn(router.run(listener));
    }

    let client = RequestClient::connect(&cli.manager, id.clone())
        .await
        .with_context(|| format!("connecting to manager {}", cli.manager))?;

    let mut agent = MemberAgent::new(id, cli.role.into(), client);
    agent.run().await.context("agent loop failed")?;
    tracing::info!(id = %agent.id(), "agent stopped");
    Ok(())
}
