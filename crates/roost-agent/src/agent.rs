//! The member-side state machine.

use std::time::Duration;

use roost_membership::MemberRole;
use roost_protocol::{
    MemberId, Reply, Request, PING_INTERVAL_SECS, REPLY_WAIT_TIMEOUT_SECS,
};
use roost_transport::{RequestClient, TransportError};

/// Where the agent is in its lifecycle. `Terminated` is reached on a
/// `none_avail` reply (drones) or an unrecoverable transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentPhase {
    Unregistered,
    AwaitingRegisterReply,
    Registered,
    Terminated,
}

/// The agent's view of its manager connection. `RequestClient` is the real
/// one; tests script replies through this seam.
pub trait ManagerLink: Send {
    fn send_request(
        &mut self,
        request: &Request,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;

    /// Bounded wait for the next reply; `Ok(None)` on timeout.
    fn recv_reply(
        &mut self,
        timeout: Duration,
    ) -> impl std::future::Future<Output = Result<Option<Reply>, TransportError>> + Send;
}

impl ManagerLink for RequestClient {
    async fn send_request(&mut self, request: &Request) -> Result<(), TransportError> {
        self.send(request).await
    }

    async fn recv_reply(&mut self, timeout: Duration) -> Result<Option<Reply>, TransportError> {
        match self.recv(timeout).await? {
            None => Ok(None),
            Some(value) => Reply::from_value(value)
                .map(Some)
                .map_err(|e| TransportError::Frame(format!("reply not understood: {e}"))),
        }
    }
}

pub struct MemberAgent<L: ManagerLink> {
    id: MemberId,
    role: MemberRole,
    link: L,
    phase: AgentPhase,
    assigned_handler: Option<MemberId>,
    reply_timeout: Duration,
    ping_interval: Duration,
}

impl<L: ManagerLink> MemberAgent<L> {
    pub fn new(id: MemberId, role: MemberRole, link: L) -> Self {
        Self {
            id,
            role,
            link,
            phase: AgentPhase::Unregistered,
            assigned_handler: None,
            reply_timeout: Duration::from_secs(REPLY_WAIT_TIMEOUT_SECS),
            ping_interval: Duration::from_secs(PING_INTERVAL_SECS),
        }
    }

    /// Override the protocol cadence. The ping interval must stay well under
    /// the manager's eviction timeout.
    pub fn with_intervals(mut self, reply_timeout: Duration, ping_interval: Duration) -> Self {
        self.reply_timeout = reply_timeout;
        self.ping_interval = ping_interval;
        self
    }

    pub fn id(&self) -> &MemberId {
        &self.id
    }

    pub fn phase(&self) -> AgentPhase {
        self.phase
    }

    pub fn assigned_handler(&self) -> Option<&MemberId> {
        self.assigned_handler.as_ref()
    }

    /// Send the one registration message, then wait for the verdict. A wait
    /// timeout is not fatal and never triggers a second register: the agent
    /// just keeps waiting.
    pub async fn register(&mut self) -> Result<(), TransportError> {
        self.link
            .send_request(&Request::Register { id: self.id.clone() })
            .await?;
        self.phase = AgentPhase::AwaitingRegisterReply;
        while self.phase == AgentPhase::AwaitingRegisterReply {
            match self.link.recv_reply(self.reply_timeout).await? {
                None => {
                    tracing::debug!(id = %self.id, "no register reply yet, still waiting");
                }
                Some(reply) => self.on_register_reply(reply),
            }
        }
        Ok(())
    }

    fn on_register_reply(&mut self, reply: Reply) {
        match reply {
            Reply::NoneAvail if self.role == MemberRole::Drone => {
                tracing::info!(id = %self.id, "no handlers available, disconnecting");
                self.phase = AgentPhase::Terminated;
            }
            Reply::Assigned { handler } => {
                tracing::info!(id = %self.id, handler = %handler, "registered, handler assigned");
                self.assigned_handler = Some(handler);
                self.phase = AgentPhase::Registered;
            }
            reply => {
                tracing::info!(id = %self.id, reply = ?reply, "registered with manager");
                self.phase = AgentPhase::Registered;
            }
        }
    }

    /// One heartbeat: ping, then a bounded wait for the pong. A missed pong
    /// is tolerated; the next ping doubles as the retry.
    pub async fn heartbeat_cycle(&mut self) -> Result<(), TransportError> {
        self.link
            .send_request(&Request::Ping { id: self.id.clone() })
            .await?;
        match self.link.recv_reply(self.reply_timeout).await? {
            None => {
                tracing::debug!(id = %self.id, "no pong within the wait window");
            }
            Some(Reply::Pong) => {
                tracing::debug!(id = %self.id, "pong received");
            }
            Some(reply) if reply.is_terminal() && self.role == MemberRole::Drone => {
                tracing::info!(id = %self.id, "manager revoked capacity, disconnecting");
                self.phase = AgentPhase::Terminated;
            }
            Some(reply) => {
                tracing::debug!(id = %self.id, reply = ?reply, "unexpected reply to ping");
            }
        }
        Ok(())
    }

    /// Register, then heartbeat until terminated. Returns `Ok` on a clean
    /// protocol shutdown; transport failures bubble up.
    pub async fn run(&mut self) -> Result<(), TransportError> {
        self.register().await?;
        let mut ticker = tokio::time::interval(self.ping_interval);
        while self.phase == AgentPhase::Registered {
            ticker.tick().await;
            self.heartbeat_cycle().await?;
        }
        Ok(())
    }
}
