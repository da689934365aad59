//! Routed-socket listener: the manager side of a tier endpoint.
//!
//! Each accepted connection gets a reader task and a writer task. The first
//! envelope on a connection binds its `from` identity to that connection's
//! outbound queue, which is what makes asynchronous, out-of-order replies to
//! any previously seen identity possible. A new connection claiming a live
//! identity takes the route over; the stale connection keeps draining but
//! can no longer be replied to.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use roost_protocol::MemberId;

use crate::framing::{read_frame, write_frame, Envelope};
use crate::TransportError;

/// Inbound queue depth per listener. Senders block (briefly) when the
/// router falls this far behind.
const INBOUND_QUEUE: usize = 1024;

type Routes = Arc<Mutex<HashMap<MemberId, mpsc::UnboundedSender<Value>>>>;

/// Manager-side tier endpoint.
pub struct RoutedListener {
    local_addr: SocketAddr,
    inbound: mpsc::Receiver<(MemberId, Value)>,
    routes: Routes,
}

impl RoutedListener {
    /// Bind the endpoint and start accepting members.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let routes: Routes = Arc::new(Mutex::new(HashMap::new()));
        let (inbound_tx, inbound) = mpsc::channel(INBOUND_QUEUE);

        let accept_routes = routes.clone();
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        tracing::debug!(%peer, "connection accepted");
                        spawn_connection(stream, accept_routes.clone(), inbound_tx.clone());
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                    }
                }
            }
        });

        tracing::info!(addr = %local_addr, "listening");
        Ok(Self { local_addr, inbound, routes })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Bounded wait for the next `(sender, payload)`. `None` on timeout,
    /// which is the yield that lets the caller run its expiry sweep.
    pub async fn poll(&mut self, timeout: Duration) -> Option<(MemberId, Value)> {
        tokio::time::timeout(timeout, self.inbound.recv())
            .await
            .ok()
            .flatten()
    }

    /// Queue a payload to a previously seen identity.
    pub fn send_to<T: Serialize>(&self, to: &MemberId, payload: &T) -> Result<(), TransportError> {
        let value = serde_json::to_value(payload)?;
        let routes = self.routes.lock().expect("route table lock poisoned");
        match routes.get(to) {
            Some(tx) => tx.send(value).map_err(|_| TransportError::Closed),
            None => Err(TransportError::UnknownPeer(to.to_string())),
        }
    }
}

fn spawn_connection(stream: TcpStream, routes: Routes, inbound_tx: mpsc::Sender<(MemberId, Value)>) {
    stream.set_nodelay(true).ok();
    let (mut read_half, mut write_half) = stream.into_split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Value>();

    // Writer: drain this connection's outbound queue.
    tokio::spawn(async move {
        while let Some(value) = out_rx.recv().await {
            if let Err(e) = write_frame(&mut write_half, &value).await {
                tracing::warn!(error = %e, "write failed, dropping connection writer");
                break;
            }
        }
    });

    // Reader: frames → envelopes → inbound queue.
    tokio::spawn(async move {
        let mut identity: Option<MemberId> = None;
        loop {
            let value = match read_frame(&mut read_half).await {
                Ok(Some(value)) => value,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "dropping connection on bad frame");
                    break;
                }
            };
            let envelope: Envelope = match serde_json::from_value(value) {
                Ok(env) => env,
                Err(e) => {
                    tracing::warn!(error = %e, "frame is not an envelope, ignoring");
                    continue;
                }
            };
            bind_route(&routes, &envelope.from, &out_tx, &mut identity);
            if inbound_tx.send((envelope.from, envelope.payload)).await.is_err() {
                break;
            }
        }
        // Leave no stale route behind, unless a newer connection already
        // claimed the identity.
        if let Some(id) = identity {
            let mut routes = routes.lock().expect("route table lock poisoned");
            if routes.get(&id).is_some_and(|tx| tx.same_channel(&out_tx)) {
                routes.remove(&id);
                tracing::debug!(id = %id, "route removed on disconnect");
            }
        }
    });
}

fn bind_route(
    routes: &Routes,
    from: &MemberId,
    out_tx: &mpsc::UnboundedSender<Value>,
    identity: &mut Option<MemberId>,
) {
    if identity.as_ref() == Some(from) {
        return;
    }
    let mut routes = routes.lock().expect("route table lock poisoned");
    if let Some(previous) = routes.insert(from.clone(), out_tx.clone()) {
        if !previous.same_channel(out_tx) {
            tracing::warn!(id = %from, "identity rebound to a newer connection");
        }
    }
    *identity = Some(from.clone());
}
