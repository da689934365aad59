//! Agent state machine tests over a scripted manager link.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use roost_agent::{AgentPhase, ManagerLink, MemberAgent};
use roost_membership::MemberRole;
use roost_protocol::{MemberId, Reply, Request};
use roost_transport::TransportError;

/// Replays a fixed reply script; `None` entries simulate wait timeouts.
struct ScriptedLink {
    sent: Arc<Mutex<Vec<Request>>>,
    replies: VecDeque<Option<Reply>>,
}

impl ScriptedLink {
    fn new(replies: Vec<Option<Reply>>) -> (Self, Arc<Mutex<Vec<Request>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let link = Self { sent: sent.clone(), replies: replies.into() };
        (link, sent)
    }
}

impl ManagerLink for ScriptedLink {
    async fn send_request(&mut self, request: &Request) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn recv_reply(&mut self, _timeout: Duration) -> Result<Option<Reply>, TransportError> {
        match self.replies.pop_front() {
            Some(reply) => Ok(reply),
            None => Err(TransportError::Closed),
        }
    }
}

fn drone(replies: Vec<Option<Reply>>) -> (MemberAgent<ScriptedLink>, Arc<Mutex<Vec<Request>>>) {
    let (link, sent) = ScriptedLink::new(replies);
    let agent = MemberAgent::new(MemberId::new("D1"), MemberRole::Drone, link)
        .with_intervals(Duration::from_millis(10), Duration::from_millis(10));
    (agent, sent)
}

#[tokio::test]
async fn test_register_happy_path_records_assignment() {
    let (mut agent, sent) = drone(vec![Some(Reply::Assigned { handler: "H1".into() })]);
    agent.register().await.unwrap();

    assert_eq!(agent.phase(), AgentPhase::Registered);
    assert_eq!(agent.assigned_handler(), Some(&"H1".into()));
    assert_eq!(
        *sent.lock().unwrap(),
        vec![Request::Register { id: "D1".into() }]
    );
}

#[tokio::test]
async fn test_register_timeouts_wait_without_resending() {
    // Two wait windows elapse before the manager answers.
    let (mut agent, sent) = drone(vec![None, None, Some(Reply::Registered)]);
    agent.register().await.unwrap();

    assert_eq!(agent.phase(), AgentPhase::Registered);
    assert_eq!(sent.lock().unwrap().len(), 1, "register must be sent exactly once");
}

#[tokio::test]
async fn test_none_avail_on_register_terminates_drone() {
    let (mut agent, _sent) = drone(vec![Some(Reply::NoneAvail)]);
    agent.register().await.unwrap();
    assert_eq!(agent.phase(), AgentPhase::Terminated);
    assert_eq!(agent.assigned_handler(), None);
}

#[tokio::test]
async fn test_none_avail_does_not_terminate_handler() {
    let (link, _sent) = ScriptedLink::new(vec![Some(Reply::NoneAvail)]);
    let mut agent = MemberAgent::new(MemberId::new("H1"), MemberRole::Handler, link);
    agent.register().await.unwrap();
    assert_eq!(agent.phase(), AgentPhase::Registered);
}

#[tokio::test]
async fn test_heartbeat_tolerates_missed_pong() {
    let (mut agent, sent) = drone(vec![
        Some(Reply::Assigned { handler: "H1".into() }),
        None, // pong lost
        Some(Reply::Pong),
    ]);
    agent.register().await.unwrap();
    agent.heartbeat_cycle().await.unwrap();
    assert_eq!(agent.phase(), AgentPhase::Registered, "missed pong is not fatal");
    agent.heartbeat_cycle().await.unwrap();
    assert_eq!(agent.phase(), AgentPhase::Registered);
    assert_eq!(sent.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_run_stops_on_mid_stream_none_avail() {
    let (mut agent, sent) = drone(vec![
        Some(Reply::Assigned { handler: "H1".into() }),
        Some(Reply::Pong),
        Some(Reply::NoneAvail),
    ]);
    agent.run().await.unwrap();

    assert_eq!(agent.phase(), AgentPhase::Terminated);
    let sent = sent.lock().unwrap();
    assert_eq!(sent[0], Request::Register { id: "D1".into() });
    assert_eq!(sent.len(), 3, "one register and two pings before the terminal reply");
}

#[tokio::test]
async fn test_transport_failure_surfaces() {
    // Script exhausted: the link reports the connection as closed.
    let (mut agent, _sent) = drone(vec![]);
    let err = agent.register().await.unwrap_err();
    assert!(matches!(err, TransportError::Closed));
}
