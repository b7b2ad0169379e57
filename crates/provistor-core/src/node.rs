use chrono::{DateTime, Utc};
use provistor_infra::types::InstanceId;
use rand::Rng;

use crate::credentials::{Credentials, DEFAULT_APP_USER, DEFAULT_OS_USER};
use crate::probe::NodeIdentity;
use crate::state::NodeState;

/// Local port forwarded to the node's API by [`Node::ssh_forward_command`].
const FORWARD_PORT: u16 = 9002;
/// Port the node's peer-to-peer listener binds.
const P2P_PORT: u16 = 9001;

/// One provisioning attempt.
///
/// Everything except the name and credentials is filled in by the
/// workflow as stages complete; callers only read it.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub credentials: Credentials,
    state: NodeState,
    address: Option<String>,
    instance_id: Option<InstanceId>,
    identity: Option<NodeIdentity>,
}

impl Node {
    pub fn new() -> Self {
        Self::with_users(DEFAULT_OS_USER, DEFAULT_APP_USER)
    }

    pub fn with_users(os_user: &str, app_user: &str) -> Self {
        let created_at = Utc::now();
        let suffix: u32 = rand::rng().random_range(0..1 << 24);

        Self {
            name: format!("node-{}-{suffix:06x}", created_at.timestamp_millis()),
            created_at,
            credentials: Credentials::generate(os_user, app_user),
            state: NodeState::Waiting,
            address: None,
            instance_id: None,
            identity: None,
        }
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn instance_id(&self) -> Option<&InstanceId> {
        self.instance_id.as_ref()
    }

    pub fn identity(&self) -> Option<&NodeIdentity> {
        self.identity.as_ref()
    }

    pub fn has_started(&self, reference: NodeState) -> bool {
        self.state.has_started(reference)
    }

    pub fn has_finished(&self, reference: NodeState) -> bool {
        self.state.has_finished(reference)
    }

    /// A run is in flight; leaving now abandons a half-built instance.
    pub fn needs_leave_confirmation(&self) -> bool {
        !self.state.is_initial() && !self.state.is_terminal()
    }

    /// Tunnel command for reaching the node's local-only API.
    pub fn ssh_forward_command(&self) -> Option<String> {
        let address = self.address.as_deref().filter(|a| !a.is_empty())?;
        Some(format!(
            "ssh -nNT -L {FORWARD_PORT}:localhost:{FORWARD_PORT} {}@{address}",
            self.credentials.os_login.username
        ))
    }

    /// Multiaddr other peers dial, once both address and peer id are known.
    pub fn listen_multiaddr(&self) -> Option<String> {
        let address = self.address.as_deref().filter(|a| !a.is_empty())?;
        let identity = self.identity.as_ref().filter(|i| !i.peer_id.is_empty())?;
        Some(format!(
            "/ip4/{address}/tcp/{P2P_PORT}/p2p/{}",
            identity.peer_id
        ))
    }

    /// Move forward to `next`. Returns the previous state, or `None` if
    /// `next` would not be a step forward.
    pub(crate) fn advance_to(&mut self, next: NodeState) -> Option<NodeState> {
        if next <= self.state {
            return None;
        }
        Some(std::mem::replace(&mut self.state, next))
    }

    /// Back to `WAITING` after a failed run, forgetting the abandoned
    /// instance. Returns the state it was in.
    pub(crate) fn rollback(&mut self) -> NodeState {
        self.address = None;
        self.instance_id = None;
        self.identity = None;
        std::mem::replace(&mut self.state, NodeState::Waiting)
    }

    pub(crate) fn set_instance_id(&mut self, id: InstanceId) {
        self.instance_id = Some(id);
    }

    pub(crate) fn set_address(&mut self, address: String) {
        self.address = Some(address);
    }

    pub(crate) fn set_identity(&mut self, identity: NodeIdentity) {
        self.identity = Some(identity);
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_waiting_with_no_address() {
        let node = Node::new();
        assert_eq!(node.state(), NodeState::Waiting);
        assert!(node.address().is_none());
        assert!(node.instance_id().is_none());
        assert!(!node.needs_leave_confirmation());
    }

    #[test]
    fn name_embeds_creation_time() {
        let node = Node::new();
        let millis = node.created_at.timestamp_millis().to_string();
        assert!(node.name.starts_with(&format!("node-{millis}-")), "{}", node.name);
        assert_eq!(node.name.rsplit('-').next().unwrap().len(), 6);
    }

    #[test]
    fn fresh_nodes_share_nothing() {
        let a = Node::new();
        let b = Node::new();
        assert_ne!(a.name, b.name);
        assert_ne!(a.credentials.os_login.password, b.credentials.os_login.password);
        assert_ne!(a.credentials.app_login.password, b.credentials.app_login.password);
    }

    #[test]
    fn state_only_moves_forward() {
        let mut node = Node::new();
        assert_eq!(node.advance_to(NodeState::CreatingInstance), Some(NodeState::Waiting));
        assert_eq!(
            node.advance_to(NodeState::InstallingApplication),
            Some(NodeState::CreatingInstance)
        );
        assert_eq!(node.advance_to(NodeState::InstallingStatusService), None);
        assert_eq!(node.advance_to(NodeState::InstallingApplication), None);
        assert_eq!(node.state(), NodeState::InstallingApplication);
    }

    #[test]
    fn rollback_returns_to_waiting() {
        let mut node = Node::new();
        node.advance_to(NodeState::StartingApplication);
        node.set_instance_id(InstanceId("1001".into()));
        node.set_address("203.0.113.7".into());
        node.set_identity(NodeIdentity {
            peer_id: "QmPeer".into(),
            publisher_id: "4XPub".into(),
        });
        assert!(node.needs_leave_confirmation());

        assert_eq!(node.rollback(), NodeState::StartingApplication);
        assert_eq!(node.state(), NodeState::Waiting);
        assert!(!node.needs_leave_confirmation());
        assert!(node.address().is_none());
        assert!(node.instance_id().is_none());
        assert!(node.identity().is_none());
        assert!(node.ssh_forward_command().is_none());
    }

    #[test]
    fn ready_node_can_be_left() {
        let mut node = Node::new();
        node.advance_to(NodeState::Ready);
        assert!(!node.needs_leave_confirmation());
        assert!(node.has_finished(NodeState::StartingApplication));
        assert!(node.has_started(NodeState::Ready));
    }

    #[test]
    fn connection_helpers_need_address_and_identity() {
        let mut node = Node::with_users("ops", "admin");
        assert!(node.ssh_forward_command().is_none());
        assert!(node.listen_multiaddr().is_none());

        node.set_address("203.0.113.7".into());
        assert_eq!(
            node.ssh_forward_command().unwrap(),
            "ssh -nNT -L 9002:localhost:9002 ops@203.0.113.7"
        );
        assert!(node.listen_multiaddr().is_none());

        node.set_identity(NodeIdentity {
            peer_id: "QmPeer".into(),
            publisher_id: "4XPub".into(),
        });
        assert_eq!(
            node.listen_multiaddr().unwrap(),
            "/ip4/203.0.113.7/tcp/9001/p2p/QmPeer"
        );
    }
}
