//! Downloadable summary of a finished node.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::credentials::Login;
use crate::node::Node;
use crate::state::NodeState;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialsFile {
    pub host: String,
    pub os_login: Login,
    pub app_login: Login,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer: Option<PeerInfo>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub peer_id: String,
    pub publisher_id: String,
    pub listen_address: String,
}

impl CredentialsFile {
    /// Only ready nodes have anything worth saving.
    pub fn from_node(node: &Node) -> Result<Self> {
        if node.state() != NodeState::Ready {
            return Err(Error::Artifact(format!(
                "node {} is {}, not READY",
                node.name,
                node.state()
            )));
        }
        let host = node
            .address()
            .ok_or_else(|| Error::Artifact(format!("node {} has no address", node.name)))?;

        let peer = node.identity().map(|identity| PeerInfo {
            peer_id: identity.peer_id.clone(),
            publisher_id: identity.publisher_id.clone(),
            listen_address: node.listen_multiaddr().unwrap_or_default(),
        });

        Ok(Self {
            host: host.to_string(),
            os_login: node.credentials.os_login.clone(),
            app_login: node.credentials.app_login.clone(),
            peer,
            generated_at: Utc::now(),
        })
    }

    pub fn file_name(&self) -> String {
        format!("node_{}.json", self.host)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Artifact(e.to_string()))
    }

    /// Write into `dir` under [`Self::file_name`], returning the full path.
    pub async fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(self.file_name());
        tokio::fs::write(&path, self.to_json()?)
            .await
            .map_err(|e| Error::Artifact(format!("writing {}: {e}", path.display())))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::NodeIdentity;

    fn ready_node() -> Node {
        let mut node = Node::new();
        node.set_address("203.0.113.7".into());
        node.advance_to(NodeState::Ready);
        node
    }

    #[test]
    fn unfinished_nodes_have_no_file() {
        let mut node = Node::new();
        assert!(matches!(CredentialsFile::from_node(&node), Err(Error::Artifact(_))));

        node.advance_to(NodeState::InstallingApplication);
        node.set_address("203.0.113.7".into());
        assert!(matches!(CredentialsFile::from_node(&node), Err(Error::Artifact(_))));
    }

    #[test]
    fn ready_node_without_identity_omits_peer() {
        let node = ready_node();
        let file = CredentialsFile::from_node(&node).unwrap();

        assert_eq!(file.host, "203.0.113.7");
        assert_eq!(file.file_name(), "node_203.0.113.7.json");
        assert_eq!(file.os_login, node.credentials.os_login);

        let json: serde_json::Value = serde_json::from_str(&file.to_json().unwrap()).unwrap();
        assert!(json.get("peer").is_none());
        assert_eq!(json["app_login"]["username"], "admin");
    }

    #[test]
    fn includes_peer_details_when_known() {
        let mut node = ready_node();
        node.set_identity(NodeIdentity {
            peer_id: "QmPeer".into(),
            publisher_id: "4XPub".into(),
        });

        let file = CredentialsFile::from_node(&node).unwrap();
        let peer = file.peer.unwrap();
        assert_eq!(peer.publisher_id, "4XPub");
        assert_eq!(peer.listen_address, "/ip4/203.0.113.7/tcp/9001/p2p/QmPeer");
    }

    #[tokio::test]
    async fn writes_pretty_json_to_directory() {
        let dir = std::env::temp_dir().join(format!("provistor-artifact-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();

        let file = CredentialsFile::from_node(&ready_node()).unwrap();
        let path = file.write_to(&dir).await.unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: CredentialsFile = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, file);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
