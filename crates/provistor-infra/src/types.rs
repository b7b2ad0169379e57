use serde::{Deserialize, Serialize};

/// Opaque provider-side instance identifier (e.g. a DigitalOcean droplet ID).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub String);

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Specification for creating an instance.
#[derive(Debug, Clone)]
pub struct InstanceSpec {
    pub name: String,
    pub size: String,
    pub region: String,
    pub image: String,
    /// Rendered init script, passed to the instance as user data.
    pub user_data: Option<String>,
    /// Fingerprints of account SSH keys to install.
    pub ssh_keys: Vec<String>,
}

/// Instance status and network info returned from the provider.
#[derive(Debug, Clone)]
pub struct Instance {
    pub id: InstanceId,
    pub status: InstanceStatus,
    /// IPv4 addresses in provider order.
    pub ipv4: Vec<String>,
}

impl Instance {
    pub fn first_ipv4(&self) -> Option<&str> {
        self.ipv4.first().map(String::as_str)
    }

    /// Active and reachable: both conditions must hold at once.
    pub fn is_reachable(&self) -> bool {
        self.status == InstanceStatus::Active && !self.ipv4.is_empty()
    }
}

/// Provider-reported instance status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceStatus {
    New,
    Active,
    Off,
    Archived,
    Unknown,
}
