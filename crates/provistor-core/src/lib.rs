//! Provisioning of a single cloud node.
//!
//! [`Workflow::run`] creates an instance through a [`provistor_infra::CloudProvider`],
//! waits for it to come up, then follows the node's status service until it is
//! ready, publishing progress as [`WorkflowEvent`]s along the way.

pub mod artifact;
pub mod config;
pub mod credentials;
pub mod error;
pub mod events;
pub mod node;
pub mod poll;
pub mod probe;
pub mod state;
pub mod template;
pub mod workflow;

pub use artifact::CredentialsFile;
pub use config::WorkflowConfig;
pub use error::{Error, Result};
pub use events::WorkflowEvent;
pub use node::Node;
pub use probe::{HttpNodeProbe, NodeIdentity, NodeProbe, ProbeEndpoint};
pub use state::NodeState;
pub use workflow::{ProvisionRequest, Stage, Workflow};
