use crate::state::NodeState;

/// Progress notifications published while a workflow runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    StateChanged {
        node: String,
        from: NodeState,
        to: NodeState,
    },
    AddressAssigned {
        node: String,
        address: String,
    },
    IdentityAssigned {
        node: String,
        peer_id: String,
    },
    Completed {
        node: String,
    },
    Failed {
        node: String,
        message: String,
    },
}
