use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Provisioning lifecycle of a node, in the order the stages happen.
///
/// The derived `Ord` follows declaration order, so `a < b` means `a` comes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeState {
    Waiting,
    CreatingInstance,
    InstallingStatusService,
    InstallingSystemPackages,
    InstallingApplication,
    StartingApplication,
    Ready,
}

impl NodeState {
    pub const ALL: [NodeState; 7] = [
        Self::Waiting,
        Self::CreatingInstance,
        Self::InstallingStatusService,
        Self::InstallingSystemPackages,
        Self::InstallingApplication,
        Self::StartingApplication,
        Self::Ready,
    ];

    pub fn ordinal(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "WAITING",
            Self::CreatingInstance => "CREATING_INSTANCE",
            Self::InstallingStatusService => "INSTALLING_STATUS_SERVICE",
            Self::InstallingSystemPackages => "INSTALLING_SYSTEM_PACKAGES",
            Self::InstallingApplication => "INSTALLING_APPLICATION",
            Self::StartingApplication => "STARTING_APPLICATION",
            Self::Ready => "READY",
        }
    }

    /// Progress line shown to users.
    pub fn description(self) -> &'static str {
        match self {
            Self::Waiting => "waiting to start",
            Self::CreatingInstance => "creating instance",
            Self::InstallingStatusService => "installing status service",
            Self::InstallingSystemPackages => "installing system packages",
            Self::InstallingApplication => "installing application",
            Self::StartingApplication => "starting application",
            Self::Ready => "ready",
        }
    }

    pub fn is_initial(self) -> bool {
        self == Self::Waiting
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Ready
    }

    /// True once `reference` has been entered (inclusive).
    pub fn has_started(self, reference: NodeState) -> bool {
        self >= reference
    }

    /// True once `reference` has been left behind.
    pub fn has_finished(self, reference: NodeState) -> bool {
        self > reference
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeState {
    type Err = Error;

    /// Accepts the SCREAMING_SNAKE names in any case, with `-` for `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == normalized)
            .ok_or_else(|| Error::UnknownState(s.to_string()))
    }
}
