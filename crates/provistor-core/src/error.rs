use std::time::Duration;

use crate::poll::Transient;
use crate::workflow::Stage;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("{stage} wait timed out after {attempts} attempts ({elapsed:?})")]
    Timeout {
        stage: Stage,
        attempts: u32,
        elapsed: Duration,
    },

    #[error("{url} returned {status}")]
    Unavailable { url: String, status: u16 },

    #[error("unrecognized node state: {0:?}")]
    UnknownState(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("credentials unavailable: {0}")]
    Artifact(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Message suitable for showing to the person who started the run.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Provider { status: 401, .. } => "Check your API token".into(),
            Self::Provider { message, .. } if !message.is_empty() => message.clone(),
            Self::Provider { .. } => "Unknown error".into(),
            other => other.to_string(),
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Provider { status: 401, .. })
    }
}

impl Transient for Error {
    /// Only failures where the remote side may simply not be up yet.
    fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Unavailable { .. })
    }
}

impl From<provistor_infra::Error> for Error {
    fn from(e: provistor_infra::Error) -> Self {
        match e {
            provistor_infra::Error::Api { status, message } => Self::Provider { status, message },
            provistor_infra::Error::Transport(msg) => Self::Transport(msg),
            provistor_infra::Error::Malformed(msg) => Self::Malformed(msg),
            provistor_infra::Error::InvalidId(id) => {
                Self::Malformed(format!("provider returned unusable instance id {id:?}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_asks_for_token() {
        let err = Error::Provider {
            status: 401,
            message: "Unable to authenticate you.".into(),
        };
        assert_eq!(err.user_message(), "Check your API token");
        assert!(err.is_auth_failure());
    }

    #[test]
    fn other_provider_errors_pass_message_through() {
        let err = Error::Provider {
            status: 422,
            message: "Region is unavailable".into(),
        };
        assert_eq!(err.user_message(), "Region is unavailable");
        assert!(!err.is_auth_failure());

        let err = Error::Provider {
            status: 500,
            message: String::new(),
        };
        assert_eq!(err.user_message(), "Unknown error");
    }

    #[test]
    fn timeout_names_the_stage() {
        let err = Error::Timeout {
            stage: Stage::InstanceActive,
            attempts: 120,
            elapsed: Duration::from_secs(600),
        };
        let msg = err.user_message();
        assert!(msg.contains("instance-active"), "{msg}");
        assert!(msg.contains("120"), "{msg}");
    }

    #[test]
    fn only_network_failures_are_transient() {
        assert!(Error::Transport("refused".into()).is_transient());
        assert!(
            Error::Unavailable {
                url: "http://x".into(),
                status: 502
            }
            .is_transient()
        );
        assert!(!Error::UnknownState("x".into()).is_transient());
        assert!(
            !Error::Provider {
                status: 503,
                message: String::new()
            }
            .is_transient()
        );
    }

    #[test]
    fn infra_errors_keep_their_category() {
        let err: Error = provistor_infra::Error::Api {
            status: 401,
            message: "nope".into(),
        }
        .into();
        assert!(matches!(err, Error::Provider { status: 401, .. }));

        let err: Error = provistor_infra::Error::Transport("reset".into()).into();
        assert!(matches!(err, Error::Transport(_)));
    }
}
