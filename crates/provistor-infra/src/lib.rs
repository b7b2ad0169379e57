pub mod catalog;
pub mod digitalocean;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use types::{Instance, InstanceId, InstanceSpec};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("provider request failed: {0}")]
    Transport(String),

    #[error("malformed provider response: {0}")]
    Malformed(String),

    #[error("invalid instance id: {0}")]
    InvalidId(String),
}

impl From<do_api::Error> for Error {
    fn from(e: do_api::Error) -> Self {
        match &e {
            do_api::Error::Api { status, .. } => Error::Api {
                status: status.as_u16(),
                message: e.message(),
            },
            do_api::Error::Request(inner) if inner.is_decode() => Error::Malformed(e.message()),
            do_api::Error::Request(_) => match e.status() {
                Some(status) => Error::Api {
                    status: status.as_u16(),
                    message: e.message(),
                },
                None => Error::Transport(e.message()),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Authenticated access to a single provider account.
///
/// Implementations never retry; callers poll.
#[async_trait]
pub trait CloudProvider: Send + Sync + 'static {
    /// Create an instance. Returns as soon as the provider has accepted it.
    async fn create_instance(&self, spec: &InstanceSpec) -> Result<Instance>;

    /// Get current instance status and network info.
    async fn get_instance(&self, id: &InstanceId) -> Result<Instance>;

    /// Make sure the account has the given public key registered under `fingerprint`.
    async fn ensure_ssh_key(&self, fingerprint: &str, public_key: &str) -> Result<()>;
}

/// Builds a provider client for a bearer token.
///
/// Keeps token handling out of the workflow so that a token can be
/// validated before any client exists.
pub trait ProviderFactory: Send + Sync + 'static {
    fn connect(&self, token: &str) -> Arc<dyn CloudProvider>;
}
