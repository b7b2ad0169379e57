//! HTTP probes against software running on the new instance.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::state::NodeState;
use crate::{Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Identifiers the node derives for itself once installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIdentity {
    #[serde(rename(deserialize = "peer"))]
    pub peer_id: String,
    #[serde(rename(deserialize = "publisher"))]
    pub publisher_id: String,
}

/// Reads installation progress from a node.
#[async_trait]
pub trait NodeProbe: Send + Sync + 'static {
    /// Current installation state as reported by the node's status service.
    async fn status(&self, address: &str) -> Result<NodeState>;

    async fn identity(&self, address: &str) -> Result<NodeIdentity>;
}

/// Where the status service listens on a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeEndpoint {
    pub scheme: String,
    pub port: u16,
    pub status_path: String,
    pub identity_path: String,
    /// Route requests through a relay, e.g. `https://relay.example/`, which
    /// receives `{address}:{port}/{path}` appended.
    pub proxy_prefix: Option<String>,
}

impl Default for ProbeEndpoint {
    fn default() -> Self {
        Self {
            scheme: "http".into(),
            port: 9010,
            status_path: "state".into(),
            identity_path: "id".into(),
            proxy_prefix: None,
        }
    }
}

impl ProbeEndpoint {
    /// Create from env vars `PROVISTOR_PROBE_SCHEME`, `PROVISTOR_PROBE_PORT`
    /// and `PROVISTOR_PROBE_PROXY`, falling back to the defaults.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut endpoint = Self::default();
        if let Ok(scheme) = std::env::var("PROVISTOR_PROBE_SCHEME") {
            endpoint.scheme = scheme;
        }
        if let Ok(port) = std::env::var("PROVISTOR_PROBE_PORT") {
            endpoint.port = port.parse().map_err(|_| {
                Error::Config(format!("PROVISTOR_PROBE_PORT must be a port number, got {port:?}"))
            })?;
        }
        endpoint.proxy_prefix = std::env::var("PROVISTOR_PROBE_PROXY")
            .ok()
            .filter(|p| !p.is_empty());
        Ok(endpoint)
    }

    pub fn url(&self, address: &str, path: &str) -> String {
        let path = path.trim_start_matches('/');
        match &self.proxy_prefix {
            Some(prefix) => format!("{prefix}{address}:{}/{path}", self.port),
            None => format!("{}://{address}:{}/{path}", self.scheme, self.port),
        }
    }
}

/// [`NodeProbe`] over plain HTTP GETs.
#[derive(Clone)]
pub struct HttpNodeProbe {
    endpoint: ProbeEndpoint,
    http: reqwest::Client,
}

impl HttpNodeProbe {
    pub fn new(endpoint: ProbeEndpoint) -> Self {
        Self {
            endpoint,
            http: reqwest::Client::new(),
        }
    }

    async fn get(&self, path: &str, address: &str) -> Result<String> {
        let url = self.endpoint.url(address, path);
        let resp = self
            .http
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("{url}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Unavailable {
                url,
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| Error::Transport(format!("{url}: {e}")))?;
        debug!(%url, body = %body.trim(), "probe: response");
        Ok(body)
    }
}

#[async_trait]
impl NodeProbe for HttpNodeProbe {
    async fn status(&self, address: &str) -> Result<NodeState> {
        let body = self.get(&self.endpoint.status_path, address).await?;
        parse_status(&body)
    }

    async fn identity(&self, address: &str) -> Result<NodeIdentity> {
        let body = self.get(&self.endpoint.identity_path, address).await?;
        parse_identity(&body)
    }
}

/// Map a status response onto a [`NodeState`].
///
/// Accepts a bare token (`READY`), a JSON string (`"READY"`) or a JSON
/// object with a `state` or `status` field. Anything else is an error.
pub fn parse_status(body: &str) -> Result<NodeState> {
    let trimmed = body.trim();
    if !trimmed.starts_with(['{', '"']) {
        return trimmed.parse();
    }

    let value: serde_json::Value =
        serde_json::from_str(trimmed).map_err(|_| Error::UnknownState(trimmed.to_string()))?;
    let token = match &value {
        serde_json::Value::String(s) => Some(s.as_str()),
        serde_json::Value::Object(fields) => fields
            .get("state")
            .or_else(|| fields.get("status"))
            .and_then(serde_json::Value::as_str),
        _ => None,
    };

    token
        .ok_or_else(|| Error::UnknownState(trimmed.to_string()))?
        .parse()
}

pub fn parse_identity(body: &str) -> Result<NodeIdentity> {
    serde_json::from_str(body.trim())
        .map_err(|e| Error::Malformed(format!("node identity: {e}")))
}
