//! Typed Rust client for the DigitalOcean v2 API.
//!
//! Covers the subset needed for provisioning a single node:
//! droplets (create, get) and account SSH keys (get, create).

mod types;

pub use types::*;

pub const BASE_URL: &str = "https://api.digitalocean.com/v2";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("digitalocean api request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("digitalocean api {endpoint} returned {status}: {body}")]
    Api {
        endpoint: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },
}

impl Error {
    /// HTTP status of an API error, `None` when no response was received.
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            Self::Request(e) => e.status(),
            Self::Api { status, .. } => Some(*status),
        }
    }

    /// Human-readable message reported by the API.
    ///
    /// DigitalOcean error bodies look like `{"id": "unauthorized", "message": "..."}`;
    /// anything else is returned as-is.
    pub fn message(&self) -> String {
        match self {
            Self::Request(e) => e.to_string(),
            Self::Api { body, status, .. } => serde_json::from_str::<ErrorBody>(body)
                .ok()
                .map(|b| b.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| {
                    if body.is_empty() {
                        status.to_string()
                    } else {
                        body.clone()
                    }
                }),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Client for the DigitalOcean REST API.
#[derive(Clone)]
pub struct DigitalOceanClient {
    token: String,
    base_url: String,
    http: reqwest::Client,
}

impl DigitalOceanClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, BASE_URL)
    }

    /// Point the client at a different API root (a proxy or a test server).
    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn auth(&self) -> String {
        format!("Bearer {}", self.token)
    }

    async fn check(resp: reqwest::Response, endpoint: &'static str) -> Result<reqwest::Response> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api { endpoint, status, body });
        }
        Ok(resp)
    }

    // ── Droplets ─────────────────────────────────────────────────────

    pub async fn create_droplet(&self, req: &CreateDropletRequest) -> Result<Droplet> {
        let resp = self
            .http
            .post(self.url("/droplets"))
            .header("Authorization", self.auth())
            .json(req)
            .send()
            .await?;

        let envelope: DropletEnvelope = Self::check(resp, "create droplet").await?.json().await?;
        Ok(envelope.droplet)
    }

    pub async fn get_droplet(&self, droplet_id: u64) -> Result<Droplet> {
        let resp = self
            .http
            .get(self.url(&format!("/droplets/{droplet_id}")))
            .header("Authorization", self.auth())
            .send()
            .await?;

        let envelope: DropletEnvelope = Self::check(resp, "get droplet").await?.json().await?;
        Ok(envelope.droplet)
    }

    // ── SSH keys ─────────────────────────────────────────────────────

    /// Look up an account key by fingerprint. `Ok(None)` when the key is not registered.
    pub async fn get_ssh_key(&self, fingerprint: &str) -> Result<Option<SshKey>> {
        let resp = self
            .http
            .get(self.url(&format!("/account/keys/{fingerprint}")))
            .header("Authorization", self.auth())
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let envelope: SshKeyEnvelope = Self::check(resp, "get ssh key").await?.json().await?;
        Ok(Some(envelope.ssh_key))
    }

    pub async fn create_ssh_key(&self, req: &CreateSshKeyRequest) -> Result<SshKey> {
        let resp = self
            .http
            .post(self.url("/account/keys"))
            .header("Authorization", self.auth())
            .json(req)
            .send()
            .await?;

        let envelope: SshKeyEnvelope = Self::check(resp, "create ssh key").await?.json().await?;
        Ok(envelope.ssh_key)
    }
}
