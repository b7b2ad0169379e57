use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::types::{Instance, InstanceId, InstanceSpec, InstanceStatus};
use crate::{CloudProvider, Error, ProviderFactory, Result};

const SSH_KEY_NAME: &str = "provistor";

/// DigitalOcean droplets provider.
///
/// Delegates to `do_api::DigitalOceanClient` for all HTTP calls.
pub struct DigitalOceanProvider {
    client: do_api::DigitalOceanClient,
}

impl DigitalOceanProvider {
    pub fn new(client: do_api::DigitalOceanClient) -> Self {
        Self { client }
    }

    fn parse_status(status: &str) -> InstanceStatus {
        match status {
            "new" => InstanceStatus::New,
            "active" => InstanceStatus::Active,
            "off" => InstanceStatus::Off,
            "archive" => InstanceStatus::Archived,
            _ => InstanceStatus::Unknown,
        }
    }

    fn parse_id(raw: &str) -> Result<u64> {
        raw.parse::<u64>()
            .map_err(|_| Error::InvalidId(raw.to_string()))
    }

    fn instance(droplet: do_api::Droplet) -> Instance {
        Instance {
            id: InstanceId(droplet.id.to_string()),
            status: Self::parse_status(&droplet.status),
            ipv4: droplet
                .networks
                .v4
                .into_iter()
                .map(|net| net.ip_address)
                .collect(),
        }
    }
}

#[async_trait]
impl CloudProvider for DigitalOceanProvider {
    async fn create_instance(&self, spec: &InstanceSpec) -> Result<Instance> {
        let droplet = self
            .client
            .create_droplet(&do_api::CreateDropletRequest {
                name: spec.name.clone(),
                region: spec.region.clone(),
                size: spec.size.clone(),
                image: spec.image.clone(),
                user_data: spec.user_data.clone(),
                ssh_keys: spec.ssh_keys.clone(),
                backups: false,
                ipv6: false,
            })
            .await?;

        info!(droplet_id = droplet.id, status = %droplet.status, "digitalocean: droplet created");

        Ok(Self::instance(droplet))
    }

    async fn get_instance(&self, id: &InstanceId) -> Result<Instance> {
        let droplet = self.client.get_droplet(Self::parse_id(&id.0)?).await?;
        Ok(Self::instance(droplet))
    }

    async fn ensure_ssh_key(&self, fingerprint: &str, public_key: &str) -> Result<()> {
        if self.client.get_ssh_key(fingerprint).await?.is_some() {
            debug!(fingerprint, "digitalocean: ssh key already registered");
            return Ok(());
        }

        let created = self
            .client
            .create_ssh_key(&do_api::CreateSshKeyRequest {
                name: SSH_KEY_NAME.into(),
                public_key: public_key.into(),
            })
            .await;

        match created {
            Ok(key) => {
                info!(key_id = key.id, fingerprint = %key.fingerprint, "digitalocean: ssh key registered");
                Ok(())
            }
            // Registered concurrently, or under another name.
            Err(e) if e.status().map(|s| s.as_u16()) == Some(422)
                && e.message().contains("already in use") =>
            {
                debug!(fingerprint, "digitalocean: ssh key already in use");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Connects to DigitalOcean with a user-supplied token.
#[derive(Debug, Clone)]
pub struct DigitalOceanFactory {
    base_url: String,
}

impl DigitalOceanFactory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Create from env var `DIGITALOCEAN_API_URL` (default: the public API).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let base_url =
            std::env::var("DIGITALOCEAN_API_URL").unwrap_or_else(|_| do_api::BASE_URL.into());
        Self::new(base_url)
    }
}

impl Default for DigitalOceanFactory {
    fn default() -> Self {
        Self::new(do_api::BASE_URL)
    }
}

impl ProviderFactory for DigitalOceanFactory {
    fn connect(&self, token: &str) -> Arc<dyn CloudProvider> {
        Arc::new(DigitalOceanProvider::new(
            do_api::DigitalOceanClient::with_base_url(token, self.base_url.clone()),
        ))
    }
}
