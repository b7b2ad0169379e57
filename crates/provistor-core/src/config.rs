use std::env;
use std::time::Duration;

use provistor_infra::catalog;

use crate::poll::PollPolicy;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub image: String,
    /// Substituted into the init script and, together with a
    /// fingerprint, registered on the account and attached to the instance.
    pub ssh_public_key: Option<String>,
    pub ssh_key_fingerprint: Option<String>,
    pub instance_active: PollPolicy,
    pub service_ready: PollPolicy,
    /// `None` skips the identity stage.
    pub identity: Option<PollPolicy>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            image: catalog::DEFAULT_IMAGE.into(),
            ssh_public_key: None,
            ssh_key_fingerprint: None,
            instance_active: PollPolicy::instance_active(),
            service_ready: PollPolicy::service_ready(),
            identity: Some(PollPolicy::identity()),
        }
    }
}

impl WorkflowConfig {
    /// Defaults overridden by env vars:
    ///
    /// - `PROVISTOR_IMAGE`
    /// - `PROVISTOR_SSH_PUBLIC_KEY`, `PROVISTOR_SSH_KEY_FINGERPRINT`
    /// - `PROVISTOR_FETCH_IDENTITY` (`true`/`false`, default `true`)
    /// - `PROVISTOR_READY_INTERVAL_SECS`, `PROVISTOR_READY_MAX_ATTEMPTS`
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(image) = env::var("PROVISTOR_IMAGE") {
            config.image = image;
        }
        config.ssh_public_key = non_empty_var("PROVISTOR_SSH_PUBLIC_KEY");
        config.ssh_key_fingerprint = non_empty_var("PROVISTOR_SSH_KEY_FINGERPRINT");

        if let Some(raw) = non_empty_var("PROVISTOR_FETCH_IDENTITY") {
            let fetch: bool = raw.parse().map_err(|_| {
                Error::Config(format!("PROVISTOR_FETCH_IDENTITY must be true or false, got {raw:?}"))
            })?;
            if !fetch {
                config.identity = None;
            }
        }

        if let Some(secs) = parse_var::<u64>("PROVISTOR_READY_INTERVAL_SECS")? {
            config.service_ready.interval = Duration::from_secs(secs);
        }
        if let Some(attempts) = parse_var::<u32>("PROVISTOR_READY_MAX_ATTEMPTS")? {
            config.service_ready.max_attempts = attempts;
        }

        Ok(config)
    }

    /// Public key and fingerprint, when both are configured.
    pub fn ssh_key(&self) -> Option<(&str, &str)> {
        Some((
            self.ssh_key_fingerprint.as_deref()?,
            self.ssh_public_key.as_deref()?,
        ))
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    non_empty_var(name)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| Error::Config(format!("{name} must be a number, got {raw:?}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssh_key_needs_both_halves() {
        let mut config = WorkflowConfig {
            ssh_public_key: Some("ssh-ed25519 AAAA".into()),
            ..WorkflowConfig::default()
        };
        assert!(config.ssh_key().is_none());

        config.ssh_key_fingerprint = Some("aa:bb".into());
        assert_eq!(config.ssh_key(), Some(("aa:bb", "ssh-ed25519 AAAA")));
    }

    #[test]
    fn defaults_fetch_identity() {
        let config = WorkflowConfig::default();
        assert!(config.identity.is_some());
        assert_eq!(config.image, "ubuntu-16-04-x64");
    }
}
