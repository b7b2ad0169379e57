//! The provisioning workflow.
//!
//! A run is a strict sequence: validate input, create the instance, wait
//! for it to become reachable, wait for the status service to report
//! `READY`, and optionally fetch the node's identity. Every milestone
//! moves the node forward and is published as a [`WorkflowEvent`]. Any
//! failure puts the node back to `WAITING` so the run can be retried.

use std::fmt;
use std::sync::Arc;

use provistor_infra::types::{Instance, InstanceId, InstanceSpec};
use provistor_infra::{CloudProvider, ProviderFactory, catalog};
use tokio::sync::broadcast;
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use crate::config::WorkflowConfig;
use crate::events::WorkflowEvent;
use crate::node::Node;
use crate::poll::{PollError, poll};
use crate::probe::{NodeIdentity, NodeProbe};
use crate::state::NodeState;
use crate::template;
use crate::{Error, Result};

/// Length of a provider API token.
pub const TOKEN_LEN: usize = 64;

const EVENT_CAPACITY: usize = 64;

/// Waits that can run out of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    InstanceActive,
    ServiceReady,
    Identity,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InstanceActive => "instance-active",
            Self::ServiceReady => "service-ready",
            Self::Identity => "identity",
        })
    }
}

/// User input for one run.
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub token: String,
    pub init_script: String,
    /// Defaults to [`catalog::DEFAULT_SIZE`].
    pub size: Option<String>,
    /// Defaults to a random region.
    pub region: Option<String>,
}

impl ProvisionRequest {
    pub fn new(token: impl Into<String>, init_script: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            init_script: init_script.into(),
            size: None,
            region: None,
        }
    }

    pub fn size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

/// Check a provider token's shape without contacting the provider.
pub fn validate_token(token: &str) -> Result<()> {
    let well_formed = token.len() == TOKEN_LEN
        && token
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
    if !well_formed {
        return Err(Error::Validation(format!(
            "API token must be {TOKEN_LEN} lowercase letters and digits"
        )));
    }
    Ok(())
}

/// Resolve size and region, rejecting anything outside the catalog.
fn placement(request: &ProvisionRequest) -> Result<(String, String)> {
    let size = request.size.as_deref().unwrap_or(catalog::DEFAULT_SIZE);
    if !catalog::is_known_size(size) {
        return Err(Error::Validation(format!("unsupported instance size {size:?}")));
    }

    let region = match request.region.as_deref() {
        Some(region) if !catalog::is_known_region(region) => {
            return Err(Error::Validation(format!("unsupported region {region:?}")));
        }
        Some(region) => region,
        None => catalog::random_region(),
    };

    Ok((size.to_string(), region.to_string()))
}

pub struct Workflow {
    providers: Arc<dyn ProviderFactory>,
    probe: Arc<dyn NodeProbe>,
    config: WorkflowConfig,
    events: broadcast::Sender<WorkflowEvent>,
}

impl Workflow {
    pub fn new(
        providers: Arc<dyn ProviderFactory>,
        probe: Arc<dyn NodeProbe>,
        config: WorkflowConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            providers,
            probe,
            config,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    /// Provision `node` end to end.
    ///
    /// On success the node is `READY` with its address (and identity, if
    /// configured) filled in. On failure it is back at `WAITING` and the
    /// error of the stage that failed is returned.
    ///
    /// Only `WAITING` nodes can be run. Any other node is rejected
    /// untouched and the provider is never contacted.
    pub async fn run(&self, node: &mut Node, request: &ProvisionRequest) -> Result<()> {
        let span = info_span!("provision", run = %Uuid::new_v4(), node = %node.name);

        if !node.state().is_initial() {
            let e = Error::Validation(format!(
                "node {} is {}, only WAITING nodes can be provisioned",
                node.name,
                node.state()
            ));
            span.in_scope(|| error!(error = %e, "provisioning refused"));
            self.emit(WorkflowEvent::Failed {
                node: node.name.clone(),
                message: e.user_message(),
            });
            return Err(e);
        }

        match self.run_stages(node, request).instrument(span.clone()).await {
            Ok(()) => {
                span.in_scope(|| info!("node ready"));
                self.emit(WorkflowEvent::Completed {
                    node: node.name.clone(),
                });
                Ok(())
            }
            Err(e) => {
                span.in_scope(|| error!(error = %e, state = %node.state(), "provisioning failed"));
                let from = node.rollback();
                if from != NodeState::Waiting {
                    self.emit(WorkflowEvent::StateChanged {
                        node: node.name.clone(),
                        from,
                        to: NodeState::Waiting,
                    });
                }
                self.emit(WorkflowEvent::Failed {
                    node: node.name.clone(),
                    message: e.user_message(),
                });
                Err(e)
            }
        }
    }

    async fn run_stages(&self, node: &mut Node, request: &ProvisionRequest) -> Result<()> {
        validate_token(&request.token)?;
        let (size, region) = placement(request)?;

        let provider = self.providers.connect(&request.token);

        advance(node, &self.events, NodeState::CreatingInstance);
        let instance_id = self.create_instance(provider.as_ref(), node, request, size, region).await?;
        node.set_instance_id(instance_id.clone());

        let instance = self.wait_for_instance(provider.as_ref(), &instance_id).await?;
        let address = instance
            .first_ipv4()
            .ok_or_else(|| Error::Malformed("reachable instance has no IPv4 address".into()))?
            .to_string();
        info!(instance_id = %instance_id, %address, "instance active");
        node.set_address(address.clone());
        self.emit(WorkflowEvent::AddressAssigned {
            node: node.name.clone(),
            address: address.clone(),
        });
        advance(node, &self.events, NodeState::InstallingStatusService);

        self.wait_for_ready(node, &address).await?;

        if let Some(policy) = &self.config.identity {
            let probe = self.probe.as_ref();
            let address = address.as_str();
            let identity: NodeIdentity = poll(policy, move || probe.identity(address), |_| true)
                .await
                .map_err(|e| stage_error(Stage::Identity, e))?;

            info!(peer_id = %identity.peer_id, publisher_id = %identity.publisher_id, "node identity received");
            self.emit(WorkflowEvent::IdentityAssigned {
                node: node.name.clone(),
                peer_id: identity.peer_id.clone(),
            });
            node.set_identity(identity);
        }

        Ok(())
    }

    async fn create_instance(
        &self,
        provider: &dyn CloudProvider,
        node: &Node,
        request: &ProvisionRequest,
        size: String,
        region: String,
    ) -> Result<InstanceId> {
        let mut ssh_keys = Vec::new();
        if let Some((fingerprint, public_key)) = self.config.ssh_key() {
            provider.ensure_ssh_key(fingerprint, public_key).await?;
            ssh_keys.push(fingerprint.to_string());
        }

        let spec = InstanceSpec {
            name: node.name.clone(),
            size,
            region,
            image: self.config.image.clone(),
            user_data: template::user_data(
                &request.init_script,
                node,
                self.config.ssh_public_key.as_deref(),
            ),
            ssh_keys,
        };

        info!(size = %spec.size, region = %spec.region, image = %spec.image, "creating instance");
        let instance = provider.create_instance(&spec).await?;
        Ok(instance.id)
    }

    /// Active and addressed, both at once.
    async fn wait_for_instance(
        &self,
        provider: &dyn CloudProvider,
        id: &InstanceId,
    ) -> Result<Instance> {
        let policy = &self.config.instance_active;
        info!(
            interval = ?policy.interval,
            max_attempts = policy.max_attempts,
            "waiting for instance to become active"
        );

        poll(
            policy,
            move || async move { provider.get_instance(id).await.map_err(Error::from) },
            Instance::is_reachable,
        )
        .await
        .map_err(|e| stage_error(Stage::InstanceActive, e))
    }

    /// Follow the status service until it reports `READY`.
    async fn wait_for_ready(&self, node: &mut Node, address: &str) -> Result<()> {
        let policy = &self.config.service_ready;
        info!(
            interval = ?policy.interval,
            budget = ?policy.budget(),
            "waiting for node to finish installing"
        );

        let probe = self.probe.as_ref();
        let events = &self.events;
        poll(
            policy,
            move || probe.status(address),
            |reported: &NodeState| {
                advance(node, events, *reported);
                *reported == NodeState::Ready
            },
        )
        .await
        .map_err(|e| stage_error(Stage::ServiceReady, e))?;

        Ok(())
    }

    fn emit(&self, event: WorkflowEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// Move `node` forward and announce it. Backward or repeated states are ignored.
fn advance(node: &mut Node, events: &broadcast::Sender<WorkflowEvent>, to: NodeState) {
    if let Some(from) = node.advance_to(to) {
        info!(%from, %to, "{}", to.description());
        let _ = events.send(WorkflowEvent::StateChanged {
            node: node.name.clone(),
            from,
            to,
        });
    }
}

fn stage_error(stage: Stage, e: PollError<Error>) -> Error {
    match e {
        PollError::Timeout { attempts, elapsed } => Error::Timeout {
            stage,
            attempts,
            elapsed,
        },
        PollError::Check(e) => e,
    }
}
