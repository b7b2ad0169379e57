mod config;

use std::process::ExitCode;
use std::sync::Arc;

use provistor_core::{
    CredentialsFile, HttpNodeProbe, Node, NodeState, ProbeEndpoint, ProvisionRequest, Workflow,
    WorkflowConfig, WorkflowEvent,
};
use provistor_infra::digitalocean::DigitalOceanFactory;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

/// Conventional exit status after SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match run().await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run() -> provistor_core::Result<ExitCode> {
    let config = AppConfig::from_env()?;
    let workflow = Workflow::new(
        Arc::new(DigitalOceanFactory::from_env()),
        Arc::new(HttpNodeProbe::new(ProbeEndpoint::from_env()?)),
        WorkflowConfig::from_env()?,
    );

    let mut node = Node::new();
    tracing::info!(node = %node.name, "starting provisioning");

    let request = config.request();
    let Some(outcome) = drive(&workflow, &mut node, &request).await else {
        tracing::warn!(node = %node.name, "left before provisioning finished");
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    };
    if let Err(e) = outcome {
        // Already logged and reported as a Failed event.
        if e.is_auth_failure() {
            tracing::error!("the provider rejected PROVISTOR_API_TOKEN");
        }
        return Ok(ExitCode::FAILURE);
    }

    let file = CredentialsFile::from_node(&node)?;
    let path = file.write_to(&config.output_dir).await?;
    tracing::info!(path = %path.display(), "credentials saved");

    if let Some(command) = node.ssh_forward_command() {
        tracing::info!(%command, "forward the management port with");
    }
    if let Some(multiaddr) = node.listen_multiaddr() {
        tracing::info!(%multiaddr, "node listening");
    }

    Ok(ExitCode::SUCCESS)
}

/// Run the workflow while reporting its events. Returns `None` when the
/// user leaves early.
///
/// Ctrl-C during a run only warns; a second one leaves.
async fn drive(
    workflow: &Workflow,
    node: &mut Node,
    request: &ProvisionRequest,
) -> Option<provistor_core::Result<()>> {
    let mut events = workflow.subscribe();
    let mut state = node.state();
    let mut leave_requested = false;
    let mut events_open = true;

    let run = workflow.run(node, request);
    tokio::pin!(run);

    let outcome = loop {
        tokio::select! {
            result = &mut run => break result,
            event = events.recv(), if events_open => match event {
                Ok(event) => report(&event, &mut state),
                Err(RecvError::Lagged(missed)) => tracing::warn!(missed, "missed progress events"),
                Err(RecvError::Closed) => events_open = false,
            },
            _ = tokio::signal::ctrl_c() => {
                if leave_requested || state.is_initial() || state.is_terminal() {
                    return None;
                }
                leave_requested = true;
                tracing::warn!(
                    %state,
                    "provisioning is in progress and leaving will lose the credentials; press Ctrl-C again to leave"
                );
            }
        }
    };

    // The final events are sent just before the run returns.
    loop {
        match events.try_recv() {
            Ok(event) => report(&event, &mut state),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    Some(outcome)
}

fn report(event: &WorkflowEvent, state: &mut NodeState) {
    match event {
        WorkflowEvent::StateChanged { to, .. } => {
            *state = *to;
            tracing::info!(state = %to, "{}", to.description());
        }
        WorkflowEvent::AddressAssigned { address, .. } => {
            tracing::info!(%address, "instance address assigned");
        }
        WorkflowEvent::IdentityAssigned { peer_id, .. } => {
            tracing::info!(%peer_id, "node identity assigned");
        }
        WorkflowEvent::Completed { node } => {
            tracing::info!(%node, "provisioning complete");
        }
        WorkflowEvent::Failed { node, message } => {
            tracing::error!(%node, "{message}");
        }
    }
}
