//! # Reconciler
//!
//! Brings each declared container into agreement with the live runtime.
//!
//! ## Per-Container State Machine
//!
//! ```text
//!             list_containers_by_label({component, alias})
//!                              │
//!        ┌─────────────────────┼──────────────────────┐
//!        ▼                     ▼                      ▼
//!     Missing             Found(live)           Conflict(n ≥ 2)
//!        │                     │                      │
//!   pull + create      inspect + compare         abort the push
//!        │               │            │
//!        ▼             equal       differs
//!     Created            │            │
//!                    Unchanged   remove → pull + create
//!                                     │
//!                                     ▼
//!                                 Recreated
//! ```
//!
//! Containers are processed in declaration order, one at a time. There is
//! no rollback: containers reconciled before a failure stay as they are.

use crate::container::{self, BuildInputs, ConfigDifference};
use crate::context::PushContext;
use crate::devfile::{self, Command, ComponentSpec};
use crate::error::{Error, Result};
use crate::ports::{self, ExposedUrl};
use crate::progress::Step;
use crate::runtime::{self, ContainerDefinition, LiveContainer};
use crate::volume::ResolvedVolumes;
use std::fmt;
use tracing::{debug, info};

// =============================================================================
// Lookup and Outcome Types
// =============================================================================

/// Outcome of listing the containers labeled for one alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerLookup {
    /// No container yet.
    Missing,
    /// The one container for this alias.
    Found(LiveContainer),
    /// Duplicate labeling; cannot push.
    Conflict(Vec<LiveContainer>),
}

impl ContainerLookup {
    /// Classifies a label query result.
    pub fn from_matches(mut matches: Vec<LiveContainer>) -> Self {
        match matches.len() {
            0 => Self::Missing,
            1 => Self::Found(matches.remove(0)),
            _ => Self::Conflict(matches),
        }
    }
}

/// What reconciliation did to one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerOutcome {
    /// No container existed; one was created.
    Created,
    /// The live container differed and was replaced.
    Recreated(Vec<ConfigDifference>),
    /// The live container already matched.
    Unchanged,
}

impl ContainerOutcome {
    /// True for created or recreated containers.
    pub fn is_changed(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

impl fmt::Display for ContainerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Recreated(_) => write!(f, "recreated"),
            Self::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Result for one declared container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerResult {
    /// Container alias.
    pub alias: String,
    /// ID of the container now running for the alias.
    pub container_id: String,
    /// What happened.
    pub outcome: ContainerOutcome,
}

/// Results for every declared container, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub results: Vec<ContainerResult>,
}

impl ReconcileReport {
    /// True when every container was left untouched.
    ///
    /// A single created or recreated container means the component has to
    /// be treated as new: init runs again and the supervisor is started.
    pub fn component_exists(&self) -> bool {
        self.results.iter().all(|r| !r.outcome.is_changed())
    }

    /// Aliases of created or recreated containers.
    pub fn changed(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| r.outcome.is_changed())
            .map(|r| r.alias.as_str())
            .collect()
    }

    /// Result for `alias`.
    pub fn get(&self, alias: &str) -> Option<&ContainerResult> {
        self.results.iter().find(|r| r.alias == alias)
    }
}

// =============================================================================
// Reconciliation
// =============================================================================

/// Per-push inputs to [`reconcile`].
#[derive(Debug, Clone, Copy)]
pub struct ReconcileInputs<'a> {
    /// Declared containers, in order.
    pub components: &'a [ComponentSpec],
    /// Exposed URLs for the component.
    pub urls: &'a [ExposedUrl],
    /// Volumes resolved for the push.
    pub volumes: &'a ResolvedVolumes,
    /// The run command, if declared.
    pub run_command: Option<&'a Command>,
}

/// Reconciles every declared container, stopping at the first error.
///
/// # Errors
///
/// - [`Error::Configuration`] if no components are declared
/// - [`Error::PortMapping`] for a stale exposed URL
/// - [`Error::ContainerConflict`] if an alias has several live containers
/// - [`Error::Runtime`] / [`Error::Timeout`] from the runtime client
pub async fn reconcile(ctx: &PushContext, inputs: ReconcileInputs<'_>) -> Result<ReconcileReport> {
    devfile::validate_components(inputs.components)?;

    let mut report = ReconcileReport::default();
    for comp in inputs.components {
        let result = reconcile_one(ctx, &inputs, comp).await?;
        info!(
            component = %ctx.component_name(),
            alias = %result.alias,
            container = %result.container_id,
            outcome = %result.outcome,
            "Reconciled container"
        );
        report.results.push(result);
    }

    Ok(report)
}

async fn reconcile_one(
    ctx: &PushContext,
    inputs: &ReconcileInputs<'_>,
    comp: &ComponentSpec,
) -> Result<ContainerResult> {
    let component = ctx.component_name();
    let config = ctx.config();

    let ports = ports::map_ports(component, comp, inputs.urls, &config.host_ip)?;
    let desired = container::build_definition(
        BuildInputs {
            component_name: component,
            volumes: inputs.volumes,
            run_command: inputs.run_command,
            supervisor: &config.supervisor,
        },
        comp,
        &ports,
    )?;

    let labels = container::container_labels(component, &comp.alias);
    let matches = runtime::call(
        "list_containers_by_label",
        component,
        config.call_timeout(),
        ctx.runtime().list_containers_by_label(&labels),
    )
    .await?;

    let (container_id, outcome) = match ContainerLookup::from_matches(matches) {
        ContainerLookup::Missing => {
            let id = pull_and_start(ctx, comp, &desired).await?;
            (id, ContainerOutcome::Created)
        }
        ContainerLookup::Found(live) => {
            let actual = runtime::call(
                "inspect_container",
                component,
                config.call_timeout(),
                ctx.runtime().inspect_container(&live.id),
            )
            .await?;

            let diffs = container::differences(&desired, &actual);
            if diffs.is_empty() {
                debug!(component = %component, alias = %comp.alias, "Container is up to date");
                (live.id, ContainerOutcome::Unchanged)
            } else {
                let changed: Vec<String> = diffs.iter().map(ToString::to_string).collect();
                debug!(
                    component = %component,
                    alias = %comp.alias,
                    changed = %changed.join(", "),
                    "Container needs updating"
                );

                let step = Step::start(format!("Updating the component {}", comp.alias));
                runtime::call(
                    "remove_container",
                    component,
                    config.call_timeout(),
                    ctx.runtime().remove_container(&live.id),
                )
                .await?;
                let id = pull_and_start(ctx, comp, &desired).await?;
                step.finish();
                (id, ContainerOutcome::Recreated(diffs))
            }
        }
        ContainerLookup::Conflict(live) => {
            return Err(Error::ContainerConflict {
                component: component.to_string(),
                alias: comp.alias.clone(),
                count: live.len(),
            });
        }
    };

    Ok(ContainerResult {
        alias: comp.alias.clone(),
        container_id,
        outcome,
    })
}

/// Pulls the image (always, to pick up moved tags) and starts a container.
async fn pull_and_start(
    ctx: &PushContext,
    comp: &ComponentSpec,
    desired: &ContainerDefinition,
) -> Result<String> {
    let component = ctx.component_name();
    let deadline = ctx.config().call_timeout();

    let step = Step::start(format!("Pulling image {}", comp.image));
    runtime::call(
        "pull_image",
        component,
        deadline,
        ctx.runtime().pull_image(&comp.image),
    )
    .await?;
    step.finish();

    let step = Step::start(format!("Starting container for {}", comp.image));
    let id = runtime::call(
        "create_and_start_container",
        component,
        deadline,
        ctx.runtime().create_and_start_container(desired),
    )
    .await?;
    step.finish();

    info!(component = %component, alias = %comp.alias, container = %id, "Started container");
    Ok(id)
}
