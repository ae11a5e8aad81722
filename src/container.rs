//! Desired container configuration and the recreate decision.
//!
//! [`build_definition`] turns a [`ComponentSpec`] plus the volumes and
//! ports resolved for this push into the exact [`ContainerDefinition`] the
//! runtime should be running. [`differences`] compares that against what a
//! live container was created with; any difference means destroy and
//! recreate, since the runtime cannot patch a running container.

use crate::config::SupervisorConfig;
use crate::constants::{
    ENV_COMMAND_RUN, ENV_COMMAND_RUN_WORKING_DIR, ENV_PROJECTS_ROOT, LABEL_ALIAS,
    LABEL_COMPONENT, PROJECT_SOURCE_MOUNT_PATH,
};
use crate::devfile::{Command, ComponentSpec};
use crate::error::{Error, Result};
use crate::ports::PortMap;
use crate::runtime::{ContainerConfig, ContainerDefinition, HostConfig, Labels, Mount};
use crate::volume::ResolvedVolumes;
use std::collections::BTreeSet;
use std::fmt;

/// Labels selecting the container for `alias` of `component_name`.
pub fn container_labels(component_name: &str, alias: &str) -> Labels {
    let mut labels = Labels::new();
    labels.insert(LABEL_COMPONENT.to_string(), component_name.to_string());
    labels.insert(LABEL_ALIAS.to_string(), alias.to_string());
    labels
}

// =============================================================================
// Builder
// =============================================================================

/// Inputs shared by every container of one push.
#[derive(Debug, Clone, Copy)]
pub struct BuildInputs<'a> {
    /// Component name.
    pub component_name: &'a str,
    /// Volumes resolved for the push.
    pub volumes: &'a ResolvedVolumes,
    /// The run command, if the devfile declares one.
    pub run_command: Option<&'a Command>,
    /// Supervisor layout.
    pub supervisor: &'a SupervisorConfig,
}

/// Builds the definition a container for `comp` must match.
///
/// Pure: the same inputs always give the same definition.
///
/// # Errors
///
/// [`Error::Internal`] if a declared volume mount was not resolved, or the
/// run container needs the supervisor volume and none was resolved.
pub fn build_definition(
    inputs: BuildInputs<'_>,
    comp: &ComponentSpec,
    ports: &PortMap,
) -> Result<ContainerDefinition> {
    let mut command = comp.command.clone();
    let mut args = comp.args.clone();
    let mut env: Vec<(String, String)> = comp
        .env
        .iter()
        .map(|e| (e.name.clone(), e.value.clone()))
        .collect();
    let declared = |name: &str| comp.has_env(name);

    let mut mounts = Vec::with_capacity(comp.volume_mounts.len() + 2);
    for vm in &comp.volume_mounts {
        let source = inputs.volumes.storage_volume(&vm.name).ok_or_else(|| {
            Error::Internal(format!(
                "volume '{}' of container '{}' was not resolved",
                vm.name, comp.alias
            ))
        })?;
        mounts.push(Mount::volume(source, vm.container_path.clone()));
    }

    // The run container launches through the supervisor so the run action
    // can be restarted without recreating the container.
    if let Some(run) = inputs.run_command.filter(|r| r.component == comp.alias) {
        let supervisor_volume = inputs.volumes.supervisor.as_deref().ok_or_else(|| {
            Error::Internal(format!(
                "supervisor volume for container '{}' was not resolved",
                comp.alias
            ))
        })?;
        mounts.push(Mount::volume(
            supervisor_volume,
            inputs.supervisor.mount_path.clone(),
        ));

        if command.is_empty() && args.is_empty() {
            command = vec![inputs.supervisor.binary_path.clone()];
            args = vec!["-c".to_string(), inputs.supervisor.conf_file.clone()];
        }
        if !declared(ENV_COMMAND_RUN) {
            env.push((ENV_COMMAND_RUN.to_string(), run.command_line.clone()));
        }
        if let Some(dir) = run.working_dir.as_deref().filter(|d| !d.is_empty()) {
            if !declared(ENV_COMMAND_RUN_WORKING_DIR) {
                env.push((ENV_COMMAND_RUN_WORKING_DIR.to_string(), dir.to_string()));
            }
        }
    }

    if comp.mount_sources {
        mounts.push(Mount::volume(
            inputs.volumes.project_source.clone(),
            PROJECT_SOURCE_MOUNT_PATH,
        ));
        if !declared(ENV_PROJECTS_ROOT) {
            env.push((
                ENV_PROJECTS_ROOT.to_string(),
                PROJECT_SOURCE_MOUNT_PATH.to_string(),
            ));
        }
    }

    let mut labels = container_labels(inputs.component_name, &comp.alias);
    for (port, url_name) in ports.names() {
        labels.insert(port.to_string(), url_name.clone());
    }

    Ok(ContainerDefinition {
        config: ContainerConfig {
            image: comp.image.clone(),
            command,
            args,
            env,
            labels,
            exposed_ports: comp.endpoints.iter().map(|e| e.target_port).collect(),
        },
        host: HostConfig {
            port_bindings: ports.bindings(),
            mounts,
        },
    })
}

// =============================================================================
// Comparison
// =============================================================================

/// A field on which a live container differs from its desired definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigDifference {
    Image,
    Command,
    Env,
    Mounts,
    PortBindings,
}

impl fmt::Display for ConfigDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Command => write!(f, "command"),
            Self::Env => write!(f, "env"),
            Self::Mounts => write!(f, "mounts"),
            Self::PortBindings => write!(f, "port bindings"),
        }
    }
}

/// Lists the fields on which `actual` differs from `desired`.
///
/// Image and command+args compare exactly. Env, mounts and port bindings
/// compare as sets, so ordering never forces a recreate. Labels are not
/// compared.
pub fn differences(desired: &ContainerDefinition, actual: &ContainerDefinition) -> Vec<ConfigDifference> {
    let mut diffs = Vec::new();

    if desired.config.image != actual.config.image {
        diffs.push(ConfigDifference::Image);
    }
    if desired.config.command != actual.config.command || desired.config.args != actual.config.args {
        diffs.push(ConfigDifference::Command);
    }
    if as_set(&desired.config.env) != as_set(&actual.config.env) {
        diffs.push(ConfigDifference::Env);
    }
    if as_set(&desired.host.mounts) != as_set(&actual.host.mounts) {
        diffs.push(ConfigDifference::Mounts);
    }
    if as_set(&desired.host.port_bindings) != as_set(&actual.host.port_bindings) {
        diffs.push(ConfigDifference::PortBindings);
    }

    diffs
}

/// Returns true if `actual` satisfies `desired`.
pub fn matches(desired: &ContainerDefinition, actual: &ContainerDefinition) -> bool {
    differences(desired, actual).is_empty()
}

fn as_set<T: Ord>(items: &[T]) -> BTreeSet<&T> {
    items.iter().collect()
}
