//! Container runtime capability traits.
//!
//! The engine behind these traits (Docker, Podman, a test double) is an
//! external collaborator. This crate only consumes:
//!
//! - [`RuntimeClient`]: volume and container CRUD, image pull, inspection
//! - [`ExecClient`]: running a command inside a live container
//!
//! # Identity by Label
//!
//! Neither volumes nor containers are looked up by name. Every query goes
//! through a label selector, and callers decide what zero, one or many
//! matches mean (see [`crate::volume`] and [`crate::reconcile`]).

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

/// Label selector / label set.
pub type Labels = BTreeMap<String, String>;

/// Error reported by a runtime client implementation.
pub type ClientError = Box<dyn std::error::Error + Send + Sync>;

/// Result of a runtime client call.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

// =============================================================================
// Runtime Value Types
// =============================================================================

/// A runtime volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeRecord {
    /// Runtime volume name.
    pub name: String,
    /// Labels attached at creation.
    #[serde(default)]
    pub labels: Labels,
}

/// A container as reported by a label listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveContainer {
    /// Runtime-assigned container ID.
    pub id: String,
    /// Entrypoint command line, joined with spaces.
    pub command: String,
    /// Container labels.
    #[serde(default)]
    pub labels: Labels,
}

impl LiveContainer {
    /// Returns the `alias` label, if any.
    pub fn alias(&self) -> Option<&str> {
        self.labels
            .get(crate::constants::LABEL_ALIAS)
            .map(String::as_str)
    }
}

/// A volume mount: runtime volume name to in-container path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Mount {
    /// Runtime volume name.
    pub source: String,
    /// Path inside the container.
    pub target: String,
}

impl Mount {
    /// Creates a volume mount.
    pub fn volume(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// A host port binding for one container port (TCP).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortBinding {
    /// Port inside the container.
    pub container_port: u16,
    /// Host interface to bind.
    pub host_ip: String,
    /// Port on the host.
    pub host_port: u16,
}

impl std::fmt::Display for PortBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}:{}", self.container_port, self.host_ip, self.host_port)
    }
}

/// Process-level container configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Image reference.
    pub image: String,
    /// Entrypoint override (empty = image default).
    #[serde(default)]
    pub command: Vec<String>,
    /// Arguments to the entrypoint.
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment, in declaration order.
    #[serde(default)]
    pub env: Vec<(String, String)>,
    /// Container labels.
    #[serde(default)]
    pub labels: Labels,
    /// Container ports declared as exposed.
    #[serde(default)]
    pub exposed_ports: Vec<u16>,
}

/// Host-level container configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Host port bindings, one per container port.
    #[serde(default)]
    pub port_bindings: Vec<PortBinding>,
    /// Volume mounts.
    #[serde(default)]
    pub mounts: Vec<Mount>,
}

/// Everything needed to create a container, and everything inspection returns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDefinition {
    /// Process-level configuration.
    pub config: ContainerConfig,
    /// Host-level configuration.
    pub host: HostConfig,
}

/// Result of an in-container command.
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    /// Exit code of the command.
    pub exit_code: i32,
    /// Standard output (if attached).
    pub stdout: Vec<u8>,
    /// Standard error (if attached).
    pub stderr: Vec<u8>,
}

impl ExecResult {
    /// Creates a successful result.
    pub fn success() -> Self {
        Self::default()
    }

    /// Returns true if the command succeeded (exit code 0).
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

// =============================================================================
// Capability Traits
// =============================================================================

/// Volume and container operations against a container engine.
///
/// Implementations must be `Send + Sync`; one client is shared by every
/// push running in the process.
#[async_trait]
pub trait RuntimeClient: Send + Sync {
    /// Lists volumes carrying every label in `labels`.
    async fn list_volumes_by_label(&self, labels: &Labels) -> ClientResult<Vec<VolumeRecord>>;

    /// Creates a volume with the given name and labels.
    async fn create_volume(&self, name: &str, labels: &Labels) -> ClientResult<VolumeRecord>;

    /// Pulls an image.
    async fn pull_image(&self, image: &str) -> ClientResult<()>;

    /// Creates and starts a container in one step, returning its ID.
    ///
    /// Either the container is running when this returns `Ok`, or nothing
    /// was left behind.
    async fn create_and_start_container(
        &self,
        definition: &ContainerDefinition,
    ) -> ClientResult<String>;

    /// Force-removes a container.
    async fn remove_container(&self, id: &str) -> ClientResult<()>;

    /// Lists containers carrying every label in `labels`.
    async fn list_containers_by_label(&self, labels: &Labels) -> ClientResult<Vec<LiveContainer>>;

    /// Returns the configuration and mounts a container was created with.
    async fn inspect_container(&self, id: &str) -> ClientResult<ContainerDefinition>;
}

/// Runs commands inside live containers.
#[async_trait]
pub trait ExecClient: Send + Sync {
    /// Executes `argv` in container `id`, optionally attaching its output.
    async fn exec(&self, id: &str, argv: &[String], attach_output: bool)
        -> ClientResult<ExecResult>;
}

// =============================================================================
// Deadline Wrapper
// =============================================================================

/// Awaits a runtime call under a deadline, attaching operation context.
///
/// Client failures become [`Error::Runtime`]; an expired deadline becomes
/// [`Error::Timeout`]. Dropping the returned future cancels the call.
pub(crate) async fn call<T, F>(
    operation: &str,
    component: &str,
    deadline: Duration,
    fut: F,
) -> Result<T>
where
    F: Future<Output = ClientResult<T>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(Error::runtime(operation, component, e)),
        Err(_) => Err(Error::Timeout {
            operation: format!("{operation} ({component})"),
            duration: deadline,
        }),
    }
}
