//! Error types for component reconciliation and command execution.

use std::fmt;

/// Result type alias for devsync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while pushing a component.
///
/// Every variant carries the component name (and alias where one applies)
/// so callers can report failures without extra bookkeeping.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// The declared components or commands are unusable as given.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Input failed validation (names, env, manifests).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The component's exposed URLs could not be loaded.
    #[error("failed to load exposed urls for component '{component}': {reason}")]
    UrlSource { component: String, reason: String },

    // =========================================================================
    // Conflict Errors
    // =========================================================================
    /// More than one volume carries the label set reserved for a single role.
    #[error(
        "found {count} {role} volumes for component '{component}', expected at most one; \
         remove the duplicates manually"
    )]
    VolumeConflict {
        component: String,
        role: String,
        count: usize,
    },

    /// More than one live container is labeled for the same component alias.
    #[error(
        "found {count} running containers for devfile component '{alias}' of '{component}' \
         and cannot push changes"
    )]
    ContainerConflict {
        component: String,
        alias: String,
        count: usize,
    },

    // =========================================================================
    // Port Mapping Errors
    // =========================================================================
    /// An exposed URL points at a container port the component no longer declares.
    #[error(
        "url '{url}' of component '{component}' uses port {container_port} which is not \
         present in the devfile; re-create the url with the new devfile port"
    )]
    PortMapping {
        component: String,
        container_port: u16,
        url: String,
    },

    // =========================================================================
    // Runtime Errors
    // =========================================================================
    /// A runtime client call failed.
    #[error("runtime call '{operation}' failed for component '{component}': {reason}")]
    Runtime {
        operation: String,
        component: String,
        reason: String,
    },

    /// A runtime or exec call exceeded its deadline.
    #[error("operation timed out after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: std::time::Duration,
    },

    // =========================================================================
    // Command Errors
    // =========================================================================
    /// A devfile command could not be executed at all.
    #[error("failed to execute command '{command_id}' in '{alias}': {reason}")]
    CommandExec {
        command_id: String,
        alias: String,
        reason: String,
    },

    /// A devfile command ran and exited non-zero.
    #[error("command '{command_id}' in '{alias}' exited with code {exit_code}")]
    CommandFailed {
        command_id: String,
        alias: String,
        exit_code: i32,
    },

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Zero components, zero commands, bad targets.
    Configuration,
    /// Duplicate label-selected resources; needs manual cleanup.
    Conflict,
    /// Stale exposed URL.
    PortMapping,
    /// Runtime engine call failed or timed out.
    Runtime,
    /// In-container command failed.
    CommandExec,
    /// Anything else.
    Other,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Conflict => write!(f, "conflict"),
            Self::PortMapping => write!(f, "port-mapping"),
            Self::Runtime => write!(f, "runtime"),
            Self::CommandExec => write!(f, "command-exec"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl Error {
    /// Wraps a runtime client failure with operation and component context.
    pub fn runtime(
        operation: impl Into<String>,
        component: impl Into<String>,
        reason: impl fmt::Display,
    ) -> Self {
        Self::Runtime {
            operation: operation.into(),
            component: component.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns the category this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) | Self::InvalidInput(_) | Self::UrlSource { .. } => {
                ErrorCategory::Configuration
            }
            Self::VolumeConflict { .. } | Self::ContainerConflict { .. } => {
                ErrorCategory::Conflict
            }
            Self::PortMapping { .. } => ErrorCategory::PortMapping,
            Self::Runtime { .. } | Self::Timeout { .. } => ErrorCategory::Runtime,
            Self::CommandExec { .. } | Self::CommandFailed { .. } => ErrorCategory::CommandExec,
            Self::Io(_) | Self::Serialization(_) | Self::Internal(_) => ErrorCategory::Other,
        }
    }

    /// Returns true for conflicts that require out-of-band cleanup.
    pub fn is_fatal_conflict(&self) -> bool {
        self.category() == ErrorCategory::Conflict
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
