//! # Push Constants
//!
//! Label keys, in-container paths and default deadlines shared by the
//! reconciler and the command pipeline.
//!
//! ## Label Contract
//!
//! Runtime resources have no identity beyond their labels, so these keys
//! are the de facto unique index over volumes and containers:
//!
//! | Resource | Labels |
//! |----------|--------|
//! | Project source volume | `component=<name>`, `type=projects` |
//! | Declared storage volume | `component=<name>`, `storage-name=<volume>` |
//! | Supervisor volume | `component=<name>`, `type=supervisord` |
//! | Component container | `component=<name>`, `alias=<alias>` |
//!
//! Changing any of these orphans resources created by earlier pushes.

use std::time::Duration;

// =============================================================================
// Label Keys
// =============================================================================

/// Label holding the component name.
pub const LABEL_COMPONENT: &str = "component";

/// Label holding the container alias within a component.
pub const LABEL_ALIAS: &str = "alias";

/// Label holding a volume role.
pub const LABEL_TYPE: &str = "type";

/// Label holding the declared storage volume name.
pub const LABEL_STORAGE_NAME: &str = "storage-name";

/// `type` label value for project source volumes.
pub const PROJECTS_VOLUME_TYPE: &str = "projects";

/// `type` label value for the supervisor volume.
pub const SUPERVISORD_VOLUME_TYPE: &str = "supervisord";

// =============================================================================
// Volume Naming
// =============================================================================

/// Base name for generated project source volumes.
pub const PROJECT_SOURCE_VOLUME_NAME: &str = "odo-project-source";

/// Base name for the generated supervisor volume.
pub const SUPERVISORD_VOLUME_NAME: &str = "odo-supervisord-shared-data";

/// Length of the random suffix appended to generated volume names.
///
/// Keeps names unique across parallel instances of the same component.
pub const VOLUME_SUFFIX_LEN: usize = 4;

// =============================================================================
// In-Container Paths
// =============================================================================

/// Mount path of the project source volume.
pub const PROJECT_SOURCE_MOUNT_PATH: &str = "/projects";

/// Env var pointing user commands at the project source mount.
pub const ENV_PROJECTS_ROOT: &str = "CHE_PROJECTS_ROOT";

/// Env var carrying the run action for the supervisor.
pub const ENV_COMMAND_RUN: &str = "ODO_COMMAND_RUN";

/// Env var carrying the run action's working directory.
pub const ENV_COMMAND_RUN_WORKING_DIR: &str = "ODO_COMMAND_RUN_WORKING_DIR";

/// Default supervisor binary.
pub const SUPERVISORD_BINARY_PATH: &str = "/opt/odo/bin/supervisord";

/// Default supervisor configuration file.
pub const SUPERVISORD_CONF_FILE: &str = "/opt/odo/conf/devfile-supervisor.conf";

/// Default mount path of the supervisor volume.
pub const SUPERVISORD_MOUNT_PATH: &str = "/opt/odo/";

/// Supervisor program name that wraps the run action.
pub const SUPERVISORD_RUN_PROGRAM: &str = "devrun";

/// Shell used for init and build actions.
pub const SHELL_PATH: &str = "/bin/sh";

// =============================================================================
// Networking
// =============================================================================

/// Host IP every exposed port binds to.
pub const LOCALHOST_IP: &str = "127.0.0.1";

// =============================================================================
// Deadlines
// =============================================================================

/// Default deadline for a single runtime call (image pulls dominate).
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(300);

/// Default deadline for a single in-container command.
pub const DEFAULT_EXEC_TIMEOUT: Duration = Duration::from_secs(600);
