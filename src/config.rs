//! Push configuration and the env-file URL source.

use crate::constants::{
    DEFAULT_CALL_TIMEOUT, DEFAULT_EXEC_TIMEOUT, LOCALHOST_IP, SUPERVISORD_BINARY_PATH,
    SUPERVISORD_CONF_FILE, SUPERVISORD_MOUNT_PATH, SUPERVISORD_RUN_PROGRAM,
};
use crate::error::{Error, Result};
use crate::ports::{ExposedUrl, UrlProvider};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Maximum size of a configuration or env file (1 MiB).
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;

// =============================================================================
// Push Configuration
// =============================================================================

/// Where the in-container supervisor lives and what it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SupervisorConfig {
    /// Supervisor binary inside the container.
    pub binary_path: String,
    /// Supervisor configuration file inside the container.
    pub conf_file: String,
    /// Where the supervisor volume is mounted.
    pub mount_path: String,
    /// Program name wrapping the run action.
    pub program: String,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            binary_path: SUPERVISORD_BINARY_PATH.to_string(),
            conf_file: SUPERVISORD_CONF_FILE.to_string(),
            mount_path: SUPERVISORD_MOUNT_PATH.to_string(),
            program: SUPERVISORD_RUN_PROGRAM.to_string(),
        }
    }
}

/// Tunables for a push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PushConfig {
    /// Loopback interface exposed ports bind to.
    pub host_ip: String,
    /// Deadline for each runtime call, in seconds.
    pub call_timeout_secs: u64,
    /// Deadline for each in-container command, in seconds.
    pub exec_timeout_secs: u64,
    /// Attach command output to the caller.
    pub show_output: bool,
    /// Supervisor layout.
    pub supervisor: SupervisorConfig,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            host_ip: LOCALHOST_IP.to_string(),
            call_timeout_secs: DEFAULT_CALL_TIMEOUT.as_secs(),
            exec_timeout_secs: DEFAULT_EXEC_TIMEOUT.as_secs(),
            show_output: false,
            supervisor: SupervisorConfig::default(),
        }
    }
}

impl PushConfig {
    /// Parses a configuration from YAML; missing keys take defaults.
    pub fn from_yaml(yaml: &[u8]) -> Result<Self> {
        if yaml.len() > MAX_CONFIG_FILE_SIZE {
            return Err(Error::InvalidInput(format!(
                "config size {} exceeds limit of {}",
                yaml.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let config: Self = serde_yaml::from_slice(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects a non-loopback host IP, zero deadlines and empty supervisor
    /// paths.
    pub fn validate(&self) -> Result<()> {
        let loopback = self
            .host_ip
            .parse::<IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false);
        if !loopback {
            return Err(Error::InvalidInput(format!(
                "host ip '{}' must be a loopback address",
                self.host_ip
            )));
        }
        if self.call_timeout_secs == 0 || self.exec_timeout_secs == 0 {
            return Err(Error::InvalidInput(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        if self.supervisor.binary_path.is_empty() || self.supervisor.program.is_empty() {
            return Err(Error::InvalidInput(
                "supervisor binary path and program cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn exec_timeout(&self) -> Duration {
        Duration::from_secs(self.exec_timeout_secs)
    }
}

// =============================================================================
// Env File URLs
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EnvFile {
    #[serde(default)]
    component_settings: ComponentSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ComponentSettings {
    #[serde(default)]
    url: Vec<ExposedUrl>,
}

/// Reads exposed URLs from `<context>/.odo/env/env.yaml`.
#[derive(Debug, Clone, Default)]
pub struct EnvFileUrls {
    /// Override for the file path relative to the context.
    relative_path: Option<PathBuf>,
}

impl EnvFileUrls {
    /// Default location relative to the component context.
    pub const DEFAULT_RELATIVE_PATH: &'static str = ".odo/env/env.yaml";

    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a different path relative to the context.
    pub fn with_relative_path(path: impl Into<PathBuf>) -> Self {
        Self {
            relative_path: Some(path.into()),
        }
    }

    fn path_for(&self, context: &Path) -> PathBuf {
        match &self.relative_path {
            Some(p) => context.join(p),
            None => context.join(Self::DEFAULT_RELATIVE_PATH),
        }
    }
}

impl UrlProvider for EnvFileUrls {
    fn exposed_urls(&self, context: &Path) -> Result<Vec<ExposedUrl>> {
        let path = self.path_for(context);
        let size = match std::fs::metadata(&path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No env file at {}, assuming no URLs", path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(Error::Io(e)),
        };
        if size > MAX_CONFIG_FILE_SIZE as u64 {
            return Err(Error::InvalidInput(format!(
                "env file {} exceeds limit of {} bytes",
                path.display(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let data = std::fs::read(&path)?;
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let env: EnvFile = serde_yaml::from_slice(&data)?;
        Ok(env.component_settings.url)
    }
}
