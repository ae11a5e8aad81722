//! Per-push context.

use crate::config::PushConfig;
use crate::runtime::RuntimeClient;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Immutable state shared by every step of one push.
///
/// Built once when a push starts and passed by reference to the volume
/// resolver, spec builder, reconciler and pipeline. Nothing in it changes
/// while the push runs.
#[derive(Clone)]
pub struct PushContext {
    component_name: String,
    context_dir: PathBuf,
    config: Arc<PushConfig>,
    runtime: Arc<dyn RuntimeClient>,
}

impl PushContext {
    pub fn new(
        component_name: impl Into<String>,
        context_dir: impl Into<PathBuf>,
        config: Arc<PushConfig>,
        runtime: Arc<dyn RuntimeClient>,
    ) -> Self {
        Self {
            component_name: component_name.into(),
            context_dir: context_dir.into(),
            config,
            runtime,
        }
    }

    /// Name of the component being pushed.
    pub fn component_name(&self) -> &str {
        &self.component_name
    }

    /// Directory holding the component's devfile and env file.
    pub fn context_dir(&self) -> &Path {
        &self.context_dir
    }

    pub fn config(&self) -> &PushConfig {
        &self.config
    }

    pub fn runtime(&self) -> &dyn RuntimeClient {
        self.runtime.as_ref()
    }
}

impl std::fmt::Debug for PushContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushContext")
            .field("component_name", &self.component_name)
            .field("context_dir", &self.context_dir)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
