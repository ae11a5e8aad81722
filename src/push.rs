//! Push orchestration: reconcile, then run commands, one push per component
//! at a time.

use crate::config::PushConfig;
use crate::constants::LABEL_COMPONENT;
use crate::context::PushContext;
use crate::devfile::{self, CommandProvider, CommandSet, ComponentSpec};
use crate::error::{Error, Result};
use crate::pipeline::{self, PipelineReport};
use crate::ports::UrlProvider;
use crate::reconcile::{self, ReconcileInputs, ReconcileReport};
use crate::runtime::{self, ExecClient, Labels, RuntimeClient};
use crate::volume;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{info, instrument};

// =============================================================================
// Per-Component Locks
// =============================================================================

/// One async mutex per component name.
///
/// The zero/one/many label checks read shared runtime state, so two pushes
/// of the same component racing each other could both see "zero" and both
/// create. Holding the component's lock for the whole push rules that out
/// while letting different components push concurrently.
///
/// Entries nobody holds or waits on are pruned on the next acquire, so the
/// map only tracks components with a push in flight.
#[derive(Debug, Default)]
pub struct ComponentLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ComponentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for and returns the lock for `component_name`.
    pub async fn acquire(&self, component_name: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            // Holders and waiters keep a clone; a count of one is the map's own.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(component_name.to_string())
                .or_default()
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of tracked components.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Returns true if no component is tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Push Request / Outcome
// =============================================================================

/// Everything one push needs from the devfile layer.
#[derive(Debug, Clone)]
pub struct PushRequest {
    /// Component name.
    pub component_name: String,
    /// Directory holding the devfile and env file.
    pub context_dir: PathBuf,
    /// Declared containers, in order.
    pub components: Vec<ComponentSpec>,
    /// Selected commands.
    pub commands: CommandSet,
}

impl PushRequest {
    /// Builds a request, taking commands from `provider`.
    pub fn new(
        component_name: impl Into<String>,
        context_dir: impl Into<PathBuf>,
        components: Vec<ComponentSpec>,
        provider: &dyn CommandProvider,
    ) -> Result<Self> {
        Ok(Self {
            component_name: component_name.into(),
            context_dir: context_dir.into(),
            components,
            commands: provider.commands_by_group()?,
        })
    }
}

/// What a successful push did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushOutcome {
    pub reconcile: ReconcileReport,
    pub pipeline: PipelineReport,
}

impl PushOutcome {
    /// Aliases of containers created or recreated by the push.
    pub fn changed(&self) -> Vec<&str> {
        self.reconcile.changed()
    }
}

// =============================================================================
// Pusher
// =============================================================================

/// Drives pushes against one runtime.
pub struct Pusher {
    runtime: Arc<dyn RuntimeClient>,
    exec: Arc<dyn ExecClient>,
    urls: Arc<dyn UrlProvider>,
    config: Arc<PushConfig>,
    locks: ComponentLocks,
}

impl Pusher {
    /// Creates a pusher.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] if `config` fails validation.
    pub fn new(
        runtime: Arc<dyn RuntimeClient>,
        exec: Arc<dyn ExecClient>,
        urls: Arc<dyn UrlProvider>,
        config: PushConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            runtime,
            exec,
            urls,
            config: Arc::new(config),
            locks: ComponentLocks::new(),
        })
    }

    /// Pushes one component: volumes, containers, then commands.
    ///
    /// Holds the component's lock for the whole push. Stops at the first
    /// error; containers already reconciled are left in place.
    #[instrument(skip_all, fields(component = %request.component_name))]
    pub async fn push(&self, request: &PushRequest) -> Result<PushOutcome> {
        devfile::validate_components(&request.components)?;
        if request.commands.is_empty() {
            return Err(Error::Configuration(
                "error executing devfile commands - there should be at least 1 command"
                    .to_string(),
            ));
        }
        request.commands.validate_targets(&request.components)?;

        let _guard = self.locks.acquire(&request.component_name).await;

        let ctx = PushContext::new(
            request.component_name.clone(),
            request.context_dir.clone(),
            Arc::clone(&self.config),
            Arc::clone(&self.runtime),
        );
        info!("Pushing component {}", ctx.component_name());

        let urls = self
            .urls
            .exposed_urls(ctx.context_dir())
            .map_err(|e| Error::UrlSource {
                component: ctx.component_name().to_string(),
                reason: e.to_string(),
            })?;
        let run_command = request.commands.run.as_ref();
        let volumes = volume::resolve_all(&ctx, &request.components, run_command.is_some()).await?;

        let report = reconcile::reconcile(
            &ctx,
            ReconcileInputs {
                components: &request.components,
                urls: &urls,
                volumes: &volumes,
                run_command,
            },
        )
        .await?;

        let mut labels = Labels::new();
        labels.insert(LABEL_COMPONENT.to_string(), ctx.component_name().to_string());
        let containers = runtime::call(
            "list_containers_by_label",
            ctx.component_name(),
            ctx.config().call_timeout(),
            ctx.runtime().list_containers_by_label(&labels),
        )
        .await?;

        let pipeline = pipeline::execute(
            &ctx,
            self.exec.as_ref(),
            &request.commands,
            report.component_exists(),
            &containers,
        )
        .await?;

        info!(
            changed = report.changed().len(),
            "Pushed component {}",
            ctx.component_name()
        );
        Ok(PushOutcome {
            reconcile: report,
            pipeline,
        })
    }
}
