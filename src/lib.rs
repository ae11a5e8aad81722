//! # devsync
//!
//! **Devfile component reconciliation against a container runtime**
//!
//! Given a devfile's containers and commands, a push makes the runtime run
//! exactly those containers and then drives the init/build/run commands
//! inside them.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                              Pusher                                 │
//! │            per-component lock · immutable PushContext               │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌───────────────┐   ┌────────────────┐   ┌──────────────────────┐  │
//! │  │ volume        │   │ ports          │   │ container            │  │
//! │  │ get-or-create │   │ endpoints ∩    │──▶│ desired definition   │  │
//! │  │ by label      │──▶│ exposed URLs   │   │ + diff predicate     │  │
//! │  └───────────────┘   └────────────────┘   └──────────┬───────────┘  │
//! │                                                      ▼              │
//! │                      ┌──────────────────────────────────────────┐   │
//! │                      │ reconcile: missing → create              │   │
//! │                      │            one     → keep | recreate     │   │
//! │                      │            many    → conflict            │   │
//! │                      └──────────────────────┬───────────────────┘   │
//! │                                             ▼                       │
//! │                      ┌──────────────────────────────────────────┐   │
//! │                      │ pipeline: init (once) → build → run      │   │
//! │                      └──────────────────────────────────────────┘   │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │        RuntimeClient · ExecClient · UrlProvider · CommandProvider    │
//! │                       (implemented by callers)                      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use devsync::{CommandSet, EnvFileUrls, PushConfig, PushRequest, Pusher};
//! use std::sync::Arc;
//!
//! let engine = Arc::new(MyDockerClient::connect()?);
//! let pusher = Pusher::new(engine.clone(), engine, Arc::new(EnvFileUrls::new()), PushConfig::default())?;
//!
//! let request = PushRequest::new("frontend", ".", components, &commands)?;
//! let outcome = pusher.push(&request).await?;
//! println!("changed: {:?}", outcome.changed());
//! ```

pub mod config;
pub mod constants;
pub mod container;
pub mod context;
pub mod devfile;
pub mod error;
pub mod pipeline;
pub mod ports;
pub mod progress;
pub mod push;
pub mod reconcile;
pub mod runtime;
pub mod volume;

// Re-exports
pub use config::{EnvFileUrls, PushConfig, SupervisorConfig};
pub use container::ConfigDifference;
pub use context::PushContext;
pub use devfile::{
    Command, CommandGroup, CommandOverrides, CommandProvider, CommandSet, ComponentSpec, Endpoint,
    EnvVar, VolumeMount,
};
pub use error::{Error, ErrorCategory, Result};
pub use pipeline::{Action, PipelineReport};
pub use ports::{ExposedUrl, PortMap, UrlProvider};
pub use push::{ComponentLocks, PushOutcome, PushRequest, Pusher};
pub use reconcile::{ContainerOutcome, ReconcileReport};
pub use runtime::{
    ClientError, ClientResult, ContainerConfig, ContainerDefinition, ExecClient, ExecResult,
    HostConfig, Labels, LiveContainer, Mount, PortBinding, RuntimeClient, VolumeRecord,
};
pub use volume::{ResolvedVolumes, VolumeHandle, VolumeRole};
