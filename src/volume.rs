//! # Volume Resolution
//!
//! Get-or-create for label-selected runtime volumes.
//!
//! ## Lookup Outcomes
//!
//! A label query stands in for a unique index the runtime does not have,
//! so every lookup yields one of three outcomes:
//!
//! ```text
//!   list_volumes_by_label(labels)
//!            │
//!   ┌────────┼─────────────┐
//!   ▼        ▼             ▼
//! Missing   Found(v)    Conflict(n ≥ 2)
//!   │        │             │
//! create   reuse v     fatal, never auto-healed
//! ```
//!
//! Existing volumes are never modified. A conflict means something outside
//! this crate duplicated the labels and needs manual cleanup.

use crate::constants::{
    LABEL_COMPONENT, LABEL_STORAGE_NAME, LABEL_TYPE, PROJECT_SOURCE_VOLUME_NAME,
    PROJECTS_VOLUME_TYPE, SUPERVISORD_VOLUME_NAME, SUPERVISORD_VOLUME_TYPE, VOLUME_SUFFIX_LEN,
};
use crate::context::PushContext;
use crate::devfile::ComponentSpec;
use crate::error::{Error, Result};
use crate::runtime::{self, Labels, VolumeRecord};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

// =============================================================================
// Roles
// =============================================================================

/// What a volume is for. Each role has its own label set and base name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VolumeRole {
    /// The component's synced project source.
    ProjectSource,
    /// Holds the supervisor binary and config for the run container.
    Supervisor,
    /// A volume declared in the devfile, by devfile name.
    Storage(String),
}

impl VolumeRole {
    /// Labels identifying this role's volume for a component.
    pub fn labels(&self, component_name: &str) -> Labels {
        let mut labels = Labels::new();
        labels.insert(LABEL_COMPONENT.to_string(), component_name.to_string());
        match self {
            Self::ProjectSource => {
                labels.insert(LABEL_TYPE.to_string(), PROJECTS_VOLUME_TYPE.to_string());
            }
            Self::Supervisor => {
                labels.insert(LABEL_TYPE.to_string(), SUPERVISORD_VOLUME_TYPE.to_string());
            }
            Self::Storage(name) => {
                labels.insert(LABEL_STORAGE_NAME.to_string(), name.clone());
            }
        }
        labels
    }

    fn base_name(&self) -> &str {
        match self {
            Self::ProjectSource => PROJECT_SOURCE_VOLUME_NAME,
            Self::Supervisor => SUPERVISORD_VOLUME_NAME,
            Self::Storage(name) => name,
        }
    }
}

impl fmt::Display for VolumeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProjectSource => write!(f, "project source"),
            Self::Supervisor => write!(f, "supervisor"),
            Self::Storage(name) => write!(f, "storage '{name}'"),
        }
    }
}

// =============================================================================
// Lookup
// =============================================================================

/// Outcome of a label lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeLookup {
    /// No volume carries the labels yet.
    Missing,
    /// Exactly one volume carries the labels.
    Found(VolumeRecord),
    /// Several volumes carry the labels.
    Conflict(Vec<VolumeRecord>),
}

impl VolumeLookup {
    /// Classifies a label query result.
    pub fn from_matches(mut matches: Vec<VolumeRecord>) -> Self {
        match matches.len() {
            0 => Self::Missing,
            1 => Self::Found(matches.remove(0)),
            _ => Self::Conflict(matches),
        }
    }
}

/// A resolved runtime volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeHandle {
    /// Runtime volume name.
    pub name: String,
    /// True if this call created the volume.
    pub created: bool,
}

/// Generates `<base>-<component>-<suffix>` with a random lowercase suffix.
pub fn generate_volume_name(base: &str, component_name: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{base}-{component_name}-{}", &suffix[..VOLUME_SUFFIX_LEN])
}

/// Looks up the volume for `role` without creating anything.
pub async fn lookup(ctx: &PushContext, role: &VolumeRole) -> Result<VolumeLookup> {
    let component = ctx.component_name();
    let labels = role.labels(component);
    let matches = runtime::call(
        "list_volumes_by_label",
        component,
        ctx.config().call_timeout(),
        ctx.runtime().list_volumes_by_label(&labels),
    )
    .await?;
    Ok(VolumeLookup::from_matches(matches))
}

/// Returns the volume for `role`, creating it if none exists.
///
/// # Errors
///
/// - [`Error::VolumeConflict`] if more than one volume matches; nothing is
///   created or modified in that case
/// - [`Error::Runtime`] / [`Error::Timeout`] from the runtime client
pub async fn resolve(ctx: &PushContext, role: &VolumeRole) -> Result<VolumeHandle> {
    let component = ctx.component_name();

    match lookup(ctx, role).await? {
        VolumeLookup::Found(volume) => {
            debug!(component = %component, volume = %volume.name, "Reusing {} volume", role);
            Ok(VolumeHandle {
                name: volume.name,
                created: false,
            })
        }
        VolumeLookup::Conflict(volumes) => Err(Error::VolumeConflict {
            component: component.to_string(),
            role: role.to_string(),
            count: volumes.len(),
        }),
        VolumeLookup::Missing => {
            let name = generate_volume_name(role.base_name(), component);
            let labels = role.labels(component);
            let created = runtime::call(
                "create_volume",
                component,
                ctx.config().call_timeout(),
                ctx.runtime().create_volume(&name, &labels),
            )
            .await?;
            info!(component = %component, volume = %created.name, "Created {} volume", role);
            Ok(VolumeHandle {
                name: created.name,
                created: true,
            })
        }
    }
}

// =============================================================================
// Push-wide Resolution
// =============================================================================

/// Runtime volume names resolved for one push.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedVolumes {
    /// Project source volume.
    pub project_source: String,
    /// Supervisor volume, when a run command exists.
    pub supervisor: Option<String>,
    /// Devfile volume name to runtime volume name.
    pub storage: BTreeMap<String, String>,
}

impl ResolvedVolumes {
    /// Runtime name for a devfile volume.
    pub fn storage_volume(&self, devfile_name: &str) -> Option<&str> {
        self.storage.get(devfile_name).map(String::as_str)
    }
}

/// Resolves every volume a push needs before any container is touched.
///
/// Devfile volumes shared by several containers resolve to one runtime
/// volume. Any failure stops resolution immediately.
pub async fn resolve_all(
    ctx: &PushContext,
    components: &[ComponentSpec],
    needs_supervisor: bool,
) -> Result<ResolvedVolumes> {
    let project_source = resolve(ctx, &VolumeRole::ProjectSource).await?.name;

    let supervisor = if needs_supervisor {
        Some(resolve(ctx, &VolumeRole::Supervisor).await?.name)
    } else {
        None
    };

    let mut storage = BTreeMap::new();
    for comp in components {
        for mount in &comp.volume_mounts {
            if storage.contains_key(&mount.name) {
                continue;
            }
            let handle = resolve(ctx, &VolumeRole::Storage(mount.name.clone())).await?;
            storage.insert(mount.name.clone(), handle.name);
        }
    }

    Ok(ResolvedVolumes {
        project_source,
        supervisor,
        storage,
    })
}
