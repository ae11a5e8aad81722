//! Endpoint to host-port mapping.
//!
//! Exposed URLs live outside the devfile (they are created and removed by
//! the URL workflow) so they can drift from the endpoints a component
//! declares. This module intersects the two and refuses stale URLs rather
//! than returning a partial map.

use crate::devfile::ComponentSpec;
use crate::error::{Error, Result};
use crate::runtime::PortBinding;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

// =============================================================================
// Exposed URLs
// =============================================================================

/// A persisted URL record: container port exposed on a host port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExposedUrl {
    /// URL name.
    pub name: String,
    /// Container port.
    pub port: u16,
    /// Host port; zero means not exposed yet.
    #[serde(default)]
    pub exposed_port: u16,
    /// Restricts the URL to one container alias.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
}

impl ExposedUrl {
    pub fn new(name: impl Into<String>, port: u16, exposed_port: u16) -> Self {
        Self {
            name: name.into(),
            port,
            exposed_port,
            container: None,
        }
    }
}

/// Source of the persisted URL records for a component context.
pub trait UrlProvider: Send + Sync {
    /// Returns the URLs recorded under `context`.
    fn exposed_urls(&self, context: &Path) -> Result<Vec<ExposedUrl>>;
}

impl UrlProvider for Vec<ExposedUrl> {
    fn exposed_urls(&self, _context: &Path) -> Result<Vec<ExposedUrl>> {
        Ok(self.clone())
    }
}

// =============================================================================
// Port Map
// =============================================================================

/// Resolved port bindings for one container, keyed by container port.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortMap {
    bindings: BTreeMap<u16, PortBinding>,
    names: BTreeMap<u16, String>,
}

impl PortMap {
    /// Returns the bindings ordered by container port.
    pub fn bindings(&self) -> Vec<PortBinding> {
        self.bindings.values().cloned().collect()
    }

    /// Returns the binding for a container port.
    pub fn get(&self, container_port: u16) -> Option<&PortBinding> {
        self.bindings.get(&container_port)
    }

    /// Returns the URL name attached to each bound container port.
    pub fn names(&self) -> &BTreeMap<u16, String> {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Maps a container's declared endpoints against exposed URLs.
///
/// Every URL with a non-zero exposed port must target a declared endpoint,
/// unless the container declares no endpoints at all, in which case there
/// is nothing to bind and URLs are ignored. URLs restricted to another
/// container alias are skipped.
///
/// # Errors
///
/// [`Error::PortMapping`] for the first URL referencing an undeclared port.
pub fn map_ports(
    component_name: &str,
    comp: &ComponentSpec,
    urls: &[ExposedUrl],
    host_ip: &str,
) -> Result<PortMap> {
    let mut map = PortMap::default();

    for url in urls {
        if url.exposed_port == 0 {
            continue;
        }
        if url.container.as_deref().is_some_and(|c| c != comp.alias) {
            continue;
        }

        if comp.has_endpoint(url.port) {
            map.bindings.insert(
                url.port,
                PortBinding {
                    container_port: url.port,
                    host_ip: host_ip.to_string(),
                    host_port: url.exposed_port,
                },
            );
            map.names.insert(url.port, url.name.clone());
            debug!(
                component = %component_name,
                alias = %comp.alias,
                url = %url.name,
                "Bound {}:{} to container port {}",
                host_ip,
                url.exposed_port,
                url.port
            );
        } else if !comp.endpoints.is_empty() {
            return Err(Error::PortMapping {
                component: component_name.to_string(),
                container_port: url.port,
                url: url.name.clone(),
            });
        }
    }

    Ok(map)
}
