//! Name and distance lookups.
//!
//! Defines the `Catalog` trait consumed by the deal scanner and an offline
//! implementation backed by the static hull table and the location graph.
//! The ESI client (`market::esi`) implements the same trait remotely.

pub mod hulls;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::types::{LocationId, TypeId, UNREACHABLE_DISTANCE};
use crate::universe::{hop_distance, LocationGraph};

pub use hulls::{parse_hull_ids, HullCatalog, HullCategory, HullInfo, ShipClass};

/// Abstraction over type names, system names, and jump distances.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Display name of an item type.
    async fn name_for_type(&self, type_id: TypeId) -> Result<String>;

    /// Display name of a solar system.
    async fn name_for_location(&self, location_id: LocationId) -> Result<String>;

    /// Jump count between two systems. Returns `UNREACHABLE_DISTANCE`
    /// rather than an error when they are not connected.
    async fn distance(&self, from: LocationId, to: LocationId) -> Result<u32>;
}

/// Offline catalog: hull table plus graph names and BFS distances, with an
/// optional remote catalog for anything neither knows.
pub struct UniverseCatalog {
    hulls: HullCatalog,
    graph: Option<Arc<LocationGraph>>,
    remote: Option<Arc<dyn Catalog>>,
}

impl UniverseCatalog {
    pub fn new(hulls: HullCatalog, graph: Option<Arc<LocationGraph>>) -> Self {
        Self {
            hulls,
            graph,
            remote: None,
        }
    }

    pub fn with_remote(mut self, remote: Arc<dyn Catalog>) -> Self {
        self.remote = Some(remote);
        self
    }
}

#[async_trait]
impl Catalog for UniverseCatalog {
    async fn name_for_type(&self, type_id: TypeId) -> Result<String> {
        if let Some(name) = self.hulls.name(type_id) {
            return Ok(name.to_string());
        }
        match &self.remote {
            Some(remote) => remote.name_for_type(type_id).await,
            None => Err(anyhow!("Type {type_id} not in hull table")),
        }
    }

    async fn name_for_location(&self, location_id: LocationId) -> Result<String> {
        if let Some(loc) = self.graph.as_ref().and_then(|g| g.get(location_id)) {
            return Ok(loc.name.clone());
        }
        match &self.remote {
            Some(remote) => remote.name_for_location(location_id).await,
            None => Err(anyhow!("System {location_id} not in graph")),
        }
    }

    async fn distance(&self, from: LocationId, to: LocationId) -> Result<u32> {
        if let Some(graph) = &self.graph {
            if graph.contains(from) && graph.contains(to) {
                let hops = hop_distance(graph, from, to).unwrap_or(UNREACHABLE_DISTANCE);
                debug!(from, to, hops, "Graph distance");
                return Ok(hops);
            }
        }
        match &self.remote {
            Some(remote) => remote.distance(from, to).await,
            None => Ok(UNREACHABLE_DISTANCE),
        }
    }
}
