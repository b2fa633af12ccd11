//! Graph snapshot loading.
//!
//! The snapshot is a JSON object keyed by solar system id, produced
//! out-of-band from the static data export:
//!
//! ```json
//! { "30002558": { "name": "Sosala", "region_id": 10000038,
//!                 "region_name": "The Bleak Lands", "adjacent": [30002557] } }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use super::LocationGraph;
use crate::types::{Location, LocationId, RegionId, ScanError};

/// On-disk shape of one location. The id is the map key.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LocationRecord {
    name: String,
    region_id: RegionId,
    #[serde(default)]
    region_name: String,
    #[serde(default)]
    adjacent: Vec<LocationId>,
}

/// Parse a graph snapshot from JSON text.
pub fn parse_graph(json: &str) -> Result<LocationGraph> {
    let records: HashMap<LocationId, LocationRecord> =
        serde_json::from_str(json).context("Failed to parse location graph snapshot")?;

    Ok(LocationGraph::from_locations(records.into_iter().map(
        |(id, r)| Location {
            id,
            name: r.name,
            region_id: r.region_id,
            region_name: r.region_name,
            adjacent: r.adjacent,
        },
    )))
}

/// Load a graph snapshot from a file. A missing, corrupt or empty
/// snapshot is `DataUnavailable`.
pub fn load_graph(path: &Path) -> Result<LocationGraph, ScanError> {
    let unavailable = |reason: String| {
        ScanError::DataUnavailable(format!("graph snapshot {}: {reason}", path.display()))
    };

    let json = std::fs::read_to_string(path).map_err(|e| unavailable(e.to_string()))?;
    let graph = parse_graph(&json).map_err(|e| unavailable(format!("{e:#}")))?;
    if graph.is_empty() {
        return Err(unavailable("no systems".into()));
    }
    info!(path = %path.display(), systems = graph.len(), "Location graph loaded");
    Ok(graph)
}

/// Load the snapshot, returning `None` (and logging) when it is
/// unavailable so callers can fall back to static regions.
pub fn try_load_graph(path: &Path) -> Option<LocationGraph> {
    match load_graph(path) {
        Ok(graph) => Some(graph),
        Err(e) => {
            warn!(error = %e, "Location graph unavailable");
            None
        }
    }
}

/// Serialize a graph back to the snapshot format.
pub fn to_json(graph: &LocationGraph) -> Result<String> {
    let records: HashMap<LocationId, LocationRecord> = graph
        .locations()
        .map(|l| {
            (
                l.id,
                LocationRecord {
                    name: l.name.clone(),
                    region_id: l.region_id,
                    region_name: l.region_name.clone(),
                    adjacent: l.adjacent.clone(),
                },
            )
        })
        .collect();
    serde_json::to_string_pretty(&records).context("Failed to serialise location graph")
}
