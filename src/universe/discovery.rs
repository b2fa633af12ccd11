//! Breadth-first region discovery with a hop budget.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, info, warn};

use super::LocationGraph;
use crate::types::{LocationId, RegionId, ScanError};

/// Result of one bounded traversal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Discovery {
    /// Regions of every location reached within the hop budget.
    pub regions: HashSet<RegionId>,
    /// Shortest hop count from the start for every visited location.
    pub distances: HashMap<LocationId, u32>,
}

impl Discovery {
    pub fn distance_to(&self, id: LocationId) -> Option<u32> {
        self.distances.get(&id).copied()
    }

    /// Region ids in ascending order.
    pub fn sorted_regions(&self) -> Vec<RegionId> {
        let mut regions: Vec<RegionId> = self.regions.iter().copied().collect();
        regions.sort_unstable();
        regions
    }
}

/// Set of regions reachable from `start_id` within `max_hops` jumps.
pub fn discover_regions(
    graph: &LocationGraph,
    start_id: LocationId,
    max_hops: u32,
) -> Result<HashSet<RegionId>, ScanError> {
    explore(graph, start_id, max_hops).map(|d| d.regions)
}

/// Walk the graph from `start_id`, recording regions and hop distances.
///
/// A location contributes its region as soon as it is discovered, so every
/// location at distance `<= max_hops` is counted. Locations at the budget
/// limit are not expanded. Adjacency entries that point outside the graph
/// are skipped.
pub fn explore(
    graph: &LocationGraph,
    start_id: LocationId,
    max_hops: u32,
) -> Result<Discovery, ScanError> {
    let Some(start) = graph.get(start_id) else {
        warn!(start_id, "Start location not found in graph");
        return Err(ScanError::LocationNotFound(start_id));
    };

    let mut visited: HashSet<LocationId> = HashSet::from([start_id]);
    let mut frontier: VecDeque<(LocationId, u32)> = VecDeque::from([(start_id, 0)]);
    let mut discovery = Discovery::default();
    discovery.regions.insert(start.region_id);
    discovery.distances.insert(start_id, 0);

    while let Some((current_id, dist)) = frontier.pop_front() {
        if dist >= max_hops {
            continue;
        }
        let Some(current) = graph.get(current_id) else {
            continue;
        };
        discovery.regions.insert(current.region_id);

        for &adjacent_id in &current.adjacent {
            if visited.contains(&adjacent_id) {
                continue;
            }
            let Some(adjacent) = graph.get(adjacent_id) else {
                debug!(from = current_id, to = adjacent_id, "Skipping dangling adjacency");
                continue;
            };
            visited.insert(adjacent_id);
            if discovery.regions.insert(adjacent.region_id) {
                debug!(
                    region = %adjacent.region_name,
                    region_id = adjacent.region_id,
                    via = %adjacent.name,
                    "Discovered region"
                );
            }
            discovery.distances.insert(adjacent_id, dist + 1);
            frontier.push_back((adjacent_id, dist + 1));
        }
    }

    info!(
        start = %start.name,
        max_hops,
        regions = discovery.regions.len(),
        systems = discovery.distances.len(),
        "Region discovery complete"
    );
    Ok(discovery)
}

/// Shortest hop count between two locations, `None` if disconnected or
/// either end is unknown.
pub fn hop_distance(graph: &LocationGraph, from: LocationId, to: LocationId) -> Option<u32> {
    if !graph.contains(from) || !graph.contains(to) {
        return None;
    }
    if from == to {
        return Some(0);
    }

    let mut visited: HashSet<LocationId> = HashSet::from([from]);
    let mut frontier: VecDeque<(LocationId, u32)> = VecDeque::from([(from, 0)]);

    while let Some((current_id, dist)) = frontier.pop_front() {
        let Some(current) = graph.get(current_id) else {
            continue;
        };
        for &adjacent_id in &current.adjacent {
            if adjacent_id == to {
                return Some(dist + 1);
            }
            if graph.contains(adjacent_id) && visited.insert(adjacent_id) {
                frontier.push_back((adjacent_id, dist + 1));
            }
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
