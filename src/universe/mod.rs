//! Location graph and region discovery.
//!
//! The graph is a read-only snapshot of solar systems and their stargate
//! adjacency, loaded once per scan. Region discovery walks it breadth-first
//! from a reference system to decide which regional markets to query.

pub mod discovery;
pub mod snapshot;

use std::collections::HashMap;

use crate::types::{Location, LocationId, ScanError};

pub use discovery::{discover_regions, explore, hop_distance, Discovery};

/// Mapping from location id to location record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationGraph {
    locations: HashMap<LocationId, Location>,
}

impl LocationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_locations(locations: impl IntoIterator<Item = Location>) -> Self {
        Self {
            locations: locations.into_iter().map(|l| (l.id, l)).collect(),
        }
    }

    pub fn get(&self, id: LocationId) -> Option<&Location> {
        self.locations.get(&id)
    }

    pub fn contains(&self, id: LocationId) -> bool {
        self.locations.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.locations.values()
    }

    /// Find a location by case-insensitive display name.
    pub fn find_by_name(&self, name: &str) -> Option<&Location> {
        let needle = name.trim();
        self.locations
            .values()
            .find(|l| l.name.eq_ignore_ascii_case(needle))
    }

    /// Resolve user input that is either a numeric id or a system name.
    pub fn resolve(&self, input: &str) -> Result<&Location, ScanError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ScanError::MalformedInput("empty system name".into()));
        }
        if let Ok(id) = input.parse::<LocationId>() {
            return self.get(id).ok_or(ScanError::LocationNotFound(id));
        }
        self.find_by_name(input)
            .ok_or_else(|| ScanError::MalformedInput(format!("unknown system: {input}")))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn loc(id: LocationId, region_id: u64, adjacent: &[LocationId]) -> Location {
        Location {
            id,
            name: format!("S{id}"),
            region_id,
            region_name: format!("R{region_id}"),
            adjacent: adjacent.to_vec(),
        }
    }

    /// A(1, R1) - B(2, R1) - C(3, R2)
    pub fn line_graph() -> LocationGraph {
        LocationGraph::from_locations([
            loc(1, 1, &[2]),
            loc(2, 1, &[1, 3]),
            loc(3, 2, &[2]),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_resolve_by_id() {
        let g = line_graph();
        assert_eq!(g.resolve("2").unwrap().id, 2);
    }

    #[test]
    fn test_resolve_by_name_case_insensitive() {
        let g = line_graph();
        assert_eq!(g.resolve(" s3 ").unwrap().id, 3);
    }

    #[test]
    fn test_resolve_unknown_id_is_not_found() {
        let g = line_graph();
        assert_eq!(g.resolve("99").unwrap_err(), ScanError::LocationNotFound(99));
    }

    #[test]
    fn test_resolve_unknown_name_is_malformed() {
        let g = line_graph();
        assert!(matches!(g.resolve("Nowhere"), Err(ScanError::MalformedInput(_))));
        assert!(matches!(g.resolve(""), Err(ScanError::MalformedInput(_))));
    }
}
