//! Shared types for marketbot.
//!
//! These types form the data model used across all modules so that the
//! universe, market, catalog, and engine modules can depend on them
//! without circular references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type LocationId = u64;
pub type RegionId = u64;
pub type TypeId = u64;
pub type OrderId = u64;

/// Hop count reported when two locations are not connected.
pub const UNREACHABLE_DISTANCE: u32 = 999;

// ---------------------------------------------------------------------------
// Universe
// ---------------------------------------------------------------------------

/// A solar system in the location graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub region_id: RegionId,
    pub region_name: String,
    /// Adjacent system ids. May reference ids missing from the graph.
    pub adjacent: Vec<LocationId>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) in {}", self.name, self.id, self.region_name)
    }
}

/// The fixed trade hub used as the price baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hub {
    pub location_id: LocationId,
    pub region_id: RegionId,
    pub name: String,
}

impl Default for Hub {
    fn default() -> Self {
        Self {
            location_id: 30000142,
            region_id: 10000002,
            name: "Jita".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Query-string form used by the ESI API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }

    pub fn matches(&self, is_buy: bool) -> bool {
        match self {
            Side::Buy => is_buy,
            Side::Sell => !is_buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A market order as returned by any `MarketProvider` backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub type_id: TypeId,
    /// Solar system the order is listed in.
    pub location_id: LocationId,
    pub region_id: RegionId,
    pub price: f64,
    pub volume_remain: u64,
    pub is_buy: bool,
}

// ---------------------------------------------------------------------------
// Deals
// ---------------------------------------------------------------------------

/// A sell listing priced at or below the hub baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub type_id: TypeId,
    pub type_name: String,
    pub price: f64,
    pub hub_price: f64,
    pub savings: f64,
    pub savings_percent: f64,
    pub location_id: LocationId,
    pub location_name: String,
    /// Jumps from the reference system.
    pub distance: u32,
    pub volume_remain: u64,
    pub order_id: OrderId,
}

impl fmt::Display for Deal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in {} ({}j) for {:.2} ISK (hub {:.2}, saves {:.2} / {:.2}%)",
            self.type_name,
            self.location_name,
            self.distance,
            self.price,
            self.hub_price,
            self.savings,
            self.savings_percent,
        )
    }
}

/// Immutable parameters for one scan. Built per invocation or request,
/// never shared mutably.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanParams {
    pub type_ids: Vec<TypeId>,
    pub reference_location_id: LocationId,
    pub reference_name: String,
    pub max_hops: u32,
    pub min_price: f64,
    pub hub: Hub,
    /// Regions searched when discovery cannot run.
    pub fallback_region_ids: Vec<RegionId>,
}

/// Summary of a single scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub scan_id: uuid::Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub reference_location_id: LocationId,
    pub reference_name: String,
    pub max_hops: u32,
    pub regions: Vec<RegionId>,
    pub fallback_used: bool,
    pub listings_considered: usize,
    pub deals: Vec<Deal>,
}

impl ScanReport {
    pub fn best_deal(&self) -> Option<&Deal> {
        self.deals.first()
    }
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Scan {}: reference={} hops={} regions={}{} listings={} deals={}",
            self.scan_id,
            self.reference_name,
            self.max_hops,
            self.regions.len(),
            if self.fallback_used { " (fallback)" } else { "" },
            self.listings_considered,
            self.deals.len(),
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for marketbot.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScanError {
    #[error("Location not found: {0}")]
    LocationNotFound(LocationId),

    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
