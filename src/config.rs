//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! table and field has a default, so an empty file is a valid config.
//! Command-line and HTTP overrides never touch `AppConfig`; they are folded
//! into a fresh `ScanParams` per invocation via [`AppConfig::scan_params`].

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::catalog::{HullCatalog, ShipClass};
use crate::types::{Hub, LocationId, RegionId, ScanError, ScanParams, TypeId};
use crate::universe::LocationGraph;

/// Regions searched when the graph cannot be walked: Lonetrek, The Bleak
/// Lands, Domain, Heimatar, Devoid.
pub const DEFAULT_FALLBACK_REGIONS: [RegionId; 5] =
    [10000016, 10000038, 10000043, 10000030, 10000036];

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub scan: ScanConfig,
    pub hub: Hub,
    pub data: DataConfig,
    pub service: ServiceConfig,
    pub notifications: NotificationsConfig,
    pub export: ExportConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScanConfig {
    /// Reference system name (or numeric id).
    pub reference_system: String,
    /// Id used for `reference_system` when no graph is loaded.
    pub reference_system_id: LocationId,
    pub max_jumps: u32,
    /// Listings cheaper than this are ignored (ISK).
    pub min_price: f64,
    pub ship_type: ShipClass,
    /// Explicit hull list; overrides `ship_type` when non-empty.
    pub hull_ids: Vec<TypeId>,
    pub fallback_region_ids: Vec<RegionId>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            reference_system: "Sosala".to_string(),
            reference_system_id: 30002558,
            max_jumps: 4,
            min_price: 100_000_000.0,
            ship_type: ShipClass::Battleship,
            hull_ids: Vec::new(),
            fallback_region_ids: DEFAULT_FALLBACK_REGIONS.to_vec(),
        }
    }
}

/// Market data backend.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Esi,
    Snapshot,
    Sqlite,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DataConfig {
    pub provider: ProviderKind,
    pub graph_path: PathBuf,
    pub orders_snapshot_path: PathBuf,
    pub sqlite_url: String,
    pub esi_base_url: Option<String>,
    /// Never call ESI for names or routes.
    pub offline: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Esi,
            graph_path: PathBuf::from("data/universe_graph.json"),
            orders_snapshot_path: PathBuf::from("data/market_orders.json"),
            sqlite_url: "sqlite://data/market_orders.db".to_string(),
            esi_base_url: None,
            offline: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub interval_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self { interval_secs: 3600 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NotificationsConfig {
    pub enabled: bool,
    pub min_savings_percent: f64,
    pub max_notifications: usize,
    /// Also raise desktop notifications through `notify-send`.
    pub desktop: bool,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_savings_percent: 10.0,
            max_notifications: 5,
            desktop: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExportConfig {
    pub enabled: bool,
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output_dir: PathBuf::from("data/deals"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

/// Per-invocation overrides from the CLI or an HTTP request.
#[derive(Debug, Clone, Default)]
pub struct ScanOverrides {
    pub system: Option<String>,
    pub max_jumps: Option<u32>,
    pub min_price: Option<f64>,
    pub hull_ids: Option<Vec<TypeId>>,
    pub ship_type: Option<ShipClass>,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Build the parameters for one scan from config plus overrides.
    ///
    /// Hull precedence: explicit ids, then an overriding ship class, then
    /// `scan.hull_ids`, then `scan.ship_type`.
    pub fn scan_params(
        &self,
        overrides: &ScanOverrides,
        graph: Option<&LocationGraph>,
        hulls: &HullCatalog,
    ) -> Result<ScanParams, ScanError> {
        let system = overrides
            .system
            .as_deref()
            .unwrap_or(&self.scan.reference_system);
        let (reference_location_id, reference_name) = self.resolve_reference(system, graph)?;

        let min_price = overrides.min_price.unwrap_or(self.scan.min_price);
        if !min_price.is_finite() || min_price < 0.0 {
            return Err(ScanError::MalformedInput(format!("invalid min price: {min_price}")));
        }

        let type_ids = match (&overrides.hull_ids, overrides.ship_type) {
            (Some(ids), _) => ids.clone(),
            (None, Some(class)) => hulls.type_ids(class),
            (None, None) if !self.scan.hull_ids.is_empty() => self.scan.hull_ids.clone(),
            (None, None) => hulls.type_ids(self.scan.ship_type),
        };
        if type_ids.is_empty() {
            return Err(ScanError::MalformedInput("no hull ids to scan".into()));
        }

        Ok(ScanParams {
            type_ids,
            reference_location_id,
            reference_name,
            max_hops: overrides.max_jumps.unwrap_or(self.scan.max_jumps),
            min_price,
            hub: self.hub.clone(),
            fallback_region_ids: self.scan.fallback_region_ids.clone(),
        })
    }

    /// Turn a system name or id into `(id, display name)`.
    ///
    /// Numeric ids are accepted even when absent from the graph (the scan
    /// then searches the fallback regions). Names must be known to the
    /// graph or match the configured reference system.
    fn resolve_reference(
        &self,
        input: &str,
        graph: Option<&LocationGraph>,
    ) -> Result<(LocationId, String), ScanError> {
        let input = input.trim();
        let configured = || {
            if input.eq_ignore_ascii_case(self.scan.reference_system.trim()) {
                Some((self.scan.reference_system_id, self.scan.reference_system.clone()))
            } else {
                None
            }
        };

        if let Some(graph) = graph {
            match graph.resolve(input) {
                Ok(loc) => return Ok((loc.id, loc.name.clone())),
                Err(ScanError::LocationNotFound(id)) => return Ok((id, self.name_for_id(id))),
                Err(e) => return configured().ok_or(e),
            }
        }

        if input.is_empty() {
            return Err(ScanError::MalformedInput("empty system name".into()));
        }
        if let Ok(id) = input.parse::<LocationId>() {
            return Ok((id, self.name_for_id(id)));
        }
        configured().ok_or_else(|| ScanError::MalformedInput(format!("unknown system: {input}")))
    }

    fn name_for_id(&self, id: LocationId) -> String {
        if id == self.scan.reference_system_id {
            self.scan.reference_system.clone()
        } else {
            id.to_string()
        }
    }
}
