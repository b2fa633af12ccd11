//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.
//! Every scan request builds its own parameters and scanner; the only
//! thing requests share is the read-only config, provider and graph.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::catalog::{parse_hull_ids, Catalog, HullCatalog, HullInfo, ShipClass, UniverseCatalog};
use crate::config::{AppConfig, ScanOverrides};
use crate::engine::DealScanner;
use crate::market::MarketProvider;
use crate::report;
use crate::types::{Deal, LocationId, RegionId, ScanError, ScanReport, TypeId};
use crate::universe::LocationGraph;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub cfg: AppConfig,
    pub provider: Arc<dyn MarketProvider>,
    pub remote: Option<Arc<dyn Catalog>>,
    pub hulls: HullCatalog,
    pub graph: Option<Arc<LocationGraph>>,
    pub latest: RwLock<Option<ScanReport>>,
}

impl DashboardState {
    pub fn new(
        cfg: AppConfig,
        provider: Arc<dyn MarketProvider>,
        remote: Option<Arc<dyn Catalog>>,
        graph: Option<Arc<LocationGraph>>,
    ) -> Self {
        Self {
            cfg,
            provider,
            remote,
            hulls: HullCatalog::new(),
            graph,
            latest: RwLock::new(None),
        }
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScanRequest {
    pub system: Option<String>,
    pub jumps: Option<i64>,
    /// Comma-separated hull type ids.
    pub hulls: Option<String>,
    #[serde(alias = "shipType")]
    pub ship_type: Option<String>,
    pub min_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanResponse {
    pub deals: Vec<Deal>,
    pub reference_system: String,
    pub max_jumps: u32,
    /// Hull ids as requested, `null` when the ship type decided.
    pub hull_ids: Option<Vec<TypeId>>,
    pub ship_type: ShipClass,
    pub regions: Vec<RegionId>,
    pub fallback_used: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HullQuery {
    pub class: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HullEntry {
    pub id: TypeId,
    pub name: String,
    pub category: String,
    pub class: ShipClass,
}

impl From<&HullInfo> for HullEntry {
    fn from(h: &HullInfo) -> Self {
        Self {
            id: h.id,
            name: h.name.to_string(),
            category: h.category.to_string(),
            class: h.category.class(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemEntry {
    pub id: LocationId,
    pub name: String,
    pub region_id: RegionId,
    pub region_name: String,
}

/// JSON error body with its HTTP status.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip)]
    pub status: StatusCode,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            status: StatusCode::BAD_REQUEST,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            status: StatusCode::NOT_FOUND,
        }
    }
}

impl From<ScanError> for ApiError {
    fn from(e: ScanError) -> Self {
        let status = match e {
            ScanError::MalformedInput(_) | ScanError::LocationNotFound(_) => {
                StatusCode::BAD_REQUEST
            }
            ScanError::DataUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self {
            error: e.to_string(),
            status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// GET /api/hulls?class=battleship|cruiser|command_ship
pub async fn get_hulls(
    State(state): State<AppState>,
    Query(query): Query<HullQuery>,
) -> Result<Json<Vec<HullEntry>>, ApiError> {
    let class = match query.class.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(s) => Some(s.parse::<ShipClass>()?),
    };
    Ok(Json(hull_entries(&state.hulls, class)))
}

/// GET /api/battleships
pub async fn get_battleships(State(state): State<AppState>) -> Json<Vec<HullEntry>> {
    Json(hull_entries(&state.hulls, Some(ShipClass::Battleship)))
}

/// GET /api/cruisers
pub async fn get_cruisers(State(state): State<AppState>) -> Json<Vec<HullEntry>> {
    Json(hull_entries(&state.hulls, Some(ShipClass::Cruiser)))
}

/// GET /api/command-ships
pub async fn get_command_ships(State(state): State<AppState>) -> Json<Vec<HullEntry>> {
    Json(hull_entries(&state.hulls, Some(ShipClass::CommandShip)))
}

fn hull_entries(hulls: &HullCatalog, class: Option<ShipClass>) -> Vec<HullEntry> {
    let classes = match class {
        Some(c) => vec![c],
        None => vec![ShipClass::Battleship, ShipClass::Cruiser, ShipClass::CommandShip],
    };
    classes
        .into_iter()
        .flat_map(|c| hulls.by_class(c))
        .map(HullEntry::from)
        .collect()
}

/// GET /api/systems
pub async fn get_systems(State(state): State<AppState>) -> Json<Vec<SystemEntry>> {
    let mut systems: Vec<SystemEntry> = state
        .graph
        .iter()
        .flat_map(|g| g.locations())
        .map(|l| SystemEntry {
            id: l.id,
            name: l.name.clone(),
            region_id: l.region_id,
            region_name: l.region_name.clone(),
        })
        .collect();
    systems.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    Json(systems)
}

/// GET /api/scans/latest
pub async fn get_latest_scan(State(state): State<AppState>) -> Result<Json<ScanReport>, ApiError> {
    state
        .latest
        .read()
        .await
        .clone()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("no scan has run yet"))
}

/// POST /api/scan
pub async fn post_scan(
    State(state): State<AppState>,
    payload: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<Json<ScanResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let (overrides, requested_hulls) = overrides_from_request(&req)?;
    let ship_type = overrides.ship_type.unwrap_or(state.cfg.scan.ship_type);

    let params = state
        .cfg
        .scan_params(&overrides, state.graph.as_deref(), &state.hulls)?;

    let mut catalog = UniverseCatalog::new(state.hulls.clone(), state.graph.clone());
    if let Some(remote) = &state.remote {
        catalog = catalog.with_remote(remote.clone());
    }
    let mut scanner = DealScanner::new(
        state.provider.clone(),
        Arc::new(catalog),
        state.graph.clone(),
    );
    let report = scanner.scan(&params).await;
    info!(%report, "Dashboard scan complete");

    if state.cfg.export.enabled && !report.deals.is_empty() {
        if let Err(e) =
            report::export_deals(&report.deals, &state.cfg.export.output_dir, &report.reference_name)
        {
            warn!(error = %e, "Deal export failed");
        }
    }

    let response = ScanResponse {
        deals: report.deals.clone(),
        reference_system: report.reference_name.clone(),
        max_jumps: report.max_hops,
        hull_ids: requested_hulls,
        ship_type,
        regions: report.regions.clone(),
        fallback_used: report.fallback_used,
    };
    *state.latest.write().await = Some(report);
    Ok(Json(response))
}

/// Validate a scan request. Blank strings count as absent.
fn overrides_from_request(
    req: &ScanRequest,
) -> Result<(ScanOverrides, Option<Vec<TypeId>>), ScanError> {
    let non_blank = |s: &Option<String>| {
        s.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let max_jumps = req
        .jumps
        .map(|j| {
            u32::try_from(j).map_err(|_| ScanError::MalformedInput(format!("invalid jumps: {j}")))
        })
        .transpose()?;
    let hull_ids = non_blank(&req.hulls)
        .map(|s| parse_hull_ids(&s))
        .transpose()?;
    let ship_type = non_blank(&req.ship_type)
        .map(|s| s.parse::<ShipClass>())
        .transpose()?;

    let overrides = ScanOverrides {
        system: non_blank(&req.system),
        max_jumps,
        min_price: req.min_price,
        hull_ids: hull_ids.clone(),
        ship_type,
    };
    Ok((overrides, hull_ids))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
