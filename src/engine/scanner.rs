//! Deal scanner.
//!
//! Runs one pass of the deal pipeline for a set of scan parameters:
//!
//! 1. Resolve which regions to search (graph walk, or the fallback list)
//! 2. Fetch sell listings per (type, region) and annotate them with the
//!    hop distance from the reference system
//! 3. Look up the hub's lowest sell price per type
//! 4. Keep listings priced at or below the hub
//! 5. Rank by savings percentage
//!
//! Every provider and catalog failure degrades to an empty result, a
//! placeholder name, or the unreachable sentinel. A scan never fails.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::evaluator::{evaluate, qualifies, rank_deals, ListingContext};
use crate::catalog::Catalog;
use crate::market::MarketProvider;
use crate::types::{
    Deal, LocationId, Order, RegionId, ScanParams, ScanReport, Side, TypeId,
    UNREACHABLE_DISTANCE,
};
use crate::universe::{explore, Discovery, LocationGraph};

/// Scanner with its own name and distance caches. Caches live as long as
/// the scanner; `&mut self` keeps them single-task.
pub struct DealScanner {
    provider: Arc<dyn MarketProvider>,
    catalog: Arc<dyn Catalog>,
    graph: Option<Arc<LocationGraph>>,
    type_names: HashMap<TypeId, String>,
    location_names: HashMap<LocationId, String>,
    /// Keyed by `(location, reference)`. `None` marks a location with no
    /// known route, so it is looked up once per scanner.
    distances: HashMap<(LocationId, LocationId), Option<u32>>,
}

/// Regions chosen for a scan.
struct Scope {
    regions: Vec<RegionId>,
    discovery: Option<Discovery>,
    fallback_used: bool,
}

impl DealScanner {
    pub fn new(
        provider: Arc<dyn MarketProvider>,
        catalog: Arc<dyn Catalog>,
        graph: Option<Arc<LocationGraph>>,
    ) -> Self {
        Self {
            provider,
            catalog,
            graph,
            type_names: HashMap::new(),
            location_names: HashMap::new(),
            distances: HashMap::new(),
        }
    }

    /// Ranked deals for `params`.
    pub async fn find_good_deals(&mut self, params: &ScanParams) -> Vec<Deal> {
        self.scan(params).await.deals
    }

    /// Run the full pipeline and report what was searched.
    pub async fn scan(&mut self, params: &ScanParams) -> ScanReport {
        let started_at = Utc::now();
        let scan_id = Uuid::new_v4();
        info!(
            scan_id = %scan_id,
            reference = %params.reference_name,
            max_hops = params.max_hops,
            types = params.type_ids.len(),
            provider = self.provider.name(),
            "Starting deal scan"
        );

        let scope = self.resolve_scope(params);
        let mut listings_considered = 0;
        let mut deals = Vec::new();

        for &type_id in &params.type_ids {
            let candidates = self.candidate_listings(params, &scope, type_id).await;
            listings_considered += candidates.len();
            if candidates.is_empty() {
                continue;
            }

            let hub_price = self.hub_price(params, type_id).await;
            if hub_price.is_none() {
                debug!(type_id, hub = %params.hub.name, "No hub price, type cannot qualify");
                continue;
            }

            let type_name = self.type_name(type_id).await;
            for (order, distance) in candidates {
                if !qualifies(order.price, hub_price) {
                    continue;
                }
                let ctx = ListingContext {
                    type_name: type_name.clone(),
                    location_name: self.location_name(order.location_id).await,
                    distance,
                };
                deals.extend(evaluate(&order, hub_price, ctx));
            }
        }

        rank_deals(&mut deals);

        let report = ScanReport {
            scan_id,
            started_at,
            finished_at: Utc::now(),
            reference_location_id: params.reference_location_id,
            reference_name: params.reference_name.clone(),
            max_hops: params.max_hops,
            regions: scope.regions,
            fallback_used: scope.fallback_used,
            listings_considered,
            deals,
        };
        info!(
            scan_id = %report.scan_id,
            regions = report.regions.len(),
            fallback = report.fallback_used,
            listings = report.listings_considered,
            deals = report.deals.len(),
            "Deal scan complete"
        );
        report
    }

    fn resolve_scope(&self, params: &ScanParams) -> Scope {
        let fallback = |reason: &str| {
            warn!(
                reason,
                reference = params.reference_location_id,
                "Using fallback regions"
            );
            let mut regions = params.fallback_region_ids.clone();
            regions.sort_unstable();
            regions.dedup();
            Scope {
                regions,
                discovery: None,
                fallback_used: true,
            }
        };

        let Some(graph) = &self.graph else {
            return fallback("no location graph loaded");
        };
        match explore(graph, params.reference_location_id, params.max_hops) {
            Ok(discovery) if !discovery.regions.is_empty() => Scope {
                regions: discovery.sorted_regions(),
                discovery: Some(discovery),
                fallback_used: false,
            },
            Ok(_) => fallback("no regions discovered"),
            Err(e) => fallback(&e.to_string()),
        }
    }

    /// Sell listings for one type across the scope, with their hop
    /// distance. Listings below `min_price` or beyond `max_hops` are dropped.
    async fn candidate_listings(
        &mut self,
        params: &ScanParams,
        scope: &Scope,
        type_id: TypeId,
    ) -> Vec<(Order, u32)> {
        let mut candidates = Vec::new();

        for &region_id in &scope.regions {
            let orders = match self
                .provider
                .list_orders(&[region_id], &[type_id], Side::Sell)
                .await
            {
                Ok(orders) => orders,
                Err(e) => {
                    warn!(error = %e, region_id, type_id, "Order fetch failed, skipping");
                    continue;
                }
            };
            debug!(region_id, type_id, orders = orders.len(), "Sell orders fetched");

            for order in orders {
                if order.is_buy || order.price < params.min_price {
                    continue;
                }
                let distance = match scope
                    .discovery
                    .as_ref()
                    .and_then(|d| d.distance_to(order.location_id))
                {
                    Some(hops) => Some(hops),
                    None => {
                        self.distance(order.location_id, params.reference_location_id)
                            .await
                    }
                };
                let Some(distance) = distance.filter(|&hops| hops <= params.max_hops) else {
                    continue;
                };
                candidates.push((order, distance));
            }
        }
        candidates
    }

    async fn hub_price(&self, params: &ScanParams, type_id: TypeId) -> Option<f64> {
        let hub = &params.hub;
        match self
            .provider
            .lowest_price(hub.region_id, type_id, Side::Sell, Some(hub.location_id))
            .await
        {
            Ok(price) => price,
            Err(e) => {
                warn!(error = %e, type_id, hub = %hub.name, "Hub price lookup failed");
                None
            }
        }
    }

    async fn type_name(&mut self, type_id: TypeId) -> String {
        if let Some(name) = self.type_names.get(&type_id) {
            return name.clone();
        }
        match self.catalog.name_for_type(type_id).await {
            Ok(name) => {
                self.type_names.insert(type_id, name.clone());
                name
            }
            Err(e) => {
                warn!(error = %e, type_id, "Type name lookup failed");
                format!("Unknown Type {type_id}")
            }
        }
    }

    async fn location_name(&mut self, location_id: LocationId) -> String {
        if let Some(name) = self.location_names.get(&location_id) {
            return name.clone();
        }
        match self.catalog.name_for_location(location_id).await {
            Ok(name) => {
                self.location_names.insert(location_id, name.clone());
                name
            }
            Err(e) => {
                warn!(error = %e, location_id, "System name lookup failed");
                format!("Unknown System {location_id}")
            }
        }
    }

    /// Jumps from `location_id` to the reference, `None` when there is no
    /// route or the lookup failed.
    async fn distance(&mut self, location_id: LocationId, reference_id: LocationId) -> Option<u32> {
        if let Some(&hops) = self.distances.get(&(location_id, reference_id)) {
            return hops;
        }
        let hops = match self.catalog.distance(location_id, reference_id).await {
            Ok(UNREACHABLE_DISTANCE) => {
                debug!(location_id, reference_id, "No route to reference");
                None
            }
            Ok(hops) => Some(hops),
            Err(e) => {
                warn!(error = %e, location_id, reference_id, "Distance lookup failed");
                None
            }
        };
        self.distances.insert((location_id, reference_id), hops);
        hops
    }
}
