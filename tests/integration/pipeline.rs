//! Deal pipeline scenarios.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

use marketbot::catalog::{Catalog, HullCatalog, UniverseCatalog};
use marketbot::config::{AppConfig, ScanOverrides, DEFAULT_FALLBACK_REGIONS};
use marketbot::engine::DealScanner;
use marketbot::market::sqlite::SqliteMarket;
use marketbot::market::MarketProvider;
use marketbot::types::{Location, LocationId, ScanParams, TypeId};
use marketbot::universe::snapshot::{to_json, try_load_graph};
use marketbot::universe::LocationGraph;
use sqlx::sqlite::SqlitePoolOptions;

use crate::mock_market::{sell, MockMarket};

const MEGATHRON: TypeId = 641;
const DOMINIX: TypeId = 645;

const SOSALA: LocationId = 30002558;
const DITAL: LocationId = 30002557;
const TARARAN: LocationId = 30002543;
const JITA: LocationId = 30000142;

const BLEAK_LANDS: u64 = 10000038;
const DOMAIN: u64 = 10000043;
const THE_FORGE: u64 = 10000002;

fn system(id: LocationId, name: &str, region_id: u64, region_name: &str, adjacent: &[LocationId]) -> Location {
    Location {
        id,
        name: name.into(),
        region_id,
        region_name: region_name.into(),
        adjacent: adjacent.to_vec(),
    }
}

/// Sosala - Dital - Tararan, with Jita unconnected.
fn graph() -> LocationGraph {
    LocationGraph::from_locations([
        system(SOSALA, "Sosala", BLEAK_LANDS, "The Bleak Lands", &[DITAL]),
        system(DITAL, "Dital", BLEAK_LANDS, "The Bleak Lands", &[SOSALA, TARARAN]),
        system(TARARAN, "Tararan", DOMAIN, "Domain", &[DITAL]),
        system(JITA, "Jita", THE_FORGE, "The Forge", &[]),
    ])
}

fn params(graph: Option<&LocationGraph>, system: &str, jumps: u32) -> ScanParams {
    let overrides = ScanOverrides {
        system: Some(system.into()),
        max_jumps: Some(jumps),
        min_price: Some(0.0),
        hull_ids: Some(vec![MEGATHRON]),
        ship_type: None,
    };
    AppConfig::default()
        .scan_params(&overrides, graph, &HullCatalog::new())
        .unwrap()
}

fn scanner(provider: Arc<dyn MarketProvider>, graph: Option<LocationGraph>) -> DealScanner {
    let graph = graph.map(Arc::new);
    let catalog = UniverseCatalog::new(HullCatalog::new(), graph.clone());
    DealScanner::new(provider, Arc::new(catalog), graph)
}

/// Fixed jump counts for systems the graph does not know.
struct FixedRoutes(u32);

#[async_trait]
impl Catalog for FixedRoutes {
    async fn name_for_type(&self, type_id: TypeId) -> Result<String> {
        Ok(format!("Type {type_id}"))
    }

    async fn name_for_location(&self, location_id: LocationId) -> Result<String> {
        Ok(format!("System {location_id}"))
    }

    async fn distance(&self, _from: LocationId, _to: LocationId) -> Result<u32> {
        Ok(self.0)
    }
}

#[tokio::test]
async fn cheaper_listing_two_jumps_out_qualifies() {
    let market = Arc::new(MockMarket::new(vec![
        sell(1, MEGATHRON, TARARAN, DOMAIN, 100.0),
        sell(2, MEGATHRON, JITA, THE_FORGE, 150.0),
    ]));
    let g = graph();
    let p = params(Some(&g), "Sosala", 2);
    let report = scanner(market, Some(g)).scan(&p).await;

    assert_eq!(report.regions, vec![BLEAK_LANDS, DOMAIN]);
    assert!(!report.fallback_used);
    assert_eq!(report.deals.len(), 1);

    let deal = &report.deals[0];
    assert_eq!(deal.type_name, "Megathron");
    assert_eq!(deal.location_name, "Tararan");
    assert_eq!(deal.distance, 2);
    assert_eq!(deal.price, 100.0);
    assert_eq!(deal.hub_price, 150.0);
    assert_eq!(deal.savings, 50.0);
    assert!((deal.savings_percent - 33.33).abs() < 0.01);
}

#[tokio::test]
async fn pricier_listing_is_excluded() {
    let market = Arc::new(MockMarket::new(vec![
        sell(1, MEGATHRON, TARARAN, DOMAIN, 200.0),
        sell(2, MEGATHRON, JITA, THE_FORGE, 150.0),
    ]));
    let g = graph();
    let p = params(Some(&g), "Sosala", 2);
    assert!(scanner(market, Some(g)).find_good_deals(&p).await.is_empty());
}

#[tokio::test]
async fn zero_hub_price_gives_zero_percent() {
    let market = Arc::new(MockMarket::new(vec![
        sell(1, MEGATHRON, DITAL, BLEAK_LANDS, 0.0),
        sell(2, MEGATHRON, JITA, THE_FORGE, 0.0),
    ]));
    let g = graph();
    let p = params(Some(&g), "Sosala", 2);
    let deals = scanner(market, Some(g)).find_good_deals(&p).await;
    assert_eq!(deals.len(), 1);
    assert_eq!(deals[0].savings_percent, 0.0);
}

#[tokio::test]
async fn hop_budget_limits_regions_searched() {
    let market = Arc::new(MockMarket::new(vec![
        sell(1, MEGATHRON, TARARAN, DOMAIN, 100.0),
        sell(2, MEGATHRON, DITAL, BLEAK_LANDS, 120.0),
        sell(3, MEGATHRON, JITA, THE_FORGE, 150.0),
    ]));
    let g = graph();
    let p = params(Some(&g), "Sosala", 1);
    let report = scanner(market, Some(g)).scan(&p).await;

    assert_eq!(report.regions, vec![BLEAK_LANDS]);
    assert_eq!(report.deals.iter().map(|d| d.order_id).collect::<Vec<_>>(), vec![2]);
}

#[tokio::test]
async fn provider_order_does_not_change_results() {
    let orders = vec![
        sell(1, MEGATHRON, TARARAN, DOMAIN, 100.0),
        sell(2, MEGATHRON, DITAL, BLEAK_LANDS, 120.0),
        sell(3, MEGATHRON, SOSALA, BLEAK_LANDS, 90.0),
        sell(4, MEGATHRON, DITAL, BLEAK_LANDS, 500.0),
        sell(5, MEGATHRON, JITA, THE_FORGE, 150.0),
    ];
    let g = graph();
    let p = params(Some(&g), "Sosala", 2);

    let forward = scanner(Arc::new(MockMarket::new(orders.clone())), Some(g.clone()))
        .find_good_deals(&p)
        .await;
    let backward = scanner(Arc::new(MockMarket::new(orders).reversed()), Some(g))
        .find_good_deals(&p)
        .await;

    let ids = |deals: &[marketbot::types::Deal]| deals.iter().map(|d| d.order_id).collect::<Vec<_>>();
    assert_eq!(ids(&forward), vec![3, 1, 2]);
    assert_eq!(ids(&forward), ids(&backward));
}

#[tokio::test]
async fn missing_graph_searches_fallback_regions() {
    let market = Arc::new(MockMarket::new(vec![
        sell(1, MEGATHRON, 30002187, DOMAIN, 100.0),
        sell(2, MEGATHRON, JITA, THE_FORGE, 150.0),
    ]));
    let p = params(None, "Sosala", 4);
    let mut scanner = DealScanner::new(market.clone(), Arc::new(FixedRoutes(3)), None);
    let report = scanner.scan(&p).await;

    let mut expected = DEFAULT_FALLBACK_REGIONS.to_vec();
    expected.sort_unstable();
    assert!(report.fallback_used);
    assert_eq!(report.regions, expected);
    // One listing query per fallback region, plus the hub lookup.
    assert_eq!(market.calls(), expected.len() + 1);

    assert_eq!(report.deals.len(), 1);
    assert_eq!(report.deals[0].distance, 3);
    assert_eq!(report.deals[0].location_name, "System 30002187");
}

#[tokio::test]
async fn unknown_start_falls_back() {
    let market = Arc::new(MockMarket::new(vec![]));
    let g = graph();
    let p = params(Some(&g), "31000005", 2);
    let report = scanner(market, Some(g)).scan(&p).await;

    assert!(report.fallback_used);
    let regions: HashSet<u64> = report.regions.iter().copied().collect();
    assert_eq!(regions, DEFAULT_FALLBACK_REGIONS.into_iter().collect());
    assert!(report.deals.is_empty());
}

#[tokio::test]
async fn failing_region_does_not_abort_scan() {
    let market = Arc::new(MockMarket::new(vec![
        sell(1, MEGATHRON, TARARAN, DOMAIN, 100.0),
        sell(2, MEGATHRON, DITAL, BLEAK_LANDS, 120.0),
        sell(3, MEGATHRON, JITA, THE_FORGE, 150.0),
    ]));
    market.fail_region(DOMAIN);
    let g = graph();
    let p = params(Some(&g), "Sosala", 2);
    let deals = scanner(market, Some(g)).find_good_deals(&p).await;

    assert_eq!(deals.iter().map(|d| d.order_id).collect::<Vec<_>>(), vec![2]);
}

#[tokio::test]
async fn failing_hub_region_means_no_deals() {
    let market = Arc::new(MockMarket::new(vec![
        sell(1, MEGATHRON, DITAL, BLEAK_LANDS, 1.0),
        sell(2, MEGATHRON, JITA, THE_FORGE, 150.0),
    ]));
    market.fail_region(THE_FORGE);
    let g = graph();
    let p = params(Some(&g), "Sosala", 2);
    assert!(scanner(market, Some(g)).find_good_deals(&p).await.is_empty());
}

#[tokio::test]
async fn graph_snapshot_file_drives_scan() {
    let mut path = std::env::temp_dir();
    path.push(format!("marketbot_graph_{}.json", uuid::Uuid::new_v4()));
    std::fs::write(&path, to_json(&graph()).unwrap()).unwrap();

    let loaded = try_load_graph(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let market = Arc::new(MockMarket::new(vec![
        sell(1, MEGATHRON, SOSALA, BLEAK_LANDS, 140.0),
        sell(2, MEGATHRON, JITA, THE_FORGE, 150.0),
    ]));
    let p = params(Some(&loaded), "dital", 0);
    assert_eq!(p.reference_location_id, DITAL);

    let report = scanner(market, Some(loaded)).scan(&p).await;
    assert_eq!(report.regions, vec![BLEAK_LANDS]);
    // Sosala is one jump from Dital, beyond a zero-jump budget.
    assert!(report.deals.is_empty());
}

#[tokio::test]
async fn sqlite_backend_end_to_end() {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let market = SqliteMarket::from_pool(pool);
    market.ensure_schema().await.unwrap();
    market
        .insert_orders(&[
            sell(1, MEGATHRON, TARARAN, DOMAIN, 100.0),
            sell(2, DOMINIX, DITAL, BLEAK_LANDS, 80.0),
            sell(3, MEGATHRON, JITA, THE_FORGE, 150.0),
            sell(4, DOMINIX, JITA, THE_FORGE, 100.0),
            sell(5, DOMINIX, JITA + 1, THE_FORGE, 10.0),
        ])
        .await
        .unwrap();

    let g = graph();
    let mut p = params(Some(&g), "Sosala", 2);
    p.type_ids = vec![MEGATHRON, DOMINIX];
    let deals = scanner(Arc::new(market), Some(g)).find_good_deals(&p).await;

    // Dominix saves 20% against Jita (the 10 ISK order is outside the hub system).
    assert_eq!(deals.iter().map(|d| d.order_id).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(deals[1].type_name, "Dominix");
    assert_eq!(deals[1].hub_price, 100.0);
}

#[tokio::test]
async fn imported_dump_backs_sqlite_scan() {
    let dir = std::env::temp_dir().join(format!("marketbot_import_{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let dump = dir.join("orders.json");
    std::fs::write(
        &dump,
        serde_json::to_string(&[
            sell(1, MEGATHRON, TARARAN, DOMAIN, 100.0),
            sell(2, MEGATHRON, JITA, THE_FORGE, 150.0),
        ])
        .unwrap(),
    )
    .unwrap();

    let url = format!("sqlite://{}", dir.join("orders.db").display());
    let market = SqliteMarket::connect(&url).await.unwrap();
    assert_eq!(market.import_file(&dump).await.unwrap(), 2);

    let g = graph();
    let p = params(Some(&g), "Sosala", 2);
    let deals = scanner(Arc::new(market), Some(g)).find_good_deals(&p).await;
    assert_eq!(deals.iter().map(|d| d.order_id).collect::<Vec<_>>(), vec![1]);
    assert_eq!(deals[0].hub_price, 150.0);

    std::fs::remove_dir_all(&dir).unwrap();
}
