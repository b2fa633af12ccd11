//! Periodic scan loop.
//!
//! Scans once immediately, then on a fixed interval until the stop flag
//! flips. Each tick re-reads the graph snapshot, so a refreshed snapshot
//! is picked up without a restart. Scans never overlap: the loop awaits
//! each one, and a stop request takes effect between ticks.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use super::notifier::AlertManager;
use super::scanner::DealScanner;
use crate::catalog::{Catalog, HullCatalog, UniverseCatalog};
use crate::config::{AppConfig, ScanOverrides};
use crate::market::MarketProvider;
use crate::report;
use crate::types::ScanReport;
use crate::universe::snapshot::try_load_graph;

pub struct ScanService {
    cfg: AppConfig,
    overrides: ScanOverrides,
    provider: Arc<dyn MarketProvider>,
    remote: Option<Arc<dyn Catalog>>,
    hulls: HullCatalog,
    alerts: AlertManager,
    interval: Duration,
}

impl ScanService {
    pub fn new(
        cfg: AppConfig,
        overrides: ScanOverrides,
        provider: Arc<dyn MarketProvider>,
        remote: Option<Arc<dyn Catalog>>,
    ) -> Self {
        let alerts = AlertManager::from_config(&cfg.notifications);
        let interval = Duration::from_secs(cfg.service.interval_secs.max(1));
        Self {
            cfg,
            overrides,
            provider,
            remote,
            hulls: HullCatalog::new(),
            alerts,
            interval,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_alerts(mut self, alerts: AlertManager) -> Self {
        self.alerts = alerts;
        self
    }

    /// Run until `stop` becomes `true` or its sender is dropped.
    /// Returns the number of ticks that ran.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> usize {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticks = 0;

        info!(interval_secs = self.interval.as_secs(), "Scan service started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = stop.changed() => {
                    if changed.is_err() {
                        info!("Stop channel closed");
                        break;
                    }
                    if !*stop.borrow() {
                        continue;
                    }
                }
            }
            if *stop.borrow() {
                break;
            }

            self.run_once().await;
            ticks += 1;
        }

        info!(ticks, "Scan service stopped");
        ticks
    }

    /// One tick: reload the graph, scan, export, alert.
    pub async fn run_once(&mut self) -> Option<ScanReport> {
        let graph = try_load_graph(&self.cfg.data.graph_path).map(Arc::new);

        let params = match self
            .cfg
            .scan_params(&self.overrides, graph.as_deref(), &self.hulls)
        {
            Ok(params) => params,
            Err(e) => {
                error!(error = %e, "Invalid scan parameters, skipping tick");
                return None;
            }
        };

        let mut catalog = UniverseCatalog::new(self.hulls.clone(), graph.clone());
        if let Some(remote) = &self.remote {
            catalog = catalog.with_remote(remote.clone());
        }
        let mut scanner = DealScanner::new(self.provider.clone(), Arc::new(catalog), graph);
        let report = scanner.scan(&params).await;

        info!(%report, "Tick complete");
        if let Some(best) = report.best_deal() {
            info!(best = %best, "Best deal");
        }

        if self.cfg.export.enabled && !report.deals.is_empty() {
            let dir = &self.cfg.export.output_dir;
            if let Err(e) = report::export_deals(&report.deals, dir, &report.reference_name) {
                warn!(error = %e, "Deal export failed");
            }
        }
        self.alerts
            .notify_deals(&report.deals, &report.reference_name)
            .await;

        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::notifier::Notifier;
    use crate::market::snapshot::OrderSnapshot;
    use crate::types::Order;
    use crate::universe::fixtures::line_graph;
    use crate::universe::snapshot::to_json;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Counter(Arc<Mutex<usize>>);

    #[async_trait]
    impl Notifier for Counter {
        async fn notify(&self, _title: &str, _message: &str) -> Result<()> {
            *self.0.lock().unwrap() += 1;
            Ok(())
        }

        fn name(&self) -> &str {
            "counter"
        }
    }

    fn sell(order_id: u64, location_id: u64, region_id: u64, price: f64) -> Order {
        Order {
            order_id,
            type_id: 641,
            location_id,
            region_id,
            price,
            volume_remain: 1,
            is_buy: false,
        }
    }

    fn temp_dir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("marketbot_service_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Config pointing at a line-graph snapshot, reference S1, hub in region 9.
    fn setup() -> (AppConfig, Arc<OrderSnapshot>, PathBuf) {
        let dir = temp_dir();
        let graph_path = dir.join("graph.json");
        std::fs::write(&graph_path, to_json(&line_graph()).unwrap()).unwrap();

        let mut cfg = AppConfig::default();
        cfg.scan.reference_system = "S1".into();
        cfg.scan.max_jumps = 2;
        cfg.scan.min_price = 0.0;
        cfg.scan.hull_ids = vec![641];
        cfg.hub.location_id = 900;
        cfg.hub.region_id = 9;
        cfg.data.graph_path = graph_path;
        cfg.export.output_dir = dir.join("deals");
        cfg.notifications.min_savings_percent = 0.0;

        let snapshot = Arc::new(OrderSnapshot::new([
            sell(1, 3, 2, 100.0),
            sell(2, 900, 9, 150.0),
        ]));
        (cfg, snapshot, dir)
    }

    #[tokio::test]
    async fn test_run_once_exports_and_alerts() {
        let (cfg, snapshot, dir) = setup();
        let counter = Counter::default();
        let alerts = AlertManager::new(true, 0.0, 5, vec![Box::new(counter.clone())]);
        let mut service =
            ScanService::new(cfg, ScanOverrides::default(), snapshot, None).with_alerts(alerts);

        let report = service.run_once().await.unwrap();
        assert!(!report.fallback_used);
        assert_eq!(report.deals.len(), 1);
        assert_eq!(report.deals[0].location_name, "S3");
        assert_eq!(report.deals[0].type_name, "Megathron");

        let exported = std::fs::read_dir(dir.join("deals")).unwrap().count();
        assert_eq!(exported, 1);
        assert_eq!(*counter.0.lock().unwrap(), 1);

        // Same deal next tick: no second alert.
        service.run_once().await.unwrap();
        assert_eq!(*counter.0.lock().unwrap(), 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_graph_reloaded_each_tick() {
        let (cfg, snapshot, dir) = setup();
        let graph_path = cfg.data.graph_path.clone();
        let mut service = ScanService::new(cfg, ScanOverrides::default(), snapshot, None);

        assert!(!service.run_once().await.unwrap().fallback_used);

        // Graph disappears: the next tick searches the fallback regions.
        std::fs::remove_file(&graph_path).unwrap();
        let report = service.run_once().await.unwrap();
        assert!(report.fallback_used);
        assert!(report.deals.is_empty());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_stop_before_start_runs_nothing() {
        let (cfg, snapshot, dir) = setup();
        let service = ScanService::new(cfg, ScanOverrides::default(), snapshot, None);
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        assert_eq!(service.run(rx).await, 0);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_first_scan_is_immediate_then_stops() {
        let (cfg, snapshot, dir) = setup();
        let service = ScanService::new(cfg, ScanOverrides::default(), snapshot, None)
            .with_interval(Duration::from_secs(3600));
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(service.run(rx));
        tokio::time::sleep(Duration::from_millis(300)).await;
        tx.send(true).unwrap();

        assert_eq!(handle.await.unwrap(), 1);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_clearing_stop_flag_does_not_scan() {
        let (cfg, snapshot, dir) = setup();
        let service = ScanService::new(cfg, ScanOverrides::default(), snapshot, None)
            .with_interval(Duration::from_secs(3600));
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(service.run(rx));
        tokio::time::sleep(Duration::from_millis(300)).await;
        for _ in 0..3 {
            tx.send(false).unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        tx.send(true).unwrap();

        // Only the immediate first tick ran.
        assert_eq!(handle.await.unwrap(), 1);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
