//! Market data providers.
//!
//! Defines the `MarketProvider` trait and provides implementations for:
//! - ESI: the live, paginated game API
//! - a JSON order snapshot loaded wholesale into memory
//! - a SQLite order database (indexed local snapshot)
//!
//! The deal scanner only sees the trait; which backend runs is decided by
//! `[data].provider` in config.

pub mod esi;
pub mod snapshot;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::config::{DataConfig, ProviderKind};
use crate::types::{LocationId, Order, RegionId, Side, TypeId};

/// Abstraction over market order sources.
#[async_trait]
pub trait MarketProvider: Send + Sync {
    /// Fetch orders of `side` for any of `type_ids` in any of `region_ids`.
    async fn list_orders(
        &self,
        region_ids: &[RegionId],
        type_ids: &[TypeId],
        side: Side,
    ) -> Result<Vec<Order>>;

    /// Lowest price among matching orders in a region, optionally
    /// restricted to one solar system. `None` if nothing is listed.
    async fn lowest_price(
        &self,
        region_id: RegionId,
        type_id: TypeId,
        side: Side,
        location_id: Option<LocationId>,
    ) -> Result<Option<f64>> {
        let orders = self.list_orders(&[region_id], &[type_id], side).await?;
        Ok(orders
            .iter()
            .filter(|o| location_id.map_or(true, |loc| o.location_id == loc))
            .map(|o| o.price)
            .min_by(f64::total_cmp))
    }

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Build the configured provider. The ESI client is also returned as a
/// remote catalog so names and routes can be resolved online.
pub async fn build_provider(
    data: &DataConfig,
) -> Result<(Arc<dyn MarketProvider>, Option<Arc<dyn Catalog>>)> {
    let esi = Arc::new(esi::EsiClient::new(data.esi_base_url.as_deref())?);
    let remote: Option<Arc<dyn Catalog>> = if data.offline {
        None
    } else {
        Some(esi.clone() as Arc<dyn Catalog>)
    };

    let provider: Arc<dyn MarketProvider> = match data.provider {
        ProviderKind::Esi => esi as Arc<dyn MarketProvider>,
        ProviderKind::Snapshot => {
            Arc::new(snapshot::OrderSnapshot::load_or_empty(&data.orders_snapshot_path))
        }
        ProviderKind::Sqlite => match sqlite::SqliteMarket::connect(&data.sqlite_url).await {
            Ok(market) => Arc::new(market) as Arc<dyn MarketProvider>,
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "Market database unavailable, serving no orders");
                Arc::new(snapshot::OrderSnapshot::default()) as Arc<dyn MarketProvider>
            }
        },
    };
    tracing::info!(provider = provider.name(), "Market provider ready");
    Ok((provider, remote))
}
