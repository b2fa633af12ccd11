//! In-memory order snapshot.
//!
//! Loads a JSON array of orders (a market dump downloaded out-of-band) and
//! answers queries from a per-type index. A missing or unreadable file
//! yields an empty snapshot: every query then returns no orders.
//!
//! Dumps may use either the native `Order` shape or the ESI / EVE Ref
//! record shape (`system_id`, `is_buy_order`).

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use super::MarketProvider;
use crate::types::{LocationId, Order, OrderId, RegionId, Side, TypeId};

const PROVIDER_NAME: &str = "snapshot";

/// One record of a market dump.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DumpRecord {
    Esi(EsiRecord),
    Native(Order),
}

/// ESI / EVE Ref order record. `location_id` there is the station, so the
/// system comes from `system_id`.
#[derive(Debug, Deserialize)]
struct EsiRecord {
    order_id: OrderId,
    type_id: TypeId,
    system_id: LocationId,
    region_id: RegionId,
    price: f64,
    volume_remain: u64,
    is_buy_order: bool,
}

impl From<DumpRecord> for Order {
    fn from(record: DumpRecord) -> Self {
        match record {
            DumpRecord::Native(order) => order,
            DumpRecord::Esi(r) => Order {
                order_id: r.order_id,
                type_id: r.type_id,
                location_id: r.system_id,
                region_id: r.region_id,
                price: r.price,
                volume_remain: r.volume_remain,
                is_buy: r.is_buy_order,
            },
        }
    }
}

/// Parse a JSON array of dump records.
pub fn parse_orders(json: &str) -> Result<Vec<Order>> {
    let records: Vec<DumpRecord> =
        serde_json::from_str(json).context("Failed to parse market order dump")?;
    Ok(records.into_iter().map(Order::from).collect())
}

/// Read and parse a market dump file.
pub fn read_orders(path: &Path) -> Result<Vec<Order>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read order dump {}", path.display()))?;
    parse_orders(&json).with_context(|| format!("Invalid order dump {}", path.display()))
}

#[derive(Debug, Clone, Default)]
pub struct OrderSnapshot {
    by_type: HashMap<TypeId, Vec<Order>>,
    total: usize,
}

impl OrderSnapshot {
    pub fn new(orders: impl IntoIterator<Item = Order>) -> Self {
        let mut by_type: HashMap<TypeId, Vec<Order>> = HashMap::new();
        let mut total = 0;
        for order in orders {
            by_type.entry(order.type_id).or_default().push(order);
            total += 1;
        }
        Self { by_type, total }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let snapshot = Self::new(read_orders(path)?);
        info!(path = %path.display(), orders = snapshot.total, "Order snapshot loaded");
        Ok(snapshot)
    }

    pub fn load_or_empty(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!(error = %e, "Order snapshot unavailable, serving no orders");
            Self::default()
        })
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

#[async_trait]
impl MarketProvider for OrderSnapshot {
    async fn list_orders(
        &self,
        region_ids: &[RegionId],
        type_ids: &[TypeId],
        side: Side,
    ) -> Result<Vec<Order>> {
        Ok(type_ids
            .iter()
            .filter_map(|t| self.by_type.get(t))
            .flatten()
            .filter(|o| region_ids.contains(&o.region_id) && side.matches(o.is_buy))
            .cloned()
            .collect())
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }
}
