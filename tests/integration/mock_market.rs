//! Mock market for integration testing.
//!
//! Provides a deterministic `MarketProvider` that serves a fixed order
//! book from memory, can be told to fail for chosen regions, and counts
//! the calls it receives.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use marketbot::market::MarketProvider;
use marketbot::types::{Order, RegionId, Side, TypeId};

pub struct MockMarket {
    orders: Vec<Order>,
    /// Serve matching orders last-to-first.
    reversed: bool,
    failing_regions: Mutex<HashSet<RegionId>>,
    calls: AtomicUsize,
}

impl MockMarket {
    pub fn new(orders: Vec<Order>) -> Self {
        Self {
            orders,
            reversed: false,
            failing_regions: Mutex::new(HashSet::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn reversed(mut self) -> Self {
        self.reversed = true;
        self
    }

    /// Every query touching `region_id` fails from now on.
    pub fn fail_region(&self, region_id: RegionId) {
        self.failing_regions.lock().unwrap().insert(region_id);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketProvider for MockMarket {
    async fn list_orders(
        &self,
        region_ids: &[RegionId],
        type_ids: &[TypeId],
        side: Side,
    ) -> Result<Vec<Order>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        {
            let failing = self.failing_regions.lock().unwrap();
            if let Some(r) = region_ids.iter().find(|r| failing.contains(r)) {
                return Err(anyhow!("region {r} unavailable"));
            }
        }

        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|o| region_ids.contains(&o.region_id))
            .filter(|o| type_ids.contains(&o.type_id))
            .filter(|o| side.matches(o.is_buy))
            .cloned()
            .collect();
        if self.reversed {
            orders.reverse();
        }
        Ok(orders)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

pub fn sell(order_id: u64, type_id: TypeId, location_id: u64, region_id: RegionId, price: f64) -> Order {
    Order {
        order_id,
        type_id,
        location_id,
        region_id,
        price,
        volume_remain: 1,
        is_buy: false,
    }
}
