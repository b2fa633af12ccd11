//! EVE Swagger Interface (ESI) client.
//!
//! Live market orders, type/system metadata, and routes.
//!
//! API docs: https://esi.evetech.net/ui/
//! Base URL: https://esi.evetech.net/latest
//! Auth: Not required for any endpoint used here.
//! Pagination: `page` query param, total pages in the `X-Pages` header.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use super::MarketProvider;
use crate::catalog::Catalog;
use crate::types::{LocationId, Order, RegionId, Side, TypeId, UNREACHABLE_DISTANCE};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub const DEFAULT_BASE_URL: &str = "https://esi.evetech.net/latest";
const PROVIDER_NAME: &str = "esi";

/// Hard stop for runaway pagination.
const MAX_PAGES: u32 = 50;

// ---------------------------------------------------------------------------
// API response types (ESI JSON → Rust)
// ---------------------------------------------------------------------------

/// Element of `/markets/{region_id}/orders/`.
#[derive(Debug, Deserialize)]
struct EsiOrder {
    order_id: u64,
    type_id: TypeId,
    system_id: LocationId,
    price: f64,
    volume_remain: u64,
    is_buy_order: bool,
}

/// `/universe/types/{id}/` and `/universe/systems/{id}/` share a `name`.
#[derive(Debug, Deserialize)]
struct EsiNamed {
    name: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct EsiClient {
    http: Client,
    base_url: String,
}

impl EsiClient {
    /// Create a client against `base_url` (defaults to the public ESI).
    pub fn new(base_url: Option<&str>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("marketbot/0.1.0 (hull deal scanner)")
            .build()
            .context("Failed to build HTTP client for ESI")?;

        Ok(Self {
            http,
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    // -- Internal helpers ------------------------------------------------

    /// Fetch every page of orders for one region/type pair.
    async fn region_orders(
        &self,
        region_id: RegionId,
        type_id: TypeId,
        side: Side,
    ) -> Result<Vec<Order>> {
        let url = format!("{}/markets/{region_id}/orders/", self.base_url);
        let mut orders = Vec::new();
        let mut page = 1u32;

        loop {
            debug!(url = %url, type_id, page, "Fetching ESI orders");
            let resp = self
                .http
                .get(&url)
                .query(&[
                    ("type_id", type_id.to_string()),
                    ("order_type", side.as_str().to_string()),
                    ("page", page.to_string()),
                ])
                .send()
                .await
                .context("ESI market request failed")?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                anyhow::bail!("ESI error {status} for region {region_id}: {body}");
            }

            let pages = resp
                .headers()
                .get("x-pages")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(1);

            let batch: Vec<EsiOrder> = resp
                .json()
                .await
                .context("Failed to parse ESI market orders")?;

            orders.extend(batch.into_iter().map(|o| Order {
                order_id: o.order_id,
                type_id: o.type_id,
                location_id: o.system_id,
                region_id,
                price: o.price,
                volume_remain: o.volume_remain,
                is_buy: o.is_buy_order,
            }));

            if page >= pages.min(MAX_PAGES) {
                break;
            }
            page += 1;
        }

        Ok(orders)
    }

    async fn fetch_name(&self, path: &str) -> Result<String> {
        let url = format!("{}{path}", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("ESI request failed: {path}"))?;

        if !resp.status().is_success() {
            anyhow::bail!("ESI error {} for {path}", resp.status());
        }

        let named: EsiNamed = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse ESI response for {path}"))?;
        Ok(named.name)
    }

    /// Route between two systems as a list of system ids, both ends
    /// included. `None` when ESI reports no route.
    pub async fn route(&self, from: LocationId, to: LocationId) -> Result<Option<Vec<LocationId>>> {
        let url = format!("{}/route/{from}/{to}/", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("ESI route request failed")?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            anyhow::bail!("ESI route error {} for {from} -> {to}", resp.status());
        }

        let route: Vec<LocationId> = resp.json().await.context("Failed to parse ESI route")?;
        Ok(if route.is_empty() { None } else { Some(route) })
    }
}

#[async_trait]
impl MarketProvider for EsiClient {
    async fn list_orders(
        &self,
        region_ids: &[RegionId],
        type_ids: &[TypeId],
        side: Side,
    ) -> Result<Vec<Order>> {
        let mut all = Vec::new();
        for &region_id in region_ids {
            for &type_id in type_ids {
                all.extend(self.region_orders(region_id, type_id, side).await?);
            }
        }
        Ok(all)
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }
}

#[async_trait]
impl Catalog for EsiClient {
    async fn name_for_type(&self, type_id: TypeId) -> Result<String> {
        self.fetch_name(&format!("/universe/types/{type_id}/")).await
    }

    async fn name_for_location(&self, location_id: LocationId) -> Result<String> {
        self.fetch_name(&format!("/universe/systems/{location_id}/")).await
    }

    async fn distance(&self, from: LocationId, to: LocationId) -> Result<u32> {
        if from == to {
            return Ok(0);
        }
        match self.route(from, to).await? {
            Some(route) => Ok(route.len().saturating_sub(1) as u32),
            None => {
                warn!(from, to, "No route between systems");
                Ok(UNREACHABLE_DISTANCE)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
