//! SQLite order database.
//!
//! Reads a `market_orders` table filled by `marketbot import` from a
//! market dump. Sell queries come back cheapest first.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use super::snapshot::read_orders;
use super::MarketProvider;
use crate::types::{LocationId, Order, RegionId, Side, TypeId};

const PROVIDER_NAME: &str = "sqlite";

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS market_orders (
    order_id      INTEGER PRIMARY KEY,
    type_id       INTEGER NOT NULL,
    location_id   INTEGER NOT NULL DEFAULT 0,
    system_id     INTEGER NOT NULL,
    region_id     INTEGER NOT NULL,
    volume_total  INTEGER NOT NULL DEFAULT 0,
    volume_remain INTEGER NOT NULL,
    price         REAL    NOT NULL,
    is_buy_order  INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_market_orders_lookup
    ON market_orders (type_id, region_id, is_buy_order, price);
"#;

pub struct SqliteMarket {
    pool: SqlitePool,
}

impl SqliteMarket {
    /// Open (creating if needed) the database at `url` and make sure the
    /// schema exists. A fresh database serves no orders.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid market database url {url}"))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open market database {url}"))?;
        let market = Self::from_pool(pool);
        market.ensure_schema().await?;
        Ok(market)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the table and index if they do not exist.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .context("Failed to create market_orders schema")?;
        Ok(())
    }

    /// Insert or replace orders. Returns the number of rows written.
    pub async fn insert_orders(&self, orders: &[Order]) -> Result<u64> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let mut written = 0;
        for o in orders {
            let result = sqlx::query(
                "INSERT OR REPLACE INTO market_orders \
                 (order_id, type_id, system_id, region_id, volume_remain, price, is_buy_order) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(o.order_id as i64)
            .bind(o.type_id as i64)
            .bind(o.location_id as i64)
            .bind(o.region_id as i64)
            .bind(o.volume_remain as i64)
            .bind(o.price)
            .bind(o.is_buy)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert order {}", o.order_id))?;
            written += result.rows_affected();
        }
        tx.commit().await.context("Failed to commit orders")?;
        Ok(written)
    }

    /// Load a JSON market dump into the table.
    pub async fn import_file(&self, path: &Path) -> Result<u64> {
        let orders = read_orders(path)?;
        self.ensure_schema().await?;
        let written = self.insert_orders(&orders).await?;
        info!(path = %path.display(), orders = orders.len(), written, "Market dump imported");
        Ok(written)
    }

    fn row_to_order(row: &SqliteRow) -> Result<Order> {
        Ok(Order {
            order_id: row.try_get::<i64, _>("order_id")? as u64,
            type_id: row.try_get::<i64, _>("type_id")? as u64,
            location_id: row.try_get::<i64, _>("system_id")? as u64,
            region_id: row.try_get::<i64, _>("region_id")? as u64,
            price: row.try_get("price")?,
            volume_remain: row.try_get::<i64, _>("volume_remain")?.max(0) as u64,
            is_buy: row.try_get("is_buy_order")?,
        })
    }
}

#[async_trait]
impl MarketProvider for SqliteMarket {
    async fn list_orders(
        &self,
        region_ids: &[RegionId],
        type_ids: &[TypeId],
        side: Side,
    ) -> Result<Vec<Order>> {
        let mut orders = Vec::new();
        for &region_id in region_ids {
            for &type_id in type_ids {
                let rows = sqlx::query(
                    "SELECT order_id, type_id, system_id, region_id, price, volume_remain, is_buy_order \
                     FROM market_orders \
                     WHERE type_id = ? AND region_id = ? AND is_buy_order = ? \
                     ORDER BY price ASC",
                )
                .bind(type_id as i64)
                .bind(region_id as i64)
                .bind(side == Side::Buy)
                .fetch_all(&self.pool)
                .await
                .with_context(|| format!("Order query failed for type {type_id} in region {region_id}"))?;

                debug!(region_id, type_id, rows = rows.len(), "SQLite orders");
                for row in &rows {
                    orders.push(Self::row_to_order(row)?);
                }
            }
        }
        Ok(orders)
    }

    async fn lowest_price(
        &self,
        region_id: RegionId,
        type_id: TypeId,
        side: Side,
        location_id: Option<LocationId>,
    ) -> Result<Option<f64>> {
        let location = location_id.map(|l| l as i64);
        let row = sqlx::query(
            "SELECT MIN(price) AS lowest FROM market_orders \
             WHERE region_id = ? AND type_id = ? AND is_buy_order = ? \
             AND (? IS NULL OR system_id = ?)",
        )
        .bind(region_id as i64)
        .bind(type_id as i64)
        .bind(side == Side::Buy)
        .bind(location)
        .bind(location)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Lowest price query failed for type {type_id}"))?;

        Ok(row.try_get::<Option<f64>, _>("lowest")?)
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }
}
