//! Deal qualification and ranking.
//!
//! Pure functions: a listing qualifies when it is priced at or below the
//! hub's lowest sell price. A missing hub price never qualifies.

use tracing::debug;

use crate::types::{Deal, Order};

/// Absolute and percentage savings of buying at `price` instead of the hub.
/// The percentage is 0 when the hub price is not positive.
pub fn savings(price: f64, hub_price: f64) -> (f64, f64) {
    let savings = hub_price - price;
    let percent = if hub_price > 0.0 {
        100.0 * savings / hub_price
    } else {
        0.0
    };
    (savings, percent)
}

pub fn qualifies(price: f64, hub_price: Option<f64>) -> bool {
    hub_price.is_some_and(|hub| price <= hub)
}

/// Display and travel context for a listing.
#[derive(Debug, Clone)]
pub struct ListingContext {
    pub type_name: String,
    pub location_name: String,
    pub distance: u32,
}

/// Turn a sell listing into a deal if it beats the hub price.
pub fn evaluate(order: &Order, hub_price: Option<f64>, ctx: ListingContext) -> Option<Deal> {
    if !qualifies(order.price, hub_price) {
        return None;
    }
    let hub_price = hub_price?;
    let (savings, savings_percent) = savings(order.price, hub_price);

    debug!(
        type_id = order.type_id,
        location_id = order.location_id,
        price = order.price,
        hub_price,
        savings_percent,
        "Listing qualifies"
    );

    Some(Deal {
        type_id: order.type_id,
        type_name: ctx.type_name,
        price: order.price,
        hub_price,
        savings,
        savings_percent,
        location_id: order.location_id,
        location_name: ctx.location_name,
        distance: ctx.distance,
        volume_remain: order.volume_remain,
        order_id: order.order_id,
    })
}

/// Sort by savings percentage, best first. Stable: equal percentages keep
/// their input order.
pub fn rank_deals(deals: &mut [Deal]) {
    deals.sort_by(|a, b| b.savings_percent.total_cmp(&a.savings_percent));
}
