//! Venue connectivity trait.
//!
//! The decision engine talks to the trading venue exclusively through
//! [`Venue`]. The venue is treated as the single source of truth for
//! positions and resting orders: nothing it reports is cached or reconciled
//! locally.

use super::types::{OrderId, OrderType, OutstandingOrder, Positions, PriceBook, Side};
use crate::error::VenueError;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Operations the engine needs from a venue session.
///
/// Calls are awaited one at a time by a single control flow; implementations
/// do not need to support concurrent use.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Venue: Send + Sync {
    /// Best-effort current snapshot of an instrument's book. Sides may be empty.
    async fn get_last_price_book(&self, instrument: &str) -> Result<PriceBook, VenueError>;

    /// Authoritative signed net position per instrument.
    async fn get_positions(&self) -> Result<Positions, VenueError>;

    /// All currently resting orders for an instrument, keyed by order id.
    async fn get_outstanding_orders(
        &self,
        instrument: &str,
    ) -> Result<HashMap<OrderId, OutstandingOrder>, VenueError>;

    /// Request cancellation. Success is not re-checked by the caller.
    async fn cancel_order(&self, instrument: &str, order_id: OrderId) -> Result<(), VenueError>;

    /// Fire-and-forget order submission; no fill confirmation is awaited.
    async fn insert_order(
        &self,
        instrument: &str,
        price: Decimal,
        volume: i64,
        side: Side,
        order_type: OrderType,
    ) -> Result<(), VenueError>;

    /// Current realized plus unrealized profit and loss.
    async fn get_pnl(&self) -> Result<Decimal, VenueError>;
}
