//! Combined-position hedge correction.
//!
//! Keeps `position(A) + position(B)` near zero with a three-tier policy: a
//! dead band, a gradual correction zone and an urgent zone. Buy corrections
//! lift A's best ask, sell corrections hit B's best bid.
//!
//! Corrections use the fixed trade size and do not go through
//! [`OrderSizer`](super::OrderSizer), so a correction can push an instrument
//! past the position cap.

use crate::error::{EngineError, EngineResult};
use crate::exchange::{OrderType, Side, TradeIntent, Venue};
use crate::report::{EventSink, OrderReason};
use rust_decimal::Decimal;
use tracing::debug;

/// Outcome of evaluating the combined position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HedgeAction {
    None,
    UrgentBuy,
    UrgentSell,
    GradualBuy,
    GradualSell,
}

impl HedgeAction {
    pub fn side(&self) -> Option<Side> {
        match self {
            HedgeAction::None => None,
            HedgeAction::UrgentBuy | HedgeAction::GradualBuy => Some(Side::Bid),
            HedgeAction::UrgentSell | HedgeAction::GradualSell => Some(Side::Ask),
        }
    }

    pub fn is_urgent(&self) -> bool {
        matches!(self, HedgeAction::UrgentBuy | HedgeAction::UrgentSell)
    }

    fn reason(&self) -> OrderReason {
        if self.is_urgent() {
            OrderReason::UrgentHedge
        } else {
            OrderReason::GradualHedge
        }
    }
}

/// Result of one hedge pass.
///
/// Positions are those observed before any correction was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HedgeOutcome {
    pub pos_a: i64,
    pub pos_b: i64,
    pub combined: i64,
    pub action: HedgeAction,
    /// The corrective order sent, if any
    pub order: Option<TradeIntent>,
}

impl HedgeOutcome {
    pub fn positions(&self) -> (i64, i64) {
        (self.pos_a, self.pos_b)
    }
}

#[derive(Debug, Clone)]
pub struct HedgeManager {
    instrument_a: String,
    instrument_b: String,
    tolerance: i64,
    action_limit: i64,
    trade_size: i64,
}

impl HedgeManager {
    pub fn new(
        instrument_a: impl Into<String>,
        instrument_b: impl Into<String>,
        tolerance: i64,
        action_limit: i64,
        trade_size: i64,
    ) -> Self {
        Self {
            instrument_a: instrument_a.into(),
            instrument_b: instrument_b.into(),
            tolerance,
            action_limit,
            trade_size,
        }
    }

    /// Classify a combined position. Branches are checked in order and the
    /// first match wins.
    pub fn decide(&self, combined: i64) -> HedgeAction {
        if (-self.tolerance..=self.tolerance).contains(&combined) {
            HedgeAction::None
        } else if combined < -self.action_limit {
            HedgeAction::UrgentBuy
        } else if combined > self.action_limit {
            HedgeAction::UrgentSell
        } else if combined < -self.tolerance {
            HedgeAction::GradualBuy
        } else {
            HedgeAction::GradualSell
        }
    }

    /// Fetch positions, decide, and submit at most one corrective IOC order.
    pub async fn rebalance<V>(&self, venue: &V, sink: &mut dyn EventSink) -> EngineResult<HedgeOutcome>
    where
        V: Venue + ?Sized,
    {
        let positions = venue.get_positions().await?;
        let pos_a = positions.get(&self.instrument_a);
        let pos_b = positions.get(&self.instrument_b);
        let combined = pos_a + pos_b;
        let action = self.decide(combined);

        sink.hedge_evaluated(&positions, combined, action);

        let mut outcome = HedgeOutcome {
            pos_a,
            pos_b,
            combined,
            action,
            order: None,
        };

        let Some(side) = action.side() else {
            return Ok(outcome);
        };

        let intent = match self.corrective_intent(venue, side).await {
            Ok(intent) => intent,
            Err(e) if !e.is_fatal() => {
                sink.data_fault(&e);
                return Ok(outcome);
            }
            Err(e) => return Err(e),
        };

        venue
            .insert_order(
                &intent.instrument,
                intent.reference_price,
                intent.base_volume,
                intent.side,
                OrderType::Ioc,
            )
            .await?;
        sink.order_submitted(&intent, intent.base_volume, action.reason());

        debug!(
            combined,
            action = ?action,
            instrument = %intent.instrument,
            "Hedge correction sent"
        );

        outcome.order = Some(intent);
        Ok(outcome)
    }

    /// Build the correction order against a freshly read book.
    async fn corrective_intent<V>(&self, venue: &V, side: Side) -> EngineResult<TradeIntent>
    where
        V: Venue + ?Sized,
    {
        let instrument = match side {
            Side::Bid => &self.instrument_a,
            Side::Ask => &self.instrument_b,
        };
        let book = venue.get_last_price_book(instrument).await?;

        let touch: Option<Decimal> = match side {
            Side::Bid => book.best_ask().map(|level| level.price),
            Side::Ask => book.best_bid().map(|level| level.price),
        };
        let price = touch.ok_or_else(|| EngineError::MissingLiquidity {
            instrument: instrument.clone(),
            side: if side.is_buy() { "ask" } else { "bid" },
        })?;

        Ok(TradeIntent {
            instrument: instrument.clone(),
            side,
            reference_price: price,
            base_volume: self.trade_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FaultKind, VenueError};
    use crate::exchange::{AutoMockVenue, MockVenue, PriceBook, PriceLevel, VenueCall};
    use crate::report::testing::RecordingSink;
    use rust_decimal_macros::dec;

    const A: &str = "PHILIPS_A";
    const B: &str = "PHILIPS_B";

    fn manager() -> HedgeManager {
        HedgeManager::new(A, B, 3, 9, 10)
    }

    async fn venue_with(pos_a: i64, pos_b: i64) -> MockVenue {
        let venue = MockVenue::new([A, B]);
        venue
            .set_book(PriceBook::new(
                A,
                vec![PriceLevel::new(dec!(29.95), 50)],
                vec![PriceLevel::new(dec!(30.05), 50)],
            ))
            .await;
        venue
            .set_book(PriceBook::new(
                B,
                vec![PriceLevel::new(dec!(29.90), 50)],
                vec![PriceLevel::new(dec!(30.00), 50)],
            ))
            .await;
        venue.set_position(A, pos_a).await;
        venue.set_position(B, pos_b).await;
        venue
    }

    #[test]
    fn test_decide_tiers() {
        let hedger = manager();
        for combined in -3..=3 {
            assert_eq!(hedger.decide(combined), HedgeAction::None, "{}", combined);
        }
        assert_eq!(hedger.decide(-4), HedgeAction::GradualBuy);
        assert_eq!(hedger.decide(-9), HedgeAction::GradualBuy);
        assert_eq!(hedger.decide(-10), HedgeAction::UrgentBuy);
        assert_eq!(hedger.decide(4), HedgeAction::GradualSell);
        assert_eq!(hedger.decide(9), HedgeAction::GradualSell);
        assert_eq!(hedger.decide(10), HedgeAction::UrgentSell);
    }

    #[tokio::test]
    async fn test_no_order_inside_tolerance() {
        for (a, b) in [(0, 0), (10, -13), (-5, 8), (3, 0)] {
            let venue = venue_with(a, b).await;
            let mut sink = RecordingSink::default();

            let outcome = manager().rebalance(&venue, &mut sink).await.unwrap();

            assert_eq!(outcome.action, HedgeAction::None);
            assert!(outcome.order.is_none());
            assert!(venue.inserted_orders().await.is_empty());
        }
    }

    #[tokio::test]
    async fn test_urgent_buy_lifts_a_ask() {
        let venue = venue_with(-6, -4).await;
        let mut sink = RecordingSink::default();

        let outcome = manager().rebalance(&venue, &mut sink).await.unwrap();

        assert_eq!(outcome.combined, -10);
        assert_eq!(outcome.action, HedgeAction::UrgentBuy);
        assert_eq!(
            venue.inserted_orders().await,
            vec![VenueCall::InsertOrder {
                instrument: A.to_string(),
                price: dec!(30.05),
                volume: 10,
                side: Side::Bid,
                order_type: OrderType::Ioc,
            }]
        );
        assert_eq!(sink.count("order:PHILIPS_A:buy:10:UrgentHedge"), 1);
    }

    #[tokio::test]
    async fn test_gradual_buy_just_outside_tolerance() {
        let venue = venue_with(0, -4).await;
        let mut sink = RecordingSink::default();

        let outcome = manager().rebalance(&venue, &mut sink).await.unwrap();

        assert_eq!(outcome.action, HedgeAction::GradualBuy);
        assert_eq!(outcome.order.as_ref().map(|o| o.instrument.as_str()), Some(A));
        assert_eq!(sink.count("order:PHILIPS_A:buy:10:GradualHedge"), 1);
    }

    #[tokio::test]
    async fn test_sell_corrections_hit_b_bid() {
        for (pos_b, expected) in [(10, HedgeAction::UrgentSell), (5, HedgeAction::GradualSell)] {
            let venue = venue_with(0, pos_b).await;
            let mut sink = RecordingSink::default();

            let outcome = manager().rebalance(&venue, &mut sink).await.unwrap();

            assert_eq!(outcome.action, expected);
            let order = outcome.order.unwrap();
            assert_eq!(order.instrument, B);
            assert_eq!(order.side, Side::Ask);
            assert_eq!(order.reference_price, dec!(29.90));
        }
    }

    #[tokio::test]
    async fn test_returns_positions_observed_before_correction() {
        let venue = venue_with(-20, 0).await;
        let mut sink = RecordingSink::default();

        let outcome = manager().rebalance(&venue, &mut sink).await.unwrap();

        assert_eq!(outcome.positions(), (-20, 0));
        // The correction filled at the venue, but the outcome is pre-trade
        assert_eq!(venue.positions().await.get(A), -10);
    }

    #[tokio::test]
    async fn test_correction_ignores_position_cap() {
        // Known risk: A is near its long cap of 200, yet the urgent buy is
        // sent at full size and takes A to 205.
        let venue = venue_with(195, -215).await;
        let mut sink = RecordingSink::default();

        let outcome = manager().rebalance(&venue, &mut sink).await.unwrap();

        assert_eq!(outcome.action, HedgeAction::UrgentBuy);
        assert_eq!(outcome.order.unwrap().base_volume, 10);
        assert_eq!(venue.positions().await.get(A), 205);
    }

    #[tokio::test]
    async fn test_missing_touch_is_tolerated() {
        let venue = venue_with(0, -20).await;
        venue.set_book(PriceBook::empty(A)).await;
        let mut sink = RecordingSink::default();

        let outcome = manager().rebalance(&venue, &mut sink).await.unwrap();

        assert_eq!(outcome.action, HedgeAction::UrgentBuy);
        assert!(outcome.order.is_none());
        assert!(venue.inserted_orders().await.is_empty());
        assert_eq!(sink.count("data_fault:"), 1);
    }

    #[tokio::test]
    async fn test_missing_bid_on_sell_correction_is_tolerated() {
        let venue = venue_with(0, 6).await;
        venue
            .set_book(PriceBook::new(B, vec![], vec![PriceLevel::new(dec!(30.00), 50)]))
            .await;
        let mut sink = RecordingSink::default();

        let outcome = manager().rebalance(&venue, &mut sink).await.unwrap();

        assert_eq!(outcome.action, HedgeAction::GradualSell);
        assert!(outcome.order.is_none());
        assert!(venue.inserted_orders().await.is_empty());
        assert_eq!(sink.count("data_fault:"), 1);
        assert_eq!(sink.count("order:"), 0);
    }

    #[tokio::test]
    async fn test_venue_fault_propagates() {
        let mut venue = AutoMockVenue::new();
        venue
            .expect_get_positions()
            .times(1)
            .returning(|| Err(VenueError::Timeout("positions".into())));
        venue.expect_insert_order().never();
        let mut sink = RecordingSink::default();

        let err = manager().rebalance(&venue, &mut sink).await.unwrap_err();

        assert_eq!(err.kind(), FaultKind::Transient);
        assert!(sink.events.is_empty());
    }
}
