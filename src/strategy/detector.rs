//! Cross-instrument arbitrage detection.

use crate::exchange::{PriceBook, Side, TradeIntent};
use rust_decimal::Decimal;
use std::fmt;
use tracing::debug;

/// Which way the pair is mispriced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// A bid is rich relative to B ask
    SellABuyB,
    /// B bid is rich relative to A ask
    BuyASellB,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::SellABuyB => write!(f, "sell_a/buy_b"),
            Direction::BuyASellB => write!(f, "buy_a/sell_b"),
        }
    }
}

/// A detected dislocation, expressed as one intent per instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opportunity {
    pub direction: Direction,
    pub leg_a: TradeIntent,
    pub leg_b: TradeIntent,
}

impl Opportunity {
    /// Gross price gap captured if both legs fill.
    pub fn edge(&self) -> Decimal {
        match self.direction {
            Direction::SellABuyB => self.leg_a.reference_price - self.leg_b.reference_price,
            Direction::BuyASellB => self.leg_b.reference_price - self.leg_a.reference_price,
        }
    }
}

/// Compares the touch of both books for a gap wider than `min_spread`.
#[derive(Debug, Clone)]
pub struct OpportunityDetector {
    instrument_a: String,
    instrument_b: String,
    min_spread: Decimal,
    trade_size: i64,
}

impl OpportunityDetector {
    pub fn new(
        instrument_a: impl Into<String>,
        instrument_b: impl Into<String>,
        min_spread: Decimal,
        trade_size: i64,
    ) -> Self {
        Self {
            instrument_a: instrument_a.into(),
            instrument_b: instrument_b.into(),
            min_spread,
            trade_size,
        }
    }

    /// Check both directions, selling A first. At most one opportunity is
    /// returned per snapshot. A direction with an empty book side is skipped.
    pub fn detect(&self, book_a: &PriceBook, book_b: &PriceBook) -> Option<Opportunity> {
        if let (Some(bid_a), Some(ask_b)) = (book_a.best_bid(), book_b.best_ask()) {
            if bid_a.price > ask_b.price + self.min_spread {
                debug!(
                    bid_a = %bid_a.price,
                    ask_b = %ask_b.price,
                    min_spread = %self.min_spread,
                    "A bid through B ask"
                );
                return Some(self.opportunity(
                    Direction::SellABuyB,
                    bid_a.price,
                    ask_b.price,
                ));
            }
        }

        if let (Some(ask_a), Some(bid_b)) = (book_a.best_ask(), book_b.best_bid()) {
            if bid_b.price > ask_a.price + self.min_spread {
                debug!(
                    ask_a = %ask_a.price,
                    bid_b = %bid_b.price,
                    min_spread = %self.min_spread,
                    "B bid through A ask"
                );
                return Some(self.opportunity(
                    Direction::BuyASellB,
                    ask_a.price,
                    bid_b.price,
                ));
            }
        }

        None
    }

    fn opportunity(&self, direction: Direction, price_a: Decimal, price_b: Decimal) -> Opportunity {
        let (side_a, side_b) = match direction {
            Direction::SellABuyB => (Side::Ask, Side::Bid),
            Direction::BuyASellB => (Side::Bid, Side::Ask),
        };

        Opportunity {
            direction,
            leg_a: TradeIntent {
                instrument: self.instrument_a.clone(),
                side: side_a,
                reference_price: price_a,
                base_volume: self.trade_size,
            },
            leg_b: TradeIntent {
                instrument: self.instrument_b.clone(),
                side: side_b,
                reference_price: price_b,
                base_volume: self.trade_size,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::PriceLevel;
    use rust_decimal_macros::dec;

    fn detector() -> OpportunityDetector {
        OpportunityDetector::new("PHILIPS_A", "PHILIPS_B", dec!(0.2), 10)
    }

    fn book(instrument: &str, bid: Option<Decimal>, ask: Option<Decimal>) -> PriceBook {
        PriceBook::new(
            instrument,
            bid.map(|p| vec![PriceLevel::new(p, 50)]).unwrap_or_default(),
            ask.map(|p| vec![PriceLevel::new(p, 50)]).unwrap_or_default(),
        )
    }

    #[test]
    fn test_sell_a_buy_b_detected() {
        let a = book("PHILIPS_A", Some(dec!(10.30)), Some(dec!(10.40)));
        let b = book("PHILIPS_B", Some(dec!(9.90)), Some(dec!(10.00)));

        let opp = detector().detect(&a, &b).expect("10.30 > 10.00 + 0.2");
        assert_eq!(opp.direction, Direction::SellABuyB);
        assert_eq!(opp.leg_a.side, Side::Ask);
        assert_eq!(opp.leg_a.reference_price, dec!(10.30));
        assert_eq!(opp.leg_b.side, Side::Bid);
        assert_eq!(opp.leg_b.reference_price, dec!(10.00));
        assert_eq!(opp.leg_a.base_volume, 10);
        assert_eq!(opp.edge(), dec!(0.30));
    }

    #[test]
    fn test_gap_inside_min_spread_is_not_an_opportunity() {
        let a = book("PHILIPS_A", Some(dec!(10.15)), Some(dec!(10.25)));
        let b = book("PHILIPS_B", Some(dec!(9.95)), Some(dec!(10.00)));

        // 10.15 > 10.20 is false and 9.95 > 10.45 is false
        assert!(detector().detect(&a, &b).is_none());
    }

    #[test]
    fn test_gap_equal_to_min_spread_is_not_an_opportunity() {
        let a = book("PHILIPS_A", Some(dec!(10.20)), None);
        let b = book("PHILIPS_B", None, Some(dec!(10.00)));
        assert!(detector().detect(&a, &b).is_none());
    }

    #[test]
    fn test_reverse_direction_checked_when_first_fails() {
        let a = book("PHILIPS_A", Some(dec!(10.15)), Some(dec!(10.20)));
        let b = book("PHILIPS_B", Some(dec!(10.45)), Some(dec!(10.50)));

        let opp = detector().detect(&a, &b).unwrap();
        assert_eq!(opp.direction, Direction::BuyASellB);
        assert_eq!(opp.leg_a.side, Side::Bid);
        assert_eq!(opp.leg_a.reference_price, dec!(10.20));
        assert_eq!(opp.leg_b.side, Side::Ask);
        assert_eq!(opp.leg_b.reference_price, dec!(10.45));
    }

    #[test]
    fn test_empty_required_side_skips_direction() {
        // A bid is far through where B ask would be, but B has no asks
        let a = book("PHILIPS_A", Some(dec!(12.00)), None);
        let b = book("PHILIPS_B", Some(dec!(9.00)), None);
        assert!(detector().detect(&a, &b).is_none());

        // B bid is far through A, but A has no asks
        let a = book("PHILIPS_A", None, None);
        let b = book("PHILIPS_B", Some(dec!(15.00)), Some(dec!(15.10)));
        assert!(detector().detect(&a, &b).is_none());
    }

    #[test]
    fn test_sell_a_takes_priority() {
        // Crossed on both sides at once (only possible with stale data)
        let a = book("PHILIPS_A", Some(dec!(11.00)), Some(dec!(9.00)));
        let b = book("PHILIPS_B", Some(dec!(11.00)), Some(dec!(9.00)));

        let opp = detector().detect(&a, &b).unwrap();
        assert_eq!(opp.direction, Direction::SellABuyB);
    }
}
