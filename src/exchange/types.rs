//! Type definitions for venue market data, orders and positions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Venue-assigned order identifier.
pub type OrderId = u64;

/// A single price level in a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    pub volume: i64,
}

impl PriceLevel {
    pub fn new(price: Decimal, volume: i64) -> Self {
        Self { price, volume }
    }
}

/// Last known price book for one instrument.
///
/// Both sides are ordered best-first: bids by descending price, asks by
/// ascending price. Either side may be empty when there is no liquidity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBook {
    pub instrument: String,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

impl PriceBook {
    /// Create an empty book for an instrument.
    pub fn empty(instrument: impl Into<String>) -> Self {
        Self {
            instrument: instrument.into(),
            bids: Vec::new(),
            asks: Vec::new(),
        }
    }

    /// Create a book, sorting both sides best-first.
    pub fn new(
        instrument: impl Into<String>,
        mut bids: Vec<PriceLevel>,
        mut asks: Vec<PriceLevel>,
    ) -> Self {
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));
        Self {
            instrument: instrument.into(),
            bids,
            asks,
        }
    }

    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    /// Midpoint of the touch, if both sides are quoted.
    pub fn mid(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid.price + ask.price) / Decimal::TWO),
            _ => None,
        }
    }
}

/// Order side in venue terms: `Bid` buys, `Ask` sells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    pub fn is_buy(&self) -> bool {
        matches!(self, Side::Bid)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => write!(f, "buy"),
            Side::Ask => write!(f, "sell"),
        }
    }
}

/// Order type accepted by the venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Immediate-or-cancel: fills what it can now, remainder is cancelled
    Ioc,
    /// Rests in the book until filled or cancelled
    Limit,
}

/// An order resting at the venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutstandingOrder {
    pub order_id: OrderId,
    pub instrument: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    pub volume: i64,
    pub side: Side,
}

/// Net signed position per instrument, as reported by the venue.
///
/// An instrument with no entry is flat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Positions(HashMap<String, i64>);

impl Positions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, instrument: &str) -> i64 {
        self.0.get(instrument).copied().unwrap_or(0)
    }

    pub fn set(&mut self, instrument: impl Into<String>, position: i64) {
        self.0.insert(instrument.into(), position);
    }

    /// Apply a signed fill to an instrument's position.
    pub fn apply(&mut self, instrument: &str, delta: i64) {
        *self.0.entry(instrument.to_string()).or_insert(0) += delta;
    }

    /// Combined exposure across a pair of instruments.
    pub fn combined(&self, a: &str, b: &str) -> i64 {
        self.get(a) + self.get(b)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &i64)> {
        self.0.iter()
    }
}

impl From<HashMap<String, i64>> for Positions {
    fn from(map: HashMap<String, i64>) -> Self {
        Self(map)
    }
}

impl fmt::Display for Positions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self.0.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        let rendered: Vec<String> = entries.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{{{}}}", rendered.join(", "))
    }
}

/// One leg of a trade decided within a single iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeIntent {
    pub instrument: String,
    pub side: Side,
    pub reference_price: Decimal,
    pub base_volume: i64,
}
