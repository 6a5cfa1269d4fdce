//! Reads the current books for the traded pair.

use crate::error::EngineResult;
use crate::exchange::{PriceBook, Venue};
use tracing::debug;

/// Books for both instruments taken in one pass.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    pub book_a: PriceBook,
    pub book_b: PriceBook,
}

#[derive(Debug, Clone)]
pub struct MarketSnapshotReader {
    instrument_a: String,
    instrument_b: String,
}

impl MarketSnapshotReader {
    pub fn new(instrument_a: impl Into<String>, instrument_b: impl Into<String>) -> Self {
        Self {
            instrument_a: instrument_a.into(),
            instrument_b: instrument_b.into(),
        }
    }

    /// Fetch A then B. Empty sides are passed through untouched.
    pub async fn read<V>(&self, venue: &V) -> EngineResult<MarketSnapshot>
    where
        V: Venue + ?Sized,
    {
        let book_a = venue.get_last_price_book(&self.instrument_a).await?;
        let book_b = venue.get_last_price_book(&self.instrument_b).await?;

        debug!(
            bid_a = ?book_a.best_bid().map(|l| l.price),
            ask_a = ?book_a.best_ask().map(|l| l.price),
            bid_b = ?book_b.best_bid().map(|l| l.price),
            ask_b = ?book_b.best_ask().map(|l| l.price),
            "Market snapshot"
        );

        Ok(MarketSnapshot { book_a, book_b })
    }
}
