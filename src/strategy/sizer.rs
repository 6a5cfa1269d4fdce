//! Position-aware order sizing.

use crate::exchange::Side;

/// Clamps order volume so that a fill can never take an instrument's
/// position beyond `max_position` in either direction.
#[derive(Debug, Clone, Copy)]
pub struct OrderSizer {
    max_position: i64,
}

impl OrderSizer {
    pub fn new(max_position: i64) -> Self {
        Self { max_position }
    }

    /// Room left to buy before hitting the long cap.
    pub fn max_buy(&self, position: i64) -> i64 {
        (self.max_position - position).max(0)
    }

    /// Room left to sell before hitting the short cap.
    pub fn max_sell(&self, position: i64) -> i64 {
        (position + self.max_position).max(0)
    }

    /// Effective volume for an order of `base_size` on `side`.
    ///
    /// Zero means the leg must not be submitted.
    pub fn size(&self, position: i64, base_size: i64, side: Side) -> i64 {
        let room = if side.is_buy() {
            self.max_buy(position)
        } else {
            self.max_sell(position)
        };
        base_size.min(room).max(0)
    }
}
