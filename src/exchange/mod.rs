//! Venue integration for the arbitrage engine.
//!
//! - `traits`: the [`Venue`] interface the engine depends on
//! - `types`: books, orders, positions
//! - `mock`: in-memory venue with IOC matching, used for paper trading and tests

pub mod mock;
mod traits;
mod types;

pub use mock::{MockVenue, QuoteDriver, VenueCall};
pub use traits::Venue;
#[cfg(test)]
pub use traits::MockVenue as AutoMockVenue;
pub use types::*;
