//! Trading decision logic.
//!
//! Contains the core logic for:
//! - Reading both books each cycle
//! - Cross-instrument opportunity detection
//! - Position-aware order sizing
//! - Cancel-then-submit execution
//! - Combined hedge correction

mod detector;
mod executor;
mod hedge;
mod market;
mod sizer;

pub use detector::{Direction, Opportunity, OpportunityDetector};
pub use executor::{ExecutionCoordinator, ExecutionReport};
pub use hedge::{HedgeAction, HedgeManager, HedgeOutcome};
pub use market::{MarketSnapshot, MarketSnapshotReader};
pub use sizer::OrderSizer;
