//! # Dual Listing Arbitrage
//!
//! Decision engine for trading the two share classes of a dual-listed
//! security against each other while keeping their combined position flat.
//!
//! ## Architecture
//!
//! - `config`: Configuration loading and validation
//! - `exchange`: Venue trait, market data types and an in-memory venue
//! - `strategy`: Opportunity detection, sizing, execution and hedging
//! - `engine`: The fixed-cadence control loop
//! - `report`: Event sink and run metrics
//! - `error`: Venue and engine error taxonomy

pub mod config;
pub mod engine;
pub mod error;
pub mod exchange;
pub mod report;
pub mod strategy;

pub use config::Config;
pub use engine::{ControlLoop, RunSummary, Termination};
pub use error::{EngineError, FaultKind, VenueError};
