//! Observability for the decision engine.
//!
//! Components emit events through an injected [`EventSink`] instead of
//! printing. [`TracingSink`] forwards events to `tracing`; [`LoopMetrics`]
//! accumulates counters and is returned as the run summary.

use crate::error::EngineError;
use crate::exchange::{OutstandingOrder, Positions, TradeIntent};
use crate::strategy::{HedgeAction, Opportunity};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

/// Why an order was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderReason {
    Arbitrage,
    UrgentHedge,
    GradualHedge,
}

/// Receiver for engine events. Every callback defaults to a no-op.
pub trait EventSink: Send {
    fn iteration_started(&mut self, _iteration: u64, _at: DateTime<Utc>) {}

    fn opportunity_detected(&mut self, _opportunity: &Opportunity) {}

    fn order_cancelled(&mut self, _order: &OutstandingOrder) {}

    fn order_submitted(&mut self, _intent: &TradeIntent, _volume: i64, _reason: OrderReason) {}

    /// A leg sized to zero and was not sent.
    fn leg_suppressed(&mut self, _intent: &TradeIntent, _position: i64) {}

    fn hedge_evaluated(&mut self, _positions: &Positions, _combined: i64, _action: HedgeAction) {}

    fn pnl_reported(&mut self, _pnl: Decimal) {}

    /// A tolerated data fault; the loop continues.
    fn data_fault(&mut self, _error: &EngineError) {}

    /// A fault that ends the loop.
    fn fatal_fault(&mut self, _error: &EngineError) {}
}

/// Sink that writes every event to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn iteration_started(&mut self, iteration: u64, at: DateTime<Utc>) {
        info!(iteration, at = %at.format("%Y-%m-%d %H:%M:%S"), "--- Iteration ---");
    }

    fn opportunity_detected(&mut self, opportunity: &Opportunity) {
        info!(
            direction = %opportunity.direction,
            leg_a = %format_intent(&opportunity.leg_a),
            leg_b = %format_intent(&opportunity.leg_b),
            edge = %opportunity.edge(),
            "Opportunity detected"
        );
    }

    fn order_cancelled(&mut self, order: &OutstandingOrder) {
        info!(
            instrument = %order.instrument,
            order_id = order.order_id,
            side = %order.side,
            price = %order.price,
            volume = order.volume,
            "Cancelled resting order"
        );
    }

    fn order_submitted(&mut self, intent: &TradeIntent, volume: i64, reason: OrderReason) {
        info!(
            instrument = %intent.instrument,
            side = %intent.side,
            price = %intent.reference_price,
            volume,
            reason = ?reason,
            "Placing IOC order"
        );
    }

    fn leg_suppressed(&mut self, intent: &TradeIntent, position: i64) {
        warn!(
            instrument = %intent.instrument,
            side = %intent.side,
            position,
            "Leg suppressed at position limit"
        );
    }

    fn hedge_evaluated(&mut self, positions: &Positions, combined: i64, action: HedgeAction) {
        match action {
            HedgeAction::None => debug!(%positions, combined, "Hedge within tolerance"),
            HedgeAction::UrgentBuy | HedgeAction::UrgentSell => {
                warn!(%positions, combined, action = ?action, "Hedge beyond action limit")
            }
            HedgeAction::GradualBuy | HedgeAction::GradualSell => {
                info!(%positions, combined, action = ?action, "Hedge outside tolerance")
            }
        }
    }

    fn pnl_reported(&mut self, pnl: Decimal) {
        info!(pnl = %pnl.round_dp(2), "PnL");
    }

    fn data_fault(&mut self, error: &EngineError) {
        warn!(error = %error, "Skipping step on missing market data");
    }

    fn fatal_fault(&mut self, error: &EngineError) {
        error!(error = %error, kind = ?error.kind(), "An error occurred, stopping loop");
    }
}

fn format_intent(intent: &TradeIntent) -> String {
    format!(
        "{} {} @ {}",
        intent.side, intent.instrument, intent.reference_price
    )
}

/// Counters accumulated over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopMetrics {
    pub iterations: u64,
    pub opportunities: u64,
    pub orders_submitted: u64,
    pub legs_suppressed: u64,
    pub orders_cancelled: u64,
    pub hedge_corrections: u64,
    pub data_faults: u64,
    pub last_pnl: Option<Decimal>,
}
