//! Order execution for detected opportunities.
//!
//! Every execution cancels all resting orders on both instruments before it
//! sends anything, so that a stale order from an earlier cycle cannot trade
//! against the new ones.

use super::detector::Opportunity;
use super::sizer::OrderSizer;
use crate::error::EngineResult;
use crate::exchange::{OrderType, OutstandingOrder, Positions, TradeIntent, Venue};
use crate::report::{EventSink, OrderReason};
use tracing::{debug, info};

/// What an execution actually did.
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    /// Positions read at the start of the execution
    pub positions: Positions,
    pub cancelled: Vec<OutstandingOrder>,
    /// Legs sent, with their effective volume
    pub submitted: Vec<(TradeIntent, i64)>,
    /// Legs that sized to zero
    pub suppressed: Vec<TradeIntent>,
}

#[derive(Debug, Clone)]
pub struct ExecutionCoordinator {
    instrument_a: String,
    instrument_b: String,
    sizer: OrderSizer,
}

impl ExecutionCoordinator {
    pub fn new(
        instrument_a: impl Into<String>,
        instrument_b: impl Into<String>,
        sizer: OrderSizer,
    ) -> Self {
        Self {
            instrument_a: instrument_a.into(),
            instrument_b: instrument_b.into(),
            sizer,
        }
    }

    /// Size, cancel, then submit both legs as IOC orders.
    ///
    /// A leg that sizes to zero is skipped and the other leg still goes out.
    pub async fn execute<V>(
        &self,
        venue: &V,
        opportunity: &Opportunity,
        sink: &mut dyn EventSink,
    ) -> EngineResult<ExecutionReport>
    where
        V: Venue + ?Sized,
    {
        let positions = venue.get_positions().await?;

        let legs = [&opportunity.leg_a, &opportunity.leg_b];
        let sized: Vec<(&TradeIntent, i64, i64)> = legs
            .iter()
            .map(|leg| {
                let position = positions.get(&leg.instrument);
                let volume = self.sizer.size(position, leg.base_volume, leg.side);
                (*leg, position, volume)
            })
            .collect();

        let cancelled = self.cancel_outstanding(venue, sink).await?;

        let mut report = ExecutionReport {
            positions,
            cancelled,
            ..Default::default()
        };

        for (leg, position, volume) in sized {
            if volume == 0 {
                sink.leg_suppressed(leg, position);
                report.suppressed.push(leg.clone());
                continue;
            }

            venue
                .insert_order(
                    &leg.instrument,
                    leg.reference_price,
                    volume,
                    leg.side,
                    OrderType::Ioc,
                )
                .await?;
            sink.order_submitted(leg, volume, OrderReason::Arbitrage);
            report.submitted.push((leg.clone(), volume));
        }

        info!(
            direction = %opportunity.direction,
            cancelled = report.cancelled.len(),
            submitted = report.submitted.len(),
            suppressed = report.suppressed.len(),
            "Execution complete"
        );

        Ok(report)
    }

    /// Cancel every resting order on A, then on B.
    async fn cancel_outstanding<V>(
        &self,
        venue: &V,
        sink: &mut dyn EventSink,
    ) -> EngineResult<Vec<OutstandingOrder>>
    where
        V: Venue + ?Sized,
    {
        let outstanding_a = venue.get_outstanding_orders(&self.instrument_a).await?;
        let outstanding_b = venue.get_outstanding_orders(&self.instrument_b).await?;

        let mut cancelled = Vec::with_capacity(outstanding_a.len() + outstanding_b.len());
        for (instrument, orders) in [
            (&self.instrument_a, outstanding_a),
            (&self.instrument_b, outstanding_b),
        ] {
            let mut orders: Vec<OutstandingOrder> = orders.into_values().collect();
            orders.sort_by_key(|order| order.order_id);

            for order in orders {
                venue.cancel_order(instrument, order.order_id).await?;
                sink.order_cancelled(&order);
                cancelled.push(order);
            }
        }

        debug!(count = cancelled.len(), "Resting orders cancelled");
        Ok(cancelled)
    }
}
