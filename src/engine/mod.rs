//! Fixed-cadence control loop.
//!
//! Each iteration reads both books, executes any detected opportunity, runs a
//! hedge pass, reports P&L, then sleeps. The loop is either running or
//! terminated; the first fault that escapes an iteration terminates it for
//! good. Orders already sent in the failing iteration stay at the venue.

use crate::config::Config;
use crate::error::EngineError;
use crate::exchange::Venue;
use crate::report::{EventSink, LoopMetrics};
use crate::strategy::{
    ExecutionCoordinator, ExecutionReport, HedgeAction, HedgeManager, HedgeOutcome,
    MarketSnapshotReader, Opportunity, OpportunityDetector, OrderSizer,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Why the loop stopped.
#[derive(Debug)]
pub enum Termination {
    /// A step failed; the error is the fault that ended the loop
    Fault(EngineError),
    /// The shutdown flag was raised
    Shutdown,
    /// The configured iteration count was reached
    IterationLimit,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Fault(e) => write!(f, "fault: {}", e),
            Termination::Shutdown => write!(f, "shutdown requested"),
            Termination::IterationLimit => write!(f, "iteration limit reached"),
        }
    }
}

/// Final state of a run.
#[derive(Debug)]
pub struct RunSummary {
    pub termination: Termination,
    pub metrics: LoopMetrics,
}

/// Everything one iteration did.
#[derive(Debug, Clone)]
pub struct IterationReport {
    pub iteration: u64,
    pub opportunity: Option<Opportunity>,
    pub execution: Option<ExecutionReport>,
    pub hedge: HedgeOutcome,
    pub pnl: Decimal,
}

/// Drives the decision engine against a venue.
pub struct ControlLoop<V, S> {
    venue: V,
    sink: S,
    reader: MarketSnapshotReader,
    detector: OpportunityDetector,
    executor: ExecutionCoordinator,
    hedger: HedgeManager,
    interval: Duration,
    max_iterations: Option<u64>,
    shutdown: Arc<AtomicBool>,
    metrics: LoopMetrics,
}

impl<V, S> ControlLoop<V, S>
where
    V: Venue,
    S: EventSink,
{
    pub fn new(config: &Config, venue: V, sink: S) -> Self {
        let a = &config.instruments.a;
        let b = &config.instruments.b;
        let trade_size = config.strategy.trade_size;

        Self {
            venue,
            sink,
            reader: MarketSnapshotReader::new(a, b),
            detector: OpportunityDetector::new(a, b, config.strategy.min_spread, trade_size),
            executor: ExecutionCoordinator::new(
                a,
                b,
                OrderSizer::new(config.limits.max_position),
            ),
            hedger: HedgeManager::new(
                a,
                b,
                config.limits.hedge_tolerance,
                config.limits.hedge_action_limit,
                trade_size,
            ),
            interval: config.sleep_interval(),
            max_iterations: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            metrics: LoopMetrics::default(),
        }
    }

    /// Stop after `n` iterations instead of running until a fault.
    pub fn with_max_iterations(mut self, n: u64) -> Self {
        self.max_iterations = Some(n);
        self
    }

    /// Share a flag that stops the loop at the start of the next iteration.
    pub fn with_shutdown(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn metrics(&self) -> &LoopMetrics {
        &self.metrics
    }

    /// Run one iteration, without the trailing sleep.
    pub async fn step(&mut self) -> Result<IterationReport, EngineError> {
        let iteration = self.metrics.iterations + 1;
        self.metrics.iterations = iteration;
        self.sink.iteration_started(iteration, Utc::now());

        let snapshot = self.reader.read(&self.venue).await?;

        let opportunity = self.detector.detect(&snapshot.book_a, &snapshot.book_b);
        let execution = match &opportunity {
            Some(opportunity) => {
                self.metrics.opportunities += 1;
                self.sink.opportunity_detected(opportunity);
                let report = self
                    .executor
                    .execute(&self.venue, opportunity, &mut self.sink)
                    .await?;
                self.metrics.orders_cancelled += report.cancelled.len() as u64;
                self.metrics.orders_submitted += report.submitted.len() as u64;
                self.metrics.legs_suppressed += report.suppressed.len() as u64;
                Some(report)
            }
            None => None,
        };

        let hedge = self.hedger.rebalance(&self.venue, &mut self.sink).await?;
        if hedge.order.is_some() {
            self.metrics.hedge_corrections += 1;
            self.metrics.orders_submitted += 1;
        } else if hedge.action != HedgeAction::None {
            self.metrics.data_faults += 1;
        }

        let pnl = self.venue.get_pnl().await?;
        self.metrics.last_pnl = Some(pnl);
        self.sink.pnl_reported(pnl);

        Ok(IterationReport {
            iteration,
            opportunity,
            execution,
            hedge,
            pnl,
        })
    }

    /// Iterate until a fault, a shutdown request or the iteration limit.
    pub async fn run(mut self) -> RunSummary {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            max_iterations = ?self.max_iterations,
            "Starting control loop"
        );

        let termination = loop {
            if self.shutdown.load(Ordering::SeqCst) {
                break Termination::Shutdown;
            }

            if let Err(e) = self.step().await {
                self.sink.fatal_fault(&e);
                break Termination::Fault(e);
            }

            if self
                .max_iterations
                .is_some_and(|max| self.metrics.iterations >= max)
            {
                break Termination::IterationLimit;
            }

            tokio::time::sleep(self.interval).await;
        };

        info!(
            reason = %termination,
            iterations = self.metrics.iterations,
            opportunities = self.metrics.opportunities,
            orders = self.metrics.orders_submitted,
            data_faults = self.metrics.data_faults,
            "Control loop terminated"
        );

        RunSummary {
            termination,
            metrics: self.metrics,
        }
    }
}
