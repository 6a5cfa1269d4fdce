//! In-memory venue for paper trading and tests.
//!
//! Books are either set directly or generated by a deterministic
//! [`QuoteDriver`]. IOC orders fill against the opposite side of the book and
//! any remainder is dropped; limit orders fill what crosses and rest the rest.
//! Venues built with [`MockVenue::new`] append every call to a call log so
//! tests can assert on ordering. Driver-backed venues run unbounded paper
//! sessions and keep no log.

use super::traits::Venue;
use super::types::*;
use crate::error::VenueError;
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// A venue call as seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VenueCall {
    GetPriceBook(String),
    GetPositions,
    GetOutstandingOrders(String),
    CancelOrder {
        instrument: String,
        order_id: OrderId,
    },
    InsertOrder {
        instrument: String,
        price: Decimal,
        volume: i64,
        side: Side,
        order_type: OrderType,
    },
    GetPnl,
}

impl VenueCall {
    /// Operation name, as used for fault injection.
    pub fn operation(&self) -> &'static str {
        match self {
            VenueCall::GetPriceBook(_) => "get_last_price_book",
            VenueCall::GetPositions => "get_positions",
            VenueCall::GetOutstandingOrders(_) => "get_outstanding_orders",
            VenueCall::CancelOrder { .. } => "cancel_order",
            VenueCall::InsertOrder { .. } => "insert_order",
            VenueCall::GetPnl => "get_pnl",
        }
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, VenueCall::InsertOrder { .. })
    }

    pub fn is_cancel(&self) -> bool {
        matches!(self, VenueCall::CancelOrder { .. })
    }
}

/// Deterministic quote generator for a pair of instruments.
///
/// The two mids move in antiphase along a triangle wave around `base_mid`,
/// so the cross-instrument gap periodically opens to `2 * amplitude` and
/// closes again.
#[derive(Debug, Clone)]
pub struct QuoteDriver {
    pub instrument_a: String,
    pub instrument_b: String,
    pub base_mid: Decimal,
    pub amplitude: Decimal,
    pub half_spread: Decimal,
    /// Ticks per full oscillation (at least 2)
    pub period: u64,
    /// Volume quoted at each touch
    pub depth: i64,
}

impl QuoteDriver {
    /// Triangle wave in [-1, 1] for a tick.
    fn wave(&self, tick: u64) -> Decimal {
        let period = self.period.max(2);
        let t = Decimal::from(tick % period);
        let p = Decimal::from(period);
        let half = p / Decimal::TWO;
        if t < half {
            Decimal::NEGATIVE_ONE + t * dec!(4) / p
        } else {
            dec!(3) - t * dec!(4) / p
        }
    }

    fn book(&self, instrument: &str, mid: Decimal) -> PriceBook {
        PriceBook::new(
            instrument,
            vec![PriceLevel::new((mid - self.half_spread).round_dp(2), self.depth)],
            vec![PriceLevel::new((mid + self.half_spread).round_dp(2), self.depth)],
        )
    }

    /// Books for both instruments at a tick.
    pub fn books_at(&self, tick: u64) -> (PriceBook, PriceBook) {
        let offset = self.amplitude * self.wave(tick);
        (
            self.book(&self.instrument_a, self.base_mid + offset),
            self.book(&self.instrument_b, self.base_mid - offset),
        )
    }
}

/// Simulated venue state.
#[derive(Debug, Default)]
pub struct MockVenueState {
    pub books: HashMap<String, PriceBook>,
    pub positions: Positions,
    pub cash: Decimal,
    /// Last mid seen per instrument, used to mark positions when a book is one-sided
    pub marks: HashMap<String, Decimal>,
    pub resting: BTreeMap<OrderId, OutstandingOrder>,
    pub next_order_id: OrderId,
    pub calls: Vec<VenueCall>,
    pub failures: HashMap<&'static str, VenueError>,
    pub tick: u64,
    pub fill_count: u64,
}

/// Venue implementation backed by in-memory state.
#[derive(Clone)]
pub struct MockVenue {
    state: Arc<RwLock<MockVenueState>>,
    driver: Option<QuoteDriver>,
    record_calls: bool,
}

impl MockVenue {
    /// Create a venue that knows the given instruments, all with empty books.
    pub fn new<I, S>(instruments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            state: Arc::new(RwLock::new(initial_state(instruments))),
            driver: None,
            record_calls: true,
        }
    }

    /// Create a venue whose books are generated by a quote driver.
    ///
    /// The driver advances one tick per `get_pnl` call, which the control loop
    /// issues once at the end of every iteration. The call log stays empty.
    pub fn with_driver(driver: QuoteDriver) -> Self {
        let mut state = initial_state([driver.instrument_a.clone(), driver.instrument_b.clone()]);
        let (book_a, book_b) = driver.books_at(0);
        store_book(&mut state, book_a);
        store_book(&mut state, book_b);

        Self {
            state: Arc::new(RwLock::new(state)),
            driver: Some(driver),
            record_calls: false,
        }
    }

    pub async fn set_book(&self, book: PriceBook) {
        let mut state = self.state.write().await;
        store_book(&mut state, book);
    }

    pub async fn set_position(&self, instrument: &str, position: i64) {
        self.state.write().await.positions.set(instrument, position);
    }

    pub async fn positions(&self) -> Positions {
        self.state.read().await.positions.clone()
    }

    /// Make the next call to `operation` fail with `error`.
    pub async fn fail_next(&self, operation: &'static str, error: VenueError) {
        self.state.write().await.failures.insert(operation, error);
    }

    pub async fn calls(&self) -> Vec<VenueCall> {
        self.state.read().await.calls.clone()
    }

    pub async fn clear_calls(&self) {
        self.state.write().await.calls.clear();
    }

    pub async fn inserted_orders(&self) -> Vec<VenueCall> {
        self.calls()
            .await
            .into_iter()
            .filter(VenueCall::is_insert)
            .collect()
    }

    pub async fn resting_orders(&self) -> Vec<OutstandingOrder> {
        self.state.read().await.resting.values().cloned().collect()
    }

    pub async fn fill_count(&self) -> u64 {
        self.state.read().await.fill_count
    }

    async fn record(&self, call: VenueCall) -> Result<(), VenueError> {
        let mut state = self.state.write().await;
        let operation = call.operation();
        if self.record_calls {
            state.calls.push(call);
        }
        match state.failures.remove(operation) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn initial_state<I, S>(instruments: I) -> MockVenueState
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut state = MockVenueState {
        next_order_id: 1,
        ..Default::default()
    };
    for instrument in instruments {
        let instrument = instrument.into();
        state
            .books
            .insert(instrument.clone(), PriceBook::empty(instrument));
    }
    state
}

fn store_book(state: &mut MockVenueState, book: PriceBook) {
    if let Some(mid) = book.mid() {
        state.marks.insert(book.instrument.clone(), mid);
    }
    state.books.insert(book.instrument.clone(), book);
}

/// Match an aggressive order against a book, consuming liquidity.
/// Returns the filled volume and its notional.
fn match_against_book(
    book: &mut PriceBook,
    side: Side,
    limit_price: Decimal,
    volume: i64,
) -> (i64, Decimal) {
    let levels = match side {
        Side::Bid => &mut book.asks,
        Side::Ask => &mut book.bids,
    };

    let mut remaining = volume;
    let mut notional = Decimal::ZERO;
    for level in levels.iter_mut() {
        if remaining == 0 {
            break;
        }
        let crosses = match side {
            Side::Bid => level.price <= limit_price,
            Side::Ask => level.price >= limit_price,
        };
        if !crosses {
            break;
        }
        let take = remaining.min(level.volume);
        level.volume -= take;
        remaining -= take;
        notional += level.price * Decimal::from(take);
    }
    levels.retain(|level| level.volume > 0);

    (volume - remaining, notional)
}

#[async_trait]
impl Venue for MockVenue {
    async fn get_last_price_book(&self, instrument: &str) -> Result<PriceBook, VenueError> {
        self.record(VenueCall::GetPriceBook(instrument.to_string()))
            .await?;
        let state = self.state.read().await;
        state
            .books
            .get(instrument)
            .cloned()
            .ok_or_else(|| VenueError::UnknownInstrument(instrument.to_string()))
    }

    async fn get_positions(&self) -> Result<Positions, VenueError> {
        self.record(VenueCall::GetPositions).await?;
        Ok(self.state.read().await.positions.clone())
    }

    async fn get_outstanding_orders(
        &self,
        instrument: &str,
    ) -> Result<HashMap<OrderId, OutstandingOrder>, VenueError> {
        self.record(VenueCall::GetOutstandingOrders(instrument.to_string()))
            .await?;
        let state = self.state.read().await;
        if !state.books.contains_key(instrument) {
            return Err(VenueError::UnknownInstrument(instrument.to_string()));
        }
        Ok(state
            .resting
            .values()
            .filter(|order| order.instrument == instrument)
            .map(|order| (order.order_id, order.clone()))
            .collect())
    }

    async fn cancel_order(&self, instrument: &str, order_id: OrderId) -> Result<(), VenueError> {
        self.record(VenueCall::CancelOrder {
            instrument: instrument.to_string(),
            order_id,
        })
        .await?;
        let mut state = self.state.write().await;
        let known = state
            .resting
            .get(&order_id)
            .is_some_and(|order| order.instrument == instrument);
        if known {
            state.resting.remove(&order_id);
            debug!(%instrument, order_id, "Mock order cancelled");
        } else {
            // Cancelling an order that is already gone is a no-op
            debug!(%instrument, order_id, "Mock cancel for unknown order ignored");
        }
        Ok(())
    }

    async fn insert_order(
        &self,
        instrument: &str,
        price: Decimal,
        volume: i64,
        side: Side,
        order_type: OrderType,
    ) -> Result<(), VenueError> {
        self.record(VenueCall::InsertOrder {
            instrument: instrument.to_string(),
            price,
            volume,
            side,
            order_type,
        })
        .await?;

        if volume <= 0 {
            return Err(VenueError::Rejected(format!(
                "volume must be positive, got {}",
                volume
            )));
        }

        let mut state = self.state.write().await;
        let book = state
            .books
            .get_mut(instrument)
            .ok_or_else(|| VenueError::UnknownInstrument(instrument.to_string()))?;

        let (filled, notional) = match_against_book(book, side, price, volume);
        let signed = if side.is_buy() { filled } else { -filled };

        if filled > 0 {
            state.positions.apply(instrument, signed);
            if side.is_buy() {
                state.cash -= notional;
            } else {
                state.cash += notional;
            }
            state.fill_count += 1;
        }

        let remainder = volume - filled;
        if remainder > 0 && order_type == OrderType::Limit {
            let order_id = state.next_order_id;
            state.next_order_id += 1;
            state.resting.insert(
                order_id,
                OutstandingOrder {
                    order_id,
                    instrument: instrument.to_string(),
                    price,
                    volume: remainder,
                    side,
                },
            );
        }

        debug!(
            %instrument,
            %side,
            %price,
            volume,
            filled,
            order_type = ?order_type,
            "Mock order processed"
        );

        Ok(())
    }

    async fn get_pnl(&self) -> Result<Decimal, VenueError> {
        self.record(VenueCall::GetPnl).await?;
        let mut state = self.state.write().await;

        let marked: Decimal = state
            .positions
            .iter()
            .map(|(instrument, qty)| {
                let mark = state.marks.get(instrument).copied().unwrap_or(Decimal::ZERO);
                mark * Decimal::from(*qty)
            })
            .sum();
        let pnl = state.cash + marked;

        if let Some(driver) = &self.driver {
            state.tick += 1;
            let (book_a, book_b) = driver.books_at(state.tick);
            store_book(&mut state, book_a);
            store_book(&mut state, book_b);
        }

        Ok(pnl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "PHILIPS_A";
    const B: &str = "PHILIPS_B";

    fn book(instrument: &str, bid: Decimal, ask: Decimal, depth: i64) -> PriceBook {
        PriceBook::new(
            instrument,
            vec![PriceLevel::new(bid, depth)],
            vec![PriceLevel::new(ask, depth)],
        )
    }

    #[tokio::test]
    async fn test_ioc_buy_fills_up_to_touch_volume() {
        let venue = MockVenue::new([A, B]);
        venue.set_book(book(A, dec!(9.90), dec!(10.00), 4)).await;

        venue
            .insert_order(A, dec!(10.00), 10, Side::Bid, OrderType::Ioc)
            .await
            .unwrap();

        assert_eq!(venue.positions().await.get(A), 4);
        // IOC remainder does not rest
        assert!(venue.resting_orders().await.is_empty());
    }

    #[tokio::test]
    async fn test_ioc_sell_below_bid_does_not_fill_above_limit() {
        let venue = MockVenue::new([A, B]);
        venue.set_book(book(B, dec!(10.00), dec!(10.10), 5)).await;

        venue
            .insert_order(B, dec!(10.05), 3, Side::Ask, OrderType::Ioc)
            .await
            .unwrap();

        assert_eq!(venue.positions().await.get(B), 0);
        assert_eq!(venue.fill_count().await, 0);
    }

    #[tokio::test]
    async fn test_limit_order_rests_and_can_be_cancelled() {
        let venue = MockVenue::new([A, B]);
        venue
            .insert_order(A, dec!(9.50), 7, Side::Bid, OrderType::Limit)
            .await
            .unwrap();

        let outstanding = venue.get_outstanding_orders(A).await.unwrap();
        assert_eq!(outstanding.len(), 1);
        let (order_id, order) = outstanding.into_iter().next().unwrap();
        assert_eq!(order.volume, 7);

        venue.cancel_order(A, order_id).await.unwrap();
        assert!(venue.get_outstanding_orders(A).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pnl_marks_to_mid() {
        let venue = MockVenue::new([A, B]);
        venue.set_book(book(A, dec!(9.90), dec!(10.10), 10)).await;

        venue
            .insert_order(A, dec!(10.10), 10, Side::Bid, OrderType::Ioc)
            .await
            .unwrap();

        // Paid 101.00, marked at 10.00 * 10 = 100.00
        assert_eq!(venue.get_pnl().await.unwrap(), dec!(-1.00));
    }

    #[tokio::test]
    async fn test_fault_injection_fails_once() {
        let venue = MockVenue::new([A, B]);
        venue
            .fail_next("get_positions", VenueError::Timeout("injected".into()))
            .await;

        assert!(venue.get_positions().await.is_err());
        assert!(venue.get_positions().await.is_ok());
        assert_eq!(venue.calls().await.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_instrument_is_rejected() {
        let venue = MockVenue::new([A, B]);
        let err = venue.get_last_price_book("ASML").await.unwrap_err();
        assert_eq!(err, VenueError::UnknownInstrument("ASML".into()));
    }

    #[tokio::test]
    async fn test_driver_opens_and_closes_the_gap() {
        let driver = QuoteDriver {
            instrument_a: A.to_string(),
            instrument_b: B.to_string(),
            base_mid: dec!(10.00),
            amplitude: dec!(0.20),
            half_spread: dec!(0.05),
            period: 4,
            depth: 20,
        };

        // Tick 0: A trough, B crest
        let (a0, b0) = driver.books_at(0);
        assert_eq!(a0.best_bid().unwrap().price, dec!(9.75));
        assert_eq!(b0.best_bid().unwrap().price, dec!(10.15));

        // Tick 1: both at base mid
        let (a1, b1) = driver.books_at(1);
        assert_eq!(a1.mid(), b1.mid());

        let venue = MockVenue::with_driver(driver);
        let first = venue.get_last_price_book(A).await.unwrap();
        venue.get_pnl().await.unwrap();
        let second = venue.get_last_price_book(A).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_driver_venue_keeps_no_call_log() {
        let venue = MockVenue::with_driver(QuoteDriver {
            instrument_a: A.to_string(),
            instrument_b: B.to_string(),
            base_mid: dec!(10.00),
            amplitude: dec!(0.20),
            half_spread: dec!(0.05),
            period: 4,
            depth: 20,
        });
        venue
            .fail_next("get_pnl", VenueError::Timeout("injected".into()))
            .await;

        for _ in 0..50 {
            venue.get_last_price_book(A).await.unwrap();
            venue.get_positions().await.unwrap();
        }
        // Fault injection still applies without a log
        assert!(venue.get_pnl().await.is_err());
        assert!(venue.calls().await.is_empty());
    }
}
