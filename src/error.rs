//! Error types for venue calls and the decision engine.

use thiserror::Error;

/// Failure reported by a venue call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VenueError {
    #[error("Venue call timed out: {0}")]
    Timeout(String),

    #[error("Venue connection lost: {0}")]
    Disconnected(String),

    #[error("Request rejected by venue: {0}")]
    Rejected(String),

    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("Unknown order {order_id} on {instrument}")]
    UnknownOrder { instrument: String, order_id: u64 },
}

impl VenueError {
    /// Whether the failure is a transport hiccup rather than a refusal.
    pub fn is_transient(&self) -> bool {
        matches!(self, VenueError::Timeout(_) | VenueError::Disconnected(_))
    }
}

/// Classification of a fault, used to decide whether the loop may continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// A single venue call failed for transport reasons
    Transient,
    /// Market data was missing; degrade, never halt
    Data,
    /// Anything else
    Fatal,
}

/// Error raised by a step of the control loop.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Venue(#[from] VenueError),

    #[error("No {side} liquidity on {instrument}")]
    MissingLiquidity {
        instrument: String,
        side: &'static str,
    },
}

impl EngineError {
    pub fn kind(&self) -> FaultKind {
        match self {
            EngineError::Venue(e) if e.is_transient() => FaultKind::Transient,
            EngineError::Venue(_) => FaultKind::Fatal,
            EngineError::MissingLiquidity { .. } => FaultKind::Data,
        }
    }

    /// Whether the fault ends the loop. Only data faults are tolerated;
    /// transient venue faults are classified but still halt.
    pub fn is_fatal(&self) -> bool {
        self.kind() != FaultKind::Data
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_classification() {
        let timeout = EngineError::from(VenueError::Timeout("get_positions".into()));
        assert_eq!(timeout.kind(), FaultKind::Transient);
        assert!(timeout.is_fatal());

        let rejected = EngineError::from(VenueError::Rejected("price out of band".into()));
        assert_eq!(rejected.kind(), FaultKind::Fatal);

        let missing = EngineError::MissingLiquidity {
            instrument: "PHILIPS_A".into(),
            side: "ask",
        };
        assert_eq!(missing.kind(), FaultKind::Data);
        assert!(!missing.is_fatal());
    }

    #[test]
    fn test_error_messages() {
        let err = EngineError::from(VenueError::UnknownOrder {
            instrument: "PHILIPS_B".into(),
            order_id: 42,
        });
        assert_eq!(err.to_string(), "Unknown order 42 on PHILIPS_B");
    }
}
