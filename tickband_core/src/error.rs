use crate::engine::RoundStatus;

/// Everything the engine can refuse to do.
///
/// Input and funds errors leave state untouched and are meant to be shown to
/// the player. `Invariant` means the ledger or seed bookkeeping would have
/// become inconsistent; the operation was aborted instead.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid amount: {0}")]
    InvalidAmount(f64),
    #[error("invalid range [{low}, {high}): {reason}")]
    InvalidRange { low: i64, high: i64, reason: &'static str },
    #[error("invalid seed: {0}")]
    InvalidSeed(String),
    #[error("invalid payout target: {0}")]
    InvalidTarget(String),
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: f64, available: f64 },
    #[error("operation requires {expected} but round is {actual}")]
    WrongState {
        expected: &'static str,
        actual: RoundStatus,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("secure random source unavailable: {0}")]
    Entropy(String),
    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl EngineError {
    /// Whether the caller can simply report the error and carry on.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, EngineError::Invariant(_) | EngineError::Entropy(_))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
