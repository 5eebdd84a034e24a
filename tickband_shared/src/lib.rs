use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tickband_core::{BetRecord, BetResult, EngineError, RangeIntent, Tick};

/// Requests a front-end sends to a session, one per line.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum PlayerCommand {
    RequestRange(RangeIntent),
    SetBet { amount: f64 },
    /// Solve for the band width paying `target` on the current stake.
    SetTargetPayout { target: f64 },
    Play,
    CashOut,
    RotateSeed,
    SetClientSeed { seed: String },
    Snapshot,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VerifyRequest {
    pub server_seed: String,
    pub client_seed: String,
    pub nonce: u64,
    /// Commitment published before play, if the auditor kept it.
    #[serde(default)]
    pub server_seed_hash: Option<String>,
    #[serde(default)]
    pub expected_tick: Option<Tick>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VerifyResponse {
    pub tick: Tick,
    pub server_seed_hash: String,
    pub commitment_ok: Option<bool>,
    pub tick_ok: Option<bool>,
}

impl VerifyResponse {
    /// False if any supplied expectation failed.
    pub fn passed(&self) -> bool {
        self.commitment_ok.unwrap_or(true) && self.tick_ok.unwrap_or(true)
    }
}

/// Flat, timestamped bet history row for exports.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BetLogEntry {
    pub id: u64,
    pub ts: DateTime<Utc>,
    pub result: BetResult,
    pub tick: Tick,
    pub amount: f64,
    pub payout: f64,
    pub low: u16,
    pub high: u16,
    pub rounds: u32,
    pub last_nonce: u64,
    pub server_seed_hash: String,
    pub client_seed: String,
}

impl BetLogEntry {
    pub fn from_record(id: u64, ts: DateTime<Utc>, record: &BetRecord) -> Self {
        Self {
            id,
            ts,
            result: record.result,
            tick: record.tick,
            amount: record.amount,
            payout: record.payout,
            low: record.band.low(),
            high: record.band.high(),
            rounds: record.rounds,
            last_nonce: record.last_nonce,
            server_seed_hash: record.server_seed_hash.clone(),
            client_seed: record.client_seed.clone(),
        }
    }
}

/// What the player gets told when a command is refused.
#[derive(thiserror::Error, Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "error", content = "message", rename_all = "snake_case")]
pub enum ApiError {
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("internal error")]
    Internal,
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InsufficientFunds { requested, available } => ApiError::InsufficientFunds(
                format!("bet {requested} exceeds balance {available}"),
            ),
            e if e.is_recoverable() => ApiError::Invalid(e.to_string()),
            _ => ApiError::Internal,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
