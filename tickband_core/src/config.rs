use serde::{Deserialize, Serialize};

use crate::band::Band;
use crate::error::{EngineError, EngineResult};
use crate::rng::{OutcomeMode, TICK_MAX};
use crate::seeds::MIN_SERVER_SEED_BYTES;

/// Return-to-player fraction applied to fair odds.
pub const DEFAULT_EDGE: f64 = 0.85;
pub const DEFAULT_MAX_WIDTH: u16 = 750;
/// Narrowest band the payout solver will propose.
pub const DEFAULT_SOLVER_MIN_WIDTH: u16 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomicsConfig {
    pub edge: f64,
    pub ticks_space: u16,
    pub max_width: u16,
    pub solver_min_width: u16,
}

impl Default for EconomicsConfig {
    fn default() -> Self {
        Self {
            edge: DEFAULT_EDGE,
            ticks_space: TICK_MAX,
            max_width: DEFAULT_MAX_WIDTH,
            solver_min_width: DEFAULT_SOLVER_MIN_WIDTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub economics: EconomicsConfig,
    pub initial_balance: f64,
    pub default_bet: f64,
    pub default_band: Band,
    /// Ticks kept for the chart; oldest evicted first.
    pub history_capacity: usize,
    pub server_seed_bytes: usize,
    pub client_seed_bytes: usize,
    pub outcome: OutcomeMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            economics: EconomicsConfig::default(),
            initial_balance: 1000.0,
            default_bet: 10.0,
            default_band: Band::DEFAULT,
            history_capacity: 50,
            server_seed_bytes: MIN_SERVER_SEED_BYTES,
            client_seed_bytes: 16,
            outcome: OutcomeMode::ProvablyFair,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> EngineResult<()> {
        let e = &self.economics;
        let fail = |msg: String| Err(EngineError::InvalidConfig(msg));
        if !(e.edge > 0.0 && e.edge <= 1.0) {
            return fail(format!("edge must be in (0, 1], got {}", e.edge));
        }
        if e.ticks_space == 0 {
            return fail("ticks_space must be positive".into());
        }
        if e.max_width == 0 || e.max_width > e.ticks_space || e.max_width > TICK_MAX {
            return fail(format!("max_width {} out of range", e.max_width));
        }
        if e.solver_min_width == 0 || e.solver_min_width > e.max_width {
            return fail(format!(
                "solver_min_width {} must be in [1, {}]",
                e.solver_min_width, e.max_width
            ));
        }
        if !self.initial_balance.is_finite() || self.initial_balance < 0.0 {
            return fail(format!("initial_balance {} invalid", self.initial_balance));
        }
        if !self.default_bet.is_finite() || self.default_bet <= 0.0 {
            return fail(format!("default_bet {} invalid", self.default_bet));
        }
        if self.default_band.width() > e.max_width {
            return fail("default_band wider than max_width".into());
        }
        if self.history_capacity == 0 {
            return fail("history_capacity must be positive".into());
        }
        if self.server_seed_bytes < MIN_SERVER_SEED_BYTES {
            return fail(format!(
                "server_seed_bytes must be at least {MIN_SERVER_SEED_BYTES}"
            ));
        }
        if self.client_seed_bytes == 0 {
            return fail("client_seed_bytes must be positive".into());
        }
        Ok(())
    }
}
