//! Band width <-> payout multiplier, with house edge.
//!
//! `multiplier(w) = edge / (w / ticks_space)`, rounded to six decimals. All
//! money values in the crate go through [`round6`] after every arithmetic
//! step.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::band::Band;
use crate::config::EconomicsConfig;
use crate::error::{EngineError, EngineResult};
use crate::rng::TICK_MAX;

const SCALE: f64 = 1_000_000.0;

/// Round to six decimal places, half away from zero.
pub fn round6(value: f64) -> f64 {
    (value * SCALE).round() / SCALE
}

fn raw_multiplier(width: i64, cfg: &EconomicsConfig) -> f64 {
    if width <= 0 {
        return 0.0;
    }
    round6(cfg.edge / (width as f64 / cfg.ticks_space as f64))
}

/// Payout multiplier for a band `width` ticks wide. Zero width pays zero; a
/// round must not be started on it.
pub fn multiplier(width: u16, cfg: &EconomicsConfig) -> f64 {
    raw_multiplier(width as i64, cfg)
}

pub fn band_multiplier(band: &Band, cfg: &EconomicsConfig) -> f64 {
    multiplier(band.width(), cfg)
}

pub fn payout(multiplier: f64, stake: f64) -> f64 {
    round6(multiplier * stake)
}

/// Chance a uniformly drawn tick lands in `band`.
pub fn win_probability(band: &Band) -> f64 {
    band.width() as f64 / (TICK_MAX as f64 + 1.0)
}

/// Which legal width limit the solver ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidthBound {
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WidthSolution {
    pub width: u16,
    /// Set when the ideal width was outside the legal range and got clamped.
    pub bound: Option<WidthBound>,
}

impl WidthSolution {
    /// Advisory text for the player, if the solver had to clamp.
    pub fn warning(&self) -> Option<String> {
        self.bound.map(|bound| match bound {
            WidthBound::Min => format!(
                "target payout too high; using narrowest band ({} ticks)",
                self.width
            ),
            WidthBound::Max => format!(
                "target payout too low; using widest band ({} ticks)",
                self.width
            ),
        })
    }
}

/// Band width whose realized payout on `stake` is closest to `target`.
///
/// Rounding in [`multiplier`] makes the forward mapping non-invertible, so
/// the algebraic estimate is refined over its two neighbours. Equal distances
/// resolve to the smaller width.
pub fn inverse_band_width(
    target: f64,
    stake: f64,
    cfg: &EconomicsConfig,
) -> EngineResult<WidthSolution> {
    if !stake.is_finite() || stake <= 0.0 {
        return Err(EngineError::InvalidAmount(stake));
    }
    if !target.is_finite() || target <= 0.0 {
        return Err(EngineError::InvalidTarget(format!(
            "target payout must be positive, got {target}"
        )));
    }

    let estimate = (cfg.edge * cfg.ticks_space as f64 / (target / stake)).round();
    // Anything this wide is clamped to max_width below.
    let estimate = estimate.clamp(0.0, (u16::MAX as f64) * 2.0) as i64;

    let mut best: Option<(f64, i64)> = None;
    for width in [estimate - 1, estimate, estimate + 1] {
        if width <= 0 {
            continue;
        }
        let realized = payout(raw_multiplier(width, cfg), stake);
        let diff = (realized - target).abs();
        if best.map_or(true, |(d, _)| diff < d) {
            best = Some((diff, width));
        }
    }
    let ideal = best.map_or(1, |(_, w)| w);

    let min = cfg.solver_min_width as i64;
    let max = cfg.max_width as i64;
    let solution = if ideal < min {
        WidthSolution {
            width: cfg.solver_min_width,
            bound: Some(WidthBound::Min),
        }
    } else if ideal > max {
        WidthSolution {
            width: cfg.max_width,
            bound: Some(WidthBound::Max),
        }
    } else {
        WidthSolution {
            width: ideal as u16,
            bound: None,
        }
    };
    if let Some(bound) = solution.bound {
        warn!(target_payout = target, stake, ideal, ?bound, "payout solver clamped band width");
    }
    Ok(solution)
}
