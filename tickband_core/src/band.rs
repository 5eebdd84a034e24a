use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::rng::{Tick, TICK_MAX};

pub const MIN_BAND_WIDTH: u16 = 1;

/// How the band is anchored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandMode {
    /// Both bounds free.
    #[default]
    Range,
    /// `high` pinned to `TICK_MAX`. The bound is exclusive, so tick
    /// `TICK_MAX` itself never wins: "over N" means `N <= tick < TICK_MAX`.
    Over,
    /// `low` pinned to 0.
    Under,
}

/// Half-open interval `[low, high)` of winning ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawBand")]
pub struct Band {
    low: u16,
    high: u16,
}

#[derive(Deserialize)]
struct RawBand {
    low: i64,
    high: i64,
}

impl TryFrom<RawBand> for Band {
    type Error = EngineError;

    fn try_from(raw: RawBand) -> Result<Self, Self::Error> {
        Band::new(raw.low, raw.high, TICK_MAX)
    }
}

/// A proposed band from the presentation layer. Never trusted as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeIntent {
    pub low: i64,
    pub high: i64,
    #[serde(default)]
    pub mode: BandMode,
}

impl Band {
    /// Band shown before the player touches the range.
    pub const DEFAULT: Band = Band { low: 400, high: 600 };

    /// Strict constructor: `0 <= low < high <= TICK_MAX` and
    /// `high - low <= max_width`.
    pub fn new(low: i64, high: i64, max_width: u16) -> EngineResult<Self> {
        let invalid = |reason| EngineError::InvalidRange { low, high, reason };
        if low < 0 || high > TICK_MAX as i64 {
            return Err(invalid("bounds outside tick space"));
        }
        if low >= high {
            return Err(invalid("low must be below high"));
        }
        if high - low > max_width as i64 {
            return Err(invalid("band wider than allowed"));
        }
        Ok(Self {
            low: low as u16,
            high: high as u16,
        })
    }

    /// Coerce a UI intent into a legal band.
    ///
    /// Coordinates are clamped into the tick space and the mode's pin is
    /// applied; an over-wide band shrinks to `max_width` (around its centre in
    /// range mode). Inverted or empty intents are rejected.
    pub fn from_intent(intent: RangeIntent, max_width: u16) -> EngineResult<Self> {
        let mut low = intent.low.clamp(0, TICK_MAX as i64);
        let mut high = intent.high.clamp(0, TICK_MAX as i64);
        match intent.mode {
            BandMode::Range => {}
            BandMode::Over => high = TICK_MAX as i64,
            BandMode::Under => low = 0,
        }
        if low >= high {
            return Err(EngineError::InvalidRange {
                low: intent.low,
                high: intent.high,
                reason: "empty or inverted band",
            });
        }
        let band = Self {
            low: low as u16,
            high: high as u16,
        };
        if band.width() > max_width {
            Ok(band.resize(max_width, intent.mode, max_width))
        } else {
            Ok(band)
        }
    }

    /// Band for a one-sided bet: "over `bound`" is `[bound, TICK_MAX)`,
    /// "under `bound`" is `[0, bound)`. Range mode has no single bound.
    pub fn for_mode(mode: BandMode, bound: i64, max_width: u16) -> EngineResult<Self> {
        match mode {
            BandMode::Over => Self::new(bound, TICK_MAX as i64, max_width),
            BandMode::Under => Self::new(0, bound, max_width),
            BandMode::Range => Err(EngineError::InvalidRange {
                low: bound,
                high: bound,
                reason: "range mode needs both bounds",
            }),
        }
    }

    pub fn low(&self) -> u16 {
        self.low
    }

    pub fn high(&self) -> u16 {
        self.high
    }

    pub fn width(&self) -> u16 {
        self.high - self.low
    }

    /// `low <= tick < high`. A band ending at `TICK_MAX` excludes it.
    pub fn contains(&self, tick: Tick) -> bool {
        self.low <= tick && tick < self.high
    }

    /// Place a band of `width` (clamped to `[MIN_BAND_WIDTH, max_width]`)
    /// honouring the mode's pin. Range mode keeps the current centre, sliding
    /// inward if the edge of the tick space gets in the way.
    pub fn resize(&self, width: u16, mode: BandMode, max_width: u16) -> Self {
        let width = width.clamp(MIN_BAND_WIDTH, max_width.min(TICK_MAX));
        match mode {
            BandMode::Over => Self {
                low: TICK_MAX - width,
                high: TICK_MAX,
            },
            BandMode::Under => Self {
                low: 0,
                high: width,
            },
            BandMode::Range => {
                let centre = (self.low + self.high) / 2;
                let low = centre.saturating_sub(width / 2);
                if low + width > TICK_MAX {
                    Self {
                        low: TICK_MAX - width,
                        high: TICK_MAX,
                    }
                } else {
                    Self {
                        low,
                        high: low + width,
                    }
                }
            }
        }
    }
}
