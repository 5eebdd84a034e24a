pub mod band;
pub mod config;
pub mod crypto;
pub mod economics;
pub mod engine;
pub mod error;
pub mod rng;
pub mod seeds;

pub use crate::band::{Band, BandMode, RangeIntent};
pub use crate::config::{EconomicsConfig, EngineConfig};
pub use crate::crypto::{hmac_sha256, random_hex, sha256_hex};
pub use crate::economics::{
    band_multiplier, inverse_band_width, multiplier, payout, round6, win_probability, WidthBound,
    WidthSolution,
};
pub use crate::engine::{
    BetRecord, BetResult, EngineView, Ledger, RoundEngine, RoundOutcome, RoundStatus,
};
pub use crate::error::{EngineError, EngineResult};
pub use crate::rng::{
    generate_tick, tick_from_digest, verify_tick, DemoRng, OutcomeMode, OutcomeSource,
    ProvablyFairRng, Tick, TICK_MAX,
};
pub use crate::seeds::{verify_commitment, RevealedSeeds, SeedManager, SeedPair};
