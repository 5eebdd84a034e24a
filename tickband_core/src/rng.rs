use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::crypto::hmac_sha256;
use crate::error::EngineResult;
use crate::seeds::SeedPair;

// Provably-fair tick derivation:
// server_seed (secret, hex key) + "client_seed:nonce" -> HMAC-SHA256 -> first 4 bytes -> [0, 1000]

/// One round outcome, an integer in `[0, TICK_MAX]`.
pub type Tick = u16;

pub const TICK_MAX: Tick = 1000;

/// Number of distinct tick values.
const TICK_OUTCOMES: u64 = TICK_MAX as u64 + 1;

/// Map an HMAC digest onto a tick.
///
/// The first four bytes are read big-endian as `v`; the tick is
/// `floor(v / 2^32 * 1001)`. The product needs at most 42 bits, so the shift
/// below is bit-identical to the same computation in IEEE doubles.
pub fn tick_from_digest(digest: &[u8; 32]) -> Tick {
    let v = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    ((v as u64 * TICK_OUTCOMES) >> 32) as Tick
}

/// Derive the tick for `(server_seed, client_seed, nonce)`.
///
/// Depends on nothing but its arguments; this is what auditors run against
/// revealed seeds.
pub fn generate_tick(server_seed: &str, client_seed: &str, nonce: u64) -> EngineResult<Tick> {
    let msg = format!("{}:{}", client_seed, nonce);
    let digest = hmac_sha256(server_seed, &msg)?;
    Ok(tick_from_digest(&digest))
}

/// Check a historical tick against revealed seeds.
pub fn verify_tick(
    server_seed: &str,
    client_seed: &str,
    nonce: u64,
    expected: Tick,
) -> EngineResult<bool> {
    Ok(generate_tick(server_seed, client_seed, nonce)? == expected)
}

/// Which outcome strategy a session uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeMode {
    #[default]
    ProvablyFair,
    /// Plain random draw. Not verifiable; demos only.
    Demo,
}

/// Source of round outcomes.
pub trait OutcomeSource: Send {
    fn draw(&mut self, seeds: &SeedPair, nonce: u64) -> EngineResult<Tick>;

    /// Whether outcomes can be recomputed from revealed seeds.
    fn is_verifiable(&self) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProvablyFairRng;

impl OutcomeSource for ProvablyFairRng {
    fn draw(&mut self, seeds: &SeedPair, nonce: u64) -> EngineResult<Tick> {
        generate_tick(seeds.server_seed(), &seeds.client_seed, nonce)
    }

    fn is_verifiable(&self) -> bool {
        true
    }
}

/// Ignores the seeds entirely.
#[derive(Debug, Default, Clone, Copy)]
pub struct DemoRng;

impl OutcomeSource for DemoRng {
    fn draw(&mut self, _seeds: &SeedPair, _nonce: u64) -> EngineResult<Tick> {
        Ok(rand::thread_rng().gen_range(0..=TICK_MAX))
    }

    fn is_verifiable(&self) -> bool {
        false
    }
}

pub fn outcome_source(mode: OutcomeMode) -> Box<dyn OutcomeSource> {
    match mode {
        OutcomeMode::ProvablyFair => Box::new(ProvablyFairRng),
        OutcomeMode::Demo => Box::new(DemoRng),
    }
}
