//! Commit-reveal seed lifecycle.
//!
//! The active server seed is secret; only its SHA-256 is published. Rotation
//! moves the active pair into the revealed slot, where the raw server seed
//! becomes readable so past rounds can be recomputed with
//! [`crate::rng::generate_tick`].

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::crypto::{random_hex, sha256_hex};
use crate::error::{EngineError, EngineResult};

/// Minimum server seed entropy in bytes.
pub const MIN_SERVER_SEED_BYTES: usize = 32;

pub struct SeedPair {
    server_seed: String, // secret until rotated out
    server_seed_hash: String,
    pub client_seed: String,
    nonce: u64,
}

impl SeedPair {
    pub fn new(server_seed: String, client_seed: String) -> Self {
        let server_seed_hash = sha256_hex(&server_seed);
        Self {
            server_seed,
            server_seed_hash,
            client_seed,
            nonce: 0,
        }
    }

    pub(crate) fn server_seed(&self) -> &str {
        &self.server_seed
    }

    pub fn server_seed_hash(&self) -> &str {
        &self.server_seed_hash
    }

    /// The nonce the next round will consume.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }
}

impl fmt::Debug for SeedPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedPair")
            .field("server_seed", &"<hidden>")
            .field("server_seed_hash", &self.server_seed_hash)
            .field("client_seed", &self.client_seed)
            .field("nonce", &self.nonce)
            .finish()
    }
}

/// A retired seed pair, safe to publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedSeeds {
    pub server_seed: String,
    pub server_seed_hash: String,
    pub client_seed: String,
    /// Rounds played on this pair; nonces `0..rounds` were consumed.
    pub rounds: u64,
}

impl RevealedSeeds {
    /// Highest nonce used, `None` if the pair was rotated before any round.
    pub fn nonce_max(&self) -> Option<u64> {
        self.rounds.checked_sub(1)
    }
}

#[derive(Debug)]
pub struct SeedManager {
    active: SeedPair,
    revealed: Option<RevealedSeeds>,
    server_seed_bytes: usize,
}

impl SeedManager {
    /// Fresh random server seed and client seed, nonce 0.
    pub fn init(server_seed_bytes: usize, client_seed_bytes: usize) -> EngineResult<Self> {
        let client_seed = random_hex(client_seed_bytes)?;
        Self::init_with_client_seed(server_seed_bytes, client_seed)
    }

    /// Fresh random server seed with a player-supplied client seed.
    pub fn init_with_client_seed(
        server_seed_bytes: usize,
        client_seed: String,
    ) -> EngineResult<Self> {
        if server_seed_bytes < MIN_SERVER_SEED_BYTES {
            return Err(EngineError::InvalidConfig(format!(
                "server seed must be at least {MIN_SERVER_SEED_BYTES} bytes, got {server_seed_bytes}"
            )));
        }
        validate_client_seed(&client_seed)?;
        let active = SeedPair::new(random_hex(server_seed_bytes)?, client_seed);
        info!(server_seed_hash = %active.server_seed_hash, "committed server seed");
        Ok(Self {
            active,
            revealed: None,
            server_seed_bytes,
        })
    }

    /// Replay a known pair, e.g. one an auditor or a test already holds.
    pub fn from_parts(server_seed: &str, client_seed: &str) -> EngineResult<Self> {
        let bytes = hex::decode(server_seed)
            .map_err(|e| EngineError::InvalidSeed(format!("server seed is not hex: {e}")))?;
        if bytes.is_empty() {
            return Err(EngineError::InvalidSeed("server seed is empty".into()));
        }
        validate_client_seed(client_seed)?;
        Ok(Self {
            active: SeedPair::new(server_seed.to_string(), client_seed.to_string()),
            revealed: None,
            server_seed_bytes: bytes.len().max(MIN_SERVER_SEED_BYTES),
        })
    }

    pub fn active(&self) -> &SeedPair {
        &self.active
    }

    pub fn revealed(&self) -> Option<&RevealedSeeds> {
        self.revealed.as_ref()
    }

    /// Only future rounds change; the nonce keeps counting.
    pub fn set_client_seed(&mut self, client_seed: impl Into<String>) -> EngineResult<()> {
        let client_seed = client_seed.into();
        validate_client_seed(&client_seed)?;
        self.active.client_seed = client_seed;
        Ok(())
    }

    /// Consume the current nonce. Exactly one call per resolved round.
    pub fn next_nonce(&mut self) -> EngineResult<u64> {
        let nonce = self.active.nonce;
        self.active.nonce = nonce
            .checked_add(1)
            .ok_or_else(|| EngineError::Invariant("nonce space exhausted".into()))?;
        Ok(nonce)
    }

    /// Reveal the active pair and commit to a new server seed.
    ///
    /// The client seed carries over to the new pair. Seeds are at least
    /// [`MIN_SERVER_SEED_BYTES`] of OS entropy, so only a broken entropy
    /// source can repeat the outgoing seed; that is reported, not retried.
    pub fn rotate(&mut self) -> EngineResult<&RevealedSeeds> {
        let server_seed = random_hex(self.server_seed_bytes)?;
        if server_seed == self.active.server_seed {
            return Err(EngineError::Invariant(
                "entropy source repeated the outgoing server seed".into(),
            ));
        }
        let client_seed = self.active.client_seed.clone();
        let old = std::mem::replace(&mut self.active, SeedPair::new(server_seed, client_seed));

        let revealed = RevealedSeeds {
            server_seed: old.server_seed,
            server_seed_hash: old.server_seed_hash,
            client_seed: old.client_seed,
            rounds: old.nonce,
        };
        info!(
            revealed_hash = %revealed.server_seed_hash,
            rounds = revealed.rounds,
            next_hash = %self.active.server_seed_hash,
            "rotated server seed"
        );
        Ok(&*self.revealed.insert(revealed))
    }
}

fn validate_client_seed(seed: &str) -> EngineResult<()> {
    if seed.trim().is_empty() {
        return Err(EngineError::InvalidSeed("client seed is empty".into()));
    }
    Ok(())
}

/// Does `hash` commit to `server_seed`?
pub fn verify_commitment(server_seed: &str, hash: &str) -> bool {
    sha256_hex(server_seed).eq_ignore_ascii_case(hash.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_commits_to_seed() {
        let seeds = SeedManager::init(32, 16).unwrap();
        let active = seeds.active();
        assert_eq!(active.server_seed().len(), 64);
        assert_eq!(active.server_seed_hash(), sha256_hex(active.server_seed()));
        assert_eq!(active.nonce(), 0);
        assert!(seeds.revealed().is_none());
    }

    #[test]
    fn test_short_server_seed_rejected() {
        assert!(matches!(
            SeedManager::init(16, 16),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_nonce_sequence() {
        let mut seeds = SeedManager::init(32, 16).unwrap();
        let used: Vec<u64> = (0..5).map(|_| seeds.next_nonce().unwrap()).collect();
        assert_eq!(used, vec![0, 1, 2, 3, 4]);
        assert_eq!(seeds.active().nonce(), 5);
    }

    #[test]
    fn test_set_client_seed_keeps_nonce() {
        let mut seeds = SeedManager::init(32, 16).unwrap();
        seeds.next_nonce().unwrap();
        seeds.set_client_seed("lucky").unwrap();
        assert_eq!(seeds.active().client_seed, "lucky");
        assert_eq!(seeds.active().nonce(), 1);
        assert!(seeds.set_client_seed("  ").is_err());
    }

    #[test]
    fn test_rotate_reveals_previous_pair() {
        let mut seeds = SeedManager::from_parts(&"00".repeat(32), "abc").unwrap();
        let old_hash = seeds.active().server_seed_hash().to_string();
        seeds.next_nonce().unwrap();
        seeds.next_nonce().unwrap();

        let revealed = seeds.rotate().unwrap().clone();
        assert_eq!(revealed.server_seed, "00".repeat(32));
        assert_eq!(revealed.server_seed_hash, old_hash);
        assert_eq!(revealed.rounds, 2);
        assert_eq!(revealed.nonce_max(), Some(1));
        assert!(verify_commitment(&revealed.server_seed, &revealed.server_seed_hash));

        let active = seeds.active();
        assert_eq!(active.nonce(), 0);
        assert_eq!(active.client_seed, "abc");
        assert_ne!(active.server_seed_hash(), old_hash);
    }

    #[test]
    fn test_rotate_without_rounds() {
        let mut seeds = SeedManager::init(32, 16).unwrap();
        let revealed = seeds.rotate().unwrap();
        assert_eq!(revealed.rounds, 0);
        assert_eq!(revealed.nonce_max(), None);
    }

    #[test]
    fn test_rotations_commit_to_fresh_seeds() {
        let mut seeds = SeedManager::init(32, 16).unwrap();
        let mut hashes = vec![seeds.active().server_seed_hash().to_string()];
        for _ in 0..8 {
            let revealed = seeds.rotate().unwrap().clone();
            assert_eq!(&revealed.server_seed_hash, hashes.last().unwrap());
            hashes.push(seeds.active().server_seed_hash().to_string());
        }
        let distinct: std::collections::HashSet<_> = hashes.iter().collect();
        assert_eq!(distinct.len(), hashes.len());
    }

    #[test]
    fn test_debug_hides_server_seed() {
        let seeds = SeedManager::from_parts(&"ab".repeat(32), "abc").unwrap();
        let dbg = format!("{:?}", seeds.active());
        assert!(!dbg.contains(&"ab".repeat(32)));
        assert!(dbg.contains("<hidden>"));
    }

    #[test]
    fn test_from_parts_rejects_bad_hex() {
        assert!(matches!(
            SeedManager::from_parts("xyz", "abc"),
            Err(EngineError::InvalidSeed(_))
        ));
        assert!(SeedManager::from_parts("", "abc").is_err());
    }
}
