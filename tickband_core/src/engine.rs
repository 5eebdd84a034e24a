use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::{
    band::{Band, BandMode, RangeIntent},
    config::EngineConfig,
    economics::{band_multiplier, payout, round6},
    error::{EngineError, EngineResult},
    rng::{outcome_source, OutcomeSource, Tick},
    seeds::{RevealedSeeds, SeedManager},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    Idle,
    Playing,
    WonStreak,
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RoundStatus::Idle => "idle",
            RoundStatus::Playing => "playing",
            RoundStatus::WonStreak => "won_streak",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetResult {
    Win,
    Loss,
}

/// One finished game: a streak that was cashed out or lost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetRecord {
    pub result: BetResult,
    /// Tick of the game's final round.
    pub tick: Tick,
    /// Capital put at risk by the original bet.
    pub amount: f64,
    pub payout: f64,
    pub band: Band,
    /// Rounds played in the game.
    pub rounds: u32,
    pub last_nonce: u64,
    pub server_seed_hash: String,
    pub client_seed: String,
}

/// Result of a single resolved round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub nonce: u64,
    pub tick: Tick,
    pub hit: bool,
    pub band: Band,
    pub stake: f64,
    pub current_bet: f64,
    pub status: RoundStatus,
}

/// Debits and credits. Balance never goes negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    pub balance: f64,
    pub total_debited: f64,
    pub total_credited: f64,
}

impl Ledger {
    pub fn new(balance: f64) -> Self {
        Self {
            balance: round6(balance),
            total_debited: 0.0,
            total_credited: 0.0,
        }
    }

    fn debit(&mut self, amount: f64) -> EngineResult<()> {
        let next = round6(self.balance - amount);
        if next < 0.0 {
            error!(balance = self.balance, amount, "debit would overdraw ledger");
            return Err(EngineError::Invariant(format!(
                "debit of {amount} would leave balance {next}"
            )));
        }
        self.balance = next;
        self.total_debited = round6(self.total_debited + amount);
        Ok(())
    }

    fn credit(&mut self, amount: f64) -> EngineResult<()> {
        if !amount.is_finite() || amount < 0.0 {
            error!(amount, "refusing malformed credit");
            return Err(EngineError::Invariant(format!("credit of {amount}")));
        }
        self.balance = round6(self.balance + amount);
        self.total_credited = round6(self.total_credited + amount);
        Ok(())
    }
}

/// Everything a front-end needs to render a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineView {
    pub status: RoundStatus,
    pub balance: f64,
    pub base_bet: f64,
    pub current_bet: f64,
    pub default_stake: f64,
    pub band: Band,
    pub mode: BandMode,
    pub multiplier: f64,
    pub potential_payout: f64,
    pub ticks: Vec<Tick>,
    pub server_seed_hash: String,
    pub client_seed: String,
    pub nonce: u64,
    pub revealed: Option<RevealedSeeds>,
    pub verifiable: bool,
}

/// Seeds and result of the most recent draw, as an auditor replays them.
#[derive(Debug, Clone, Default)]
struct LastDraw {
    nonce: u64,
    tick: Tick,
    server_seed_hash: String,
    client_seed: String,
}

/// Per-game bookkeeping, reset when a game ends.
#[derive(Debug, Clone, Default)]
struct Streak {
    band: Option<Band>,
    rounds: u32,
    last: Option<LastDraw>,
}

/// Round/bet state machine.
///
/// `idle -> playing -> {won_streak, idle}`, `won_streak -> playing` to
/// compound, `won_streak -> idle` to cash out.
pub struct RoundEngine {
    config: EngineConfig,
    seeds: SeedManager,
    source: Box<dyn OutcomeSource>,
    status: RoundStatus,
    ledger: Ledger,
    base_bet: f64,
    current_bet: f64,
    band: Band,
    mode: BandMode,
    streak: Streak,
    ticks: VecDeque<Tick>,
    bets: Vec<BetRecord>,
}

impl RoundEngine {
    /// Fresh session with random seeds.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let seeds = SeedManager::init(config.server_seed_bytes, config.client_seed_bytes)?;
        Self::with_seeds(config, seeds)
    }

    pub fn with_seeds(config: EngineConfig, seeds: SeedManager) -> EngineResult<Self> {
        let source = outcome_source(config.outcome);
        Self::with_source(config, seeds, source)
    }

    pub fn with_source(
        config: EngineConfig,
        seeds: SeedManager,
        source: Box<dyn OutcomeSource>,
    ) -> EngineResult<Self> {
        config.validate()?;
        let ledger = Ledger::new(config.initial_balance);
        let base_bet = round6(config.default_bet);
        Ok(Self {
            band: config.default_band,
            mode: BandMode::Range,
            ticks: VecDeque::with_capacity(config.history_capacity),
            current_bet: base_bet,
            base_bet,
            ledger,
            status: RoundStatus::Idle,
            streak: Streak::default(),
            bets: Vec::new(),
            config,
            seeds,
            source,
        })
    }

    fn expect_status(&self, expected: RoundStatus) -> EngineResult<()> {
        if self.status != expected {
            return Err(EngineError::WrongState {
                expected: match expected {
                    RoundStatus::Idle => "idle",
                    RoundStatus::Playing => "playing",
                    RoundStatus::WonStreak => "won_streak",
                },
                actual: self.status,
            });
        }
        Ok(())
    }

    /// Validate and apply a range intent. Allowed at any time; a live round
    /// keeps the band it was staked on.
    pub fn request_range(&mut self, intent: RangeIntent) -> EngineResult<Band> {
        let band = Band::from_intent(intent, self.config.economics.max_width)?;
        self.band = band;
        self.mode = intent.mode;
        Ok(band)
    }

    /// Change the bet amount used by the next game.
    pub fn set_bet(&mut self, amount: f64) -> EngineResult<()> {
        self.expect_status(RoundStatus::Idle)?;
        let amount = validate_amount(amount)?;
        self.base_bet = amount;
        self.current_bet = amount;
        Ok(())
    }

    /// Stake `amount` from the balance and start a game.
    pub fn place_bet(&mut self, amount: f64) -> EngineResult<()> {
        self.expect_status(RoundStatus::Idle)?;
        let amount = validate_amount(amount)?;
        if amount > self.ledger.balance {
            return Err(EngineError::InsufficientFunds {
                requested: amount,
                available: self.ledger.balance,
            });
        }
        self.ledger.debit(amount)?;
        self.base_bet = amount;
        self.current_bet = amount;
        self.streak = Streak {
            band: Some(self.band),
            ..Streak::default()
        };
        self.status = RoundStatus::Playing;
        info!(
            amount,
            low = self.band.low(),
            high = self.band.high(),
            balance = self.ledger.balance,
            "bet placed"
        );
        Ok(())
    }

    /// Let the accumulated stake ride on another round.
    pub fn compound(&mut self) -> EngineResult<()> {
        self.expect_status(RoundStatus::WonStreak)?;
        self.streak.band = Some(self.band);
        self.status = RoundStatus::Playing;
        Ok(())
    }

    /// The "play" trigger: a new bet of [`Self::default_stake`] from idle, or
    /// compound from a winning streak.
    pub fn play(&mut self) -> EngineResult<()> {
        match self.status {
            RoundStatus::Idle => {
                let stake = self.default_stake();
                if stake <= 0.0 {
                    return Err(EngineError::InsufficientFunds {
                        requested: self.base_bet,
                        available: self.ledger.balance,
                    });
                }
                self.place_bet(stake)
            }
            RoundStatus::WonStreak => self.compound(),
            RoundStatus::Playing => self.expect_status(RoundStatus::Idle),
        }
    }

    /// Draw the outcome for the round in flight and settle it.
    ///
    /// Nothing is mutated until the tick has been drawn, so a failure leaves
    /// the round still `playing` and the nonce unconsumed.
    pub fn resolve_round(&mut self) -> EngineResult<RoundOutcome> {
        self.expect_status(RoundStatus::Playing)?;
        let band = self
            .streak
            .band
            .ok_or_else(|| EngineError::Invariant("playing without a staked band".into()))?;

        let expected_nonce = self.seeds.active().nonce();
        let tick = self.source.draw(self.seeds.active(), expected_nonce)?;
        let nonce = self.seeds.next_nonce()?;
        if nonce != expected_nonce {
            error!(nonce, expected_nonce, "nonce drifted during draw");
            return Err(EngineError::Invariant(format!(
                "nonce {nonce} consumed, expected {expected_nonce}"
            )));
        }

        if self.ticks.len() == self.config.history_capacity {
            self.ticks.pop_front();
        }
        self.ticks.push_back(tick);
        self.streak.rounds += 1;
        let active = self.seeds.active();
        self.streak.last = Some(LastDraw {
            nonce,
            tick,
            server_seed_hash: active.server_seed_hash().to_string(),
            client_seed: active.client_seed.clone(),
        });

        let stake = self.current_bet;
        let hit = band.contains(tick);
        if hit {
            self.current_bet = payout(band_multiplier(&band, &self.config.economics), stake);
            self.status = RoundStatus::WonStreak;
        } else {
            let record = self.record(BetResult::Loss, band, 0.0);
            self.bets.push(record);
            self.current_bet = 0.0;
            self.streak = Streak::default();
            self.status = RoundStatus::Idle;
        }
        debug!(
            nonce,
            tick,
            low = band.low(),
            high = band.high(),
            hit,
            current_bet = self.current_bet,
            "round resolved"
        );

        Ok(RoundOutcome {
            nonce,
            tick,
            hit,
            band,
            stake,
            current_bet: self.current_bet,
            status: self.status,
        })
    }

    /// Bank the streak's accumulated stake.
    pub fn cash_out(&mut self) -> EngineResult<BetRecord> {
        self.expect_status(RoundStatus::WonStreak)?;
        let band = self
            .streak
            .band
            .ok_or_else(|| EngineError::Invariant("streak without a staked band".into()))?;
        let winnings = self.current_bet;
        self.ledger.credit(winnings)?;

        let record = self.record(BetResult::Win, band, winnings);
        self.bets.push(record.clone());
        self.streak = Streak::default();
        self.status = RoundStatus::Idle;
        self.current_bet = self.default_stake();
        info!(
            amount = record.amount,
            payout = winnings,
            rounds = record.rounds,
            balance = self.ledger.balance,
            "cashed out"
        );
        Ok(record)
    }

    fn record(&self, result: BetResult, band: Band, payout: f64) -> BetRecord {
        let last = self.streak.last.clone().unwrap_or_default();
        BetRecord {
            result,
            tick: last.tick,
            amount: self.base_bet,
            payout,
            band,
            rounds: self.streak.rounds,
            last_nonce: last.nonce,
            server_seed_hash: last.server_seed_hash,
            client_seed: last.client_seed,
        }
    }

    /// Not while a round is being drawn; only future rounds are affected.
    pub fn set_client_seed(&mut self, client_seed: impl Into<String>) -> EngineResult<()> {
        if self.status == RoundStatus::Playing {
            return Err(EngineError::WrongState {
                expected: "idle or won_streak",
                actual: self.status,
            });
        }
        self.seeds.set_client_seed(client_seed)
    }

    /// Reveal the current seed pair and commit to a new one. Only between
    /// games, so every game is verifiable against a single pair.
    pub fn rotate_seeds(&mut self) -> EngineResult<RevealedSeeds> {
        self.expect_status(RoundStatus::Idle)?;
        self.seeds.rotate().cloned()
    }

    /// Next bet's stake, clamped to what the balance can cover.
    pub fn default_stake(&self) -> f64 {
        round6(self.base_bet.min(self.ledger.balance))
    }

    pub fn status(&self) -> RoundStatus {
        self.status
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn balance(&self) -> f64 {
        self.ledger.balance
    }

    pub fn base_bet(&self) -> f64 {
        self.base_bet
    }

    pub fn current_bet(&self) -> f64 {
        self.current_bet
    }

    pub fn band(&self) -> Band {
        self.band
    }

    pub fn mode(&self) -> BandMode {
        self.mode
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn seeds(&self) -> &SeedManager {
        &self.seeds
    }

    /// Multiplier of the band the next round would use.
    pub fn multiplier(&self) -> f64 {
        band_multiplier(&self.band, &self.config.economics)
    }

    /// What the next hit would pay, given the current band.
    pub fn potential_payout(&self) -> f64 {
        let stake = match self.status {
            RoundStatus::Idle => self.default_stake(),
            RoundStatus::Playing | RoundStatus::WonStreak => self.current_bet,
        };
        let band = match self.status {
            RoundStatus::Playing => self.streak.band.unwrap_or(self.band),
            _ => self.band,
        };
        payout(band_multiplier(&band, &self.config.economics), stake)
    }

    pub fn ticks(&self) -> impl Iterator<Item = Tick> + '_ {
        self.ticks.iter().copied()
    }

    pub fn bet_history(&self) -> &[BetRecord] {
        &self.bets
    }

    pub fn view(&self) -> EngineView {
        let active = self.seeds.active();
        EngineView {
            status: self.status,
            balance: self.ledger.balance,
            base_bet: self.base_bet,
            current_bet: self.current_bet,
            default_stake: self.default_stake(),
            band: self.band,
            mode: self.mode,
            multiplier: self.multiplier(),
            potential_payout: self.potential_payout(),
            ticks: self.ticks().collect(),
            server_seed_hash: active.server_seed_hash().to_string(),
            client_seed: active.client_seed.clone(),
            nonce: active.nonce(),
            revealed: self.seeds.revealed().cloned(),
            verifiable: self.source.is_verifiable(),
        }
    }
}

fn validate_amount(amount: f64) -> EngineResult<f64> {
    let amount = round6(amount);
    if !amount.is_finite() || amount <= 0.0 {
        return Err(EngineError::InvalidAmount(amount));
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::sha256_hex;
    use crate::rng::{generate_tick, OutcomeMode, TICK_MAX};
    use crate::seeds::SeedPair;

    /// Replays a fixed list of ticks.
    struct Scripted(VecDeque<Tick>);

    impl OutcomeSource for Scripted {
        fn draw(&mut self, _seeds: &SeedPair, _nonce: u64) -> EngineResult<Tick> {
            self.0
                .pop_front()
                .ok_or_else(|| EngineError::Invariant("script exhausted".into()))
        }

        fn is_verifiable(&self) -> bool {
            false
        }
    }

    fn engine_with(ticks: &[Tick]) -> RoundEngine {
        engine(EngineConfig::default().initial_balance, ticks)
    }

    fn engine(balance: f64, ticks: &[Tick]) -> RoundEngine {
        let config = EngineConfig {
            initial_balance: balance,
            ..EngineConfig::default()
        };
        let seeds = SeedManager::from_parts(&"00".repeat(64), "abc").unwrap();
        let mut engine =
            RoundEngine::with_source(config, seeds, Box::new(Scripted(ticks.iter().copied().collect())))
                .unwrap();
        engine
            .request_range(RangeIntent { low: 500, high: 600, mode: BandMode::Range })
            .unwrap();
        engine
    }

    /// Provably-fair engine on the zero seed: ticks 422, 108, 568, ...
    fn fair_engine() -> RoundEngine {
        let seeds = SeedManager::from_parts(&"00".repeat(64), "abc").unwrap();
        RoundEngine::with_seeds(EngineConfig::default(), seeds).unwrap()
    }

    #[test]
    fn test_win_then_cash_out() {
        let mut engine = engine(100.0, &[550]);
        engine.place_bet(50.0).unwrap();
        assert_eq!(engine.balance(), 50.0);
        assert_eq!(engine.status(), RoundStatus::Playing);

        let out = engine.resolve_round().unwrap();
        assert!(out.hit);
        assert_eq!(out.nonce, 0);
        assert_eq!(engine.status(), RoundStatus::WonStreak);
        assert_eq!(engine.current_bet(), 425.0);

        let record = engine.cash_out().unwrap();
        assert_eq!(record.result, BetResult::Win);
        assert_eq!(record.amount, 50.0);
        assert_eq!(record.payout, 425.0);
        assert_eq!(engine.balance(), 475.0);
        assert_eq!(engine.status(), RoundStatus::Idle);
        assert_eq!(engine.current_bet(), 50.0);
    }

    #[test]
    fn test_compound_streak_then_loss_records_base_bet() {
        let mut engine = engine(100.0, &[510, 520, 10]);
        engine.place_bet(10.0).unwrap();
        engine.resolve_round().unwrap();
        assert_eq!(engine.current_bet(), 85.0);
        engine.compound().unwrap();
        engine.resolve_round().unwrap();
        assert_eq!(engine.current_bet(), 722.5);
        engine.play().unwrap();
        let out = engine.resolve_round().unwrap();
        assert!(!out.hit);
        assert_eq!(out.stake, 722.5);

        assert_eq!(engine.status(), RoundStatus::Idle);
        assert_eq!(engine.current_bet(), 0.0);
        assert_eq!(engine.balance(), 90.0);
        let history = engine.bet_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].result, BetResult::Loss);
        assert_eq!(history[0].amount, 10.0);
        assert_eq!(history[0].rounds, 3);
        assert_eq!(history[0].tick, 10);
        assert_eq!(history[0].last_nonce, 2);
    }

    #[test]
    fn test_insufficient_funds_leaves_state() {
        let mut engine = engine(40.0, &[0, 0, 0]);
        engine.place_bet(30.0).unwrap();
        assert_eq!(engine.balance(), 10.0);
        engine.resolve_round().unwrap();
        let err = engine.place_bet(30.0).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientFunds { .. }));
        assert!(err.is_recoverable());
        assert_eq!(engine.balance(), 10.0);
        assert_eq!(engine.status(), RoundStatus::Idle);
        assert_eq!(engine.default_stake(), 10.0);
    }

    #[test]
    fn test_play_stakes_what_balance_covers() {
        let mut engine = engine(40.0, &[0, 0]);
        engine.set_bet(30.0).unwrap();
        engine.play().unwrap();
        engine.resolve_round().unwrap();
        assert_eq!(engine.balance(), 10.0);

        assert!(matches!(
            engine.place_bet(30.0),
            Err(EngineError::InsufficientFunds { .. })
        ));
        engine.play().unwrap();
        assert_eq!(engine.current_bet(), 10.0);
        assert_eq!(engine.balance(), 0.0);
        engine.resolve_round().unwrap();

        let err = engine.play().unwrap_err();
        assert!(matches!(
            err,
            EngineError::InsufficientFunds { available, .. } if available == 0.0
        ));
        assert_eq!(engine.status(), RoundStatus::Idle);
        assert_eq!(engine.bet_history().len(), 2);
    }

    #[test]
    fn test_record_replays_seeds_of_final_draw() {
        let mut engine = fair_engine();
        let committed = engine.seeds().active().server_seed_hash().to_string();
        engine
            .request_range(RangeIntent { low: 400, high: 500, mode: BandMode::Range })
            .unwrap();
        engine.play().unwrap();
        assert_eq!(engine.resolve_round().unwrap().tick, 422);

        engine.set_client_seed("changed").unwrap();
        let record = engine.cash_out().unwrap();
        assert_eq!(record.client_seed, "abc");
        assert_eq!(record.server_seed_hash, committed);
        assert_eq!(record.server_seed_hash, sha256_hex(&"00".repeat(64)));
        let replayed =
            generate_tick(&"00".repeat(64), &record.client_seed, record.last_nonce).unwrap();
        assert_eq!(replayed, record.tick);
        assert_eq!(engine.view().client_seed, "changed");
    }

    #[test]
    fn test_over_mode_hits_and_excludes_tick_max() {
        let mut engine = fair_engine();
        let band = engine
            .request_range(RangeIntent { low: 400, high: 0, mode: BandMode::Over })
            .unwrap();
        assert_eq!((band.low(), band.high()), (400, TICK_MAX));
        assert_eq!(engine.mode(), BandMode::Over);
        engine.play().unwrap();
        let out = engine.resolve_round().unwrap();
        assert_eq!(out.tick, 422);
        assert!(out.hit);

        let mut engine = engine_with(&[TICK_MAX]);
        engine
            .request_range(RangeIntent { low: 400, high: 0, mode: BandMode::Over })
            .unwrap();
        engine.play().unwrap();
        assert!(!engine.resolve_round().unwrap().hit);
    }

    #[test]
    fn test_under_mode_covers_tick_zero() {
        let mut engine = fair_engine();
        let band = engine
            .request_range(RangeIntent { low: 900, high: 450, mode: BandMode::Under })
            .unwrap();
        assert_eq!((band.low(), band.high()), (0, 450));
        engine.play().unwrap();
        assert!(engine.resolve_round().unwrap().hit);

        let mut engine = engine_with(&[0]);
        engine
            .request_range(RangeIntent { low: 0, high: 10, mode: BandMode::Under })
            .unwrap();
        engine.play().unwrap();
        let out = engine.resolve_round().unwrap();
        assert_eq!(out.tick, 0);
        assert!(out.hit);
    }

    #[test]
    fn test_demo_mode_resolves_unverifiable_rounds() {
        let mut engine = RoundEngine::new(EngineConfig {
            outcome: OutcomeMode::Demo,
            ..EngineConfig::default()
        })
        .unwrap();
        assert!(!engine.view().verifiable);
        for round in 0..20u64 {
            engine.play().unwrap();
            let out = engine.resolve_round().unwrap();
            assert!(out.tick <= TICK_MAX);
            assert_eq!(out.nonce, round);
            if out.hit {
                engine.cash_out().unwrap();
            }
        }
        assert_eq!(engine.seeds().active().nonce(), 20);
        assert_eq!(engine.bet_history().len(), 20);
    }

    #[test]
    fn test_rejects_bad_amounts() {
        let mut engine = engine(40.0, &[]);
        assert!(matches!(engine.place_bet(0.0), Err(EngineError::InvalidAmount(_))));
        assert!(matches!(engine.place_bet(-5.0), Err(EngineError::InvalidAmount(_))));
        assert!(engine.place_bet(f64::NAN).is_err());
        assert!(engine.set_bet(0.0).is_err());
        assert_eq!(engine.balance(), 40.0);
    }

    #[test]
    fn test_transitions_are_guarded() {
        let mut engine = engine(100.0, &[550]);
        assert!(matches!(engine.cash_out(), Err(EngineError::WrongState { .. })));
        assert!(engine.compound().is_err());
        assert!(engine.resolve_round().is_err());

        engine.place_bet(10.0).unwrap();
        assert!(engine.place_bet(10.0).is_err());
        assert!(engine.set_bet(5.0).is_err());
        assert!(engine.play().is_err());
        assert!(engine.rotate_seeds().is_err());
        assert!(engine.set_client_seed("x").is_err());
        assert!(engine.cash_out().is_err());
    }

    #[test]
    fn test_staked_band_survives_range_edit() {
        let mut engine = engine(100.0, &[550]);
        engine.place_bet(10.0).unwrap();
        engine
            .request_range(RangeIntent { low: 0, high: 100, mode: BandMode::Range })
            .unwrap();
        let out = engine.resolve_round().unwrap();
        assert!(out.hit);
        assert_eq!(out.band, Band::new(500, 600, 750).unwrap());
    }

    #[test]
    fn test_failed_draw_consumes_nothing() {
        let mut engine = engine(100.0, &[]);
        engine.place_bet(10.0).unwrap();
        assert!(engine.resolve_round().is_err());
        assert_eq!(engine.status(), RoundStatus::Playing);
        assert_eq!(engine.seeds().active().nonce(), 0);
    }

    #[test]
    fn test_tick_history_is_bounded() {
        let config = EngineConfig {
            history_capacity: 3,
            ..EngineConfig::default()
        };
        let seeds = SeedManager::from_parts(&"00".repeat(64), "abc").unwrap();
        let script = Scripted([1, 2, 3, 4, 5].into_iter().collect());
        let mut engine = RoundEngine::with_source(config, seeds, Box::new(script)).unwrap();
        engine
            .request_range(RangeIntent { low: 900, high: 1000, mode: BandMode::Range })
            .unwrap();
        for _ in 0..5 {
            engine.play().unwrap();
            engine.resolve_round().unwrap();
        }
        assert_eq!(engine.ticks().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(engine.bet_history().len(), 5);
    }

    #[test]
    fn test_view_reflects_state() {
        let mut engine = engine(100.0, &[550]);
        let view = engine.view();
        assert_eq!(view.status, RoundStatus::Idle);
        assert_eq!(view.multiplier, 8.5);
        assert_eq!(view.potential_payout, 85.0);
        assert_eq!(view.nonce, 0);
        assert!(!view.verifiable);

        engine.place_bet(20.0).unwrap();
        engine.resolve_round().unwrap();
        let view = engine.view();
        assert_eq!(view.status, RoundStatus::WonStreak);
        assert_eq!(view.nonce, 1);
        assert_eq!(view.ticks, vec![550]);
        assert_eq!(view.potential_payout, 1445.0);
    }

    #[test]
    fn test_ledger_rejects_overdraft() {
        let mut ledger = Ledger::new(5.0);
        let err = ledger.debit(6.0).unwrap_err();
        assert!(!err.is_recoverable());
        assert_eq!(ledger.balance, 5.0);
        ledger.debit(5.0).unwrap();
        assert_eq!(ledger.balance, 0.0);
        assert!(ledger.credit(-1.0).is_err());
    }
}
