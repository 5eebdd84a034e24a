use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tickband_core::{
    generate_tick, inverse_band_width, multiplier, payout, sha256_hex, verify_commitment,
    win_probability, BandMode, BetRecord, EngineConfig, EngineView, RangeIntent, RevealedSeeds,
    RoundEngine, RoundOutcome, RoundStatus, SeedManager,
};
use tickband_shared::{ApiError, ApiResult, BetLogEntry, PlayerCommand, VerifyRequest, VerifyResponse};

#[derive(Parser)]
#[command(name = "tickband", about = "Provably-fair range game: session driver and auditor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// JSON engine configuration file
    #[arg(long, global = true, env = "TICKBAND_CONFIG")]
    config: Option<PathBuf>,
    /// Override the return-to-player edge
    #[arg(long, global = true)]
    edge: Option<f64>,
    /// Override the starting balance
    #[arg(long, global = true)]
    balance: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Recompute a past tick from revealed seeds
    Verify {
        #[arg(long, required_unless_present = "json")]
        server_seed: Option<String>,
        #[arg(long, required_unless_present = "json")]
        client_seed: Option<String>,
        #[arg(long, required_unless_present = "json")]
        nonce: Option<u64>,
        /// Commitment published before play
        #[arg(long)]
        server_seed_hash: Option<String>,
        #[arg(long)]
        expect_tick: Option<u16>,
        /// Read a VerifyRequest from stdin, answer with a VerifyResponse
        #[arg(long)]
        json: bool,
    },
    /// Print the SHA-256 commitment of a server seed
    Hash { server_seed: String },
    /// Multiplier (and payout) for a band width
    Multiplier {
        width: u16,
        #[arg(long)]
        stake: Option<f64>,
    },
    /// Band width whose payout on `stake` is closest to `target`
    Solve {
        #[arg(long)]
        target: f64,
        #[arg(long)]
        stake: f64,
    },
    /// Drive a session with JSON-line commands on stdin
    Session {
        #[arg(long, env = "TICKBAND_SERVER_SEED")]
        server_seed: Option<String>,
        #[arg(long)]
        client_seed: Option<String>,
        /// Write the bet history here on exit
        #[arg(long)]
        export_csv: Option<PathBuf>,
    },
    /// Flat-bet simulation reporting realized return-to-player
    Simulate {
        #[arg(long, default_value_t = 10_000)]
        rounds: u64,
        #[arg(long, default_value_t = 1.0)]
        bet: f64,
        #[arg(long, default_value_t = 400)]
        low: i64,
        #[arg(long, default_value_t = 600)]
        high: i64,
        #[arg(long, value_enum, default_value_t = Mode::Range)]
        mode: Mode,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Mode {
    Range,
    Over,
    Under,
}

impl From<Mode> for BandMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Range => BandMode::Range,
            Mode::Over => BandMode::Over,
            Mode::Under => BandMode::Under,
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    if let Some(edge) = cli.edge {
        config.economics.edge = edge;
    }
    if let Some(balance) = cli.balance {
        config.initial_balance = balance;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Verify {
            server_seed,
            client_seed,
            nonce,
            server_seed_hash,
            expect_tick,
            json,
        } => {
            let req = if json {
                let mut raw = String::new();
                io::stdin().read_to_string(&mut raw)?;
                serde_json::from_str::<VerifyRequest>(&raw).context("parsing VerifyRequest")?
            } else {
                VerifyRequest {
                    server_seed: server_seed.context("--server-seed is required")?,
                    client_seed: client_seed.context("--client-seed is required")?,
                    nonce: nonce.context("--nonce is required")?,
                    server_seed_hash,
                    expected_tick: expect_tick,
                }
            };
            let resp = verify(&req)?;
            if json {
                println!("{}", serde_json::to_string(&resp)?);
            } else {
                println!(
                    "tick={} server_seed_hash={} commitment_ok={:?} tick_ok={:?}",
                    resp.tick, resp.server_seed_hash, resp.commitment_ok, resp.tick_ok
                );
            }
            if !resp.passed() {
                bail!("verification failed");
            }
        }
        Commands::Hash { server_seed } => {
            println!("{}", sha256_hex(&server_seed));
        }
        Commands::Multiplier { width, stake } => {
            let m = multiplier(width, &config.economics);
            match stake {
                Some(stake) => println!("multiplier={} payout={}", m, payout(m, stake)),
                None => println!("multiplier={}", m),
            }
        }
        Commands::Solve { target, stake } => {
            let sol = inverse_band_width(target, stake, &config.economics)?;
            let m = multiplier(sol.width, &config.economics);
            println!(
                "width={} multiplier={} payout={}",
                sol.width,
                m,
                payout(m, stake)
            );
            if let Some(warning) = sol.warning() {
                eprintln!("warning: {warning}");
            }
        }
        Commands::Session {
            server_seed,
            client_seed,
            export_csv,
        } => {
            let seeds = match (server_seed, client_seed) {
                (Some(server), client) => SeedManager::from_parts(
                    &server,
                    &client.unwrap_or_else(|| "tickband".to_string()),
                )?,
                (None, Some(client)) => {
                    SeedManager::init_with_client_seed(config.server_seed_bytes, client)?
                }
                (None, None) => {
                    SeedManager::init(config.server_seed_bytes, config.client_seed_bytes)?
                }
            };
            let engine = RoundEngine::with_seeds(config, seeds)?;
            run_session(engine, export_csv)?;
        }
        Commands::Simulate {
            rounds,
            bet,
            low,
            high,
            mode,
        } => simulate(config, rounds, bet, RangeIntent { low, high, mode: mode.into() })?,
    }

    Ok(())
}

fn verify(req: &VerifyRequest) -> anyhow::Result<VerifyResponse> {
    let tick = generate_tick(&req.server_seed, &req.client_seed, req.nonce)?;
    Ok(VerifyResponse {
        tick,
        server_seed_hash: sha256_hex(&req.server_seed),
        commitment_ok: req
            .server_seed_hash
            .as_deref()
            .map(|hash| verify_commitment(&req.server_seed, hash)),
        tick_ok: req.expected_tick.map(|expected| expected == tick),
    })
}

#[derive(Debug, Serialize, Default)]
struct Reply {
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<RoundOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cashed_out: Option<BetRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    revealed: Option<RevealedSeeds>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ApiError>,
    view: Option<EngineView>,
}

fn apply(engine: &mut RoundEngine, cmd: PlayerCommand) -> ApiResult<Reply> {
    let mut reply = Reply::default();
    match cmd {
        PlayerCommand::RequestRange(intent) => {
            engine.request_range(intent)?;
        }
        PlayerCommand::SetBet { amount } => engine.set_bet(amount)?,
        PlayerCommand::SetTargetPayout { target } => {
            let stake = match engine.status() {
                RoundStatus::Idle => engine.default_stake(),
                _ => engine.current_bet(),
            };
            let econ = engine.config().economics;
            let sol = inverse_band_width(target, stake, &econ)?;
            let band = engine.band().resize(sol.width, engine.mode(), econ.max_width);
            engine.request_range(RangeIntent {
                low: band.low() as i64,
                high: band.high() as i64,
                mode: engine.mode(),
            })?;
            reply.warning = sol.warning();
        }
        PlayerCommand::Play => {
            engine.play()?;
            reply.outcome = Some(engine.resolve_round()?);
        }
        PlayerCommand::CashOut => reply.cashed_out = Some(engine.cash_out()?),
        PlayerCommand::RotateSeed => reply.revealed = Some(engine.rotate_seeds()?),
        PlayerCommand::SetClientSeed { seed } => engine.set_client_seed(seed)?,
        PlayerCommand::Snapshot => {}
    }
    Ok(reply)
}

fn run_session(mut engine: RoundEngine, export_csv: Option<PathBuf>) -> anyhow::Result<()> {
    info!(
        server_seed_hash = %engine.view().server_seed_hash,
        "session started"
    );
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut log: Vec<BetLogEntry> = Vec::new();

    for line in io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut reply = match serde_json::from_str::<PlayerCommand>(&line) {
            Ok(cmd) => apply(&mut engine, cmd).unwrap_or_else(|e| {
                warn!(error = %e, "command refused");
                Reply {
                    error: Some(e),
                    ..Reply::default()
                }
            }),
            Err(e) => Reply {
                error: Some(ApiError::Invalid(e.to_string())),
                ..Reply::default()
            },
        };
        // Invariant violations end the session.
        let fatal = reply.error == Some(ApiError::Internal);

        let settled = engine.bet_history();
        for record in &settled[log.len()..] {
            log.push(BetLogEntry::from_record(log.len() as u64 + 1, Utc::now(), record));
        }
        reply.view = Some(engine.view());
        writeln!(out, "{}", serde_json::to_string(&reply)?)?;
        if fatal {
            bail!("session aborted after invariant violation");
        }
    }

    if let Some(path) = export_csv {
        let mut wtr = csv::Writer::from_path(&path)?;
        for entry in &log {
            wtr.serialize(entry)?;
        }
        wtr.flush()?;
        println!("Exported {} bets to {}", log.len(), path.display());
    }
    Ok(())
}

fn simulate(config: EngineConfig, rounds: u64, bet: f64, intent: RangeIntent) -> anyhow::Result<()> {
    if rounds == 0 {
        bail!("simulate needs at least one round");
    }
    if !bet.is_finite() || bet <= 0.0 {
        bail!("simulate bet must be positive, got {bet}");
    }
    let mut engine = RoundEngine::new(EngineConfig {
        initial_balance: bet * rounds as f64,
        ..config
    })?;
    let band = engine.request_range(intent)?;
    engine.set_bet(bet)?;
    for _ in 0..rounds {
        engine.play()?;
        if engine.resolve_round()?.hit {
            engine.cash_out()?;
        }
    }
    let ledger = engine.ledger();
    let theoretical = engine.multiplier() * win_probability(&band);
    println!(
        "band=[{}, {}) multiplier={} rounds={} staked={} paid={} rtp={:.4} theoretical={:.4}",
        band.low(),
        band.high(),
        engine.multiplier(),
        rounds,
        ledger.total_debited,
        ledger.total_credited,
        ledger.total_credited / ledger.total_debited,
        theoretical
    );
    Ok(())
}
