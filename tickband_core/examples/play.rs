use tickband_core::{
    generate_tick, BandMode, EngineConfig, RangeIntent, RoundEngine, RoundStatus,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Short session: bet, let one win ride, then reveal and verify.
    let mut engine = RoundEngine::new(EngineConfig::default())?;
    engine.request_range(RangeIntent {
        low: 250,
        high: 1000,
        mode: BandMode::Over,
    })?;
    println!(
        "commitment={} multiplier={}",
        engine.view().server_seed_hash,
        engine.multiplier()
    );

    let mut rounds = Vec::new();
    engine.play()?;
    let first = engine.resolve_round()?;
    rounds.push(first.clone());
    if first.hit {
        engine.compound()?;
        let second = engine.resolve_round()?;
        rounds.push(second);
        if engine.status() == RoundStatus::WonStreak {
            engine.cash_out()?;
        }
    }
    println!("balance={} history={:?}", engine.balance(), engine.bet_history());

    let revealed = engine.rotate_seeds()?;
    for round in rounds {
        let tick = generate_tick(&revealed.server_seed, &revealed.client_seed, round.nonce)?;
        println!("nonce={} tick={} verified={}", round.nonce, round.tick, tick == round.tick);
    }
    Ok(())
}
