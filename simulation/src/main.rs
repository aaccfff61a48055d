//! Fieldwork headless runner
//!
//! Usage: fieldwork [--config game.json] [--ticks 120] [--load save.json]
//!                  [--save save.json] [--bench 8] [--verbose]

use std::env;

use anyhow::Context;
use simulation::bench;
use simulation::{GameConfig, GameWorld};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .skip_while(|a| a.as_str() != flag)
        .nth(1)
        .map(String::as_str)
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose");

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match flag_value(&args, "--config") {
        Some(path) => GameConfig::from_file(path).with_context(|| format!("loading config {}", path))?,
        None => GameConfig::default(),
    };
    if let Some(path) = flag_value(&args, "--save") {
        config.save_path = Some(path.into());
    }
    let ticks: u64 = match flag_value(&args, "--ticks") {
        Some(n) => n.parse().with_context(|| format!("invalid --ticks value {}", n))?,
        None => 120,
    };

    if let Some(farms) = flag_value(&args, "--bench") {
        let farms: u32 = farms
            .parse()
            .with_context(|| format!("invalid --bench value {}", farms))?;
        let result = bench::run_benchmark(&config, farms, ticks);
        info!(
            "{} farms, {} harvests, richest ₹{}, {} MB resident",
            result.farms,
            result.total_harvests,
            result.richest,
            result.memory_bytes / (1024 * 1024)
        );
        return Ok(());
    }

    info!("Fieldwork simulation starting (seed {})", config.seed);
    let mut game = GameWorld::new(&config);
    if let Some(path) = flag_value(&args, "--load") {
        game.load_from_file(path)
            .with_context(|| format!("loading save {}", path))?;
    }

    let start = std::time::Instant::now();
    for _ in 0..ticks {
        bench::autopilot(&mut game);
        if let Some(result) = game.tick() {
            if config.autosave_interval_ticks > 0
                && result.tick % config.autosave_interval_ticks == 0
            {
                if let Some(path) = &config.save_path {
                    game.save_to_file(path)?;
                }
            }
        }
    }
    let elapsed = start.elapsed();

    let state = game.state();
    info!(
        "Ran {} ticks in {:?}: ₹{}, level {}, {} harvests, {} fields",
        ticks,
        elapsed,
        state.player.money,
        state.level.level,
        state.farm.total_harvests,
        state.fields.len()
    );

    if let Some(path) = &config.save_path {
        let stats = game.save_to_file(path)?;
        info!("Saved {} fields ({} bytes)", stats.fields, stats.bytes);
    }

    Ok(())
}
