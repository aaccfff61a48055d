//! Headless benchmark: many independent farms on autopilot, run in parallel

use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::GameConfig;
use crate::crops::CropKind;
use crate::world::GameWorld;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmOutcome {
    pub seed: u64,
    pub money: u64,
    pub harvests: u64,
    pub level: u32,
    pub fields: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub farms: u32,
    pub ticks: u64,
    pub total_ms: f64,
    pub per_tick_ms: f64,
    pub total_harvests: u64,
    pub richest: u64,
    /// Process physical memory after the run, 0 when unavailable
    pub memory_bytes: u64,
    pub outcomes: Vec<FarmOutcome>,
}

pub fn memory_bytes() -> u64 {
    memory_stats::memory_stats()
        .map(|stats| stats.physical_mem as u64)
        .unwrap_or(0)
}

/// Most valuable crop the field will accept right now
fn pick_crop(game: &GameWorld) -> CropKind {
    CropKind::ALL
        .iter()
        .copied()
        .max_by_key(|crop| game.market.price(*crop))
        .unwrap_or(CropKind::Wheat)
}

/// One round of player actions: harvest what's ready, replant what's empty,
/// buy land when flush.
pub fn autopilot(game: &mut GameWorld) {
    let ids: Vec<_> = game.fields.keys().copied().collect();
    for id in ids {
        match game.planting(id) {
            Some(planting) if planting.is_ready() => {
                if let Err(e) = game.harvest(id) {
                    debug!("Autopilot harvest of field {} failed: {}", id, e);
                }
            }
            Some(_) => continue,
            None => {}
        }
        if game.planting(id).is_none() {
            let best = pick_crop(game);
            if game.plant(id, best).is_err() {
                // Fall back to anything the soil tolerates
                for crop in CropKind::ALL {
                    if game.plant(id, crop).is_ok() {
                        break;
                    }
                }
            }
        }
    }

    if game.player.money > game.next_field_cost() * 4 {
        if let Err(e) = game.buy_field() {
            debug!("Autopilot field purchase failed: {}", e);
        }
    }
}

pub fn run_farm(config: &GameConfig, ticks: u64) -> FarmOutcome {
    let mut game = GameWorld::new(config);
    for _ in 0..ticks {
        autopilot(&mut game);
        game.tick();
    }
    debug!(
        "Farm {} finished with ₹{} after {} harvests",
        config.seed, game.player.money, game.farm.total_harvests
    );
    FarmOutcome {
        seed: config.seed,
        money: game.player.money,
        harvests: game.farm.total_harvests,
        level: game.player.level,
        fields: game.field_count() as u32,
    }
}

/// Simulate `farms` farms for `ticks` ticks each, seeds counting up from the config's
pub fn run_benchmark(config: &GameConfig, farms: u32, ticks: u64) -> BenchmarkResult {
    info!("Running benchmark: {} farms x {} ticks", farms, ticks);
    let quiet = GameConfig {
        notifications: false,
        ..config.clone()
    };

    let start = Instant::now();
    let outcomes: Vec<FarmOutcome> = (0..farms as u64)
        .into_par_iter()
        .map(|i| run_farm(&quiet.with_seed(config.seed.wrapping_add(i)), ticks))
        .collect();
    let elapsed = start.elapsed();

    let total_ms = elapsed.as_secs_f64() * 1000.0;
    let total_ticks = (farms as u64 * ticks).max(1);
    let result = BenchmarkResult {
        farms,
        ticks,
        total_ms,
        per_tick_ms: total_ms / total_ticks as f64,
        total_harvests: outcomes.iter().map(|o| o.harvests).sum(),
        richest: outcomes.iter().map(|o| o.money).max().unwrap_or(0),
        memory_bytes: memory_bytes(),
        outcomes,
    };

    info!(
        "Benchmark complete: {:.1}ms total, {:.4}ms per farm-tick, {} harvests",
        result.total_ms, result.per_tick_ms, result.total_harvests
    );
    result
}
