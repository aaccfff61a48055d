//! N-API bindings for Node.js

use std::sync::{Arc, Mutex, MutexGuard};

use napi::bindgen_prelude::*;
use napi_derive::napi;

use crate::bench;
use crate::components::FieldId;
use crate::config::GameConfig;
use crate::crops::CropKind;
use crate::world::GameWorld;

type GameHandle = Arc<Mutex<GameWorld>>;

fn to_napi(e: impl std::fmt::Display) -> Error {
    Error::from_reason(e.to_string())
}

fn lock(game: &GameHandle) -> MutexGuard<'_, GameWorld> {
    game.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Create a game from optional JSON config
#[napi]
pub fn create_game(config_json: Option<String>) -> Result<External<GameHandle>> {
    let config = match config_json {
        Some(json) => GameConfig::from_json(&json).map_err(to_napi)?,
        None => GameConfig::default(),
    };
    Ok(External::new(Arc::new(Mutex::new(GameWorld::new(&config)))))
}

/// Run one tick; returns the tick summary as JSON, or null while paused
#[napi]
pub fn tick(game: External<GameHandle>) -> Result<Option<String>> {
    let result = lock(&game).tick();
    result
        .map(|r| serde_json::to_string(&r).map_err(to_napi))
        .transpose()
}

#[napi]
pub fn tick_many(game: External<GameHandle>, count: u32) {
    let mut g = lock(&game);
    for _ in 0..count {
        g.tick();
    }
}

#[napi]
pub fn plant(game: External<GameHandle>, field: u32, crop: String) -> Result<()> {
    let crop: CropKind = crop.parse().map_err(to_napi)?;
    lock(&game).plant(FieldId(field), crop).map_err(to_napi)
}

/// Harvest a ready field; returns the outcome as JSON
#[napi]
pub fn harvest(game: External<GameHandle>, field: u32) -> Result<String> {
    let outcome = lock(&game).harvest(FieldId(field)).map_err(to_napi)?;
    serde_json::to_string(&outcome).map_err(to_napi)
}

#[napi]
pub fn buy_field(game: External<GameHandle>) -> Result<u32> {
    lock(&game).buy_field().map(|id| id.0).map_err(to_napi)
}

#[napi]
pub fn set_paused(game: External<GameHandle>, paused: bool) {
    let mut g = lock(&game);
    if paused {
        g.pause();
    } else {
        g.resume();
    }
}

#[napi]
pub fn set_game_speed(game: External<GameHandle>, speed: f64) -> Result<()> {
    lock(&game).set_game_speed(speed).map_err(to_napi)
}

/// Full client-facing state as JSON
#[napi]
pub fn get_state(game: External<GameHandle>) -> Result<String> {
    let state = lock(&game).state();
    serde_json::to_string(&state).map_err(to_napi)
}

#[napi]
pub fn save_game(game: External<GameHandle>, path: String) -> Result<u32> {
    let stats = lock(&game).save_to_file(&path).map_err(to_napi)?;
    Ok(stats.bytes as u32)
}

#[napi]
pub fn load_game(game: External<GameHandle>, path: String) -> Result<u32> {
    let result = lock(&game).load_from_file(&path).map_err(to_napi)?;
    Ok(result.fields)
}

/// Get actual process memory usage in bytes
#[napi]
pub fn get_memory_bytes() -> f64 {
    bench::memory_bytes() as f64
}

#[napi(object)]
pub struct JsBenchmarkResult {
    pub farms: u32,
    pub total_ms: f64,
    pub per_tick_ms: f64,
    pub total_harvests: f64,
    pub memory_bytes: f64,
}

#[napi]
pub fn run_benchmark(farms: u32, ticks: u32) -> JsBenchmarkResult {
    let result = bench::run_benchmark(&GameConfig::default(), farms, ticks as u64);
    JsBenchmarkResult {
        farms: result.farms,
        total_ms: result.total_ms,
        per_tick_ms: result.per_tick_ms,
        total_harvests: result.total_harvests as f64,
        memory_bytes: result.memory_bytes as f64,
    }
}
