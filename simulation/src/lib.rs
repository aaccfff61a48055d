//! Fieldwork Simulation Engine
//!
//! Tick-driven farm simulation using ECS architecture: fields are entities,
//! weather, market, disease, equipment and achievements are systems composed
//! by `GameWorld`.

pub mod bench;
pub mod components;
pub mod config;
pub mod crops;
pub mod error;
pub mod multiplayer;
pub mod persistence;
pub mod runner;
pub mod store;
pub mod systems;
pub mod world;

#[cfg(feature = "node")]
pub mod napi_bindings;

pub use components::*;
pub use config::{ConfigError, GameConfig};
pub use crops::CropKind;
pub use error::GameError;
pub use persistence::{ImportResult, PersistenceError, SaveStats, Snapshot};
pub use runner::TickRunner;
pub use world::{GameState, GameWorld, HarvestOutcome, TickResult};
