//! Persistence module for save/load of game state
//!
//! Serializes the whole game (ECS fields plus every system) into a versioned
//! snapshot. Files ending in `.bin` are written with bincode, everything else
//! as JSON.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::components::*;
use crate::crops::CropKind;
use crate::systems::achievements::AchievementSystem;
use crate::systems::disease::DiseaseSystem;
use crate::systems::equipment::EquipmentSystem;
use crate::systems::field_management::FieldUpgrade;
use crate::systems::market::MarketSystem;
use crate::systems::weather::WeatherSystem;
use crate::world::{rng_for, FarmTotals, GameWorld};

/// Bump when the snapshot layout changes
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("Unsupported save version {found} (expected {expected})")]
    VersionMismatch { expected: u32, found: u32 },
}

// ============================================================================
// Snapshot Data Structures
// ============================================================================

/// Complete game state for persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    /// RNG is reseeded from `seed` and the clock tick on load
    pub seed: u64,
    pub player: Player,
    pub farm: FarmTotals,
    pub clock: GameClock,
    pub paused: bool,
    pub game_speed: f64,
    pub notifications: bool,
    pub next_field_id: u32,
    pub harvested_since_tick: Vec<(CropKind, u32)>,
    pub fields: Vec<FieldSnapshot>,
    pub weather: WeatherSystem,
    pub market: MarketSystem,
    pub diseases: DiseaseSystem,
    pub equipment: EquipmentSystem,
    pub achievements: AchievementSystem,
}

/// One field with all its components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    pub id: FieldId,
    pub soil: Soil,
    pub history: FieldHistory,
    pub upgrades: Vec<FieldUpgrade>,
    /// None when the field is empty
    pub planting: Option<Planting>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveFormat {
    Json,
    Bincode,
}

impl SaveFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("bin") | Some("bincode") => SaveFormat::Bincode,
            _ => SaveFormat::Json,
        }
    }
}

/// Result of a save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveStats {
    pub fields: u32,
    pub bytes: u64,
    pub format: SaveFormat,
    pub saved_at: DateTime<Utc>,
}

/// Result of a load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    pub fields: u32,
    pub planted: u32,
    pub tick: u64,
    pub money: u64,
}

// ============================================================================
// Export / Import
// ============================================================================

impl GameWorld {
    pub fn snapshot(&self) -> Snapshot {
        let mut fields = Vec::with_capacity(self.fields.len());
        for (id, entity) in &self.fields {
            let Ok(mut query) = self
                .world
                .query_one::<(&Soil, &FieldHistory, &Upgrades, Option<&Planting>)>(*entity)
            else {
                continue;
            };
            if let Some((soil, history, upgrades, planting)) = query.get() {
                fields.push(FieldSnapshot {
                    id: *id,
                    soil: soil.clone(),
                    history: history.clone(),
                    upgrades: upgrades.0.clone(),
                    planting: planting.cloned(),
                });
            }
        }

        let mut harvested: Vec<(CropKind, u32)> = self
            .harvested_since_tick
            .iter()
            .map(|(crop, count)| (*crop, *count))
            .collect();
        harvested.sort();

        Snapshot {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            seed: self.seed,
            player: self.player.clone(),
            farm: self.farm.clone(),
            clock: self.clock,
            paused: self.paused,
            game_speed: self.game_speed,
            notifications: self.notifications,
            next_field_id: self.next_field_id,
            harvested_since_tick: harvested,
            fields,
            weather: self.weather.clone(),
            market: self.market.clone(),
            diseases: self.diseases.clone(),
            equipment: self.equipment.clone(),
            achievements: self.achievements.clone(),
        }
    }

    /// Replace the current state with a snapshot
    pub fn restore(&mut self, snapshot: Snapshot) -> Result<ImportResult, PersistenceError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(PersistenceError::VersionMismatch {
                expected: SNAPSHOT_VERSION,
                found: snapshot.version,
            });
        }

        self.world.clear();
        self.fields = BTreeMap::new();

        let mut planted = 0u32;
        for field in snapshot.fields {
            let parts = (field.id, field.soil, field.history, Upgrades(field.upgrades));
            let entity = match field.planting {
                Some(planting) => {
                    planted += 1;
                    let (id, soil, history, upgrades) = parts;
                    self.world.spawn((id, soil, history, upgrades, planting))
                }
                None => self.world.spawn(parts),
            };
            self.fields.insert(field.id, entity);
        }

        self.seed = snapshot.seed;
        self.player = snapshot.player;
        self.farm = snapshot.farm;
        self.clock = snapshot.clock;
        self.paused = snapshot.paused;
        self.game_speed = snapshot.game_speed;
        self.notifications = snapshot.notifications;
        self.next_field_id = snapshot.next_field_id;
        self.harvested_since_tick = snapshot.harvested_since_tick.into_iter().collect::<HashMap<_, _>>();
        self.weather = snapshot.weather;
        self.market = snapshot.market;
        self.diseases = snapshot.diseases;
        self.equipment = snapshot.equipment;
        self.achievements = snapshot.achievements;
        self.rng = rng_for(self.seed, self.clock.tick);

        Ok(ImportResult {
            fields: self.fields.len() as u32,
            planted,
            tick: self.clock.tick,
            money: self.player.money,
        })
    }

    pub fn export_json(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string(&self.snapshot())?)
    }

    pub fn import_json(&mut self, json: &str) -> Result<ImportResult, PersistenceError> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        self.restore(snapshot)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<SaveStats, PersistenceError> {
        let path = path.as_ref();
        let snapshot = self.snapshot();
        let format = SaveFormat::from_path(path);
        let bytes = match format {
            SaveFormat::Json => serde_json::to_vec_pretty(&snapshot)?,
            SaveFormat::Bincode => bincode::serialize(&snapshot)?,
        };
        std::fs::write(path, &bytes)?;

        info!("Saved game to {} ({} bytes)", path.display(), bytes.len());
        Ok(SaveStats {
            fields: snapshot.fields.len() as u32,
            bytes: bytes.len() as u64,
            format,
            saved_at: snapshot.saved_at,
        })
    }

    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<ImportResult, PersistenceError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let snapshot: Snapshot = match SaveFormat::from_path(path) {
            SaveFormat::Json => serde_json::from_slice(&bytes)?,
            SaveFormat::Bincode => bincode::deserialize(&bytes)?,
        };
        let result = self.restore(snapshot)?;
        info!(
            "Loaded game from {} (tick {}, {} fields)",
            path.display(),
            result.tick,
            result.fields
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;

    fn played_game() -> GameWorld {
        let mut game = GameWorld::new(&GameConfig::default());
        game.player.money = 5_000;
        game.buy_field().unwrap();
        for id in game.fields.keys().copied().collect::<Vec<_>>() {
            let _ = game.plant(id, CropKind::Wheat);
        }
        for _ in 0..5 {
            game.tick();
        }
        game
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("fieldwork-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_json_round_trip_restores_fields() {
        let game = played_game();
        let json = game.export_json().unwrap();

        let mut restored = GameWorld::new(&GameConfig::default().with_seed(1));
        let result = restored.import_json(&json).unwrap();

        assert_eq!(result.fields, 4);
        assert_eq!(result.tick, 5);
        assert_eq!(result.planted as usize, game.planted_fields().len());
        assert_eq!(restored.state(), game.state());
    }

    #[test]
    fn test_restored_game_keeps_ticking_deterministically() {
        let game = played_game();
        let snapshot = game.snapshot();

        let mut a = GameWorld::new(&GameConfig::default());
        let mut b = GameWorld::new(&GameConfig::default());
        a.restore(snapshot.clone()).unwrap();
        b.restore(snapshot).unwrap();
        for _ in 0..50 {
            a.tick();
            b.tick();
        }
        assert_eq!(a.state(), b.state());
    }

    #[test]
    fn test_bincode_file_round_trip() {
        let game = played_game();
        let path = temp_path("save.bin");
        let stats = game.save_to_file(&path).unwrap();
        assert_eq!(stats.format, SaveFormat::Bincode);
        assert_eq!(stats.fields, 4);
        assert!(stats.bytes > 0);

        let mut restored = GameWorld::default();
        restored.load_from_file(&path).unwrap();
        assert_eq!(restored.state(), game.state());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_rejects_unknown_version() {
        let game = played_game();
        let mut snapshot = game.snapshot();
        snapshot.version = 99;
        let mut target = GameWorld::default();
        assert!(matches!(
            target.restore(snapshot),
            Err(PersistenceError::VersionMismatch { expected: 1, found: 99 })
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SaveFormat::from_path(Path::new("farm.json")), SaveFormat::Json);
        assert_eq!(SaveFormat::from_path(Path::new("farm.bin")), SaveFormat::Bincode);
        assert_eq!(SaveFormat::from_path(Path::new("farm")), SaveFormat::Json);
    }
}
