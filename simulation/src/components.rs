//! ECS Components for farm fields, plus the player and game clock
//!
//! Every field is an entity carrying `FieldId`, `Soil`, `FieldHistory` and
//! `Upgrades`. A growing crop is a `Planting` component that exists only
//! between plant and harvest.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crops::CropKind;
use crate::systems::field_management::FieldUpgrade;

/// Crop history entries kept per field
pub const CROP_HISTORY_LEN: usize = 10;
/// Recent crops considered for rotation
pub const ROTATION_HISTORY_LEN: usize = 5;
/// Soil quality samples kept per field
pub const SOIL_HISTORY_LEN: usize = 50;

// ============================================================================
// Identity Components
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldId(pub u32);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Soil Components
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoilType {
    Clay,
    Sandy,
    Loam,
    Silt,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Nutrients {
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    /// Percent organic matter
    pub organic_matter: f64,
}

impl Nutrients {
    /// Mean of N, P and K
    pub fn npk_average(&self) -> f64 {
        (self.nitrogen + self.phosphorus + self.potassium) / 3.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Soil {
    pub soil_type: SoilType,
    /// Nominally 1-10; amendments can push it higher
    pub quality: f64,
    /// Percent
    pub moisture: f64,
    pub nutrients: Nutrients,
    pub ph: f64,
    /// Percent
    pub compaction: f64,
    pub erosion: f64,
}

// ============================================================================
// Crop Components
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthStage {
    Planted,
    Sprouting,
    Growing,
    Flowering,
    Ripening,
    Ready,
}

impl GrowthStage {
    pub fn from_progress(progress: f64) -> Self {
        if progress >= 100.0 {
            GrowthStage::Ready
        } else if progress >= 90.0 {
            GrowthStage::Ripening
        } else if progress >= 75.0 {
            GrowthStage::Flowering
        } else if progress >= 50.0 {
            GrowthStage::Growing
        } else if progress >= 20.0 {
            GrowthStage::Sprouting
        } else {
            GrowthStage::Planted
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthState {
    pub stage: GrowthStage,
    /// 0-100
    pub progress: f64,
    pub time_remaining_ms: u64,
}

/// A crop in the ground
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Planting {
    pub crop: CropKind,
    pub planted_at_ms: u64,
    pub growth: GrowthState,
    /// Extra growth factor from premium seeds (1.0 without)
    pub seed_bonus: f64,
}

impl Planting {
    pub fn new(crop: CropKind, planted_at_ms: u64, seed_bonus: f64) -> Self {
        Self {
            crop,
            planted_at_ms,
            growth: GrowthState {
                stage: GrowthStage::Planted,
                progress: 0.0,
                time_remaining_ms: crop.grow_time_ms(),
            },
            seed_bonus,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.growth.stage == GrowthStage::Ready
    }
}

// ============================================================================
// History Components
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestRecord {
    pub crop: CropKind,
    pub harvested_at_ms: u64,
    pub crop_yield: u64,
    pub disease_occurred: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldHistory {
    pub harvests: VecDeque<HarvestRecord>,
    /// Most recent crops, oldest first
    pub rotation: VecDeque<CropKind>,
    pub soil_quality: VecDeque<f64>,
    pub last_tilled_ms: Option<u64>,
    pub last_fertilized_ms: Option<u64>,
    pub last_watered_ms: Option<u64>,
}

impl FieldHistory {
    pub fn new(initial_quality: f64) -> Self {
        Self {
            soil_quality: VecDeque::from(vec![initial_quality]),
            ..Default::default()
        }
    }
}

/// Permanent improvements installed on a field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Upgrades(pub Vec<FieldUpgrade>);

impl Upgrades {
    pub fn has(&self, upgrade: FieldUpgrade) -> bool {
        self.0.contains(&upgrade)
    }
}

// ============================================================================
// Player
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub money: u64,
    pub level: u32,
    pub xp: u64,
    pub reputation: i64,
}

impl Player {
    pub fn new(id: &str, name: &str, money: u64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            money,
            level: 1,
            xp: 0,
            reputation: 0,
        }
    }

    /// Deduct `cost`, assuming the caller already checked funds
    pub fn charge(&mut self, cost: u64) {
        self.money = self.money.saturating_sub(cost);
    }
}

// ============================================================================
// Game Clock
// ============================================================================

/// Milliseconds of game time advanced by one tick
pub const TICK_MS: u64 = 1_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameClock {
    pub tick: u64,
    pub now_ms: u64,
}

impl GameClock {
    pub fn advance(&mut self) {
        self.tick += 1;
        self.now_ms += TICK_MS;
    }
}

/// Push onto a bounded history, dropping the oldest entry when full
pub fn push_bounded<T>(queue: &mut VecDeque<T>, value: T, cap: usize) {
    queue.push_back(value);
    while queue.len() > cap {
        queue.pop_front();
    }
}
