//! Achievement & Leveling System
//!
//! Tracks lifetime player stats, unlocks achievements when their requirement
//! is met and turns XP into levels. Rewards are queued and drained by the
//! world once per tick.

use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::crops::CropKind;
use crate::systems::equipment::EquipmentKind;

/// Harvest timestamps kept for the speed-harvest window
const SPEED_HARVEST_SAMPLES: usize = 64;
/// A day counts toward the efficiency streak at this utilization
const UTILIZATION_THRESHOLD: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementId {
    FirstHarvest,
    SpeedFarmer,
    MasterFarmer,
    Millionaire,
    MarketMaster,
    LandBaron,
    Mechanized,
    WeatherSurvivor,
    DiseaseDoctor,
    CropCollector,
    EarlyBird,
    EfficiencyExpert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementCategory {
    Farming,
    Economic,
    Expansion,
    Equipment,
    Special,
    Collection,
    Time,
    Efficiency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Requirement {
    Harvests(u64),
    SpeedHarvest { count: usize, window_ms: u64 },
    Money(u64),
    SingleSale(u64),
    Fields(u32),
    EquipmentTypes(usize),
    WeatherSurvival(u32),
    DiseaseTreatment(u32),
    CropTypes(usize),
    EarlyPlanting(u32),
    Utilization { days: u32, threshold: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reward {
    pub xp: u64,
    pub money: u64,
    pub unlock: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Achievement {
    pub name: &'static str,
    pub description: &'static str,
    pub category: AchievementCategory,
    pub rarity: Rarity,
    pub requirement: Requirement,
    pub reward: Reward,
}

impl AchievementId {
    pub const ALL: [AchievementId; 12] = [
        AchievementId::FirstHarvest,
        AchievementId::SpeedFarmer,
        AchievementId::MasterFarmer,
        AchievementId::Millionaire,
        AchievementId::MarketMaster,
        AchievementId::LandBaron,
        AchievementId::Mechanized,
        AchievementId::WeatherSurvivor,
        AchievementId::DiseaseDoctor,
        AchievementId::CropCollector,
        AchievementId::EarlyBird,
        AchievementId::EfficiencyExpert,
    ];

    pub const fn info(&self) -> Achievement {
        use AchievementCategory as C;
        const fn reward(xp: u64, money: u64, unlock: Option<&'static str>) -> Reward {
            Reward { xp, money, unlock }
        }
        match self {
            AchievementId::FirstHarvest => Achievement {
                name: "First Harvest",
                description: "Harvest your first crop",
                category: C::Farming,
                rarity: Rarity::Common,
                requirement: Requirement::Harvests(1),
                reward: reward(50, 100, None),
            },
            AchievementId::SpeedFarmer => Achievement {
                name: "Speed Farmer",
                description: "Harvest 10 crops in under 5 minutes",
                category: C::Farming,
                rarity: Rarity::Rare,
                requirement: Requirement::SpeedHarvest { count: 10, window_ms: 300_000 },
                reward: reward(200, 500, None),
            },
            AchievementId::MasterFarmer => Achievement {
                name: "Master Farmer",
                description: "Harvest 1000 crops total",
                category: C::Farming,
                rarity: Rarity::Legendary,
                requirement: Requirement::Harvests(1000),
                reward: reward(1000, 5000, Some("master_seeds")),
            },
            AchievementId::Millionaire => Achievement {
                name: "Millionaire",
                description: "Accumulate ₹1,000,000",
                category: C::Economic,
                rarity: Rarity::Epic,
                requirement: Requirement::Money(1_000_000),
                reward: reward(500, 0, Some("gold_tractor")),
            },
            AchievementId::MarketMaster => Achievement {
                name: "Market Master",
                description: "Make a profit of ₹10,000 in a single sale",
                category: C::Economic,
                rarity: Rarity::Rare,
                requirement: Requirement::SingleSale(10_000),
                reward: reward(300, 2000, None),
            },
            AchievementId::LandBaron => Achievement {
                name: "Land Baron",
                description: "Own 20 fields",
                category: C::Expansion,
                rarity: Rarity::Epic,
                requirement: Requirement::Fields(20),
                reward: reward(800, 10_000, None),
            },
            AchievementId::Mechanized => Achievement {
                name: "Mechanized Farmer",
                description: "Own 5 different types of equipment",
                category: C::Equipment,
                rarity: Rarity::Rare,
                requirement: Requirement::EquipmentTypes(5),
                reward: reward(400, 3000, None),
            },
            AchievementId::WeatherSurvivor => Achievement {
                name: "Weather Survivor",
                description: "Survive 10 storms without losing crops",
                category: C::Special,
                rarity: Rarity::Epic,
                requirement: Requirement::WeatherSurvival(10),
                reward: reward(600, 0, Some("weather_station")),
            },
            AchievementId::DiseaseDoctor => Achievement {
                name: "Disease Doctor",
                description: "Successfully treat 50 crop diseases",
                category: C::Special,
                rarity: Rarity::Rare,
                requirement: Requirement::DiseaseTreatment(50),
                reward: reward(500, 0, Some("advanced_treatments")),
            },
            AchievementId::CropCollector => Achievement {
                name: "Crop Collector",
                description: "Grow all 6 types of crops",
                category: C::Collection,
                rarity: Rarity::Uncommon,
                requirement: Requirement::CropTypes(6),
                reward: reward(300, 1500, None),
            },
            AchievementId::EarlyBird => Achievement {
                name: "Early Bird",
                description: "Plant crops early in the season 7 times",
                category: C::Time,
                rarity: Rarity::Uncommon,
                requirement: Requirement::EarlyPlanting(7),
                reward: reward(250, 800, None),
            },
            AchievementId::EfficiencyExpert => Achievement {
                name: "Efficiency Expert",
                description: "Achieve 95% field utilization for 30 days",
                category: C::Efficiency,
                rarity: Rarity::Epic,
                requirement: Requirement::Utilization { days: 30, threshold: UTILIZATION_THRESHOLD },
                reward: reward(700, 0, Some("efficiency_bonus")),
            },
        }
    }
}

// ============================================================================
// Levels
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelData {
    pub xp_required: u64,
    pub title: &'static str,
    pub unlocks: &'static [&'static str],
}

/// Index 0 is level 1
pub const LEVELS: [LevelData; 15] = [
    LevelData { xp_required: 0, title: "Novice Farmer", unlocks: &["basic_tractor"] },
    LevelData { xp_required: 500, title: "Apprentice Farmer", unlocks: &["fertilizer_spreader"] },
    LevelData { xp_required: 1200, title: "Skilled Farmer", unlocks: &["sprinkler_system"] },
    LevelData { xp_required: 2000, title: "Experienced Farmer", unlocks: &["cultivator"] },
    LevelData { xp_required: 3000, title: "Expert Farmer", unlocks: &["advanced_tractor"] },
    LevelData { xp_required: 4500, title: "Master Farmer", unlocks: &["greenhouse"] },
    LevelData { xp_required: 6500, title: "Agricultural Engineer", unlocks: &["drip_irrigation"] },
    LevelData { xp_required: 9000, title: "Farm Manager", unlocks: &["precision_spreader"] },
    LevelData { xp_required: 12000, title: "Agricultural Scientist", unlocks: &["weather_station"] },
    LevelData { xp_required: 16000, title: "Agricultural Mogul", unlocks: &["combine_harvester"] },
    LevelData { xp_required: 21000, title: "Tech Pioneer", unlocks: &["automated_farm"] },
    LevelData { xp_required: 27000, title: "Biotech Innovator", unlocks: &["genetic_lab"] },
    LevelData { xp_required: 34000, title: "Space Farmer", unlocks: &["space_seeds"] },
    LevelData { xp_required: 42000, title: "Quantum Agriculturalist", unlocks: &["quantum_growth"] },
    LevelData { xp_required: 52000, title: "Temporal Farmer", unlocks: &["time_machine"] },
];

pub const MAX_LEVEL: u32 = LEVELS.len() as u32;

pub fn level_data(level: u32) -> Option<&'static LevelData> {
    LEVELS.get(level.checked_sub(1)? as usize)
}

/// Highest level whose threshold `xp` reaches
pub fn level_for_xp(xp: u64) -> u32 {
    LEVELS.iter().take_while(|l| xp >= l.xp_required).count().max(1) as u32
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelInfo {
    pub level: u32,
    pub xp: u64,
    pub title: String,
    pub xp_to_next: u64,
    pub xp_for_next: u64,
    pub unlocks: Vec<String>,
}

// ============================================================================
// Stats
// ============================================================================

/// A stat change reported by the world
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatUpdate {
    Harvest { crop: CropKind, at_ms: u64 },
    Planted(CropKind),
    Money(u64),
    SingleSale(u64),
    Fields(u32),
    Equipment(EquipmentKind),
    DiseaseTreated,
    WeatherSurvived,
    EarlyPlanting,
    /// Fraction of fields with a crop this day
    Utilization(f64),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub total_harvests: u64,
    /// Highest balance seen
    pub peak_money: u64,
    pub best_single_sale: u64,
    pub fields_owned: u32,
    pub equipment_owned: BTreeSet<EquipmentKind>,
    pub crops_grown: BTreeSet<CropKind>,
    pub diseases_treated: u32,
    pub storms_survived: u32,
    pub early_plantings: u32,
    /// Current streak of highly utilized days
    pub utilization_days: u32,
    pub harvest_times: VecDeque<u64>,
}

impl PlayerStats {
    fn speed_harvests(&self, window_ms: u64) -> usize {
        let Some(&latest) = self.harvest_times.back() else {
            return 0;
        };
        self.harvest_times
            .iter()
            .filter(|&&t| latest.saturating_sub(t) < window_ms)
            .count()
    }

    fn current(&self, requirement: Requirement) -> f64 {
        match requirement {
            Requirement::Harvests(_) => self.total_harvests as f64,
            Requirement::SpeedHarvest { window_ms, .. } => self.speed_harvests(window_ms) as f64,
            Requirement::Money(_) => self.peak_money as f64,
            Requirement::SingleSale(_) => self.best_single_sale as f64,
            Requirement::Fields(_) => self.fields_owned as f64,
            Requirement::EquipmentTypes(_) => self.equipment_owned.len() as f64,
            Requirement::WeatherSurvival(_) => self.storms_survived as f64,
            Requirement::DiseaseTreatment(_) => self.diseases_treated as f64,
            Requirement::CropTypes(_) => self.crops_grown.len() as f64,
            Requirement::EarlyPlanting(_) => self.early_plantings as f64,
            Requirement::Utilization { .. } => self.utilization_days as f64,
        }
    }
}

impl Requirement {
    fn target(&self) -> f64 {
        match *self {
            Requirement::Harvests(n) | Requirement::Money(n) | Requirement::SingleSale(n) => n as f64,
            Requirement::SpeedHarvest { count, .. } => count as f64,
            Requirement::EquipmentTypes(n) | Requirement::CropTypes(n) => n as f64,
            Requirement::Fields(n)
            | Requirement::WeatherSurvival(n)
            | Requirement::DiseaseTreatment(n)
            | Requirement::EarlyPlanting(n) => n as f64,
            Requirement::Utilization { days, .. } => days as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingReward {
    LevelUp { level: u32 },
    Achievement { id: AchievementId },
}

impl PendingReward {
    /// Money this reward pays out
    pub fn money(&self) -> u64 {
        match self {
            PendingReward::LevelUp { .. } => 0,
            PendingReward::Achievement { id } => id.info().reward.money,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementStatus {
    pub id: AchievementId,
    pub name: String,
    pub unlocked: bool,
    pub progress: f64,
}

// ============================================================================
// System
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementSystem {
    pub unlocked: BTreeSet<AchievementId>,
    pub stats: PlayerStats,
    pub level: u32,
    pub xp: u64,
    pub pending: Vec<PendingReward>,
}

impl AchievementSystem {
    pub fn new() -> Self {
        Self {
            unlocked: BTreeSet::new(),
            stats: PlayerStats::default(),
            level: 1,
            xp: 0,
            pending: Vec::new(),
        }
    }

    /// Add XP, queueing a level-up reward for every level crossed.
    /// Returns the number of levels gained.
    pub fn add_xp(&mut self, amount: u64) -> u32 {
        self.xp += amount;
        let new_level = level_for_xp(self.xp);
        let gained = new_level.saturating_sub(self.level);
        for level in self.level + 1..=new_level {
            self.pending.push(PendingReward::LevelUp { level });
            info!("Reached level {}", level);
        }
        self.level = self.level.max(new_level);
        gained
    }

    pub fn record(&mut self, update: StatUpdate) {
        let stats = &mut self.stats;
        match update {
            StatUpdate::Harvest { crop, at_ms } => {
                stats.total_harvests += 1;
                stats.crops_grown.insert(crop);
                stats.harvest_times.push_back(at_ms);
                while stats.harvest_times.len() > SPEED_HARVEST_SAMPLES {
                    stats.harvest_times.pop_front();
                }
            }
            StatUpdate::Planted(crop) => {
                stats.crops_grown.insert(crop);
            }
            StatUpdate::Money(money) => stats.peak_money = stats.peak_money.max(money),
            StatUpdate::SingleSale(amount) => {
                stats.best_single_sale = stats.best_single_sale.max(amount)
            }
            StatUpdate::Fields(count) => stats.fields_owned = count,
            StatUpdate::Equipment(kind) => {
                stats.equipment_owned.insert(kind);
            }
            StatUpdate::DiseaseTreated => stats.diseases_treated += 1,
            StatUpdate::WeatherSurvived => stats.storms_survived += 1,
            StatUpdate::EarlyPlanting => stats.early_plantings += 1,
            StatUpdate::Utilization(ratio) => {
                if ratio >= UTILIZATION_THRESHOLD {
                    stats.utilization_days += 1;
                } else {
                    stats.utilization_days = 0;
                }
            }
        }

        self.check_achievements();
    }

    fn requirement_met(&self, requirement: Requirement) -> bool {
        self.stats.current(requirement) >= requirement.target()
    }

    fn check_achievements(&mut self) {
        for id in AchievementId::ALL {
            if !self.unlocked.contains(&id) && self.requirement_met(id.info().requirement) {
                self.unlock(id);
            }
        }
    }

    /// Unlock an achievement, queue its reward and grant its XP.
    /// Returns false if it was already unlocked.
    pub fn unlock(&mut self, id: AchievementId) -> bool {
        if !self.unlocked.insert(id) {
            return false;
        }
        let achievement = id.info();
        info!("Achievement unlocked: {}", achievement.name);
        self.pending.push(PendingReward::Achievement { id });
        if achievement.reward.xp > 0 {
            self.add_xp(achievement.reward.xp);
        }
        true
    }

    /// Completion percentage, 0-100
    pub fn progress(&self, id: AchievementId) -> f64 {
        if self.unlocked.contains(&id) {
            return 100.0;
        }
        let requirement = id.info().requirement;
        (self.stats.current(requirement) / requirement.target() * 100.0).min(100.0)
    }

    pub fn drain_rewards(&mut self) -> Vec<PendingReward> {
        std::mem::take(&mut self.pending)
    }

    pub fn level_info(&self) -> LevelInfo {
        let current = level_data(self.level);
        let next = level_data(self.level + 1);
        LevelInfo {
            level: self.level,
            xp: self.xp,
            title: current.map_or("Farmer", |l| l.title).to_string(),
            xp_to_next: next.map_or(0, |l| l.xp_required.saturating_sub(self.xp)),
            xp_for_next: next.map_or(0, |l| l.xp_required),
            unlocks: current
                .map(|l| l.unlocks.iter().map(|u| u.to_string()).collect())
                .unwrap_or_default(),
        }
    }

    pub fn by_category(&self, category: AchievementCategory) -> Vec<AchievementStatus> {
        AchievementId::ALL
            .iter()
            .filter(|id| id.info().category == category)
            .map(|&id| AchievementStatus {
                id,
                name: id.info().name.to_string(),
                unlocked: self.unlocked.contains(&id),
                progress: self.progress(id),
            })
            .collect()
    }

    pub fn unlocked(&self) -> impl Iterator<Item = AchievementId> + '_ {
        self.unlocked.iter().copied()
    }
}

impl Default for AchievementSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_thresholds() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(499), 1);
        assert_eq!(level_for_xp(500), 2);
        assert_eq!(level_for_xp(2999), 4);
        assert_eq!(level_for_xp(52_000), 15);
        assert_eq!(level_for_xp(1_000_000), MAX_LEVEL);
    }

    #[test]
    fn test_multi_level_jump_queues_each_level() {
        let mut achievements = AchievementSystem::new();
        assert_eq!(achievements.add_xp(2500), 3);
        assert_eq!(
            achievements.drain_rewards(),
            vec![
                PendingReward::LevelUp { level: 2 },
                PendingReward::LevelUp { level: 3 },
                PendingReward::LevelUp { level: 4 },
            ]
        );
        assert!(achievements.drain_rewards().is_empty());
    }

    #[test]
    fn test_first_harvest_unlocks_once() {
        let mut achievements = AchievementSystem::new();
        achievements.record(StatUpdate::Harvest { crop: CropKind::Wheat, at_ms: 1000 });
        achievements.record(StatUpdate::Harvest { crop: CropKind::Corn, at_ms: 2000 });

        let rewards = achievements.drain_rewards();
        assert_eq!(rewards, vec![PendingReward::Achievement { id: AchievementId::FirstHarvest }]);
        assert_eq!(rewards[0].money(), 100);
        assert_eq!(achievements.xp, 50);
        assert!(!achievements.unlock(AchievementId::FirstHarvest));
    }

    #[test]
    fn test_speed_farmer_needs_harvests_inside_window() {
        let mut slow = AchievementSystem::new();
        for i in 0..10 {
            slow.record(StatUpdate::Harvest { crop: CropKind::Lettuce, at_ms: i * 60_000 });
        }
        assert!(!slow.unlocked.contains(&AchievementId::SpeedFarmer));

        let mut fast = AchievementSystem::new();
        for i in 0..10 {
            fast.record(StatUpdate::Harvest { crop: CropKind::Lettuce, at_ms: i * 10_000 });
        }
        assert!(fast.unlocked.contains(&AchievementId::SpeedFarmer));
    }

    #[test]
    fn test_utilization_streak_resets() {
        let mut achievements = AchievementSystem::new();
        for _ in 0..29 {
            achievements.record(StatUpdate::Utilization(1.0));
        }
        achievements.record(StatUpdate::Utilization(0.5));
        assert_eq!(achievements.stats.utilization_days, 0);
        for _ in 0..30 {
            achievements.record(StatUpdate::Utilization(0.95));
        }
        assert!(achievements.unlocked.contains(&AchievementId::EfficiencyExpert));
    }

    #[test]
    fn test_progress_and_categories() {
        let mut achievements = AchievementSystem::new();
        achievements.record(StatUpdate::Fields(5));
        assert!((achievements.progress(AchievementId::LandBaron) - 25.0).abs() < 1e-9);

        for crop in [CropKind::Wheat, CropKind::Corn, CropKind::Potato] {
            achievements.record(StatUpdate::Planted(crop));
        }
        assert!((achievements.progress(AchievementId::CropCollector) - 50.0).abs() < 1e-9);

        let farming = achievements.by_category(AchievementCategory::Farming);
        assert_eq!(farming.len(), 3);
        assert_eq!(achievements.by_category(AchievementCategory::Special).len(), 2);
    }

    #[test]
    fn test_level_info_at_cap() {
        let mut achievements = AchievementSystem::new();
        achievements.add_xp(60_000);
        let info = achievements.level_info();
        assert_eq!(info.level, 15);
        assert_eq!(info.title, "Temporal Farmer");
        assert_eq!(info.xp_to_next, 0);
        assert_eq!(info.xp_for_next, 0);
    }
}
