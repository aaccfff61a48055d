//! Field Management System
//!
//! Soil chemistry, tillage, fertilizer, irrigation, permanent field upgrades
//! and crop rotation. Works directly on the `Soil`, `FieldHistory` and
//! `Upgrades` components of a field entity.

use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::components::{
    push_bounded, FieldHistory, HarvestRecord, Nutrients, Soil, SoilType, Upgrades,
    CROP_HISTORY_LEN, ROTATION_HISTORY_LEN, SOIL_HISTORY_LEN,
};
use crate::crops::CropKind;
use crate::error::GameError;
use crate::systems::weather::WeatherKind;

/// Flat cost of tilling a field
pub const TILL_COST: u64 = 100;
/// Flat cost of hand-watering a field
pub const WATER_COST: u64 = 10;
/// Moisture added by one watering
const WATER_AMOUNT: f64 = 25.0;
/// Auto-watering keeps moisture at or above this
const AUTO_WATER_FLOOR: f64 = 60.0;
/// Fraction of the gap to the weather's moisture target closed per tick
const MOISTURE_DRIFT: f64 = 0.05;

// ============================================================================
// Soil Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoilInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub water_retention: f64,
    pub drainage_rate: f64,
    pub nutrient_retention: f64,
    pub workability: f64,
    pub best_crops: &'static [CropKind],
}

impl SoilType {
    pub const ALL: [SoilType; 4] = [SoilType::Clay, SoilType::Sandy, SoilType::Loam, SoilType::Silt];

    pub const fn info(&self) -> SoilInfo {
        use CropKind::*;
        match self {
            SoilType::Clay => SoilInfo {
                name: "Clay Soil",
                description: "Heavy soil, retains water well",
                water_retention: 1.4,
                drainage_rate: 0.6,
                nutrient_retention: 1.3,
                workability: 0.7,
                best_crops: &[Potato, Wheat],
            },
            SoilType::Sandy => SoilInfo {
                name: "Sandy Soil",
                description: "Light soil, drains quickly",
                water_retention: 0.6,
                drainage_rate: 1.5,
                nutrient_retention: 0.7,
                workability: 1.3,
                best_crops: &[Carrot, Lettuce],
            },
            SoilType::Loam => SoilInfo {
                name: "Loam Soil",
                description: "Perfect balanced soil",
                water_retention: 1.0,
                drainage_rate: 1.0,
                nutrient_retention: 1.0,
                workability: 1.0,
                best_crops: &[Tomato, Corn],
            },
            SoilType::Silt => SoilInfo {
                name: "Silt Soil",
                description: "Fine particles, good fertility",
                water_retention: 1.2,
                drainage_rate: 0.8,
                nutrient_retention: 1.4,
                workability: 0.9,
                best_crops: &[Wheat, Corn],
            },
        }
    }

    pub fn suits(&self, crop: CropKind) -> bool {
        self.info().best_crops.contains(&crop)
    }
}

// ============================================================================
// Field Upgrades
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldUpgrade {
    Drainage,
    SoilAmendment,
    Windbreak,
    Terracing,
    CompostBin,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpgradeInfo {
    pub name: &'static str,
    pub cost: u64,
    pub unlock_level: u32,
    /// Immediate soil quality gain on install
    pub soil_quality: f64,
    pub drainage_rate: f64,
    pub disease_reduction: f64,
    pub nutrient_retention: f64,
    pub water_retention: f64,
    pub microclimate: f64,
    /// Multiplier on fertilizer prices
    pub cost_reduction: f64,
}

impl FieldUpgrade {
    pub const ALL: [FieldUpgrade; 5] = [
        FieldUpgrade::Drainage,
        FieldUpgrade::SoilAmendment,
        FieldUpgrade::Windbreak,
        FieldUpgrade::Terracing,
        FieldUpgrade::CompostBin,
    ];

    pub const fn info(&self) -> UpgradeInfo {
        const NEUTRAL: UpgradeInfo = UpgradeInfo {
            name: "",
            cost: 0,
            unlock_level: 1,
            soil_quality: 0.0,
            drainage_rate: 1.0,
            disease_reduction: 0.0,
            nutrient_retention: 1.0,
            water_retention: 1.0,
            microclimate: 1.0,
            cost_reduction: 1.0,
        };
        match self {
            FieldUpgrade::Drainage => UpgradeInfo {
                name: "Drainage System",
                cost: 1500,
                unlock_level: 3,
                drainage_rate: 1.3,
                disease_reduction: 0.2,
                ..NEUTRAL
            },
            FieldUpgrade::SoilAmendment => UpgradeInfo {
                name: "Soil Amendment",
                cost: 2000,
                unlock_level: 4,
                soil_quality: 2.0,
                nutrient_retention: 1.2,
                ..NEUTRAL
            },
            FieldUpgrade::Windbreak => UpgradeInfo {
                name: "Windbreak Trees",
                cost: 1200,
                unlock_level: 2,
                microclimate: 1.1,
                ..NEUTRAL
            },
            FieldUpgrade::Terracing => UpgradeInfo {
                name: "Terracing",
                cost: 3000,
                unlock_level: 6,
                water_retention: 1.4,
                ..NEUTRAL
            },
            FieldUpgrade::CompostBin => UpgradeInfo {
                name: "Compost System",
                cost: 800,
                unlock_level: 1,
                cost_reduction: 0.8,
                ..NEUTRAL
            },
        }
    }
}

/// Combined disease reduction from a field's upgrades
pub fn upgrade_disease_reduction(upgrades: &Upgrades) -> f64 {
    upgrades.0.iter().map(|u| u.info().disease_reduction).sum()
}

// ============================================================================
// Fertilizers
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FertilizerKind {
    Basic,
    Premium,
    Organic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FertilizerInfo {
    pub cost: u64,
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    pub organic_matter: f64,
    pub soil_health: f64,
}

impl FertilizerKind {
    pub const fn info(&self) -> FertilizerInfo {
        match self {
            FertilizerKind::Basic => FertilizerInfo {
                cost: 50,
                nitrogen: 15.0,
                phosphorus: 10.0,
                potassium: 10.0,
                organic_matter: 0.0,
                soil_health: 0.0,
            },
            FertilizerKind::Premium => FertilizerInfo {
                cost: 100,
                nitrogen: 25.0,
                phosphorus: 20.0,
                potassium: 20.0,
                organic_matter: 3.0,
                soil_health: 0.0,
            },
            FertilizerKind::Organic => FertilizerInfo {
                cost: 80,
                nitrogen: 12.0,
                phosphorus: 8.0,
                potassium: 8.0,
                organic_matter: 8.0,
                soil_health: 0.2,
            },
        }
    }

    /// Price after any compost discount on the field
    pub fn cost_for(&self, upgrades: &Upgrades) -> u64 {
        let factor: f64 = upgrades.0.iter().map(|u| u.info().cost_reduction).product();
        (self.info().cost as f64 * factor).round() as u64
    }
}

// ============================================================================
// Soil lifecycle
// ============================================================================

/// Fresh soil for a newly acquired field
pub fn initialize_soil<R: Rng>(rng: &mut R) -> Soil {
    let soil_type = *SoilType::ALL.choose(rng).unwrap_or(&SoilType::Loam);
    Soil {
        soil_type,
        quality: rng.gen_range(5.0..8.0),
        moisture: rng.gen_range(40.0..70.0),
        nutrients: Nutrients {
            nitrogen: rng.gen_range(30.0..70.0),
            phosphorus: rng.gen_range(30.0..70.0),
            potassium: rng.gen_range(30.0..70.0),
            organic_matter: rng.gen_range(10.0..30.0),
        },
        ph: rng.gen_range(6.0..8.0),
        compaction: rng.gen_range(0.0..30.0),
        erosion: 0.0,
    }
}

fn soil_degradation(crop: CropKind, soil: &Soil) -> f64 {
    let mut degradation = crop.soil_degradation();
    if soil.soil_type.suits(crop) {
        degradation *= 0.7;
    }
    degradation * (1.0 + soil.compaction / 200.0)
}

/// Wear the soil down after a harvest and log the crop
pub fn update_after_harvest<R: Rng>(
    soil: &mut Soil,
    history: &mut FieldHistory,
    crop: CropKind,
    crop_yield: u64,
    disease_occurred: bool,
    now_ms: u64,
    rng: &mut R,
) {
    push_bounded(
        &mut history.harvests,
        HarvestRecord {
            crop,
            harvested_at_ms: now_ms,
            crop_yield,
            disease_occurred,
        },
        CROP_HISTORY_LEN,
    );
    push_bounded(&mut history.rotation, crop, ROTATION_HISTORY_LEN);

    soil.quality = (soil.quality - soil_degradation(crop, soil)).max(1.0);

    let n = &mut soil.nutrients;
    n.nitrogen = (n.nitrogen - rng.gen_range(10.0..25.0)).max(0.0);
    n.phosphorus = (n.phosphorus - rng.gen_range(5.0..15.0)).max(0.0);
    n.potassium = (n.potassium - rng.gen_range(5.0..15.0)).max(0.0);
    n.organic_matter = (n.organic_matter - rng.gen_range(1.0..4.0)).max(0.0);

    soil.compaction = (soil.compaction + rng.gen_range(2.0..7.0)).min(100.0);

    push_bounded(&mut history.soil_quality, soil.quality, SOIL_HISTORY_LEN);

    apply_rotation_benefits(soil, history);
}

/// Monoculture over the last three crops is punished, full diversity rewarded
fn apply_rotation_benefits(soil: &mut Soil, history: &FieldHistory) {
    let n = history.rotation.len();
    if n < 3 {
        return;
    }
    let recent: BTreeSet<CropKind> = history.rotation.iter().skip(n - 3).copied().collect();

    match recent.len() {
        1 => {
            soil.quality = (soil.quality - 0.5).max(1.0);
            soil.nutrients.nitrogen = (soil.nutrients.nitrogen - 10.0).max(0.0);
            soil.nutrients.phosphorus = (soil.nutrients.phosphorus - 5.0).max(0.0);
        }
        3 => {
            soil.quality += 0.3;
            soil.nutrients.organic_matter += 2.0;
        }
        _ => {}
    }
}

// ============================================================================
// Player actions
// ============================================================================

/// Install a permanent upgrade; returns the cost to charge
pub fn install_upgrade(
    soil: &mut Soil,
    upgrades: &mut Upgrades,
    upgrade: FieldUpgrade,
    money: u64,
    level: u32,
) -> Result<u64, GameError> {
    let info = upgrade.info();
    GameError::require_level(level, info.unlock_level)?;
    GameError::require_funds(money, info.cost)?;
    if upgrades.has(upgrade) {
        return Err(GameError::UpgradeInstalled);
    }

    upgrades.0.push(upgrade);
    soil.quality += info.soil_quality;
    Ok(info.cost)
}

/// Break up compaction and even out N/P/K; returns the cost to charge.
/// `soil_improvement` and `preparation` come from soil equipment on the field.
pub fn till(
    soil: &mut Soil,
    history: &mut FieldHistory,
    money: u64,
    now_ms: u64,
    soil_improvement: f64,
    preparation: f64,
) -> Result<u64, GameError> {
    GameError::require_funds(money, TILL_COST)?;

    soil.compaction = (soil.compaction - 30.0 * preparation).max(0.0);
    soil.quality += 0.1 * soil_improvement;

    let avg = soil.nutrients.npk_average();
    let n = &mut soil.nutrients;
    n.nitrogen = (n.nitrogen + avg) / 2.0;
    n.phosphorus = (n.phosphorus + avg) / 2.0;
    n.potassium = (n.potassium + avg) / 2.0;

    history.last_tilled_ms = Some(now_ms);
    Ok(TILL_COST)
}

/// Apply fertilizer; returns the cost to charge.
/// `efficiency` scales the nutrients delivered (spreader equipment).
pub fn fertilize(
    soil: &mut Soil,
    history: &mut FieldHistory,
    upgrades: &Upgrades,
    kind: FertilizerKind,
    money: u64,
    now_ms: u64,
    efficiency: f64,
) -> Result<u64, GameError> {
    let info = kind.info();
    let cost = kind.cost_for(upgrades);
    GameError::require_funds(money, cost)?;

    let n = &mut soil.nutrients;
    n.nitrogen = (n.nitrogen + info.nitrogen * efficiency).min(100.0);
    n.phosphorus = (n.phosphorus + info.phosphorus * efficiency).min(100.0);
    n.potassium = (n.potassium + info.potassium * efficiency).min(100.0);
    if info.organic_matter > 0.0 {
        n.organic_matter = (n.organic_matter + info.organic_matter).min(50.0);
    }
    soil.quality += info.soil_health;

    history.last_fertilized_ms = Some(now_ms);
    Ok(cost)
}

/// Hand-water a field; returns the cost to charge
pub fn water(
    soil: &mut Soil,
    history: &mut FieldHistory,
    money: u64,
    now_ms: u64,
    water_efficiency: f64,
) -> Result<u64, GameError> {
    GameError::require_funds(money, WATER_COST)?;
    soil.moisture = (soil.moisture + WATER_AMOUNT * water_efficiency).min(100.0);
    history.last_watered_ms = Some(now_ms);
    Ok(WATER_COST)
}

/// Drift moisture toward what the weather supports
pub fn update_moisture(soil: &mut Soil, upgrades: &Upgrades, weather: WeatherKind, auto_watering: bool) {
    let info = soil.soil_type.info();
    let retention: f64 = info.water_retention
        * upgrades.0.iter().map(|u| u.info().water_retention).product::<f64>();
    let drainage: f64 =
        info.drainage_rate * upgrades.0.iter().map(|u| u.info().drainage_rate).product::<f64>();

    let target = weather.moisture_target();
    let gap = target - soil.moisture;
    let rate = if gap < 0.0 {
        MOISTURE_DRIFT * drainage / retention
    } else {
        MOISTURE_DRIFT * retention
    };
    soil.moisture = (soil.moisture + gap * rate.min(1.0)).clamp(0.0, 100.0);

    if auto_watering && soil.moisture < AUTO_WATER_FLOOR {
        soil.moisture = AUTO_WATER_FLOOR;
    }
}

// ============================================================================
// Queries
// ============================================================================

/// Weighted 0-100 productivity score
pub fn productivity(soil: &Soil) -> f64 {
    let mut score = 0.0;
    score += soil.quality / 10.0 * 40.0;
    score += soil.nutrients.npk_average() / 100.0 * 30.0;

    let moisture_score = 100.0 - (soil.moisture - 70.0).abs();
    score += moisture_score / 100.0 * 15.0;

    score += (100.0 - soil.compaction) / 100.0 * 10.0;

    let ph_score = 100.0 - (soil.ph - 7.0).abs() * 20.0;
    score += ph_score / 100.0 * 5.0;

    score.clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdviceLevel {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldAction {
    SoilAmendment,
    Fertilize,
    Till,
    Water,
    Rotate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAdvice {
    pub level: AdviceLevel,
    pub message: &'static str,
    pub action: FieldAction,
}

pub fn recommendations(soil: &Soil, history: &FieldHistory) -> Vec<FieldAdvice> {
    let mut advice = Vec::new();

    if soil.quality < 5.0 {
        advice.push(FieldAdvice {
            level: AdviceLevel::Critical,
            message: "Soil quality is very poor. Consider soil amendment or letting field rest.",
            action: FieldAction::SoilAmendment,
        });
    }
    if soil.nutrients.nitrogen < 30.0 {
        advice.push(FieldAdvice {
            level: AdviceLevel::Warning,
            message: "Nitrogen levels are low. Apply nitrogen-rich fertilizer.",
            action: FieldAction::Fertilize,
        });
    }
    if soil.compaction > 60.0 {
        advice.push(FieldAdvice {
            level: AdviceLevel::Warning,
            message: "Soil is heavily compacted. Till the field to improve structure.",
            action: FieldAction::Till,
        });
    }
    if soil.moisture < 40.0 {
        advice.push(FieldAdvice {
            level: AdviceLevel::Info,
            message: "Soil moisture is low. Consider watering or installing irrigation.",
            action: FieldAction::Water,
        });
    }

    let n = history.rotation.len();
    if n >= 2 && history.rotation[n - 1] == history.rotation[n - 2] {
        advice.push(FieldAdvice {
            level: AdviceLevel::Info,
            message: "Consider crop rotation to improve soil health and prevent disease.",
            action: FieldAction::Rotate,
        });
    }

    advice
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropEffects {
    pub growth_multiplier: f64,
    pub yield_multiplier: f64,
}

/// Growth and yield multipliers the soil gives a crop
pub fn effects_on_crop(soil: &Soil, upgrades: &Upgrades, crop: CropKind) -> CropEffects {
    let mut growth = 1.0;
    let mut yld = 1.0;

    if soil.soil_type.suits(crop) {
        growth *= 1.2;
        yld *= 1.3;
    }

    growth *= 0.5 + soil.quality / 20.0;
    yld *= 0.6 + soil.quality / 25.0;

    yld *= 0.7 + soil.nutrients.npk_average() / 200.0;

    growth *= (soil.moisture / 60.0).clamp(0.3, 1.2);

    let compaction_penalty = 1.0 - soil.compaction / 200.0;
    growth *= compaction_penalty;
    yld *= compaction_penalty;

    for upgrade in &upgrades.0 {
        let info = upgrade.info();
        if info.soil_quality > 0.0 {
            yld *= 1.1;
        }
        yld *= info.nutrient_retention;
        growth *= info.microclimate;
    }

    CropEffects {
        growth_multiplier: growth.max(0.1),
        yield_multiplier: yld.max(0.1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn loam() -> Soil {
        Soil {
            soil_type: SoilType::Loam,
            quality: 7.0,
            moisture: 60.0,
            nutrients: Nutrients {
                nitrogen: 50.0,
                phosphorus: 50.0,
                potassium: 50.0,
                organic_matter: 20.0,
            },
            ph: 7.0,
            compaction: 0.0,
            erosion: 0.0,
        }
    }

    #[test]
    fn test_initial_soil_ranges() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let soil = initialize_soil(&mut rng);
            assert!((5.0..8.0).contains(&soil.quality));
            assert!((40.0..70.0).contains(&soil.moisture));
            assert!((6.0..8.0).contains(&soil.ph));
            assert!(soil.compaction < 30.0);
        }
    }

    #[test]
    fn test_harvest_degrades_soil() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut soil = loam();
        let mut history = FieldHistory::new(soil.quality);
        update_after_harvest(&mut soil, &mut history, CropKind::Corn, 70, false, 1000, &mut rng);

        // Corn suits loam: 0.4 * 0.7
        assert!((soil.quality - (7.0 - 0.28)).abs() < 1e-9);
        assert!(soil.nutrients.nitrogen <= 40.0);
        assert!(soil.compaction >= 2.0);
        assert_eq!(history.harvests.len(), 1);
        assert_eq!(history.soil_quality.len(), 2);
    }

    #[test]
    fn test_monoculture_penalty_and_diversity_bonus() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut mono = loam();
        let mut mono_history = FieldHistory::new(mono.quality);
        let mut diverse = loam();
        let mut diverse_history = FieldHistory::new(diverse.quality);

        for crop in [CropKind::Wheat; 3] {
            update_after_harvest(&mut mono, &mut mono_history, crop, 40, false, 0, &mut rng);
        }
        for crop in [CropKind::Wheat, CropKind::Potato, CropKind::Lettuce] {
            update_after_harvest(&mut diverse, &mut diverse_history, crop, 40, false, 0, &mut rng);
        }
        assert!(diverse.quality > mono.quality);
        assert!(recommendations(&mono, &mono_history)
            .iter()
            .any(|a| a.action == FieldAction::Rotate));
    }

    #[test]
    fn test_install_upgrade_rules() {
        let mut soil = loam();
        let mut upgrades = Upgrades::default();
        assert_eq!(
            install_upgrade(&mut soil, &mut upgrades, FieldUpgrade::SoilAmendment, 5000, 3),
            Err(GameError::LevelLocked { required: 4 })
        );
        assert_eq!(
            install_upgrade(&mut soil, &mut upgrades, FieldUpgrade::SoilAmendment, 5000, 4),
            Ok(2000)
        );
        assert!((soil.quality - 9.0).abs() < 1e-9);
        assert_eq!(
            install_upgrade(&mut soil, &mut upgrades, FieldUpgrade::SoilAmendment, 5000, 4),
            Err(GameError::UpgradeInstalled)
        );
    }

    #[test]
    fn test_till_evens_nutrients() {
        let mut soil = loam();
        soil.compaction = 40.0;
        soil.nutrients.nitrogen = 90.0;
        soil.nutrients.phosphorus = 30.0;
        soil.nutrients.potassium = 30.0;
        let mut history = FieldHistory::default();

        assert!(till(&mut soil, &mut history, 99, 0, 1.0, 1.0).is_err());
        assert_eq!(till(&mut soil, &mut history, 100, 5_000, 1.0, 1.0), Ok(TILL_COST));
        assert!((soil.compaction - 10.0).abs() < 1e-9);
        assert!((soil.nutrients.nitrogen - 70.0).abs() < 1e-9);
        assert!((soil.nutrients.phosphorus - 40.0).abs() < 1e-9);
        assert_eq!(history.last_tilled_ms, Some(5_000));
    }

    #[test]
    fn test_faster_preparation_breaks_more_compaction() {
        let mut soil = loam();
        soil.compaction = 80.0;
        let mut history = FieldHistory::default();
        till(&mut soil, &mut history, 100, 0, 2.0, 1.8).unwrap();
        assert!((soil.compaction - 26.0).abs() < 1e-9);
        till(&mut soil, &mut history, 100, 0, 2.0, 1.8).unwrap();
        assert_eq!(soil.compaction, 0.0);
    }

    #[test]
    fn test_fertilizer_caps_and_compost_discount() {
        let mut soil = loam();
        soil.nutrients.nitrogen = 95.0;
        let mut history = FieldHistory::default();
        let upgrades = Upgrades(vec![FieldUpgrade::CompostBin]);

        let cost = fertilize(&mut soil, &mut history, &upgrades, FertilizerKind::Premium, 500, 0, 1.0).unwrap();
        assert_eq!(cost, 80);
        assert_eq!(soil.nutrients.nitrogen, 100.0);
        assert!((soil.nutrients.organic_matter - 23.0).abs() < 1e-9);
    }

    #[test]
    fn test_moisture_follows_weather() {
        let mut soil = loam();
        let upgrades = Upgrades::default();
        for _ in 0..200 {
            update_moisture(&mut soil, &upgrades, WeatherKind::Drought, false);
        }
        assert!(soil.moisture < 25.0);

        update_moisture(&mut soil, &upgrades, WeatherKind::Drought, true);
        assert_eq!(soil.moisture, 60.0);
    }

    #[test]
    fn test_productivity_of_ideal_field() {
        let mut soil = loam();
        soil.quality = 10.0;
        soil.moisture = 70.0;
        soil.nutrients.nitrogen = 100.0;
        soil.nutrients.phosphorus = 100.0;
        soil.nutrients.potassium = 100.0;
        assert!((productivity(&soil) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_crop_effects_favor_best_crops() {
        let soil = loam();
        let upgrades = Upgrades::default();
        let tomato = effects_on_crop(&soil, &upgrades, CropKind::Tomato);
        let wheat = effects_on_crop(&soil, &upgrades, CropKind::Wheat);
        assert!(tomato.growth_multiplier > wheat.growth_multiplier);
        // 0.5 + 7/20 = 0.85, moisture 60/60 = 1.0
        assert!((wheat.growth_multiplier - 0.85).abs() < 1e-9);
    }
}
