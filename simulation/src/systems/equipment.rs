//! Equipment System
//!
//! Purchased machinery installed on fields. Effects scale with condition,
//! which wears down while the field is in use and is restored by maintenance.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::components::FieldId;
use crate::error::GameError;

/// Combined disease reduction never exceeds this
const MAX_DISEASE_REDUCTION: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentKind {
    BasicTractor,
    AdvancedTractor,
    SprinklerSystem,
    DripIrrigation,
    FertilizerSpreader,
    PrecisionSpreader,
    CombineHarvester,
    Cultivator,
    Greenhouse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentCategory {
    Tractor,
    Irrigation,
    Fertilizer,
    Harvester,
    Soil,
    Protection,
}

/// Raw effect values of one machine at full condition
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EquipmentStats {
    pub planting_speed: Option<f64>,
    pub harvesting_speed: Option<f64>,
    pub growth_bonus: Option<f64>,
    pub yield_bonus: Option<f64>,
    pub water_efficiency: Option<f64>,
    pub fertilizer_efficiency: Option<f64>,
    pub application_speed: Option<f64>,
    pub soil_improvement: Option<f64>,
    /// Tilling speed; scales how much compaction one pass breaks up
    pub preparation_speed: Option<f64>,
    /// Stretches the machine's own durability
    pub durability_bonus: Option<f64>,
    pub disease_reduction: Option<f64>,
    pub fuel_consumption: Option<f64>,
    pub weather_protection: bool,
    pub auto_watering: bool,
    pub auto_harvest: bool,
    /// Crops grow as if in their best season
    pub year_round: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquipmentInfo {
    pub name: &'static str,
    pub category: EquipmentCategory,
    pub cost: u64,
    pub durability: f64,
    pub maintenance_cost: u64,
    pub unlock_level: u32,
    pub stats: EquipmentStats,
}

impl EquipmentKind {
    pub const ALL: [EquipmentKind; 9] = [
        EquipmentKind::BasicTractor,
        EquipmentKind::AdvancedTractor,
        EquipmentKind::SprinklerSystem,
        EquipmentKind::DripIrrigation,
        EquipmentKind::FertilizerSpreader,
        EquipmentKind::PrecisionSpreader,
        EquipmentKind::CombineHarvester,
        EquipmentKind::Cultivator,
        EquipmentKind::Greenhouse,
    ];

    pub fn info(&self) -> EquipmentInfo {
        let none = EquipmentStats::default();
        match self {
            EquipmentKind::BasicTractor => EquipmentInfo {
                name: "Basic Tractor",
                category: EquipmentCategory::Tractor,
                cost: 2000,
                durability: 100.0,
                maintenance_cost: 50,
                unlock_level: 1,
                stats: EquipmentStats {
                    planting_speed: Some(1.5),
                    harvesting_speed: Some(1.5),
                    fuel_consumption: Some(10.0),
                    ..none
                },
            },
            EquipmentKind::AdvancedTractor => EquipmentInfo {
                name: "Advanced Tractor",
                category: EquipmentCategory::Tractor,
                cost: 5000,
                durability: 150.0,
                maintenance_cost: 100,
                unlock_level: 5,
                stats: EquipmentStats {
                    planting_speed: Some(2.0),
                    harvesting_speed: Some(2.0),
                    fuel_consumption: Some(8.0),
                    ..none
                },
            },
            EquipmentKind::SprinklerSystem => EquipmentInfo {
                name: "Sprinkler System",
                category: EquipmentCategory::Irrigation,
                cost: 1500,
                durability: 80.0,
                maintenance_cost: 30,
                unlock_level: 3,
                stats: EquipmentStats {
                    auto_watering: true,
                    water_efficiency: Some(1.3),
                    growth_bonus: Some(1.2),
                    ..none
                },
            },
            EquipmentKind::DripIrrigation => EquipmentInfo {
                name: "Drip Irrigation",
                category: EquipmentCategory::Irrigation,
                cost: 3000,
                durability: 120.0,
                maintenance_cost: 60,
                unlock_level: 7,
                stats: EquipmentStats {
                    auto_watering: true,
                    water_efficiency: Some(1.8),
                    growth_bonus: Some(1.4),
                    disease_reduction: Some(0.3),
                    ..none
                },
            },
            EquipmentKind::FertilizerSpreader => EquipmentInfo {
                name: "Fertilizer Spreader",
                category: EquipmentCategory::Fertilizer,
                cost: 1200,
                durability: 90.0,
                maintenance_cost: 40,
                unlock_level: 2,
                stats: EquipmentStats {
                    fertilizer_efficiency: Some(1.5),
                    yield_bonus: Some(1.3),
                    application_speed: Some(2.0),
                    ..none
                },
            },
            EquipmentKind::PrecisionSpreader => EquipmentInfo {
                name: "Precision Spreader",
                category: EquipmentCategory::Fertilizer,
                cost: 4000,
                durability: 140.0,
                maintenance_cost: 80,
                unlock_level: 8,
                stats: EquipmentStats {
                    fertilizer_efficiency: Some(2.2),
                    yield_bonus: Some(1.6),
                    application_speed: Some(3.0),
                    soil_improvement: Some(1.2),
                    ..none
                },
            },
            EquipmentKind::CombineHarvester => EquipmentInfo {
                name: "Combine Harvester",
                category: EquipmentCategory::Harvester,
                cost: 8000,
                durability: 200.0,
                maintenance_cost: 150,
                unlock_level: 10,
                stats: EquipmentStats {
                    harvesting_speed: Some(3.0),
                    yield_bonus: Some(1.4),
                    auto_harvest: true,
                    fuel_consumption: Some(15.0),
                    ..none
                },
            },
            EquipmentKind::Cultivator => EquipmentInfo {
                name: "Soil Cultivator",
                category: EquipmentCategory::Soil,
                cost: 1800,
                durability: 100.0,
                maintenance_cost: 45,
                unlock_level: 4,
                stats: EquipmentStats {
                    soil_improvement: Some(2.0),
                    preparation_speed: Some(1.8),
                    durability_bonus: Some(1.1),
                    ..none
                },
            },
            EquipmentKind::Greenhouse => EquipmentInfo {
                name: "Greenhouse",
                category: EquipmentCategory::Protection,
                cost: 6000,
                durability: 300.0,
                maintenance_cost: 100,
                unlock_level: 6,
                stats: EquipmentStats {
                    weather_protection: true,
                    growth_bonus: Some(1.5),
                    disease_reduction: Some(0.5),
                    year_round: true,
                    ..none
                },
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumableKind {
    Fuel,
    Fertilizer,
    Pesticide,
    Seeds,
}

impl ConsumableKind {
    pub const fn name(&self) -> &'static str {
        match self {
            ConsumableKind::Fuel => "Diesel Fuel",
            ConsumableKind::Fertilizer => "Premium Fertilizer",
            ConsumableKind::Pesticide => "Pesticide",
            ConsumableKind::Seeds => "Premium Seeds",
        }
    }

    pub const fn cost_per_unit(&self) -> u64 {
        match self {
            ConsumableKind::Fuel => 5,
            ConsumableKind::Fertilizer => 8,
            ConsumableKind::Pesticide => 12,
            ConsumableKind::Seeds => 3,
        }
    }

    pub const fn stack_size(&self) -> u32 {
        match self {
            ConsumableKind::Fuel => 100,
            ConsumableKind::Fertilizer => 50,
            ConsumableKind::Pesticide => 30,
            ConsumableKind::Seeds => 200,
        }
    }
}

/// Growth speed bonus of a crop planted from premium seeds
pub const PREMIUM_SEED_GROWTH: f64 = 1.1;

/// Ownership record for one equipment type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnedEquipment {
    /// Units not yet installed
    pub available: u32,
    pub installed: u32,
    /// 0-100, shared by every unit of the type
    pub condition: f64,
    pub last_maintenance_ms: u64,
}

/// Folded effects of everything installed on one field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldEquipmentEffects {
    pub planting_speed: f64,
    pub harvesting_speed: f64,
    pub growth_bonus: f64,
    pub yield_bonus: f64,
    pub water_efficiency: f64,
    pub fertilizer_efficiency: f64,
    pub soil_improvement: f64,
    pub preparation_speed: f64,
    pub disease_reduction: f64,
    pub weather_protection: bool,
    pub auto_watering: bool,
    pub auto_harvest: bool,
    pub year_round: bool,
}

impl Default for FieldEquipmentEffects {
    fn default() -> Self {
        Self {
            planting_speed: 1.0,
            harvesting_speed: 1.0,
            growth_bonus: 1.0,
            yield_bonus: 1.0,
            water_efficiency: 1.0,
            fertilizer_efficiency: 1.0,
            soil_improvement: 1.0,
            preparation_speed: 1.0,
            disease_reduction: 0.0,
            weather_protection: false,
            auto_watering: false,
            auto_harvest: false,
            year_round: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquipmentSystem {
    pub owned: BTreeMap<EquipmentKind, OwnedEquipment>,
    pub field_equipment: BTreeMap<FieldId, Vec<EquipmentKind>>,
    pub inventory: HashMap<ConsumableKind, u32>,
}

impl EquipmentSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and record a purchase; returns the cost to charge
    pub fn buy(
        &mut self,
        kind: EquipmentKind,
        money: u64,
        level: u32,
        now_ms: u64,
    ) -> Result<u64, GameError> {
        let info = kind.info();
        GameError::require_level(level, info.unlock_level)?;
        GameError::require_funds(money, info.cost)?;

        self.owned
            .entry(kind)
            .and_modify(|o| o.available += 1)
            .or_insert(OwnedEquipment {
                available: 1,
                installed: 0,
                condition: 100.0,
                last_maintenance_ms: now_ms,
            });
        Ok(info.cost)
    }

    /// Install an owned unit. Installing a type already on the field is a no-op.
    pub fn install(&mut self, kind: EquipmentKind, field: FieldId) -> Result<(), GameError> {
        let owned = self.owned.get_mut(&kind).ok_or(GameError::EquipmentNotOwned)?;
        let on_field = self.field_equipment.entry(field).or_default();
        if on_field.contains(&kind) {
            return Ok(());
        }
        if owned.available == 0 {
            return Err(GameError::EquipmentUnavailable);
        }
        on_field.push(kind);
        owned.available -= 1;
        owned.installed += 1;
        debug!("Installed {} on field {}", kind.info().name, field);
        Ok(())
    }

    pub fn installed_on(&self, field: FieldId) -> &[EquipmentKind] {
        self.field_equipment
            .get(&field)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn condition(&self, kind: EquipmentKind) -> f64 {
        self.owned.get(&kind).map(|o| o.condition.max(0.0)).unwrap_or(0.0)
    }

    /// Fold installed equipment into one set of multipliers, scaled by condition
    pub fn field_effects(&self, field: FieldId) -> FieldEquipmentEffects {
        let mut fx = FieldEquipmentEffects::default();
        for kind in self.installed_on(field) {
            let stats = kind.info().stats;
            let efficiency = self.condition(*kind) / 100.0;

            if let Some(v) = stats.planting_speed {
                fx.planting_speed *= v * efficiency;
            }
            if let Some(v) = stats.harvesting_speed {
                fx.harvesting_speed *= v * efficiency;
            }
            if let Some(v) = stats.growth_bonus {
                fx.growth_bonus *= v * efficiency;
            }
            if let Some(v) = stats.yield_bonus {
                fx.yield_bonus *= v * efficiency;
            }
            if let Some(v) = stats.water_efficiency {
                fx.water_efficiency *= v * efficiency;
            }
            if let Some(v) = stats.fertilizer_efficiency {
                fx.fertilizer_efficiency *= v * efficiency;
            }
            if let Some(v) = stats.soil_improvement {
                fx.soil_improvement *= v * efficiency;
            }
            if let Some(v) = stats.preparation_speed {
                fx.preparation_speed *= v * efficiency;
            }
            if let Some(v) = stats.disease_reduction {
                fx.disease_reduction += v * efficiency;
            }
            fx.weather_protection |= stats.weather_protection;
            fx.auto_watering |= stats.auto_watering;
            fx.auto_harvest |= stats.auto_harvest;
            fx.year_round |= stats.year_round;
        }
        fx.disease_reduction = fx.disease_reduction.min(MAX_DISEASE_REDUCTION);
        fx
    }

    /// Wear equipment installed on fields that are growing a crop
    pub fn degrade(&mut self, active_fields: &BTreeSet<FieldId>) {
        let in_use: BTreeSet<EquipmentKind> = self
            .field_equipment
            .iter()
            .filter(|(field, _)| active_fields.contains(field))
            .flat_map(|(_, kinds)| kinds.iter().copied())
            .collect();

        for kind in in_use {
            if let Some(owned) = self.owned.get_mut(&kind) {
                let info = kind.info();
                let durability = info.durability * info.stats.durability_bonus.unwrap_or(1.0);
                let rate = 100.0 / durability;
                owned.condition = (owned.condition - rate).max(0.0);
            }
        }
    }

    /// Restore condition to 100; returns the cost to charge
    pub fn maintain(&mut self, kind: EquipmentKind, money: u64, now_ms: u64) -> Result<u64, GameError> {
        let owned = self.owned.get_mut(&kind).ok_or(GameError::EquipmentNotOwned)?;
        let cost = kind.info().maintenance_cost;
        GameError::require_funds(money, cost)?;
        owned.condition = 100.0;
        owned.last_maintenance_ms = now_ms;
        Ok(cost)
    }

    /// Add consumables to the inventory; returns the cost to charge
    pub fn buy_consumable(&mut self, kind: ConsumableKind, quantity: u32, money: u64) -> Result<u64, GameError> {
        let cost = kind.cost_per_unit() * quantity as u64;
        GameError::require_funds(money, cost)?;
        *self.inventory.entry(kind).or_insert(0) += quantity;
        Ok(cost)
    }

    pub fn use_consumable(&mut self, kind: ConsumableKind, quantity: u32) -> Result<(), GameError> {
        let current = self.inventory.get(&kind).copied().unwrap_or(0);
        if current < quantity {
            return Err(GameError::NotEnoughItems);
        }
        self.inventory.insert(kind, current - quantity);
        Ok(())
    }

    pub fn owned_equipment(&self) -> impl Iterator<Item = (&EquipmentKind, &OwnedEquipment)> {
        self.owned.iter()
    }

    pub fn inventory_count(&self, kind: ConsumableKind) -> u32 {
        self.inventory.get(&kind).copied().unwrap_or(0)
    }

    /// Return every unit installed on a field to the available pool
    pub fn uninstall_all(&mut self, field: FieldId) {
        if let Some(kinds) = self.field_equipment.remove(&field) {
            for kind in kinds {
                if let Some(owned) = self.owned.get_mut(&kind) {
                    owned.installed = owned.installed.saturating_sub(1);
                    owned.available += 1;
                }
            }
        }
    }
}
