//! Game World - main orchestrator
//!
//! Owns the ECS world of field entities, the player, the game clock and every
//! simulation system. Player actions validate, mutate and charge in one call;
//! `tick` runs all systems in a fixed order.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use hecs::{Entity, World};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::components::*;
use crate::config::GameConfig;
use crate::crops::CropKind;
use crate::error::GameError;
use crate::systems::achievements::{AchievementId, AchievementSystem, LevelInfo, PendingReward, StatUpdate};
use crate::systems::disease::{DiseaseKind, DiseaseSystem, Infection, SpreadTarget, TreatmentKind, TreatmentOutcome};
use crate::systems::equipment::{ConsumableKind, EquipmentKind, EquipmentSystem, PREMIUM_SEED_GROWTH};
use crate::systems::field_management::{self as fm, FertilizerKind, FieldAdvice, FieldUpgrade};
use crate::systems::growth;
use crate::systems::market::{ActiveMarketEvent, MarketAnalysis, MarketSystem};
use crate::systems::weather::{WeatherEffects, WeatherKind, WeatherSystem};

/// Fields below this soil growth multiplier refuse a crop
const MIN_PLANTING_GROWTH: f64 = 0.5;
/// Base price of a field; the n-th purchase costs n+1 times this
const FIELD_PRICE: u64 = 100;
/// Plantings in the first days of a season count as early
const EARLY_SEASON_DAYS: u32 = 6;

/// Lifetime farm totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmTotals {
    pub name: String,
    pub total_harvests: u64,
    pub total_earnings: u64,
}

impl Default for FarmTotals {
    fn default() -> Self {
        Self {
            name: "My Farm".to_string(),
            total_harvests: 0,
            total_earnings: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestOutcome {
    pub field: FieldId,
    pub crop: CropKind,
    pub earnings: u64,
    /// Base-price yield, recorded in the field history
    pub crop_yield: u64,
    pub yield_multiplier: f64,
    pub disease: Option<DiseaseKind>,
}

/// Summary of one tick, handed to the runner callback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickResult {
    pub tick: u64,
    pub now_ms: u64,
    pub weather: WeatherKind,
    pub weather_changed: bool,
    pub ripened: Vec<FieldId>,
    pub infections: Vec<(FieldId, DiseaseKind)>,
    pub auto_harvests: Vec<HarvestOutcome>,
    pub level_ups: Vec<u32>,
    pub achievements: Vec<AchievementId>,
    pub money: u64,
}

/// Read-only view of one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldView {
    pub id: FieldId,
    pub crop: Option<CropKind>,
    pub growth: Option<GrowthState>,
    pub soil: Soil,
    pub upgrades: Vec<FieldUpgrade>,
    pub equipment: Vec<EquipmentKind>,
    pub disease: Option<Infection>,
    pub productivity: f64,
}

/// Serializable view of everything a client renders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub player: Player,
    pub farm: FarmTotals,
    pub tick: u64,
    pub now_ms: u64,
    pub paused: bool,
    pub game_speed: f64,
    pub fields: Vec<FieldView>,
    pub weather: WeatherEffects,
    pub prices: BTreeMap<CropKind, u64>,
    pub events: Vec<ActiveMarketEvent>,
    pub level: LevelInfo,
    pub diseases: Vec<(FieldId, Infection)>,
}

/// RNG for a seed at a given tick; loading a save reseeds through here
pub(crate) fn rng_for(seed: u64, tick: u64) -> StdRng {
    StdRng::seed_from_u64(seed ^ tick.wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Mutable soil, history and upgrades of one field
fn field_parts<'w>(
    world: &'w mut World,
    fields: &BTreeMap<FieldId, Entity>,
    field: FieldId,
) -> Result<(&'w mut Soil, &'w mut FieldHistory, &'w mut Upgrades), GameError> {
    let entity = *fields.get(&field).ok_or(GameError::FieldNotFound(field))?;
    world
        .query_one_mut::<(&mut Soil, &mut FieldHistory, &mut Upgrades)>(entity)
        .map_err(|_| GameError::FieldNotFound(field))
}

pub struct GameWorld {
    pub world: World,
    pub fields: BTreeMap<FieldId, Entity>,
    pub player: Player,
    pub farm: FarmTotals,
    pub clock: GameClock,
    pub weather: WeatherSystem,
    pub market: MarketSystem,
    pub diseases: DiseaseSystem,
    pub equipment: EquipmentSystem,
    pub achievements: AchievementSystem,
    pub seed: u64,
    pub rng: StdRng,
    pub paused: bool,
    pub game_speed: f64,
    pub notifications: bool,
    pub(crate) harvested_since_tick: HashMap<CropKind, u32>,
    pub(crate) next_field_id: u32,
}

impl GameWorld {
    pub fn new(config: &GameConfig) -> Self {
        let mut game = Self {
            world: World::new(),
            fields: BTreeMap::new(),
            player: Player::new(&config.player_id, &config.player_name, config.starting_money),
            farm: FarmTotals::default(),
            clock: GameClock::default(),
            weather: WeatherSystem::new(),
            market: MarketSystem::new(),
            diseases: DiseaseSystem::new(),
            equipment: EquipmentSystem::new(),
            achievements: AchievementSystem::new(),
            seed: config.seed,
            rng: rng_for(config.seed, 0),
            paused: false,
            game_speed: config.game_speed,
            notifications: config.notifications,
            harvested_since_tick: HashMap::new(),
            next_field_id: 1,
        };

        for _ in 0..config.starting_fields {
            game.add_field();
        }

        info!(
            "Farm created for {} with {} fields and ₹{}",
            game.player.name,
            game.fields.len(),
            game.player.money
        );
        game
    }

    fn add_field(&mut self) -> FieldId {
        let id = FieldId(self.next_field_id);
        self.next_field_id += 1;

        let soil = fm::initialize_soil(&mut self.rng);
        let history = FieldHistory::new(soil.quality);
        let entity = self.world.spawn((id, soil, history, Upgrades::default()));
        self.fields.insert(id, entity);
        id
    }

    fn entity(&self, field: FieldId) -> Result<Entity, GameError> {
        self.fields.get(&field).copied().ok_or(GameError::FieldNotFound(field))
    }

    fn notify(&self, message: &str) {
        if self.notifications {
            info!(target: "notification", "{}", message);
        }
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn planted_fields(&self) -> BTreeSet<FieldId> {
        self.world
            .query::<&FieldId>()
            .with::<&Planting>()
            .iter()
            .map(|(_, id)| *id)
            .collect()
    }

    pub fn planting(&self, field: FieldId) -> Option<Planting> {
        let entity = self.entity(field).ok()?;
        self.world.get::<&Planting>(entity).ok().map(|p| (*p).clone())
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Run one tick. Returns `None` while paused.
    pub fn tick(&mut self) -> Option<TickResult> {
        if self.paused {
            return None;
        }
        self.clock.advance();
        let now = self.clock.now_ms;

        // Weather, counting storms ridden out with crops in the ground
        let weather_update = self.weather.update(&mut self.rng);
        let planted = self.planted_fields();
        if weather_update.changed
            && weather_update.previous == WeatherKind::Stormy
            && !planted.is_empty()
        {
            self.achievements.record(StatUpdate::WeatherSurvived);
        }
        if weather_update.changed {
            self.notify(&format!("Weather changed to {}", self.weather.current.name()));
        }

        // Market
        let harvested = std::mem::take(&mut self.harvested_since_tick);
        self.market
            .update_prices(self.weather.season, &harvested, now, &mut self.rng);

        // Soil moisture and crop growth
        growth::moisture_system(&mut self.world, &self.weather, &self.equipment);
        let ripened = growth::growth_system(
            &mut self.world,
            &self.weather,
            &self.equipment,
            &self.diseases,
            TICK_MS,
        );

        // Diseases
        let infections = self.disease_system(now);

        // Equipment wear
        self.equipment.degrade(&planted);

        // Achievements
        let field_count = self.fields.len() as u32;
        self.achievements.record(StatUpdate::Money(self.player.money));
        self.achievements.record(StatUpdate::Fields(field_count));
        let utilization = if field_count == 0 {
            0.0
        } else {
            planted.len() as f64 / field_count as f64
        };
        self.achievements.record(StatUpdate::Utilization(utilization));
        let (level_ups, achievements) = self.apply_rewards();

        self.diseases.cleanup(now);

        let auto_harvests = self.auto_harvest();

        debug!(
            "Tick {} complete: {} ripened, {} infections",
            self.clock.tick,
            ripened.len(),
            infections.len()
        );

        Some(TickResult {
            tick: self.clock.tick,
            now_ms: now,
            weather: self.weather.current,
            weather_changed: weather_update.changed,
            ripened,
            infections,
            auto_harvests,
            level_ups,
            achievements,
            money: self.player.money,
        })
    }

    fn disease_system(&mut self, now: u64) -> Vec<(FieldId, DiseaseKind)> {
        let candidates: Vec<(FieldId, CropKind, f64)> = self
            .world
            .query::<(&FieldId, &Planting, &Upgrades)>()
            .iter()
            .map(|(_, (id, planting, upgrades))| {
                (*id, planting.crop, fm::upgrade_disease_reduction(upgrades))
            })
            .collect();

        let weather_chance = self.weather.disease_chance();
        let mut infections = Vec::new();
        for (field, crop, upgrade_reduction) in candidates {
            if self.diseases.is_protected(field, now) {
                continue;
            }
            let reduction = self.equipment.field_effects(field).disease_reduction + upgrade_reduction;
            if let Some(disease) = self.diseases.check_for_disease(
                field,
                crop,
                weather_chance,
                reduction,
                now,
                &mut self.rng,
            ) {
                self.notify(&format!("{} detected in Field {}!", disease.info().name, field));
                infections.push((field, disease));
            }
        }

        let targets: Vec<SpreadTarget> = self
            .world
            .query::<(&FieldId, Option<&Planting>)>()
            .iter()
            .map(|(_, (id, planting))| SpreadTarget {
                field: *id,
                crop: planting.map(|p| p.crop),
            })
            .collect();
        infections.extend(self.diseases.spread(&targets, now, &mut self.rng));
        infections
    }

    /// Pay out queued achievement money and sync level/xp onto the player
    fn apply_rewards(&mut self) -> (Vec<u32>, Vec<AchievementId>) {
        let mut level_ups = Vec::new();
        let mut unlocked = Vec::new();
        for reward in self.achievements.drain_rewards() {
            self.player.money += reward.money();
            match reward {
                PendingReward::LevelUp { level } => {
                    self.notify(&format!("Level up! You are now level {}", level));
                    level_ups.push(level);
                }
                PendingReward::Achievement { id } => {
                    self.notify(&format!("Achievement unlocked: {}", id.info().name));
                    unlocked.push(id);
                }
            }
        }
        self.player.level = self.achievements.level;
        self.player.xp = self.achievements.xp;
        (level_ups, unlocked)
    }

    fn auto_harvest(&mut self) -> Vec<HarvestOutcome> {
        let ready: Vec<FieldId> = self
            .world
            .query::<(&FieldId, &Planting)>()
            .iter()
            .filter(|(_, (_, planting))| planting.is_ready())
            .map(|(_, (id, _))| *id)
            .filter(|id| self.equipment.field_effects(*id).auto_harvest)
            .collect();

        let mut outcomes = Vec::new();
        for field in ready {
            match self.harvest(field) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!("Auto-harvest of field {} failed: {}", field, e),
            }
        }
        outcomes
    }

    // ========================================================================
    // Crops
    // ========================================================================

    pub fn plant(&mut self, field: FieldId, crop: CropKind) -> Result<(), GameError> {
        let entity = self.entity(field)?;
        if self.world.get::<&Planting>(entity).is_ok() {
            return Err(GameError::FieldOccupied(field));
        }

        let soil_growth = {
            let (soil, _, upgrades) = field_parts(&mut self.world, &self.fields, field)?;
            fm::effects_on_crop(soil, upgrades, crop).growth_multiplier
        };
        if soil_growth < MIN_PLANTING_GROWTH {
            return Err(GameError::SoilUnsuitable);
        }

        let seed_bonus = match self.equipment.use_consumable(ConsumableKind::Seeds, 1) {
            Ok(()) => PREMIUM_SEED_GROWTH,
            Err(_) => 1.0,
        };
        self.world
            .insert_one(entity, Planting::new(crop, self.clock.now_ms, seed_bonus))
            .map_err(|_| GameError::FieldNotFound(field))?;

        self.achievements.record(StatUpdate::Planted(crop));
        if self.weather.current_effects().day <= EARLY_SEASON_DAYS {
            self.achievements.record(StatUpdate::EarlyPlanting);
        }

        info!("Planted {} in field {}", crop, field);
        self.notify(&format!("Planted {} in Field {}!", crop.name(), field));
        Ok(())
    }

    pub fn harvest(&mut self, field: FieldId) -> Result<HarvestOutcome, GameError> {
        let entity = self.entity(field)?;
        let crop = {
            let planting = self
                .world
                .get::<&Planting>(entity)
                .map_err(|_| GameError::FieldEmpty(field))?;
            if !planting.is_ready() {
                return Err(GameError::CropNotReady);
            }
            planting.crop
        };

        let soil_yield = {
            let (soil, _, upgrades) = field_parts(&mut self.world, &self.fields, field)?;
            fm::effects_on_crop(soil, upgrades, crop).yield_multiplier
        };
        let disease_fx = self.diseases.effects(field);
        let yield_multiplier =
            soil_yield * self.equipment.field_effects(field).yield_bonus * disease_fx.yield_multiplier;

        let earnings = (self.market.price(crop) as f64 * yield_multiplier).round() as u64;
        let crop_yield = (crop.sell_price() as f64 * yield_multiplier).round() as u64;

        self.world
            .remove_one::<Planting>(entity)
            .map_err(|_| GameError::FieldEmpty(field))?;
        {
            let (soil, history, _) = field_parts(&mut self.world, &self.fields, field)?;
            fm::update_after_harvest(
                soil,
                history,
                crop,
                crop_yield,
                disease_fx.disease.is_some(),
                self.clock.now_ms,
                &mut self.rng,
            );
        }
        self.diseases.clear_field(field);

        self.player.money += earnings;
        self.farm.total_earnings += earnings;
        self.farm.total_harvests += 1;
        *self.harvested_since_tick.entry(crop).or_insert(0) += 1;

        self.achievements.record(StatUpdate::Harvest {
            crop,
            at_ms: self.clock.now_ms,
        });
        self.achievements.record(StatUpdate::Money(self.player.money));
        self.achievements.record(StatUpdate::SingleSale(earnings));

        info!("Harvested {} from field {} for ₹{}", crop, field, earnings);
        self.notify(&format!("Harvested {} for ₹{}!", crop.name(), earnings));

        Ok(HarvestOutcome {
            field,
            crop,
            earnings,
            crop_yield,
            yield_multiplier,
            disease: disease_fx.disease,
        })
    }

    // ========================================================================
    // Land
    // ========================================================================

    pub fn next_field_cost(&self) -> u64 {
        FIELD_PRICE * (self.fields.len() as u64 + 1)
    }

    pub fn buy_field(&mut self) -> Result<FieldId, GameError> {
        let cost = self.next_field_cost();
        GameError::require_funds(self.player.money, cost)?;
        self.player.charge(cost);
        let id = self.add_field();
        self.achievements.record(StatUpdate::Fields(self.fields.len() as u32));
        info!("Bought field {} for ₹{}", id, cost);
        Ok(id)
    }

    pub fn till(&mut self, field: FieldId) -> Result<u64, GameError> {
        let fx = self.equipment.field_effects(field);
        let (soil, history, _) = field_parts(&mut self.world, &self.fields, field)?;
        let cost = fm::till(
            soil,
            history,
            self.player.money,
            self.clock.now_ms,
            fx.soil_improvement,
            fx.preparation_speed,
        )?;
        self.player.charge(cost);
        Ok(cost)
    }

    pub fn fertilize(&mut self, field: FieldId, kind: FertilizerKind) -> Result<u64, GameError> {
        let efficiency = self.equipment.field_effects(field).fertilizer_efficiency;
        let (soil, history, upgrades) = field_parts(&mut self.world, &self.fields, field)?;
        let cost = fm::fertilize(
            soil,
            history,
            upgrades,
            kind,
            self.player.money,
            self.clock.now_ms,
            efficiency,
        )?;
        self.player.charge(cost);
        Ok(cost)
    }

    pub fn water(&mut self, field: FieldId) -> Result<u64, GameError> {
        let efficiency = self.equipment.field_effects(field).water_efficiency;
        let (soil, history, _) = field_parts(&mut self.world, &self.fields, field)?;
        let cost = fm::water(soil, history, self.player.money, self.clock.now_ms, efficiency)?;
        self.player.charge(cost);
        Ok(cost)
    }

    pub fn install_upgrade(&mut self, field: FieldId, upgrade: FieldUpgrade) -> Result<u64, GameError> {
        let (soil, _, upgrades) = field_parts(&mut self.world, &self.fields, field)?;
        let cost = fm::install_upgrade(soil, upgrades, upgrade, self.player.money, self.player.level)?;
        self.player.charge(cost);
        info!("Installed {} on field {}", upgrade.info().name, field);
        Ok(cost)
    }

    pub fn field_productivity(&mut self, field: FieldId) -> Result<f64, GameError> {
        let (soil, _, _) = field_parts(&mut self.world, &self.fields, field)?;
        Ok(fm::productivity(soil))
    }

    pub fn field_recommendations(&mut self, field: FieldId) -> Result<Vec<FieldAdvice>, GameError> {
        let (soil, history, _) = field_parts(&mut self.world, &self.fields, field)?;
        Ok(fm::recommendations(soil, history))
    }

    // ========================================================================
    // Equipment
    // ========================================================================

    pub fn buy_equipment(&mut self, kind: EquipmentKind) -> Result<u64, GameError> {
        let cost = self
            .equipment
            .buy(kind, self.player.money, self.player.level, self.clock.now_ms)?;
        self.player.charge(cost);
        self.achievements.record(StatUpdate::Equipment(kind));
        info!("Bought {} for ₹{}", kind.info().name, cost);
        Ok(cost)
    }

    pub fn install_equipment(&mut self, kind: EquipmentKind, field: FieldId) -> Result<(), GameError> {
        self.entity(field)?;
        self.equipment.install(kind, field)
    }

    /// Pull every machine off a field so it can be installed elsewhere
    pub fn uninstall_equipment(&mut self, field: FieldId) -> Result<(), GameError> {
        self.entity(field)?;
        self.equipment.uninstall_all(field);
        debug!("Cleared equipment from field {}", field);
        Ok(())
    }

    pub fn maintain_equipment(&mut self, kind: EquipmentKind) -> Result<u64, GameError> {
        let cost = self.equipment.maintain(kind, self.player.money, self.clock.now_ms)?;
        self.player.charge(cost);
        Ok(cost)
    }

    pub fn buy_consumable(&mut self, kind: ConsumableKind, quantity: u32) -> Result<u64, GameError> {
        let cost = self.equipment.buy_consumable(kind, quantity, self.player.money)?;
        self.player.charge(cost);
        Ok(cost)
    }

    // ========================================================================
    // Disease
    // ========================================================================

    pub fn treat_disease(
        &mut self,
        field: FieldId,
        treatment: TreatmentKind,
    ) -> Result<TreatmentOutcome, GameError> {
        self.entity(field)?;
        let outcome = self.diseases.treat(
            field,
            treatment,
            self.player.money,
            self.clock.now_ms,
            &mut self.rng,
        )?;
        self.player.charge(outcome.cost);

        if outcome.success {
            let (soil, _, _) = field_parts(&mut self.world, &self.fields, field)?;
            soil.quality = (soil.quality + outcome.soil_quality_delta).max(1.0);
            self.achievements.record(StatUpdate::DiseaseTreated);
        }
        self.notify(&outcome.message);
        Ok(outcome)
    }

    // ========================================================================
    // Market & weather queries
    // ========================================================================

    pub fn market_analysis(&self, crop: CropKind) -> MarketAnalysis {
        self.market.analysis(crop)
    }

    pub fn weather_forecast(&mut self, periods: usize) -> Vec<WeatherKind> {
        self.weather.forecast(&mut self.rng, periods)
    }

    // ========================================================================
    // Controls
    // ========================================================================

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn set_game_speed(&mut self, speed: f64) -> Result<(), GameError> {
        if !(speed > 0.0 && speed.is_finite()) {
            return Err(GameError::InvalidSpeed(speed));
        }
        self.game_speed = speed;
        Ok(())
    }

    pub fn level_info(&self) -> LevelInfo {
        self.achievements.level_info()
    }

    pub fn field_view(&self, field: FieldId) -> Option<FieldView> {
        let entity = self.entity(field).ok()?;
        let mut query = self
            .world
            .query_one::<(&Soil, &Upgrades, Option<&Planting>)>(entity)
            .ok()?;
        let (soil, upgrades, planting) = query.get()?;
        Some(FieldView {
            id: field,
            crop: planting.map(|p| p.crop),
            growth: planting.map(|p| p.growth),
            soil: soil.clone(),
            upgrades: upgrades.0.clone(),
            equipment: self.equipment.installed_on(field).to_vec(),
            disease: self.diseases.active.get(&field).cloned(),
            productivity: fm::productivity(soil),
        })
    }

    pub fn state(&self) -> GameState {
        GameState {
            player: self.player.clone(),
            farm: self.farm.clone(),
            tick: self.clock.tick,
            now_ms: self.clock.now_ms,
            paused: self.paused,
            game_speed: self.game_speed,
            fields: self
                .fields
                .keys()
                .filter_map(|id| self.field_view(*id))
                .collect(),
            weather: self.weather.current_effects(),
            prices: CropKind::ALL
                .iter()
                .map(|c| (*c, self.market.price(*c)))
                .collect(),
            events: self.market.active_events().to_vec(),
            level: self.achievements.level_info(),
            diseases: self
                .diseases
                .active_diseases()
                .map(|(id, infection)| (*id, infection.clone()))
                .collect(),
        }
    }
}

impl Default for GameWorld {
    fn default() -> Self {
        Self::new(&GameConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game() -> GameWorld {
        GameWorld::new(&GameConfig::default())
    }

    /// Force the soil of a field to something every crop grows in
    fn fertile(game: &mut GameWorld, field: FieldId) {
        let (soil, _, _) = field_parts(&mut game.world, &game.fields, field).unwrap();
        soil.soil_type = SoilType::Loam;
        soil.quality = 8.0;
        soil.moisture = 60.0;
        soil.compaction = 0.0;
    }

    fn ripen(game: &mut GameWorld, field: FieldId) {
        let entity = game.entity(field).unwrap();
        let mut planting = game.world.get::<&mut Planting>(entity).unwrap();
        growth::advance(&mut planting, 1000.0, TICK_MS);
    }

    fn field_growth(game: &mut GameWorld, field: FieldId) -> f64 {
        let planting = game.planting(field).unwrap();
        let (soil, _, upgrades) = field_parts(&mut game.world, &game.fields, field).unwrap();
        growth::growth_multiplier(
            &planting,
            soil,
            upgrades,
            field,
            &game.weather,
            &game.equipment,
            &game.diseases,
        )
    }

    fn infect(game: &mut GameWorld, field: FieldId, disease: DiseaseKind) {
        game.diseases.active.insert(
            field,
            Infection {
                disease,
                severity: 0.5,
                infected_at_ms: game.clock.now_ms,
            },
        );
    }

    #[test]
    fn test_new_game_defaults() {
        let game = game();
        assert_eq!(game.player.money, 500);
        assert_eq!(game.player.level, 1);
        assert_eq!(game.field_count(), 3);
        assert!(game.fields.contains_key(&FieldId(1)));
        assert!(game.planted_fields().is_empty());
    }

    #[test]
    fn test_plant_rejects_occupied_and_unknown_fields() {
        let mut game = game();
        fertile(&mut game, FieldId(1));
        game.plant(FieldId(1), CropKind::Wheat).unwrap();
        assert_eq!(
            game.plant(FieldId(1), CropKind::Corn),
            Err(GameError::FieldOccupied(FieldId(1)))
        );
        assert_eq!(
            game.plant(FieldId(99), CropKind::Corn),
            Err(GameError::FieldNotFound(FieldId(99)))
        );
    }

    #[test]
    fn test_plant_rejects_exhausted_soil() {
        let mut game = game();
        {
            let (soil, _, _) = field_parts(&mut game.world, &game.fields, FieldId(2)).unwrap();
            soil.quality = 1.0;
            soil.moisture = 10.0;
        }
        assert_eq!(game.plant(FieldId(2), CropKind::Wheat), Err(GameError::SoilUnsuitable));
        assert_eq!(
            game.plant(FieldId(2), CropKind::Wheat).unwrap_err().to_string(),
            "Soil not suitable for this crop"
        );
    }

    #[test]
    fn test_harvest_pays_market_price_times_yield() {
        let mut game = game();
        fertile(&mut game, FieldId(1));
        game.plant(FieldId(1), CropKind::Potato).unwrap();
        assert_eq!(game.harvest(FieldId(1)), Err(GameError::CropNotReady));

        ripen(&mut game, FieldId(1));
        let expected_multiplier = {
            let (soil, _, upgrades) = field_parts(&mut game.world, &game.fields, FieldId(1)).unwrap();
            fm::effects_on_crop(soil, upgrades, CropKind::Potato).yield_multiplier
        };
        let price = game.market.price(CropKind::Potato);

        let outcome = game.harvest(FieldId(1)).unwrap();
        let expected = (price as f64 * expected_multiplier).round() as u64;
        assert_eq!(outcome.earnings, expected);
        assert_eq!(game.player.money, 500 + expected);
        assert!(game.planting(FieldId(1)).is_none());
        assert_eq!(game.farm.total_harvests, 1);
        assert_eq!(game.harvested_since_tick.get(&CropKind::Potato), Some(&1));
        assert_eq!(
            game.harvest(FieldId(1)),
            Err(GameError::FieldEmpty(FieldId(1)))
        );
    }

    #[test]
    fn test_first_harvest_reward_paid_on_tick() {
        let mut game = game();
        fertile(&mut game, FieldId(1));
        game.plant(FieldId(1), CropKind::Lettuce).unwrap();
        ripen(&mut game, FieldId(1));
        let earnings = game.harvest(FieldId(1)).unwrap().earnings;

        let result = game.tick().unwrap();
        assert!(result.achievements.contains(&AchievementId::FirstHarvest));
        assert_eq!(game.player.xp, 50);
        assert!(game.player.money >= 500 + earnings + 100);
    }

    #[test]
    fn test_buy_field_cost_grows() {
        let mut game = game();
        game.player.money = 1000;
        assert_eq!(game.next_field_cost(), 400);
        let id = game.buy_field().unwrap();
        assert_eq!(id, FieldId(4));
        assert_eq!(game.player.money, 600);
        assert_eq!(game.next_field_cost(), 500);

        game.player.money = 499;
        assert_eq!(
            game.buy_field(),
            Err(GameError::InsufficientFunds { need: 500, have: 499 })
        );
    }

    #[test]
    fn test_field_actions_charge_player() {
        let mut game = game();
        assert_eq!(game.till(FieldId(1)), Ok(100));
        assert_eq!(game.fertilize(FieldId(1), FertilizerKind::Basic), Ok(50));
        assert_eq!(game.water(FieldId(1)), Ok(10));
        assert_eq!(game.player.money, 340);
        assert_eq!(
            game.install_upgrade(FieldId(1), FieldUpgrade::Windbreak),
            Err(GameError::LevelLocked { required: 2 })
        );
    }

    #[test]
    fn test_buy_equipment_checks_level_and_records_type() {
        let mut game = game();
        game.player.money = 10_000;
        assert_eq!(
            game.buy_equipment(EquipmentKind::Greenhouse),
            Err(GameError::LevelLocked { required: 6 })
        );
        assert_eq!(game.buy_equipment(EquipmentKind::BasicTractor), Ok(2000));
        assert_eq!(game.player.money, 8000);
        assert!(game
            .achievements
            .stats
            .equipment_owned
            .contains(&EquipmentKind::BasicTractor));
        game.install_equipment(EquipmentKind::BasicTractor, FieldId(2)).unwrap();
        assert_eq!(
            game.install_equipment(EquipmentKind::BasicTractor, FieldId(9)),
            Err(GameError::FieldNotFound(FieldId(9)))
        );
    }

    #[test]
    fn test_premium_seeds_are_consumed() {
        let mut game = game();
        fertile(&mut game, FieldId(1));
        game.buy_consumable(ConsumableKind::Seeds, 1).unwrap();
        game.plant(FieldId(1), CropKind::Carrot).unwrap();
        assert_eq!(game.equipment.inventory_count(ConsumableKind::Seeds), 0);
        assert_eq!(game.planting(FieldId(1)).unwrap().seed_bonus, PREMIUM_SEED_GROWTH);
    }

    #[test]
    fn test_paused_game_does_not_tick() {
        let mut game = game();
        game.pause();
        assert!(game.tick().is_none());
        assert_eq!(game.clock.tick, 0);
        game.resume();
        assert_eq!(game.tick().map(|r| r.tick), Some(1));
    }

    #[test]
    fn test_game_speed_must_be_positive() {
        let mut game = game();
        assert_eq!(game.set_game_speed(0.0), Err(GameError::InvalidSpeed(0.0)));
        assert_eq!(game.set_game_speed(2.0), Ok(()));
        assert_eq!(game.game_speed, 2.0);
    }

    #[test]
    fn test_crops_grow_over_ticks() {
        let mut game = game();
        fertile(&mut game, FieldId(1));
        game.plant(FieldId(1), CropKind::Lettuce).unwrap();
        for _ in 0..5 {
            game.tick();
        }
        let planting = game.planting(FieldId(1)).unwrap();
        assert!(planting.growth.progress > 0.0);
        assert!(planting.growth.stage > GrowthStage::Planted);
    }

    #[test]
    fn test_same_seed_replays_identically() {
        let mut a = game();
        let mut b = game();
        for _ in 0..200 {
            a.tick();
            b.tick();
        }
        assert_eq!(a.state(), b.state());
    }

    #[test]
    fn test_state_view_lists_every_field() {
        let mut game = game();
        fertile(&mut game, FieldId(3));
        game.plant(FieldId(3), CropKind::Tomato).unwrap();
        let state = game.state();
        assert_eq!(state.fields.len(), 3);
        assert_eq!(state.fields[2].crop, Some(CropKind::Tomato));
        assert_eq!(state.prices.len(), 6);
        assert_eq!(state.level.level, 1);
    }

    #[test]
    fn test_harvest_clears_infection() {
        let mut game = game();
        fertile(&mut game, FieldId(1));
        game.plant(FieldId(1), CropKind::Wheat).unwrap();
        infect(&mut game, FieldId(1), DiseaseKind::Rust);
        ripen(&mut game, FieldId(1));
        let healthy = {
            let (soil, _, upgrades) = field_parts(&mut game.world, &game.fields, FieldId(1)).unwrap();
            fm::effects_on_crop(soil, upgrades, CropKind::Wheat).yield_multiplier
        };

        let outcome = game.harvest(FieldId(1)).unwrap();
        assert!(outcome.yield_multiplier < healthy);
        assert!(game.diseases.active.get(&FieldId(1)).is_none());
        assert_eq!(game.diseases.effects(FieldId(1)).disease, None);
    }

    #[test]
    fn test_treatment_charges_and_protects_field() {
        let mut game = game();
        game.player.money = 10_000;
        fertile(&mut game, FieldId(1));
        game.plant(FieldId(1), CropKind::Wheat).unwrap();
        assert_eq!(
            game.treat_disease(FieldId(1), TreatmentKind::Fungicide),
            Err(GameError::NoDisease)
        );

        let mut attempts = 0;
        loop {
            infect(&mut game, FieldId(1), DiseaseKind::Rust);
            attempts += 1;
            let outcome = game.treat_disease(FieldId(1), TreatmentKind::Fungicide).unwrap();
            assert_eq!(outcome.cost, 75);
            if outcome.success {
                break;
            }
            assert!(attempts < 50);
        }
        assert_eq!(game.player.money, 10_000 - 75 * attempts);
        assert!(game.diseases.active.get(&FieldId(1)).is_none());
        assert_eq!(
            game.diseases.protections[&FieldId(1)].treatment,
            TreatmentKind::Fungicide
        );

        // Stormy weather on a worn-out environment: a protected field still never catches anything
        game.weather.current = WeatherKind::Stormy;
        game.diseases.environmental_health = 0.0;
        let now = game.clock.now_ms;
        for _ in 0..200 {
            assert!(game.disease_system(now).is_empty());
        }

        game.diseases.protections.clear();
        let infected = (0..200).any(|_| !game.disease_system(now).is_empty());
        assert!(infected);
    }

    #[test]
    fn test_drainage_adds_to_equipment_disease_reduction() {
        let mut game = game();
        game.player.money = 20_000;
        game.player.level = 7;
        fertile(&mut game, FieldId(1));
        for kind in [EquipmentKind::DripIrrigation, EquipmentKind::Greenhouse] {
            game.buy_equipment(kind).unwrap();
            game.install_equipment(kind, FieldId(1)).unwrap();
        }
        game.install_upgrade(FieldId(1), FieldUpgrade::Drainage).unwrap();
        game.plant(FieldId(1), CropKind::Wheat).unwrap();

        game.weather.current = WeatherKind::Stormy;
        game.diseases.environmental_health = 0.0;
        let now = game.clock.now_ms;
        // Drip 0.3 + greenhouse 0.5 + drainage 0.2 blocks every roll
        for _ in 0..500 {
            assert!(game.disease_system(now).is_empty());
        }

        {
            let (_, _, upgrades) = field_parts(&mut game.world, &game.fields, FieldId(1)).unwrap();
            upgrades.0.clear();
        }
        let infected = (0..500).any(|_| !game.disease_system(now).is_empty());
        assert!(infected);
    }

    #[test]
    fn test_windbreak_speeds_growth() {
        let mut game = game();
        game.player.money = 5_000;
        game.player.level = 2;
        fertile(&mut game, FieldId(1));
        game.plant(FieldId(1), CropKind::Corn).unwrap();

        let open = field_growth(&mut game, FieldId(1));
        game.install_upgrade(FieldId(1), FieldUpgrade::Windbreak).unwrap();
        let sheltered = field_growth(&mut game, FieldId(1));
        assert!((sheltered / open - 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_combine_harvests_ripe_crops_on_tick() {
        let mut game = game();
        game.player.money = 20_000;
        game.player.level = 10;
        game.buy_equipment(EquipmentKind::CombineHarvester).unwrap();
        game.install_equipment(EquipmentKind::CombineHarvester, FieldId(1)).unwrap();
        for field in [FieldId(1), FieldId(2)] {
            fertile(&mut game, field);
            game.plant(field, CropKind::Potato).unwrap();
            ripen(&mut game, field);
        }

        let result = game.tick().unwrap();
        assert_eq!(result.auto_harvests.len(), 1);
        assert_eq!(result.auto_harvests[0].field, FieldId(1));
        assert_eq!(result.auto_harvests[0].crop, CropKind::Potato);
        assert!(result.auto_harvests[0].earnings > 0);
        assert_eq!(game.farm.total_earnings, result.auto_harvests[0].earnings);
        assert!(game.planting(FieldId(1)).is_none());
        // No combine on field 2: the ripe crop waits for the player
        assert!(game.planting(FieldId(2)).unwrap().is_ready());
        assert_eq!(game.farm.total_harvests, 1);
    }

    #[test]
    fn test_storm_ending_over_crops_counts_as_survived() {
        let mut bare = game();
        bare.weather.current = WeatherKind::Stormy;
        bare.weather.weather_duration = 10_000;
        assert!(bare.tick().unwrap().weather_changed);
        assert_eq!(bare.achievements.stats.storms_survived, 0);

        let mut farmed = game();
        fertile(&mut farmed, FieldId(1));
        farmed.plant(FieldId(1), CropKind::Wheat).unwrap();
        farmed.weather.current = WeatherKind::Stormy;
        farmed.weather.weather_duration = 10_000;
        assert!(farmed.tick().unwrap().weather_changed);
        assert_eq!(farmed.achievements.stats.storms_survived, 1);
    }

    #[test]
    fn test_cultivator_prepares_soil_faster() {
        let mut game = game();
        game.player.money = 5_000;
        game.player.level = 4;
        game.buy_equipment(EquipmentKind::Cultivator).unwrap();
        game.install_equipment(EquipmentKind::Cultivator, FieldId(1)).unwrap();
        let quality_before = {
            let (soil, _, _) = field_parts(&mut game.world, &game.fields, FieldId(1)).unwrap();
            soil.compaction = 80.0;
            soil.quality
        };

        game.till(FieldId(1)).unwrap();
        let (soil, _, _) = field_parts(&mut game.world, &game.fields, FieldId(1)).unwrap();
        assert!((soil.compaction - 26.0).abs() < 1e-9);
        assert!((soil.quality - quality_before - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_uninstall_equipment_frees_it_for_another_field() {
        let mut game = game();
        game.player.money = 5_000;
        game.player.level = 3;
        game.buy_equipment(EquipmentKind::SprinklerSystem).unwrap();
        game.install_equipment(EquipmentKind::SprinklerSystem, FieldId(1)).unwrap();
        assert_eq!(
            game.install_equipment(EquipmentKind::SprinklerSystem, FieldId(2)),
            Err(GameError::EquipmentUnavailable)
        );

        game.uninstall_equipment(FieldId(1)).unwrap();
        assert!(!game.equipment.field_effects(FieldId(1)).auto_watering);
        game.install_equipment(EquipmentKind::SprinklerSystem, FieldId(2)).unwrap();
        assert!(game.equipment.field_effects(FieldId(2)).auto_watering);
        assert_eq!(
            game.uninstall_equipment(FieldId(9)),
            Err(GameError::FieldNotFound(FieldId(9)))
        );
    }
}
