//! Growth System
//!
//! Advances every planted crop by one tick, combining weather, season, soil,
//! equipment, disease and seed modifiers into one growth multiplier.

use hecs::World;

use crate::components::{FieldId, GrowthStage, Planting, Soil, Upgrades};
use crate::systems::disease::DiseaseSystem;
use crate::systems::equipment::EquipmentSystem;
use crate::systems::field_management;
use crate::systems::weather::{Season, WeatherSystem};

/// Combined growth multiplier for one planted field
pub fn growth_multiplier(
    planting: &Planting,
    soil: &Soil,
    upgrades: &Upgrades,
    field: FieldId,
    weather: &WeatherSystem,
    equipment: &EquipmentSystem,
    diseases: &DiseaseSystem,
) -> f64 {
    let equipment_fx = equipment.field_effects(field);

    let mut weather_factor = weather.current.growth_multiplier();
    if equipment_fx.weather_protection {
        weather_factor = weather_factor.max(1.0);
    }

    let season_factor = if equipment_fx.year_round {
        Season::peak_crop_bonus(planting.crop)
    } else {
        weather.season.crop_bonus(planting.crop).unwrap_or(1.0)
    };

    weather_factor
        * season_factor
        * field_management::effects_on_crop(soil, upgrades, planting.crop).growth_multiplier
        * equipment_fx.growth_bonus
        * diseases.effects(field).growth_multiplier
        * planting.seed_bonus
}

/// Add one tick of progress to a planting. Returns true when it just became ready.
pub fn advance(planting: &mut Planting, multiplier: f64, tick_ms: u64) -> bool {
    if planting.is_ready() {
        return false;
    }
    let grow_time = planting.crop.grow_time_ms() as f64;
    let step = tick_ms as f64 / grow_time * multiplier * 100.0;
    let progress = (planting.growth.progress + step.max(0.0)).min(100.0);

    let remaining = if multiplier > 0.0 {
        ((100.0 - progress) / 100.0 * grow_time / multiplier).round() as u64
    } else {
        u64::MAX
    };

    planting.growth.progress = progress;
    planting.growth.stage = GrowthStage::from_progress(progress);
    planting.growth.time_remaining_ms = remaining;
    planting.is_ready()
}

/// Advance all plantings. Returns the fields whose crop ripened this tick.
pub fn growth_system(
    world: &mut World,
    weather: &WeatherSystem,
    equipment: &EquipmentSystem,
    diseases: &DiseaseSystem,
    tick_ms: u64,
) -> Vec<FieldId> {
    let mut ripened = Vec::new();

    for (_entity, (id, soil, upgrades, planting)) in world
        .query_mut::<(&FieldId, &Soil, &Upgrades, &mut Planting)>()
    {
        let multiplier =
            growth_multiplier(planting, soil, upgrades, *id, weather, equipment, diseases);
        if advance(planting, multiplier, tick_ms) {
            ripened.push(*id);
        }
    }

    ripened.sort();
    ripened
}

/// Drift soil moisture on every field toward the current weather's target
pub fn moisture_system(world: &mut World, weather: &WeatherSystem, equipment: &EquipmentSystem) {
    for (_entity, (id, soil, upgrades)) in world.query_mut::<(&FieldId, &mut Soil, &Upgrades)>() {
        let auto_watering = equipment.field_effects(*id).auto_watering;
        field_management::update_moisture(soil, upgrades, weather.current, auto_watering);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Nutrients, SoilType, TICK_MS};
    use crate::crops::CropKind;
    use crate::systems::weather::{Season, WeatherKind};

    fn ideal_soil() -> Soil {
        Soil {
            soil_type: SoilType::Loam,
            quality: 10.0,
            moisture: 60.0,
            nutrients: Nutrients {
                nitrogen: 60.0,
                phosphorus: 60.0,
                potassium: 60.0,
                organic_matter: 20.0,
            },
            ph: 7.0,
            compaction: 0.0,
            erosion: 0.0,
        }
    }

    #[test]
    fn test_advance_walks_through_stages() {
        let mut planting = Planting::new(CropKind::Lettuce, 0, 1.0);
        // Lettuce grows in 10 ticks at multiplier 1.0
        let mut stages = Vec::new();
        for _ in 0..10 {
            advance(&mut planting, 1.0, TICK_MS);
            stages.push(planting.growth.stage);
        }
        assert_eq!(stages[1], GrowthStage::Sprouting);
        assert_eq!(stages[4], GrowthStage::Growing);
        assert_eq!(stages[8], GrowthStage::Ripening);
        assert!(planting.is_ready());
        assert_eq!(planting.growth.time_remaining_ms, 0);
        assert!(!advance(&mut planting, 1.0, TICK_MS));
    }

    #[test]
    fn test_progress_caps_at_hundred() {
        let mut planting = Planting::new(CropKind::Wheat, 0, 1.0);
        assert!(advance(&mut planting, 50.0, TICK_MS));
        assert_eq!(planting.growth.progress, 100.0);
    }

    #[test]
    fn test_greenhouse_ignores_bad_weather() {
        let mut weather = WeatherSystem::new();
        weather.current = WeatherKind::Drought;
        weather.season = Season::Winter;
        let planting = Planting::new(CropKind::Corn, 0, 1.0);
        let soil = ideal_soil();
        let upgrades = Upgrades::default();
        let diseases = DiseaseSystem::new();

        let bare = EquipmentSystem::new();
        let mut covered = EquipmentSystem::new();
        covered
            .buy(crate::systems::equipment::EquipmentKind::Greenhouse, 10_000, 10, 0)
            .unwrap();
        covered
            .install(crate::systems::equipment::EquipmentKind::Greenhouse, FieldId(1))
            .unwrap();

        let exposed = growth_multiplier(&planting, &soil, &upgrades, FieldId(1), &weather, &bare, &diseases);
        let protected = growth_multiplier(&planting, &soil, &upgrades, FieldId(1), &weather, &covered, &diseases);
        // Drought halves growth; the greenhouse lifts weather to 1.0, adds its own 1.5
        // and gives corn its summer bonus in winter
        assert!((protected / exposed - 2.0 * 1.5 * 1.4).abs() < 1e-9);
    }

    #[test]
    fn test_greenhouse_lettuce_keeps_spring_pace_in_winter() {
        let mut weather = WeatherSystem::new();
        weather.current = WeatherKind::Cloudy;
        let planting = Planting::new(CropKind::Lettuce, 0, 1.0);
        let soil = ideal_soil();
        let upgrades = Upgrades::default();
        let diseases = DiseaseSystem::new();
        let mut covered = EquipmentSystem::new();
        covered
            .buy(crate::systems::equipment::EquipmentKind::Greenhouse, 10_000, 10, 0)
            .unwrap();
        covered
            .install(crate::systems::equipment::EquipmentKind::Greenhouse, FieldId(1))
            .unwrap();

        weather.season = Season::Spring;
        let spring = growth_multiplier(&planting, &soil, &upgrades, FieldId(1), &weather, &covered, &diseases);
        weather.season = Season::Winter;
        let winter = growth_multiplier(&planting, &soil, &upgrades, FieldId(1), &weather, &covered, &diseases);
        assert!((spring - winter).abs() < 1e-9);

        let bare = EquipmentSystem::new();
        let open_winter = growth_multiplier(&planting, &soil, &upgrades, FieldId(1), &weather, &bare, &diseases);
        weather.season = Season::Spring;
        let open_spring = growth_multiplier(&planting, &soil, &upgrades, FieldId(1), &weather, &bare, &diseases);
        assert!((open_spring / open_winter - 1.3).abs() < 1e-9);
    }

    #[test]
    fn test_growth_system_only_touches_planted_fields() {
        let mut world = World::new();
        let weather = WeatherSystem::new();
        let equipment = EquipmentSystem::new();
        let diseases = DiseaseSystem::new();

        world.spawn((FieldId(1), ideal_soil(), Upgrades::default()));
        world.spawn((
            FieldId(2),
            ideal_soil(),
            Upgrades::default(),
            Planting::new(CropKind::Lettuce, 0, 1.0),
        ));

        let mut ripened = Vec::new();
        for _ in 0..20 {
            ripened.extend(growth_system(&mut world, &weather, &equipment, &diseases, TICK_MS));
        }
        assert_eq!(ripened, vec![FieldId(2)]);
    }
}
