//! Weather System
//!
//! Season-weighted weather that changes every 2-5 minutes of game time.
//! One tick is one day of the in-game year; a season lasts 30 days.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::crops::CropKind;

/// Days per season
pub const SEASON_DAYS: u32 = 30;

/// Weather holds for at least this many ticks
const MIN_WEATHER_TICKS: f64 = 120.0;
/// Random extra ticks on top of the minimum
const WEATHER_TICK_SPREAD: f64 = 180.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherKind {
    Sunny,
    Cloudy,
    Rainy,
    Stormy,
    Drought,
    Heatwave,
}

impl WeatherKind {
    pub const fn name(&self) -> &'static str {
        match self {
            WeatherKind::Sunny => "Sunny",
            WeatherKind::Cloudy => "Cloudy",
            WeatherKind::Rainy => "Rainy",
            WeatherKind::Stormy => "Stormy",
            WeatherKind::Drought => "Drought",
            WeatherKind::Heatwave => "Heat Wave",
        }
    }

    pub const fn description(&self) -> &'static str {
        match self {
            WeatherKind::Sunny => "Perfect growing conditions",
            WeatherKind::Cloudy => "Mild weather conditions",
            WeatherKind::Rainy => "Crops grow faster but disease risk increases",
            WeatherKind::Stormy => "Harsh conditions slow growth",
            WeatherKind::Drought => "Very slow growth, crops need water",
            WeatherKind::Heatwave => "Hot weather stresses crops",
        }
    }

    pub const fn growth_multiplier(&self) -> f64 {
        match self {
            WeatherKind::Sunny => 1.2,
            WeatherKind::Cloudy => 1.0,
            WeatherKind::Rainy => 1.5,
            WeatherKind::Stormy => 0.7,
            WeatherKind::Drought => 0.5,
            WeatherKind::Heatwave => 0.8,
        }
    }

    pub const fn disease_chance(&self) -> f64 {
        match self {
            WeatherKind::Sunny => 0.05,
            WeatherKind::Cloudy => 0.03,
            WeatherKind::Rainy => 0.15,
            WeatherKind::Stormy => 0.25,
            WeatherKind::Drought => 0.02,
            WeatherKind::Heatwave => 0.08,
        }
    }

    /// Soil moisture the weather pulls fields toward, in percent
    pub const fn moisture_target(&self) -> f64 {
        match self {
            WeatherKind::Sunny => 55.0,
            WeatherKind::Cloudy => 60.0,
            WeatherKind::Rainy => 85.0,
            WeatherKind::Stormy => 90.0,
            WeatherKind::Drought => 20.0,
            WeatherKind::Heatwave => 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Spring, Season::Summer, Season::Fall, Season::Winter];

    /// Season for a day of the year, cycling every four seasons
    pub fn for_day(day_of_year: u32) -> Season {
        Season::ALL[((day_of_year / SEASON_DAYS) % 4) as usize]
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Fall => "Fall",
            Season::Winter => "Winter",
        }
    }

    /// Cumulative-pick table; weights sum to 1.0
    pub const fn weather_probabilities(&self) -> &'static [(WeatherKind, f64)] {
        match self {
            Season::Spring => &[
                (WeatherKind::Sunny, 0.4),
                (WeatherKind::Cloudy, 0.3),
                (WeatherKind::Rainy, 0.25),
                (WeatherKind::Stormy, 0.05),
            ],
            Season::Summer => &[
                (WeatherKind::Sunny, 0.5),
                (WeatherKind::Heatwave, 0.2),
                (WeatherKind::Cloudy, 0.2),
                (WeatherKind::Drought, 0.1),
            ],
            Season::Fall => &[
                (WeatherKind::Cloudy, 0.4),
                (WeatherKind::Sunny, 0.3),
                (WeatherKind::Rainy, 0.2),
                (WeatherKind::Stormy, 0.1),
            ],
            Season::Winter => &[
                (WeatherKind::Cloudy, 0.5),
                (WeatherKind::Stormy, 0.3),
                (WeatherKind::Sunny, 0.2),
            ],
        }
    }

    /// Seasonal growth bonus for a crop, if any
    pub fn crop_bonus(&self, crop: CropKind) -> Option<f64> {
        use CropKind::*;
        match (self, crop) {
            (Season::Spring, Lettuce) => Some(1.3),
            (Season::Spring, Carrot) => Some(1.2),
            (Season::Spring, Wheat) => Some(1.1),
            (Season::Summer, Corn) => Some(1.4),
            (Season::Summer, Tomato) => Some(1.3),
            (Season::Summer, Potato) => Some(1.1),
            (Season::Fall, Potato) => Some(1.3),
            (Season::Fall, Carrot) => Some(1.2),
            (Season::Fall, Wheat) => Some(1.1),
            _ => None,
        }
    }

    /// Best seasonal bonus the crop gets anywhere in the year
    pub fn peak_crop_bonus(crop: CropKind) -> f64 {
        Season::ALL
            .iter()
            .filter_map(|season| season.crop_bonus(crop))
            .fold(1.0, f64::max)
    }
}

/// Snapshot of current conditions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherEffects {
    pub weather: WeatherKind,
    pub season: Season,
    /// 1-based day within the season
    pub day: u32,
    pub growth_multiplier: f64,
    pub disease_chance: f64,
}

/// Outcome of one weather update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeatherUpdate {
    pub changed: bool,
    pub previous: WeatherKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSystem {
    pub current: WeatherKind,
    pub season: Season,
    pub day_of_year: u32,
    pub weather_duration: u32,
}

impl WeatherSystem {
    pub fn new() -> Self {
        Self {
            current: WeatherKind::Sunny,
            season: Season::Spring,
            day_of_year: 1,
            weather_duration: 0,
        }
    }

    /// Weighted random weather for a season
    pub fn generate_weather<R: Rng>(season: Season, rng: &mut R) -> WeatherKind {
        let roll: f64 = rng.gen();
        let mut cumulative = 0.0;
        for &(weather, probability) in season.weather_probabilities() {
            cumulative += probability;
            if roll <= cumulative {
                return weather;
            }
        }
        WeatherKind::Sunny
    }

    /// Advance one day
    pub fn update<R: Rng>(&mut self, rng: &mut R) -> WeatherUpdate {
        let previous = self.current;
        self.weather_duration += 1;
        self.day_of_year += 1;

        let threshold = rng.gen::<f64>() * WEATHER_TICK_SPREAD + MIN_WEATHER_TICKS;
        let mut changed = false;
        if self.weather_duration as f64 >= threshold {
            self.current = Self::generate_weather(self.season, rng);
            self.weather_duration = 0;
            changed = true;
        }

        self.season = Season::for_day(self.day_of_year);

        WeatherUpdate { changed, previous }
    }

    pub fn current_effects(&self) -> WeatherEffects {
        WeatherEffects {
            weather: self.current,
            season: self.season,
            day: self.day_of_year % SEASON_DAYS + 1,
            growth_multiplier: self.current.growth_multiplier(),
            disease_chance: self.current.disease_chance(),
        }
    }

    /// Weather multiplier times the seasonal bonus for `crop`
    pub fn crop_growth_multiplier(&self, crop: CropKind) -> f64 {
        self.current.growth_multiplier() * self.season.crop_bonus(crop).unwrap_or(1.0)
    }

    pub fn disease_chance(&self) -> f64 {
        self.current.disease_chance()
    }

    /// Draw the next `periods` weather periods for the current season
    pub fn forecast<R: Rng>(&self, rng: &mut R, periods: usize) -> Vec<WeatherKind> {
        (0..periods)
            .map(|_| Self::generate_weather(self.season, rng))
            .collect()
    }
}

impl Default for WeatherSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_probabilities_sum_to_one() {
        for season in Season::ALL {
            let total: f64 = season.weather_probabilities().iter().map(|(_, p)| p).sum();
            assert!((total - 1.0).abs() < 1e-9, "{:?} sums to {}", season, total);
        }
    }

    #[test]
    fn test_peak_crop_bonus() {
        assert_eq!(Season::peak_crop_bonus(CropKind::Corn), 1.4);
        assert_eq!(Season::peak_crop_bonus(CropKind::Potato), 1.3);
        assert_eq!(Season::peak_crop_bonus(CropKind::Wheat), 1.1);
    }

    #[test]
    fn test_generated_weather_belongs_to_season() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let w = WeatherSystem::generate_weather(Season::Winter, &mut rng);
            assert!(matches!(w, WeatherKind::Cloudy | WeatherKind::Stormy | WeatherKind::Sunny));
        }
    }

    #[test]
    fn test_season_rolls_every_thirty_days() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut weather = WeatherSystem::new();
        for _ in 0..28 {
            weather.update(&mut rng);
        }
        assert_eq!(weather.season, Season::Spring);
        weather.update(&mut rng);
        assert_eq!(weather.day_of_year, 30);
        assert_eq!(weather.season, Season::Summer);

        while weather.day_of_year < 120 {
            weather.update(&mut rng);
        }
        assert_eq!(weather.season, Season::Spring);
    }

    #[test]
    fn test_weather_holds_for_minimum_period() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut weather = WeatherSystem::new();
        for _ in 0..119 {
            assert!(!weather.update(&mut rng).changed);
        }
        let mut changed_at = None;
        for i in 0..200 {
            if weather.update(&mut rng).changed {
                changed_at = Some(i);
                break;
            }
        }
        assert!(changed_at.is_some(), "weather never rerolled within 300 ticks");
    }

    #[test]
    fn test_crop_multiplier_includes_season_bonus() {
        let mut weather = WeatherSystem::new();
        weather.current = WeatherKind::Rainy;
        weather.season = Season::Spring;
        assert!((weather.crop_growth_multiplier(CropKind::Lettuce) - 1.5 * 1.3).abs() < 1e-9);
        assert!((weather.crop_growth_multiplier(CropKind::Corn) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_forecast_length() {
        let mut rng = StdRng::seed_from_u64(11);
        assert_eq!(WeatherSystem::new().forecast(&mut rng, 3).len(), 3);
    }
}
