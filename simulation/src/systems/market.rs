//! Market System
//!
//! Per-crop prices driven by seasonal trends, timed market events,
//! supply/demand pressure and random volatility.

use std::collections::{HashMap, VecDeque};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::components::push_bounded;
use crate::crops::CropKind;
use crate::systems::weather::Season;

/// Price samples kept per crop
pub const PRICE_HISTORY_LEN: usize = 50;
/// Maximum simultaneous market events
pub const MAX_ACTIVE_EVENTS: usize = 2;
/// Prices never fall below this share of base
const PRICE_FLOOR: f64 = 0.3;
const SUPPLY_DEMAND_MIN: f64 = 10.0;
const SUPPLY_DEMAND_MAX: f64 = 100.0;
const SUPPLY_DECAY: f64 = 0.98;
/// Supply added per harvested unit
const SUPPLY_PER_HARVEST: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketEventKind {
    Drought,
    Festival,
    ExportBoom,
    Oversupply,
    DiseaseOutbreak,
    NewRestaurant,
}

impl MarketEventKind {
    pub const ALL: [MarketEventKind; 6] = [
        MarketEventKind::Drought,
        MarketEventKind::Festival,
        MarketEventKind::ExportBoom,
        MarketEventKind::Oversupply,
        MarketEventKind::DiseaseOutbreak,
        MarketEventKind::NewRestaurant,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            MarketEventKind::Drought => "Regional Drought",
            MarketEventKind::Festival => "Harvest Festival",
            MarketEventKind::ExportBoom => "Export Boom",
            MarketEventKind::Oversupply => "Market Oversupply",
            MarketEventKind::DiseaseOutbreak => "Crop Disease Outbreak",
            MarketEventKind::NewRestaurant => "New Restaurant Chain",
        }
    }

    pub const fn description(&self) -> &'static str {
        match self {
            MarketEventKind::Drought => "Water shortage increases crop prices",
            MarketEventKind::Festival => "High demand for fresh produce",
            MarketEventKind::ExportBoom => "International demand increases prices",
            MarketEventKind::Oversupply => "Too much supply lowers prices",
            MarketEventKind::DiseaseOutbreak => "Disease reduces supply, increases prices",
            MarketEventKind::NewRestaurant => "Restaurant chain increases vegetable demand",
        }
    }

    /// Lifetime in market days
    pub const fn duration_days(&self) -> u32 {
        match self {
            MarketEventKind::Drought => 7,
            MarketEventKind::Festival => 3,
            MarketEventKind::ExportBoom => 10,
            MarketEventKind::Oversupply => 5,
            MarketEventKind::DiseaseOutbreak => 8,
            MarketEventKind::NewRestaurant => 14,
        }
    }

    /// Per-update chance in percent
    pub const fn probability(&self) -> f64 {
        match self {
            MarketEventKind::Drought => 0.1,
            MarketEventKind::Festival => 0.15,
            MarketEventKind::ExportBoom => 0.08,
            MarketEventKind::Oversupply => 0.12,
            MarketEventKind::DiseaseOutbreak => 0.06,
            MarketEventKind::NewRestaurant => 0.1,
        }
    }

    /// Price multiplier for `crop`, if the event touches it
    pub fn effect(&self, crop: CropKind) -> Option<f64> {
        use CropKind::*;
        match (self, crop) {
            (MarketEventKind::Drought, Wheat) => Some(1.4),
            (MarketEventKind::Drought, Corn) => Some(1.5),
            (MarketEventKind::Drought, Potato) => Some(1.3),
            (MarketEventKind::Drought, Carrot) => Some(1.2),
            (MarketEventKind::Drought, Tomato) => Some(1.6),
            (MarketEventKind::Drought, Lettuce) => Some(1.3),
            (MarketEventKind::Festival, Tomato) => Some(1.8),
            (MarketEventKind::Festival, Lettuce) => Some(1.6),
            (MarketEventKind::Festival, Carrot) => Some(1.4),
            (MarketEventKind::Festival, Potato) => Some(1.2),
            (MarketEventKind::ExportBoom, Wheat) => Some(1.6),
            (MarketEventKind::ExportBoom, Corn) => Some(1.7),
            (MarketEventKind::ExportBoom, Potato) => Some(1.3),
            (MarketEventKind::Oversupply, Wheat) => Some(0.7),
            (MarketEventKind::Oversupply, Corn) => Some(0.6),
            (MarketEventKind::Oversupply, Potato) => Some(0.8),
            (MarketEventKind::Oversupply, Carrot) => Some(0.7),
            (MarketEventKind::Oversupply, Tomato) => Some(0.5),
            (MarketEventKind::Oversupply, Lettuce) => Some(0.6),
            (MarketEventKind::DiseaseOutbreak, Tomato) => Some(1.9),
            (MarketEventKind::DiseaseOutbreak, Potato) => Some(1.7),
            (MarketEventKind::DiseaseOutbreak, Lettuce) => Some(1.5),
            (MarketEventKind::NewRestaurant, Tomato) => Some(1.4),
            (MarketEventKind::NewRestaurant, Lettuce) => Some(1.5),
            (MarketEventKind::NewRestaurant, Carrot) => Some(1.3),
            _ => None,
        }
    }
}

/// Seasonal price trend for a crop
pub fn seasonal_trend(season: Season, crop: CropKind) -> f64 {
    use CropKind::*;
    let row: [f64; 6] = match season {
        Season::Spring => [1.1, 0.9, 1.0, 1.2, 0.8, 1.3],
        Season::Summer => [0.9, 1.3, 0.8, 0.9, 1.4, 0.7],
        Season::Fall => [1.2, 1.1, 1.4, 1.1, 1.0, 0.9],
        Season::Winter => [1.0, 0.8, 1.2, 1.0, 1.6, 1.5],
    };
    let idx = match crop {
        Wheat => 0,
        Corn => 1,
        Potato => 2,
        Carrot => 3,
        Tomato => 4,
        Lettuce => 5,
    };
    row[idx]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveMarketEvent {
    pub kind: MarketEventKind,
    pub remaining_days: i32,
    pub started_at_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupplyDemand {
    pub supply: f64,
    pub demand: f64,
}

impl Default for SupplyDemand {
    fn default() -> Self {
        Self { supply: 50.0, demand: 50.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceTrend {
    Rising,
    Falling,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Hold,
    Sell,
    Buy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketAnalysis {
    pub price: u64,
    pub base_price: u64,
    pub trend: PriceTrend,
    /// Percent, two decimal places
    pub change: f64,
    pub recommendation: Recommendation,
    pub supply: u32,
    pub demand: u32,
    pub volatility: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SellTiming {
    Now,
    InDays(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSystem {
    pub current_prices: HashMap<CropKind, u64>,
    pub price_history: HashMap<CropKind, VecDeque<u64>>,
    pub supply_demand: HashMap<CropKind, SupplyDemand>,
    pub active_events: Vec<ActiveMarketEvent>,
    /// Max random swing per update, as a fraction
    pub volatility: f64,
}

impl MarketSystem {
    pub fn new() -> Self {
        let mut current_prices = HashMap::new();
        let mut price_history = HashMap::new();
        let mut supply_demand = HashMap::new();
        for crop in CropKind::ALL {
            current_prices.insert(crop, crop.sell_price());
            price_history.insert(crop, VecDeque::from(vec![crop.sell_price()]));
            supply_demand.insert(crop, SupplyDemand::default());
        }
        Self {
            current_prices,
            price_history,
            supply_demand,
            active_events: Vec::new(),
            volatility: 0.1,
        }
    }

    /// Recompute every price for one market day
    pub fn update_prices<R: Rng>(
        &mut self,
        season: Season,
        harvested: &HashMap<CropKind, u32>,
        now_ms: u64,
        rng: &mut R,
    ) {
        self.update_supply_demand(harvested, rng);
        self.check_for_events(now_ms, rng);

        for crop in CropKind::ALL {
            let base = crop.sell_price() as f64;
            let mut price = base * seasonal_trend(season, crop);

            for event in &self.active_events {
                if let Some(effect) = event.kind.effect(crop) {
                    price *= effect;
                }
            }

            let sd = self.supply_demand.get(&crop).copied().unwrap_or_default();
            let ratio = sd.demand / sd.supply.max(1.0);
            price *= 0.5 + ratio * 0.5;

            let swing = (rng.gen::<f64>() - 0.5) * 2.0 * self.volatility;
            price *= 1.0 + swing;

            price = price.max(base * PRICE_FLOOR);
            let rounded = price.round() as u64;

            self.current_prices.insert(crop, rounded);
            push_bounded(
                self.price_history.entry(crop).or_default(),
                rounded,
                PRICE_HISTORY_LEN,
            );
        }

        for event in &mut self.active_events {
            event.remaining_days -= 1;
        }
    }

    fn update_supply_demand<R: Rng>(&mut self, harvested: &HashMap<CropKind, u32>, rng: &mut R) {
        for crop in CropKind::ALL {
            let sd = self.supply_demand.entry(crop).or_default();
            if let Some(&count) = harvested.get(&crop) {
                sd.supply += count as f64 * SUPPLY_PER_HARVEST;
            }
            sd.demand += (rng.gen::<f64>() - 0.5) * 2.0;
            sd.supply *= SUPPLY_DECAY;
            sd.supply = sd.supply.clamp(SUPPLY_DEMAND_MIN, SUPPLY_DEMAND_MAX);
            sd.demand = sd.demand.clamp(SUPPLY_DEMAND_MIN, SUPPLY_DEMAND_MAX);
        }
    }

    fn check_for_events<R: Rng>(&mut self, now_ms: u64, rng: &mut R) {
        self.active_events.retain(|e| e.remaining_days > 0);

        if self.active_events.len() >= MAX_ACTIVE_EVENTS {
            return;
        }
        for kind in MarketEventKind::ALL {
            if self.active_events.len() >= MAX_ACTIVE_EVENTS {
                break;
            }
            if rng.gen::<f64>() < kind.probability() / 100.0
                && !self.active_events.iter().any(|e| e.kind == kind)
            {
                info!("Market event started: {}", kind.name());
                self.active_events.push(ActiveMarketEvent {
                    kind,
                    remaining_days: kind.duration_days() as i32,
                    started_at_ms: now_ms,
                });
            }
        }
    }

    pub fn price(&self, crop: CropKind) -> u64 {
        self.current_prices
            .get(&crop)
            .copied()
            .unwrap_or_else(|| crop.sell_price())
    }

    fn last_two(&self, crop: CropKind) -> Option<(u64, u64)> {
        let history = self.price_history.get(&crop)?;
        let n = history.len();
        if n < 2 {
            return None;
        }
        Some((history[n - 2], history[n - 1]))
    }

    pub fn price_trend(&self, crop: CropKind) -> PriceTrend {
        match self.last_two(crop) {
            Some((previous, current)) if current as f64 > previous as f64 * 1.05 => PriceTrend::Rising,
            Some((previous, current)) if (current as f64) < previous as f64 * 0.95 => PriceTrend::Falling,
            _ => PriceTrend::Stable,
        }
    }

    /// Percent change between the last two samples
    pub fn price_change(&self, crop: CropKind) -> f64 {
        match self.last_two(crop) {
            Some((previous, current)) if previous > 0 => {
                (current as f64 - previous as f64) / previous as f64 * 100.0
            }
            _ => 0.0,
        }
    }

    pub fn analysis(&self, crop: CropKind) -> MarketAnalysis {
        let price = self.price(crop);
        let base = crop.sell_price();
        let trend = self.price_trend(crop);
        let change = self.price_change(crop);
        let sd = self.supply_demand.get(&crop).copied().unwrap_or_default();

        let mut recommendation = Recommendation::Hold;
        if price as f64 > base as f64 * 1.2 && trend == PriceTrend::Rising {
            recommendation = Recommendation::Sell;
        }
        if (price as f64) < base as f64 * 0.8 && trend == PriceTrend::Falling {
            recommendation = Recommendation::Buy;
        }
        if trend == PriceTrend::Rising && change > 5.0 {
            recommendation = Recommendation::Sell;
        }
        if trend == PriceTrend::Falling && change < -5.0 {
            recommendation = Recommendation::Buy;
        }

        MarketAnalysis {
            price,
            base_price: base,
            trend,
            change: (change * 100.0).round() / 100.0,
            recommendation,
            supply: sd.supply.round() as u32,
            demand: sd.demand.round() as u32,
            volatility: self.volatility,
        }
    }

    pub fn active_events(&self) -> &[ActiveMarketEvent] {
        &self.active_events
    }

    /// Most recent `days` samples, oldest first
    pub fn price_history(&self, crop: CropKind, days: usize) -> Vec<u64> {
        self.price_history
            .get(&crop)
            .map(|h| h.iter().skip(h.len().saturating_sub(days)).copied().collect())
            .unwrap_or_default()
    }

    /// Trend-continuation forecast; empty until three samples exist
    pub fn price_forecast<R: Rng>(&self, crop: CropKind, days: usize, rng: &mut R) -> Vec<u64> {
        let Some(history) = self.price_history.get(&crop) else {
            return Vec::new();
        };
        let Some(&last) = history.back() else {
            return Vec::new();
        };
        if history.len() < 3 {
            return Vec::new();
        }

        let trend = self.price_trend(crop);
        let mut last_price = last as f64;
        let mut forecast = Vec::with_capacity(days);
        for _ in 0..days {
            let change = match trend {
                PriceTrend::Rising => rng.gen::<f64>() * 0.1,
                PriceTrend::Falling => -rng.gen::<f64>() * 0.1,
                PriceTrend::Stable => (rng.gen::<f64>() - 0.5) * 0.05,
            };
            last_price = (last_price * (1.0 + change)).round();
            forecast.push(last_price as u64);
        }
        forecast
    }

    pub fn optimal_sell_time<R: Rng>(&self, crop: CropKind, rng: &mut R) -> SellTiming {
        let analysis = self.analysis(crop);
        if analysis.recommendation == Recommendation::Sell {
            return SellTiming::Now;
        }

        let mut peak_day = 0;
        let mut peak_price = analysis.price;
        for (i, price) in self.price_forecast(crop, 5, rng).into_iter().enumerate() {
            if price > peak_price {
                peak_price = price;
                peak_day = i as u32 + 1;
            }
        }

        if peak_day > 0 {
            SellTiming::InDays(peak_day)
        } else {
            SellTiming::Now
        }
    }
}

impl Default for MarketSystem {
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
    fn test_prices_respect_floor() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut market = MarketSystem::new();
        for crop in CropKind::ALL {
            let sd = market.supply_demand.get_mut(&crop).unwrap();
            sd.supply = 100.0;
            sd.demand = 10.0;
        }
        market.active_events.push(ActiveMarketEvent {
            kind: MarketEventKind::Oversupply,
            remaining_days: 5,
            started_at_ms: 0,
        });
        for _ in 0..20 {
            market.update_prices(Season::Summer, &HashMap::new(), 0, &mut rng);
            for crop in CropKind::ALL {
                let floor = (crop.sell_price() as f64 * 0.3).round() as u64;
                assert!(market.price(crop) >= floor, "{:?} fell below floor", crop);
            }
        }
    }

    #[test]
    fn test_history_is_capped() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut market = MarketSystem::new();
        for _ in 0..80 {
            market.update_prices(Season::Spring, &HashMap::new(), 0, &mut rng);
        }
        assert_eq!(market.price_history[&CropKind::Wheat].len(), PRICE_HISTORY_LEN);
        assert_eq!(market.price_history(CropKind::Wheat, 10).len(), 10);
    }

    #[test]
    fn test_events_expire_and_cap() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut market = MarketSystem::new();
        market.active_events.push(ActiveMarketEvent {
            kind: MarketEventKind::Festival,
            remaining_days: 1,
            started_at_ms: 0,
        });
        market.update_prices(Season::Fall, &HashMap::new(), 0, &mut rng);
        let festival = market
            .active_events
            .iter()
            .find(|e| e.kind == MarketEventKind::Festival)
            .unwrap();
        assert_eq!(festival.remaining_days, 0);
        market.update_prices(Season::Fall, &HashMap::new(), 1_000, &mut rng);
        assert!(market.active_events.iter().all(|e| e.started_at_ms != 0));

        for _ in 0..5000 {
            market.update_prices(Season::Fall, &HashMap::new(), 0, &mut rng);
            assert!(market.active_events.len() <= MAX_ACTIVE_EVENTS);
            let mut kinds: Vec<_> = market.active_events.iter().map(|e| e.kind).collect();
            kinds.sort_by_key(|k| *k as u8);
            kinds.dedup();
            assert_eq!(kinds.len(), market.active_events.len(), "duplicate event");
        }
    }

    #[test]
    fn test_harvests_raise_supply() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut market = MarketSystem::new();
        let harvested = HashMap::from([(CropKind::Corn, 200)]);
        market.update_prices(Season::Spring, &harvested, 0, &mut rng);
        assert!(market.supply_demand[&CropKind::Corn].supply > market.supply_demand[&CropKind::Wheat].supply);
    }

    #[test]
    fn test_trend_and_recommendation() {
        let mut market = MarketSystem::new();
        assert_eq!(market.price_trend(CropKind::Potato), PriceTrend::Stable);

        market.price_history.insert(CropKind::Potato, VecDeque::from(vec![100, 130]));
        market.current_prices.insert(CropKind::Potato, 130);
        assert_eq!(market.price_trend(CropKind::Potato), PriceTrend::Rising);
        let analysis = market.analysis(CropKind::Potato);
        assert_eq!(analysis.change, 30.0);
        assert_eq!(analysis.recommendation, Recommendation::Sell);

        market.price_history.insert(CropKind::Potato, VecDeque::from(vec![100, 70]));
        market.current_prices.insert(CropKind::Potato, 70);
        assert_eq!(market.analysis(CropKind::Potato).recommendation, Recommendation::Buy);
    }

    #[test]
    fn test_forecast_needs_history() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut market = MarketSystem::new();
        assert!(market.price_forecast(CropKind::Corn, 3, &mut rng).is_empty());
        market.price_history.insert(CropKind::Corn, VecDeque::from(vec![70, 72, 71]));
        assert_eq!(market.price_forecast(CropKind::Corn, 3, &mut rng).len(), 3);
    }
}
