//! Disease System
//!
//! Weather-driven infections, field-to-field spread, and treatments that
//! cure a field and protect it for a while.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::components::FieldId;
use crate::crops::CropKind;
use crate::error::GameError;

/// Game milliseconds in one treatment-protection day
pub const DAY_MS: u64 = 24 * 60 * 60 * 1000;
/// Severity kept after a failed treatment
const FAILED_TREATMENT_SEVERITY: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiseaseKind {
    Aphids,
    Blight,
    Rust,
    RootRot,
    Locusts,
    Mildew,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreatmentKind {
    Pesticide,
    Fungicide,
    SoilTreatment,
    OrganicSpray,
}

/// Static disease template
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiseaseInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub growth_penalty: f64,
    pub yield_penalty: f64,
    pub spread_chance: f64,
    pub affected_crops: &'static [CropKind],
    pub treatment: TreatmentKind,
    pub treatment_cost: u64,
    pub severity_label: &'static str,
}

impl DiseaseKind {
    pub const ALL: [DiseaseKind; 6] = [
        DiseaseKind::Aphids,
        DiseaseKind::Blight,
        DiseaseKind::Rust,
        DiseaseKind::RootRot,
        DiseaseKind::Locusts,
        DiseaseKind::Mildew,
    ];

    pub const fn info(&self) -> DiseaseInfo {
        use CropKind::*;
        match self {
            DiseaseKind::Aphids => DiseaseInfo {
                name: "Aphid Infestation",
                description: "Small insects sucking plant juices",
                growth_penalty: 0.3,
                yield_penalty: 0.2,
                spread_chance: 0.15,
                affected_crops: &[Lettuce, Tomato, Carrot],
                treatment: TreatmentKind::Pesticide,
                treatment_cost: 50,
                severity_label: "mild",
            },
            DiseaseKind::Blight => DiseaseInfo {
                name: "Crop Blight",
                description: "Fungal disease causing brown spots",
                growth_penalty: 0.5,
                yield_penalty: 0.4,
                spread_chance: 0.25,
                affected_crops: &[Potato, Tomato],
                treatment: TreatmentKind::Fungicide,
                treatment_cost: 75,
                severity_label: "severe",
            },
            DiseaseKind::Rust => DiseaseInfo {
                name: "Crop Rust",
                description: "Orange-brown fungal infection",
                growth_penalty: 0.4,
                yield_penalty: 0.3,
                spread_chance: 0.2,
                affected_crops: &[Wheat, Corn],
                treatment: TreatmentKind::Fungicide,
                treatment_cost: 60,
                severity_label: "moderate",
            },
            DiseaseKind::RootRot => DiseaseInfo {
                name: "Root Rot",
                description: "Soil-borne disease affecting roots",
                growth_penalty: 0.6,
                yield_penalty: 0.5,
                spread_chance: 0.1,
                affected_crops: &[Carrot, Potato],
                treatment: TreatmentKind::SoilTreatment,
                treatment_cost: 100,
                severity_label: "severe",
            },
            DiseaseKind::Locusts => DiseaseInfo {
                name: "Locust Swarm",
                description: "Devastating swarm eating crops",
                growth_penalty: 0.8,
                yield_penalty: 0.7,
                spread_chance: 0.3,
                affected_crops: &[Wheat, Corn, Lettuce],
                treatment: TreatmentKind::Pesticide,
                treatment_cost: 150,
                severity_label: "catastrophic",
            },
            DiseaseKind::Mildew => DiseaseInfo {
                name: "Powdery Mildew",
                description: "White powdery fungal growth",
                growth_penalty: 0.25,
                yield_penalty: 0.15,
                spread_chance: 0.12,
                affected_crops: &[Lettuce, Tomato],
                treatment: TreatmentKind::Fungicide,
                treatment_cost: 40,
                severity_label: "mild",
            },
        }
    }

    pub fn affects(&self, crop: CropKind) -> bool {
        self.info().affected_crops.contains(&crop)
    }
}

/// Static treatment template
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreatmentInfo {
    pub name: &'static str,
    pub base_cost: u64,
    pub effectiveness: f64,
    pub prevention_days: u64,
    pub soil_quality_effect: f64,
    pub environmental_impact: f64,
}

impl TreatmentKind {
    pub const fn info(&self) -> TreatmentInfo {
        match self {
            TreatmentKind::Pesticide => TreatmentInfo {
                name: "Pesticide Spray",
                base_cost: 50,
                effectiveness: 0.9,
                prevention_days: 5,
                soil_quality_effect: -0.1,
                environmental_impact: 0.2,
            },
            TreatmentKind::Fungicide => TreatmentInfo {
                name: "Fungicide Treatment",
                base_cost: 75,
                effectiveness: 0.85,
                prevention_days: 7,
                soil_quality_effect: -0.05,
                environmental_impact: 0.1,
            },
            TreatmentKind::SoilTreatment => TreatmentInfo {
                name: "Soil Treatment",
                base_cost: 100,
                effectiveness: 0.8,
                prevention_days: 10,
                soil_quality_effect: 0.2,
                environmental_impact: -0.1,
            },
            TreatmentKind::OrganicSpray => TreatmentInfo {
                name: "Organic Spray",
                base_cost: 80,
                effectiveness: 0.7,
                prevention_days: 3,
                soil_quality_effect: 0.05,
                environmental_impact: -0.05,
            },
        }
    }
}

/// A live infection on one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Infection {
    pub disease: DiseaseKind,
    pub severity: f64,
    pub infected_at_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Protection {
    pub treatment: TreatmentKind,
    pub applied_at_ms: u64,
    pub duration_ms: u64,
}

/// Multipliers an infection applies to its field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiseaseEffects {
    pub growth_multiplier: f64,
    pub yield_multiplier: f64,
    pub disease: Option<DiseaseKind>,
}

impl DiseaseEffects {
    pub const HEALTHY: DiseaseEffects = DiseaseEffects {
        growth_multiplier: 1.0,
        yield_multiplier: 1.0,
        disease: None,
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentOutcome {
    pub success: bool,
    pub cost: u64,
    /// Soil quality change to apply to the field
    pub soil_quality_delta: f64,
    pub message: String,
}

/// A field eligible to catch a spreading disease
#[derive(Debug, Clone, Copy)]
pub struct SpreadTarget {
    pub field: FieldId,
    pub crop: Option<CropKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseSystem {
    pub active: BTreeMap<FieldId, Infection>,
    pub protections: BTreeMap<FieldId, Protection>,
    /// 0-100; chemical treatments wear it down
    pub environmental_health: f64,
}

impl DiseaseSystem {
    pub fn new() -> Self {
        Self {
            active: BTreeMap::new(),
            protections: BTreeMap::new(),
            environmental_health: 100.0,
        }
    }

    /// Roll for a fresh infection on a planted field.
    /// `reduction` is the field's combined disease reduction (0-1).
    pub fn check_for_disease<R: Rng>(
        &mut self,
        field: FieldId,
        crop: CropKind,
        weather_chance: f64,
        reduction: f64,
        now_ms: u64,
        rng: &mut R,
    ) -> Option<DiseaseKind> {
        if self.active.contains_key(&field) {
            return None;
        }

        let chance = weather_chance
            * ((101.0 - self.environmental_health) / 100.0)
            * (1.0 - reduction.clamp(0.0, 1.0));
        if rng.gen::<f64>() > chance {
            return None;
        }

        let candidates: Vec<DiseaseKind> = DiseaseKind::ALL
            .iter()
            .copied()
            .filter(|d| d.affects(crop))
            .collect();
        let disease = *candidates.choose(rng)?;

        let severity = rng.gen::<f64>() * 0.5 + 0.5;
        info!(
            "{} detected in field {} (severity {:.2})",
            disease.info().name,
            field,
            severity
        );
        self.active.insert(
            field,
            Infection {
                disease,
                severity,
                infected_at_ms: now_ms,
            },
        );
        Some(disease)
    }

    /// Spread every infection to susceptible neighbours. Returns new infections.
    pub fn spread<R: Rng>(
        &mut self,
        fields: &[SpreadTarget],
        now_ms: u64,
        rng: &mut R,
    ) -> Vec<(FieldId, DiseaseKind)> {
        let mut new_infections: Vec<(FieldId, DiseaseKind)> = Vec::new();

        for (source, infection) in &self.active {
            let info = infection.disease.info();
            for target in fields {
                if target.field == *source || self.active.contains_key(&target.field) {
                    continue;
                }
                let Some(crop) = target.crop else {
                    continue;
                };
                if !infection.disease.affects(crop) {
                    continue;
                }
                if new_infections.iter().any(|(f, _)| *f == target.field) {
                    continue;
                }
                if rng.gen::<f64>() < info.spread_chance * infection.severity {
                    new_infections.push((target.field, infection.disease));
                }
            }
        }

        for (field, disease) in &new_infections {
            debug!("{} spread to field {}", disease.info().name, field);
            self.active.insert(
                *field,
                Infection {
                    disease: *disease,
                    severity: rng.gen::<f64>() * 0.3 + 0.4,
                    infected_at_ms: now_ms,
                },
            );
        }

        new_infections
    }

    /// Attempt a treatment. The cost is charged whether or not it takes.
    pub fn treat<R: Rng>(
        &mut self,
        field: FieldId,
        treatment: TreatmentKind,
        money: u64,
        now_ms: u64,
        rng: &mut R,
    ) -> Result<TreatmentOutcome, GameError> {
        let disease = self.active.get(&field).ok_or(GameError::NoDisease)?.disease;
        let info = treatment.info();
        GameError::require_funds(money, info.base_cost)?;

        let success = rng.gen::<f64>() < info.effectiveness;
        if success {
            self.active.remove(&field);
            self.protections.insert(
                field,
                Protection {
                    treatment,
                    applied_at_ms: now_ms,
                    duration_ms: info.prevention_days * DAY_MS,
                },
            );
            self.environmental_health =
                (self.environmental_health - info.environmental_impact * 10.0).clamp(0.0, 100.0);
        } else if let Some(infection) = self.active.get_mut(&field) {
            infection.severity *= FAILED_TREATMENT_SEVERITY;
        }

        Ok(TreatmentOutcome {
            success,
            cost: info.base_cost,
            soil_quality_delta: if success { info.soil_quality_effect } else { 0.0 },
            message: if success {
                format!("Successfully treated {}!", disease.info().name)
            } else {
                "Treatment failed, but disease weakened".to_string()
            },
        })
    }

    pub fn effects(&self, field: FieldId) -> DiseaseEffects {
        match self.active.get(&field) {
            Some(infection) => {
                let info = infection.disease.info();
                DiseaseEffects {
                    growth_multiplier: 1.0 - info.growth_penalty * infection.severity,
                    yield_multiplier: 1.0 - info.yield_penalty * infection.severity,
                    disease: Some(infection.disease),
                }
            }
            None => DiseaseEffects::HEALTHY,
        }
    }

    pub fn is_protected(&self, field: FieldId, now_ms: u64) -> bool {
        self.protections
            .get(&field)
            .is_some_and(|p| now_ms.saturating_sub(p.applied_at_ms) < p.duration_ms)
    }

    pub fn active_diseases(&self) -> impl Iterator<Item = (&FieldId, &Infection)> {
        self.active.iter()
    }

    /// Drop expired protection windows
    pub fn cleanup(&mut self, now_ms: u64) {
        self.protections
            .retain(|_, p| now_ms.saturating_sub(p.applied_at_ms) <= p.duration_ms);
    }

    /// The infection leaves with the harvested crop
    pub fn clear_field(&mut self, field: FieldId) -> Option<Infection> {
        self.active.remove(&field)
    }
}

impl Default for DiseaseSystem {
    fn default() -> Self {
        Self::new()
    }
}
