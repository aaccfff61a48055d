//! Crop catalogue
//!
//! Static growth and price data for every plantable crop.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::GameError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropKind {
    Wheat,
    Corn,
    Potato,
    Carrot,
    Tomato,
    Lettuce,
}

static CROP_BY_KEY: Lazy<HashMap<&'static str, CropKind>> =
    Lazy::new(|| CropKind::ALL.iter().map(|c| (c.key(), *c)).collect());

impl CropKind {
    pub const ALL: [CropKind; 6] = [
        CropKind::Wheat,
        CropKind::Corn,
        CropKind::Potato,
        CropKind::Carrot,
        CropKind::Tomato,
        CropKind::Lettuce,
    ];

    pub const fn key(&self) -> &'static str {
        match self {
            CropKind::Wheat => "wheat",
            CropKind::Corn => "corn",
            CropKind::Potato => "potato",
            CropKind::Carrot => "carrot",
            CropKind::Tomato => "tomato",
            CropKind::Lettuce => "lettuce",
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            CropKind::Wheat => "Wheat",
            CropKind::Corn => "Corn",
            CropKind::Potato => "Potato",
            CropKind::Carrot => "Carrot",
            CropKind::Tomato => "Tomato",
            CropKind::Lettuce => "Lettuce",
        }
    }

    /// Base time to maturity in game milliseconds
    pub const fn grow_time_ms(&self) -> u64 {
        match self {
            CropKind::Wheat => 12_000,
            CropKind::Corn => 18_000,
            CropKind::Potato => 20_000,
            CropKind::Carrot => 15_000,
            CropKind::Tomato => 16_000,
            CropKind::Lettuce => 10_000, // fastest
        }
    }

    /// Base sell price, also the market's base price
    pub const fn sell_price(&self) -> u64 {
        match self {
            CropKind::Wheat => 40,
            CropKind::Corn => 70,
            CropKind::Potato => 100,
            CropKind::Carrot => 55,
            CropKind::Tomato => 85,
            CropKind::Lettuce => 30,
        }
    }

    /// Soil quality lost per harvest before soil and compaction modifiers
    pub const fn soil_degradation(&self) -> f64 {
        match self {
            CropKind::Wheat => 0.3,
            CropKind::Corn => 0.4,
            CropKind::Potato => 0.5,
            CropKind::Carrot => 0.3,
            CropKind::Tomato => 0.4,
            CropKind::Lettuce => 0.2,
        }
    }
}

impl fmt::Display for CropKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CropKind {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CROP_BY_KEY
            .get(s.trim().to_ascii_lowercase().as_str())
            .copied()
            .ok_or_else(|| GameError::UnknownCrop(s.to_string()))
    }
}

/// Format a duration as "2m 5s" or "45s"
pub fn format_duration(ms: u64) -> String {
    let seconds = ms / 1000;
    let minutes = seconds / 60;
    let rem = seconds % 60;
    if minutes > 0 {
        format!("{}m {}s", minutes, rem)
    } else {
        format!("{}s", rem)
    }
}

/// Format a countdown as "m:ss", rounding partial seconds up
pub fn format_countdown(ms: u64) -> String {
    if ms == 0 {
        return "Ready!".to_string();
    }
    let total = ms.div_ceil(1000);
    format!("{}:{:02}", total / 60, total % 60)
}
