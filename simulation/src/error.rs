//! Error types for player actions
//!
//! The `Display` text of each variant is the notification shown to the player.

use thiserror::Error;

use crate::components::FieldId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GameError {
    #[error("Field {0} not found")]
    FieldNotFound(FieldId),

    #[error("Field {0} unavailable")]
    FieldOccupied(FieldId),

    #[error("Field {0} has nothing planted")]
    FieldEmpty(FieldId),

    #[error("Crop not ready for harvest")]
    CropNotReady,

    #[error("Soil not suitable for this crop")]
    SoilUnsuitable,

    #[error("Unknown crop: {0}")]
    UnknownCrop(String),

    #[error("Unknown item: {0}")]
    UnknownItem(String),

    #[error("Need ₹{need}")]
    InsufficientFunds { need: u64, have: u64 },

    #[error("Unlock at level {required}")]
    LevelLocked { required: u32 },

    #[error("Upgrade already installed")]
    UpgradeInstalled,

    #[error("Equipment not owned")]
    EquipmentNotOwned,

    #[error("No available equipment")]
    EquipmentUnavailable,

    #[error("Not enough items")]
    NotEnoughItems,

    #[error("No disease to treat")]
    NoDisease,

    #[error("Invalid game speed: {0}")]
    InvalidSpeed(f64),
}

impl GameError {
    /// Fails with `InsufficientFunds` unless `money` covers `cost`
    pub fn require_funds(money: u64, cost: u64) -> Result<(), GameError> {
        if money < cost {
            return Err(GameError::InsufficientFunds { need: cost, have: money });
        }
        Ok(())
    }

    /// Fails with `LevelLocked` unless `level` reaches `required`
    pub fn require_level(level: u32, required: u32) -> Result<(), GameError> {
        if level < required {
            return Err(GameError::LevelLocked { required });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_notifications() {
        let err = GameError::InsufficientFunds { need: 75, have: 10 };
        assert_eq!(err.to_string(), "Need ₹75");
        assert_eq!(GameError::LevelLocked { required: 6 }.to_string(), "Unlock at level 6");
        assert_eq!(GameError::CropNotReady.to_string(), "Crop not ready for harvest");
    }

    #[test]
    fn test_require_helpers() {
        assert!(GameError::require_funds(100, 100).is_ok());
        assert!(GameError::require_funds(99, 100).is_err());
        assert!(GameError::require_level(3, 4).is_err());
        assert!(GameError::require_level(4, 4).is_ok());
    }
}
