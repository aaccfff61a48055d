//! Game Systems - advance state each tick and compute effect multipliers

pub mod achievements;
pub mod disease;
pub mod equipment;
pub mod field_management;
pub mod growth;
pub mod market;
pub mod weather;

pub use growth::{growth_system, moisture_system};
