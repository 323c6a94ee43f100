//! API handlers module

pub mod analysis;
pub mod chunks;
pub mod health;
pub mod search;
pub mod stats;
