//! REST routes for the gamification surface.

pub mod rewards;
pub mod stats;
