//! Planner configuration.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Tunable constants of a planning run. All lengths are in coordinate degrees.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Length of every drone move
    pub move_length: f64,
    /// A sensor is read once the drone ends a move closer than this
    pub sensor_range: f64,
    /// The flight ends once the drone is closer than this to its start
    pub end_range: f64,
    /// Extra moves allowed per waypoint on top of the straight-line estimate
    pub budget_margin: usize,
    /// How far detour corners are pushed away from their no-fly zone
    pub corner_clearance: f64,
    /// How far a sensor target is shifted towards the next stop of the tour
    pub target_nudge: f64,
    /// Seed for randomised tour restarts
    pub tour_seed: u64,
    /// Number of randomised tour restarts
    pub tour_restarts: usize,
    /// Number of tour candidates turned into moves
    pub max_candidates: usize,
    /// Fly tour candidates on separate threads
    pub parallel_candidates: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            move_length: 0.0003,
            sensor_range: 0.0002,
            end_range: 0.0003,
            budget_margin: 4,
            corner_clearance: 0.00005,
            target_nudge: 0.0001,
            tour_seed: 0,
            tour_restarts: 16,
            max_candidates: 4,
            parallel_candidates: true,
        }
    }
}

impl PlannerConfig {
    /// Defaults overridden by any `SURVEY_*` environment variables that parse.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            move_length: env_or("SURVEY_MOVE_LENGTH", defaults.move_length),
            sensor_range: env_or("SURVEY_SENSOR_RANGE", defaults.sensor_range),
            end_range: env_or("SURVEY_END_RANGE", defaults.end_range),
            budget_margin: env_or("SURVEY_BUDGET_MARGIN", defaults.budget_margin),
            corner_clearance: env_or("SURVEY_CORNER_CLEARANCE", defaults.corner_clearance),
            target_nudge: env_or("SURVEY_TARGET_NUDGE", defaults.target_nudge),
            tour_seed: env_or("SURVEY_TOUR_SEED", defaults.tour_seed),
            tour_restarts: env_or("SURVEY_TOUR_RESTARTS", defaults.tour_restarts),
            max_candidates: env_or("SURVEY_MAX_CANDIDATES", defaults.max_candidates),
            parallel_candidates: env_or("SURVEY_PARALLEL_CANDIDATES", defaults.parallel_candidates),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
