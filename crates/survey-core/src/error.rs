//! Error types for flight planning.

use crate::geometry::Point;
use crate::models::FlightPlan;
use thiserror::Error;

/// Expected-but-rare planning failures. None of these indicate a bug; they are
/// reported to the caller as values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanningError {
    #[error("no obstacle-free route from {from} to {to}")]
    RouteNotFound { from: Point, to: Point },

    #[error("move budget exhausted flying from {start} towards {target}")]
    MoveSynthesisTimeout { start: Point, target: Point },

    #[error("no collision-free heading sequence from {start} towards {target}")]
    NoPathFound { start: Point, target: Point },

    #[error("waypoint route has {points} points, need a source and a destination")]
    DegenerateRoute { points: usize },
}

pub type PlanningResult<T> = Result<T, PlanningError>;

/// A planning run that could not produce a complete flight plan.
///
/// `partial` holds the moves of the tour candidate that got furthest, so the
/// caller can still report what was planned.
#[derive(Error, Debug)]
#[error("flight planning failed: {error}")]
pub struct PlanFailure {
    #[source]
    pub error: PlanningError,
    pub partial: Option<FlightPlan>,
}

impl From<PlanningError> for PlanFailure {
    fn from(error: PlanningError) -> Self {
        Self {
            error,
            partial: None,
        }
    }
}

/// Problems with planner inputs handed over by a loader.
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Scenario parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No-fly zone {index} has {vertices} vertices, need at least 3")]
    DegeneratePolygon { index: usize, vertices: usize },

    #[error("Confinement corners do not span an area: {north_west} / {south_east}")]
    EmptyConfinement { north_west: Point, south_east: Point },

    #[error("Start position {0} is outside the confinement area or inside a no-fly zone")]
    StartBlocked(Point),

    #[error("Sensor {index} at {location} is outside the confinement area or inside a no-fly zone")]
    SensorBlocked { index: usize, location: Point },
}
