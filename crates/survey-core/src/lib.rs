//! Survey Drone Core - Flight planning for air-quality sensor surveys
//!
//! Plans a closed drone flight that reads every sensor in a confined area
//! while staying clear of no-fly zones, using fixed-length moves on a
//! 10-degree heading grid.

pub mod cache;
pub mod config;
pub mod error;
pub mod evader;
pub mod geometry;
pub mod models;
pub mod navigation;
pub mod obstacles;
pub mod planner;
pub mod tour;

pub use cache::{CacheStats, LegKey, RouteCache};
pub use config::PlannerConfig;
pub use error::{PlanFailure, PlanningError, PlanningResult, ScenarioError};
pub use evader::ObstacleEvader;
pub use geometry::{Point, Segment};
pub use models::{
    Confinement, FlightPlan, Leg, LegSummary, Move, Polygon, Scenario, Sensor, WaypointRoute,
};
pub use navigation::{LegTarget, MoveSynthesizer};
pub use obstacles::ObstacleField;
pub use planner::FlightPlanner;
pub use tour::{CostMatrix, NearestNeighbourTour, RestartTour, Tour, TourStrategy};
