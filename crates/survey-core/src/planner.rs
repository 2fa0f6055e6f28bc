//! End-to-end flight planning.
//!
//! Builds the route-cost matrix, asks the tour strategy for candidate
//! visiting orders, turns every candidate into moves leg by leg and keeps the
//! one with the fewest moves. Legs are memoized in a [`RouteCache`] shared by
//! all candidates.

use chrono::Utc;
use std::sync::Arc;
use std::thread;

use crate::cache::{LegKey, RouteCache};
use crate::config::PlannerConfig;
use crate::error::{PlanFailure, PlanningError, PlanningResult};
use crate::evader::ObstacleEvader;
use crate::geometry::Point;
use crate::models::{
    Confinement, FlightPlan, Leg, LegSummary, Move, Polygon, Scenario, Sensor, WaypointRoute,
};
use crate::navigation::{LegTarget, MoveSynthesizer};
use crate::obstacles::ObstacleField;
use crate::tour::{CostMatrix, RestartTour, TourStrategy};

/// Moves and leg accounting for one flown tour candidate.
#[derive(Debug, Default)]
struct FlownTour {
    moves: Vec<Move>,
    legs: Vec<LegSummary>,
}

impl FlownTour {
    fn push_leg(&mut self, leg: &Leg, target: Option<usize>) {
        let first = self.moves.len();
        self.moves.extend_from_slice(&leg.moves);
        // Cached legs are shared between sensors at the same spot; tag the
        // arrival with the sensor this tour is actually visiting.
        if let Some(last) = self.moves.last_mut() {
            last.visited_sensor = target;
        }
        self.legs.push(LegSummary {
            target,
            move_count: self.moves.len() - first,
            move_bound: leg.move_bound,
        });
    }

    fn into_plan(self, tour: Vec<usize>) -> FlightPlan {
        FlightPlan {
            moves: self.moves,
            tour,
            legs: self.legs,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug)]
struct StalledTour {
    flown: FlownTour,
    error: PlanningError,
}

/// Plans survey flights over a fixed obstacle field.
pub struct FlightPlanner {
    config: PlannerConfig,
    field: Arc<ObstacleField>,
    evader: ObstacleEvader,
    synthesizer: MoveSynthesizer,
    cache: RouteCache,
    strategy: Box<dyn TourStrategy>,
}

impl FlightPlanner {
    pub fn new(
        confinement: Confinement,
        no_fly_zones: Vec<Polygon>,
        config: PlannerConfig,
    ) -> Self {
        let field = Arc::new(ObstacleField::new(confinement, no_fly_zones));
        let evader = ObstacleEvader::new(field.clone(), config.corner_clearance);
        let synthesizer = MoveSynthesizer::new(field.clone(), &config);
        let strategy = Box::new(RestartTour::new(
            config.tour_seed,
            config.tour_restarts,
            config.max_candidates,
        ));

        Self {
            config,
            field,
            evader,
            synthesizer,
            cache: RouteCache::new(),
            strategy,
        }
    }

    pub fn from_scenario(scenario: &Scenario, config: PlannerConfig) -> Self {
        Self::new(scenario.confinement, scenario.no_fly_zones.clone(), config)
    }

    /// Replace the tour construction strategy.
    pub fn with_strategy(mut self, strategy: Box<dyn TourStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn field(&self) -> &ObstacleField {
        &self.field
    }

    pub fn evader(&self) -> &ObstacleEvader {
        &self.evader
    }

    pub fn synthesizer(&self) -> &MoveSynthesizer {
        &self.synthesizer
    }

    pub fn cache(&self) -> &RouteCache {
        &self.cache
    }

    /// Drop all memoized legs before an unrelated planning run.
    pub fn reset(&self) {
        self.cache.clear();
    }

    /// Plan a flight from `start` past every sensor and back.
    ///
    /// If no tour candidate can be flown completely, the failure carries the
    /// partial plan of the candidate that got furthest.
    pub fn plan(&self, start: Point, sensors: &[Sensor]) -> Result<FlightPlan, PlanFailure> {
        let locations: Vec<Point> = sensors.iter().map(|sensor| sensor.location).collect();
        let costs = CostMatrix::build(&self.evader, start, &locations)?;

        let mut candidates = self.strategy.candidates(&costs);
        candidates.truncate(self.config.max_candidates.max(1));
        tracing::info!(
            "Planning survey of {} sensors from {}: {} tour candidates ({})",
            sensors.len(),
            start,
            candidates.len(),
            self.strategy.name()
        );

        let outcomes: Vec<Result<FlownTour, StalledTour>> =
            if self.config.parallel_candidates && candidates.len() > 1 {
                thread::scope(|scope| {
                    let handles: Vec<_> = candidates
                        .iter()
                        .map(|tour| {
                            let locations = &locations;
                            scope.spawn(move || self.fly_tour(start, locations, &tour.order))
                        })
                        .collect();
                    handles
                        .into_iter()
                        .map(|handle| {
                            handle
                                .join()
                                .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                        })
                        .collect()
                })
            } else {
                candidates
                    .iter()
                    .map(|tour| self.fly_tour(start, &locations, &tour.order))
                    .collect()
            };

        let mut best: Option<(usize, FlownTour)> = None;
        let mut furthest: Option<(usize, StalledTour)> = None;
        for (idx, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(flown) => {
                    tracing::debug!(
                        "Candidate {} (route cost {:.6}) flown in {} moves",
                        idx,
                        candidates[idx].cost,
                        flown.moves.len()
                    );
                    if best
                        .as_ref()
                        .map_or(true, |(_, current)| flown.moves.len() < current.moves.len())
                    {
                        best = Some((idx, flown));
                    }
                }
                Err(stalled) => {
                    tracing::warn!(
                        "Candidate {} stalled after {} legs: {}",
                        idx,
                        stalled.flown.legs.len(),
                        stalled.error
                    );
                    if furthest.as_ref().map_or(true, |(_, current)| {
                        stalled.flown.legs.len() > current.flown.legs.len()
                    }) {
                        furthest = Some((idx, stalled));
                    }
                }
            }
        }

        let stats = self.cache.stats();
        match (best, furthest) {
            (Some((idx, flown)), _) => {
                let plan = flown.into_plan(candidates[idx].order.clone());
                tracing::info!(
                    "Flight plan ready: {} moves, {} legs (candidate {}, {} cache hits, {} misses)",
                    plan.move_count(),
                    plan.legs.len(),
                    idx,
                    stats.hits,
                    stats.misses
                );
                Ok(plan)
            }
            (None, Some((idx, stalled))) => Err(PlanFailure {
                error: stalled.error,
                partial: Some(stalled.flown.into_plan(candidates[idx].order.clone())),
            }),
            // Strategies never return an empty candidate list, but an empty
            // outcome set still has to fail cleanly.
            (None, None) => Err(PlanningError::NoPathFound {
                start,
                target: start,
            }
            .into()),
        }
    }

    /// Moves for a single leg, served from the cache when possible.
    ///
    /// With a `sensor` the leg ends within sensor range of `target` and `next`
    /// is where the tour continues. Without one it is the return leg, which
    /// ends within the end range of `target`, and `next` is ignored.
    pub(crate) fn leg(
        &self,
        start: Point,
        target: Point,
        sensor: Option<usize>,
        next: Option<Point>,
    ) -> PlanningResult<Arc<Leg>> {
        // Only the return leg is keyed without a next target.
        let next = sensor.map(|_| next.unwrap_or(target));
        let key = LegKey::new(start, target, next);
        self.cache.get_or_try_insert_with(key, || {
            let goal = match sensor {
                Some(index) => LegTarget::Sensor {
                    index,
                    location: target,
                },
                None => LegTarget::End,
            };
            let mut route = self.evader.route(start, target)?;
            if let (Some(_), Some(next)) = (sensor, next) {
                route = self.nudge_towards(route, target, next);
            }
            let moves = self.synthesizer.navigate(&route, goal)?;
            let move_bound = self.synthesizer.move_bound(&route);
            tracing::debug!(
                "Leg {} -> {}: {} waypoints, {} moves (bound {})",
                start,
                target,
                route.points().len(),
                moves.len(),
                move_bound
            );
            Ok(Leg {
                route,
                moves,
                move_bound,
            })
        })
    }

    fn fly_tour(
        &self,
        start: Point,
        locations: &[Point],
        order: &[usize],
    ) -> Result<FlownTour, StalledTour> {
        let mut flown = FlownTour::default();
        let mut position = start;

        for (k, &sensor) in order.iter().enumerate() {
            let next = order
                .get(k + 1)
                .map(|&following| locations[following])
                .unwrap_or(start);
            match self.leg(position, locations[sensor], Some(sensor), Some(next)) {
                Ok(leg) => {
                    flown.push_leg(&leg, Some(sensor));
                    position = flown.moves.last().map_or(position, |m| m.end);
                }
                Err(error) => return Err(StalledTour { flown, error }),
            }
        }

        match self.leg(position, start, None, None) {
            Ok(leg) => {
                flown.push_leg(&leg, None);
                Ok(flown)
            }
            Err(error) => Err(StalledTour { flown, error }),
        }
    }

    /// Shift the end of a sensor leg towards where the tour goes next, so the
    /// drone finishes the reading on the right side of the sensor. Skipped if
    /// the shifted point is not reachable in a straight line.
    fn nudge_towards(&self, route: WaypointRoute, sensor: Point, next: Point) -> WaypointRoute {
        if self.config.target_nudge <= 0.0 {
            return route;
        }
        let departure = match self.evader.route(sensor, next) {
            Ok(onward) => onward.points()[1],
            Err(_) => return route,
        };
        let nudged = sensor.towards(&departure, self.config.target_nudge);
        let points = route.points();
        let approach = points[points.len() - 2];

        if self.field.point_blocked(&nudged)
            || self.field.segment_blocked(&sensor, &nudged)
            || self.field.segment_blocked(&approach, &nudged)
        {
            return route;
        }
        route.with_destination(nudged)
    }
}
