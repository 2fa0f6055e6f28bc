//! Turning waypoint routes into fixed-length, fixed-heading drone moves.
//!
//! The search is a depth-first backtracking over headings. At every step the
//! drone first tries the heading that points straight at its current
//! waypoint (rounded to 10 degrees) and then fans out to either side. As soon
//! as the drone can see past a corner waypoint it skips ahead to the next
//! one. Each waypoint gets a move budget so that a branch which is going in
//! circles is abandoned instead of searched forever.
//!
//! The search state lives on an explicit stack rather than the call stack,
//! one immutable [`Frame`] per move taken.

use std::sync::Arc;

use crate::config::PlannerConfig;
use crate::error::{PlanningError, PlanningResult};
use crate::geometry::{normalize_heading, rounded_heading, Point};
use crate::models::{Move, WaypointRoute};
use crate::obstacles::ObstacleField;

/// Deviations from the direct heading, smallest first, alternating sides.
/// Covers all 36 headings exactly once.
const HEADING_OFFSETS: [i32; 36] = [
    0, 10, -10, 20, -20, 30, -30, 40, -40, 50, -50, 60, -60, 70, -70, 80, -80, 90, -90, 100,
    -100, 110, -110, 120, -120, 130, -130, 140, -140, 150, -150, 160, -160, 170, -170, 180,
];

/// What ends a leg.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LegTarget {
    /// Reach `sensor_range` of the sensor's true location.
    Sensor { index: usize, location: Point },
    /// Reach `end_range` of the route's final point.
    End,
}

impl LegTarget {
    fn sensor_index(&self) -> Option<usize> {
        match self {
            LegTarget::Sensor { index, .. } => Some(*index),
            LegTarget::End => None,
        }
    }
}

/// One step of the search: where the drone is, which waypoint it is heading
/// for, how many moves it may still spend on that waypoint, and which heading
/// to try next.
#[derive(Debug, Clone, Copy)]
struct Frame {
    position: Point,
    waypoint: usize,
    budget: usize,
    next_offset: usize,
}

/// Synthesizes collision-free move sequences along waypoint routes.
#[derive(Debug, Clone)]
pub struct MoveSynthesizer {
    field: Arc<ObstacleField>,
    move_length: f64,
    sensor_range: f64,
    end_range: f64,
    budget_margin: usize,
}

impl MoveSynthesizer {
    pub fn new(field: Arc<ObstacleField>, config: &PlannerConfig) -> Self {
        Self {
            field,
            move_length: config.move_length,
            sensor_range: config.sensor_range,
            end_range: config.end_range,
            budget_margin: config.budget_margin,
        }
    }

    pub fn move_length(&self) -> f64 {
        self.move_length
    }

    /// Find moves from the route's source to within range of `target`,
    /// following the route's waypoints. Moves are returned in travel order.
    pub fn navigate(&self, route: &WaypointRoute, target: LegTarget) -> PlanningResult<Vec<Move>> {
        let points = route.points();
        if points.len() < 2 {
            return Err(PlanningError::DegenerateRoute {
                points: points.len(),
            });
        }
        let last = points.len() - 1;
        let destination = route.destination();

        let mut budget_exhausted = false;
        let mut stack: Vec<Frame> = Vec::new();
        // moves[i] leads from stack[i] to stack[i + 1]
        let mut moves: Vec<Move> = Vec::new();

        let root_budget = self.budget(points, 1);
        if root_budget == 0 {
            return Err(PlanningError::MoveSynthesisTimeout {
                start: route.source(),
                target: destination,
            });
        }
        stack.push(Frame {
            position: route.source(),
            waypoint: 1,
            budget: root_budget,
            next_offset: 0,
        });

        while let Some(frame) = stack.last_mut() {
            let Some(offset) = HEADING_OFFSETS.get(frame.next_offset).copied() else {
                // Every heading from here failed; undo the move that led here.
                stack.pop();
                moves.pop();
                continue;
            };
            frame.next_offset += 1;
            let Frame {
                position,
                waypoint,
                budget,
                ..
            } = *frame;

            let direct = rounded_heading(position.angle_to(&points[waypoint]));
            let heading = normalize_heading(direct + offset);
            let step = Move::new(position, heading, self.move_length, None);

            if self.field.segment_blocked(&step.start, &step.end) {
                continue;
            }

            // Heading for a corner: skip ahead once the next waypoint is in sight.
            if waypoint < last && !self.field.segment_blocked(&step.end, &points[waypoint + 1]) {
                let next_budget = self.budget(points, waypoint + 1);
                if next_budget == 0 {
                    budget_exhausted = true;
                    continue;
                }
                stack.push(Frame {
                    position: step.end,
                    waypoint: waypoint + 1,
                    budget: next_budget,
                    next_offset: 0,
                });
                moves.push(step);
                continue;
            }

            if self.reached(&step.end, &destination, &target) {
                moves.push(Move {
                    visited_sensor: target.sensor_index(),
                    ..step
                });
                tracing::trace!("Leg to {} solved in {} moves", destination, moves.len());
                return Ok(moves);
            }

            if budget <= 1 {
                budget_exhausted = true;
                continue;
            }
            stack.push(Frame {
                position: step.end,
                waypoint,
                budget: budget - 1,
                next_offset: 0,
            });
            moves.push(step);
        }

        if budget_exhausted {
            Err(PlanningError::MoveSynthesisTimeout {
                start: route.source(),
                target: destination,
            })
        } else {
            Err(PlanningError::NoPathFound {
                start: route.source(),
                target: destination,
            })
        }
    }

    /// Upper bound on the number of moves [`navigate`](Self::navigate) can
    /// return for `route`: the sum of all per-waypoint budgets.
    pub fn move_bound(&self, route: &WaypointRoute) -> usize {
        let points = route.points();
        (1..points.len()).map(|k| self.budget(points, k)).sum()
    }

    /// Moves allowed while heading for waypoint `k`:
    /// ceil(distance from waypoint k-1 / move length) + margin.
    fn budget(&self, points: &[Point], k: usize) -> usize {
        let distance = points[k - 1].distance(&points[k]);
        (distance / self.move_length).ceil() as usize + self.budget_margin
    }

    fn reached(&self, position: &Point, destination: &Point, target: &LegTarget) -> bool {
        match target {
            // The destination may have been nudged off the sensor; range is
            // always judged against the sensor itself.
            LegTarget::Sensor { location, .. } => position.distance(location) < self.sensor_range,
            LegTarget::End => position.distance(destination) < self.end_range,
        }
    }
}
