//! Ordering sensors into a visiting sequence.
//!
//! Costs between stops are the lengths of obstacle-avoiding routes, not
//! straight-line distances. Tour construction is heuristic and sits behind
//! [`TourStrategy`] so it can be swapped without touching routing or move
//! synthesis.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::PlanningResult;
use crate::evader::ObstacleEvader;
use crate::geometry::Point;

/// Improvements smaller than this are treated as noise.
const IMPROVEMENT_EPS: f64 = 1e-12;

/// Pairwise route lengths. Node 0 is the start point, node `i + 1` is
/// sensor `i`.
#[derive(Debug, Clone)]
pub struct CostMatrix {
    costs: Vec<Vec<f64>>,
}

impl CostMatrix {
    /// Route lengths between the start and every sensor, through the evader.
    pub fn build(evader: &ObstacleEvader, start: Point, sensors: &[Point]) -> PlanningResult<Self> {
        let nodes: Vec<Point> = std::iter::once(start).chain(sensors.iter().copied()).collect();
        let n = nodes.len();
        let mut costs = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let length = evader.route_length(nodes[i], nodes[j])?;
                costs[i][j] = length;
                costs[j][i] = length;
            }
        }
        Ok(Self { costs })
    }

    /// Wrap a precomputed square matrix.
    pub fn from_rows(costs: Vec<Vec<f64>>) -> Self {
        debug_assert!(costs.iter().all(|row| row.len() == costs.len()));
        Self { costs }
    }

    pub fn sensor_count(&self) -> usize {
        self.costs.len().saturating_sub(1)
    }

    pub fn cost(&self, from: usize, to: usize) -> f64 {
        self.costs[from][to]
    }

    /// Length of the closed tour start → sensors in `order` → start.
    pub fn tour_cost(&self, order: &[usize]) -> f64 {
        let mut total = 0.0;
        let mut current = 0;
        for &sensor in order {
            total += self.cost(current, sensor + 1);
            current = sensor + 1;
        }
        total + self.cost(current, 0)
    }
}

/// A visiting order of sensor indices with its route cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Tour {
    pub order: Vec<usize>,
    pub cost: f64,
}

impl Tour {
    pub fn new(order: Vec<usize>, costs: &CostMatrix) -> Self {
        let cost = costs.tour_cost(&order);
        Self { order, cost }
    }
}

/// Pluggable tour construction.
pub trait TourStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Candidate tours, most promising first. Never empty.
    fn candidates(&self, costs: &CostMatrix) -> Vec<Tour>;
}

/// Always fly to the closest sensor not yet visited. Ties go to the sensor
/// listed first.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestNeighbourTour;

impl TourStrategy for NearestNeighbourTour {
    fn name(&self) -> &'static str {
        "nearest-neighbour"
    }

    fn candidates(&self, costs: &CostMatrix) -> Vec<Tour> {
        vec![Tour::new(nearest_neighbour(costs), costs)]
    }
}

/// Nearest-neighbour followed by 2-opt, plus seeded random restarts that are
/// also improved with 2-opt. Returns up to `keep` distinct tours ordered by
/// cost.
#[derive(Debug, Clone, Copy)]
pub struct RestartTour {
    pub seed: u64,
    pub restarts: usize,
    pub keep: usize,
}

impl RestartTour {
    pub fn new(seed: u64, restarts: usize, keep: usize) -> Self {
        Self {
            seed,
            restarts,
            keep,
        }
    }
}

impl TourStrategy for RestartTour {
    fn name(&self) -> &'static str {
        "restart-2opt"
    }

    fn candidates(&self, costs: &CostMatrix) -> Vec<Tour> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut tours = vec![two_opt(nearest_neighbour(costs), costs)];

        let mut order: Vec<usize> = (0..costs.sensor_count()).collect();
        for _ in 0..self.restarts {
            order.shuffle(&mut rng);
            let improved = two_opt(order.clone(), costs);
            if !tours.iter().any(|tour| tour.order == improved.order) {
                tours.push(improved);
            }
        }

        // Stable, so the nearest-neighbour tour wins ties
        tours.sort_by(|a, b| a.cost.total_cmp(&b.cost));
        tours.truncate(self.keep.max(1));
        tours
    }
}

/// Greedy nearest-unvisited ordering from the start point.
pub fn nearest_neighbour(costs: &CostMatrix) -> Vec<usize> {
    let n = costs.sensor_count();
    let mut visited = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut current = 0;

    for _ in 0..n {
        let mut best: Option<(usize, f64)> = None;
        for sensor in (0..n).filter(|&s| !visited[s]) {
            let cost = costs.cost(current, sensor + 1);
            if best.map_or(true, |(_, best_cost)| cost < best_cost) {
                best = Some((sensor, cost));
            }
        }
        let Some((sensor, _)) = best else {
            break;
        };
        visited[sensor] = true;
        order.push(sensor);
        current = sensor + 1;
    }
    order
}

/// Repeatedly reverse sub-sequences of the tour while that shortens it.
pub fn two_opt(mut order: Vec<usize>, costs: &CostMatrix) -> Tour {
    let mut best_cost = costs.tour_cost(&order);
    let n = order.len();
    let mut improved = true;

    while improved {
        improved = false;
        for i in 0..n {
            for j in (i + 1)..n {
                order[i..=j].reverse();
                let cost = costs.tour_cost(&order);
                if cost + IMPROVEMENT_EPS < best_cost {
                    best_cost = cost;
                    improved = true;
                } else {
                    order[i..=j].reverse();
                }
            }
        }
    }

    Tour {
        order,
        cost: best_cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Confinement, Polygon};
    use crate::obstacles::ObstacleField;
    use std::sync::Arc;

    /// Start at the origin, sensors on a line at x = 1, 2, 3 listed out of order.
    fn line_costs() -> CostMatrix {
        let xs: [f64; 4] = [0.0, 3.0, 1.0, 2.0];
        let rows: Vec<Vec<f64>> = xs
            .iter()
            .map(|a| xs.iter().map(|b| (a - b).abs()).collect::<Vec<f64>>())
            .collect();
        CostMatrix::from_rows(rows)
    }

    #[test]
    fn nearest_neighbour_follows_closest_sensor() {
        assert_eq!(nearest_neighbour(&line_costs()), vec![1, 2, 0]);
    }

    #[test]
    fn nearest_neighbour_breaks_ties_by_input_order() {
        // Two sensors at the same distance from the start
        let costs = CostMatrix::from_rows(vec![
            vec![0.0, 1.0, 1.0],
            vec![1.0, 0.0, 2.0],
            vec![1.0, 2.0, 0.0],
        ]);
        assert_eq!(nearest_neighbour(&costs), vec![0, 1]);
    }

    #[test]
    fn tour_cost_closes_the_loop() {
        let costs = line_costs();
        assert!((costs.tour_cost(&[1, 2, 0]) - 6.0).abs() < 1e-12);
        assert!((costs.tour_cost(&[]) - 0.0).abs() < 1e-12);
    }

    #[test]
    fn two_opt_never_worsens() {
        // Square corners visited in a crossing order
        let pts: [(f64, f64); 5] = [(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0), (0.0, 2.0)];
        let rows: Vec<Vec<f64>> = pts
            .iter()
            .map(|a| {
                pts.iter()
                    .map(|b| (a.0 - b.0).hypot(a.1 - b.1))
                    .collect::<Vec<f64>>()
            })
            .collect();
        let costs = CostMatrix::from_rows(rows);

        let crossing = vec![0, 1, 2, 3];
        let before = costs.tour_cost(&crossing);
        let improved = two_opt(crossing, &costs);
        assert!(improved.cost < before);
        assert!((improved.cost - costs.tour_cost(&improved.order)).abs() < 1e-12);

        let mut sorted = improved.order.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2, 3]);
    }

    #[test]
    fn restarts_are_deterministic_for_a_seed() {
        let costs = line_costs();
        let strategy = RestartTour::new(42, 8, 3);
        let first = strategy.candidates(&costs);
        let second = strategy.candidates(&costs);
        assert_eq!(first, second);
        assert!(!first.is_empty() && first.len() <= 3);
        assert!(first.windows(2).all(|pair| pair[0].cost <= pair[1].cost));
    }

    #[test]
    fn restart_candidates_are_permutations() {
        let costs = line_costs();
        for tour in RestartTour::new(7, 10, 10).candidates(&costs) {
            let mut sorted = tour.order.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, vec![0, 1, 2]);
        }
    }

    #[test]
    fn cost_matrix_uses_route_lengths() {
        let field = ObstacleField::new(
            Confinement::new(Point::new(0.0, 10.0), Point::new(10.0, 0.0)),
            vec![Polygon::rectangle(Point::new(4.0, 1.0), Point::new(6.0, 9.0))],
        );
        let evader = ObstacleEvader::new(Arc::new(field), 0.01);
        let start = Point::new(2.0, 5.0);
        let sensors = [Point::new(8.0, 5.0), Point::new(2.0, 7.0)];

        let costs = CostMatrix::build(&evader, start, &sensors).unwrap();
        assert_eq!(costs.sensor_count(), 2);
        // Behind the wall: longer than the straight line
        assert!(costs.cost(0, 1) > 6.0);
        // In the open: exactly the straight line
        assert!((costs.cost(0, 2) - 2.0).abs() < 1e-12);
        assert_eq!(costs.cost(1, 0), costs.cost(0, 1));
    }
}
