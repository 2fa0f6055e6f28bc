//! Shortest obstacle-avoiding routes between points of interest.
//!
//! The visibility graph is built over the corners of the no-fly zones, pushed
//! slightly outward so that routes never run exactly along a zone's edge.
//! Routes are found with Dijkstra over that graph plus the two query points.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;

use crate::error::{PlanningError, PlanningResult};
use crate::geometry::{orientation, Point};
use crate::models::{Polygon, WaypointRoute};
use crate::obstacles::ObstacleField;

#[derive(Debug, Clone, Copy)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct OpenNode {
    dist: FloatOrd,
    node: usize,
}

/// Builds waypoint routes that go around no-fly zones.
#[derive(Debug)]
pub struct ObstacleEvader {
    field: Arc<ObstacleField>,
    corners: Vec<Point>,
    /// Visible neighbours of every corner with the edge length.
    corner_edges: Vec<Vec<(usize, f64)>>,
}

impl ObstacleEvader {
    /// Build the corner visibility graph.
    ///
    /// # Arguments
    /// * `field` - Obstacles and confinement to route around
    /// * `clearance` - Distance each usable corner is pushed away from its zone
    pub fn new(field: Arc<ObstacleField>, clearance: f64) -> Self {
        let corners: Vec<Point> = field
            .zones()
            .iter()
            .flat_map(|zone| expanded_corners(zone, clearance))
            .filter(|corner| !field.point_blocked(corner))
            .collect();

        let mut corner_edges = vec![Vec::new(); corners.len()];
        for i in 0..corners.len() {
            for j in (i + 1)..corners.len() {
                if !field.segment_blocked(&corners[i], &corners[j]) {
                    let length = corners[i].distance(&corners[j]);
                    corner_edges[i].push((j, length));
                    corner_edges[j].push((i, length));
                }
            }
        }

        tracing::debug!(
            "Visibility graph built: {} corners, {} edges",
            corners.len(),
            corner_edges.iter().map(Vec::len).sum::<usize>() / 2
        );

        Self {
            field,
            corners,
            corner_edges,
        }
    }

    pub fn field(&self) -> &ObstacleField {
        &self.field
    }

    /// Detour points available to routes.
    pub fn corners(&self) -> &[Point] {
        &self.corners
    }

    /// Shortest route from `from` to `to` that never crosses a no-fly zone.
    ///
    /// The returned route starts with `from` and ends with `to`; every
    /// consecutive pair is an unobstructed straight line.
    pub fn route(&self, from: Point, to: Point) -> PlanningResult<WaypointRoute> {
        if !self.field.segment_blocked(&from, &to) {
            return Ok(WaypointRoute::new(vec![from, to]));
        }

        // Node layout: corners first, then source, then destination.
        let n = self.corners.len();
        let source = n;
        let target = n + 1;

        let from_edges: Vec<(usize, f64)> = self.visible_corners(&from).collect();
        let mut to_edges = vec![None; n];
        for (corner, length) in self.visible_corners(&to) {
            to_edges[corner] = Some(length);
        }

        let mut dist = vec![f64::INFINITY; n + 2];
        let mut came_from: Vec<Option<usize>> = vec![None; n + 2];
        let mut open_set: BinaryHeap<Reverse<OpenNode>> = BinaryHeap::new();
        dist[source] = 0.0;
        open_set.push(Reverse(OpenNode {
            dist: FloatOrd(0.0),
            node: source,
        }));

        while let Some(Reverse(current)) = open_set.pop() {
            if current.dist.0 > dist[current.node] {
                continue;
            }
            if current.node == target {
                break;
            }

            let neighbours: Vec<(usize, f64)> = if current.node == source {
                from_edges.clone()
            } else {
                let mut edges = self.corner_edges[current.node].clone();
                if let Some(length) = to_edges[current.node] {
                    edges.push((target, length));
                }
                edges
            };

            for (next, length) in neighbours {
                let tentative = current.dist.0 + length;
                if tentative < dist[next] {
                    dist[next] = tentative;
                    came_from[next] = Some(current.node);
                    open_set.push(Reverse(OpenNode {
                        dist: FloatOrd(tentative),
                        node: next,
                    }));
                }
            }
        }

        if !dist[target].is_finite() {
            return Err(PlanningError::RouteNotFound { from, to });
        }

        let mut points = vec![to];
        let mut current = came_from[target];
        while let Some(node) = current {
            if node == source {
                break;
            }
            points.push(self.corners[node]);
            current = came_from[node];
        }
        points.push(from);
        points.reverse();

        Ok(WaypointRoute::new(points))
    }

    /// Length of the shortest route between two points.
    pub fn route_length(&self, from: Point, to: Point) -> PlanningResult<f64> {
        self.route(from, to).map(|route| route.length())
    }

    fn visible_corners<'a>(&'a self, p: &'a Point) -> impl Iterator<Item = (usize, f64)> + 'a {
        self.corners
            .iter()
            .enumerate()
            .filter(move |(_, corner)| !self.field.segment_blocked(p, corner))
            .map(move |(idx, corner)| (idx, p.distance(corner)))
    }
}

/// Convex corners of a zone pushed outward along the corner bisector.
///
/// Straight-through vertices are skipped. Reflex corners would be pushed into
/// the zone; they are filtered out later by the blocked-point check.
fn expanded_corners(zone: &Polygon, clearance: f64) -> Vec<Point> {
    let vertices = zone.vertices();
    let n = vertices.len();
    let mut corners = Vec::with_capacity(n);
    for i in 0..n {
        let prev = vertices[(i + n - 1) % n];
        let vertex = vertices[i];
        let next = vertices[(i + 1) % n];
        if orientation(&prev, &vertex, &next) == 0 {
            continue;
        }

        let (ax, ay) = unit(&prev, &vertex);
        let (bx, by) = unit(&next, &vertex);
        let (dx, dy) = (ax + bx, ay + by);
        let norm = dx.hypot(dy);
        if norm <= f64::EPSILON {
            continue;
        }
        corners.push(Point::new(
            vertex.lng + dx / norm * clearance,
            vertex.lat + dy / norm * clearance,
        ));
    }
    corners
}

fn unit(from: &Point, to: &Point) -> (f64, f64) {
    let length = from.distance(to);
    ((to.lng - from.lng) / length, (to.lat - from.lat) / length)
}
