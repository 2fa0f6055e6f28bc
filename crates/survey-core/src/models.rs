//! Core data models for survey flight planning.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PlanningError, ScenarioError};
use crate::geometry::{Point, Segment};
use crate::obstacles::ObstacleField;

/// A closed ring of vertices. The closing edge from the last vertex back to
/// the first is implied.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<Point>", into = "Vec<Point>")]
pub struct Polygon {
    vertices: Vec<Point>,
}

impl Polygon {
    /// Build a polygon, dropping a repeated closing vertex (GeoJSON style
    /// rings list the first point again at the end).
    pub fn new(mut vertices: Vec<Point>) -> Self {
        if vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        Self { vertices }
    }

    /// Axis-aligned rectangle from two opposite corners.
    pub fn rectangle(a: Point, b: Point) -> Self {
        let (min_lng, max_lng) = (a.lng.min(b.lng), a.lng.max(b.lng));
        let (min_lat, max_lat) = (a.lat.min(b.lat), a.lat.max(b.lat));
        Self::new(vec![
            Point::new(min_lng, min_lat),
            Point::new(max_lng, min_lat),
            Point::new(max_lng, max_lat),
            Point::new(min_lng, max_lat),
        ])
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    /// Edges in ring order, closing edge last.
    pub fn edges(&self) -> impl Iterator<Item = Segment> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| Segment::new(self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// True if `p` lies on the boundary of the polygon.
    pub fn on_boundary(&self, p: &Point) -> bool {
        self.edges().any(|edge| edge.contains(p))
    }

    /// True if `p` is strictly inside the polygon. Points on an edge are
    /// outside.
    pub fn contains_strict(&self, p: &Point) -> bool {
        let n = self.vertices.len();
        if n < 3 || self.on_boundary(p) {
            return false;
        }

        // Ray casting: count crossings of a ray towards +lng
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let vi = &self.vertices[i];
            let vj = &self.vertices[j];
            if ((vi.lat > p.lat) != (vj.lat > p.lat))
                && (p.lng < (vj.lng - vi.lng) * (p.lat - vi.lat) / (vj.lat - vi.lat) + vi.lng)
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

impl From<Vec<Point>> for Polygon {
    fn from(vertices: Vec<Point>) -> Self {
        Self::new(vertices)
    }
}

impl From<Polygon> for Vec<Point> {
    fn from(polygon: Polygon) -> Self {
        polygon.vertices
    }
}

/// Rectangular region the drone must stay strictly inside.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Confinement {
    pub north_west: Point,
    pub south_east: Point,
}

impl Confinement {
    pub fn new(north_west: Point, south_east: Point) -> Self {
        Self {
            north_west,
            south_east,
        }
    }

    pub fn contains_strict(&self, p: &Point) -> bool {
        self.north_west.lng < p.lng
            && p.lng < self.south_east.lng
            && self.south_east.lat < p.lat
            && p.lat < self.north_west.lat
    }

    pub fn is_empty(&self) -> bool {
        !(self.north_west.lng < self.south_east.lng && self.south_east.lat < self.north_west.lat)
    }
}

/// An air-quality sensor the drone must fly past.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sensor {
    pub location: Point,
    /// Battery charge in percent as reported by the sensor.
    pub battery: f32,
    /// Raw reading. Faulty sensors report sentinels such as "null" or "NaN";
    /// the planner never interprets it.
    pub reading: String,
}

impl Sensor {
    pub fn new(location: Point, battery: f32, reading: impl Into<String>) -> Self {
        Self {
            location,
            battery,
            reading: reading.into(),
        }
    }
}

/// One fixed-length drone step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Move {
    pub start: Point,
    pub end: Point,
    /// Heading in degrees, a multiple of 10 in [0, 350]. 0 = east, 90 = north.
    pub heading: i32,
    /// Index of the sensor this move brings into range, if any.
    #[serde(default)]
    pub visited_sensor: Option<usize>,
}

impl Move {
    pub fn new(start: Point, heading: i32, length: f64, visited_sensor: Option<usize>) -> Self {
        Self {
            start,
            end: start.after_move(heading, length),
            heading,
            visited_sensor,
        }
    }

    pub fn segment(&self) -> Segment {
        Segment::new(self.start, self.end)
    }
}

/// Ordered points from a source to a destination. Intermediate points are
/// detours around obstacle corners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRoute")]
pub struct WaypointRoute {
    points: Vec<Point>,
}

#[derive(Deserialize)]
struct RawRoute {
    points: Vec<Point>,
}

impl TryFrom<RawRoute> for WaypointRoute {
    type Error = PlanningError;

    fn try_from(raw: RawRoute) -> Result<Self, Self::Error> {
        Self::try_new(raw.points)
    }
}

impl WaypointRoute {
    /// Unchecked constructor for routes built by the planner. Routes with
    /// fewer than two points are rejected by the move synthesizer.
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Route from caller-supplied points; needs at least a source and a
    /// destination.
    pub fn try_new(points: Vec<Point>) -> Result<Self, PlanningError> {
        if points.len() < 2 {
            return Err(PlanningError::DegenerateRoute {
                points: points.len(),
            });
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn source(&self) -> Point {
        self.points[0]
    }

    pub fn destination(&self) -> Point {
        self.points[self.points.len() - 1]
    }

    /// Replace the destination point, keeping the detours.
    pub fn with_destination(mut self, destination: Point) -> Self {
        if let Some(last) = self.points.last_mut() {
            *last = destination;
        }
        self
    }

    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| pair[0].distance(&pair[1]))
            .sum()
    }
}

/// Moves flown for one tour leg together with the route they followed.
#[derive(Debug, Clone, PartialEq)]
pub struct Leg {
    pub route: WaypointRoute,
    pub moves: Vec<Move>,
    /// Upper bound on the number of moves the synthesizer may emit for `route`.
    pub move_bound: usize,
}

// ========== FLIGHT PLAN ==========

/// Per-leg accounting in a flight plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegSummary {
    /// Sensor index targeted by this leg, `None` for the return leg.
    pub target: Option<usize>,
    pub move_count: usize,
    pub move_bound: usize,
}

/// The complete output of a planning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightPlan {
    pub moves: Vec<Move>,
    /// Sensor indices in visiting order. The start point is implicit before
    /// the first entry and after the last.
    pub tour: Vec<usize>,
    pub legs: Vec<LegSummary>,
    pub created_at: DateTime<Utc>,
}

impl FlightPlan {
    pub fn move_count(&self) -> usize {
        self.moves.len()
    }

    /// Sensors reached by the plan, in the order they were reached.
    pub fn visited_sensors(&self) -> Vec<usize> {
        self.moves.iter().filter_map(|m| m.visited_sensor).collect()
    }

    /// True if every move starts where the previous one ended.
    pub fn is_contiguous(&self) -> bool {
        self.moves.windows(2).all(|pair| pair[0].end == pair[1].start)
    }
}

// ========== SCENARIO ==========

/// Everything a planning run consumes, as handed over by external loaders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub confinement: Confinement,
    #[serde(default)]
    pub no_fly_zones: Vec<Polygon>,
    pub sensors: Vec<Sensor>,
    pub start: Point,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = serde_json::from_str(json)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Check the assumptions the planner relies on.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.confinement.is_empty() {
            return Err(ScenarioError::EmptyConfinement {
                north_west: self.confinement.north_west,
                south_east: self.confinement.south_east,
            });
        }
        for (index, zone) in self.no_fly_zones.iter().enumerate() {
            if zone.vertices().len() < 3 {
                return Err(ScenarioError::DegeneratePolygon {
                    index,
                    vertices: zone.vertices().len(),
                });
            }
        }

        let field = ObstacleField::new(self.confinement, self.no_fly_zones.clone());
        if field.point_blocked(&self.start) {
            return Err(ScenarioError::StartBlocked(self.start));
        }
        for (index, sensor) in self.sensors.iter().enumerate() {
            if field.point_blocked(&sensor.location) {
                return Err(ScenarioError::SensorBlocked {
                    index,
                    location: sensor.location,
                });
            }
        }
        Ok(())
    }
}
