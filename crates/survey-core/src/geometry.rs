//! Planar geometry for flight planning.
//!
//! Coordinates are treated as a flat (lng, lat) plane. The survey area is a
//! few hundred meters across, so no spherical correction is applied and all
//! lengths are expressed in degrees.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Relative tolerance for collinearity checks (sine of the angle between the
/// two vectors being compared).
const COLLINEAR_EPS: f64 = 1e-12;

/// A location on the survey plane.
///
/// Equality and hashing compare the raw bit patterns of both coordinates, so a
/// `Point` can be used as a map key and two points are equal only if they are
/// exactly the same location.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Point {
    pub lng: f64,
    pub lat: f64,
}

impl Point {
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f64 {
        (other.lng - self.lng).hypot(other.lat - self.lat)
    }

    /// Angle from this point to another in radians, in (-π, π].
    /// 0 = east, π/2 = north.
    pub fn angle_to(&self, other: &Point) -> f64 {
        (other.lat - self.lat).atan2(other.lng - self.lng)
    }

    /// Position after travelling `length` along `heading_deg` (0 = east,
    /// 90 = north).
    pub fn after_move(&self, heading_deg: i32, length: f64) -> Point {
        let rad = f64::from(heading_deg).to_radians();
        Point::new(
            self.lng + length * rad.cos(),
            self.lat + length * rad.sin(),
        )
    }

    /// Point `length` away from this one in the direction of `target`.
    /// Returns `self` when the two points coincide.
    pub fn towards(&self, target: &Point, length: f64) -> Point {
        let dist = self.distance(target);
        if dist <= f64::EPSILON {
            return *self;
        }
        let scale = length / dist;
        Point::new(
            self.lng + (target.lng - self.lng) * scale,
            self.lat + (target.lat - self.lat) * scale,
        )
    }

    fn sub(&self, other: &Point) -> (f64, f64) {
        (self.lng - other.lng, self.lat - other.lat)
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.lng.to_bits() == other.lng.to_bits() && self.lat.to_bits() == other.lat.to_bits()
    }
}

impl Eq for Point {}

impl Hash for Point {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lng.to_bits().hash(state);
        self.lat.to_bits().hash(state);
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lng, self.lat)
    }
}

/// A straight line between two points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        self.start.distance(&self.end)
    }

    /// Point at parameter `t` along the segment (0 = start, 1 = end).
    pub fn lerp(&self, t: f64) -> Point {
        Point::new(
            self.start.lng + t * (self.end.lng - self.start.lng),
            self.start.lat + t * (self.end.lat - self.start.lat),
        )
    }

    /// Parameter of a point known to lie on the segment's line.
    pub fn param_of(&self, p: &Point) -> f64 {
        let (dx, dy) = self.end.sub(&self.start);
        let len_sq = dx * dx + dy * dy;
        if len_sq <= 0.0 {
            return 0.0;
        }
        let (px, py) = p.sub(&self.start);
        (px * dx + py * dy) / len_sq
    }

    /// True if the two segments cross at a single point interior to both.
    ///
    /// Touching at an endpoint, grazing a vertex and collinear overlap are not
    /// crossings.
    pub fn crosses(&self, other: &Segment) -> bool {
        let o1 = orientation(&self.start, &self.end, &other.start);
        let o2 = orientation(&self.start, &self.end, &other.end);
        let o3 = orientation(&other.start, &other.end, &self.start);
        let o4 = orientation(&other.start, &other.end, &self.end);

        o1 * o2 < 0 && o3 * o4 < 0
    }

    /// True if `p` lies on the segment, endpoints included.
    pub fn contains(&self, p: &Point) -> bool {
        if orientation(&self.start, &self.end, p) != 0 {
            return false;
        }
        within(self.start.lng, self.end.lng, p.lng) && within(self.start.lat, self.end.lat, p.lat)
    }

    /// Intersection point of two properly crossing segments.
    pub fn intersection(&self, other: &Segment) -> Option<Point> {
        let (rx, ry) = self.end.sub(&self.start);
        let (sx, sy) = other.end.sub(&other.start);
        let denom = rx * sy - ry * sx;
        if denom.abs() <= f64::MIN_POSITIVE {
            return None;
        }
        let (qx, qy) = other.start.sub(&self.start);
        let t = (qx * sy - qy * sx) / denom;
        Some(self.lerp(t))
    }
}

/// Sign of the turn p → q → r: 1 counter-clockwise, -1 clockwise, 0 collinear.
pub fn orientation(p: &Point, q: &Point, r: &Point) -> i8 {
    let (ax, ay) = q.sub(p);
    let (bx, by) = r.sub(p);
    let cross = ax * by - ay * bx;
    let scale = ax.hypot(ay) * bx.hypot(by);
    if cross.abs() <= COLLINEAR_EPS * scale {
        0
    } else if cross > 0.0 {
        1
    } else {
        -1
    }
}

fn within(a: f64, b: f64, value: f64) -> bool {
    value >= a.min(b) && value <= a.max(b)
}

/// Round an angle in radians to the nearest multiple of 10 degrees, in [0, 350].
pub fn rounded_heading(angle_rad: f64) -> i32 {
    let degrees = (angle_rad.to_degrees() / 10.0).round() as i32 * 10;
    normalize_heading(degrees)
}

/// Rotate a heading in degrees into [0, 360).
pub fn normalize_heading(degrees: i32) -> i32 {
    degrees.rem_euclid(360)
}
