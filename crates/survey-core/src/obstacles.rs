//! Collision testing against no-fly zones and the confinement area.
//!
//! Every legality check in the planner goes through [`ObstacleField`].

use crate::geometry::{Point, Segment};
use crate::models::{Confinement, Polygon};

/// The static environment of a planning run.
#[derive(Debug, Clone)]
pub struct ObstacleField {
    confinement: Confinement,
    zones: Vec<Polygon>,
}

impl ObstacleField {
    pub fn new(confinement: Confinement, zones: Vec<Polygon>) -> Self {
        Self { confinement, zones }
    }

    pub fn confinement(&self) -> &Confinement {
        &self.confinement
    }

    pub fn zones(&self) -> &[Polygon] {
        &self.zones
    }

    /// Every vertex of every no-fly zone, zone by zone.
    pub fn outline_points(&self) -> Vec<Point> {
        self.zones
            .iter()
            .flat_map(|zone| zone.vertices().iter().copied())
            .collect()
    }

    /// True if the drone may not be at `p`: outside the confinement area or
    /// strictly inside a no-fly zone. Points on a zone's edge are allowed.
    pub fn point_blocked(&self, p: &Point) -> bool {
        !self.confinement.contains_strict(p)
            || self.zones.iter().any(|zone| zone.contains_strict(p))
    }

    /// True if the drone may not fly the straight line from `a` to `b`.
    ///
    /// The confinement area is convex, so the segment stays inside it exactly
    /// when both endpoints do. Against a no-fly zone the segment is blocked if
    /// it properly crosses an edge or if any stretch of it runs through the
    /// interior. Touching an edge or grazing a vertex is allowed.
    pub fn segment_blocked(&self, a: &Point, b: &Point) -> bool {
        if !self.confinement.contains_strict(a) || !self.confinement.contains_strict(b) {
            return true;
        }
        let segment = Segment::new(*a, *b);
        self.zones.iter().any(|zone| segment_enters(zone, &segment))
    }
}

fn segment_enters(zone: &Polygon, segment: &Segment) -> bool {
    if zone.edges().any(|edge| segment.crosses(&edge)) {
        return true;
    }

    // No proper crossing, so the segment can only pass through the interior
    // between points where it touches the boundary (e.g. entering at one
    // vertex and leaving at another). Test the middle of every such stretch.
    let mut cuts = vec![0.0, 1.0];
    for vertex in zone.vertices() {
        if segment.contains(vertex) {
            cuts.push(segment.param_of(vertex));
        }
    }
    cuts.sort_by(f64::total_cmp);
    cuts.dedup();

    cuts.windows(2)
        .any(|pair| zone.contains_strict(&segment.lerp((pair[0] + pair[1]) / 2.0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Confinement (0,0)-(10,10) with a square zone (4,4)-(6,6) and a
    /// triangle with its apex at (8,3).
    fn field() -> ObstacleField {
        ObstacleField::new(
            Confinement::new(Point::new(0.0, 10.0), Point::new(10.0, 0.0)),
            vec![
                Polygon::rectangle(Point::new(4.0, 4.0), Point::new(6.0, 6.0)),
                Polygon::new(vec![
                    Point::new(7.0, 1.0),
                    Point::new(9.0, 1.0),
                    Point::new(8.0, 3.0),
                ]),
            ],
        )
    }

    #[test]
    fn outline_has_every_vertex() {
        assert_eq!(field().outline_points().len(), 7);
    }

    #[test]
    fn line_along_zone_edge_does_not_collide() {
        let field = field();
        let points = field.outline_points();
        assert!(!field.segment_blocked(&points[0], &points[1]));
    }

    #[test]
    fn line_in_open_space_does_not_collide() {
        assert!(!field().segment_blocked(&Point::new(1.0, 9.0), &Point::new(9.0, 9.0)));
    }

    #[test]
    fn line_leaving_confinement_collides() {
        let field = field();
        assert!(field.segment_blocked(&Point::new(9.0, 9.0), &Point::new(10.5, 9.0)));
        // By a hair
        assert!(field.segment_blocked(&Point::new(9.0, 9.0), &Point::new(10.000_001, 9.0)));
    }

    #[test]
    fn line_through_zone_collides() {
        assert!(field().segment_blocked(&Point::new(3.0, 5.0), &Point::new(7.0, 5.0)));
    }

    #[test]
    fn line_through_opposite_corners_collides() {
        // Enters at vertex (4,4) and leaves at (6,6) without a proper crossing
        assert!(field().segment_blocked(&Point::new(3.0, 3.0), &Point::new(7.0, 7.0)));
    }

    #[test]
    fn line_ending_inside_zone_collides() {
        assert!(field().segment_blocked(&Point::new(3.0, 5.0), &Point::new(5.0, 5.0)));
    }

    #[test]
    fn line_grazing_vertex_does_not_collide() {
        // Touches the triangle's apex (8,3) and continues outside
        let field = field();
        assert!(!field.segment_blocked(&Point::new(7.0, 3.0), &Point::new(9.0, 3.0)));
        // Collinear with the square's bottom edge, running past both corners
        assert!(!field.segment_blocked(&Point::new(3.0, 4.0), &Point::new(7.0, 4.0)));
    }

    #[test]
    fn line_ending_on_zone_edge_does_not_collide() {
        assert!(!field().segment_blocked(&Point::new(3.0, 5.0), &Point::new(4.0, 5.0)));
    }

    #[test]
    fn point_collisions() {
        let field = field();
        assert!(!field.point_blocked(&Point::new(1.0, 1.0)));
        assert!(field.point_blocked(&Point::new(5.0, 5.0)));
        assert!(field.point_blocked(&Point::new(-1.0, 5.0)));
        assert!(field.point_blocked(&Point::new(0.0, 5.0)), "confinement edge is outside");
        assert!(!field.point_blocked(&Point::new(4.0, 5.0)), "zone edge is allowed");
    }
}
