//! Planar predicates used by the classifier and the chord tests.
//!
//! Containment and segment intersection come from `geo`; this module only combines
//! them into the questions the tiler asks.

use crate::float_types::{Real, tolerance};
use geo::coordinate_position::{CoordPos, CoordinatePosition};
use geo::line_intersection::{LineIntersection, line_intersection};
use geo::{Coord, Line, LineString, Polygon};

/// Tri-state point containment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    None,
    Touching,
    Contained,
}

impl Containment {
    /// Contained or touching.
    #[inline]
    pub const fn any(self) -> bool {
        !matches!(self, Containment::None)
    }
}

pub fn containment(poly: &Polygon<Real>, p: Coord<Real>) -> Containment {
    match poly.coordinate_position(&p) {
        CoordPos::Inside => Containment::Contained,
        CoordPos::OnBoundary => Containment::Touching,
        CoordPos::Outside => Containment::None,
    }
}

/// Strict interior containment.
#[inline]
pub fn contains(poly: &Polygon<Real>, p: Coord<Real>) -> bool {
    containment(poly, p) == Containment::Contained
}

/// `true` when `p` lies strictly inside one of the holes of `poly`.
pub fn hole_contains(poly: &Polygon<Real>, p: Coord<Real>) -> bool {
    poly.interiors().iter().any(|ring| {
        let hole = Polygon::new(ring.clone(), vec![]);
        contains(&hole, p)
    })
}

#[inline]
pub fn midpoint(a: Coord<Real>, b: Coord<Real>) -> Coord<Real> {
    Coord { x: (a.x + b.x) * 0.5, y: (a.y + b.y) * 0.5 }
}

#[inline]
pub fn distance(a: Coord<Real>, b: Coord<Real>) -> Real {
    (b.x - a.x).hypot(b.y - a.y)
}

/// z component of `(a - o) x (b - o)`.
#[inline]
pub fn cross(o: Coord<Real>, a: Coord<Real>, b: Coord<Real>) -> Real {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Which side of the polyline `a -> b -> c` the point `p` falls on.
///
/// For a left turn at `b` the left side is the wedge left of both segments, for a
/// right turn it is the union of the two half planes. A straight polyline reduces
/// to the single line test.
pub fn is_left_side(p: Coord<Real>, [a, b, c]: [Coord<Real>; 3]) -> bool {
    let left_of_ab = cross(a, b, p) > 0.0;
    let left_of_bc = cross(b, c, p) > 0.0;
    let turn = cross(a, b, c);
    if turn > tolerance() {
        left_of_ab && left_of_bc
    } else if turn < -tolerance() {
        left_of_ab || left_of_bc
    } else {
        cross(a, c, p) > 0.0
    }
}

/// `true` when two segments intersect anywhere other than a shared endpoint or a
/// single touching point.
pub fn segments_cross(a: Line<Real>, b: Line<Real>) -> bool {
    match line_intersection(a, b) {
        Some(LineIntersection::SinglePoint { is_proper, .. }) => is_proper,
        Some(LineIntersection::Collinear { intersection }) => {
            distance(intersection.start, intersection.end) > tolerance()
        }
        None => false,
    }
}

fn rings(poly: &Polygon<Real>) -> impl Iterator<Item = &LineString<Real>> {
    std::iter::once(poly.exterior()).chain(poly.interiors().iter())
}

/// `true` when `line` occupies space both inside and outside `poly`.
///
/// Running along a boundary segment or touching a vertex is allowed as long as the
/// rest of the segment stays on one side.
pub fn segment_crosses_polygon(poly: &Polygon<Real>, line: Line<Real>) -> bool {
    let length = distance(line.start, line.end);
    if length <= tolerance() {
        return false;
    }

    // parameters along `line` where it meets the boundary
    let mut cuts: Vec<Real> = vec![0.0, 1.0];
    let param = |c: Coord<Real>| distance(line.start, c) / length;
    for ring in rings(poly) {
        for segment in ring.lines() {
            match line_intersection(line, segment) {
                Some(LineIntersection::SinglePoint { intersection, .. }) => {
                    cuts.push(param(intersection))
                }
                Some(LineIntersection::Collinear { intersection }) => {
                    cuts.push(param(intersection.start));
                    cuts.push(param(intersection.end));
                }
                None => {}
            }
        }
    }
    cuts.sort_by(Real::total_cmp);
    cuts.dedup_by(|a, b| (*a - *b).abs() <= tolerance());

    let mut inside = false;
    let mut outside = false;
    for pair in cuts.windows(2) {
        let t = (pair[0] + pair[1]) * 0.5;
        let p = Coord {
            x: line.start.x + (line.end.x - line.start.x) * t,
            y: line.start.y + (line.end.y - line.start.y) * t,
        };
        match containment(poly, p) {
            Containment::Contained => inside = true,
            Containment::None => outside = true,
            Containment::Touching => {}
        }
        if inside && outside {
            return true;
        }
    }
    false
}

/// `true` when `line` properly crosses any ring segment of `poly`.
pub fn segment_intersects_boundary(poly: &Polygon<Real>, line: Line<Real>) -> bool {
    rings(poly).any(|ring| ring.lines().any(|segment| segments_cross(line, segment)))
}

/// Centroid of a closed point loop, falling back to the vertex mean for zero area.
pub fn loop_centroid(points: &[Coord<Real>]) -> Coord<Real> {
    let n = points.len();
    let mut area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let f = a.x * b.y - b.x * a.y;
        area += f;
        cx += (a.x + b.x) * f;
        cy += (a.y + b.y) * f;
    }
    if area.abs() <= tolerance() {
        let sx: Real = points.iter().map(|p| p.x).sum();
        let sy: Real = points.iter().map(|p| p.y).sum();
        return Coord { x: sx / n as Real, y: sy / n as Real };
    }
    Coord { x: cx / (3.0 * area), y: cy / (3.0 * area) }
}
