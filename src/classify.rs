//! Edge classification.
//!
//! [`classify_contour_edge`] answers "what kind of edge would join these two contour
//! vertices" from the polygons alone. [`orientation_angle`] compares the direction of
//! travel around each endpoint's ring, and [`classify_with_orientation`] combines the
//! two so a valid edge whose rings run in incompatible directions is demoted.

use crate::contour::geometry::{Containment, containment, contains, hole_contains, midpoint};
use crate::contour::{ContourIndex, ContourSet};
use crate::errors::{MeshError, MeshResult};
use crate::float_types::{FRAC_PI_2, PI, Real};
use crate::mesh::{EdgeClass, EdgeKind, SliceMesh, VertexOrigin};
use geo::Coord;

/// Classify the edge `a -> b` between two contour vertices.
pub fn classify_contour_edge(
    contours: &ContourSet,
    a: ContourIndex,
    b: ContourIndex,
) -> MeshResult<EdgeKind> {
    if a == b {
        return Err(MeshError::UnclassifiableEdge { a, b });
    }
    let mid = midpoint(contours.point(a), contours.point(b));

    if a.poly != b.poly {
        return Ok(classify_between_polygons(contours, a, b, mid));
    }

    if a.are_adjacent(&b) {
        return Ok(EdgeKind::Contour);
    }

    let occluded = || {
        (0..contours.len())
            .filter(|&p| p != a.poly)
            .any(|p| contains(contours.polygon(p), mid))
    };
    let flat_or_invalid = || if occluded() { EdgeKind::Invalid } else { EdgeKind::Flat };

    match (a.is_inner(), b.is_inner()) {
        (true, false) | (false, true) => Ok(flat_or_invalid()),
        (true, true) if a.ring == b.ring => Ok(EdgeKind::Hole),
        (true, true) => Ok(flat_or_invalid()),
        (false, false) => {
            if containment(contours.polygon(a.poly), mid).any() {
                Ok(flat_or_invalid())
            } else {
                Ok(EdgeKind::Invagination)
            }
        }
    }
}

fn classify_between_polygons(
    contours: &ContourSet,
    a: ContourIndex,
    b: ContourIndex,
    mid: Coord<Real>,
) -> EdgeKind {
    let poly_a = contours.polygon(a.poly);
    let poly_b = contours.polygon(b.poly);
    let in_a = containment(poly_a, mid);
    let in_b = containment(poly_b, mid);

    if in_a == Containment::Touching && in_b == Containment::Touching {
        return EdgeKind::Contour;
    }

    match (in_a.any(), in_b.any()) {
        (true, true) => EdgeKind::Internal,
        (false, false) => {
            let occluded = (0..contours.len())
                .filter(|&p| p != a.poly && p != b.poly)
                .any(|p| contains(contours.polygon(p), mid));
            if occluded { EdgeKind::Untiled } else { EdgeKind::FlyingEdge }
        }
        (mid_in_a, mid_in_b) => {
            if a.is_inner() == b.is_inner() {
                return EdgeKind::Surface;
            }
            // one endpoint sits on a hole ring
            if hole_contains(poly_a, mid) != hole_contains(poly_b, mid) {
                EdgeKind::Surface
            } else if (mid_in_a && a.is_inner()) || (mid_in_b && b.is_inner()) {
                EdgeKind::Surface
            } else {
                EdgeKind::Invalid
            }
        }
    }
}

/// Signed angle between the ring directions at `a` and `b`, folded by half a turn
/// when exactly one of them is on a hole ring.
///
/// Each direction is the chord from the previous to the next ring neighbour, so the
/// angle is near zero when material lies on the same side of both endpoints.
pub fn orientation_angle(contours: &ContourSet, a: ContourIndex, b: ContourIndex) -> Real {
    let [prev_a, next_a] = contours.connected_points(a);
    let [prev_b, next_b] = contours.connected_points(b);
    let da = next_a - prev_a;
    let db = next_b - prev_b;
    let mut angle = (da.x * db.y - da.y * db.x).atan2(da.x * db.x + da.y * db.y);
    if a.is_inner() != b.is_inner() {
        angle += if angle < 0.0 { PI } else { -PI };
    }
    angle
}

/// `true` when the contours at `a` and `b` run within a quarter turn of each other.
pub fn orientations_match(contours: &ContourSet, a: ContourIndex, b: ContourIndex) -> bool {
    orientation_angle(contours, a, b).abs() < FRAC_PI_2
}

/// Classify and then apply the orientation check to valid, non-contour results.
pub fn classify_with_orientation(
    contours: &ContourSet,
    a: ContourIndex,
    b: ContourIndex,
) -> MeshResult<EdgeClass> {
    let kind = classify_contour_edge(contours, a, b)?;
    let flipped =
        kind.is_valid() && kind != EdgeKind::Contour && !orientations_match(contours, a, b);
    Ok(EdgeClass::with_flipped(kind, flipped))
}

/// Classify an edge between two mesh vertices of any origin.
///
/// Identical XY positions are `Corresponding`; skeleton endpoints get the medial-axis
/// kinds; everything else goes through [`classify_with_orientation`].
pub fn classify_mesh_edge(mesh: &SliceMesh, a: usize, b: usize) -> MeshResult<EdgeClass> {
    let (va, vb) = (mesh.vertex(a), mesh.vertex(b));
    match (va.origin, vb.origin) {
        (VertexOrigin::MedialAxis(_), VertexOrigin::MedialAxis(_)) => {
            Ok(EdgeKind::MedialAxis.into())
        }
        (VertexOrigin::MedialAxis(_), _) | (_, VertexOrigin::MedialAxis(_)) => {
            Ok(EdgeKind::ContourToMedialAxis.into())
        }
        (VertexOrigin::Contour(ia), VertexOrigin::Contour(ib)) => {
            if va.xy() == vb.xy() && va.position.z != vb.position.z {
                Ok(EdgeKind::Corresponding.into())
            } else {
                classify_with_orientation(mesh.contours(), ia, ib)
            }
        }
    }
}
