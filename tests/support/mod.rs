//! Test support library
//! Provides polygon fixtures and mesh inspection helpers for tests.
#![allow(dead_code)]

use contour_tiler::{
    ContourIndex, ContourSet, SliceMesh,
    float_types::Real,
    mesh::{EdgeKind, MeshEdge},
};
use geo::{Coord, LineString, Polygon, polygon};

/// Axis-aligned square with its lower left corner at `(x, y)`.
pub fn square(x: Real, y: Real, size: Real) -> Polygon<Real> {
    rectangle(x, y, size, size)
}

pub fn rectangle(x: Real, y: Real, width: Real, height: Real) -> Polygon<Real> {
    polygon![
        (x: x, y: y),
        (x: x + width, y: y),
        (x: x + width, y: y + height),
        (x: x, y: y + height),
    ]
}

/// A square with a square hole.
pub fn annulus(outer: (Real, Real, Real), hole: (Real, Real, Real)) -> Polygon<Real> {
    let (x, y, size) = hole;
    let hole_ring = LineString::from(vec![
        (x, y),
        (x + size, y),
        (x + size, y + size),
        (x, y + size),
        (x, y),
    ]);
    let outer = square(outer.0, outer.1, outer.2);
    Polygon::new(outer.exterior().clone(), vec![hole_ring])
}

/// Contour set with `lower` at z = 0 and `upper` at z = `height`.
pub fn two_levels(lower: Vec<Polygon<Real>>, upper: Vec<Polygon<Real>>, height: Real) -> ContourSet {
    let entries = lower
        .into_iter()
        .map(|p| (p, 0.0, false))
        .chain(upper.into_iter().map(|p| (p, height, true)));
    ContourSet::new(entries).expect("valid contour set")
}

/// Contour index of the vertex of `poly` at `at`.
pub fn index_at(contours: &ContourSet, poly: usize, at: (Real, Real)) -> ContourIndex {
    let target = Coord { x: at.0, y: at.1 };
    contours
        .polygon_indices(poly)
        .find(|&i| contours.point(i) == target)
        .expect("vertex present")
}

/// Edges joining contour vertices of different levels, excluding corresponding pairs.
pub fn chord_edges(mesh: &SliceMesh) -> Vec<&MeshEdge> {
    mesh.edges()
        .filter(|e| e.class.kind != EdgeKind::Corresponding)
        .filter(|e| match (mesh.vertex_is_upper(e.key.a), mesh.vertex_is_upper(e.key.b)) {
            (Some(a), Some(b)) => a != b,
            _ => false,
        })
        .collect()
}

/// Quick helper to compare floating-point results with an acceptable tolerance.
pub fn approx_eq(a: Real, b: Real, eps: Real) -> bool {
    (a - b).abs() < eps
}

/// Every edge carries at most two faces and every face edge has a surface kind.
pub fn assert_mesh_integrity(mesh: &SliceMesh) {
    for edge in mesh.edges() {
        assert!(
            edge.faces().len() <= 2,
            "edge {:?} ({:?}) has faces {:?}",
            edge.key,
            edge.class,
            edge.faces()
        );
    }
    for (id, face) in mesh.faces() {
        for key in face.edges() {
            let edge = mesh.edge_by_key(key).expect("face edge present");
            assert!(
                edge.class.kind.is_valid(),
                "face {} {:?} uses {:?} edge {:?}",
                id,
                face.verts,
                edge.class.kind,
                key
            );
        }
    }
}

/// Faces lying entirely at or above `upper_z` point up, those at or below `lower_z`
/// point down. Returns how many faces were checked.
pub fn assert_caps_point_outward(mesh: &SliceMesh, lower_z: Real, upper_z: Real) -> usize {
    let mut checked = 0;
    for (_, face) in mesh.faces() {
        let zs = face.verts.map(|v| mesh.position(v).z);
        let n = mesh.face_normal(face);
        if zs.iter().all(|&z| z >= upper_z) {
            assert!(n.z > 0.0, "upper cap face {:?} has normal {:?}", face.verts, n);
            checked += 1;
        } else if zs.iter().all(|&z| z <= lower_z) {
            assert!(n.z < 0.0, "lower cap face {:?} has normal {:?}", face.verts, n);
            checked += 1;
        }
    }
    checked
}
