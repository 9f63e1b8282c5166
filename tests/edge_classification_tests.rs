//! Edge classification between contour vertices of two levels.

mod support;

use contour_tiler::SliceMesh;
use contour_tiler::classify::{classify_contour_edge, classify_with_orientation, orientations_match};
use contour_tiler::mesh::EdgeKind;
use support::{annulus, index_at, square, two_levels};

/// An edge whose midpoint lies inside an enclosing polygon and its smaller copy is internal
#[test]
fn test_enclosed_copy_edge_is_internal() {
    println!("=== Testing Enclosed Copy Classification ===");

    let contours = two_levels(vec![square(0.0, 0.0, 4.0)], vec![square(1.0, 1.0, 2.0)], 1.0);
    let outer = index_at(&contours, 0, (0.0, 0.0));
    let inner_far = index_at(&contours, 1, (3.0, 3.0));
    let inner_near = index_at(&contours, 1, (1.0, 1.0));

    let kind = classify_contour_edge(&contours, outer, inner_far).unwrap();
    assert_eq!(kind, EdgeKind::Internal, "midpoint (1.5, 1.5) is inside both squares");
    assert_ne!(kind, EdgeKind::Surface);

    let kind = classify_contour_edge(&contours, outer, inner_near).unwrap();
    assert_eq!(kind, EdgeKind::Surface, "midpoint (0.5, 0.5) is inside the outer square only");

    println!("✓ Internal and surface edges separated");
}

/// Ring neighbours are contour edges; non-neighbours across the interior are flat
#[test]
fn test_same_polygon_edges() {
    println!("=== Testing Same Polygon Classification ===");

    let contours = two_levels(vec![square(0.0, 0.0, 4.0)], vec![square(10.0, 10.0, 2.0)], 1.0);
    let a = index_at(&contours, 0, (0.0, 0.0));
    assert_eq!(classify_contour_edge(&contours, a, a.next()).unwrap(), EdgeKind::Contour);
    assert_eq!(classify_contour_edge(&contours, a, a.previous()).unwrap(), EdgeKind::Contour);
    assert_eq!(classify_contour_edge(&contours, a, a.next().next()).unwrap(), EdgeKind::Flat);

    // the same diagonal is occluded once the upper level covers it
    let covered = two_levels(vec![square(0.0, 0.0, 4.0)], vec![square(1.0, 1.0, 2.0)], 1.0);
    let a = index_at(&covered, 0, (0.0, 0.0));
    assert_eq!(classify_contour_edge(&covered, a, a.next().next()).unwrap(), EdgeKind::Invalid);

    println!("✓ Contour, flat and occluded edges classified");
}

/// Two vertices of one hole ring give a hole edge
#[test]
fn test_hole_ring_edges() {
    println!("=== Testing Hole Ring Classification ===");

    let contours = two_levels(
        vec![annulus((0.0, 0.0, 10.0), (3.0, 3.0, 4.0))],
        vec![square(20.0, 20.0, 2.0)],
        1.0,
    );
    let a = index_at(&contours, 0, (3.0, 3.0));
    let c = index_at(&contours, 0, (7.0, 7.0));
    assert!(a.is_inner() && c.is_inner());
    assert!(!a.are_adjacent(&c));
    assert_eq!(classify_contour_edge(&contours, a, c).unwrap(), EdgeKind::Hole);

    println!("✓ Hole edge classified");
}

/// Vertices that share XY across levels are linked by corresponding edges on construction
#[test]
fn test_coincident_vertices_correspond() {
    println!("=== Testing Corresponding Edges ===");

    let contours = two_levels(vec![square(0.0, 0.0, 2.0)], vec![square(0.0, 0.0, 2.0)], 1.0);
    let mesh = SliceMesh::from_contours(contours);
    assert_eq!(mesh.vertex_count(), 8);

    let corresponding: Vec<_> =
        mesh.edges().filter(|e| e.class.kind == EdgeKind::Corresponding).collect();
    assert_eq!(corresponding.len(), 4);
    for edge in corresponding {
        assert_eq!(mesh.xy(edge.key.a), mesh.xy(edge.key.b));
        assert_eq!(mesh.vertex(edge.key.a).corresponding, Some(edge.key.b));
        assert_eq!(mesh.vertex(edge.key.b).corresponding, Some(edge.key.a));
    }

    println!("✓ Four corresponding edges");
}

/// Rings running the same way match; a hole against an exterior is inverted
#[test]
fn test_orientation_check() {
    println!("=== Testing Orientation Check ===");

    let contours = two_levels(vec![square(0.0, 0.0, 4.0)], vec![square(0.5, 0.5, 3.0)], 1.0);
    let a = index_at(&contours, 0, (0.0, 0.0));
    let b = index_at(&contours, 1, (0.5, 0.5));
    assert!(orientations_match(&contours, a, b));
    let class = classify_with_orientation(&contours, a, b).unwrap();
    assert_eq!(class.kind, EdgeKind::Surface);
    assert!(!class.flipped);
    assert!(class.is_valid());

    // opposite corners run in opposite directions
    let c = index_at(&contours, 1, (3.5, 3.5));
    assert!(!orientations_match(&contours, a, c));

    println!("✓ Orientation compared");
}
