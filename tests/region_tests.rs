//! Region detection and repair.

mod support;

use contour_tiler::mesh::delaunay::{add_delaunay_faces, classify_unknown_edges};
use contour_tiler::mesh::EdgeKind;
use contour_tiler::region::{RegionGraph, detect_regions, face_region_kind};
use contour_tiler::{RegionKind, SliceMesh, TilingParams, mesh_contours};
use std::collections::BTreeSet;
use support::{annulus, square, two_levels};

fn seeded(contours: contour_tiler::ContourSet) -> SliceMesh {
    let mut mesh = SliceMesh::from_contours(contours);
    add_delaunay_faces(&mut mesh).unwrap();
    classify_unknown_edges(&mut mesh).unwrap();
    mesh
}

/// A hole present on one level only: the triangles spanning it form one hole region
#[test]
fn test_hole_annulus_is_detected() {
    println!("=== Testing Hole Detection ===");

    let mesh = seeded(two_levels(
        vec![annulus((0.0, 0.0, 10.0), (3.0, 3.0, 4.0))],
        vec![square(1.0, 1.0, 8.0)],
        1.0,
    ));
    let regions = detect_regions(&mesh);
    let holes: Vec<_> = regions.iter().filter(|r| r.kind() == RegionKind::Hole).collect();
    assert_eq!(holes.len(), 1, "regions: {:?}", regions.iter().map(|r| r.kind()).collect::<Vec<_>>());

    let hole = holes[0];
    assert_eq!(hole.faces().len(), 2);
    assert_eq!(hole.vertices().len(), 4);
    for v in hole.vertices() {
        let index = mesh.vertex(v).origin.contour().unwrap();
        assert!(index.is_inner());
    }
    assert_eq!(hole.perimeter().len(), 4);

    println!("✓ Hole region with {} faces", hole.faces().len());
}

/// A hole present on both levels is walled by its corresponding vertices and leaves
/// no region behind
#[test]
fn test_hole_through_both_levels_needs_no_region() {
    println!("=== Testing Hole Through Both Levels ===");

    let ring = annulus((0.0, 0.0, 10.0), (3.0, 3.0, 4.0));
    let mesh = seeded(two_levels(vec![ring.clone()], vec![ring.clone()], 1.0));
    let regions = detect_regions(&mesh);
    assert!(regions.is_empty(), "regions: {:?}", regions.iter().map(|r| r.kind()).collect::<Vec<_>>());

    let params = TilingParams::default().with_cap_ends(false);
    let mesh = mesh_contours(two_levels(vec![ring.clone()], vec![ring], 1.0), &params, false, false)
        .unwrap();
    let inner_walls = mesh
        .faces()
        .filter(|(_, f)| {
            f.verts.iter().all(|&v| mesh.vertex(v).origin.contour().is_some_and(|i| i.is_inner()))
        })
        .count();
    assert!(inner_walls > 0);

    println!("✓ {} faces wall the hole", inner_walls);
}

/// After the full pipeline no face keeps an untiled edge
#[test]
fn test_no_untiled_faces_after_repair() {
    println!("=== Testing Region Repair ===");

    let contours = two_levels(
        vec![annulus((0.0, 0.0, 10.0), (3.0, 3.0, 4.0))],
        vec![square(1.0, 1.0, 8.0)],
        1.0,
    );
    let mesh = mesh_contours(contours, &TilingParams::default(), false, false).unwrap();
    assert!(mesh.face_count() > 0);
    for (_, face) in mesh.faces() {
        for key in face.edges() {
            if let Some(edge) = mesh.edge_by_key(key) {
                assert_ne!(edge.class.kind, EdgeKind::Untiled, "face {:?}", face.verts);
            }
        }
        assert_ne!(face_region_kind(&mesh, face), Some(RegionKind::Untiled));
    }

    println!("✓ {} faces, none untiled", mesh.face_count());
}

/// Regions never share a face
#[test]
fn test_regions_are_disjoint() {
    println!("=== Testing Region Disjointness ===");

    let mesh = seeded(two_levels(
        vec![annulus((0.0, 0.0, 10.0), (3.0, 3.0, 4.0)), square(20.0, 0.0, 4.0)],
        vec![square(1.0, 1.0, 8.0)],
        1.0,
    ));
    let regions = detect_regions(&mesh);
    let mut seen = BTreeSet::new();
    for region in &regions {
        for face in region.faces() {
            assert!(seen.insert(face.key()), "face {:?} in two regions", face.verts);
        }
    }

    let graph = RegionGraph::build(&mesh, regions.clone());
    assert_eq!(graph.len(), regions.len());
    for ((a, b), weight) in graph.edges() {
        assert!(graph.region(a).kind().is_valid_pair(graph.region(b).kind()));
        assert!(weight > 0.0);
    }

    println!("✓ {} disjoint regions", regions.len());
}
