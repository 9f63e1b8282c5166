//! Slice chord search and insertion.

mod support;

use contour_tiler::chord::{
    ChordIndex, DEFAULT_LADDER, FailureCache, TestSuite, failed_tests, generate_slice_chords,
};
use contour_tiler::contour::geometry::segment_crosses_polygon;
use contour_tiler::mesh::complete::complete_corresponding_vertex_faces;
use contour_tiler::mesh::delaunay::{add_delaunay_faces, classify_unknown_edges, remove_invalid_edges};
use contour_tiler::mesh::EdgeKind;
use contour_tiler::{ContourSet, SliceMesh, TilingParams};
use geo::Line;
use support::{chord_edges, index_at, rectangle, square, two_levels};

/// Run every step up to and including the chord ladder.
fn chorded_mesh(contours: ContourSet) -> (SliceMesh, ChordIndex, Vec<usize>) {
    let mut mesh = SliceMesh::from_contours(contours);
    add_delaunay_faces(&mut mesh).unwrap();
    classify_unknown_edges(&mut mesh).unwrap();
    remove_invalid_edges(&mut mesh);
    complete_corresponding_vertex_faces(&mut mesh).unwrap();
    let mut chords = ChordIndex::from_mesh(&mesh);
    let mut failures = FailureCache::new();
    let incomplete =
        generate_slice_chords(&mut mesh, &mut chords, &mut failures, &TilingParams::default())
            .unwrap();
    (mesh, chords, incomplete)
}

/// Identical XY positions pair up without any chord test running
#[test]
fn test_identical_positions_bypass_chord_search() {
    println!("=== Testing Correspondence Bypass ===");

    let contours = two_levels(vec![square(0.0, 0.0, 3.0)], vec![square(0.0, 0.0, 3.0)], 1.0);
    let chords = ChordIndex::new();
    let a = index_at(&contours, 0, (3.0, 0.0));
    let b = index_at(&contours, 1, (3.0, 0.0));
    for suite in DEFAULT_LADDER {
        assert_eq!(failed_tests(&contours, &chords, a, b, suite).unwrap(), TestSuite::NONE);
    }

    let (mesh, _, _) = chorded_mesh(contours);
    let corresponding =
        mesh.edges().filter(|e| e.class.kind == EdgeKind::Corresponding).count();
    assert_eq!(corresponding, 4);

    println!("✓ Corresponding pairs bypass chord search");
}

/// A second run of the chord ladder on an unchanged mesh adds nothing
#[test]
fn test_chord_pass_is_idempotent() {
    println!("=== Testing Chord Pass Idempotence ===");

    let contours =
        two_levels(vec![rectangle(0.0, 0.0, 6.0, 4.0)], vec![square(1.0, 1.0, 2.0)], 1.0);
    let (mut mesh, mut chords, _) = chorded_mesh(contours);
    let edges = mesh.edge_count();
    let indexed = chords.len();

    let mut failures = FailureCache::new();
    generate_slice_chords(&mut mesh, &mut chords, &mut failures, &TilingParams::default())
        .unwrap();
    assert_eq!(mesh.edge_count(), edges);
    assert_eq!(chords.len(), indexed);

    println!("✓ {} edges before and after", edges);
}

/// Every accepted chord stays on one side of both polygons it joins
#[test]
fn test_accepted_chords_do_not_cross() {
    println!("=== Testing Chord Crossing Rule ===");

    let contours =
        two_levels(vec![rectangle(0.0, 0.0, 6.0, 4.0)], vec![square(1.0, 1.0, 2.0)], 1.0);
    let (mesh, _, _) = chorded_mesh(contours);

    let chords = chord_edges(&mesh);
    assert!(!chords.is_empty());
    for edge in chords {
        let (a, b) = (
            mesh.vertex(edge.key.a).origin.contour().unwrap(),
            mesh.vertex(edge.key.b).origin.contour().unwrap(),
        );
        let line = Line::new(mesh.xy(edge.key.a), mesh.xy(edge.key.b));
        for poly in [a.poly, b.poly] {
            assert!(
                !segment_crosses_polygon(mesh.contours().polygon(poly), line),
                "chord {:?} crosses polygon {}",
                edge.key,
                poly
            );
        }
    }

    println!("✓ No accepted chord crosses its polygons");
}

/// The relaxed tier only runs when asked for
#[test]
fn test_relaxed_tier_is_opt_in() {
    println!("=== Testing Relaxed Tier ===");

    let ladder = contour_tiler::chord::suite_ladder(&TilingParams::default());
    assert_eq!(ladder, DEFAULT_LADDER.to_vec());
    let relaxed =
        contour_tiler::chord::suite_ladder(&TilingParams::default().with_relaxed_tier(true));
    assert_eq!(relaxed.len(), DEFAULT_LADDER.len() + 1);
    assert_eq!(relaxed.last(), Some(&contour_tiler::chord::RELAXED_TIER));

    println!("✓ Relaxed tier appended on request");
}
