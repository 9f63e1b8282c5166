//! Terminal end caps.

mod support;

use contour_tiler::cap::{CapDirection, cap_mesh_end};
use contour_tiler::mesh::EdgeKind;
use contour_tiler::SliceMesh;
use geo::{Contains, Coord, polygon};
use support::{rectangle, two_levels};

fn capped(direction: CapDirection) -> SliceMesh {
    let contours = two_levels(
        vec![rectangle(0.0, 0.0, 6.0, 2.0)],
        vec![rectangle(0.0, 0.0, 6.0, 2.0)],
        2.0,
    );
    let mut mesh = SliceMesh::from_contours(contours);
    assert!(cap_mesh_end(&mut mesh, direction).unwrap() > 0);
    mesh
}

/// Every cap face points the way of its cap
#[test]
fn test_cap_normals_follow_direction() {
    println!("=== Testing Cap Normal Direction ===");

    for direction in [CapDirection::Upper, CapDirection::Lower] {
        let mesh = capped(direction);
        for (_, face) in mesh.faces() {
            let n = mesh.face_normal(face);
            assert!(
                n.z * direction.normal_sign() > 0.0,
                "{:?} cap face {:?} has normal {:?}",
                direction,
                face.verts,
                n
            );
        }
    }

    println!("✓ Upper caps point up, lower caps point down");
}

/// A cap covers its level: ring edges get one face, interior edges two
#[test]
fn test_cap_is_closed() {
    println!("=== Testing Cap Closure ===");

    let mesh = capped(CapDirection::Lower);
    let mut ring_edges = 0;
    for edge in mesh.edges() {
        let on_lower = |v: usize| mesh.vertex_is_upper(v) == Some(false);
        let medial = |v: usize| mesh.vertex(v).origin.is_medial_axis();
        if edge.class.kind == EdgeKind::Contour && on_lower(edge.key.a) && on_lower(edge.key.b) {
            ring_edges += 1;
            assert_eq!(edge.faces().len(), 1, "ring edge {:?}", edge.key);
        } else if medial(edge.key.a) || medial(edge.key.b) {
            assert_eq!(edge.faces().len(), 2, "interior edge {:?}", edge.key);
        }
    }
    assert_eq!(ring_edges, 4);

    // skeleton vertices sit half a section below the lower level
    for v in mesh.vertices().iter().filter(|v| v.origin.is_medial_axis()) {
        assert_eq!(v.position.z, -1.0);
    }

    println!("✓ Cap closed over {} ring edges", ring_edges);
}

/// A concave outline is capped without faces outside it
#[test]
fn test_concave_cap_stays_inside() {
    println!("=== Testing Concave Cap ===");

    let ell = polygon![
        (x: 0.0, y: 0.0), (x: 6.0, y: 0.0), (x: 6.0, y: 2.0),
        (x: 2.0, y: 2.0), (x: 2.0, y: 6.0), (x: 0.0, y: 6.0),
    ];
    let contours = two_levels(vec![rectangle(0.0, 0.0, 6.0, 6.0)], vec![ell.clone()], 1.0);
    let mut mesh = SliceMesh::from_contours(contours);
    cap_mesh_end(&mut mesh, CapDirection::Upper).unwrap();

    for (_, face) in mesh.faces() {
        let c = mesh.face_centroid(face);
        assert!(ell.contains(&Coord { x: c.x, y: c.y }), "face {:?} outside the outline", face.verts);
        assert!(mesh.face_normal(face).z > 0.0);
    }

    println!("✓ {} faces inside the outline", mesh.face_count());
}
