//! Closing the ends of a mesh where no section continues.

use crate::contour::geometry::cross;
use crate::contour::ring_len;
use crate::errors::MeshResult;
use crate::float_types::Real;
use crate::medial_axis::{approximate_medial_axis, triangulate_region};
use crate::mesh::complete::classify_closing_edges;
use crate::mesh::{MedialAxisIndex, SliceMesh};
use nalgebra::Point3;
use tracing::debug;

/// Which level a cap closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapDirection {
    /// Close the upper polygons; cap faces point up.
    Upper,
    /// Close the lower polygons; cap faces point down.
    Lower,
}

impl CapDirection {
    /// Sign of the Z component of the outward normal of every cap face.
    pub const fn normal_sign(self) -> Real {
        match self {
            CapDirection::Upper => 1.0,
            CapDirection::Lower => -1.0,
        }
    }
}

/// Cap every polygon of one level with a dome raised to half a section beyond it.
///
/// Each polygon's skeleton is lifted to `upper_min_z + half` (upper) or
/// `lower_max_z - half` (lower), where `half` is half the gap between the levels, and
/// triangulated together with the polygon's rings. A polygon without a skeleton is
/// capped flat. Returns the number of faces added.
pub fn cap_mesh_end(mesh: &mut SliceMesh, direction: CapDirection) -> MeshResult<usize> {
    let contours = mesh.contours();
    let (lower, upper) = (contours.lower_max_z(), contours.upper_min_z());
    let half = (upper - lower) / 2.0;
    let (target_z, polys) = match direction {
        CapDirection::Upper => (upper + half, contours.upper_indices().to_vec()),
        CapDirection::Lower => (lower - half, contours.lower_indices().to_vec()),
    };

    let mut added = 0;
    for poly in polys {
        let polygon = mesh.contours().polygon(poly).clone();
        let rings: Vec<Vec<usize>> = (0..mesh.contours().ring_count(poly))
            .map(|ring| {
                let len = ring_len(mesh.contours().ring(poly, ring));
                (0..len)
                    .filter_map(|vertex| mesh.vertex_for(mesh.contours().index(poly, ring, vertex)))
                    .collect()
            })
            .collect();

        let axis = approximate_medial_axis(&polygon)?;
        let skeleton = mesh.next_skeleton_id();
        let interior: Vec<usize> = axis
            .nodes
            .iter()
            .enumerate()
            .map(|(node, p)| {
                mesh.add_medial_vertex(
                    Point3::new(p.x, p.y, target_z),
                    MedialAxisIndex { skeleton, node },
                )
            })
            .collect();

        let mut ids = Vec::new();
        for [a, b, c] in triangulate_region(mesh, &rings, &interior, &polygon)? {
            let ccw = cross(mesh.xy(a), mesh.xy(b), mesh.xy(c)) > 0.0;
            let tri = if ccw == (direction == CapDirection::Upper) { [a, b, c] } else { [a, c, b] };
            ids.extend(mesh.add_face(tri));
        }
        classify_closing_edges(mesh, &ids)?;
        debug!(poly, skeleton = axis.len(), faces = ids.len(), ?direction, "cap");
        added += ids.len();
    }
    Ok(added)
}
