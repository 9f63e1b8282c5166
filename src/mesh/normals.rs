//! Outward face winding and vertex normals.

use crate::contour::geometry::contains;
use crate::float_types::{Real, tolerance};
use crate::mesh::{MeshFace, SliceMesh};
use geo::Coord;
use nalgebra::Vector3;
use tracing::debug;

/// `true` when `face` is wound so its normal points out of the material.
///
/// A face whose normal has an up (down) component must not have its centroid inside
/// an upper (lower) polygon. A vertical face is tested by stepping off its centroid
/// along the normal: the step must not land inside a polygon of the level the face
/// was built on. Zero-area faces have no normal and count as correct.
pub fn faces_outward(mesh: &SliceMesh, face: &MeshFace) -> bool {
    let raw = raw_normal(mesh, face);
    let len = raw.norm();
    if len <= tolerance() {
        return true;
    }
    let n = raw / len;
    let centroid = mesh.face_centroid(face);
    let center = Coord { x: centroid.x, y: centroid.y };
    let contours = mesh.contours();

    if n.z.abs() > tolerance() {
        let level = if n.z > 0.0 { contours.upper_indices() } else { contours.lower_indices() };
        return !level.iter().any(|&p| contains(contours.polygon(p), center));
    }

    let span = face
        .edges()
        .iter()
        .map(|e| (mesh.position(e.a) - mesh.position(e.b)).norm())
        .fold(0.0, Real::max);
    let step = Coord { x: center.x + n.x * span * 1e-3, y: center.y + n.y * span * 1e-3 };
    let polys: Vec<usize> = match build_level(mesh, face) {
        Some(upper) => {
            if upper {
                contours.upper_indices().to_vec()
            } else {
                contours.lower_indices().to_vec()
            }
        }
        None => (0..contours.len()).collect(),
    };
    !polys.iter().any(|&p| contains(contours.polygon(p), step))
}

/// Level of the corner that is not half of a corresponding pair within the face.
fn build_level(mesh: &SliceMesh, face: &MeshFace) -> Option<bool> {
    face.verts
        .iter()
        .find(|&&v| mesh.vertex(v).corresponding.is_none_or(|c| !face.contains(c)))
        .and_then(|&v| mesh.vertex_is_upper(v))
}

fn raw_normal(mesh: &SliceMesh, face: &MeshFace) -> Vector3<Real> {
    let [a, b, c] = face.verts.map(|v| mesh.position(v));
    (b - a).cross(&(c - a))
}

/// `true` when every corner of the face sits on one Z level.
fn lies_on_one_level(mesh: &SliceMesh, face: &MeshFace) -> bool {
    let z = mesh.position(face.verts[0]).z;
    face.verts.iter().all(|&v| mesh.position(v).z == z)
}

/// Reverse every face spanning the two levels that points into the material.
///
/// Faces touching a skeleton vertex and flat cap faces are oriented when they are
/// created and are left alone. Returns the number of faces reversed.
pub fn ensure_external_normals(mesh: &mut SliceMesh) -> usize {
    let inward: Vec<usize> = mesh
        .faces()
        .filter(|(_, f)| f.verts.iter().all(|&v| !mesh.vertex(v).origin.is_medial_axis()))
        .filter(|(_, f)| !lies_on_one_level(mesh, f))
        .filter(|(_, f)| !faces_outward(mesh, f))
        .map(|(id, _)| id)
        .collect();
    for &id in &inward {
        mesh.reverse_face(id);
    }
    debug!(reversed = inward.len(), "external normals");
    inward.len()
}

/// Set every vertex normal to the area-weighted mean of its incident face normals.
pub fn update_vertex_normals(mesh: &mut SliceMesh) {
    let mut sums = vec![Vector3::zeros(); mesh.vertex_count()];
    for (_, face) in mesh.faces() {
        // the cross product's length is twice the area, which is the weight we want
        let n = raw_normal(mesh, face);
        for v in face.verts {
            sums[v] += n;
        }
    }
    for (v, sum) in sums.into_iter().enumerate() {
        let len = sum.norm();
        mesh.set_vertex_normal(v, if len > 0.0 { sum / len } else { sum });
    }
}
