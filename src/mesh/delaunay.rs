//! Seed the slice mesh with a constrained Delaunay triangulation of both levels.
//!
//! Both levels are projected onto the XY plane and triangulated together, with the
//! ring edges as constraints. Only triangles whose corners each map to exactly one mesh
//! vertex are kept; coincident points from both levels are left for chord search.

use crate::classify::classify_mesh_edge;
use crate::errors::MeshResult;
use crate::float_types::{Real, xy_key};
use crate::mesh::{EdgeKind, SliceMesh};
use hashbrown::HashMap;
use spade::handles::FixedVertexHandle;
use spade::{ConstrainedDelaunayTriangulation, Point2, Triangulation};
use tracing::debug;

/// Triangulate the mesh vertices and add the resulting faces. Returns the number of
/// faces added. Edges created here are left as [`EdgeKind::Unknown`].
pub fn add_delaunay_faces(mesh: &mut SliceMesh) -> MeshResult<usize> {
    // unique XY positions in vertex order
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut by_xy: HashMap<(u64, u64), usize> = HashMap::new();
    for v in 0..mesh.vertex_count() {
        let p = mesh.xy(v);
        match by_xy.get(&xy_key(p.x, p.y)) {
            Some(&g) => groups[g].push(v),
            None => {
                by_xy.insert(xy_key(p.x, p.y), groups.len());
                groups.push(vec![v]);
            }
        }
    }
    if groups.len() < 3 {
        return Ok(0);
    }

    // translate to the centroid to keep the predicates well conditioned
    let n = groups.len() as Real;
    let cx = groups.iter().map(|g| mesh.xy(g[0]).x).sum::<Real>() / n;
    let cy = groups.iter().map(|g| mesh.xy(g[0]).y).sum::<Real>() / n;

    let mut cdt = ConstrainedDelaunayTriangulation::<Point2<Real>>::new();
    let mut handle_vertices: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut vertex_handle: HashMap<usize, FixedVertexHandle> = HashMap::new();
    for group in &groups {
        let p = mesh.xy(group[0]);
        let handle = cdt.insert(Point2::new(p.x - cx, p.y - cy))?;
        handle_vertices.entry(handle.index()).or_default().extend(group.iter().copied());
        for &v in group {
            vertex_handle.insert(v, handle);
        }
    }

    let contour_edges: Vec<(usize, usize)> = mesh
        .edges()
        .filter(|e| e.class.kind == EdgeKind::Contour)
        .map(|e| (e.key.a, e.key.b))
        .collect();
    let mut skipped = 0usize;
    for (a, b) in contour_edges {
        let (Some(&ha), Some(&hb)) = (vertex_handle.get(&a), vertex_handle.get(&b)) else {
            continue;
        };
        if ha == hb {
            continue;
        }
        if cdt.can_add_constraint(ha, hb) {
            cdt.add_constraint(ha, hb);
        } else {
            skipped += 1;
        }
    }

    let triangles: Vec<[usize; 3]> = cdt
        .inner_faces()
        .filter_map(|face| {
            let corners = face.vertices().map(|v| handle_vertices.get(&v.fix().index()));
            match corners {
                [Some(a), Some(b), Some(c)] if a.len() == 1 && b.len() == 1 && c.len() == 1 => {
                    Some([a[0], b[0], c[0]])
                }
                _ => None,
            }
        })
        .collect();

    let added = triangles.into_iter().filter_map(|tri| mesh.add_face(tri)).count();
    debug!(added, skipped_constraints = skipped, "delaunay seed faces");
    Ok(added)
}

/// Classify every edge still marked [`EdgeKind::Unknown`]. Returns how many were set.
pub fn classify_unknown_edges(mesh: &mut SliceMesh) -> MeshResult<usize> {
    let unknown: Vec<_> = mesh
        .edges()
        .filter(|e| e.class.kind == EdgeKind::Unknown)
        .map(|e| e.key)
        .collect();
    for key in &unknown {
        let class = classify_mesh_edge(mesh, key.a, key.b)?;
        mesh.set_edge_class(*key, class);
    }
    Ok(unknown.len())
}

/// Remove every edge whose classification cannot be part of the surface, together with
/// its faces. Returns the number of edges removed.
pub fn remove_invalid_edges(mesh: &mut SliceMesh) -> usize {
    let invalid: Vec<_> = mesh.edges().filter(|e| !e.class.is_valid()).map(|e| e.key).collect();
    for key in &invalid {
        mesh.remove_edge(*key);
    }
    debug!(removed = invalid.len(), "invalid edges");
    invalid.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::ContourSet;
    use geo::polygon;

    #[test]
    fn seeds_faces_and_classifies() {
        let lower = polygon![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 4.0)];
        let upper = polygon![(x: 1.0, y: 1.0), (x: 3.0, y: 1.0), (x: 3.0, y: 3.0), (x: 1.0, y: 3.0)];
        let contours = ContourSet::new(vec![(lower, 0.0, false), (upper, 1.0, true)]).unwrap();
        let mut mesh = SliceMesh::from_contours(contours);
        let added = add_delaunay_faces(&mut mesh).unwrap();
        assert!(added >= 8);
        classify_unknown_edges(&mut mesh).unwrap();
        assert!(mesh.edges().all(|e| e.class.kind != EdgeKind::Unknown));

        // the inner square's diagonal is flat and goes, taking its faces along
        let removed = remove_invalid_edges(&mut mesh);
        assert!(removed >= 1);
        assert!(mesh.edges().all(|e| e.class.is_valid()));
    }
}
