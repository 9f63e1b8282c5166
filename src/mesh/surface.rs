//! The output mesh: plain positions, normals and triangles.

use crate::float_types::{Real, xy_key};
use crate::mesh::SliceMesh;
use hashbrown::HashMap;
use nalgebra::{Point3, Vector3};
use std::collections::BTreeSet;

/// A triangle soup with shared vertices, wound counter-clockwise from outside.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceMesh {
    pub positions: Vec<Point3<Real>>,
    pub normals: Vec<Vector3<Real>>,
    pub triangles: Vec<[usize; 3]>,
}

impl SurfaceMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the live faces of a slice mesh, keeping only the vertices they use.
    pub fn from_slice_mesh(mesh: &SliceMesh) -> Self {
        let mut remap: Vec<Option<usize>> = vec![None; mesh.vertex_count()];
        let mut out = Self::new();
        for (_, face) in mesh.faces() {
            let tri = face.verts.map(|v| {
                *remap[v].get_or_insert_with(|| {
                    out.positions.push(mesh.position(v));
                    out.normals.push(mesh.vertex(v).normal);
                    out.positions.len() - 1
                })
            });
            out.triangles.push(tri);
        }
        out
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Mean Z of all positions, 0 for an empty mesh.
    pub fn average_z(&self) -> Real {
        if self.positions.is_empty() {
            return 0.0;
        }
        self.positions.iter().map(|p| p.z).sum::<Real>() / self.positions.len() as Real
    }

    /// Append `other`, offsetting its triangle indices.
    pub fn append(&mut self, other: &SurfaceMesh) {
        let offset = self.positions.len();
        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.triangles.extend(other.triangles.iter().map(|t| t.map(|i| i + offset)));
    }

    /// Merge two meshes, appending the smaller into the larger, and weld the seam.
    pub fn merge(self, other: SurfaceMesh) -> SurfaceMesh {
        let (mut large, small) =
            if self.vertex_count() >= other.vertex_count() { (self, other) } else { (other, self) };
        large.append(&small);
        large.weld();
        large
    }

    /// Collapse vertices with identical positions into one.
    ///
    /// Normals of welded vertices are averaged. Triangles that become degenerate or
    /// repeat an earlier triangle are dropped.
    pub fn weld(&mut self) {
        let mut first: HashMap<((u64, u64), u64), usize> = HashMap::new();
        let mut remap = Vec::with_capacity(self.positions.len());
        let mut positions = Vec::new();
        let mut normals: Vec<Vector3<Real>> = Vec::new();
        for (p, n) in self.positions.iter().zip(&self.normals) {
            let key = (xy_key(p.x, p.y), (p.z + 0.0).to_bits());
            let id = *first.entry(key).or_insert_with(|| {
                positions.push(*p);
                normals.push(Vector3::zeros());
                positions.len() - 1
            });
            normals[id] += n;
            remap.push(id);
        }
        for n in &mut normals {
            let len = n.norm();
            if len > 0.0 {
                *n /= len;
            }
        }

        let mut seen = BTreeSet::new();
        self.triangles = self
            .triangles
            .iter()
            .map(|t| t.map(|i| remap[i]))
            .filter(|[a, b, c]| a != b && b != c && a != c)
            .filter(|t| {
                let mut key = *t;
                key.sort_unstable();
                seen.insert(key)
            })
            .collect();
        self.positions = positions;
        self.normals = normals;
    }
}
