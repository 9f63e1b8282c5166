//! The slice mesh: an arena of vertices, classified edges and triangles built
//! between the two levels of one meshing group.
//!
//! Vertices are never removed. Edges live in an ordered map so every sweep over
//! them is deterministic. Faces are stored in a slot vector; a removed face leaves
//! an empty slot so face ids held elsewhere never alias a different triangle.

pub mod complete;
pub mod delaunay;
pub mod edge;
pub mod face;
pub mod normals;
pub mod surface;
pub mod vertex;

pub use edge::{EdgeClass, EdgeKey, EdgeKind, MeshEdge};
pub use face::MeshFace;
pub use vertex::{MedialAxisIndex, MeshVertex, VertexOrigin};

use crate::contour::{ContourIndex, ContourSet};
use crate::float_types::{Real, xy_key};
use geo::Coord;
use hashbrown::HashMap;
use nalgebra::{Point3, Vector3};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

#[derive(Debug, Clone)]
pub struct SliceMesh {
    contours: ContourSet,
    vertices: Vec<MeshVertex>,
    edges: BTreeMap<EdgeKey, MeshEdge>,
    faces: Vec<Option<MeshFace>>,
    face_lookup: HashMap<[usize; 3], usize>,
    contour_to_vertex: HashMap<ContourIndex, usize>,
    next_skeleton: usize,
}

impl SliceMesh {
    /// Create one vertex per contour vertex and connect each ring with contour edges.
    ///
    /// A vertex whose XY position was already produced by the other level reuses that
    /// exact position, is linked to it as its corresponding vertex, and gets a
    /// corresponding edge.
    pub fn from_contours(contours: ContourSet) -> Self {
        let mut mesh = Self {
            contours,
            vertices: Vec::new(),
            edges: BTreeMap::new(),
            faces: Vec::new(),
            face_lookup: HashMap::new(),
            contour_to_vertex: HashMap::new(),
            next_skeleton: 0,
        };

        let indices: Vec<ContourIndex> = mesh.contours.indices().collect();
        let mut seen: HashMap<(u64, u64), usize> = HashMap::new();
        for index in &indices {
            let p = mesh.contours.point(*index);
            let z = mesh.contours.z(index.poly);
            let v = mesh.add_contour_vertex(*index, Point3::new(p.x, p.y, z));

            match seen.get(&xy_key(p.x, p.y)).copied() {
                Some(other) => {
                    let other_upper = mesh.vertex_is_upper(other);
                    if other_upper != Some(mesh.contours.is_upper(index.poly)) {
                        let exact = mesh.vertices[other].position;
                        mesh.vertices[v].position.x = exact.x;
                        mesh.vertices[v].position.y = exact.y;
                        mesh.vertices[v].corresponding = Some(other);
                        mesh.vertices[other].corresponding = Some(v);
                        mesh.add_edge(v, other, EdgeKind::Corresponding.into());
                    }
                }
                None => {
                    seen.insert(xy_key(p.x, p.y), v);
                }
            }
        }

        for index in &indices {
            if let (Some(a), Some(b)) = (mesh.vertex_for(*index), mesh.vertex_for(index.next())) {
                mesh.add_edge(a, b, EdgeKind::Contour.into());
            }
        }
        mesh
    }

    pub fn contours(&self) -> &ContourSet {
        &self.contours
    }

    // ---- vertices ----

    pub fn vertex(&self, v: usize) -> &MeshVertex {
        &self.vertices[v]
    }

    pub fn vertices(&self) -> &[MeshVertex] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn position(&self, v: usize) -> Point3<Real> {
        self.vertices[v].position
    }

    pub fn xy(&self, v: usize) -> Coord<Real> {
        self.vertices[v].xy()
    }

    /// Vertex created for a contour index.
    pub fn vertex_for(&self, index: ContourIndex) -> Option<usize> {
        self.contour_to_vertex.get(&index).copied()
    }

    /// Level of a contour vertex, `None` for skeleton vertices.
    pub fn vertex_is_upper(&self, v: usize) -> Option<bool> {
        self.vertices[v].origin.contour().map(|index| self.contours.is_upper(index.poly))
    }

    pub fn set_vertex_normal(&mut self, v: usize, normal: Vector3<Real>) {
        self.vertices[v].normal = normal;
    }

    pub fn add_contour_vertex(&mut self, index: ContourIndex, position: Point3<Real>) -> usize {
        let v = self.vertices.len();
        self.vertices.push(MeshVertex::new(position, VertexOrigin::Contour(index)));
        self.contour_to_vertex.insert(index, v);
        v
    }

    /// Start numbering the nodes of a new skeleton.
    pub fn next_skeleton_id(&mut self) -> usize {
        let id = self.next_skeleton;
        self.next_skeleton += 1;
        id
    }

    pub fn add_medial_vertex(&mut self, position: Point3<Real>, index: MedialAxisIndex) -> usize {
        let v = self.vertices.len();
        self.vertices.push(MeshVertex::new(position, VertexOrigin::MedialAxis(index)));
        v
    }

    // ---- edges ----

    pub fn edge(&self, a: usize, b: usize) -> Option<&MeshEdge> {
        self.edges.get(&EdgeKey::new(a, b))
    }

    pub fn edge_by_key(&self, key: EdgeKey) -> Option<&MeshEdge> {
        self.edges.get(&key)
    }

    pub fn contains_edge(&self, a: usize, b: usize) -> bool {
        self.edges.contains_key(&EdgeKey::new(a, b))
    }

    /// All edges in key order.
    pub fn edges(&self) -> impl Iterator<Item = &MeshEdge> + '_ {
        self.edges.values()
    }

    pub fn edge_keys(&self) -> Vec<EdgeKey> {
        self.edges.keys().copied().collect()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edges touching `v`.
    pub fn edges_of(&self, v: usize) -> impl Iterator<Item = &MeshEdge> + '_ {
        self.vertices[v].edges.iter().filter_map(|key| self.edges.get(key))
    }

    /// Returns `false` when the edge already exists or would be a loop.
    pub fn add_edge(&mut self, a: usize, b: usize, class: EdgeClass) -> bool {
        if a == b {
            return false;
        }
        let key = EdgeKey::new(a, b);
        if self.edges.contains_key(&key) {
            return false;
        }
        self.edges.insert(key, MeshEdge::new(key, class));
        self.vertices[a].edges.push(key);
        self.vertices[b].edges.push(key);
        true
    }

    pub fn set_edge_class(&mut self, key: EdgeKey, class: EdgeClass) {
        if let Some(edge) = self.edges.get_mut(&key) {
            edge.class = class;
        }
    }

    /// Remove an edge and every face that uses it.
    pub fn remove_edge(&mut self, key: EdgeKey) -> Option<MeshEdge> {
        let face_ids = self.edges.get(&key)?.faces.clone();
        for id in face_ids {
            self.remove_face(id);
        }
        let edge = self.edges.remove(&key)?;
        self.vertices[key.a].edges.retain(|k| *k != key);
        self.vertices[key.b].edges.retain(|k| *k != key);
        Some(edge)
    }

    // ---- faces ----

    pub fn face(&self, id: usize) -> Option<&MeshFace> {
        self.faces.get(id).and_then(Option::as_ref)
    }

    /// Live faces with their ids.
    pub fn faces(&self) -> impl Iterator<Item = (usize, &MeshFace)> + '_ {
        self.faces.iter().enumerate().filter_map(|(id, f)| f.as_ref().map(|f| (id, f)))
    }

    pub fn face_count(&self) -> usize {
        self.face_lookup.len()
    }

    pub fn contains_face(&self, verts: [usize; 3]) -> bool {
        self.face_lookup.contains_key(&MeshFace::new(verts).key())
    }

    /// Faces incident to `v`.
    pub fn faces_of(&self, v: usize) -> BTreeSet<usize> {
        self.edges_of(v).flat_map(|e| e.faces.iter().copied()).collect()
    }

    /// `true` when every existing edge of the triangle still needs a face.
    pub fn face_fits(&self, verts: [usize; 3]) -> bool {
        MeshFace::new(verts)
            .edges()
            .iter()
            .all(|key| self.edges.get(key).is_none_or(|e| !e.is_complete()))
    }

    /// Add a triangle, creating any missing edge as [`EdgeKind::Unknown`].
    ///
    /// Returns `None` for repeated vertices, a triangle that already exists, or one
    /// that would give an edge a third face.
    pub fn add_face(&mut self, verts: [usize; 3]) -> Option<usize> {
        let [a, b, c] = verts;
        if a == b || b == c || a == c {
            return None;
        }
        let face = MeshFace::new(verts);
        let key = face.key();
        if self.face_lookup.contains_key(&key) {
            return None;
        }
        if face.edges().iter().any(|k| self.edges.get(k).is_some_and(MeshEdge::is_full)) {
            return None;
        }

        let id = self.faces.len();
        for edge_key in face.edges() {
            if !self.edges.contains_key(&edge_key) {
                self.add_edge(edge_key.a, edge_key.b, EdgeClass::UNKNOWN);
            }
            if let Some(edge) = self.edges.get_mut(&edge_key) {
                edge.faces.push(id);
            }
        }
        self.faces.push(Some(face));
        self.face_lookup.insert(key, id);
        Some(id)
    }

    pub fn remove_face(&mut self, id: usize) -> Option<MeshFace> {
        let face = self.faces.get_mut(id)?.take()?;
        self.face_lookup.remove(&face.key());
        for key in face.edges() {
            if let Some(edge) = self.edges.get_mut(&key) {
                edge.faces.retain(|f| *f != id);
            }
        }
        for v in face.verts {
            if !self.vertices[v].origin.is_medial_axis() {
                self.vertices[v].faces_complete = false;
            }
        }
        Some(face)
    }

    /// Flip the winding of a face in place.
    pub fn reverse_face(&mut self, id: usize) {
        if let Some(Some(face)) = self.faces.get_mut(id) {
            *face = face.reversed();
        }
    }

    /// Unit normal from the face winding.
    pub fn face_normal(&self, face: &MeshFace) -> Vector3<Real> {
        let [a, b, c] = face.verts.map(|v| self.position(v));
        let n = (b - a).cross(&(c - a));
        let len = n.norm();
        if len > 0.0 { n / len } else { n }
    }

    pub fn face_centroid(&self, face: &MeshFace) -> Point3<Real> {
        let [a, b, c] = face.verts.map(|v| self.position(v).coords);
        Point3::from((a + b + c) / 3.0)
    }

    // ---- completeness ----

    /// `true` when the faces around a contour vertex form an unbroken fan from the
    /// edge to its previous ring neighbour to the edge to its next one.
    ///
    /// The result is cached once it becomes true. Skeleton vertices are always complete.
    pub fn update_face_complete(&mut self, v: usize) -> bool {
        if self.vertices[v].faces_complete {
            return true;
        }
        let complete = self.walk_face_fan(v);
        if complete {
            self.vertices[v].faces_complete = true;
        }
        complete
    }

    fn walk_face_fan(&self, v: usize) -> bool {
        let Some(index) = self.vertices[v].origin.contour() else {
            return true;
        };
        let (Some(prev), Some(next)) =
            (self.vertex_for(index.previous()), self.vertex_for(index.next()))
        else {
            return false;
        };
        let Some(start) = self.edge(v, prev) else {
            return false;
        };
        if start.faces.is_empty() {
            return false;
        }
        let end = EdgeKey::new(v, next);

        let mut visited = BTreeSet::new();
        let mut queue: VecDeque<usize> = start.faces.iter().copied().collect();
        while let Some(id) = queue.pop_front() {
            if !visited.insert(id) {
                continue;
            }
            let Some(face) = self.face(id) else { continue };
            let edges = face.edges();
            if edges.contains(&end) {
                return true;
            }
            for key in edges.iter().filter(|k| k.contains(v)) {
                if let Some(edge) = self.edges.get(key) {
                    queue.extend(edge.faces.iter().filter(|f| !visited.contains(*f)));
                }
            }
        }
        false
    }

    /// Contour vertices whose face fan is not closed yet, in vertex order.
    pub fn incomplete_vertices(&mut self) -> Vec<usize> {
        (0..self.vertices.len()).filter(|&v| !self.update_face_complete(v)).collect()
    }
}
