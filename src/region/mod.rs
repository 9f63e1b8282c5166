//! Regions: connected sets of faces that share a defect signature.
//!
//! Regions are detected from the Delaunay seed before invalid edges are pruned, so a
//! [`Region`] keeps copies of its triangles rather than face ids. Everything else
//! (vertices, perimeter, polygon, Z levels) is derived from those triangles.

pub mod graph;
pub mod repair;

pub use graph::RegionGraph;
pub use repair::{RepairOutcome, RepairSummary, close_region, close_isolated_regions};

use crate::errors::{MeshError, MeshResult};
use crate::float_types::{Real, xy_key};
use crate::mesh::complete::find_closeable_face;
use crate::mesh::{EdgeKey, EdgeKind, MeshFace, SliceMesh};
use geo::{Contains, Coord, LineString, Polygon, TriangulateSpade};
use hashbrown::HashMap;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegionKind {
    /// Same-level faces outside the polygons of the other level.
    Exposed,
    /// Same-level faces spanning a hole ring.
    Hole,
    /// Same-level faces spanning a concave notch of one polygon.
    Invagination,
    /// Faces spanning empty space that still need tiling.
    Untiled,
}

impl RegionKind {
    /// Kinds that may be paired across levels in the region graph.
    pub const fn is_valid_pair(self, other: RegionKind) -> bool {
        matches!(
            (self, other),
            (RegionKind::Exposed, RegionKind::Exposed)
                | (RegionKind::Hole | RegionKind::Invagination, RegionKind::Hole | RegionKind::Invagination)
        )
    }
}

/// An immutable set of triangles plus its kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    kind: RegionKind,
    faces: Vec<MeshFace>,
}

impl Region {
    /// Faces are deduplicated by vertex set and kept in key order.
    pub fn new(kind: RegionKind, faces: impl IntoIterator<Item = MeshFace>) -> Self {
        let mut by_key: BTreeMap<[usize; 3], MeshFace> = BTreeMap::new();
        for face in faces {
            by_key.entry(face.key()).or_insert(face);
        }
        Self { kind, faces: by_key.into_values().collect() }
    }

    pub fn kind(&self) -> RegionKind {
        self.kind
    }

    pub fn faces(&self) -> &[MeshFace] {
        &self.faces
    }

    pub fn contains_face(&self, face: &MeshFace) -> bool {
        let key = face.key();
        self.faces.iter().any(|f| f.key() == key)
    }

    /// Vertex ids in ascending order.
    pub fn vertices(&self) -> Vec<usize> {
        self.faces
            .iter()
            .flat_map(|f| f.verts)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Edges used by exactly one region face, in key order.
    pub fn boundary_edges(&self) -> Vec<EdgeKey> {
        let mut counts: BTreeMap<EdgeKey, usize> = BTreeMap::new();
        for face in &self.faces {
            for key in face.edges() {
                *counts.entry(key).or_default() += 1;
            }
        }
        counts.into_iter().filter(|(_, n)| *n == 1).map(|(k, _)| k).collect()
    }

    /// Boundary vertices in order around the region.
    ///
    /// The loop is grown from the first boundary edge at whichever end a remaining
    /// edge touches. A boundary made of several loops yields the first one only.
    pub fn perimeter(&self) -> Vec<usize> {
        let mut remaining = self.boundary_edges();
        if remaining.is_empty() {
            return Vec::new();
        }
        let first = remaining.remove(0);
        let mut ordered = VecDeque::from([first.a, first.b]);
        while !remaining.is_empty() {
            let (Some(&head), Some(&tail)) = (ordered.front(), ordered.back()) else { break };
            let Some(pos) =
                remaining.iter().position(|e| e.contains(tail) || e.contains(head))
            else {
                break;
            };
            let edge = remaining.remove(pos);
            if edge.contains(tail) {
                ordered.push_back(edge.opposite(tail));
            } else {
                ordered.push_front(edge.opposite(head));
            }
        }
        if ordered.len() > 1 && ordered.front() == ordered.back() {
            ordered.pop_back();
        }
        ordered.into()
    }

    /// The perimeter as a polygon in the XY plane.
    pub fn polygon(&self, mesh: &SliceMesh) -> Polygon<Real> {
        let ring: Vec<Coord<Real>> = self.perimeter().into_iter().map(|v| mesh.xy(v)).collect();
        Polygon::new(LineString::from(ring), vec![])
    }

    /// Distinct Z values of the region vertices, as ordered bit patterns.
    pub fn z_levels(&self, mesh: &SliceMesh) -> BTreeSet<u64> {
        self.vertices().into_iter().map(|v| (mesh.position(v).z + 0.0).to_bits()).collect()
    }

    /// `true` unless a polygon on a level the region does not touch contains it.
    pub fn is_exposed(&self, mesh: &SliceMesh) -> bool {
        let levels = self.z_levels(mesh);
        let polygon = self.polygon(mesh);
        let contours = mesh.contours();
        !(0..contours.len())
            .filter(|&p| !levels.contains(&(contours.z(p) + 0.0).to_bits()))
            .any(|p| contours.polygon(p).contains(&polygon))
    }
}

#[derive(Debug, Default)]
struct EdgeCounts {
    valid: usize,
    untiled: usize,
    flat: usize,
    flipped: usize,
    hole: usize,
    invagination: usize,
    contour: usize,
}

fn edge_counts(mesh: &SliceMesh, face: &MeshFace) -> EdgeCounts {
    let mut counts = EdgeCounts::default();
    for key in face.edges() {
        let Some(edge) = mesh.edge_by_key(key) else { continue };
        let class = edge.class;
        if class.is_valid() {
            counts.valid += 1;
        } else if class.flipped {
            counts.flipped += 1;
        }
        match class.kind {
            EdgeKind::Untiled => counts.untiled += 1,
            EdgeKind::Flat => counts.flat += 1,
            EdgeKind::Hole => counts.hole += 1,
            EdgeKind::Invagination => counts.invagination += 1,
            EdgeKind::Contour => counts.contour += 1,
            _ => {}
        }
    }
    counts
}

fn same_z(mesh: &SliceMesh, face: &MeshFace) -> Option<u64> {
    let [a, b, c] = face.verts.map(|v| (mesh.position(v).z + 0.0).to_bits());
    (a == b && b == c).then_some(a)
}

/// The region kind a face seeds, if any.
///
/// Untiled is tested first and does not need a single Z level; the other kinds do.
pub fn face_region_kind(mesh: &SliceMesh, face: &MeshFace) -> Option<RegionKind> {
    let n = edge_counts(mesh, face);
    if n.untiled > 0 && n.valid >= 1 {
        return Some(RegionKind::Untiled);
    }
    same_z(mesh, face)?;
    if n.flat + n.flipped > 0 && n.valid <= 1 && n.flat + n.valid + n.flipped == 3 {
        Some(RegionKind::Exposed)
    } else if n.hole > 0 && n.valid <= 1 && n.hole + n.valid == 3 {
        Some(RegionKind::Hole)
    } else if n.invagination > 0
        && (n.contour == 2 || n.valid <= 1)
        && n.invagination + n.valid == 3
    {
        Some(RegionKind::Invagination)
    } else {
        None
    }
}

/// Breadth-first fill from `seed` over faces of the same kind.
///
/// The fill never crosses contour edges. For every kind but Untiled the faces must
/// also share the seed's Z level. Visited faces are recorded in `assigned`.
fn flood_fill(
    mesh: &SliceMesh,
    seed: usize,
    kind: RegionKind,
    assigned: &mut BTreeSet<usize>,
) -> Vec<usize> {
    let level = mesh.face(seed).and_then(|f| same_z(mesh, f));
    let mut members = Vec::new();
    let mut queue = VecDeque::from([seed]);
    assigned.insert(seed);
    while let Some(id) = queue.pop_front() {
        let Some(face) = mesh.face(id) else { continue };
        members.push(id);
        for key in face.edges() {
            let Some(edge) = mesh.edge_by_key(key) else { continue };
            if edge.class.kind == EdgeKind::Contour {
                continue;
            }
            for &next in edge.faces() {
                if assigned.contains(&next) {
                    continue;
                }
                let Some(other) = mesh.face(next) else { continue };
                if face_region_kind(mesh, other) != Some(kind) {
                    continue;
                }
                if kind != RegionKind::Untiled && same_z(mesh, other) != level {
                    continue;
                }
                assigned.insert(next);
                queue.push_back(next);
            }
        }
    }
    members
}

/// An invagination region may expose at most one non-contour edge to the rest of the
/// mesh. Two or more mean the faces bridge two parts of one polygon.
fn is_valid_invagination(mesh: &SliceMesh, members: &BTreeSet<usize>) -> bool {
    let edges: BTreeSet<EdgeKey> =
        members.iter().filter_map(|&id| mesh.face(id)).flat_map(|f| f.edges()).collect();
    let exposed = edges
        .iter()
        .filter_map(|&key| mesh.edge_by_key(key))
        .filter(|e| e.class.kind != EdgeKind::Contour)
        .filter(|e| e.faces().len() == 1 || e.faces().iter().any(|f| !members.contains(f)))
        .count();
    exposed <= 1
}

/// Group the current faces into regions.
///
/// Faces are visited in id order. Each face ends up in at most one region. An
/// invagination that turns out to be a bridge is discarded but its faces stay marked.
pub fn detect_regions(mesh: &SliceMesh) -> Vec<Region> {
    let mut assigned = BTreeSet::new();
    let mut regions = Vec::new();
    let ids: Vec<usize> = mesh.faces().map(|(id, _)| id).collect();
    for id in ids {
        if assigned.contains(&id) {
            continue;
        }
        let Some(face) = mesh.face(id) else { continue };
        let Some(kind) = face_region_kind(mesh, face) else { continue };
        let members: BTreeSet<usize> = flood_fill(mesh, id, kind, &mut assigned).into_iter().collect();
        if kind == RegionKind::Invagination && !is_valid_invagination(mesh, &members) {
            trace!(faces = members.len(), "bridge rejected");
            continue;
        }
        regions.push(Region::new(kind, members.iter().filter_map(|&f| mesh.face(f).copied())));
    }
    debug!(regions = regions.len(), "region detection");
    regions
}

/// Triangulate a closed loop of vertices that has no faces yet.
///
/// Loops of three give one face. Loops of four are split after the first corresponding
/// edge found along the loop, or after the first edge when there is none. Longer loops
/// drop repeated XY positions and are triangulated as a polygon.
pub fn perimeter_to_faces(mesh: &SliceMesh, path: &[usize]) -> MeshResult<Vec<MeshFace>> {
    match path.len() {
        0..=2 => Ok(Vec::new()),
        3 => Ok(vec![MeshFace::new([path[0], path[1], path[2]])]),
        4 => {
            let n = path.len();
            let i = (0..n)
                .find(|&i| {
                    mesh.edge(path[i], path[(i + 1) % n])
                        .is_some_and(|e| e.class.kind == EdgeKind::Corresponding)
                })
                .unwrap_or(0);
            let (prev, a, b, next) = (path[(i + n - 1) % n], path[i], path[(i + 1) % n], path[(i + 2) % n]);
            Ok(vec![MeshFace::new([prev, a, b]), MeshFace::new([a, b, next])])
        }
        _ => {
            let mut by_xy: HashMap<(u64, u64), usize> = HashMap::new();
            let mut cleaned = Vec::new();
            for &v in path {
                let p = mesh.xy(v);
                if !by_xy.contains_key(&xy_key(p.x, p.y)) {
                    by_xy.insert(xy_key(p.x, p.y), v);
                    cleaned.push(v);
                }
            }
            if cleaned.len() <= 2 {
                return Ok(Vec::new());
            }
            if cleaned.len() == 3 {
                return Ok(vec![MeshFace::new([cleaned[0], cleaned[1], cleaned[2]])]);
            }
            let ring: Vec<Coord<Real>> = cleaned.iter().map(|&v| mesh.xy(v)).collect();
            let polygon = Polygon::new(LineString::from(ring), vec![]);
            let triangles = polygon
                .constrained_triangulation(Default::default())
                .map_err(|e| MeshError::Triangulation(format!("{e:?}")))?;
            Ok(triangles
                .into_iter()
                .filter_map(|t| {
                    let [a, b, c] = [t.0, t.1, t.2].map(|p| by_xy.get(&xy_key(p.x, p.y)).copied());
                    Some(MeshFace::new([a?, b?, c?]))
                })
                .collect())
        }
    }
}

/// Turn the open perimeters around still-incomplete vertices into untiled regions.
///
/// Each vertex is searched once; every vertex of a loop found is considered handled.
/// The search depth is bounded by twice the length of the vertex's ring.
pub fn second_pass_regions(mesh: &mut SliceMesh, incomplete: &[usize]) -> MeshResult<Vec<Region>> {
    let mut unassigned: BTreeSet<usize> =
        incomplete.iter().copied().filter(|&v| !mesh.update_face_complete(v)).collect();
    let mut regions = Vec::new();
    while let Some(v) = unassigned.pop_first() {
        let bound = mesh.vertex(v).origin.contour().map_or(0, |index| 2 * index.ring_len);
        let Some(path) = find_closeable_face(mesh, v, bound.max(3)) else {
            continue;
        };
        for p in &path {
            unassigned.remove(p);
        }
        let faces = perimeter_to_faces(mesh, &path)?;
        if faces.is_empty() {
            continue;
        }
        regions.push(Region::new(RegionKind::Untiled, faces));
    }
    debug!(regions = regions.len(), "second pass regions");
    Ok(regions)
}
