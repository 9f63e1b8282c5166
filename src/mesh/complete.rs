//! Face completion.
//!
//! Once enough edges surround a vertex, the loops they form can be closed into faces.
//! The search walks only edges that still need faces: contour edges with none, every
//! other kind with fewer than two.

use crate::classify::{classify_mesh_edge, classify_with_orientation};
use crate::contour::geometry::cross;
use crate::errors::MeshResult;
use crate::float_types::Real;
use crate::mesh::{EdgeKey, EdgeKind, SliceMesh};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, trace};

/// Longest loop the face search closes by default.
pub const MAX_FACE_VERTICES: usize = 4;

struct Frame {
    current: usize,
    via: EdgeKey,
    path: Vec<usize>,
    checked: BTreeSet<EdgeKey>,
}

/// Edges at `v` that still need a face.
fn open_edges(mesh: &SliceMesh, v: usize) -> Vec<EdgeKey> {
    mesh.edges_of(v).filter(|e| !e.is_complete()).map(|e| e.key).collect()
}

/// Sum of the 3D edge lengths around a closed loop.
pub fn path_distance(mesh: &SliceMesh, path: &[usize]) -> Real {
    (0..path.len())
        .map(|i| (mesh.position(path[i]) - mesh.position(path[(i + 1) % path.len()])).norm())
        .sum()
}

fn shorter(mesh: &SliceMesh, best: Option<Vec<usize>>, found: Vec<usize>) -> Option<Vec<usize>> {
    match best {
        None => Some(found),
        Some(best) if found.len() < best.len() => Some(found),
        Some(best)
            if found.len() == best.len()
                && path_distance(mesh, &found) < path_distance(mesh, &best) =>
        {
            Some(found)
        }
        best => best,
    }
}

/// Depth-first search for a loop that starts at `origin`, leaves along `start` and
/// returns to `origin` over open edges, visiting at most `max_len` vertices.
///
/// A partial path whose last three vertices already form a face is abandoned.
/// Corresponding edges are explored first.
pub fn find_loop_from_edge(
    mesh: &SliceMesh,
    origin: usize,
    start: EdgeKey,
    max_len: usize,
) -> Option<Vec<usize>> {
    find_loop_where(mesh, origin, start, max_len, |_, _| true)
}

/// [`find_loop_from_edge`] restricted to loops `accept` allows.
fn find_loop_where<F>(
    mesh: &SliceMesh,
    origin: usize,
    start: EdgeKey,
    max_len: usize,
    accept: F,
) -> Option<Vec<usize>>
where
    F: Fn(&SliceMesh, &[usize]) -> bool,
{
    let mut best = None;
    let mut stack = vec![Frame {
        current: start.opposite(origin),
        via: start,
        path: vec![origin],
        checked: BTreeSet::new(),
    }];

    while let Some(mut frame) = stack.pop() {
        frame.checked.insert(frame.via);
        if frame.current == origin {
            if frame.path.len() >= 3 && accept(mesh, &frame.path) {
                best = shorter(mesh, best, frame.path);
            }
            continue;
        }
        if frame.path.contains(&frame.current) || frame.path.len() >= max_len {
            continue;
        }
        if let [.., a, b] = frame.path[..] {
            if mesh.contains_face([a, b, frame.current]) {
                continue;
            }
        }
        frame.path.push(frame.current);

        let mut next: Vec<(bool, EdgeKey)> = mesh
            .edges_of(frame.current)
            .filter(|e| !frame.checked.contains(&e.key) && !e.is_complete())
            .map(|e| (e.class.kind == EdgeKind::Corresponding, e.key))
            .collect();
        // corresponding edges sort last so they are popped first
        next.sort();
        for (_, key) in next {
            stack.push(Frame {
                current: key.opposite(frame.current),
                via: key,
                path: frame.path.clone(),
                checked: frame.checked.clone(),
            });
        }
    }
    best
}

/// Shortest loop of open edges through `origin`, ties broken by perimeter.
pub fn find_closeable_face(mesh: &SliceMesh, origin: usize, max_len: usize) -> Option<Vec<usize>> {
    open_edges(mesh, origin)
        .into_iter()
        .filter_map(|start| find_loop_from_edge(mesh, origin, start, max_len))
        .fold(None, |best, found| shorter(mesh, best, found))
}

/// Shortest loop through `origin` that [`loop_triangles`] can split.
pub fn find_fillable_face(mesh: &SliceMesh, origin: usize, max_len: usize) -> Option<Vec<usize>> {
    open_edges(mesh, origin)
        .into_iter()
        .filter_map(|start| find_fillable_from_edge(mesh, origin, start, max_len))
        .fold(None, |best, found| shorter(mesh, best, found))
}

fn find_fillable_from_edge(
    mesh: &SliceMesh,
    origin: usize,
    start: EdgeKey,
    max_len: usize,
) -> Option<Vec<usize>> {
    find_loop_where(mesh, origin, start, max_len, |mesh, path| loop_triangles(mesh, path).is_some())
}

/// Close every triangle that existing open edges already outline around `vertices`
/// (all vertices when `None`). Returns the number of faces added.
pub fn close_faces(mesh: &mut SliceMesh, vertices: Option<&[usize]>) -> usize {
    let targets: Vec<usize> = match vertices {
        Some(vertices) => vertices.to_vec(),
        None => (0..mesh.vertex_count()).collect(),
    };
    let mut added = 0;
    for v in targets {
        for start in open_edges(mesh, v) {
            let still_open = mesh.edge_by_key(start).is_some_and(|e| !e.is_complete());
            if !still_open {
                continue;
            }
            if let Some(path) = find_loop_from_edge(mesh, v, start, MAX_FACE_VERTICES) {
                if let [a, b, c] = path[..] {
                    if mesh.add_face([a, b, c]).is_some() {
                        added += 1;
                    }
                }
            }
        }
    }
    added
}

/// Classify any edge created by the given faces.
pub(crate) fn classify_face_edges(mesh: &mut SliceMesh, faces: &[usize]) -> MeshResult<()> {
    let keys: Vec<EdgeKey> = faces
        .iter()
        .filter_map(|&id| mesh.face(id).map(|f| f.edges()))
        .flatten()
        .filter(|key| mesh.edge_by_key(*key).is_some_and(|e| e.class.kind == EdgeKind::Unknown))
        .collect();
    for key in keys {
        let class = classify_mesh_edge(mesh, key.a, key.b)?;
        mesh.set_edge_class(key, class);
    }
    Ok(())
}

/// `true` when a loop may use `a - b` as a new edge: it is missing or still bare, and
/// its kind may appear in the surface.
fn diagonal_is_valid(mesh: &SliceMesh, a: usize, b: usize) -> bool {
    match mesh.edge(a, b) {
        Some(edge) => edge.faces().is_empty() && edge.class.kind.is_valid(),
        None => classify_mesh_edge(mesh, a, b).is_ok_and(|class| class.kind.is_valid()),
    }
}

fn split_fits(mesh: &SliceMesh, triangles: &[[usize; 3]]) -> bool {
    triangles.iter().all(|&tri| !mesh.contains_face(tri) && mesh.face_fits(tri))
}

/// Triangles that close `path`, or `None` when no split uses valid diagonals only and
/// keeps every edge within its face allowance.
///
/// A quad is anchored at the vertex that sits alone on its Z level, giving (O,A,B) and
/// (O,B,C). With two vertices per level the shorter diagonal is tried first, then the
/// other one. Longer loops are fanned from their first vertex.
pub fn loop_triangles(mesh: &SliceMesh, path: &[usize]) -> Option<Vec<[usize; 3]>> {
    let n = path.len();
    let sides_valid = (0..n).all(|i| {
        let (a, b) = (path[i], path[(i + 1) % n]);
        mesh.contains_edge(a, b) || diagonal_is_valid(mesh, a, b)
    });
    if !sides_valid {
        return None;
    }
    let candidates: Vec<(Vec<(usize, usize)>, Vec<[usize; 3]>)> = match n {
        0..=2 => return None,
        3 => vec![(Vec::new(), vec![[path[0], path[1], path[2]]])],
        4 => {
            let mut per_level: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
            for (i, &v) in path.iter().enumerate() {
                per_level.entry((mesh.position(v).z + 0.0).to_bits()).or_default().push(i);
            }
            match per_level.values().find(|members| members.len() == 1) {
                Some(alone) if per_level.len() > 1 => {
                    let o = path[alone[0]];
                    let [a, b, c] = [1, 2, 3].map(|k| path[(alone[0] + k) % 4]);
                    vec![(vec![(o, b)], vec![[o, a, b], [o, b, c]])]
                }
                _ => {
                    let [a, b, c, d] = [path[0], path[1], path[2], path[3]];
                    let ac = (vec![(a, c)], vec![[a, b, c], [a, c, d]]);
                    let bd = (vec![(b, d)], vec![[a, b, d], [b, c, d]]);
                    let ac_len = (mesh.position(a) - mesh.position(c)).norm();
                    let bd_len = (mesh.position(b) - mesh.position(d)).norm();
                    if ac_len < bd_len { vec![ac, bd] } else { vec![bd, ac] }
                }
            }
        }
        _ => vec![(
            (2..n - 1).map(|i| (path[0], path[i])).collect(),
            (1..n - 1).map(|i| [path[0], path[i], path[i + 1]]).collect(),
        )],
    };
    candidates
        .into_iter()
        .find(|(diagonals, triangles)| {
            diagonals.iter().all(|&(a, b)| diagonal_is_valid(mesh, a, b))
                && split_fits(mesh, triangles)
        })
        .map(|(_, triangles)| triangles)
}

/// Classify the new edges of faces that close a cap or a region.
///
/// The closing triangulation stays inside its outline, so an edge that classifies as
/// unusable there becomes [`EdgeKind::Artificial`].
pub(crate) fn classify_closing_edges(mesh: &mut SliceMesh, faces: &[usize]) -> MeshResult<()> {
    let keys: Vec<EdgeKey> = faces
        .iter()
        .filter_map(|&id| mesh.face(id).map(|f| f.edges()))
        .flatten()
        .filter(|key| mesh.edge_by_key(*key).is_some_and(|e| e.class.kind == EdgeKind::Unknown))
        .collect();
    for key in keys {
        let class = classify_mesh_edge(mesh, key.a, key.b)?;
        let class = if class.kind.is_valid() { class } else { EdgeKind::Artificial.into() };
        mesh.set_edge_class(key, class);
    }
    Ok(())
}

/// Add a closed loop as triangles split by [`loop_triangles`]. A loop with no usable
/// split adds nothing.
pub fn add_loop(mesh: &mut SliceMesh, path: &[usize]) -> MeshResult<Vec<usize>> {
    let Some(triangles) = loop_triangles(mesh, path) else {
        trace!(?path, "loop has no valid split");
        return Ok(Vec::new());
    };
    let ids: Vec<usize> = triangles.into_iter().filter_map(|tri| mesh.add_face(tri)).collect();
    classify_face_edges(mesh, &ids)?;
    Ok(ids)
}

/// Close faces around face-incomplete vertices until no more loops can be closed.
///
/// A vertex that gains a face but is still incomplete is revisited immediately.
/// Returns the number of faces added.
pub fn first_pass_face_generation(
    mesh: &mut SliceMesh,
    vertices: Option<Vec<usize>>,
    max_len: usize,
) -> MeshResult<usize> {
    let mut queue: VecDeque<usize> = match vertices {
        Some(vertices) => vertices.into(),
        None => mesh.incomplete_vertices().into(),
    };
    let mut added = 0;
    while let Some(v) = queue.pop_front() {
        let Some(path) = find_fillable_face(mesh, v, max_len) else {
            continue;
        };
        let ids = add_loop(mesh, &path)?;
        if ids.is_empty() {
            continue;
        }
        added += ids.len();
        trace!(vertex = v, faces = ids.len(), "closed loop");
        if !mesh.update_face_complete(v) {
            queue.push_front(v);
        }
    }
    debug!(added, "face generation");
    Ok(added)
}

/// `true` when some vertex other than the corners lies strictly inside the XY
/// projection of the triangle.
fn triangle_contains_vertices(mesh: &SliceMesh, [a, b, c]: [usize; 3]) -> bool {
    let (pa, pb, pc) = (mesh.xy(a), mesh.xy(b), mesh.xy(c));
    let area = cross(pa, pb, pc);
    if area == 0.0 {
        return false;
    }
    (0..mesh.vertex_count()).filter(|v| ![a, b, c].contains(v)).any(|v| {
        let p = mesh.xy(v);
        let s = area.signum();
        cross(pa, pb, p) * s > 0.0 && cross(pb, pc, p) * s > 0.0 && cross(pc, pa, p) * s > 0.0
    })
}

/// Give corresponding edges their missing faces.
///
/// An existing loop of open edges is used when there is one. Otherwise the four
/// pairings of ring neighbours (next/next, next/prev, prev/prev, prev/next) are tried;
/// a pairing whose edge is valid, or merely flipped, contributes a pair of faces, the
/// second of which is only added when no other vertex lies inside it. Either face is
/// skipped when one of its new edges would be invalid.
pub fn complete_corresponding_vertex_faces(mesh: &mut SliceMesh) -> MeshResult<usize> {
    let open: Vec<EdgeKey> = mesh
        .edges()
        .filter(|e| e.class.kind == EdgeKind::Corresponding && e.faces().len() < 2)
        .map(|e| e.key)
        .collect();

    let mut added = 0;
    for key in open {
        for v in [key.a, key.b] {
            if mesh.edge_by_key(key).is_none_or(|e| e.faces().len() >= 2) {
                break;
            }
            if mesh.update_face_complete(v) {
                continue;
            }
            let Some(partner) = mesh.vertex(v).corresponding else { continue };

            if let Some(path) = find_fillable_from_edge(mesh, key.a, key, MAX_FACE_VERTICES) {
                added += add_loop(mesh, &path)?.len();
                continue;
            }

            let (Some(vi), Some(pi)) =
                (mesh.vertex(v).origin.contour(), mesh.vertex(partner).origin.contour())
            else {
                continue;
            };
            let pairings = [
                (vi.next(), pi.next()),
                (vi.next(), pi.previous()),
                (vi.previous(), pi.previous()),
                (vi.previous(), pi.next()),
            ];
            let mut found = 0;
            for (own, other) in pairings {
                let class = classify_with_orientation(mesh.contours(), own, other)?;
                if !class.kind.is_valid() {
                    continue;
                }
                let (Some(own_v), Some(other_v)) = (mesh.vertex_for(own), mesh.vertex_for(other))
                else {
                    continue;
                };
                let first = [own_v, v, partner];
                if loop_triangles(mesh, &first).is_none() {
                    continue;
                }
                let mut ids: Vec<usize> = mesh.add_face(first).into_iter().collect();
                let second = [other_v, own_v, partner];
                if !triangle_contains_vertices(mesh, second) {
                    if loop_triangles(mesh, &second).is_some() {
                        ids.extend(mesh.add_face(second));
                    }
                    found += 1;
                }
                classify_face_edges(mesh, &ids)?;
                added += ids.len();
            }
            if found == 1 {
                break;
            }
        }
    }
    debug!(added, "corresponding vertex faces");
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::ContourSet;
    use geo::polygon;

    fn shifted_square(dx: Real) -> geo::Polygon<Real> {
        polygon![
            (x: dx, y: 0.0),
            (x: dx + 2.0, y: 0.0),
            (x: dx + 2.0, y: 2.0),
            (x: dx, y: 2.0),
        ]
    }

    #[test]
    fn finds_triangle_through_open_edges() {
        let contours = ContourSet::new(vec![
            (shifted_square(0.0), 0.0, false),
            (shifted_square(0.25), 1.0, true),
        ])
        .unwrap();
        let mut mesh = SliceMesh::from_contours(contours);
        // lower 0 -> 1 is a ring edge; chords 0-4 and 1-4 close a triangle
        mesh.add_edge(0, 4, EdgeKind::Surface.into());
        mesh.add_edge(1, 4, EdgeKind::Surface.into());
        let path = find_closeable_face(&mesh, 0, MAX_FACE_VERTICES).unwrap();
        assert_eq!(path.len(), 3);
        assert!(path.contains(&1) && path.contains(&4));
        assert_eq!(close_faces(&mut mesh, Some(&[0])), 1);
        assert!(mesh.contains_face([0, 1, 4]));
        assert!(find_loop_from_edge(&mesh, 0, EdgeKey::new(0, 4), 3).is_none());
    }

    #[test]
    fn quads_split_on_a_valid_diagonal() {
        let contours = ContourSet::new(vec![
            (shifted_square(0.0), 0.0, false),
            (shifted_square(0.0), 1.0, true),
        ])
        .unwrap();
        let mut mesh = SliceMesh::from_contours(contours);
        // a wall between two corresponding pairs
        let ids = add_loop(&mut mesh, &[0, 1, 5, 4]).unwrap();
        assert_eq!(ids.len(), 2);
        assert!(mesh.contains_face([0, 1, 4]));
        assert!(mesh.contains_face([1, 5, 4]));
        assert_eq!(mesh.edge(1, 4).unwrap().faces().len(), 2);
        assert!(mesh.edges().all(|e| e.class.kind.is_valid()));
        assert!(add_loop(&mut mesh, &[0, 1, 5, 4]).unwrap().is_empty());
    }

    #[test]
    fn internal_diagonals_leave_the_loop_open() {
        let lower = polygon![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 4.0)];
        let upper = polygon![(x: 1.0, y: 0.5), (x: 5.0, y: 0.5), (x: 5.0, y: 4.5), (x: 1.0, y: 4.5)];
        let contours = ContourSet::new(vec![(lower, 0.0, false), (upper, 1.0, true)]).unwrap();
        let mut mesh = SliceMesh::from_contours(contours);
        for (a, b) in [(2, 7), (1, 4), (2, 6), (1, 5)] {
            mesh.add_edge(a, b, EdgeKind::Surface.into());
        }

        // the lower right side against the upper left side: both diagonals are internal
        assert!(loop_triangles(&mesh, &[1, 2, 7, 4]).is_none());
        assert!(add_loop(&mut mesh, &[1, 2, 7, 4]).unwrap().is_empty());

        // the lower right side against the upper right side splits along 2-5
        let triangles = loop_triangles(&mesh, &[1, 2, 6, 5]).unwrap();
        assert_eq!(triangles, vec![[1, 2, 5], [2, 6, 5]]);
        add_loop(&mut mesh, &[1, 2, 6, 5]).unwrap();
        assert_eq!(mesh.edge(2, 5).unwrap().class.kind, EdgeKind::Surface);
        assert!(mesh.edge(2, 4).is_none());
    }
}
