//! Approximate medial axis of a polygon and triangulation around it.
//!
//! The polygon is triangulated with its rings as constraints. Every interior edge whose
//! midpoint lies inside the polygon contributes a skeleton node at that midpoint, and
//! nodes are linked through the triangles between them: to the midpoint of the single
//! other interior edge when one exists and the link stays inside, otherwise to the
//! triangle centroid.

use crate::contour::geometry::{contains, midpoint, segment_intersects_boundary};
use crate::errors::{MeshError, MeshResult};
use crate::float_types::{Real, xy_key};
use crate::mesh::SliceMesh;
use geo::{Centroid, Coord, Line, Polygon, Translate, TriangulateSpade};
use hashbrown::{HashMap, HashSet};
use spade::{ConstrainedDelaunayTriangulation, Point2, Triangulation};
use std::collections::BTreeSet;

type SegmentKey = ((u64, u64), (u64, u64));

fn segment_key(a: Coord<Real>, b: Coord<Real>) -> SegmentKey {
    let (ka, kb) = (xy_key(a.x, a.y), xy_key(b.x, b.y));
    if ka <= kb { (ka, kb) } else { (kb, ka) }
}

/// Skeleton nodes and the links between them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MedialAxis {
    pub nodes: Vec<Coord<Real>>,
    pub edges: BTreeSet<(usize, usize)>,
}

impl MedialAxis {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&mut self, lookup: &mut HashMap<(u64, u64), usize>, p: Coord<Real>) -> usize {
        *lookup.entry(xy_key(p.x, p.y)).or_insert_with(|| {
            self.nodes.push(p);
            self.nodes.len() - 1
        })
    }

    fn link(&mut self, a: usize, b: usize) {
        if a != b {
            self.edges.insert((a.min(b), a.max(b)));
        }
    }
}

/// Approximate the medial axis of `polygon`.
///
/// The work happens on a copy translated to the polygon centroid; the returned nodes
/// are in the input frame. A polygon with no interior edges yields an empty axis.
pub fn approximate_medial_axis(polygon: &Polygon<Real>) -> MeshResult<MedialAxis> {
    let Some(center) = polygon.centroid() else {
        return Ok(MedialAxis::default());
    };
    let shape = polygon.translate(-center.x(), -center.y());
    let triangles = shape
        .constrained_triangulation(Default::default())
        .map_err(|e| MeshError::Triangulation(format!("{e:?}")))?;

    let boundary: HashSet<SegmentKey> = std::iter::once(shape.exterior())
        .chain(shape.interiors())
        .flat_map(|ring| ring.lines().map(|l| segment_key(l.start, l.end)))
        .collect();

    let corners: Vec<[Coord<Real>; 3]> = triangles.iter().map(|t| [t.0, t.1, t.2]).collect();
    let mut adjacent: HashMap<SegmentKey, Vec<usize>> = HashMap::new();
    for (t, [a, b, c]) in corners.iter().enumerate() {
        for (p, q) in [(a, b), (b, c), (c, a)] {
            adjacent.entry(segment_key(*p, *q)).or_default().push(t);
        }
    }
    let is_interior = |p: Coord<Real>, q: Coord<Real>| !boundary.contains(&segment_key(p, q));

    let mut axis = MedialAxis::default();
    let mut lookup = HashMap::new();
    let mut visited = HashSet::new();
    for [a, b, c] in &corners {
        for (p, q) in [(*a, *b), (*b, *c), (*c, *a)] {
            let key = segment_key(p, q);
            if !visited.insert(key) || !is_interior(p, q) {
                continue;
            }
            let mid = midpoint(p, q);
            if !contains(&shape, mid) {
                continue;
            }
            let node = axis.node(&mut lookup, mid);

            for &t in adjacent.get(&key).into_iter().flatten() {
                let [ta, tb, tc] = corners[t];
                let others: Vec<(Coord<Real>, Coord<Real>)> = [(ta, tb), (tb, tc), (tc, ta)]
                    .into_iter()
                    .filter(|(x, y)| segment_key(*x, *y) != key && is_interior(*x, *y))
                    .collect();
                let centroid = Coord {
                    x: (ta.x + tb.x + tc.x) / 3.0,
                    y: (ta.y + tb.y + tc.y) / 3.0,
                };
                let target = match others[..] {
                    [(x, y)] => {
                        let next = midpoint(x, y);
                        let link = Line::new(mid, next);
                        if !segment_intersects_boundary(&shape, link) && contains(&shape, next) {
                            next
                        } else {
                            centroid
                        }
                    }
                    _ => centroid,
                };
                let other = axis.node(&mut lookup, target);
                axis.link(node, other);
            }
        }
    }

    for p in &mut axis.nodes {
        p.x += center.x();
        p.y += center.y();
    }
    Ok(axis)
}

/// Triangulate closed rings of mesh vertices together with interior mesh vertices.
///
/// Ring edges are constraints. Only triangles whose centroid lies strictly inside
/// `boundary` are returned. Points sharing an XY position map to the first vertex
/// inserted there.
pub fn triangulate_region(
    mesh: &SliceMesh,
    rings: &[Vec<usize>],
    interior: &[usize],
    boundary: &Polygon<Real>,
) -> MeshResult<Vec<[usize; 3]>> {
    let all: Vec<usize> = rings.iter().flatten().chain(interior).copied().collect();
    if all.len() < 3 {
        return Ok(Vec::new());
    }
    let n = all.len() as Real;
    let cx = all.iter().map(|&v| mesh.xy(v).x).sum::<Real>() / n;
    let cy = all.iter().map(|&v| mesh.xy(v).y).sum::<Real>() / n;

    let mut cdt = ConstrainedDelaunayTriangulation::<Point2<Real>>::new();
    let mut handle_vertex: HashMap<usize, usize> = HashMap::new();
    let mut vertex_handle = HashMap::new();
    for &v in &all {
        let p = mesh.xy(v);
        let handle = cdt.insert(Point2::new(p.x - cx, p.y - cy))?;
        handle_vertex.entry(handle.index()).or_insert(v);
        vertex_handle.insert(v, handle);
    }
    for ring in rings {
        for i in 0..ring.len() {
            let (a, b) = (ring[i], ring[(i + 1) % ring.len()]);
            let (Some(&ha), Some(&hb)) = (vertex_handle.get(&a), vertex_handle.get(&b)) else {
                continue;
            };
            if ha != hb && cdt.can_add_constraint(ha, hb) {
                cdt.add_constraint(ha, hb);
            }
        }
    }

    let mut out = Vec::new();
    for face in cdt.inner_faces() {
        let positions = face.positions();
        let centroid = Coord {
            x: (positions[0].x + positions[1].x + positions[2].x) / 3.0 + cx,
            y: (positions[0].y + positions[1].y + positions[2].y) / 3.0 + cy,
        };
        if !contains(boundary, centroid) {
            continue;
        }
        let verts = face.vertices().map(|h| handle_vertex.get(&h.fix().index()).copied());
        if let [Some(a), Some(b), Some(c)] = verts {
            if a != b && b != c && a != c {
                out.push([a, b, c]);
            }
        }
    }
    Ok(out)
}
