//! Spatial indices used during chord search.
//!
//! [`ChordIndex`] holds every accepted slice chord as a 2D segment so a candidate can
//! be tested against the chords whose bounding boxes it overlaps. [`LevelIndex`] holds
//! the contour vertices of each level for nearest-candidate queries.

use crate::float_types::Real;
use crate::mesh::{EdgeKey, EdgeKind, SliceMesh};
use crate::contour::geometry::segments_cross;
use geo::{Coord, Line};
use rstar::primitives::{GeomWithData, Line as IndexedLine};
use rstar::{AABB, RTree};

type ChordEntry = GeomWithData<IndexedLine<[Real; 2]>, EdgeKey>;
type VertexEntry = GeomWithData<[Real; 2], usize>;

#[derive(Debug, Clone, Default)]
pub struct ChordIndex {
    tree: RTree<ChordEntry>,
}

impl ChordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the index from the chords already in the mesh.
    ///
    /// Ring edges, closing edges and corresponding edges are not chords.
    pub fn from_mesh(mesh: &SliceMesh) -> Self {
        let entries: Vec<ChordEntry> = mesh
            .edges()
            .filter(|e| {
                !matches!(
                    e.class.kind,
                    EdgeKind::Contour | EdgeKind::Artificial | EdgeKind::Corresponding
                )
            })
            .map(|e| entry(mesh.xy(e.key.a), mesh.xy(e.key.b), e.key))
            .collect();
        Self { tree: RTree::bulk_load(entries) }
    }

    pub fn insert(&mut self, a: Coord<Real>, b: Coord<Real>, key: EdgeKey) {
        self.tree.insert(entry(a, b, key));
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// `true` when `line` properly crosses any indexed chord.
    pub fn crosses(&self, line: Line<Real>) -> bool {
        let envelope = AABB::from_corners([line.start.x, line.start.y], [line.end.x, line.end.y]);
        self.tree.locate_in_envelope_intersecting(&envelope).any(|chord| {
            let geom = chord.geom();
            let existing = Line::new(
                Coord { x: geom.from[0], y: geom.from[1] },
                Coord { x: geom.to[0], y: geom.to[1] },
            );
            segments_cross(existing, line)
        })
    }
}

fn entry(a: Coord<Real>, b: Coord<Real>, key: EdgeKey) -> ChordEntry {
    GeomWithData::new(IndexedLine::new([a.x, a.y], [b.x, b.y]), key)
}

/// Nearest-neighbour trees over the contour vertices of each level.
#[derive(Debug, Clone)]
pub struct LevelIndex {
    upper: RTree<VertexEntry>,
    lower: RTree<VertexEntry>,
}

impl LevelIndex {
    pub fn from_mesh(mesh: &SliceMesh) -> Self {
        let mut upper = Vec::new();
        let mut lower = Vec::new();
        for (v, vertex) in mesh.vertices().iter().enumerate() {
            let point = [vertex.position.x, vertex.position.y];
            match mesh.vertex_is_upper(v) {
                Some(true) => upper.push(GeomWithData::new(point, v)),
                Some(false) => lower.push(GeomWithData::new(point, v)),
                None => {}
            }
        }
        Self { upper: RTree::bulk_load(upper), lower: RTree::bulk_load(lower) }
    }

    /// Vertices of the level opposite to `upper`, nearest to `p` first.
    pub fn nearest_opposite(
        &self,
        upper: bool,
        p: Coord<Real>,
    ) -> impl Iterator<Item = usize> + '_ {
        let tree = if upper { &self.lower } else { &self.upper };
        tree.nearest_neighbor_iter(&[p.x, p.y]).map(|entry| entry.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;

    #[test]
    fn crossing_chords_are_found() {
        let mut index = ChordIndex::new();
        index.insert(coord! { x: 0.0, y: 0.0 }, coord! { x: 2.0, y: 2.0 }, EdgeKey::new(0, 1));
        assert_eq!(index.len(), 1);
        let crossing = Line::new(coord! { x: 0.0, y: 2.0 }, coord! { x: 2.0, y: 0.0 });
        let sharing_endpoint = Line::new(coord! { x: 2.0, y: 2.0 }, coord! { x: 3.0, y: 0.0 });
        let far = Line::new(coord! { x: 5.0, y: 5.0 }, coord! { x: 6.0, y: 5.0 });
        assert!(index.crosses(crossing));
        assert!(!index.crosses(sharing_endpoint));
        assert!(!index.crosses(far));
    }
}
