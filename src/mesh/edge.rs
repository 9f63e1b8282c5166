//! Mesh edges and their classification.

/// Unordered vertex pair, stored smaller index first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub a: usize,
    pub b: usize,
}

impl EdgeKey {
    #[inline]
    pub const fn new(a: usize, b: usize) -> Self {
        if a <= b { Self { a, b } } else { Self { a: b, b: a } }
    }

    #[inline]
    pub const fn contains(&self, v: usize) -> bool {
        self.a == v || self.b == v
    }

    /// The endpoint that is not `v`.
    #[inline]
    pub const fn opposite(&self, v: usize) -> usize {
        if self.a == v { self.b } else { self.a }
    }
}

/// What an edge is, geometrically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeKind {
    /// Not classified yet.
    Unknown,
    /// Part of a polygon ring.
    Contour,
    /// Crosses between levels on the outside of the object.
    Surface,
    /// Added while closing, not derived from the input.
    Artificial,
    /// Joins two vertices with identical XY on different levels.
    Corresponding,
    /// Joins two skeleton vertices.
    MedialAxis,
    /// Joins a contour vertex to a skeleton vertex.
    ContourToMedialAxis,
    /// Interior material on both sides.
    Internal,
    /// Spans empty space. May become part of the surface later.
    FlyingEdge,
    /// Cannot be part of the surface.
    Invalid,
    /// Spans empty space that another polygon occludes.
    Untiled,
    /// Joins two vertices of one polygon across its interior.
    Flat,
    /// Joins two vertices of the same hole ring.
    Hole,
    /// Joins two exterior vertices of one polygon outside of it.
    Invagination,
}

impl EdgeKind {
    /// Kinds that may appear in the final surface.
    pub const fn is_valid(self) -> bool {
        matches!(
            self,
            EdgeKind::Contour
                | EdgeKind::Surface
                | EdgeKind::Artificial
                | EdgeKind::Corresponding
                | EdgeKind::MedialAxis
                | EdgeKind::ContourToMedialAxis
        )
    }
}

/// An edge kind plus the orientation modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeClass {
    pub kind: EdgeKind,
    /// The endpoints' contours run in incompatible directions.
    pub flipped: bool,
}

impl EdgeClass {
    pub const UNKNOWN: EdgeClass = EdgeClass::new(EdgeKind::Unknown);

    pub const fn new(kind: EdgeKind) -> Self {
        Self { kind, flipped: false }
    }

    pub const fn with_flipped(kind: EdgeKind, flipped: bool) -> Self {
        Self { kind, flipped }
    }

    /// Valid kind and not demoted by the orientation check.
    pub const fn is_valid(&self) -> bool {
        self.kind.is_valid() && !self.flipped
    }

    #[inline]
    pub const fn is(&self, kind: EdgeKind) -> bool {
        !self.flipped && self.kind as u8 == kind as u8
    }
}

impl From<EdgeKind> for EdgeClass {
    fn from(kind: EdgeKind) -> Self {
        EdgeClass::new(kind)
    }
}

#[derive(Debug, Clone)]
pub struct MeshEdge {
    pub key: EdgeKey,
    pub class: EdgeClass,
    pub(crate) faces: Vec<usize>,
}

impl MeshEdge {
    pub fn new(key: EdgeKey, class: EdgeClass) -> Self {
        Self { key, class, faces: Vec::new() }
    }

    /// Ids of incident faces.
    pub fn faces(&self) -> &[usize] {
        &self.faces
    }

    /// Contour edges need one face, every other kind needs two.
    pub fn is_complete(&self) -> bool {
        if self.class.kind == EdgeKind::Contour {
            !self.faces.is_empty()
        } else {
            self.faces.len() >= 2
        }
    }

    /// Two faces: no further face may use this edge.
    pub fn is_full(&self) -> bool {
        self.faces.len() >= 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flipped_edges_are_not_valid() {
        assert!(EdgeClass::new(EdgeKind::Surface).is_valid());
        assert!(!EdgeClass::with_flipped(EdgeKind::Surface, true).is_valid());
        assert!(!EdgeClass::new(EdgeKind::FlyingEdge).is_valid());
        assert!(!EdgeClass::with_flipped(EdgeKind::Flat, true).is(EdgeKind::Flat));
    }

    #[test]
    fn contour_edges_need_one_face() {
        let mut edge = MeshEdge::new(EdgeKey::new(3, 1), EdgeKind::Contour.into());
        assert_eq!(edge.key, EdgeKey { a: 1, b: 3 });
        assert!(!edge.is_complete());
        edge.faces.push(0);
        assert!(edge.is_complete());
        edge.class = EdgeKind::Surface.into();
        assert!(!edge.is_complete());
    }
}
