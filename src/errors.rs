//! Meshing errors

use crate::contour::ContourIndex;

/// Result alias used by every fallible meshing operation.
pub type MeshResult<T> = Result<T, MeshError>;

/// All the possible failures we might encounter while tiling contours
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshError {
    /// A group or contour set without any polygons
    #[error("(EmptyContourSet) No polygons were supplied")]
    EmptyContourSet,

    /// One of the two levels has no polygons
    #[error("(MissingLevel) No polygons on the {} level", if *upper { "upper" } else { "lower" })]
    MissingLevel { upper: bool },

    /// A ring with fewer than three distinct points
    #[error("(DegenerateRing) Ring {ring} of polygon {poly} has only {len} distinct points")]
    DegenerateRing { poly: usize, ring: usize, len: usize },

    /// A pair of contour vertices the edge classifier has no rule for
    #[error("(UnclassifiableEdge) No classification rule covers {a:?} -> {b:?}")]
    UnclassifiableEdge { a: ContourIndex, b: ContourIndex },

    /// The constrained triangulation rejected an input point
    #[error("(Triangulation) {0}")]
    Triangulation(String),

    /// An annotation edge names a node that is not in the graph
    #[error("(UnknownNode) Annotation node {0} does not exist")]
    UnknownNode(u64),

    /// An annotation edge joins two nodes on the same section
    #[error("(FlatGraphEdge) Annotation edge {a} -> {b} does not change Z")]
    FlatGraphEdge { a: u64, b: u64 },

    /// A node was reached both above and below in one meshing group
    #[error("(NodeOnBothLevels) Annotation node {0} is both above and below in one meshing group")]
    NodeOnBothLevels(u64),
}

impl From<spade::InsertionError> for MeshError {
    fn from(err: spade::InsertionError) -> Self {
        MeshError::Triangulation(format!("{err:?}"))
    }
}
