//! Mesh vertices and where they came from.

use crate::contour::ContourIndex;
use crate::float_types::Real;
use crate::mesh::edge::EdgeKey;
use nalgebra::{Point3, Vector3};

/// Identifies a synthesized skeleton point: node `node` of skeleton `skeleton`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MedialAxisIndex {
    pub skeleton: usize,
    pub node: usize,
}

/// Every vertex comes from exactly one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexOrigin {
    /// A vertex of an input polygon ring.
    Contour(ContourIndex),
    /// A point added while closing a region or capping an end.
    MedialAxis(MedialAxisIndex),
}

impl VertexOrigin {
    pub const fn contour(&self) -> Option<ContourIndex> {
        match self {
            VertexOrigin::Contour(index) => Some(*index),
            VertexOrigin::MedialAxis(_) => None,
        }
    }

    pub const fn is_medial_axis(&self) -> bool {
        matches!(self, VertexOrigin::MedialAxis(_))
    }
}

#[derive(Debug, Clone)]
pub struct MeshVertex {
    pub position: Point3<Real>,
    pub normal: Vector3<Real>,
    pub origin: VertexOrigin,
    /// Vertex on the other level with the identical XY position.
    pub corresponding: Option<usize>,
    pub(crate) faces_complete: bool,
    pub(crate) edges: Vec<EdgeKey>,
}

impl MeshVertex {
    pub fn new(position: Point3<Real>, origin: VertexOrigin) -> Self {
        Self {
            position,
            normal: Vector3::zeros(),
            origin,
            corresponding: None,
            // skeleton vertices have no ring neighbours to walk between
            faces_complete: origin.is_medial_axis(),
            edges: Vec::new(),
        }
    }

    /// Cached result of the last successful face completeness test.
    #[inline]
    pub const fn faces_complete(&self) -> bool {
        self.faces_complete
    }

    /// Keys of incident edges.
    pub fn edges(&self) -> &[EdgeKey] {
        &self.edges
    }

    #[inline]
    pub fn xy(&self) -> geo::Coord<Real> {
        geo::Coord { x: self.position.x, y: self.position.y }
    }
}
