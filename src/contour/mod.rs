//! Contour addressing and the per-group polygon arrays.
//!
//! A [`ContourIndex`] names one boundary vertex: vertex `vertex` of ring `ring`
//! of polygon `poly`. Ring `0` is the exterior ring, ring `k` is interior ring `k - 1`.
//! The ring length travels with the index so that ring-wrapped navigation needs no
//! polygon lookup.
//!
//! A [`ContourSet`] owns the polygons of one meshing group together with their Z level
//! and whether they belong to the upper or the lower level.

pub mod geometry;

use crate::errors::{MeshError, MeshResult};
use crate::float_types::Real;
use geo::orient::{Direction, Orient};
use geo::{Coord, LineString, Polygon, RemoveRepeatedPoints, Simplify};

/// Address of a single vertex on a polygon ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContourIndex {
    pub poly: usize,
    pub ring: usize,
    pub vertex: usize,
    pub ring_len: usize,
}

impl ContourIndex {
    pub const fn new(poly: usize, ring: usize, vertex: usize, ring_len: usize) -> Self {
        Self { poly, ring, vertex, ring_len }
    }

    /// `true` when the vertex lies on an interior (hole) ring.
    #[inline]
    pub const fn is_inner(&self) -> bool {
        self.ring > 0
    }

    /// Index into `Polygon::interiors()` for hole rings.
    #[inline]
    pub const fn inner_ring(&self) -> Option<usize> {
        if self.ring == 0 { None } else { Some(self.ring - 1) }
    }

    /// Next vertex on the ring, wrapping from last to first.
    #[inline]
    pub const fn next(&self) -> Self {
        let vertex = if self.vertex + 1 >= self.ring_len { 0 } else { self.vertex + 1 };
        Self { vertex, ..*self }
    }

    /// Previous vertex on the ring, wrapping from first to last.
    #[inline]
    pub const fn previous(&self) -> Self {
        let vertex = if self.vertex == 0 { self.ring_len - 1 } else { self.vertex - 1 };
        Self { vertex, ..*self }
    }

    #[inline]
    pub const fn same_ring(&self, other: &Self) -> bool {
        self.poly == other.poly && self.ring == other.ring
    }

    /// `true` when both indices sit next to each other on the same ring.
    pub const fn are_adjacent(&self, other: &Self) -> bool {
        if !self.same_ring(other) || self.vertex == other.vertex {
            return false;
        }
        let (lo, hi) = if self.vertex < other.vertex {
            (self.vertex, other.vertex)
        } else {
            (other.vertex, self.vertex)
        };
        hi - lo == 1 || (lo == 0 && hi + 1 == self.ring_len)
    }
}

/// Polygons of one meshing group with their Z level and level membership.
///
/// Rings are normalised on construction: repeated points are removed, exteriors are
/// counter-clockwise and holes clockwise, so material is always on the left of travel.
#[derive(Debug, Clone)]
pub struct ContourSet {
    polygons: Vec<Polygon<Real>>,
    z: Vec<Real>,
    is_upper: Vec<bool>,
    upper: Vec<usize>,
    lower: Vec<usize>,
}

impl ContourSet {
    /// Build a contour set from `(polygon, z, is_upper)` triples.
    ///
    /// Fails when no polygons are given, when either level is empty or when a ring
    /// has fewer than three distinct points.
    pub fn new<I>(entries: I) -> MeshResult<Self>
    where
        I: IntoIterator<Item = (Polygon<Real>, Real, bool)>,
    {
        Self::with_simplification(entries, None)
    }

    /// Same as [`ContourSet::new`], simplifying every polygon first when a tolerance is given.
    pub fn with_simplification<I>(entries: I, tolerance: Option<Real>) -> MeshResult<Self>
    where
        I: IntoIterator<Item = (Polygon<Real>, Real, bool)>,
    {
        let mut polygons = Vec::new();
        let mut z = Vec::new();
        let mut is_upper = Vec::new();

        for (polygon, level_z, upper) in entries {
            let polygon = match tolerance {
                Some(epsilon) if epsilon > 0.0 => polygon.simplify(&epsilon),
                _ => polygon,
            };
            let polygon = polygon.remove_repeated_points().orient(Direction::Default);
            polygons.push(polygon);
            z.push(level_z);
            is_upper.push(upper);
        }

        if polygons.is_empty() {
            return Err(MeshError::EmptyContourSet);
        }

        for (poly, polygon) in polygons.iter().enumerate() {
            let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors().iter());
            for (ring, line) in rings.enumerate() {
                let len = ring_len(line);
                if len < 3 {
                    return Err(MeshError::DegenerateRing { poly, ring, len });
                }
            }
        }

        let upper: Vec<usize> = (0..polygons.len()).filter(|&i| is_upper[i]).collect();
        let lower: Vec<usize> = (0..polygons.len()).filter(|&i| !is_upper[i]).collect();
        if upper.is_empty() {
            return Err(MeshError::MissingLevel { upper: true });
        }
        if lower.is_empty() {
            return Err(MeshError::MissingLevel { upper: false });
        }

        Ok(Self { polygons, z, is_upper, upper, lower })
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn polygons(&self) -> &[Polygon<Real>] {
        &self.polygons
    }

    pub fn polygon(&self, poly: usize) -> &Polygon<Real> {
        &self.polygons[poly]
    }

    pub fn z(&self, poly: usize) -> Real {
        self.z[poly]
    }

    pub fn is_upper(&self, poly: usize) -> bool {
        self.is_upper[poly]
    }

    pub fn upper_indices(&self) -> &[usize] {
        &self.upper
    }

    pub fn lower_indices(&self) -> &[usize] {
        &self.lower
    }

    /// Indices of polygons on the same level as `poly`.
    pub fn same_level(&self, poly: usize) -> &[usize] {
        if self.is_upper[poly] { &self.upper } else { &self.lower }
    }

    /// Indices of polygons on the other level from `poly`.
    pub fn opposite_level(&self, poly: usize) -> &[usize] {
        if self.is_upper[poly] { &self.lower } else { &self.upper }
    }

    /// Largest Z among the lower polygons.
    pub fn lower_max_z(&self) -> Real {
        self.lower.iter().map(|&i| self.z[i]).fold(Real::MIN, Real::max)
    }

    /// Smallest Z among the upper polygons.
    pub fn upper_min_z(&self) -> Real {
        self.upper.iter().map(|&i| self.z[i]).fold(Real::MAX, Real::min)
    }

    /// Z halfway between the two levels.
    pub fn mid_z(&self) -> Real {
        (self.lower_max_z() + self.upper_min_z()) / 2.0
    }

    /// Mean polygon Z, used to order group meshes.
    pub fn average_z(&self) -> Real {
        self.z.iter().sum::<Real>() / self.z.len() as Real
    }

    pub fn ring(&self, poly: usize, ring: usize) -> &LineString<Real> {
        let polygon = &self.polygons[poly];
        if ring == 0 { polygon.exterior() } else { &polygon.interiors()[ring - 1] }
    }

    /// Number of rings (exterior plus holes) of `poly`.
    pub fn ring_count(&self, poly: usize) -> usize {
        1 + self.polygons[poly].interiors().len()
    }

    /// Build an index, taking the ring length from the stored polygon.
    pub fn index(&self, poly: usize, ring: usize, vertex: usize) -> ContourIndex {
        ContourIndex::new(poly, ring, vertex, ring_len(self.ring(poly, ring)))
    }

    /// 2D position of a contour vertex.
    #[inline]
    pub fn point(&self, index: ContourIndex) -> Coord<Real> {
        self.ring(index.poly, index.ring).0[index.vertex]
    }

    /// Previous and next positions around `index` on its ring.
    pub fn connected_points(&self, index: ContourIndex) -> [Coord<Real>; 2] {
        [self.point(index.previous()), self.point(index.next())]
    }

    /// Every vertex of every ring, in polygon, ring, vertex order.
    pub fn indices(&self) -> impl Iterator<Item = ContourIndex> + '_ {
        (0..self.polygons.len()).flat_map(move |poly| self.polygon_indices(poly))
    }

    /// Every vertex of every ring of one polygon.
    pub fn polygon_indices(&self, poly: usize) -> impl Iterator<Item = ContourIndex> + '_ {
        (0..self.ring_count(poly)).flat_map(move |ring| {
            let len = ring_len(self.ring(poly, ring));
            (0..len).map(move |vertex| ContourIndex::new(poly, ring, vertex, len))
        })
    }
}

/// Distinct vertex count of a closed ring.
pub(crate) fn ring_len(ring: &LineString<Real>) -> usize {
    let n = ring.0.len();
    if n > 1 && ring.0[0] == ring.0[n - 1] { n - 1 } else { n }
}
