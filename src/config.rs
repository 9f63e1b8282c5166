//! Tunables for the tiling pipeline.

use crate::float_types::Real;

/// Parameters controlling how a meshing group is tiled.
///
/// # Example
///
/// ```
/// use contour_tiler::TilingParams;
///
/// let params = TilingParams::default()
///     .with_relaxed_tier(true)
///     .with_cap_ends(false);
/// assert!(params.relaxed_tier);
/// assert!(!params.cap_ends);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TilingParams {
    /// Run the loosest chord tier (correspondence, side match and orientation only)
    /// after the default ladder stalls. Off by default.
    pub relaxed_tier: bool,

    /// Longest loop the face completion search closes. Loops of four are split.
    pub max_face_vertices: usize,

    /// Growth factor for nearest-candidate batches during OTV search.
    pub batch_growth: usize,

    /// Close the ends of the mesh where no slice continues above or below.
    pub cap_ends: bool,

    /// Attempt region repair and medial-axis closing.
    pub close_regions: bool,

    /// Simplify input polygons with this tolerance before meshing.
    pub simplify_tolerance: Option<Real>,
}

impl Default for TilingParams {
    fn default() -> Self {
        Self {
            relaxed_tier: false,
            max_face_vertices: 4,
            batch_growth: 10,
            cap_ends: true,
            close_regions: true,
            simplify_tolerance: None,
        }
    }
}

impl TilingParams {
    /// Create parameters with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the opt-in relaxed chord tier.
    #[must_use]
    pub const fn with_relaxed_tier(mut self, enabled: bool) -> Self {
        self.relaxed_tier = enabled;
        self
    }

    /// Set the longest loop face completion may close (clamped to at least 3).
    #[must_use]
    pub const fn with_max_face_vertices(mut self, count: usize) -> Self {
        self.max_face_vertices = if count < 3 { 3 } else { count };
        self
    }

    /// Set the nearest-candidate batch growth factor (clamped to at least 2).
    #[must_use]
    pub const fn with_batch_growth(mut self, growth: usize) -> Self {
        self.batch_growth = if growth < 2 { 2 } else { growth };
        self
    }

    /// Enable or disable terminal end capping.
    #[must_use]
    pub const fn with_cap_ends(mut self, enabled: bool) -> Self {
        self.cap_ends = enabled;
        self
    }

    /// Enable or disable region repair.
    #[must_use]
    pub const fn with_close_regions(mut self, enabled: bool) -> Self {
        self.close_regions = enabled;
        self
    }

    /// Simplify input polygons before meshing.
    #[must_use]
    pub const fn with_simplify_tolerance(mut self, tolerance: Option<Real>) -> Self {
        self.simplify_tolerance = tolerance;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_relaxed_tier_off() {
        let params = TilingParams::default();
        assert!(!params.relaxed_tier);
        assert_eq!(params.max_face_vertices, 4);
        assert_eq!(params.batch_growth, 10);
        assert!(params.cap_ends);
    }

    #[test]
    fn builders_clamp() {
        let params = TilingParams::new().with_max_face_vertices(1).with_batch_growth(0);
        assert_eq!(params.max_face_vertices, 3);
        assert_eq!(params.batch_growth, 2);
    }
}
