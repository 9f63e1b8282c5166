//! Slice chords and the optimal tiling vertex (OTV) engine.
//!
//! A slice chord joins a contour vertex on one level to a contour vertex on the other.
//! Chords are proposed per incomplete vertex by [`otv::find_optimal_tiling_vertex`],
//! validated against a [`TestSuite`], and inserted greedily shortest first. Passes run
//! over a ladder of progressively looser suites; a looser suite only runs once the
//! stricter one stops adding chords.

pub mod index;
pub mod otv;

pub use index::{ChordIndex, LevelIndex};
pub use otv::{ChordPriority, OtvTable};

use crate::classify::{classify_contour_edge, orientation_angle, orientations_match};
use crate::config::TilingParams;
use crate::contour::geometry::{distance, is_left_side, segment_crosses_polygon};
use crate::contour::{ContourIndex, ContourSet};
use crate::errors::MeshResult;
use crate::float_types::Real;
use crate::mesh::SliceMesh;
use crate::mesh::complete::close_faces;
use geo::Line;
use hashbrown::HashMap;
use std::ops::BitOr;
use tracing::debug;

/// One check a chord candidate can be put through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChordTest {
    /// Vertices with identical XY pair up without further checks.
    Correspondence,
    /// The chord may not cross an accepted chord.
    ChordIntersection,
    /// Each endpoint lies on the material side of the other's ring corner.
    SideMatch,
    /// The rings at both endpoints run in compatible directions.
    LineOrientation,
    /// The chord may not lie both inside and outside any polygon.
    Crossing,
    /// The classifier must call the chord valid.
    EdgeKind,
}

impl ChordTest {
    const fn bit(self) -> u8 {
        match self {
            ChordTest::Correspondence => 1,
            ChordTest::ChordIntersection => 1 << 1,
            ChordTest::SideMatch => 1 << 2,
            ChordTest::LineOrientation => 1 << 3,
            ChordTest::Crossing => 1 << 4,
            ChordTest::EdgeKind => 1 << 5,
        }
    }
}

/// A set of [`ChordTest`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TestSuite(u8);

impl TestSuite {
    pub const NONE: TestSuite = TestSuite(0);

    pub const fn of(tests: &[ChordTest]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < tests.len() {
            bits |= tests[i].bit();
            i += 1;
        }
        TestSuite(bits)
    }

    #[inline]
    pub const fn contains(self, test: ChordTest) -> bool {
        self.0 & test.bit() != 0
    }

    #[inline]
    pub const fn with(self, test: ChordTest) -> Self {
        TestSuite(self.0 | test.bit())
    }

    #[inline]
    pub const fn intersects(self, other: TestSuite) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for TestSuite {
    type Output = TestSuite;

    fn bitor(self, rhs: TestSuite) -> TestSuite {
        TestSuite(self.0 | rhs.0)
    }
}

impl From<ChordTest> for TestSuite {
    fn from(test: ChordTest) -> Self {
        TestSuite(test.bit())
    }
}

use ChordTest::{ChordIntersection, Correspondence, Crossing, EdgeKind, LineOrientation, SideMatch};

/// Suites of the default ladder, strictest first.
pub const DEFAULT_LADDER: [TestSuite; 4] = [
    TestSuite::of(&[Correspondence, ChordIntersection, SideMatch, EdgeKind, Crossing, LineOrientation]),
    TestSuite::of(&[Correspondence, ChordIntersection, SideMatch, EdgeKind, Crossing]),
    TestSuite::of(&[Correspondence, ChordIntersection, EdgeKind, Crossing, LineOrientation]),
    TestSuite::of(&[Correspondence, ChordIntersection, EdgeKind, Crossing]),
];

/// The opt-in tier run after the default ladder when enabled.
pub const RELAXED_TIER: TestSuite = TestSuite::of(&[Correspondence, SideMatch, LineOrientation]);

/// Suite used to find partners while closing a region with chords alone.
pub const REGION_SEARCH: TestSuite =
    TestSuite::of(&[Correspondence, ChordIntersection, SideMatch, Crossing]);

/// Suite used to insert the chords found for a region.
pub const REGION_INSERT: TestSuite = TestSuite::of(&[ChordIntersection, LineOrientation]);

/// The suites a chord pass runs, strictest first.
pub fn suite_ladder(params: &TilingParams) -> Vec<TestSuite> {
    let mut ladder = DEFAULT_LADDER.to_vec();
    if params.relaxed_tier {
        ladder.push(RELAXED_TIER);
    }
    ladder
}

/// Tests a (origin, target) vertex pair is known to fail.
#[derive(Debug, Clone, Default)]
pub struct FailureCache {
    failures: HashMap<(usize, usize), TestSuite>,
}

impl FailureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Known failures of `origin -> target` among the `requested` tests.
    pub fn failures(&self, origin: usize, target: usize, requested: TestSuite) -> TestSuite {
        match self.failures.get(&(origin, target)) {
            Some(known) => TestSuite(known.0 & requested.0),
            None => TestSuite::NONE,
        }
    }

    pub fn record(&mut self, origin: usize, target: usize, failed: TestSuite) {
        if failed.is_empty() {
            return;
        }
        let entry = self.failures.entry((origin, target)).or_default();
        *entry = *entry | failed;
    }

    pub fn clear(&mut self) {
        self.failures.clear();
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A candidate chord between two contour vertices on different levels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceChord {
    pub origin: ContourIndex,
    pub target: ContourIndex,
    pub line: Line<Real>,
    pub orientation: Real,
}

impl SliceChord {
    pub fn new(contours: &ContourSet, origin: ContourIndex, target: ContourIndex) -> Self {
        Self {
            origin,
            target,
            line: Line::new(contours.point(origin), contours.point(target)),
            orientation: orientation_angle(contours, origin, target),
        }
    }

    pub fn length(&self) -> Real {
        distance(self.line.start, self.line.end)
    }
}

/// Each endpoint must sit on the correct side of the other endpoint's ring corner.
///
/// Identical points always pass. The expected side inverts when exactly one endpoint
/// is on a hole ring.
pub fn side_match(contours: &ContourSet, origin: ContourIndex, target: ContourIndex) -> bool {
    let p1 = contours.point(origin);
    let p2 = contours.point(target);
    if p1 == p2 {
        return true;
    }
    let [prev_b, next_b] = contours.connected_points(target);
    let [prev_a, next_a] = contours.connected_points(origin);
    let correct_side =
        is_left_side(p1, [prev_b, p2, next_b]) != is_left_side(p2, [prev_a, p1, next_a]);
    if origin.is_inner() != target.is_inner() { !correct_side } else { correct_side }
}

/// `true` when `line` stays on one side of every polygon in `polys`.
pub fn crossing_free(contours: &ContourSet, polys: &[usize], line: Line<Real>) -> bool {
    polys.iter().all(|&p| !segment_crosses_polygon(contours.polygon(p), line))
}

/// Run `suite` against the chord `origin -> target` and report the failed test.
///
/// Tests run in a fixed order and stop at the first failure, so the result holds at
/// most one test. Identical XY positions always pass.
pub fn failed_tests(
    contours: &ContourSet,
    chords: &ChordIndex,
    origin: ContourIndex,
    target: ContourIndex,
    suite: TestSuite,
) -> MeshResult<TestSuite> {
    let p1 = contours.point(origin);
    let p2 = contours.point(target);
    if p1 == p2 {
        return Ok(TestSuite::NONE);
    }
    let line = Line::new(p1, p2);

    if suite.contains(ChordIntersection) && chords.crosses(line) {
        return Ok(ChordIntersection.into());
    }
    if suite.contains(EdgeKind) && !classify_contour_edge(contours, origin, target)?.is_valid() {
        return Ok(EdgeKind.into());
    }
    if suite.contains(LineOrientation) && !orientations_match(contours, origin, target) {
        return Ok(LineOrientation.into());
    }
    if suite.contains(SideMatch) && !side_match(contours, origin, target) {
        return Ok(SideMatch.into());
    }
    if suite.contains(Crossing)
        && !(crossing_free(contours, contours.opposite_level(origin.poly), line)
            && crossing_free(contours, contours.same_level(origin.poly), line))
    {
        return Ok(Crossing.into());
    }
    Ok(TestSuite::NONE)
}

/// Run the suite ladder until no suite adds chords, closing faces as chords appear.
///
/// Returns the contour vertices that are still face-incomplete afterwards.
pub fn generate_slice_chords(
    mesh: &mut SliceMesh,
    chords: &mut ChordIndex,
    failures: &mut FailureCache,
    params: &TilingParams,
) -> MeshResult<Vec<usize>> {
    let levels = LevelIndex::from_mesh(mesh);

    close_faces(mesh, None);
    let mut incomplete = mesh.incomplete_vertices();

    for suite in suite_ladder(params) {
        loop {
            let added = chord_generation_pass(mesh, &levels, chords, failures, &incomplete, suite, params)?;
            debug!(added, remaining = incomplete.len(), ?suite, "slice chord pass");
            if added == 0 {
                break;
            }
            close_faces(mesh, Some(&incomplete));
            incomplete.retain(|&v| !mesh.update_face_complete(v));
        }
    }

    failures.clear();
    close_faces(mesh, Some(&incomplete));
    incomplete.retain(|&v| !mesh.update_face_complete(v));
    Ok(incomplete)
}

/// One sweep: build the OTV table for `incomplete` and insert its chords.
pub fn chord_generation_pass(
    mesh: &mut SliceMesh,
    levels: &LevelIndex,
    chords: &mut ChordIndex,
    failures: &mut FailureCache,
    incomplete: &[usize],
    suite: TestSuite,
    params: &TilingParams,
) -> MeshResult<usize> {
    let table =
        otv::build_otv_table(mesh, levels, chords, failures, incomplete, suite, params.batch_growth)?;
    otv::try_add_otv_table(mesh, &table, chords, failures, suite, ChordPriority::Distance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suites_hold_their_tests() {
        let strict = DEFAULT_LADDER[0];
        assert!(strict.contains(SideMatch));
        assert!(strict.contains(LineOrientation));
        assert!(!DEFAULT_LADDER[3].contains(SideMatch));
        assert!(!RELAXED_TIER.contains(Crossing));
        assert_eq!(suite_ladder(&TilingParams::default()).len(), 4);
        assert_eq!(suite_ladder(&TilingParams::default().with_relaxed_tier(true)).len(), 5);
    }

    #[test]
    fn failure_cache_filters_by_request() {
        let mut cache = FailureCache::new();
        cache.record(1, 2, SideMatch.into());
        cache.record(1, 2, TestSuite::NONE);
        assert_eq!(cache.len(), 1);
        assert!(!cache.failures(1, 2, DEFAULT_LADDER[0]).is_empty());
        assert!(cache.failures(1, 2, DEFAULT_LADDER[3]).is_empty());
        assert!(cache.failures(2, 1, DEFAULT_LADDER[0]).is_empty());
        cache.clear();
        assert!(cache.is_empty());
    }
}
