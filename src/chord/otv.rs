//! Optimal tiling vertex search and greedy chord insertion.

use super::{ChordIndex, ChordTest, FailureCache, LevelIndex, SliceChord, TestSuite, failed_tests};
use crate::classify::classify_mesh_edge;
use crate::contour::ContourIndex;
use crate::errors::MeshResult;
use crate::mesh::{EdgeKey, EdgeKind, SliceMesh};
use std::collections::BTreeMap;
use tracing::trace;

/// Chosen partner per origin vertex for one pass, in contour order.
pub type OtvTable = BTreeMap<ContourIndex, ContourIndex>;

/// Order in which the chords of an OTV table are inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChordPriority {
    /// Shortest first.
    Distance,
    /// Smallest orientation angle first.
    Orientation,
}

/// Find the nearest face-incomplete vertex on the other level that passes `suite`.
///
/// The nearest candidate is tried first, then batches of growing size. Candidates with
/// a cached failure against a requested test are skipped without re-testing. Returns
/// `None` once the level is exhausted.
pub fn find_optimal_tiling_vertex(
    mesh: &SliceMesh,
    levels: &LevelIndex,
    chords: &ChordIndex,
    failures: &mut FailureCache,
    origin: usize,
    suite: TestSuite,
    batch_growth: usize,
) -> MeshResult<Option<usize>> {
    let Some(origin_index) = mesh.vertex(origin).origin.contour() else {
        return Ok(None);
    };
    let contours = mesh.contours();

    // a coincident vertex is always the nearest candidate and always passes
    if suite.contains(ChordTest::Correspondence) {
        if let Some(partner) = mesh.vertex(origin).corresponding {
            if !mesh.vertex(partner).faces_complete() {
                return Ok(Some(partner));
            }
        }
    }

    let upper = contours.is_upper(origin_index.poly);
    let mut candidates = levels.nearest_opposite(upper, mesh.xy(origin));
    let mut batch_size = 1usize;
    let mut batch = 0usize;
    loop {
        let mut exhausted = true;
        for target in candidates.by_ref().take(batch_size) {
            exhausted = false;
            let Some(target_index) = mesh.vertex(target).origin.contour() else {
                continue;
            };
            if mesh.vertex(target).faces_complete() {
                continue;
            }
            if !failures.failures(origin, target, suite).is_empty() {
                continue;
            }
            let failed = failed_tests(contours, chords, origin_index, target_index, suite)?;
            if failed.is_empty() {
                trace!(origin, target, batch, "optimal tiling vertex");
                return Ok(Some(target));
            }
            failures.record(origin, target, failed);
        }
        if exhausted {
            return Ok(None);
        }
        batch += 1;
        batch_size = batch_size.saturating_mul(batch_growth.max(2));
    }
}

/// Build the OTV table for `vertices`, skipping any that find no partner.
pub fn build_otv_table(
    mesh: &SliceMesh,
    levels: &LevelIndex,
    chords: &ChordIndex,
    failures: &mut FailureCache,
    vertices: &[usize],
    suite: TestSuite,
    batch_growth: usize,
) -> MeshResult<OtvTable> {
    let mut table = OtvTable::new();
    for &v in vertices {
        let Some(origin) = mesh.vertex(v).origin.contour() else { continue };
        if let Some(partner) =
            find_optimal_tiling_vertex(mesh, levels, chords, failures, v, suite, batch_growth)?
        {
            if let Some(target) = mesh.vertex(partner).origin.contour() {
                table.insert(origin, target);
            }
        }
    }
    Ok(table)
}

/// Turn an OTV table into edges.
///
/// Pairs with identical XY become corresponding edges. The rest become chords, which
/// are sorted by `priority` (stable) and inserted one by one, each re-validated against
/// the chords inserted before it. Returns the number of chords added.
pub fn try_add_otv_table(
    mesh: &mut SliceMesh,
    table: &OtvTable,
    chords: &mut ChordIndex,
    failures: &mut FailureCache,
    suite: TestSuite,
    priority: ChordPriority,
) -> MeshResult<usize> {
    let mut candidates = Vec::new();
    for (&origin, &target) in table {
        let (Some(a), Some(b)) = (mesh.vertex_for(origin), mesh.vertex_for(target)) else {
            continue;
        };
        if mesh.xy(a) == mesh.xy(b) {
            mesh.add_edge(a, b, EdgeKind::Corresponding.into());
        } else {
            candidates.push(SliceChord::new(mesh.contours(), origin, target));
        }
    }

    match priority {
        ChordPriority::Distance => candidates.sort_by(|x, y| x.length().total_cmp(&y.length())),
        ChordPriority::Orientation => {
            candidates.sort_by(|x, y| x.orientation.total_cmp(&y.orientation))
        }
    }

    let mut added = 0;
    for chord in &candidates {
        if try_add_slice_chord(mesh, chord, chords, failures, suite)? {
            added += 1;
        }
    }
    Ok(added)
}

/// Validate `chord` against the current chord index and add it to the mesh.
pub fn try_add_slice_chord(
    mesh: &mut SliceMesh,
    chord: &SliceChord,
    chords: &mut ChordIndex,
    failures: &mut FailureCache,
    suite: TestSuite,
) -> MeshResult<bool> {
    let (Some(a), Some(b)) = (mesh.vertex_for(chord.origin), mesh.vertex_for(chord.target)) else {
        return Ok(false);
    };
    let failed = failed_tests(mesh.contours(), chords, chord.origin, chord.target, suite)?;
    if !failed.is_empty() {
        failures.record(a, b, failed);
        return Ok(false);
    }
    if mesh.contains_edge(a, b) {
        return Ok(false);
    }
    let class = classify_mesh_edge(mesh, a, b)?;
    mesh.add_edge(a, b, class);
    chords.insert(chord.line.start, chord.line.end, EdgeKey::new(a, b));
    trace!(a, b, kind = ?class.kind, "slice chord");
    Ok(true)
}
