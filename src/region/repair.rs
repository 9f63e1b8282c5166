//! Closing regions: with chords where the region can be mapped to the other level,
//! otherwise by triangulating its perimeter around a synthesized skeleton.

use super::{Region, RegionGraph, RegionKind};
use crate::chord::{
    ChordIndex, ChordPriority, FailureCache, LevelIndex, REGION_INSERT, REGION_SEARCH, otv,
};
use crate::config::TilingParams;
use crate::errors::{MeshError, MeshResult};
use crate::medial_axis::{approximate_medial_axis, triangulate_region};
use crate::mesh::complete::classify_closing_edges;
use crate::mesh::normals::faces_outward;
use crate::mesh::{EdgeKey, MedialAxisIndex, MeshFace, SliceMesh};
use nalgebra::Point3;
use std::collections::BTreeSet;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairOutcome {
    Closed,
    LeftOpen,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairSummary {
    pub closed: usize,
    pub left_open: usize,
}

impl RepairSummary {
    fn record(&mut self, outcome: RepairOutcome) {
        match outcome {
            RepairOutcome::Closed => self.closed += 1,
            RepairOutcome::LeftOpen => self.left_open += 1,
        }
    }
}

/// Close every region of `graph` that has no partner.
///
/// Untiled regions go first, then the remaining kinds, each in region order.
pub fn close_isolated_regions(
    mesh: &mut SliceMesh,
    chords: &mut ChordIndex,
    graph: &RegionGraph,
    params: &TilingParams,
) -> MeshResult<RepairSummary> {
    let isolated = graph.isolated();
    let (untiled, rest): (Vec<usize>, Vec<usize>) =
        isolated.into_iter().partition(|&r| graph.region(r).kind() == RegionKind::Untiled);

    let mut summary = RepairSummary::default();
    for r in untiled.into_iter().chain(rest) {
        let region = graph.region(r);
        let outcome = close_region(mesh, chords, region, params)?;
        if outcome == RepairOutcome::LeftOpen {
            warn!(kind = ?region.kind(), vertices = region.vertices().len(), "region left open");
        }
        summary.record(outcome);
    }
    debug!(closed = summary.closed, left_open = summary.left_open, "region repair");
    Ok(summary)
}

/// Close one region according to its kind.
///
/// Exposed and invaginated regions are mapped with chords. Holes covered by the other
/// level and untiled regions are triangulated around a skeleton. An exposed hole is
/// left for chord search.
pub fn close_region(
    mesh: &mut SliceMesh,
    chords: &mut ChordIndex,
    region: &Region,
    params: &TilingParams,
) -> MeshResult<RepairOutcome> {
    match region.kind() {
        RegionKind::Exposed | RegionKind::Invagination => {
            close_solid_region(mesh, chords, region, params)
        }
        RegionKind::Hole if region.is_exposed(mesh) => Ok(RepairOutcome::LeftOpen),
        RegionKind::Hole | RegionKind::Untiled => close_untiled_region(mesh, chords, region),
    }
}

/// Map every faceless vertex of the region to the other level and insert the chords.
///
/// The region counts as closed only when every vertex finds a partner and every chord
/// is inserted.
pub fn close_solid_region(
    mesh: &mut SliceMesh,
    chords: &mut ChordIndex,
    region: &Region,
    params: &TilingParams,
) -> MeshResult<RepairOutcome> {
    let faceless: Vec<usize> = region
        .vertices()
        .into_iter()
        .filter(|&v| mesh.faces_of(v).is_empty())
        .collect();
    let levels = LevelIndex::from_mesh(mesh);
    let mut failures = FailureCache::new();
    let table = otv::build_otv_table(
        mesh,
        &levels,
        chords,
        &mut failures,
        &faceless,
        REGION_SEARCH,
        params.batch_growth,
    )?;
    if table.len() < faceless.len() {
        return Ok(RepairOutcome::LeftOpen);
    }
    let added = otv::try_add_otv_table(
        mesh,
        &table,
        chords,
        &mut failures,
        REGION_INSERT,
        ChordPriority::Orientation,
    )?;
    Ok(if added == table.len() { RepairOutcome::Closed } else { RepairOutcome::LeftOpen })
}

/// `None` for a triangulation failure, which leaves the region open. Other errors are
/// passed on.
fn unless_untriangulable<T>(result: MeshResult<T>, stage: &str) -> MeshResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(MeshError::Triangulation(reason)) => {
            debug!(%reason, stage, "region not triangulated");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Close a region that chords cannot map.
///
/// Three vertices become one face and four are split along the perimeter. Larger
/// regions get skeleton vertices halfway between the levels and are re-triangulated
/// around them.
pub fn close_untiled_region(
    mesh: &mut SliceMesh,
    chords: &mut ChordIndex,
    region: &Region,
) -> MeshResult<RepairOutcome> {
    let perimeter = region.perimeter();
    let triangles: Vec<[usize; 3]> = match region.vertices().len() {
        0..=2 => return Ok(RepairOutcome::LeftOpen),
        3 => {
            let v = region.vertices();
            vec![[v[0], v[1], v[2]]]
        }
        4 if perimeter.len() == 4 => {
            let [a, b, c, d] = [perimeter[0], perimeter[1], perimeter[2], perimeter[3]];
            let ac = (mesh.position(a) - mesh.position(c)).norm();
            let bd = (mesh.position(b) - mesh.position(d)).norm();
            if ac < bd { vec![[a, b, c], [a, c, d]] } else { vec![[a, b, d], [b, c, d]] }
        }
        _ => {
            let polygon = region.polygon(mesh);
            let Some(axis) = unless_untriangulable(approximate_medial_axis(&polygon), "skeleton")?
            else {
                return Ok(RepairOutcome::LeftOpen);
            };
            if axis.is_empty() {
                return Ok(RepairOutcome::LeftOpen);
            }
            let z = mesh.contours().mid_z();
            let skeleton = mesh.next_skeleton_id();
            let interior: Vec<usize> = axis
                .nodes
                .iter()
                .enumerate()
                .map(|(node, p)| {
                    mesh.add_medial_vertex(Point3::new(p.x, p.y, z), MedialAxisIndex { skeleton, node })
                })
                .collect();
            let triangulated = triangulate_region(mesh, &[perimeter], &interior, &polygon);
            let Some(triangles) = unless_untriangulable(triangulated, "perimeter")? else {
                return Ok(RepairOutcome::LeftOpen);
            };
            triangles
        }
    };
    if triangles.is_empty() {
        return Ok(RepairOutcome::LeftOpen);
    }

    let before: BTreeSet<EdgeKey> = mesh.edge_keys().into_iter().collect();
    let mut ids = Vec::new();
    for tri in triangles {
        let face = MeshFace::new(tri);
        let face = if faces_outward(mesh, &face) { face } else { face.reversed() };
        ids.extend(mesh.add_face(face.verts));
    }
    classify_closing_edges(mesh, &ids)?;
    for key in mesh.edge_keys().into_iter().filter(|k| !before.contains(k)) {
        chords.insert(mesh.xy(key.a), mesh.xy(key.b), key);
    }
    Ok(RepairOutcome::Closed)
}
