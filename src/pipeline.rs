//! The driver: tiles every meshing group and merges the results.

use crate::cap::{CapDirection, cap_mesh_end};
use crate::chord::{ChordIndex, FailureCache, generate_slice_chords};
use crate::config::TilingParams;
use crate::contour::ContourSet;
use crate::errors::MeshResult;
use crate::grouping::{AnnotationGraph, MeshingGroup, partition};
use crate::mesh::SliceMesh;
use crate::mesh::complete::{complete_corresponding_vertex_faces, first_pass_face_generation};
use crate::mesh::delaunay::{add_delaunay_faces, classify_unknown_edges, remove_invalid_edges};
use crate::mesh::normals::{ensure_external_normals, update_vertex_normals};
use crate::mesh::surface::SurfaceMesh;
use crate::region::{RegionGraph, close_isolated_regions, detect_regions, second_pass_regions};
use std::collections::BTreeMap;
use tracing::{debug, info, info_span, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Tile the two levels of `contours` into a slice mesh.
///
/// `has_slice_above` and `has_slice_below` suppress the cap on that side.
pub fn mesh_contours(
    contours: ContourSet,
    params: &TilingParams,
    has_slice_above: bool,
    has_slice_below: bool,
) -> MeshResult<SliceMesh> {
    let mut mesh = SliceMesh::from_contours(contours);

    let seeded = add_delaunay_faces(&mut mesh)?;
    let classified = classify_unknown_edges(&mut mesh)?;
    debug!(seeded, classified, "delaunay seed");

    let regions = detect_regions(&mesh);
    debug!(regions = regions.len(), "regions found");
    let graph = RegionGraph::build(&mesh, regions);

    let pruned = remove_invalid_edges(&mut mesh);
    let corresponding = complete_corresponding_vertex_faces(&mut mesh)?;
    debug!(pruned, corresponding, "valid faces extracted");

    let mut chords = ChordIndex::from_mesh(&mesh);
    if params.close_regions {
        close_isolated_regions(&mut mesh, &mut chords, &graph, params)?;
    }

    let mut failures = FailureCache::new();
    let incomplete = generate_slice_chords(&mut mesh, &mut chords, &mut failures, params)?;
    first_pass_face_generation(&mut mesh, Some(incomplete), params.max_face_vertices)?;

    if params.close_regions {
        let incomplete = mesh.incomplete_vertices();
        let regions = second_pass_regions(&mut mesh, &incomplete)?;
        if !regions.is_empty() {
            let graph = RegionGraph::build(&mesh, regions);
            close_isolated_regions(&mut mesh, &mut chords, &graph, params)?;
            first_pass_face_generation(&mut mesh, None, params.max_face_vertices)?;
        }
    }

    if params.cap_ends {
        if !has_slice_above {
            cap_mesh_end(&mut mesh, CapDirection::Upper)?;
        }
        if !has_slice_below {
            cap_mesh_end(&mut mesh, CapDirection::Lower)?;
        }
    }

    let reversed = ensure_external_normals(&mut mesh);
    update_vertex_normals(&mut mesh);
    debug!(
        faces = mesh.face_count(),
        edges = mesh.edge_count(),
        reversed,
        "slice mesh finished"
    );
    Ok(mesh)
}

/// Tile one meshing group.
pub fn mesh_group(
    graph: &AnnotationGraph,
    group: &MeshingGroup,
    params: &TilingParams,
) -> MeshResult<SurfaceMesh> {
    let contours = group.contour_set(graph, params)?;
    let mesh = mesh_contours(contours, params, group.has_slice_above, group.has_slice_below)?;
    Ok(SurfaceMesh::from_slice_mesh(&mesh))
}

fn mesh_group_logged(
    graph: &AnnotationGraph,
    group: &MeshingGroup,
    params: &TilingParams,
) -> Option<SurfaceMesh> {
    let span = info_span!("meshing_group", key = ?group.key());
    let _entered = span.enter();
    match mesh_group(graph, group, params) {
        Ok(mesh) => {
            info!(triangles = mesh.triangle_count(), "group meshed");
            Some(mesh)
        }
        Err(err) => {
            warn!(
                above = ?group.above,
                below = ?group.below,
                error = %err,
                "dropping meshing group"
            );
            None
        }
    }
}

/// Tile every group, one task per group when the `parallel` feature is on.
///
/// The result is indexed like `groups`; a group that failed is `None`.
pub fn mesh_groups(
    graph: &AnnotationGraph,
    groups: &[MeshingGroup],
    params: &TilingParams,
) -> Vec<Option<SurfaceMesh>> {
    #[cfg(feature = "parallel")]
    let meshes = groups
        .par_iter()
        .map(|group| mesh_group_logged(graph, group, params))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let meshes = groups
        .iter()
        .map(|group| mesh_group_logged(graph, group, params))
        .collect();

    meshes
}

fn find_root(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Merge the meshes of groups that share annotation nodes.
///
/// Components are returned in the order of their first group. Within a component the
/// meshes are merged in order of average Z.
pub fn merge_group_meshes(
    groups: &[MeshingGroup],
    meshes: Vec<Option<SurfaceMesh>>,
) -> Vec<SurfaceMesh> {
    let mut parent: Vec<usize> = (0..groups.len()).collect();
    let mut first_owner: BTreeMap<u64, usize> = BTreeMap::new();
    for (g, group) in groups.iter().enumerate() {
        if meshes.get(g).is_none_or(Option::is_none) {
            continue;
        }
        for node in group.nodes() {
            let owner = *first_owner.entry(node).or_insert(g);
            let (ra, rb) = (find_root(&mut parent, owner), find_root(&mut parent, g));
            if ra != rb {
                parent[ra.max(rb)] = ra.min(rb);
            }
        }
    }

    let mut components: BTreeMap<usize, Vec<SurfaceMesh>> = BTreeMap::new();
    for (g, mesh) in meshes.into_iter().enumerate() {
        if let Some(mesh) = mesh {
            let root = find_root(&mut parent, g);
            components.entry(root).or_default().push(mesh);
        }
    }

    components
        .into_values()
        .filter_map(|mut parts| {
            parts.sort_by(|a, b| a.average_z().total_cmp(&b.average_z()));
            parts.into_iter().reduce(SurfaceMesh::merge)
        })
        .collect()
}

/// Reconstruct surfaces for a whole annotation graph, one per connected component.
///
/// Groups that fail are logged and left out. An error is returned only when the
/// graph itself cannot be partitioned.
pub fn reconstruct(graph: &AnnotationGraph, params: &TilingParams) -> MeshResult<Vec<SurfaceMesh>> {
    let groups = partition(graph)?;
    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        groups = groups.len(),
        "reconstructing"
    );
    let meshes = mesh_groups(graph, &groups, params);
    let failed = meshes.iter().filter(|m| m.is_none()).count();
    let surfaces = merge_group_meshes(&groups, meshes);
    info!(surfaces = surfaces.len(), failed, "reconstruction finished");
    Ok(surfaces)
}
