//! The annotation graph and its partition into meshing groups.
//!
//! A meshing group is a two-level bundle: a set of nodes above, a set below and the
//! graph edges between them. Groups are grown from a seed edge by alternately pulling
//! in the lower neighbours of the upper nodes and the upper neighbours of the lower
//! nodes, so every edge lands in exactly one group, apart from edges dropped to break
//! a cycle through sections.

use crate::config::TilingParams;
use crate::contour::ContourSet;
use crate::errors::{MeshError, MeshResult};
use crate::float_types::Real;
use geo::Polygon;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationNode {
    pub id: u64,
    pub z: Real,
    pub polygon: Polygon<Real>,
}

/// Cross-sections and the links between sections of one object.
#[derive(Debug, Clone, Default)]
pub struct AnnotationGraph {
    nodes: BTreeMap<u64, AnnotationNode>,
    edges: BTreeSet<(u64, u64)>,
}

impl AnnotationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a node.
    pub fn add_node(&mut self, id: u64, z: Real, polygon: Polygon<Real>) {
        self.nodes.insert(id, AnnotationNode { id, z, polygon });
    }

    /// Link two existing nodes on different Z levels.
    pub fn add_edge(&mut self, a: u64, b: u64) -> MeshResult<()> {
        let za = self.nodes.get(&a).ok_or(MeshError::UnknownNode(a))?.z;
        let zb = self.nodes.get(&b).ok_or(MeshError::UnknownNode(b))?.z;
        if za == zb {
            return Err(MeshError::FlatGraphEdge { a, b });
        }
        self.edges.insert((a.min(b), a.max(b)));
        Ok(())
    }

    pub fn node(&self, id: u64) -> Option<&AnnotationNode> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &AnnotationNode> + '_ {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Edges as `(smaller id, larger id)`, in order.
    pub fn edges(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.edges.iter().copied()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn z(&self, id: u64) -> MeshResult<Real> {
        self.nodes.get(&id).map(|n| n.z).ok_or(MeshError::UnknownNode(id))
    }

    /// Neighbours of `id`, in id order.
    pub fn neighbours(&self, id: u64) -> Vec<u64> {
        self.edges
            .iter()
            .filter_map(|&(a, b)| {
                if a == id {
                    Some(b)
                } else if b == id {
                    Some(a)
                } else {
                    None
                }
            })
            .collect()
    }

    /// Neighbours with a larger Z than `id`.
    pub fn neighbours_above(&self, id: u64) -> MeshResult<Vec<u64>> {
        let z = self.z(id)?;
        let mut out = Vec::new();
        for n in self.neighbours(id) {
            if self.z(n)? > z {
                out.push(n);
            }
        }
        Ok(out)
    }

    /// Neighbours with a smaller Z than `id`.
    pub fn neighbours_below(&self, id: u64) -> MeshResult<Vec<u64>> {
        let z = self.z(id)?;
        let mut out = Vec::new();
        for n in self.neighbours(id) {
            if self.z(n)? < z {
                out.push(n);
            }
        }
        Ok(out)
    }
}

/// Nodes and edges tiled together as one two-level mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshingGroup {
    pub above: BTreeSet<u64>,
    pub below: BTreeSet<u64>,
    pub edges: BTreeSet<(u64, u64)>,
    /// Some upper node continues to a section further up.
    pub has_slice_above: bool,
    /// Some lower node continues to a section further down.
    pub has_slice_below: bool,
}

impl MeshingGroup {
    /// Identifies the group in logs: its first edge.
    pub fn key(&self) -> (u64, u64) {
        self.edges.first().copied().unwrap_or_default()
    }

    pub fn nodes(&self) -> impl Iterator<Item = u64> + '_ {
        self.below.iter().chain(&self.above).copied()
    }

    /// Build the contour set of this group, simplifying polygons when configured.
    pub fn contour_set(&self, graph: &AnnotationGraph, params: &TilingParams) -> MeshResult<ContourSet> {
        let mut entries = Vec::new();
        for (ids, upper) in [(&self.below, false), (&self.above, true)] {
            for &id in ids {
                let node = graph.node(id).ok_or(MeshError::UnknownNode(id))?;
                entries.push((node.polygon.clone(), node.z, upper));
            }
        }
        ContourSet::with_simplification(entries, params.simplify_tolerance)
    }
}

/// Graph edges the partition has given up on.
#[derive(Debug, Default)]
struct Dropped(BTreeSet<(u64, u64)>);

impl Dropped {
    fn keeps(&self, a: u64, b: u64) -> bool {
        !self.0.contains(&(a.min(b), a.max(b)))
    }

    fn above(&self, graph: &AnnotationGraph, id: u64) -> MeshResult<Vec<u64>> {
        let mut out = graph.neighbours_above(id)?;
        out.retain(|&n| self.keeps(id, n));
        Ok(out)
    }

    fn below(&self, graph: &AnnotationGraph, id: u64) -> MeshResult<Vec<u64>> {
        let mut out = graph.neighbours_below(id)?;
        out.retain(|&n| self.keeps(id, n));
        Ok(out)
    }
}

/// Grow the group seeded by `upper` over `lower`.
fn grow(
    graph: &AnnotationGraph,
    dropped: &Dropped,
    upper: u64,
    lower: u64,
) -> MeshResult<(BTreeSet<u64>, BTreeSet<u64>)> {
    let mut above = BTreeSet::from([upper]);
    let mut below = BTreeSet::from([lower]);
    let mut new_above = vec![upper];
    let mut new_below = vec![lower];

    while !new_above.is_empty() || !new_below.is_empty() {
        let mut next_below = Vec::new();
        for id in new_above.drain(..) {
            for n in dropped.below(graph, id)? {
                if below.insert(n) {
                    next_below.push(n);
                }
            }
        }
        let mut next_above = Vec::new();
        for id in new_below.drain(..).chain(next_below.iter().copied()) {
            for n in dropped.above(graph, id)? {
                if above.insert(n) {
                    next_above.push(n);
                }
            }
        }
        new_above = next_above;
        new_below = Vec::new();
    }
    Ok((above, below))
}

/// The unassigned edge among `nodes` with the largest Z span, first in edge order on
/// ties.
fn longest_edge(
    graph: &AnnotationGraph,
    unassigned: &BTreeSet<(u64, u64)>,
    nodes: &BTreeSet<u64>,
) -> MeshResult<Option<(u64, u64)>> {
    let mut best: Option<((u64, u64), Real)> = None;
    for &(a, b) in unassigned {
        if !nodes.contains(&a) || !nodes.contains(&b) {
            continue;
        }
        let span = (graph.z(a)? - graph.z(b)?).abs();
        if best.is_none_or(|(_, longest)| span > longest) {
            best = Some(((a, b), span));
        }
    }
    Ok(best.map(|(edge, _)| edge))
}

/// Partition every graph edge into meshing groups.
///
/// Seeds are taken in edge order. When a group would hold a node on both of its
/// levels, the graph has a cycle through sections: the edge of that group spanning the
/// largest Z distance is dropped and the group is grown again. Dropped edges belong to
/// no group. Only a malformed graph is an error.
pub fn partition(graph: &AnnotationGraph) -> MeshResult<Vec<MeshingGroup>> {
    let mut unassigned: BTreeSet<(u64, u64)> = graph.edges.clone();
    let mut dropped = Dropped::default();
    let mut groups = Vec::new();

    while let Some(&(a, b)) = unassigned.first() {
        let (upper, lower) = if graph.z(a)? > graph.z(b)? { (a, b) } else { (b, a) };
        let (above, below) = grow(graph, &dropped, upper, lower)?;

        if let Some(&id) = above.intersection(&below).next() {
            let nodes: BTreeSet<u64> = above.union(&below).copied().collect();
            let edge = longest_edge(graph, &unassigned, &nodes)?.unwrap_or((a, b));
            warn!(
                error = %MeshError::NodeOnBothLevels(id),
                edge = ?edge,
                "dropping graph edge to break a cycle"
            );
            unassigned.remove(&edge);
            dropped.0.insert(edge);
            continue;
        }

        let mut edges = BTreeSet::new();
        for &id in &above {
            for n in dropped.below(graph, id)? {
                let edge = (id.min(n), id.max(n));
                if below.contains(&n) && unassigned.remove(&edge) {
                    edges.insert(edge);
                }
            }
        }

        let mut has_slice_above = false;
        for &id in &above {
            has_slice_above |= !dropped.above(graph, id)?.is_empty();
        }
        let mut has_slice_below = false;
        for &id in &below {
            has_slice_below |= !dropped.below(graph, id)?.is_empty();
        }

        groups.push(MeshingGroup { above, below, edges, has_slice_above, has_slice_below });
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square() -> Polygon<Real> {
        polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)]
    }

    #[test]
    fn rejects_bad_edges() {
        let mut graph = AnnotationGraph::new();
        graph.add_node(1, 0.0, square());
        graph.add_node(2, 0.0, square());
        assert!(matches!(graph.add_edge(1, 2), Err(MeshError::FlatGraphEdge { a: 1, b: 2 })));
        assert!(matches!(graph.add_edge(1, 9), Err(MeshError::UnknownNode(9))));
    }

    #[test]
    fn branch_stays_in_one_group() {
        // 1 at z=0 splits into 2 and 3 at z=1; 2 continues to 4 at z=2
        let mut graph = AnnotationGraph::new();
        graph.add_node(1, 0.0, square());
        graph.add_node(2, 1.0, square());
        graph.add_node(3, 1.0, square());
        graph.add_node(4, 2.0, square());
        graph.add_edge(1, 2).unwrap();
        graph.add_edge(1, 3).unwrap();
        graph.add_edge(2, 4).unwrap();

        let groups = partition(&graph).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].above, BTreeSet::from([2, 3]));
        assert_eq!(groups[0].below, BTreeSet::from([1]));
        assert!(groups[0].has_slice_above);
        assert!(!groups[0].has_slice_below);
        assert_eq!(groups[1].edges, BTreeSet::from([(2, 4)]));
        assert!(groups[1].has_slice_below);
    }

    #[test]
    fn section_skipping_edge_is_dropped() {
        let mut graph = AnnotationGraph::new();
        graph.add_node(1, 0.0, square());
        graph.add_node(2, 1.0, square());
        graph.add_node(3, 2.0, square());
        graph.add_edge(1, 2).unwrap();
        graph.add_edge(2, 3).unwrap();
        graph.add_edge(1, 3).unwrap();

        let groups = partition(&graph).unwrap();
        let edges: Vec<_> = groups.iter().flat_map(|g| g.edges.iter().copied()).collect();
        assert_eq!(edges, vec![(1, 2), (2, 3)]);
        assert!(groups.iter().all(|g| g.above.is_disjoint(&g.below)));
    }
}
