//! Partitioning annotation graphs into meshing groups.

mod support;

use contour_tiler::grouping::{AnnotationGraph, partition};
use proptest::prelude::*;
use std::collections::BTreeSet;
use support::square;

const LAYERS: u64 = 5;
const PER_LAYER: u64 = 4;

fn node_id(layer: u64, i: u64) -> u64 {
    layer * 10 + i
}

/// Layered graph: `PER_LAYER` nodes on each of `LAYERS` sections, edges only between
/// neighbouring sections.
fn layered_graph(links: &[(u64, u64, u64)]) -> AnnotationGraph {
    let mut graph = AnnotationGraph::new();
    for layer in 0..LAYERS {
        for i in 0..PER_LAYER {
            graph.add_node(node_id(layer, i), layer as f64, square(i as f64 * 3.0, 0.0, 2.0));
        }
    }
    for &(layer, i, j) in links {
        graph.add_edge(node_id(layer, i), node_id(layer + 1, j)).unwrap();
    }
    graph
}

proptest! {
    /// Every edge ends up in exactly one group, joining that group's two levels
    #[test]
    fn test_partition_is_total_and_disjoint(
        links in prop::collection::vec((0..LAYERS - 1, 0..PER_LAYER, 0..PER_LAYER), 0..24)
    ) {
        let graph = layered_graph(&links);
        let groups = partition(&graph).unwrap();

        let mut assigned = BTreeSet::new();
        for group in &groups {
            prop_assert!(!group.edges.is_empty());
            prop_assert!(group.above.is_disjoint(&group.below));
            for &(a, b) in &group.edges {
                prop_assert!(assigned.insert((a, b)), "edge {:?} assigned twice", (a, b));
                let (za, zb) = (graph.node(a).unwrap().z, graph.node(b).unwrap().z);
                let (upper, lower) = if za > zb { (a, b) } else { (b, a) };
                prop_assert!(group.above.contains(&upper));
                prop_assert!(group.below.contains(&lower));
            }
        }
        let all: BTreeSet<_> = graph.edges().collect();
        prop_assert_eq!(assigned, all);
    }

    /// Edges skipping a section never make partitioning fail or put a node on both
    /// levels of a group
    #[test]
    fn test_partition_survives_skipping_edges(
        links in prop::collection::vec((0..LAYERS - 1, 0..PER_LAYER, 0..PER_LAYER), 0..24),
        skips in prop::collection::vec((0..LAYERS - 2, 0..PER_LAYER, 0..PER_LAYER), 0..6)
    ) {
        let mut graph = layered_graph(&links);
        for &(layer, i, j) in &skips {
            graph.add_edge(node_id(layer, i), node_id(layer + 2, j)).unwrap();
        }
        let groups = partition(&graph).unwrap();

        let mut assigned = BTreeSet::new();
        for group in &groups {
            prop_assert!(group.above.is_disjoint(&group.below));
            for &edge in &group.edges {
                prop_assert!(assigned.insert(edge), "edge {:?} assigned twice", edge);
            }
        }
        let all: BTreeSet<_> = graph.edges().collect();
        prop_assert!(assigned.is_subset(&all));
        if skips.is_empty() {
            prop_assert_eq!(assigned, all);
        }
    }
}

/// A split and a merge on the same pair of sections form one group
#[test]
fn test_branches_share_a_group() {
    println!("=== Testing Branch Grouping ===");

    // 1 splits into 2 and 3; 3 and 4 merge into 5 one section up
    let mut graph = AnnotationGraph::new();
    graph.add_node(1, 0.0, square(0.0, 0.0, 6.0));
    graph.add_node(4, 0.0, square(10.0, 0.0, 2.0));
    graph.add_node(2, 1.0, square(0.0, 0.0, 2.0));
    graph.add_node(3, 1.0, square(4.0, 0.0, 2.0));
    graph.add_node(5, 2.0, square(0.0, 0.0, 12.0));
    graph.add_edge(1, 2).unwrap();
    graph.add_edge(1, 3).unwrap();
    graph.add_edge(3, 5).unwrap();
    graph.add_edge(4, 3).unwrap();

    let groups = partition(&graph).unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].below, BTreeSet::from([1, 4]));
    assert_eq!(groups[0].above, BTreeSet::from([2, 3]));
    assert_eq!(groups[0].edges.len(), 3);
    assert!(groups[0].has_slice_above);
    assert_eq!(groups[1].below, BTreeSet::from([3]));
    assert_eq!(groups[1].above, BTreeSet::from([5]));
    assert!(groups[1].has_slice_below);
    assert!(!groups[1].has_slice_above);

    println!("✓ {} groups", groups.len());
}

/// An edge skipping a section is dropped; the rest of the graph is still grouped
#[test]
fn test_section_skipping_edge_is_dropped() {
    println!("=== Testing Level Conflict ===");

    let mut graph = AnnotationGraph::new();
    graph.add_node(1, 0.0, square(0.0, 0.0, 2.0));
    graph.add_node(2, 1.0, square(0.0, 0.0, 2.0));
    graph.add_node(3, 2.0, square(0.0, 0.0, 2.0));
    graph.add_node(10, 0.0, square(20.0, 0.0, 2.0));
    graph.add_node(11, 1.0, square(20.0, 0.0, 2.0));
    graph.add_edge(1, 2).unwrap();
    graph.add_edge(2, 3).unwrap();
    graph.add_edge(1, 3).unwrap();
    graph.add_edge(10, 11).unwrap();

    let groups = partition(&graph).unwrap();
    assert_eq!(groups.len(), 3);
    let edges: Vec<_> = groups.iter().flat_map(|g| g.edges.iter().copied()).collect();
    assert_eq!(edges, vec![(1, 2), (2, 3), (10, 11)]);
    assert!(groups[0].has_slice_above);
    assert!(groups[1].has_slice_below);
    assert!(!groups[2].has_slice_above && !groups[2].has_slice_below);

    println!("✓ Edge (1, 3) dropped, {} groups", groups.len());
}
