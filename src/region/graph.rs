//! Pairing graph between regions on different levels.

use super::Region;
use crate::float_types::Real;
use crate::mesh::SliceMesh;
use std::collections::BTreeMap;

/// Regions as nodes; an edge joins two regions whose kinds may pair, whose Z sets
/// differ and that share at least one mesh edge. Edge weights are the mean length of
/// those mesh edges.
#[derive(Debug, Clone, Default)]
pub struct RegionGraph {
    regions: Vec<Region>,
    edges: BTreeMap<(usize, usize), Real>,
}

impl RegionGraph {
    /// A vertex shared by several regions is attributed to the first of them.
    pub fn build(mesh: &SliceMesh, regions: Vec<Region>) -> Self {
        let mut owner: BTreeMap<usize, usize> = BTreeMap::new();
        for (r, region) in regions.iter().enumerate() {
            for v in region.vertices() {
                owner.entry(v).or_insert(r);
            }
        }
        let levels: Vec<_> = regions.iter().map(|r| r.z_levels(mesh)).collect();

        let mut lengths: BTreeMap<(usize, usize), Vec<Real>> = BTreeMap::new();
        for edge in mesh.edges() {
            let (Some(&ra), Some(&rb)) = (owner.get(&edge.key.a), owner.get(&edge.key.b)) else {
                continue;
            };
            if ra == rb
                || !regions[ra].kind().is_valid_pair(regions[rb].kind())
                || levels[ra] == levels[rb]
            {
                continue;
            }
            let length = (mesh.position(edge.key.a) - mesh.position(edge.key.b)).norm();
            lengths.entry((ra.min(rb), ra.max(rb))).or_default().push(length);
        }

        let edges = lengths
            .into_iter()
            .map(|(pair, l)| (pair, l.iter().sum::<Real>() / l.len() as Real))
            .collect();
        Self { regions, edges }
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region(&self, r: usize) -> &Region {
        &self.regions[r]
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Region pairs with their weights, in pair order.
    pub fn edges(&self) -> impl Iterator<Item = ((usize, usize), Real)> + '_ {
        self.edges.iter().map(|(k, w)| (*k, *w))
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn weight(&self, a: usize, b: usize) -> Option<Real> {
        self.edges.get(&(a.min(b), a.max(b))).copied()
    }

    pub fn degree(&self, r: usize) -> usize {
        self.edges.keys().filter(|(a, b)| *a == r || *b == r).count()
    }

    /// Regions without any graph edge, in region order.
    pub fn isolated(&self) -> Vec<usize> {
        (0..self.regions.len()).filter(|&r| self.degree(r) == 0).collect()
    }
}
