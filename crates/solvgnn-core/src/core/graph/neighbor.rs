use super::spatial::SpatialGrid;
use nalgebra::Point3;
use serde::Deserialize;
use tracing::trace;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A neighbor cap large enough to be effectively unbounded for small molecules.
pub const UNBOUNDED_NEIGHBORS: usize = 10_000;

/// Atom count above which [`NeighborSearch::Auto`] switches to the cell list.
const CELL_LIST_THRESHOLD: usize = 256;

/// Strategy used to enumerate candidate neighbors. All strategies produce identical graphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NeighborSearch {
    #[default]
    Auto,
    AllPairs,
    CellList,
}

/// A directed radius graph.
///
/// Edge `k` points from `sources()[k]` to `targets()[k]`: the target receives the influence
/// of the source. Edges are grouped by target in ascending order; within a target they are
/// ordered by distance, then by source index. Every target keeps at most `max_neighbors`
/// incoming edges (the nearest ones). There are no self edges, and when batch ids are given
/// both endpoints of every edge share one.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborGraph {
    sources: Vec<u32>,
    targets: Vec<u32>,
    cutoff: f64,
    max_neighbors: usize,
}

impl NeighborGraph {
    /// Builds the radius graph over `positions`.
    ///
    /// # Arguments
    ///
    /// * `positions` - Atom coordinates.
    /// * `batch_ids` - Molecule index per atom; `None` treats all atoms as one molecule.
    /// * `cutoff` - Inclusive distance cutoff, in the units of `positions`.
    /// * `max_neighbors` - Maximum number of incoming edges per target.
    /// * `search` - Candidate enumeration strategy.
    pub fn build(
        positions: &[Point3<f64>],
        batch_ids: Option<&[usize]>,
        cutoff: f64,
        max_neighbors: usize,
        search: NeighborSearch,
    ) -> Self {
        let n = positions.len();
        let cutoff_sq = cutoff * cutoff;
        let use_cell_list = match search {
            NeighborSearch::Auto => n > CELL_LIST_THRESHOLD,
            NeighborSearch::AllPairs => false,
            NeighborSearch::CellList => true,
        };
        let grid = use_cell_list.then(|| SpatialGrid::from_positions(positions, cutoff));

        let incoming = |target: usize| -> Vec<(f64, usize)> {
            let query = positions[target];
            let accept = |source: usize| -> Option<(f64, usize)> {
                if source == target || batch_ids.is_some_and(|b| b[source] != b[target]) {
                    return None;
                }
                let dist_sq = (positions[source] - query).norm_squared();
                (dist_sq <= cutoff_sq).then_some((dist_sq, source))
            };

            let mut found: Vec<(f64, usize)> = match &grid {
                Some(grid) => grid.candidates(&query).filter_map(accept).collect(),
                None => (0..n).filter_map(accept).collect(),
            };
            found.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            found.truncate(max_neighbors);
            found
        };

        #[cfg(not(feature = "parallel"))]
        let per_target: Vec<Vec<(f64, usize)>> = (0..n).map(incoming).collect();

        #[cfg(feature = "parallel")]
        let per_target: Vec<Vec<(f64, usize)>> = (0..n).into_par_iter().map(incoming).collect();

        let edge_count = per_target.iter().map(Vec::len).sum();
        let mut sources = Vec::with_capacity(edge_count);
        let mut targets = Vec::with_capacity(edge_count);
        for (target, neighbors) in per_target.into_iter().enumerate() {
            for (_, source) in neighbors {
                sources.push(source as u32);
                targets.push(target as u32);
            }
        }

        trace!(
            atoms = n,
            edges = edge_count,
            cutoff,
            cell_list = use_cell_list,
            "Built neighbor graph."
        );

        Self {
            sources,
            targets,
            cutoff,
            max_neighbors,
        }
    }

    pub fn sources(&self) -> &[u32] {
        &self.sources
    }

    pub fn targets(&self) -> &[u32] {
        &self.targets
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn max_neighbors(&self) -> usize {
        self.max_neighbors
    }

    /// Iterates over `(source, target)` pairs.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.sources
            .iter()
            .zip(&self.targets)
            .map(|(&s, &t)| (s as usize, t as usize))
    }

    /// Number of incoming edges of each of the first `atom_count` atoms.
    pub fn in_degrees(&self, atom_count: usize) -> Vec<usize> {
        let mut degrees = vec![0; atom_count];
        for &target in &self.targets {
            degrees[target as usize] += 1;
        }
        degrees
    }

    /// Atoms among the first `atom_count` that receive no edges.
    pub fn isolated_atoms(&self, atom_count: usize) -> Vec<usize> {
        self.in_degrees(atom_count)
            .into_iter()
            .enumerate()
            .filter(|&(_, degree)| degree == 0)
            .map(|(atom, _)| atom)
            .collect()
    }
}
