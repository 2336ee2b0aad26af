//! Uniform grid hashing for radius queries.

use nalgebra::Point3;
use std::collections::HashMap;

type CellKey = (i64, i64, i64);

/// Grid-based spatial index over a fixed set of positions.
///
/// Space is divided into cubic cells of edge `cell_size`; a radius query with
/// `radius <= cell_size` only has to visit the 27 cells around the query point.
#[derive(Debug)]
pub(crate) struct SpatialGrid {
    inv_cell_size: f64,
    cells: HashMap<CellKey, Vec<usize>>,
}

impl SpatialGrid {
    /// Builds a grid over `positions`, storing each position's index in its cell.
    ///
    /// `cell_size` must be positive; callers pass the (validated) graph cutoff.
    pub fn from_positions(positions: &[Point3<f64>], cell_size: f64) -> Self {
        debug_assert!(cell_size > 0.0, "cell size must be positive");
        let mut grid = Self {
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::new(),
        };
        for (index, position) in positions.iter().enumerate() {
            let key = grid.cell_of(position);
            grid.cells.entry(key).or_default().push(index);
        }
        grid
    }

    fn cell_of(&self, position: &Point3<f64>) -> CellKey {
        (
            (position.x * self.inv_cell_size).floor() as i64,
            (position.y * self.inv_cell_size).floor() as i64,
            (position.z * self.inv_cell_size).floor() as i64,
        )
    }

    /// Indices stored in the 27 cells surrounding `query`, in no particular order.
    ///
    /// The result is a superset of every index within one cell size of `query`; the caller
    /// applies the exact distance test.
    pub fn candidates(&self, query: &Point3<f64>) -> impl Iterator<Item = usize> + '_ {
        let (cx, cy, cz) = self.cell_of(query);
        (-1..=1)
            .flat_map(move |dx| (-1..=1).flat_map(move |dy| (-1..=1).map(move |dz| (dx, dy, dz))))
            .filter_map(move |(dx, dy, dz)| self.cells.get(&(cx + dx, cy + dy, cz + dz)))
            .flatten()
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn within(grid: &SpatialGrid, positions: &[Point3<f64>], query: Point3<f64>, r: f64) -> Vec<usize> {
        let mut found: Vec<_> = grid
            .candidates(&query)
            .filter(|&i| (positions[i] - query).norm() <= r)
            .collect();
        found.sort_unstable();
        found
    }

    #[test]
    fn empty_grid_yields_no_candidates() {
        let grid = SpatialGrid::from_positions(&[], 1.0);
        assert_eq!(grid.candidates(&Point3::origin()).count(), 0);
    }

    #[test]
    fn finds_atoms_in_adjacent_cells() {
        let positions = vec![Point3::new(0.95, 0.0, 0.0), Point3::new(1.05, 0.0, 0.0)];
        let grid = SpatialGrid::from_positions(&positions, 1.0);
        assert_eq!(within(&grid, &positions, positions[0], 1.0), vec![0, 1]);
    }

    #[test]
    fn handles_negative_coordinates() {
        let positions = vec![Point3::new(-0.1, -0.1, -0.1), Point3::new(0.1, 0.1, 0.1)];
        let grid = SpatialGrid::from_positions(&positions, 0.5);
        assert_eq!(within(&grid, &positions, Point3::origin(), 0.5), vec![0, 1]);
    }

    #[test]
    fn skips_cells_beyond_the_neighborhood() {
        let positions = vec![Point3::origin(), Point3::new(2.5, 0.0, 0.0)];
        let grid = SpatialGrid::from_positions(&positions, 1.0);
        let candidates: Vec<_> = grid.candidates(&Point3::origin()).collect();
        assert_eq!(candidates, vec![0]);
    }
}
