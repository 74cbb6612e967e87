//! Toroidal grid: wrap-around coordinates and distances
//!
//! All coordinate arithmetic in the pipeline is modulo the grid
//! dimensions. Positions are normalized lazily: raw offsets may leave
//! the bounds, and `normalize` folds them back before any lookup or
//! comparison.

use crate::core::error::{GridlockError, Result};
use crate::core::types::{Direction, Position};

/// One grid cell
#[derive(Debug, Clone, Copy, Default)]
pub struct Cell {
    /// Extractable resource remaining on the cell.
    pub resource: i32,
}

/// 2D grid whose coordinates wrap modulo width and height
#[derive(Debug, Clone)]
pub struct TorusGrid {
    width: i32,
    height: i32,
    cells: Vec<Cell>,
}

impl TorusGrid {
    /// Create a grid of empty cells.
    ///
    /// # Errors
    ///
    /// Rejects non-positive dimensions.
    pub fn new(width: i32, height: i32) -> Result<Self> {
        if width <= 0 || height <= 0 {
            return Err(GridlockError::EmptyGrid { width, height });
        }
        Ok(Self {
            width,
            height,
            cells: vec![Cell::default(); (width * height) as usize],
        })
    }

    /// Create a grid from row-major resource values.
    pub fn from_resources(width: i32, height: i32, resources: &[i32]) -> Result<Self> {
        let mut grid = Self::new(width, height)?;
        for (cell, &resource) in grid.cells.iter_mut().zip(resources) {
            cell.resource = resource;
        }
        Ok(grid)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Fold a raw position back into grid bounds.
    pub fn normalize(&self, pos: Position) -> Position {
        Position {
            x: pos.x.rem_euclid(self.width),
            y: pos.y.rem_euclid(self.height),
        }
    }

    fn index(&self, pos: Position) -> usize {
        let p = self.normalize(pos);
        (p.y * self.width + p.x) as usize
    }

    pub fn at(&self, pos: Position) -> &Cell {
        &self.cells[self.index(pos)]
    }

    pub fn at_mut(&mut self, pos: Position) -> &mut Cell {
        let idx = self.index(pos);
        &mut self.cells[idx]
    }

    /// Wrapped Manhattan distance: per axis, the shorter of the direct
    /// and the wrap-around delta.
    pub fn distance(&self, a: Position, b: Position) -> i32 {
        let a = self.normalize(a);
        let b = self.normalize(b);
        let dx = (a.x - b.x).abs();
        let dy = (a.y - b.y).abs();
        dx.min(self.width - dx) + dy.min(self.height - dy)
    }

    /// Neighbor of `pos` one step in `dir`, normalized.
    pub fn offset(&self, pos: Position, dir: Direction) -> Position {
        self.normalize(pos.step(dir))
    }

    /// Directions that shorten the wrapped distance from `from` to `to`.
    ///
    /// At most one direction per axis; an axis whose two routes are
    /// equally long contributes its positive direction, keeping the
    /// result deterministic.
    pub fn toward(&self, from: Position, to: Position) -> Vec<Direction> {
        let from = self.normalize(from);
        let to = self.normalize(to);
        let mut moves = Vec::with_capacity(2);

        let dx = (to.x - from.x).rem_euclid(self.width);
        if dx != 0 {
            if dx <= self.width - dx {
                moves.push(Direction::East);
            } else {
                moves.push(Direction::West);
            }
        }

        let dy = (to.y - from.y).rem_euclid(self.height);
        if dy != 0 {
            if dy <= self.height - dy {
                moves.push(Direction::South);
            } else {
                moves.push(Direction::North);
            }
        }

        moves
    }

    /// Cost for an agent to leave `pos` this tick.
    pub fn move_cost(&self, pos: Position, move_cost_ratio: i32) -> i32 {
        self.at(pos).resource / move_cost_ratio
    }

    /// Closest of `candidates` to `from` by wrapped distance.
    ///
    /// Earlier candidates win ties, so a stable depot list yields a
    /// stable nearest depot.
    pub fn closest(&self, from: Position, candidates: &[Position]) -> Option<Position> {
        let mut best: Option<(Position, i32)> = None;
        for &candidate in candidates {
            let d = self.distance(from, candidate);
            match best {
                Some((_, best_d)) if d >= best_d => {}
                _ => best = Some((candidate, d)),
            }
        }
        best.map(|(pos, _)| pos)
    }

    /// Sum of resources on cells within wrapped distance `radius` of
    /// `center`.
    pub fn sum_in_radius(&self, center: Position, radius: i32) -> i64 {
        let center = self.normalize(center);
        let mut total = 0i64;
        for dy in -radius..=radius {
            let rem = radius - dy.abs();
            for dx in -rem..=rem {
                let pos = self.normalize(Position::new(center.x + dx, center.y + dy));
                total += i64::from(self.at(pos).resource);
            }
        }
        total
    }

    /// Iterate over all normalized positions, row-major.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Position::new(x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_degenerate_dimensions() {
        assert!(TorusGrid::new(0, 8).is_err());
        assert!(TorusGrid::new(8, -1).is_err());
    }

    #[test]
    fn test_normalize_wraps_both_axes() {
        let grid = TorusGrid::new(8, 8).unwrap();
        assert_eq!(grid.normalize(Position::new(-1, 8)), Position::new(7, 0));
        assert_eq!(grid.normalize(Position::new(17, -9)), Position::new(1, 7));
    }

    #[test]
    fn test_distance_uses_shorter_wrap() {
        let grid = TorusGrid::new(8, 8).unwrap();
        // Direct delta is 7, wrapping is 1.
        assert_eq!(grid.distance(Position::new(0, 0), Position::new(7, 0)), 1);
        assert_eq!(grid.distance(Position::new(0, 0), Position::new(4, 4)), 8);
        assert_eq!(grid.distance(Position::new(2, 3), Position::new(2, 3)), 0);
    }

    #[test]
    fn test_offset_wraps_at_edges() {
        let grid = TorusGrid::new(8, 8).unwrap();
        assert_eq!(
            grid.offset(Position::new(0, 0), Direction::West),
            Position::new(7, 0)
        );
        assert_eq!(
            grid.offset(Position::new(7, 7), Direction::South),
            Position::new(7, 0)
        );
    }

    #[test]
    fn test_toward_prefers_wrap_when_shorter() {
        let grid = TorusGrid::new(8, 8).unwrap();
        // Going 0 -> 6 on x is shorter westward across the seam.
        let moves = grid.toward(Position::new(0, 0), Position::new(6, 0));
        assert_eq!(moves, vec![Direction::West]);

        let moves = grid.toward(Position::new(0, 0), Position::new(2, 6));
        assert_eq!(moves, vec![Direction::East, Direction::North]);
    }

    #[test]
    fn test_toward_at_destination_is_empty() {
        let grid = TorusGrid::new(8, 8).unwrap();
        assert!(grid
            .toward(Position::new(3, 3), Position::new(3, 3))
            .is_empty());
    }

    #[test]
    fn test_move_cost_scales_with_cell_resource() {
        let mut grid = TorusGrid::new(8, 8).unwrap();
        grid.at_mut(Position::new(1, 1)).resource = 95;
        assert_eq!(grid.move_cost(Position::new(1, 1), 10), 9);
        assert_eq!(grid.move_cost(Position::new(0, 0), 10), 0);
    }

    #[test]
    fn test_closest_breaks_ties_by_list_order() {
        let grid = TorusGrid::new(8, 8).unwrap();
        let depots = [Position::new(2, 0), Position::new(6, 0)];
        // (4, 0) is distance 2 from both; first listed wins.
        assert_eq!(
            grid.closest(Position::new(4, 0), &depots),
            Some(Position::new(2, 0))
        );
        assert_eq!(grid.closest(Position::new(4, 0), &[]), None);
    }

    #[test]
    fn test_sum_in_radius_wraps_across_seams() {
        let mut grid = TorusGrid::new(8, 8).unwrap();
        grid.at_mut(Position::new(0, 0)).resource = 10;
        grid.at_mut(Position::new(7, 0)).resource = 5;
        grid.at_mut(Position::new(0, 7)).resource = 3;
        // Radius 1 around the origin reaches both wrapped neighbors.
        assert_eq!(grid.sum_in_radius(Position::new(0, 0), 1), 18);
    }
}
