use thiserror::Error;

use super::geometry::{cell_bounds, grid_to_world, world_to_grid, Aabb, GridPoint, Vec2};

/// Map/loader collaborator. A tile value of `0` is walkable, anything else
/// blocks movement and line of sight.
pub trait MapSource {
    fn data(&self) -> &[Vec<i32>];
    fn tile_size(&self) -> f32;
    fn cols(&self) -> usize;
    fn rows(&self) -> usize;
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("tile size must be positive and finite, got {tile_size}")]
    InvalidTileSize { tile_size: f32 },
    #[error("grid must have at least one cell, got {cols}x{rows}")]
    Empty { cols: usize, rows: usize },
    #[error("row count mismatch: expected {expected}, got {actual}")]
    RowCountMismatch { expected: usize, actual: usize },
    #[error("row {row} has {actual} columns, expected {expected}")]
    RowLengthMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
}

/// Static collision grid. Cell (0,0) covers world `[0, tile_size)` on both
/// axes; rows grow downward.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionGrid {
    cols: u32,
    rows: u32,
    tile_size: f32,
    tiles: Vec<i32>,
}

const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

impl CollisionGrid {
    pub fn new(cols: u32, rows: u32, tile_size: f32, tiles: Vec<i32>) -> Result<Self, GridError> {
        if !tile_size.is_finite() || tile_size <= 0.0 {
            return Err(GridError::InvalidTileSize { tile_size });
        }
        if cols == 0 || rows == 0 {
            return Err(GridError::Empty {
                cols: cols as usize,
                rows: rows as usize,
            });
        }
        let expected = cols as usize * rows as usize;
        let actual = tiles.len();
        if expected != actual {
            return Err(GridError::TileCountMismatch { expected, actual });
        }
        Ok(Self {
            cols,
            rows,
            tile_size,
            tiles,
        })
    }

    pub fn from_source(source: &impl MapSource) -> Result<Self, GridError> {
        let cols = source.cols();
        let rows = source.rows();
        let data = source.data();
        if data.len() != rows {
            return Err(GridError::RowCountMismatch {
                expected: rows,
                actual: data.len(),
            });
        }
        let mut tiles = Vec::with_capacity(cols * rows);
        for (row, line) in data.iter().enumerate() {
            if line.len() != cols {
                return Err(GridError::RowLengthMismatch {
                    row,
                    expected: cols,
                    actual: line.len(),
                });
            }
            tiles.extend_from_slice(line);
        }
        Self::new(cols as u32, rows as u32, source.tile_size(), tiles)
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn world_size(&self) -> Vec2 {
        Vec2::new(
            self.cols as f32 * self.tile_size,
            self.rows as f32 * self.tile_size,
        )
    }

    pub fn contains(&self, cell: GridPoint) -> bool {
        cell.col >= 0
            && cell.row >= 0
            && (cell.col as u32) < self.cols
            && (cell.row as u32) < self.rows
    }

    pub fn index_of(&self, cell: GridPoint) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        Some(cell.row as usize * self.cols as usize + cell.col as usize)
    }

    pub fn tile_at(&self, cell: GridPoint) -> Option<i32> {
        self.index_of(cell)
            .and_then(|index| self.tiles.get(index).copied())
    }

    /// In-bounds cells with a non-zero tile. Cells outside the map are
    /// neither blocking nor walkable.
    pub fn is_blocking(&self, cell: GridPoint) -> bool {
        self.tile_at(cell).is_some_and(|tile| tile != 0)
    }

    pub fn is_walkable(&self, cell: GridPoint) -> bool {
        self.tile_at(cell) == Some(0)
    }

    pub fn world_to_cell(&self, world: Vec2) -> GridPoint {
        world_to_grid(world, self.tile_size)
    }

    pub fn cell_center(&self, cell: GridPoint) -> Vec2 {
        grid_to_world(cell, self.tile_size)
    }

    pub fn cell_bounds(&self, cell: GridPoint) -> Aabb {
        cell_bounds(cell, self.tile_size)
    }

    /// The up-to-eight in-bounds neighbors of `cell`, row-major order.
    pub fn neighbors8(&self, cell: GridPoint) -> impl Iterator<Item = GridPoint> + '_ {
        NEIGHBOR_OFFSETS
            .iter()
            .map(move |(dc, dr)| GridPoint::new(cell.col + dc, cell.row + dr))
            .filter(move |neighbor| self.contains(*neighbor))
    }

    /// Blocking cells inside the inclusive cell rectangle `min..=max`,
    /// clipped to the grid, row-major order.
    pub fn blocking_cells_in(
        &self,
        min: GridPoint,
        max: GridPoint,
    ) -> impl Iterator<Item = GridPoint> + '_ {
        let col_min = min.col.max(0);
        let row_min = min.row.max(0);
        let col_max = max.col.min(self.cols as i32 - 1);
        let row_max = max.row.min(self.rows as i32 - 1);
        (row_min..=row_max)
            .flat_map(move |row| (col_min..=col_max).map(move |col| GridPoint::new(col, row)))
            .filter(move |cell| self.is_blocking(*cell))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RawMap {
        data: Vec<Vec<i32>>,
        tile_size: f32,
        cols: usize,
        rows: usize,
    }

    impl MapSource for RawMap {
        fn data(&self) -> &[Vec<i32>] {
            &self.data
        }

        fn tile_size(&self) -> f32 {
            self.tile_size
        }

        fn cols(&self) -> usize {
            self.cols
        }

        fn rows(&self) -> usize {
            self.rows
        }
    }

    #[test]
    fn new_rejects_invalid_tile_count() {
        let err = CollisionGrid::new(2, 2, 16.0, vec![0, 1, 0]).expect_err("err");
        assert_eq!(
            err,
            GridError::TileCountMismatch {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn new_rejects_non_positive_tile_size() {
        assert!(matches!(
            CollisionGrid::new(1, 1, 0.0, vec![0]),
            Err(GridError::InvalidTileSize { .. })
        ));
    }

    #[test]
    fn from_source_reports_ragged_rows() {
        let map = RawMap {
            data: vec![vec![0, 0, 0], vec![0, 1]],
            tile_size: 8.0,
            cols: 3,
            rows: 2,
        };
        let err = CollisionGrid::from_source(&map).expect_err("ragged");
        assert_eq!(
            err,
            GridError::RowLengthMismatch {
                row: 1,
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn blocking_and_walkable_respect_bounds() {
        let map = RawMap {
            data: vec![vec![0, 2], vec![0, 0]],
            tile_size: 8.0,
            cols: 2,
            rows: 2,
        };
        let grid = CollisionGrid::from_source(&map).expect("grid");
        assert!(grid.is_blocking(GridPoint::new(1, 0)));
        assert!(grid.is_walkable(GridPoint::new(0, 1)));
        assert!(!grid.is_blocking(GridPoint::new(5, 0)));
        assert!(!grid.is_walkable(GridPoint::new(-1, 0)));
    }

    #[test]
    fn neighbors8_clips_at_corners() {
        let grid = CollisionGrid::new(3, 3, 10.0, vec![0; 9]).expect("grid");
        assert_eq!(grid.neighbors8(GridPoint::new(1, 1)).count(), 8);
        let corner: Vec<GridPoint> = grid.neighbors8(GridPoint::new(0, 0)).collect();
        assert_eq!(
            corner,
            vec![
                GridPoint::new(1, 0),
                GridPoint::new(0, 1),
                GridPoint::new(1, 1)
            ]
        );
    }

    #[test]
    fn blocking_cells_in_clips_rectangle() {
        let mut tiles = vec![0; 16];
        tiles[5] = 1;
        tiles[15] = 1;
        let grid = CollisionGrid::new(4, 4, 10.0, tiles).expect("grid");
        let cells: Vec<GridPoint> = grid
            .blocking_cells_in(GridPoint::new(-3, -3), GridPoint::new(2, 2))
            .collect();
        assert_eq!(cells, vec![GridPoint::new(1, 1)]);
    }
}
