use std::collections::VecDeque;

use tracing::debug;

use super::geometry::GridPoint;
use super::grid::CollisionGrid;

/// Receives the waypoints of a finished request, or `None` when no path
/// exists. "No path" is an ordinary answer.
pub type PathCallback = Box<dyn FnOnce(Option<Vec<GridPoint>>)>;

/// Pathfinding collaborator. Requests are queued by `find_path` and only
/// resolved when `calculate` runs.
pub trait Pathfinder {
    fn set_grid(&mut self, grid: &CollisionGrid);
    /// Forgets the grid; later requests resolve to no path.
    fn clear_grid(&mut self);
    fn find_path(&mut self, start: GridPoint, end: GridPoint, callback: PathCallback);
    fn calculate(&mut self);
}

struct PathRequest {
    start: GridPoint,
    end: GridPoint,
    callback: PathCallback,
}

/// Four-neighbour A* over a walkability snapshot of the collision grid.
/// Waypoints exclude the start cell; a request whose start is its goal yields
/// just the goal.
#[derive(Default)]
pub struct GridPathfinder {
    cols: u32,
    rows: u32,
    walkable: Vec<bool>,
    requests: VecDeque<PathRequest>,
}

impl GridPathfinder {
    pub fn new(grid: &CollisionGrid) -> Self {
        let mut pathfinder = Self::default();
        pathfinder.set_grid(grid);
        pathfinder
    }

    pub fn has_grid(&self) -> bool {
        !self.walkable.is_empty()
    }

    pub fn pending_requests(&self) -> usize {
        self.requests.len()
    }

    pub fn is_walkable(&self, cell: GridPoint) -> bool {
        self.index_of(cell)
            .and_then(|index| self.walkable.get(index))
            .copied()
            .unwrap_or(false)
    }

    fn index_of(&self, cell: GridPoint) -> Option<usize> {
        if cell.col < 0 || cell.row < 0 {
            return None;
        }
        let (col, row) = (cell.col as u32, cell.row as u32);
        if col >= self.cols || row >= self.rows {
            return None;
        }
        Some(row as usize * self.cols as usize + col as usize)
    }

    fn cell_of(&self, index: usize) -> GridPoint {
        let cols = self.cols.max(1) as usize;
        GridPoint::new((index % cols) as i32, (index / cols) as i32)
    }

    /// Synchronous search used by `calculate`.
    pub fn search(&self, start: GridPoint, goal: GridPoint) -> Option<Vec<GridPoint>> {
        let cells = self.find_cells(start, goal)?;
        if cells.len() == 1 {
            return Some(vec![goal]);
        }
        Some(cells.into_iter().skip(1).collect())
    }

    fn find_cells(&self, start: GridPoint, goal: GridPoint) -> Option<Vec<GridPoint>> {
        let start_index = self.index_of(start)?;
        let goal_index = self.index_of(goal)?;
        if !self.is_walkable(start) || !self.is_walkable(goal) {
            return None;
        }
        if start == goal {
            return Some(vec![start]);
        }

        let node_count = self.walkable.len();
        let mut closed = vec![false; node_count];
        let mut best_g = vec![u32::MAX; node_count];
        let mut parent = vec![None::<usize>; node_count];
        let mut open = Vec::new();
        let mut next_insertion = 0u64;

        let start_h = manhattan_distance(start, goal);
        open.push(OpenNode {
            cell: start,
            h_cost: start_h,
            f_cost: start_h,
            insertion_order: next_insertion,
        });
        next_insertion = next_insertion.saturating_add(1);
        best_g[start_index] = 0;

        while !open.is_empty() {
            let best_index = pick_best_open_node_index(&open);
            let current = open.swap_remove(best_index);
            let Some(current_index) = self.index_of(current.cell) else {
                continue;
            };
            if closed[current_index] {
                continue;
            }
            closed[current_index] = true;

            if current_index == goal_index {
                return self.reconstruct(&parent, start_index, goal_index);
            }

            let current_g = best_g[current_index];
            for neighbor in neighbors4(current.cell) {
                let Some(neighbor_index) = self.index_of(neighbor) else {
                    continue;
                };
                if closed[neighbor_index] || !self.walkable[neighbor_index] {
                    continue;
                }

                let tentative_g = current_g.saturating_add(1);
                if tentative_g >= best_g[neighbor_index] {
                    continue;
                }

                best_g[neighbor_index] = tentative_g;
                parent[neighbor_index] = Some(current_index);
                let h_cost = manhattan_distance(neighbor, goal);
                open.push(OpenNode {
                    cell: neighbor,
                    h_cost,
                    f_cost: tentative_g.saturating_add(h_cost),
                    insertion_order: next_insertion,
                });
                next_insertion = next_insertion.saturating_add(1);
            }
        }

        None
    }

    fn reconstruct(
        &self,
        parent: &[Option<usize>],
        start_index: usize,
        goal_index: usize,
    ) -> Option<Vec<GridPoint>> {
        let mut cursor = goal_index;
        let mut indices = vec![cursor];
        while cursor != start_index {
            cursor = parent.get(cursor).copied().flatten()?;
            indices.push(cursor);
        }
        indices.reverse();
        Some(indices.into_iter().map(|index| self.cell_of(index)).collect())
    }
}

impl Pathfinder for GridPathfinder {
    fn set_grid(&mut self, grid: &CollisionGrid) {
        self.cols = grid.cols();
        self.rows = grid.rows();
        self.walkable = (0..grid.rows() as i32)
            .flat_map(|row| (0..grid.cols() as i32).map(move |col| GridPoint::new(col, row)))
            .map(|cell| grid.is_walkable(cell))
            .collect();
    }

    fn clear_grid(&mut self) {
        self.cols = 0;
        self.rows = 0;
        self.walkable.clear();
    }

    fn find_path(&mut self, start: GridPoint, end: GridPoint, callback: PathCallback) {
        self.requests.push_back(PathRequest {
            start,
            end,
            callback,
        });
    }

    fn calculate(&mut self) {
        while let Some(request) = self.requests.pop_front() {
            let path = if self.has_grid() {
                self.search(request.start, request.end)
            } else {
                None
            };
            if path.is_none() {
                debug!(
                    start_col = request.start.col,
                    start_row = request.start.row,
                    end_col = request.end.col,
                    end_row = request.end.row,
                    "no_path"
                );
            }
            (request.callback)(path);
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenNode {
    cell: GridPoint,
    h_cost: u32,
    f_cost: u32,
    insertion_order: u64,
}

fn pick_best_open_node_index(open: &[OpenNode]) -> usize {
    let mut best_index = 0usize;
    for index in 1..open.len() {
        if open_node_order_key(open[index]) < open_node_order_key(open[best_index]) {
            best_index = index;
        }
    }
    best_index
}

fn open_node_order_key(node: OpenNode) -> (u32, u32, i32, i32, u64) {
    (
        node.f_cost,
        node.h_cost,
        node.cell.row,
        node.cell.col,
        node.insertion_order,
    )
}

/// Down, right, up, left.
fn neighbors4(cell: GridPoint) -> [GridPoint; 4] {
    [
        GridPoint::new(cell.col, cell.row + 1),
        GridPoint::new(cell.col + 1, cell.row),
        GridPoint::new(cell.col, cell.row - 1),
        GridPoint::new(cell.col - 1, cell.row),
    ]
}

fn manhattan_distance(a: GridPoint, b: GridPoint) -> u32 {
    a.col.abs_diff(b.col).saturating_add(a.row.abs_diff(b.row))
}
