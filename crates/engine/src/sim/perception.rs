use super::actor::{Actor, ActorId};
use super::geometry::{point_in_circle, segment_intersection, GridPoint, SegmentHit, Vec2};
use super::grid::CollisionGrid;

/// One other actor inside the owner's sight radius. `occlusion` is the first
/// blocking edge the sight line crosses, `None` when the line is clear.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Percept {
    pub target: ActorId,
    pub team: u32,
    pub center: Vec2,
    pub distance: f32,
    pub alive: bool,
    pub occlusion: Option<Vec2>,
}

impl Percept {
    pub fn is_visible(&self) -> bool {
        self.occlusion.is_none()
    }
}

/// What one actor perceives on one tick, nearest first. Rebuilt from scratch
/// every tick; the tick stamp lets consumers refuse stale snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerceptionSnapshot {
    tick: u64,
    owner: Option<ActorId>,
    entries: Vec<Percept>,
}

impl PerceptionSnapshot {
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn owner(&self) -> Option<ActorId> {
        self.owner
    }

    pub fn entries(&self) -> &[Percept] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn visible(&self) -> impl Iterator<Item = &Percept> {
        self.entries.iter().filter(|percept| percept.is_visible())
    }

    pub fn get(&self, target: ActorId) -> Option<&Percept> {
        self.entries.iter().find(|percept| percept.target == target)
    }

    /// Nearest visible, living actor on a team other than `team`.
    pub fn nearest_visible_enemy(&self, team: u32) -> Option<&Percept> {
        self.visible()
            .find(|percept| percept.alive && percept.team != team)
    }
}

pub fn compute_perception(
    owner: &Actor,
    actors: &[Actor],
    grid: Option<&CollisionGrid>,
    sight_radius: f32,
    tick: u64,
) -> PerceptionSnapshot {
    let origin = owner.position();
    let mut entries: Vec<Percept> = actors
        .iter()
        .filter(|other| other.id() != owner.id())
        .filter(|other| point_in_circle(other.position(), origin, sight_radius))
        .map(|other| {
            let center = other.position();
            Percept {
                target: other.id(),
                team: other.team(),
                center,
                distance: origin.distance(center),
                alive: other.is_alive(),
                occlusion: grid
                    .and_then(|grid| first_occlusion(grid, origin, center, sight_radius))
                    .map(|hit| hit.point),
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| a.target.cmp(&b.target))
    });

    PerceptionSnapshot {
        tick,
        owner: Some(owner.id()),
        entries,
    }
}

/// Casts `from → to` against the blocking cells within `radius` of `from`,
/// testing only the two edges of each cell that face `from`. Returns the
/// crossing nearest to `from`.
pub fn first_occlusion(
    grid: &CollisionGrid,
    from: Vec2,
    to: Vec2,
    radius: f32,
) -> Option<SegmentHit> {
    let reach = if radius.is_finite() && radius > 0.0 {
        (radius / grid.tile_size()).ceil() as i32
    } else {
        0
    };
    let center = grid.world_to_cell(from);
    let min = GridPoint::new(center.col.saturating_sub(reach), center.row.saturating_sub(reach));
    let max = GridPoint::new(center.col.saturating_add(reach), center.row.saturating_add(reach));

    grid.blocking_cells_in(min, max)
        .filter_map(|cell| {
            let [vertical, horizontal] = facing_edges(grid, cell, from);
            let first = segment_intersection(from, to, vertical.0, vertical.1);
            let second = segment_intersection(from, to, horizontal.0, horizontal.1);
            nearer(first, second)
        })
        .min_by(|a, b| a.t.total_cmp(&b.t))
}

/// The vertical and horizontal edge of `cell` on the side of `viewer`.
fn facing_edges(grid: &CollisionGrid, cell: GridPoint, viewer: Vec2) -> [(Vec2, Vec2); 2] {
    let bounds = grid.cell_bounds(cell);
    let relative = viewer - bounds.center;
    let edge_x = if relative.x > 0.0 {
        bounds.max_x()
    } else {
        bounds.min_x()
    };
    let edge_y = if relative.y > 0.0 {
        bounds.max_y()
    } else {
        bounds.min_y()
    };
    [
        (
            Vec2::new(edge_x, bounds.min_y()),
            Vec2::new(edge_x, bounds.max_y()),
        ),
        (
            Vec2::new(bounds.min_x(), edge_y),
            Vec2::new(bounds.max_x(), edge_y),
        ),
    ]
}

fn nearer(a: Option<SegmentHit>, b: Option<SegmentHit>) -> Option<SegmentHit> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if b.t < a.t { b } else { a }),
        (a, b) => a.or(b),
    }
}
