use std::ops::{Add, AddAssign, Div, Mul, Sub};

/// Minimum penetration depth that counts as an overlap. Boxes that are flush
/// (or within float noise of flush) are treated as touching, not overlapping.
pub const OVERLAP_EPSILON: f32 = 1.0e-4;

const PARALLEL_EPSILON: f32 = 1.0e-9;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    pub fn distance_squared(self, other: Vec2) -> f32 {
        (other - self).length_squared()
    }

    pub fn lerp(self, other: Vec2, t: f32) -> Vec2 {
        Vec2 {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    fn cross(self, other: Vec2) -> f32 {
        self.x * other.y - self.y * other.x
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Vec2 {
    type Output = Vec2;

    fn div(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x / rhs, self.y / rhs)
    }
}

/// Column/row address of a grid cell. Signed so that world positions left of
/// or above the map convert without wrapping; bounds are checked by the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPoint {
    pub col: i32,
    pub row: i32,
}

impl GridPoint {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }
}

/// Axis-aligned box stored as center plus half-extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub center: Vec2,
    pub half: Vec2,
}

impl Aabb {
    pub const fn new(center: Vec2, half: Vec2) -> Self {
        Self { center, half }
    }

    pub fn min_x(&self) -> f32 {
        self.center.x - self.half.x
    }

    pub fn max_x(&self) -> f32 {
        self.center.x + self.half.x
    }

    pub fn min_y(&self) -> f32 {
        self.center.y - self.half.y
    }

    pub fn max_y(&self) -> f32 {
        self.center.y + self.half.y
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        let penetration_x = self.half.x + other.half.x - (self.center.x - other.center.x).abs();
        let penetration_y = self.half.y + other.half.y - (self.center.y - other.center.y).abs();
        penetration_x > OVERLAP_EPSILON && penetration_y > OVERLAP_EPSILON
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepResolution {
    pub position: Vec2,
    pub collision_x: bool,
    pub collision_y: bool,
}

pub fn point_in_circle(point: Vec2, center: Vec2, radius: f32) -> bool {
    point.distance_squared(center) <= radius * radius
}

/// Resolves a box moving from `previous` to `next` (centers, shared
/// half-extents `half`) against a static `obstacle`.
///
/// Returns `next` unchanged with no collision flags when the boxes do not
/// overlap at `next`. Otherwise the side of approach is read from `previous`
/// and the box is snapped flush against the obstacle on that single axis; the
/// other axis keeps its `next` coordinate.
pub fn resolve_box_sweep(
    previous: Vec2,
    next: Vec2,
    half: Vec2,
    obstacle: Aabb,
) -> SweepResolution {
    let moving = Aabb::new(next, half);
    if !moving.overlaps(&obstacle) {
        return SweepResolution {
            position: next,
            collision_x: false,
            collision_y: false,
        };
    }

    let reach_x = half.x + obstacle.half.x;
    let reach_y = half.y + obstacle.half.y;
    let previous_dx = previous.x - obstacle.center.x;
    let previous_dy = previous.y - obstacle.center.y;
    let separated_x = previous_dx.abs() >= reach_x - OVERLAP_EPSILON;
    let separated_y = previous_dy.abs() >= reach_y - OVERLAP_EPSILON;

    let resolve_on_x = match (separated_x, separated_y) {
        (true, false) => true,
        (false, true) => false,
        (true, true) => {
            // Corner approach: the axis whose gap closed last is the one hit.
            let travel_x = (next.x - previous.x).abs().max(PARALLEL_EPSILON);
            let travel_y = (next.y - previous.y).abs().max(PARALLEL_EPSILON);
            let entry_x = (previous_dx.abs() - reach_x) / travel_x;
            let entry_y = (previous_dy.abs() - reach_y) / travel_y;
            entry_x >= entry_y
        }
        (false, false) => {
            let penetration_x = reach_x - (next.x - obstacle.center.x).abs();
            let penetration_y = reach_y - (next.y - obstacle.center.y).abs();
            penetration_x <= penetration_y
        }
    };

    let mut position = next;
    if resolve_on_x {
        let side = approach_side(previous_dx, next.x - previous.x, next.x - obstacle.center.x);
        position.x = obstacle.center.x + side * reach_x;
    } else {
        let side = approach_side(previous_dy, next.y - previous.y, next.y - obstacle.center.y);
        position.y = obstacle.center.y + side * reach_y;
    }

    SweepResolution {
        position,
        collision_x: resolve_on_x,
        collision_y: !resolve_on_x,
    }
}

fn approach_side(previous_offset: f32, travel: f32, next_offset: f32) -> f32 {
    if previous_offset > OVERLAP_EPSILON {
        1.0
    } else if previous_offset < -OVERLAP_EPSILON {
        -1.0
    } else if travel > 0.0 {
        -1.0
    } else if travel < 0.0 {
        1.0
    } else if next_offset >= 0.0 {
        1.0
    } else {
        -1.0
    }
}

/// Parametric factors `(t, u)` where the infinite lines through `p0→p1` and
/// `q0→q1` cross, `p0 + t·(p1-p0) == q0 + u·(q1-q0)`. `None` for parallel lines.
pub fn line_intersection_factors(p0: Vec2, p1: Vec2, q0: Vec2, q1: Vec2) -> Option<(f32, f32)> {
    let r = p1 - p0;
    let s = q1 - q0;
    let denominator = r.cross(s);
    if denominator.abs() < PARALLEL_EPSILON {
        return None;
    }
    let offset = q0 - p0;
    let t = offset.cross(s) / denominator;
    let u = offset.cross(r) / denominator;
    Some((t, u))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentHit {
    pub point: Vec2,
    pub t: f32,
    pub u: f32,
}

/// Segment-vs-segment intersection: both parametric factors must lie in [0,1].
pub fn segment_intersection(p0: Vec2, p1: Vec2, q0: Vec2, q1: Vec2) -> Option<SegmentHit> {
    let (t, u) = line_intersection_factors(p0, p1, q0, q1)?;
    if !(0.0..=1.0).contains(&t) || !(0.0..=1.0).contains(&u) {
        return None;
    }
    Some(SegmentHit {
        point: p0 + (p1 - p0) * t,
        t,
        u,
    })
}

pub fn world_to_grid(world: Vec2, tile_size: f32) -> GridPoint {
    let tile_size = tile_size.max(f32::EPSILON);
    GridPoint {
        col: (world.x / tile_size).floor() as i32,
        row: (world.y / tile_size).floor() as i32,
    }
}

/// Center of `cell` in world units.
pub fn grid_to_world(cell: GridPoint, tile_size: f32) -> Vec2 {
    Vec2 {
        x: (cell.col as f32 + 0.5) * tile_size,
        y: (cell.row as f32 + 0.5) * tile_size,
    }
}

pub fn cell_bounds(cell: GridPoint, tile_size: f32) -> Aabb {
    let half = tile_size * 0.5;
    Aabb::new(grid_to_world(cell, tile_size), Vec2::new(half, half))
}
