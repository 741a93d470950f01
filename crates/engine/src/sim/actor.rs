use std::collections::VecDeque;
use std::fmt;

use super::geometry::{Aabb, GridPoint, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(pub u64);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct ActorIdAllocator {
    next: u64,
}

impl ActorIdAllocator {
    pub fn allocate(&mut self) -> ActorId {
        let id = ActorId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// Type tag used to pick a factory in the kind registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorKind(String);

impl ActorKind {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ActorKind {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for ActorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Facing {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Facing {
    /// Dominant axis of `delta` wins; ties go to the horizontal axis.
    /// Rows grow downward, so positive y faces `Down`.
    pub fn from_delta(delta: Vec2) -> Self {
        if delta.x.abs() >= delta.y.abs() {
            if delta.x >= 0.0 {
                Self::Right
            } else {
                Self::Left
            }
        } else if delta.y > 0.0 {
            Self::Down
        } else {
            Self::Up
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PendingFacing {
    pub(crate) facing: Facing,
    pub(crate) deadline_tick: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveIntent {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl MoveIntent {
    pub const NONE: MoveIntent = MoveIntent {
        left: false,
        right: false,
        up: false,
        down: false,
    };

    /// Direction flags from `from` toward `to`, ignoring axes already within
    /// `tolerance`.
    pub fn toward(from: Vec2, to: Vec2, tolerance: f32) -> Self {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        Self {
            left: dx < -tolerance,
            right: dx > tolerance,
            up: dy < -tolerance,
            down: dy > tolerance,
        }
    }

    pub fn axis_x(&self) -> i8 {
        axis_command(self.left, self.right)
    }

    pub fn axis_y(&self) -> i8 {
        axis_command(self.up, self.down)
    }

    pub fn is_idle(&self) -> bool {
        self.axis_x() == 0 && self.axis_y() == 0
    }
}

fn axis_command(negative: bool, positive: bool) -> i8 {
    match (negative, positive) {
        (true, false) => -1,
        (false, true) => 1,
        _ => 0,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AxisFlags {
    pub x: bool,
    pub y: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GravitySteps {
    pub x: u32,
    pub y: u32,
}

/// Eased per-axis acceleration state. Acceleration is unitless; it is scaled
/// by `speed` (world units per second) when turned into displacement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kinematics {
    pub acceleration: Vec2,
    pub max_acceleration: f32,
    pub acceleration_step: f32,
    pub deceleration_step: f32,
    pub speed: f32,
    pub gravity: Vec2,
    pub gravity_steps: GravitySteps,
}

impl Default for Kinematics {
    fn default() -> Self {
        Self {
            acceleration: Vec2::ZERO,
            max_acceleration: 1.0,
            acceleration_step: 0.1,
            deceleration_step: 0.1,
            speed: 60.0,
            gravity: Vec2::ZERO,
            gravity_steps: GravitySteps::default(),
        }
    }
}

/// Construction parameters for an actor, as produced by kind factories.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorParams {
    pub kind: ActorKind,
    pub team: u32,
    pub position: Vec2,
    pub width: f32,
    pub height: f32,
    pub mass: f32,
    pub force: f32,
    pub colliding: bool,
    pub max_health: f32,
    pub kinematics: Kinematics,
}

impl Default for ActorParams {
    fn default() -> Self {
        Self {
            kind: ActorKind::new("actor"),
            team: 0,
            position: Vec2::ZERO,
            width: 16.0,
            height: 16.0,
            mass: 80.0,
            force: 1.0,
            colliding: true,
            max_health: 100.0,
            kinematics: Kinematics::default(),
        }
    }
}

/// Remaining grid waypoints plus the per-axis heading toward the front one.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorPath {
    pub(crate) waypoints: VecDeque<GridPoint>,
    pub(crate) heading: (i8, i8),
}

impl ActorPath {
    pub fn waypoints(&self) -> impl Iterator<Item = &GridPoint> {
        self.waypoints.iter()
    }

    pub fn remaining(&self) -> usize {
        self.waypoints.len()
    }

    pub fn current(&self) -> Option<GridPoint> {
        self.waypoints.front().copied()
    }
}

#[derive(Debug, Clone)]
pub struct Actor {
    id: ActorId,
    kind: ActorKind,
    team: u32,
    position: Vec2,
    previous_position: Vec2,
    width: f32,
    height: f32,
    half_extents: Vec2,
    pub kinematics: Kinematics,
    pub intent: MoveIntent,
    pub mass: f32,
    pub force: f32,
    pub colliding: bool,
    pub(crate) collided: AxisFlags,
    pub(crate) moved: bool,
    pub(crate) facing: Facing,
    pub(crate) pending_facing: Option<PendingFacing>,
    pub(crate) path: Option<ActorPath>,
    health: f32,
    max_health: f32,
    pub(crate) zero_health_reported: bool,
}

impl Actor {
    pub fn new(id: ActorId, params: ActorParams) -> Self {
        let max_health = params.max_health.max(0.0);
        let mut actor = Self {
            id,
            kind: params.kind,
            team: params.team,
            position: params.position,
            previous_position: params.position,
            width: 0.0,
            height: 0.0,
            half_extents: Vec2::ZERO,
            kinematics: params.kinematics,
            intent: MoveIntent::NONE,
            mass: params.mass,
            force: params.force,
            colliding: params.colliding,
            collided: AxisFlags::default(),
            moved: false,
            facing: Facing::default(),
            pending_facing: None,
            path: None,
            health: max_health,
            max_health,
            zero_health_reported: false,
        };
        actor.set_size(params.width, params.height);
        actor
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn kind(&self) -> &ActorKind {
        &self.kind
    }

    pub fn team(&self) -> u32 {
        self.team
    }

    /// Center of the actor's box.
    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn previous_position(&self) -> Vec2 {
        self.previous_position
    }

    /// Teleports without producing movement; interpolation restarts here.
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
        self.previous_position = position;
    }

    pub(crate) fn commit_position(&mut self, previous: Vec2, position: Vec2) {
        self.previous_position = previous;
        self.position = position;
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn half_extents(&self) -> Vec2 {
        self.half_extents
    }

    pub fn set_size(&mut self, width: f32, height: f32) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
        self.half_extents = Vec2::new(self.width * 0.5, self.height * 0.5);
    }

    pub fn interpolated_position(&self, alpha: f32) -> Vec2 {
        self.previous_position
            .lerp(self.position, alpha.clamp(0.0, 1.0))
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn moved(&self) -> bool {
        self.moved
    }

    pub fn last_collision(&self) -> AxisFlags {
        self.collided
    }

    pub fn path(&self) -> Option<&ActorPath> {
        self.path.as_ref()
    }

    pub fn has_path(&self) -> bool {
        self.path.is_some()
    }

    pub fn health(&self) -> f32 {
        self.health
    }

    pub fn max_health(&self) -> f32 {
        self.max_health
    }

    pub fn health_ratio(&self) -> f32 {
        if self.max_health <= 0.0 {
            return 0.0;
        }
        (self.health / self.max_health).clamp(0.0, 1.0)
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    pub fn set_health(&mut self, health: f32) {
        self.health = health.clamp(0.0, self.max_health);
        if self.health > 0.0 {
            self.zero_health_reported = false;
        }
    }

    pub fn damage(&mut self, amount: f32) {
        self.set_health(self.health - amount.max(0.0));
    }

    pub fn heal(&mut self, amount: f32) {
        self.set_health(self.health + amount.max(0.0));
    }
}

/// Capability: anything occupying space that other actors resolve against.
pub trait Collidable {
    fn bounds(&self) -> Aabb;
    fn is_colliding(&self) -> bool;
}

impl Collidable for Actor {
    fn bounds(&self) -> Aabb {
        Aabb::new(self.position, self.half_extents)
    }

    fn is_colliding(&self) -> bool {
        self.colliding
    }
}
