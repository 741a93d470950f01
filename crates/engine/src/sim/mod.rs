//! Fixed-step tile simulation: geometry, actor movement and collision,
//! perception and behavior, and the frame-driven loop that advances them.

use std::time::Duration;

mod actor;
mod behavior;
mod clock;
mod config;
mod error;
mod events;
pub mod fsm;
pub mod geometry;
mod grid;
mod main_loop;
mod movement;
mod path_click;
mod pathfinding;
mod perception;
mod registry;
mod world;

/// Something advanced by whole fixed steps.
pub trait Steppable {
    fn step(&mut self, step: Duration);
}

/// Something drawn between steps. `interpolation` is the fraction of a step
/// elapsed since the last one, in `[0, 1]`.
pub trait Drawable {
    fn draw(&mut self, interpolation: f32);
}

pub use actor::{
    Actor, ActorId, ActorKind, ActorParams, ActorPath, AxisFlags, Collidable, Facing,
    GravitySteps, Kinematics, MoveIntent,
};
pub use behavior::{
    standard_tree, AiContext, AiEvent, AiOutput, AttackOrder, BehaviorConfig, BehaviorEngine,
    OwnerView,
};
pub use clock::{plan_steps, FpsMeter, StepPlan, TickClock};
pub use config::{ConfigError, SimConfig, DEFAULT_MAX_STEPS_PER_FRAME};
pub use error::{report, SimError};
pub use events::{
    CollisionTarget, EventBus, SimEvent, SimEventCounts, SimEventKind, Subscription,
};
pub use fsm::{Fsm, FsmBuildError, FsmBuilder, NoopState, StateBehavior, StateId};
pub use geometry::{Aabb, GridPoint, SegmentHit, Vec2};
pub use grid::{CollisionGrid, GridError, MapSource};
pub use main_loop::{FrameReport, FrameRequest, FrameScheduler, SimulationLoop};
pub use movement::{ramp_axis, step_actor, step_actors, substep_count, MovementParams, MAX_SUBSTEPS};
pub use path_click::{PathByClick, PointerSource, PointerState};
pub use pathfinding::{GridPathfinder, PathCallback, Pathfinder};
pub use perception::{compute_perception, first_occlusion, Percept, PerceptionSnapshot};
pub use registry::{ActorFactory, ActorKindRegistry, ActorSpawn, SpawnDescriptor};
pub use world::{ActorView, World};
