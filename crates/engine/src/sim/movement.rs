use tracing::trace;

use super::actor::{Actor, ActorPath, AxisFlags, Collidable, Facing, MoveIntent, PendingFacing};
use super::events::{CollisionTarget, EventBus, SimEvent};
use super::geometry::{resolve_box_sweep, GridPoint, SweepResolution, Vec2};
use super::grid::CollisionGrid;

/// Upper bound on sub-steps for a single tick. Only reachable with absurd
/// speeds; keeps a runaway actor from stalling the frame.
pub const MAX_SUBSTEPS: u32 = 65_536;

const HEADING_EPSILON: f32 = 1.0e-3;
const MOVED_EPSILON: f32 = 1.0e-5;

/// Read-only inputs shared by every actor stepped in one tick.
#[derive(Debug, Clone, Copy)]
pub struct MovementParams<'a> {
    pub grid: Option<&'a CollisionGrid>,
    pub step_seconds: f32,
    pub tick: u64,
    pub facing_debounce_ticks: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

#[derive(Debug, Clone, Copy)]
struct ActorContact {
    other: usize,
    axis: Axis,
}

/// Sub-step count for a displacement: `1 + round(max(|dx|, |dy|))`, never zero.
pub fn substep_count(delta: Vec2) -> u32 {
    if !delta.x.is_finite() || !delta.y.is_finite() {
        return 1;
    }
    let largest = delta.x.abs().max(delta.y.abs());
    let extra = largest.round().min(MAX_SUBSTEPS as f32 - 1.0);
    1 + extra as u32
}

/// Per-axis sign toward `to`, zero once within tolerance.
pub(crate) fn heading_toward(from: Vec2, to: Vec2) -> (i8, i8) {
    (
        axis_sign(to.x - from.x),
        axis_sign(to.y - from.y),
    )
}

fn axis_sign(value: f32) -> i8 {
    if value > HEADING_EPSILON {
        1
    } else if value < -HEADING_EPSILON {
        -1
    } else {
        0
    }
}

/// Moves every actor once, in slice order. Actors earlier in the slice have
/// already committed when later ones test against them.
pub fn step_actors(actors: &mut [Actor], params: &MovementParams<'_>, events: &mut EventBus) {
    for index in 0..actors.len() {
        step_actor(actors, index, params, events);
    }
}

pub fn step_actor(
    actors: &mut [Actor],
    index: usize,
    params: &MovementParams<'_>,
    events: &mut EventBus,
) {
    let Some(actor) = actors.get_mut(index) else {
        return;
    };
    if let Some(grid) = params.grid {
        follow_path(actor, grid, events);
    }
    ramp_acceleration(actor);
    advance_gravity_counters(actor);

    let start = actor.position();
    let tentative = tentative_position(actor, params.step_seconds);
    let (settled, collided, contacts) = sweep(actors, index, start, tentative, params, events);

    let actor = &mut actors[index];
    actor.collided = collided;
    if collided.x {
        actor.kinematics.gravity_steps.x = 0;
    }
    if collided.y {
        actor.kinematics.gravity_steps.y = 0;
    }
    actor.commit_position(start, settled);

    for contact in contacts {
        blend_accelerations(actors, index, contact);
    }

    update_facing(&mut actors[index], settled - start, params);
}

fn follow_path(actor: &mut Actor, grid: &CollisionGrid, events: &mut EventBus) {
    let position = actor.position();
    let Some(path) = actor.path.as_mut() else {
        return;
    };

    loop {
        let Some(target_cell) = path.waypoints.front().copied() else {
            break;
        };
        let target = grid.cell_center(target_cell);
        let (reached_x, reached_y) = axes_reached(path.heading, position, target);
        if !(reached_x && reached_y) {
            actor.intent = path_intent(path, grid, target, reached_x, reached_y);
            return;
        }
        path.waypoints.pop_front();
        if let Some(next) = path.waypoints.front() {
            path.heading = heading_toward(position, grid.cell_center(*next));
        }
    }

    let id = actor.id();
    actor.path = None;
    actor.intent = MoveIntent::NONE;
    trace!(actor = %id, "path_finished");
    events.emit(SimEvent::PathFinished { actor: id });
}

/// Direction-aware arrival: an axis counts as reached once the position is
/// on or past the waypoint in the heading's direction.
fn axes_reached(heading: (i8, i8), position: Vec2, target: Vec2) -> (bool, bool) {
    (
        axis_reached(heading.0, position.x, target.x),
        axis_reached(heading.1, position.y, target.y),
    )
}

fn axis_reached(heading: i8, position: f32, target: f32) -> bool {
    match heading {
        1 => position >= target,
        -1 => position <= target,
        _ => true,
    }
}

fn path_intent(
    path: &ActorPath,
    grid: &CollisionGrid,
    target: Vec2,
    reached_x: bool,
    reached_y: bool,
) -> MoveIntent {
    let next_heading = path
        .waypoints
        .get(1)
        .map(|next| heading_toward(target, grid.cell_center(*next)));
    // Past the waypoint on an axis: keep driving it only if the path goes on
    // in the same direction, otherwise the actor would cut the corner.
    let drive = |heading: i8, reached: bool, next: Option<i8>| {
        heading != 0 && (!reached || next == Some(heading))
    };
    let x = if drive(path.heading.0, reached_x, next_heading.map(|h| h.0)) {
        path.heading.0
    } else {
        0
    };
    let y = if drive(path.heading.1, reached_y, next_heading.map(|h| h.1)) {
        path.heading.1
    } else {
        0
    };
    MoveIntent {
        left: x < 0,
        right: x > 0,
        up: y < 0,
        down: y > 0,
    }
}

fn ramp_acceleration(actor: &mut Actor) {
    let intent = actor.intent;
    let kinematics = &mut actor.kinematics;
    let max = kinematics.max_acceleration.abs();
    kinematics.acceleration.x = ramp_axis(
        kinematics.acceleration.x,
        intent.axis_x(),
        max,
        kinematics.acceleration_step,
        kinematics.deceleration_step,
    );
    kinematics.acceleration.y = ramp_axis(
        kinematics.acceleration.y,
        intent.axis_y(),
        max,
        kinematics.acceleration_step,
        kinematics.deceleration_step,
    );
}

/// Commanded axes ramp toward `±max` by `up`; idle axes decay to zero by
/// `down` without crossing it.
pub fn ramp_axis(current: f32, command: i8, max: f32, up: f32, down: f32) -> f32 {
    if command != 0 {
        let next = current + f32::from(command) * up.abs();
        return next.clamp(-max, max);
    }
    let down = down.abs();
    if current > 0.0 {
        (current - down).max(0.0)
    } else if current < 0.0 {
        (current + down).min(0.0)
    } else {
        0.0
    }
}

fn advance_gravity_counters(actor: &mut Actor) {
    let gravity = actor.kinematics.gravity;
    let steps = &mut actor.kinematics.gravity_steps;
    steps.x = if gravity.x != 0.0 {
        steps.x.saturating_add(1)
    } else {
        0
    };
    steps.y = if gravity.y != 0.0 {
        steps.y.saturating_add(1)
    } else {
        0
    };
}

fn tentative_position(actor: &Actor, step_seconds: f32) -> Vec2 {
    let kinematics = &actor.kinematics;
    let drive = kinematics.acceleration * (step_seconds * kinematics.speed);
    let gravity = Vec2::new(
        kinematics.gravity.x * step_seconds * kinematics.gravity_steps.x as f32,
        kinematics.gravity.y * step_seconds * kinematics.gravity_steps.y as f32,
    );
    actor.position() + drive + gravity
}

fn sweep(
    actors: &[Actor],
    index: usize,
    start: Vec2,
    tentative: Vec2,
    params: &MovementParams<'_>,
    events: &mut EventBus,
) -> (Vec2, AxisFlags, Vec<ActorContact>) {
    let actor = &actors[index];
    let id = actor.id();
    let half = actor.half_extents();
    let raw = tentative - start;
    let delta = Vec2::new(finite_or_zero(raw.x), finite_or_zero(raw.y));
    let substeps = substep_count(delta);
    let increment = delta / substeps as f32;

    let mut position = start;
    let mut collided = AxisFlags::default();
    let mut contacts = Vec::new();

    for _ in 0..substeps {
        if collided.x && collided.y {
            break;
        }
        let previous = position;
        let mut next = position;
        if !collided.x {
            next.x += increment.x;
        }
        if !collided.y {
            next.y += increment.y;
        }

        if let Some(grid) = params.grid {
            let cell = grid.world_to_cell(previous);
            let blocking: Vec<GridPoint> = grid
                .neighbors8(cell)
                .filter(|neighbor| grid.is_blocking(*neighbor))
                .collect();
            for tile in blocking {
                let hit = resolve_box_sweep(previous, next, half, grid.cell_bounds(tile));
                if let Some(axis) = apply_hit(&mut next, &mut collided, hit) {
                    trace!(actor = %id, ?tile, ?axis, "tile_collision");
                    events.emit(SimEvent::Collision {
                        actor: id,
                        with: CollisionTarget::Tile(tile),
                    });
                }
            }
        }

        if actor.is_colliding() {
            for (other_index, other) in actors.iter().enumerate() {
                if other_index == index || !other.is_colliding() {
                    continue;
                }
                let hit = resolve_box_sweep(previous, next, half, other.bounds());
                if let Some(axis) = apply_hit(&mut next, &mut collided, hit) {
                    contacts.push(ActorContact {
                        other: other_index,
                        axis,
                    });
                    events.emit(SimEvent::Collision {
                        actor: id,
                        with: CollisionTarget::Actor(other.id()),
                    });
                }
            }
        }

        position = next;
    }

    (position, collided, contacts)
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Applies one resolution result. A hit on an axis that already collided this
/// tick is ignored; that axis is no longer advancing.
fn apply_hit(
    next: &mut Vec2,
    collided: &mut AxisFlags,
    hit: SweepResolution,
) -> Option<Axis> {
    if hit.collision_x && !collided.x {
        next.x = hit.position.x;
        collided.x = true;
        return Some(Axis::X);
    }
    if hit.collision_y && !collided.y {
        next.y = hit.position.y;
        collided.y = true;
        return Some(Axis::Y);
    }
    None
}

/// Mass-weighted average of the two accelerations on the contact axis. Only
/// the weaker actor takes it; equal forces blend both.
fn blend_accelerations(actors: &mut [Actor], index: usize, contact: ActorContact) {
    let (Some(mover), Some(other)) = (actors.get(index), actors.get(contact.other)) else {
        return;
    };
    let total_mass = mover.mass + other.mass;
    if !total_mass.is_finite() || total_mass <= 0.0 {
        return;
    }
    let read = |actor: &Actor| match contact.axis {
        Axis::X => actor.kinematics.acceleration.x,
        Axis::Y => actor.kinematics.acceleration.y,
    };
    let blended = (mover.mass * read(mover) + other.mass * read(other)) / total_mass;
    let mover_force = mover.force;
    let other_force = other.force;

    let write = |actor: &mut Actor| match contact.axis {
        Axis::X => actor.kinematics.acceleration.x = blended,
        Axis::Y => actor.kinematics.acceleration.y = blended,
    };
    if mover_force <= other_force {
        write(&mut actors[index]);
    }
    if other_force <= mover_force {
        write(&mut actors[contact.other]);
    }
}

fn update_facing(actor: &mut Actor, delta: Vec2, params: &MovementParams<'_>) {
    actor.moved = delta.length_squared() > MOVED_EPSILON * MOVED_EPSILON;
    if actor.moved {
        let direction = Facing::from_delta(delta);
        if direction == actor.facing {
            actor.pending_facing = None;
        } else if actor.pending_facing.map(|pending| pending.facing) != Some(direction) {
            actor.pending_facing = Some(PendingFacing {
                facing: direction,
                deadline_tick: params.tick.saturating_add(params.facing_debounce_ticks),
            });
        }
    }
    if let Some(pending) = actor.pending_facing {
        if params.tick >= pending.deadline_tick {
            actor.facing = pending.facing;
            actor.pending_facing = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::sim::actor::{ActorId, ActorParams, Kinematics};

    const STEP: f32 = 1.0 / 60.0;

    fn params(grid: Option<&CollisionGrid>, tick: u64) -> MovementParams<'_> {
        MovementParams {
            grid,
            step_seconds: STEP,
            tick,
            facing_debounce_ticks: 3,
        }
    }

    fn actor_at(id: u64, x: f32, y: f32) -> Actor {
        Actor::new(
            ActorId(id),
            ActorParams {
                position: Vec2::new(x, y),
                ..ActorParams::default()
            },
        )
    }

    fn open_grid(cols: u32, rows: u32) -> CollisionGrid {
        CollisionGrid::new(cols, rows, 16.0, vec![0; (cols * rows) as usize]).expect("grid")
    }

    #[test]
    fn substep_count_is_never_zero() {
        assert_eq!(substep_count(Vec2::ZERO), 1);
        assert_eq!(substep_count(Vec2::new(0.4, -0.2)), 1);
        assert_eq!(substep_count(Vec2::new(-3.6, 1.0)), 5);
        assert_eq!(substep_count(Vec2::new(f32::NAN, 1.0)), 1);
        assert_eq!(substep_count(Vec2::new(f32::MAX, 0.0)), MAX_SUBSTEPS);
    }

    #[test]
    fn non_finite_displacement_axis_is_dropped() {
        let mut actor = actor_at(1, 40.0, 40.0);
        actor.kinematics.gravity = Vec2::new(f32::NAN, 0.0);
        actor.intent = MoveIntent {
            down: true,
            ..MoveIntent::NONE
        };
        let mut actors = vec![actor];
        let mut events = EventBus::default();
        for tick in 0..5 {
            step_actors(&mut actors, &params(None, tick), &mut events);
        }
        let position = actors[0].position();
        assert_eq!(position.x, 40.0);
        assert!(position.y.is_finite());
        assert!(position.y > 40.0);
    }

    #[test]
    fn commanded_acceleration_ramps_to_cap_and_never_exceeds_it() {
        let mut actor = actor_at(1, 40.0, 40.0);
        actor.kinematics = Kinematics {
            max_acceleration: 1.5,
            acceleration_step: 0.1,
            ..Kinematics::default()
        };
        actor.intent = MoveIntent {
            right: true,
            ..MoveIntent::NONE
        };
        let mut actors = vec![actor];
        let mut events = EventBus::default();
        for tick in 0..20 {
            step_actors(&mut actors, &params(None, tick), &mut events);
            assert!(actors[0].kinematics.acceleration.x <= 1.5);
        }
        assert!(actors[0].kinematics.acceleration.x >= 1.4);
    }

    #[test]
    fn idle_axes_decay_toward_zero_without_crossing() {
        assert!((ramp_axis(0.25, 0, 1.0, 0.1, 0.2) - 0.05).abs() < 1.0e-6);
        assert_eq!(ramp_axis(0.05, 0, 1.0, 0.1, 0.2), 0.0);
        assert_eq!(ramp_axis(-0.05, 0, 1.0, 0.1, 0.2), 0.0);
        assert!((ramp_axis(-1.0, 1, 1.0, 0.1, 0.2) + 0.9).abs() < 1.0e-6);
    }

    #[test]
    fn gravity_counter_grows_until_landing_resets_it() {
        let mut tiles = vec![0; 4 * 4];
        for col in 0..4 {
            tiles[3 * 4 + col] = 1;
        }
        let grid = CollisionGrid::new(4, 4, 16.0, tiles).expect("grid");
        let mut actor = actor_at(1, 24.0, 24.0);
        actor.set_size(14.0, 14.0);
        actor.kinematics.gravity = Vec2::new(0.0, 120.0);
        let mut actors = vec![actor];
        let mut events = EventBus::default();

        step_actors(&mut actors, &params(Some(&grid), 0), &mut events);
        assert_eq!(actors[0].kinematics.gravity_steps.y, 1);
        step_actors(&mut actors, &params(Some(&grid), 1), &mut events);
        assert_eq!(actors[0].kinematics.gravity_steps.y, 2);

        let mut landed = false;
        for tick in 2..120 {
            step_actors(&mut actors, &params(Some(&grid), tick), &mut events);
            if actors[0].last_collision().y {
                landed = true;
                break;
            }
        }
        assert!(landed, "actor never reached the floor");
        assert_eq!(actors[0].kinematics.gravity_steps.y, 0);
        // Floor row starts at y = 48; box half-height is 7.
        assert!((actors[0].position().y - 41.0).abs() < 1.0e-3);
    }

    #[test]
    fn fast_actor_does_not_tunnel_through_thin_wall_tile() {
        let mut tiles = vec![0; 10];
        tiles[5] = 1;
        let grid = CollisionGrid::new(10, 1, 16.0, tiles).expect("grid");
        let mut actor = actor_at(1, 40.0, 8.0);
        actor.set_size(8.0, 8.0);
        actor.kinematics.acceleration = Vec2::new(1.0, 0.0);
        actor.kinematics.max_acceleration = 1.0;
        actor.kinematics.speed = 60.0 * 60.0;
        actor.intent = MoveIntent {
            right: true,
            ..MoveIntent::NONE
        };
        let mut actors = vec![actor];
        let mut events = EventBus::default();
        step_actors(&mut actors, &params(Some(&grid), 0), &mut events);

        let settled = actors[0].position();
        assert!(actors[0].last_collision().x);
        assert!((settled.x - 76.0).abs() < 1.0e-3, "x = {}", settled.x);
        assert!(events
            .pending()
            .iter()
            .any(|event| matches!(event, SimEvent::Collision { with: CollisionTarget::Tile(_), .. })));
    }

    #[test]
    fn colliding_actors_never_end_overlapping() {
        for speed in [30.0_f32, 120.0, 600.0, 2400.0] {
            let mut left = actor_at(1, 20.0, 20.0);
            left.kinematics.speed = speed;
            left.kinematics.acceleration = Vec2::new(1.0, 0.0);
            left.intent = MoveIntent {
                right: true,
                ..MoveIntent::NONE
            };
            let mut right = actor_at(2, 60.0, 24.0);
            right.kinematics.speed = speed;
            right.kinematics.acceleration = Vec2::new(-1.0, 0.0);
            right.intent = MoveIntent {
                left: true,
                ..MoveIntent::NONE
            };
            let mut actors = vec![left, right];
            let mut events = EventBus::default();
            for tick in 0..30 {
                step_actors(&mut actors, &params(None, tick), &mut events);
                assert!(
                    !actors[0].bounds().overlaps(&actors[1].bounds()),
                    "overlap at speed {speed} tick {tick}"
                );
            }
        }
    }

    #[test]
    fn weaker_actor_takes_mass_weighted_blend_stronger_keeps_its_own() {
        let mut weak = actor_at(1, 100.0, 50.0);
        weak.force = 1.0;
        weak.kinematics.max_acceleration = 1.5;
        weak.kinematics.acceleration = Vec2::new(1.0, 0.0);
        weak.intent = MoveIntent {
            right: true,
            ..MoveIntent::NONE
        };
        let mut strong = actor_at(2, 118.0, 50.0);
        strong.force = 1.5;
        strong.kinematics.max_acceleration = 1.5;
        strong.kinematics.acceleration = Vec2::new(-1.0, 0.0);
        strong.intent = MoveIntent {
            left: true,
            ..MoveIntent::NONE
        };
        let mut actors = vec![weak, strong];
        let mut events = EventBus::default();
        step_actors(&mut actors, &params(None, 0), &mut events);

        // Both ramp to 1.1 before contact; equal masses blend to zero.
        assert!(actors[0].kinematics.acceleration.x.abs() < 1.0e-5);
        assert!((actors[1].kinematics.acceleration.x + 1.1).abs() < 1.0e-5);
        assert!(!actors[0].bounds().overlaps(&actors[1].bounds()));
    }

    #[test]
    fn equal_forces_blend_both_actors() {
        let mut a = actor_at(1, 100.0, 50.0);
        a.kinematics.acceleration = Vec2::new(1.0, 0.0);
        a.mass = 60.0;
        let mut b = actor_at(2, 116.0, 50.0);
        b.kinematics.acceleration = Vec2::new(-0.5, 0.3);
        b.mass = 20.0;
        let mut actors = vec![a, b];
        blend_accelerations(
            &mut actors,
            0,
            ActorContact {
                other: 1,
                axis: Axis::X,
            },
        );

        assert!((actors[0].kinematics.acceleration.x - 0.625).abs() < 1.0e-6);
        assert!((actors[1].kinematics.acceleration.x - 0.625).abs() < 1.0e-6);
        assert_eq!(actors[1].kinematics.acceleration.y, 0.3);
    }

    #[test]
    fn non_colliding_actor_passes_through_others_but_not_tiles() {
        let mut ghost = actor_at(1, 20.0, 20.0);
        ghost.colliding = false;
        ghost.kinematics.acceleration = Vec2::new(1.0, 0.0);
        ghost.intent = MoveIntent {
            right: true,
            ..MoveIntent::NONE
        };
        let blocker = actor_at(2, 30.0, 20.0);
        let mut actors = vec![ghost, blocker];
        let mut events = EventBus::default();
        step_actors(&mut actors, &params(None, 0), &mut events);
        assert!(!actors[0].last_collision().x);
        assert!(actors[0].position().x > 20.0);
    }

    #[test]
    fn facing_changes_only_after_debounce_window() {
        let mut actor = actor_at(1, 40.0, 40.0);
        actor.kinematics.acceleration = Vec2::new(1.0, 0.0);
        actor.intent = MoveIntent {
            right: true,
            ..MoveIntent::NONE
        };
        let mut actors = vec![actor];
        let mut events = EventBus::default();

        step_actors(&mut actors, &params(None, 10), &mut events);
        assert!(actors[0].moved());
        assert_eq!(actors[0].facing(), Facing::Down);
        step_actors(&mut actors, &params(None, 12), &mut events);
        assert_eq!(actors[0].facing(), Facing::Down);
        step_actors(&mut actors, &params(None, 13), &mut events);
        assert_eq!(actors[0].facing(), Facing::Right);
    }

    #[test]
    fn flicker_back_to_current_facing_cancels_pending_change() {
        let mut actor = actor_at(1, 40.0, 40.0);
        actor.facing = Facing::Right;
        let mut actors = vec![actor];
        let p = params(None, 0);
        update_facing(&mut actors[0], Vec2::new(-0.5, 0.0), &p);
        assert!(actors[0].pending_facing.is_some());
        update_facing(&mut actors[0], Vec2::new(0.5, 0.0), &params(None, 1));
        assert!(actors[0].pending_facing.is_none());
        update_facing(&mut actors[0], Vec2::ZERO, &params(None, 10));
        assert_eq!(actors[0].facing(), Facing::Right);
    }

    #[test]
    fn path_following_walks_waypoints_and_reports_finish() {
        let grid = open_grid(8, 8);
        let mut actor = actor_at(1, 24.0, 24.0);
        actor.kinematics.max_acceleration = 1.0;
        actor.kinematics.acceleration_step = 0.25;
        actor.kinematics.deceleration_step = 1.0;
        let start = actor.position();
        let waypoints: VecDeque<GridPoint> =
            [GridPoint::new(2, 1), GridPoint::new(3, 1), GridPoint::new(3, 2)]
                .into_iter()
                .collect();
        actor.path = Some(ActorPath {
            heading: heading_toward(start, grid.cell_center(GridPoint::new(2, 1))),
            waypoints,
        });
        let mut actors = vec![actor];
        let mut events = EventBus::default();

        let mut finished = false;
        for tick in 0..400 {
            step_actors(&mut actors, &params(Some(&grid), tick), &mut events);
            if events
                .pending()
                .iter()
                .any(|event| matches!(event, SimEvent::PathFinished { .. }))
            {
                finished = true;
                break;
            }
        }
        assert!(finished, "path never finished");
        assert!(!actors[0].has_path());
        assert_eq!(actors[0].intent, MoveIntent::NONE);
        let end = grid.cell_center(GridPoint::new(3, 2));
        assert!(actors[0].position().y >= end.y);
        assert!((actors[0].position().x - end.x).abs() < 4.0);
    }

    #[test]
    fn path_intent_suppresses_axis_that_turns_at_next_waypoint() {
        let grid = open_grid(8, 8);
        let position = Vec2::new(57.0, 24.0);
        let target = grid.cell_center(GridPoint::new(3, 1));
        let path = ActorPath {
            waypoints: [GridPoint::new(3, 1), GridPoint::new(3, 2)].into_iter().collect(),
            heading: (1, 0),
        };
        let (reached_x, reached_y) = axes_reached(path.heading, position, target);
        assert!(reached_x && reached_y);

        let overshoot_on_straight = ActorPath {
            waypoints: [GridPoint::new(3, 1), GridPoint::new(4, 1)].into_iter().collect(),
            heading: (1, 1),
        };
        let intent = path_intent(&overshoot_on_straight, &grid, target, true, false);
        assert!(intent.right, "straight continuation keeps driving x");
        assert!(intent.down);

        let turning = ActorPath {
            waypoints: [GridPoint::new(3, 1), GridPoint::new(3, 2)].into_iter().collect(),
            heading: (1, 1),
        };
        let intent = path_intent(&turning, &grid, target, true, false);
        assert!(!intent.right, "turn at next waypoint suppresses x");
        assert!(intent.down);
    }
}
