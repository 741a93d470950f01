use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tracing::{debug, info};

use super::actor::{
    Actor, ActorId, ActorIdAllocator, ActorKind, ActorParams, ActorPath, Facing, MoveIntent,
};
use super::behavior::{AiOutput, BehaviorEngine};
use super::config::SimConfig;
use super::error::{report, SimError};
use super::events::{EventBus, SimEvent};
use super::geometry::{GridPoint, Vec2};
use super::grid::{CollisionGrid, MapSource};
use super::movement::{self, heading_toward, MovementParams};
use super::perception::compute_perception;
use super::registry::{ActorKindRegistry, ActorSpawn, SpawnDescriptor};
use super::Steppable;

/// What the rendering collaborator needs for one actor on one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorView {
    pub id: ActorId,
    pub kind: ActorKind,
    pub team: u32,
    pub position: Vec2,
    pub half_extents: Vec2,
    pub facing: Facing,
    pub health_ratio: f32,
}

/// The simulation context: actors, their behavior engines, the collision grid
/// and the notification bus. Everything that advances state takes `&mut self`,
/// so the grid cannot be swapped while a tick is running.
pub struct World {
    config: SimConfig,
    ids: ActorIdAllocator,
    actors: Vec<Actor>,
    behaviors: HashMap<ActorId, BehaviorEngine>,
    grid: Option<CollisionGrid>,
    grid_revision: u64,
    events: EventBus,
    tick: u64,
}

impl World {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            ids: ActorIdAllocator::default(),
            actors: Vec::new(),
            behaviors: HashMap::new(),
            grid: None,
            grid_revision: 0,
            events: EventBus::default(),
            tick: 0,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Number of ticks completed so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.iter().find(|actor| actor.id() == id)
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.iter_mut().find(|actor| actor.id() == id)
    }

    pub fn behavior(&self, id: ActorId) -> Option<&BehaviorEngine> {
        self.behaviors.get(&id)
    }

    pub fn grid(&self) -> Option<&CollisionGrid> {
        self.grid.as_ref()
    }

    /// Bumped whenever the grid is replaced or cleared.
    pub fn grid_revision(&self) -> u64 {
        self.grid_revision
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn spawn(&mut self, params: ActorParams, behavior: Option<BehaviorEngine>) -> ActorId {
        let id = self.ids.allocate();
        self.actors.push(Actor::new(id, params));
        if let Some(engine) = behavior {
            self.behaviors.insert(id, engine);
        }
        id
    }

    pub fn spawn_from(
        &mut self,
        registry: &ActorKindRegistry,
        descriptor: &SpawnDescriptor,
    ) -> Option<ActorId> {
        match registry.build(descriptor) {
            Ok(ActorSpawn { params, behavior }) => Some(self.spawn(params, behavior)),
            Err(error) => report(error),
        }
    }

    /// Removes the actor and releases its behavior engine.
    pub fn remove(&mut self, id: ActorId) -> Option<Actor> {
        let index = self.actors.iter().position(|actor| actor.id() == id)?;
        self.behaviors.remove(&id);
        Some(self.actors.remove(index))
    }

    pub fn set_grid(&mut self, grid: CollisionGrid) {
        self.grid = Some(grid);
        self.grid_revision = self.grid_revision.saturating_add(1);
    }

    pub fn clear_grid(&mut self) -> Option<CollisionGrid> {
        self.grid_revision = self.grid_revision.saturating_add(1);
        self.grid.take()
    }

    /// Builds the grid and every spawn into temporaries and swaps them in only
    /// when all of them succeed. On failure the previous map stays untouched.
    pub fn load_map(
        &mut self,
        source: &impl MapSource,
        spawns: &[SpawnDescriptor],
        registry: &ActorKindRegistry,
    ) -> bool {
        let (grid, built) = match build_map(source, spawns, registry) {
            Ok(map) => map,
            Err(error) => {
                report::<()>(error);
                return false;
            }
        };

        self.actors.clear();
        self.behaviors.clear();
        for ActorSpawn { params, behavior } in built {
            self.spawn(params, behavior);
        }
        info!(
            cols = grid.cols(),
            rows = grid.rows(),
            tile_size = grid.tile_size(),
            actor_count = self.actors.len(),
            "map_loaded"
        );
        self.set_grid(grid);
        true
    }

    /// Installs `waypoints` as the actor's path. Needs a grid to turn cells
    /// into world targets.
    pub fn set_path(&mut self, id: ActorId, waypoints: Vec<GridPoint>) -> bool {
        let Some(grid) = self.grid.as_ref() else {
            report::<()>(SimError::MissingGrid);
            return false;
        };
        let Some(first) = waypoints.first().copied() else {
            debug!(actor = %id, "empty_path_ignored");
            return false;
        };
        let target = grid.cell_center(first);
        let Some(actor) = self.actors.iter_mut().find(|actor| actor.id() == id) else {
            debug!(actor = %id, "set_path_unknown_actor");
            return false;
        };
        let count = waypoints.len();
        actor.path = Some(ActorPath {
            heading: heading_toward(actor.position(), target),
            waypoints: VecDeque::from(waypoints),
        });
        self.events.emit(SimEvent::PathStarted {
            actor: id,
            waypoints: count,
        });
        true
    }

    pub fn stop_path(&mut self, id: ActorId) -> bool {
        let Some(actor) = self.actor_mut(id) else {
            return false;
        };
        if actor.path.take().is_none() {
            return false;
        }
        actor.intent = MoveIntent::NONE;
        self.events.emit(SimEvent::PathStopped { actor: id });
        true
    }

    pub fn set_intent(&mut self, id: ActorId, intent: MoveIntent) -> bool {
        match self.actor_mut(id) {
            Some(actor) => {
                actor.intent = intent;
                true
            }
            None => false,
        }
    }

    /// Lowers health. The first time it hits zero the actor stops moving and
    /// `ZeroHealth` is reported.
    pub fn apply_damage(&mut self, id: ActorId, amount: f32) -> bool {
        let Some(actor) = self.actors.iter_mut().find(|actor| actor.id() == id) else {
            return false;
        };
        actor.damage(amount);
        if !actor.is_alive() && !actor.zero_health_reported {
            actor.zero_health_reported = true;
            bring_to_rest(actor);
            self.events.emit(SimEvent::ZeroHealth { actor: id });
        }
        true
    }

    /// One fixed step: movement for every actor, then behavior for every
    /// actor against settled positions, then buffered events are delivered.
    pub fn run_tick(&mut self, step: Duration) {
        let params = MovementParams {
            grid: self.grid.as_ref(),
            step_seconds: step.as_secs_f32(),
            tick: self.tick,
            facing_debounce_ticks: self.config.facing_debounce_ticks,
        };
        movement::step_actors(&mut self.actors, &params, &mut self.events);

        let outputs = self.run_behaviors();
        for (id, output) in outputs {
            self.apply_output(id, output);
        }

        self.events.dispatch();
        self.tick = self.tick.saturating_add(1);
    }

    fn run_behaviors(&mut self) -> Vec<(ActorId, AiOutput)> {
        let mut ids: Vec<ActorId> = self.behaviors.keys().copied().collect();
        ids.sort();

        let mut outputs = Vec::with_capacity(ids.len());
        let mut dead = Vec::new();
        for id in ids {
            let Some(owner) = self.actors.iter().find(|actor| actor.id() == id) else {
                continue;
            };
            if !owner.is_alive() {
                dead.push(id);
                continue;
            }
            let Some(engine) = self.behaviors.get_mut(&id) else {
                continue;
            };
            let perception = compute_perception(
                owner,
                &self.actors,
                self.grid.as_ref(),
                engine.sight_radius(),
                self.tick,
            );
            outputs.push((id, engine.run(owner, perception)));
        }
        for id in dead {
            if let Some(actor) = self.actor_mut(id) {
                bring_to_rest(actor);
            }
        }
        outputs
    }

    fn apply_output(&mut self, id: ActorId, output: AiOutput) {
        if let Some(actor) = self.actor_mut(id) {
            if !actor.has_path() {
                actor.intent = output.intent;
            }
            if output.heal > 0.0 {
                actor.heal(output.heal);
            }
        }
        if let Some(attack) = output.attack {
            debug!(actor = %id, target = %attack.target, damage = attack.damage, "attack");
            self.apply_damage(attack.target, attack.damage);
        }
    }

    /// Per-actor render data blended between the last two committed
    /// positions by `interpolation`.
    pub fn render_views(&self, interpolation: f32) -> Vec<ActorView> {
        self.actors
            .iter()
            .map(|actor| ActorView {
                id: actor.id(),
                kind: actor.kind().clone(),
                team: actor.team(),
                position: actor.interpolated_position(interpolation),
                half_extents: actor.half_extents(),
                facing: actor.facing(),
                health_ratio: actor.health_ratio(),
            })
            .collect()
    }
}

/// Dead actors keep their momentum decaying but take no new commands.
fn bring_to_rest(actor: &mut Actor) {
    actor.intent = MoveIntent::NONE;
    actor.path = None;
}

fn build_map(
    source: &impl MapSource,
    spawns: &[SpawnDescriptor],
    registry: &ActorKindRegistry,
) -> Result<(CollisionGrid, Vec<ActorSpawn>), SimError> {
    let grid = CollisionGrid::from_source(source)?;
    let built = spawns
        .iter()
        .map(|descriptor| registry.build(descriptor))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((grid, built))
}

impl Default for World {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl Steppable for World {
    fn step(&mut self, step: Duration) {
        self.run_tick(step);
    }
}
