use super::actor::{Actor, ActorId, MoveIntent};
use super::fsm::{Fsm, FsmBuildError, FsmBuilder, NoopState, StateBehavior};
use super::geometry::Vec2;
use super::perception::{Percept, PerceptionSnapshot};

/// Perception- and health-derived events that drive the standard tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AiEvent {
    EnemySighted,
    EnemyLost,
    InRange,
    OutOfRange,
    HealthAlert,
    HealthClear,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BehaviorConfig {
    pub sight_radius: f32,
    pub attack_range: f32,
    pub attack_damage: f32,
    pub attack_cooldown_ticks: u32,
    /// Health ratio below which the actor falls back to defense.
    pub health_alert_ratio: f32,
    /// Health ratio at which defense hands control back.
    pub health_clear_ratio: f32,
    pub heal_per_tick: f32,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            sight_radius: 160.0,
            attack_range: 28.0,
            attack_damage: 5.0,
            attack_cooldown_ticks: 30,
            health_alert_ratio: 0.3,
            health_clear_ratio: 0.8,
            heal_per_tick: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackOrder {
    pub target: ActorId,
    pub damage: f32,
}

/// What one behavior run asks the world to do.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AiOutput {
    pub intent: MoveIntent,
    pub attack: Option<AttackOrder>,
    pub heal: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OwnerView {
    pub id: Option<ActorId>,
    pub team: u32,
    pub position: Vec2,
    pub health_ratio: f32,
}

impl OwnerView {
    pub fn of(actor: &Actor) -> Self {
        Self {
            id: Some(actor.id()),
            team: actor.team(),
            position: actor.position(),
            health_ratio: actor.health_ratio(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct AiMemory {
    target: Option<ActorId>,
    cooldown_ticks: u32,
}

/// Everything the states read and write during one run.
#[derive(Debug, Clone, Default)]
pub struct AiContext {
    pub config: BehaviorConfig,
    pub owner: OwnerView,
    pub perception: PerceptionSnapshot,
    pub output: AiOutput,
    memory: AiMemory,
}

impl AiContext {
    pub fn new(config: BehaviorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn target(&self) -> Option<ActorId> {
        self.memory.target
    }

    /// The remembered target if it is still visible and alive, otherwise the
    /// nearest visible enemy. Updates memory either way.
    fn acquire_target(&mut self) -> Option<Percept> {
        let remembered = self
            .memory
            .target
            .and_then(|id| self.perception.get(id))
            .filter(|percept| percept.is_visible() && percept.alive)
            .copied();
        let chosen = remembered.or_else(|| {
            self.perception
                .nearest_visible_enemy(self.owner.team)
                .copied()
        });
        self.memory.target = chosen.map(|percept| percept.target);
        chosen
    }

    fn in_attack_range(&self, percept: &Percept) -> bool {
        percept.distance <= self.config.attack_range
    }
}

struct CoreState;

impl StateBehavior<AiContext, AiEvent> for CoreState {
    fn execute(&mut self, ctx: &mut AiContext) -> Option<AiEvent> {
        (ctx.owner.health_ratio < ctx.config.health_alert_ratio).then_some(AiEvent::HealthAlert)
    }
}

struct IdleState;

impl StateBehavior<AiContext, AiEvent> for IdleState {
    fn enter(&mut self, ctx: &mut AiContext) {
        ctx.memory.target = None;
    }

    fn execute(&mut self, ctx: &mut AiContext) -> Option<AiEvent> {
        ctx.output.intent = MoveIntent::NONE;
        ctx.acquire_target().map(|_| AiEvent::EnemySighted)
    }
}

struct ApproachState;

const APPROACH_TOLERANCE: f32 = 1.0;

impl StateBehavior<AiContext, AiEvent> for ApproachState {
    fn execute(&mut self, ctx: &mut AiContext) -> Option<AiEvent> {
        let Some(target) = ctx.acquire_target() else {
            ctx.output.intent = MoveIntent::NONE;
            return Some(AiEvent::EnemyLost);
        };
        if ctx.in_attack_range(&target) {
            ctx.output.intent = MoveIntent::NONE;
            return Some(AiEvent::InRange);
        }
        ctx.output.intent = MoveIntent::toward(ctx.owner.position, target.center, APPROACH_TOLERANCE);
        None
    }
}

struct AttackState;

impl StateBehavior<AiContext, AiEvent> for AttackState {
    fn execute(&mut self, ctx: &mut AiContext) -> Option<AiEvent> {
        ctx.output.intent = MoveIntent::NONE;
        let Some(target) = ctx.acquire_target() else {
            return Some(AiEvent::EnemyLost);
        };
        if !ctx.in_attack_range(&target) {
            return Some(AiEvent::OutOfRange);
        }
        if ctx.memory.cooldown_ticks == 0 {
            ctx.output.attack = Some(AttackOrder {
                target: target.target,
                damage: ctx.config.attack_damage,
            });
            ctx.memory.cooldown_ticks = ctx.config.attack_cooldown_ticks;
        }
        None
    }
}

struct HealState;

impl StateBehavior<AiContext, AiEvent> for HealState {
    fn enter(&mut self, ctx: &mut AiContext) {
        ctx.memory.target = None;
    }

    fn execute(&mut self, ctx: &mut AiContext) -> Option<AiEvent> {
        ctx.output.intent = MoveIntent::NONE;
        if ctx.owner.health_ratio >= ctx.config.health_clear_ratio {
            return Some(AiEvent::HealthClear);
        }
        ctx.output.heal = ctx.config.heal_per_tick;
        None
    }
}

/// The stock combat tree:
///
/// ```text
/// root
/// ├── core        (HealthAlert -> defense)
/// │   ├── movement  (InRange -> combat)
/// │   │   ├── idle      (EnemySighted -> approach)
/// │   │   └── approach  (EnemyLost -> idle)
/// │   └── combat    (OutOfRange | EnemyLost -> movement)
/// │       └── attack
/// └── defense     (HealthClear -> core)
///     └── heal
/// ```
pub fn standard_tree() -> Result<Fsm<AiContext, AiEvent>, FsmBuildError> {
    let mut builder = FsmBuilder::new("root");
    let root = builder.root();

    let core = builder.add_composite(root, "core", CoreState)?;
    let movement = builder.add_composite(core, "movement", NoopState)?;
    let idle = builder.add_atomic(movement, "idle", IdleState)?;
    let approach = builder.add_atomic(movement, "approach", ApproachState)?;
    let combat = builder.add_composite(core, "combat", NoopState)?;
    builder.add_atomic(combat, "attack", AttackState)?;
    let defense = builder.add_composite(root, "defense", NoopState)?;
    builder.add_atomic(defense, "heal", HealState)?;

    builder.set_default(root, core)?;
    builder.set_default(movement, idle)?;

    builder.add_transition(core, AiEvent::HealthAlert, defense)?;
    builder.add_transition(defense, AiEvent::HealthClear, core)?;
    builder.add_transition(movement, AiEvent::InRange, combat)?;
    builder.add_transition(combat, AiEvent::OutOfRange, movement)?;
    builder.add_transition(combat, AiEvent::EnemyLost, movement)?;
    builder.add_transition(idle, AiEvent::EnemySighted, approach)?;
    builder.add_transition(approach, AiEvent::EnemyLost, idle)?;

    builder.build()
}

/// Per-actor decision maker: one FSM plus the context its states share.
pub struct BehaviorEngine {
    fsm: Fsm<AiContext, AiEvent>,
    context: AiContext,
}

impl BehaviorEngine {
    pub fn new(config: BehaviorConfig, fsm: Fsm<AiContext, AiEvent>) -> Self {
        Self {
            fsm,
            context: AiContext::new(config),
        }
    }

    pub fn standard(config: BehaviorConfig) -> Result<Self, FsmBuildError> {
        Ok(Self::new(config, standard_tree()?))
    }

    pub fn config(&self) -> &BehaviorConfig {
        &self.context.config
    }

    pub fn sight_radius(&self) -> f32 {
        self.context.config.sight_radius
    }

    pub fn target(&self) -> Option<ActorId> {
        self.context.target()
    }

    pub fn perception(&self) -> &PerceptionSnapshot {
        &self.context.perception
    }

    pub fn active_path(&self) -> Vec<&str> {
        self.fsm.active_path()
    }

    pub fn pending_event(&self) -> Option<AiEvent> {
        self.fsm.pending_event()
    }

    /// Runs the tree once against a settled owner and this tick's perception.
    pub fn run(&mut self, owner: &Actor, perception: PerceptionSnapshot) -> AiOutput {
        self.context.owner = OwnerView::of(owner);
        self.context.perception = perception;
        self.context.output = AiOutput::default();
        self.context.memory.cooldown_ticks = self.context.memory.cooldown_ticks.saturating_sub(1);
        self.fsm.update(&mut self.context);
        self.context.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::actor::ActorParams;
    use crate::sim::perception::compute_perception;

    fn actor(id: u64, team: u32, x: f32, y: f32) -> Actor {
        Actor::new(
            ActorId(id),
            ActorParams {
                team,
                position: Vec2::new(x, y),
                ..ActorParams::default()
            },
        )
    }

    fn run(engine: &mut BehaviorEngine, actors: &[Actor], tick: u64) -> AiOutput {
        let owner = &actors[0];
        let perception = compute_perception(owner, actors, None, engine.sight_radius(), tick);
        engine.run(owner, perception)
    }

    #[test]
    fn standard_tree_starts_idle() {
        let mut engine = BehaviorEngine::standard(BehaviorConfig::default()).expect("tree");
        let actors = vec![actor(1, 0, 50.0, 50.0)];
        let output = run(&mut engine, &actors, 0);
        assert_eq!(engine.active_path(), vec!["root", "core", "movement", "idle"]);
        assert_eq!(output, AiOutput::default());
        assert_eq!(engine.pending_event(), None);
    }

    #[test]
    fn sighting_cascades_to_approach_then_attack() {
        let config = BehaviorConfig {
            sight_radius: 200.0,
            attack_range: 30.0,
            attack_damage: 7.0,
            attack_cooldown_ticks: 3,
            ..BehaviorConfig::default()
        };
        let mut engine = BehaviorEngine::standard(config).expect("tree");
        let mut actors = vec![actor(1, 0, 50.0, 50.0), actor(2, 1, 150.0, 50.0)];

        run(&mut engine, &actors, 0);
        assert_eq!(engine.pending_event(), Some(AiEvent::EnemySighted));
        assert_eq!(engine.target(), Some(ActorId(2)));

        let output = run(&mut engine, &actors, 1);
        assert_eq!(engine.active_path(), vec!["root", "core", "movement", "approach"]);
        assert!(output.intent.right);
        assert!(!output.intent.left && !output.intent.up && !output.intent.down);

        actors[1].set_position(Vec2::new(70.0, 50.0));
        let output = run(&mut engine, &actors, 2);
        assert_eq!(engine.pending_event(), Some(AiEvent::InRange));
        assert_eq!(output.intent, MoveIntent::NONE);

        let output = run(&mut engine, &actors, 3);
        assert_eq!(engine.active_path(), vec!["root", "core", "combat", "attack"]);
        assert_eq!(
            output.attack,
            Some(AttackOrder {
                target: ActorId(2),
                damage: 7.0
            })
        );

        let cooling = run(&mut engine, &actors, 4);
        assert_eq!(cooling.attack, None);
        run(&mut engine, &actors, 5);
        let ready = run(&mut engine, &actors, 6);
        assert!(ready.attack.is_some());
    }

    #[test]
    fn losing_range_returns_to_movement_default() {
        let mut engine = BehaviorEngine::standard(BehaviorConfig {
            attack_range: 30.0,
            ..BehaviorConfig::default()
        })
        .expect("tree");
        let mut actors = vec![actor(1, 0, 50.0, 50.0), actor(2, 1, 70.0, 50.0)];
        for tick in 0..4 {
            run(&mut engine, &actors, tick);
        }
        assert_eq!(engine.active_path(), vec!["root", "core", "combat", "attack"]);

        actors[1].set_position(Vec2::new(120.0, 50.0));
        run(&mut engine, &actors, 4);
        assert_eq!(engine.pending_event(), Some(AiEvent::OutOfRange));
        run(&mut engine, &actors, 5);
        assert_eq!(engine.active_path()[2], "movement");
    }

    #[test]
    fn low_health_switches_to_defense_and_back() {
        let config = BehaviorConfig {
            heal_per_tick: 2.0,
            ..BehaviorConfig::default()
        };
        let mut engine = BehaviorEngine::standard(config).expect("tree");
        let mut actors = vec![actor(1, 0, 50.0, 50.0)];
        run(&mut engine, &actors, 0);

        actors[0].set_health(20.0);
        let output = run(&mut engine, &actors, 1);
        assert_eq!(engine.pending_event(), Some(AiEvent::HealthAlert));
        assert_eq!(engine.active_path(), vec!["root", "core", "movement", "idle"]);
        assert_eq!(output.heal, 0.0);

        let output = run(&mut engine, &actors, 2);
        assert_eq!(engine.active_path(), vec!["root", "defense", "heal"]);
        assert_eq!(output.heal, 2.0);

        actors[0].set_health(85.0);
        run(&mut engine, &actors, 3);
        assert_eq!(engine.pending_event(), Some(AiEvent::HealthClear));
        run(&mut engine, &actors, 4);
        assert_eq!(engine.active_path(), vec!["root", "core", "movement", "idle"]);
    }

    #[test]
    fn friendly_actors_are_ignored() {
        let mut engine = BehaviorEngine::standard(BehaviorConfig::default()).expect("tree");
        let actors = vec![actor(1, 0, 50.0, 50.0), actor(2, 0, 60.0, 50.0)];
        run(&mut engine, &actors, 0);
        run(&mut engine, &actors, 1);
        assert_eq!(engine.active_path(), vec!["root", "core", "movement", "idle"]);
        assert_eq!(engine.target(), None);
    }
}
