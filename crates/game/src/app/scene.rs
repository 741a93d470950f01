use std::cell::Cell;
use std::rc::Rc;

use tilesim_engine::sim::{
    ActorId, ActorKind, ActorKindRegistry, GridPathfinder, MoveIntent, PathByClick, PointerState,
    SimEventKind, Subscription, Vec2, World,
};
use tilesim_engine::{InputSnapshot, Scene};
use tracing::{debug, info, warn};

use super::kinds::PLAYER_KIND;
use super::level::LevelFile;

/// One level, one player. WASD steers the player directly; a left click
/// sends it along a grid path to the clicked cell.
pub(crate) struct ArenaScene {
    level: LevelFile,
    registry: ActorKindRegistry,
    player: Option<ActorId>,
    path_click: Option<PathByClick<GridPathfinder>>,
    pointer: PointerState,
    steering: bool,
    defeated: Rc<Cell<u32>>,
    subscriptions: Vec<Subscription>,
}

impl ArenaScene {
    pub(crate) fn new(level: LevelFile, registry: ActorKindRegistry) -> Self {
        Self {
            level,
            registry,
            player: None,
            path_click: None,
            pointer: PointerState::default(),
            steering: false,
            defeated: Rc::new(Cell::new(0)),
            subscriptions: Vec::new(),
        }
    }

    fn steer(
        &mut self,
        world: &mut World,
        keys: MoveIntent,
        pointer: Option<Vec2>,
        primary_pressed: bool,
    ) {
        let Some(player) = self.player else {
            return;
        };
        if !world.actor(player).is_some_and(|actor| actor.is_alive()) {
            world.set_intent(player, MoveIntent::NONE);
            return;
        }

        if let Some(pointer) = pointer {
            self.pointer.set_position(pointer);
            if primary_pressed {
                self.pointer.press_primary();
            }
        }
        if let Some(path_click) = self.path_click.as_mut() {
            path_click.update(world, &mut self.pointer);
        }

        if !keys.is_idle() {
            world.stop_path(player);
            world.set_intent(player, keys);
            self.steering = true;
        } else if self.steering {
            self.steering = false;
            let on_path = world.actor(player).is_some_and(|actor| actor.has_path());
            if !on_path {
                world.set_intent(player, MoveIntent::NONE);
            }
        }
    }
}

impl Scene for ArenaScene {
    fn load(&mut self, world: &mut World) {
        let spawns = self.level.spawn_descriptors();
        if !world.load_map(&self.level, &spawns, &self.registry) {
            warn!(level = %self.level.name, "level_load_failed");
            return;
        }

        let player_kind = ActorKind::new(PLAYER_KIND);
        self.player = world
            .actors()
            .iter()
            .find(|actor| *actor.kind() == player_kind)
            .map(|actor| actor.id());
        self.path_click = self
            .player
            .map(|player| PathByClick::new(GridPathfinder::default(), player));
        if self.player.is_none() {
            warn!(level = %self.level.name, "level_has_no_player");
        }

        let defeated = Rc::clone(&self.defeated);
        self.subscriptions.push(world.events().subscribe_kind(
            SimEventKind::ZeroHealth,
            move |event| {
                defeated.set(defeated.get().saturating_add(1));
                info!(actor = %event.actor(), "actor_defeated");
            },
        ));
        self.subscriptions.push(world.events().subscribe_kind(
            SimEventKind::PathFinished,
            |event| debug!(actor = %event.actor(), "path_finished"),
        ));

        info!(
            level = %self.level.name,
            actor_count = world.actor_count(),
            player = ?self.player,
            "arena_loaded"
        );
    }

    fn update(&mut self, input: &InputSnapshot, world: &mut World) {
        self.steer(
            world,
            input.move_intent(),
            input.pointer_world(),
            input.primary_pressed(),
        );
    }

    fn unload(&mut self, _world: &mut World) {
        self.subscriptions.clear();
        self.path_click = None;
        self.player = None;
    }

    fn camera_focus(&self, world: &World) -> Option<Vec2> {
        self.player
            .and_then(|player| world.actor(player))
            .map(|actor| actor.position())
    }

    fn debug_title(&self, world: &World) -> Option<String> {
        let health = self
            .player
            .and_then(|player| world.actor(player))
            .map_or(0.0, |actor| actor.health());
        Some(format!(
            "tilesim | {} | tick {} | actors {} | hp {:.0} | defeated {}",
            self.level.name,
            world.tick(),
            world.actor_count(),
            health,
            self.defeated.get()
        ))
    }
}
