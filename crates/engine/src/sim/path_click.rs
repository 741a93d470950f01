use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::debug;

use super::actor::ActorId;
use super::error::{report, SimError};
use super::geometry::{GridPoint, Vec2};
use super::pathfinding::Pathfinder;
use super::world::World;

/// Input collaborator as seen by the click controller: a world-space pointer
/// and a one-shot primary action.
pub trait PointerSource {
    fn position(&self) -> Vec2;
    /// Returns `true` once per press.
    fn take_primary_action(&mut self) -> bool;
}

/// Plain pointer state, fed by whatever owns the input device.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerState {
    position: Vec2,
    primary_pressed: bool,
}

impl PointerState {
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub fn press_primary(&mut self) {
        self.primary_pressed = true;
    }
}

impl PointerSource for PointerState {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn take_primary_action(&mut self) -> bool {
        std::mem::take(&mut self.primary_pressed)
    }
}

type Inbox = Rc<RefCell<VecDeque<Option<Vec<GridPoint>>>>>;

/// Sends the controlled actor to whatever cell the pointer clicks.
pub struct PathByClick<P> {
    pathfinder: P,
    actor: ActorId,
    synced_revision: Option<u64>,
    inbox: Inbox,
}

impl<P: Pathfinder> PathByClick<P> {
    pub fn new(pathfinder: P, actor: ActorId) -> Self {
        Self {
            pathfinder,
            actor,
            synced_revision: None,
            inbox: Inbox::default(),
        }
    }

    pub fn actor(&self) -> ActorId {
        self.actor
    }

    pub fn set_actor(&mut self, actor: ActorId) {
        self.actor = actor;
    }

    pub fn pathfinder(&self) -> &P {
        &self.pathfinder
    }

    /// Handles at most one click and installs any delivered path. Returns
    /// `true` when a path was installed.
    pub fn update(&mut self, world: &mut World, pointer: &mut impl PointerSource) -> bool {
        self.sync_grid(world);
        if pointer.take_primary_action() {
            self.request(world, pointer.position());
        }

        let mut installed = false;
        while let Some(delivery) = self.inbox.borrow_mut().pop_front() {
            match delivery {
                Some(waypoints) => installed |= world.set_path(self.actor, waypoints),
                None => debug!(actor = %self.actor, "path_by_click_no_path"),
            }
        }
        installed
    }

    fn sync_grid(&mut self, world: &World) {
        if self.synced_revision == Some(world.grid_revision()) {
            return;
        }
        match world.grid() {
            Some(grid) => self.pathfinder.set_grid(grid),
            None => self.pathfinder.clear_grid(),
        }
        self.synced_revision = Some(world.grid_revision());
    }

    fn request(&mut self, world: &World, pointer: Vec2) {
        let Some(grid) = world.grid() else {
            report::<()>(SimError::MissingGrid);
            return;
        };
        let Some(actor) = world.actor(self.actor) else {
            report::<()>(SimError::UnknownActor(self.actor));
            return;
        };
        let start = grid.world_to_cell(actor.position());
        let goal = grid.world_to_cell(pointer);
        debug!(
            actor = %self.actor,
            goal_col = goal.col,
            goal_row = goal.row,
            "path_by_click_requested"
        );

        let inbox = Rc::clone(&self.inbox);
        self.pathfinder.find_path(
            start,
            goal,
            Box::new(move |path| inbox.borrow_mut().push_back(path)),
        );
        self.pathfinder.calculate();
    }
}
