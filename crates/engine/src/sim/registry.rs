use std::collections::HashMap;

use super::actor::{ActorKind, ActorParams};
use super::behavior::BehaviorEngine;
use super::error::SimError;
use super::geometry::Vec2;

/// Loader-supplied request to place one actor.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnDescriptor {
    pub kind: ActorKind,
    pub position: Vec2,
    /// Overrides the factory's team when present.
    pub team: Option<u32>,
}

impl SpawnDescriptor {
    pub fn new(kind: impl Into<String>, position: Vec2) -> Self {
        Self {
            kind: ActorKind::new(kind),
            position,
            team: None,
        }
    }

    pub fn with_team(mut self, team: u32) -> Self {
        self.team = Some(team);
        self
    }
}

/// Everything needed to add one actor to a world.
pub struct ActorSpawn {
    pub params: ActorParams,
    pub behavior: Option<BehaviorEngine>,
}

impl ActorSpawn {
    pub fn passive(params: ActorParams) -> Self {
        Self {
            params,
            behavior: None,
        }
    }
}

pub type ActorFactory = fn(&SpawnDescriptor) -> Result<ActorSpawn, SimError>;

/// Maps actor kinds to their factories. Populated once at startup.
#[derive(Default)]
pub struct ActorKindRegistry {
    factories: HashMap<ActorKind, ActorFactory>,
}

impl ActorKindRegistry {
    /// Registers `factory` for `kind`, returning the factory it replaced.
    pub fn register(&mut self, kind: impl Into<String>, factory: ActorFactory) -> Option<ActorFactory> {
        self.factories.insert(ActorKind::new(kind), factory)
    }

    pub fn contains(&self, kind: &ActorKind) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Registered kinds in name order.
    pub fn kinds(&self) -> Vec<&ActorKind> {
        let mut kinds: Vec<&ActorKind> = self.factories.keys().collect();
        kinds.sort();
        kinds
    }

    /// Runs the factory for `descriptor.kind`. The descriptor's position and
    /// team override whatever the factory chose.
    pub fn build(&self, descriptor: &SpawnDescriptor) -> Result<ActorSpawn, SimError> {
        let factory = self
            .factories
            .get(&descriptor.kind)
            .ok_or_else(|| SimError::UnknownKind(descriptor.kind.clone()))?;
        let mut spawn = factory(descriptor)?;
        spawn.params.kind = descriptor.kind.clone();
        spawn.params.position = descriptor.position;
        if let Some(team) = descriptor.team {
            spawn.params.team = team;
        }
        Ok(spawn)
    }
}
