use tilesim_engine::sim::{
    ActorKindRegistry, ActorParams, ActorSpawn, BehaviorConfig, BehaviorEngine, Kinematics,
    SimError, SpawnDescriptor,
};

pub(crate) const PLAYER_KIND: &str = "player";
pub(crate) const GRUNT_KIND: &str = "grunt";
pub(crate) const CRATE_KIND: &str = "crate";

const PLAYER_TEAM: u32 = 0;
const GRUNT_TEAM: u32 = 1;
const PROP_TEAM: u32 = 9;

pub(crate) fn build_registry() -> ActorKindRegistry {
    let mut registry = ActorKindRegistry::default();
    register_kinds(&mut registry);
    registry
}

pub(crate) fn register_kinds(registry: &mut ActorKindRegistry) {
    registry.register(PLAYER_KIND, player);
    registry.register(GRUNT_KIND, grunt);
    registry.register(CRATE_KIND, crate_prop);
}

/// Keyboard/click driven; strong enough to shove props aside.
fn player(_descriptor: &SpawnDescriptor) -> Result<ActorSpawn, SimError> {
    Ok(ActorSpawn::passive(ActorParams {
        team: PLAYER_TEAM,
        width: 12.0,
        height: 12.0,
        mass: 80.0,
        force: 2.0,
        max_health: 100.0,
        kinematics: Kinematics {
            speed: 90.0,
            acceleration_step: 0.2,
            deceleration_step: 0.25,
            ..Kinematics::default()
        },
        ..ActorParams::default()
    }))
}

fn grunt(_descriptor: &SpawnDescriptor) -> Result<ActorSpawn, SimError> {
    let behavior = BehaviorEngine::standard(BehaviorConfig {
        sight_radius: 128.0,
        attack_range: 20.0,
        attack_damage: 4.0,
        ..BehaviorConfig::default()
    })?;
    Ok(ActorSpawn {
        params: ActorParams {
            team: GRUNT_TEAM,
            width: 12.0,
            height: 12.0,
            mass: 60.0,
            force: 1.0,
            max_health: 40.0,
            kinematics: Kinematics {
                speed: 50.0,
                ..Kinematics::default()
            },
            ..ActorParams::default()
        },
        behavior: Some(behavior),
    })
}

/// Heavy, forceless: only moves when something stronger pushes it.
fn crate_prop(_descriptor: &SpawnDescriptor) -> Result<ActorSpawn, SimError> {
    Ok(ActorSpawn::passive(ActorParams {
        team: PROP_TEAM,
        width: 14.0,
        height: 14.0,
        mass: 240.0,
        force: 0.0,
        max_health: 500.0,
        ..ActorParams::default()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilesim_engine::sim::{ActorKind, Vec2};

    #[test]
    fn registry_knows_every_level_kind() {
        let registry = build_registry();
        assert_eq!(registry.len(), 3);
        for kind in [PLAYER_KIND, GRUNT_KIND, CRATE_KIND] {
            assert!(registry.contains(&ActorKind::new(kind)), "{kind}");
        }
    }

    #[test]
    fn only_grunts_get_a_behavior() {
        let registry = build_registry();
        let at = Vec2::new(24.0, 24.0);

        let grunt = registry
            .build(&SpawnDescriptor::new(GRUNT_KIND, at))
            .expect("grunt");
        assert!(grunt.behavior.is_some());
        assert_eq!(grunt.params.team, GRUNT_TEAM);
        assert_eq!(grunt.params.position, at);

        let player = registry
            .build(&SpawnDescriptor::new(PLAYER_KIND, at))
            .expect("player");
        assert!(player.behavior.is_none());
        assert!(player.params.force > 0.0);
    }

    #[test]
    fn descriptor_team_overrides_kind_team() {
        let registry = build_registry();
        let spawn = registry
            .build(&SpawnDescriptor::new(CRATE_KIND, Vec2::ZERO).with_team(4))
            .expect("crate");
        assert_eq!(spawn.params.team, 4);
        assert_eq!(spawn.params.force, 0.0);
    }
}
