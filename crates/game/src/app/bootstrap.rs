use std::env;
use std::path::{Path, PathBuf};

use tilesim_engine::sim::SimConfig;
use tilesim_engine::{resolve_app_paths, LoopConfig, Scene};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::kinds::build_registry;
use super::level::LevelFile;
use super::scene::ArenaScene;

const LEVEL_ENV_VAR: &str = "TILESIM_LEVEL";
const SIM_CONFIG_ENV_VAR: &str = "TILESIM_SIM_CONFIG";
const DEFAULT_LEVEL_FILE: &str = "arena.json";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!("=== tilesim startup ===");

    let level = load_level();
    let sim_override = env::var_os(SIM_CONFIG_ENV_VAR).map(PathBuf::from);
    let config = LoopConfig {
        window_title: format!("tilesim | {}", level.name),
        sim: resolve_sim_config(level.sim.clone(), sim_override.as_deref()),
        ..LoopConfig::default()
    };

    AppWiring {
        config,
        scene: Box::new(ArenaScene::new(level, build_registry())),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn load_level() -> LevelFile {
    let Some(path) = level_path() else {
        return LevelFile::builtin_arena();
    };
    match LevelFile::load(&path) {
        Ok(level) => {
            info!(path = %path.display(), level = %level.name, "level_file_loaded");
            level
        }
        Err(error) => {
            warn!(error = %error, "level_file_rejected_using_builtin");
            LevelFile::builtin_arena()
        }
    }
}

/// Override file first, then the level's own section, then defaults. A bad
/// override file is logged and skipped.
fn resolve_sim_config(level_sim: Option<SimConfig>, override_path: Option<&Path>) -> SimConfig {
    if let Some(path) = override_path {
        match SimConfig::load(path) {
            Ok(config) => {
                info!(path = %path.display(), "sim_config_loaded");
                return config;
            }
            Err(error) => warn!(error = %error, "sim_config_rejected"),
        }
    }
    level_sim.unwrap_or_default()
}

fn level_path() -> Option<PathBuf> {
    if let Some(raw) = env::var_os(LEVEL_ENV_VAR) {
        return Some(PathBuf::from(raw));
    }
    match resolve_app_paths() {
        Ok(paths) => Some(paths.levels_dir.join(DEFAULT_LEVEL_FILE)),
        Err(error) => {
            warn!(error = %error, "app_paths_unresolved_using_builtin");
            None
        }
    }
}
