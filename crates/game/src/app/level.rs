use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tilesim_engine::sim::{MapSource, SimConfig, SpawnDescriptor, Vec2};

/// One placed actor, addressed by grid cell.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SpawnEntry {
    pub(crate) kind: String,
    pub(crate) col: u32,
    pub(crate) row: u32,
    #[serde(default)]
    pub(crate) team: Option<u32>,
}

/// Level file: a rectangular tile grid (`0` walkable), spawns, and optional
/// simulation overrides.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LevelFile {
    pub(crate) name: String,
    pub(crate) tile_size: f32,
    pub(crate) tiles: Vec<Vec<i32>>,
    #[serde(default)]
    pub(crate) spawns: Vec<SpawnEntry>,
    #[serde(default)]
    pub(crate) sim: Option<SimConfig>,
}

#[derive(Debug, Error)]
pub(crate) enum LevelError {
    #[error("read level '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse level json at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("validation failed at {path}: {message}")]
    Invalid { path: String, message: String },
}

impl LevelFile {
    pub(crate) fn load(path: &Path) -> Result<Self, LevelError> {
        let raw = fs::read_to_string(path).map_err(|source| LevelError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub(crate) fn from_json_str(raw: &str) -> Result<Self, LevelError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let level: LevelFile = serde_path_to_error::deserialize(&mut deserializer).map_err(
            |error| {
                let path = error.path().to_string();
                LevelError::Parse {
                    path,
                    source: error.into_inner(),
                }
            },
        )?;
        level.validate()?;
        Ok(level)
    }

    fn validate(&self) -> Result<(), LevelError> {
        if !self.tile_size.is_finite() || self.tile_size <= 0.0 {
            return Err(invalid("tile_size", format!("expected positive, got {}", self.tile_size)));
        }
        let cols = self.cols();
        if cols == 0 {
            return Err(invalid("tiles", "expected at least one row and column"));
        }
        for (row, line) in self.tiles.iter().enumerate() {
            if line.len() != cols {
                return Err(invalid(
                    &format!("tiles[{row}]"),
                    format!("expected {cols} columns, got {}", line.len()),
                ));
            }
        }
        for (index, spawn) in self.spawns.iter().enumerate() {
            let (col, row) = (spawn.col as usize, spawn.row as usize);
            if col >= cols || row >= self.rows() {
                return Err(invalid(
                    &format!("spawns[{index}]"),
                    format!("cell ({col}, {row}) is outside the {cols}x{} grid", self.rows()),
                ));
            }
            if self.tiles[row][col] != 0 {
                return Err(invalid(
                    &format!("spawns[{index}]"),
                    format!("cell ({col}, {row}) is blocked"),
                ));
            }
        }
        Ok(())
    }

    /// Spawn descriptors positioned at the center of their cells.
    pub(crate) fn spawn_descriptors(&self) -> Vec<SpawnDescriptor> {
        self.spawns
            .iter()
            .map(|spawn| {
                let center = Vec2::new(
                    (spawn.col as f32 + 0.5) * self.tile_size,
                    (spawn.row as f32 + 0.5) * self.tile_size,
                );
                let descriptor = SpawnDescriptor::new(spawn.kind.clone(), center);
                match spawn.team {
                    Some(team) => descriptor.with_team(team),
                    None => descriptor,
                }
            })
            .collect()
    }

    /// Small walled arena used when no level file is available.
    pub(crate) fn builtin_arena() -> Self {
        let cols = 24;
        let rows = 16;
        let mut tiles = vec![vec![0; cols]; rows];
        for (row, line) in tiles.iter_mut().enumerate() {
            for (col, tile) in line.iter_mut().enumerate() {
                let border = row == 0 || col == 0 || row == rows - 1 || col == cols - 1;
                let divider = col == 12 && row != 7 && row != 8;
                let pillar = (row == 4 || row == 11) && (col == 5 || col == 18);
                if border || divider || pillar {
                    *tile = 1;
                }
            }
        }
        Self {
            name: "builtin_arena".to_string(),
            tile_size: 16.0,
            tiles,
            spawns: vec![
                spawn("player", 3, 7, None),
                spawn("crate", 8, 5, None),
                spawn("crate", 8, 10, None),
                spawn("grunt", 20, 3, Some(1)),
                spawn("grunt", 20, 12, Some(1)),
            ],
            sim: None,
        }
    }
}

impl MapSource for LevelFile {
    fn data(&self) -> &[Vec<i32>] {
        &self.tiles
    }

    fn tile_size(&self) -> f32 {
        self.tile_size
    }

    fn cols(&self) -> usize {
        self.tiles.first().map_or(0, Vec::len)
    }

    fn rows(&self) -> usize {
        self.tiles.len()
    }
}

fn spawn(kind: &str, col: u32, row: u32, team: Option<u32>) -> SpawnEntry {
    SpawnEntry {
        kind: kind.to_string(),
        col,
        row,
        team,
    }
}

fn invalid(path: &str, message: impl Into<String>) -> LevelError {
    LevelError::Invalid {
        path: path.to_string(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const SMALL_LEVEL: &str = r#"{
        "name": "small",
        "tile_size": 16,
        "tiles": [[0, 0, 0], [0, 1, 0]],
        "spawns": [{ "kind": "player", "col": 2, "row": 1, "team": 3 }],
        "sim": { "target_tps": 30 }
    }"#;

    #[test]
    fn parses_level_and_places_spawns_at_cell_centers() {
        let level = LevelFile::from_json_str(SMALL_LEVEL).expect("level");
        assert_eq!(level.cols(), 3);
        assert_eq!(level.rows(), 2);
        assert_eq!(level.sim.as_ref().map(|sim| sim.target_tps), Some(30));

        let descriptors = level.spawn_descriptors();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].kind.as_str(), "player");
        assert_eq!(descriptors[0].position, Vec2::new(40.0, 24.0));
        assert_eq!(descriptors[0].team, Some(3));
    }

    #[test]
    fn parse_errors_carry_json_path() {
        let raw = r#"{ "name": "x", "tile_size": 16, "tiles": [[0, "wall"]] }"#;
        let error = LevelFile::from_json_str(raw).expect_err("bad tile");
        match error {
            LevelError::Parse { path, .. } => assert_eq!(path, "tiles[0][1]"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn validation_rejects_ragged_rows_and_blocked_spawns() {
        let ragged = r#"{ "name": "x", "tile_size": 16, "tiles": [[0, 0], [0]] }"#;
        assert!(matches!(
            LevelFile::from_json_str(ragged),
            Err(LevelError::Invalid { ref path, .. }) if path == "tiles[1]"
        ));

        let blocked = r#"{
            "name": "x", "tile_size": 16, "tiles": [[0, 1]],
            "spawns": [{ "kind": "grunt", "col": 1, "row": 0 }]
        }"#;
        assert!(matches!(
            LevelFile::from_json_str(blocked),
            Err(LevelError::Invalid { ref path, .. }) if path == "spawns[0]"
        ));
    }

    #[test]
    fn load_reads_from_disk_and_reports_missing_files() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(SMALL_LEVEL.as_bytes()).expect("write level");
        let level = LevelFile::load(file.path()).expect("load");
        assert_eq!(level.name, "small");

        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            LevelFile::load(&dir.path().join("missing.json")),
            Err(LevelError::Read { .. })
        ));
    }

    #[test]
    fn shipped_arena_level_parses() {
        let raw = include_str!("../../../../assets/levels/arena.json");
        let level = LevelFile::from_json_str(raw).expect("arena.json");
        assert_eq!(level.name, "arena");
        assert!(level.spawns.iter().any(|spawn| spawn.kind == "player"));
    }

    #[test]
    fn builtin_arena_is_valid() {
        let arena = LevelFile::builtin_arena();
        arena.validate().expect("builtin arena validates");
        assert_eq!(arena.spawn_descriptors().len(), 5);
    }
}
