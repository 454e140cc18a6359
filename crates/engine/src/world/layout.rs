use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app::Vec2;

use super::atlas::MapAtlas;
use super::portal::MapId;
use super::tilemap::{TerrainKind, TileCoord, TilemapError};

const BUILTIN_WORLD_JSON: &str = include_str!("../../../../assets/base/world.json");
const BUILTIN_WORLD_NAME: &str = "<builtin>/assets/base/world.json";

#[derive(Debug, Error)]
pub enum WorldLoadError {
    #[error("failed to read world definition {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid world definition {source_name} at {path}: {message}")]
    Parse {
        source_name: String,
        path: String,
        message: String,
    },
    #[error("world definition declares no maps")]
    EmptyWorld,
    #[error("map id '{0}' is declared more than once")]
    DuplicateMap(MapId),
    #[error("map '{map}' is invalid: {source}")]
    InvalidMap {
        map: MapId,
        #[source]
        source: TilemapError,
    },
    #[error("{context} references unknown map '{map}'")]
    UnknownMap { context: String, map: MapId },
    #[error("portal tile {tile:?} lies outside map '{map}'")]
    PortalOutOfBounds { map: MapId, tile: TileCoord },
    #[error("start map '{0}' is not declared")]
    StartMapMissing(MapId),
    #[error(
        "{what} ({}, {}) on map '{map}' is not on walkable terrain",
        .position.x,
        .position.y
    )]
    UnwalkablePoint {
        map: MapId,
        what: &'static str,
        position: Vec2,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorldDef {
    pub start_map: MapId,
    pub start_position: Vec2,
    pub maps: Vec<MapDef>,
    #[serde(default)]
    pub portals: Vec<PortalDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapDef {
    pub id: MapId,
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_tile_size")]
    pub tile_size: f32,
    #[serde(default = "default_fill")]
    pub fill: TerrainKind,
    /// Applied in declaration order, later regions overwrite earlier ones.
    #[serde(default)]
    pub regions: Vec<RegionDef>,
    pub safe_respawn: Vec2,
    #[serde(default = "default_hostile_level")]
    pub hostile_level: u32,
    #[serde(default)]
    pub spawner: SpawnerDef,
    #[serde(default)]
    pub npcs: Vec<NpcPlacement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionDef {
    pub terrain: TerrainKind,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpawnerDef {
    pub interval_seconds: f32,
    pub max_hostiles: usize,
    pub min_player_distance: f32,
    pub max_attempts: u32,
}

impl Default for SpawnerDef {
    fn default() -> Self {
        Self {
            interval_seconds: 5.0,
            max_hostiles: 10,
            min_player_distance: 200.0,
            max_attempts: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NpcPlacement {
    pub kind: String,
    pub position: Vec2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortalDef {
    pub map: MapId,
    pub tile: TileCoord,
    pub target_map: MapId,
    pub target_position: Vec2,
}

fn default_tile_size() -> f32 {
    32.0
}

fn default_fill() -> TerrainKind {
    TerrainKind::Grass
}

fn default_hostile_level() -> u32 {
    1
}

impl WorldDef {
    pub fn builtin() -> Result<Self, WorldLoadError> {
        Self::from_json_str(BUILTIN_WORLD_NAME, BUILTIN_WORLD_JSON)
    }

    pub fn load(path: &Path) -> Result<Self, WorldLoadError> {
        let raw = fs::read_to_string(path).map_err(|source| WorldLoadError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&path.display().to_string(), &raw)
    }

    pub fn from_json_str(source_name: &str, raw: &str) -> Result<Self, WorldLoadError> {
        let deserializer = &mut serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize(deserializer).map_err(|error| WorldLoadError::Parse {
            source_name: source_name.to_string(),
            path: error.path().to_string(),
            message: error.inner().to_string(),
        })
    }

    pub fn map(&self, id: &MapId) -> Option<&MapDef> {
        self.maps.iter().find(|map| &map.id == id)
    }

    /// Validates the definition and builds every map plus the portal side table.
    pub fn build_atlas(&self) -> Result<MapAtlas, WorldLoadError> {
        MapAtlas::from_world(self)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn builtin_world_parses_with_defaults() {
        let world = WorldDef::builtin().expect("builtin world");
        assert!(world.maps.len() >= 2);
        assert!(world.map(&world.start_map).is_some());
        assert!(!world.portals.is_empty());
        for map in &world.maps {
            assert_eq!(map.tile_size, 32.0);
        }
    }

    #[test]
    fn parse_errors_carry_json_path() {
        let raw = r#"{
            "start_map": "a",
            "start_position": { "x": 0, "y": 0 },
            "maps": [{ "id": "a", "width": 2, "height": 2, "safe_respawn": { "x": 0, "y": 0 },
                       "regions": [{ "terrain": "lava", "x": 0, "y": 0, "width": 1, "height": 1 }] }]
        }"#;
        let err = WorldDef::from_json_str("test.json", raw).expect_err("lava is unknown");
        match err {
            WorldLoadError::Parse { path, .. } => assert_eq!(path, "maps[0].regions[0].terrain"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn spawner_fields_default_individually() {
        let raw = r#"{
            "start_map": "a",
            "start_position": { "x": 0, "y": 0 },
            "maps": [{ "id": "a", "width": 2, "height": 2, "safe_respawn": { "x": 0, "y": 0 },
                       "spawner": { "max_hostiles": 3 } }]
        }"#;
        let world = WorldDef::from_json_str("test.json", raw).expect("parse");
        let spawner = world.maps[0].spawner;
        assert_eq!(spawner.max_hostiles, 3);
        assert_eq!(spawner.interval_seconds, 5.0);
        assert_eq!(spawner.max_attempts, 10);
        assert_eq!(world.maps[0].fill, TerrainKind::Grass);
        assert_eq!(world.maps[0].hostile_level, 1);
    }

    #[test]
    fn load_reads_from_disk_and_reports_missing_file() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("world.json");
        let missing = WorldDef::load(&path).expect_err("missing");
        assert!(matches!(missing, WorldLoadError::ReadFile { .. }));

        fs::write(
            &path,
            r#"{ "start_map": "a", "start_position": { "x": 0, "y": 0 },
                 "maps": [{ "id": "a", "width": 3, "height": 1, "safe_respawn": { "x": 0, "y": 0 } }] }"#,
        )
        .expect("write");
        let world = WorldDef::load(&path).expect("load");
        assert_eq!(world.maps[0].width, 3);
    }
}
