use std::collections::HashMap;

use tracing::info;

use crate::app::Vec2;

use super::layout::{NpcPlacement, SpawnerDef, WorldDef, WorldLoadError};
use super::portal::{MapId, Portal, PortalTable};
use super::tilemap::{TerrainKind, TileCoord, TileMap};

#[derive(Debug, Clone)]
struct AtlasEntry {
    id: MapId,
    map: TileMap,
    safe_respawn: Vec2,
    hostile_level: u32,
    spawner: SpawnerDef,
    npcs: Vec<NpcPlacement>,
}

/// Every map of a world instance, the portal side table, and which map is active.
///
/// Positions stored here (respawn points, portal targets, NPC placements) are agent top-left
/// corners. Agents occupy one tile, so a position is checked for walkability at
/// `position + tile_size / 2`.
#[derive(Debug, Clone)]
pub struct MapAtlas {
    entries: Vec<AtlasEntry>,
    index_by_id: HashMap<MapId, usize>,
    portals: PortalTable,
    active: usize,
    start_position: Vec2,
}

impl MapAtlas {
    pub fn from_world(world: &WorldDef) -> Result<Self, WorldLoadError> {
        if world.maps.is_empty() {
            return Err(WorldLoadError::EmptyWorld);
        }

        let mut entries = Vec::with_capacity(world.maps.len());
        let mut index_by_id = HashMap::with_capacity(world.maps.len());
        for map_def in &world.maps {
            if index_by_id.contains_key(&map_def.id) {
                return Err(WorldLoadError::DuplicateMap(map_def.id.clone()));
            }
            let mut map = TileMap::filled(
                map_def.width,
                map_def.height,
                map_def.tile_size,
                map_def.fill,
            )
            .map_err(|source| WorldLoadError::InvalidMap {
                map: map_def.id.clone(),
                source,
            })?;
            for region in &map_def.regions {
                map.fill_rect(
                    region.terrain,
                    TileCoord::new(region.x, region.y),
                    region.width,
                    region.height,
                );
            }
            index_by_id.insert(map_def.id.clone(), entries.len());
            entries.push(AtlasEntry {
                id: map_def.id.clone(),
                map,
                safe_respawn: map_def.safe_respawn,
                hostile_level: map_def.hostile_level.max(1),
                spawner: map_def.spawner,
                npcs: map_def.npcs.clone(),
            });
        }

        let mut portals = PortalTable::default();
        for portal in &world.portals {
            let Some(&source_index) = index_by_id.get(&portal.map) else {
                return Err(WorldLoadError::UnknownMap {
                    context: format!("portal at {:?}", portal.tile),
                    map: portal.map.clone(),
                });
            };
            let Some(&target_index) = index_by_id.get(&portal.target_map) else {
                return Err(WorldLoadError::UnknownMap {
                    context: format!("portal at {:?} on '{}'", portal.tile, portal.map),
                    map: portal.target_map.clone(),
                });
            };
            if !entries[source_index]
                .map
                .set_terrain(portal.tile, TerrainKind::Portal)
            {
                return Err(WorldLoadError::PortalOutOfBounds {
                    map: portal.map.clone(),
                    tile: portal.tile,
                });
            }
            ensure_walkable(
                &entries[target_index],
                "portal target",
                portal.target_position,
            )?;
            portals.insert(
                portal.map.clone(),
                portal.tile,
                Portal {
                    target_map: portal.target_map.clone(),
                    target_position: portal.target_position,
                },
            );
        }

        let Some(&active) = index_by_id.get(&world.start_map) else {
            return Err(WorldLoadError::StartMapMissing(world.start_map.clone()));
        };
        for entry in &entries {
            ensure_walkable(entry, "safe respawn", entry.safe_respawn)?;
        }
        ensure_walkable(&entries[active], "start position", world.start_position)?;

        info!(
            maps = entries.len(),
            portals = portals.len(),
            start_map = %world.start_map,
            "map_atlas_built"
        );
        Ok(Self {
            entries,
            index_by_id,
            portals,
            active,
            start_position: world.start_position,
        })
    }

    /// A one-map atlas with default spawner tuning and no portals.
    pub fn single_map(id: MapId, map: TileMap, safe_respawn: Vec2) -> Self {
        let mut index_by_id = HashMap::new();
        index_by_id.insert(id.clone(), 0);
        Self {
            entries: vec![AtlasEntry {
                id,
                map,
                safe_respawn,
                hostile_level: 1,
                spawner: SpawnerDef::default(),
                npcs: Vec::new(),
            }],
            index_by_id,
            portals: PortalTable::default(),
            active: 0,
            start_position: safe_respawn,
        }
    }

    fn active_entry(&self) -> &AtlasEntry {
        &self.entries[self.active]
    }

    pub fn active_id(&self) -> &MapId {
        &self.active_entry().id
    }

    pub fn active_map(&self) -> &TileMap {
        &self.active_entry().map
    }

    pub fn map(&self, id: &MapId) -> Option<&TileMap> {
        self.index_by_id
            .get(id)
            .map(|&index| &self.entries[index].map)
    }

    pub fn map_ids(&self) -> impl Iterator<Item = &MapId> {
        self.entries.iter().map(|entry| &entry.id)
    }

    pub fn safe_respawn(&self) -> Vec2 {
        self.active_entry().safe_respawn
    }

    pub fn hostile_level(&self) -> u32 {
        self.active_entry().hostile_level
    }

    pub fn spawner(&self) -> SpawnerDef {
        self.active_entry().spawner
    }

    pub fn npcs(&self) -> &[NpcPlacement] {
        &self.active_entry().npcs
    }

    pub fn start_position(&self) -> Vec2 {
        self.start_position
    }

    pub fn portals(&self) -> &PortalTable {
        &self.portals
    }

    /// Portal bound to the active-map tile under `point`, if any.
    pub fn portal_at(&self, point: Vec2) -> Option<&Portal> {
        let coord = self.active_map().tile_coord(point)?;
        self.portals.get(self.active_id(), coord)
    }

    pub fn advance_animation(&mut self, dt_seconds: f32) {
        let active = self.active;
        self.entries[active].map.advance_animation(dt_seconds);
    }

    pub(crate) fn activate(&mut self, id: &MapId) -> bool {
        match self.index_by_id.get(id) {
            Some(&index) => {
                self.active = index;
                true
            }
            None => false,
        }
    }
}

fn ensure_walkable(
    entry: &AtlasEntry,
    what: &'static str,
    position: Vec2,
) -> Result<(), WorldLoadError> {
    let half_tile = entry.map.tile_size() * 0.5;
    if entry
        .map
        .is_walkable(position + Vec2::new(half_tile, half_tile))
    {
        Ok(())
    } else {
        Err(WorldLoadError::UnwalkablePoint {
            map: entry.id.clone(),
            what,
            position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::layout::{MapDef, PortalDef, RegionDef};
    use super::*;

    fn map_def(id: &str) -> MapDef {
        MapDef {
            id: MapId::new(id),
            width: 10,
            height: 10,
            tile_size: 32.0,
            fill: TerrainKind::Grass,
            regions: Vec::new(),
            safe_respawn: Vec2::new(32.0, 32.0),
            hostile_level: 1,
            spawner: SpawnerDef::default(),
            npcs: Vec::new(),
        }
    }

    fn two_map_world() -> WorldDef {
        WorldDef {
            start_map: MapId::new("a"),
            start_position: Vec2::new(64.0, 64.0),
            maps: vec![map_def("a"), map_def("b")],
            portals: vec![PortalDef {
                map: MapId::new("a"),
                tile: TileCoord::new(5, 5),
                target_map: MapId::new("b"),
                target_position: Vec2::new(96.0, 96.0),
            }],
        }
    }

    #[test]
    fn builds_maps_and_marks_portal_cells() {
        let atlas = MapAtlas::from_world(&two_map_world()).expect("atlas");
        assert_eq!(atlas.active_id(), &MapId::new("a"));
        assert_eq!(
            atlas.active_map().terrain_at(TileCoord::new(5, 5)),
            Some(TerrainKind::Portal)
        );
        let portal = atlas
            .portal_at(Vec2::new(5.0 * 32.0 + 10.0, 5.0 * 32.0 + 10.0))
            .expect("portal");
        assert_eq!(portal.target_map, MapId::new("b"));
        assert!(atlas.portal_at(Vec2::new(10.0, 10.0)).is_none());
    }

    #[test]
    fn regions_apply_in_order() {
        let mut world = two_map_world();
        world.maps[0].regions = vec![
            RegionDef {
                terrain: TerrainKind::Wall,
                x: 7,
                y: 0,
                width: 3,
                height: 10,
            },
            RegionDef {
                terrain: TerrainKind::Sand,
                x: 8,
                y: 4,
                width: 1,
                height: 1,
            },
        ];
        let atlas = MapAtlas::from_world(&world).expect("atlas");
        let map = atlas.active_map();
        assert_eq!(map.terrain_at(TileCoord::new(7, 2)), Some(TerrainKind::Wall));
        assert_eq!(map.terrain_at(TileCoord::new(8, 4)), Some(TerrainKind::Sand));
    }

    #[test]
    fn rejects_inconsistent_worlds() {
        let mut world = two_map_world();
        world.maps.push(map_def("a"));
        assert!(matches!(
            MapAtlas::from_world(&world),
            Err(WorldLoadError::DuplicateMap(_))
        ));

        let mut world = two_map_world();
        world.portals[0].target_map = MapId::new("nowhere");
        assert!(matches!(
            MapAtlas::from_world(&world),
            Err(WorldLoadError::UnknownMap { .. })
        ));

        let mut world = two_map_world();
        world.portals[0].tile = TileCoord::new(10, 0);
        assert!(matches!(
            MapAtlas::from_world(&world),
            Err(WorldLoadError::PortalOutOfBounds { .. })
        ));

        let mut world = two_map_world();
        world.start_map = MapId::new("c");
        assert!(matches!(
            MapAtlas::from_world(&world),
            Err(WorldLoadError::StartMapMissing(_))
        ));

        let mut world = two_map_world();
        world.maps[1].width = 0;
        assert!(matches!(
            MapAtlas::from_world(&world),
            Err(WorldLoadError::InvalidMap { .. })
        ));

        let mut world = two_map_world();
        world.maps[0].regions.push(RegionDef {
            terrain: TerrainKind::Wall,
            x: 1,
            y: 1,
            width: 1,
            height: 1,
        });
        assert!(matches!(
            MapAtlas::from_world(&world),
            Err(WorldLoadError::UnwalkablePoint {
                what: "safe respawn",
                ..
            })
        ));

        let world = WorldDef {
            maps: Vec::new(),
            ..two_map_world()
        };
        assert!(matches!(
            MapAtlas::from_world(&world),
            Err(WorldLoadError::EmptyWorld)
        ));
    }

    #[test]
    fn builtin_world_builds() {
        let world = WorldDef::builtin().expect("world");
        let atlas = world.build_atlas().expect("atlas");
        assert!(atlas.portals().len() >= 2);
        assert_eq!(atlas.map_ids().count(), world.maps.len());
    }

    #[test]
    fn activate_switches_active_map_data() {
        let mut world = two_map_world();
        world.maps[1].hostile_level = 3;
        world.maps[1].safe_respawn = Vec2::new(128.0, 128.0);
        let mut atlas = MapAtlas::from_world(&world).expect("atlas");

        assert!(!atlas.activate(&MapId::new("zzz")));
        assert!(atlas.activate(&MapId::new("b")));
        assert_eq!(atlas.hostile_level(), 3);
        assert_eq!(atlas.safe_respawn(), Vec2::new(128.0, 128.0));
    }
}
