use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::app::Vec2;

use super::tilemap::TileCoord;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapId(String);

impl MapId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Destination bound to a portal tile. `target_position` is the arriving agent's top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portal {
    pub target_map: MapId,
    pub target_position: Vec2,
}

/// Side table of portals keyed by the map and tile they sit on.
#[derive(Debug, Clone, Default)]
pub struct PortalTable {
    entries: HashMap<(MapId, TileCoord), Portal>,
}

impl PortalTable {
    pub fn insert(&mut self, map: MapId, tile: TileCoord, portal: Portal) -> Option<Portal> {
        self.entries.insert((map, tile), portal)
    }

    pub fn get(&self, map: &MapId, tile: TileCoord) -> Option<&Portal> {
        self.entries.get(&(map.clone(), tile))
    }

    pub fn on_map<'a>(
        &'a self,
        map: &'a MapId,
    ) -> impl Iterator<Item = (TileCoord, &'a Portal)> + 'a {
        self.entries
            .iter()
            .filter(move |((owner, _), _)| owner == map)
            .map(|((_, tile), portal)| (*tile, portal))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
