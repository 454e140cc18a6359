mod atlas;
mod layout;
mod portal;
mod tilemap;
mod transition;

pub use atlas::MapAtlas;
pub use layout::{
    MapDef, NpcPlacement, PortalDef, RegionDef, SpawnerDef, WorldDef, WorldLoadError,
};
pub use portal::{MapId, Portal, PortalTable};
pub use tilemap::{TerrainKind, TerrainProps, TileCoord, TileInfo, TileMap, TilemapError};
pub use transition::{
    MapTransitionManager, TransitionArrival, TransitionState, DEFAULT_TRANSITION_SECONDS,
};
