use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app::Vec2;

const ANIMATION_FRAME_SECONDS: f32 = 0.25;
const ANIMATION_FRAME_COUNT: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainKind {
    Grass,
    Sand,
    Stone,
    Water,
    Wall,
    Portal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainProps {
    pub walkable: bool,
    pub speed_multiplier: f32,
    /// Enterable only by an agent whose last stable position already lies in the same tile.
    pub entry_restricted: bool,
}

impl TerrainKind {
    pub fn props(self) -> TerrainProps {
        let (walkable, speed_multiplier, entry_restricted) = match self {
            Self::Grass | Self::Stone | Self::Portal => (true, 1.0, false),
            Self::Sand => (true, 0.7, false),
            Self::Water => (true, 0.5, true),
            Self::Wall => (false, 1.0, false),
        };
        TerrainProps {
            walkable,
            speed_multiplier,
            entry_restricted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileInfo {
    pub coord: TileCoord,
    pub terrain: TerrainKind,
    pub props: TerrainProps,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TilemapError {
    #[error("map dimensions must be non-zero, got {width}x{height}")]
    ZeroDimensions { width: u32, height: u32 },
    #[error("tile size must be finite and > 0, got {0}")]
    InvalidTileSize(f32),
    #[error("expected {expected} cells for the map grid, got {actual}")]
    CellCountMismatch { expected: usize, actual: usize },
}

/// Row-major terrain grid. Topology is fixed once world setup completes.
#[derive(Debug, Clone)]
pub struct TileMap {
    width: u32,
    height: u32,
    tile_size: f32,
    cells: Vec<TerrainKind>,
    animation_clock: f32,
}

impl TileMap {
    pub fn new(
        width: u32,
        height: u32,
        tile_size: f32,
        cells: Vec<TerrainKind>,
    ) -> Result<Self, TilemapError> {
        if width == 0 || height == 0 {
            return Err(TilemapError::ZeroDimensions { width, height });
        }
        if !tile_size.is_finite() || tile_size <= 0.0 {
            return Err(TilemapError::InvalidTileSize(tile_size));
        }
        let expected = width as usize * height as usize;
        if cells.len() != expected {
            return Err(TilemapError::CellCountMismatch {
                expected,
                actual: cells.len(),
            });
        }
        Ok(Self {
            width,
            height,
            tile_size,
            cells,
            animation_clock: 0.0,
        })
    }

    pub fn filled(
        width: u32,
        height: u32,
        tile_size: f32,
        terrain: TerrainKind,
    ) -> Result<Self, TilemapError> {
        let count = width as usize * height as usize;
        Self::new(width, height, tile_size, vec![terrain; count])
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn pixel_bounds(&self) -> Vec2 {
        Vec2::new(
            self.width as f32 * self.tile_size,
            self.height as f32 * self.tile_size,
        )
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        self.tile_coord(point).is_some()
    }

    pub fn tile_coord(&self, point: Vec2) -> Option<TileCoord> {
        if !point.x.is_finite() || !point.y.is_finite() {
            return None;
        }
        let coord = TileCoord::new(
            (point.x / self.tile_size).floor() as i32,
            (point.y / self.tile_size).floor() as i32,
        );
        self.cell_index(coord).map(|_| coord)
    }

    pub fn tile_center(&self, coord: TileCoord) -> Vec2 {
        Vec2::new(
            (coord.x as f32 + 0.5) * self.tile_size,
            (coord.y as f32 + 0.5) * self.tile_size,
        )
    }

    pub fn tile_origin(&self, coord: TileCoord) -> Vec2 {
        Vec2::new(
            coord.x as f32 * self.tile_size,
            coord.y as f32 * self.tile_size,
        )
    }

    pub fn terrain_at(&self, coord: TileCoord) -> Option<TerrainKind> {
        self.cell_index(coord).map(|index| self.cells[index])
    }

    pub fn tile_info(&self, point: Vec2) -> Option<TileInfo> {
        let coord = self.tile_coord(point)?;
        let terrain = self.terrain_at(coord)?;
        Some(TileInfo {
            coord,
            terrain,
            props: terrain.props(),
        })
    }

    /// Points outside the grid are never walkable.
    pub fn is_walkable(&self, point: Vec2) -> bool {
        self.tile_info(point)
            .is_some_and(|info| info.props.walkable)
    }

    /// Setup-time only. Cells outside the grid are ignored.
    pub fn set_terrain(&mut self, coord: TileCoord, terrain: TerrainKind) -> bool {
        match self.cell_index(coord) {
            Some(index) => {
                self.cells[index] = terrain;
                true
            }
            None => false,
        }
    }

    /// Setup-time only. The rectangle is clipped to the grid.
    pub fn fill_rect(&mut self, terrain: TerrainKind, origin: TileCoord, width: u32, height: u32) {
        for dy in 0..height as i32 {
            for dx in 0..width as i32 {
                self.set_terrain(TileCoord::new(origin.x + dx, origin.y + dy), terrain);
            }
        }
    }

    pub fn advance_animation(&mut self, dt_seconds: f32) {
        let cycle = ANIMATION_FRAME_SECONDS * ANIMATION_FRAME_COUNT as f32;
        self.animation_clock = (self.animation_clock + dt_seconds.max(0.0)) % cycle;
    }

    pub fn animation_frame(&self) -> u32 {
        ((self.animation_clock / ANIMATION_FRAME_SECONDS) as u32).min(ANIMATION_FRAME_COUNT - 1)
    }

    pub fn coords(&self) -> impl Iterator<Item = TileCoord> + '_ {
        (0..self.height as i32)
            .flat_map(move |y| (0..self.width as i32).map(move |x| TileCoord::new(x, y)))
    }

    fn cell_index(&self, coord: TileCoord) -> Option<usize> {
        if coord.x < 0 || coord.y < 0 {
            return None;
        }
        let (x, y) = (coord.x as u32, coord.y as u32);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grass_map(width: u32, height: u32) -> TileMap {
        TileMap::filled(width, height, 32.0, TerrainKind::Grass).expect("map")
    }

    #[test]
    fn new_rejects_bad_dimensions() {
        assert_eq!(
            TileMap::new(0, 3, 32.0, Vec::new()).expect_err("zero"),
            TilemapError::ZeroDimensions {
                width: 0,
                height: 3
            }
        );
        assert_eq!(
            TileMap::new(1, 1, 0.0, vec![TerrainKind::Grass]).expect_err("tile size"),
            TilemapError::InvalidTileSize(0.0)
        );
        assert_eq!(
            TileMap::new(2, 2, 32.0, vec![TerrainKind::Grass; 3]).expect_err("count"),
            TilemapError::CellCountMismatch {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn terrain_table_matches_expected_props() {
        assert!(!TerrainKind::Wall.props().walkable);
        assert!(TerrainKind::Water.props().walkable);
        assert!(TerrainKind::Water.props().entry_restricted);
        assert_eq!(TerrainKind::Water.props().speed_multiplier, 0.5);
        assert_eq!(TerrainKind::Sand.props().speed_multiplier, 0.7);
        assert!(TerrainKind::Portal.props().walkable);
        assert!(!TerrainKind::Grass.props().entry_restricted);
    }

    #[test]
    fn points_map_to_tiles_and_outside_is_unwalkable() {
        let mut map = grass_map(4, 3);
        map.set_terrain(TileCoord::new(1, 0), TerrainKind::Wall);

        assert_eq!(map.tile_coord(Vec2::new(33.0, 5.0)), Some(TileCoord::new(1, 0)));
        assert!(!map.is_walkable(Vec2::new(33.0, 5.0)));
        assert!(map.is_walkable(Vec2::new(5.0, 5.0)));
        assert!(!map.is_walkable(Vec2::new(-0.1, 5.0)));
        assert!(!map.is_walkable(Vec2::new(128.0, 5.0)));
        assert!(!map.is_walkable(Vec2::new(5.0, 96.0)));
        assert!(!map.contains_point(Vec2::new(f32::NAN, 0.0)));
        assert_eq!(map.pixel_bounds(), Vec2::new(128.0, 96.0));
    }

    #[test]
    fn fill_rect_clips_to_grid() {
        let mut map = grass_map(4, 4);
        map.fill_rect(TerrainKind::Water, TileCoord::new(2, 2), 5, 5);

        assert_eq!(map.terrain_at(TileCoord::new(3, 3)), Some(TerrainKind::Water));
        assert_eq!(map.terrain_at(TileCoord::new(1, 3)), Some(TerrainKind::Grass));
        let water = map
            .coords()
            .filter(|coord| map.terrain_at(*coord) == Some(TerrainKind::Water))
            .count();
        assert_eq!(water, 4);
    }

    #[test]
    fn tile_center_is_half_a_tile_in() {
        let map = grass_map(2, 2);
        assert_eq!(map.tile_center(TileCoord::new(1, 0)), Vec2::new(48.0, 16.0));
        assert_eq!(map.tile_origin(TileCoord::new(1, 1)), Vec2::new(32.0, 32.0));
    }

    #[test]
    fn animation_frame_cycles() {
        let mut map = grass_map(1, 1);
        assert_eq!(map.animation_frame(), 0);
        map.advance_animation(0.3);
        assert_eq!(map.animation_frame(), 1);
        map.advance_animation(0.8);
        assert_eq!(map.animation_frame(), 0);
    }
}
