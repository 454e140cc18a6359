use tracing::{info, warn};

use crate::app::Vec2;

use super::atlas::MapAtlas;
use super::portal::{MapId, Portal};

pub const DEFAULT_TRANSITION_SECONDS: f32 = 1.0;
/// Remaining time below this counts as expired. Absorbs `f32` drift from summing fixed steps.
const COUNTDOWN_TOLERANCE_SECONDS: f32 = 1e-4;

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionState {
    Idle,
    Transitioning { remaining: f32, pending: Portal },
}

/// Emitted exactly once when a transition's countdown runs out.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionArrival {
    pub map: MapId,
    pub position: Vec2,
}

#[derive(Debug, Clone)]
pub struct MapTransitionManager {
    duration: f32,
    state: TransitionState,
}

impl Default for MapTransitionManager {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSITION_SECONDS)
    }
}

impl MapTransitionManager {
    pub fn new(duration_seconds: f32) -> Self {
        let duration = if duration_seconds.is_finite() && duration_seconds > 0.0 {
            duration_seconds
        } else {
            DEFAULT_TRANSITION_SECONDS
        };
        Self {
            duration,
            state: TransitionState::Idle,
        }
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn state(&self) -> &TransitionState {
        &self.state
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(self.state, TransitionState::Transitioning { .. })
    }

    /// Looks for a portal under the agent's center or four points around it.
    ///
    /// Side-effect free. Always `None` while a transition is running.
    pub fn check_portal(&self, atlas: &MapAtlas, center: Vec2, half_extent: f32) -> Option<Portal> {
        if self.is_transitioning() {
            return None;
        }
        let offset = half_extent * 0.5;
        let samples = [
            center,
            center + Vec2::new(-offset, 0.0),
            center + Vec2::new(offset, 0.0),
            center + Vec2::new(0.0, -offset),
            center + Vec2::new(0.0, offset),
        ];
        samples
            .into_iter()
            .find_map(|point| atlas.portal_at(point).cloned())
    }

    /// Only accepted from `Idle`.
    pub fn start_transition(&mut self, portal: Portal) -> bool {
        if self.is_transitioning() {
            return false;
        }
        info!(
            target_map = %portal.target_map,
            duration_s = self.duration,
            "map_transition_started"
        );
        self.state = TransitionState::Transitioning {
            remaining: self.duration,
            pending: portal,
        };
        true
    }

    /// Advances tile animation and the countdown. Swaps the active map when it expires.
    pub fn update(&mut self, dt_seconds: f32, atlas: &mut MapAtlas) -> Option<TransitionArrival> {
        atlas.advance_animation(dt_seconds);

        let TransitionState::Transitioning { remaining, .. } = &mut self.state else {
            return None;
        };
        *remaining -= dt_seconds.max(0.0);
        if *remaining > COUNTDOWN_TOLERANCE_SECONDS {
            return None;
        }

        let TransitionState::Transitioning { pending, .. } =
            std::mem::replace(&mut self.state, TransitionState::Idle)
        else {
            return None;
        };
        if !atlas.activate(&pending.target_map) {
            warn!(target_map = %pending.target_map, "map_transition_target_missing");
            return None;
        }
        info!(
            map = %pending.target_map,
            x = pending.target_position.x,
            y = pending.target_position.y,
            "map_transition_complete"
        );
        Some(TransitionArrival {
            map: pending.target_map,
            position: pending.target_position,
        })
    }

    /// 0 when idle; ramps linearly to 1 at the halfway point and back to 0.
    pub fn fade_alpha(&self) -> f32 {
        match &self.state {
            TransitionState::Idle => 0.0,
            TransitionState::Transitioning { remaining, .. } => {
                let progress = (1.0 - remaining / self.duration).clamp(0.0, 1.0);
                if progress < 0.5 {
                    progress * 2.0
                } else {
                    (1.0 - progress) * 2.0
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::layout::{MapDef, PortalDef, SpawnerDef, WorldDef};
    use super::super::tilemap::{TerrainKind, TileCoord};
    use super::*;

    fn atlas() -> MapAtlas {
        let map = |id: &str| MapDef {
            id: MapId::new(id),
            width: 8,
            height: 8,
            tile_size: 32.0,
            fill: TerrainKind::Grass,
            regions: Vec::new(),
            safe_respawn: Vec2::new(0.0, 0.0),
            hostile_level: 1,
            spawner: SpawnerDef::default(),
            npcs: Vec::new(),
        };
        WorldDef {
            start_map: MapId::new("town"),
            start_position: Vec2::new(0.0, 0.0),
            maps: vec![map("town"), map("forest")],
            portals: vec![PortalDef {
                map: MapId::new("town"),
                tile: TileCoord::new(3, 3),
                target_map: MapId::new("forest"),
                target_position: Vec2::new(160.0, 64.0),
            }],
        }
        .build_atlas()
        .expect("atlas")
    }

    fn forest_portal() -> Portal {
        Portal {
            target_map: MapId::new("forest"),
            target_position: Vec2::new(160.0, 64.0),
        }
    }

    #[test]
    fn check_portal_samples_around_center() {
        let atlas = atlas();
        let manager = MapTransitionManager::default();
        // Center sits in tile (2, 3); the +x sample lands in the portal tile (3, 3).
        let near = Vec2::new(3.0 * 32.0 - 4.0, 3.0 * 32.0 + 16.0);
        assert_eq!(manager.check_portal(&atlas, near, 16.0), Some(forest_portal()));

        let far = Vec2::new(16.0, 16.0);
        assert_eq!(manager.check_portal(&atlas, far, 16.0), None);
    }

    #[test]
    fn transition_is_exclusive_and_arrives_once() {
        let mut atlas = atlas();
        let mut manager = MapTransitionManager::new(1.0);

        assert!(manager.start_transition(forest_portal()));
        assert!(!manager.start_transition(forest_portal()));
        let on_portal = Vec2::new(3.5 * 32.0, 3.5 * 32.0);
        assert_eq!(manager.check_portal(&atlas, on_portal, 16.0), None);

        let mut arrivals = Vec::new();
        for _ in 0..8 {
            if let Some(arrival) = manager.update(0.25, &mut atlas) {
                arrivals.push(arrival);
            }
            if arrivals.is_empty() {
                assert_eq!(atlas.active_id(), &MapId::new("town"));
            }
        }

        assert_eq!(
            arrivals,
            vec![TransitionArrival {
                map: MapId::new("forest"),
                position: Vec2::new(160.0, 64.0),
            }]
        );
        assert_eq!(atlas.active_id(), &MapId::new("forest"));
        assert!(!manager.is_transitioning());
        assert!(manager.start_transition(forest_portal()));
    }

    #[test]
    fn arrival_lands_after_full_duration() {
        let mut atlas = atlas();
        let mut manager = MapTransitionManager::new(1.0);
        manager.start_transition(forest_portal());

        for _ in 0..3 {
            assert!(manager.update(0.25, &mut atlas).is_none());
        }
        assert!(manager.update(0.25, &mut atlas).is_some());
    }

    #[test]
    fn arrival_lands_on_the_sixtieth_tick_at_sixty_hertz() {
        let mut atlas = atlas();
        let mut manager = MapTransitionManager::new(1.0);
        manager.start_transition(forest_portal());
        let dt = crate::app::LoopConfig::default().fixed_dt_seconds();

        for _ in 0..59 {
            assert!(manager.update(dt, &mut atlas).is_none());
        }
        assert!(manager.update(dt, &mut atlas).is_some());
        assert_eq!(atlas.active_id(), &MapId::new("forest"));
    }

    #[test]
    fn fade_ramps_up_then_down() {
        let mut atlas = atlas();
        let mut manager = MapTransitionManager::new(1.0);
        assert_eq!(manager.fade_alpha(), 0.0);

        manager.start_transition(forest_portal());
        assert_eq!(manager.fade_alpha(), 0.0);
        manager.update(0.25, &mut atlas);
        assert!((manager.fade_alpha() - 0.5).abs() < 1e-6);
        manager.update(0.25, &mut atlas);
        assert!((manager.fade_alpha() - 1.0).abs() < 1e-6);
        manager.update(0.25, &mut atlas);
        assert!((manager.fade_alpha() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn non_positive_duration_falls_back_to_default() {
        assert_eq!(MapTransitionManager::new(0.0).duration(), 1.0);
        assert_eq!(MapTransitionManager::new(f32::NAN).duration(), 1.0);
        assert_eq!(MapTransitionManager::new(2.5).duration(), 2.5);
    }
}
