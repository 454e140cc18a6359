use std::collections::{HashSet, VecDeque};
use std::f32::consts::FRAC_1_SQRT_2;

use engine::{
    DefDatabase, DefId, EntityId, EntityIdAllocator, HostileArchetype, InputAction, InputSnapshot,
    ItemDef, ItemKind, MapAtlas, MapTransitionManager, NpcPlacement, PlayerDef, Scene,
    SceneCommand, SpawnerDef, TerrainKind, TileCoord, TileMap, TransitionArrival, Vec2,
    DEFAULT_TRANSITION_SECONDS,
};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::Serialize;
use tracing::{debug, info, warn};

const AGENT_SIZE_PX: f32 = 32.0;
const AGENT_HALF_PX: f32 = AGENT_SIZE_PX * 0.5;
const LINE_OF_SIGHT_STEP_PX: f32 = AGENT_SIZE_PX * 0.5;

const COUNTDOWN_TOLERANCE_SECONDS: f32 = 1e-4;

const HIT_INVULNERABILITY_SECONDS: f32 = 0.5;
const KNOCKBACK_DISTANCE_PX: f32 = 30.0;
const KNOCKBACK_SPEED_PX_PER_SECOND: f32 = 200.0;
const DAMAGE_NUMBER_LIFETIME_SECONDS: f32 = 1.0;
const DAMAGE_NUMBER_JITTER_PX: i32 = 10;
const DAMAGE_NUMBER_RISE_PX: f32 = 20.0;
const DAMAGE_NUMBER_QUEUE_MAX: usize = 8;

const AGGRO_DECAY_SECONDS: f32 = 10.0;
const STUCK_EPSILON_PX: f32 = 1.0;
const STUCK_THRESHOLD_SECONDS: f32 = 0.5;
const STUCK_COOLDOWN_SECONDS: f32 = 1.0;
const HOSTILE_ATTACK_COOLDOWN_SECONDS: f32 = 1.0;
const HOSTILE_ATTACK_ANIMATION_SECONDS: f32 = 0.3;
const HOSTILE_DAMAGE_MIN_FACTOR: f32 = 0.8;
const HOSTILE_DAMAGE_MAX_FACTOR: f32 = 1.2;
const EXP_BONUS_PER_LEVEL: f32 = 0.1;

const NPC_TALK_RANGE_TILES: f32 = 2.0;

const PLAYER_FIRST_LEVEL_EXP: u64 = 100;
const PLAYER_EXP_GROWTH: f32 = 1.5;
const LEVEL_UP_HEALTH_BONUS: f32 = 10.0;
const LEVEL_UP_MANA_BONUS: f32 = 5.0;
const LEVEL_UP_STRENGTH_BONUS: i32 = 2;
const PLAYER_RESPAWN_SECONDS: f32 = 3.0;
const PLAYER_ATTACK_ANIMATION_SECONDS: f32 = 0.3;
const INVENTORY_CAPACITY: usize = 20;
const PICKUP_RADIUS_PX: f32 = 50.0;

const BASIC_ATTACK_HITBOX_PX: f32 = 48.0;
const BASIC_ATTACK_RANGE_PX: f32 = 50.0;
const BASIC_ATTACK_CRIT_CHANCE: f64 = 0.15;
const BASIC_ATTACK_CRIT_MULTIPLIER: f32 = 2.0;
const SPIN_ATTACK_RADIUS_PX: f32 = 80.0;
const DASH_DURATION_SECONDS: f32 = 0.2;
const DASH_SPEED_PX_PER_SECOND: f32 = 600.0;
const WAVE_SPEED_PX_PER_SECOND: f32 = 300.0;
const WAVE_LIFETIME_SECONDS: f32 = 1.5;
const WAVE_HITBOX_PX: f32 = 48.0;

const GAMEPLAY_SYSTEM_ORDER_TEXT: &str =
    "Timers>Movement>Perception>Combat>Pickups>Spawning>Cleanup>Recovery>Transition";

include!("types.rs");
include!("movement.rs");
include!("perception.rs");
include!("combat.rs");
include!("abilities.rs");
include!("spawner.rs");
include!("systems.rs");
include!("scene_state.rs");
include!("scene_impl.rs");
include!("util.rs");

pub(crate) fn build_scene(defs: DefDatabase, atlas: MapAtlas, seed: u64) -> GameplayScene {
    GameplayScene::new(defs, atlas, seed)
}

#[cfg(test)]
mod tests {
    include!("tests.rs");
}
