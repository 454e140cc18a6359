/// Periodic hostile spawner for the active map. Rebuilt on every map change.
#[derive(Debug, Clone)]
struct HostileSpawner {
    config: SpawnerDef,
    elapsed_seconds: f32,
}

impl HostileSpawner {
    fn new(config: SpawnerDef) -> Self {
        Self {
            config,
            elapsed_seconds: 0.0,
        }
    }

    /// Returns a spawn position once per interval while below the population cap.
    fn update(
        &mut self,
        dt_seconds: f32,
        live_hostiles: usize,
        player_position: Vec2,
        map: &TileMap,
        rng: &mut GameRng,
    ) -> Option<Vec2> {
        self.elapsed_seconds += dt_seconds.max(0.0);
        if self.elapsed_seconds < self.config.interval_seconds
            || live_hostiles >= self.config.max_hostiles
        {
            return None;
        }
        self.elapsed_seconds = 0.0;
        let point = self.find_spawn_point(player_position, map, rng);
        if point.is_none() {
            debug!(
                attempts = self.config.max_attempts,
                "hostile_spawn_point_not_found"
            );
        }
        point
    }

    /// Random tile origins that are plain walkable ground, not a portal, and far enough from the
    /// player.
    fn find_spawn_point(
        &self,
        player_position: Vec2,
        map: &TileMap,
        rng: &mut GameRng,
    ) -> Option<Vec2> {
        if map.width() == 0 || map.height() == 0 {
            return None;
        }
        for _ in 0..self.config.max_attempts {
            let coord = TileCoord::new(
                rng.gen_range(0..map.width() as i32),
                rng.gen_range(0..map.height() as i32),
            );
            let Some(terrain) = map.terrain_at(coord) else {
                continue;
            };
            let props = terrain.props();
            if !props.walkable || props.entry_restricted || terrain == TerrainKind::Portal {
                continue;
            }
            let point = map.tile_origin(coord);
            if point.distance(player_position) >= self.config.min_player_distance {
                return Some(point);
            }
        }
        None
    }
}

fn spawn_hostile(
    defs: &DefDatabase,
    id: EntityId,
    position: Vec2,
    level: u32,
    rng: &mut GameRng,
) -> Option<Hostile> {
    let archetype = weighted_pick(defs.hostiles(), |archetype| archetype.spawn_weight, rng)?;
    Some(Hostile::from_archetype(id, archetype, position, level))
}

/// Loot for a kill: first the hostile's drop chance, then a weighted item pick.
fn roll_drop(defs: &DefDatabase, drop_chance: f32, rng: &mut GameRng) -> Option<ItemDef> {
    if drop_chance <= 0.0 || rng.gen::<f32>() >= drop_chance {
        return None;
    }
    weighted_pick(defs.items(), |item| item.drop_weight, rng).cloned()
}
