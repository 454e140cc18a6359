/// Every piece of simulation state for one session. Systems borrow disjoint fields of it.
struct GameplayWorld {
    defs: DefDatabase,
    atlas: MapAtlas,
    transition: MapTransitionManager,
    spawner: HostileSpawner,
    ids: EntityIdAllocator,
    rng: GameRng,
    player: Player,
    hostiles: Vec<Hostile>,
    npcs: Vec<Npc>,
    drops: Vec<ItemDrop>,
    projectiles: Vec<Projectile>,
    events: GameplayEventBus,
}

impl GameplayWorld {
    fn new(defs: DefDatabase, atlas: MapAtlas, seed: u64) -> Self {
        let mut ids = EntityIdAllocator::default();
        let player = Player::from_def(ids.allocate(), defs.player(), atlas.start_position());
        let npcs = build_npcs(&atlas, &mut ids);
        Self {
            spawner: HostileSpawner::new(atlas.spawner()),
            transition: MapTransitionManager::new(DEFAULT_TRANSITION_SECONDS),
            rng: GameRng::seed_from_u64(seed),
            defs,
            atlas,
            ids,
            player,
            hostiles: Vec::new(),
            npcs,
            drops: Vec::new(),
            projectiles: Vec::new(),
            events: GameplayEventBus::default(),
        }
    }

    fn live_hostile_count(&self) -> usize {
        self.hostiles
            .iter()
            .filter(|hostile| hostile.body.alive)
            .count()
    }
}

fn build_npcs(atlas: &MapAtlas, ids: &mut EntityIdAllocator) -> Vec<Npc> {
    let tile_size = atlas.active_map().tile_size();
    atlas
        .npcs()
        .iter()
        .map(|placement| Npc::from_placement(ids.allocate(), placement, tile_size))
        .collect()
}

pub(crate) struct GameplayScene {
    defs: DefDatabase,
    initial_atlas: MapAtlas,
    seed: u64,
    world: GameplayWorld,
    systems: GameplaySystemsHost,
    previous_input: InputSnapshot,
    tick: u64,
}

impl GameplayScene {
    fn new(defs: DefDatabase, atlas: MapAtlas, seed: u64) -> Self {
        let world = GameplayWorld::new(defs.clone(), atlas.clone(), seed);
        Self {
            defs,
            initial_atlas: atlas,
            seed,
            world,
            systems: GameplaySystemsHost::default(),
            previous_input: InputSnapshot::empty(),
            tick: 0,
        }
    }

    fn reset(&mut self) {
        self.world = GameplayWorld::new(self.defs.clone(), self.initial_atlas.clone(), self.seed);
        self.systems = GameplaySystemsHost::default();
        self.previous_input = InputSnapshot::empty();
        self.tick = 0;
    }

    pub(crate) fn snapshot(&self) -> SceneSnapshot {
        let world = &self.world;
        let player = &world.player;
        SceneSnapshot {
            tick: self.tick,
            active_map: world.atlas.active_id().to_string(),
            transitioning: world.transition.is_transitioning(),
            fade_alpha: world.transition.fade_alpha(),
            tile_animation_frame: world.atlas.active_map().animation_frame(),
            player: PlayerSnapshot {
                agent: AgentSnapshot::of(&player.body),
                level: player.level,
                experience: player.experience,
                exp_to_next: player.exp_to_next,
                mana: player.mana.current(),
                max_mana: player.mana.max(),
                strength: player.strength,
                defense: player.defense(),
                weapon: player.equipment.weapon.as_ref().map(|item| item.def_name.clone()),
                armor: player.equipment.armor.as_ref().map(|item| item.def_name.clone()),
                inventory: player
                    .inventory
                    .items
                    .iter()
                    .map(|item| item.def_name.clone())
                    .collect(),
            },
            hostiles: world
                .hostiles
                .iter()
                .map(|hostile| HostileSnapshot {
                    agent: AgentSnapshot::of(&hostile.body),
                    kind: hostile.kind.clone(),
                    level: hostile.level,
                    aggroed: hostile.is_aggroed(),
                })
                .collect(),
            npcs: world
                .npcs
                .iter()
                .map(|npc| NpcSnapshot {
                    agent: AgentSnapshot::of(&npc.body),
                    kind: npc.kind.clone(),
                    in_talk_range: npc.in_talk_range,
                })
                .collect(),
            drops: world
                .drops
                .iter()
                .map(|drop| DropSnapshot {
                    id: drop.id,
                    item: drop.item.def_name.clone(),
                    center: drop.center,
                })
                .collect(),
            projectiles: world
                .projectiles
                .iter()
                .map(|projectile| ProjectileSnapshot {
                    id: projectile.id,
                    center: projectile.center,
                    remaining_seconds: projectile.lifetime.remaining(),
                })
                .collect(),
            stats: world.events.stats(),
        }
    }
}

/// Read-only view of the scene for presentation layers.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SceneSnapshot {
    tick: u64,
    active_map: String,
    transitioning: bool,
    fade_alpha: f32,
    tile_animation_frame: u32,
    player: PlayerSnapshot,
    hostiles: Vec<HostileSnapshot>,
    npcs: Vec<NpcSnapshot>,
    drops: Vec<DropSnapshot>,
    projectiles: Vec<ProjectileSnapshot>,
    stats: GameplayStats,
}

impl SceneSnapshot {
    pub(crate) fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, Serialize)]
struct AgentSnapshot {
    id: EntityId,
    role: AgentRole,
    position: Vec2,
    facing: Facing,
    animation: AnimationState,
    health: f32,
    max_health: f32,
    health_fraction: f32,
    damage_numbers: Vec<DamageNumber>,
}

impl AgentSnapshot {
    fn of(body: &AgentBody) -> Self {
        Self {
            id: body.id,
            role: body.role,
            position: body.position,
            facing: body.facing,
            animation: body.animation_state(),
            health: body.health.current(),
            max_health: body.health.max(),
            health_fraction: body.health.fraction(),
            damage_numbers: body.damage_numbers.iter().copied().collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct PlayerSnapshot {
    #[serde(flatten)]
    agent: AgentSnapshot,
    level: u32,
    experience: u64,
    exp_to_next: u64,
    mana: f32,
    max_mana: f32,
    strength: i32,
    defense: i32,
    weapon: Option<String>,
    armor: Option<String>,
    inventory: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
struct HostileSnapshot {
    #[serde(flatten)]
    agent: AgentSnapshot,
    kind: String,
    level: u32,
    aggroed: bool,
}

#[derive(Debug, Clone, Serialize)]
struct NpcSnapshot {
    #[serde(flatten)]
    agent: AgentSnapshot,
    kind: String,
    in_talk_range: bool,
}

#[derive(Debug, Clone, Serialize)]
struct DropSnapshot {
    id: EntityId,
    item: String,
    center: Vec2,
}

#[derive(Debug, Clone, Serialize)]
struct ProjectileSnapshot {
    id: EntityId,
    center: Vec2,
    remaining_seconds: f32,
}
