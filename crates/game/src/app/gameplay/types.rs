type GameRng = Xoshiro256PlusPlus;

/// Seconds left on a one-shot timer. Saturates at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Countdown {
    remaining: f32,
}

impl Countdown {
    fn started(duration_seconds: f32) -> Self {
        let mut countdown = Self::default();
        countdown.start(duration_seconds);
        countdown
    }

    fn start(&mut self, duration_seconds: f32) {
        self.remaining = duration_seconds.max(0.0);
    }

    /// Snaps to zero once within tolerance so fixed-step drift never costs an extra tick.
    fn tick(&mut self, dt_seconds: f32) {
        self.remaining -= dt_seconds.max(0.0);
        if self.remaining <= COUNTDOWN_TOLERANCE_SECONDS {
            self.remaining = 0.0;
        }
    }

    fn clear(&mut self) {
        self.remaining = 0.0;
    }

    fn remaining(self) -> f32 {
        self.remaining
    }

    fn is_active(self) -> bool {
        self.remaining > 0.0
    }

    fn is_ready(self) -> bool {
        !self.is_active()
    }
}

/// Bounded quantity such as health or mana. `0 <= current <= max` always holds.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ResourcePool {
    current: f32,
    max: f32,
}

impl ResourcePool {
    fn full(max: f32) -> Self {
        let max = max.max(0.0);
        Self { current: max, max }
    }

    fn current(self) -> f32 {
        self.current
    }

    fn max(self) -> f32 {
        self.max
    }

    fn is_empty(self) -> bool {
        self.current <= 0.0
    }

    fn fraction(self) -> f32 {
        if self.max <= 0.0 {
            0.0
        } else {
            self.current / self.max
        }
    }

    /// All or nothing: a failed spend leaves the pool untouched.
    fn spend(&mut self, amount: f32) -> bool {
        if amount < 0.0 || amount > self.current {
            return false;
        }
        self.current -= amount;
        true
    }

    fn damage(&mut self, amount: f32) {
        self.current = (self.current - amount.max(0.0)).clamp(0.0, self.max);
    }

    fn restore(&mut self, amount: f32) {
        self.current = (self.current + amount.max(0.0)).clamp(0.0, self.max);
    }

    fn refill(&mut self) {
        self.current = self.max;
    }

    fn set_max(&mut self, max: f32) {
        self.max = max.max(0.0);
        self.current = self.current.min(self.max);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum Facing {
    Up,
    Down,
    Left,
    Right,
}

impl Facing {
    fn vector(self) -> Vec2 {
        match self {
            Self::Up => Vec2::new(0.0, -1.0),
            Self::Down => Vec2::new(0.0, 1.0),
            Self::Left => Vec2::new(-1.0, 0.0),
            Self::Right => Vec2::new(1.0, 0.0),
        }
    }

    /// Dominant axis wins; horizontal on ties. `None` for a zero vector.
    fn from_vector(direction: Vec2) -> Option<Self> {
        if direction.is_zero() {
            return None;
        }
        if direction.x.abs() >= direction.y.abs() {
            Some(if direction.x < 0.0 { Self::Left } else { Self::Right })
        } else {
            Some(if direction.y < 0.0 { Self::Up } else { Self::Down })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum AgentRole {
    Player,
    Hostile,
    Npc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum DamageClass {
    Normal,
    Critical,
    Special,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum AnimationState {
    Idle,
    Moving,
    Attacking,
    Hit,
    Dead,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
struct DamageNumber {
    value: i32,
    origin: Vec2,
    remaining_seconds: f32,
    class: DamageClass,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Knockback {
    remaining_px: f32,
    direction: Vec2,
}

impl Knockback {
    fn is_active(self) -> bool {
        self.remaining_px > 0.0
    }
}

/// State every agent carries regardless of role. `position` is the top-left corner of a
/// one-tile square.
#[derive(Debug, Clone)]
struct AgentBody {
    id: EntityId,
    role: AgentRole,
    position: Vec2,
    last_stable_position: Vec2,
    facing: Facing,
    health: ResourcePool,
    alive: bool,
    moving: bool,
    invulnerability: Countdown,
    attack_animation: Countdown,
    knockback: Knockback,
    damage_numbers: VecDeque<DamageNumber>,
}

impl AgentBody {
    fn new(id: EntityId, role: AgentRole, position: Vec2, max_health: f32) -> Self {
        Self {
            id,
            role,
            position,
            last_stable_position: position,
            facing: Facing::Down,
            health: ResourcePool::full(max_health),
            alive: true,
            moving: false,
            invulnerability: Countdown::default(),
            attack_animation: Countdown::default(),
            knockback: Knockback::default(),
            damage_numbers: VecDeque::with_capacity(DAMAGE_NUMBER_QUEUE_MAX),
        }
    }

    fn center(&self) -> Vec2 {
        agent_center(self.position)
    }

    /// Teleport-style placement. Also resets the entry-restriction anchor.
    fn place_at(&mut self, position: Vec2) {
        self.position = position;
        self.last_stable_position = position;
        self.knockback = Knockback::default();
        self.moving = false;
    }

    fn push_damage_number(&mut self, number: DamageNumber) {
        while self.damage_numbers.len() >= DAMAGE_NUMBER_QUEUE_MAX {
            self.damage_numbers.pop_front();
        }
        self.damage_numbers.push_back(number);
    }

    fn tick_animation_timers(&mut self, dt_seconds: f32) {
        self.invulnerability.tick(dt_seconds);
        self.attack_animation.tick(dt_seconds);
        for number in &mut self.damage_numbers {
            number.remaining_seconds -= dt_seconds;
        }
        self.damage_numbers
            .retain(|number| number.remaining_seconds > 0.0);
    }

    fn animation_state(&self) -> AnimationState {
        if !self.alive {
            AnimationState::Dead
        } else if self.invulnerability.is_active() {
            AnimationState::Hit
        } else if self.attack_animation.is_active() {
            AnimationState::Attacking
        } else if self.moving {
            AnimationState::Moving
        } else {
            AnimationState::Idle
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AggroState {
    Passive,
    Aggroed,
}

#[derive(Debug, Clone, Copy, Default)]
struct StuckTracker {
    anchor: Vec2,
    stationary_seconds: f32,
    cooldown: Countdown,
}

impl StuckTracker {
    fn anchored_at(position: Vec2) -> Self {
        Self {
            anchor: position,
            ..Self::default()
        }
    }

    /// Accumulates time spent within the epsilon box around the anchor. Returns whether the
    /// threshold is reached.
    fn observe(&mut self, position: Vec2, dt_seconds: f32) -> bool {
        let dx = (position.x - self.anchor.x).abs();
        let dy = (position.y - self.anchor.y).abs();
        if dx < STUCK_EPSILON_PX && dy < STUCK_EPSILON_PX {
            self.stationary_seconds += dt_seconds;
        } else {
            self.stationary_seconds = 0.0;
            self.anchor = position;
        }
        self.stationary_seconds >= STUCK_THRESHOLD_SECONDS
    }
}

#[derive(Debug, Clone)]
struct Hostile {
    body: AgentBody,
    archetype: DefId,
    kind: String,
    level: u32,
    strength: i32,
    defense: i32,
    speed: f32,
    attack_range: f32,
    aggro_range: f32,
    exp_value: u32,
    drop_chance: f32,
    aggro: AggroState,
    aggro_decay: Countdown,
    last_seen: Option<Vec2>,
    pursuit_target: Option<Vec2>,
    has_line_of_sight: bool,
    stuck: StuckTracker,
    attack_cooldown: Countdown,
}

impl Hostile {
    fn from_archetype(
        id: EntityId,
        archetype: &HostileArchetype,
        position: Vec2,
        level: u32,
    ) -> Self {
        Self {
            body: AgentBody::new(id, AgentRole::Hostile, position, archetype.max_health),
            archetype: archetype.id,
            kind: archetype.def_name.clone(),
            level: level.max(1),
            strength: archetype.strength,
            defense: archetype.defense,
            speed: archetype.speed,
            attack_range: archetype.attack_range,
            aggro_range: archetype.aggro_range,
            exp_value: archetype.exp_value,
            drop_chance: archetype.drop_chance,
            aggro: AggroState::Passive,
            aggro_decay: Countdown::default(),
            last_seen: None,
            pursuit_target: None,
            has_line_of_sight: false,
            stuck: StuckTracker::anchored_at(position),
            attack_cooldown: Countdown::default(),
        }
    }

    fn is_aggroed(&self) -> bool {
        self.aggro == AggroState::Aggroed
    }
}

#[derive(Debug, Clone)]
struct Npc {
    body: AgentBody,
    kind: String,
    talk_range: f32,
    in_talk_range: bool,
}

impl Npc {
    fn from_placement(id: EntityId, placement: &NpcPlacement, tile_size: f32) -> Self {
        Self {
            body: AgentBody::new(id, AgentRole::Npc, placement.position, 1.0),
            kind: placement.kind.clone(),
            talk_range: NPC_TALK_RANGE_TILES * tile_size,
            in_talk_range: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Equipment {
    weapon: Option<ItemDef>,
    armor: Option<ItemDef>,
}

impl Equipment {
    fn damage_bonus(&self) -> i32 {
        self.weapon.as_ref().map_or(0, |item| item.damage)
    }

    fn defense_bonus(&self) -> i32 {
        self.armor.as_ref().map_or(0, |item| item.defense)
    }
}

#[derive(Debug, Clone)]
struct Inventory {
    items: Vec<ItemDef>,
    capacity: usize,
}

impl Inventory {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    fn has_room(&self) -> bool {
        self.items.len() < self.capacity
    }

    fn push(&mut self, item: ItemDef) -> bool {
        if !self.has_room() {
            return false;
        }
        self.items.push(item);
        true
    }

    fn take_first(&mut self, predicate: impl Fn(&ItemDef) -> bool) -> Option<ItemDef> {
        let index = self.items.iter().position(predicate)?;
        Some(self.items.remove(index))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum AbilityKind {
    Basic,
    Spin,
    Dash,
    Wave,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct AbilitySpec {
    mana_cost: f32,
    cooldown_seconds: f32,
    damage_multiplier: f32,
}

#[derive(Debug, Clone, Copy, Default)]
struct AbilityCooldowns {
    basic: Countdown,
    spin: Countdown,
    dash: Countdown,
    wave: Countdown,
}

impl AbilityCooldowns {
    fn get(&self, ability: AbilityKind) -> Countdown {
        match ability {
            AbilityKind::Basic => self.basic,
            AbilityKind::Spin => self.spin,
            AbilityKind::Dash => self.dash,
            AbilityKind::Wave => self.wave,
        }
    }

    fn get_mut(&mut self, ability: AbilityKind) -> &mut Countdown {
        match ability {
            AbilityKind::Basic => &mut self.basic,
            AbilityKind::Spin => &mut self.spin,
            AbilityKind::Dash => &mut self.dash,
            AbilityKind::Wave => &mut self.wave,
        }
    }

    fn tick(&mut self, dt_seconds: f32) {
        self.basic.tick(dt_seconds);
        self.spin.tick(dt_seconds);
        self.dash.tick(dt_seconds);
        self.wave.tick(dt_seconds);
    }
}

#[derive(Debug, Clone)]
struct DashState {
    remaining: Countdown,
    direction: Vec2,
    struck: HashSet<EntityId>,
}

#[derive(Debug, Clone)]
struct Player {
    body: AgentBody,
    speed: f32,
    strength: i32,
    base_defense: i32,
    level: u32,
    experience: u64,
    exp_to_next: u64,
    mana: ResourcePool,
    mana_regen_per_second: f32,
    cooldowns: AbilityCooldowns,
    equipment: Equipment,
    inventory: Inventory,
    dash: Option<DashState>,
    respawn: Countdown,
}

impl Player {
    fn from_def(id: EntityId, def: &PlayerDef, position: Vec2) -> Self {
        Self {
            body: AgentBody::new(id, AgentRole::Player, position, def.max_health),
            speed: def.speed,
            strength: def.strength,
            base_defense: def.defense,
            level: 1,
            experience: 0,
            exp_to_next: PLAYER_FIRST_LEVEL_EXP,
            mana: ResourcePool::full(def.max_mana),
            mana_regen_per_second: def.mana_regen,
            cooldowns: AbilityCooldowns::default(),
            equipment: Equipment::default(),
            inventory: Inventory::with_capacity(INVENTORY_CAPACITY),
            dash: None,
            respawn: Countdown::default(),
        }
    }

    fn attack_damage(&self) -> i32 {
        self.strength + self.equipment.damage_bonus()
    }

    fn defense(&self) -> i32 {
        self.base_defense + self.equipment.defense_bonus()
    }
}

#[derive(Debug, Clone)]
struct ItemDrop {
    id: EntityId,
    item: ItemDef,
    center: Vec2,
}

/// A travelling hitbox. Each hostile is struck at most once per projectile.
#[derive(Debug, Clone)]
struct Projectile {
    id: EntityId,
    center: Vec2,
    velocity: Vec2,
    half_extent: f32,
    lifetime: Countdown,
    damage_multiplier: f32,
    struck: HashSet<EntityId>,
}

impl Projectile {
    fn is_expired(&self) -> bool {
        self.lifetime.is_ready()
    }
}

/// Per-tick intent derived from the input snapshot. Potion and equip actions are edge
/// triggered.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct PlayerIntent {
    movement: Vec2,
    basic_attack: bool,
    spin_attack: bool,
    dash: bool,
    wave_attack: bool,
    interact: bool,
    use_potion: bool,
    equip_next: bool,
}

impl PlayerIntent {
    fn from_input(input: &InputSnapshot, previous: &InputSnapshot) -> Self {
        let axis = |negative: InputAction, positive: InputAction| -> f32 {
            let mut value = 0.0;
            if input.is_down(negative) {
                value -= 1.0;
            }
            if input.is_down(positive) {
                value += 1.0;
            }
            value
        };
        let mut movement = Vec2::new(
            axis(InputAction::MoveLeft, InputAction::MoveRight),
            axis(InputAction::MoveUp, InputAction::MoveDown),
        );
        if movement.x != 0.0 && movement.y != 0.0 {
            movement = movement * FRAC_1_SQRT_2;
        }
        let pressed = |action: InputAction| input.is_down(action) && !previous.is_down(action);

        Self {
            movement,
            basic_attack: input.is_down(InputAction::BasicAttack),
            spin_attack: input.is_down(InputAction::SpinAttack),
            dash: input.is_down(InputAction::Dash),
            wave_attack: input.is_down(InputAction::WaveAttack),
            interact: input.is_down(InputAction::Interact),
            use_potion: pressed(InputAction::UsePotion),
            equip_next: pressed(InputAction::EquipNext),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum GameplayEvent {
    HostileSpawned {
        hostile: EntityId,
        archetype: DefId,
    },
    HostileDamaged {
        hostile: EntityId,
        amount: i32,
        class: DamageClass,
    },
    HostileKilled {
        hostile: EntityId,
        exp: u32,
    },
    PlayerDamaged {
        attacker: EntityId,
        amount: i32,
    },
    PlayerDied,
    PlayerRespawned,
    PlayerLeveledUp {
        level: u32,
    },
    AbilityCast {
        ability: AbilityKind,
    },
    ItemDropped {
        drop: EntityId,
        item: DefId,
    },
    ItemPickedUp {
        item: DefId,
    },
    PotionUsed {
        item: DefId,
    },
    ItemEquipped {
        item: DefId,
    },
    TransitionStarted {
        target_map: String,
    },
    TransitionCompleted {
        map: String,
    },
    AgentRecovered {
        agent: EntityId,
        used_safe_respawn: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GameplayEventKind {
    HostileSpawned,
    HostileDamaged,
    HostileKilled,
    PlayerDamaged,
    PlayerDied,
    PlayerRespawned,
    PlayerLeveledUp,
    AbilityCast,
    ItemDropped,
    ItemPickedUp,
    PotionUsed,
    ItemEquipped,
    TransitionStarted,
    TransitionCompleted,
    AgentRecovered,
}

impl GameplayEvent {
    fn kind(&self) -> GameplayEventKind {
        match self {
            Self::HostileSpawned { .. } => GameplayEventKind::HostileSpawned,
            Self::HostileDamaged { .. } => GameplayEventKind::HostileDamaged,
            Self::HostileKilled { .. } => GameplayEventKind::HostileKilled,
            Self::PlayerDamaged { .. } => GameplayEventKind::PlayerDamaged,
            Self::PlayerDied => GameplayEventKind::PlayerDied,
            Self::PlayerRespawned => GameplayEventKind::PlayerRespawned,
            Self::PlayerLeveledUp { .. } => GameplayEventKind::PlayerLeveledUp,
            Self::AbilityCast { .. } => GameplayEventKind::AbilityCast,
            Self::ItemDropped { .. } => GameplayEventKind::ItemDropped,
            Self::ItemPickedUp { .. } => GameplayEventKind::ItemPickedUp,
            Self::PotionUsed { .. } => GameplayEventKind::PotionUsed,
            Self::ItemEquipped { .. } => GameplayEventKind::ItemEquipped,
            Self::TransitionStarted { .. } => GameplayEventKind::TransitionStarted,
            Self::TransitionCompleted { .. } => GameplayEventKind::TransitionCompleted,
            Self::AgentRecovered { .. } => GameplayEventKind::AgentRecovered,
        }
    }
}

/// Running totals over the whole session. Serialized into the scene snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
struct GameplayStats {
    hostiles_spawned: u64,
    hostiles_killed: u64,
    damage_dealt: u64,
    damage_taken: u64,
    player_deaths: u64,
    level_ups: u64,
    abilities_cast: u64,
    items_picked_up: u64,
    transitions: u64,
    recoveries: u64,
}

impl GameplayStats {
    fn record(&mut self, event: &GameplayEvent) {
        match event {
            GameplayEvent::HostileSpawned { .. } => {
                self.hostiles_spawned = self.hostiles_spawned.saturating_add(1)
            }
            GameplayEvent::HostileDamaged { amount, .. } => {
                self.damage_dealt = self.damage_dealt.saturating_add(*amount as u64)
            }
            GameplayEvent::HostileKilled { .. } => {
                self.hostiles_killed = self.hostiles_killed.saturating_add(1)
            }
            GameplayEvent::PlayerDamaged { amount, .. } => {
                self.damage_taken = self.damage_taken.saturating_add(*amount as u64)
            }
            GameplayEvent::PlayerDied => self.player_deaths = self.player_deaths.saturating_add(1),
            GameplayEvent::PlayerLeveledUp { .. } => {
                self.level_ups = self.level_ups.saturating_add(1)
            }
            GameplayEvent::AbilityCast { .. } => {
                self.abilities_cast = self.abilities_cast.saturating_add(1)
            }
            GameplayEvent::ItemPickedUp { .. } => {
                self.items_picked_up = self.items_picked_up.saturating_add(1)
            }
            GameplayEvent::TransitionCompleted { .. } => {
                self.transitions = self.transitions.saturating_add(1)
            }
            GameplayEvent::AgentRecovered { .. } => {
                self.recoveries = self.recoveries.saturating_add(1)
            }
            GameplayEvent::PlayerRespawned
            | GameplayEvent::ItemDropped { .. }
            | GameplayEvent::PotionUsed { .. }
            | GameplayEvent::ItemEquipped { .. }
            | GameplayEvent::TransitionStarted { .. } => {}
        }
    }
}

#[derive(Debug, Default)]
struct GameplayEventBus {
    current_tick_events: Vec<GameplayEvent>,
    last_tick_events: Vec<GameplayEvent>,
    stats: GameplayStats,
}

impl GameplayEventBus {
    fn emit(&mut self, event: GameplayEvent) {
        self.current_tick_events.push(event);
    }

    fn iter_emitted_so_far(&self) -> impl Iterator<Item = &GameplayEvent> {
        self.current_tick_events.iter()
    }

    fn finish_tick_rollover(&mut self) {
        for event in &self.current_tick_events {
            self.stats.record(event);
        }
        self.last_tick_events = std::mem::take(&mut self.current_tick_events);
    }

    fn last_tick_events(&self) -> &[GameplayEvent] {
        &self.last_tick_events
    }

    fn last_tick_count(&self, kind: GameplayEventKind) -> usize {
        self.last_tick_events
            .iter()
            .filter(|event| event.kind() == kind)
            .count()
    }

    fn stats(&self) -> GameplayStats {
        self.stats
    }
}
