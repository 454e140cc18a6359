#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GameplaySystemId {
    Timers,
    Movement,
    Perception,
    Combat,
    Pickups,
    Spawning,
    Cleanup,
    Recovery,
    Transition,
}

impl GameplaySystemId {
    #[cfg(test)]
    fn name(self) -> &'static str {
        match self {
            Self::Timers => "Timers",
            Self::Movement => "Movement",
            Self::Perception => "Perception",
            Self::Combat => "Combat",
            Self::Pickups => "Pickups",
            Self::Spawning => "Spawning",
            Self::Cleanup => "Cleanup",
            Self::Recovery => "Recovery",
            Self::Transition => "Transition",
        }
    }

    /// While the screen is fading only display timers and the transition itself advance.
    fn runs_during_transition(self) -> bool {
        matches!(self, Self::Timers | Self::Transition)
    }
}

const GAMEPLAY_SYSTEM_ORDER: [GameplaySystemId; 9] = [
    GameplaySystemId::Timers,
    GameplaySystemId::Movement,
    GameplaySystemId::Perception,
    GameplaySystemId::Combat,
    GameplaySystemId::Pickups,
    GameplaySystemId::Spawning,
    GameplaySystemId::Cleanup,
    GameplaySystemId::Recovery,
    GameplaySystemId::Transition,
];

#[derive(Default)]
struct GameplaySystemsHost {
    last_tick_order: Vec<GameplaySystemId>,
}

impl GameplaySystemsHost {
    fn run_once_per_tick(
        &mut self,
        world: &mut GameplayWorld,
        intent: &PlayerIntent,
        dt_seconds: f32,
    ) {
        self.last_tick_order.clear();
        let transitioning = world.transition.is_transitioning();
        for system_id in GAMEPLAY_SYSTEM_ORDER {
            if transitioning && !system_id.runs_during_transition() {
                continue;
            }
            self.last_tick_order.push(system_id);
            Self::run_system(system_id, world, intent, dt_seconds, transitioning);
        }
        world.events.finish_tick_rollover();
    }

    fn run_system(
        system_id: GameplaySystemId,
        world: &mut GameplayWorld,
        intent: &PlayerIntent,
        dt_seconds: f32,
        transitioning: bool,
    ) {
        match system_id {
            GameplaySystemId::Timers => run_timers(world, dt_seconds, transitioning),
            GameplaySystemId::Movement => run_movement(world, intent, dt_seconds),
            GameplaySystemId::Perception => run_perception(world, dt_seconds),
            GameplaySystemId::Combat => run_combat(world, intent, dt_seconds),
            GameplaySystemId::Pickups => run_pickups(world, intent),
            GameplaySystemId::Spawning => run_spawning(world, dt_seconds),
            GameplaySystemId::Cleanup => run_cleanup(world),
            GameplaySystemId::Recovery => run_recovery(world),
            GameplaySystemId::Transition => run_transition(world, intent, dt_seconds),
        }
    }
}

fn run_timers(world: &mut GameplayWorld, dt_seconds: f32, transitioning: bool) {
    world.player.body.tick_animation_timers(dt_seconds);
    for hostile in &mut world.hostiles {
        hostile.body.tick_animation_timers(dt_seconds);
    }
    if transitioning {
        return;
    }

    let player = &mut world.player;
    player.cooldowns.tick(dt_seconds);
    if player.body.alive {
        player.mana.restore(player.mana_regen_per_second * dt_seconds);
    } else {
        player.respawn.tick(dt_seconds);
    }
    for hostile in &mut world.hostiles {
        hostile.attack_cooldown.tick(dt_seconds);
    }
}

/// An attack animation pins its agent in place. Knockback and dashes still move it.
fn run_movement(world: &mut GameplayWorld, intent: &PlayerIntent, dt_seconds: f32) {
    let map = world.atlas.active_map();
    let player = &mut world.player;
    player.body.moving = false;
    if player.body.alive {
        if let Some(dash) = player.dash.as_mut() {
            let delta = dash.direction * (DASH_SPEED_PX_PER_SECOND * dt_seconds);
            dash.remaining.tick(dt_seconds);
            player.body.moving = try_move(&mut player.body, map, delta);
        } else if player.body.knockback.is_active() {
            step_knockback(&mut player.body, map, dt_seconds);
        } else if !intent.movement.is_zero() && player.body.attack_animation.is_ready() {
            if let Some(facing) = Facing::from_vector(intent.movement) {
                player.body.facing = facing;
            }
            let speed = player.speed * terrain_speed_multiplier(map, player.body.center());
            let delta = intent.movement * (speed * dt_seconds);
            player.body.moving = try_move(&mut player.body, map, delta);
        }
    }

    let player_position = world.player.body.position;
    for hostile in world.hostiles.iter_mut().filter(|hostile| hostile.body.alive) {
        if hostile.body.knockback.is_active() {
            hostile.body.moving = false;
            step_knockback(&mut hostile.body, map, dt_seconds);
        } else if hostile.body.attack_animation.is_active() {
            hostile.body.moving = false;
        } else {
            step_hostile_pursuit(hostile, player_position, map, dt_seconds);
        }
    }
}

fn run_perception(world: &mut GameplayWorld, dt_seconds: f32) {
    let map = world.atlas.active_map();
    let player_position = world
        .player
        .body
        .alive
        .then_some(world.player.body.position);
    for hostile in world
        .hostiles
        .iter_mut()
        .filter(|hostile| hostile.body.alive && !hostile.body.knockback.is_active())
    {
        update_aggro(hostile, player_position, map, dt_seconds);
    }
    for npc in &mut world.npcs {
        update_talk_range(npc, player_position);
    }
}

fn run_combat(world: &mut GameplayWorld, intent: &PlayerIntent, dt_seconds: f32) {
    let map = world.atlas.active_map();

    if world.player.body.alive {
        for ability in AbilityKind::ALL {
            if !ability.requested(intent) || !try_cast(&mut world.player, ability) {
                continue;
            }
            debug!(
                ability = ability.name(),
                mana = world.player.mana.current(),
                "ability_cast"
            );
            world.events.emit(GameplayEvent::AbilityCast { ability });
            match ability {
                AbilityKind::Basic => {
                    perform_basic_attack(
                        &mut world.player,
                        &mut world.hostiles,
                        &mut world.rng,
                        &mut world.events,
                    );
                }
                AbilityKind::Spin => {
                    perform_spin_attack(
                        &mut world.player,
                        &mut world.hostiles,
                        &mut world.rng,
                        &mut world.events,
                    );
                }
                AbilityKind::Dash => begin_dash(&mut world.player, intent.movement),
                AbilityKind::Wave => {
                    let projectile = launch_wave(&mut world.player, world.ids.allocate());
                    world.projectiles.push(projectile);
                }
            }
        }
        apply_dash_contact(
            &mut world.player,
            &mut world.hostiles,
            &mut world.rng,
            &mut world.events,
        );
    }

    for projectile in &mut world.projectiles {
        advance_projectile(
            projectile,
            &mut world.player,
            &mut world.hostiles,
            map,
            dt_seconds,
            &mut world.rng,
            &mut world.events,
        );
    }

    for hostile in &mut world.hostiles {
        if hostile_can_attack(hostile, &world.player) {
            hostile_attacks_player(hostile, &mut world.player, &mut world.rng, &mut world.events);
        }
    }

    let killed: Vec<(Vec2, f32)> = world
        .events
        .iter_emitted_so_far()
        .filter_map(|event| match event {
            GameplayEvent::HostileKilled { hostile, .. } => Some(*hostile),
            _ => None,
        })
        .filter_map(|id| world.hostiles.iter().find(|hostile| hostile.body.id == id))
        .map(|hostile| (hostile.body.center(), hostile.drop_chance))
        .collect();
    for (center, drop_chance) in killed {
        let Some(item) = roll_drop(&world.defs, drop_chance, &mut world.rng) else {
            continue;
        };
        let id = world.ids.allocate();
        debug!(drop = id.0, item = %item.def_name, "item_dropped");
        world.events.emit(GameplayEvent::ItemDropped { drop: id, item: item.id });
        world.drops.push(ItemDrop { id, item, center });
    }
}

fn run_pickups(world: &mut GameplayWorld, intent: &PlayerIntent) {
    let player = &mut world.player;
    if !player.body.alive {
        return;
    }

    let center = player.body.center();
    let events = &mut world.events;
    world.drops.retain(|drop| {
        if drop.center.distance(center) > PICKUP_RADIUS_PX || !player.inventory.has_room() {
            return true;
        }
        events.emit(GameplayEvent::ItemPickedUp { item: drop.item.id });
        debug!(item = %drop.item.def_name, "item_picked_up");
        !player.inventory.push(drop.item.clone())
    });

    if intent.use_potion {
        use_potion(player, events);
    }
    if intent.equip_next {
        equip_next(player, events);
    }
}

/// Drinks the first potion that restores something currently missing.
fn use_potion(player: &mut Player, events: &mut GameplayEventBus) -> bool {
    let needs_health = player.body.health.current() < player.body.health.max();
    let needs_mana = player.mana.current() < player.mana.max();
    let Some(potion) = player.inventory.take_first(|item| {
        item.kind == ItemKind::Potion
            && ((needs_health && item.heal > 0.0) || (needs_mana && item.mana > 0.0))
    }) else {
        return false;
    };
    player.body.health.restore(potion.heal);
    player.mana.restore(potion.mana);
    info!(
        item = %potion.def_name,
        health = player.body.health.current(),
        mana = player.mana.current(),
        "potion_used"
    );
    events.emit(GameplayEvent::PotionUsed { item: potion.id });
    true
}

/// Equips the first weapon or armor in the bag; the replaced piece goes back into the bag.
fn equip_next(player: &mut Player, events: &mut GameplayEventBus) -> bool {
    let Some(item) = player
        .inventory
        .take_first(|item| matches!(item.kind, ItemKind::Weapon | ItemKind::Armor))
    else {
        return false;
    };
    let slot = match item.kind {
        ItemKind::Weapon => &mut player.equipment.weapon,
        _ => &mut player.equipment.armor,
    };
    let item_id = item.id;
    info!(item = %item.def_name, "item_equipped");
    if let Some(previous) = slot.replace(item) {
        player.inventory.push(previous);
    }
    events.emit(GameplayEvent::ItemEquipped { item: item_id });
    true
}

fn run_spawning(world: &mut GameplayWorld, dt_seconds: f32) {
    let live_hostiles = world
        .hostiles
        .iter()
        .filter(|hostile| hostile.body.alive)
        .count();
    let map = world.atlas.active_map();
    let Some(position) = world.spawner.update(
        dt_seconds,
        live_hostiles,
        world.player.body.position,
        map,
        &mut world.rng,
    ) else {
        return;
    };
    let id = world.ids.allocate();
    let Some(hostile) = spawn_hostile(
        &world.defs,
        id,
        position,
        world.atlas.hostile_level(),
        &mut world.rng,
    ) else {
        return;
    };
    info!(
        hostile = id.0,
        kind = %hostile.kind,
        level = hostile.level,
        x = position.x,
        y = position.y,
        "hostile_spawned"
    );
    world.events.emit(GameplayEvent::HostileSpawned {
        hostile: id,
        archetype: hostile.archetype,
    });
    world.hostiles.push(hostile);
}

fn run_cleanup(world: &mut GameplayWorld) {
    let before = world.hostiles.len();
    world.hostiles.retain(|hostile| hostile.body.alive);
    let removed = before - world.hostiles.len();
    if removed > 0 {
        debug!(removed, remaining = world.hostiles.len(), "dead_hostiles_removed");
    }
    world.projectiles.retain(|projectile| !projectile.is_expired());
    if world
        .player
        .dash
        .as_ref()
        .is_some_and(|dash| dash.remaining.is_ready())
    {
        world.player.dash = None;
    }
}

fn run_recovery(world: &mut GameplayWorld) {
    let map = world.atlas.active_map();
    let safe_respawn = world.atlas.safe_respawn();

    let player = &mut world.player;
    if !player.body.alive && player.respawn.is_ready() {
        respawn_player(player, safe_respawn);
        world.events.emit(GameplayEvent::PlayerRespawned);
    }
    if player.body.alive {
        if let Some(used_safe_respawn) = recover_if_stranded(&mut player.body, map, safe_respawn) {
            world.events.emit(GameplayEvent::AgentRecovered {
                agent: player.body.id,
                used_safe_respawn,
            });
        }
    }
    for hostile in world.hostiles.iter_mut().filter(|hostile| hostile.body.alive) {
        if let Some(used_safe_respawn) = recover_if_stranded(&mut hostile.body, map, safe_respawn) {
            hostile.stuck = StuckTracker::anchored_at(hostile.body.position);
            world.events.emit(GameplayEvent::AgentRecovered {
                agent: hostile.body.id,
                used_safe_respawn,
            });
        }
    }
}

fn respawn_player(player: &mut Player, safe_respawn: Vec2) {
    player.body.alive = true;
    player.body.health.refill();
    player.mana.refill();
    player.body.invulnerability.clear();
    player.body.attack_animation.clear();
    player.body.place_at(safe_respawn);
    player.dash = None;
    info!(x = safe_respawn.x, y = safe_respawn.y, "player_respawned");
}

fn run_transition(world: &mut GameplayWorld, intent: &PlayerIntent, dt_seconds: f32) {
    if world.transition.is_transitioning() {
        if let Some(arrival) = world.transition.update(dt_seconds, &mut world.atlas) {
            apply_arrival(world, arrival);
        }
        return;
    }

    world.transition.update(dt_seconds, &mut world.atlas);
    if !world.player.body.alive || !intent.interact {
        return;
    }
    let Some(portal) =
        world
            .transition
            .check_portal(&world.atlas, world.player.body.center(), AGENT_HALF_PX)
    else {
        return;
    };
    let target_map = portal.target_map.to_string();
    if world.transition.start_transition(portal) {
        world.player.dash = None;
        world.player.body.knockback = Knockback::default();
        world.player.body.moving = false;
        world.events.emit(GameplayEvent::TransitionStarted { target_map });
    }
}

/// Places the player on the new map and drops everything that belonged to the old one.
fn apply_arrival(world: &mut GameplayWorld, arrival: TransitionArrival) {
    world.player.body.place_at(arrival.position);
    world.player.body.attack_animation.clear();
    world.player.dash = None;

    let cleared_hostiles = world.hostiles.len();
    world.hostiles.clear();
    world.projectiles.clear();
    world.drops.clear();
    world.spawner = HostileSpawner::new(world.atlas.spawner());
    world.npcs = build_npcs(&world.atlas, &mut world.ids);

    info!(
        map = %arrival.map,
        cleared_hostiles,
        npcs = world.npcs.len(),
        "map_arrival_applied"
    );
    world.events.emit(GameplayEvent::TransitionCompleted {
        map: arrival.map.to_string(),
    });
}
