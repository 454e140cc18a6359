impl AbilityKind {
    const ALL: [AbilityKind; 4] = [Self::Basic, Self::Spin, Self::Dash, Self::Wave];

    fn spec(self) -> AbilitySpec {
        let (mana_cost, cooldown_seconds, damage_multiplier) = match self {
            Self::Basic => (0.0, 0.4, 1.0),
            Self::Spin => (20.0, 1.5, 1.5),
            Self::Dash => (15.0, 2.0, 2.0),
            Self::Wave => (30.0, 3.0, 1.8),
        };
        AbilitySpec {
            mana_cost,
            cooldown_seconds,
            damage_multiplier,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Spin => "spin",
            Self::Dash => "dash",
            Self::Wave => "wave",
        }
    }

    fn requested(self, intent: &PlayerIntent) -> bool {
        match self {
            Self::Basic => intent.basic_attack,
            Self::Spin => intent.spin_attack,
            Self::Dash => intent.dash,
            Self::Wave => intent.wave_attack,
        }
    }
}

/// Pays for and arms `ability`. A cast that fails for cooldown or mana changes nothing.
fn try_cast(player: &mut Player, ability: AbilityKind) -> bool {
    if !player.body.alive || player.cooldowns.get(ability).is_active() {
        return false;
    }
    if ability == AbilityKind::Dash && player.dash.is_some() {
        return false;
    }
    let spec = ability.spec();
    if !player.mana.spend(spec.mana_cost) {
        return false;
    }
    player.cooldowns.get_mut(ability).start(spec.cooldown_seconds);
    true
}

fn player_hit_on(player: &Player, hostile: &Hostile, multiplier: f32, class: DamageClass) -> Hit {
    Hit {
        base_damage: scaled_damage(player.attack_damage(), multiplier),
        knockback: Some(direction_or(
            player.body.center(),
            hostile.body.center(),
            player.body.facing.vector(),
        )),
        class,
    }
}

/// Melee swing into a square in front of the player. Critical rolls once per swing.
fn perform_basic_attack(
    player: &mut Player,
    hostiles: &mut [Hostile],
    rng: &mut GameRng,
    events: &mut GameplayEventBus,
) -> usize {
    let hitbox_half = BASIC_ATTACK_HITBOX_PX * 0.5;
    let hitbox_center =
        player.body.center() + player.body.facing.vector() * (AGENT_HALF_PX + hitbox_half);
    let (multiplier, class) = if rng.gen_bool(BASIC_ATTACK_CRIT_CHANCE) {
        (BASIC_ATTACK_CRIT_MULTIPLIER, DamageClass::Critical)
    } else {
        (AbilityKind::Basic.spec().damage_multiplier, DamageClass::Normal)
    };
    player.body.attack_animation.start(PLAYER_ATTACK_ANIMATION_SECONDS);

    let mut struck = 0;
    for hostile in hostiles.iter_mut().filter(|hostile| hostile.body.alive) {
        let center = hostile.body.center();
        if !boxes_overlap(hitbox_center, hitbox_half, center, AGENT_HALF_PX)
            || player.body.center().distance(center) > BASIC_ATTACK_RANGE_PX
        {
            continue;
        }
        let hit = player_hit_on(player, hostile, multiplier, class);
        if player_hits_hostile(player, hostile, hit, rng, events).is_some() {
            struck += 1;
        }
    }
    struck
}

fn perform_spin_attack(
    player: &mut Player,
    hostiles: &mut [Hostile],
    rng: &mut GameRng,
    events: &mut GameplayEventBus,
) -> usize {
    player.body.attack_animation.start(PLAYER_ATTACK_ANIMATION_SECONDS);
    let multiplier = AbilityKind::Spin.spec().damage_multiplier;
    let mut struck = 0;
    for hostile in hostiles.iter_mut().filter(|hostile| hostile.body.alive) {
        if player.body.center().distance(hostile.body.center()) > SPIN_ATTACK_RADIUS_PX {
            continue;
        }
        let hit = player_hit_on(player, hostile, multiplier, DamageClass::Special);
        if player_hits_hostile(player, hostile, hit, rng, events).is_some() {
            struck += 1;
        }
    }
    struck
}

fn begin_dash(player: &mut Player, movement: Vec2) {
    let direction = if movement.is_zero() {
        player.body.facing.vector()
    } else {
        movement.normalized_or_zero()
    };
    player.body.knockback = Knockback::default();
    player.dash = Some(DashState {
        remaining: Countdown::started(DASH_DURATION_SECONDS),
        direction,
        struck: HashSet::new(),
    });
}

/// Contact damage while dashing. Each hostile is struck at most once per dash.
fn apply_dash_contact(
    player: &mut Player,
    hostiles: &mut [Hostile],
    rng: &mut GameRng,
    events: &mut GameplayEventBus,
) {
    let Some(mut dash) = player.dash.take() else {
        return;
    };
    let multiplier = AbilityKind::Dash.spec().damage_multiplier;
    for hostile in hostiles.iter_mut().filter(|hostile| hostile.body.alive) {
        if dash.struck.contains(&hostile.body.id)
            || !boxes_overlap(
                player.body.center(),
                AGENT_HALF_PX,
                hostile.body.center(),
                AGENT_HALF_PX,
            )
        {
            continue;
        }
        let hit = player_hit_on(player, hostile, multiplier, DamageClass::Special);
        if player_hits_hostile(player, hostile, hit, rng, events).is_some() {
            dash.struck.insert(hostile.body.id);
        }
    }
    player.dash = Some(dash);
}

fn launch_wave(player: &mut Player, id: EntityId) -> Projectile {
    player.body.attack_animation.start(PLAYER_ATTACK_ANIMATION_SECONDS);
    let direction = player.body.facing.vector();
    Projectile {
        id,
        center: player.body.center() + direction * AGENT_HALF_PX,
        velocity: direction * WAVE_SPEED_PX_PER_SECOND,
        half_extent: WAVE_HITBOX_PX * 0.5,
        lifetime: Countdown::started(WAVE_LIFETIME_SECONDS),
        damage_multiplier: AbilityKind::Wave.spec().damage_multiplier,
        struck: HashSet::new(),
    }
}

/// Advances a projectile and strikes every hostile it newly overlaps. Leaving the map ends it.
fn advance_projectile(
    projectile: &mut Projectile,
    player: &mut Player,
    hostiles: &mut [Hostile],
    map: &TileMap,
    dt_seconds: f32,
    rng: &mut GameRng,
    events: &mut GameplayEventBus,
) {
    if projectile.is_expired() {
        return;
    }
    projectile.center += projectile.velocity * dt_seconds;
    projectile.lifetime.tick(dt_seconds);
    if !map.contains_point(projectile.center) {
        projectile.lifetime.clear();
        return;
    }
    for hostile in hostiles.iter_mut().filter(|hostile| hostile.body.alive) {
        if projectile.struck.contains(&hostile.body.id)
            || !boxes_overlap(
                projectile.center,
                projectile.half_extent,
                hostile.body.center(),
                AGENT_HALF_PX,
            )
        {
            continue;
        }
        let hit = player_hit_on(
            player,
            hostile,
            projectile.damage_multiplier,
            DamageClass::Special,
        );
        if player_hits_hostile(player, hostile, hit, rng, events).is_some() {
            projectile.struck.insert(hostile.body.id);
        }
    }
}
