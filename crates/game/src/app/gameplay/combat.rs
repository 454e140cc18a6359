#[derive(Debug, Clone, Copy, PartialEq)]
struct Hit {
    base_damage: i32,
    knockback: Option<Vec2>,
    class: DamageClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HitOutcome {
    damage: i32,
    killed: bool,
}

fn mitigated_damage(base_damage: i32, defense: i32) -> i32 {
    (base_damage - defense).max(1)
}

/// Applies one hit to `defender`. `None` when the hit is ignored because the defender is dead
/// or still invulnerable from a previous hit.
fn resolve_attack(
    defender: &mut AgentBody,
    defense: i32,
    hit: Hit,
    rng: &mut GameRng,
) -> Option<HitOutcome> {
    if !defender.alive || defender.invulnerability.is_active() {
        return None;
    }

    let damage = mitigated_damage(hit.base_damage, defense);
    defender.health.damage(damage as f32);

    let jitter = rng.gen_range(-DAMAGE_NUMBER_JITTER_PX..=DAMAGE_NUMBER_JITTER_PX) as f32;
    defender.push_damage_number(DamageNumber {
        value: damage,
        origin: defender.position + Vec2::new(jitter, -DAMAGE_NUMBER_RISE_PX),
        remaining_seconds: DAMAGE_NUMBER_LIFETIME_SECONDS,
        class: hit.class,
    });

    if let Some(direction) = hit.knockback.map(Vec2::normalized_or_zero) {
        if !direction.is_zero() {
            defender.knockback = Knockback {
                remaining_px: KNOCKBACK_DISTANCE_PX,
                direction,
            };
        }
    }
    defender.invulnerability.start(HIT_INVULNERABILITY_SECONDS);

    let killed = defender.health.is_empty();
    if killed {
        defender.alive = false;
        defender.knockback = Knockback::default();
        defender.moving = false;
    }
    Some(HitOutcome { damage, killed })
}

/// Kill reward, scaled by the hostile's level. Level 1 pays the base value.
fn scaled_exp(exp_value: u32, hostile_level: u32) -> u32 {
    let bonus = 1.0 + (hostile_level.max(1) - 1) as f32 * EXP_BONUS_PER_LEVEL;
    (exp_value as f32 * bonus) as u32
}

fn hostile_damage_roll(strength: i32, rng: &mut GameRng) -> i32 {
    let low = (strength as f32 * HOSTILE_DAMAGE_MIN_FACTOR) as i32;
    let high = ((strength as f32 * HOSTILE_DAMAGE_MAX_FACTOR) as i32).max(low);
    rng.gen_range(low..=high)
}

impl Player {
    /// Adds experience and applies every level-up it pays for. Returns the levels gained.
    fn grant_experience(&mut self, amount: u32) -> u32 {
        self.experience = self.experience.saturating_add(u64::from(amount));
        let mut gained = 0;
        while self.experience >= self.exp_to_next {
            self.experience -= self.exp_to_next;
            self.level += 1;
            self.exp_to_next = ((self.exp_to_next as f32 * PLAYER_EXP_GROWTH).round() as u64)
                .max(self.exp_to_next + 1);
            self.body
                .health
                .set_max(self.body.health.max() + LEVEL_UP_HEALTH_BONUS);
            self.body.health.refill();
            self.mana.set_max(self.mana.max() + LEVEL_UP_MANA_BONUS);
            self.mana.refill();
            self.strength += LEVEL_UP_STRENGTH_BONUS;
            gained += 1;
            info!(
                level = self.level,
                exp_to_next = self.exp_to_next,
                "player_level_up"
            );
        }
        gained
    }
}

/// Player-side hit on a hostile. Handles the kill reward and reports everything on the bus.
fn player_hits_hostile(
    player: &mut Player,
    hostile: &mut Hostile,
    hit: Hit,
    rng: &mut GameRng,
    events: &mut GameplayEventBus,
) -> Option<HitOutcome> {
    let outcome = resolve_attack(&mut hostile.body, hostile.defense, hit, rng)?;
    events.emit(GameplayEvent::HostileDamaged {
        hostile: hostile.body.id,
        amount: outcome.damage,
        class: hit.class,
    });
    if outcome.killed {
        let exp = scaled_exp(hostile.exp_value, hostile.level);
        info!(
            hostile = hostile.body.id.0,
            kind = %hostile.kind,
            exp,
            "hostile_killed"
        );
        events.emit(GameplayEvent::HostileKilled {
            hostile: hostile.body.id,
            exp,
        });
        let gained = player.grant_experience(exp);
        for _ in 0..gained {
            events.emit(GameplayEvent::PlayerLeveledUp {
                level: player.level,
            });
        }
    }
    Some(outcome)
}

/// A hostile striking the player. The knockback pushes the player away from the hostile.
fn hostile_attacks_player(
    hostile: &mut Hostile,
    player: &mut Player,
    rng: &mut GameRng,
    events: &mut GameplayEventBus,
) -> Option<HitOutcome> {
    hostile.attack_cooldown.start(HOSTILE_ATTACK_COOLDOWN_SECONDS);
    hostile.body.attack_animation.start(HOSTILE_ATTACK_ANIMATION_SECONDS);

    let knockback = direction_or(
        hostile.body.position,
        player.body.position,
        Vec2::new(1.0, 0.0),
    );
    let hit = Hit {
        base_damage: hostile_damage_roll(hostile.strength, rng),
        knockback: Some(knockback),
        class: DamageClass::Normal,
    };
    let defense = player.defense();
    let outcome = resolve_attack(&mut player.body, defense, hit, rng)?;
    events.emit(GameplayEvent::PlayerDamaged {
        attacker: hostile.body.id,
        amount: outcome.damage,
    });
    if outcome.killed {
        player.dash = None;
        player.respawn.start(PLAYER_RESPAWN_SECONDS);
        info!(killer = hostile.body.id.0, kind = %hostile.kind, "player_died");
        events.emit(GameplayEvent::PlayerDied);
    }
    Some(outcome)
}

fn hostile_can_attack(hostile: &Hostile, player: &Player) -> bool {
    hostile.body.alive
        && player.body.alive
        && !hostile.body.knockback.is_active()
        && hostile.is_aggroed()
        && hostile.has_line_of_sight
        && hostile.attack_cooldown.is_ready()
        && hostile.body.position.distance(player.body.position) <= hostile.attack_range
}
