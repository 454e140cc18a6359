fn agent_center(position: Vec2) -> Vec2 {
    position + Vec2::new(AGENT_HALF_PX, AGENT_HALF_PX)
}

fn boxes_overlap(a_center: Vec2, a_half: f32, b_center: Vec2, b_half: f32) -> bool {
    (a_center.x - b_center.x).abs() < a_half + b_half
        && (a_center.y - b_center.y).abs() < a_half + b_half
}

/// Unit vector from `from` to `to`, or `fallback` when the points coincide.
fn direction_or(from: Vec2, to: Vec2, fallback: Vec2) -> Vec2 {
    let direction = (to - from).normalized_or_zero();
    if direction.is_zero() {
        fallback
    } else {
        direction
    }
}

/// Truncates toward zero.
fn scaled_damage(base_damage: i32, multiplier: f32) -> i32 {
    (base_damage as f32 * multiplier) as i32
}

/// Weighted choice. Zero-weight entries are never picked; `None` if every weight is zero.
fn weighted_pick<'a, T>(
    entries: &'a [T],
    weight: impl Fn(&T) -> u32,
    rng: &mut GameRng,
) -> Option<&'a T> {
    let total: u64 = entries.iter().map(|entry| u64::from(weight(entry))).sum();
    if total == 0 {
        return None;
    }
    let mut roll = rng.gen_range(0..total);
    for entry in entries {
        let entry_weight = u64::from(weight(entry));
        if roll < entry_weight {
            return Some(entry);
        }
        roll -= entry_weight;
    }
    None
}
