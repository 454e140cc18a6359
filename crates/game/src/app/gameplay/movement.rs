/// Whether an agent anchored at `last_stable_position` may stand with its center on `center`.
/// Entry-restricted terrain is open only to an agent whose stable anchor is already in that tile.
fn can_occupy(map: &TileMap, last_stable_position: Vec2, center: Vec2) -> bool {
    let Some(info) = map.tile_info(center) else {
        return false;
    };
    if !info.props.walkable {
        return false;
    }
    if info.props.entry_restricted {
        return map.tile_coord(agent_center(last_stable_position)) == Some(info.coord);
    }
    true
}

fn terrain_speed_multiplier(map: &TileMap, center: Vec2) -> f32 {
    map.tile_info(center)
        .map_or(1.0, |info| info.props.speed_multiplier)
}

fn commit_position(body: &mut AgentBody, map: &TileMap, position: Vec2) {
    body.position = position;
    let stable = map
        .tile_info(body.center())
        .is_some_and(|info| info.props.walkable && !info.props.entry_restricted);
    if stable {
        body.last_stable_position = position;
    }
}

/// Resolves `delta` one axis at a time so a blocked axis still lets the agent slide along the
/// other.
fn try_move(body: &mut AgentBody, map: &TileMap, delta: Vec2) -> bool {
    let start = body.position;
    if delta.x != 0.0 {
        let candidate = Vec2::new(body.position.x + delta.x, body.position.y);
        if can_occupy(map, body.last_stable_position, agent_center(candidate)) {
            commit_position(body, map, candidate);
        }
    }
    if delta.y != 0.0 {
        let candidate = Vec2::new(body.position.x, body.position.y + delta.y);
        if can_occupy(map, body.last_stable_position, agent_center(candidate)) {
            commit_position(body, map, candidate);
        }
    }
    body.position != start
}

/// Consumes part of the pending knockback. A blocked step cancels the rest.
fn step_knockback(body: &mut AgentBody, map: &TileMap, dt_seconds: f32) {
    if !body.knockback.is_active() {
        return;
    }
    let step = body
        .knockback
        .remaining_px
        .min(KNOCKBACK_SPEED_PX_PER_SECOND * dt_seconds.max(0.0));
    let candidate = body.position + body.knockback.direction * step;
    if can_occupy(map, body.last_stable_position, agent_center(candidate)) {
        commit_position(body, map, candidate);
        body.knockback.remaining_px = (body.knockback.remaining_px - step).max(0.0);
    } else {
        body.knockback.remaining_px = 0.0;
    }
    if !body.knockback.is_active() {
        body.knockback = Knockback::default();
    }
}

fn pursuit_headings(heading: Vec2) -> [Vec2; 5] {
    [
        heading,
        Vec2::new(heading.x, 0.0),
        Vec2::new(0.0, heading.y),
        heading.perpendicular_right(),
        heading.perpendicular_left(),
    ]
}

fn unstick_headings(heading: Vec2) -> [Vec2; 5] {
    [
        heading.perpendicular_right(),
        heading.perpendicular_left(),
        -heading,
        Vec2::new(heading.x, 0.0),
        Vec2::new(0.0, heading.y),
    ]
}

/// Moves an aggroed hostile toward its pursuit target. Takes the first open heading from the
/// ordinary list, or from the unstick list once stationary past the threshold.
fn step_hostile_pursuit(
    hostile: &mut Hostile,
    player_position: Vec2,
    map: &TileMap,
    dt_seconds: f32,
) -> bool {
    hostile.body.moving = false;
    if !hostile.is_aggroed() {
        hostile.stuck = StuckTracker::anchored_at(hostile.body.position);
        return false;
    }
    let Some(target) = hostile.pursuit_target else {
        return false;
    };
    if hostile.body.position.distance(player_position) <= hostile.attack_range {
        return false;
    }
    let heading = (target - hostile.body.position).normalized_or_zero();
    if heading.is_zero() {
        return false;
    }

    let stuck = hostile.stuck.observe(hostile.body.position, dt_seconds);
    let headings = if stuck && hostile.stuck.cooldown.is_ready() {
        hostile.stuck.cooldown.start(STUCK_COOLDOWN_SECONDS);
        debug!(hostile = hostile.body.id.0, "hostile_unstick_attempt");
        unstick_headings(heading)
    } else {
        pursuit_headings(heading)
    };
    hostile.stuck.cooldown.tick(dt_seconds);

    let step = hostile.speed * dt_seconds * terrain_speed_multiplier(map, hostile.body.center());
    for candidate in headings {
        if candidate.is_zero() {
            continue;
        }
        let next = hostile.body.position + candidate * step;
        if can_occupy(map, hostile.body.last_stable_position, agent_center(next)) {
            commit_position(&mut hostile.body, map, next);
            hostile.body.moving = true;
            return true;
        }
    }
    false
}

/// Nearest walkable tile center among the agent's tile and its eight neighbours, as a top-left
/// position.
fn nearest_walkable_position(map: &TileMap, center: Vec2) -> Option<Vec2> {
    let size = map.tile_size();
    let origin = TileCoord::new(
        (center.x / size).floor() as i32,
        (center.y / size).floor() as i32,
    );
    let mut best: Option<(f32, Vec2)> = None;
    for dy in -1..=1 {
        for dx in -1..=1 {
            let coord = TileCoord::new(origin.x + dx, origin.y + dy);
            let walkable = map
                .terrain_at(coord)
                .is_some_and(|terrain| terrain.props().walkable);
            if !walkable {
                continue;
            }
            let tile_center = map.tile_center(coord);
            let distance_sq = tile_center.distance_squared(center);
            if best.map_or(true, |(best_sq, _)| distance_sq < best_sq) {
                best = Some((distance_sq, tile_center));
            }
        }
    }
    best.map(|(_, tile_center)| tile_center - Vec2::new(AGENT_HALF_PX, AGENT_HALF_PX))
}

/// Moves an agent standing on unwalkable ground to the nearest walkable tile, or to
/// `safe_respawn`. Returns `Some(used_safe_respawn)` when the agent was moved.
fn recover_if_stranded(body: &mut AgentBody, map: &TileMap, safe_respawn: Vec2) -> Option<bool> {
    if map.is_walkable(body.center()) {
        return None;
    }
    let (position, used_safe_respawn) = match nearest_walkable_position(map, body.center()) {
        Some(position) => (position, false),
        None => (safe_respawn, true),
    };
    warn!(
        agent = body.id.0,
        from_x = body.position.x,
        from_y = body.position.y,
        to_x = position.x,
        to_y = position.y,
        used_safe_respawn,
        "agent_recovered_from_unwalkable"
    );
    body.place_at(position);
    Some(used_safe_respawn)
}
