/// Samples the segment every half agent size, starting at `from` and stopping short of `to`.
/// Coincident points always see each other.
fn has_line_of_sight(map: &TileMap, from: Vec2, to: Vec2) -> bool {
    let delta = to - from;
    let distance = delta.length();
    if distance == 0.0 {
        return true;
    }
    let direction = delta * distance.recip();
    let steps = (distance / LINE_OF_SIGHT_STEP_PX) as u32;
    (0..steps).all(|step| map.is_walkable(from + direction * (step as f32 * LINE_OF_SIGHT_STEP_PX)))
}

/// Updates aggro, last-seen memory, and the pursuit target. `player_position` is `None` while
/// the player is dead, which counts as not visible.
fn update_aggro(
    hostile: &mut Hostile,
    player_position: Option<Vec2>,
    map: &TileMap,
    dt_seconds: f32,
) {
    let (in_range, sight) = match player_position {
        Some(player_position) => (
            hostile.body.position.distance(player_position) < hostile.aggro_range,
            has_line_of_sight(map, hostile.body.center(), agent_center(player_position)),
        ),
        None => (false, false),
    };
    hostile.has_line_of_sight = sight;

    let was_aggroed = hostile.is_aggroed();
    if let (true, true, Some(player_position)) = (in_range, sight, player_position) {
        hostile.aggro = AggroState::Aggroed;
        hostile.aggro_decay.start(AGGRO_DECAY_SECONDS);
        hostile.last_seen = Some(player_position);
    } else if was_aggroed {
        hostile.aggro_decay.tick(dt_seconds);
        if hostile.aggro_decay.is_ready() {
            hostile.aggro = AggroState::Passive;
            hostile.last_seen = None;
        }
    }
    if was_aggroed != hostile.is_aggroed() {
        debug!(
            hostile = hostile.body.id.0,
            aggroed = hostile.is_aggroed(),
            "hostile_aggro_changed"
        );
    }

    hostile.pursuit_target = match (hostile.aggro, player_position) {
        (AggroState::Aggroed, Some(player_position)) if sight => Some(player_position),
        (AggroState::Aggroed, _) => hostile.last_seen,
        (AggroState::Passive, _) => None,
    };
    if let (AggroState::Aggroed, Some(player_position)) = (hostile.aggro, player_position) {
        if let Some(facing) = Facing::from_vector(player_position - hostile.body.position) {
            hostile.body.facing = facing;
        }
    }
}

fn update_talk_range(npc: &mut Npc, player_position: Option<Vec2>) {
    npc.in_talk_range = player_position
        .is_some_and(|position| npc.body.position.distance(position) <= npc.talk_range);
}
