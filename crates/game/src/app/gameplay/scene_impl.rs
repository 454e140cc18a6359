impl Scene for GameplayScene {
    fn load(&mut self) {
        self.reset();
        info!(
            map = %self.world.atlas.active_id(),
            seed = self.seed,
            system_order = GAMEPLAY_SYSTEM_ORDER_TEXT,
            npcs = self.world.npcs.len(),
            "scene_load"
        );
    }

    fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        let intent = PlayerIntent::from_input(input, &self.previous_input);
        self.previous_input = *input;
        self.systems
            .run_once_per_tick(&mut self.world, &intent, fixed_dt_seconds);
        self.tick = self.tick.saturating_add(1);

        let events = self.world.events.last_tick_events();
        if !events.is_empty() {
            debug!(
                tick = self.tick,
                events = events.len(),
                kills = self.world.events.last_tick_count(GameplayEventKind::HostileKilled),
                hostiles = self.world.live_hostile_count(),
                "gameplay_tick_events"
            );
        }
        SceneCommand::None
    }

    fn unload(&mut self) {
        let stats = self.world.events.stats();
        info!(
            ticks = self.tick,
            map = %self.world.atlas.active_id(),
            level = self.world.player.level,
            hostiles_spawned = stats.hostiles_spawned,
            hostiles_killed = stats.hostiles_killed,
            damage_dealt = stats.damage_dealt,
            damage_taken = stats.damage_taken,
            player_deaths = stats.player_deaths,
            transitions = stats.transitions,
            "scene_unload"
        );
    }

    fn debug_title(&self) -> Option<String> {
        Some(format!(
            "Tilebound | {} | Lv {}",
            self.world.atlas.active_id(),
            self.world.player.level
        ))
    }
}
