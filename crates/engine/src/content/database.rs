use std::collections::HashMap;

use super::compiler::{compile_def_database_from_str, ContentCompileError};

const BUILTIN_DEFS_XML: &str = include_str!("../../../../assets/base/defs.xml");
const BUILTIN_DEFS_PATH: &str = "<builtin>/assets/base/defs.xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefId(pub u32);

/// Static stats for one hostile kind, shared by every spawned instance.
#[derive(Debug, Clone, PartialEq)]
pub struct HostileArchetype {
    pub id: DefId,
    pub def_name: String,
    pub label: String,
    pub max_health: f32,
    pub strength: i32,
    pub defense: i32,
    pub speed: f32,
    pub attack_range: f32,
    pub aggro_range: f32,
    pub exp_value: u32,
    pub spawn_weight: u32,
    pub drop_chance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Weapon,
    Armor,
    Potion,
}

impl ItemKind {
    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw {
            "weapon" => Some(Self::Weapon),
            "armor" => Some(Self::Armor),
            "potion" => Some(Self::Potion),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemDef {
    pub id: DefId,
    pub def_name: String,
    pub label: String,
    pub kind: ItemKind,
    pub damage: i32,
    pub defense: i32,
    pub heal: f32,
    pub mana: f32,
    pub drop_weight: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerDef {
    pub def_name: String,
    pub max_health: f32,
    pub max_mana: f32,
    pub strength: i32,
    pub defense: i32,
    pub speed: f32,
    pub mana_regen: f32,
}

impl Default for PlayerDef {
    fn default() -> Self {
        Self {
            def_name: "player".to_string(),
            max_health: 100.0,
            max_mana: 100.0,
            strength: 10,
            defense: 5,
            speed: 200.0,
            mana_regen: 5.0,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct DefDatabase {
    hostiles: Vec<HostileArchetype>,
    hostile_ids_by_name: HashMap<String, DefId>,
    items: Vec<ItemDef>,
    item_ids_by_name: HashMap<String, DefId>,
    player: PlayerDef,
}

impl DefDatabase {
    /// Compiles the definitions shipped inside the binary.
    pub fn builtin() -> Result<Self, ContentCompileError> {
        compile_def_database_from_str(BUILTIN_DEFS_PATH, BUILTIN_DEFS_XML)
    }

    pub(crate) fn from_defs(
        mut hostiles: Vec<HostileArchetype>,
        mut items: Vec<ItemDef>,
        player: Option<PlayerDef>,
    ) -> Self {
        let mut hostile_ids_by_name = HashMap::with_capacity(hostiles.len());
        for (idx, def) in hostiles.iter_mut().enumerate() {
            let id = DefId(idx as u32);
            def.id = id;
            hostile_ids_by_name.insert(def.def_name.clone(), id);
        }
        let mut item_ids_by_name = HashMap::with_capacity(items.len());
        for (idx, def) in items.iter_mut().enumerate() {
            let id = DefId(idx as u32);
            def.id = id;
            item_ids_by_name.insert(def.def_name.clone(), id);
        }
        Self {
            hostiles,
            hostile_ids_by_name,
            items,
            item_ids_by_name,
            player: player.unwrap_or_default(),
        }
    }

    pub fn hostile_id_by_name(&self, name: &str) -> Option<DefId> {
        self.hostile_ids_by_name.get(name).copied()
    }

    pub fn hostile(&self, id: DefId) -> Option<&HostileArchetype> {
        self.hostiles.get(id.0 as usize)
    }

    pub fn hostiles(&self) -> &[HostileArchetype] {
        &self.hostiles
    }

    pub fn item_id_by_name(&self, name: &str) -> Option<DefId> {
        self.item_ids_by_name.get(name).copied()
    }

    pub fn item(&self, id: DefId) -> Option<&ItemDef> {
        self.items.get(id.0 as usize)
    }

    pub fn items(&self) -> &[ItemDef] {
        &self.items
    }

    pub fn player(&self) -> &PlayerDef {
        &self.player
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_defs_carry_goblin_and_zombie_stats() {
        let db = DefDatabase::builtin().expect("builtin");
        let goblin = db
            .hostile(db.hostile_id_by_name("goblin").expect("goblin"))
            .expect("goblin def");
        assert_eq!(goblin.max_health, 50.0);
        assert_eq!(goblin.strength, 8);
        assert_eq!(goblin.defense, 3);
        assert_eq!(goblin.attack_range, 50.0);
        assert_eq!(goblin.aggro_range, 300.0);
        assert_eq!(goblin.exp_value, 10);

        let zombie = db
            .hostile(db.hostile_id_by_name("zombie").expect("zombie"))
            .expect("zombie def");
        assert_eq!(zombie.max_health, 75.0);
        assert_eq!(zombie.speed, 80.0);
        assert_eq!(zombie.exp_value, 15);
    }

    #[test]
    fn builtin_defs_include_potions_and_player() {
        let db = DefDatabase::builtin().expect("builtin");
        let potion = db
            .item(db.item_id_by_name("health_potion").expect("potion"))
            .expect("potion def");
        assert_eq!(potion.kind, ItemKind::Potion);
        assert!(potion.heal > 0.0);
        assert!(db.player().max_mana > 0.0);
    }

    #[test]
    fn ids_are_dense_and_match_lookup() {
        let db = DefDatabase::builtin().expect("builtin");
        for (idx, def) in db.items().iter().enumerate() {
            assert_eq!(def.id, DefId(idx as u32));
            assert_eq!(db.item_id_by_name(&def.def_name), Some(def.id));
        }
    }
}
