//! Entity registry: the authoritative source of truth for combatant state.
//!
//! The registry is owned by the [`World`](crate::world::World) and has exactly
//! one writer. No other component sets `current_health` or `is_dead` directly;
//! all mutation flows through the damage resolver. Lookups return `Option` —
//! an absent id means "target no longer exists, ignore".

use log::info;
use shared::{EntityId, Vec3, SHIELD_CAPACITY, SHIELD_COOLDOWN_SECS};
use std::collections::HashMap;

/// Shield behaviour selector.
///
/// A capacity shield is a damage buffer that depletes 1:1 and overflows the
/// excess to health. A duration shield is timed invulnerability: it absorbs
/// everything while up and never overflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShieldMode {
    Capacity,
    Duration,
}

#[derive(Debug, Clone)]
pub struct ShieldState {
    pub mode: ShieldMode,
    pub active: bool,
    pub remaining: f32,
    /// Earliest simulation time the shield may activate again.
    pub ready_at: f64,
    /// Hard deactivation deadline for the current activation.
    pub expires_at: f64,
}

impl ShieldState {
    pub fn new(mode: ShieldMode) -> Self {
        Self {
            mode,
            active: false,
            remaining: 0.0,
            ready_at: 0.0,
            expires_at: 0.0,
        }
    }

    pub fn activate(&mut self, now: f64, lifetime: f64) {
        self.active = true;
        self.remaining = SHIELD_CAPACITY;
        self.ready_at = now + SHIELD_COOLDOWN_SECS;
        self.expires_at = now + lifetime;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.remaining = 0.0;
    }

    /// Routes incoming damage through the shield and returns the residual
    /// that overflows to health. A duration shield absorbs everything. A
    /// capacity shield that reaches zero deactivates itself.
    pub fn absorb(&mut self, incoming: f32) -> f32 {
        if !self.active {
            return incoming;
        }
        if self.mode == ShieldMode::Duration {
            return 0.0;
        }

        let absorbed = self.remaining.min(incoming);
        self.remaining -= absorbed;
        if self.remaining <= 0.0 {
            self.deactivate();
        }
        incoming - absorbed
    }
}

/// One networked character, player or bot.
#[derive(Debug, Clone)]
pub struct Combatant {
    pub id: EntityId,
    /// `-1` unassigned, `-2` AI faction, otherwise the owning client id.
    pub team: i32,
    pub position: Vec3,
    pub max_health: f32,
    pub current_health: f32,
    pub is_dead: bool,
    /// Simulation time of the last death; gates the post-death grace window.
    pub died_at: f64,
    /// Last entity that damaged this combatant. Cleared by kill attribution
    /// and on respawn.
    pub last_instigator: Option<EntityId>,
    pub shield: ShieldState,
    pub kills: u32,
    pub score: u32,
}

impl Combatant {
    pub fn new(id: EntityId, team: i32, max_health: f32) -> Self {
        Self {
            id,
            team,
            position: Vec3::ZERO,
            max_health,
            current_health: max_health,
            is_dead: false,
            died_at: f64::NEG_INFINITY,
            last_instigator: None,
            shield: ShieldState::new(ShieldMode::Capacity),
            kills: 0,
            score: 0,
        }
    }
}

/// Single-writer store of all combatant records.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    combatants: HashMap<EntityId, Combatant>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            combatants: HashMap::new(),
        }
    }

    /// Creates a combatant at full health. An existing record under the same
    /// id is replaced; reconnects go through `remove` first.
    pub fn register(&mut self, id: EntityId, team: i32, max_health: f32) {
        info!("Registered combatant {} (team {})", id, team);
        self.combatants.insert(id, Combatant::new(id, team, max_health));
    }

    pub fn remove(&mut self, id: EntityId) -> bool {
        if self.combatants.remove(&id).is_some() {
            info!("Removed combatant {}", id);
            true
        } else {
            false
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&Combatant> {
        self.combatants.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Combatant> {
        self.combatants.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.combatants.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Combatant> {
        self.combatants.values_mut()
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.combatants.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.combatants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combatants.is_empty()
    }
}
