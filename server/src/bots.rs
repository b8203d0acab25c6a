//! Server-driven combatants.
//!
//! A bot is an ordinary combatant on the AI team whose fire intents are
//! produced here instead of arriving over the wire. Intents go through the
//! same fire-request gateway as player requests, so ammo, cooldown and
//! reload rules apply identically. Perception and pathfinding live outside
//! the combat core; targets are assigned by the embedding loop.

use crate::arsenal::Arsenal;
use crate::registry::EntityRegistry;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{EntityId, Vec3, WeaponKind};

/// Bot ids live above this base so they never collide with client ids.
pub const BOT_ID_BASE: EntityId = 10_000;

/// Degrees of aim spread: 0 is a perfect sniper, ~1.5 an average soldier.
pub const DEFAULT_AIM_INACCURACY: f32 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireIntent {
    pub origin: Vec3,
    pub direction: Vec3,
}

#[derive(Debug)]
pub struct BotBrain {
    pub id: EntityId,
    pub target: Option<EntityId>,
    pub in_combat: bool,
    aim_inaccuracy: f32,
    rng: StdRng,
}

impl BotBrain {
    pub fn new(id: EntityId, aim_inaccuracy: f32) -> Self {
        Self {
            id,
            target: None,
            in_combat: false,
            aim_inaccuracy,
            // Seeded by id: bot behaviour replays identically in tests
            rng: StdRng::seed_from_u64(id),
        }
    }

    pub fn set_target(&mut self, target: Option<EntityId>) {
        self.target = target;
        self.in_combat = target.is_some();
    }

    /// Swaps to the other weapon when the active one is completely dry.
    fn ensure_usable_weapon(&self, arsenal: &mut Arsenal) {
        let active = arsenal.pool(arsenal.active());
        if active.mag > 0 || active.reserve > 0 {
            return;
        }
        for kind in WeaponKind::ALL {
            if kind == arsenal.active() {
                continue;
            }
            let pool = arsenal.pool(kind);
            if pool.mag > 0 || pool.reserve > 0 {
                arsenal.switch_to(kind);
                return;
            }
        }
    }

    /// Produces this tick's fire intent, if any. Out of combat the bot tops
    /// up its magazine instead of shooting.
    pub fn think(
        &mut self,
        registry: &EntityRegistry,
        arsenal: &mut Arsenal,
        now: f64,
    ) -> Option<FireIntent> {
        let me = registry.get(self.id)?;
        if me.is_dead || arsenal.is_reloading() {
            return None;
        }

        if !self.in_combat {
            let spec = arsenal.active().spec();
            if arsenal.mag() < spec.mag_size && arsenal.reserve() > 0 {
                arsenal.start_reload(now);
            }
            return None;
        }

        let target = registry.get(self.target?)?;
        if target.is_dead {
            return None;
        }

        self.ensure_usable_weapon(arsenal);

        let aim = target.position.sub(&me.position);
        if aim.magnitude() == 0.0 || aim.magnitude() > arsenal.active().spec().max_aim_distance {
            return None;
        }

        // Spread: offset the unit aim vector by up to tan(inaccuracy°)
        let spread = self.aim_inaccuracy.to_radians().tan();
        let jitter = Vec3::new(
            self.rng.gen_range(-spread..=spread),
            self.rng.gen_range(-spread..=spread),
            self.rng.gen_range(-spread..=spread),
        );
        let direction = aim.normalize().add(&jitter).normalize();
        if direction == Vec3::ZERO {
            return None;
        }

        Some(FireIntent {
            origin: me.position,
            direction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bot_arena() -> EntityRegistry {
        let mut registry = EntityRegistry::new();
        registry.register(BOT_ID_BASE, shared::TEAM_AI, 100.0);
        registry.register(1, 1, 100.0);
        registry.get_mut(BOT_ID_BASE).unwrap().position = Vec3::ZERO;
        registry.get_mut(1).unwrap().position = Vec3::new(0.0, 0.0, 20.0);
        registry
    }

    #[test]
    fn test_no_intent_without_target() {
        let registry = bot_arena();
        let mut brain = BotBrain::new(BOT_ID_BASE, 0.0);
        let mut arsenal = Arsenal::new(WeaponKind::Rifle);

        assert!(brain.think(&registry, &mut arsenal, 0.0).is_none());
    }

    #[test]
    fn test_intent_aims_roughly_at_target() {
        let registry = bot_arena();
        let mut brain = BotBrain::new(BOT_ID_BASE, 0.0);
        brain.set_target(Some(1));
        let mut arsenal = Arsenal::new(WeaponKind::Rifle);

        let intent = brain.think(&registry, &mut arsenal, 0.0).unwrap();
        // Zero inaccuracy: exact aim along +z
        assert!((intent.direction.z - 1.0).abs() < 0.0001);
        assert_eq!(intent.origin, Vec3::ZERO);
    }

    #[test]
    fn test_spread_stays_near_true_aim() {
        let registry = bot_arena();
        let mut brain = BotBrain::new(BOT_ID_BASE, DEFAULT_AIM_INACCURACY);
        brain.set_target(Some(1));
        let mut arsenal = Arsenal::new(WeaponKind::Rifle);

        for _ in 0..50 {
            let intent = brain.think(&registry, &mut arsenal, 0.0).unwrap();
            // Within a few degrees of straight ahead
            assert!(intent.direction.z > 0.99);
        }
    }

    #[test]
    fn test_dead_target_stops_fire() {
        let mut registry = bot_arena();
        {
            let c = registry.get_mut(1).unwrap();
            c.is_dead = true;
            c.current_health = 0.0;
        }
        let mut brain = BotBrain::new(BOT_ID_BASE, 0.0);
        brain.set_target(Some(1));
        let mut arsenal = Arsenal::new(WeaponKind::Rifle);

        assert!(brain.think(&registry, &mut arsenal, 0.0).is_none());
    }

    #[test]
    fn test_dead_bot_is_silent() {
        let mut registry = bot_arena();
        {
            let c = registry.get_mut(BOT_ID_BASE).unwrap();
            c.is_dead = true;
            c.current_health = 0.0;
        }
        let mut brain = BotBrain::new(BOT_ID_BASE, 0.0);
        brain.set_target(Some(1));
        let mut arsenal = Arsenal::new(WeaponKind::Rifle);

        assert!(brain.think(&registry, &mut arsenal, 0.0).is_none());
    }

    #[test]
    fn test_tactical_reload_out_of_combat() {
        let registry = bot_arena();
        let mut brain = BotBrain::new(BOT_ID_BASE, 0.0);
        let mut arsenal = Arsenal::new(WeaponKind::Rifle);

        // Burn a round, then leave combat
        arsenal.try_begin_fire(0.0).unwrap();
        brain.set_target(None);

        assert!(brain.think(&registry, &mut arsenal, 1.0).is_none());
        assert!(arsenal.is_reloading());
    }

    #[test]
    fn test_switches_weapon_when_dry() {
        let registry = bot_arena();
        let mut brain = BotBrain::new(BOT_ID_BASE, 0.0);
        brain.set_target(Some(1));
        let mut arsenal = Arsenal::new(WeaponKind::Rifle);

        // Drain the rifle completely
        let mut now = 0.0;
        loop {
            arsenal.tick(now);
            let pool = arsenal.pool(WeaponKind::Rifle);
            if pool.mag == 0 && pool.reserve == 0 && !arsenal.is_reloading() {
                break;
            }
            let _ = arsenal.try_begin_fire(now);
            now += 3.0;
        }
        if arsenal.active() == WeaponKind::Rifle {
            brain.think(&registry, &mut arsenal, now).unwrap();
        }

        assert_eq!(arsenal.active(), WeaponKind::Pistol);
    }

    #[test]
    fn test_out_of_range_holds_fire() {
        let mut registry = bot_arena();
        registry.get_mut(1).unwrap().position = Vec3::new(0.0, 0.0, 500.0);
        let mut brain = BotBrain::new(BOT_ID_BASE, 0.0);
        brain.set_target(Some(1));
        let mut arsenal = Arsenal::new(WeaponKind::Rifle);

        assert!(brain.think(&registry, &mut arsenal, 0.0).is_none());
    }
}
