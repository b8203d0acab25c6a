//! Shield activation and the pulse area ability.
//!
//! Absorption arithmetic lives on [`ShieldState`](crate::registry::ShieldState)
//! where the damage resolver applies it; this module owns the request
//! validation and the deadline bookkeeping.

use crate::damage;
use crate::events::OutboundEvent;
use crate::registry::{EntityRegistry, ShieldMode};
use log::info;
use shared::{
    EntityId, PULSE_CAST_SECS, PULSE_COOLDOWN_SECS, PULSE_DAMAGE, PULSE_RADIUS,
    SHIELD_DURATION_SECS, SHIELD_MAX_LIFETIME_SECS,
};
use std::collections::HashMap;

/// Activates the requester's shield. Rejected while dead, already active,
/// or before the activation cooldown elapses.
pub fn request_shield(registry: &mut EntityRegistry, id: EntityId, now: f64) -> bool {
    let Some(combatant) = registry.get_mut(id) else {
        return false;
    };
    if combatant.is_dead || combatant.shield.active || now < combatant.shield.ready_at {
        return false;
    }

    let lifetime = match combatant.shield.mode {
        ShieldMode::Capacity => SHIELD_MAX_LIFETIME_SECS,
        ShieldMode::Duration => SHIELD_DURATION_SECS.min(SHIELD_MAX_LIFETIME_SECS),
    };
    combatant.shield.activate(now, lifetime);
    info!("Combatant {} raised shield", id);
    true
}

/// Deactivates every shield whose lifetime elapsed.
pub fn tick_shields(registry: &mut EntityRegistry, now: f64) {
    for combatant in registry.iter_mut() {
        if combatant.shield.active && now >= combatant.shield.expires_at {
            combatant.shield.deactivate();
        }
    }
}

/// Cast-time and cooldown tracking for the pulse ability.
#[derive(Debug, Default)]
pub struct PulseTracker {
    casting: HashMap<EntityId, f64>,
    ready_at: HashMap<EntityId, f64>,
}

impl PulseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_casting(&self, id: EntityId) -> bool {
        self.casting.contains_key(&id)
    }

    /// Begins a pulse cast. Duplicate requests during the cast and requests
    /// before the cooldown elapses are dropped.
    pub fn request(&mut self, registry: &EntityRegistry, id: EntityId, now: f64) -> bool {
        let Some(combatant) = registry.get(id) else {
            return false;
        };
        if combatant.is_dead || self.casting.contains_key(&id) {
            return false;
        }
        if now < self.ready_at.get(&id).copied().unwrap_or(0.0) {
            return false;
        }

        self.casting.insert(id, now + PULSE_CAST_SECS);
        true
    }

    /// Resolves finished casts: everyone inside the radius except the caster
    /// takes pulse damage through the resolver. Dying mid-cast fizzles the
    /// pulse but still starts the cooldown.
    pub fn tick(
        &mut self,
        registry: &mut EntityRegistry,
        now: f64,
        events: &mut Vec<OutboundEvent>,
    ) {
        let due: Vec<EntityId> = self
            .casting
            .iter()
            .filter(|(_, &resolve_at)| now >= resolve_at)
            .map(|(&id, _)| id)
            .collect();

        for caster in due {
            self.casting.remove(&caster);
            self.ready_at.insert(caster, now + PULSE_COOLDOWN_SECS);

            let (position, team) = match registry.get(caster) {
                Some(c) if !c.is_dead => (c.position, c.team),
                _ => continue,
            };

            let targets: Vec<EntityId> = registry
                .iter()
                .filter(|c| c.id != caster && !c.is_dead)
                .filter(|c| c.position.distance(&position) <= PULSE_RADIUS)
                .map(|c| c.id)
                .collect();

            info!("Combatant {} pulsed {} targets", caster, targets.len());
            for target in targets {
                damage::apply_damage(
                    registry,
                    target,
                    PULSE_DAMAGE,
                    team,
                    Some(caster),
                    position,
                    now,
                    events,
                );
            }
        }
    }

    pub fn forget(&mut self, id: EntityId) {
        self.casting.remove(&id);
        self.ready_at.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::{Vec3, SHIELD_CAPACITY, SHIELD_COOLDOWN_SECS};

    fn arena() -> EntityRegistry {
        let mut registry = EntityRegistry::new();
        registry.register(1, 1, 100.0);
        registry.register(2, 2, 100.0);
        registry.register(3, 3, 100.0);
        registry.get_mut(1).unwrap().position = Vec3::ZERO;
        registry.get_mut(2).unwrap().position = Vec3::new(3.0, 0.0, 0.0);
        registry.get_mut(3).unwrap().position = Vec3::new(50.0, 0.0, 0.0);
        registry
    }

    #[test]
    fn test_shield_activation_and_cooldown() {
        let mut registry = arena();

        assert!(request_shield(&mut registry, 1, 0.0));
        let c = registry.get(1).unwrap();
        assert!(c.shield.active);
        assert_approx_eq!(c.shield.remaining, SHIELD_CAPACITY, 0.0001);

        // Active: re-request dropped
        assert!(!request_shield(&mut registry, 1, 1.0));

        // Expires at the lifetime cap, but the cooldown still gates it
        tick_shields(&mut registry, SHIELD_MAX_LIFETIME_SECS + 0.1);
        assert!(!registry.get(1).unwrap().shield.active);
        assert!(!request_shield(&mut registry, 1, 8.0));
        assert!(request_shield(&mut registry, 1, SHIELD_COOLDOWN_SECS + 0.1));
    }

    #[test]
    fn test_shield_rejected_while_dead() {
        let mut registry = arena();
        {
            let c = registry.get_mut(1).unwrap();
            c.is_dead = true;
            c.current_health = 0.0;
        }
        assert!(!request_shield(&mut registry, 1, 0.0));
    }

    #[test]
    fn test_duration_shield_expires_at_duration() {
        let mut registry = arena();
        registry.get_mut(1).unwrap().shield.mode = ShieldMode::Duration;

        request_shield(&mut registry, 1, 0.0);
        tick_shields(&mut registry, SHIELD_DURATION_SECS - 0.1);
        assert!(registry.get(1).unwrap().shield.active);
        tick_shields(&mut registry, SHIELD_DURATION_SECS + 0.1);
        assert!(!registry.get(1).unwrap().shield.active);
    }

    #[test]
    fn test_pulse_damages_only_in_radius() {
        let mut registry = arena();
        let mut tracker = PulseTracker::new();
        let mut events = Vec::new();

        assert!(tracker.request(&registry, 1, 0.0));
        assert!(tracker.is_casting(1));

        tracker.tick(&mut registry, PULSE_CAST_SECS + 0.01, &mut events);

        assert_approx_eq!(
            registry.get(2).unwrap().current_health,
            100.0 - PULSE_DAMAGE,
            0.0001
        );
        // Out of radius and the caster itself are untouched
        assert_approx_eq!(registry.get(3).unwrap().current_health, 100.0, 0.0001);
        assert_approx_eq!(registry.get(1).unwrap().current_health, 100.0, 0.0001);
    }

    #[test]
    fn test_pulse_duplicate_request_dropped() {
        let registry = arena();
        let mut tracker = PulseTracker::new();

        assert!(tracker.request(&registry, 1, 0.0));
        assert!(!tracker.request(&registry, 1, 0.1));
    }

    #[test]
    fn test_pulse_cooldown() {
        let mut registry = arena();
        let mut tracker = PulseTracker::new();
        let mut events = Vec::new();

        tracker.request(&registry, 1, 0.0);
        let resolved_at = PULSE_CAST_SECS + 0.01;
        tracker.tick(&mut registry, resolved_at, &mut events);

        assert!(!tracker.request(&registry, 1, resolved_at + 1.0));
        assert!(tracker.request(&registry, 1, resolved_at + PULSE_COOLDOWN_SECS + 0.1));
    }

    #[test]
    fn test_pulse_fizzles_if_caster_dies_mid_cast() {
        let mut registry = arena();
        let mut tracker = PulseTracker::new();
        let mut events = Vec::new();

        tracker.request(&registry, 1, 0.0);
        {
            let c = registry.get_mut(1).unwrap();
            c.is_dead = true;
            c.current_health = 0.0;
        }
        tracker.tick(&mut registry, PULSE_CAST_SECS + 0.01, &mut events);

        assert_approx_eq!(registry.get(2).unwrap().current_health, 100.0, 0.0001);
        assert!(!tracker.is_casting(1));
    }
}
