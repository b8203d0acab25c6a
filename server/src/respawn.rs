//! Respawn/lifecycle controller: the death → respawn transition, exactly
//! once per death.
//!
//! Per combatant the state machine is `Alive → Dead → Respawning → Alive`.
//! A second respawn request while one is in flight is dropped, and the
//! health reset at the end goes through the damage resolver's guarded path.

use crate::damage;
use crate::events::OutboundEvent;
use crate::registry::EntityRegistry;
use log::{info, warn};
use shared::{CombatEvent, EntityId, Vec3, RESPAWN_DELAY_SECS, SPAWN_POINT_A, SPAWN_POINT_B};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct PendingRespawn {
    deadline: f64,
    /// Next time a countdown event goes out to the owner.
    next_count_at: f64,
}

/// Deterministic spawn resolution: alternate between the two fixed points
/// by id parity.
pub fn spawn_point_for(id: EntityId) -> Vec3 {
    if id % 2 == 0 {
        SPAWN_POINT_A
    } else {
        SPAWN_POINT_B
    }
}

#[derive(Debug, Default)]
pub struct RespawnController {
    pending: HashMap<EntityId, PendingRespawn>,
}

impl RespawnController {
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
        }
    }

    pub fn is_pending(&self, id: EntityId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Starts a respawn countdown. Rejected while one is already in flight
    /// for this id, for unknown ids, and for living combatants unless
    /// `ignore_alive_check` is set.
    pub fn request(
        &mut self,
        registry: &EntityRegistry,
        id: EntityId,
        ignore_alive_check: bool,
        now: f64,
        events: &mut Vec<OutboundEvent>,
    ) -> bool {
        if self.pending.contains_key(&id) {
            return false;
        }
        let Some(combatant) = registry.get(id) else {
            return false;
        };
        if !ignore_alive_check && !combatant.is_dead {
            return false;
        }

        events.push(OutboundEvent::owner(
            id,
            CombatEvent::RespawnCountdown {
                target: id,
                seconds_remaining: RESPAWN_DELAY_SECS.ceil() as u32,
            },
        ));
        self.pending.insert(
            id,
            PendingRespawn {
                deadline: now + RESPAWN_DELAY_SECS,
                next_count_at: now + 1.0,
            },
        );
        info!("Respawn scheduled for combatant {}", id);
        true
    }

    /// Drops the countdown of a combatant that left entirely.
    pub fn cancel(&mut self, id: EntityId) {
        self.pending.remove(&id);
    }

    /// Advances countdowns; on each elapsed deadline teleports the combatant
    /// to its spawn point and restores health through the guarded reset.
    /// Returns the ids that came back to life this tick.
    pub fn tick(
        &mut self,
        registry: &mut EntityRegistry,
        now: f64,
        events: &mut Vec<OutboundEvent>,
    ) -> Vec<EntityId> {
        let mut completed = Vec::new();

        for (&id, pending) in self.pending.iter_mut() {
            if now >= pending.deadline {
                completed.push(id);
                continue;
            }
            if now >= pending.next_count_at {
                pending.next_count_at += 1.0;
                events.push(OutboundEvent::owner(
                    id,
                    CombatEvent::RespawnCountdown {
                        target: id,
                        seconds_remaining: (pending.deadline - now).ceil() as u32,
                    },
                ));
            }
        }

        for &id in &completed {
            self.pending.remove(&id);

            let spawn = spawn_point_for(id);
            let Some(combatant) = registry.get_mut(id) else {
                continue;
            };
            // Teleport first; collision stays off until the body is in
            // place, so nothing can hit a corpse mid-transition.
            combatant.position = spawn;

            if !damage::reset_full(registry, id, now) {
                warn!("Respawn reset refused for combatant {}", id);
                continue;
            }

            events.push(OutboundEvent::all(CombatEvent::Teleport {
                target: id,
                position: spawn,
            }));
            events.push(OutboundEvent::owner(
                id,
                CombatEvent::RespawnCountdown {
                    target: id,
                    seconds_remaining: 0,
                },
            ));
            info!("Combatant {} respawned", id);
        }

        completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::damage::apply_damage;

    fn dead_combatant_registry(at: f64) -> (EntityRegistry, Vec<OutboundEvent>) {
        let mut registry = EntityRegistry::new();
        registry.register(2, 2, 100.0);
        registry.register(3, 3, 100.0);
        let mut events = Vec::new();
        apply_damage(&mut registry, 2, 200.0, 3, Some(3), Vec3::ZERO, at, &mut events);
        events.clear();
        (registry, events)
    }

    #[test]
    fn test_request_while_alive_is_rejected() {
        let mut registry = EntityRegistry::new();
        registry.register(2, 2, 100.0);
        let mut controller = RespawnController::new();
        let mut events = Vec::new();

        assert!(!controller.request(&registry, 2, false, 0.0, &mut events));
        assert!(controller.request(&registry, 2, true, 0.0, &mut events));
    }

    #[test]
    fn test_duplicate_request_is_rejected() {
        let (registry, mut events) = dead_combatant_registry(0.0);
        let mut controller = RespawnController::new();

        assert!(controller.request(&registry, 2, false, 0.0, &mut events));
        assert!(!controller.request(&registry, 2, false, 0.1, &mut events));
        assert!(controller.is_pending(2));
    }

    #[test]
    fn test_unknown_id_is_rejected() {
        let registry = EntityRegistry::new();
        let mut controller = RespawnController::new();
        let mut events = Vec::new();

        assert!(!controller.request(&registry, 99, true, 0.0, &mut events));
    }

    #[test]
    fn test_countdown_then_revive() {
        let (mut registry, mut events) = dead_combatant_registry(0.0);
        let mut controller = RespawnController::new();

        controller.request(&registry, 2, false, 0.0, &mut events);
        let initial: Vec<_> = events.drain(..).collect();
        assert!(matches!(
            initial[0].event,
            CombatEvent::RespawnCountdown {
                seconds_remaining: 3,
                ..
            }
        ));

        // Still dead halfway through
        controller.tick(&mut registry, 1.5, &mut events);
        assert!(registry.get(2).unwrap().is_dead);
        assert!(events.iter().any(|e| matches!(
            e.event,
            CombatEvent::RespawnCountdown {
                seconds_remaining: 2,
                ..
            }
        )));
        events.clear();

        let completed = controller.tick(&mut registry, RESPAWN_DELAY_SECS + 0.01, &mut events);
        assert_eq!(completed, vec![2]);

        let c = registry.get(2).unwrap();
        assert!(!c.is_dead);
        assert_eq!(c.current_health, 100.0);
        assert_eq!(c.position, spawn_point_for(2));
        assert!(!controller.is_pending(2));

        // Teleport precedes the final countdown-zero event
        let teleport_idx = events
            .iter()
            .position(|e| matches!(e.event, CombatEvent::Teleport { target: 2, .. }))
            .unwrap();
        let zero_idx = events
            .iter()
            .position(|e| {
                matches!(
                    e.event,
                    CombatEvent::RespawnCountdown {
                        seconds_remaining: 0,
                        ..
                    }
                )
            })
            .unwrap();
        assert!(teleport_idx < zero_idx);
    }

    #[test]
    fn test_respawn_allowed_again_after_completion() {
        let (mut registry, mut events) = dead_combatant_registry(0.0);
        let mut controller = RespawnController::new();

        controller.request(&registry, 2, false, 0.0, &mut events);
        controller.tick(&mut registry, RESPAWN_DELAY_SECS + 0.01, &mut events);
        assert!(!registry.get(2).unwrap().is_dead);

        // Kill again later; a fresh request is accepted
        apply_damage(
            &mut registry,
            2,
            200.0,
            3,
            Some(3),
            Vec3::ZERO,
            10.0,
            &mut events,
        );
        assert!(controller.request(&registry, 2, false, 10.0, &mut events));
    }

    #[test]
    fn test_spawn_points_alternate_by_parity() {
        assert_eq!(spawn_point_for(2), SPAWN_POINT_A);
        assert_eq!(spawn_point_for(4), SPAWN_POINT_A);
        assert_eq!(spawn_point_for(1), SPAWN_POINT_B);
        assert_eq!(spawn_point_for(3), SPAWN_POINT_B);
    }

    #[test]
    fn test_cancel_drops_pending_countdown() {
        let (mut registry, mut events) = dead_combatant_registry(0.0);
        let mut controller = RespawnController::new();

        controller.request(&registry, 2, false, 0.0, &mut events);
        controller.cancel(2);
        let completed = controller.tick(&mut registry, RESPAWN_DELAY_SECS + 0.01, &mut events);
        assert!(completed.is_empty());
        assert!(registry.get(2).unwrap().is_dead);
    }
}
