//! Headless intent generation for the demo client.
//!
//! There is no renderer or keyboard here; the pilot plays a simple scripted
//! game instead: shoot at the nearest enemy on a fixed cadence, reload when
//! the predicted magazine runs dry, raise the shield now and then, and ask
//! for a respawn after dying. Every intent is still just a request — the
//! authority re-validates all of them.

use crate::game::ClientCombatState;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClientIntent {
    Fire { origin: Vec3, direction: Vec3 },
    Reload,
    Respawn,
    Shield,
}

pub struct DemoPilot {
    /// Seconds between trigger pulls.
    fire_period: f64,
    /// Seconds between shield attempts; the server enforces the cooldown.
    shield_period: f64,
    next_fire_at: f64,
    next_shield_at: f64,
    aim_jitter: f32,
    rng: StdRng,
}

impl DemoPilot {
    pub fn new(fire_period: f64, shield_period: f64) -> Self {
        Self {
            fire_period,
            shield_period,
            next_fire_at: 0.0,
            next_shield_at: shield_period,
            aim_jitter: 0.02,
            rng: StdRng::from_entropy(),
        }
    }

    /// Nearest living combatant that is not us and not on our team.
    fn pick_target(&self, state: &ClientCombatState) -> Option<Vec3> {
        let me = state.me()?;
        state
            .combatants
            .values()
            .filter(|c| c.id != me.id && !c.is_dead && c.team != me.team)
            .map(|c| (c.position, c.position.distance(&me.position)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(position, _)| position)
    }

    /// Produces this round of intents based on confirmed + predicted state.
    pub fn decide(&mut self, state: &ClientCombatState) -> Vec<ClientIntent> {
        let mut intents = Vec::new();
        let Some(me) = state.me() else {
            return intents;
        };
        let now = state.local_clock;

        if me.is_dead {
            // One request is enough; duplicates would be dropped anyway
            if state.respawn_seconds.is_none() {
                intents.push(ClientIntent::Respawn);
            }
            return intents;
        }

        if state.predicted_mag == 0 && me.reserve > 0 {
            intents.push(ClientIntent::Reload);
        }

        if now >= self.next_shield_at {
            self.next_shield_at = now + self.shield_period;
            intents.push(ClientIntent::Shield);
        }

        if now >= self.next_fire_at {
            if let Some(target) = self.pick_target(state) {
                self.next_fire_at = now + self.fire_period;
                let jitter = Vec3::new(
                    self.rng.gen_range(-self.aim_jitter..=self.aim_jitter),
                    self.rng.gen_range(-self.aim_jitter..=self.aim_jitter),
                    self.rng.gen_range(-self.aim_jitter..=self.aim_jitter),
                );
                let direction = target.sub(&me.position).normalize().add(&jitter).normalize();
                if direction != Vec3::ZERO {
                    intents.push(ClientIntent::Fire {
                        origin: me.position,
                        direction,
                    });
                }
            }
        }

        intents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{CombatantSnapshot, EntityId, WeaponKind};

    fn snapshot_of(id: EntityId, team: i32) -> CombatantSnapshot {
        CombatantSnapshot {
            id,
            team,
            position: Vec3::new(id as f32, 0.0, 0.0),
            current_health: 100.0,
            max_health: 100.0,
            is_dead: false,
            shield_active: false,
            shield_remaining: 0.0,
            kills: 0,
            score: 0,
            weapon: WeaponKind::Pistol,
            mag: 12,
            reserve: 48,
        }
    }

    fn state_with_enemy() -> ClientCombatState {
        let mut state = ClientCombatState::new();
        state.client_id = Some(1);
        state.apply_snapshot(1, vec![snapshot_of(1, 1), snapshot_of(2, 2)], vec![]);
        state
    }

    #[test]
    fn test_fires_at_enemy() {
        let mut state = state_with_enemy();
        state.update(1.0);
        let mut pilot = DemoPilot::new(0.3, 1000.0);

        let intents = pilot.decide(&state);
        assert!(intents
            .iter()
            .any(|i| matches!(i, ClientIntent::Fire { .. })));
    }

    #[test]
    fn test_fire_cadence_respected() {
        let mut state = state_with_enemy();
        state.update(1.0);
        let mut pilot = DemoPilot::new(10.0, 1000.0);

        assert!(pilot
            .decide(&state)
            .iter()
            .any(|i| matches!(i, ClientIntent::Fire { .. })));
        // Immediately again: cadence not elapsed
        assert!(!pilot
            .decide(&state)
            .iter()
            .any(|i| matches!(i, ClientIntent::Fire { .. })));
    }

    #[test]
    fn test_requests_respawn_when_dead() {
        let mut state = state_with_enemy();
        let mut me = snapshot_of(1, 1);
        me.is_dead = true;
        state.apply_snapshot(2, vec![me, snapshot_of(2, 2)], vec![]);
        let mut pilot = DemoPilot::new(0.3, 1000.0);

        let intents = pilot.decide(&state);
        assert_eq!(intents, vec![ClientIntent::Respawn]);

        // Countdown already running: no duplicate request
        state.respawn_seconds = Some(2);
        assert!(pilot.decide(&state).is_empty());
    }

    #[test]
    fn test_reloads_when_predicted_dry() {
        let mut state = state_with_enemy();
        state.predicted_mag = 0;
        let mut pilot = DemoPilot::new(1000.0, 1000.0);

        let intents = pilot.decide(&state);
        assert!(intents.contains(&ClientIntent::Reload));
    }

    #[test]
    fn test_no_intents_before_connected() {
        let state = ClientCombatState::new();
        let mut pilot = DemoPilot::new(0.3, 1.0);
        assert!(pilot.decide(&state).is_empty());
    }
}
