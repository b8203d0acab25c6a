//! Client-side combat state: confirmed server data plus local prediction.
//!
//! The server snapshot is the only truth about health, ammo and scores. The
//! client layers two predictions on top for zero-latency feedback: its own
//! ammo counter and cooldown when firing, and cosmetic projectiles that fly
//! before (and alongside) the authoritative confirmation. Every snapshot
//! overwrites the predicted values with authoritative ones.

use log::{debug, info};
use shared::{
    CombatEvent, CombatantSnapshot, EntityId, ProjectileSnapshot, Vec3,
    PROJECTILE_LIFETIME_SECS,
};
use std::collections::HashMap;

/// How long a locally-predicted tracer lives before the authoritative copy
/// from the server takes over entirely.
const PREDICTED_TRACER_SECS: f64 = 0.3;

const FEED_LIMIT: usize = 32;

#[derive(Debug, Clone)]
pub struct CosmeticProjectile {
    /// Server id, or None for a locally-predicted tracer.
    pub id: Option<EntityId>,
    pub owner: EntityId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub expires_at: f64,
}

#[derive(Debug, Default)]
pub struct ClientCombatState {
    pub client_id: Option<EntityId>,
    pub tick: u64,
    pub combatants: HashMap<EntityId, CombatantSnapshot>,
    /// Cosmetic projectiles, replicated and predicted; no damage authority.
    pub projectiles: Vec<CosmeticProjectile>,
    pub last_event_seq: u64,
    /// Seconds left on our own respawn countdown, if one is running.
    pub respawn_seconds: Option<u32>,
    /// Recent deaths for the kill feed: (victim, killer).
    pub kill_feed: Vec<(EntityId, Option<EntityId>)>,
    /// Recent damage to us for the hit indicator: (amount, source position).
    pub damage_feed: Vec<(f32, Vec3)>,

    /// Local clock driving prediction, seconds.
    pub local_clock: f64,
    /// Predicted rounds in our magazine; reconciled on every snapshot.
    pub predicted_mag: u32,
    predicted_next_fire: f64,
}

impl ClientCombatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn me(&self) -> Option<&CombatantSnapshot> {
        self.combatants.get(&self.client_id?)
    }

    /// Replaces confirmed state with an authoritative snapshot and
    /// reconciles the ammo prediction against it.
    pub fn apply_snapshot(
        &mut self,
        tick: u64,
        combatants: Vec<CombatantSnapshot>,
        projectiles: Vec<ProjectileSnapshot>,
    ) {
        // Stale snapshots (UDP reordering) are dropped
        if tick < self.tick {
            return;
        }
        self.tick = tick;

        self.combatants.clear();
        for combatant in combatants {
            self.combatants.insert(combatant.id, combatant);
        }

        if let Some(mag) = self.me().map(|m| m.mag) {
            self.predicted_mag = mag;
        }

        // Authoritative projectiles replace their replicated copies;
        // locally-predicted tracers stay until they expire
        self.projectiles.retain(|p| p.id.is_none());
        let local_clock = self.local_clock;
        self.projectiles
            .extend(projectiles.into_iter().map(|p| CosmeticProjectile {
                id: Some(p.id),
                owner: 0,
                position: p.position,
                velocity: p.velocity,
                expires_at: local_clock + PROJECTILE_LIFETIME_SECS,
            }));
    }

    /// Applies an ordered event batch. Returns how many events were taken;
    /// a batch at or before `last_event_seq` is a duplicate and ignored.
    pub fn apply_events(&mut self, seq: u64, events: Vec<CombatEvent>) -> usize {
        if seq <= self.last_event_seq {
            return 0;
        }
        self.last_event_seq = seq;

        let count = events.len();
        for event in events {
            self.apply_event(event);
        }
        count
    }

    fn apply_event(&mut self, event: CombatEvent) {
        match event {
            CombatEvent::ProjectileSpawn {
                id,
                owner,
                origin,
                direction,
                speed,
            } => {
                // Our own shot was already predicted locally
                if Some(owner) == self.client_id {
                    return;
                }
                self.projectiles.push(CosmeticProjectile {
                    id: Some(id),
                    owner,
                    position: origin,
                    velocity: direction.scale(speed),
                    expires_at: self.local_clock + PROJECTILE_LIFETIME_SECS,
                });
            }

            CombatEvent::Damage {
                target,
                amount,
                source_position,
                ..
            } => {
                if Some(target) == self.client_id {
                    self.damage_feed.push((amount, source_position));
                    if self.damage_feed.len() > FEED_LIMIT {
                        self.damage_feed.remove(0);
                    }
                    debug!("Took {:.0} damage", amount);
                }
            }

            CombatEvent::Death { target, killer } => {
                info!("Combatant {} died (killer: {:?})", target, killer);
                self.kill_feed.push((target, killer));
                if self.kill_feed.len() > FEED_LIMIT {
                    self.kill_feed.remove(0);
                }
            }

            CombatEvent::RespawnCountdown {
                seconds_remaining, ..
            } => {
                self.respawn_seconds = if seconds_remaining > 0 {
                    Some(seconds_remaining)
                } else {
                    None
                };
            }

            CombatEvent::Teleport { target, position } => {
                if let Some(combatant) = self.combatants.get_mut(&target) {
                    combatant.position = position;
                }
            }

            CombatEvent::MuzzleFlash { shooter } => {
                debug!("Muzzle flash from {}", shooter);
            }

            CombatEvent::EmptyClick { .. } => {
                debug!("Click — magazine empty");
            }
        }
    }

    /// Advances the local clock and the cosmetic projectiles.
    pub fn update(&mut self, dt: f32) {
        self.local_clock += dt as f64;
        let local_clock = self.local_clock;

        for projectile in &mut self.projectiles {
            let step = projectile.velocity.scale(dt);
            projectile.position = projectile.position.add(&step);
        }
        self.projectiles.retain(|p| local_clock < p.expires_at);
    }

    /// Predicts our own shot for zero-latency feedback: decrements the
    /// predicted magazine, arms the predicted cooldown and spawns a local
    /// tracer. Returns true when a fire request should actually be sent —
    /// the authority re-validates it regardless.
    pub fn try_predict_fire(&mut self, direction: Vec3) -> bool {
        let Some(me) = self.me() else {
            return false;
        };
        if me.is_dead || me.shield_active {
            return false;
        }
        if self.predicted_mag == 0 {
            return false;
        }
        if self.local_clock < self.predicted_next_fire {
            return false;
        }

        let spec = me.weapon.spec();
        let origin = me.position;
        let owner = me.id;

        self.predicted_mag -= 1;
        self.predicted_next_fire = self.local_clock + spec.fire_interval;
        self.projectiles.push(CosmeticProjectile {
            id: None,
            owner,
            position: origin,
            velocity: direction.normalize().scale(spec.bullet_speed),
            expires_at: self.local_clock + PREDICTED_TRACER_SECS,
        });
        true
    }
}
