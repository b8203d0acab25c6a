//! The authoritative combat world.
//!
//! Exactly one writer drives all state mutation through a fixed-step loop:
//! requests are re-validated on arrival regardless of what the sender
//! believed, timers are deadlines on the world's own clock, and every
//! observable change leaves through the outbound event queue in application
//! order. Tests drive the clock directly by calling [`World::step`].

use crate::arsenal::{Arsenal, FireRejection};
use crate::bots::BotBrain;
use crate::damage;
use crate::events::OutboundEvent;
use crate::projectile::{CollisionOracle, ProjectileSet};
use crate::registry::EntityRegistry;
use crate::respawn::{self, RespawnController};
use crate::score;
use crate::shield::{self, PulseTracker};
use log::{debug, info, warn};
use shared::{
    CombatEvent, CombatantSnapshot, EntityId, ProjectileSnapshot, Vec3, WeaponKind,
    DEFAULT_MAX_HEALTH, TEAM_AI,
};
use std::collections::HashMap;

/// A requester's muzzle cannot be further than this from its replicated
/// body; anything else is a stale or forged origin and is snapped back.
const MAX_FIRE_ORIGIN_DRIFT: f32 = 3.0;

/// Bots engage targets inside this range.
const BOT_ENGAGE_RANGE: f32 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    Fired { projectile: EntityId },
    Rejected(FireRejection),
}

pub struct World {
    clock: f64,
    tick: u64,
    registry: EntityRegistry,
    arsenals: HashMap<EntityId, Arsenal>,
    projectiles: ProjectileSet,
    respawns: RespawnController,
    pulses: PulseTracker,
    bots: HashMap<EntityId, BotBrain>,
    oracle: Box<dyn CollisionOracle + Send + Sync>,
    events: Vec<OutboundEvent>,
}

impl World {
    pub fn new(oracle: Box<dyn CollisionOracle + Send + Sync>) -> Self {
        Self {
            clock: 0.0,
            tick: 0,
            registry: EntityRegistry::new(),
            arsenals: HashMap::new(),
            projectiles: ProjectileSet::new(),
            respawns: RespawnController::new(),
            pulses: PulseTracker::new(),
            bots: HashMap::new(),
            oracle,
            events: Vec::new(),
        }
    }

    pub fn now(&self) -> f64 {
        self.clock
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut EntityRegistry {
        &mut self.registry
    }

    pub fn projectile_count(&self) -> usize {
        self.projectiles.len()
    }

    // ------------------------------------------------------------------
    // Spawning and lifecycle
    // ------------------------------------------------------------------

    /// Registers a player combatant. The team is the owning client id, so
    /// two clients never share a team unless assigned one explicitly.
    pub fn spawn_player(&mut self, id: EntityId) {
        self.registry.register(id, id as i32, DEFAULT_MAX_HEALTH);
        if let Some(c) = self.registry.get_mut(id) {
            c.position = respawn::spawn_point_for(id);
        }
        self.arsenals.insert(id, Arsenal::new(WeaponKind::Pistol));
    }

    /// Registers an AI combatant on the shared AI faction team.
    pub fn spawn_bot(&mut self, id: EntityId, aim_inaccuracy: f32) {
        self.registry.register(id, TEAM_AI, DEFAULT_MAX_HEALTH);
        if let Some(c) = self.registry.get_mut(id) {
            c.position = respawn::spawn_point_for(id);
        }
        self.arsenals.insert(id, Arsenal::new(WeaponKind::Rifle));
        self.bots.insert(id, BotBrain::new(id, aim_inaccuracy));
        info!("Spawned bot {}", id);
    }

    /// Removes a combatant and everything hanging off it, including its
    /// in-flight projectiles and pending timers.
    pub fn despawn(&mut self, id: EntityId) {
        self.registry.remove(id);
        self.arsenals.remove(&id);
        self.bots.remove(&id);
        self.respawns.cancel(id);
        self.pulses.forget(id);
        self.projectiles.remove_owned(id);
    }

    /// Accepts an owner-reported position. Dead combatants are ignored;
    /// their colliders are off until the respawn teleport.
    pub fn update_position(&mut self, id: EntityId, position: Vec3) {
        if let Some(c) = self.registry.get_mut(id) {
            if !c.is_dead {
                c.position = position;
            }
        }
    }

    // ------------------------------------------------------------------
    // Request gateway
    // ------------------------------------------------------------------

    /// Validates and executes a fire intent. Only this process spawns
    /// projectiles; whatever the requester predicted locally stays cosmetic.
    pub fn request_fire(
        &mut self,
        requester: EntityId,
        origin: Vec3,
        direction: Vec3,
    ) -> FireOutcome {
        let now = self.clock;

        let Some(combatant) = self.registry.get(requester) else {
            return FireOutcome::Rejected(FireRejection::UnknownRequester);
        };
        if combatant.is_dead {
            return FireOutcome::Rejected(FireRejection::Dead);
        }
        if combatant.shield.active {
            return FireOutcome::Rejected(FireRejection::ShieldUp);
        }
        let team = combatant.team;
        let body = combatant.position;

        let direction = direction.normalize();
        if direction == Vec3::ZERO {
            return FireOutcome::Rejected(FireRejection::BadDirection);
        }
        let origin = if origin.distance(&body) > MAX_FIRE_ORIGIN_DRIFT {
            body
        } else {
            origin
        };

        let Some(arsenal) = self.arsenals.get_mut(&requester) else {
            warn!("Combatant {} has no weapon configuration; fire refused", requester);
            return FireOutcome::Rejected(FireRejection::NoWeapon);
        };

        match arsenal.try_begin_fire(now) {
            Err(FireRejection::Empty) => {
                self.events.push(OutboundEvent::owner(
                    requester,
                    CombatEvent::EmptyClick { shooter: requester },
                ));
                FireOutcome::Rejected(FireRejection::Empty)
            }
            Err(reason) => {
                debug!("Fire request from {} rejected: {:?}", requester, reason);
                FireOutcome::Rejected(reason)
            }
            Ok(spec) => {
                let projectile = self.projectiles.spawn(
                    requester,
                    team,
                    origin,
                    direction,
                    spec.bullet_speed,
                    spec.damage,
                    now,
                    &mut self.events,
                );
                // The requester already played its own muzzle effect locally
                self.events.push(OutboundEvent::all_except(
                    requester,
                    CombatEvent::MuzzleFlash { shooter: requester },
                ));
                FireOutcome::Fired { projectile }
            }
        }
    }

    pub fn request_reload(&mut self, requester: EntityId) -> bool {
        if !self.registry.contains(requester) {
            return false;
        }
        let now = self.clock;
        self.arsenals
            .get_mut(&requester)
            .map(|a| a.start_reload(now))
            .unwrap_or(false)
    }

    pub fn request_respawn(&mut self, requester: EntityId, ignore_alive_check: bool) -> bool {
        self.respawns.request(
            &self.registry,
            requester,
            ignore_alive_check,
            self.clock,
            &mut self.events,
        )
    }

    pub fn request_shield(&mut self, requester: EntityId) -> bool {
        shield::request_shield(&mut self.registry, requester, self.clock)
    }

    pub fn request_pulse(&mut self, requester: EntityId) -> bool {
        self.pulses.request(&self.registry, requester, self.clock)
    }

    pub fn switch_weapon(&mut self, requester: EntityId, weapon: WeaponKind) -> bool {
        self.arsenals
            .get_mut(&requester)
            .map(|a| a.switch_to(weapon))
            .unwrap_or(false)
    }

    /// Direct damage entry point for embedding code and tests; projectiles
    /// and pulses go through the same resolver.
    pub fn apply_damage(
        &mut self,
        target: EntityId,
        amount: f32,
        instigator_team: i32,
        instigator: Option<EntityId>,
        hit_position: Vec3,
    ) -> damage::DamageOutcome {
        damage::apply_damage(
            &mut self.registry,
            target,
            amount,
            instigator_team,
            instigator,
            hit_position,
            self.clock,
            &mut self.events,
        )
    }

    pub fn heal(&mut self, target: EntityId, amount: f32) -> bool {
        damage::heal(&mut self.registry, target, amount)
    }

    // ------------------------------------------------------------------
    // Simulation
    // ------------------------------------------------------------------

    /// Points every bot at the nearest living non-AI combatant in range.
    /// This is the embedding loop's targeting policy, not bot perception.
    pub fn assign_bot_targets(&mut self) {
        for brain in self.bots.values_mut() {
            let Some(me) = self.registry.get(brain.id) else {
                continue;
            };
            if me.is_dead {
                brain.set_target(None);
                continue;
            }

            let target = self
                .registry
                .iter()
                .filter(|c| c.team != TEAM_AI && !c.is_dead)
                .map(|c| (c.id, c.position.distance(&me.position)))
                .filter(|(_, d)| *d <= BOT_ENGAGE_RANGE)
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(id, _)| id);
            brain.set_target(target);
        }
    }

    /// Advances the simulation one fixed step.
    pub fn step(&mut self, dt: f32) {
        self.clock += dt as f64;
        self.tick += 1;
        let now = self.clock;

        // Elapsed reload deadlines transfer ammo atomically here
        for arsenal in self.arsenals.values_mut() {
            arsenal.tick(now);
        }

        shield::tick_shields(&mut self.registry, now);
        self.pulses
            .tick(&mut self.registry, now, &mut self.events);

        // Bots produce intents first, then fire through the same gateway
        let mut intents = Vec::new();
        for brain in self.bots.values_mut() {
            if let Some(arsenal) = self.arsenals.get_mut(&brain.id) {
                if let Some(intent) = brain.think(&self.registry, arsenal, now) {
                    intents.push((brain.id, intent));
                }
            }
        }
        for (id, intent) in intents {
            self.request_fire(id, intent.origin, intent.direction);
        }

        self.projectiles.tick(
            &mut self.registry,
            self.oracle.as_ref(),
            dt,
            now,
            &mut self.events,
        );

        // Bots queue their own respawns; players ask over the wire
        let dead_bots: Vec<EntityId> = self
            .bots
            .keys()
            .copied()
            .filter(|id| {
                self.registry.get(*id).map(|c| c.is_dead).unwrap_or(false)
                    && !self.respawns.is_pending(*id)
            })
            .collect();
        for id in dead_bots {
            self.respawns
                .request(&self.registry, id, false, now, &mut self.events);
        }

        let revived = self.respawns.tick(&mut self.registry, now, &mut self.events);
        for id in revived {
            if let Some(arsenal) = self.arsenals.get_mut(&id) {
                arsenal.reset_timers(now);
            }
        }
    }

    /// Takes this tick's outbound events, in application order.
    pub fn drain_events(&mut self) -> Vec<OutboundEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> (Vec<CombatantSnapshot>, Vec<ProjectileSnapshot>) {
        let combatants = self
            .registry
            .iter()
            .map(|c| {
                let arsenal = self.arsenals.get(&c.id);
                CombatantSnapshot {
                    id: c.id,
                    team: c.team,
                    position: c.position,
                    current_health: c.current_health,
                    max_health: c.max_health,
                    is_dead: c.is_dead,
                    shield_active: c.shield.active,
                    shield_remaining: c.shield.remaining,
                    kills: c.kills,
                    score: c.score,
                    weapon: arsenal.map(|a| a.active()).unwrap_or(WeaponKind::Pistol),
                    mag: arsenal.map(|a| a.mag()).unwrap_or(0),
                    reserve: arsenal.map(|a| a.reserve()).unwrap_or(0),
                }
            })
            .collect();
        (combatants, self.projectiles.snapshot())
    }

    /// Credits a kill directly; exposed for embedding code that resolves
    /// deaths outside the resolver (despawn-on-fall and similar).
    pub fn award_kill(&mut self, victim: EntityId) -> Option<EntityId> {
        score::award_kill(&mut self.registry, victim)
    }
}
