use crate::math::Vec3;
use crate::weapons::WeaponKind;
use crate::EntityId;
use serde::{Deserialize, Serialize};

/// Wire messages exchanged between the authority and its observers.
///
/// The first group travels client → authority and carries *requests*: the
/// authority re-validates every precondition before acting, because requests
/// may arrive late, duplicated, or from a stale client state. The second
/// group travels authority → client and is the only way combat state ever
/// reaches an observer.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Connect {
        client_version: u32,
    },
    Disconnect,
    RequestFire {
        origin: Vec3,
        direction: Vec3,
        /// Cosmetic only; the authority always uses the weapon table speed.
        speed: f32,
    },
    RequestReload,
    RequestRespawn {
        ignore_alive_check: bool,
    },
    RequestShield,
    RequestPulse,
    SwitchWeapon {
        weapon: WeaponKind,
    },
    /// Movement is simulated elsewhere; the authority only needs positions
    /// for hit resolution and area abilities.
    PositionUpdate {
        position: Vec3,
    },

    Connected {
        client_id: EntityId,
    },
    Disconnected {
        reason: String,
    },
    /// Ordered batch of combat events. `seq` increases monotonically per
    /// receiver; events inside a batch are in authority application order.
    Events {
        seq: u64,
        events: Vec<CombatEvent>,
    },
    Snapshot {
        tick: u64,
        timestamp: u64,
        combatants: Vec<CombatantSnapshot>,
        projectiles: Vec<ProjectileSnapshot>,
    },
}

/// Observable side effects of the authoritative combat simulation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum CombatEvent {
    Damage {
        target: EntityId,
        amount: f32,
        source_position: Vec3,
        is_crit: bool,
    },
    Death {
        target: EntityId,
        killer: Option<EntityId>,
    },
    /// Cosmetic replication of a fired projectile; carries no damage
    /// authority on the receiving side.
    ProjectileSpawn {
        id: EntityId,
        owner: EntityId,
        origin: Vec3,
        direction: Vec3,
        speed: f32,
    },
    MuzzleFlash {
        shooter: EntityId,
    },
    EmptyClick {
        shooter: EntityId,
    },
    RespawnCountdown {
        target: EntityId,
        seconds_remaining: u32,
    },
    Teleport {
        target: EntityId,
        position: Vec3,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CombatantSnapshot {
    pub id: EntityId,
    pub team: i32,
    pub position: Vec3,
    pub current_health: f32,
    pub max_health: f32,
    pub is_dead: bool,
    pub shield_active: bool,
    pub shield_remaining: f32,
    pub kills: u32,
    pub score: u32,
    pub weapon: WeaponKind,
    pub mag: u32,
    pub reserve: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProjectileSnapshot {
    pub id: EntityId,
    pub position: Vec3,
    pub velocity: Vec3,
}
