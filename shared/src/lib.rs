pub mod math;
pub mod protocol;
pub mod weapons;

pub use math::Vec3;
pub use protocol::{CombatEvent, CombatantSnapshot, Packet, ProjectileSnapshot};
pub use weapons::{WeaponKind, WeaponSpec};

/// Stable network identity shared by players, bots and projectiles.
pub type EntityId = u64;

pub const PROTOCOL_VERSION: u32 = 1;

/// Team value for combatants that have not been assigned yet.
pub const TEAM_UNASSIGNED: i32 = -1;
/// Team value reserved for AI-controlled combatants.
pub const TEAM_AI: i32 = -2;

pub const DEFAULT_MAX_HEALTH: f32 = 100.0;
pub const POINTS_PER_KILL: u32 = 100;

/// Seconds between death and the respawn teleport.
pub const RESPAWN_DELAY_SECS: f64 = 3.0;
/// Health resets are refused this long after death to stop resurrection races.
pub const DEATH_GRACE_WINDOW_SECS: f64 = 2.0;

pub const PROJECTILE_LIFETIME_SECS: f64 = 5.0;
/// Radius of the sphere swept against combatants during hit resolution.
pub const COMBATANT_HIT_RADIUS: f32 = 0.75;

pub const SHIELD_CAPACITY: f32 = 50.0;
pub const SHIELD_DURATION_SECS: f64 = 5.0;
pub const SHIELD_COOLDOWN_SECS: f64 = 10.0;
/// Hard cap on how long any shield stays up, regardless of mode.
pub const SHIELD_MAX_LIFETIME_SECS: f64 = 7.0;

pub const PULSE_DAMAGE: f32 = 40.0;
pub const PULSE_RADIUS: f32 = 8.0;
pub const PULSE_CAST_SECS: f64 = 0.5;
pub const PULSE_COOLDOWN_SECS: f64 = 15.0;

pub const SPAWN_POINT_A: Vec3 = Vec3 {
    x: 87.0,
    y: 1.5,
    z: 115.0,
};
pub const SPAWN_POINT_B: Vec3 = Vec3 {
    x: 87.0,
    y: 1.5,
    z: 175.0,
};
