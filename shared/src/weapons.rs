use serde::{Deserialize, Serialize};

/// The static weapon table. Stats are read-only input to the fire gateway;
/// nothing in the combat core mutates them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponSpec {
    pub display_name: &'static str,
    /// Holding the trigger keeps firing when true.
    pub automatic: bool,
    pub damage: f32,
    pub bullet_speed: f32,
    /// Minimum seconds between two accepted shots.
    pub fire_interval: f64,
    pub max_aim_distance: f32,
    pub mag_size: u32,
    pub starting_reserve: u32,
    pub reload_time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponKind {
    Pistol,
    Rifle,
}

pub const PISTOL: WeaponSpec = WeaponSpec {
    display_name: "Pistol",
    automatic: false,
    damage: 20.0,
    bullet_speed: 40.0,
    fire_interval: 0.12,
    max_aim_distance: 200.0,
    mag_size: 12,
    starting_reserve: 48,
    reload_time: 1.4,
};

pub const RIFLE: WeaponSpec = WeaponSpec {
    display_name: "Rifle",
    automatic: true,
    damage: 10.0,
    bullet_speed: 40.0,
    fire_interval: 0.1,
    max_aim_distance: 200.0,
    mag_size: 30,
    starting_reserve: 90,
    reload_time: 2.0,
};

impl WeaponKind {
    pub const ALL: [WeaponKind; 2] = [WeaponKind::Pistol, WeaponKind::Rifle];

    pub fn spec(self) -> &'static WeaponSpec {
        match self {
            WeaponKind::Pistol => &PISTOL,
            WeaponKind::Rifle => &RIFLE,
        }
    }
}
