//! Per-combatant weapon state for the fire-request gateway.
//!
//! Ammo pools are tracked per weapon so switching back to a half-empty
//! magazine finds it exactly as it was left. Every timer is a deadline on
//! the server's simulation clock — a client fiddling with its local time
//! scale cannot shorten a cooldown or a reload.

use shared::{WeaponKind, WeaponSpec};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmmoPool {
    pub mag: u32,
    pub reserve: u32,
}

/// Why a fire request was refused. Each precondition gets its own reason so
/// callers can pick the right cosmetic (or log line) without guessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireRejection {
    /// No weapon configuration resolvable for the requester. Fatal-class:
    /// firing is refused rather than guessed.
    NoWeapon,
    /// Requester has no combatant record.
    UnknownRequester,
    Dead,
    /// Own shield is raised; weapons stay holstered behind it.
    ShieldUp,
    /// Direction did not normalize to a usable aim vector.
    BadDirection,
    Reloading,
    /// Magazine empty: triggers the empty-click cosmetic instead of a shot.
    Empty,
    /// Fire-rate cooldown since the last accepted shot has not elapsed.
    Cooling,
}

#[derive(Debug)]
pub struct Arsenal {
    active: WeaponKind,
    pools: HashMap<WeaponKind, AmmoPool>,
    /// Earliest time the next shot is accepted.
    next_fire_at: f64,
    /// Deadline of the in-flight reload, if any. Ammo moves only when it
    /// elapses; there is no partial state during the timer.
    reload_done_at: Option<f64>,
}

impl Arsenal {
    pub fn new(active: WeaponKind) -> Self {
        let pools = WeaponKind::ALL
            .iter()
            .map(|kind| {
                let spec = kind.spec();
                (
                    *kind,
                    AmmoPool {
                        mag: spec.mag_size,
                        reserve: spec.starting_reserve,
                    },
                )
            })
            .collect();

        Self {
            active,
            pools,
            next_fire_at: 0.0,
            reload_done_at: None,
        }
    }

    pub fn active(&self) -> WeaponKind {
        self.active
    }

    pub fn pool(&self, kind: WeaponKind) -> AmmoPool {
        self.pools.get(&kind).copied().unwrap_or(AmmoPool {
            mag: 0,
            reserve: 0,
        })
    }

    pub fn mag(&self) -> u32 {
        self.pool(self.active).mag
    }

    pub fn reserve(&self) -> u32 {
        self.pool(self.active).reserve
    }

    pub fn is_reloading(&self) -> bool {
        self.reload_done_at.is_some()
    }

    /// Validates the ammo/cooldown preconditions and, on success, consumes
    /// one round and arms the fire-rate cooldown. A magazine that runs dry
    /// with reserve left starts its reload immediately.
    pub fn try_begin_fire(&mut self, now: f64) -> Result<&'static WeaponSpec, FireRejection> {
        if self.reload_done_at.is_some() {
            return Err(FireRejection::Reloading);
        }

        let spec = self.active.spec();
        if now < self.next_fire_at {
            return Err(FireRejection::Cooling);
        }

        let pool = self.pools.get_mut(&self.active).ok_or(FireRejection::NoWeapon)?;
        if pool.mag == 0 {
            return Err(FireRejection::Empty);
        }

        pool.mag -= 1;
        let ran_dry = pool.mag == 0 && pool.reserve > 0;
        self.next_fire_at = now + spec.fire_interval;

        if ran_dry {
            self.start_reload(now);
        }

        Ok(spec)
    }

    /// Begins a reload. Idempotent while one is in flight; refused when the
    /// magazine is already full or the reserve is empty.
    pub fn start_reload(&mut self, now: f64) -> bool {
        if self.reload_done_at.is_some() {
            return false;
        }

        let spec = self.active.spec();
        let pool = self.pool(self.active);
        if pool.mag >= spec.mag_size || pool.reserve == 0 {
            return false;
        }

        self.reload_done_at = Some(now + spec.reload_time);
        true
    }

    /// Completes an elapsed reload: transfers `min(reserve, mag_size - mag)`
    /// rounds in one step. Returns true when a reload finished this tick.
    pub fn tick(&mut self, now: f64) -> bool {
        let Some(done_at) = self.reload_done_at else {
            return false;
        };
        if now < done_at {
            return false;
        }

        let spec = self.active.spec();
        if let Some(pool) = self.pools.get_mut(&self.active) {
            let needed = spec.mag_size.saturating_sub(pool.mag);
            let to_load = needed.min(pool.reserve);
            pool.mag += to_load;
            pool.reserve -= to_load;
        }
        self.reload_done_at = None;
        true
    }

    /// Switches the active weapon, cancelling any reload in flight. The
    /// abandoned weapon keeps its pool untouched.
    pub fn switch_to(&mut self, kind: WeaponKind) -> bool {
        if kind == self.active {
            return false;
        }
        self.active = kind;
        self.reload_done_at = None;
        true
    }

    pub fn add_reserve(&mut self, kind: WeaponKind, rounds: u32) {
        if let Some(pool) = self.pools.get_mut(&kind) {
            pool.reserve = pool.reserve.saturating_add(rounds);
        }
    }

    /// Clears cooldown and reload state, e.g. after a respawn.
    pub fn reset_timers(&mut self, now: f64) {
        self.next_fire_at = now;
        self.reload_done_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_arsenal_is_fully_stocked() {
        let arsenal = Arsenal::new(WeaponKind::Pistol);
        assert_eq!(arsenal.mag(), 12);
        assert_eq!(arsenal.reserve(), 48);
        assert_eq!(arsenal.pool(WeaponKind::Rifle).mag, 30);
        assert!(!arsenal.is_reloading());
    }

    #[test]
    fn test_fire_consumes_one_round() {
        let mut arsenal = Arsenal::new(WeaponKind::Pistol);

        let spec = arsenal.try_begin_fire(0.0).unwrap();
        assert_eq!(spec.damage, 20.0);
        assert_eq!(arsenal.mag(), 11);
    }

    #[test]
    fn test_cooldown_rejects_rapid_fire() {
        let mut arsenal = Arsenal::new(WeaponKind::Pistol);

        assert!(arsenal.try_begin_fire(0.0).is_ok());
        // 0.01 s later with a 0.12 s interval: refused, magazine unchanged
        assert_eq!(arsenal.try_begin_fire(0.01), Err(FireRejection::Cooling));
        assert_eq!(arsenal.mag(), 11);

        assert!(arsenal.try_begin_fire(0.12).is_ok());
        assert_eq!(arsenal.mag(), 10);
    }

    #[test]
    fn test_empty_magazine_rejects() {
        let mut arsenal = Arsenal::new(WeaponKind::Pistol);
        arsenal.pools.get_mut(&WeaponKind::Pistol).unwrap().mag = 0;
        arsenal.pools.get_mut(&WeaponKind::Pistol).unwrap().reserve = 0;

        assert_eq!(arsenal.try_begin_fire(0.0), Err(FireRejection::Empty));
    }

    #[test]
    fn test_reload_blocks_fire_until_deadline() {
        let mut arsenal = Arsenal::new(WeaponKind::Pistol);
        arsenal.pools.get_mut(&WeaponKind::Pistol).unwrap().mag = 3;

        assert!(arsenal.start_reload(0.0));
        assert_eq!(arsenal.try_begin_fire(0.5), Err(FireRejection::Reloading));
        // No partial transfer while the timer runs
        assert_eq!(arsenal.mag(), 3);

        assert!(!arsenal.tick(1.0));
        assert!(arsenal.tick(1.4));
        assert_eq!(arsenal.mag(), 12);
        assert_eq!(arsenal.reserve(), 48 - 9);
        assert!(arsenal.try_begin_fire(1.4).is_ok());
    }

    #[test]
    fn test_reload_is_idempotent_while_in_flight() {
        let mut arsenal = Arsenal::new(WeaponKind::Pistol);
        arsenal.pools.get_mut(&WeaponKind::Pistol).unwrap().mag = 3;

        assert!(arsenal.start_reload(0.0));
        // Duplicate request must not restart the timer
        assert!(!arsenal.start_reload(1.0));
        assert!(arsenal.tick(1.4));
        assert_eq!(arsenal.mag(), 12);
    }

    #[test]
    fn test_reload_refused_when_full_or_dry() {
        let mut arsenal = Arsenal::new(WeaponKind::Pistol);
        assert!(!arsenal.start_reload(0.0));

        let pool = arsenal.pools.get_mut(&WeaponKind::Pistol).unwrap();
        pool.mag = 0;
        pool.reserve = 0;
        assert!(!arsenal.start_reload(0.0));
    }

    #[test]
    fn test_last_round_triggers_auto_reload() {
        let mut arsenal = Arsenal::new(WeaponKind::Pistol);
        arsenal.pools.get_mut(&WeaponKind::Pistol).unwrap().mag = 1;

        assert!(arsenal.try_begin_fire(0.0).is_ok());
        assert!(arsenal.is_reloading());
    }

    #[test]
    fn test_partial_reserve_loads_what_is_left() {
        let mut arsenal = Arsenal::new(WeaponKind::Pistol);
        let pool = arsenal.pools.get_mut(&WeaponKind::Pistol).unwrap();
        pool.mag = 2;
        pool.reserve = 4;

        arsenal.start_reload(0.0);
        arsenal.tick(2.0);
        assert_eq!(arsenal.mag(), 6);
        assert_eq!(arsenal.reserve(), 0);
    }

    #[test]
    fn test_switch_preserves_pools_and_cancels_reload() {
        let mut arsenal = Arsenal::new(WeaponKind::Pistol);
        arsenal.pools.get_mut(&WeaponKind::Pistol).unwrap().mag = 5;
        arsenal.start_reload(0.0);

        assert!(arsenal.switch_to(WeaponKind::Rifle));
        assert!(!arsenal.is_reloading());
        assert_eq!(arsenal.mag(), 30);

        // The abandoned reload never transferred anything
        arsenal.switch_to(WeaponKind::Pistol);
        assert_eq!(arsenal.mag(), 5);
    }

    #[test]
    fn test_switch_to_same_weapon_is_noop() {
        let mut arsenal = Arsenal::new(WeaponKind::Rifle);
        assert!(!arsenal.switch_to(WeaponKind::Rifle));
    }

    #[test]
    fn test_add_reserve() {
        let mut arsenal = Arsenal::new(WeaponKind::Pistol);
        arsenal.add_reserve(WeaponKind::Pistol, 24);
        assert_eq!(arsenal.reserve(), 72);
    }

    #[test]
    fn test_reset_timers_clears_cooldown_and_reload() {
        let mut arsenal = Arsenal::new(WeaponKind::Pistol);
        assert!(arsenal.try_begin_fire(0.0).is_ok());
        arsenal.pools.get_mut(&WeaponKind::Pistol).unwrap().mag = 1;
        arsenal.start_reload(0.0);

        arsenal.reset_timers(0.05);
        assert!(!arsenal.is_reloading());
        assert!(arsenal.try_begin_fire(0.05).is_ok());
    }
}
