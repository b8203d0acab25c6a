//! Damage resolver: the single choke-point for all health mutation.
//!
//! Every invariant lives here: dead combatants take no damage, shield
//! absorption runs before the friendly-fire check, health stays in
//! `[0, max_health]`, and the death transition fires exactly once per life.

use crate::events::OutboundEvent;
use crate::registry::EntityRegistry;
use crate::score;
use shared::{CombatEvent, EntityId, Vec3, DEATH_GRACE_WINDOW_SECS, TEAM_UNASSIGNED};

/// Residual amounts at or below this are treated as fully absorbed.
const ABSORBED_EPSILON: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageOutcome {
    /// Nothing happened: unknown target, dead target, zero amount or
    /// friendly fire. No record of the hit is kept.
    Ignored,
    /// The shield consumed the whole amount; health untouched.
    Absorbed,
    /// Health was reduced by the contained amount.
    Damaged(f32),
    /// Health reached zero and the death transition ran.
    Killed(f32),
}

/// Applies damage to `target`, honoring shield absorption, friendly fire and
/// the death transition. `instigator` is the entity credited on a kill;
/// `None` means environmental damage with no attribution.
pub fn apply_damage(
    registry: &mut EntityRegistry,
    target: EntityId,
    raw_amount: f32,
    instigator_team: i32,
    instigator: Option<EntityId>,
    hit_position: Vec3,
    now: f64,
    events: &mut Vec<OutboundEvent>,
) -> DamageOutcome {
    let Some(combatant) = registry.get_mut(target) else {
        return DamageOutcome::Ignored;
    };
    if combatant.is_dead {
        return DamageOutcome::Ignored;
    }

    let amount = raw_amount.clamp(0.0, combatant.max_health * 2.0);
    if amount <= 0.0 {
        return DamageOutcome::Ignored;
    }

    // Shield first; the friendly-fire check below applies to the residual.
    let residual = combatant.shield.absorb(amount);
    if residual <= ABSORBED_EPSILON {
        return DamageOutcome::Absorbed;
    }

    if combatant.team != TEAM_UNASSIGNED
        && instigator_team != TEAM_UNASSIGNED
        && combatant.team == instigator_team
    {
        return DamageOutcome::Ignored;
    }

    combatant.last_instigator = instigator;

    let old_health = combatant.current_health;
    let new_health = (old_health - residual).max(0.0);
    if (old_health - new_health).abs() <= f32::EPSILON {
        return DamageOutcome::Ignored;
    }
    combatant.current_health = new_health;

    events.push(OutboundEvent::all(CombatEvent::Damage {
        target,
        amount: residual,
        source_position: hit_position,
        is_crit: false,
    }));

    if new_health <= ABSORBED_EPSILON {
        combatant.current_health = 0.0;
        combatant.is_dead = true;
        combatant.died_at = now;
        let killer = combatant.last_instigator;

        score::award_kill(registry, target);
        events.push(OutboundEvent::all(CombatEvent::Death { target, killer }));
        return DamageOutcome::Killed(residual);
    }

    DamageOutcome::Damaged(residual)
}

/// Restores health, capped at `max_health`. Dead combatants cannot be healed.
pub fn heal(registry: &mut EntityRegistry, target: EntityId, amount: f32) -> bool {
    let Some(combatant) = registry.get_mut(target) else {
        return false;
    };
    if combatant.is_dead {
        return false;
    }

    let amount = amount.clamp(0.0, combatant.max_health * 2.0);
    if amount <= 0.0 {
        return false;
    }

    combatant.current_health = (combatant.current_health + amount).min(combatant.max_health);
    true
}

/// Clears the dead flag and restores full health. Refused inside the
/// post-death grace window so delayed reset calls cannot resurrect a
/// combatant the instant it died.
pub fn reset_full(registry: &mut EntityRegistry, target: EntityId, now: f64) -> bool {
    let Some(combatant) = registry.get_mut(target) else {
        return false;
    };
    if combatant.is_dead && now < combatant.died_at + DEATH_GRACE_WINDOW_SECS {
        return false;
    }

    combatant.is_dead = false;
    combatant.current_health = combatant.max_health;
    combatant.last_instigator = None;
    true
}
