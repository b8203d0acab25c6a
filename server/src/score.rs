//! Kill attribution: credits the correct actor exactly once per death.

use crate::registry::EntityRegistry;
use log::info;
use shared::{EntityId, POINTS_PER_KILL};

/// Awards a kill to the victim's last instigator. The instigator record is
/// taken off the victim either way, so a later death can never double-credit.
/// Self-kills and missing instigators award nothing.
pub fn award_kill(registry: &mut EntityRegistry, victim: EntityId) -> Option<EntityId> {
    let instigator = registry.get_mut(victim)?.last_instigator.take()?;
    if instigator == victim {
        return None;
    }

    let killer = registry.get_mut(instigator)?;
    killer.kills += 1;
    killer.score += POINTS_PER_KILL;
    info!(
        "Combatant {} killed {} ({} kills, {} points)",
        instigator, victim, killer.kills, killer.score
    );
    Some(instigator)
}
