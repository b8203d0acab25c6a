//! Server-side projectile trajectory and first-hit resolution.
//!
//! Clients only ever receive a cosmetic replication of `origin`/`direction`/
//! `speed`; every hit is resolved here against the authoritative registry.
//! Physics itself is a black box behind [`CollisionOracle`].

use crate::damage;
use crate::events::OutboundEvent;
use crate::registry::EntityRegistry;
use log::debug;
use shared::{
    CombatEvent, EntityId, Vec3, COMBATANT_HIT_RADIUS, PROJECTILE_LIFETIME_SECS,
};

#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: EntityId,
    /// Provenance, set at spawn and immutable afterward.
    pub owner: EntityId,
    pub owner_team: i32,
    pub position: Vec3,
    pub velocity: Vec3,
    pub damage: f32,
    pub expires_at: f64,
    has_resolved: bool,
}

impl Projectile {
    /// Claims this projectile for resolution. Returns false if it already
    /// resolved, so near-simultaneous collision signals apply damage at most
    /// once.
    pub fn try_resolve(&mut self) -> bool {
        if self.has_resolved {
            false
        } else {
            self.has_resolved = true;
            true
        }
    }

    pub fn has_resolved(&self) -> bool {
        self.has_resolved
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContactKind {
    /// The root entity of whatever surface was struck.
    Combatant(EntityId),
    Surface {
        pass_through: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub kind: ContactKind,
    pub point: Vec3,
}

/// Black-box collision query: first contact along the swept segment,
/// skipping the projectile's own shooter.
pub trait CollisionOracle {
    fn first_hit(
        &self,
        registry: &EntityRegistry,
        from: Vec3,
        to: Vec3,
        shooter: EntityId,
    ) -> Option<Contact>;
}

/// Axis-aligned blocker; pass-through surfaces never stop a projectile.
#[derive(Debug, Clone)]
pub struct Obstacle {
    pub min: Vec3,
    pub max: Vec3,
    pub pass_through: bool,
}

impl Obstacle {
    pub fn contains(&self, p: &Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }
}

/// Default oracle: samples the swept segment against combatant hit spheres
/// and static obstacles.
#[derive(Debug, Default)]
pub struct StaticGeometry {
    pub obstacles: Vec<Obstacle>,
}

impl StaticGeometry {
    pub fn open_arena() -> Self {
        // A ground slab so stray downward shots terminate instead of flying
        // for their whole lifetime.
        Self {
            obstacles: vec![Obstacle {
                min: Vec3::new(-1000.0, -100.0, -1000.0),
                max: Vec3::new(1000.0, 0.0, 1000.0),
                pass_through: false,
            }],
        }
    }
}

/// Samples needed so a fast projectile cannot tunnel through a hit sphere
/// between two consecutive samples.
fn required_substeps(step_len: f32) -> u32 {
    const SAFETY_FACTOR: f32 = 0.5;

    let max_movement_per_step = COMBATANT_HIT_RADIUS * SAFETY_FACTOR;
    if step_len > max_movement_per_step {
        (step_len / max_movement_per_step).ceil() as u32
    } else {
        1
    }
}

impl CollisionOracle for StaticGeometry {
    fn first_hit(
        &self,
        registry: &EntityRegistry,
        from: Vec3,
        to: Vec3,
        shooter: EntityId,
    ) -> Option<Contact> {
        let step = to.sub(&from);
        let substeps = required_substeps(step.magnitude());

        for i in 1..=substeps {
            let t = i as f32 / substeps as f32;
            let point = from.add(&step.scale(t));

            for combatant in registry.iter() {
                // Dead bodies have their colliders toggled off
                if combatant.id == shooter || combatant.is_dead {
                    continue;
                }
                if combatant.position.distance(&point) <= COMBATANT_HIT_RADIUS {
                    return Some(Contact {
                        kind: ContactKind::Combatant(combatant.id),
                        point,
                    });
                }
            }

            for obstacle in &self.obstacles {
                if obstacle.pass_through {
                    continue;
                }
                if obstacle.contains(&point) {
                    return Some(Contact {
                        kind: ContactKind::Surface { pass_through: false },
                        point,
                    });
                }
            }
        }

        None
    }
}

/// All in-flight projectiles, owned by the authoritative world.
#[derive(Debug)]
pub struct ProjectileSet {
    projectiles: Vec<Projectile>,
    next_id: EntityId,
}

impl ProjectileSet {
    pub fn new() -> Self {
        Self {
            projectiles: Vec::new(),
            next_id: 1,
        }
    }

    /// Spawns a projectile and emits its cosmetic replication event.
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        &mut self,
        owner: EntityId,
        owner_team: i32,
        origin: Vec3,
        direction: Vec3,
        speed: f32,
        damage: f32,
        now: f64,
        events: &mut Vec<OutboundEvent>,
    ) -> EntityId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);

        self.projectiles.push(Projectile {
            id,
            owner,
            owner_team,
            position: origin,
            velocity: direction.scale(speed),
            damage,
            expires_at: now + PROJECTILE_LIFETIME_SECS,
            has_resolved: false,
        });

        events.push(OutboundEvent::all(CombatEvent::ProjectileSpawn {
            id,
            owner,
            origin,
            direction,
            speed,
        }));

        id
    }

    /// Advances every projectile one tick: sweep, resolve the first valid
    /// contact, despawn on hit or timeout.
    pub fn tick(
        &mut self,
        registry: &mut EntityRegistry,
        oracle: &dyn CollisionOracle,
        dt: f32,
        now: f64,
        events: &mut Vec<OutboundEvent>,
    ) {
        for p in &mut self.projectiles {
            if p.has_resolved {
                continue;
            }

            let from = p.position;
            let to = from.add(&p.velocity.scale(dt));

            match oracle.first_hit(registry, from, to, p.owner) {
                Some(Contact {
                    kind: ContactKind::Combatant(hit),
                    point,
                }) => {
                    if !p.try_resolve() {
                        continue;
                    }
                    // The oracle skips the shooter, but a scripted or buggy
                    // oracle must not produce self-damage either: exact
                    // owner identity, not team, decides.
                    if hit != p.owner {
                        damage::apply_damage(
                            registry,
                            hit,
                            p.damage,
                            p.owner_team,
                            Some(p.owner),
                            point,
                            now,
                            events,
                        );
                    } else {
                        debug!("Projectile {} ignored contact with its shooter", p.id);
                    }
                }
                Some(Contact {
                    kind: ContactKind::Surface { pass_through: true },
                    ..
                })
                | None => {
                    p.position = to;
                }
                Some(Contact {
                    kind: ContactKind::Surface { pass_through: false },
                    ..
                }) => {
                    // Terminal surface: no combatant record, no damage, but
                    // the projectile is consumed.
                    p.try_resolve();
                }
            }
        }

        self.projectiles
            .retain(|p| !p.has_resolved && now < p.expires_at);
    }

    /// Drops every projectile fired by `owner`, e.g. on disconnect.
    pub fn remove_owned(&mut self, owner: EntityId) {
        self.projectiles.retain(|p| p.owner != owner);
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Projectile> {
        self.projectiles.iter_mut().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.projectiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projectiles.is_empty()
    }

    pub fn snapshot(&self) -> Vec<shared::ProjectileSnapshot> {
        self.projectiles
            .iter()
            .map(|p| shared::ProjectileSnapshot {
                id: p.id,
                position: p.position,
                velocity: p.velocity,
            })
            .collect()
    }
}
