//! Performance benchmarks for critical combat systems

use server::projectile::StaticGeometry;
use server::world::World;
use shared::{Packet, Vec3};
use std::time::Instant;

fn crowded_world(players: u64) -> World {
    let mut world = World::new(Box::new(StaticGeometry::default()));
    for i in 1..=players {
        world.spawn_player(i);
        world.update_position(
            i,
            Vec3::new((i % 10) as f32 * 5.0, 0.0, (i / 10) as f32 * 5.0),
        );
    }
    world
}

/// Benchmarks the damage resolver
#[test]
fn benchmark_damage_resolution() {
    let mut world = crowded_world(2);

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        world.apply_damage(1, 10.0, 2, Some(2), Vec3::ZERO);
        world.heal(1, 10.0);
        world.drain_events();
    }

    let duration = start.elapsed();
    println!(
        "Damage resolution: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    // Should complete in well under a second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks projectile sweeps against a populated registry
#[test]
fn benchmark_projectile_ticks() {
    let mut world = crowded_world(16);

    // A volley that flies over everyone's head
    for _ in 0..32 {
        world.request_fire(1, Vec3::new(0.0, 20.0, 0.0), Vec3::new(0.0, 1.0, 0.0));
        world.step(0.2);
    }

    let dt = 1.0 / 30.0;
    let iterations = 1000;
    let start = Instant::now();

    for _ in 0..iterations {
        world.step(dt);
        world.drain_events();
    }

    let duration = start.elapsed();
    println!(
        "World step with projectiles: {} frames in {:?} ({:.2} µs/frame)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 5 seconds
    assert!(duration.as_millis() < 5000);
}

/// Benchmarks snapshot serialization for a full server
#[test]
fn benchmark_snapshot_serialization() {
    use bincode::{deserialize, serialize};

    let world = crowded_world(16);
    let (combatants, projectiles) = world.snapshot();
    let packet = Packet::Snapshot {
        tick: 12345,
        timestamp: 1234567890,
        combatants,
        projectiles,
    };

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let serialized = serialize(&packet).unwrap();
        let _: Packet = deserialize(&serialized).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Snapshot roundtrip: {} iterations in {:?} ({:.2} µs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 2000);
}

/// Benchmarks a sustained firefight with bots, respawns and events
#[test]
fn benchmark_sustained_firefight() {
    let mut world = crowded_world(4);
    for i in 0..4u64 {
        world.spawn_bot(server::bots::BOT_ID_BASE + i, 1.5);
        world.update_position(
            server::bots::BOT_ID_BASE + i,
            Vec3::new(i as f32 * 3.0, 0.0, 20.0),
        );
    }

    let dt = 1.0 / 30.0;
    let frames = 30 * 60; // one simulated minute
    let start = Instant::now();

    for _ in 0..frames {
        world.assign_bot_targets();
        world.step(dt);
        world.drain_events();
    }

    let duration = start.elapsed();
    println!(
        "Sustained firefight: {} frames in {:?} ({:.2} µs/frame)",
        frames,
        duration,
        duration.as_micros() as f64 / frames as f64
    );

    // A simulated minute should take far less than a real one
    assert!(duration.as_secs() < 10);
}
