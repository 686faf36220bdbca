//! Scheduler integration tests.
//!
//! Tick gating, the three execution modes, failure containment and the
//! bounds policy, all driven through `FollowScheduler` against a
//! `MemoryWorld`.

use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use rust_follow::core::{
    BoundsPolicy, EntityId, EntitySource, EntityState, ExecutionMode, FollowConfig, Vec2,
};
use rust_follow::modes::FollowMode;
use rust_follow::scheduler::FollowScheduler;
use rust_follow::world::MemoryWorld;

const EPS: f32 = 1e-3;

fn id(n: u64) -> EntityId {
    EntityId(n)
}

fn spawn(world: &mut MemoryWorld, n: u64, x: f32, y: f32) {
    world.spawn(id(n), EntityState::new(Vec2::new(x, y)).with_hit_size(4.0));
}

fn scheduler(execution: ExecutionMode) -> FollowScheduler {
    FollowScheduler::new(FollowConfig::default().with_execution(execution)).unwrap()
}

/// One leader per mode, three followers each.
fn formation_world() -> MemoryWorld {
    let mut world = MemoryWorld::new(4000.0, 4000.0);
    for group in 0..4u64 {
        let base = group * 10 + 1;
        let x = 500.0 + 800.0 * group as f32;
        spawn(&mut world, base, x, 2000.0);
        for k in 1..=3u64 {
            spawn(&mut world, base + k, x + 60.0 * k as f32, 2040.0);
        }
    }
    world
}

fn enlist(scheduler: &mut FollowScheduler, world: &MemoryWorld) {
    for (group, mode) in FollowMode::ALL.iter().enumerate() {
        let base = group as u64 * 10 + 1;
        for k in 1..=3 {
            scheduler
                .registry_mut()
                .follow(id(base), id(base + k), Some(*mode), world)
                .unwrap();
        }
    }
}

// =============================================================================
// Tick Gating
// =============================================================================

#[test]
fn test_empty_registry_does_not_tick() {
    let mut world = formation_world();
    let mut scheduler = scheduler(ExecutionMode::Inline);
    assert!(!scheduler.begin(Instant::now(), &world));
    assert!(scheduler.tick(Instant::now(), &mut world).is_none());
}

#[test]
fn test_interval_gating() {
    let mut world = formation_world();
    let mut scheduler = scheduler(ExecutionMode::Inline);
    enlist(&mut scheduler, &world);

    let t0 = Instant::now();
    assert!(scheduler.tick(t0, &mut world).is_some());
    assert!(scheduler.tick(t0 + Duration::from_millis(10), &mut world).is_none());
    assert!(scheduler.tick(t0 + Duration::from_millis(33), &mut world).is_some());
    assert!(scheduler.tick(t0 + Duration::from_millis(40), &mut world).is_none());
}

#[test]
fn test_no_second_begin_while_in_flight() {
    let mut world = formation_world();
    let mut scheduler = scheduler(ExecutionMode::Inline);
    enlist(&mut scheduler, &world);

    let t0 = Instant::now();
    assert!(scheduler.begin(t0, &world));
    assert!(scheduler.is_in_flight());
    assert!(!scheduler.begin(t0 + Duration::from_secs(1), &world));

    let summary = scheduler.end(&mut world).unwrap();
    assert_eq!(summary.applied, 12);
    assert!(scheduler.end(&mut world).is_none());
}

#[test]
fn test_invalid_config_rejected() {
    let config = FollowConfig::default().with_tick_interval_ms(0);
    assert!(FollowScheduler::new(config).is_err());
}

// =============================================================================
// Execution Modes
// =============================================================================

/// Worker and parallel execution land every follower exactly where inline
/// execution does.
#[test]
fn test_execution_modes_agree() {
    let modes = [
        ExecutionMode::Inline,
        ExecutionMode::Worker,
        ExecutionMode::Parallel,
    ];
    let mut results = Vec::new();

    for execution in modes {
        let mut world = formation_world();
        let mut scheduler = scheduler(execution);
        assert_eq!(scheduler.execution(), execution);
        enlist(&mut scheduler, &world);

        let t0 = Instant::now();
        for step in 0..5u32 {
            let now = t0 + Duration::from_millis(40) * step;
            world.move_to(id(1), Vec2::new(500.0 + 10.0 * step as f32, 2000.0));
            let summary = scheduler.tick(now, &mut world).unwrap();
            assert_eq!(summary.applied, 12);
            assert_eq!(summary.failed, 0);
        }
        scheduler.shutdown(&mut world);

        let positions: Vec<Vec2> = (0..4u64)
            .flat_map(|group| (1..=3).map(move |k| id(group * 10 + 1 + k)))
            .map(|f| world.position(f).unwrap())
            .collect();
        results.push(positions);
    }

    assert_eq!(results[0], results[1]);
    assert_eq!(results[0], results[2]);
}

/// Registry changes made while the worker computes are applied at `end`.
#[test]
fn test_worker_defers_changes() {
    let mut world = formation_world();
    spawn(&mut world, 99, 900.0, 900.0);
    let mut scheduler = scheduler(ExecutionMode::Worker);
    enlist(&mut scheduler, &world);

    assert!(scheduler.begin(Instant::now(), &world));
    scheduler
        .registry_mut()
        .follow(id(1), id(99), None, &world)
        .unwrap();
    scheduler.registry_mut().stop(id(11));

    let summary = scheduler.end(&mut world).unwrap();
    assert_eq!(summary.applied, 12);
    assert_eq!(summary.flushed, 2);
    assert_eq!(world.position(id(99)), Some(Vec2::new(900.0, 900.0)));

    let registry = scheduler.registry();
    assert_eq!(registry.followers(id(1)).map(|f| f.len()), Some(4));
    assert!(!registry.contains_leader(id(11)));
}

/// Switching `execution` on a live scheduler keeps the executor it was
/// built with while the rest of the config still applies.
#[test]
fn test_execution_change_after_start_is_ignored() {
    let mut world = formation_world();
    let mut scheduler = scheduler(ExecutionMode::Inline);
    enlist(&mut scheduler, &world);

    let config = FollowConfig::default()
        .with_execution(ExecutionMode::Worker)
        .with_tick_interval_ms(25);
    scheduler.registry_mut().set_config(config).unwrap();

    assert_eq!(scheduler.registry().config().execution, ExecutionMode::Worker);
    assert_eq!(scheduler.registry().config().tick_interval_ms, 25);
    assert_eq!(scheduler.execution(), ExecutionMode::Inline);

    let summary = scheduler.tick(Instant::now(), &mut world).unwrap();
    assert_eq!(summary.applied, 12);
    assert!(!scheduler.is_in_flight());
}

#[test]
fn test_shutdown_finishes_in_flight_tick() {
    let mut world = formation_world();
    let mut scheduler = scheduler(ExecutionMode::Worker);
    enlist(&mut scheduler, &world);

    assert!(scheduler.begin(Instant::now(), &world));
    let summary = scheduler.shutdown(&mut world).unwrap();
    assert_eq!(summary.applied, 12);

    assert!(scheduler.is_shut_down());
    assert!(!scheduler.is_in_flight());
    assert_eq!(scheduler.execution(), ExecutionMode::Inline);
    assert!(!scheduler.begin(Instant::now() + Duration::from_secs(1), &world));
    assert!(scheduler.shutdown(&mut world).is_none());
}

// =============================================================================
// Failure Containment
// =============================================================================

/// A session that fails is dropped on its own; the rest keep moving.
#[test]
fn test_failed_session_is_isolated() {
    let mut world = MemoryWorld::new(1000.0, 1000.0);
    spawn(&mut world, 1, 100.0, 100.0);
    spawn(&mut world, 2, 150.0, 100.0);
    spawn(&mut world, 3, 500.0, 500.0);
    spawn(&mut world, 4, 600.0, 500.0);

    let mut scheduler = scheduler(ExecutionMode::Parallel);
    let registry = scheduler.registry_mut();
    registry.follow(id(1), id(2), Some(FollowMode::Snake), &world).unwrap();
    registry.follow(id(3), id(4), Some(FollowMode::Joint), &world).unwrap();

    world.move_to(id(1), Vec2::new(f32::NAN, 0.0));
    let summary = scheduler.tick(Instant::now(), &mut world).unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.applied, 1);
    assert!(!scheduler.registry().contains_leader(id(1)));
    assert!(scheduler.registry().contains_leader(id(3)));
    assert_eq!(world.position(id(2)), Some(Vec2::new(150.0, 100.0)));
    let moved = world.position(id(4)).unwrap();
    assert!((moved.x - 524.0).abs() < EPS);
}

/// Dead followers are skipped and dead leaders freeze their session.
#[test]
fn test_dead_entities_are_not_moved() {
    let mut world = MemoryWorld::new(1000.0, 1000.0);
    spawn(&mut world, 1, 100.0, 100.0);
    spawn(&mut world, 2, 200.0, 100.0);
    spawn(&mut world, 3, 300.0, 100.0);

    let mut scheduler = scheduler(ExecutionMode::Inline);
    let registry = scheduler.registry_mut();
    registry.follow(id(1), id(2), None, &world).unwrap();
    registry.follow(id(1), id(3), None, &world).unwrap();

    world.set_dead(id(2), true);
    let t0 = Instant::now();
    let summary = scheduler.tick(t0, &mut world).unwrap();
    assert_eq!(summary.applied, 1);
    assert_eq!(world.position(id(2)), Some(Vec2::new(200.0, 100.0)));

    world.set_dead(id(1), true);
    let summary = scheduler.tick(t0 + Duration::from_millis(50), &mut world).unwrap();
    assert_eq!(summary.applied, 0);
    assert_eq!(summary.failed, 0);
}

// =============================================================================
// Bounds Policy
// =============================================================================

fn edge_world() -> MemoryWorld {
    let mut world = MemoryWorld::new(1000.0, 1000.0);
    world.spawn(id(1), EntityState::new(Vec2::new(10.0, 500.0)));
    world.spawn(id(2), EntityState::new(Vec2::new(60.0, 500.0)));
    world
}

/// The arc slot behind a leader at the west edge lies outside the world.
#[test]
fn test_out_of_bounds_move_dropped() {
    let mut world = edge_world();
    let mut scheduler = scheduler(ExecutionMode::Inline);
    scheduler
        .registry_mut()
        .follow(id(1), id(2), Some(FollowMode::Arc), &world)
        .unwrap();

    let summary = scheduler.tick(Instant::now(), &mut world).unwrap();
    assert_eq!(summary.dropped, 1);
    assert_eq!(summary.applied, 0);
    assert_eq!(world.position(id(2)), Some(Vec2::new(60.0, 500.0)));
}

#[test]
fn test_out_of_bounds_move_clamped() {
    let mut world = edge_world();
    let config = FollowConfig::default().with_bounds_policy(BoundsPolicy::Clamp);
    let mut scheduler = FollowScheduler::new(config).unwrap();
    scheduler
        .registry_mut()
        .follow(id(1), id(2), Some(FollowMode::Arc), &world)
        .unwrap();

    let summary = scheduler.tick(Instant::now(), &mut world).unwrap();
    assert_eq!(summary.dropped, 0);
    assert_eq!(summary.applied, 1);
    let p = world.position(id(2)).unwrap();
    assert_eq!(p.x, 0.0);
    assert!((p.y - 500.0).abs() < EPS);
}

// =============================================================================
// Randomized Walk
// =============================================================================

/// A chain dragged along a random walk never stretches past its minimum
/// link distance, whatever the leader does.
#[test]
fn test_joint_chain_random_walk() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut world = MemoryWorld::new(10_000.0, 10_000.0);
    let mut leader = Vec2::new(5000.0, 5000.0);
    world.spawn(id(1), EntityState::new(leader).with_hit_size(2.0));
    for n in 2..=8 {
        let hit = rng.gen_range(1.0..6.0);
        let start = Vec2::new(rng.gen_range(4800.0..5200.0), rng.gen_range(4800.0..5200.0));
        world.spawn(id(n), EntityState::new(start).with_hit_size(hit));
    }

    let mut scheduler = scheduler(ExecutionMode::Inline);
    for n in 2..=8 {
        scheduler.registry_mut().follow(id(1), id(n), None, &world).unwrap();
    }
    let spacing = scheduler.registry().config().joint.spacing;

    let t0 = Instant::now();
    for step in 0..200u32 {
        leader = leader + Vec2::new(rng.gen_range(-40.0..40.0), rng.gen_range(-40.0..40.0));
        world.move_to(id(1), leader);
        let summary = scheduler
            .tick(t0 + Duration::from_millis(33) * step, &mut world)
            .unwrap();
        assert_eq!(summary.applied, 7);

        for n in 2..=8 {
            let ahead = world.position(id(n - 1)).unwrap();
            let here = world.position(id(n)).unwrap();
            let limit = spacing + world.hit_size(id(n - 1)) + world.hit_size(id(n));
            assert!(
                ahead.dst(here) <= limit + 0.01,
                "link {} stretched to {} (limit {})",
                n,
                ahead.dst(here),
                limit
            );
        }
    }
}
