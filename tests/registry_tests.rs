//! Registry integration tests.
//!
//! These cover follow requests, mode changes, lifecycle signals, and how
//! operations made while a compute pass is running are deferred to the end
//! of the tick.

use std::time::Instant;

use rust_follow::core::{EntityId, EntityState, FollowConfig, FollowError, Vec2};
use rust_follow::follow::{FollowOutcome, FollowRegistry, TickPhase};
use rust_follow::modes::FollowMode;
use rust_follow::scheduler::{compute_tick, FollowScheduler};
use rust_follow::world::MemoryWorld;

fn world(count: u64) -> MemoryWorld {
    let mut world = MemoryWorld::new(2000.0, 2000.0);
    for id in 1..=count {
        world.spawn(
            EntityId(id),
            EntityState::new(Vec2::new(100.0 * id as f32, 500.0)).with_hit_size(4.0),
        );
    }
    world
}

fn id(n: u64) -> EntityId {
    EntityId(n)
}

// =============================================================================
// Follow Requests
// =============================================================================

#[test]
fn test_follow_and_query() {
    let world = world(4);
    let mut registry = FollowRegistry::default();

    registry.follow(id(1), id(2), Some(FollowMode::Arc), &world).unwrap();
    registry.follow(id(1), id(3), None, &world).unwrap();

    assert!(registry.contains_leader(id(1)));
    assert_eq!(registry.followers(id(1)), Some(vec![id(2), id(3)]));
    assert_eq!(registry.leader_of(id(3)), Some(id(1)));
    assert_eq!(registry.leader_of(id(4)), None);
    assert_eq!(registry.mode(id(1)), Some(FollowMode::Arc));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_already_following() {
    let world = world(2);
    let mut registry = FollowRegistry::default();

    registry.follow(id(1), id(2), None, &world).unwrap();
    assert_eq!(
        registry.follow(id(1), id(2), None, &world),
        Ok(FollowOutcome::AlreadyFollowing { leader: id(1) })
    );
}

#[test]
fn test_requested_mode_ignored_for_existing_session() {
    let world = world(3);
    let mut registry = FollowRegistry::default();

    registry.follow(id(1), id(2), Some(FollowMode::Snake), &world).unwrap();
    let outcome = registry.follow(id(1), id(3), Some(FollowMode::Orbit), &world).unwrap();

    assert_eq!(
        outcome,
        FollowOutcome::Following {
            leader: id(1),
            mode: FollowMode::Snake,
            mode_ignored: true
        }
    );
    assert_eq!(registry.mode(id(1)), Some(FollowMode::Snake));
}

#[test]
fn test_follow_moves_between_sessions() {
    let world = world(3);
    let mut registry = FollowRegistry::default();

    registry.follow(id(1), id(3), None, &world).unwrap();
    registry.follow(id(2), id(3), None, &world).unwrap();

    assert_eq!(registry.leader_of(id(3)), Some(id(2)));
    assert_eq!(registry.followers(id(1)), Some(vec![]));
    assert_eq!(registry.followers(id(2)), Some(vec![id(3)]));
}

#[test]
fn test_follow_errors() {
    let world = world(3);
    let mut registry = FollowRegistry::default();

    assert_eq!(
        registry.follow(id(1), id(1), None, &world),
        Err(FollowError::SelfFollow(id(1)))
    );

    registry.follow(id(1), id(2), None, &world).unwrap();
    assert!(matches!(
        registry.follow(id(2), id(1), None, &world),
        Err(FollowError::FollowLoop { .. })
    ));

    // A follower may still lead its own group.
    assert!(registry.follow(id(2), id(3), None, &world).is_ok());
}

#[test]
fn test_unfollow() {
    let world = world(3);
    let mut registry = FollowRegistry::default();
    registry.follow(id(1), id(2), None, &world).unwrap();

    assert_eq!(registry.unfollow(id(2), &world), Some(id(1)));
    assert_eq!(registry.unfollow(id(2), &world), None);
    assert_eq!(registry.followers(id(1)), Some(vec![]));
}

#[test]
fn test_create_only_once() {
    let world = world(1);
    let mut registry = FollowRegistry::default();
    assert!(registry.create(id(1), FollowMode::Orbit, &world));
    assert!(!registry.create(id(1), FollowMode::Arc, &world));
    assert_eq!(registry.mode(id(1)), Some(FollowMode::Orbit));
}

// =============================================================================
// Mode Changes
// =============================================================================

#[test]
fn test_change_mode_keeps_followers() {
    let world = world(4);
    let mut registry = FollowRegistry::default();
    for f in 2..=4 {
        registry.follow(id(1), id(f), Some(FollowMode::Joint), &world).unwrap();
    }

    assert!(registry.change_mode(id(1), FollowMode::Orbit, &world));
    assert!(!registry.change_mode(id(1), FollowMode::Orbit, &world));
    assert!(!registry.change_mode(id(9), FollowMode::Orbit, &world));

    assert_eq!(registry.mode(id(1)), Some(FollowMode::Orbit));
    assert_eq!(registry.followers(id(1)), Some(vec![id(2), id(3), id(4)]));
}

#[test]
fn test_change_all_modes() {
    let world = world(4);
    let mut registry = FollowRegistry::default();
    registry.follow(id(1), id(2), Some(FollowMode::Arc), &world).unwrap();
    registry.follow(id(3), id(4), Some(FollowMode::Joint), &world).unwrap();

    assert_eq!(registry.change_all_modes(FollowMode::Arc, &world), 1);
    assert_eq!(registry.mode(id(3)), Some(FollowMode::Arc));
}

#[test]
fn test_set_default_mode() {
    let world = world(4);
    let mut registry = FollowRegistry::default();
    registry.follow(id(1), id(2), None, &world).unwrap();

    assert_eq!(registry.set_default_mode(FollowMode::Snake, false, &world), 0);
    assert_eq!(registry.mode(id(1)), Some(FollowMode::Joint));
    registry.follow(id(3), id(4), None, &world).unwrap();
    assert_eq!(registry.mode(id(3)), Some(FollowMode::Snake));

    assert_eq!(registry.set_default_mode(FollowMode::Orbit, true, &world), 2);
    assert_eq!(registry.mode(id(1)), Some(FollowMode::Orbit));
    assert_eq!(registry.config().default_mode, FollowMode::Orbit);
}

// =============================================================================
// Lifecycle Signals
// =============================================================================

#[test]
fn test_entity_leave_as_leader_tears_down() {
    let world = world(3);
    let mut registry = FollowRegistry::default();
    registry.follow(id(1), id(2), None, &world).unwrap();

    assert!(registry.on_entity_leave(id(1), &world));
    assert!(!registry.contains_leader(id(1)));
    assert_eq!(registry.leader_of(id(2)), None);
}

#[test]
fn test_entity_leave_as_follower() {
    let world = world(3);
    let mut registry = FollowRegistry::default();
    registry.follow(id(1), id(2), None, &world).unwrap();
    registry.follow(id(1), id(3), None, &world).unwrap();

    assert!(registry.on_entity_leave(id(2), &world));
    assert_eq!(registry.followers(id(1)), Some(vec![id(3)]));
    assert!(!registry.on_entity_leave(id(9), &world));
}

// =============================================================================
// Deferred Changes
// =============================================================================

/// A follower added while a tick computes is invisible to that tick and
/// placed by the next one.
#[test]
fn test_pending_isolation() {
    let mut world = world(3);
    let mut registry = FollowRegistry::default();
    registry.follow(id(1), id(2), None, &world).unwrap();

    let job = registry.begin_tick(&world).unwrap();
    assert_eq!(registry.phase(), TickPhase::Computing);

    registry.follow(id(1), id(3), None, &world).unwrap();
    assert_eq!(registry.followers(id(1)), Some(vec![id(2), id(3)]));
    let live = registry.session(id(1)).unwrap();
    assert_eq!(live.lock().followers(), &[id(2)]);

    let report = compute_tick(&job, false);
    let moved: Vec<EntityId> = report.moves.iter().map(|m| m.follower).collect();
    assert_eq!(moved, vec![id(2)]);

    let summary = registry.finish_tick(report, &mut world);
    assert_eq!(summary.flushed, 1);
    assert_eq!(registry.phase(), TickPhase::Idle);
    assert_eq!(live.lock().followers(), &[id(2), id(3)]);

    let job = registry.begin_tick(&world).unwrap();
    let report = compute_tick(&job, false);
    let moved: Vec<EntityId> = report.moves.iter().map(|m| m.follower).collect();
    assert_eq!(moved, vec![id(2), id(3)]);
}

/// A session stopped mid-tick still applies that tick, then disappears.
#[test]
fn test_stop_during_compute() {
    let mut world = world(2);
    let mut registry = FollowRegistry::default();
    registry.follow(id(1), id(2), None, &world).unwrap();

    let job = registry.begin_tick(&world).unwrap();
    assert_eq!(registry.stop(id(1)), Some(vec![id(2)]));
    assert!(!registry.contains_leader(id(1)));
    assert!(registry.session(id(1)).is_some());

    let report = compute_tick(&job, false);
    let summary = registry.finish_tick(report, &mut world);
    assert_eq!(summary.applied, 1);
    assert!(registry.session(id(1)).is_none());
    assert!(registry.is_empty());
}

/// Mode changes and follows against a replaced session land in the new one.
#[test]
fn test_change_mode_during_compute() {
    let mut world = world(3);
    let mut registry = FollowRegistry::default();
    registry.follow(id(1), id(2), Some(FollowMode::Joint), &world).unwrap();

    let job = registry.begin_tick(&world).unwrap();
    assert!(registry.change_mode(id(1), FollowMode::Arc, &world));
    registry.follow(id(1), id(3), None, &world).unwrap();
    assert_eq!(registry.mode(id(1)), Some(FollowMode::Arc));

    let report = compute_tick(&job, false);
    registry.finish_tick(report, &mut world);

    assert_eq!(registry.mode(id(1)), Some(FollowMode::Arc));
    assert_eq!(registry.followers(id(1)), Some(vec![id(2), id(3)]));
}

/// A session created mid-tick is installed at the flush.
#[test]
fn test_create_during_compute() {
    let mut world = world(4);
    let mut registry = FollowRegistry::default();
    registry.follow(id(1), id(2), None, &world).unwrap();

    let job = registry.begin_tick(&world).unwrap();
    registry.follow(id(3), id(4), None, &world).unwrap();
    assert_eq!(registry.len(), 2);
    assert!(registry.session(id(3)).is_none());

    let report = compute_tick(&job, false);
    registry.finish_tick(report, &mut world);
    assert_eq!(registry.session(id(3)).unwrap().lock().followers(), &[id(4)]);
}

/// A config change mid-tick only applies once the tick ends.
#[test]
fn test_config_change_is_deferred() {
    let mut world = world(2);
    let mut registry = FollowRegistry::default();
    registry.follow(id(1), id(2), None, &world).unwrap();

    let job = registry.begin_tick(&world).unwrap();
    registry
        .set_config(FollowConfig::default().with_tick_interval_ms(100))
        .unwrap();
    assert_eq!(registry.config().tick_interval_ms, 33);
    assert_eq!(registry.effective_config().tick_interval_ms, 100);

    let report = compute_tick(&job, false);
    registry.finish_tick(report, &mut world);
    assert_eq!(registry.config().tick_interval_ms, 100);
}

/// An expired session that gained a follower mid-tick is kept.
#[test]
fn test_expired_session_with_pending_add_survives() {
    let mut world = world(3);
    let mut registry = FollowRegistry::default();
    registry.follow(id(1), id(2), None, &world).unwrap();
    registry.unfollow(id(2), &world);

    let job = registry.begin_tick(&world).unwrap();
    registry.follow(id(1), id(3), None, &world).unwrap();

    let report = compute_tick(&job, false);
    assert_eq!(report.expired, vec![id(1)]);
    registry.finish_tick(report, &mut world);

    assert_eq!(registry.followers(id(1)), Some(vec![id(3)]));
}

// =============================================================================
// Through the Scheduler
// =============================================================================

/// An emptied session is removed at the next tick; a fresh one is not.
#[test]
fn test_should_remove_needs_prior_change() {
    let mut world = world(3);
    let mut scheduler = FollowScheduler::new(FollowConfig::default()).unwrap();
    let registry = scheduler.registry_mut();
    registry.create(id(1), FollowMode::Joint, &world);
    registry.follow(id(2), id(3), None, &world).unwrap();
    registry.unfollow(id(3), &world);

    let summary = scheduler.tick(Instant::now(), &mut world).unwrap();
    assert_eq!(summary.expired, 1);
    assert!(scheduler.registry().contains_leader(id(1)));
    assert!(!scheduler.registry().contains_leader(id(2)));
}
