//! One compute pass.
//!
//! `compute_tick` reads only the job it is given: the session handles, a
//! world snapshot and a config copy. It can therefore run on any thread. It
//! never writes to the host; the moves it returns are applied later by the
//! registry on the host's thread.

use std::panic::{self, AssertUnwindSafe};

use rayon::prelude::*;
use tracing::{error, trace};

use crate::core::{
    BoundsPolicy, EntityId, EntitySource, FollowConfig, FollowError, Vec2, WorldBounds,
    WorldSnapshot,
};
use crate::follow::{PlannedMove, SharedSession};

/// Everything a compute pass needs, captured at the start of a tick.
pub struct ComputeJob {
    /// Sequence number of the tick.
    pub tick: u64,
    /// Live sessions, sorted by leader.
    pub sessions: Vec<(EntityId, SharedSession)>,
    pub snapshot: WorldSnapshot,
    pub config: FollowConfig,
}

impl std::fmt::Debug for ComputeJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputeJob")
            .field("tick", &self.tick)
            .field("sessions", &self.sessions.len())
            .field("entities", &self.snapshot.len())
            .finish()
    }
}

/// Result of a compute pass.
#[derive(Debug, Default)]
pub struct TickReport {
    pub tick: u64,
    /// Moves that passed the bounds filter, in session order.
    pub moves: Vec<PlannedMove>,
    /// Sessions that were empty after being used.
    pub expired: Vec<EntityId>,
    /// Sessions whose update failed. Their moves are not in `moves`.
    pub failed: Vec<(EntityId, FollowError)>,
    /// Moves dropped by the bounds filter.
    pub dropped: usize,
    /// Sessions that ran their update.
    pub computed: usize,
}

impl TickReport {
    /// Report for a tick that computed nothing.
    #[must_use]
    pub fn empty(tick: u64) -> Self {
        Self {
            tick,
            ..Self::default()
        }
    }
}

/// What a finished tick did, as seen by the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub tick: u64,
    pub applied: usize,
    pub dropped: usize,
    pub expired: usize,
    pub failed: usize,
    /// Pending changes replayed at the end of the tick.
    pub flushed: usize,
}

enum SessionOutcome {
    Moves(Vec<PlannedMove>),
    Expired,
    Failed(FollowError),
}

fn compute_session(
    leader: EntityId,
    shared: &SharedSession,
    world: &WorldSnapshot,
    config: &FollowConfig,
) -> SessionOutcome {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut session = shared.lock();
        if session.should_remove() {
            return Ok(None);
        }
        let mut moves = Vec::with_capacity(session.len());
        session.update(world, config, &mut moves)?;
        Ok(Some(moves))
    }));

    match result {
        Ok(Ok(Some(moves))) => SessionOutcome::Moves(moves),
        Ok(Ok(None)) => SessionOutcome::Expired,
        Ok(Err(err)) => SessionOutcome::Failed(err),
        Err(_) => SessionOutcome::Failed(FollowError::Panicked(leader)),
    }
}

/// Apply the bounds policy. `None` means the move is dropped this tick.
#[must_use]
pub fn filter_position(position: Vec2, bounds: WorldBounds, policy: BoundsPolicy) -> Option<Vec2> {
    if !position.is_finite() {
        return None;
    }
    if bounds.contains(position) {
        return Some(position);
    }
    match policy {
        BoundsPolicy::Drop => None,
        BoundsPolicy::Clamp => Some(bounds.clamp(position)),
    }
}

/// Run every session of `job`, optionally fanned out with rayon.
///
/// A session that errors or panics is reported in `failed` and contributes
/// no moves; the others are unaffected.
pub fn compute_tick(job: &ComputeJob, parallel: bool) -> TickReport {
    let world = &job.snapshot;
    let config = &job.config;

    let outcomes: Vec<(EntityId, SessionOutcome)> = if parallel {
        job.sessions
            .par_iter()
            .map(|(leader, shared)| (*leader, compute_session(*leader, shared, world, config)))
            .collect()
    } else {
        job.sessions
            .iter()
            .map(|(leader, shared)| (*leader, compute_session(*leader, shared, world, config)))
            .collect()
    };

    let bounds = world.world_bounds();
    let mut report = TickReport::empty(job.tick);
    for (leader, outcome) in outcomes {
        match outcome {
            SessionOutcome::Moves(moves) => {
                report.computed += 1;
                for planned in moves {
                    match filter_position(planned.position, bounds, config.bounds_policy) {
                        Some(position) => report.moves.push(PlannedMove {
                            position,
                            ..planned
                        }),
                        None => report.dropped += 1,
                    }
                }
            }
            SessionOutcome::Expired => report.expired.push(leader),
            SessionOutcome::Failed(err) => {
                error!("compute failed for session of {}: {}", leader, err);
                report.failed.push((leader, err));
            }
        }
    }

    trace!(
        "tick {} computed {} sessions: {} moves, {} dropped, {} expired, {} failed",
        report.tick,
        report.computed,
        report.moves.len(),
        report.dropped,
        report.expired.len(),
        report.failed.len()
    );
    report
}
