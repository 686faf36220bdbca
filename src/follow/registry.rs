//! Leader → session map with tick-aware mutation.
//!
//! Outside a tick every operation acts on the live sessions directly. While a
//! compute pass is running (`TickPhase::Computing`) the live sessions belong
//! to that pass, so structural operations are recorded in the pending buffer
//! and replayed by [`FollowRegistry::finish_tick`]. Queries always answer with
//! the live map overlaid by the pending buffer, which is what the registry
//! will look like once the tick ends.
//!
//! ## Example
//!
//! ```
//! use rust_follow::core::{EntityId, EntityState, FollowConfig, Vec2};
//! use rust_follow::follow::{FollowOutcome, FollowRegistry};
//! use rust_follow::modes::FollowMode;
//! use rust_follow::world::MemoryWorld;
//!
//! let mut world = MemoryWorld::new(1000.0, 1000.0);
//! world.spawn(EntityId(1), EntityState::new(Vec2::new(100.0, 100.0)));
//! world.spawn(EntityId(2), EntityState::new(Vec2::new(200.0, 100.0)));
//!
//! let mut registry = FollowRegistry::new(FollowConfig::default());
//! let outcome = registry
//!     .follow(EntityId(1), EntityId(2), Some(FollowMode::Arc), &world)
//!     .unwrap();
//!
//! assert!(matches!(outcome, FollowOutcome::Following { .. }));
//! assert_eq!(registry.leader_of(EntityId(2)), Some(EntityId(1)));
//! assert_eq!(registry.mode(EntityId(1)), Some(FollowMode::Arc));
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use super::pending::{MemberEdit, PendingChange, PendingChanges};
use super::session::FollowSession;
use crate::core::{
    EntityId, EntitySink, EntitySource, FollowConfig, FollowError, FollowResult, WorldSnapshot,
};
use crate::modes::FollowMode;
use crate::scheduler::{ComputeJob, TickReport, TickSummary};

/// A session shared between the registry and a compute pass.
pub type SharedSession = Arc<Mutex<FollowSession>>;

/// Where the registry is in the tick cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TickPhase {
    #[default]
    Idle,
    Computing,
    Applying,
}

/// Result of a successful follow request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FollowOutcome {
    /// The follower joined `leader`'s session.
    Following {
        leader: EntityId,
        mode: FollowMode,
        /// A mode was requested but the session already existed with another.
        mode_ignored: bool,
    },
    /// The follower was already in `leader`'s session.
    AlreadyFollowing { leader: EntityId },
}

/// All follow sessions of a world.
#[derive(Debug)]
pub struct FollowRegistry {
    sessions: FxHashMap<EntityId, SharedSession>,
    pending: PendingChanges,
    phase: TickPhase,
    tick: u64,
    config: FollowConfig,
    pending_config: Option<FollowConfig>,
}

impl Default for FollowRegistry {
    fn default() -> Self {
        Self::new(FollowConfig::default())
    }
}

impl FollowRegistry {
    /// Empty registry. The config is clamped with [`FollowConfig::sanitized`].
    #[must_use]
    pub fn new(config: FollowConfig) -> Self {
        Self {
            sessions: FxHashMap::default(),
            pending: PendingChanges::new(),
            phase: TickPhase::Idle,
            tick: 0,
            config: config.sanitized(),
            pending_config: None,
        }
    }

    // === Queries ===

    #[must_use]
    pub fn phase(&self) -> TickPhase {
        self.phase
    }

    /// The active config.
    #[must_use]
    pub fn config(&self) -> &FollowConfig {
        &self.config
    }

    /// The config as it will be after the current tick.
    #[must_use]
    pub fn effective_config(&self) -> &FollowConfig {
        self.pending_config.as_ref().unwrap_or(&self.config)
    }

    /// Number of pending structural changes.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Live session handle, ignoring pending changes.
    #[must_use]
    pub fn session(&self, leader: EntityId) -> Option<SharedSession> {
        self.sessions.get(&leader).cloned()
    }

    #[must_use]
    pub fn contains_leader(&self, leader: EntityId) -> bool {
        match self.pending.get(leader) {
            Some(PendingChange::Remove) => false,
            Some(PendingChange::Replace(_)) => true,
            Some(PendingChange::Edit(_)) | None => self.sessions.contains_key(&leader),
        }
    }

    /// Every leader with a session, sorted.
    #[must_use]
    pub fn leaders(&self) -> Vec<EntityId> {
        let mut leaders: Vec<EntityId> = self
            .sessions
            .keys()
            .chain(self.pending.iter().map(|(leader, _)| leader))
            .copied()
            .filter(|&leader| self.contains_leader(leader))
            .collect();
        leaders.sort_unstable();
        leaders.dedup();
        leaders
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.leaders().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Followers of `leader`, in order, or `None` if it has no session.
    #[must_use]
    pub fn followers(&self, leader: EntityId) -> Option<Vec<EntityId>> {
        let live = self.sessions.get(&leader).map(|s| s.lock().followers().to_vec());
        match self.pending.get(leader) {
            Some(change) => change.effective_followers(live.as_deref()),
            None => live,
        }
    }

    #[must_use]
    pub fn mode(&self, leader: EntityId) -> Option<FollowMode> {
        match self.pending.get(leader) {
            Some(PendingChange::Remove) => None,
            Some(PendingChange::Replace(session)) => Some(session.mode()),
            Some(PendingChange::Edit(_)) | None => {
                self.sessions.get(&leader).map(|s| s.lock().mode())
            }
        }
    }

    /// The leader `follower` is following, if any.
    #[must_use]
    pub fn leader_of(&self, follower: EntityId) -> Option<EntityId> {
        self.leaders().into_iter().find(|&leader| {
            self.followers(leader)
                .is_some_and(|followers| followers.contains(&follower))
        })
    }

    fn deferring(&self) -> bool {
        self.phase == TickPhase::Computing
    }

    // === Primitives ===

    fn install(&mut self, leader: EntityId, session: FollowSession) {
        if self.deferring() {
            debug!("deferring install of {} session for {}", session.mode(), leader);
            self.pending.replace(leader, session);
        } else {
            self.sessions.insert(leader, Arc::new(Mutex::new(session)));
        }
    }

    /// Remove `leader`'s session. Returns the followers it had.
    fn drop_session(&mut self, leader: EntityId) -> Option<Vec<EntityId>> {
        let followers = self.followers(leader)?;
        if self.deferring() {
            if self.sessions.contains_key(&leader) {
                debug!("deferring removal of session for {}", leader);
                self.pending.remove(leader);
            } else {
                self.pending.discard(leader);
            }
        } else {
            self.sessions.remove(&leader);
        }
        info!("removed follow session of {}", leader);
        Some(followers)
    }

    fn add_member(&mut self, leader: EntityId, follower: EntityId, world: &dyn EntitySource) -> bool {
        if !self.deferring() {
            return match self.sessions.get(&leader) {
                Some(shared) => shared.lock().add(follower, world, &self.config),
                None => false,
            };
        }

        if let Some(PendingChange::Replace(session)) = self.pending.get_mut(leader) {
            return session.add(follower, world, &self.config);
        }
        if !self.contains_leader(leader) {
            return false;
        }
        debug!("deferring add of {} to session of {}", follower, leader);
        self.pending.edit(leader, MemberEdit::Add(follower))
    }

    fn remove_member(
        &mut self,
        leader: EntityId,
        follower: EntityId,
        world: &dyn EntitySource,
    ) -> bool {
        if !self.deferring() {
            return match self.sessions.get(&leader) {
                Some(shared) => shared.lock().remove(follower, world, &self.config),
                None => false,
            };
        }

        if let Some(PendingChange::Replace(session)) = self.pending.get_mut(leader) {
            return session.remove(follower, world, &self.config);
        }
        if !self.contains_leader(leader) {
            return false;
        }
        debug!("deferring removal of {} from session of {}", follower, leader);
        self.pending.edit(leader, MemberEdit::Remove(follower))
    }

    // === Operations ===

    /// Create an empty session. Returns false if `leader` already has one.
    pub fn create(&mut self, leader: EntityId, mode: FollowMode, world: &dyn EntitySource) -> bool {
        if self.contains_leader(leader) {
            return false;
        }
        self.install(leader, FollowSession::new(leader, mode, world));
        info!("created {} follow session for {}", mode, leader);
        true
    }

    /// Make `follower` follow `leader`.
    ///
    /// The session is created with `mode` (or the default mode) if needed.
    /// The follower leaves any other session first. A requested mode is not
    /// applied to an existing session; the outcome reports that.
    pub fn follow(
        &mut self,
        leader: EntityId,
        follower: EntityId,
        mode: Option<FollowMode>,
        world: &dyn EntitySource,
    ) -> FollowResult<FollowOutcome> {
        if leader == follower {
            return Err(FollowError::SelfFollow(follower));
        }
        if self.leader_of(leader) == Some(follower) {
            return Err(FollowError::FollowLoop { leader, follower });
        }

        let current = self.leader_of(follower);
        if current == Some(leader) {
            return Ok(FollowOutcome::AlreadyFollowing { leader });
        }
        if let Some(previous) = current {
            self.remove_member(previous, follower, world);
        }

        let (session_mode, mode_ignored) = match self.mode(leader) {
            Some(existing) => (existing, mode.is_some_and(|m| m != existing)),
            None => {
                let created = mode.unwrap_or(self.effective_config().default_mode);
                self.create(leader, created, world);
                (created, false)
            }
        };

        self.add_member(leader, follower, world);
        debug!("{} now follows {}", follower, leader);
        Ok(FollowOutcome::Following {
            leader,
            mode: session_mode,
            mode_ignored,
        })
    }

    /// Stop `follower` following anyone. Returns the leader it left.
    pub fn unfollow(&mut self, follower: EntityId, world: &dyn EntitySource) -> Option<EntityId> {
        let leader = self.leader_of(follower)?;
        self.remove_member(leader, follower, world);
        debug!("{} stopped following {}", follower, leader);
        Some(leader)
    }

    /// Remove `leader`'s session. Returns the followers it released.
    pub fn stop(&mut self, leader: EntityId) -> Option<Vec<EntityId>> {
        self.drop_session(leader)
    }

    /// Replace `leader`'s session with a fresh `mode` session holding the
    /// same followers. Returns false if there is no session or it already
    /// uses `mode`.
    pub fn change_mode(&mut self, leader: EntityId, mode: FollowMode, world: &dyn EntitySource) -> bool {
        if self.mode(leader).map_or(true, |current| current == mode) {
            return false;
        }
        let followers = self.followers(leader).unwrap_or_default();

        let mut session = FollowSession::new(leader, mode, world);
        for follower in followers {
            session.add(follower, world, &self.config);
        }
        self.install(leader, session);
        info!("switched session of {} to {} mode", leader, mode);
        true
    }

    /// Switch every session to `mode`. Returns how many changed.
    pub fn change_all_modes(&mut self, mode: FollowMode, world: &dyn EntitySource) -> usize {
        self.leaders()
            .into_iter()
            .filter(|&leader| self.change_mode(leader, mode, world))
            .count()
    }

    /// Set the mode used for new sessions. With `force`, existing sessions
    /// switch too; returns how many did.
    pub fn set_default_mode(
        &mut self,
        mode: FollowMode,
        force: bool,
        world: &dyn EntitySource,
    ) -> usize {
        let config = self.effective_config().clone().with_default_mode(mode);
        self.store_config(config);
        info!("default follow mode is now {}", mode);
        if force {
            self.change_all_modes(mode, world)
        } else {
            0
        }
    }

    /// Replace the config. Takes effect at the end of the current tick if
    /// one is running.
    ///
    /// `execution` is fixed when the scheduler is built; a different value
    /// here is stored but only logged.
    pub fn set_config(&mut self, config: FollowConfig) -> FollowResult<()> {
        config.validate()?;
        let current = self.effective_config().execution;
        if config.execution != current {
            warn!(
                "execution mode change {:?} -> {:?} ignored until the scheduler is rebuilt",
                current, config.execution
            );
        }
        self.store_config(config.sanitized());
        Ok(())
    }

    fn store_config(&mut self, config: FollowConfig) {
        if self.deferring() {
            debug!("deferring config change until the end of the tick");
            self.pending_config = Some(config);
        } else {
            self.config = config;
        }
    }

    // === Lifecycle signals ===

    /// The leader left the world: its session goes away.
    pub fn on_leader_leave(&mut self, leader: EntityId) -> bool {
        self.drop_session(leader).is_some()
    }

    /// A follower left the world: it leaves its session.
    pub fn on_follower_leave(&mut self, follower: EntityId, world: &dyn EntitySource) -> bool {
        self.unfollow(follower, world).is_some()
    }

    /// An entity left the world. If it leads a session, that session is torn
    /// down; otherwise it is removed as a follower.
    pub fn on_entity_leave(&mut self, entity: EntityId, world: &dyn EntitySource) -> bool {
        if self.contains_leader(entity) {
            self.on_leader_leave(entity)
        } else {
            self.on_follower_leave(entity, world)
        }
    }

    // === Tick cycle ===

    /// Start a tick: snapshot the tracked entities and hand out the live
    /// sessions. Returns `None` unless the registry is idle.
    pub fn begin_tick(&mut self, world: &dyn EntitySource) -> Option<ComputeJob> {
        if self.phase != TickPhase::Idle {
            return None;
        }

        let mut sessions: Vec<(EntityId, SharedSession)> = self
            .sessions
            .iter()
            .map(|(leader, shared)| (*leader, Arc::clone(shared)))
            .collect();
        sessions.sort_unstable_by_key(|(leader, _)| *leader);

        let mut tracked = Vec::with_capacity(sessions.len());
        for (leader, shared) in &sessions {
            tracked.push(*leader);
            tracked.extend_from_slice(shared.lock().followers());
        }
        let snapshot = WorldSnapshot::capture(world, tracked);

        self.tick += 1;
        self.phase = TickPhase::Computing;
        Some(ComputeJob {
            tick: self.tick,
            sessions,
            snapshot,
            config: self.config.clone(),
        })
    }

    /// Finish a tick on the host's thread.
    ///
    /// Applies the report's moves, tombstones failed and expired sessions,
    /// replays pending changes in leader order, then applies any deferred
    /// config and returns to `Idle`.
    pub fn finish_tick<H>(&mut self, report: TickReport, host: &mut H) -> TickSummary
    where
        H: EntitySource + EntitySink,
    {
        self.phase = TickPhase::Applying;

        for planned in &report.moves {
            host.set_position(planned.follower, planned.position);
            host.notify(planned.follower, planned.position);
        }

        for (leader, err) in &report.failed {
            if matches!(self.pending.get(*leader), Some(PendingChange::Replace(_))) {
                continue;
            }
            warn!("dropping session of {} after failure: {}", leader, err);
            self.pending.remove(*leader);
        }
        for leader in &report.expired {
            if !self.pending.contains(*leader) {
                self.pending.remove(*leader);
            }
        }

        let entries = self.pending.drain_sorted();
        let flushed = entries.len();
        for (leader, change) in entries {
            match change {
                PendingChange::Remove => {
                    if self.sessions.remove(&leader).is_some() {
                        info!("removed follow session of {}", leader);
                    }
                }
                PendingChange::Replace(session) => {
                    self.sessions.insert(leader, Arc::new(Mutex::new(session)));
                }
                PendingChange::Edit(edits) => {
                    let Some(shared) = self.sessions.get(&leader) else {
                        debug!("dropping edits for vanished session of {}", leader);
                        continue;
                    };
                    let mut session = shared.lock();
                    for edit in edits {
                        match edit {
                            MemberEdit::Add(follower) => {
                                session.add(follower, &*host, &self.config);
                            }
                            MemberEdit::Remove(follower) => {
                                session.remove(follower, &*host, &self.config);
                            }
                            MemberEdit::Clear => session.clear(&*host, &self.config),
                        }
                    }
                }
            }
        }
        if flushed > 0 {
            debug!("flushed {} pending changes after tick {}", flushed, report.tick);
        }

        if let Some(config) = self.pending_config.take() {
            self.config = config;
        }
        self.phase = TickPhase::Idle;

        TickSummary {
            tick: report.tick,
            applied: report.moves.len(),
            dropped: report.dropped,
            expired: report.expired.len(),
            failed: report.failed.len(),
            flushed,
        }
    }
}
