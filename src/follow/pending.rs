//! Structural changes deferred while a compute pass is running.
//!
//! The registry never mutates a session the compute pass may be holding.
//! Instead each change is recorded here, keyed by leader, and replayed at
//! the tick boundary. Later changes to the same leader fold into the earlier
//! entry, so every leader has at most one pending entry.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::session::FollowSession;
use crate::core::EntityId;

/// Membership change against a live session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberEdit {
    Add(EntityId),
    Remove(EntityId),
    Clear,
}

/// What happens to a leader's session at the next flush.
#[derive(Clone, Debug)]
pub enum PendingChange {
    /// Install this session, replacing any live one.
    Replace(FollowSession),
    /// Remove the live session.
    Remove,
    /// Replay these edits, in order, on the live session.
    Edit(SmallVec<[MemberEdit; 4]>),
}

impl PendingChange {
    /// Followers of the live session `live` as they will be after the flush.
    ///
    /// `live` is `None` when the leader has no live session.
    #[must_use]
    pub fn effective_followers(&self, live: Option<&[EntityId]>) -> Option<Vec<EntityId>> {
        match self {
            PendingChange::Replace(session) => Some(session.followers().to_vec()),
            PendingChange::Remove => None,
            PendingChange::Edit(edits) => {
                let mut followers = live?.to_vec();
                for edit in edits {
                    match *edit {
                        MemberEdit::Add(id) => {
                            if !followers.contains(&id) {
                                followers.push(id);
                            }
                        }
                        MemberEdit::Remove(id) => followers.retain(|&f| f != id),
                        MemberEdit::Clear => followers.clear(),
                    }
                }
                Some(followers)
            }
        }
    }
}

/// Pending changes, keyed by leader.
#[derive(Clone, Debug, Default)]
pub struct PendingChanges {
    entries: FxHashMap<EntityId, PendingChange>,
}

impl PendingChanges {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, leader: EntityId) -> Option<&PendingChange> {
        self.entries.get(&leader)
    }

    pub fn get_mut(&mut self, leader: EntityId) -> Option<&mut PendingChange> {
        self.entries.get_mut(&leader)
    }

    #[must_use]
    pub fn contains(&self, leader: EntityId) -> bool {
        self.entries.contains_key(&leader)
    }

    /// Schedule `session` to replace whatever `leader` has.
    pub fn replace(&mut self, leader: EntityId, session: FollowSession) {
        self.entries.insert(leader, PendingChange::Replace(session));
    }

    /// Schedule removal of `leader`'s session, discarding earlier entries.
    pub fn remove(&mut self, leader: EntityId) {
        self.entries.insert(leader, PendingChange::Remove);
    }

    /// Forget whatever is pending for `leader`.
    pub fn discard(&mut self, leader: EntityId) -> Option<PendingChange> {
        self.entries.remove(&leader)
    }

    /// Append an edit for a live session.
    ///
    /// Returns false if the leader already has a `Replace` or `Remove`
    /// entry; the caller must handle those itself.
    pub fn edit(&mut self, leader: EntityId, edit: MemberEdit) -> bool {
        match self
            .entries
            .entry(leader)
            .or_insert_with(|| PendingChange::Edit(SmallVec::new()))
        {
            PendingChange::Edit(edits) => {
                if edit == MemberEdit::Clear {
                    edits.clear();
                }
                edits.push(edit);
                true
            }
            PendingChange::Replace(_) | PendingChange::Remove => false,
        }
    }

    /// Take every entry, sorted by leader.
    pub fn drain_sorted(&mut self) -> Vec<(EntityId, PendingChange)> {
        let mut entries: Vec<_> = self.entries.drain().collect();
        entries.sort_unstable_by_key(|(leader, _)| *leader);
        entries
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &PendingChange)> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
