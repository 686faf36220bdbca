//! Follow sessions and the registry that owns them.
//!
//! A session ties one leader to an ordered list of followers and a placement
//! strategy. The registry maps leaders to sessions, enforces that a follower
//! belongs to at most one session, and buffers structural changes while a
//! compute pass is running.

pub mod pending;
pub mod registry;
pub mod session;

pub use pending::{MemberEdit, PendingChange, PendingChanges};
pub use registry::{FollowOutcome, FollowRegistry, SharedSession, TickPhase};
pub use session::{FollowSession, PlannedMove};
