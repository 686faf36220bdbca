//! Error type shared by the whole engine.

use thiserror::Error;

use super::EntityId;

/// Result alias used across the crate.
pub type FollowResult<T> = Result<T, FollowError>;

/// Everything that can go wrong in the engine.
///
/// Geometry domain problems are not errors: the circle helpers resolve them
/// to fallback angles. Request errors (`SelfFollow`, `FollowLoop`,
/// `UnknownMode`) go back to the caller. Compute errors (`NonFinitePosition`,
/// `MissingSlot`, `MissingEntity`, `Panicked`) stay inside the scheduler,
/// which logs them and drops the session.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum FollowError {
    #[error("unknown follow mode '{0}'")]
    UnknownMode(String),

    #[error("{0} cannot follow itself")]
    SelfFollow(EntityId),

    #[error("{follower} cannot follow {leader}, who already follows it")]
    FollowLoop { leader: EntityId, follower: EntityId },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("non-finite position for {0}")]
    NonFinitePosition(EntityId),

    #[error("no placement slot for follower #{index} of {leader}")]
    MissingSlot { leader: EntityId, index: usize },

    #[error("{0} is not available")]
    MissingEntity(EntityId),

    #[error("session of {0} panicked during compute")]
    Panicked(EntityId),

    #[error("failed to spawn compute worker: {0}")]
    WorkerSpawn(String),

    #[error("compute worker disconnected")]
    WorkerDisconnected,
}
