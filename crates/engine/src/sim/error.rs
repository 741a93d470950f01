use thiserror::Error;
use tracing::warn;

use super::actor::{ActorId, ActorKind};
use super::fsm::FsmBuildError;
use super::grid::GridError;

/// Boundary precondition failures. These never escape the simulation as
/// panics; they are funnelled through [`report`] and the caller sees an empty
/// result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("operation requires a collision grid but none is loaded")]
    MissingGrid,
    #[error("unknown actor {0}")]
    UnknownActor(ActorId),
    #[error("no factory registered for actor kind `{0}`")]
    UnknownKind(ActorKind),
    #[error("invalid collision grid: {0}")]
    InvalidGrid(#[from] GridError),
    #[error("invalid behavior tree: {0}")]
    Behavior(#[from] FsmBuildError),
    #[error("factory for `{kind}` rejected spawn: {reason}")]
    SpawnRejected { kind: ActorKind, reason: String },
}

/// Logs `error` and yields the empty result. Every boundary operation that can
/// fail on a precondition goes through here so failures are reported the same
/// way.
pub fn report<T>(error: SimError) -> Option<T> {
    warn!(error = %error, "sim_precondition_failed");
    None
}
