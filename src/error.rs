//! Frame graph error types.

use thiserror::Error;

use crate::backend::{BackendError, ResourceKind};
use crate::render_graph::FrameGraphSlot;

/// Errors raised while recording, resolving or executing a frame graph.
///
/// Every graph error is fatal to the frame it occurred in.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("{operation} called with an unassigned resource handle")]
    InvalidHandle { operation: &'static str },

    #[error("resource handle {handle} refers to a resource released in an earlier frame")]
    StaleHandle { handle: String },

    #[error("cyclic dependency between passes: {}", passes.join(", "))]
    CyclicDependency { passes: Vec<String> },

    #[error("resource '{resource}' is written by unordered passes '{first}' and '{second}'")]
    MultipleWriters {
        resource: String,
        first: String,
        second: String,
    },

    #[error("pass '{pass}' accessed resource '{resource}' it did not declare")]
    UndeclaredAccess { pass: String, resource: String },

    #[error("resource '{resource}' is a {actual}, expected {expected}")]
    KindMismatch {
        resource: String,
        expected: ResourceKind,
        actual: ResourceKind,
    },

    #[error("slot {slot:?} is already assigned this frame")]
    SlotAlreadyAssigned { slot: FrameGraphSlot },

    #[error("pass '{name}' is already registered")]
    DuplicatePass { name: String },

    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Error returned by [`crate::Engine::render_frame`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}
