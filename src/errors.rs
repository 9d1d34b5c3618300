use thiserror::Error;

use crate::arena::{NodeId, NodeKind};

/// Errors raised by tree operations.
///
/// Every variant except `NotImplemented` and `Config` is a caller contract
/// violation: the operation was rejected before anything was mutated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("node can not have multiple parents: {0}")]
    AlreadyAttached(NodeId),

    #[error("node is not attached to this container: {0}")]
    NotAttached(NodeId),

    #[error("index {index} out of bounds for sequence of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("invalid range [{low}:{high}:{max}] for capacity {cap}")]
    InvalidRange {
        low: usize,
        high: usize,
        max: usize,
        cap: usize,
    },

    #[error("length mismatch: destination has {dst} slots, source has {src}")]
    LengthMismatch { dst: usize, src: usize },

    #[error("attaching {0} would create a cycle")]
    CycleDetected(NodeId),

    #[error("expected {expected} node, found {found}")]
    KindMismatch { expected: NodeKind, found: NodeKind },

    #[error("stale node handle: {0}")]
    StaleNode(NodeId),

    #[error("{0} is not implemented")]
    NotImplemented(&'static str),

    #[error("config error: {message}")]
    Config { message: String },
}

impl TreeError {
    /// True for faults caused by breaking a tree invariant or an index contract.
    pub fn is_invariant_violation(&self) -> bool {
        !matches!(
            self,
            TreeError::NotImplemented(_) | TreeError::Config { .. }
        )
    }
}

pub type TreeResult<T> = Result<T, TreeError>;
