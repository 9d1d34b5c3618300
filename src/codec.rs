//! Serialization boundary.
//!
//! Declares how a tree is converted to and from bytes. No codec exists yet:
//! every entry point fails with [`TreeError::NotImplemented`], and callers must
//! not depend on these functions in production paths.
//!
//! An implementation must round-trip the tree shape (sequence slot order
//! including empty slots, map keys including keys mapped to nothing) and leaf
//! scalars. Versions and parent links are runtime state and are never encoded:
//! a decoded tree starts with fresh cores at version 1.

use tracing::warn;

use crate::arena::{NodeId, TreeArena};
use crate::errors::{TreeError, TreeResult};

pub trait TreeCodec {
    /// Encodes the subtree below `root`.
    fn encode(&self, tree: &TreeArena, root: NodeId) -> TreeResult<Vec<u8>>;

    /// Decodes `bytes` into new detached nodes of `tree` and returns the root.
    fn decode(&self, tree: &mut TreeArena, bytes: &[u8]) -> TreeResult<NodeId>;
}

/// JSON document codec, not available yet.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl TreeCodec for JsonCodec {
    fn encode(&self, _tree: &TreeArena, root: NodeId) -> TreeResult<Vec<u8>> {
        warn!(%root, "encode called on unimplemented codec");
        Err(TreeError::NotImplemented("encode"))
    }

    fn decode(&self, _tree: &mut TreeArena, bytes: &[u8]) -> TreeResult<NodeId> {
        warn!(len = bytes.len(), "decode called on unimplemented codec");
        Err(TreeError::NotImplemented("decode"))
    }
}

pub fn encode(tree: &TreeArena, root: NodeId) -> TreeResult<Vec<u8>> {
    JsonCodec.encode(tree, root)
}

pub fn decode(tree: &mut TreeArena, bytes: &[u8]) -> TreeResult<NodeId> {
    JsonCodec.decode(tree, bytes)
}
