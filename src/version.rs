//! Version/parent bookkeeping shared by every node.
//!
//! Each constructed node owns one [`Core`]; sequence views reuse the core of
//! their source. The parent link points at the parent's core, never at a node,
//! so it is a plain arena index and never an owning edge.

use generational_arena::{Arena, Index};
use tracing::{debug, instrument, trace};

use crate::arena::NodeId;
use crate::errors::{TreeError, TreeResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct CoreId(pub(crate) Index);

#[derive(Debug)]
pub(crate) struct Core {
    /// Starts at 1, only ever incremented
    version: u64,
    /// Core of the container holding this node, None for roots and detached nodes
    parent: Option<CoreId>,
    /// Node that created this core
    owner: NodeId,
}

/// Arena of cores.
///
/// Lookups index the arena directly: a core outlives every node and every
/// child that refers to it, so a missing core is a broken internal invariant.
#[derive(Debug, Default)]
pub(crate) struct Cores {
    arena: Arena<Core>,
}

impl Cores {
    pub fn insert(&mut self, owner: NodeId) -> CoreId {
        CoreId(self.arena.insert(Core {
            version: 1,
            parent: None,
            owner,
        }))
    }

    pub fn version(&self, id: CoreId) -> u64 {
        self.arena[id.0].version
    }

    pub fn parent(&self, id: CoreId) -> Option<CoreId> {
        self.arena[id.0].parent
    }

    pub fn owner(&self, id: CoreId) -> NodeId {
        self.arena[id.0].owner
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn ids(&self) -> Vec<CoreId> {
        self.arena.iter().map(|(idx, _)| CoreId(idx)).collect()
    }

    pub fn remove(&mut self, id: CoreId) {
        self.arena.remove(id.0);
    }

    /// Records `parent` as the container of `child`.
    ///
    /// `node` is the handle reported on failure.
    #[instrument(level = "trace", skip(self))]
    pub fn attach(&mut self, child: CoreId, parent: CoreId, node: NodeId) -> TreeResult<()> {
        let core = &mut self.arena[child.0];
        if core.parent.is_some() {
            return Err(TreeError::AlreadyAttached(node));
        }
        core.parent = Some(parent);
        debug!(%node, "attached");
        Ok(())
    }

    #[instrument(level = "trace", skip(self))]
    pub fn detach(&mut self, child: CoreId, node: NodeId) -> TreeResult<()> {
        let core = &mut self.arena[child.0];
        if core.parent.is_none() {
            return Err(TreeError::NotAttached(node));
        }
        core.parent = None;
        debug!(%node, "detached");
        Ok(())
    }

    /// Increments the version of `id` and of every ancestor, root last.
    pub fn bump(&mut self, id: CoreId) {
        let mut current = Some(id);
        while let Some(core_id) = current {
            let core = &mut self.arena[core_id.0];
            core.version += 1;
            trace!(owner = %core.owner, version = core.version, "bumped");
            current = core.parent;
        }
    }

    /// True if `candidate` is `id` itself or one of its ancestors.
    pub fn is_ancestor_or_self(&self, candidate: CoreId, id: CoreId) -> bool {
        let mut current = Some(id);
        while let Some(core_id) = current {
            if core_id == candidate {
                return true;
            }
            current = self.parent(core_id);
        }
        false
    }
}
