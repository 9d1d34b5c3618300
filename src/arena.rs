use std::collections::{HashMap, HashSet};
use std::fmt;

use generational_arena::{Arena, Index};
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::config::Settings;
use crate::errors::{TreeError, TreeResult};
use crate::leaf::Scalar;
use crate::version::{CoreId, Cores};

/// Handle to a node of any kind.
///
/// Handles are generational: once a node has been swept by
/// [`TreeArena::retain_reachable`] every operation on its handle fails with
/// [`TreeError::StaleNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) Index);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (index, generation) = self.0.into_raw_parts();
        write!(f, "node#{}.{}", index, generation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Sequence,
    Map,
    Leaf,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Sequence => write!(f, "sequence"),
            NodeKind::Map => write!(f, "map"),
            NodeKind::Leaf => write!(f, "leaf"),
        }
    }
}

macro_rules! typed_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub(crate) NodeId);

        impl $name {
            pub fn node(self) -> NodeId {
                self.0
            }
        }

        impl From<$name> for NodeId {
            fn from(handle: $name) -> NodeId {
                handle.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

typed_handle!(
    /// Handle to a sequence node or to a view over one.
    SeqId
);
typed_handle!(
    /// Handle to a map node.
    MapId
);
typed_handle!(
    /// Handle to a leaf node.
    LeafId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct BufId(pub(crate) Index);

/// Window over a shared backing buffer.
#[derive(Debug, Clone)]
pub(crate) struct SeqBody {
    pub buf: BufId,
    pub start: usize,
    pub len: usize,
    pub cap: usize,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MapBody {
    pub entries: HashMap<String, Option<NodeId>>,
}

#[derive(Debug, Clone)]
pub(crate) struct LeafBody {
    pub value: Scalar,
}

#[derive(Debug, Clone)]
pub(crate) enum Body {
    Seq(SeqBody),
    Map(MapBody),
    Leaf(LeafBody),
}

impl Body {
    fn kind(&self) -> NodeKind {
        match self {
            Body::Seq(_) => NodeKind::Sequence,
            Body::Map(_) => NodeKind::Map,
            Body::Leaf(_) => NodeKind::Leaf,
        }
    }
}

#[derive(Debug)]
pub(crate) struct NodeEntry {
    /// Version/parent core, shared between a sequence and its views
    pub core: CoreId,
    pub body: Body,
}

/// Owner of every node, version core and sequence buffer of a tree.
///
/// Containers refer to children by [`NodeId`]; children refer back to the
/// core of their container. Ownership therefore runs strictly from the arena
/// to its entries and the back references can never form an ownership cycle.
#[derive(Debug)]
pub struct TreeArena {
    pub(crate) nodes: Arena<NodeEntry>,
    pub(crate) cores: Cores,
    pub(crate) buffers: Arena<Vec<Option<NodeId>>>,
    pub(crate) settings: Settings,
}

impl Default for TreeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeArena {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            nodes: Arena::new(),
            cores: Cores::default(),
            buffers: Arena::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Inserts a detached node with a fresh core.
    pub(crate) fn insert_node(&mut self, body: Body) -> NodeId {
        let cores = &mut self.cores;
        let idx = self.nodes.insert_with(|idx| NodeEntry {
            core: cores.insert(NodeId(idx)),
            body,
        });
        NodeId(idx)
    }

    /// Inserts a node sharing an existing core (sequence views).
    pub(crate) fn insert_view(&mut self, core: CoreId, body: Body) -> NodeId {
        NodeId(self.nodes.insert(NodeEntry { core, body }))
    }

    pub(crate) fn entry(&self, node: NodeId) -> TreeResult<&NodeEntry> {
        self.nodes.get(node.0).ok_or(TreeError::StaleNode(node))
    }

    pub(crate) fn entry_mut(&mut self, node: NodeId) -> TreeResult<&mut NodeEntry> {
        self.nodes.get_mut(node.0).ok_or(TreeError::StaleNode(node))
    }

    pub(crate) fn core_of(&self, node: NodeId) -> TreeResult<CoreId> {
        Ok(self.entry(node)?.core)
    }

    pub(crate) fn seq_body(&self, seq: SeqId) -> TreeResult<&SeqBody> {
        match &self.entry(seq.0)?.body {
            Body::Seq(body) => Ok(body),
            other => Err(TreeError::KindMismatch {
                expected: NodeKind::Sequence,
                found: other.kind(),
            }),
        }
    }

    pub(crate) fn map_body(&self, map: MapId) -> TreeResult<&MapBody> {
        match &self.entry(map.0)?.body {
            Body::Map(body) => Ok(body),
            other => Err(TreeError::KindMismatch {
                expected: NodeKind::Map,
                found: other.kind(),
            }),
        }
    }

    pub(crate) fn map_body_mut(&mut self, map: MapId) -> TreeResult<&mut MapBody> {
        match &mut self.entry_mut(map.0)?.body {
            Body::Map(body) => Ok(body),
            other => Err(TreeError::KindMismatch {
                expected: NodeKind::Map,
                found: other.kind(),
            }),
        }
    }

    pub(crate) fn leaf_body(&self, leaf: LeafId) -> TreeResult<&LeafBody> {
        match &self.entry(leaf.0)?.body {
            Body::Leaf(body) => Ok(body),
            other => Err(TreeError::KindMismatch {
                expected: NodeKind::Leaf,
                found: other.kind(),
            }),
        }
    }

    pub(crate) fn leaf_body_mut(&mut self, leaf: LeafId) -> TreeResult<&mut LeafBody> {
        match &mut self.entry_mut(leaf.0)?.body {
            Body::Leaf(body) => Ok(body),
            other => Err(TreeError::KindMismatch {
                expected: NodeKind::Leaf,
                found: other.kind(),
            }),
        }
    }

    /// Checks that `value` may become a child of the container owning `container`.
    ///
    /// `releasing` lists cores the same operation detaches before attaching,
    /// so re-inserting a node into the slot it already occupies is allowed.
    pub(crate) fn check_attachable(
        &self,
        container: CoreId,
        value: NodeId,
        releasing: &[CoreId],
    ) -> TreeResult<CoreId> {
        let core = self.core_of(value)?;
        if self.cores.parent(core).is_some() && !releasing.contains(&core) {
            return Err(TreeError::AlreadyAttached(value));
        }
        if self.would_cycle(core, container) {
            return Err(TreeError::CycleDetected(value));
        }
        Ok(core)
    }

    /// True if `child` is `container` itself or one of its ancestors.
    ///
    /// Propagation and traversal follow links until they run out, so a cycle
    /// must never be linked in the first place.
    pub(crate) fn would_cycle(&self, child: CoreId, container: CoreId) -> bool {
        self.cores.is_ancestor_or_self(child, container)
    }

    /// Checks that `occupant` is currently attached to `container`.
    pub(crate) fn check_detachable(&self, container: CoreId, occupant: NodeId) -> TreeResult<CoreId> {
        let core = self.core_of(occupant)?;
        if self.cores.parent(core) != Some(container) {
            return Err(TreeError::NotAttached(occupant));
        }
        Ok(core)
    }

    pub fn contains(&self, node: impl Into<NodeId>) -> bool {
        self.nodes.contains(node.into().0)
    }

    /// Number of live nodes, views included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn kind(&self, node: impl Into<NodeId>) -> TreeResult<NodeKind> {
        Ok(self.entry(node.into())?.body.kind())
    }

    pub fn as_seq(&self, node: NodeId) -> TreeResult<SeqId> {
        self.seq_body(SeqId(node)).map(|_| SeqId(node))
    }

    pub fn as_map(&self, node: NodeId) -> TreeResult<MapId> {
        self.map_body(MapId(node)).map(|_| MapId(node))
    }

    pub fn as_leaf(&self, node: NodeId) -> TreeResult<LeafId> {
        self.leaf_body(LeafId(node)).map(|_| LeafId(node))
    }

    /// Current version of the node; views report the version of their source.
    pub fn version(&self, node: impl Into<NodeId>) -> TreeResult<u64> {
        let core = self.core_of(node.into())?;
        Ok(self.cores.version(core))
    }

    /// True if anything in the subtree changed after `seen` was observed.
    pub fn changed_since(&self, node: impl Into<NodeId>, seen: u64) -> TreeResult<bool> {
        Ok(self.version(node)? > seen)
    }

    pub fn is_attached(&self, node: impl Into<NodeId>) -> TreeResult<bool> {
        let core = self.core_of(node.into())?;
        Ok(self.cores.parent(core).is_some())
    }

    /// Container holding the node.
    ///
    /// For a container reached through a view this is the sequence the view
    /// was taken from.
    pub fn parent_of(&self, node: impl Into<NodeId>) -> TreeResult<Option<NodeId>> {
        let core = self.core_of(node.into())?;
        Ok(self.cores.parent(core).map(|parent| self.cores.owner(parent)))
    }

    /// Non-empty children in slot order, or for maps in key order.
    pub fn children(&self, node: impl Into<NodeId>) -> TreeResult<Vec<NodeId>> {
        let children = match &self.entry(node.into())?.body {
            Body::Seq(seq) => self.buffers[seq.buf.0][seq.start..seq.start + seq.len]
                .iter()
                .flatten()
                .copied()
                .collect(),
            Body::Map(map) => map
                .entries
                .iter()
                .sorted_by(|a, b| a.0.cmp(b.0))
                .filter_map(|(_, value)| *value)
                .collect(),
            Body::Leaf(_) => Vec::new(),
        };
        Ok(children)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn iter(&self, root: NodeId) -> TreeResult<TreeIterator<'_>> {
        self.entry(root)?;
        Ok(TreeIterator::new(self, root))
    }

    /// Height of the subtree; a lone node has depth 1.
    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self, root: NodeId) -> TreeResult<usize> {
        Ok(self.iter(root)?.map(|(_, depth)| depth + 1).max().unwrap_or(0))
    }

    /// Drops every node, core and buffer not reachable from `roots`.
    ///
    /// Reachability follows container slots downwards and parent links upwards,
    /// so ancestors of a retained node survive and propagation keeps working.
    /// Returns the number of nodes removed.
    #[instrument(level = "debug", skip(self))]
    pub fn retain_reachable(&mut self, roots: &[NodeId]) -> usize {
        enum Mark {
            Node(NodeId),
            Core(CoreId),
        }

        let mut live_nodes = HashSet::new();
        let mut live_cores = HashSet::new();
        let mut live_buffers = HashSet::new();
        let mut work: Vec<Mark> = roots.iter().copied().map(Mark::Node).collect();

        while let Some(mark) = work.pop() {
            match mark {
                Mark::Node(id) => {
                    let Some(entry) = self.nodes.get(id.0) else {
                        continue;
                    };
                    if !live_nodes.insert(id) {
                        continue;
                    }
                    work.push(Mark::Core(entry.core));
                    match &entry.body {
                        // whole buffer: a view may be widened again up to its capacity
                        Body::Seq(seq) => {
                            if live_buffers.insert(seq.buf) {
                                work.extend(
                                    self.buffers[seq.buf.0].iter().flatten().copied().map(Mark::Node),
                                );
                            }
                        }
                        Body::Map(map) => {
                            work.extend(map.entries.values().flatten().copied().map(Mark::Node));
                        }
                        Body::Leaf(_) => {}
                    }
                }
                Mark::Core(id) => {
                    if !live_cores.insert(id) {
                        continue;
                    }
                    work.push(Mark::Node(self.cores.owner(id)));
                    if let Some(parent) = self.cores.parent(id) {
                        work.push(Mark::Core(parent));
                    }
                }
            }
        }

        let dead_nodes: Vec<Index> = self
            .nodes
            .iter()
            .map(|(idx, _)| idx)
            .filter(|idx| !live_nodes.contains(&NodeId(*idx)))
            .collect();
        for idx in &dead_nodes {
            self.nodes.remove(*idx);
        }
        for core in self.cores.ids() {
            if !live_cores.contains(&core) {
                self.cores.remove(core);
            }
        }
        let dead_buffers: Vec<Index> = self
            .buffers
            .iter()
            .map(|(idx, _)| idx)
            .filter(|idx| !live_buffers.contains(&BufId(*idx)))
            .collect();
        for idx in dead_buffers {
            self.buffers.remove(idx);
        }

        debug!(
            removed = dead_nodes.len(),
            nodes = self.nodes.len(),
            cores = self.cores.len(),
            "swept unreachable nodes"
        );
        dead_nodes.len()
    }
}

/// Pre-order traversal yielding each node with its depth below the root.
pub struct TreeIterator<'a> {
    arena: &'a TreeArena,
    stack: Vec<(NodeId, usize)>,
}

impl<'a> TreeIterator<'a> {
    fn new(arena: &'a TreeArena, root: NodeId) -> Self {
        Self {
            arena,
            stack: vec![(root, 0)],
        }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (NodeId, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let (current, depth) = self.stack.pop()?;
        if let Ok(children) = self.arena.children(current) {
            // reverse push keeps left-to-right order
            for child in children.into_iter().rev() {
                self.stack.push((child, depth + 1));
            }
        }
        Some((current, depth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_fresh_arena_when_creating_nodes_then_each_is_detached_root() {
        let mut arena = TreeArena::new();
        let seq = arena.make_seq(2, 2).unwrap();
        let map = arena.make_map();
        let leaf = arena.make_leaf(Scalar::Int(1));

        for node in [seq.node(), map.node(), leaf.node()] {
            assert_eq!(arena.version(node).unwrap(), 1);
            assert_eq!(arena.parent_of(node).unwrap(), None);
        }
        assert_eq!(arena.node_count(), 3);
        assert_eq!(arena.cores.len(), 3);
    }

    #[test]
    fn given_view_when_inserted_then_shares_core_with_source() {
        let mut arena = TreeArena::new();
        let seq = arena.make_seq(4, 4).unwrap();
        let view = arena.view(seq, 1, 3).unwrap();

        assert_eq!(arena.core_of(seq.node()), arena.core_of(view.node()));
        assert_eq!(arena.cores.len(), 1);
        assert_eq!(arena.cores.owner(arena.core_of(view.node()).unwrap()), seq.node());
    }

    #[test]
    fn given_wrong_kind_when_converting_then_reports_kind_mismatch() {
        let mut arena = TreeArena::new();
        let leaf = arena.make_leaf(Scalar::Bool(true));

        let err = arena.as_map(leaf.node()).unwrap_err();
        assert_eq!(
            err,
            TreeError::KindMismatch {
                expected: NodeKind::Map,
                found: NodeKind::Leaf
            }
        );
        assert_eq!(arena.as_leaf(leaf.node()).unwrap(), leaf);
    }

    #[test]
    fn given_node_id_when_displayed_then_shows_index_and_generation() {
        let id = NodeId(Index::from_raw_parts(3, 1));
        assert_eq!(id.to_string(), "node#3.1");
    }
}
