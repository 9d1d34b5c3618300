use itertools::Itertools;
use termtree::Tree;
use tracing::instrument;

use crate::arena::{Body, NodeId, TreeArena};
use crate::errors::TreeResult;

pub trait TreeRender {
    /// Renders the subtree below `root` with kinds, scalars and versions.
    fn render(&self, root: NodeId) -> TreeResult<Tree<String>>;
}

impl TreeArena {
    fn label(&self, node: NodeId) -> TreeResult<String> {
        let entry = self.entry(node)?;
        let version = self.cores.version(entry.core);
        Ok(match &entry.body {
            Body::Seq(seq) => format!("sequence len={} (v{})", seq.len, version),
            Body::Map(map) => format!("map len={} (v{})", map.entries.len(), version),
            Body::Leaf(leaf) => format!("leaf {} (v{})", leaf.value, version),
        })
    }

    fn render_node(&self, node: NodeId, prefix: Option<String>) -> TreeResult<Tree<String>> {
        let label = self.label(node)?;
        let mut tree = Tree::new(match prefix {
            Some(prefix) => format!("{} {}", prefix, label),
            None => label,
        });

        match &self.entry(node)?.body {
            Body::Seq(seq) => {
                let slots = &self.buffers[seq.buf.0][seq.start..seq.start + seq.len];
                for (i, slot) in slots.iter().enumerate() {
                    let prefix = format!("[{}]", i);
                    match slot {
                        Some(child) => tree.push(self.render_node(*child, Some(prefix))?),
                        None => tree.push(Tree::new(format!("{} <empty>", prefix))),
                    };
                }
            }
            Body::Map(map) => {
                for key in map.entries.keys().sorted() {
                    let prefix = format!("{}:", key);
                    match map.entries[key] {
                        Some(child) => tree.push(self.render_node(child, Some(prefix))?),
                        None => tree.push(Tree::new(format!("{} <empty>", prefix))),
                    };
                }
            }
            Body::Leaf(_) => {}
        }
        Ok(tree)
    }
}

impl TreeRender for TreeArena {
    #[instrument(level = "debug", skip(self))]
    fn render(&self, root: NodeId) -> TreeResult<Tree<String>> {
        self.render_node(root, None)
    }
}
