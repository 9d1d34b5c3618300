//! Mutable, versioned tree of sequence, map and scalar nodes.
//!
//! Every mutation bumps the version of the mutated node and of each of its
//! ancestors, so "did anything below this node change since version V" is a
//! single comparison:
//!
//! ```
//! use vertree::TreeArena;
//!
//! let mut tree = TreeArena::new();
//! let root = tree.make_map();
//! let leaf = tree.make_leaf(1_i64);
//! tree.map_set(root, "x", Some(leaf.node())).unwrap();
//!
//! let seen = tree.version(root).unwrap();
//! tree.set_value(leaf, 2_i64).unwrap();
//! assert!(tree.changed_since(root, seen).unwrap());
//! ```
//!
//! All nodes live in a [`TreeArena`] and are addressed by copyable handles.
//! Contract violations (double attach, out-of-bounds index, malformed range)
//! are reported as [`TreeError`] before anything is mutated.

pub mod arena;
pub mod codec;
pub mod config;
pub mod errors;
pub mod leaf;
mod map;
mod sequence;
pub mod tree_traits;
#[cfg(feature = "testing")]
pub mod util;
mod version;

pub use arena::{LeafId, MapId, NodeId, NodeKind, SeqId, TreeArena, TreeIterator};
pub use codec::{decode, encode, JsonCodec, TreeCodec};
pub use config::{SequenceSettings, Settings};
pub use errors::{TreeError, TreeResult};
pub use leaf::Scalar;
pub use tree_traits::TreeRender;
