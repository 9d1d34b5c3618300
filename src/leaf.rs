use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::arena::{Body, LeafBody, LeafId, TreeArena};
use crate::errors::TreeResult;

/// Opaque scalar held by a leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Int(i)
    }
}

impl From<f64> for Scalar {
    fn from(x: f64) -> Self {
        Scalar::Float(x)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

impl TreeArena {
    /// Creates a detached leaf.
    pub fn make_leaf(&mut self, value: impl Into<Scalar>) -> LeafId {
        LeafId(self.insert_node(Body::Leaf(LeafBody {
            value: value.into(),
        })))
    }

    pub fn value(&self, leaf: LeafId) -> TreeResult<&Scalar> {
        Ok(&self.leaf_body(leaf)?.value)
    }

    /// Overwrites the scalar and bumps the leaf and its ancestors.
    #[instrument(level = "trace", skip(self, value))]
    pub fn set_value(&mut self, leaf: LeafId, value: impl Into<Scalar>) -> TreeResult<()> {
        self.leaf_body_mut(leaf)?.value = value.into();
        let core = self.core_of(leaf.node())?;
        self.cores.bump(core);
        Ok(())
    }
}
