use itertools::Itertools;
use tracing::{instrument, trace};

use crate::arena::{Body, MapBody, MapId, NodeId, TreeArena};
use crate::errors::TreeResult;

impl TreeArena {
    /// Creates a detached, empty map.
    pub fn make_map(&mut self) -> MapId {
        MapId(self.insert_node(Body::Map(MapBody::default())))
    }

    /// Child stored under `key`; empty for absent keys and keys mapped to nothing.
    pub fn map_get(&self, map: MapId, key: &str) -> TreeResult<Option<NodeId>> {
        Ok(self.map_get_with_presence(map, key)?.0)
    }

    /// Child stored under `key` and whether the key is present at all.
    pub fn map_get_with_presence(&self, map: MapId, key: &str) -> TreeResult<(Option<NodeId>, bool)> {
        let body = self.map_body(map)?;
        Ok(match body.entries.get(key) {
            Some(value) => (*value, true),
            None => (None, false),
        })
    }

    pub fn map_len(&self, map: MapId) -> TreeResult<usize> {
        Ok(self.map_body(map)?.entries.len())
    }

    /// Keys in sorted order.
    pub fn map_keys(&self, map: MapId) -> TreeResult<Vec<String>> {
        Ok(self.map_body(map)?.entries.keys().cloned().sorted().collect())
    }

    /// Inserts or overwrites `key`, detaching the previous child.
    #[instrument(level = "trace", skip(self))]
    pub fn map_set(&mut self, map: MapId, key: &str, value: Option<NodeId>) -> TreeResult<()> {
        let container = self.core_of(map.node())?;
        let previous = match self.map_body(map)?.entries.get(key).copied().flatten() {
            Some(occupant) => Some((occupant, self.check_detachable(container, occupant)?)),
            None => None,
        };
        let releasing: Vec<_> = previous.iter().map(|(_, core)| *core).collect();
        let incoming = match value {
            Some(node) => Some((node, self.check_attachable(container, node, &releasing)?)),
            None => None,
        };

        if let Some((occupant, core)) = previous {
            self.cores.detach(core, occupant)?;
        }
        if let Some((node, core)) = incoming {
            self.cores.attach(core, container, node)?;
        }
        self.map_body_mut(map)?.entries.insert(key.to_string(), value);
        self.cores.bump(container);
        Ok(())
    }

    /// Removes `key`, detaching its child.
    ///
    /// Bumps the map even when the key was absent: every delete counts as a
    /// change for observers.
    #[instrument(level = "trace", skip(self))]
    pub fn map_delete(&mut self, map: MapId, key: &str) -> TreeResult<()> {
        let container = self.core_of(map.node())?;
        let (previous, present) = self.map_get_with_presence(map, key)?;
        let previous = match previous {
            Some(occupant) => Some((occupant, self.check_detachable(container, occupant)?)),
            None => None,
        };

        if let Some((occupant, core)) = previous {
            self.cores.detach(core, occupant)?;
        }
        if present {
            self.map_body_mut(map)?.entries.remove(key);
        } else {
            trace!(%map, key, "deleting absent key");
        }
        self.cores.bump(container);
        Ok(())
    }
}
