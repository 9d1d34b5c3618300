//! Sequence nodes: ordered, resizable, sliceable lists of optional children.
//!
//! A sequence is a window `(buffer, start, len, cap)` over a backing buffer
//! held by the arena. Views and the results of [`TreeArena::append`] are new
//! sequence objects over the same buffer that share the version/parent core
//! of their source, so a view is a lens onto its source rather than an
//! independently attachable node.

use std::ops::Range;

use tracing::{debug, instrument};

use crate::arena::{Body, BufId, NodeId, SeqBody, SeqId, TreeArena};
use crate::errors::{TreeError, TreeResult};
use crate::version::CoreId;

impl SeqBody {
    fn slots(&self) -> Range<usize> {
        self.start..self.start + self.len
    }

    fn window(&self, low: usize, high: usize, max: usize) -> TreeResult<SeqBody> {
        if low > high || high > max || max > self.cap {
            return Err(TreeError::InvalidRange {
                low,
                high,
                max,
                cap: self.cap,
            });
        }
        Ok(SeqBody {
            buf: self.buf,
            start: self.start + low,
            len: high - low,
            cap: max - low,
        })
    }
}

impl TreeArena {
    /// Creates a detached sequence of `len` empty slots with room for `cap`.
    #[instrument(level = "trace", skip(self))]
    pub fn make_seq(&mut self, len: usize, cap: usize) -> TreeResult<SeqId> {
        if cap < len {
            return Err(TreeError::InvalidRange {
                low: 0,
                high: len,
                max: cap,
                cap,
            });
        }
        let buf = BufId(self.buffers.insert(vec![None; cap]));
        let body = SeqBody {
            buf,
            start: 0,
            len,
            cap,
        };
        Ok(SeqId(self.insert_node(Body::Seq(body))))
    }

    pub fn seq_len(&self, seq: SeqId) -> TreeResult<usize> {
        Ok(self.seq_body(seq)?.len)
    }

    pub fn seq_cap(&self, seq: SeqId) -> TreeResult<usize> {
        Ok(self.seq_body(seq)?.cap)
    }

    pub fn seq_get(&self, seq: SeqId, index: usize) -> TreeResult<Option<NodeId>> {
        let body = self.seq_body(seq)?;
        if index >= body.len {
            return Err(TreeError::IndexOutOfBounds {
                index,
                len: body.len,
            });
        }
        Ok(self.buffers[body.buf.0][body.start + index])
    }

    /// Slots of the sequence in order.
    pub fn seq_slots(&self, seq: SeqId) -> TreeResult<Vec<Option<NodeId>>> {
        let body = self.seq_body(seq)?;
        Ok(self.buffers[body.buf.0][body.slots()].to_vec())
    }

    /// Replaces slot `index`, detaching the previous occupant and attaching `value`.
    ///
    /// An empty `value` clears the slot. The sequence version is bumped even
    /// when the slot was already empty.
    #[instrument(level = "trace", skip(self))]
    pub fn seq_set(&mut self, seq: SeqId, index: usize, value: Option<NodeId>) -> TreeResult<()> {
        let body = self.seq_body(seq)?.clone();
        if index >= body.len {
            return Err(TreeError::IndexOutOfBounds {
                index,
                len: body.len,
            });
        }
        let container = self.core_of(seq.node())?;
        let slot = body.start + index;

        let previous = match self.buffers[body.buf.0][slot] {
            Some(occupant) => Some((occupant, self.check_detachable(container, occupant)?)),
            None => None,
        };
        let releasing: Vec<CoreId> = previous.iter().map(|(_, core)| *core).collect();
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
        self.buffers[body.buf.0][slot] = value;
        self.cores.bump(container);
        Ok(())
    }

    /// View over `[low, high)` of `seq`, sharing its buffer and version core.
    ///
    /// `high` may reach into spare capacity; the view's capacity is
    /// `cap(seq) - low`.
    #[instrument(level = "trace", skip(self))]
    pub fn view(&mut self, seq: SeqId, low: usize, high: usize) -> TreeResult<SeqId> {
        let body = self.seq_body(seq)?;
        let window = body.window(low, high, body.cap)?;
        let core = self.core_of(seq.node())?;
        Ok(SeqId(self.insert_view(core, Body::Seq(window))))
    }

    /// As [`TreeArena::view`] with the capacity capped at `max - low`.
    #[instrument(level = "trace", skip(self))]
    pub fn view3(&mut self, seq: SeqId, low: usize, high: usize, max: usize) -> TreeResult<SeqId> {
        let window = self.seq_body(seq)?.window(low, high, max)?;
        let core = self.core_of(seq.node())?;
        Ok(SeqId(self.insert_view(core, Body::Seq(window))))
    }

    /// Appends `values` and returns the longer sequence.
    ///
    /// The receiver keeps its length. With enough spare capacity the values
    /// are written in place and become visible to other views of the buffer,
    /// detaching whatever those spare slots held; otherwise the contents are
    /// copied into a new buffer that older views do not see. Either way the
    /// shared core is bumped exactly once.
    #[instrument(level = "trace", skip(self))]
    pub fn append(&mut self, seq: SeqId, values: &[Option<NodeId>]) -> TreeResult<SeqId> {
        let body = self.seq_body(seq)?.clone();
        let container = self.core_of(seq.node())?;

        let mut incoming: Vec<(NodeId, CoreId)> = Vec::new();
        for node in values.iter().flatten() {
            let core = self.check_attachable(container, *node, &[])?;
            if incoming.iter().any(|(_, seen)| *seen == core) {
                return Err(TreeError::AlreadyAttached(*node));
            }
            incoming.push((*node, core));
        }

        let new_len = body.len + values.len();
        let grown = if new_len <= body.cap {
            let tail = body.start + body.len..body.start + new_len;
            let mut evicted: Vec<(NodeId, CoreId)> = Vec::new();
            for occupant in self.buffers[body.buf.0][tail.clone()].iter().flatten() {
                let core = self.core_of(*occupant)?;
                if self.cores.parent(core) == Some(container) {
                    evicted.push((*occupant, core));
                }
            }
            for (occupant, core) in evicted {
                self.cores.detach(core, occupant)?;
            }
            let buffer = &mut self.buffers[body.buf.0];
            for (slot, value) in tail.zip(values) {
                buffer[slot] = *value;
            }
            SeqBody {
                len: new_len,
                ..body
            }
        } else {
            let cap = (body.cap * self.settings.sequence.growth_factor)
                .max(self.settings.sequence.min_capacity)
                .max(new_len);
            let mut buffer = Vec::with_capacity(cap);
            buffer.extend_from_slice(&self.buffers[body.buf.0][body.slots()]);
            buffer.extend_from_slice(values);
            buffer.resize(cap, None);
            debug!(%seq, old_cap = body.cap, cap, "reallocated sequence buffer");
            SeqBody {
                buf: BufId(self.buffers.insert(buffer)),
                start: 0,
                len: new_len,
                cap,
            }
        };

        for (node, core) in incoming {
            self.cores.attach(core, container, node)?;
        }
        let appended = SeqId(self.insert_view(container, Body::Seq(grown)));
        self.cores.bump(container);
        Ok(appended)
    }

    /// Moves every slot of `src` into the slot at the same index of `dst`.
    ///
    /// Non-empty children are re-parented to `dst`, `src` ends up all empty and
    /// whatever `dst` held before is detached. Both sequences must have the
    /// same length. `src` and then `dst` are bumped once each.
    #[instrument(level = "trace", skip(self))]
    pub fn move_all(&mut self, dst: SeqId, src: SeqId) -> TreeResult<()> {
        let dst_body = self.seq_body(dst)?.clone();
        let src_body = self.seq_body(src)?.clone();
        if dst_body.len != src_body.len {
            return Err(TreeError::LengthMismatch {
                dst: dst_body.len,
                src: src_body.len,
            });
        }
        let dst_core = self.core_of(dst.node())?;
        let src_core = self.core_of(src.node())?;

        let moved = self.buffers[src_body.buf.0][src_body.slots()].to_vec();
        let mut movers: Vec<(NodeId, CoreId)> = Vec::new();
        for node in moved.iter().flatten() {
            let core = self.check_detachable(src_core, *node)?;
            if movers.iter().any(|(_, seen)| *seen == core) {
                continue;
            }
            if dst_core != src_core && self.would_cycle(core, dst_core) {
                return Err(TreeError::CycleDetected(*node));
            }
            movers.push((*node, core));
        }

        let mut evicted: Vec<(NodeId, CoreId)> = Vec::new();
        for occupant in self.buffers[dst_body.buf.0][dst_body.slots()].iter().flatten() {
            let core = self.core_of(*occupant)?;
            let known = movers.iter().chain(evicted.iter()).any(|(_, seen)| *seen == core);
            if !known {
                evicted.push((*occupant, self.check_detachable(dst_core, *occupant)?));
            }
        }

        for (occupant, core) in evicted {
            self.cores.detach(core, occupant)?;
        }
        for (node, core) in movers {
            self.cores.detach(core, node)?;
            self.cores.attach(core, dst_core, node)?;
        }
        for slot in &mut self.buffers[src_body.buf.0][src_body.slots()] {
            *slot = None;
        }
        self.buffers[dst_body.buf.0][dst_body.slots()].copy_from_slice(&moved);

        self.cores.bump(src_core);
        self.cores.bump(dst_core);
        Ok(())
    }
}
