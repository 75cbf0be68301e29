//! Fixed-capacity node pool with z-ordered iteration.
//!
//! Storage is an arena of reusable slots plus a free list; identity comes
//! from a monotonic counter, so ids are never reused even when slots are.
//! The z-order (bottom of the draw stack first) is a doubly linked index
//! list threaded through the occupied slots, which keeps raising a node to
//! the top O(1) once its slot is known.

use crate::error::GraphError;
use crate::node::{Node, NodeId, NodeKind, Rect};
use alloc::string::String;
use alloc::vec::Vec;

struct Slot {
    node: Node,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Owns every live [`Node`] and their z-order.
pub struct NodeRegistry {
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    next_id: u32,
    len: usize,
}

impl NodeRegistry {
    /// Registry with a fixed slot `capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            free: (0..capacity).rev().collect(),
            head: None,
            tail: None,
            next_id: 0,
            len: 0,
        }
    }

    /// Register a node: assign the next identity and append it to the top
    /// of the z-order.
    pub fn insert(
        &mut self,
        kind: NodeKind,
        name: &str,
        inputs: usize,
        outputs: usize,
        bounds: Rect,
        source_path: Option<String>,
    ) -> Result<NodeId, GraphError> {
        let Some(slot) = self.free.pop() else {
            return Err(GraphError::PoolExhausted {
                capacity: self.slots.len(),
            });
        };
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.slots[slot] = Some(Slot {
            node: Node::new(
                id,
                String::from(name),
                kind,
                inputs,
                outputs,
                bounds,
                source_path,
            ),
            prev: None,
            next: None,
        });
        self.push_top(slot);
        self.len += 1;
        Ok(id)
    }

    /// Remove a node, returning it. Unknown ids yield `None`, so removal is
    /// idempotent and safe to call speculatively.
    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        let slot = self.slot_of(id)?;
        self.unlink(slot);
        let taken = self.slots[slot].take()?;
        self.free.push(slot);
        self.len -= 1;
        Some(taken.node)
    }

    /// Look up a node by id.
    pub fn find(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .iter()
            .flatten()
            .map(|s| &s.node)
            .find(|n| n.id() == id)
    }

    /// Mutable lookup, e.g. for moving a node on the canvas.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .iter_mut()
            .flatten()
            .map(|s| &mut s.node)
            .find(|n| n.id() == id)
    }

    /// Move `id` to the top of the z-order. Returns false when absent.
    pub fn bring_to_front(&mut self, id: NodeId) -> bool {
        let Some(slot) = self.slot_of(id) else {
            return false;
        };
        if self.tail == Some(slot) {
            return true;
        }
        self.unlink(slot);
        self.push_top(slot);
        true
    }

    /// Whether `id` is live.
    pub fn contains(&self, id: NodeId) -> bool {
        self.find(id).is_some()
    }

    /// Live node count.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no nodes are registered.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Configured slot ceiling.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Iterate nodes bottom-to-top in z-order.
    pub fn iter(&self) -> ZOrderIter<'_> {
        ZOrderIter {
            registry: self,
            cursor: self.head,
        }
    }

    fn slot_of(&self, id: NodeId) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.as_ref().is_some_and(|s| s.node.id() == id))
    }

    // Append an occupied slot (with cleared list fields) at the top.
    fn push_top(&mut self, slot: usize) {
        if let Some(top) = self.tail {
            if let Some(s) = self.slots[top].as_mut() {
                s.next = Some(slot);
            }
            if let Some(s) = self.slots[slot].as_mut() {
                s.prev = Some(top);
            }
        } else {
            self.head = Some(slot);
        }
        self.tail = Some(slot);
    }

    // Detach a slot from the z-order list, clearing its list fields.
    fn unlink(&mut self, slot: usize) {
        let Some((prev, next)) = self.slots[slot].as_ref().map(|s| (s.prev, s.next)) else {
            return;
        };
        match prev {
            Some(p) => {
                if let Some(s) = self.slots[p].as_mut() {
                    s.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(s) = self.slots[n].as_mut() {
                    s.prev = prev;
                }
            }
            None => self.tail = prev,
        }
        if let Some(s) = self.slots[slot].as_mut() {
            s.prev = None;
            s.next = None;
        }
    }
}

/// Iterator over nodes in z-order, bottom of the draw stack first.
pub struct ZOrderIter<'a> {
    registry: &'a NodeRegistry,
    cursor: Option<usize>,
}

impl<'a> Iterator for ZOrderIter<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.cursor?;
        let entry = self.registry.slots[slot].as_ref()?;
        self.cursor = entry.next;
        Some(&entry.node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    fn add(reg: &mut NodeRegistry, name: &str) -> NodeId {
        reg.insert(NodeKind::Delay, name, 1, 1, Rect::default(), None)
            .unwrap()
    }

    fn order(reg: &NodeRegistry) -> Vec<NodeId> {
        reg.iter().map(Node::id).collect()
    }

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut reg = NodeRegistry::new(4);
        let a = add(&mut reg, "a");
        let b = add(&mut reg, "b");
        reg.remove(a);
        let c = add(&mut reg, "c");
        assert_ne!(c, a);
        assert_eq!(c.raw(), b.raw() + 1);
    }

    #[test]
    fn insert_past_capacity_fails_cleanly() {
        let mut reg = NodeRegistry::new(2);
        add(&mut reg, "a");
        add(&mut reg, "b");
        let err = reg
            .insert(NodeKind::Endpoint, "c", 1, 0, Rect::default(), None)
            .unwrap_err();
        assert_eq!(err, GraphError::PoolExhausted { capacity: 2 });
        assert_eq!(reg.len(), 2);
        // The slot freed by removal becomes usable again.
        let a = order(&reg)[0];
        reg.remove(a);
        add(&mut reg, "d");
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn removal_is_idempotent() {
        let mut reg = NodeRegistry::new(4);
        let a = add(&mut reg, "a");
        assert!(reg.remove(a).is_some());
        assert!(reg.remove(a).is_none());
        assert_eq!(reg.len(), 0);
        assert!(reg.is_empty());
    }

    #[test]
    fn z_order_tracks_insertion_then_bring_to_front() {
        let mut reg = NodeRegistry::new(4);
        let a = add(&mut reg, "a");
        let b = add(&mut reg, "b");
        let c = add(&mut reg, "c");
        assert_eq!(order(&reg), vec![a, b, c]);

        assert!(reg.bring_to_front(a));
        assert_eq!(order(&reg), vec![b, c, a]);

        // Raising the top node is a no-op.
        assert!(reg.bring_to_front(a));
        assert_eq!(order(&reg), vec![b, c, a]);

        assert!(!reg.bring_to_front(NodeId(99)));
    }

    #[test]
    fn z_order_survives_removal_of_each_position() {
        let mut reg = NodeRegistry::new(8);
        let a = add(&mut reg, "a");
        let b = add(&mut reg, "b");
        let c = add(&mut reg, "c");
        let d = add(&mut reg, "d");

        reg.remove(b); // middle
        assert_eq!(order(&reg), vec![a, c, d]);
        reg.remove(a); // head
        assert_eq!(order(&reg), vec![c, d]);
        reg.remove(d); // tail
        assert_eq!(order(&reg), vec![c]);
        reg.remove(c);
        assert_eq!(order(&reg), Vec::new());
        assert_eq!(reg.iter().count(), 0);
    }

    #[test]
    fn reused_slot_lands_on_top_of_the_order() {
        let mut reg = NodeRegistry::new(2);
        let a = add(&mut reg, "a");
        let b = add(&mut reg, "b");
        reg.remove(a);
        let c = add(&mut reg, "c"); // reuses a's slot
        assert_eq!(order(&reg), vec![b, c]);
    }

    #[test]
    fn node_mut_allows_canvas_updates() {
        let mut reg = NodeRegistry::new(2);
        let a = add(&mut reg, "a");
        reg.node_mut(a).unwrap().bounds = Rect::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(reg.find(a).unwrap().bounds.x, 10.0);
        assert!(reg.node_mut(NodeId(42)).is_none());
    }
}
