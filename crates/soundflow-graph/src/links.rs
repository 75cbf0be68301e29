//! The structural link table.
//!
//! Links record which output slot feeds which input slot, separately from
//! the live render-side wiring. The table is a dense ordered sequence so
//! connections can be drawn and persisted in creation order; removal
//! compacts by shifting, never by swapping, which keeps that order stable.

use crate::error::GraphError;
use crate::node::NodeId;
use alloc::vec;
use alloc::vec::Vec;

/// A directed connection from a producer's output slot to a consumer's
/// input slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    /// Node receiving audio.
    pub consumer: NodeId,
    /// Input slot on the consumer.
    pub consumer_slot: usize,
    /// Node supplying audio.
    pub producer: NodeId,
    /// Output slot on the producer.
    pub producer_slot: usize,
}

/// Dense ordered table of [`Link`] records with a fixed ceiling.
///
/// The table does not know port shapes; callers validate endpoints against
/// the registry before inserting.
pub struct LinkTable {
    links: Vec<Link>,
    capacity: usize,
}

impl LinkTable {
    /// Table holding at most `capacity` links.
    pub fn new(capacity: usize) -> Self {
        Self {
            links: Vec::new(),
            capacity,
        }
    }

    /// Record a link.
    ///
    /// An input slot holds one producer: inserting over an occupied consumer
    /// slot removes the old entry and returns it so the caller can detach
    /// its producer exactly once. A full table rejects only genuinely new
    /// links; replacement always succeeds. Failure leaves the table
    /// untouched.
    pub fn insert(&mut self, link: Link) -> Result<Option<Link>, GraphError> {
        let replaced = self.unlink_consumer(link.consumer, link.consumer_slot);
        if replaced.is_none() && self.links.len() == self.capacity {
            return Err(GraphError::PoolExhausted {
                capacity: self.capacity,
            });
        }
        self.links.push(link);
        Ok(replaced)
    }

    /// Remove the link (if any) feeding `consumer`'s input slot.
    pub fn unlink_consumer(&mut self, consumer: NodeId, slot: usize) -> Option<Link> {
        let pos = self
            .links
            .iter()
            .position(|l| l.consumer == consumer && l.consumer_slot == slot)?;
        Some(self.links.remove(pos))
    }

    /// Remove every link leaving `producer`'s output slot (fan-out removes
    /// them all). Returns the removed links in table order.
    pub fn unlink_producer(&mut self, producer: NodeId, slot: usize) -> Vec<Link> {
        self.take_matching(|l| l.producer == producer && l.producer_slot == slot)
    }

    /// Remove every link touching `id` on either side.
    pub fn remove_node(&mut self, id: NodeId) -> Vec<Link> {
        self.take_matching(|l| l.producer == id || l.consumer == id)
    }

    /// The link (if any) occupying `consumer`'s input slot.
    pub fn find_by_consumer(&self, consumer: NodeId, slot: usize) -> Option<&Link> {
        self.links
            .iter()
            .find(|l| l.consumer == consumer && l.consumer_slot == slot)
    }

    /// All links leaving `producer`'s output slot, in table order.
    pub fn find_by_producer(&self, producer: NodeId, slot: usize) -> impl Iterator<Item = &Link> {
        self.links
            .iter()
            .filter(move |l| l.producer == producer && l.producer_slot == slot)
    }

    /// All links leaving `producer`, any output slot.
    pub fn links_from(&self, producer: NodeId) -> impl Iterator<Item = &Link> {
        self.links.iter().filter(move |l| l.producer == producer)
    }

    /// Iterate links in table order.
    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    /// Current link count.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// True when the table holds no links.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Configured ceiling.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether linking `producer` into `consumer` would close a feedback
    /// loop, i.e. whether audio leaving `consumer` already reaches
    /// `producer`.
    pub fn would_cycle(&self, consumer: NodeId, producer: NodeId) -> bool {
        if consumer == producer {
            return true;
        }
        // Walk downstream from the consumer along the audio flow.
        let mut stack = vec![consumer];
        let mut visited: Vec<NodeId> = Vec::new();
        while let Some(n) = stack.pop() {
            if visited.contains(&n) {
                continue;
            }
            visited.push(n);
            for l in self.links_from(n) {
                if l.consumer == producer {
                    return true;
                }
                stack.push(l.consumer);
            }
        }
        false
    }

    fn take_matching(&mut self, mut pred: impl FnMut(&Link) -> bool) -> Vec<Link> {
        let mut removed = Vec::new();
        self.links.retain(|l| {
            if pred(l) {
                removed.push(*l);
                false
            } else {
                true
            }
        });
        removed
    }
}
