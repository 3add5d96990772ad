//! Data structures for the prefix forest

use crate::annotation::Annotation;
use crate::helpers::Family;
use ipnet::IpNet;

/// Stable arena index of a node; never reused for the lifetime of the tree.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// `None` once the arena has outgrown the index type.
    #[inline]
    pub(crate) fn from_index(index: usize) -> Option<Self> {
        u32::try_from(index).ok().map(NodeId)
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Node in the forest. Children are owned through the arena and kept in
/// ascending `sort_key` order; `parent` is a back-reference only.
#[derive(Debug, Clone)]
pub struct Node {
    pub network: IpNet,
    pub annotation: Annotation,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Node {
    pub(crate) fn new(network: IpNet, annotation: Annotation, parent: Option<NodeId>) -> Self {
        Self {
            network,
            annotation,
            parent,
            children: Vec::new(),
        }
    }
}

/// A sibling list: one family's roots, or the children of a node.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Level {
    Roots(Family),
    Children(NodeId),
}

impl Level {
    #[inline]
    pub(crate) fn below(parent: Option<NodeId>, family: Family) -> Self {
        match parent {
            Some(id) => Level::Children(id),
            None => Level::Roots(family),
        }
    }
}

/// What an insert did to the tree.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new node was linked under `parent` (or as a root).
    Created { id: NodeId, parent: Option<NodeId> },
    /// An identical network held a placeholder; the incoming data replaced it.
    Upgraded { id: NodeId },
    /// An identical network already held data (or the incoming data was not real).
    Unchanged { id: NodeId },
}

impl InsertOutcome {
    #[inline]
    pub fn is_created(&self) -> bool {
        matches!(self, InsertOutcome::Created { .. })
    }
}

/// Per-outcome counts for a batch of inserts.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct InsertTally {
    pub created: u64,
    pub upgraded: u64,
    pub unchanged: u64,
    /// Inserts that found an existing supernet (identical ones included).
    pub with_parent: u64,
    pub without_parent: u64,
}

impl InsertTally {
    pub fn record(&mut self, outcome: InsertOutcome) {
        match outcome {
            InsertOutcome::Created { parent, .. } => {
                self.created += 1;
                if parent.is_some() {
                    self.with_parent += 1;
                } else {
                    self.without_parent += 1;
                }
            }
            InsertOutcome::Upgraded { .. } => {
                self.upgraded += 1;
                self.with_parent += 1;
            }
            InsertOutcome::Unchanged { .. } => {
                self.unchanged += 1;
                self.with_parent += 1;
            }
        }
    }

    pub fn merge(&mut self, other: InsertTally) {
        self.created += other.created;
        self.upgraded += other.upgraded;
        self.unchanged += other.unchanged;
        self.with_parent += other.with_parent;
        self.without_parent += other.without_parent;
    }

    pub fn total(&self) -> u64 {
        self.created + self.upgraded + self.unchanged
    }
}
