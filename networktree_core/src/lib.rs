pub mod annotation;
pub mod constants;
pub mod errors;
pub mod export;
pub mod geolite;
pub mod helpers;
pub mod pipeline;
pub mod positions;
pub mod registry;
pub mod shared;
pub mod telemetry;
pub mod types;

pub use crate::annotation::{Annotation, GeoRecord, Location, Position};
pub use crate::errors::{Error, ErrorKind, Result};
pub use crate::helpers::Family;
pub use crate::shared::SharedTree;
pub use crate::types::{InsertOutcome, InsertTally, Level, NodeId};

use constants::{DEFAULT_PRECISION, MAX_NODES, MIN_PRECISION};
use helpers::*;
use ipnet::IpNet;
use log::{debug, error, trace};
use metrics::{counter, gauge};
use std::net::IpAddr;
use types::Node;

/// Two forests of non-overlapping networks, one per address family.
///
/// Every sibling list is sorted by [`helpers::sort_key`] and holds at most
/// `precision` entries once an insert returns. Nodes live in an arena and
/// refer to each other by [`NodeId`], so reparenting is an index update
/// plus two splices.
#[derive(Debug, Clone)]
pub struct PrefixTree {
    nodes: Vec<Node>,
    roots_v4: Vec<NodeId>,
    roots_v6: Vec<NodeId>,
    precision: usize,
    aggregates: usize,
    node_limit: usize,
}

impl Default for PrefixTree {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            roots_v4: Vec::new(),
            roots_v6: Vec::new(),
            precision: DEFAULT_PRECISION,
            aggregates: 0,
            node_limit: MAX_NODES,
        }
    }
}

impl PrefixTree {
    pub fn new(precision: usize) -> Result<Self> {
        if precision < MIN_PRECISION {
            return Err(Error::InvalidPrecision(precision));
        }
        Ok(Self {
            precision,
            ..Self::default()
        })
    }

    /// Cap the number of stored networks, aggregates included. Inserts
    /// that would allocate past the cap fail with [`Error::NodeLimit`].
    pub fn with_node_limit(mut self, limit: usize) -> Self {
        self.node_limit = limit.min(MAX_NODES);
        self
    }

    /// Number of distinct networks stored, aggregates included.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn precision(&self) -> usize {
        self.precision
    }

    /// Nodes still holding the sentinel annotation.
    #[inline]
    pub fn aggregate_count(&self) -> usize {
        self.aggregates
    }

    /// Emit size gauges.
    pub fn report_metrics(&self) {
        gauge!("networktree_nodes").set(self.len() as f64);
        gauge!("networktree_aggregates").set(self.aggregates as f64);
    }

    // ---- arena access --------------------------------------------------------

    #[inline]
    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    fn level(&self, level: Level) -> &[NodeId] {
        match level {
            Level::Roots(Family::V4) => &self.roots_v4,
            Level::Roots(Family::V6) => &self.roots_v6,
            Level::Children(id) => &self.node(id).children,
        }
    }

    fn level_mut(&mut self, level: Level) -> &mut Vec<NodeId> {
        match level {
            Level::Roots(Family::V4) => &mut self.roots_v4,
            Level::Roots(Family::V6) => &mut self.roots_v6,
            Level::Children(id) => &mut self.node_mut(id).children,
        }
    }

    #[inline]
    fn base_of(&self, id: NodeId) -> u128 {
        addr_to_u128(self.node(id).network.network())
    }

    /// The only sibling that can contain `key`: the last one whose base
    /// address is not above it. Siblings are disjoint, so every later
    /// sibling starts past this one's broadcast address.
    fn candidate(&self, list: &[NodeId], key: u128) -> Option<NodeId> {
        let idx = list.partition_point(|&id| self.base_of(id) <= key);
        idx.checked_sub(1).map(|i| list[i])
    }

    // ---- queries -------------------------------------------------------------

    fn closest_supernet_id(&self, network: &IpNet) -> Option<NodeId> {
        let key = addr_to_u128(network.network());
        let mut list = self.level(Level::Roots(Family::of(network)));
        let mut found = None;
        while let Some(id) = self.candidate(list, key) {
            let node = self.node(id);
            if !node.network.contains(network) {
                break;
            }
            found = Some(id);
            list = node.children.as_slice();
        }
        found
    }

    fn find_network_id(&self, addr: IpAddr) -> Option<NodeId> {
        let key = addr_to_u128(addr);
        let mut list = self.level(Level::Roots(Family::of_addr(&addr)));
        let mut found = None;
        while let Some(id) = self.candidate(list, key) {
            let node = self.node(id);
            if !node.network.contains(&addr) {
                break;
            }
            found = Some(id);
            list = node.children.as_slice();
        }
        found
    }

    /// Deepest stored network containing `network` (an identical one included).
    pub fn closest_supernet(&self, network: &IpNet) -> Option<NodeRef<'_>> {
        self.closest_supernet_id(&network.trunc())
            .map(|id| NodeRef { tree: self, id })
    }

    /// Most specific stored network covering `addr`, or `None` in an unindexed gap.
    pub fn find_network(&self, addr: IpAddr) -> Option<NodeRef<'_>> {
        self.find_network_id(addr).map(|id| NodeRef { tree: self, id })
    }

    /// Exact match.
    pub fn get(&self, network: &IpNet) -> Option<NodeRef<'_>> {
        let network = network.trunc();
        self.closest_supernet_id(&network)
            .filter(|&id| self.node(id).network == network)
            .map(|id| NodeRef { tree: self, id })
    }

    pub fn roots(&self, family: Family) -> impl ExactSizeIterator<Item = NodeRef<'_>> + '_ {
        self.level(Level::Roots(family))
            .iter()
            .map(move |&id| NodeRef { tree: self, id })
    }

    /// Depth-first pre-order walk over the IPv4 forest, then the IPv6 forest.
    pub fn iter(&self) -> Iter<'_> {
        let stack = self
            .roots_v6
            .iter()
            .rev()
            .chain(self.roots_v4.iter().rev())
            .copied()
            .collect();
        Iter { tree: self, stack }
    }

    /// Networks holding real data, with that data.
    pub fn real_entries(&self) -> impl Iterator<Item = (IpNet, &Annotation)> + '_ {
        self.iter()
            .filter(|n| n.annotation().is_real())
            .map(|n| (n.network(), n.annotation()))
    }

    // ---- insertion -----------------------------------------------------------

    /// Insert `network` with `annotation`, merging with an identical network
    /// already present and rebalancing any sibling list pushed over the bound.
    ///
    /// Fails only when the node limit is reached. The networks placed before
    /// that point stay linked, but a level may be left over the bound.
    pub fn insert(&mut self, network: IpNet, annotation: Annotation) -> Result<InsertOutcome> {
        counter!("networktree_inserts_total").increment(1);
        let network = network.trunc();
        let outcome = self.place(network, annotation)?;
        trace!("[INSERT] network={}, outcome={:?}", network, outcome);

        if let InsertOutcome::Created { id, parent } = outcome {
            self.enforce_bound(Level::below(parent, Family::of(&network)))?;
            self.enforce_bound(Level::Children(id))?;
        }

        if cfg!(feature = "audit") {
            if let Err(e) = self.validate() {
                error!("[INSERT] audit failed after {}: {}", network, e);
                return Err(e);
            }
        }
        Ok(outcome)
    }

    /// Insert every network of one record with a shared annotation.
    pub fn insert_all(
        &mut self,
        networks: &[IpNet],
        annotation: &Annotation,
    ) -> Result<InsertTally> {
        let mut tally = InsertTally::default();
        for &network in networks {
            tally.record(self.insert(network, annotation.clone())?);
        }
        Ok(tally)
    }

    /// Link `network` below its closest supernet without enforcing the bound.
    fn place(&mut self, network: IpNet, annotation: Annotation) -> Result<InsertOutcome> {
        let family = Family::of(&network);
        let parent = self.closest_supernet_id(&network);

        if let Some(id) = parent.filter(|&id| self.node(id).network == network) {
            let node = self.node_mut(id);
            if !node.annotation.accepts(&annotation) {
                return Ok(InsertOutcome::Unchanged { id });
            }
            let was_sentinel = node.annotation.is_sentinel();
            node.annotation = annotation;
            if was_sentinel {
                self.aggregates -= 1;
            }
            return Ok(InsertOutcome::Upgraded { id });
        }

        let id = Some(self.nodes.len())
            .filter(|&len| len < self.node_limit)
            .and_then(NodeId::from_index)
            .ok_or(Error::NodeLimit(self.node_limit))?;
        let level = Level::below(parent, family);

        // Siblings starting inside `network` are contained in it: none of
        // them contains it, or the supernet search would have descended.
        let first = addr_to_u128(network.network());
        let last = addr_to_u128(network.broadcast());
        let list = self.level(level);
        let lo = list.partition_point(|&s| self.base_of(s) < first);
        let hi = lo + list[lo..].partition_point(|&s| self.base_of(s) <= last);

        let moved: Vec<NodeId> = self
            .level_mut(level)
            .splice(lo..hi, std::iter::once(id))
            .collect();
        for &child in &moved {
            debug_assert!(network.contains(&self.node(child).network));
            self.node_mut(child).parent = Some(id);
        }

        if annotation.is_sentinel() {
            self.aggregates += 1;
        }
        let mut node = Node::new(network, annotation, parent);
        node.children = moved;
        self.nodes.push(node);
        Ok(InsertOutcome::Created { id, parent })
    }

    fn enforce_bound(&mut self, level: Level) -> Result<()> {
        if self.level(level).len() > self.precision {
            self.rebalance(level)?;
        }
        Ok(())
    }

    fn span(&self, level: Level) -> Option<(IpNet, IpNet)> {
        let list = self.level(level);
        let first = self.node(*list.first()?).network;
        let last = self.node(*list.last()?).network;
        Some((first, last))
    }

    /// Cover the level's address span with sentinel aggregates so that its
    /// siblings move one level down.
    fn rebalance(&mut self, level: Level) -> Result<()> {
        let Some((first, last)) = self.span(level) else {
            return Ok(());
        };
        debug_assert_eq!(
            Family::of(&first),
            Family::of(&last),
            "sibling list mixes address families"
        );
        if Family::of(&first) != Family::of(&last) {
            return Ok(());
        }
        counter!("networktree_rebalances_total").increment(1);
        debug!(
            "[REBALANCE] {} siblings spanning {} .. {}",
            self.level(level).len(),
            first.network(),
            last.broadcast()
        );

        let mut created = Vec::new();
        for cover in covering_networks(first.network(), last.broadcast()) {
            if let InsertOutcome::Created { id, .. } = self.place(cover, Annotation::Sentinel)? {
                created.push(id);
            }
        }

        // The cover can coincide with existing siblings or with the parent
        // itself, leaving the level as wide as before.
        if self.level(level).len() > self.precision {
            self.bisect(level, &mut created)?;
        }

        for id in created {
            self.enforce_bound(Level::Children(id))?;
        }
        Ok(())
    }

    /// Split the narrowest network spanning the level into its two halves.
    /// Each sibling is strictly narrower than that span, so it falls into
    /// exactly one half and the level ends with two entries.
    fn bisect(&mut self, level: Level, created: &mut Vec<NodeId>) -> Result<()> {
        let Some((first, last)) = self.span(level) else {
            return Ok(());
        };
        let Some((lower, upper)) = common_supernet(&first, &last).and_then(|s| halves(&s)) else {
            return Ok(());
        };
        debug!("[REBALANCE] bisecting into {} and {}", lower, upper);
        for half in [lower, upper] {
            if let InsertOutcome::Created { id, .. } = self.place(half, Annotation::Sentinel)? {
                created.push(id);
            }
        }
        Ok(())
    }

    // ---- invariants ----------------------------------------------------------

    /// Audit every sibling list: ascending order, pairwise disjoint entries,
    /// strict containment in the parent, consistent back-references, one
    /// family per forest and fan-out within the precision bound.
    pub fn validate(&self) -> Result<()> {
        let mut seen = 0;
        let mut aggregates = 0;
        for family in [Family::V4, Family::V6] {
            self.validate_level(
                Level::Roots(family),
                None,
                family,
                &mut seen,
                &mut aggregates,
            )?;
        }
        if seen != self.nodes.len() {
            return Err(Error::invariant(format!(
                "{} nodes reachable, {} allocated",
                seen,
                self.nodes.len()
            )));
        }
        if aggregates != self.aggregates {
            return Err(Error::invariant(format!(
                "{} sentinel nodes found, {} counted",
                aggregates, self.aggregates
            )));
        }
        Ok(())
    }

    fn validate_level(
        &self,
        level: Level,
        parent: Option<NodeId>,
        family: Family,
        seen: &mut usize,
        aggregates: &mut usize,
    ) -> Result<()> {
        let list = self.level(level);
        if list.len() > self.precision {
            return Err(Error::invariant(format!(
                "{:?} holds {} siblings, bound is {}",
                level,
                list.len(),
                self.precision
            )));
        }
        for pair in list.windows(2) {
            let (a, b) = (&self.node(pair[0]).network, &self.node(pair[1]).network);
            if !comes_before(a, b) {
                return Err(Error::invariant(format!("siblings {a} and {b} out of order")));
            }
            if !disjoint(a, b) {
                return Err(Error::invariant(format!("siblings {a} and {b} overlap")));
            }
        }
        for &id in list {
            let node = self.node(id);
            if Family::of(&node.network) != family {
                return Err(Error::invariant(format!(
                    "{} stored in the {} forest",
                    node.network,
                    family.as_str()
                )));
            }
            if node.parent != parent {
                return Err(Error::invariant(format!(
                    "{} points at {:?}, linked under {:?}",
                    node.network, node.parent, parent
                )));
            }
            if let Some(p) = parent {
                let outer = &self.node(p).network;
                if *outer == node.network || !outer.contains(&node.network) {
                    return Err(Error::invariant(format!(
                        "{} is not strictly inside its parent {}",
                        node.network, outer
                    )));
                }
            }
            *seen += 1;
            if node.annotation.is_sentinel() {
                *aggregates += 1;
            }
            self.validate_level(Level::Children(id), Some(id), family, seen, aggregates)?;
        }
        Ok(())
    }
}

/// Read-only handle to a stored node.
#[derive(Debug, Copy, Clone)]
pub struct NodeRef<'a> {
    tree: &'a PrefixTree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    #[inline]
    pub fn network(&self) -> IpNet {
        self.tree.node(self.id).network
    }

    #[inline]
    pub fn annotation(&self) -> &'a Annotation {
        &self.tree.node(self.id).annotation
    }

    /// A synthetic aggregate that no real record has claimed yet.
    #[inline]
    pub fn is_aggregate(&self) -> bool {
        self.annotation().is_sentinel()
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        let tree = self.tree;
        tree.node(self.id).parent.map(|id| NodeRef { tree, id })
    }

    pub fn children(&self) -> impl ExactSizeIterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        tree.node(self.id)
            .children
            .iter()
            .map(move |&id| NodeRef { tree, id })
    }

    /// Number of ancestors; roots are at depth 0.
    pub fn depth(&self) -> usize {
        std::iter::successors(self.parent(), |p| p.parent()).count()
    }
}

/// Pre-order iterator returned by [`PrefixTree::iter`].
pub struct Iter<'a> {
    tree: &'a PrefixTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.node(id).children.iter().rev().copied());
        Some(NodeRef {
            tree: self.tree,
            id,
        })
    }
}
