use std::borrow::Borrow;
use std::collections::BTreeSet;

use itertools::Itertools;

use crate::flow::{Flow, FlowId};
use crate::opts::LinkOpts;
use crate::units::{Mbps, Millisecs};

/// A switch identifier. Node IDs are opaque tokens with no other attributes.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    derive_more::Display,
    derive_more::Deref,
    derive_more::From,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A directed, capacity- and utilization-tracked channel from `src` to `dst`.
///
/// `weight` and `delay` are stored for reporting only; path selection counts hops.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Link {
    pub src: NodeId,
    pub dst: NodeId,
    pub capacity: Mbps,
    pub weight: u32,
    pub delay: Millisecs,
    pub(crate) utilization: Mbps,
    pub(crate) flows: BTreeSet<FlowId>,
}

impl Link {
    pub(crate) fn new(src: NodeId, dst: NodeId, opts: &LinkOpts) -> Self {
        Self {
            src,
            dst,
            capacity: opts.capacity,
            weight: opts.weight,
            delay: opts.delay,
            utilization: Mbps::ZERO,
            flows: BTreeSet::new(),
        }
    }

    /// Sum of the bandwidths of all flows currently routed over this link.
    pub fn utilization(&self) -> Mbps {
        self.utilization
    }

    /// Get an iterator over the IDs of the flows routed over this link, in ascending order.
    pub fn flow_ids(&self) -> impl Iterator<Item = FlowId> + '_ {
        self.flows.iter().copied()
    }

    /// Capacity is never enforced, so this only reports the condition.
    pub fn is_oversubscribed(&self) -> bool {
        self.utilization > self.capacity
    }

    // Overwriting a link replaces its attributes but keeps the flows routed over it.
    pub(crate) fn reconfigure(&mut self, opts: &LinkOpts) {
        self.capacity = opts.capacity;
        self.weight = opts.weight;
        self.delay = opts.delay;
    }

    /// Returns false if routing `flow` over this link would overflow its utilization.
    pub(crate) fn can_absorb(&self, flow: &Flow) -> bool {
        self.flows.contains(&flow.id) || self.utilization.checked_add(flow.bandwidth).is_some()
    }

    pub(crate) fn push_flow(&mut self, flow: &Flow) {
        if self.flows.insert(flow.id) {
            self.utilization += flow.bandwidth;
        }
    }

    pub(crate) fn pop_flow(&mut self, flow: &Flow) {
        if self.flows.remove(&flow.id) {
            self.utilization -= flow.bandwidth;
        }
    }

    delegate::delegate! {
        to self.flows {
            #[call(len)]
            pub fn nr_flows(&self) -> usize;

            #[call(contains)]
            pub fn carries(&self, id: &FlowId) -> bool;
        }
    }
}

/// An ordered sequence of nodes. An empty path means "no path".
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Path {
    inner: Vec<NodeId>,
}

impl Path {
    pub fn new(nodes: Vec<NodeId>) -> Self {
        Self { inner: nodes }
    }

    /// Get an iterator over consecutive `(from, to)` pairs of the path.
    pub fn hops(&self) -> impl Iterator<Item = (&NodeId, &NodeId)> + '_ {
        self.inner.iter().tuple_windows()
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.inner
    }

    /// Returns true if the path visits `node`.
    pub fn visits(&self, node: &str) -> bool {
        self.inner.iter().any(|n| n.as_str() == node)
    }

    delegate::delegate! {
        to self.inner {
            pub fn len(&self) -> usize;

            pub fn is_empty(&self) -> bool;

            pub fn iter(&self) -> std::slice::Iter<'_, NodeId>;
        }
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.inner.iter().join(" -> "))
    }
}

impl From<Vec<NodeId>> for Path {
    fn from(nodes: Vec<NodeId>) -> Self {
        Self::new(nodes)
    }
}

impl<const N: usize> From<[&str; N]> for Path {
    fn from(nodes: [&str; N]) -> Self {
        nodes.into_iter().map(NodeId::from).collect()
    }
}

impl FromIterator<NodeId> for Path {
    fn from_iter<I: IntoIterator<Item = NodeId>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
