use petgraph::{
    stable_graph::{NodeIndex, StableDiGraph},
    visit::EdgeRef,
    Direction,
};
use rustc_hash::FxHashMap;

use crate::{
    network::types::{Link, NodeId, Path},
    opts::LinkOpts,
};

/// A mutable network topology: a set of nodes and the directed links between them.
///
/// Invariants:
///
/// - Every node ID maps to exactly one graph node.
/// - A link exists only if both of its endpoints are registered nodes.
/// - There is at most one link per `(src, dst)` pair.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    pub(crate) graph: StableDiGraph<NodeId, Link>,
    id2idx: FxHashMap<NodeId, NodeIndex>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node. Fails if a node with the same ID already exists.
    pub fn add_node(&mut self, id: NodeId) -> Result<(), Error> {
        if self.id2idx.contains_key(&id) {
            return Err(Error::DuplicateNode(id));
        }
        let idx = self.graph.add_node(id.clone());
        self.id2idx.insert(id, idx);
        Ok(())
    }

    /// Removes a node and every link that has it as either endpoint. Returns the number of links
    /// removed along with the node.
    pub fn remove_node(&mut self, id: &str) -> Result<usize, Error> {
        let idx = self.idx_of(id).ok_or_else(|| Error::UndeclaredNode(id.into()))?;
        let outgoing = self.graph.edges_directed(idx, Direction::Outgoing).count();
        // Self-loops were already counted as outgoing
        let incoming = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .filter(|e| e.source() != idx)
            .count();
        self.graph.remove_node(idx);
        self.id2idx.remove(id);
        Ok(outgoing + incoming)
    }

    /// Adds a directed link from `src` to `dst`, and the reverse link too if `opts.bidirectional`
    /// is set and the reverse does not exist yet. Returns the number of newly created links.
    ///
    /// Adding a link that already exists overwrites its attributes (last write wins) while the
    /// flows routed over it stay in place.
    pub fn add_link(&mut self, src: &str, dst: &str, opts: &LinkOpts) -> Result<usize, Error> {
        let a = self.idx_of(src).ok_or_else(|| Error::UndeclaredNode(src.into()))?;
        let b = self.idx_of(dst).ok_or_else(|| Error::UndeclaredNode(dst.into()))?;
        let mut created = 0;
        match self.graph.find_edge(a, b) {
            Some(eidx) => self.graph[eidx].reconfigure(opts),
            None => {
                let link = Link::new(self.graph[a].clone(), self.graph[b].clone(), opts);
                self.graph.add_edge(a, b, link);
                created += 1;
            }
        }
        if opts.bidirectional && self.graph.find_edge(b, a).is_none() {
            let reverse = LinkOpts {
                bidirectional: false,
                ..*opts
            };
            created += self.add_link(dst, src, &reverse)?;
        }
        Ok(created)
    }

    /// Removes the directed link from `src` to `dst`. The reverse link is left alone.
    pub fn remove_link(&mut self, src: &str, dst: &str) -> Result<Link, Error> {
        let eidx = self
            .idx_of(src)
            .zip(self.idx_of(dst))
            .and_then(|(a, b)| self.graph.find_edge(a, b))
            .ok_or_else(|| Error::MissingLink {
                src: src.into(),
                dst: dst.into(),
            })?;
        // The edge index was just looked up, so removal cannot miss
        self.graph.remove_edge(eidx).ok_or_else(|| Error::MissingLink {
            src: src.into(),
            dst: dst.into(),
        })
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.id2idx.contains_key(id)
    }

    pub fn contains_link(&self, src: &str, dst: &str) -> bool {
        self.link(src, dst).is_some()
    }

    pub fn link(&self, src: &str, dst: &str) -> Option<&Link> {
        let (a, b) = self.idx_of(src).zip(self.idx_of(dst))?;
        self.graph.find_edge(a, b).map(|eidx| &self.graph[eidx])
    }

    pub(crate) fn link_mut(&mut self, src: &str, dst: &str) -> Option<&mut Link> {
        let (a, b) = self.idx_of(src).zip(self.idx_of(dst))?;
        self.graph.find_edge(a, b).map(|eidx| &mut self.graph[eidx])
    }

    /// Returns true if the path has at least one hop and every hop is a link in the topology.
    pub fn is_valid_path(&self, path: &Path) -> bool {
        path.len() >= 2 && path.hops().all(|(a, b)| self.contains_link(a, b))
    }

    /// Get an iterator over the nodes reachable from `id` over one outgoing link, in the order
    /// the links were added. Unknown nodes have no neighbors.
    pub fn neighbors(&self, id: &str) -> impl Iterator<Item = &NodeId> + '_ {
        self.idx_of(id)
            .into_iter()
            .flat_map(move |idx| self.successors(idx))
            .map(move |succ| &self.graph[succ])
    }

    /// Get an iterator over the registered nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> + '_ {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    /// Get an iterator over all links.
    pub fn links(&self) -> impl Iterator<Item = &Link> + '_ {
        self.graph.edge_indices().map(move |eidx| &self.graph[eidx])
    }

    pub(crate) fn idx_of(&self, id: &str) -> Option<NodeIndex> {
        self.id2idx.get(id).copied()
    }

    // petgraph lists neighbors most-recent-first, so flip them back to insertion order.
    pub(crate) fn successors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut succs = self.graph.neighbors(idx).collect::<Vec<_>>();
        succs.reverse();
        succs
    }

    delegate::delegate! {
        to self.graph {
            #[call(node_count)]
            pub fn nr_nodes(&self) -> usize;

            #[call(edge_count)]
            pub fn nr_links(&self) -> usize;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Node {0} already exists")]
    DuplicateNode(NodeId),

    #[error("Node {0} is not declared")]
    UndeclaredNode(NodeId),

    #[error("No link from {src} to {dst}")]
    MissingLink { src: NodeId, dst: NodeId },
}
