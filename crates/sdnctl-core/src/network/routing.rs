//! This module defines how primary and backup paths are chosen for flows.

use std::collections::VecDeque;

use petgraph::{
    stable_graph::NodeIndex,
    visit::{VisitMap, Visitable},
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::network::{
    topology::Topology,
    types::{NodeId, Path},
};

/// The trait implemented by all routing algorithms.
pub trait RoutingAlgo {
    /// Return a path from `src` to `dst`, or `None` if they are disconnected or unknown.
    fn primary_path(&self, topology: &Topology, src: &str, dst: &str) -> Option<Path>;

    /// Return a path from `src` to `dst` that avoids the links of `primary`, if one exists.
    fn backup_path(&self, topology: &Topology, src: &str, dst: &str, primary: &Path)
        -> Option<Path>;
}

impl<R: RoutingAlgo> RoutingAlgo for &R {
    fn primary_path(&self, topology: &Topology, src: &str, dst: &str) -> Option<Path> {
        (**self).primary_path(topology, src, dst)
    }

    fn backup_path(
        &self,
        topology: &Topology,
        src: &str,
        dst: &str,
        primary: &Path,
    ) -> Option<Path> {
        (**self).backup_path(topology, src, dst, primary)
    }
}

/// Unweighted routing. Link weights and delays are ignored; only hop counts matter.
#[derive(Debug, Default, Clone, Copy)]
pub struct HopCountRouting;

impl RoutingAlgo for HopCountRouting {
    fn primary_path(&self, topology: &Topology, src: &str, dst: &str) -> Option<Path> {
        find_simple_path(topology, src, dst)
    }

    fn backup_path(
        &self,
        topology: &Topology,
        src: &str,
        dst: &str,
        primary: &Path,
    ) -> Option<Path> {
        find_backup_path(topology, src, dst, primary)
    }
}

/// Finds a path from `src` to `dst`, trying in order:
///
/// 1. the direct link,
/// 2. the first one-hop detour, scanning intermediate nodes in topology order,
/// 3. a breadth-first search, which yields a path with the fewest hops.
///
/// A node is trivially connected to itself by the single-node path.
pub fn find_simple_path(topology: &Topology, src: &str, dst: &str) -> Option<Path> {
    let g = &topology.graph;
    let start = topology.idx_of(src)?;
    let goal = topology.idx_of(dst)?;
    if start == goal {
        return Some(Path::new(vec![g[start].clone()]));
    }
    if g.contains_edge(start, goal) {
        return Some(path_of(topology, &[start, goal]));
    }
    for mid in g.node_indices() {
        if g.contains_edge(start, mid) && g.contains_edge(mid, goal) {
            return Some(path_of(topology, &[start, mid, goal]));
        }
    }
    bfs(topology, start, goal, &FxHashSet::default())
}

/// Finds a path from `src` to `dst` that never traverses a link of `primary` in the same
/// direction. The backup may still share nodes with the primary, or use a primary link in
/// reverse.
pub fn find_backup_path(topology: &Topology, src: &str, dst: &str, primary: &Path) -> Option<Path> {
    if primary.len() < 2 {
        return None;
    }
    // Hops through nodes that no longer exist cannot be traversed anyway
    let avoid = primary
        .hops()
        .filter_map(|(a, b)| topology.idx_of(a).zip(topology.idx_of(b)))
        .collect::<FxHashSet<_>>();
    let start = topology.idx_of(src)?;
    let goal = topology.idx_of(dst)?;
    bfs(topology, start, goal, &avoid)
}

fn bfs(
    topology: &Topology,
    start: NodeIndex,
    goal: NodeIndex,
    avoid: &FxHashSet<(NodeIndex, NodeIndex)>,
) -> Option<Path> {
    let g = &topology.graph;
    let mut discovered = g.visit_map();
    discovered.visit(start);

    let mut queue = VecDeque::new();
    queue.push_back(start);

    // Maps each discovered node to the node it was discovered from
    let mut parents: FxHashMap<NodeIndex, NodeIndex> = FxHashMap::default();

    while let Some(n) = queue.pop_front() {
        for succ in topology.successors(n) {
            if avoid.contains(&(n, succ)) {
                continue;
            }
            if succ == goal {
                return Some(trace_back(topology, &parents, n, goal));
            }
            if discovered.visit(succ) {
                parents.insert(succ, n);
                queue.push_back(succ);
            }
        }
    }
    None
}

fn trace_back(
    topology: &Topology,
    parents: &FxHashMap<NodeIndex, NodeIndex>,
    last: NodeIndex,
    goal: NodeIndex,
) -> Path {
    let mut indices = vec![goal, last];
    let mut cur = last;
    while let Some(&parent) = parents.get(&cur) {
        indices.push(parent);
        cur = parent;
    }
    indices.reverse();
    path_of(topology, &indices)
}

fn path_of(topology: &Topology, indices: &[NodeIndex]) -> Path {
    indices
        .iter()
        .map(|&idx| topology.graph[idx].clone())
        .collect::<Vec<NodeId>>()
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{opts::LinkOpts, testing};

    fn line(nodes: &[&str]) -> Topology {
        let mut topo = Topology::new();
        for &n in nodes {
            topo.add_node(n.into()).unwrap();
        }
        for pair in nodes.windows(2) {
            topo.add_link(pair[0], pair[1], &LinkOpts::default()).unwrap();
        }
        topo
    }

    fn sample() -> anyhow::Result<Topology> {
        let mut topo = Topology::new();
        for n in testing::SAMPLE_NODES {
            topo.add_node(n.into())?;
        }
        for (src, dst, opts) in testing::sample_links() {
            topo.add_link(src, dst, &opts)?;
        }
        Ok(topo)
    }

    #[test]
    fn direct_link_wins() {
        let mut topo = line(&["s1", "s2", "s3"]);
        topo.add_link("s1", "s3", &LinkOpts::default()).unwrap();
        let path = find_simple_path(&topo, "s1", "s3");
        assert_eq!(path, Some(Path::from(["s1", "s3"])));
    }

    #[test]
    fn one_hop_detour_is_found() {
        let topo = line(&["s1", "s2", "s3"]);
        let path = find_simple_path(&topo, "s1", "s3");
        assert_eq!(path, Some(Path::from(["s1", "s2", "s3"])));
    }

    #[test]
    fn bfs_finds_long_paths() {
        let topo = line(&["s1", "s2", "s3", "s4", "s5"]);
        let path = find_simple_path(&topo, "s1", "s5");
        assert_eq!(path, Some(Path::from(["s1", "s2", "s3", "s4", "s5"])));
    }

    #[test]
    fn same_node_is_single_node_path() {
        let topo = line(&["s1", "s2"]);
        assert_eq!(find_simple_path(&topo, "s1", "s1"), Some(Path::from(["s1"])));
    }

    #[test]
    fn disconnected_nodes_have_no_path() {
        let mut topo = line(&["s1", "s2"]);
        topo.add_node("s3".into()).unwrap();
        assert_eq!(find_simple_path(&topo, "s1", "s3"), None);
        assert_eq!(find_simple_path(&topo, "s1", "s9"), None);
    }

    #[test]
    fn links_are_directed() {
        let mut topo = line(&["s1", "s2"]);
        topo.remove_link("s2", "s1").unwrap();
        assert!(find_simple_path(&topo, "s1", "s2").is_some());
        assert_eq!(find_simple_path(&topo, "s2", "s1"), None);
    }

    #[test]
    fn sample_primary_is_shortest() -> anyhow::Result<()> {
        let topo = sample()?;
        let path = find_simple_path(&topo, "s1", "s6");
        insta::assert_yaml_snapshot!(path, @r###"
        ---
        - s1
        - s2
        - s4
        - s6
        "###);
        Ok(())
    }

    #[test]
    fn sample_backup_avoids_primary_links() -> anyhow::Result<()> {
        let topo = sample()?;
        let primary = Path::from(["s1", "s2", "s4", "s6"]);
        let backup = find_backup_path(&topo, "s1", "s6", &primary);
        assert_eq!(backup, Some(Path::from(["s1", "s3", "s5", "s6"])));
        Ok(())
    }

    #[test]
    fn backup_needs_a_hop() {
        let topo = line(&["s1", "s2"]);
        assert_eq!(find_backup_path(&topo, "s1", "s1", &Path::from(["s1"])), None);
        assert_eq!(find_backup_path(&topo, "s1", "s2", &Path::default()), None);
    }

    #[test]
    fn backup_may_reuse_reverse_links_and_nodes() {
        let mut topo = line(&["a", "b", "c", "d"]);
        topo.add_link("a", "c", &LinkOpts::default()).unwrap();
        topo.add_link("b", "d", &LinkOpts::default()).unwrap();
        let primary = Path::from(["a", "b", "c", "d"]);
        let backup = find_backup_path(&topo, "a", "d", &primary);
        // c -> b runs against the primary's b -> c, and both b and c are shared
        assert_eq!(backup, Some(Path::from(["a", "c", "b", "d"])));
    }

    #[test]
    fn backup_does_not_exist_on_a_line() {
        let topo = line(&["s1", "s2", "s3"]);
        let primary = Path::from(["s1", "s2", "s3"]);
        assert_eq!(find_backup_path(&topo, "s1", "s3", &primary), None);
    }
}
