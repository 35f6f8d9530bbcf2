//! This module defines the [`Controller`], which owns the topology, the flow registry, and every
//! switch's flow table, and keeps them consistent as flows come and go and links fail.

use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::{
    flow::{Flow, FlowId, FlowState},
    flow_table::{FlowTable, FlowTableEntry, FlowTables},
    network::{HopCountRouting, Link, NodeId, Path, RoutingAlgo, Topology, TopologyError},
    opts::LinkOpts,
    stats::Stats,
    units::Mbps,
};

/// An SDN controller.
///
/// Every operation runs to completion before returning, and there is no internal locking.
/// Concurrent callers should wrap the whole controller in a single lock, because a path is only
/// valid with respect to the complete link set.
#[derive(Debug)]
pub struct Controller<R = HopCountRouting> {
    topology: Topology,
    flows: BTreeMap<FlowId, Flow>,
    tables: FlowTables,
    stats: Stats,
    routing: R,
}

impl Controller {
    /// Creates an empty controller that routes by hop count.
    pub fn new() -> Self {
        Self::with_routing(HopCountRouting)
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RoutingAlgo> Controller<R> {
    pub fn with_routing(routing: R) -> Self {
        Self {
            topology: Topology::new(),
            flows: BTreeMap::new(),
            tables: FlowTables::default(),
            stats: Stats::default(),
            routing,
        }
    }

    pub fn add_node(&mut self, id: impl Into<NodeId>) -> Result<(), TopologyError> {
        self.topology.add_node(id.into())?;
        self.stats.record_node_added();
        Ok(())
    }

    /// Removes a node, every link incident to it, and its flow table.
    ///
    /// Flows routed through the node are neither rerouted nor deactivated.
    pub fn remove_node(&mut self, id: &str) -> Result<(), TopologyError> {
        let nr_links = self.topology.remove_node(id)?;
        if let Some(table) = self.tables.drop_table(id) {
            debug!("dropped {} flow table entries with node {id}", table.len());
        }
        self.stats.record_node_removed(nr_links);
        Ok(())
    }

    /// See [`Topology::add_link`].
    pub fn add_link(&mut self, src: &str, dst: &str, opts: LinkOpts) -> Result<(), TopologyError> {
        let created = self.topology.add_link(src, dst, &opts)?;
        self.stats.record_links_added(created);
        Ok(())
    }

    /// Removes the directed link from `src` to `dst` without rerouting anything. Use
    /// [`Controller::simulate_link_failure`] to have affected flows recover.
    pub fn remove_link(&mut self, src: &str, dst: &str) -> Result<(), TopologyError> {
        self.topology.remove_link(src, dst)?;
        self.stats.record_link_removed();
        Ok(())
    }

    /// Routes and installs a new flow, computing a backup path when one exists.
    ///
    /// Flow IDs are handed out sequentially starting at 1. A failed call does not consume an ID.
    pub fn add_flow(
        &mut self,
        src: &str,
        dst: &str,
        priority: u32,
        bandwidth: Mbps,
    ) -> Result<Flow, Error> {
        for id in [src, dst] {
            if !self.topology.contains_node(id) {
                return Err(TopologyError::UndeclaredNode(id.into()).into());
            }
        }
        let id = FlowId::new(self.stats.total_flows()).next();
        let path = self
            .routing
            .primary_path(&self.topology, src, dst)
            .ok_or_else(|| Error::NoPath {
                src: src.into(),
                dst: dst.into(),
            })?;
        let backup_path = self.routing.backup_path(&self.topology, src, dst, &path);
        let flow = Flow::new(
            id,
            src.into(),
            dst.into(),
            priority,
            bandwidth,
            path,
            backup_path,
        );
        if let Some((u, v)) = self.saturated_hop(&flow) {
            return Err(Error::UtilizationOverflow {
                src: u.clone(),
                dst: v.clone(),
                bandwidth,
            });
        }
        self.install(&flow);
        debug!("installed {flow} on {}", flow.path);
        self.flows.insert(id, flow.clone());
        self.stats.record_flow_created();
        Ok(flow)
    }

    /// Uninstalls and forgets a flow, returning it.
    pub fn remove_flow(&mut self, id: FlowId) -> Result<Flow, Error> {
        let flow = self.flows.remove(&id).ok_or(Error::UnknownFlow(id))?;
        self.uninstall(&flow);
        self.stats.record_flow_removed(flow.is_active());
        Ok(flow)
    }

    /// Takes the link from `src` to `dst` down and reroutes every flow that was using it, in
    /// ascending ID order. Returns where each affected flow ended up.
    pub fn simulate_link_failure(
        &mut self,
        src: &str,
        dst: &str,
    ) -> Result<Vec<(FlowId, FlowState)>, Error> {
        let link = self
            .topology
            .link(src, dst)
            .ok_or_else(|| TopologyError::MissingLink {
                src: src.into(),
                dst: dst.into(),
            })?;
        let affected = link
            .flow_ids()
            .filter(|id| self.flows.contains_key(id))
            .collect::<Vec<_>>();
        self.remove_link(src, dst)?;
        info!(
            "link {src} -> {dst} failed, rerouting {} flow(s)",
            affected.len()
        );
        affected
            .into_iter()
            .map(|id| self.reroute(id).map(|state| (id, state)))
            .collect()
    }

    /// Moves a flow off its current path: onto its backup if that is still intact, else onto a
    /// freshly computed path, else the flow becomes inactive.
    ///
    /// Rerouting an inactive flow does nothing.
    pub fn reroute(&mut self, id: FlowId) -> Result<FlowState, Error> {
        let mut flow = self.flows.remove(&id).ok_or(Error::UnknownFlow(id))?;
        let state = if flow.is_active() {
            self.uninstall(&flow);
            self.recover(&mut flow)
        } else {
            FlowState::Inactive
        };
        self.flows.insert(id, flow);
        Ok(state)
    }

    fn recover(&mut self, flow: &mut Flow) -> FlowState {
        if let Some(backup) = flow.backup_path.take() {
            if self.topology.is_valid_path(&backup) {
                flow.path = backup;
                if self.install(flow) {
                    flow.backup_path =
                        self.routing
                            .backup_path(&self.topology, &flow.src, &flow.dst, &flow.path);
                    flow.state = FlowState::ReroutedViaBackup;
                    info!("flow {} rerouted using backup path {}", flow.id, flow.path);
                    return flow.state;
                }
                debug!("backup path {} of flow {} cannot absorb it", flow.path, flow.id);
            } else {
                debug!("backup path {backup} of flow {} is no longer valid", flow.id);
            }
        }
        if let Some(path) = self.routing.primary_path(&self.topology, &flow.src, &flow.dst) {
            flow.backup_path = self
                .routing
                .backup_path(&self.topology, &flow.src, &flow.dst, &path);
            flow.path = path;
            if self.install(flow) {
                flow.state = FlowState::ReroutedViaNewPath;
                info!("flow {} rerouted using new path {}", flow.id, flow.path);
                return flow.state;
            }
        }
        warn!("flow {} could not be rerouted, marking it inactive", flow.id);
        flow.path = Path::default();
        flow.backup_path = None;
        flow.state = FlowState::Inactive;
        self.stats.record_flow_deactivated();
        flow.state
    }

    /// Charges the flow's bandwidth to every link on its path and installs one entry per hop on
    /// the hop's source switch. Returns false, changing nothing, if the flow has no path or some
    /// link on it cannot absorb the flow.
    fn install(&mut self, flow: &Flow) -> bool {
        if flow.path.is_empty() || self.saturated_hop(flow).is_some() {
            return false;
        }
        for (u, v) in flow.path.hops() {
            if let Some(link) = self.topology.link_mut(u, v) {
                link.push_flow(flow);
                if link.is_oversubscribed() {
                    debug!(
                        "link {u} -> {v} is oversubscribed ({} of {})",
                        link.utilization(),
                        link.capacity
                    );
                }
            }
        }
        for (u, v) in flow.path.hops() {
            self.tables.install(u, FlowTableEntry::for_hop(flow, v));
        }
        true
    }

    /// The first hop of the flow's path whose link utilization would overflow with the flow on it.
    fn saturated_hop<'f>(&self, flow: &'f Flow) -> Option<(&'f NodeId, &'f NodeId)> {
        flow.path.hops().find(|&(u, v)| {
            self.topology
                .link(u, v)
                .map_or(false, |link| !link.can_absorb(flow))
        })
    }

    /// Releases the flow's bandwidth on the links of its path that still exist and purges its
    /// entries from every table.
    fn uninstall(&mut self, flow: &Flow) {
        for (u, v) in flow.path.hops() {
            if let Some(link) = self.topology.link_mut(u, v) {
                link.pop_flow(flow);
            }
        }
        self.tables.purge(flow.id);
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn flow(&self, id: FlowId) -> Option<&Flow> {
        self.flows.get(&id)
    }

    /// Get an iterator over all registered flows, active and inactive, in ID order.
    pub fn flows(&self) -> impl Iterator<Item = &Flow> + '_ {
        self.flows.values()
    }

    pub fn flow_tables(&self) -> &FlowTables {
        &self.tables
    }

    pub fn flow_table(&self, node: &str) -> Option<&FlowTable> {
        self.tables.get(node)
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// A serializable view of the whole controller state.
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            nodes: self.nodes().collect(),
            links: self.links().collect(),
            flows: self.flows().collect(),
            flow_tables: &self.tables,
            stats: self.stats,
        }
    }

    delegate::delegate! {
        to self.topology {
            pub fn nodes(&self) -> impl Iterator<Item = &NodeId> + '_;

            pub fn links(&self) -> impl Iterator<Item = &Link> + '_;

            pub fn link(&self, src: &str, dst: &str) -> Option<&Link>;

            pub fn neighbors(&self, id: &str) -> impl Iterator<Item = &NodeId> + '_;
        }
    }
}

/// Everything a caller may want to report about a controller.
#[derive(Debug, serde::Serialize)]
pub struct Snapshot<'a> {
    pub nodes: Vec<&'a NodeId>,
    pub links: Vec<&'a Link>,
    pub flows: Vec<&'a Flow>,
    pub flow_tables: &'a FlowTables,
    pub stats: Stats,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error("Flow {0} does not exist")]
    UnknownFlow(FlowId),

    #[error("No path from {src} to {dst}")]
    NoPath { src: NodeId, dst: NodeId },

    #[error("Adding {bandwidth} would overflow the utilization of link {src} -> {dst}")]
    UtilizationOverflow {
        src: NodeId,
        dst: NodeId,
        bandwidth: Mbps,
    },
}
