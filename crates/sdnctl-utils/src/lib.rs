//! Utilities for loading controller state from declarative topology files.

#![warn(unreachable_pub, missing_debug_implementations, missing_docs)]

use std::path::{Path, PathBuf};

use sdnctl_core::{Controller, LinkOpts, Mbps, Millisecs, NodeId};

/// Reads a [`Controller`] from a file containing a [`TopologySpec`] in JSON or Dhall format.
pub fn read_controller(topology_spec: impl AsRef<Path>) -> Result<Controller, Error> {
    let spec = read_topology_spec(topology_spec)?;
    spec.into_controller()
}

/// Reads a [`TopologySpec`] from a file in JSON or Dhall format.
pub fn read_topology_spec(path: impl AsRef<Path>) -> Result<TopologySpec, Error> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let spec: TopologySpec = match path.as_ref().extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&contents)?,
        Some("dhall") => serde_dhall::from_str(&contents).parse().map_err(Box::new)?,
        _ => return Err(Error::UnknownFileType(path.as_ref().into())),
    };
    Ok(spec)
}

/// A topology specification, optionally with flows to install on it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TopologySpec {
    /// Nodes.
    pub nodes: Vec<NodeId>,
    /// Links.
    pub links: Vec<LinkSpec>,
    /// Flows, installed in order after the topology is built.
    #[serde(default)]
    pub flows: Vec<FlowSpec>,
}

impl TopologySpec {
    /// Builds a controller holding this topology and flows.
    pub fn into_controller(self) -> Result<Controller, Error> {
        let mut ctl = Controller::new();
        for id in self.nodes {
            ctl.add_node(id)?;
        }
        for link in self.links {
            ctl.add_link(&link.src, &link.dst, link.opts())?;
        }
        for FlowSpec {
            src,
            dst,
            priority,
            bandwidth,
        } in self.flows
        {
            let flow = ctl.add_flow(&src, &dst, priority, bandwidth)?;
            log::debug!("loaded {flow}");
        }
        Ok(ctl)
    }
}

/// A link specification. Omitted attributes take the [`LinkOpts`] defaults.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LinkSpec {
    /// Source node.
    pub src: NodeId,
    /// Destination node.
    pub dst: NodeId,
    /// Capacity.
    #[serde(default)]
    pub capacity: Option<Mbps>,
    /// Weight.
    #[serde(default)]
    pub weight: Option<u32>,
    /// Delay.
    #[serde(default)]
    pub delay: Option<Millisecs>,
    /// Whether to add the reverse link as well.
    #[serde(default)]
    pub bidirectional: Option<bool>,
}

impl LinkSpec {
    fn opts(&self) -> LinkOpts {
        let defaults = LinkOpts::default();
        LinkOpts {
            capacity: self.capacity.unwrap_or(defaults.capacity),
            weight: self.weight.unwrap_or(defaults.weight),
            delay: self.delay.unwrap_or(defaults.delay),
            bidirectional: self.bidirectional.unwrap_or(defaults.bidirectional),
        }
    }
}

/// A flow specification.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FlowSpec {
    /// Source node.
    pub src: NodeId,
    /// Destination node.
    pub dst: NodeId,
    /// Priority. Defaults to 0.
    #[serde(default)]
    pub priority: u32,
    /// Bandwidth. Defaults to 1.
    #[serde(default = "default_bandwidth")]
    pub bandwidth: Mbps,
}

fn default_bandwidth() -> Mbps {
    Mbps::ONE
}

/// Error kinds for specifications and I/O.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown file type.
    #[error("unknown file type: {0}")]
    UnknownFileType(PathBuf),

    /// Error serializing/deserializing Dhall.
    #[error("Dhall error")]
    Dhall(#[from] Box<serde_dhall::Error>),

    /// Error serializing/deserializing JSON.
    #[error("JSON error")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error")]
    Io(#[from] std::io::Error),

    /// Error constructing a valid topology.
    #[error("invalid topology")]
    Topology(#[from] sdnctl_core::TopologyError),

    /// Error installing a flow.
    #[error("invalid flow")]
    Flow(#[from] sdnctl_core::Error),
}
