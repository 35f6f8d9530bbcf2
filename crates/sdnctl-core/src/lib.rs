#![warn(unreachable_pub, missing_debug_implementations)]

//! The core controller library. This crate defines the [`Controller`], which tracks a mutable
//! switch topology, routes flows over primary and backup paths, installs match-action entries
//! into per-switch flow tables, and reroutes flows when links fail.

#[macro_use]
mod ident;

pub mod controller;
pub mod flow;
pub mod flow_table;
pub mod network;
pub mod opts;
pub mod stats;
pub mod testing;
pub mod units;

pub use controller::{Controller, Error, Snapshot};
pub use flow::{Flow, FlowId, FlowState};
pub use flow_table::{FlowTable, FlowTableEntry, FlowTables};
pub use network::{HopCountRouting, Link, NodeId, Path, RoutingAlgo, Topology, TopologyError};
pub use opts::LinkOpts;
pub use stats::Stats;
pub use units::{Mbps, Millisecs};
