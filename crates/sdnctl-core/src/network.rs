pub mod routing;
pub mod topology;
pub mod types;

pub use routing::{find_backup_path, find_simple_path, HopCountRouting, RoutingAlgo};
pub use topology::{Error as TopologyError, Topology};
pub use types::*;
