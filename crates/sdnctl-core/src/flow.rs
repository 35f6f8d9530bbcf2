//! Flows: logical traffic demands between two nodes.

use crate::network::{NodeId, Path};
use crate::units::Mbps;

identifier!(FlowId, usize);

/// Where a flow is in its lifecycle.
///
/// `Inactive` is terminal: a flow that could not be rerouted keeps its registry entry but is
/// never revived automatically.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum FlowState {
    /// Routed over the path computed when it was added.
    #[default]
    Primary,
    /// Moved onto its precomputed backup path after a failure.
    ReroutedViaBackup,
    /// Moved onto a freshly computed path after a failure.
    ReroutedViaNewPath,
    /// No path could be found after a failure.
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Flow {
    pub id: FlowId,
    pub src: NodeId,
    pub dst: NodeId,
    pub priority: u32,
    pub bandwidth: Mbps,
    pub(crate) path: Path,
    pub(crate) backup_path: Option<Path>,
    pub(crate) state: FlowState,
}

impl Flow {
    pub(crate) fn new(
        id: FlowId,
        src: NodeId,
        dst: NodeId,
        priority: u32,
        bandwidth: Mbps,
        path: Path,
        backup_path: Option<Path>,
    ) -> Self {
        Self {
            id,
            src,
            dst,
            priority,
            bandwidth,
            path,
            backup_path,
            state: FlowState::Primary,
        }
    }

    /// The path the flow is currently installed on. Empty once the flow is inactive.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> Option<&Path> {
        self.backup_path.as_ref()
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, FlowState::Inactive)
    }
}

impl std::fmt::Display for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Flow {}: {} -> {} (priority {}, bandwidth {})",
            self.id, self.src, self.dst, self.priority, self.bandwidth
        )
    }
}
