//! Controller-wide counters. These change only as a side effect of topology and flow operations.

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Stats {
    total_flows: usize,
    active_flows: usize,
    total_nodes: usize,
    total_links: usize,
}

impl Stats {
    /// Flows ever created. Removing a flow does not lower this.
    pub fn total_flows(&self) -> usize {
        self.total_flows
    }

    /// Flows currently registered and not inactive.
    pub fn active_flows(&self) -> usize {
        self.active_flows
    }

    pub fn total_nodes(&self) -> usize {
        self.total_nodes
    }

    pub fn total_links(&self) -> usize {
        self.total_links
    }

    pub(crate) fn record_node_added(&mut self) {
        self.total_nodes += 1;
    }

    pub(crate) fn record_node_removed(&mut self, nr_links: usize) {
        self.total_nodes -= 1;
        self.total_links -= nr_links;
    }

    pub(crate) fn record_links_added(&mut self, nr_links: usize) {
        self.total_links += nr_links;
    }

    pub(crate) fn record_link_removed(&mut self) {
        self.total_links -= 1;
    }

    pub(crate) fn record_flow_created(&mut self) {
        self.total_flows += 1;
        self.active_flows += 1;
    }

    pub(crate) fn record_flow_deactivated(&mut self) {
        self.active_flows -= 1;
    }

    // Inactive flows were already subtracted when they went inactive.
    pub(crate) fn record_flow_removed(&mut self, was_active: bool) {
        if was_active {
            self.active_flows -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removing_inactive_flow_does_not_double_count() {
        let mut stats = Stats::default();
        stats.record_flow_created();
        stats.record_flow_created();
        stats.record_flow_deactivated();
        stats.record_flow_removed(false);
        assert_eq!((stats.total_flows(), stats.active_flows()), (2, 1));
        stats.record_flow_removed(true);
        assert_eq!((stats.total_flows(), stats.active_flows()), (2, 0));
    }

    #[test]
    fn node_removal_takes_its_links() {
        let mut stats = Stats::default();
        stats.record_node_added();
        stats.record_node_added();
        stats.record_links_added(2);
        stats.record_node_removed(2);
        assert_eq!((stats.total_nodes(), stats.total_links()), (1, 0));
    }
}
