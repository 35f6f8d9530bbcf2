//! Per-switch match-action tables.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::flow::{Flow, FlowId};
use crate::network::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Match {
    pub src: NodeId,
    pub dst: NodeId,
    pub flow: FlowId,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Action {
    pub output: NodeId,
    pub priority: u32,
}

/// Data-plane counters. Nothing in the controller updates these after installation.
#[derive(Debug, Clone, PartialEq, Eq, derive_new::new, serde::Serialize)]
pub struct EntryStats {
    #[new(default)]
    pub packet_count: u64,
    #[new(default)]
    pub byte_count: u64,
    #[new(value = "Utc::now()")]
    pub last_match: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FlowTableEntry {
    #[serde(rename = "match")]
    pub match_: Match,
    pub action: Action,
    pub stats: EntryStats,
}

impl FlowTableEntry {
    /// The entry that forwards `flow` to `next_hop`.
    pub(crate) fn for_hop(flow: &Flow, next_hop: &NodeId) -> Self {
        Self {
            match_: Match {
                src: flow.src.clone(),
                dst: flow.dst.clone(),
                flow: flow.id,
            },
            action: Action {
                output: next_hop.clone(),
                priority: flow.priority,
            },
            stats: EntryStats::new(),
        }
    }
}

/// The entries installed on one switch, highest priority first. Entries of equal priority keep
/// their installation order.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct FlowTable {
    entries: Vec<FlowTableEntry>,
}

impl FlowTable {
    pub(crate) fn insert(&mut self, entry: FlowTableEntry) {
        let priority = entry.action.priority;
        let pos = self
            .entries
            .partition_point(|e| e.action.priority >= priority);
        self.entries.insert(pos, entry);
    }

    /// Removes every entry matching `flow` and returns how many were removed.
    pub(crate) fn purge(&mut self, flow: FlowId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.match_.flow != flow);
        before - self.entries.len()
    }

    pub fn entries(&self) -> &[FlowTableEntry] {
        &self.entries
    }

    /// Returns the entry that forwards `flow`, if any.
    pub fn entry_for(&self, flow: FlowId) -> Option<&FlowTableEntry> {
        self.entries.iter().find(|e| e.match_.flow == flow)
    }

    delegate::delegate! {
        to self.entries {
            pub fn len(&self) -> usize;

            pub fn is_empty(&self) -> bool;

            pub fn iter(&self) -> std::slice::Iter<'_, FlowTableEntry>;
        }
    }
}

/// Every switch's flow table, keyed by node. Switches without entries have no table.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct FlowTables {
    inner: BTreeMap<NodeId, FlowTable>,
}

impl FlowTables {
    pub(crate) fn install(&mut self, node: &NodeId, entry: FlowTableEntry) {
        self.inner.entry(node.clone()).or_default().insert(entry);
    }

    /// Removes `flow`'s entries from every table. Returns the number of entries removed.
    pub(crate) fn purge(&mut self, flow: FlowId) -> usize {
        let removed: usize = self.inner.values_mut().map(|t| t.purge(flow)).sum();
        self.inner.retain(|_, t| !t.is_empty());
        removed
    }

    pub(crate) fn drop_table(&mut self, node: &str) -> Option<FlowTable> {
        self.inner.remove(node)
    }

    pub fn get(&self, node: &str) -> Option<&FlowTable> {
        self.inner.get(node)
    }

    /// Get an iterator over `(node, table)` pairs, ordered by node.
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &FlowTable)> + '_ {
        self.inner.iter()
    }

    /// Total number of entries across all tables.
    pub fn nr_entries(&self) -> usize {
        self.inner.values().map(FlowTable::len).sum()
    }

    delegate::delegate! {
        to self.inner {
            #[call(len)]
            pub fn nr_tables(&self) -> usize;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Path;
    use crate::units::Mbps;

    fn flow(id: usize, priority: u32) -> Flow {
        Flow::new(
            FlowId::new(id),
            "s1".into(),
            "s3".into(),
            priority,
            Mbps::ONE,
            Path::from(["s1", "s2", "s3"]),
            None,
        )
    }

    fn order(table: &FlowTable) -> Vec<usize> {
        table.iter().map(|e| e.match_.flow.inner()).collect()
    }

    #[test]
    fn entries_sorted_by_priority_descending() {
        let mut table = FlowTable::default();
        let next = NodeId::from("s2");
        for (id, priority) in [(1, 2), (2, 7), (3, 0), (4, 5)] {
            table.insert(FlowTableEntry::for_hop(&flow(id, priority), &next));
        }
        assert_eq!(order(&table), vec![2, 4, 1, 3]);
    }

    #[test]
    fn equal_priorities_keep_installation_order() {
        let mut table = FlowTable::default();
        let next = NodeId::from("s2");
        for (id, priority) in [(1, 3), (2, 3), (3, 9), (4, 3)] {
            table.insert(FlowTableEntry::for_hop(&flow(id, priority), &next));
        }
        assert_eq!(order(&table), vec![3, 1, 2, 4]);
    }

    #[test]
    fn entry_copies_flow_match_and_action() {
        let f = flow(7, 4);
        let entry = FlowTableEntry::for_hop(&f, &NodeId::from("s2"));
        assert_eq!(entry.match_.flow, FlowId::new(7));
        assert_eq!(entry.match_.src.as_str(), "s1");
        assert_eq!(entry.match_.dst.as_str(), "s3");
        assert_eq!(entry.action.output.as_str(), "s2");
        assert_eq!(entry.action.priority, 4);
        assert_eq!((entry.stats.packet_count, entry.stats.byte_count), (0, 0));
    }

    #[test]
    fn purge_scans_all_tables() {
        let mut tables = FlowTables::default();
        let (f1, f2) = (flow(1, 0), flow(2, 0));
        tables.install(&"s1".into(), FlowTableEntry::for_hop(&f1, &"s2".into()));
        tables.install(&"s2".into(), FlowTableEntry::for_hop(&f1, &"s3".into()));
        tables.install(&"s1".into(), FlowTableEntry::for_hop(&f2, &"s2".into()));
        assert_eq!(tables.nr_entries(), 3);

        assert_eq!(tables.purge(FlowId::new(1)), 2);
        assert_eq!(tables.nr_entries(), 1);
        // Emptied tables disappear
        assert!(tables.get("s2").is_none());
        assert!(tables.get("s1").unwrap().entry_for(FlowId::new(2)).is_some());
        assert_eq!(tables.purge(FlowId::new(1)), 0);
    }
}
