use std::collections::BTreeSet;

use rand::prelude::*;
use sdnctl_core::{testing, Controller, FlowId, LinkOpts, Mbps};

const NODES: [&str; 8] = ["s1", "s2", "s3", "s4", "s5", "s6", "s7", "s8"];

/// Every link joins two registered nodes, counters agree with the topology, and every link's
/// utilization is the bandwidth sum of the active flows it carries.
fn check_invariants(ctl: &Controller) {
    let nodes = ctl.nodes().map(|n| n.to_string()).collect::<BTreeSet<_>>();
    for link in ctl.links() {
        assert!(nodes.contains(link.src.as_str()), "dangling src {}", link.src);
        assert!(nodes.contains(link.dst.as_str()), "dangling dst {}", link.dst);
        let expected = link
            .flow_ids()
            .map(|id| ctl.flow(id).expect("link references unknown flow").bandwidth)
            .sum::<Mbps>();
        assert_eq!(link.utilization(), expected);
    }
    for node in &nodes {
        assert!(ctl.neighbors(node).all(|n| nodes.contains(n.as_str())));
    }
    let stats = ctl.stats();
    assert_eq!(stats.total_nodes(), ctl.topology().nr_nodes());
    assert_eq!(stats.total_links(), ctl.topology().nr_links());
    assert_eq!(
        stats.active_flows(),
        ctl.flows().filter(|f| f.is_active()).count()
    );
    for flow in ctl.flows().filter(|f| !f.is_active()) {
        assert!(flow.path().is_empty());
        assert!(ctl.links().all(|l| !l.carries(&flow.id)));
    }
}

#[test]
fn random_topology_mutations_keep_links_anchored() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut ctl = Controller::new();
    for _ in 0..500 {
        let a = NODES[rng.gen_range(0..NODES.len())];
        let b = NODES[rng.gen_range(0..NODES.len())];
        match rng.gen_range(0..4) {
            0 => {
                let _ = ctl.add_node(a);
            }
            1 => {
                let _ = ctl.remove_node(a);
            }
            2 => {
                let opts = LinkOpts::builder().bidirectional(rng.gen_bool(0.5)).build();
                let res = ctl.add_link(a, b, opts);
                let registered = ctl.topology().contains_node(a) && ctl.topology().contains_node(b);
                assert_eq!(res.is_ok(), registered);
            }
            _ => {
                let existed = ctl.topology().contains_link(a, b);
                assert_eq!(ctl.remove_link(a, b).is_ok(), existed);
            }
        }
        check_invariants(&ctl);
    }
}

#[test]
fn random_flow_churn_keeps_utilization_consistent() -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut ctl = testing::sample_controller()?;
    let mut next_id = 1;
    for _ in 0..300 {
        let a = testing::SAMPLE_NODES[rng.gen_range(0..testing::SAMPLE_NODES.len())];
        let b = testing::SAMPLE_NODES[rng.gen_range(0..testing::SAMPLE_NODES.len())];
        match rng.gen_range(0..10) {
            0..=4 => {
                let bandwidth = Mbps::new(rng.gen_range(1..4));
                if let Ok(flow) = ctl.add_flow(a, b, rng.gen_range(0..8), bandwidth) {
                    assert_eq!(flow.id, FlowId::new(next_id));
                    next_id += 1;
                }
            }
            5..=6 => {
                let id = FlowId::new(rng.gen_range(1..next_id.max(2)));
                let _ = ctl.remove_flow(id);
            }
            7..=8 => {
                let _ = ctl.simulate_link_failure(a, b);
            }
            _ => {
                let _ = ctl.add_link(a, b, LinkOpts::default());
            }
        }
        check_invariants(&ctl);
        for flow in ctl.flows().filter(|f| f.is_active()) {
            if let Some(backup) = flow.backup_path() {
                let primary = flow.path().hops().collect::<BTreeSet<_>>();
                assert!(backup.hops().all(|hop| !primary.contains(&hop)));
            }
        }
    }
    Ok(())
}

#[test]
fn remove_flow_restores_previous_state() -> anyhow::Result<()> {
    let mut ctl = testing::sample_controller()?;
    ctl.add_flow("s3", "s4", 2, Mbps::ONE)?;
    ctl.add_flow("s6", "s1", 1, Mbps::new(3))?;
    let links_before = ctl.links().cloned().collect::<Vec<_>>();
    let tables_before = ctl.flow_tables().clone();

    for (src, dst) in [("s1", "s6"), ("s2", "s3"), ("s5", "s4")] {
        let flow = ctl.add_flow(src, dst, 4, Mbps::new(2))?;
        ctl.remove_flow(flow.id)?;
        assert_eq!(ctl.links().cloned().collect::<Vec<_>>(), links_before);
        assert_eq!(ctl.flow_tables(), &tables_before);
    }
    Ok(())
}

#[test]
fn repeated_failures_walk_flows_to_inactive() -> anyhow::Result<()> {
    let mut ctl = testing::sample_controller()?;
    let id = ctl.add_flow("s1", "s6", 5, Mbps::new(2))?.id;
    // Keep failing whatever link the flow is on until it runs out of options
    for _ in 0..16 {
        let flow = ctl.flow(id).unwrap();
        let Some((a, b)) = flow
            .path()
            .hops()
            .next()
            .map(|(a, b)| (a.to_string(), b.to_string()))
        else {
            break;
        };
        ctl.simulate_link_failure(&a, &b)?;
        check_invariants(&ctl);
    }
    let flow = ctl.flow(id).unwrap();
    assert!(!flow.is_active());
    assert_eq!(ctl.stats().active_flows(), 0);
    assert_eq!(ctl.stats().total_flows(), 1);
    Ok(())
}
