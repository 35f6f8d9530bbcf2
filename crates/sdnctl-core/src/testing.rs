//! The six-switch sample topology used by tests and demos.
//!
//! ```text
//!        s2 ---- s4
//!       /  \       \
//!     s1    \       s6
//!       \    \     /
//!        s3 ---- s5
//! ```

use crate::{
    controller::Controller,
    network::TopologyError,
    opts::LinkOpts,
    units::{Mbps, Millisecs},
};

pub const SAMPLE_NODES: [&str; 6] = ["s1", "s2", "s3", "s4", "s5", "s6"];

/// The sample's links, each bidirectional.
pub fn sample_links() -> Vec<(&'static str, &'static str, LinkOpts)> {
    let fast = LinkOpts::builder()
        .capacity(Mbps::new(10))
        .weight(1)
        .delay(Millisecs::new(1))
        .build();
    let slow = LinkOpts::builder()
        .capacity(Mbps::new(5))
        .weight(2)
        .delay(Millisecs::new(2))
        .build();
    vec![
        ("s1", "s2", fast),
        ("s1", "s3", slow),
        ("s2", "s4", fast),
        ("s2", "s5", slow),
        ("s3", "s5", fast),
        ("s4", "s6", fast),
        ("s5", "s6", slow),
    ]
}

/// A controller populated with the sample topology and no flows.
pub fn sample_controller() -> Result<Controller, TopologyError> {
    let mut ctl = Controller::new();
    for id in SAMPLE_NODES {
        ctl.add_node(id)?;
    }
    for (src, dst, opts) in sample_links() {
        ctl.add_link(src, dst, opts)?;
    }
    Ok(ctl)
}
