//! This module defines the [`LinkOpts`] configuration which describes how links are created.

use crate::units::{Mbps, Millisecs};

/// Link options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, typed_builder::TypedBuilder)]
pub struct LinkOpts {
    /// Link capacity. Never enforced, only compared against utilization.
    #[builder(default = Mbps::new(10))]
    pub capacity: Mbps,
    /// Link weight. Stored, but path selection counts hops.
    #[builder(default = 1)]
    pub weight: u32,
    /// Link delay. Stored, but path selection counts hops.
    #[builder(default = Millisecs::new(1))]
    pub delay: Millisecs,
    /// Whether to also create the reverse link if it does not exist yet.
    #[builder(default = true)]
    pub bidirectional: bool,
}

impl Default for LinkOpts {
    fn default() -> Self {
        Self::builder().build()
    }
}
