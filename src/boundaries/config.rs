//! Configuration of the ghost-node engine.

use crate::data::ghost::GHOST_NODES_ARRAY;
use serde::{Deserialize, Serialize};

/// Knobs of [`NekDomainBoundaries`](super::NekDomainBoundaries).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    /// Retain a complete adjacency table for later calls with the same layout.
    pub save_domain_info: bool,
    /// Name under which the per-node ghost flags are attached to each block.
    pub ghost_array_name: String,
    /// Rank that aggregates matches and broadcasts the table.
    pub coordinator: usize,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            save_domain_info: false,
            ghost_array_name: GHOST_NODES_ARRAY.to_string(),
            coordinator: 0,
        }
    }
}
