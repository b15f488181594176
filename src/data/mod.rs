//! Data module: mesh blocks, ghost flags and adjacency tables

pub mod adjacency;
pub mod ghost;
pub mod mesh_block;
pub mod neighbor_cache;

pub use adjacency::{AdjacencyTable, NO_NEIGHBOR};
pub use ghost::{DUPLICATED_NODE, DomainMembership};
pub use mesh_block::{MeshBlock, StructuredBlock};
pub use neighbor_cache::{InvalidateCache, NeighborCache};
