//! Re-export public algorithms.

pub mod aggregate;
pub mod communicator;
pub mod local_match;
pub mod neighbor_list;
pub mod redistribute;
pub mod wire;

pub use communicator::Communicator;
pub use neighbor_list::{LocalDomain, NeighborList, build_neighbor_list};
