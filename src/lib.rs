#![cfg_attr(docsrs, feature(doc_cfg))]
//! # nek-boundaries
//!
//! nek-boundaries identifies which nodes of a domain-decomposed spectral-element
//! mesh are ghost nodes: nodes lying on a side that a neighboring domain
//! duplicates. Domains are structured `(nx, ny, nz)` node blocks. Faces are
//! matched purely by corner geometry, first within each worker and then, for
//! the faces left over, across workers after a spatial redistribution.
//!
//! ## Features
//! - Canonical face signatures robust to corner ordering
//! - Local sort-and-scan matching plus spatially partitioned cross-worker matching
//! - Pluggable transports (serial, in-process threads, MPI) for every collective
//! - Optional retention of the complete adjacency table between calls
//! - Packed multi-domain blocks and 2-D meshes
//!
//! ## Usage
//! Add `nek-boundaries` as a dependency in your `Cargo.toml` and enable features as needed:
//!
//! ```toml
//! [dependencies]
//! nek-boundaries = "0.1"
//! # Optional features:
//! # features = ["mpi-support"]
//! ```
//!
//! ```
//! use nek_boundaries::prelude::*;
//!
//! let mut nek = NekDomainBoundaries::new(NoComm);
//! nek.configure(2, [2, 2, 2], false).unwrap();
//! let mut blocks = vec![
//!     StructuredBlock::uniform([2, 2, 2], [0.0; 3], [1.0; 3]),
//!     StructuredBlock::uniform([2, 2, 2], [1.0, 0.0, 0.0], [1.0; 3]),
//! ];
//! nek.create_ghost_nodes(&[0, 1], &mut blocks, &[0, 1]).unwrap();
//! let flags = blocks[0].point_array("ghost_nodes").unwrap();
//! assert_eq!(flags, &[0, 1, 0, 1, 0, 1, 0, 1]);
//! ```

pub mod algs;
pub mod boundaries;
pub mod data;
pub mod mesh_error;
pub mod topology;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::communicator::{Communicator, NoComm, ThreadComm};
    pub use crate::boundaries::{BoundaryConfig, DomainBoundaries, GhostDataType, NekDomainBoundaries};
    pub use crate::data::adjacency::{AdjacencyTable, NO_NEIGHBOR};
    pub use crate::data::ghost::{DUPLICATED_NODE, has_ghost_node_type};
    pub use crate::data::mesh_block::{MeshBlock, StructuredBlock};
    pub use crate::data::neighbor_cache::InvalidateCache;
    pub use crate::mesh_error::BoundaryError;
    pub use crate::topology::domain::DomainLayout;
}
