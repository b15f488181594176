//! Build the adjacency table for the domains held by this worker group.
//!
//! Pipeline: canonical faces → local sort-and-scan → (distributed only)
//! spatial redistribution of the unmatched faces and a second scan →
//! aggregation on the coordinator and broadcast.

use crate::algs::aggregate::{aggregate_matches, check_coordinator, covers_all_domains};
use crate::algs::communicator::Communicator;
use crate::algs::local_match::extract_matches;
use crate::algs::redistribute::{SpatialPartition, global_bounds, local_bounds, redistribute};
use crate::data::adjacency::AdjacencyTable;
use crate::data::mesh_block::MeshBlock;
use crate::mesh_error::BoundaryError;
use crate::topology::domain::{DomainLayout, FACE_CORNERS, N_SIDES};
use crate::topology::face::Face;

/// One domain held by this worker: its global id and where its nodes start.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LocalDomain {
    pub id: i32,
    /// Index of the mesh block holding the domain.
    pub block: usize,
    /// Offset of the domain's first node inside that block.
    pub offset: usize,
}

/// Result of one matching run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NeighborList {
    pub table: AdjacencyTable,
    /// The workers together held every domain of the mesh, so the table is
    /// complete and safe to reuse.
    pub full_domain_info: bool,
}

/// Canonical faces of all six sides of every local domain.
pub fn collect_faces<B: MeshBlock>(layout: &DomainLayout, domains: &[LocalDomain], blocks: &[B]) -> Vec<Face> {
    let mut faces = Vec::with_capacity(domains.len() * N_SIDES);
    let offsets = *layout.corner_offsets();
    for d in domains {
        let block = &blocks[d.block];
        let corners: [[f32; 3]; 8] = offsets.map(|c| block.point(d.offset + c).map(|x| x as f32));
        for (side, &spans) in FACE_CORNERS.iter().enumerate() {
            faces.push(Face::new(&spans.map(|c| corners[c]), d.id, side));
        }
    }
    faces
}

/// Match the faces of `domains` across the whole worker group.
///
/// Collective: every worker of `comm` must call this with its own domains.
pub fn build_neighbor_list<C, B>(
    comm: &C,
    coordinator: usize,
    layout: &DomainLayout,
    domains: &[LocalDomain],
    blocks: &[B],
) -> Result<NeighborList, BoundaryError>
where
    C: Communicator + ?Sized,
    B: MeshBlock,
{
    check_coordinator(comm, coordinator)?;
    let mut faces = collect_faces(layout, domains, blocks);
    let n_faces = faces.len();
    let mut matches = Vec::with_capacity(n_faces / 2);
    let unmatched = extract_matches(&mut faces, &mut matches, true);
    log::debug!(
        "rank {}: {} faces from {} domains, {} matched locally, {} unmatched",
        comm.rank(),
        n_faces,
        domains.len(),
        matches.len(),
        unmatched
    );

    if comm.is_distributed() {
        let bounds = global_bounds(comm, local_bounds(&faces))?;
        let partition = SpatialPartition::new(bounds, comm.size());
        let mut received = redistribute(comm, faces, &partition)?;
        let before = matches.len();
        let residual = extract_matches(&mut received, &mut matches, false);
        log::debug!(
            "rank {}: {} matches after redistribution, {} boundary faces",
            comm.rank(),
            matches.len() - before,
            residual
        );
    }

    let table = aggregate_matches(comm, coordinator, layout.n_domains(), &matches)?;
    let full_domain_info = covers_all_domains(comm, domains.len(), layout.n_domains())?;
    Ok(NeighborList {
        table,
        full_domain_info,
    })
}
