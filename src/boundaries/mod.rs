//! Ghost-node engine for domain-decomposed spectral-element meshes.
//!
//! [`NekDomainBoundaries`] owns the domain layout, the transport and the
//! optional [`NeighborCache`]. Its [`DomainBoundaries`] implementation is the
//! surface the host calls: ghost-node creation is fully supported, the
//! generic ghost *exchange* operations are not and always fail with an
//! improper-use error.

pub mod config;

pub use config::BoundaryConfig;

use crate::algs::aggregate::check_coordinator;
use crate::algs::communicator::Communicator;
use crate::algs::neighbor_list::{LocalDomain, NeighborList, build_neighbor_list};
use crate::data::adjacency::AdjacencyTable;
use crate::data::ghost::{DomainMembership, mark_domain};
use crate::data::mesh_block::MeshBlock;
use crate::data::neighbor_cache::{InvalidateCache, NeighborCache};
use crate::mesh_error::BoundaryError;
use crate::topology::domain::DomainLayout;

/// Kind of ghost data a caller asks about.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GhostDataType {
    GhostNodeData,
    GhostZoneData,
}

/// Ghost-data contract shared by every domain-boundary strategy of the host.
pub trait DomainBoundaries<B: MeshBlock> {
    /// Attach a ghost flag array to every block and mark the nodes of each
    /// side whose neighbor domain is in `all_domains`.
    ///
    /// Collective when the transport is distributed.
    fn create_ghost_nodes(
        &mut self,
        domain_ids: &[i32],
        blocks: &mut [B],
        all_domains: &[i32],
    ) -> Result<(), BoundaryError>;

    fn requires_communication(&self, ghost_type: GhostDataType) -> bool;

    fn confirm_mesh(&self, domain_ids: &[i32], blocks: &[B]) -> bool;

    fn exchange_mesh(&mut self, domain_ids: &[i32], blocks: Vec<B>) -> Result<Vec<B>, BoundaryError>;

    fn exchange_scalar(
        &mut self,
        domain_ids: &[i32],
        is_point_data: bool,
        scalars: Vec<Vec<f64>>,
    ) -> Result<Vec<Vec<f64>>, BoundaryError>;

    fn exchange_vector(
        &mut self,
        domain_ids: &[i32],
        is_point_data: bool,
        vectors: Vec<Vec<[f64; 3]>>,
    ) -> Result<Vec<Vec<[f64; 3]>>, BoundaryError>;

    fn exchange_material<M>(&mut self, domain_ids: &[i32], materials: Vec<M>) -> Result<Vec<M>, BoundaryError>;

    fn exchange_mix_var<M, V>(
        &mut self,
        domain_ids: &[i32],
        materials: &[M],
        mix_vars: Vec<V>,
    ) -> Result<Vec<V>, BoundaryError>;
}

/// Face-matching ghost-node engine over a collective transport `C`.
pub struct NekDomainBoundaries<C: Communicator> {
    comm: C,
    config: BoundaryConfig,
    layout: Option<DomainLayout>,
    cache: NeighborCache,
}

impl<C: Communicator> NekDomainBoundaries<C> {
    pub fn new(comm: C) -> Self {
        Self::with_config(comm, BoundaryConfig::default())
    }

    pub fn with_config(comm: C, config: BoundaryConfig) -> Self {
        Self {
            comm,
            config,
            layout: None,
            cache: NeighborCache::new(),
        }
    }

    pub fn comm(&self) -> &C {
        &self.comm
    }

    pub fn config(&self) -> &BoundaryConfig {
        &self.config
    }

    pub fn layout(&self) -> Option<&DomainLayout> {
        self.layout.as_ref()
    }

    pub fn cache(&self) -> &NeighborCache {
        &self.cache
    }

    /// Configure the mesh session: `n_domains` domains of `dims` nodes.
    pub fn configure(&mut self, n_domains: usize, dims: [usize; 3], multiple_blocks: bool) -> Result<(), BoundaryError> {
        self.set_layout(DomainLayout::new(n_domains, dims, multiple_blocks)?);
        Ok(())
    }

    /// Install a layout; a different layout drops any cached table.
    pub fn set_layout(&mut self, layout: DomainLayout) {
        if self.layout.as_ref() != Some(&layout) {
            self.cache.invalidate_cache();
        }
        self.layout = Some(layout);
    }

    /// Enable or disable retention of complete tables.
    pub fn set_save_domain_info(&mut self, save: bool) {
        self.config.save_domain_info = save;
        if !save {
            self.cache.invalidate_cache();
        }
    }

    /// Adjacency table of the configured mesh as seen from `domain_ids`.
    ///
    /// Collective unless a cached table is available. Does not touch the cache.
    pub fn neighbor_list<B: MeshBlock>(&self, domain_ids: &[i32], blocks: &[B]) -> Result<NeighborList, BoundaryError> {
        let layout = self.layout.as_ref().ok_or(BoundaryError::NotConfigured)?;
        let (domains, _) = self.resolve_domains(layout, domain_ids, blocks)?;
        Ok(self.lookup_or_build(layout, &domains, blocks)?.0)
    }

    /// Map the caller's domain ids and blocks to local domains.
    ///
    /// A single block under a `multiple_blocks` layout packs consecutive
    /// domains; those are renumbered globally (each worker starts after the
    /// domains of lower ranks) and the returned membership covers them all.
    /// A worker with no block still joins the renumbering with zero domains.
    fn resolve_domains<B: MeshBlock>(
        &self,
        layout: &DomainLayout,
        domain_ids: &[i32],
        blocks: &[B],
    ) -> Result<(Vec<LocalDomain>, Option<Vec<i32>>), BoundaryError> {
        check_coordinator(&self.comm, self.config.coordinator)?;
        let ppd = layout.points_per_domain();

        if layout.multiple_blocks() && blocks.len() <= 1 {
            let num = blocks.first().map_or(0, |b| b.num_points() / ppd);
            let counts = self.comm.all_gather_count(num as u32)?;
            let start: usize = counts[..self.comm.rank()].iter().map(|&n| n as usize).sum();
            let total: usize = counts.iter().map(|&n| n as usize).sum();
            let domains = (0..num)
                .map(|i| -> Result<LocalDomain, BoundaryError> {
                    let id = (start + i) as i32;
                    layout.domain_index(id)?;
                    Ok(LocalDomain {
                        id,
                        block: 0,
                        offset: i * ppd,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            log::debug!(
                "rank {}: packed block holds domains {start}..{} of {total}",
                self.comm.rank(),
                start + num
            );
            return Ok((domains, Some((0..total as i32).collect())));
        }

        if domain_ids.len() != blocks.len() {
            return Err(BoundaryError::MismatchedInputs {
                domains: domain_ids.len(),
                blocks: blocks.len(),
            });
        }
        let domains = domain_ids
            .iter()
            .zip(blocks)
            .enumerate()
            .map(|(block, (&id, b))| -> Result<LocalDomain, BoundaryError> {
                layout.domain_index(id)?;
                if b.num_points() != ppd {
                    return Err(BoundaryError::BlockSizeMismatch {
                        block,
                        expected: ppd,
                        got: b.num_points(),
                    });
                }
                Ok(LocalDomain { id, block, offset: 0 })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok((domains, None))
    }

    /// Cached table (second value `true`) or a freshly matched one.
    fn lookup_or_build<B: MeshBlock>(
        &self,
        layout: &DomainLayout,
        domains: &[LocalDomain],
        blocks: &[B],
    ) -> Result<(NeighborList, bool), BoundaryError> {
        if let Some(table) = self.cache.get(layout) {
            log::debug!("rank {}: reusing cached adjacency table", self.comm.rank());
            return Ok((
                NeighborList {
                    table: table.clone(),
                    full_domain_info: true,
                },
                true,
            ));
        }
        let list = build_neighbor_list(&self.comm, self.config.coordinator, layout, domains, blocks)?;
        Ok((list, false))
    }

    fn mark_blocks<B: MeshBlock>(
        &self,
        layout: &DomainLayout,
        table: &AdjacencyTable,
        members: &DomainMembership,
        domains: &[LocalDomain],
        blocks: &mut [B],
    ) -> Result<(), BoundaryError> {
        let name = self.config.ghost_array_name.as_str();
        let ppd = layout.points_per_domain();

        // Reuse arrays of the right length so flags accumulate across calls.
        for block in blocks.iter_mut() {
            let n = block.num_points();
            let flags = block.point_array_entry(name);
            if flags.len() != n {
                flags.clear();
                flags.resize(n, 0);
            }
        }

        let mut marked = 0;
        for d in domains {
            let flags = blocks[d.block].point_array_entry(name);
            marked += mark_domain(layout, table, members, d.id, &mut flags[d.offset..d.offset + ppd])?;
        }
        log::debug!(
            "rank {}: marked {marked} sides over {} domains",
            self.comm.rank(),
            domains.len()
        );
        Ok(())
    }
}

impl<C: Communicator, B: MeshBlock> DomainBoundaries<B> for NekDomainBoundaries<C> {
    fn create_ghost_nodes(
        &mut self,
        domain_ids: &[i32],
        blocks: &mut [B],
        all_domains: &[i32],
    ) -> Result<(), BoundaryError> {
        let layout = self.layout.clone().ok_or(BoundaryError::NotConfigured)?;
        let (domains, packed_members) = self.resolve_domains(&layout, domain_ids, blocks)?;
        let (list, cached) = self.lookup_or_build(&layout, &domains, blocks)?;

        let members = DomainMembership::classify(packed_members.as_deref().unwrap_or(all_domains));
        if members.is_empty() && !domains.is_empty() {
            log::warn!("empty domain membership set: no ghost nodes will be marked");
        }
        self.mark_blocks(&layout, &list.table, &members, &domains, blocks)?;

        if !cached {
            let kept = self
                .cache
                .retain(&layout, list, self.config.save_domain_info);
            log::debug!("rank {}: adjacency table retained: {kept}", self.comm.rank());
        }
        Ok(())
    }

    fn requires_communication(&self, _ghost_type: GhostDataType) -> bool {
        self.comm.is_distributed()
    }

    fn confirm_mesh(&self, _domain_ids: &[i32], _blocks: &[B]) -> bool {
        true
    }

    fn exchange_mesh(&mut self, _domain_ids: &[i32], _blocks: Vec<B>) -> Result<Vec<B>, BoundaryError> {
        Err(BoundaryError::UnsupportedExchange("exchange_mesh"))
    }

    fn exchange_scalar(
        &mut self,
        _domain_ids: &[i32],
        _is_point_data: bool,
        _scalars: Vec<Vec<f64>>,
    ) -> Result<Vec<Vec<f64>>, BoundaryError> {
        Err(BoundaryError::UnsupportedExchange("exchange_scalar"))
    }

    fn exchange_vector(
        &mut self,
        _domain_ids: &[i32],
        _is_point_data: bool,
        _vectors: Vec<Vec<[f64; 3]>>,
    ) -> Result<Vec<Vec<[f64; 3]>>, BoundaryError> {
        Err(BoundaryError::UnsupportedExchange("exchange_vector"))
    }

    fn exchange_material<M>(&mut self, _domain_ids: &[i32], _materials: Vec<M>) -> Result<Vec<M>, BoundaryError> {
        Err(BoundaryError::UnsupportedExchange("exchange_material"))
    }

    fn exchange_mix_var<M, V>(
        &mut self,
        _domain_ids: &[i32],
        _materials: &[M],
        _mix_vars: Vec<V>,
    ) -> Result<Vec<V>, BoundaryError> {
        Err(BoundaryError::UnsupportedExchange("exchange_mix_var"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::NoComm;
    use crate::data::mesh_block::StructuredBlock;

    #[test]
    fn marking_before_configure_fails() {
        let mut nek = NekDomainBoundaries::new(NoComm);
        let mut blocks: Vec<StructuredBlock> = Vec::new();
        assert_eq!(
            nek.create_ghost_nodes(&[], &mut blocks, &[]),
            Err(BoundaryError::NotConfigured)
        );
    }

    #[test]
    fn reconfiguring_drops_the_cache() {
        let mut nek = NekDomainBoundaries::new(NoComm);
        nek.set_save_domain_info(true);
        nek.configure(1, [2, 2, 2], false).unwrap();
        let mut blocks = vec![StructuredBlock::uniform([2, 2, 2], [0.0; 3], [1.0; 3])];
        nek.create_ghost_nodes(&[0], &mut blocks, &[0]).unwrap();
        assert!(nek.cache().is_populated());
        nek.configure(1, [2, 2, 2], false).unwrap();
        assert!(nek.cache().is_populated());
        nek.configure(1, [3, 3, 3], false).unwrap();
        assert!(!nek.cache().is_populated());
    }

    #[test]
    fn coordinator_must_be_a_worker_rank() {
        let config = BoundaryConfig {
            coordinator: 1,
            ..BoundaryConfig::default()
        };
        let mut nek = NekDomainBoundaries::with_config(NoComm, config);
        nek.configure(1, [2, 2, 2], true).unwrap();
        let blocks = vec![StructuredBlock::uniform([2, 2, 2], [0.0; 3], [1.0; 3])];
        assert_eq!(
            nek.neighbor_list(&[], &blocks).map(|l| l.table),
            Err(BoundaryError::InvalidCoordinator { coordinator: 1, size: 1 })
        );
    }

    #[test]
    fn mismatched_inputs_are_rejected() {
        let mut nek = NekDomainBoundaries::new(NoComm);
        nek.configure(2, [2, 2, 2], false).unwrap();
        let mut blocks = vec![StructuredBlock::uniform([2, 2, 2], [0.0; 3], [1.0; 3])];
        assert_eq!(
            nek.create_ghost_nodes(&[0, 1], &mut blocks, &[0, 1]),
            Err(BoundaryError::MismatchedInputs { domains: 2, blocks: 1 })
        );
        let mut small = vec![StructuredBlock::uniform([2, 2, 1], [0.0; 3], [1.0; 3])];
        assert!(matches!(
            nek.create_ghost_nodes(&[0], &mut small, &[0]),
            Err(BoundaryError::BlockSizeMismatch { block: 0, expected: 8, got: 4 })
        ));
        assert!(matches!(
            nek.create_ghost_nodes(&[7], &mut blocks, &[7]),
            Err(BoundaryError::DomainOutOfRange { domain: 7, .. })
        ));
    }
}
