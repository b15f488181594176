//! Retention of a complete adjacency table across ghost-marking calls.
//!
//! The cache is owned by the calling context, never process-global. A table
//! is only retained when it was built with every domain of the mesh in view;
//! partial tables are dropped after use so they are never served as complete.

use crate::algs::neighbor_list::NeighborList;
use crate::data::adjacency::AdjacencyTable;
use crate::topology::domain::DomainLayout;

/// Anything that caches derived adjacency should implement this.
pub trait InvalidateCache {
    /// Invalidate *all* internal caches so future queries recompute correctly.
    fn invalidate_cache(&mut self);
}

impl<T: InvalidateCache + ?Sized> InvalidateCache for Box<T> {
    #[inline]
    fn invalidate_cache(&mut self) {
        (**self).invalidate_cache();
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct CachedTable {
    layout: DomainLayout,
    table: AdjacencyTable,
}

/// Optional holder of the last complete table, keyed by domain layout.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NeighborCache {
    entry: Option<CachedTable>,
}

impl NeighborCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached table for `layout`, if one was retained for that exact layout.
    pub fn get(&self, layout: &DomainLayout) -> Option<&AdjacencyTable> {
        self.entry
            .as_ref()
            .filter(|e| &e.layout == layout)
            .map(|e| &e.table)
    }

    pub fn is_populated(&self) -> bool {
        self.entry.is_some()
    }

    /// Keep `list` when caching is `enabled` and the table is complete;
    /// otherwise drop it (and anything held before). Returns whether it was kept.
    pub fn retain(&mut self, layout: &DomainLayout, list: NeighborList, enabled: bool) -> bool {
        if enabled && list.full_domain_info {
            self.entry = Some(CachedTable {
                layout: layout.clone(),
                table: list.table,
            });
            true
        } else {
            self.entry = None;
            false
        }
    }
}

impl InvalidateCache for NeighborCache {
    fn invalidate_cache(&mut self) {
        self.entry = None;
    }
}
