//! `AdjacencyTable`: `(domain, side)` → neighboring domain.

use crate::algs::wire::{WireNeighbor, cast_slice, read_records};
use crate::mesh_error::BoundaryError;
use crate::topology::domain::N_SIDES;
use crate::topology::face::FaceMatch;
use serde::{Deserialize, Serialize};

/// Sentinel for a side with no neighbor.
pub const NO_NEIGHBOR: i32 = -1;

/// Six entries per domain, replicated on every worker after the broadcast.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacencyTable {
    neighbors: Vec<i32>,
}

impl AdjacencyTable {
    /// Table for `n_domains` domains with every side unmatched.
    pub fn new(n_domains: usize) -> Self {
        Self {
            neighbors: vec![NO_NEIGHBOR; n_domains * N_SIDES],
        }
    }

    pub fn n_domains(&self) -> usize {
        self.neighbors.len() / N_SIDES
    }

    fn slot(&self, domain: i32, side: usize) -> Result<usize, BoundaryError> {
        let n_domains = self.n_domains();
        usize::try_from(domain)
            .ok()
            .filter(|&d| d < n_domains && side < N_SIDES)
            .map(|d| d * N_SIDES + side)
            .ok_or(BoundaryError::DomainOutOfRange { domain, n_domains })
    }

    /// Neighbor of `(domain, side)`, or [`NO_NEIGHBOR`].
    pub fn neighbor(&self, domain: i32, side: usize) -> Result<i32, BoundaryError> {
        Ok(self.neighbors[self.slot(domain, side)?])
    }

    /// The six neighbors of `domain`.
    pub fn sides(&self, domain: i32) -> Result<&[i32], BoundaryError> {
        let start = self.slot(domain, 0)?;
        Ok(&self.neighbors[start..start + N_SIDES])
    }

    /// Record a match in both directions.
    pub fn insert_match(&mut self, m: &FaceMatch) -> Result<(), BoundaryError> {
        let a = self.slot(m.domain_a, m.side_a)?;
        let b = self.slot(m.domain_b, m.side_b)?;
        self.neighbors[a] = m.domain_b;
        self.neighbors[b] = m.domain_a;
        Ok(())
    }

    /// Build a table from a set of matches.
    pub fn from_matches<'a, I>(n_domains: usize, matches: I) -> Result<Self, BoundaryError>
    where
        I: IntoIterator<Item = &'a FaceMatch>,
    {
        let mut table = Self::new(n_domains);
        for m in matches {
            table.insert_match(m)?;
        }
        Ok(table)
    }

    /// Number of sides that have a neighbor.
    pub fn matched_sides(&self) -> usize {
        self.neighbors.iter().filter(|&&d| d != NO_NEIGHBOR).count()
    }

    /// Raw entries, `domain * 6 + side`.
    pub fn as_slice(&self) -> &[i32] {
        &self.neighbors
    }

    pub(crate) fn to_wire(&self) -> Vec<u8> {
        let wire: Vec<WireNeighbor> = self.neighbors.iter().map(|&d| WireNeighbor::new(d)).collect();
        cast_slice(&wire).to_vec()
    }

    pub(crate) fn from_wire(raw: &[u8]) -> Self {
        Self {
            neighbors: read_records::<WireNeighbor>(raw)
                .iter()
                .map(WireNeighbor::get)
                .collect(),
        }
    }
}
