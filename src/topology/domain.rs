//! Structured-block domain layout shared by every domain of one mesh session.
//!
//! All domains of a spectral-element mesh carry the same `(nx, ny, nz)` node
//! block, so the eight corner offsets and the node walks along each of the
//! six sides are computed once from the dimensions.
//!
//! Sides are numbered `0..6` as `-x, +x, -y, +y, -z, +z`. Corners are
//! numbered `0..8` with bit 0 selecting `+x`, bit 1 `+y` and bit 2 `+z`.

use crate::mesh_error::BoundaryError;
use itertools::iproduct;
use serde::{Deserialize, Serialize};

/// Number of sides of a hexahedral block.
pub const N_SIDES: usize = 6;

/// Corner numbers spanning each side, in the fixed winding used to build faces.
pub const FACE_CORNERS: [[usize; 4]; N_SIDES] = [
    [0, 2, 4, 6],
    [1, 3, 5, 7],
    [0, 1, 4, 5],
    [2, 3, 6, 7],
    [0, 1, 2, 3],
    [4, 5, 6, 7],
];

/// Domain configuration for one mesh session. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainLayout {
    n_domains: usize,
    dims: [usize; 3],
    n_dims: usize,
    multiple_blocks: bool,
    points_per_domain: usize,
    corner_offsets: [usize; 8],
}

impl DomainLayout {
    /// Configure `n_domains` domains of `dims` nodes each.
    ///
    /// `multiple_blocks` declares that a single mesh block may pack several
    /// consecutive domains. Blocks one node thick in z are treated as 2-D.
    pub fn new(n_domains: usize, dims: [usize; 3], multiple_blocks: bool) -> Result<Self, BoundaryError> {
        if dims.iter().any(|&n| n == 0) {
            return Err(BoundaryError::InvalidBlockDims(dims));
        }
        let [nx, ny, nz] = dims;
        let plane = nx * ny;
        let top = plane * (nz - 1);
        let back = nx * (ny - 1);
        let right = nx - 1;
        Ok(Self {
            n_domains,
            dims,
            n_dims: if nz == 1 { 2 } else { 3 },
            multiple_blocks,
            points_per_domain: plane * nz,
            corner_offsets: [
                0,
                right,
                back,
                back + right,
                top,
                top + right,
                top + back,
                top + back + right,
            ],
        })
    }

    /// Override the spatial dimension (2 or 3) derived from `dims`.
    pub fn with_spatial_dims(mut self, n_dims: usize) -> Self {
        self.n_dims = n_dims.clamp(2, 3);
        self
    }

    pub fn n_domains(&self) -> usize {
        self.n_domains
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn spatial_dims(&self) -> usize {
        self.n_dims
    }

    pub fn multiple_blocks(&self) -> bool {
        self.multiple_blocks
    }

    pub fn points_per_domain(&self) -> usize {
        self.points_per_domain
    }

    /// Offsets of the eight block corners into a domain's node array.
    pub fn corner_offsets(&self) -> &[usize; 8] {
        &self.corner_offsets
    }

    /// Sides whose node layers take part in ghost marking.
    pub fn marked_sides(&self) -> std::ops::Range<usize> {
        0..2 * self.n_dims
    }

    /// Validate a domain id against the configured domain count.
    pub fn domain_index(&self, domain: i32) -> Result<usize, BoundaryError> {
        usize::try_from(domain)
            .ok()
            .filter(|&d| d < self.n_domains)
            .ok_or(BoundaryError::DomainOutOfRange {
                domain,
                n_domains: self.n_domains,
            })
    }

    /// Node walk covering the 2-D index layer of `side`.
    pub fn face_walk(&self, side: usize) -> FaceWalk {
        let [nx, ny, nz] = self.dims;
        match side {
            0 | 1 => FaceWalk {
                base: side * (nx - 1),
                outer: (nz, nx * ny),
                inner: (ny, nx),
            },
            2 | 3 => FaceWalk {
                base: (side - 2) * (ny - 1) * nx,
                outer: (nz, nx * ny),
                inner: (nx, 1),
            },
            _ => FaceWalk {
                base: (side.min(5) - 4) * (nz - 1) * ny * nx,
                outer: (ny, nx),
                inner: (nx, 1),
            },
        }
    }
}

/// Strided walk over the nodes of one block side: `outer.0 * inner.0` nodes
/// starting at `base`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FaceWalk {
    base: usize,
    outer: (usize, usize),
    inner: (usize, usize),
}

impl FaceWalk {
    pub fn len(&self) -> usize {
        self.outer.0 * self.inner.0
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Node indices on this side, relative to the domain's first node.
    pub fn indices(self) -> impl Iterator<Item = usize> {
        let Self { base, outer, inner } = self;
        iproduct!(0..outer.0, 0..inner.0).map(move |(o, i)| base + o * outer.1 + i * inner.1)
    }
}
