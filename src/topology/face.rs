//! Canonical block faces and the matches found between them.
//!
//! A face is reduced from its four corners to an order-independent 9-float
//! signature: the lexicographically greatest corner is dropped and the other
//! three are sorted. On a well-formed structured block any three corners of a
//! side determine it, so two faces coincide exactly when their signatures do.
//! Degenerate input (repeated corners, non-hexahedral blocks) is not guarded
//! against; it orders deterministically but may match wrongly.

use crate::algs::wire::WireFace;
use std::cmp::Ordering;

/// Lexicographic point order: x, then y, then z.
///
/// Uses the IEEE total order, so the comparison is total even on NaN input.
/// Signatures never hold `-0.0` (see [`canonical_signature`]), so a zero on
/// one worker always compares equal to a zero on another.
#[inline]
pub fn cmp_point(a: &[f32; 3], b: &[f32; 3]) -> Ordering {
    a[0].total_cmp(&b[0])
        .then_with(|| a[1].total_cmp(&b[1]))
        .then_with(|| a[2].total_cmp(&b[2]))
}

/// Reduce the four corners of one face (in any order) to its signature.
pub fn canonical_signature(corners: &[[f32; 3]; 4]) -> [f32; 9] {
    // Adding +0.0 folds -0.0 into +0.0 and leaves every other value intact.
    let pts = corners.map(|p| p.map(|c| c + 0.0));

    let mut max = 0;
    for ii in 1..4 {
        if cmp_point(&pts[max], &pts[ii]) == Ordering::Less {
            max = ii;
        }
    }

    let mut kept = [[0.0f32; 3]; 3];
    for (dst, (_, p)) in kept.iter_mut().zip(pts.iter().enumerate().filter(|&(ii, _)| ii != max)) {
        *dst = *p;
    }
    kept.sort_by(cmp_point);

    let mut sig = [0.0f32; 9];
    for (dst, p) in sig.chunks_exact_mut(3).zip(&kept) {
        dst.copy_from_slice(p);
    }
    sig
}

/// One side of one domain, in canonical form.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Face {
    pub pts: [f32; 9],
    pub domain: i32,
    /// Side index in `0..6`.
    pub side: usize,
    /// Destination partition; only meaningful during redistribution.
    pub partition: usize,
}

impl Face {
    pub fn new(corners: &[[f32; 3]; 4], domain: i32, side: usize) -> Self {
        Self {
            pts: canonical_signature(corners),
            domain,
            side,
            partition: 0,
        }
    }

    /// First canonical corner; the spatial key used for redistribution.
    #[inline]
    pub fn first_corner(&self) -> [f32; 3] {
        [self.pts[0], self.pts[1], self.pts[2]]
    }

    /// Signature order: the first differing float of the nine decides.
    pub fn cmp_signature(&self, other: &Face) -> Ordering {
        self.pts
            .iter()
            .zip(&other.pts)
            .map(|(a, b)| a.total_cmp(b))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    #[inline]
    pub fn same_signature(&self, other: &Face) -> bool {
        self.cmp_signature(other) == Ordering::Equal
    }

    /// Sort order of the matcher: signature, then domain id, then side.
    pub fn cmp_total(&self, other: &Face) -> Ordering {
        self.cmp_signature(other)
            .then(self.domain.cmp(&other.domain))
            .then(self.side.cmp(&other.side))
    }

    pub fn to_wire(&self) -> WireFace {
        WireFace {
            pts_le: self.pts.map(|c| c.to_bits().to_le()),
            domain_le: self.domain.to_le(),
            side_le: (self.side as u32).to_le(),
            partition_le: (self.partition as u32).to_le(),
        }
    }

    pub fn from_wire(w: &WireFace) -> Self {
        Self {
            pts: w.pts_le.map(|b| f32::from_bits(u32::from_le(b))),
            domain: i32::from_le(w.domain_le),
            side: u32::from_le(w.side_le) as usize,
            partition: u32::from_le(w.partition_le) as usize,
        }
    }
}

/// Two coincident faces: `(domain_a, side_a)` touches `(domain_b, side_b)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaceMatch {
    pub domain_a: i32,
    pub side_a: usize,
    pub domain_b: i32,
    pub side_b: usize,
}

impl FaceMatch {
    pub fn between(a: &Face, b: &Face) -> Self {
        Self {
            domain_a: a.domain,
            side_a: a.side,
            domain_b: b.domain,
            side_b: b.side,
        }
    }
}
