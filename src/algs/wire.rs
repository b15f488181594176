//! Fixed, little-endian wire types for the face-matching collectives.

use bytemuck::{Pod, Zeroable};
use std::mem::{align_of, size_of};

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

/// Decode a received byte buffer into records. Receive buffers carry no
/// alignment guarantee, so each record is read unaligned; trailing bytes that
/// do not form a whole record are ignored.
pub fn read_records<T: Pod>(raw: &[u8]) -> Vec<T> {
    raw.chunks_exact(size_of::<T>())
        .map(bytemuck::pod_read_unaligned)
        .collect()
}

// All multi-byte values in these structs are little-endian on the wire:
// stored with `.to_le()` and decoded with `.from_le()`.

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireCount {
    pub n_le: u32,
}
impl WireCount {
    pub fn new(n: usize) -> Self {
        Self {
            n_le: (n as u32).to_le(),
        }
    }
    pub fn get(&self) -> usize {
        u32::from_le(self.n_le) as usize
    }
}

/// Operand of the sum reduction.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireSum {
    pub v_le: u64,
}
impl WireSum {
    pub fn new(v: u64) -> Self {
        Self { v_le: v.to_le() }
    }
    pub fn get(&self) -> u64 {
        u64::from_le(self.v_le)
    }
}

/// A canonical face in transit to the worker owning its spatial partition.
/// Coordinates travel as raw `f32` bits so signatures survive bit-exact.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireFace {
    pub pts_le: [u32; 9],
    pub domain_le: i32,
    pub side_le: u32,
    pub partition_le: u32,
}
impl WireFace {
    pub const SIZE: usize = 48; // 9*4 + 4 + 4 + 4
}

/// One discovered match `(domain_a, side_a, domain_b, side_b)`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireMatch {
    pub domain_a_le: i32,
    pub side_a_le: u32,
    pub domain_b_le: i32,
    pub side_b_le: u32,
}
impl WireMatch {
    pub fn new(domain_a: i32, side_a: usize, domain_b: i32, side_b: usize) -> Self {
        Self {
            domain_a_le: domain_a.to_le(),
            side_a_le: (side_a as u32).to_le(),
            domain_b_le: domain_b.to_le(),
            side_b_le: (side_b as u32).to_le(),
        }
    }
    pub fn decode(&self) -> (i32, usize, i32, usize) {
        (
            i32::from_le(self.domain_a_le),
            u32::from_le(self.side_a_le) as usize,
            i32::from_le(self.domain_b_le),
            u32::from_le(self.side_b_le) as usize,
        )
    }
}

/// One adjacency table entry as broadcast by the coordinator.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireNeighbor(pub i32);
impl WireNeighbor {
    pub fn new(domain: i32) -> Self {
        Self(domain.to_le())
    }
    pub fn get(&self) -> i32 {
        i32::from_le(self.0)
    }
}

// ===== Compile-time sanity checks =========================================

static_assertions::assert_eq_size!(WireCount, u32);
static_assertions::assert_eq_size!(WireNeighbor, i32);

const _: () = {
    assert!(size_of::<WireSum>() == 8);
    assert!(size_of::<WireFace>() == WireFace::SIZE);
    assert!(align_of::<WireFace>() == 4);
    assert!(size_of::<WireMatch>() == 16);
};
