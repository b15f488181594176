//! Spatial redistribution of unmatched faces.
//!
//! Faces left unmatched by the local pass may have their partner on another
//! worker. The global bounding box of all face keys is bisected until the
//! number of cells reaches the largest power of two not exceeding the worker
//! count; every face travels to the worker owning the cell of its first
//! canonical corner. Partners share that corner bit-for-bit, so they always
//! land on the same worker. Workers ranked at or above the power of two
//! receive nothing.

use crate::algs::communicator::{Communicator, ReduceOp};
use crate::algs::wire::{WireFace, cast_slice, read_records};
use crate::mesh_error::BoundaryError;
use crate::topology::face::Face;

/// Axis-aligned box over face keys, as `(min, max)`.
pub type Bounds = ([f32; 3], [f32; 3]);

/// Box of the first canonical corners of `faces`; inverted (`min > max`)
/// when `faces` is empty.
pub fn local_bounds(faces: &[Face]) -> Bounds {
    let mut min = [f32::MAX; 3];
    let mut max = [-f32::MAX; 3];
    for face in faces {
        let p = face.first_corner();
        for axis in 0..3 {
            min[axis] = min[axis].min(p[axis]);
            max[axis] = max[axis].max(p[axis]);
        }
    }
    (min, max)
}

/// Union of every worker's local box.
pub fn global_bounds<C>(comm: &C, local: Bounds) -> Result<Bounds, BoundaryError>
where
    C: Communicator + ?Sized,
{
    let min = comm.all_reduce_f32(&local.0, ReduceOp::Min)?;
    let max = comm.all_reduce_f32(&local.1, ReduceOp::Max)?;
    Ok(([min[0], min[1], min[2]], [max[0], max[1], max[2]]))
}

/// Power-of-two grid of cells over the global face box, one cell per worker.
#[derive(Clone, Debug, PartialEq)]
pub struct SpatialPartition {
    min: [f32; 3],
    cell_size: [f32; 3],
    n_cells: [usize; 3],
}

impl SpatialPartition {
    /// Bisect `bounds` along its currently widest axis until the cell count is
    /// the largest power of two `<= n_workers`. x or y is only split when
    /// strictly widest; every tie splits z.
    pub fn new(bounds: Bounds, n_workers: usize) -> Self {
        let (min, max) = bounds;
        let mut cell_size = [max[0] - min[0], max[1] - min[1], max[2] - min[2]];
        let mut n_cells = [1usize; 3];
        let mut used = 1usize;
        while used * 2 <= n_workers {
            let [x, y, z] = cell_size;
            let axis = if x > y && x > z {
                0
            } else if y > z && y > x {
                1
            } else {
                2
            };
            n_cells[axis] *= 2;
            cell_size[axis] /= 2.0;
            used *= 2;
        }
        Self {
            min,
            cell_size,
            n_cells,
        }
    }

    /// Number of partitions (= receiving workers).
    pub fn n_partitions(&self) -> usize {
        self.n_cells.iter().product()
    }

    pub fn cells(&self) -> [usize; 3] {
        self.n_cells
    }

    /// Cell containing `p`, clamped into the grid at the extremes.
    pub fn partition_of(&self, p: [f32; 3]) -> usize {
        let mut idx = [0usize; 3];
        for axis in 0..3 {
            let n = self.n_cells[axis];
            let size = self.cell_size[axis];
            if n > 1 && size > 0.0 {
                let bucket = ((p[axis] - self.min[axis]) / size).floor() as i64;
                idx[axis] = bucket.clamp(0, n as i64 - 1) as usize;
            }
        }
        idx[2] * self.n_cells[0] * self.n_cells[1] + idx[1] * self.n_cells[0] + idx[0]
    }
}

/// Send every face in `faces` to the worker owning its partition and return
/// the faces this worker receives, in source-rank order.
///
/// Two collectives: an all-to-all of per-destination counts, then the
/// personalized all-to-all of the face records.
pub fn redistribute<C>(
    comm: &C,
    mut faces: Vec<Face>,
    partition: &SpatialPartition,
) -> Result<Vec<Face>, BoundaryError>
where
    C: Communicator + ?Sized,
{
    let size = comm.size();
    let mut send_counts = vec![0u32; size];
    for face in faces.iter_mut() {
        face.partition = partition.partition_of(face.first_corner());
        log::trace!(
            "domain {} side {} -> partition {}",
            face.domain,
            face.side,
            face.partition
        );
        send_counts[face.partition] += 1;
    }
    // Stable: faces keep their signature order within each destination.
    faces.sort_by_key(|f| f.partition);

    let recv_counts = comm.all_to_all_counts(&send_counts)?;

    let wire: Vec<WireFace> = faces.iter().map(Face::to_wire).collect();
    let to_bytes = |counts: &[u32]| -> Vec<usize> {
        counts.iter().map(|&n| n as usize * WireFace::SIZE).collect()
    };
    let raw = comm.all_to_all_bytes(cast_slice(&wire), &to_bytes(&send_counts), &to_bytes(&recv_counts))?;

    let received: Vec<Face> = read_records::<WireFace>(&raw)
        .iter()
        .map(Face::from_wire)
        .collect();
    log::debug!(
        "rank {}: sent {} unmatched faces over {} partitions, received {}",
        comm.rank(),
        faces.len(),
        partition.n_partitions(),
        received.len()
    );
    Ok(received)
}
