//! Mesh blocks handed to the engine by the host.
//!
//! The engine only needs node coordinates and a place to attach named
//! per-node byte arrays; [`MeshBlock`] is that seam. [`StructuredBlock`] is a
//! plain in-memory implementation.

use hashbrown::HashMap;
use itertools::iproduct;

/// Node storage of one mesh block (one or more packed domains).
pub trait MeshBlock {
    fn num_points(&self) -> usize;

    /// Coordinates of node `idx`. Callers stay below [`num_points`](Self::num_points).
    fn point(&self, idx: usize) -> [f64; 3];

    /// Named per-node byte array, if attached.
    fn point_array(&self, name: &str) -> Option<&[u8]>;

    /// Named per-node byte array, attached empty when missing.
    fn point_array_entry(&mut self, name: &str) -> &mut Vec<u8>;
}

/// Structured block with x-fastest node ordering.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StructuredBlock {
    points: Vec<[f64; 3]>,
    point_data: HashMap<String, Vec<u8>>,
}

impl StructuredBlock {
    pub fn from_points(points: Vec<[f64; 3]>) -> Self {
        Self {
            points,
            point_data: HashMap::new(),
        }
    }

    /// `dims` nodes starting at `origin`, spaced by `spacing` along each axis.
    pub fn uniform(dims: [usize; 3], origin: [f64; 3], spacing: [f64; 3]) -> Self {
        let [nx, ny, nz] = dims;
        let points = iproduct!(0..nz, 0..ny, 0..nx)
            .map(|(k, j, i)| {
                [
                    origin[0] + i as f64 * spacing[0],
                    origin[1] + j as f64 * spacing[1],
                    origin[2] + k as f64 * spacing[2],
                ]
            })
            .collect();
        Self::from_points(points)
    }

    /// Pack several blocks into one, domain after domain.
    pub fn concat<'a, I>(blocks: I) -> Self
    where
        I: IntoIterator<Item = &'a StructuredBlock>,
    {
        Self::from_points(
            blocks
                .into_iter()
                .flat_map(|b| b.points.iter().copied())
                .collect(),
        )
    }

    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }
}

impl MeshBlock for StructuredBlock {
    fn num_points(&self) -> usize {
        self.points.len()
    }

    fn point(&self, idx: usize) -> [f64; 3] {
        self.points[idx]
    }

    fn point_array(&self, name: &str) -> Option<&[u8]> {
        self.point_data.get(name).map(Vec::as_slice)
    }

    fn point_array_entry(&mut self, name: &str) -> &mut Vec<u8> {
        self.point_data.entry_ref(name).or_default()
    }
}
