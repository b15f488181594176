#![allow(dead_code)]
use itertools::iproduct;
use nek_boundaries::prelude::*;

/// One domain per cell of a `grid` of unit cubes, each holding `dims` nodes.
/// Domains are numbered x-fastest, like the nodes inside them.
pub fn grid_blocks(grid: [usize; 3], dims: [usize; 3]) -> Vec<StructuredBlock> {
    let spacing = dims.map(|n| if n > 1 { 1.0 / (n - 1) as f64 } else { 0.0 });
    iproduct!(0..grid[2], 0..grid[1], 0..grid[0])
        .map(|(k, j, i)| StructuredBlock::uniform(dims, [i as f64, j as f64, k as f64], spacing))
        .collect()
}

/// Neighbors of every domain of `grid`, sides ordered `-x, +x, -y, +y, -z, +z`.
pub fn grid_neighbors(grid: [usize; 3]) -> Vec<[i32; 6]> {
    let [gx, gy, gz] = grid;
    let id = |i: usize, j: usize, k: usize| (k * gy * gx + j * gx + i) as i32;
    iproduct!(0..gz, 0..gy, 0..gx)
        .map(|(k, j, i)| {
            [
                if i > 0 { id(i - 1, j, k) } else { NO_NEIGHBOR },
                if i + 1 < gx { id(i + 1, j, k) } else { NO_NEIGHBOR },
                if j > 0 { id(i, j - 1, k) } else { NO_NEIGHBOR },
                if j + 1 < gy { id(i, j + 1, k) } else { NO_NEIGHBOR },
                if k > 0 { id(i, j, k - 1) } else { NO_NEIGHBOR },
                if k + 1 < gz { id(i, j, k + 1) } else { NO_NEIGHBOR },
            ]
        })
        .collect()
}

/// Expected flags of one domain: every node on a side whose neighbor is in `members`.
pub fn expected_flags(dims: [usize; 3], neighbors: &[i32; 6], members: &[i32], n_sides: usize) -> Vec<u8> {
    let [nx, ny, nz] = dims;
    let on_side = |side: usize, i: usize, j: usize, k: usize| match side {
        0 => i == 0,
        1 => i + 1 == nx,
        2 => j == 0,
        3 => j + 1 == ny,
        4 => k == 0,
        _ => k + 1 == nz,
    };
    iproduct!(0..nz, 0..ny, 0..nx)
        .map(|(k, j, i)| {
            let ghost = (0..n_sides)
                .any(|s| neighbors[s] != NO_NEIGHBOR && members.contains(&neighbors[s]) && on_side(s, i, j, k));
            if ghost { DUPLICATED_NODE } else { 0 }
        })
        .collect()
}

/// Ghost flags attached to `block`, panicking when missing.
pub fn flags_of(block: &StructuredBlock) -> Vec<u8> {
    block
        .point_array("ghost_nodes")
        .expect("ghost array attached")
        .to_vec()
}

/// Run `f` once per worker of an in-process group of `size`, results by rank.
pub fn run_group<T, F>(size: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(ThreadComm) -> T + Sync,
{
    let comms = ThreadComm::group(size);
    let f = &f;
    std::thread::scope(|s| {
        let handles: Vec<_> = comms.into_iter().map(|c| s.spawn(move || f(c))).collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("worker panicked"))
            .collect()
    })
}

/// What one worker ends up with after matching and marking its domains.
pub struct WorkerResult {
    pub domains: Vec<i32>,
    pub flags: Vec<Vec<u8>>,
    pub table: AdjacencyTable,
    pub full_domain_info: bool,
}

/// Deal `blocks` to `size` workers by `owner[domain]`, then match and mark
/// on every worker with every domain in the membership set.
pub fn distributed_ghosts(
    blocks: &[StructuredBlock],
    dims: [usize; 3],
    owner: &[usize],
    size: usize,
) -> Vec<WorkerResult> {
    let n_domains = blocks.len();
    let all: Vec<i32> = (0..n_domains as i32).collect();
    run_group(size, |comm| {
        let rank = comm.rank();
        let domains: Vec<i32> = all.iter().copied().filter(|&d| owner[d as usize] == rank).collect();
        let mut local: Vec<StructuredBlock> = domains.iter().map(|&d| blocks[d as usize].clone()).collect();

        let mut nek = NekDomainBoundaries::new(comm);
        nek.configure(n_domains, dims, false).unwrap();
        let list = nek.neighbor_list(&domains, &local).unwrap();
        nek.create_ghost_nodes(&domains, &mut local, &all).unwrap();

        WorkerResult {
            flags: local.iter().map(flags_of).collect(),
            domains,
            table: list.table,
            full_domain_info: list.full_domain_info,
        }
    })
}

/// Same as [`distributed_ghosts`] on a single serial worker.
pub fn serial_ghosts(blocks: &[StructuredBlock], dims: [usize; 3]) -> WorkerResult {
    let n_domains = blocks.len();
    let all: Vec<i32> = (0..n_domains as i32).collect();
    let mut local = blocks.to_vec();
    let mut nek = NekDomainBoundaries::new(NoComm);
    nek.configure(n_domains, dims, false).unwrap();
    let list = nek.neighbor_list(&all, &local).unwrap();
    nek.create_ghost_nodes(&all, &mut local, &all).unwrap();
    WorkerResult {
        flags: local.iter().map(flags_of).collect(),
        domains: all,
        table: list.table,
        full_domain_info: list.full_domain_info,
    }
}
