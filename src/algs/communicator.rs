//! Thin façade over intra-process (threads) or inter-process (MPI) message passing.
//!
//! Messages are *contiguous byte slices* (no zero-copy guarantees).
//! Point-to-point handles are **waitable** but non-blocking; every collective
//! the matching engine needs is a provided method built on top of them, so a
//! backend only has to move bytes. Backends with native collectives (MPI)
//! override the provided methods.
//!
//! Every collective is a synchronization point: all workers must issue the
//! same sequence of collectives with consistent arguments. A collective that
//! a peer never joins blocks forever; there is no timeout at this layer.

use crate::algs::wire::{WireCount, WireSum, cast_slice, read_records};
use crate::mesh_error::BoundaryError;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;

/// Typed message tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CommTag(pub u16);

impl CommTag {
    pub const fn new(tag: u16) -> Self {
        Self(tag)
    }
    pub const fn as_u16(self) -> u16 {
        self.0
    }
    pub const fn offset(self, k: u16) -> Self {
        Self(self.0.wrapping_add(k))
    }
}

/// Tags reserved by the provided collectives.
pub mod tags {
    use super::CommTag;

    pub const ALL_TO_ALL_COUNTS: CommTag = CommTag::new(0x4E00);
    pub const ALL_TO_ALL_BYTES: CommTag = CommTag::new(0x4E01);
    pub const GATHER_COUNT: CommTag = CommTag::new(0x4E02);
    pub const BROADCAST: CommTag = CommTag::new(0x4E03);
    pub const ALL_REDUCE: CommTag = CommTag::new(0x4E04);
    pub const ALL_GATHER: CommTag = CommTag::new(0x4E05);
    /// Match lists streamed to the coordinator.
    pub const MATCHES: CommTag = CommTag::new(0x4E10);
}

/// Element-wise reduction applied by [`Communicator::all_reduce_f32`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReduceOp {
    Min,
    Max,
}

impl ReduceOp {
    fn apply(self, acc: f32, v: f32) -> f32 {
        match self {
            ReduceOp::Min => acc.min(v),
            ReduceOp::Max => acc.max(v),
        }
    }
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

/// Collective transport: non-blocking point-to-point core plus the
/// collectives used by face matching.
pub trait Communicator {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    /// Post a receive of at most `buf.len()` bytes; the payload comes back
    /// through [`Wait::wait`].
    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle;

    /// True when more than one worker takes part.
    fn is_distributed(&self) -> bool {
        self.size() > 1
    }

    /// Exchange one count per destination; returns one count per source.
    fn all_to_all_counts(&self, send: &[u32]) -> Result<Vec<u32>, BoundaryError> {
        const OP: &str = "all_to_all_counts";
        check_len(OP, send.len(), self.size())?;
        let wires: Vec<WireCount> = send.iter().map(|&n| WireCount::new(n as usize)).collect();
        let outgoing: Vec<&[u8]> = wires
            .iter()
            .map(|w| cast_slice(std::slice::from_ref(w)))
            .collect();
        let lens = vec![std::mem::size_of::<WireCount>(); self.size()];
        let incoming = pairwise_exchange(self, OP, tags::ALL_TO_ALL_COUNTS, &outgoing, &lens)?;
        Ok(incoming
            .iter()
            .map(|raw| read_count(raw) as u32)
            .collect())
    }

    /// Personalized all-to-all: `send` is the concatenation of the per-destination
    /// blocks sized by `send_counts`; the result concatenates the per-source
    /// blocks sized by `recv_counts`, in rank order.
    fn all_to_all_bytes(
        &self,
        send: &[u8],
        send_counts: &[usize],
        recv_counts: &[usize],
    ) -> Result<Vec<u8>, BoundaryError> {
        const OP: &str = "all_to_all_bytes";
        check_len(OP, send_counts.len(), self.size())?;
        check_len(OP, recv_counts.len(), self.size())?;
        let total: usize = send_counts.iter().sum();
        if total != send.len() {
            return Err(BoundaryError::comm(
                OP,
                None,
                format!("send counts cover {total} bytes, buffer holds {}", send.len()),
            ));
        }
        let mut outgoing = Vec::with_capacity(send_counts.len());
        let mut offset = 0;
        for &n in send_counts {
            outgoing.push(&send[offset..offset + n]);
            offset += n;
        }
        let incoming = pairwise_exchange(self, OP, tags::ALL_TO_ALL_BYTES, &outgoing, recv_counts)?;
        Ok(incoming.concat())
    }

    /// Gather one count per worker on `root`. Non-root workers get `None`.
    fn gather_count(&self, root: usize, n: u32) -> Result<Option<Vec<u32>>, BoundaryError> {
        const OP: &str = "gather_count";
        let wire = WireCount::new(n as usize);
        let bytes = cast_slice(std::slice::from_ref(&wire));
        if self.rank() != root {
            self.send_to(root, tags::GATHER_COUNT, bytes)?;
            return Ok(None);
        }
        let mut counts = Vec::with_capacity(self.size());
        for peer in 0..self.size() {
            if peer == root {
                counts.push(n);
            } else {
                let raw = recv_exact(self, OP, peer, tags::GATHER_COUNT, bytes.len())?;
                counts.push(read_count(&raw) as u32);
            }
        }
        Ok(Some(counts))
    }

    /// Blocking point-to-point send.
    fn send_to(&self, peer: usize, tag: CommTag, buf: &[u8]) -> Result<(), BoundaryError> {
        let _ = self.isend(peer, tag.as_u16(), buf).wait();
        Ok(())
    }

    /// Blocking point-to-point receive of exactly `len` bytes.
    fn recv_from(&self, peer: usize, tag: CommTag, len: usize) -> Result<Vec<u8>, BoundaryError> {
        recv_exact(self, "recv_from", peer, tag, len)
    }

    /// Replicate `root`'s buffer into every worker's `buf`.
    fn broadcast_bytes(&self, root: usize, buf: &mut [u8]) -> Result<(), BoundaryError> {
        const OP: &str = "broadcast_bytes";
        if self.rank() == root {
            let pending: Vec<_> = (0..self.size())
                .filter(|&peer| peer != root)
                .map(|peer| self.isend(peer, tags::BROADCAST.as_u16(), buf))
                .collect();
            for send in pending {
                let _ = send.wait();
            }
            Ok(())
        } else {
            let raw = recv_exact(self, OP, root, tags::BROADCAST, buf.len())?;
            buf.copy_from_slice(&raw);
            Ok(())
        }
    }

    /// Element-wise reduction of `values` across all workers, replicated everywhere.
    fn all_reduce_f32(&self, values: &[f32], op: ReduceOp) -> Result<Vec<f32>, BoundaryError> {
        const OP: &str = "all_reduce_f32";
        let encoded: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let bytes: &[u8] = &encoded;
        let outgoing = vec![bytes; self.size()];
        let lens = vec![bytes.len(); self.size()];
        let incoming = pairwise_exchange(self, OP, tags::ALL_REDUCE, &outgoing, &lens)?;
        let mut acc = values.to_vec();
        // Reduce in rank order so every worker computes bit-identical results.
        for (peer, raw) in incoming.iter().enumerate() {
            let theirs: Vec<f32> = raw
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect();
            for (a, &v) in acc.iter_mut().zip(&theirs) {
                *a = if peer == 0 { v } else { op.apply(*a, v) };
            }
        }
        Ok(acc)
    }

    /// Sum of `value` over all workers, replicated everywhere.
    fn all_reduce_sum(&self, value: u64) -> Result<u64, BoundaryError> {
        const OP: &str = "all_reduce_sum";
        let wire = WireSum::new(value);
        let bytes = cast_slice(std::slice::from_ref(&wire));
        let outgoing = vec![bytes; self.size()];
        let lens = vec![bytes.len(); self.size()];
        let incoming = pairwise_exchange(self, OP, tags::ALL_REDUCE, &outgoing, &lens)?;
        Ok(incoming
            .iter()
            .map(|raw| read_records::<WireSum>(raw).first().map_or(0, WireSum::get))
            .sum())
    }

    /// One count from every worker, in rank order, replicated everywhere.
    fn all_gather_count(&self, n: u32) -> Result<Vec<u32>, BoundaryError> {
        const OP: &str = "all_gather_count";
        let wire = WireCount::new(n as usize);
        let bytes = cast_slice(std::slice::from_ref(&wire));
        let outgoing = vec![bytes; self.size()];
        let lens = vec![bytes.len(); self.size()];
        let incoming = pairwise_exchange(self, OP, tags::ALL_GATHER, &outgoing, &lens)?;
        Ok(incoming
            .iter()
            .map(|raw| read_count(raw) as u32)
            .collect())
    }
}

fn read_count(raw: &[u8]) -> usize {
    read_records::<WireCount>(raw)
        .first()
        .map_or(0, WireCount::get)
}

fn check_len(operation: &'static str, got: usize, size: usize) -> Result<(), BoundaryError> {
    if got == size {
        Ok(())
    } else {
        Err(BoundaryError::comm(
            operation,
            None,
            format!("expected one entry per worker ({size}), got {got}"),
        ))
    }
}

fn recv_exact<C: Communicator + ?Sized>(
    comm: &C,
    operation: &'static str,
    peer: usize,
    tag: CommTag,
    len: usize,
) -> Result<Vec<u8>, BoundaryError> {
    let mut buf = vec![0u8; len];
    match comm.irecv(peer, tag.as_u16(), &mut buf).wait() {
        Some(data) if data.len() == len => Ok(data),
        Some(data) => Err(BoundaryError::comm(
            operation,
            Some(peer),
            format!("expected {len} bytes, got {}", data.len()),
        )),
        None => Err(BoundaryError::comm(
            operation,
            Some(peer),
            format!("failed to receive from rank {peer}"),
        )),
    }
}

/// Send `outgoing[p]` to every peer `p` and receive `lens[p]` bytes back from
/// it. The local block is copied through. Every handle is drained before
/// returning, even when a receive fails.
fn pairwise_exchange<C: Communicator + ?Sized>(
    comm: &C,
    operation: &'static str,
    tag: CommTag,
    outgoing: &[&[u8]],
    lens: &[usize],
) -> Result<Vec<Vec<u8>>, BoundaryError> {
    let me = comm.rank();
    let size = comm.size();
    check_len(operation, outgoing.len(), size)?;
    check_len(operation, lens.len(), size)?;
    if outgoing[me].len() != lens[me] {
        return Err(BoundaryError::comm(
            operation,
            Some(me),
            format!(
                "local block holds {} bytes, expected {}",
                outgoing[me].len(),
                lens[me]
            ),
        ));
    }

    // 1) post all sends
    let pending_sends: Vec<_> = (0..size)
        .filter(|&peer| peer != me)
        .map(|peer| comm.isend(peer, tag.as_u16(), outgoing[peer]))
        .collect();

    // 2) post all receives
    let mut pending_recvs = Vec::with_capacity(size);
    for peer in (0..size).filter(|&peer| peer != me) {
        let mut buf = vec![0u8; lens[peer]];
        pending_recvs.push((peer, comm.irecv(peer, tag.as_u16(), &mut buf)));
    }

    // 3) wait for all recvs (but do not early-return)
    let mut incoming = vec![Vec::new(); size];
    incoming[me] = outgoing[me].to_vec();
    let mut maybe_err = None;
    for (peer, h) in pending_recvs {
        match h.wait() {
            Some(data) if data.len() == lens[peer] => incoming[peer] = data,
            Some(data) if maybe_err.is_none() => {
                maybe_err = Some(BoundaryError::comm(
                    operation,
                    Some(peer),
                    format!("expected {} bytes, got {}", lens[peer], data.len()),
                ));
            }
            None if maybe_err.is_none() => {
                maybe_err = Some(BoundaryError::comm(
                    operation,
                    Some(peer),
                    format!("failed to receive from rank {peer}"),
                ));
            }
            _ => {} // already have an error; just drain
        }
    }

    // 4) always drain all send handles before returning
    for send in pending_sends {
        let _ = send.wait();
    }

    match maybe_err {
        Some(err) => Err(err),
        None => Ok(incoming),
    }
}

/// Single-worker transport for serial runs.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: u16, _buf: &mut [u8]) {}
}

// --- ThreadComm: in-process group, one worker per thread ---
type Key = (usize, usize, u16); // (src, dst, tag)

#[derive(Default)]
struct Mailbox {
    slots: DashMap<Key, VecDeque<Bytes>>,
    generation: Mutex<u64>,
    posted: Condvar,
}

impl Mailbox {
    fn post(&self, key: Key, bytes: Bytes) {
        self.slots.entry(key).or_default().push_back(bytes);
        let mut generation = self.generation.lock();
        *generation = generation.wrapping_add(1);
        self.posted.notify_all();
    }

    fn take(&self, key: &Key) -> Option<Bytes> {
        self.slots.get_mut(key).and_then(|mut queue| queue.pop_front())
    }
}

/// Receive handle of [`ThreadComm`]; blocks in `wait` until the message lands.
pub struct LocalHandle {
    mailbox: Arc<Mailbox>,
    key: Key,
    len: usize,
}

impl Wait for LocalHandle {
    fn wait(self) -> Option<Vec<u8>> {
        let mut generation = self.mailbox.generation.lock();
        loop {
            if let Some(bytes) = self.mailbox.take(&self.key) {
                let n = self.len.min(bytes.len());
                return Some(bytes[..n].to_vec());
            }
            self.mailbox.posted.wait(&mut generation);
        }
    }
}

/// In-process transport: a fixed group of workers sharing one mailbox.
/// Messages between a (source, destination, tag) triple arrive in FIFO order.
#[derive(Clone)]
pub struct ThreadComm {
    rank: usize,
    size: usize,
    mailbox: Arc<Mailbox>,
}

impl ThreadComm {
    /// Create the `size` endpoints of one group, indexed by rank.
    pub fn group(size: usize) -> Vec<ThreadComm> {
        let mailbox = Arc::new(Mailbox::default());
        (0..size)
            .map(|rank| ThreadComm {
                rank,
                size,
                mailbox: Arc::clone(&mailbox),
            })
            .collect()
    }
}

impl std::fmt::Debug for ThreadComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadComm")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .finish()
    }
}

impl Communicator for ThreadComm {
    type SendHandle = ();
    type RecvHandle = LocalHandle;

    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.size
    }

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle {
        self.mailbox
            .post((self.rank, peer, tag), Bytes::copy_from_slice(buf));
    }

    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle {
        LocalHandle {
            mailbox: Arc::clone(&self.mailbox),
            key: (peer, self.rank, tag),
            len: buf.len(),
        }
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::Count;
    use mpi::collective::SystemOperation;
    use mpi::datatype::{Partition, PartitionMut};
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::{Communicator as _, CommunicatorCollectives, Destination, Root, Source};

    /// Wraps an rsmpi communicator. rsmpi aborts the job on transport
    /// failure, so these calls never surface a `CommError` themselves.
    pub struct MpiComm {
        world: SimpleCommunicator,
        rank: usize,
        size: usize,
    }

    impl MpiComm {
        pub fn new(world: SimpleCommunicator) -> Self {
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Self { world, rank, size }
        }

        pub fn world(&self) -> &SimpleCommunicator {
            &self.world
        }
    }

    /// Point-to-point calls complete before the handle is returned.
    pub struct ReadyHandle(Option<Vec<u8>>);

    impl Wait for ReadyHandle {
        fn wait(self) -> Option<Vec<u8>> {
            self.0
        }
    }

    fn displacements(counts: &[Count]) -> Vec<Count> {
        counts
            .iter()
            .scan(0, |acc, &n| {
                let at = *acc;
                *acc += n;
                Some(at)
            })
            .collect()
    }

    fn as_counts(op: &'static str, counts: &[usize]) -> Result<Vec<Count>, BoundaryError> {
        counts
            .iter()
            .map(|&n| {
                Count::try_from(n)
                    .map_err(|_| BoundaryError::comm(op, None, format!("count {n} exceeds MPI range")))
            })
            .collect()
    }

    impl Communicator for MpiComm {
        type SendHandle = ReadyHandle;
        type RecvHandle = ReadyHandle;

        fn rank(&self) -> usize {
            self.rank
        }
        fn size(&self) -> usize {
            self.size
        }

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> ReadyHandle {
            self.world
                .process_at_rank(peer as i32)
                .send_with_tag(buf, tag as i32);
            ReadyHandle(None)
        }

        fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> ReadyHandle {
            let (mut data, _status) = self
                .world
                .process_at_rank(peer as i32)
                .receive_vec_with_tag::<u8>(tag as i32);
            data.truncate(buf.len());
            ReadyHandle(Some(data))
        }

        fn all_to_all_counts(&self, send: &[u32]) -> Result<Vec<u32>, BoundaryError> {
            check_len("all_to_all_counts", send.len(), self.size)?;
            let mut recv = vec![0u32; self.size];
            self.world.all_to_all_into(send, &mut recv[..]);
            Ok(recv)
        }

        fn all_to_all_bytes(
            &self,
            send: &[u8],
            send_counts: &[usize],
            recv_counts: &[usize],
        ) -> Result<Vec<u8>, BoundaryError> {
            const OP: &str = "all_to_all_bytes";
            check_len(OP, send_counts.len(), self.size)?;
            check_len(OP, recv_counts.len(), self.size)?;
            let sc = as_counts(OP, send_counts)?;
            let rc = as_counts(OP, recv_counts)?;
            let sd = displacements(&sc);
            let rd = displacements(&rc);
            let mut recv = vec![0u8; recv_counts.iter().sum()];
            {
                let send_part = Partition::new(send, &sc[..], &sd[..]);
                let mut recv_part = PartitionMut::new(&mut recv[..], &rc[..], &rd[..]);
                self.world
                    .all_to_all_varcount_into(&send_part, &mut recv_part);
            }
            Ok(recv)
        }

        fn gather_count(&self, root: usize, n: u32) -> Result<Option<Vec<u32>>, BoundaryError> {
            let root_process = self.world.process_at_rank(root as i32);
            if self.rank == root {
                let mut counts = vec![0u32; self.size];
                root_process.gather_into_root(&n, &mut counts[..]);
                Ok(Some(counts))
            } else {
                root_process.gather_into(&n);
                Ok(None)
            }
        }

        fn broadcast_bytes(&self, root: usize, buf: &mut [u8]) -> Result<(), BoundaryError> {
            self.world.process_at_rank(root as i32).broadcast_into(buf);
            Ok(())
        }

        fn all_reduce_f32(&self, values: &[f32], op: ReduceOp) -> Result<Vec<f32>, BoundaryError> {
            let mut out = vec![0f32; values.len()];
            let operation = match op {
                ReduceOp::Min => SystemOperation::min(),
                ReduceOp::Max => SystemOperation::max(),
            };
            self.world.all_reduce_into(values, &mut out[..], operation);
            Ok(out)
        }

        fn all_reduce_sum(&self, value: u64) -> Result<u64, BoundaryError> {
            let mut sum = 0u64;
            self.world
                .all_reduce_into(&value, &mut sum, SystemOperation::sum());
            Ok(sum)
        }

        fn all_gather_count(&self, n: u32) -> Result<Vec<u32>, BoundaryError> {
            let mut counts = vec![0u32; self.size];
            self.world.all_gather_into(&n, &mut counts[..]);
            Ok(counts)
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
