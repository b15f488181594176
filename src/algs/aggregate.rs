//! Collect every worker's matches on the coordinator and replicate the table.

use crate::algs::communicator::{Communicator, tags};
use crate::algs::wire::{WireMatch, cast_slice, read_records};
use crate::data::adjacency::AdjacencyTable;
use crate::mesh_error::BoundaryError;
use crate::topology::domain::N_SIDES;
use crate::topology::face::FaceMatch;

/// `coordinator` must be a rank of `comm`; checked before any collective.
pub fn check_coordinator<C>(comm: &C, coordinator: usize) -> Result<(), BoundaryError>
where
    C: Communicator + ?Sized,
{
    if coordinator < comm.size() {
        Ok(())
    } else {
        Err(BoundaryError::InvalidCoordinator {
            coordinator,
            size: comm.size(),
        })
    }
}

/// Gather match counts on `coordinator`, stream each worker's match list to
/// it in rank order, build the table there and broadcast it to all workers.
///
/// Every worker returns an identical table. Entries depend only on the set
/// of matches, not on message arrival order.
pub fn aggregate_matches<C>(
    comm: &C,
    coordinator: usize,
    n_domains: usize,
    matches: &[FaceMatch],
) -> Result<AdjacencyTable, BoundaryError>
where
    C: Communicator + ?Sized,
{
    check_coordinator(comm, coordinator)?;
    let counts = comm.gather_count(coordinator, matches.len() as u32)?;

    let mut bytes = match counts {
        Some(counts) => {
            let mut table = AdjacencyTable::new(n_domains);
            for (peer, &n) in counts.iter().enumerate() {
                if peer == coordinator {
                    for m in matches {
                        table.insert_match(m)?;
                    }
                    continue;
                }
                let raw = comm.recv_from(peer, tags::MATCHES, n as usize * size_of::<WireMatch>())?;
                for wire in read_records::<WireMatch>(&raw) {
                    let (domain_a, side_a, domain_b, side_b) = wire.decode();
                    table.insert_match(&FaceMatch {
                        domain_a,
                        side_a,
                        domain_b,
                        side_b,
                    })?;
                }
            }
            log::debug!(
                "coordinator {coordinator}: {} matches from {} workers",
                counts.iter().map(|&n| n as usize).sum::<usize>(),
                counts.len()
            );
            table.to_wire()
        }
        None => {
            let wire: Vec<WireMatch> = matches
                .iter()
                .map(|m| WireMatch::new(m.domain_a, m.side_a, m.domain_b, m.side_b))
                .collect();
            comm.send_to(coordinator, tags::MATCHES, cast_slice(&wire))?;
            vec![0u8; n_domains * N_SIDES * size_of::<i32>()]
        }
    };

    comm.broadcast_bytes(coordinator, &mut bytes)?;
    Ok(AdjacencyTable::from_wire(&bytes))
}

/// True when the workers together processed every domain of the mesh.
pub fn covers_all_domains<C>(comm: &C, n_local: usize, n_domains: usize) -> Result<bool, BoundaryError>
where
    C: Communicator + ?Sized,
{
    let total = comm.all_reduce_sum(n_local as u64)?;
    Ok(total == n_domains as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::NoComm;
    use crate::data::adjacency::NO_NEIGHBOR;

    #[test]
    fn serial_aggregation_builds_the_table() {
        let matches = [FaceMatch {
            domain_a: 1,
            side_a: 4,
            domain_b: 0,
            side_b: 5,
        }];
        let table = aggregate_matches(&NoComm, 0, 2, &matches).unwrap();
        assert_eq!(table.neighbor(1, 4), Ok(0));
        assert_eq!(table.neighbor(0, 5), Ok(1));
        assert_eq!(table.neighbor(0, 0), Ok(NO_NEIGHBOR));
    }

    #[test]
    fn coordinator_outside_the_group_is_rejected() {
        assert_eq!(
            aggregate_matches(&NoComm, 1, 2, &[]),
            Err(BoundaryError::InvalidCoordinator { coordinator: 1, size: 1 })
        );
        assert!(check_coordinator(&NoComm, 0).is_ok());
    }

    #[test]
    fn coverage_compares_against_total() {
        assert!(covers_all_domains(&NoComm, 4, 4).unwrap());
        assert!(!covers_all_domains(&NoComm, 3, 4).unwrap());
    }
}
