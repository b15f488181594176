mod util;

use nek_boundaries::algs::communicator::Communicator;
use nek_boundaries::algs::redistribute::{SpatialPartition, global_bounds, local_bounds, redistribute};
use nek_boundaries::topology::face::Face;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serial_test::serial;
use util::run_group;

fn random_faces(rng: &mut SmallRng, domain: i32, n: usize) -> Vec<Face> {
    (0..n)
        .map(|side| {
            let o: [f32; 3] = [rng.gen_range(-5.0..5.0), rng.gen_range(0.0..2.0), rng.gen_range(0.0..1.0)];
            let corners = [
                o,
                [o[0] + 1.0, o[1], o[2]],
                [o[0], o[1] + 1.0, o[2]],
                [o[0] + 1.0, o[1] + 1.0, o[2]],
            ];
            Face::new(&corners, domain, side % 6)
        })
        .collect()
}

#[test]
#[serial]
fn workers_beyond_the_power_of_two_receive_nothing() {
    for size in [3usize, 5, 6, 7] {
        let per_worker = 40;
        let got = run_group(size, |comm| {
            let mut rng = SmallRng::seed_from_u64(comm.rank() as u64 + 17);
            let faces = random_faces(&mut rng, comm.rank() as i32, per_worker);
            let bounds = global_bounds(&comm, local_bounds(&faces)).unwrap();
            let partition = SpatialPartition::new(bounds, comm.size());
            let received = redistribute(&comm, faces, &partition).unwrap();
            (partition.n_partitions(), received)
        });

        let power = 1 << size.ilog2();
        let mut total = 0;
        for (rank, (n_partitions, received)) in got.iter().enumerate() {
            assert_eq!(*n_partitions, power);
            assert!(*n_partitions <= size);
            if rank >= power {
                assert!(received.is_empty(), "rank {rank} of {size} received faces");
            }
            for face in received {
                assert_eq!(face.partition, rank);
            }
            total += received.len();
        }
        assert_eq!(total, per_worker * size);
    }
}

#[test]
#[serial]
fn coincident_faces_land_on_one_worker() {
    let corners = [[2.0, 0.0, 0.0], [2.0, 1.0, 0.0], [2.0, 0.0, 1.0], [2.0, 1.0, 1.0]];
    let got = run_group(4, |comm| {
        let rank = comm.rank();
        let mut rng = SmallRng::seed_from_u64(rank as u64);
        let mut faces = random_faces(&mut rng, rank as i32, 10);
        // Ranks 1 and 3 each hold one side of the same interface, listed in different orders.
        if rank == 1 {
            faces.push(Face::new(&corners, 100, 1));
        }
        if rank == 3 {
            let mut flipped = corners;
            flipped.reverse();
            faces.push(Face::new(&flipped, 101, 0));
        }
        let bounds = global_bounds(&comm, local_bounds(&faces)).unwrap();
        let partition = SpatialPartition::new(bounds, comm.size());
        redistribute(&comm, faces, &partition).unwrap()
    });

    let holders: Vec<usize> = got
        .iter()
        .enumerate()
        .filter(|(_, faces)| faces.iter().any(|f| f.domain >= 100))
        .map(|(rank, _)| rank)
        .collect();
    assert_eq!(holders.len(), 1);
    let faces = &got[holders[0]];
    assert_eq!(faces.iter().filter(|f| f.domain >= 100).count(), 2);
}
