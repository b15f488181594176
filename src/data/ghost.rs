//! Ghost-node flags and the marking pass over matched faces.
//!
//! Flags are one byte per node. Marking only ever ORs bits in, so nodes on
//! shared edges and corners keep every flag any touching face set.

use crate::data::adjacency::{AdjacencyTable, NO_NEIGHBOR};
use crate::mesh_error::BoundaryError;
use crate::topology::domain::{DomainLayout, FaceWalk};

/// Node lies on a boundary duplicated by a neighboring domain.
pub const DUPLICATED_NODE: u8 = 0x01;

/// Default name of the per-node ghost flag array.
pub const GHOST_NODES_ARRAY: &str = "ghost_nodes";

#[inline]
pub fn add_ghost_node_type(flag: &mut u8, ghost_type: u8) {
    *flag |= ghost_type;
}

#[inline]
pub fn has_ghost_node_type(flag: u8, ghost_type: u8) -> bool {
    flag & ghost_type != 0
}

/// The domain ids relevant to one marking call, classified once so lookups
/// use the cheapest valid strategy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomainMembership {
    /// Contiguous ascending run: range check.
    Sequential { start: i64, len: usize },
    /// Non-decreasing: binary search.
    Sorted(Vec<i32>),
    /// Anything else: linear scan.
    Unordered(Vec<i32>),
}

impl DomainMembership {
    pub fn classify(ids: &[i32]) -> Self {
        let mut sequential = true;
        let mut sorted = true;
        for pair in ids.windows(2) {
            if i64::from(pair[0]) + 1 != i64::from(pair[1]) {
                sequential = false;
            }
            if pair[0] > pair[1] {
                sorted = false;
                break;
            }
        }
        if sequential {
            DomainMembership::Sequential {
                start: ids.first().map_or(0, |&d| i64::from(d)),
                len: ids.len(),
            }
        } else if sorted {
            DomainMembership::Sorted(ids.to_vec())
        } else {
            DomainMembership::Unordered(ids.to_vec())
        }
    }

    pub fn contains(&self, domain: i32) -> bool {
        match self {
            DomainMembership::Sequential { start, len } => {
                let d = i64::from(domain);
                *start <= d && d < *start + *len as i64
            }
            DomainMembership::Sorted(ids) => ids.binary_search(&domain).is_ok(),
            DomainMembership::Unordered(ids) => ids.contains(&domain),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            DomainMembership::Sequential { len, .. } => *len == 0,
            DomainMembership::Sorted(ids) | DomainMembership::Unordered(ids) => ids.is_empty(),
        }
    }
}

/// OR `ghost_type` into every node of one side.
pub fn mark_face(flags: &mut [u8], walk: FaceWalk, ghost_type: u8) {
    for idx in walk.indices() {
        add_ghost_node_type(&mut flags[idx], ghost_type);
    }
}

/// Mark the node layer of every side of `domain` whose neighbor belongs to
/// `members`. `flags` covers exactly this domain's nodes. Returns the number
/// of sides marked.
pub fn mark_domain(
    layout: &DomainLayout,
    table: &AdjacencyTable,
    members: &DomainMembership,
    domain: i32,
    flags: &mut [u8],
) -> Result<usize, BoundaryError> {
    if flags.len() != layout.points_per_domain() {
        return Err(BoundaryError::DomainSizeMismatch {
            domain,
            expected: layout.points_per_domain(),
            got: flags.len(),
        });
    }
    let mut marked = 0;
    for side in layout.marked_sides() {
        let neighbor = table.neighbor(domain, side)?;
        if neighbor != NO_NEIGHBOR && members.contains(neighbor) {
            mark_face(flags, layout.face_walk(side), DUPLICATED_NODE);
            marked += 1;
        }
    }
    Ok(marked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::face::FaceMatch;

    #[test]
    fn classification_picks_strategy() {
        assert!(matches!(
            DomainMembership::classify(&[3, 4, 5]),
            DomainMembership::Sequential { start: 3, len: 3 }
        ));
        assert!(matches!(
            DomainMembership::classify(&[1, 4, 9]),
            DomainMembership::Sorted(_)
        ));
        assert!(matches!(
            DomainMembership::classify(&[4, 1, 9]),
            DomainMembership::Unordered(_)
        ));
        assert!(DomainMembership::classify(&[]).is_empty());
    }

    #[test]
    fn every_strategy_answers_membership() {
        for ids in [vec![2, 3, 4, 5], vec![0, 2, 5, 7], vec![5, 0, 7, 2]] {
            let members = DomainMembership::classify(&ids);
            for d in -1..9 {
                assert_eq!(members.contains(d), ids.contains(&d), "{members:?} {d}");
            }
        }
        assert!(!DomainMembership::classify(&[]).contains(0));
    }

    #[test]
    fn shared_edges_accumulate() {
        let layout = DomainLayout::new(3, [3, 3, 3], false).unwrap();
        let table = AdjacencyTable::from_matches(
            3,
            &[
                FaceMatch {
                    domain_a: 0,
                    side_a: 1,
                    domain_b: 1,
                    side_b: 0,
                },
                FaceMatch {
                    domain_a: 0,
                    side_a: 3,
                    domain_b: 2,
                    side_b: 2,
                },
            ],
        )
        .unwrap();
        let members = DomainMembership::classify(&[0, 1, 2]);
        let mut flags = vec![0u8; 27];
        flags[0] = 0x80;
        assert_eq!(mark_domain(&layout, &table, &members, 0, &mut flags).unwrap(), 2);
        // +x layer (i == 2) and +y layer (j == 2): 9 + 9 - 3 shared edge nodes.
        assert_eq!(flags.iter().filter(|&&f| has_ghost_node_type(f, DUPLICATED_NODE)).count(), 15);
        // Edge node (i=2, j=2, k=1) carries the bit exactly once; untouched bits survive.
        assert_eq!(flags[1 * 9 + 2 * 3 + 2], DUPLICATED_NODE);
        assert_eq!(flags[0], 0x80);
    }

    #[test]
    fn neighbors_outside_membership_are_skipped() {
        let layout = DomainLayout::new(2, [2, 2, 2], false).unwrap();
        let table = AdjacencyTable::from_matches(
            2,
            &[FaceMatch {
                domain_a: 0,
                side_a: 1,
                domain_b: 1,
                side_b: 0,
            }],
        )
        .unwrap();
        let mut flags = vec![0u8; 8];
        let members = DomainMembership::classify(&[0]);
        assert_eq!(mark_domain(&layout, &table, &members, 0, &mut flags).unwrap(), 0);
        assert!(flags.iter().all(|&f| f == 0));
    }

    #[test]
    fn wrong_flag_length_is_an_error() {
        let layout = DomainLayout::new(1, [2, 2, 2], false).unwrap();
        let table = AdjacencyTable::new(1);
        let members = DomainMembership::classify(&[0]);
        let mut flags = vec![0u8; 7];
        assert_eq!(
            mark_domain(&layout, &table, &members, 0, &mut flags),
            Err(BoundaryError::DomainSizeMismatch {
                domain: 0,
                expected: 8,
                got: 7
            })
        );
    }
}
