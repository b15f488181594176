//! Sort-and-scan face matching within one worker's face set.

use crate::topology::face::{Face, FaceMatch};

/// Sort `faces` by signature (ties by domain id, then side).
pub fn sort_faces(faces: &mut [Face]) {
    faces.sort_by(Face::cmp_total);
}

/// Sort `faces` and scan it once for adjacent pairs with identical signatures.
///
/// Each pair is recorded in `matches` and consumed; a third face sharing the
/// same signature stays unmatched. When `compress` is set, `faces` is
/// truncated to the unmatched faces in sorted order. Returns the number of
/// unmatched faces.
pub fn extract_matches(faces: &mut Vec<Face>, matches: &mut Vec<FaceMatch>, compress: bool) -> usize {
    sort_faces(faces);

    let n = faces.len();
    let mut unmatched = 0;
    let mut ii = 0;
    while ii < n {
        if ii + 1 < n && faces[ii].same_signature(&faces[ii + 1]) {
            matches.push(FaceMatch::between(&faces[ii], &faces[ii + 1]));
            if ii + 2 < n && faces[ii + 1].same_signature(&faces[ii + 2]) {
                log::warn!(
                    "more than two faces share the signature of domain {} side {}; geometry is degenerate",
                    faces[ii].domain,
                    faces[ii].side
                );
            }
            ii += 2;
        } else {
            if compress && ii != unmatched {
                faces[unmatched] = faces[ii];
            }
            unmatched += 1;
            ii += 1;
        }
    }

    if compress {
        faces.truncate(unmatched);
    }
    unmatched
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_face(x: f32, domain: i32, side: usize) -> Face {
        Face::new(
            &[[x, 0.0, 0.0], [x, 1.0, 0.0], [x, 0.0, 1.0], [x, 1.0, 1.0]],
            domain,
            side,
        )
    }

    #[test]
    fn pairs_are_matched_and_compressed_out() {
        let mut faces = vec![
            unit_face(2.0, 1, 1),
            unit_face(1.0, 0, 1),
            unit_face(0.0, 0, 0),
            unit_face(1.0, 1, 0),
        ];
        let mut matches = Vec::new();
        let left = extract_matches(&mut faces, &mut matches, true);
        assert_eq!(left, 2);
        assert_eq!(
            matches,
            vec![FaceMatch {
                domain_a: 0,
                side_a: 1,
                domain_b: 1,
                side_b: 0
            }]
        );
        assert_eq!(faces.len(), 2);
        assert_eq!((faces[0].domain, faces[0].side), (0, 0));
        assert_eq!((faces[1].domain, faces[1].side), (1, 1));
    }

    #[test]
    fn without_compress_faces_stay_in_place() {
        let mut faces = vec![unit_face(1.0, 3, 0), unit_face(1.0, 2, 1), unit_face(5.0, 9, 4)];
        let mut matches = Vec::new();
        assert_eq!(extract_matches(&mut faces, &mut matches, false), 1);
        assert_eq!(faces.len(), 3);
        assert_eq!(matches[0].domain_a, 2);
        assert_eq!(matches[0].domain_b, 3);
    }

    #[test]
    fn third_duplicate_stays_unmatched() {
        let mut faces = vec![unit_face(1.0, 5, 0), unit_face(1.0, 4, 1), unit_face(1.0, 6, 2)];
        let mut matches = Vec::new();
        let left = extract_matches(&mut faces, &mut matches, true);
        assert_eq!(left, 1);
        assert_eq!((matches[0].domain_a, matches[0].domain_b), (4, 5));
        assert_eq!(faces[0].domain, 6);
    }

    #[test]
    fn empty_input() {
        let mut faces = Vec::new();
        let mut matches = Vec::new();
        assert_eq!(extract_matches(&mut faces, &mut matches, true), 0);
        assert!(matches.is_empty());
    }
}
