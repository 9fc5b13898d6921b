//! Removal of armor candidates that compete for the same light bar.

use crate::combo::CompositeTarget;

/// Drop armors that lose a pairwise conflict, keeping input order.
///
/// For every pair `i < j`:
/// - sharing the same-side bar (left with left, or right with right) marks
///   the wider plate, which spans a neighbouring plate's gap;
/// - otherwise sharing a bar on opposite sides (one's right is the other's
///   left) marks the plate with the larger error.
///
/// Ties mark `j`. Marks are never cleared, so a candidate is removed iff it
/// loses at least one comparison and the result does not depend on the
/// order in which losers are found.
pub fn erase_conflicting_armors(armors: &mut Vec<CompositeTarget>) {
    let n = armors.len();
    let mut marked = vec![false; n];
    for i in 0..n {
        for j in (i + 1)..n {
            if let Some(second_loses) = conflict_loser(&armors[i], &armors[j]) {
                marked[if second_loses { j } else { i }] = true;
            }
        }
    }

    let before = armors.len();
    let mut flags = marked.into_iter();
    armors.retain(|_| !flags.next().unwrap_or(false));
    if armors.len() != before {
        tracing::trace!("erased {} conflicting armors", before - armors.len());
    }
}

/// `Some(true)` when `b` loses, `Some(false)` when `a` loses, `None` when the
/// two candidates share no bar.
fn conflict_loser(a: &CompositeTarget, b: &CompositeTarget) -> Option<bool> {
    let (al, ar) = (a.left_id()?, a.right_id()?);
    let (bl, br) = (b.left_id()?, b.right_id()?);
    if al == bl || ar == br {
        Some(b.width >= a.width)
    } else if al == br || ar == bl {
        Some(b.error >= a.error)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combo::{Armor, ArmorRules};
    use crate::matcher::find_armors;
    use crate::test_utils::blob;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn armor(l: usize, r: usize, width: f32, error: f32) -> CompositeTarget {
        let left = blob([100.0, 200.0], 7.0, 29.0, 0.0, l);
        let right = blob([160.0, 200.0], 7.0, 29.0, 0.0, r);
        let mut a = Armor::make(&left, &right, l, r, &ArmorRules::default(), 0.0)
            .expect("compatible");
        a.width = width;
        a.error = error;
        a
    }

    fn ids(armors: &[CompositeTarget]) -> Vec<(usize, usize)> {
        armors
            .iter()
            .map(|a| (a.feature_ids[0], a.feature_ids[1]))
            .collect()
    }

    #[test]
    fn same_side_sharing_drops_the_wider() {
        let mut armors = vec![armor(0, 2, 120.0, 0.0), armor(0, 1, 60.0, 0.5)];
        erase_conflicting_armors(&mut armors);
        assert_eq!(ids(&armors), vec![(0, 1)]);

        let mut armors = vec![armor(1, 3, 60.0, 0.0), armor(2, 3, 60.0, 0.0)];
        erase_conflicting_armors(&mut armors);
        assert_eq!(ids(&armors), vec![(1, 3)]);
    }

    #[test]
    fn opposite_side_sharing_drops_the_larger_error() {
        let mut armors = vec![armor(0, 1, 60.0, 0.8), armor(1, 2, 60.0, 0.2)];
        erase_conflicting_armors(&mut armors);
        assert_eq!(ids(&armors), vec![(1, 2)]);
    }

    #[test]
    fn disjoint_armors_survive_in_order() {
        let mut armors = vec![armor(2, 3, 60.0, 0.3), armor(0, 1, 60.0, 0.1)];
        erase_conflicting_armors(&mut armors);
        assert_eq!(ids(&armors), vec![(2, 3), (0, 1)]);
    }

    #[test]
    fn marks_are_sticky() {
        // (0,1) loses to (1,2) on error; (1,2) then loses to (1,3) on width.
        // (0,1) stays removed even though its winner is gone.
        let mut armors = vec![
            armor(0, 1, 60.0, 0.9),
            armor(1, 2, 90.0, 0.1),
            armor(1, 3, 60.0, 0.5),
        ];
        erase_conflicting_armors(&mut armors);
        assert_eq!(ids(&armors), vec![(1, 3)]);
    }

    #[test]
    fn survivors_share_no_bar() {
        let rules = ArmorRules::default();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let mut blobs: Vec<_> = (0..12)
                .map(|c| {
                    let center = [rng.gen_range(0.0..300.0), rng.gen_range(195.0..205.0)];
                    blob(center, 5.0, rng.gen_range(20.0..28.0), rng.gen_range(-4.0..4.0), c)
                })
                .collect();
            let mut armors = find_armors(&mut blobs, &rules, 0.0);
            erase_conflicting_armors(&mut armors);
            for (i, a) in armors.iter().enumerate() {
                for b in &armors[i + 1..] {
                    assert!(
                        !a.shares_feature_with(b),
                        "{:?} vs {:?}",
                        a.feature_ids,
                        b.feature_ids
                    );
                }
            }
        }
    }
}
