//! Pairwise armor matching over the blobs of one frame.

use crate::combo::{Armor, ArmorRules, CompositeTarget};
use crate::feature::LightBlob;

/// Sort `blobs` left to right and build every admissible armor.
///
/// The sort is stable, so blobs with equal `x` keep their extraction order.
/// After sorting, `feature_ids` of the returned combos index into `blobs`.
/// A pair `(i, j)` is dropped when any blob strictly between them in the
/// sorted order lies inside the candidate plate. Candidates come out in
/// lexicographic `(i, j)` order.
pub fn find_armors(
    blobs: &mut [LightBlob],
    rules: &ArmorRules,
    tick: f64,
) -> Vec<CompositeTarget> {
    blobs.sort_by(|a, b| a.center[0].total_cmp(&b.center[0]));

    let mut armors = Vec::new();
    for i in 0..blobs.len() {
        for j in (i + 1)..blobs.len() {
            let Some(armor) = Armor::make(&blobs[i], &blobs[j], i, j, rules, tick) else {
                continue;
            };
            if let Some(k) = ((i + 1)..j).find(|&k| Armor::contains_blob(&blobs[k], &armor)) {
                tracing::trace!("armor ({}, {}) rejected: contains blob {}", i, j, k);
                continue;
            }
            armors.push(armor);
        }
    }
    armors
}
