//! Canonical ordering and subset selection for threshold composites.
//!
//! The same comparator drives both directions of the codec: encoding sorts
//! set elements with it, and decoding rejects sets that are not already
//! sorted by it. Keeping it a single pure function prevents the two sides
//! from drifting apart.

use std::cmp::Ordering;

use crate::error::ConstructionError;
use crate::fulfillment::Fulfillment;
use crate::types::Condition;

/// Canonical order over encoded values: shorter encodings first, ties broken
/// by unsigned lexicographic byte comparison.
pub(crate) fn canonical_cmp(a: &[u8], b: &[u8]) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Sort encodings into canonical ascending order.
pub(crate) fn sort_encodings(encodings: &mut [Vec<u8>]) {
    encodings.sort_by(|a, b| canonical_cmp(a, b));
}

/// One branch of a threshold composite as supplied by the prover: either a
/// fulfillment, or only the condition when the prover cannot (or need not)
/// fulfill that branch.
#[derive(Debug, Clone)]
pub enum ThresholdBranch {
    /// A branch the prover can fulfill.
    Fulfilled(Fulfillment),
    /// A branch represented only by its commitment.
    Unfulfilled(Condition),
}

impl From<Fulfillment> for ThresholdBranch {
    fn from(fulfillment: Fulfillment) -> Self {
        ThresholdBranch::Fulfilled(fulfillment)
    }
}

impl From<Condition> for ThresholdBranch {
    fn from(condition: Condition) -> Self {
        ThresholdBranch::Unfulfilled(condition)
    }
}

/// Select exactly `threshold` subfulfillments from the supplied branches.
///
/// The `threshold` cheapest available fulfillments are chosen (by the cost
/// of their derived conditions, ties broken by the canonical encoding order
/// so the output is deterministic); every other branch is represented by its
/// condition. Both returned sets are in canonical ascending encoding order.
pub(crate) fn select_subfulfillments(
    threshold: u16,
    branches: Vec<ThresholdBranch>,
) -> Result<(Vec<Fulfillment>, Vec<Condition>), ConstructionError> {
    let mut available: Vec<(Fulfillment, Condition)> = Vec::new();
    let mut subconditions: Vec<Condition> = Vec::new();
    for branch in branches {
        match branch {
            ThresholdBranch::Fulfilled(f) => {
                let condition = f.condition();
                available.push((f, condition));
            }
            ThresholdBranch::Unfulfilled(c) => subconditions.push(c),
        }
    }

    if available.len() < usize::from(threshold) {
        return Err(ConstructionError::InsufficientFulfillments {
            threshold,
            available: available.len(),
        });
    }

    available.sort_by(|(_, a), (_, b)| {
        a.cost
            .cmp(&b.cost)
            .then_with(|| canonical_cmp(&a.encode(), &b.encode()))
    });

    let unused = available.split_off(usize::from(threshold));
    subconditions.extend(unused.into_iter().map(|(_, condition)| condition));

    let mut subfulfillments: Vec<Fulfillment> =
        available.into_iter().map(|(f, _)| f).collect();
    subfulfillments.sort_by(|a, b| canonical_cmp(&a.encode(), &b.encode()));
    subconditions.sort_by(|a, b| canonical_cmp(&a.encode(), &b.encode()));

    // A branch listed twice would double-count toward the threshold, and
    // the decoder rejects the duplicate encodings it would produce.
    let duplicated = has_adjacent_duplicate(subfulfillments.iter().map(Fulfillment::encode))
        || has_adjacent_duplicate(subconditions.iter().map(Condition::encode))
        || subfulfillments
            .iter()
            .any(|f| subconditions.contains(&f.condition()));
    if duplicated {
        return Err(ConstructionError::FieldOutOfRange {
            field: "branches",
            reason: "duplicate branch".to_string(),
        });
    }

    Ok((subfulfillments, subconditions))
}

pub(crate) fn has_adjacent_duplicate(encodings: impl Iterator<Item = Vec<u8>>) -> bool {
    let mut previous: Option<Vec<u8>> = None;
    for encoding in encodings {
        if previous.as_deref() == Some(&encoding) {
            return true;
        }
        previous = Some(encoding);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparator_orders_by_length_first() {
        assert_eq!(canonical_cmp(b"zz", b"aaa"), Ordering::Less);
        assert_eq!(canonical_cmp(b"aaa", b"zz"), Ordering::Greater);
    }

    #[test]
    fn comparator_breaks_ties_lexicographically() {
        assert_eq!(canonical_cmp(b"abc", b"abd"), Ordering::Less);
        assert_eq!(canonical_cmp(b"abc", b"abc"), Ordering::Equal);
        // Byte comparison is unsigned.
        assert_eq!(canonical_cmp(&[0x7F], &[0x80]), Ordering::Less);
    }

    #[test]
    fn sort_encodings_is_canonical() {
        let mut encodings = vec![vec![0xFF, 0x00], vec![0x01], vec![0x00, 0x01]];
        sort_encodings(&mut encodings);
        assert_eq!(
            encodings,
            vec![vec![0x01], vec![0x00, 0x01], vec![0xFF, 0x00]]
        );
    }

    #[test]
    fn selection_picks_the_cheapest_available() {
        // Preimage cost equals preimage length, so the two shortest
        // preimages must be selected.
        let branches = vec![
            ThresholdBranch::from(Fulfillment::preimage(b"long preimage".to_vec())),
            ThresholdBranch::from(Fulfillment::preimage(b"ab".to_vec())),
            ThresholdBranch::from(Fulfillment::preimage(b"c".to_vec())),
        ];
        let (subfulfillments, subconditions) = select_subfulfillments(2, branches).unwrap();
        assert_eq!(subfulfillments.len(), 2);
        assert_eq!(subconditions.len(), 1);
        assert_eq!(subconditions[0].cost, 13);

        let mut selected_costs: Vec<u64> = subfulfillments
            .iter()
            .map(|f| f.condition().cost)
            .collect();
        selected_costs.sort_unstable();
        assert_eq!(selected_costs, vec![1, 2]);
    }

    #[test]
    fn selection_fails_when_fulfillments_run_short() {
        let branches = vec![
            ThresholdBranch::from(Fulfillment::preimage(b"a".to_vec())),
            ThresholdBranch::from(Fulfillment::preimage(b"b".to_vec()).condition()),
        ];
        let err = select_subfulfillments(2, branches).unwrap_err();
        assert_eq!(
            err,
            ConstructionError::InsufficientFulfillments {
                threshold: 2,
                available: 1,
            }
        );
    }

    #[test]
    fn selection_rejects_duplicate_branches() {
        let branches = vec![
            ThresholdBranch::from(Fulfillment::preimage(b"same".to_vec())),
            ThresholdBranch::from(Fulfillment::preimage(b"same".to_vec())),
        ];
        let err = select_subfulfillments(2, branches).unwrap_err();
        assert_eq!(
            err,
            ConstructionError::FieldOutOfRange {
                field: "branches",
                reason: "duplicate branch".to_string(),
            }
        );
    }

    #[test]
    fn selection_is_deterministic_on_equal_costs() {
        let make = || {
            vec![
                ThresholdBranch::from(Fulfillment::preimage(b"x".to_vec())),
                ThresholdBranch::from(Fulfillment::preimage(b"a".to_vec())),
                ThresholdBranch::from(Fulfillment::preimage(b"m".to_vec())),
            ]
        };
        let (first, _) = select_subfulfillments(2, make()).unwrap();
        let (second, _) = select_subfulfillments(2, make()).unwrap();
        let enc = |fs: &[Fulfillment]| fs.iter().map(Fulfillment::encode).collect::<Vec<_>>();
        assert_eq!(enc(&first), enc(&second));
    }
}
