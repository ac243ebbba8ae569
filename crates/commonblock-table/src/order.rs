//! Field ordering: preferred names first, the rest lexicographically.

use indexmap::{IndexMap, IndexSet};

use commonblock_core::TableError;

use crate::config::OrderPolicy;

/// Resolve the final field order as positions into `names`.
///
/// `names` must already be unique. Names listed in `preferred` come first,
/// in the given sequence; every remaining name follows in ascending
/// lexicographic (byte-wise) order. What happens to unknown or repeated
/// names in `preferred` depends on `policy`.
pub(crate) fn resolve_order(
    names: &[String],
    preferred: Option<&[String]>,
    policy: OrderPolicy,
) -> Result<Vec<usize>, TableError> {
    let positions: IndexMap<&str, usize> = names
        .iter()
        .enumerate()
        .map(|(i, n)| (n.as_str(), i))
        .collect();

    let mut chosen: IndexSet<usize> = IndexSet::with_capacity(names.len());
    for name in preferred.unwrap_or_default() {
        let Some(&pos) = positions.get(name.as_str()) else {
            match policy {
                OrderPolicy::Prefer => continue,
                OrderPolicy::Strict => {
                    return Err(TableError::InvalidInput {
                        reason: format!("preferred order names unknown field '{name}'"),
                    })
                }
            }
        };
        if !chosen.insert(pos) && policy == OrderPolicy::Strict {
            return Err(TableError::InvalidInput {
                reason: format!("preferred order repeats field '{name}'"),
            });
        }
    }

    let mut rest: Vec<usize> = (0..names.len()).filter(|i| !chosen.contains(i)).collect();
    rest.sort_by(|&a, &b| names[a].cmp(&names[b]));

    let mut order: Vec<usize> = chosen.into_iter().collect();
    order.extend(rest);
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn ordered(names: &[String], order: &[usize]) -> Vec<String> {
        order.iter().map(|&i| names[i].clone()).collect()
    }

    #[test]
    fn no_preference_is_lexicographic() {
        let names = strings(&["pt", "eta", "phi", "charge"]);
        let order = resolve_order(&names, None, OrderPolicy::Prefer).unwrap();
        assert_eq!(ordered(&names, &order), strings(&["charge", "eta", "phi", "pt"]));
    }

    #[test]
    fn preferred_first_then_rest_sorted() {
        let names = strings(&["a", "b", "c", "d"]);
        let pref = strings(&["c", "a"]);
        let order = resolve_order(&names, Some(&pref), OrderPolicy::Prefer).unwrap();
        assert_eq!(ordered(&names, &order), strings(&["c", "a", "b", "d"]));
    }

    #[test]
    fn prefer_drops_unknown_and_repeated() {
        let names = strings(&["x", "y"]);
        let pref = strings(&["nope", "y", "y"]);
        let order = resolve_order(&names, Some(&pref), OrderPolicy::Prefer).unwrap();
        assert_eq!(ordered(&names, &order), strings(&["y", "x"]));
    }

    #[test]
    fn strict_rejects_unknown() {
        let names = strings(&["x", "y"]);
        let pref = strings(&["nope"]);
        let err = resolve_order(&names, Some(&pref), OrderPolicy::Strict).unwrap_err();
        assert!(matches!(err, TableError::InvalidInput { .. }));
    }

    #[test]
    fn strict_rejects_repeated() {
        let names = strings(&["x", "y"]);
        let pref = strings(&["x", "x"]);
        let err = resolve_order(&names, Some(&pref), OrderPolicy::Strict).unwrap_err();
        assert!(matches!(err, TableError::InvalidInput { .. }));
    }

    #[test]
    fn lexicographic_is_bytewise() {
        let names = strings(&["b", "B", "a", "_"]);
        let order = resolve_order(&names, None, OrderPolicy::Prefer).unwrap();
        assert_eq!(ordered(&names, &order), strings(&["B", "_", "a", "b"]));
    }

    fn arb_names() -> impl Strategy<Value = Vec<String>> {
        prop::collection::btree_set("[a-z]{1,6}", 1..16)
            .prop_map(|set| set.into_iter().collect::<Vec<_>>())
            .prop_shuffle()
    }

    proptest! {
        #[test]
        fn order_is_a_permutation(names in arb_names(), pick in prop::collection::vec(0usize..32, 0..8)) {
            let pref: Vec<String> = pick
                .iter()
                .filter_map(|&i| names.get(i).cloned())
                .collect();
            let order = resolve_order(&names, Some(&pref), OrderPolicy::Prefer).unwrap();
            let mut sorted = order.clone();
            sorted.sort_unstable();
            prop_assert_eq!(sorted, (0..names.len()).collect::<Vec<_>>());
        }

        #[test]
        fn tail_is_sorted_and_head_follows_preference(
            names in arb_names(),
            pick in prop::collection::vec(0usize..32, 0..8),
        ) {
            let pref: Vec<String> = pick
                .iter()
                .filter_map(|&i| names.get(i).cloned())
                .collect();
            let mut dedup: Vec<String> = Vec::new();
            for p in &pref {
                if !dedup.contains(p) {
                    dedup.push(p.clone());
                }
            }
            let order = resolve_order(&names, Some(&pref), OrderPolicy::Prefer).unwrap();
            let result = ordered(&names, &order);
            prop_assert_eq!(&result[..dedup.len()], &dedup[..]);
            let tail = &result[dedup.len()..];
            prop_assert!(tail.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
