//! Merging per-shard results into global views.
//!
//! Pure functions over [`ScatterGatherOutcome`], no I/O. Failed shards
//! contribute nothing; callers decide whether a partial outcome is
//! acceptable before aggregating.

use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::outcome::ScatterGatherOutcome;

/// Sum of per-shard counts.
pub fn count(outcome: &ScatterGatherOutcome<u64>) -> u64 {
    outcome.items().sum()
}

/// Exact associative sum over every item.
pub fn sum<T>(outcome: ScatterGatherOutcome<T>) -> T
where
    T: std::iter::Sum<T>,
{
    outcome.into_items().into_iter().sum()
}

pub fn min<T: Ord>(outcome: ScatterGatherOutcome<T>) -> Option<T> {
    outcome.into_items().into_iter().min()
}

pub fn max<T: Ord>(outcome: ScatterGatherOutcome<T>) -> Option<T> {
    outcome.into_items().into_iter().max()
}

/// Per-shard `(sum, count)` pair for global averaging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartialAvg {
    pub sum: f64,
    pub count: u64,
}

impl PartialAvg {
    pub fn new(sum: f64, count: u64) -> Self {
        Self { sum, count }
    }
}

/// Global average from per-shard partial sums: `sum(sums) / sum(counts)`,
/// divided once. Averaging per-shard averages would bias toward small
/// shards, so shards must report `(sum, count)` pairs instead.
pub fn average(outcome: &ScatterGatherOutcome<PartialAvg>) -> Option<f64> {
    let (total_sum, total_count) = outcome
        .items()
        .fold((0.0, 0u64), |(s, c), p| (s + p.sum, c + p.count));
    if total_count == 0 {
        None
    } else {
        Some(total_sum / total_count as f64)
    }
}

/// Union of per-shard distinct sets, de-duplicated again at the merge
/// layer; duplicates can occur near partition boundaries under skew.
/// First-seen order is kept.
pub fn distinct<T>(outcome: ScatterGatherOutcome<T>) -> Vec<T>
where
    T: Eq + Hash + Clone,
{
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for item in outcome.into_items() {
        if seen.insert(item.clone()) {
            unique.push(item);
        }
    }
    unique
}

/// Merge per-shard top-N candidate lists: re-sort the combined set under
/// the original ordering and truncate to `n`.
///
/// Caller contract: every shard must return at least `n` candidates,
/// otherwise the merged result can undercount. The aggregator cannot
/// detect or correct that here.
pub fn top_n_by<T, F>(outcome: ScatterGatherOutcome<T>, n: usize, compare: F) -> Vec<T>
where
    F: FnMut(&T, &T) -> Ordering,
{
    let mut candidates = outcome.into_items();
    candidates.sort_by(compare);
    candidates.truncate(n);
    candidates
}

/// Merge groups with equal keys across shards, combining their aggregate
/// values with `combine` (e.g. summing counts). Key equality is exact.
pub fn merge_groups<K, A, F>(
    outcome: ScatterGatherOutcome<(K, A)>,
    mut combine: F,
) -> HashMap<K, A>
where
    K: Eq + Hash,
    F: FnMut(&mut A, A),
{
    let mut groups = HashMap::new();
    for (key, value) in outcome.into_items() {
        match groups.entry(key) {
            Entry::Occupied(mut entry) => combine(entry.get_mut(), value),
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
        }
    }
    groups
}

/// Overfetch-and-merge pagination: every shard returns `page_size` items
/// under the same sort order; the merge combines all shard pages, re-sorts,
/// and takes the requested window.
///
/// This overfetches `(shard_count - 1) * page_size` rows per call, and a
/// window past what each shard returned will undercount. Deep pagination
/// should use shard-local cursors instead.
pub fn merge_page<T, F>(
    outcome: ScatterGatherOutcome<T>,
    page_index: usize,
    page_size: usize,
    compare: F,
) -> Vec<T>
where
    F: FnMut(&T, &T) -> Ordering,
{
    let mut items = outcome.into_items();
    items.sort_by(compare);
    items
        .into_iter()
        .skip(page_index * page_size)
        .take(page_size)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use shardway_models::ShardId;

    use super::*;
    use crate::outcome::ShardResult;

    fn outcome<T>(per_shard: Vec<(&str, Vec<T>)>) -> ScatterGatherOutcome<T> {
        ScatterGatherOutcome {
            successful_shards: per_shard
                .into_iter()
                .map(|(shard_id, items)| ShardResult {
                    shard_id: ShardId::from(shard_id),
                    items,
                })
                .collect(),
            failed_shards: Vec::new(),
            elapsed: Duration::from_millis(1),
        }
    }

    #[test]
    fn count_sums_shard_counts() {
        let o = outcome(vec![("shard-1", vec![10]), ("shard-2", vec![32])]);
        assert_eq!(count(&o), 42);
    }

    #[test]
    fn sum_min_max() {
        let o = outcome(vec![("shard-1", vec![5, 1]), ("shard-2", vec![9, 3])]);
        assert_eq!(sum(o), 18);
        let o = outcome(vec![("shard-1", vec![5, 1]), ("shard-2", vec![9, 3])]);
        assert_eq!(min(o), Some(1));
        let o = outcome(vec![("shard-1", vec![5, 1]), ("shard-2", vec![9, 3])]);
        assert_eq!(max(o), Some(9));
    }

    #[test]
    fn average_divides_once_globally() {
        // shard-1 averages 2.0 over 1 row, shard-2 averages 3.0 over 100
        // rows; mean-of-averages would report 2.5.
        let o = outcome(vec![
            ("shard-1", vec![PartialAvg::new(2.0, 1)]),
            ("shard-2", vec![PartialAvg::new(300.0, 100)]),
        ]);
        let global = average(&o).unwrap();
        assert_eq!(global, 302.0 / 101.0);
        assert!((global - 2.5).abs() > 0.4);
    }

    #[test]
    fn average_of_nothing_is_none() {
        let o: ScatterGatherOutcome<PartialAvg> = outcome(vec![("shard-1", vec![])]);
        assert_eq!(average(&o), None);
    }

    #[test]
    fn distinct_dedupes_across_shards() {
        let o = outcome(vec![
            ("shard-1", vec!["a", "b", "c"]),
            ("shard-2", vec!["b", "c", "d"]),
        ]);
        assert_eq!(distinct(o), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn top_n_re_sorts_combined_candidates() {
        let o = outcome(vec![
            ("shard-1", vec![90, 40, 10]),
            ("shard-2", vec![80, 70, 5]),
        ]);
        let top = top_n_by(o, 3, |a, b| b.cmp(a));
        assert_eq!(top, vec![90, 80, 70]);
    }

    #[test]
    fn merge_groups_combines_equal_keys() {
        let o = outcome(vec![
            ("shard-1", vec![("eu", 3u64), ("us", 7)]),
            ("shard-2", vec![("us", 5), ("ap", 1)]),
        ]);
        let groups = merge_groups(o, |acc, v| *acc += v);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups["us"], 12);
        assert_eq!(groups["eu"], 3);
        assert_eq!(groups["ap"], 1);
    }

    #[test]
    fn page_merge_takes_window_over_combined_sorted_rows() {
        // two shards each return their first 3 rows under ascending order
        let o = outcome(vec![
            ("shard-1", vec![1, 4, 7]),
            ("shard-2", vec![2, 3, 9]),
        ]);
        assert_eq!(
            merge_page(o, 0, 3, |a, b| a.cmp(b)),
            vec![1, 2, 3]
        );
        let o = outcome(vec![
            ("shard-1", vec![1, 4, 7]),
            ("shard-2", vec![2, 3, 9]),
        ]);
        assert_eq!(
            merge_page(o, 1, 3, |a, b| a.cmp(b)),
            vec![4, 7, 9]
        );
    }
}
