//! Range routing: half-open `[start_key, end_key)` intervals under ordinal
//! string comparison, `None` bounds unbounded. The range set must partition
//! the key space it intends to cover; overlaps are a construction error,
//! gaps surface as `NoMatchingRange` at resolve time.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shardway_models::{ShardId, ShardTopology};
use tracing::debug;

use crate::error::RoutingError;
use crate::ShardResolver;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardRange {
    /// Inclusive lower bound, `None` = unbounded below
    pub start_key: Option<String>,
    /// Exclusive upper bound, `None` = unbounded above
    pub end_key: Option<String>,
    pub shard_id: ShardId,
}

impl ShardRange {
    pub fn new(
        start_key: Option<&str>,
        end_key: Option<&str>,
        shard_id: impl Into<ShardId>,
    ) -> Self {
        Self {
            start_key: start_key.map(str::to_owned),
            end_key: end_key.map(str::to_owned),
            shard_id: shard_id.into(),
        }
    }

    fn contains(&self, key: &str) -> bool {
        let above_start = match &self.start_key {
            None => true,
            Some(start) => key >= start.as_str(),
        };
        let below_end = match &self.end_key {
            None => true,
            Some(end) => key < end.as_str(),
        };
        above_start && below_end
    }
}

#[derive(Debug)]
pub struct RangeRouter {
    /// Sorted by start key, unbounded start first
    ranges: Vec<ShardRange>,
    topology: Arc<ShardTopology>,
}

impl RangeRouter {
    pub fn new(
        topology: Arc<ShardTopology>,
        mut ranges: Vec<ShardRange>,
    ) -> Result<Self, RoutingError> {
        if ranges.is_empty() {
            return Err(RoutingError::InvalidRanges("no ranges configured".into()));
        }
        for range in &ranges {
            if !topology.contains(&range.shard_id) {
                return Err(RoutingError::ShardNotFound(range.shard_id.clone()));
            }
            if let (Some(start), Some(end)) = (&range.start_key, &range.end_key) {
                if start >= end {
                    return Err(RoutingError::InvalidRanges(format!(
                        "range [{start}, {end}) for `{}` is empty",
                        range.shard_id
                    )));
                }
            }
        }
        ranges.sort_by(|a, b| match (&a.start_key, &b.start_key) {
            (None, None) => std::cmp::Ordering::Equal,
            (None, Some(_)) => std::cmp::Ordering::Less,
            (Some(_), None) => std::cmp::Ordering::Greater,
            (Some(x), Some(y)) => x.cmp(y),
        });
        for pair in ranges.windows(2) {
            let (left, right) = (&pair[0], &pair[1]);
            let Some(right_start) = right.start_key.as_ref() else {
                return Err(RoutingError::InvalidRanges(
                    "more than one range is unbounded below".into(),
                ));
            };
            let overlaps = match &left.end_key {
                // An unbounded end anywhere but the last range swallows
                // everything after it.
                None => true,
                Some(end) => end > right_start,
            };
            if overlaps {
                return Err(RoutingError::InvalidRanges(format!(
                    "ranges for `{}` and `{}` overlap",
                    left.shard_id, right.shard_id
                )));
            }
        }
        Ok(Self { ranges, topology })
    }

    pub fn resolve(&self, shard_key: &str) -> Result<ShardId, RoutingError> {
        if shard_key.is_empty() {
            return Err(RoutingError::EmptyShardKey);
        }
        // Rightmost range whose start is at or below the key.
        let idx = self.ranges.partition_point(|r| match &r.start_key {
            None => true,
            Some(start) => start.as_str() <= shard_key,
        });
        if idx > 0 {
            let candidate = &self.ranges[idx - 1];
            if candidate.contains(shard_key) {
                debug!(router = "range", key = shard_key, shard = %candidate.shard_id, "resolved");
                return Ok(candidate.shard_id.clone());
            }
        }
        Err(RoutingError::NoMatchingRange(shard_key.to_owned()))
    }

    pub fn ranges(&self) -> &[ShardRange] {
        &self.ranges
    }

    pub fn topology(&self) -> &Arc<ShardTopology> {
        &self.topology
    }
}

#[async_trait::async_trait]
impl ShardResolver for RangeRouter {
    async fn resolve(&self, shard_key: &str) -> Result<ShardId, RoutingError> {
        RangeRouter::resolve(self, shard_key)
    }
}

#[cfg(test)]
mod tests {
    use shardway_models::ShardInfo;

    use super::*;

    fn topology(ids: &[&str]) -> Arc<ShardTopology> {
        Arc::new(
            ShardTopology::new(
                ids.iter()
                    .map(|id| ShardInfo::new(*id, format!("db://{id}")))
                    .collect(),
            )
            .unwrap(),
        )
    }

    fn history_ranges() -> Vec<ShardRange> {
        vec![
            ShardRange::new(Some("2024-01"), Some("2024-07"), "shard-h1"),
            ShardRange::new(Some("2024-07"), Some("2025-01"), "shard-h2"),
            ShardRange::new(Some("2025-01"), None, "shard-current"),
        ]
    }

    #[test]
    fn routes_to_containing_range() {
        let router = RangeRouter::new(
            topology(&["shard-h1", "shard-h2", "shard-current"]),
            history_ranges(),
        )
        .unwrap();
        assert_eq!(router.resolve("2024-09").unwrap(), "shard-h2");
        assert_eq!(router.resolve("2025-06").unwrap(), "shard-current");
        assert_eq!(router.resolve("2024-01").unwrap(), "shard-h1");
        // end bound is exclusive
        assert_eq!(router.resolve("2024-07").unwrap(), "shard-h2");
    }

    #[test]
    fn key_below_all_ranges_is_a_gap() {
        let router = RangeRouter::new(
            topology(&["shard-h1", "shard-h2", "shard-current"]),
            history_ranges(),
        )
        .unwrap();
        let err = router.resolve("2023-12").unwrap_err();
        assert_eq!(err.code(), "range_not_matched");
    }

    #[test]
    fn unbounded_below_catches_everything_before() {
        let router = RangeRouter::new(
            topology(&["cold", "hot"]),
            vec![
                ShardRange::new(None, Some("m"), "cold"),
                ShardRange::new(Some("m"), None, "hot"),
            ],
        )
        .unwrap();
        assert_eq!(router.resolve("aardvark").unwrap(), "cold");
        assert_eq!(router.resolve("zebra").unwrap(), "hot");
        assert_eq!(router.resolve("m").unwrap(), "hot");
    }

    #[test]
    fn overlapping_ranges_rejected() {
        let err = RangeRouter::new(
            topology(&["a", "b"]),
            vec![
                ShardRange::new(Some("0"), Some("5"), "a"),
                ShardRange::new(Some("3"), Some("9"), "b"),
            ],
        )
        .unwrap_err();
        assert_eq!(err.code(), "range_config_invalid");
    }

    #[test]
    fn interior_unbounded_end_rejected() {
        let err = RangeRouter::new(
            topology(&["a", "b"]),
            vec![
                ShardRange::new(Some("0"), None, "a"),
                ShardRange::new(Some("5"), Some("9"), "b"),
            ],
        )
        .unwrap_err();
        assert_eq!(err.code(), "range_config_invalid");
    }

    #[test]
    fn duplicate_unbounded_start_rejected() {
        let err = RangeRouter::new(
            topology(&["a", "b"]),
            vec![
                ShardRange::new(None, Some("5"), "a"),
                ShardRange::new(None, Some("9"), "b"),
            ],
        )
        .unwrap_err();
        assert_eq!(err.code(), "range_config_invalid");
    }

    #[test]
    fn unknown_shard_rejected() {
        let err = RangeRouter::new(
            topology(&["a"]),
            vec![ShardRange::new(Some("0"), Some("5"), "ghost")],
        )
        .unwrap_err();
        assert_eq!(err.code(), "shard_not_found");
    }

    #[test]
    fn empty_range_rejected() {
        let err = RangeRouter::new(
            topology(&["a"]),
            vec![ShardRange::new(Some("5"), Some("5"), "a")],
        )
        .unwrap_err();
        assert_eq!(err.code(), "range_config_invalid");
    }

    #[test]
    fn full_partition_has_no_gaps_or_double_matches() {
        let router = RangeRouter::new(
            topology(&["a", "b", "c"]),
            vec![
                ShardRange::new(None, Some("g"), "a"),
                ShardRange::new(Some("g"), Some("p"), "b"),
                ShardRange::new(Some("p"), None, "c"),
            ],
        )
        .unwrap();
        for i in 0..500 {
            let key = format!("key-{i:03}");
            let resolved = router.resolve(&key).unwrap();
            let matching: Vec<_> = router
                .ranges()
                .iter()
                .filter(|r| {
                    let above = r.start_key.as_deref().map_or(true, |s| key.as_str() >= s);
                    let below = r.end_key.as_deref().map_or(true, |e| key.as_str() < e);
                    above && below
                })
                .collect();
            assert_eq!(matching.len(), 1, "key {key}");
            assert_eq!(matching[0].shard_id, resolved);
        }
    }
}
