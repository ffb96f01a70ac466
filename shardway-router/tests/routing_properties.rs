use std::sync::Arc;

use shardway_models::{ShardInfo, ShardTopology};
use shardway_router::{
    calculate_affected_key_ranges, HashRouter, HashRouterConfig,
};

fn topology(ids: &[&str]) -> ShardTopology {
    ShardTopology::new(
        ids.iter()
            .map(|id| ShardInfo::new(*id, format!("db://{id}")))
            .collect(),
    )
    .unwrap()
}

#[test]
fn hash_routing_is_stable_across_rebuilds() {
    // Same topology configuration, fresh router instances: the hash
    // function is stable, not seeded per process.
    let make = || {
        HashRouter::new(Arc::new(topology(&["shard-1", "shard-2", "shard-3"])))
            .unwrap()
    };
    let a = make();
    let b = make();
    for i in 0..1000 {
        let key = format!("customer-{i}");
        assert_eq!(a.resolve(&key).unwrap(), b.resolve(&key).unwrap());
    }
    let customer = a.resolve("customer-42").unwrap();
    assert_eq!(b.resolve("customer-42").unwrap(), customer);
}

#[test]
fn adding_a_shard_moves_about_one_nth_of_keys() {
    let conf = HashRouterConfig::default();
    let old = HashRouter::with_config(
        Arc::new(topology(&["shard-1", "shard-2", "shard-3"])),
        &conf,
    )
    .unwrap();
    let new = HashRouter::with_config(
        Arc::new(topology(&["shard-1", "shard-2", "shard-3", "shard-4"])),
        &conf,
    )
    .unwrap();

    let sample = 20_000;
    let mut moved = 0;
    for i in 0..sample {
        let key = format!("customer-{i}");
        if old.resolve(&key).unwrap() != new.resolve(&key).unwrap() {
            moved += 1;
        }
    }
    let fraction = moved as f64 / sample as f64;
    // expect ~1/4, within +/- 20% relative plus sampling slack
    assert!(
        (0.17..0.33).contains(&fraction),
        "moved fraction {fraction} outside tolerance"
    );
}

#[test]
fn removing_a_shard_only_reassigns_its_keys() {
    let conf = HashRouterConfig::default();
    let old = HashRouter::with_config(
        Arc::new(topology(&["shard-1", "shard-2", "shard-3"])),
        &conf,
    )
    .unwrap();
    let new = HashRouter::with_config(
        Arc::new(topology(&["shard-1", "shard-2"])),
        &conf,
    )
    .unwrap();
    for i in 0..5000 {
        let key = format!("order-{i}");
        let before = old.resolve(&key).unwrap();
        let after = new.resolve(&key).unwrap();
        if before != "shard-3" {
            assert_eq!(before, after, "key {key} moved although its shard stayed");
        } else {
            assert_ne!(after, "shard-3");
        }
    }
}

#[test]
fn rebalance_plan_covers_exactly_the_moved_keys() {
    let conf = HashRouterConfig::default();
    let old = topology(&["shard-1", "shard-2", "shard-3"]);
    let new = topology(&["shard-1", "shard-2", "shard-3", "shard-4"]);
    let plan = calculate_affected_key_ranges(&old, &new, &conf).unwrap();

    let old_router = HashRouter::with_config(Arc::new(old), &conf).unwrap();
    let new_router = HashRouter::with_config(Arc::new(new), &conf).unwrap();
    for i in 0..5000 {
        let key = format!("customer-{i}");
        let moved =
            old_router.resolve(&key).unwrap() != new_router.resolve(&key).unwrap();
        let position = shardway_router::HashRing::key_position(&key);
        let planned = plan.iter().any(|arc| arc.contains_position(position));
        assert_eq!(moved, planned, "key {key}: moved={moved} planned={planned}");
    }
}
