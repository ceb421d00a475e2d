//! Property-based tests for room membership
//!
//! Random join/leave/unregister sequences against the hub, checked against a
//! plain set model.

use chathub::shared::ConnectionId;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

use crate::common::{connect, test_hub};

#[derive(Debug, Clone)]
enum Op {
    Join(usize, i64),
    Leave(usize, i64),
    Unregister(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0usize..4, 1i64..4).prop_map(|(c, r)| Op::Join(c, r)),
        2 => (0usize..4, 1i64..4).prop_map(|(c, r)| Op::Leave(c, r)),
        1 => (0usize..4).prop_map(Op::Unregister),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_membership_matches_model(ops in prop::collection::vec(op(), 1..40)) {
        runtime().block_on(async {
            let t = test_hub().await;
            let mut peers = Vec::new();
            for _ in 0..4 {
                peers.push(connect(&t.hub, 1).await);
            }
            let ids: Vec<ConnectionId> = peers.iter().map(|p| p.id).collect();

            let mut model: BTreeMap<i64, BTreeSet<ConnectionId>> = BTreeMap::new();
            let mut gone: BTreeSet<ConnectionId> = BTreeSet::new();

            for op in &ops {
                match *op {
                    Op::Join(c, room) => {
                        let result = t.hub.join(ids[c], room).await;
                        if gone.contains(&ids[c]) {
                            prop_assert!(result.is_err());
                        } else {
                            let added = model.entry(room).or_default().insert(ids[c]);
                            prop_assert_eq!(result.ok(), Some(added));
                        }
                    }
                    Op::Leave(c, room) => {
                        let result = t.hub.leave(ids[c], room).await;
                        if gone.contains(&ids[c]) {
                            prop_assert!(result.is_err());
                        } else {
                            let removed = model.get_mut(&room).is_some_and(|m| m.remove(&ids[c]));
                            prop_assert_eq!(result.ok(), Some(removed));
                        }
                    }
                    Op::Unregister(c) => {
                        let first = gone.insert(ids[c]);
                        prop_assert_eq!(t.hub.unregister(ids[c]).await, first);
                        for members in model.values_mut() {
                            members.remove(&ids[c]);
                        }
                    }
                }
            }

            for room in 1..4 {
                let mut actual = t.hub.members_of(room).await;
                actual.sort();
                let expected: Vec<ConnectionId> = model
                    .get(&room)
                    .map(|m| m.iter().copied().collect())
                    .unwrap_or_default();
                prop_assert_eq!(actual, expected);
            }
            let occupied = model.values().filter(|m| !m.is_empty()).count();
            prop_assert_eq!(t.hub.stats().await.rooms, occupied);
            Ok(())
        })?;
    }
}
