//! Property-based tests for RoomManager
//!
//! Random operation sequences are applied to the manager and to a plain
//! `BTreeMap` model; the two must agree after every step.

use std::collections::{BTreeMap, BTreeSet};

use easel_core::{RoomName, test_env::ManualEnv};
use easel_server::{LeaveError, LeaveOutcome, RoomError, RoomManager};
use proptest::prelude::*;

const NAMES: [&str; 3] = ["lobby", "lounge", "Lobby"];

#[derive(Debug, Clone)]
enum Op {
    Create { name: usize, session: u64 },
    Join { name: usize, session: u64 },
    Leave { name: usize, session: u64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let name = 0..NAMES.len();
    let session = 0u64..5;
    prop_oneof![
        (name.clone(), session.clone()).prop_map(|(name, session)| Op::Create { name, session }),
        (name.clone(), session.clone()).prop_map(|(name, session)| Op::Join { name, session }),
        (name, session).prop_map(|(name, session)| Op::Leave { name, session }),
    ]
}

fn room(index: usize) -> RoomName {
    RoomName::new(NAMES[index]).expect("valid room name")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: the manager behaves like a map of non-empty member sets
    #[test]
    fn prop_manager_matches_model(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let env = ManualEnv::default();
        let manager = RoomManager::new();
        let mut model: BTreeMap<usize, BTreeSet<u64>> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Create { name, session } => {
                    let result = manager.create_room(&room(name), session, &env);
                    if model.contains_key(&name) {
                        prop_assert_eq!(result, Err(RoomError::RoomNameTaken(room(name))));
                    } else {
                        prop_assert_eq!(result, Ok(()));
                        model.insert(name, BTreeSet::from([session]));
                    }
                },
                Op::Join { name, session } => {
                    let result = manager.join_room(&room(name), session);
                    match model.get_mut(&name) {
                        Some(members) => {
                            members.insert(session);
                            prop_assert_eq!(result, Ok(members.len()));
                        },
                        None => {
                            prop_assert_eq!(result, Err(RoomError::RoomNotFound(room(name))));
                        },
                    }
                },
                Op::Leave { name, session } => {
                    let result = manager.leave_room(&room(name), session);
                    let Some(members) = model.get_mut(&name) else {
                        prop_assert_eq!(result, Err(LeaveError::RoomNotFound(room(name))));
                        continue;
                    };

                    if members.remove(&session) {
                        let remaining = members.len();
                        if remaining == 0 {
                            model.remove(&name);
                        }
                        prop_assert_eq!(
                            result,
                            Ok(LeaveOutcome { remaining, destroyed: remaining == 0 })
                        );
                    } else {
                        let rejected = matches!(
                            result,
                            Err(LeaveError::NotAMember { session_id, .. }) if session_id == session
                        );
                        prop_assert!(rejected, "leaving a room one is not in is rejected");
                    }
                },
            }

            prop_assert_eq!(manager.room_count(), model.len());
            prop_assert_eq!(manager.slot_count(), model.len());
            for (index, members) in &model {
                let expected: Vec<u64> = members.iter().copied().collect();
                prop_assert_eq!(manager.members(&room(*index)), expected);
            }
        }
    }

    /// Property: listed rooms are exactly the active ones, sorted, never empty
    #[test]
    fn prop_list_rooms_sorted_and_non_empty(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let env = ManualEnv::default();
        let manager = RoomManager::new();

        for op in ops {
            match op {
                Op::Create { name, session } => {
                    let _ = manager.create_room(&room(name), session, &env);
                },
                Op::Join { name, session } => {
                    let _ = manager.join_room(&room(name), session);
                },
                Op::Leave { name, session } => {
                    let _ = manager.leave_room(&room(name), session);
                },
            }

            let listed = manager.list_rooms();
            prop_assert!(listed.windows(2).all(|pair| pair[0].0 < pair[1].0));
            prop_assert!(listed.iter().all(|(_, count)| *count > 0));
            prop_assert_eq!(listed.len(), manager.room_count());
        }
    }
}
