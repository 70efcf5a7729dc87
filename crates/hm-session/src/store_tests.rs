use super::*;
use crate::test_support::{at_sea, crew, in_harbour, snapshot, t};
use hm_core::ShipType;

#[test]
fn test_start_creates_sessions_for_ships_at_sea() {
    let mut store = SessionStore::new();
    let ids = store
        .start(
            &snapshot(vec![
                at_sea("s1", ShipType::Sloop, vec![crew("A"), crew("B")]),
                in_harbour("s2"),
            ]),
            t(0),
        )
        .unwrap();

    assert_eq!(ids.len(), 1);
    let session = store.get(ids[0]).unwrap();
    assert_eq!(session.ship_id(), "s1");
    assert_eq!(session.active_crew().count(), 2);
    assert_eq!(session.sail_image(), "https://cdn.example/s1.png");
    assert!(store.is_started());
}

#[test]
fn test_start_twice_fails() {
    let mut store = SessionStore::new();
    store.start(&snapshot(vec![]), t(0)).unwrap();
    let err = store.start(&snapshot(vec![]), t(1)).unwrap_err();
    assert!(matches!(err, SessionError::AlreadyStarted));
}

#[test]
fn test_update_before_start_fails() {
    let mut store = SessionStore::new();
    let err = store.update(&snapshot(vec![]), t(0)).unwrap_err();
    assert!(matches!(err, SessionError::NotStarted));
}

#[test]
fn test_missing_ship_list_is_invalid() {
    let mut store = SessionStore::new();
    let err = store
        .start(&GuildShipsResponse::default(), t(0))
        .unwrap_err();
    assert!(matches!(err, SessionError::InvalidRemoteResponse { .. }));
    assert!(!store.is_started());
}

#[test]
fn test_crew_over_capacity_rejects_snapshot() {
    let mut store = SessionStore::new();
    store.start(&snapshot(vec![]), t(0)).unwrap();
    let err = store
        .update(
            &snapshot(vec![at_sea(
                "s1",
                ShipType::Sloop,
                vec![crew("A"), crew("B"), crew("C")],
            )]),
            t(5),
        )
        .unwrap_err();
    match err {
        SessionError::InvalidRemoteResponse { reason } => {
            assert!(reason.contains("capacity is 2"), "{reason}")
        }
        other => panic!("expected InvalidRemoteResponse, got {other:?}"),
    }
    assert!(store.sessions().is_empty());
}

#[test]
fn test_start_then_identical_update_is_unchanged() {
    let mut store = SessionStore::new();
    let roster = snapshot(vec![
        at_sea("s1", ShipType::Sloop, vec![crew("A")]),
        at_sea("s2", ShipType::Galleon, vec![crew("B"), crew("C")]),
    ]);
    let started = store.start(&roster, t(0)).unwrap();
    let diff = store.update(&roster, t(5)).unwrap();

    assert!(diff.additions.is_empty());
    assert!(diff.removals.is_empty());
    assert_eq!(diff.remaining, started);
    assert!(diff.is_unchanged());
}

#[test]
fn test_sloop_voyage_lifecycle() {
    let mut store = SessionStore::new();
    let ids = store
        .start(
            &snapshot(vec![at_sea(
                "S1",
                ShipType::Sloop,
                vec![crew("A"), crew("B")],
            )]),
            t(0),
        )
        .unwrap();
    assert_eq!(ids.len(), 1);
    let id = ids[0];
    assert_eq!(store.get(id).unwrap().active_crew().count(), 2);

    let diff = store
        .update(
            &snapshot(vec![at_sea("S1", ShipType::Sloop, vec![crew("A")])]),
            t(5),
        )
        .unwrap();
    assert_eq!(diff.remaining, vec![id]);
    let session = store.get(id).unwrap();
    assert!(session.crew()[0].is_active());
    assert!(!session.crew()[1].is_active());

    let diff = store.update(&snapshot(vec![in_harbour("S1")]), t(10)).unwrap();
    assert_eq!(diff.removals, vec![id]);
    assert!(diff.remaining.is_empty());
    let session = store.get(id).unwrap();
    assert!(!session.is_active());
    assert_eq!(session.last_seen(), t(5));
}

#[test]
fn test_ship_sailing_again_starts_new_session() {
    let mut store = SessionStore::new();
    let roster = snapshot(vec![at_sea("s1", ShipType::Sloop, vec![crew("A")])]);
    let first = store.start(&roster, t(0)).unwrap()[0];
    store.update(&snapshot(vec![]), t(5)).unwrap();

    let diff = store.update(&roster, t(10)).unwrap();
    assert_eq!(diff.additions.len(), 1);
    assert_ne!(diff.additions[0], first);
    assert_eq!(store.sessions().len(), 2);
    assert_eq!(store.active().count(), 1);
}

#[test]
fn test_remove_only_drops_inactive_sessions() {
    let mut store = SessionStore::new();
    let roster = snapshot(vec![at_sea("s1", ShipType::Sloop, vec![])]);
    let id = store.start(&roster, t(0)).unwrap()[0];

    assert!(store.remove(id).is_none());
    store.update(&snapshot(vec![]), t(5)).unwrap();
    assert!(store.remove(id).is_some());
    assert!(store.get(id).is_none());
}

mod properties {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    const SHIPS: [&str; 4] = ["s0", "s1", "s2", "s3"];

    fn roster(at_sea_mask: &[bool]) -> GuildShipsResponse {
        snapshot(
            SHIPS
                .iter()
                .zip(at_sea_mask)
                .map(|(id, sailing)| {
                    if *sailing {
                        at_sea(id, ShipType::Brigantine, vec![crew("A")])
                    } else {
                        in_harbour(id)
                    }
                })
                .collect(),
        )
    }

    proptest! {
        #[test]
        fn test_consecutive_presence_keeps_one_session(
            polls in prop::collection::vec(prop::collection::vec(any::<bool>(), 4), 1..20)
        ) {
            let mut store = SessionStore::new();
            store.start(&roster(&polls[0]), t(0)).unwrap();

            for (cycle, pair) in polls.windows(2).enumerate() {
                let before: HashMap<String, SessionId> = store
                    .active()
                    .map(|s| (s.ship_id().to_string(), s.id()))
                    .collect();
                let diff = store.update(&roster(&pair[1]), t(cycle as i64 + 1)).unwrap();

                for (index, id) in SHIPS.iter().enumerate() {
                    let active: Vec<&Session> =
                        store.active().filter(|s| s.ship_id() == *id).collect();
                    prop_assert!(active.len() <= 1);
                    if pair[0][index] && pair[1][index] {
                        let continued = before[*id];
                        prop_assert!(diff.remaining.contains(&continued));
                        prop_assert_eq!(active[0].id(), continued);
                    }
                    prop_assert_eq!(active.len() == 1, pair[1][index]);
                }
            }
        }
    }
}
