mod common;

use std::{
    sync::{Arc, Barrier},
    thread,
};

use inventory_lens::{
    config::{ColumnLayout, EngineConfig},
    engine::InventoryEngine,
    session::{Session, SessionId, SessionPhase, SessionStore},
};

use common::{inventory, item};

#[test]
fn get_analysis_twice_returns_the_same_instance() {
    let session = Session::new(SessionId::from("idem"));
    let layout = ColumnLayout::default();
    session.ingest(inventory(&[item(1, 3, 9.0)]), "a").unwrap();

    let first = session.get_or_build(&layout).unwrap().unwrap();
    let second = session.get_or_build(&layout).unwrap().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(session.builds(), 1);
}

#[test]
fn ingest_invalidates_the_cached_analysis() {
    let session = Session::new(SessionId::from("swap"));
    let layout = ColumnLayout::default();
    session.ingest(inventory(&[item(1, 3, 9.0)]), "first").unwrap();
    let before = session.get_or_build(&layout).unwrap().unwrap();

    session
        .ingest(inventory(&[item(2, 40, 1.0), item(3, 0, 2.0)]), "second")
        .unwrap();
    assert_eq!(session.phase().unwrap(), SessionPhase::Loaded);
    let after = session.get_or_build(&layout).unwrap().unwrap();

    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(after.len(), 2);
    assert_eq!(after.rows()[0].id, 2);
    assert_eq!(session.metadata().unwrap().source_name, "second");
    assert_eq!(session.builds(), 2);
}

#[test]
fn concurrent_first_requests_build_once() {
    let session = Arc::new(Session::new(SessionId::from("race")));
    let items = (0..500).map(|i| item(i, i % 120, i as f64)).collect::<Vec<_>>();
    session.ingest(inventory(&items), "bulk").unwrap();

    let workers = 8;
    let barrier = Arc::new(Barrier::new(workers));
    let handles = (0..workers)
        .map(|_| {
            let session = Arc::clone(&session);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                session
                    .get_or_build(&ColumnLayout::default())
                    .unwrap()
                    .unwrap()
            })
        })
        .collect::<Vec<_>>();

    let tables = handles
        .into_iter()
        .map(|h| h.join().expect("worker panicked"))
        .collect::<Vec<_>>();
    assert_eq!(session.builds(), 1);
    for table in &tables[1..] {
        assert!(Arc::ptr_eq(&tables[0], table));
    }
}

#[test]
fn concurrent_lookups_share_one_session() {
    let store = Arc::new(SessionStore::new());
    let barrier = Arc::new(Barrier::new(6));
    let handles = (0..6)
        .map(|_| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                store.session(&SessionId::from("shared")).unwrap()
            })
        })
        .collect::<Vec<_>>();

    let sessions = handles
        .into_iter()
        .map(|h| h.join().expect("worker panicked"))
        .collect::<Vec<_>>();
    assert_eq!(store.len(), 1);
    for session in &sessions[1..] {
        assert!(Arc::ptr_eq(&sessions[0], session));
    }
}

#[test]
fn reads_after_ingest_never_see_the_previous_table() {
    let engine = InventoryEngine::standalone(EngineConfig::default());
    let id = SessionId::from("writer");
    engine.ingest(&id, inventory(&[item(1, 1, 1.0)]), "v1").unwrap();
    engine.get_analysis(&id).unwrap();

    let engine = Arc::new(engine);
    let readers = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let id = id.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    let table = engine.get_analysis(&id).unwrap().unwrap();
                    assert!(table.len() == 1 || table.len() == 3);
                }
            })
        })
        .collect::<Vec<_>>();

    engine
        .ingest(
            &id,
            inventory(&[item(2, 1, 1.0), item(3, 1, 1.0), item(4, 1, 1.0)]),
            "v2",
        )
        .unwrap();
    for reader in readers {
        reader.join().expect("reader panicked");
    }
    assert_eq!(engine.get_analysis(&id).unwrap().unwrap().len(), 3);
    assert_eq!(engine.kpis(&id).unwrap().total_skus, 3);
}

#[test]
fn independent_stores_do_not_share_sessions() {
    let left = InventoryEngine::standalone(EngineConfig::default());
    let right = InventoryEngine::standalone(EngineConfig::default());
    let id = SessionId::from("same-token");
    left.ingest(&id, inventory(&[item(1, 1, 1.0)]), "left").unwrap();

    assert!(left.health(&id).unwrap().data_loaded);
    assert!(!right.health(&id).unwrap().data_loaded);
    assert!(right.kpis(&id).unwrap_err().is_no_data());
}
