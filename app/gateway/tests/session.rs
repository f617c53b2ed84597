//! Session routing tests.

use easel_gateway::{
    IdGenerator, SessionError, SessionInit, SessionRouter, UuidGenerator,
    gateway::serve::spawn_sweeper,
};
use parking_lot::Mutex;
use std::{collections::HashSet, collections::VecDeque, sync::Arc, time::Duration};

struct Marker {
    init: SessionInit<Marker>,
    tag: usize,
}

fn marker(tag: usize) -> impl FnOnce(SessionInit<Marker>) -> Marker {
    move |init| Marker { init, tag }
}

/// Hands out a fixed sequence of ids, repeating the last one.
struct ScriptedIds(Mutex<VecDeque<String>>);

impl ScriptedIds {
    fn new(ids: &[&str]) -> Arc<Self> {
        Arc::new(Self(Mutex::new(ids.iter().map(|s| s.to_string()).collect())))
    }
}

impl IdGenerator for ScriptedIds {
    fn generate(&self) -> String {
        let mut ids = self.0.lock();
        if ids.len() > 1 {
            ids.pop_front().unwrap()
        } else {
            ids.front().cloned().unwrap()
        }
    }
}

fn router(idle: Option<Duration>) -> SessionRouter<Marker> {
    SessionRouter::new(Arc::new(UuidGenerator), idle)
}

#[test]
fn new_session_registers_on_finalize() {
    let router = router(None);
    let routed = router.route_for(None, marker(1));
    assert!(routed.created);
    assert!(router.is_empty());
    assert_eq!(routed.handler.init.id(), None);

    let id = routed.handler.init.finalize().unwrap();
    assert_eq!(router.len(), 1);
    assert!(router.contains(&id));
    assert_eq!(routed.handler.init.id(), Some(id.clone()));

    // Finalizing again is a no-op.
    assert_eq!(routed.handler.init.finalize().unwrap(), id);
    assert_eq!(router.len(), 1);
}

#[test]
fn uuid_ids_are_v4() {
    let id = UuidGenerator.generate();
    let parsed = uuid::Uuid::parse_str(&id).unwrap();
    assert_eq!(parsed.get_version_num(), 4);
    assert_ne!(UuidGenerator.generate(), id);
}

#[test]
fn known_id_returns_registered_handler() {
    let router = router(None);
    let first = router.route_for(None, marker(1)).handler;
    let id = first.init.finalize().unwrap();

    let again = router.route_for(Some(id.as_str()), |_| unreachable!("session exists"));
    assert!(!again.created);
    assert!(Arc::ptr_eq(&first, &again.handler));
    assert_eq!(again.handler.tag, 1);
    assert_eq!(router.len(), 1);
}

#[test]
fn unknown_id_starts_new_session() {
    let router = router(None);
    let routed = router.route_for(Some("stale"), marker(7));
    assert!(routed.created);

    let id = routed.handler.init.finalize().unwrap();
    assert_ne!(id, "stale");
    assert!(!router.contains("stale"));
    assert!(router.contains(&id));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_contacts_get_distinct_sessions() {
    let router = Arc::new(router(None));
    let tasks = (0..32).map(|tag| {
        let router = Arc::clone(&router);
        tokio::spawn(async move {
            let handler = router.route_for(None, marker(tag)).handler;
            let id = handler.init.finalize().unwrap();
            (tag, id)
        })
    });

    let mut ids = HashSet::new();
    for task in tasks.collect::<Vec<_>>() {
        let (tag, id) = task.await.unwrap();
        assert_eq!(router.get(&id).unwrap().tag, tag);
        ids.insert(id);
    }
    assert_eq!(ids.len(), 32);
    assert_eq!(router.len(), 32);
}

#[test]
fn colliding_id_is_regenerated_not_overwritten() {
    let router = SessionRouter::new(ScriptedIds::new(&["dup", "dup", "fresh"]), None);
    let first = router.route_for(None, marker(1)).handler;
    assert_eq!(first.init.finalize().unwrap(), "dup");

    let second = router.route_for(None, marker(2)).handler;
    assert_eq!(second.init.finalize().unwrap(), "fresh");

    assert!(Arc::ptr_eq(&router.get("dup").unwrap(), &first));
    assert!(Arc::ptr_eq(&router.get("fresh").unwrap(), &second));
    assert_eq!(router.len(), 2);
}

#[test]
fn exhausted_id_space_is_an_error() {
    let router = SessionRouter::new(ScriptedIds::new(&["same"]), None);
    let first = router.route_for(None, marker(1)).handler;
    first.init.finalize().unwrap();

    let second = router.route_for(None, marker(2)).handler;
    assert!(matches!(
        second.init.finalize(),
        Err(SessionError::Exhausted(_))
    ));
    assert_eq!(second.init.id(), None);
    assert_eq!(router.get("same").unwrap().tag, 1);
}

#[test]
fn finalize_after_router_dropped_fails() {
    let router = router(None);
    let handler = router.route_for(None, marker(1)).handler;
    drop(router);
    assert_eq!(handler.init.finalize(), Err(SessionError::Closed));
}

#[test]
fn clear_drops_every_session() {
    let router = router(None);
    for tag in 0..3 {
        router.route_for(None, marker(tag)).handler.init.finalize().unwrap();
    }
    assert_eq!(router.len(), 3);

    router.clear();
    assert!(router.is_empty());
}

#[test]
fn remove_unregisters_and_returns_the_handler() {
    let router = router(None);
    let routed = router.route_for(None, marker(7));
    let id = routed.handler.init.finalize().unwrap();

    let removed = router.remove(&id).unwrap();
    assert!(Arc::ptr_eq(&removed, &routed.handler));
    assert_eq!(removed.tag, 7);
    assert!(!router.contains(&id));
    assert!(router.remove(&id).is_none());
}

#[tokio::test(start_paused = true)]
async fn sessions_never_expire_without_timeout() {
    let router = router(None);
    let id = router.route_for(None, marker(1)).handler.init.finalize().unwrap();

    tokio::time::advance(Duration::from_secs(10 * 3600)).await;
    assert_eq!(router.evict_idle(), 0);
    assert!(router.contains(&id));
}

#[tokio::test(start_paused = true)]
async fn idle_sessions_are_evicted() {
    let router = router(Some(Duration::from_secs(60)));
    let active = router.route_for(None, marker(1)).handler.init.finalize().unwrap();
    let idle = router.route_for(None, marker(2)).handler.init.finalize().unwrap();

    tokio::time::advance(Duration::from_secs(30)).await;
    assert!(router.get(&active).is_some());
    tokio::time::advance(Duration::from_secs(40)).await;

    assert_eq!(router.evict_idle(), 1);
    assert!(router.contains(&active));
    assert!(!router.contains(&idle));

    // An evicted id starts over.
    let routed = router.route_for(Some(idle.as_str()), marker(3));
    assert!(routed.created);
}

#[tokio::test(start_paused = true)]
async fn sweeper_evicts_in_background() {
    let router = Arc::new(router(Some(Duration::from_secs(30))));
    router.route_for(None, marker(1)).handler.init.finalize().unwrap();

    let sweeper = spawn_sweeper(Arc::downgrade(&router), Duration::from_secs(10));
    tokio::time::sleep(Duration::from_secs(45)).await;
    assert!(router.is_empty());

    drop(router);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(sweeper.is_finished());
}
