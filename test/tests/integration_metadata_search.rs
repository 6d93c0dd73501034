//! Integration tests for the metadata search driven through a native bridge
//!
//! Events are delivered the way the native layer delivers them: as
//! `MetadataSearch` bridge events tagged with the query id.

use std::{cell::RefCell, rc::Rc};

use serde_json::json;

use orb_client::{
    Comparison, MetadataSearch, MetadataSearchEvent, Programme, SearchConfig, SearchError,
    SearchManager, SearchNotification, SearchState, SearchStatus,
};
use orb_test::{assert_search_untouched, FakeBridge};

const END_TIME: i64 = 1_700_000_000;

struct Setup {
    bridge: Rc<FakeBridge>,
    manager: SearchManager,
    notifications: Rc<RefCell<Vec<SearchNotification>>>,
}

fn setup() -> Setup {
    let bridge = Rc::new(FakeBridge::new());
    let manager = SearchManager::new(
        SearchConfig::default(),
        bridge.clone(),
        bridge.events.clone(),
    );
    let notifications = Rc::new(RefCell::new(Vec::new()));
    let sink = notifications.clone();
    manager.set_on_metadata_search(Some(Rc::new(move |notification: &SearchNotification| {
        sink.borrow_mut().push(notification.clone())
    })));
    Setup {
        bridge,
        manager,
        notifications,
    }
}

fn search(setup: &Setup) -> MetadataSearch {
    setup
        .manager
        .create_search(1)
        .expect("broadcast related")
        .expect("programme search")
}

fn programmes(names: &[&str]) -> Vec<Programme> {
    names
        .iter()
        .map(|name| Programme {
            name: name.to_string(),
            ..Programme::default()
        })
        .collect()
}

#[test]
fn search_runs_from_start_to_found() {
    let setup = setup();
    let search = search(&setup);
    let q1 = search
        .create_query("Programme.endTime", Comparison::GreaterOrEqual, END_TIME)
        .expect("supported field");
    let q1_id = q1.id();
    search.set_query(q1).expect("broadcast related");
    assert_eq!(search.state(), SearchState::Idle);

    setup
        .bridge
        .emit_search_event(&MetadataSearchEvent::new(q1_id, SearchStatus::Started));
    assert_eq!(search.state(), SearchState::Searching);
    let starts = setup.bridge.requests("Broadcast.startSearch");
    assert_eq!(starts.len(), 1);
    assert_eq!(starts[0]["query"]["queryId"], json!(q1_id.as_u64()));
    assert_eq!(starts[0]["query"]["field"], json!("Programme.endTime"));

    setup.bridge.emit_search_event(
        &MetadataSearchEvent::new(q1_id, SearchStatus::Found).with_results(
            programmes(&["p1", "p2"]),
            0,
            2,
        ),
    );
    assert_eq!(search.state(), SearchState::Found);
    let results = search.result().expect("broadcast related");
    assert_eq!(results.len(), 2);
    assert_eq!(results.item(0).map(|p| p.name), Some("p1".to_string()));
    assert_eq!(results.item(2), None);

    let notifications = setup.notifications.borrow();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].status, SearchStatus::Found);
    assert_eq!(notifications[0].query_id, q1_id);
}

#[test]
fn constraint_change_supersedes_and_late_reply_is_discarded() {
    let setup = setup();
    let search = search(&setup);
    let q1 = search
        .create_query("Programme.endTime", Comparison::GreaterOrEqual, END_TIME)
        .expect("supported field");
    let q1_id = q1.id();
    search.set_query(q1).expect("broadcast related");
    setup
        .bridge
        .emit_search_event(&MetadataSearchEvent::new(q1_id, SearchStatus::Started));
    assert_eq!(search.state(), SearchState::Searching);

    search
        .add_channel_constraint(Some("ccid:B"))
        .expect("broadcast related");

    assert_eq!(
        setup.bridge.requests("Broadcast.abortSearch"),
        vec![json!({ "queryId": q1_id.as_u64() })]
    );
    assert_eq!(search.state(), SearchState::Idle);
    let q2_id = search.query().map(|query| query.id()).expect("query installed");
    assert_ne!(q2_id, q1_id);
    assert_eq!(
        setup.notifications.borrow().last().map(|n| n.status),
        Some(SearchStatus::Aborted)
    );

    let notified = setup.notifications.borrow().len();
    setup.bridge.emit_search_event(
        &MetadataSearchEvent::new(q1_id, SearchStatus::Found).with_results(
            programmes(&["late"]),
            3,
            7,
        ),
    );
    assert_search_untouched!(search, SearchState::Idle);
    assert_eq!(setup.notifications.borrow().len(), notified);

    // the new query runs normally, with the constraint applied
    setup
        .bridge
        .emit_search_event(&MetadataSearchEvent::new(q2_id, SearchStatus::Started));
    assert_eq!(search.state(), SearchState::Searching);
    let starts = setup.bridge.requests("Broadcast.startSearch");
    assert_eq!(starts.len(), 2);
    assert_eq!(starts[1]["channelConstraints"], json!(["ccid:B"]));
    assert_eq!(starts[1]["query"]["queryId"], json!(q2_id.as_u64()));
}

#[test]
fn aborted_search_stays_aborted() {
    let setup = setup();
    let search = search(&setup);
    let query = search
        .create_query("Programme.name", Comparison::Contains, "news")
        .expect("supported field");
    let query_id = query.id();
    search.set_query(query).expect("broadcast related");
    let results = search.result().expect("broadcast related");

    results.get_results(0, Some(10)).expect("started");
    results.abort().expect("aborted");
    assert_eq!(search.state(), SearchState::Idle);

    // the native side had already produced a page
    setup.bridge.emit_search_event(
        &MetadataSearchEvent::new(query_id, SearchStatus::Found).with_results(
            programmes(&["p1"]),
            0,
            1,
        ),
    );
    assert_search_untouched!(search, SearchState::Idle);
}

#[test]
fn native_failure_reaches_the_caller() {
    let setup = setup();
    let search = search(&setup);
    let query = search
        .create_query("Programme.startTime", Comparison::Less, END_TIME)
        .expect("supported field");
    search.set_query(query).expect("broadcast related");
    setup.bridge.fail_with(orb_client::BridgeError::Failed {
        method: "Broadcast.startSearch".to_string(),
        reason: "tuner busy".to_string(),
    });

    let results = search.result().expect("broadcast related");
    assert!(matches!(
        results.get_results(0, None),
        Err(SearchError::Bridge(_))
    ));
    assert_eq!(search.state(), SearchState::Idle);
    assert!(!setup.manager.is_broadcast_independent());

    // no retries: exactly one attempt was made
    assert_eq!(setup.bridge.requests("Broadcast.startSearch").len(), 1);

    setup.bridge.recover();
    results.get_results(0, None).expect("started");
    assert_eq!(search.state(), SearchState::Searching);
}

#[test]
fn broadcast_independent_callers_get_security_errors() {
    let setup = setup();
    let search = search(&setup);
    let query = search
        .create_query("Programme.programmeID", Comparison::Equal, "crid://x/1")
        .expect("supported field");
    search.set_query(query.clone()).expect("broadcast related");
    setup.bridge.refuse_as_security_error("Broadcast.startSearch");

    setup
        .bridge
        .emit_search_event(&MetadataSearchEvent::new(query.id(), SearchStatus::Started));
    assert!(setup.manager.is_broadcast_independent());

    assert_eq!(search.set_query(query), Err(SearchError::Security));
    assert!(matches!(search.result(), Err(SearchError::Security)));
    assert_eq!(
        search.add_channel_constraint(None),
        Err(SearchError::Security)
    );
    assert!(matches!(
        setup.manager.create_search(1),
        Err(SearchError::Security)
    ));
    assert!(setup.notifications.borrow().is_empty());
}
