//! Property-based checks of the proxy and the search state machine

use std::rc::Rc;

use proptest::prelude::*;
use serde_json::json;

use orb_client::{
    next_state, Comparison, MediaElement, MetadataSearch, MetadataSearchEvent, Programme,
    QueryId, SearchConfig, SearchError, SearchManager, SearchState, SearchStatus,
    MEDIA_ELEMENT_KEY,
};
use orb_shared::{ObserverKey, PropertyMap, Value};
use orb_test::{assert_quiet, FakeBridge, PairedContexts, RecordingObserver};

fn arg() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-z]{0,8}".prop_map(Value::from),
    ]
}

fn status() -> impl Strategy<Value = SearchStatus> {
    prop_oneof![
        Just(SearchStatus::Started),
        Just(SearchStatus::Found),
        Just(SearchStatus::Aborted),
        Just(SearchStatus::NoResources),
        (5..100i32).prop_map(SearchStatus::Other),
    ]
}

fn state() -> impl Strategy<Value = SearchState> {
    prop_oneof![
        Just(SearchState::Idle),
        Just(SearchState::Searching),
        Just(SearchState::Found),
    ]
}

struct SearchHarness {
    bridge: Rc<FakeBridge>,
    _manager: SearchManager,
    search: MetadataSearch,
    query_id: QueryId,
}

/// A search driven into `target` by native events
fn search_in(target: SearchState) -> SearchHarness {
    let bridge = Rc::new(FakeBridge::new());
    let manager = SearchManager::new(
        SearchConfig::default(),
        bridge.clone(),
        bridge.events.clone(),
    );
    let search = manager
        .create_search(1)
        .expect("broadcast related")
        .expect("programme search");
    let query = search
        .create_query("Programme.name", Comparison::Contains, "news")
        .expect("supported field");
    let query_id = query.id();
    search.set_query(query).expect("broadcast related");

    if target != SearchState::Idle {
        bridge.emit_search_event(&MetadataSearchEvent::new(query_id, SearchStatus::Started));
    }
    if target == SearchState::Found {
        let programmes = vec![Programme {
            name: "Evening news".to_string(),
            ..Programme::default()
        }];
        bridge.emit_search_event(
            &MetadataSearchEvent::new(query_id, SearchStatus::Found)
                .with_results(programmes, 4, 9),
        );
    }
    assert_eq!(search.state(), target);

    SearchHarness {
        bridge,
        _manager: manager,
        search,
        query_id,
    }
}

fn snapshot(search: &MetadataSearch) -> (SearchState, Vec<Programme>, u32, u32) {
    let results = search.result().expect("broadcast related");
    (
        search.state(),
        results.items(),
        results.offset(),
        results.total_size(),
    )
}

proptest! {
    #[test]
    fn unregistered_key_is_a_no_op(
        key in "[A-Za-z_]{1,12}",
        method in "[a-z]{1,10}",
        args in proptest::collection::vec(arg(), 0..4),
    ) {
        prop_assume!(key != "Known");
        let contexts = PairedContexts::connected();
        let known = Rc::new(RecordingObserver::new());
        contexts.frame.register_observer(ObserverKey::new("Known"), &known);

        let key = ObserverKey::new(key);
        contexts.main.call_observer_method(&key, &method, args.clone());
        let mut properties = PropertyMap::new();
        properties.insert(method.clone(), json!(1));
        contexts.main.update_observer_properties(&key, properties);
        contexts.pump();

        prop_assert!(known.calls.borrow().is_empty());
        prop_assert!(known.properties.borrow().is_empty());
        assert_quiet!(contexts);

        // still usable afterwards
        contexts.main.call_observer_method(&ObserverKey::new("Known"), &method, args.clone());
        contexts.pump();
        prop_assert_eq!(known.calls_named(&method), vec![args]);
    }

    #[test]
    fn replayed_updates_settle_like_one(
        ready_state in 0..5u64,
        paused in any::<bool>(),
        duration in (1..7200u32).prop_map(f64::from),
    ) {
        let contexts = PairedContexts::connected();
        let media = MediaElement::new(&contexts.main);
        let key = ObserverKey::new(MEDIA_ELEMENT_KEY);
        let real_media = Rc::new(RecordingObserver::new());
        contexts.frame.register_observer(key.clone(), &real_media);

        let mut update = PropertyMap::new();
        update.insert("readyState".to_string(), json!(ready_state));
        update.insert("paused".to_string(), json!(paused));
        update.insert("duration".to_string(), json!(duration));
        contexts.frame.update_observer_properties(&key, update);

        let raw = contexts.main_inbox().pop().expect("update in flight");
        contexts.main_inbox().push_raw(raw.clone());
        contexts.main_inbox().push_raw(raw);
        contexts.pump();

        prop_assert_eq!(media.ready_state(), ready_state);
        prop_assert_eq!(media.paused(), paused);
        prop_assert_eq!(media.duration(), duration);
        // applied updates are never echoed back
        prop_assert_eq!(real_media.property_updates.get(), 0);
        assert_quiet!(contexts);
    }

    #[test]
    fn local_writes_arrive_once_per_change(volumes in proptest::collection::vec(0..=4u8, 1..8)) {
        let contexts = PairedContexts::connected();
        let media = MediaElement::new(&contexts.main);
        let real_media = Rc::new(RecordingObserver::new());
        contexts
            .frame
            .register_observer(ObserverKey::new(MEDIA_ELEMENT_KEY), &real_media);

        let mut changes = 0;
        let mut last = None;
        for volume in &volumes {
            let volume = f64::from(*volume) / 4.0;
            if media.set_volume(volume).expect("writable") {
                changes += 1;
            }
            last = Some(volume);
        }
        contexts.pump();

        prop_assert_eq!(real_media.property_updates.get(), changes);
        if changes > 0 {
            prop_assert_eq!(
                real_media.properties.borrow().get("volume").and_then(Value::as_f64),
                last
            );
        }
    }

    #[test]
    fn unhandled_transitions_leave_search_untouched(from in state(), status in status()) {
        prop_assume!(next_state(from, status).is_none());
        let harness = search_in(from);
        let before = snapshot(&harness.search);
        let requests = harness.bridge.request_count();

        let result = harness
            .search
            .handle_event(&MetadataSearchEvent::new(harness.query_id, status));

        prop_assert_eq!(
            result,
            Err(SearchError::UnhandledTransition { state: from, status })
        );
        prop_assert_eq!(snapshot(&harness.search), before);
        prop_assert_eq!(harness.bridge.request_count(), requests);
    }

    #[test]
    fn stale_query_ids_are_ignored(from in state(), status in status(), raw_id in any::<u64>()) {
        let harness = search_in(from);
        prop_assume!(raw_id != harness.query_id.as_u64());
        let before = snapshot(&harness.search);
        let requests = harness.bridge.request_count();
        let stale = QueryId::from(raw_id);

        let result = harness.search.handle_event(
            &MetadataSearchEvent::new(stale, status)
                .with_results(Vec::new(), 1, 1),
        );

        prop_assert_eq!(result, Err(SearchError::StaleCorrelation { id: stale }));
        prop_assert_eq!(snapshot(&harness.search), before);
        prop_assert_eq!(harness.bridge.request_count(), requests);
    }
}
