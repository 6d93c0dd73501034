//! Integration tests for mirrored objects across two paired contexts
//!
//! `main` holds the application-facing mirrors, `frame` holds recording
//! observers standing in for the real objects.

use std::{
    rc::Rc,
    time::{Duration, Instant},
};

use serde_json::json;

use orb_client::{MediaElement, RemoteMirror, TextTrack, TextTrackCue, MEDIA_ELEMENT_KEY};
use orb_shared::{ObserverKey, PropertyMap, ProxyError, ProxyEvent};
use orb_test::{assert_quiet, PairedContexts, RecordingObserver};

fn init_logger() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init()
        .ok();
}

#[test]
fn add_cue_forwards_once_and_applies_locally() {
    init_logger();
    let contexts = PairedContexts::connected();
    let key = ObserverKey::new("Track_0");
    let real_track = Rc::new(RecordingObserver::new());
    contexts.frame.register_observer(key.clone(), &real_track);
    let track = TextTrack::new(&contexts.main, key, "0", "subtitles", "English", "en");

    let cue = TextTrackCue::new("c1", 1.0, 2.5).with_text("hello");
    track.add_cue(&cue).expect("valid cue");

    // visible before anything was delivered
    assert_eq!(track.cues().len(), 1);
    assert_eq!(track.cues()[0], cue);

    contexts.pump();
    let forwarded = real_track.calls_named("addCue");
    assert_eq!(forwarded.len(), 1);
    assert_eq!(
        forwarded[0],
        vec![serde_json::to_value(&cue).expect("serializable cue")]
    );
    assert_eq!(track.cues().len(), 1);
    assert_quiet!(contexts);
}

#[test]
fn listener_methods_never_cross() {
    let contexts = PairedContexts::connected();
    let key = ObserverKey::new("Track_0");
    let real_track = Rc::new(RecordingObserver::new());
    contexts.frame.register_observer(key.clone(), &real_track);
    let track = TextTrack::new(&contexts.main, key, "0", "subtitles", "English", "en");

    let id = track.add_event_listener("cuechange", Rc::new(|_: &ProxyEvent| {}));
    track.dispatch_event(&ProxyEvent::new("cuechange"));
    assert!(track.remove_event_listener(id));

    assert_eq!(contexts.pump(), 0);
    assert!(real_track.calls.borrow().is_empty());
}

#[test]
fn cue_from_paired_context_is_not_echoed() {
    let contexts = PairedContexts::connected();
    let key = ObserverKey::new("TextTrack_3");
    let real_track = Rc::new(RecordingObserver::new());
    contexts.frame.register_observer(key.clone(), &real_track);
    let track = TextTrack::indexed(&contexts.main, 3, "metadata", "", "");
    assert_eq!(track.key(), &key);

    let cue = TextTrackCue::new("in-band", 0.0, 10.0);
    contexts.frame.call_observer_method(
        &key,
        "addCue",
        vec![serde_json::to_value(&cue).expect("serializable cue")],
    );
    contexts.pump();

    assert_eq!(track.cues().len(), 1);
    assert!(real_track.calls.borrow().is_empty());
    assert_quiet!(contexts);
}

#[test]
fn forwards_to_unregistered_key_are_dropped() {
    let contexts = PairedContexts::connected();
    let registered = Rc::new(RecordingObserver::new());
    contexts
        .frame
        .register_observer(ObserverKey::new("HTMLMediaElement"), &registered);

    let missing = ObserverKey::new("TextTrack_9");
    contexts
        .main
        .call_observer_method(&missing, "addCue", vec![json!({})]);
    let mut update = PropertyMap::new();
    update.insert("mode".to_string(), json!("showing"));
    contexts.main.update_observer_properties(&missing, update);
    contexts
        .main
        .dispatch_event(&missing, ProxyEvent::new("cuechange"));
    contexts.pump();

    assert!(registered.calls.borrow().is_empty());
    assert!(registered.properties.borrow().is_empty());
    assert!(registered.events.borrow().is_empty());
}

#[test]
fn media_writes_are_diffed() {
    let contexts = PairedContexts::connected();
    let real_media = Rc::new(RecordingObserver::new());
    contexts
        .frame
        .register_observer(ObserverKey::new(MEDIA_ELEMENT_KEY), &real_media);
    let media = MediaElement::new(&contexts.main);

    media.set_volume(0.25).expect("writable");
    media.set_volume(0.25).expect("writable");
    media.set_muted(true).expect("writable");
    contexts.pump();

    assert_eq!(real_media.property_updates.get(), 2);
    assert_eq!(real_media.properties.borrow().get("volume"), Some(&json!(0.25)));
    assert_eq!(real_media.properties.borrow().get("muted"), Some(&json!(true)));
}

#[test]
fn media_state_follows_paired_context() {
    let contexts = PairedContexts::connected();
    let real_media = Rc::new(RecordingObserver::new());
    let key = ObserverKey::new(MEDIA_ELEMENT_KEY);
    contexts.frame.register_observer(key.clone(), &real_media);
    let media = MediaElement::new(&contexts.main);

    let mut update = PropertyMap::new();
    update.insert("paused".to_string(), json!(false));
    update.insert("readyState".to_string(), json!(4));
    update.insert("duration".to_string(), json!(60.0));
    update.insert("currentTime".to_string(), json!(5.0));
    contexts.frame.update_observer_properties(&key, update.clone());
    contexts.frame.update_observer_properties(&key, update);
    contexts.frame.dispatch_event(
        &key,
        ProxyEvent::new("__orb_startDateUpdated__").with_property("startDate", json!(1_700_000_000_000.0)),
    );
    contexts.pump();

    assert!(!media.paused());
    assert_eq!(media.ready_state(), 4);
    assert_eq!(media.duration(), 60.0);
    assert!(media.current_time() >= 5.0);
    assert_eq!(media.start_date(), Some(1_700_000_000_000.0));
    // nothing travelled back
    assert_eq!(real_media.property_updates.get(), 0);
    assert_quiet!(contexts);
}

#[test]
fn pause_and_load_are_fire_and_forget() {
    let contexts = PairedContexts::connected();
    let real_media = Rc::new(RecordingObserver::new());
    contexts
        .frame
        .register_observer(ObserverKey::new(MEDIA_ELEMENT_KEY), &real_media);
    let media = MediaElement::new(&contexts.main);

    media.load().expect("known method");
    media.pause().expect("known method");
    media.remove_attribute("loop").expect("known method");
    contexts.pump();

    assert_eq!(real_media.call_names(), vec!["load", "pause", "removeAttribute"]);
    assert_eq!(real_media.calls_named("removeAttribute")[0], vec![json!("loop")]);
    assert_eq!(contexts.main.pending_call_count(), 0);
}

#[tokio::test]
async fn concurrent_async_calls_settle_independently() {
    let contexts = PairedContexts::connected();
    let real_media = Rc::new(RecordingObserver::new());
    contexts
        .frame
        .register_observer(ObserverKey::new(MEDIA_ELEMENT_KEY), &real_media);
    let media = MediaElement::new(&contexts.main);

    let play = media.play();
    let periods = media.get_periods();
    assert_ne!(play.call_id(), periods.call_id());
    contexts.pump();
    assert_eq!(real_media.parked_count(), 2);

    real_media.settle_parked(vec![json!("done")]);
    contexts.pump();

    assert_eq!(play.await, Ok(vec![json!("done")]));
    assert_eq!(periods.await, Ok(vec![json!("done")]));
    assert_eq!(contexts.main.pending_call_count(), 0);
}

#[test]
fn async_call_without_reply_times_out() {
    let contexts = PairedContexts::connected();
    let real_media = Rc::new(RecordingObserver::new());
    contexts
        .frame
        .register_observer(ObserverKey::new(MEDIA_ELEMENT_KEY), &real_media);
    let media = MediaElement::new(&contexts.main);

    let mut play = media.play();
    let call_id = play.call_id();
    contexts.pump();
    assert!(play.try_result().is_none());

    let expired = contexts
        .main
        .expire_async_calls(&(Instant::now() + Duration::from_secs(11)));
    assert_eq!(expired, 1);
    assert_eq!(
        play.try_result(),
        Some(Err(ProxyError::AsyncCallTimedOut { call_id }))
    );

    // a reply after the timeout is stale
    real_media.settle_parked(vec![]);
    contexts.pump();
    assert_eq!(contexts.main.pending_call_count(), 0);
}

#[test]
fn mirror_stops_observing_when_dropped() {
    let contexts = PairedContexts::connected();
    let track = TextTrack::indexed(&contexts.main, 0, "subtitles", "", "");
    let key = track.key().clone();
    assert!(contexts.main.has_observer(&key));
    assert_eq!(track.mirror().observer_key(), &key);

    drop(track);
    assert!(!contexts.main.has_observer(&key));
    contexts
        .frame
        .call_observer_method(&key, "addCue", vec![json!({"startTime": 0.0, "endTime": 1.0})]);
    contexts.pump();
}

#[test]
fn replaced_mirror_keeps_successor_reachable() {
    init_logger();
    let contexts = PairedContexts::connected();
    let stale = TextTrack::indexed(&contexts.main, 0, "subtitles", "", "");
    let live = TextTrack::indexed(&contexts.main, 0, "captions", "", "");
    let key = live.key().clone();

    drop(stale);
    assert!(contexts.main.has_observer(&key));

    let cue = TextTrackCue::new("c1", 0.0, 1.0);
    let cue_json = serde_json::to_value(&cue).expect("serializable cue");
    contexts.frame.call_observer_method(&key, "addCue", vec![cue_json]);
    contexts.pump();
    assert_eq!(&*live.cues(), &[cue]);
}
