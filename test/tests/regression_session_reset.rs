//! Regression tests for media source changes
//!
//! A new source invalidates the proxy session. Until the next handshake every
//! post is queued; once it completes the persistent properties arrive as one
//! update, and nothing from the old session is acted on.

use std::rc::Rc;

use serde_json::json;

use orb_client::{MediaElement, MEDIA_ELEMENT_KEY};
use orb_shared::{LinkState, ObserverKey, PropertyMap, ProxyConfig};
use orb_test::{assert_quiet, PairedContexts, RecordingObserver};

#[test]
fn new_source_re_sends_persistent_properties() {
    let mut contexts = PairedContexts::connected();
    let real_media = Rc::new(RecordingObserver::new());
    contexts
        .frame
        .register_observer(ObserverKey::new(MEDIA_ELEMENT_KEY), &real_media);
    let media = MediaElement::new(&contexts.main);

    media.set_volume(0.5).expect("writable");
    media.set_current_time(12.0).expect("writable");
    contexts.pump();
    real_media.properties.borrow_mut().clear();

    media.set_src(Some("https://example.com/live.mpd")).expect("writable");
    assert_eq!(contexts.main.link_state(), LinkState::Detached);
    assert_eq!(contexts.main.pending_message_count(), 1);
    assert_eq!(contexts.pump(), 0);

    let _ = contexts.handshake();
    contexts.pump();

    let properties = real_media.properties.borrow();
    assert_eq!(properties.get("src"), Some(&json!("https://example.com/live.mpd")));
    assert_eq!(properties.get("volume"), Some(&json!(0.5)));
    // not persistent
    assert_eq!(properties.get("currentTime"), None);
    drop(properties);
    assert_quiet!(contexts);
}

#[test]
fn reply_from_old_session_is_dropped() {
    let mut contexts = PairedContexts::connected();
    let real_media = Rc::new(RecordingObserver::new());
    let key = ObserverKey::new(MEDIA_ELEMENT_KEY);
    contexts.frame.register_observer(key.clone(), &real_media);
    let media = MediaElement::new(&contexts.main);

    // stale readiness report already in flight when the source changes
    let mut update = PropertyMap::new();
    update.insert("readyState".to_string(), json!(4));
    contexts.frame.update_observer_properties(&key, update);

    media.set_src(Some("https://example.com/next.mpd")).expect("writable");
    let _ = contexts.handshake();
    contexts.pump();

    assert_eq!(media.ready_state(), 0);
    assert_eq!(contexts.main.session_id(), contexts.frame.session_id());
}

#[test]
fn queue_is_bounded_while_detached() {
    let contexts = PairedContexts::new(ProxyConfig {
        max_pending_messages: 2,
        ..ProxyConfig::default()
    });
    let media = MediaElement::new(&contexts.main);

    media.set_volume(0.1).expect("writable");
    media.set_volume(0.2).expect("writable");
    media.set_volume(0.3).expect("writable");
    assert_eq!(contexts.main.pending_message_count(), 2);
}

#[test]
fn clearing_source_keeps_session() {
    let contexts = PairedContexts::connected();
    let real_media = Rc::new(RecordingObserver::new());
    contexts
        .frame
        .register_observer(ObserverKey::new(MEDIA_ELEMENT_KEY), &real_media);
    let media = MediaElement::new(&contexts.main);

    let session = contexts.main.session_id();
    media.set_src(None).expect("writable");
    assert_eq!(contexts.main.session_id(), session);
    assert_eq!(contexts.main.link_state(), LinkState::Ready);
    contexts.pump();
    assert_quiet!(contexts);
}
