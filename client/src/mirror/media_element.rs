use std::time::Instant;

use log::info;
use serde_json::json;

use orb_shared::{
    AsyncCall, MirroredProperties, ObjectProxy, ObserverError, ObserverKey, PropertyDef,
    PropertyMap, ProxyEvent, Value,
};

use crate::mirror::{
    error::MirrorError,
    event_target::{EventListener, ListenerId},
    remote_mirror::{Mirror, RemoteMirror, Shadow},
};

pub const MEDIA_ELEMENT_KEY: &str = "HTMLMediaElement";
pub const START_DATE_UPDATED_EVENT: &str = "__orb_startDateUpdated__";

static MEDIA_ELEMENT_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::persistent("src"),
    PropertyDef::persistent("autoplay"),
    PropertyDef::persistent("controls"),
    PropertyDef::persistent("playbackRate"),
    PropertyDef::persistent("volume"),
    PropertyDef::persistent("muted"),
    PropertyDef::persistent("loop"),
    PropertyDef::persistent("defaultMuted"),
    PropertyDef::persistent("crossOrigin"),
    PropertyDef::persistent("controlsList"),
    PropertyDef::persistent("defaultPlaybackRate"),
    PropertyDef::persistent("disableRemotePlayback"),
    PropertyDef::persistent("preservesPitch"),
    PropertyDef::read_write("currentTime"),
    PropertyDef::read_write("srcObject"),
    PropertyDef::read_only("paused"),
    PropertyDef::read_only("ended"),
    PropertyDef::read_only("currentSrc"),
    PropertyDef::read_only("error"),
    PropertyDef::read_only("networkState"),
    PropertyDef::read_only("readyState"),
    PropertyDef::read_only("seekable"),
    PropertyDef::read_only("videoWidth"),
    PropertyDef::read_only("videoHeight"),
    PropertyDef::read_only("duration"),
];

const FORWARDED_METHODS: &[&str] = &["pause", "load", "removeAttribute"];

/// Ready state before any media data is available
pub const HAVE_NOTHING: u64 = 0;

/// Descriptor of a text track announced by the paired context
#[derive(Clone, Debug, PartialEq)]
pub struct TextTrackInfo {
    pub index: usize,
    pub kind: String,
    pub label: String,
    pub language: String,
}

pub struct MediaElementShadow {
    properties: MirroredProperties,
    /// Base of the playback position extrapolation
    time_updated_at: Instant,
    /// Milliseconds since the epoch, `None` until the paired context reports it
    start_date: Option<f64>,
    text_tracks: Vec<TextTrackInfo>,
}

impl MediaElementShadow {
    fn new() -> Self {
        let mut properties = MirroredProperties::new(MEDIA_ELEMENT_PROPERTIES);
        properties.init("paused", json!(true));
        properties.init("ended", json!(false));
        properties.init("readyState", json!(HAVE_NOTHING));
        properties.init("currentTime", json!(0.0));
        Self {
            properties,
            time_updated_at: Instant::now(),
            start_date: None,
            text_tracks: Vec::new(),
        }
    }

    fn flag(&self, name: &str) -> bool {
        self.properties
            .get(name)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// The last reported position, advanced by the time elapsed since while
    /// playing
    pub fn current_time_at(&self, now: Instant) -> f64 {
        let base = self
            .properties
            .get("currentTime")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        if self.flag("paused") || self.flag("ended") {
            return base;
        }
        base + now.saturating_duration_since(self.time_updated_at).as_secs_f64()
    }

    pub fn start_date(&self) -> Option<f64> {
        self.start_date
    }

    pub fn text_tracks(&self) -> &[TextTrackInfo] {
        &self.text_tracks
    }

    fn add_text_track(&mut self, name: &str, args: &[Value]) -> Result<(), ObserverError> {
        let text = |index: usize| {
            args.get(index)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let index = args
            .first()
            .and_then(Value::as_u64)
            .and_then(|index| usize::try_from(index).ok())
            .ok_or_else(|| ObserverError::InvalidArguments {
                name: name.to_string(),
                reason: "expected a track index".to_string(),
            })?;
        let info = TextTrackInfo {
            index,
            kind: text(1),
            label: text(2),
            language: text(3),
        };
        self.text_tracks.retain(|track| track.index != index);
        self.text_tracks.push(info);
        Ok(())
    }

    /// Back to the state of a fresh session; nothing here is diffed
    fn reset_session_state(&mut self) {
        self.properties.init("readyState", json!(HAVE_NOTHING));
        self.properties.init("error", Value::Null);
        self.start_date = None;
    }
}

impl Shadow for MediaElementShadow {
    fn apply_call(&mut self, name: &str, args: &[Value]) -> Result<(), ObserverError> {
        match name {
            // the paired context performs these
            "pause" | "load" => Ok(()),
            "removeAttribute" => {
                let attribute = args.first().and_then(Value::as_str).ok_or_else(|| {
                    ObserverError::InvalidArguments {
                        name: name.to_string(),
                        reason: "expected an attribute name".to_string(),
                    }
                })?;
                self.properties.check_writable(attribute).map_err(|err| {
                    ObserverError::InvalidArguments {
                        name: name.to_string(),
                        reason: err.to_string(),
                    }
                })?;
                self.properties.init(attribute, Value::Null);
                Ok(())
            }
            "setSeekable" => {
                let ranges = args.first().cloned().unwrap_or(Value::Null);
                let mut update = PropertyMap::new();
                update.insert("seekable".to_string(), ranges);
                self.properties.apply_remote(&update);
                Ok(())
            }
            "addTextTrack" => self.add_text_track(name, args),
            _ => Err(ObserverError::UnknownMethod {
                name: name.to_string(),
            }),
        }
    }

    fn is_forwarded(&self, name: &str) -> bool {
        FORWARDED_METHODS.contains(&name)
    }

    fn properties(&self) -> &MirroredProperties {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut MirroredProperties {
        &mut self.properties
    }

    fn on_remote_properties(&mut self, changed: &[&'static str]) {
        if changed.contains(&"currentTime") {
            self.time_updated_at = Instant::now();
        }
    }

    fn on_remote_event(&mut self, event: &ProxyEvent) {
        match event.name.as_str() {
            START_DATE_UPDATED_EVENT => {
                self.start_date = event.property("startDate").and_then(Value::as_f64);
            }
            "play" => self.time_updated_at = Instant::now(),
            _ => {}
        }
    }
}

/// Mirror of the media element whose playback runs in the paired context.
///
/// Writable properties are diffed and pushed only when they change. Playback
/// state is read-only here and follows what the paired context reports.
pub struct MediaElement {
    mirror: Mirror<MediaElementShadow>,
}

impl MediaElement {
    pub fn new(proxy: &ObjectProxy) -> Self {
        Self {
            mirror: Mirror::new(
                proxy,
                ObserverKey::new(MEDIA_ELEMENT_KEY),
                MediaElementShadow::new(),
            ),
        }
    }

    pub fn mirror(&self) -> &Mirror<MediaElementShadow> {
        &self.mirror
    }

    pub fn property(&self, name: &str) -> Option<Value> {
        self.mirror.property(name)
    }

    /// Write a writable property; equal writes are not forwarded
    pub fn set(&self, name: &str, value: Value) -> Result<bool, MirrorError> {
        self.mirror.set_property(name, value)
    }

    pub fn src(&self) -> Option<String> {
        self.property("src")
            .and_then(|value| value.as_str().map(str::to_string))
    }

    /// A new source starts a new session: the proxy is invalidated and the
    /// persistent properties are queued for the next handshake. Clearing the
    /// source is pushed as a plain update.
    pub fn set_src(&self, src: Option<&str>) -> Result<bool, MirrorError> {
        let value = src.map_or(Value::Null, |src| json!(src));
        if self.mirror.property("src").as_ref() == Some(&value) {
            return Ok(false);
        }
        match src {
            Some(src) if !src.is_empty() => {
                info!("MediaElement: setting src to '{}'", src);
                self.mirror.with_shadow_mut(|shadow| {
                    shadow.properties_mut().set_local("src", value)
                })?;
                self.reset_session();
                Ok(true)
            }
            _ => self.mirror.set_property("src", value),
        }
    }

    /// Drop the current session and re-send every persistent property as
    /// one update
    pub fn reset_session(&self) {
        self.mirror.proxy().invalidate();
        let snapshot = self.mirror.with_shadow_mut(|shadow| {
            shadow.reset_session_state();
            let properties = shadow.properties_mut();
            properties.take_diff();
            properties.persistent_snapshot()
        });
        self.mirror
            .proxy()
            .update_observer_properties(self.mirror.observer_key(), snapshot);
    }

    pub fn paused(&self) -> bool {
        self.mirror.shadow().flag("paused")
    }

    pub fn ended(&self) -> bool {
        self.mirror.shadow().flag("ended")
    }

    pub fn ready_state(&self) -> u64 {
        self.property("readyState")
            .and_then(|value| value.as_u64())
            .unwrap_or(HAVE_NOTHING)
    }

    /// Unknown durations read as infinite
    pub fn duration(&self) -> f64 {
        self.property("duration")
            .and_then(|value| value.as_f64())
            .unwrap_or(f64::INFINITY)
    }

    pub fn error(&self) -> Option<Value> {
        self.property("error").filter(|value| !value.is_null())
    }

    pub fn current_time(&self) -> f64 {
        self.mirror.shadow().current_time_at(Instant::now())
    }

    pub fn set_current_time(&self, seconds: f64) -> Result<bool, MirrorError> {
        let changed = self.mirror.set_property("currentTime", json!(seconds))?;
        self.mirror
            .with_shadow_mut(|shadow| shadow.time_updated_at = Instant::now());
        Ok(changed)
    }

    pub fn set_volume(&self, volume: f64) -> Result<bool, MirrorError> {
        self.set("volume", json!(volume))
    }

    pub fn set_muted(&self, muted: bool) -> Result<bool, MirrorError> {
        self.set("muted", json!(muted))
    }

    pub fn set_playback_rate(&self, rate: f64) -> Result<bool, MirrorError> {
        self.set("playbackRate", json!(rate))
    }

    /// Milliseconds since the epoch of the stream's start, once reported
    pub fn start_date(&self) -> Option<f64> {
        self.mirror.shadow().start_date()
    }

    pub fn text_tracks(&self) -> Vec<TextTrackInfo> {
        self.mirror.shadow().text_tracks().to_vec()
    }

    pub fn pause(&self) -> Result<(), MirrorError> {
        self.mirror.invoke("pause", Vec::new())
    }

    pub fn load(&self) -> Result<(), MirrorError> {
        self.mirror.invoke("load", Vec::new())
    }

    /// Clears a writable attribute on both sides
    pub fn remove_attribute(&self, name: &str) -> Result<(), MirrorError> {
        self.mirror.invoke("removeAttribute", vec![json!(name)])
    }

    pub fn play(&self) -> AsyncCall {
        self.mirror.invoke_async("play", Vec::new())
    }

    /// Forget the source locally and have the paired context release it
    pub fn unload(&self) -> AsyncCall {
        self.mirror
            .with_shadow_mut(|shadow| shadow.properties_mut().init("src", Value::Null));
        self.mirror.invoke_async("orb_unload", Vec::new())
    }

    pub fn get_periods(&self) -> AsyncCall {
        self.mirror.invoke_async("orb_getPeriods", Vec::new())
    }

    pub fn get_current_period(&self) -> AsyncCall {
        self.mirror.invoke_async("orb_getCurrentPeriod", Vec::new())
    }

    pub fn get_mrs_url(&self) -> AsyncCall {
        self.mirror.invoke_async("orb_getMrsUrl", Vec::new())
    }

    pub fn get_ci_ancillary_data(&self) -> AsyncCall {
        self.mirror.invoke_async("orb_getCiAncillaryData", Vec::new())
    }

    pub fn add_event_listener(&self, kind: &str, listener: EventListener) -> ListenerId {
        self.mirror.add_event_listener(kind, listener)
    }

    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.mirror.remove_event_listener(id)
    }
}
