use std::{cell::Ref, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::json;

use orb_shared::{
    MirroredProperties, ObjectProxy, ObserverError, ObserverKey, PropertyDef, ProxyEvent, Value,
};

use crate::mirror::{
    error::MirrorError,
    event_target::{EventListener, ListenerId},
    remote_mirror::{Mirror, RemoteMirror, Shadow},
};

pub const TEXT_TRACK_TYPE: &str = "TextTrack";
pub const CUE_CHANGE_EVENT: &str = "cuechange";

const ADD_CUE: &str = "addCue";
const REMOVE_CUE: &str = "removeCue";

static TEXT_TRACK_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::read_only("id"),
    PropertyDef::read_only("kind"),
    PropertyDef::read_only("label"),
    PropertyDef::read_only("language"),
    PropertyDef::read_write("mode"),
    PropertyDef::read_write("default"),
    PropertyDef::read_write("isTTML"),
    PropertyDef::read_write("isEmbedded"),
    PropertyDef::read_write("inBandMetadataTrackDispatchType"),
    PropertyDef::read_write("renderingType"),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextTrackMode {
    Disabled,
    Hidden,
    Showing,
}

impl TextTrackMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextTrackMode::Disabled => "disabled",
            TextTrackMode::Hidden => "hidden",
            TextTrackMode::Showing => "showing",
        }
    }
}

impl FromStr for TextTrackMode {
    type Err = ();

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        match mode {
            "disabled" => Ok(TextTrackMode::Disabled),
            "hidden" => Ok(TextTrackMode::Hidden),
            "showing" => Ok(TextTrackMode::Showing),
            _ => Err(()),
        }
    }
}

impl fmt::Display for TextTrackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A timed cue as carried across the boundary. Times are in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextTrackCue {
    #[serde(default)]
    pub id: String,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default)]
    pub pause_on_exit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl TextTrackCue {
    pub fn new(id: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self {
            id: id.into(),
            start_time,
            end_time,
            pause_on_exit: false,
            text: None,
            data: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn is_active_at(&self, time: f64) -> bool {
        self.start_time <= time && time <= self.end_time
    }
}

fn cue_argument(name: &str, args: &[Value]) -> Result<TextTrackCue, ObserverError> {
    let cue = args.first().ok_or_else(|| ObserverError::InvalidArguments {
        name: name.to_string(),
        reason: "expected a cue".to_string(),
    })?;
    TextTrackCue::deserialize(cue).map_err(|err| ObserverError::InvalidArguments {
        name: name.to_string(),
        reason: err.to_string(),
    })
}

pub struct TextTrackShadow {
    properties: MirroredProperties,
    cues: Vec<TextTrackCue>,
    active_cues: Vec<TextTrackCue>,
}

impl TextTrackShadow {
    fn new(id: &str, kind: &str, label: &str, language: &str) -> Self {
        let mut properties = MirroredProperties::new(TEXT_TRACK_PROPERTIES);
        properties.init("id", json!(id));
        properties.init("kind", json!(kind));
        properties.init("label", json!(label));
        properties.init("language", json!(language));
        properties.init("mode", json!(TextTrackMode::Disabled.as_str()));
        properties.init("default", json!(false));
        properties.init("renderingType", json!("html"));
        Self {
            properties,
            cues: Vec::new(),
            active_cues: Vec::new(),
        }
    }

    pub fn cues(&self) -> &[TextTrackCue] {
        &self.cues
    }

    pub fn active_cues(&self) -> &[TextTrackCue] {
        &self.active_cues
    }

    fn mode(&self) -> TextTrackMode {
        self.properties
            .get("mode")
            .and_then(Value::as_str)
            .and_then(|mode| mode.parse().ok())
            .unwrap_or(TextTrackMode::Disabled)
    }

    /// Returns whether the active set changed
    fn update_active_cues(&mut self, time: f64) -> bool {
        let before = self.active_cues.len();
        self.active_cues.retain(|cue| cue.is_active_at(time));
        let mut changed = self.active_cues.len() != before;
        for cue in self.cues.iter() {
            if cue.is_active_at(time) && !self.active_cues.contains(cue) {
                self.active_cues.push(cue.clone());
                changed = true;
            }
        }
        changed
    }
}

impl Shadow for TextTrackShadow {
    fn apply_call(&mut self, name: &str, args: &[Value]) -> Result<(), ObserverError> {
        match name {
            ADD_CUE => {
                self.cues.push(cue_argument(name, args)?);
                Ok(())
            }
            REMOVE_CUE => {
                let cue = cue_argument(name, args)?;
                self.cues.retain(|existing| *existing != cue);
                self.active_cues.retain(|existing| *existing != cue);
                Ok(())
            }
            _ => Err(ObserverError::UnknownMethod {
                name: name.to_string(),
            }),
        }
    }

    fn is_forwarded(&self, name: &str) -> bool {
        matches!(name, ADD_CUE | REMOVE_CUE)
    }

    fn properties(&self) -> &MirroredProperties {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut MirroredProperties {
        &mut self.properties
    }
}

/// Mirror of one text track of a media element.
///
/// Cue changes and mode writes reach the paired context; listeners stay local.
pub struct TextTrack {
    mirror: Mirror<TextTrackShadow>,
}

impl TextTrack {
    pub fn new(
        proxy: &ObjectProxy,
        key: ObserverKey,
        id: &str,
        kind: &str,
        label: &str,
        language: &str,
    ) -> Self {
        Self {
            mirror: Mirror::new(proxy, key, TextTrackShadow::new(id, kind, label, language)),
        }
    }

    /// Observed under `TextTrack_<index>`
    pub fn indexed(
        proxy: &ObjectProxy,
        index: usize,
        kind: &str,
        label: &str,
        language: &str,
    ) -> Self {
        Self::new(
            proxy,
            ObserverKey::indexed(TEXT_TRACK_TYPE, index),
            &index.to_string(),
            kind,
            label,
            language,
        )
    }

    pub fn key(&self) -> &ObserverKey {
        self.mirror.observer_key()
    }

    pub fn mirror(&self) -> &Mirror<TextTrackShadow> {
        &self.mirror
    }

    fn text(&self, name: &str) -> String {
        self.mirror
            .property(name)
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_default()
    }

    pub fn id(&self) -> String {
        self.text("id")
    }

    pub fn kind(&self) -> String {
        self.text("kind")
    }

    pub fn label(&self) -> String {
        self.text("label")
    }

    pub fn language(&self) -> String {
        self.text("language")
    }

    pub fn cues(&self) -> Ref<'_, [TextTrackCue]> {
        Ref::map(self.mirror.shadow(), |shadow| shadow.cues())
    }

    pub fn active_cues(&self) -> Ref<'_, [TextTrackCue]> {
        Ref::map(self.mirror.shadow(), |shadow| shadow.active_cues())
    }

    pub fn add_cue(&self, cue: &TextTrackCue) -> Result<(), MirrorError> {
        self.mirror.invoke(ADD_CUE, vec![cue_value(cue)?])
    }

    pub fn remove_cue(&self, cue: &TextTrackCue) -> Result<(), MirrorError> {
        self.mirror.invoke(REMOVE_CUE, vec![cue_value(cue)?])
    }

    pub fn mode(&self) -> TextTrackMode {
        self.mirror.shadow().mode()
    }

    /// Disabling clears the active cues
    pub fn set_mode(&self, mode: TextTrackMode) -> Result<bool, MirrorError> {
        let changed = self.mirror.set_property("mode", json!(mode.as_str()))?;
        if changed && mode == TextTrackMode::Disabled {
            self.mirror
                .with_shadow_mut(|shadow| shadow.active_cues.clear());
        }
        Ok(changed)
    }

    pub fn is_default(&self) -> bool {
        self.mirror
            .property("default")
            .and_then(|value| value.as_bool())
            .unwrap_or(false)
    }

    /// A default track is shown
    pub fn set_default(&self, default: bool) -> Result<(), MirrorError> {
        self.mirror.set_property("default", json!(default))?;
        if default {
            self.set_mode(TextTrackMode::Showing)?;
        }
        Ok(())
    }

    /// Recompute the active cues for media time `time`. Dispatches a local
    /// `cuechange` when the set changed. Disabled tracks ignore time updates.
    pub fn on_time_update(&self, time: f64) -> bool {
        if self.mode() == TextTrackMode::Disabled {
            return false;
        }
        let changed = self
            .mirror
            .with_shadow_mut(|shadow| shadow.update_active_cues(time));
        if changed {
            self.mirror
                .dispatch_event(&ProxyEvent::new(CUE_CHANGE_EVENT));
        }
        changed
    }

    pub fn add_event_listener(&self, kind: &str, listener: EventListener) -> ListenerId {
        self.mirror.add_event_listener(kind, listener)
    }

    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.mirror.remove_event_listener(id)
    }

    pub fn dispatch_event(&self, event: &ProxyEvent) -> usize {
        self.mirror.dispatch_event(event)
    }
}

fn cue_value(cue: &TextTrackCue) -> Result<Value, MirrorError> {
    serde_json::to_value(cue).map_err(|err| {
        MirrorError::Observer(ObserverError::InvalidArguments {
            name: ADD_CUE.to_string(),
            reason: err.to_string(),
        })
    })
}
