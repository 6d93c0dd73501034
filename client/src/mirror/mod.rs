mod error;
mod event_target;
mod media_element;
mod remote_mirror;
mod text_track;

pub use error::MirrorError;
pub use event_target::{EventListener, EventTarget, ListenerId};
pub use media_element::{
    MediaElement, MediaElementShadow, TextTrackInfo, HAVE_NOTHING, MEDIA_ELEMENT_KEY,
    START_DATE_UPDATED_EVENT,
};
pub use remote_mirror::{Mirror, MirrorCore, MirrorUpdate, RemoteMirror, Shadow};
pub use text_track::{
    TextTrack, TextTrackCue, TextTrackMode, TextTrackShadow, CUE_CHANGE_EVENT, TEXT_TRACK_TYPE,
};
