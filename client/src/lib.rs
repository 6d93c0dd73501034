//! # Orb Client
//! The application-facing side of the orb proxy protocol: mirrors of media
//! objects whose real state lives in a paired context, and the broadcast
//! metadata search driven by correlated native-bridge events.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod shared {
    pub use orb_shared::{
        AsyncCall, AsyncCallResult, LinkState, ObjectProxy, ObserverKey, Origin, PropertyMap,
        ProxyConfig, ProxyError, ProxyEvent, Value,
    };
}

mod bridge;
mod mirror;
mod search;

pub use bridge::{
    BridgeError, BridgeEvent, BridgeEvents, BridgeListener, BroadcastBridge, NativeBridge,
    Subscription,
};
pub use mirror::{
    EventListener, EventTarget, ListenerId, MediaElement, MediaElementShadow, Mirror, MirrorCore,
    MirrorError, MirrorUpdate, RemoteMirror, Shadow, TextTrack, TextTrackCue, TextTrackInfo,
    TextTrackMode, TextTrackShadow, CUE_CHANGE_EVENT, HAVE_NOTHING, MEDIA_ELEMENT_KEY,
    START_DATE_UPDATED_EVENT, TEXT_TRACK_TYPE,
};
pub use search::{
    next_state, Comparison, MetadataSearch, MetadataSearchEvent, Programme, Query, QueryExpr,
    QueryId, SearchConfig, SearchError, SearchField, SearchId, SearchListener, SearchListenerId,
    SearchManager, SearchNotification, SearchResults, SearchState, SearchStatus,
    METADATA_SEARCH_EVENT,
};
