use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use log::{debug, info, warn};

use orb_shared::KeyGenerator;

use crate::{
    bridge::{BridgeEvents, BroadcastBridge, NativeBridge},
    search::{
        error::SearchError,
        metadata_search::{MetadataSearch, SearchStatus},
        query::QueryId,
        search_config::SearchConfig,
    },
};

pub type SearchId = u64;
pub type SearchListenerId = u64;

/// Delivered to manager listeners once per accepted, non-start transition
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchNotification {
    pub search: SearchId,
    pub query_id: QueryId,
    pub status: SearchStatus,
}

pub type SearchListener = Rc<dyn Fn(&SearchNotification)>;

#[derive(Default)]
struct Listeners {
    ids: KeyGenerator<SearchListenerId>,
    counted: Vec<(SearchListenerId, SearchListener)>,
    on_metadata_search: Option<SearchListener>,
}

pub(crate) struct ManagerCore {
    config: SearchConfig,
    broadcast: BroadcastBridge,
    events: BridgeEvents,
    broadcast_independent: Cell<bool>,
    search_ids: RefCell<KeyGenerator<SearchId>>,
    listeners: RefCell<Listeners>,
}

impl ManagerCore {
    pub(crate) fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub(crate) fn broadcast(&self) -> &BroadcastBridge {
        &self.broadcast
    }

    pub(crate) fn events(&self) -> &BridgeEvents {
        &self.events
    }

    pub(crate) fn is_broadcast_independent(&self) -> bool {
        self.broadcast_independent.get()
    }

    pub(crate) fn mark_broadcast_independent(&self) {
        if !self.broadcast_independent.replace(true) {
            info!("SearchManager: application is broadcast-independent");
        }
    }

    pub(crate) fn dispatch(&self, notification: &SearchNotification) {
        if self.is_broadcast_independent() {
            warn!(
                "SearchManager: not broadcast related, dropping {:?} for search {}",
                notification.status, notification.search
            );
            return;
        }
        let listeners: Vec<SearchListener> = {
            let listeners = self.listeners.borrow();
            listeners
                .counted
                .iter()
                .map(|(_, listener)| listener.clone())
                .chain(listeners.on_metadata_search.clone())
                .collect()
        };
        for listener in listeners.iter() {
            listener(notification);
        }
    }
}

/// Creates metadata searches and relays their progress to listeners.
///
/// The application is assumed broadcast related until the native layer
/// answers a request with a security error.
pub struct SearchManager {
    core: Rc<ManagerCore>,
}

impl SearchManager {
    pub fn new(config: SearchConfig, bridge: Rc<dyn NativeBridge>, events: BridgeEvents) -> Self {
        Self {
            core: Rc::new(ManagerCore {
                config,
                broadcast: BroadcastBridge::new(bridge),
                events,
                broadcast_independent: Cell::new(false),
                search_ids: RefCell::new(KeyGenerator::new()),
                listeners: RefCell::new(Listeners::default()),
            }),
        }
    }

    pub fn is_broadcast_independent(&self) -> bool {
        self.core.is_broadcast_independent()
    }

    pub fn set_broadcast_independent(&self, broadcast_independent: bool) {
        self.core.broadcast_independent.set(broadcast_independent);
    }

    /// Returns `None` for any target but the supported one
    pub fn create_search(&self, target: u32) -> Result<Option<MetadataSearch>, SearchError> {
        if self.core.is_broadcast_independent() {
            return Err(SearchError::Security);
        }
        if target != self.core.config.supported_target {
            debug!("SearchManager: unsupported search target {}", target);
            return Ok(None);
        }
        let id = self.core.search_ids.borrow_mut().generate();
        Ok(Some(MetadataSearch::new(id, target, &self.core)))
    }

    pub fn add_listener(&self, listener: SearchListener) -> SearchListenerId {
        let mut listeners = self.core.listeners.borrow_mut();
        let id = listeners.ids.generate();
        listeners.counted.push((id, listener));
        id
    }

    pub fn remove_listener(&self, id: SearchListenerId) -> bool {
        let mut listeners = self.core.listeners.borrow_mut();
        let before = listeners.counted.len();
        listeners.counted.retain(|(listener_id, _)| *listener_id != id);
        listeners.counted.len() != before
    }

    /// Counted listeners plus the `on_metadata_search` slot when set
    pub fn listener_count(&self) -> usize {
        let listeners = self.core.listeners.borrow();
        listeners.counted.len() + usize::from(listeners.on_metadata_search.is_some())
    }

    /// Replace the single `on_metadata_search` slot
    pub fn set_on_metadata_search(&self, listener: Option<SearchListener>) {
        self.core.listeners.borrow_mut().on_metadata_search = listener;
    }

    pub fn has_on_metadata_search(&self) -> bool {
        self.core.listeners.borrow().on_metadata_search.is_some()
    }
}
