use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
};

use log::debug;
use serde::de::DeserializeOwned;

use orb_shared::{KeyGenerator, Value};

/// A named event delivered by the native layer
#[derive(Clone, Debug, PartialEq)]
pub struct BridgeEvent {
    pub kind: String,
    pub properties: Value,
}

impl BridgeEvent {
    pub fn new(kind: impl Into<String>, properties: Value) -> Self {
        Self {
            kind: kind.into(),
            properties,
        }
    }

    /// Decode the properties into a typed event
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.properties)
    }
}

pub type BridgeListener = Rc<dyn Fn(&BridgeEvent)>;

type ListenerId = u64;

struct Entry {
    id: ListenerId,
    kind: String,
    listener: BridgeListener,
    // cleared by the handle, so a removal deferred by a live borrow still
    // silences the listener
    active: Rc<Cell<bool>>,
}

#[derive(Default)]
struct DispatcherState {
    ids: KeyGenerator<ListenerId>,
    listeners: Vec<Entry>,
}

impl DispatcherState {
    fn prune(&mut self) -> Vec<Entry> {
        let (live, released) = std::mem::take(&mut self.listeners)
            .into_iter()
            .partition(|entry| entry.active.get());
        self.listeners = live;
        released
    }
}

/// Delivers native events to subscribed listeners.
///
/// Every subscription is a [`Subscription`] handle; the listener stays
/// registered exactly as long as the handle lives.
#[derive(Clone, Default)]
pub struct BridgeEvents {
    state: Rc<RefCell<DispatcherState>>,
}

impl BridgeEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, kind: &str, listener: BridgeListener) -> Subscription {
        let active = Rc::new(Cell::new(true));
        let (id, released) = {
            let mut state = self.state.borrow_mut();
            let released = state.prune();
            let id = state.ids.generate();
            state.listeners.push(Entry {
                id,
                kind: kind.to_string(),
                listener,
                active: active.clone(),
            });
            (id, released)
        };
        // released listeners may own subscriptions of their own
        drop(released);
        Subscription {
            id,
            active,
            state: Rc::downgrade(&self.state),
        }
    }

    /// Deliver `event` to every listener of its kind. Listeners may subscribe
    /// or unsubscribe while the event is being delivered.
    /// A listener unsubscribed by an earlier listener of the same event is
    /// not called.
    pub fn dispatch(&self, event: &BridgeEvent) -> usize {
        let listeners: Vec<(BridgeListener, Rc<Cell<bool>>)> = self
            .state
            .borrow()
            .listeners
            .iter()
            .filter(|entry| entry.kind == event.kind && entry.active.get())
            .map(|entry| (entry.listener.clone(), entry.active.clone()))
            .collect();
        if listeners.is_empty() {
            debug!("BridgeEvents: no listener for {}", event.kind);
        }
        let mut delivered = 0;
        for (listener, active) in listeners.iter() {
            if active.get() {
                listener(event);
                delivered += 1;
            }
        }
        delivered
    }

    pub fn listener_count(&self, kind: &str) -> usize {
        self.state
            .borrow()
            .listeners
            .iter()
            .filter(|entry| entry.kind == kind && entry.active.get())
            .count()
    }
}

/// Keeps one listener registered; dropping it unsubscribes
pub struct Subscription {
    id: ListenerId,
    active: Rc<Cell<bool>>,
    state: Weak<RefCell<DispatcherState>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.active.set(false);
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let released = match state.try_borrow_mut() {
            Ok(mut state) => state.prune(),
            Err(_) => {
                debug!(
                    "BridgeEvents: dispatcher busy, listener {} removed on next subscribe",
                    self.id
                );
                return;
            }
        };
        // dropped after the borrow ends; a listener may own another handle
        drop(released);
    }
}
