use std::{cell::RefCell, rc::Rc};

use orb_shared::{KeyGenerator, ProxyEvent};

pub type EventListener = Rc<dyn Fn(&ProxyEvent)>;
pub type ListenerId = u64;

/// Listener list of one mirrored object. Lives only in the context that owns
/// it; nothing here crosses to the paired context.
#[derive(Default)]
pub struct EventTarget {
    ids: RefCell<KeyGenerator<ListenerId>>,
    listeners: RefCell<Vec<(ListenerId, String, EventListener)>>,
}

impl EventTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_event_listener(&self, kind: &str, listener: EventListener) -> ListenerId {
        let id = self.ids.borrow_mut().generate();
        self.listeners
            .borrow_mut()
            .push((id, kind.to_string(), listener));
        id
    }

    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(listener_id, _, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Returns how many listeners ran
    pub fn dispatch_event(&self, event: &ProxyEvent) -> usize {
        let listeners: Vec<EventListener> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(_, kind, _)| *kind == event.name)
            .map(|(_, _, listener)| listener.clone())
            .collect();
        for listener in listeners.iter() {
            listener(event);
        }
        listeners.len()
    }

    pub fn listener_count(&self, kind: &str) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|(_, listener_kind, _)| listener_kind == kind)
            .count()
    }
}
