use std::{
    collections::HashMap,
    rc::{Rc, Weak},
};

use log::{debug, info};

use crate::{proxy::observer::Observer, ObserverKey};

/// Per-scope table from [`ObserverKey`] to the observer receiving forwards
/// for that key.
///
/// The registry only associates; it never owns. An observer whose owner was
/// dropped is treated exactly like an unregistered key.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: HashMap<ObserverKey, Weak<dyn Observer>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self {
            observers: HashMap::new(),
        }
    }

    /// Bind `observer` under `key`, replacing any earlier binding
    pub fn register<O: Observer + 'static>(&mut self, key: ObserverKey, observer: &Rc<O>) {
        let observer: Weak<O> = Rc::downgrade(observer);
        let observer: Weak<dyn Observer> = observer;
        info!("ObserverRegistry: registered observer with key {}", key);
        if self.observers.insert(key.clone(), observer).is_some() {
            info!("ObserverRegistry: replaced earlier observer for key {}", key);
        }
    }

    pub fn unregister(&mut self, key: &ObserverKey) -> bool {
        info!("ObserverRegistry: unregistered observer with key {}", key);
        self.observers.remove(key).is_some()
    }

    /// Remove the binding for `key` only if it still points at `observer`.
    /// A later registration under the same key is left alone.
    pub fn unregister_if_bound<O: Observer + 'static>(
        &mut self,
        key: &ObserverKey,
        observer: &Rc<O>,
    ) -> bool {
        let target = Rc::as_ptr(observer) as *const ();
        let bound = self
            .observers
            .get(key)
            .is_some_and(|current| current.as_ptr() as *const () == target);
        if !bound {
            debug!("ObserverRegistry: key {} is bound to another observer, keeping it", key);
            return false;
        }
        self.unregister(key)
    }

    pub fn get(&self, key: &ObserverKey) -> Option<Rc<dyn Observer>> {
        self.observers.get(key).and_then(Weak::upgrade)
    }

    pub fn contains(&self, key: &ObserverKey) -> bool {
        self.get(key).is_some()
    }

    /// Forget bindings whose observer no longer exists
    pub fn prune(&mut self) {
        self.observers.retain(|_, observer| observer.strong_count() > 0);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}
