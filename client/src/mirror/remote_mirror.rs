use std::{
    cell::{Ref, RefCell},
    rc::Rc,
};

use log::debug;

use orb_shared::{
    AsyncCall, AsyncResponder, MirroredProperties, ObjectProxy, Observer, ObserverError,
    ObserverKey, Origin, PropertyMap, ProxyEvent, Value,
};

use crate::mirror::{
    error::MirrorError,
    event_target::{EventListener, EventTarget, ListenerId},
};

/// One effect on a mirrored object
#[derive(Clone, Debug, PartialEq)]
pub enum MirrorUpdate {
    Call { name: String, args: Vec<Value> },
    Properties(PropertyMap),
}

impl MirrorUpdate {
    pub fn call(name: impl Into<String>, args: Vec<Value>) -> Self {
        MirrorUpdate::Call {
            name: name.into(),
            args,
        }
    }
}

/// Locally held state of a mirrored object
pub trait Shadow: 'static {
    /// Apply a method call to the shadow only
    fn apply_call(&mut self, name: &str, args: &[Value]) -> Result<(), ObserverError>;

    /// Whether a local call to `name` changes state the paired context can
    /// see, and so must be forwarded
    fn is_forwarded(&self, name: &str) -> bool;

    fn properties(&self) -> &MirroredProperties;

    fn properties_mut(&mut self) -> &mut MirroredProperties;

    /// Called after an update from the paired context changed `changed`
    fn on_remote_properties(&mut self, changed: &[&'static str]) {
        let _ = changed;
    }

    /// Called before a replayed event reaches the local listeners
    fn on_remote_event(&mut self, event: &ProxyEvent) {
        let _ = event;
    }

    /// Perform an async call that arrived from the paired context
    fn apply_async_call(&mut self, name: &str, args: &[Value]) -> Result<Vec<Value>, ObserverError> {
        self.apply_call(name, args).map(|_| Vec::new())
    }
}

/// The two halves of every mirrored effect: applying it to the local shadow,
/// and forwarding it to the paired context.
pub trait RemoteMirror {
    fn observer_key(&self) -> &ObserverKey;

    /// Apply `update` to the local shadow. Local property writes are diffed;
    /// remote ones are not, so they are never sent back.
    fn apply_local(&self, update: &MirrorUpdate, origin: Origin) -> Result<(), MirrorError>;

    /// Send `update` to the paired context without touching the shadow
    fn forward(&self, update: MirrorUpdate);
}

fn apply_update<S: Shadow>(
    shadow: &mut S,
    update: &MirrorUpdate,
    origin: Origin,
) -> Result<(), MirrorError> {
    match update {
        MirrorUpdate::Call { name, args } => shadow.apply_call(name, args)?,
        MirrorUpdate::Properties(properties) => match origin {
            Origin::Local => {
                // all or nothing: a rejected field leaves no partial write behind
                for name in properties.keys() {
                    shadow.properties().check_writable(name)?;
                }
                for (name, value) in properties {
                    shadow.properties_mut().set_local(name, value.clone())?;
                }
            }
            Origin::Remote => {
                let changed = shadow.properties_mut().apply_remote(properties);
                if !changed.is_empty() {
                    shadow.on_remote_properties(&changed);
                }
            }
        },
    }
    Ok(())
}

/// Receiving half of a mirror: what the paired context's forwards reach
pub struct MirrorCore<S: Shadow> {
    shadow: RefCell<S>,
    events: EventTarget,
}

impl<S: Shadow> Observer for MirrorCore<S> {
    fn call_method(&self, name: &str, args: &[Value]) -> Result<(), ObserverError> {
        let update = MirrorUpdate::call(name, args.to_vec());
        match apply_update(&mut *self.shadow.borrow_mut(), &update, Origin::Remote) {
            Ok(()) => Ok(()),
            Err(MirrorError::Observer(err)) => Err(err),
            Err(MirrorError::Property(err)) => Err(ObserverError::InvalidArguments {
                name: name.to_string(),
                reason: err.to_string(),
            }),
        }
    }

    fn call_async_method(&self, name: &str, args: &[Value], responder: AsyncResponder) {
        let outcome = self.shadow.borrow_mut().apply_async_call(name, args);
        match outcome {
            Ok(values) => responder.resolve(values),
            Err(err) => responder.reject(err.to_string()),
        }
    }

    fn set_properties(&self, properties: &PropertyMap) {
        let update = MirrorUpdate::Properties(properties.clone());
        if let Err(err) = apply_update(&mut *self.shadow.borrow_mut(), &update, Origin::Remote) {
            debug!("Mirror: {}", err);
        }
    }

    fn dispatch_event(&self, event: &ProxyEvent) {
        self.shadow.borrow_mut().on_remote_event(event);
        self.events.dispatch_event(event);
    }
}

/// Application-facing proxy of an object whose real state lives in the
/// paired context.
///
/// Every call and write lands on the local shadow first, so reads after a
/// write are consistent without a round trip. Only externally visible effects
/// are then forwarded. The mirror observes its key for as long as it lives.
pub struct Mirror<S: Shadow> {
    key: ObserverKey,
    proxy: ObjectProxy,
    core: Rc<MirrorCore<S>>,
}

impl<S: Shadow> Mirror<S> {
    pub fn new(proxy: &ObjectProxy, key: ObserverKey, shadow: S) -> Self {
        let core = Rc::new(MirrorCore {
            shadow: RefCell::new(shadow),
            events: EventTarget::new(),
        });
        proxy.register_observer(key.clone(), &core);
        Self {
            key,
            proxy: proxy.clone(),
            core,
        }
    }

    #[cfg(test)]
    pub(crate) fn core(&self) -> &Rc<MirrorCore<S>> {
        &self.core
    }

    pub fn proxy(&self) -> &ObjectProxy {
        &self.proxy
    }

    pub fn shadow(&self) -> Ref<'_, S> {
        self.core.shadow.borrow()
    }

    pub(crate) fn with_shadow_mut<R>(&self, writer: impl FnOnce(&mut S) -> R) -> R {
        writer(&mut self.core.shadow.borrow_mut())
    }

    pub fn property(&self, name: &str) -> Option<Value> {
        self.shadow().properties().get(name).cloned()
    }

    /// Call `name` locally, then forward it if it is externally visible
    pub fn invoke(&self, name: &str, args: Vec<Value>) -> Result<(), MirrorError> {
        let update = MirrorUpdate::call(name, args);
        self.apply_local(&update, Origin::Local)?;
        if self.shadow().is_forwarded(name) {
            self.forward(update);
        }
        Ok(())
    }

    /// Forward an async call. The shadow changes only through whatever the
    /// paired context sends back.
    pub fn invoke_async(&self, name: &str, args: Vec<Value>) -> AsyncCall {
        self.proxy.call_async_observer_method(&self.key, name, args)
    }

    /// Returns whether the value changed and was pushed
    pub fn set_property(&self, name: &str, value: Value) -> Result<bool, MirrorError> {
        let mut properties = PropertyMap::new();
        properties.insert(name.to_string(), value);
        self.set_properties(properties)
    }

    pub fn set_properties(&self, properties: PropertyMap) -> Result<bool, MirrorError> {
        self.apply_local(&MirrorUpdate::Properties(properties), Origin::Local)?;
        Ok(self.sync_properties())
    }

    /// Push every pending local write as one partial update
    pub fn sync_properties(&self) -> bool {
        let diff = self.core.shadow.borrow_mut().properties_mut().take_diff();
        match diff {
            Some(diff) => {
                self.forward(MirrorUpdate::Properties(diff));
                true
            }
            None => false,
        }
    }

    pub fn add_event_listener(&self, kind: &str, listener: EventListener) -> ListenerId {
        self.core.events.add_event_listener(kind, listener)
    }

    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.core.events.remove_event_listener(id)
    }

    /// Dispatch to local listeners only
    pub fn dispatch_event(&self, event: &ProxyEvent) -> usize {
        self.core.events.dispatch_event(event)
    }
}

impl<S: Shadow> RemoteMirror for Mirror<S> {
    fn observer_key(&self) -> &ObserverKey {
        &self.key
    }

    fn apply_local(&self, update: &MirrorUpdate, origin: Origin) -> Result<(), MirrorError> {
        apply_update(&mut *self.core.shadow.borrow_mut(), update, origin)
    }

    fn forward(&self, update: MirrorUpdate) {
        match update {
            MirrorUpdate::Call { name, args } => {
                self.proxy.call_observer_method(&self.key, &name, args)
            }
            MirrorUpdate::Properties(properties) => {
                self.proxy.update_observer_properties(&self.key, properties)
            }
        }
    }
}

impl<S: Shadow> Drop for Mirror<S> {
    fn drop(&mut self) {
        self.proxy.release_observer(&self.key, &self.core);
    }
}
