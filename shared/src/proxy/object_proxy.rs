use std::{
    cell::RefCell,
    collections::VecDeque,
    future::Future,
    pin::Pin,
    rc::{Rc, Weak},
    task::{Context, Poll},
    time::Instant,
};

use log::{debug, info, warn};
use tokio::sync::oneshot;

use crate::{
    correlation::broker::CorrelationBroker,
    proxy::{
        error::ProxyError,
        message::{AsyncCallOutcome, ProxyEnvelope, ProxyEvent, ProxyMessage},
        observer::Observer,
        proxy_config::ProxyConfig,
        registry::ObserverRegistry,
    },
    transport::ProxyTransport,
    CallId, KeyGenerator, ObserverKey, PropertyMap, SessionId, Value,
};

pub type AsyncCallResult = Result<Vec<Value>, ProxyError>;

/// Link state between this proxy and its paired context
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    /// No transport, or invalidated. Everything posted is queued.
    Detached,
    /// Transport attached, waiting for the paired context's handshake
    Listening,
    /// Handshake sent, waiting for the acknowledgement. Posts are still queued.
    Handshaking,
    /// Session established, posts go straight to the transport
    Ready,
}

enum CallKind {
    Handshake,
    Method,
}

struct PendingCall {
    kind: CallKind,
    sender: oneshot::Sender<AsyncCallResult>,
}

struct ProxyState {
    config: ProxyConfig,
    registry: ObserverRegistry,
    transport: Option<Box<dyn ProxyTransport>>,
    link: LinkState,
    session_id: Option<SessionId>,
    session_ids: KeyGenerator<SessionId>,
    pending: VecDeque<ProxyMessage>,
    calls: CorrelationBroker<CallId, PendingCall>,
}

impl ProxyState {
    fn post(&mut self, message: ProxyMessage) {
        if self.link == LinkState::Ready {
            self.send_now(message);
            return;
        }
        if self.pending.len() >= self.config.max_pending_messages {
            if let Some(dropped) = self.pending.pop_front() {
                warn!(
                    "ObjectProxy: pending queue full, dropping oldest {}",
                    dropped.name()
                );
            }
        }
        self.pending.push_back(message);
    }

    fn send_now(&mut self, message: ProxyMessage) {
        let (Some(transport), Some(session_id)) = (self.transport.as_mut(), self.session_id)
        else {
            warn!(
                "ObjectProxy: no transport for {}, message dropped",
                message.name()
            );
            return;
        };
        let name = message.name();
        if let Err(error) = transport.send(ProxyEnvelope::new(session_id, message)) {
            warn!("ObjectProxy: failed to send {}: {}", name, error);
        }
    }

    fn flush_pending(&mut self) {
        while let Some(message) = self.pending.pop_front() {
            self.send_now(message);
        }
    }
}

/// What `receive` must do once the state borrow has been released
enum Delivery {
    Nothing,
    Method(Rc<dyn Observer>, String, Vec<Value>),
    AsyncMethod(Rc<dyn Observer>, String, Vec<Value>, AsyncResponder),
    Properties(Rc<dyn Observer>, PropertyMap),
    Event(Rc<dyn Observer>, ProxyEvent),
    Settle(oneshot::Sender<AsyncCallResult>, AsyncCallResult),
}

/// One end of the observer proxy protocol.
///
/// Both contexts hold an `ObjectProxy`. Each registers its observers and
/// forwards calls, partial property updates and events to the observers of
/// the paired context. The handle is cheap to clone; clones share state.
///
/// Observers are always invoked after the proxy's internal borrow is
/// released, so they may call back into the proxy. Transports must deliver
/// inbound envelopes as queued callbacks, never synchronously from `send`.
#[derive(Clone)]
pub struct ObjectProxy {
    state: Rc<RefCell<ProxyState>>,
}

impl ObjectProxy {
    pub fn new(config: ProxyConfig) -> Self {
        let calls = CorrelationBroker::with_ttl(config.async_call_timeout);
        Self {
            state: Rc::new(RefCell::new(ProxyState {
                config,
                registry: ObserverRegistry::new(),
                transport: None,
                link: LinkState::Detached,
                session_id: None,
                session_ids: KeyGenerator::new(),
                pending: VecDeque::new(),
                calls,
            })),
        }
    }

    pub fn link_state(&self) -> LinkState {
        self.state.borrow().link
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.state.borrow().session_id
    }

    pub fn pending_message_count(&self) -> usize {
        self.state.borrow().pending.len()
    }

    pub fn pending_call_count(&self) -> usize {
        self.state.borrow().calls.len()
    }

    // Session

    /// Attach a transport and start a new session with the paired context.
    ///
    /// The returned call resolves once the paired context acknowledges;
    /// messages queued so far are flushed in order at that point.
    pub fn initiate_handshake(&self, transport: Box<dyn ProxyTransport>) -> AsyncCall {
        let mut state = self.state.borrow_mut();
        let session_id = state.session_ids.generate();
        state.transport = Some(transport);
        state.session_id = Some(session_id);
        state.link = LinkState::Handshaking;

        let (sender, receiver) = oneshot::channel();
        let call_id = state.calls.issue(PendingCall {
            kind: CallKind::Handshake,
            sender,
        });
        info!(
            "ObjectProxy: requesting handshake with sessionId {}...",
            session_id
        );
        state.send_now(ProxyMessage::HandshakeRequest { call_id });

        AsyncCall { call_id, receiver }
    }

    /// Attach a transport and wait for the paired context to initiate the
    /// handshake
    pub fn listen(&self, transport: Box<dyn ProxyTransport>) {
        let mut state = self.state.borrow_mut();
        state.transport = Some(transport);
        state.session_id = None;
        state.link = LinkState::Listening;
    }

    /// Forget the paired context. Everything posted afterwards is queued until
    /// the next handshake; replies still in flight for the old session are
    /// dropped on arrival.
    pub fn invalidate(&self) {
        let mut state = self.state.borrow_mut();
        state.transport = None;
        state.session_id = None;
        state.link = LinkState::Detached;
    }

    // Observers

    pub fn register_observer<O: Observer + 'static>(&self, key: ObserverKey, observer: &Rc<O>) {
        self.state.borrow_mut().registry.register(key, observer);
    }

    pub fn unregister_observer(&self, key: &ObserverKey) -> bool {
        self.state.borrow_mut().registry.unregister(key)
    }

    /// Unregister `key` only while it is still bound to `observer`, so an
    /// observer that was replaced never removes its successor
    pub fn release_observer<O: Observer + 'static>(
        &self,
        key: &ObserverKey,
        observer: &Rc<O>,
    ) -> bool {
        match self.state.try_borrow_mut() {
            Ok(mut state) => state.registry.unregister_if_bound(key, observer),
            // the binding is weak and lapses with the observer
            Err(_) => false,
        }
    }

    pub fn has_observer(&self, key: &ObserverKey) -> bool {
        self.state.borrow().registry.contains(key)
    }

    // Outgoing

    /// Fire-and-forget call of `name` on the paired context's observer
    pub fn call_observer_method(&self, key: &ObserverKey, name: &str, args: Vec<Value>) {
        debug!(
            "ObjectProxy: requested call to method {} on observer {}",
            name, key
        );
        self.state.borrow_mut().post(ProxyMessage::MethodRequest {
            observer_key: key.clone(),
            name: name.to_string(),
            args,
        });
    }

    /// Call `name` on the paired context's observer and wait for it to settle.
    /// Every call carries its own call id, so concurrent calls to the same key
    /// complete independently.
    pub fn call_async_observer_method(
        &self,
        key: &ObserverKey,
        name: &str,
        args: Vec<Value>,
    ) -> AsyncCall {
        let mut state = self.state.borrow_mut();
        let (sender, receiver) = oneshot::channel();
        let call_id = state.calls.issue(PendingCall {
            kind: CallKind::Method,
            sender,
        });
        debug!(
            "ObjectProxy: making async call {} to method {} on observer {}",
            call_id, name, key
        );
        state.post(ProxyMessage::AsyncMethodRequest {
            observer_key: key.clone(),
            name: name.to_string(),
            args,
            call_id,
        });
        AsyncCall { call_id, receiver }
    }

    /// Push a partial property update to the paired context's observer
    pub fn update_observer_properties(&self, key: &ObserverKey, properties: PropertyMap) {
        if properties.is_empty() {
            return;
        }
        self.state.borrow_mut().post(ProxyMessage::SetProperties {
            observer_key: key.clone(),
            properties,
        });
    }

    /// Replay `event` on the paired context's observer
    pub fn dispatch_event(&self, key: &ObserverKey, event: ProxyEvent) {
        self.state.borrow_mut().post(ProxyMessage::DispatchEvent {
            observer_key: key.clone(),
            event,
        });
    }

    /// Settle every async call whose timeout elapsed at `now`
    pub fn expire_async_calls(&self, now: &Instant) -> usize {
        let expired = self.state.borrow_mut().calls.expire(now);
        let count = expired.len();
        for (call_id, pending) in expired {
            warn!("ObjectProxy: async call {} timed out", call_id);
            let _ = pending
                .sender
                .send(Err(ProxyError::AsyncCallTimedOut { call_id }));
        }
        count
    }

    // Incoming

    /// Deliver serialized data from the paired context. Undecodable data is
    /// diagnosed and dropped.
    pub fn receive_raw(&self, raw: &str) {
        match ProxyEnvelope::decode(raw) {
            Ok(envelope) => self.receive(envelope),
            Err(error) => warn!("ObjectProxy: error parsing message data: {}", error),
        }
    }

    /// Deliver one envelope from the paired context
    pub fn receive(&self, envelope: ProxyEnvelope) {
        let delivery = self.route(envelope);
        match delivery {
            Delivery::Nothing => {}
            Delivery::Method(observer, name, args) => {
                if let Err(error) = observer.call_method(&name, &args) {
                    warn!("ObjectProxy: forwarded call to {} failed: {}", name, error);
                }
            }
            Delivery::AsyncMethod(observer, name, args, responder) => {
                observer.call_async_method(&name, &args, responder);
            }
            Delivery::Properties(observer, properties) => {
                observer.set_properties(&properties);
            }
            Delivery::Event(observer, event) => {
                observer.dispatch_event(&event);
            }
            Delivery::Settle(sender, result) => {
                let _ = sender.send(result);
            }
        }
    }

    fn route(&self, envelope: ProxyEnvelope) -> Delivery {
        let mut state = self.state.borrow_mut();
        let ProxyEnvelope {
            session_id,
            message,
        } = envelope;

        if let ProxyMessage::HandshakeRequest { call_id } = message {
            if state.transport.is_none() {
                warn!("ObjectProxy: handshake request without a transport, ignoring");
                return Delivery::Nothing;
            }
            info!(
                "ObjectProxy: received handshake request with sessionId {}. Responding back...",
                session_id
            );
            state.session_id = Some(session_id);
            state.link = LinkState::Ready;
            state.send_now(ProxyMessage::AsyncMethodResponse {
                call_id,
                outcome: Ok(Vec::new()),
            });
            state.flush_pending();
            return Delivery::Nothing;
        }

        if state.session_id != Some(session_id) {
            debug!(
                "ObjectProxy: dropping {} from stale session {}",
                message.name(),
                session_id
            );
            return Delivery::Nothing;
        }

        match message {
            ProxyMessage::HandshakeRequest { .. } => Delivery::Nothing,
            ProxyMessage::AsyncMethodResponse { call_id, outcome } => {
                let Some(pending) = state.calls.resolve(&call_id) else {
                    return Delivery::Nothing;
                };
                if let CallKind::Handshake = pending.kind {
                    info!("ObjectProxy: handshake complete for sessionId {}", session_id);
                    state.link = LinkState::Ready;
                    state.flush_pending();
                }
                let result = outcome
                    .map_err(|reason| ProxyError::AsyncCallFailed { call_id, reason });
                Delivery::Settle(pending.sender, result)
            }
            ProxyMessage::MethodRequest {
                observer_key,
                name,
                args,
            } => match lookup(&state.registry, &observer_key, "MethodRequest") {
                Some(observer) => Delivery::Method(observer, name, args),
                None => Delivery::Nothing,
            },
            ProxyMessage::AsyncMethodRequest {
                observer_key,
                name,
                args,
                call_id,
            } => {
                let responder = AsyncResponder::new(Rc::downgrade(&self.state), session_id, call_id);
                let observer = lookup(&state.registry, &observer_key, "AsyncMethodRequest");
                match observer {
                    Some(observer) => Delivery::AsyncMethod(observer, name, args, responder),
                    None => {
                        drop(state);
                        responder.reject(format!("no observer registered for {}", observer_key));
                        Delivery::Nothing
                    }
                }
            }
            ProxyMessage::SetProperties {
                observer_key,
                properties,
            } => match lookup(&state.registry, &observer_key, "SetProperties") {
                Some(observer) => Delivery::Properties(observer, properties),
                None => Delivery::Nothing,
            },
            ProxyMessage::DispatchEvent {
                observer_key,
                event,
            } => match lookup(&state.registry, &observer_key, "DispatchEvent") {
                Some(observer) => Delivery::Event(observer, event),
                None => Delivery::Nothing,
            },
        }
    }
}

impl Default for ObjectProxy {
    fn default() -> Self {
        Self::new(ProxyConfig::default())
    }
}

fn lookup(
    registry: &ObserverRegistry,
    key: &ObserverKey,
    message: &'static str,
) -> Option<Rc<dyn Observer>> {
    let observer = registry.get(key);
    if observer.is_none() {
        warn!(
            "ObjectProxy: {} addressed to unregistered observer {}, dropped",
            message, key
        );
    }
    observer
}

/// Settles one async call received from the paired context.
///
/// Dropping a responder without settling rejects the call, so the caller never
/// waits on an observer that forgot to answer.
pub struct AsyncResponder {
    state: Weak<RefCell<ProxyState>>,
    session_id: SessionId,
    call_id: CallId,
    settled: bool,
}

impl AsyncResponder {
    fn new(state: Weak<RefCell<ProxyState>>, session_id: SessionId, call_id: CallId) -> Self {
        Self {
            state,
            session_id,
            call_id,
            settled: false,
        }
    }

    pub fn call_id(&self) -> CallId {
        self.call_id
    }

    pub fn resolve(mut self, values: Vec<Value>) {
        self.settle(Ok(values));
    }

    pub fn reject(mut self, reason: impl Into<String>) {
        self.settle(Err(reason.into()));
    }

    fn settle(&mut self, outcome: AsyncCallOutcome) {
        self.settled = true;
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let Ok(mut state) = state.try_borrow_mut() else {
            warn!(
                "ObjectProxy: async call {} settled re-entrantly, response dropped",
                self.call_id
            );
            return;
        };
        if state.session_id != Some(self.session_id) {
            debug!(
                "ObjectProxy: session changed before async call {} settled, response dropped",
                self.call_id
            );
            return;
        }
        state.post(ProxyMessage::AsyncMethodResponse {
            call_id: self.call_id,
            outcome,
        });
    }
}

impl Drop for AsyncResponder {
    fn drop(&mut self) {
        if !self.settled {
            self.settle(Err("observer dropped the call without a response".to_string()));
        }
    }
}

/// Completion of one async observer call
pub struct AsyncCall {
    call_id: CallId,
    receiver: oneshot::Receiver<AsyncCallResult>,
}

impl AsyncCall {
    pub fn call_id(&self) -> CallId {
        self.call_id
    }

    /// The result, if the call has settled already
    pub fn try_result(&mut self) -> Option<AsyncCallResult> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(ProxyError::CallDropped {
                call_id: self.call_id,
            })),
        }
    }
}

impl Future for AsyncCall {
    type Output = AsyncCallResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let call_id = self.call_id;
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(ProxyError::CallDropped { call_id })),
            Poll::Pending => Poll::Pending,
        }
    }
}
