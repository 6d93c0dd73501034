use std::{
    cell::RefCell,
    collections::VecDeque,
    rc::{Rc, Weak},
};

use crate::{
    proxy::{error::ProxyError, message::ProxyEnvelope},
    transport::ProxyTransport,
};

/// Sending half of an in-process channel. Envelopes are serialized to JSON, the
/// way a `postMessage` between two browsing contexts would carry them.
pub struct LocalSender {
    queue: Weak<RefCell<VecDeque<String>>>,
}

impl ProxyTransport for LocalSender {
    fn send(&mut self, envelope: ProxyEnvelope) -> Result<(), ProxyError> {
        let Some(queue) = self.queue.upgrade() else {
            return Err(ProxyError::TransportClosed {
                message: envelope.message.name(),
            });
        };
        let raw = envelope.encode()?;
        queue.borrow_mut().push_back(raw);
        Ok(())
    }
}

/// Receiving half of an in-process channel
#[derive(Clone)]
pub struct LocalReceiver {
    queue: Rc<RefCell<VecDeque<String>>>,
}

impl LocalReceiver {
    pub fn pop(&self) -> Option<String> {
        self.queue.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Inject raw data, e.g. a malformed or replayed message
    pub fn push_raw(&self, raw: impl Into<String>) {
        self.queue.borrow_mut().push_back(raw.into());
    }
}

/// One queue: whatever the sender sends, the receiver pops
pub fn local_channel() -> (LocalSender, LocalReceiver) {
    let queue = Rc::new(RefCell::new(VecDeque::new()));
    (
        LocalSender {
            queue: Rc::downgrade(&queue),
        },
        LocalReceiver { queue },
    )
}
