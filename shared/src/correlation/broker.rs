use std::{
    collections::{HashMap, VecDeque},
    fmt::Debug,
    hash::Hash,
    time::{Duration, Instant},
};

use log::debug;

use crate::{correlation::error::CorrelationError, KeyGenerator};

/// An in-flight operation awaiting its asynchronous reply
pub struct PendingOperation<T> {
    issued_at: Instant,
    continuation: T,
}

impl<T> PendingOperation<T> {
    pub fn issued_at(&self) -> Instant {
        self.issued_at
    }

    pub fn continuation(&self) -> &T {
        &self.continuation
    }

    pub fn continuation_mut(&mut self) -> &mut T {
        &mut self.continuation
    }
}

/// Tags outgoing operations with monotonically increasing identifiers and
/// matches inbound replies back to the operation that requested them.
///
/// A reply whose identifier is not pending is stale and is never applied.
pub struct CorrelationBroker<K: From<u64> + Copy + Eq + Hash + Debug, T> {
    ids: KeyGenerator<K>,
    pending: HashMap<K, PendingOperation<T>>,
    ttls: VecDeque<(Instant, K)>,
    ttl: Option<Duration>,
}

impl<K: From<u64> + Copy + Eq + Hash + Debug, T> CorrelationBroker<K, T> {
    pub fn new() -> Self {
        Self {
            ids: KeyGenerator::new(),
            pending: HashMap::new(),
            ttls: VecDeque::new(),
            ttl: None,
        }
    }

    /// Pending operations older than `ttl` are handed back by [`expire`](Self::expire)
    pub fn with_ttl(ttl: Duration) -> Self {
        let mut broker = Self::new();
        broker.ttl = Some(ttl);
        broker
    }

    /// Mint a fresh identifier and register `continuation` under it
    pub fn issue(&mut self, continuation: T) -> K {
        let id = self.ids.generate();
        self.insert(id, continuation);
        id
    }

    /// Register an operation whose identifier was minted elsewhere
    pub fn track(&mut self, id: K, continuation: T) -> Result<(), CorrelationError> {
        if self.pending.contains_key(&id) {
            return Err(CorrelationError::AlreadyPending {
                id: format!("{:?}", id),
            });
        }
        self.insert(id, continuation);
        Ok(())
    }

    fn insert(&mut self, id: K, continuation: T) {
        let issued_at = Instant::now();
        if self.ttl.is_some() {
            self.ttls.push_back((issued_at, id));
        }
        self.pending.insert(
            id,
            PendingOperation {
                issued_at,
                continuation,
            },
        );
    }

    pub fn is_pending(&self, id: &K) -> bool {
        self.pending.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Match a reply without retiring the operation, for operations that
    /// receive several replies
    pub fn get_mut(&mut self, id: &K) -> Option<&mut PendingOperation<T>> {
        let pending = self.pending.get_mut(id);
        if pending.is_none() {
            debug!("CorrelationBroker: dropping stale reply for {:?}", id);
        }
        pending
    }

    /// Match a reply and retire the operation
    pub fn resolve(&mut self, id: &K) -> Option<T> {
        match self.pending.remove(id) {
            Some(pending) => {
                self.forget_ttl(id);
                Some(pending.continuation)
            }
            None => {
                debug!("CorrelationBroker: dropping stale reply for {:?}", id);
                None
            }
        }
    }

    pub fn try_resolve(&mut self, id: &K) -> Result<T, CorrelationError> {
        self.resolve(id)
            .ok_or_else(|| CorrelationError::StaleCorrelation {
                id: format!("{:?}", id),
            })
    }

    /// Retire an operation before its reply arrives. Any later reply is stale.
    pub fn cancel(&mut self, id: &K) -> Option<T> {
        let pending = self.pending.remove(id)?;
        self.forget_ttl(id);
        Some(pending.continuation)
    }

    pub fn cancel_all(&mut self) -> Vec<(K, T)> {
        self.ttls.clear();
        self.pending
            .drain()
            .map(|(id, pending)| (id, pending.continuation))
            .collect()
    }

    /// Retire and return every operation whose ttl has elapsed at `now`
    pub fn expire(&mut self, now: &Instant) -> Vec<(K, T)> {
        let Some(ttl) = self.ttl else {
            return Vec::new();
        };
        let mut expired = Vec::new();
        while let Some((issued_at, id)) = self.ttls.front() {
            if now.saturating_duration_since(*issued_at) < ttl {
                break;
            }
            let id = *id;
            self.ttls.pop_front();
            if let Some(pending) = self.pending.remove(&id) {
                expired.push((id, pending.continuation));
            }
        }
        expired
    }

    fn forget_ttl(&mut self, id: &K) {
        if let Some(index) = self.ttls.iter().position(|(_, ttl_id)| ttl_id == id) {
            self.ttls.remove(index);
        }
    }
}

impl<K: From<u64> + Copy + Eq + Hash + Debug, T> Default for CorrelationBroker<K, T> {
    fn default() -> Self {
        Self::new()
    }
}
