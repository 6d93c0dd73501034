use std::{default::Default, time::Duration};

/// Contains Config properties which will be used by an ObjectProxy
#[derive(Clone, Debug)]
pub struct ProxyConfig {
    /// How long an async observer call may wait for the paired context before
    /// it resolves as timed out
    pub async_call_timeout: Duration,
    /// Upper bound on messages queued while no session is established. The
    /// oldest message is dropped when the queue is full.
    pub max_pending_messages: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            async_call_timeout: Duration::from_secs(10),
            max_pending_messages: 256,
        }
    }
}
