mod local;

pub use local::{local_channel, LocalReceiver, LocalSender};

use crate::proxy::{error::ProxyError, message::ProxyEnvelope};

/// Moves envelopes to the paired context.
///
/// Implementations must not deliver synchronously into the paired proxy from
/// within `send`; delivery happens later as a queued callback.
pub trait ProxyTransport {
    fn send(&mut self, envelope: ProxyEnvelope) -> Result<(), ProxyError>;
}
