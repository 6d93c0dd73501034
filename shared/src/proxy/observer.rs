use log::debug;

use crate::{
    proxy::{error::ObserverError, message::ProxyEvent, object_proxy::AsyncResponder},
    PropertyMap, Value,
};

/// Receiver-side object bound to an [`ObserverKey`](crate::ObserverKey).
///
/// Forwarded calls, partial property updates and replayed events addressed to
/// the key are delivered here. Observers apply them locally and must never
/// forward them again.
pub trait Observer {
    /// Perform a forwarded fire-and-forget method call
    fn call_method(&self, name: &str, args: &[Value]) -> Result<(), ObserverError>;

    /// Perform a forwarded async method call. The observer settles the call
    /// through `responder`, now or later.
    fn call_async_method(&self, name: &str, args: &[Value], responder: AsyncResponder) {
        let _ = args;
        responder.reject(
            ObserverError::UnknownMethod {
                name: name.to_string(),
            }
            .to_string(),
        );
    }

    /// Apply a partial property update. Applying the same update twice must
    /// leave the observer in the same state as applying it once.
    fn set_properties(&self, properties: &PropertyMap);

    /// Replay an event that was dispatched in the paired context
    fn dispatch_event(&self, event: &ProxyEvent) {
        debug!("Observer: ignoring event '{}'", event.name);
    }
}
