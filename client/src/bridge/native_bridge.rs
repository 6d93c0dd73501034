use orb_shared::Value;

use crate::bridge::error::BridgeError;

/// Synchronous request primitive into native code.
///
/// A call blocks the calling context until the native layer returns and is
/// atomic with respect to that context's other work.
pub trait NativeBridge {
    fn request(&self, method: &str, params: Value) -> Result<Value, BridgeError>;
}
