mod broadcast;
mod error;
mod event_dispatcher;
mod native_bridge;

pub use broadcast::BroadcastBridge;
pub use error::BridgeError;
pub use event_dispatcher::{BridgeEvent, BridgeEvents, BridgeListener, Subscription};
pub use native_bridge::NativeBridge;
