//! # Orb Shared
//! The context-symmetric half of the orb proxy protocol: observers bound to
//! keys, forwarded calls and partial property updates, replayed events, and
//! correlation of asynchronous replies.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod correlation;
mod diff;
mod key_generator;
mod proxy;
mod transport;
mod types;

pub use correlation::{
    broker::{CorrelationBroker, PendingOperation},
    error::CorrelationError,
};
pub use diff::{
    diff_mask::DiffMask,
    error::PropertyDiffError,
    mirrored_properties::{MirroredProperties, PropertyAccess, PropertyDef},
};
pub use key_generator::KeyGenerator;
pub use proxy::{
    error::{ObserverError, ProxyError},
    message::{AsyncCallOutcome, ProxyEnvelope, ProxyEvent, ProxyMessage},
    object_proxy::{AsyncCall, AsyncCallResult, AsyncResponder, LinkState, ObjectProxy},
    observer::Observer,
    proxy_config::ProxyConfig,
    registry::ObserverRegistry,
};
pub use transport::{local_channel, LocalReceiver, LocalSender, ProxyTransport};
pub use types::{CallId, ObserverKey, Origin, PropertyMap, SessionId, Value};
