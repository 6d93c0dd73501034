use std::cell::RefCell;

use serde_json::json;

use orb_client::{
    BridgeError, BridgeEvent, BridgeEvents, MetadataSearchEvent, NativeBridge,
    METADATA_SEARCH_EVENT,
};
use orb_shared::Value;

/// Native layer double: records every request and answers `true`, or a
/// configured error
#[derive(Default)]
pub struct FakeBridge {
    requests: RefCell<Vec<(String, Value)>>,
    failure: RefCell<Option<BridgeError>>,
    pub events: BridgeEvents,
}

impl FakeBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every following request fails with `error`
    pub fn fail_with(&self, error: BridgeError) {
        *self.failure.borrow_mut() = Some(error);
    }

    pub fn refuse_as_security_error(&self, method: &str) {
        self.fail_with(BridgeError::Security {
            method: method.to_string(),
        });
    }

    pub fn recover(&self) {
        *self.failure.borrow_mut() = None;
    }

    pub fn requests(&self, method: &str) -> Vec<Value> {
        self.requests
            .borrow()
            .iter()
            .filter(|(name, _)| name == method)
            .map(|(_, params)| params.clone())
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    /// Deliver a search event the way the native layer would
    pub fn emit_search_event(&self, event: &MetadataSearchEvent) -> usize {
        let properties = serde_json::to_value(event).unwrap_or_else(|_| json!({}));
        self.events
            .dispatch(&BridgeEvent::new(METADATA_SEARCH_EVENT, properties))
    }
}

impl NativeBridge for FakeBridge {
    fn request(&self, method: &str, params: Value) -> Result<Value, BridgeError> {
        self.requests
            .borrow_mut()
            .push((method.to_string(), params));
        match self.failure.borrow().clone() {
            Some(error) => Err(error),
            None => Ok(Value::Bool(true)),
        }
    }
}
