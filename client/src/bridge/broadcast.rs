use std::rc::Rc;

use log::debug;
use serde_json::json;

use crate::{
    bridge::{error::BridgeError, native_bridge::NativeBridge},
    search::{Query, QueryId},
};

/// Broadcast requests of the native bridge
#[derive(Clone)]
pub struct BroadcastBridge {
    bridge: Rc<dyn NativeBridge>,
}

impl BroadcastBridge {
    pub fn new(bridge: Rc<dyn NativeBridge>) -> Self {
        Self { bridge }
    }

    /// Ask the native layer to run `query`. Results arrive later as
    /// `MetadataSearch` events tagged with the query id.
    pub fn start_search(
        &self,
        query: &Query,
        offset: u32,
        count: Option<u32>,
        channel_constraints: &[String],
    ) -> Result<(), BridgeError> {
        debug!("Broadcast: starting search {}", query.id());
        self.bridge.request(
            "Broadcast.startSearch",
            json!({
                "channelConstraints": channel_constraints,
                "count": count,
                "offset": offset,
                "query": query.to_json(),
            }),
        )?;
        Ok(())
    }

    /// Best-effort request to stop producing events for `query_id`
    pub fn abort_search(&self, query_id: QueryId) -> Result<(), BridgeError> {
        debug!("Broadcast: aborting search {}", query_id);
        self.bridge.request(
            "Broadcast.abortSearch",
            json!({ "queryId": query_id.as_u64() }),
        )?;
        Ok(())
    }
}
