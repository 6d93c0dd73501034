use std::{
    cell::RefCell,
    rc::{Rc, Weak},
    time::{SystemTime, UNIX_EPOCH},
};

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use orb_shared::{CorrelationBroker, Value};

use crate::{
    bridge::{BridgeError, BridgeEvent, BroadcastBridge, Subscription},
    search::{
        error::SearchError,
        programme::Programme,
        query::{Comparison, Query, QueryId, SearchField},
        search_config::SearchConfig,
        search_manager::{ManagerCore, SearchId, SearchNotification},
        search_results::{ResultSet, SearchResults},
    },
};

/// Bridge event kind carrying search progress
pub const METADATA_SEARCH_EVENT: &str = "MetadataSearch";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchState {
    Idle,
    Searching,
    Found,
}

/// Progress codes carried by `MetadataSearch` events
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum SearchStatus {
    /// -1, the search has been started
    Started,
    /// 0, a page of results is available
    Found,
    /// 3, the search was aborted
    Aborted,
    /// 4, the native layer ran out of resources
    NoResources,
    Other(i32),
}

impl From<i32> for SearchStatus {
    fn from(code: i32) -> Self {
        match code {
            -1 => SearchStatus::Started,
            0 => SearchStatus::Found,
            3 => SearchStatus::Aborted,
            4 => SearchStatus::NoResources,
            other => SearchStatus::Other(other),
        }
    }
}

impl From<SearchStatus> for i32 {
    fn from(status: SearchStatus) -> Self {
        match status {
            SearchStatus::Started => -1,
            SearchStatus::Found => 0,
            SearchStatus::Aborted => 3,
            SearchStatus::NoResources => 4,
            SearchStatus::Other(code) => code,
        }
    }
}

/// The search state machine. Pairs missing here leave the search untouched.
pub fn next_state(state: SearchState, status: SearchStatus) -> Option<SearchState> {
    match (state, status) {
        (SearchState::Idle, SearchStatus::Started) => Some(SearchState::Searching),
        (SearchState::Searching, SearchStatus::Found) => Some(SearchState::Found),
        (SearchState::Searching, SearchStatus::Aborted | SearchStatus::NoResources) => {
            Some(SearchState::Idle)
        }
        (SearchState::Found, SearchStatus::Started) => Some(SearchState::Searching),
        (SearchState::Found, SearchStatus::Aborted) => Some(SearchState::Idle),
        _ => None,
    }
}

/// Search progress reported by the native layer, or injected locally
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataSearchEvent {
    pub search: QueryId,
    pub status: SearchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub programme_list: Option<Vec<Programme>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    /// Total number of results; the requested count on a start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_size: Option<u32>,
}

impl MetadataSearchEvent {
    pub fn new(search: QueryId, status: SearchStatus) -> Self {
        Self {
            search,
            status,
            programme_list: None,
            offset: None,
            total_size: None,
        }
    }

    pub fn with_results(mut self, programmes: Vec<Programme>, offset: u32, total_size: u32) -> Self {
        self.programme_list = Some(programmes);
        self.offset = Some(offset);
        self.total_size = Some(total_size);
        self
    }

    pub fn with_window(mut self, offset: u32, count: u32) -> Self {
        self.offset = Some(offset);
        self.total_size = Some(count);
        self
    }
}

struct SearchOperation {
    query: Option<Query>,
    channel_constraints: Vec<String>,
    state: SearchState,
    results: ResultSet,
    correlation: CorrelationBroker<QueryId, ()>,
}

pub(crate) struct SearchCore {
    id: SearchId,
    target: u32,
    config: SearchConfig,
    manager: Weak<ManagerCore>,
    broadcast: BroadcastBridge,
    operation: RefCell<SearchOperation>,
}

impl SearchCore {
    fn check_broadcast_related(&self) -> Result<(), SearchError> {
        match self.manager.upgrade() {
            Some(manager) if manager.is_broadcast_independent() => Err(SearchError::Security),
            _ => Ok(()),
        }
    }

    pub(crate) fn with_results<R>(&self, reader: impl FnOnce(&ResultSet) -> R) -> R {
        reader(&self.operation.borrow().results)
    }

    fn state(&self) -> SearchState {
        self.operation.borrow().state
    }

    pub(crate) fn handle_event(
        &self,
        event: &MetadataSearchEvent,
    ) -> Result<SearchState, SearchError> {
        let (state, next) = {
            let mut operation = self.operation.borrow_mut();
            if operation.correlation.get_mut(&event.search).is_none() {
                return Err(SearchError::StaleCorrelation { id: event.search });
            }
            let state = operation.state;
            match next_state(state, event.status) {
                Some(next) => (state, next),
                None => {
                    error!(
                        "MetadataSearch: received status {:?} while {:?}, dropping event",
                        event.status, state
                    );
                    return Err(SearchError::UnhandledTransition {
                        state,
                        status: event.status,
                    });
                }
            }
        };

        if event.status == SearchStatus::Started {
            self.start_search(event)?;
        }

        {
            let mut operation = self.operation.borrow_mut();
            // the bridge call may have superseded this query
            if !operation.correlation.is_pending(&event.search) || operation.state != state {
                debug!("MetadataSearch: query {} superseded", event.search);
                return Err(SearchError::StaleCorrelation { id: event.search });
            }
            operation.state = next;
            // only a FOUND carries results; payloads on other statuses are ignored
            if let (SearchStatus::Found, Some(programmes)) = (event.status, &event.programme_list) {
                let total_size = event.total_size.unwrap_or(programmes.len() as u32);
                operation
                    .results
                    .set(programmes.clone(), event.offset.unwrap_or(0), total_size);
            }
        }

        if event.status != SearchStatus::Started {
            self.notify_manager(event.search, event.status);
        }
        Ok(next)
    }

    fn start_search(&self, event: &MetadataSearchEvent) -> Result<(), SearchError> {
        let (query, channel_constraints) = {
            let operation = self.operation.borrow();
            let query = operation.query.clone().ok_or(SearchError::NoQuery)?;
            (query, operation.channel_constraints.clone())
        };
        self.broadcast
            .start_search(
                &query,
                event.offset.unwrap_or(0),
                event.total_size,
                &channel_constraints,
            )
            .map_err(|err| self.bridge_failure(err))
    }

    fn bridge_failure(&self, err: BridgeError) -> SearchError {
        warn!("MetadataSearch: {}", err);
        if err.is_security() {
            if let Some(manager) = self.manager.upgrade() {
                manager.mark_broadcast_independent();
            }
        }
        SearchError::Bridge(err)
    }

    fn notify_manager(&self, query_id: QueryId, status: SearchStatus) {
        let Some(manager) = self.manager.upgrade() else {
            return;
        };
        manager.dispatch(&SearchNotification {
            search: self.id,
            query_id,
            status,
        });
    }

    /// Replace the active query. A search in progress is aborted first, then
    /// the new query becomes the only correlation accepted.
    fn install_query(&self, query: Query) {
        let superseded = {
            let operation = self.operation.borrow();
            operation.query.is_some() && operation.state != SearchState::Idle
        };
        if superseded {
            if let Err(err) = self.abort() {
                warn!("MetadataSearch: abort before new query failed: {}", err);
            }
        }

        let mut operation = self.operation.borrow_mut();
        operation.correlation.cancel_all();
        if let Err(err) = operation.correlation.track(query.id(), ()) {
            warn!("MetadataSearch: {}", err);
        }
        info!("MetadataSearch: active query is now {}", query.id());
        operation.query = Some(query);
        operation.results = ResultSet::default();
        operation.state = SearchState::Idle;
    }

    pub(crate) fn get_results(
        &self,
        offset: u32,
        count: Option<u32>,
    ) -> Result<SearchState, SearchError> {
        let query_id = {
            let mut operation = self.operation.borrow_mut();
            let query_id = operation
                .query
                .as_ref()
                .map(Query::id)
                .ok_or(SearchError::NoQuery)?;
            operation.results.items.clear();
            query_id
        };
        let count = count.unwrap_or(self.config.default_count);
        self.handle_event(
            &MetadataSearchEvent::new(query_id, SearchStatus::Started).with_window(offset, count),
        )
    }

    /// Cancels locally right away; the native side is told best-effort and
    /// any reply still in flight is stale.
    pub(crate) fn abort(&self) -> Result<(), SearchError> {
        let (query_id, state) = {
            let mut operation = self.operation.borrow_mut();
            let Some(query_id) = operation.query.as_ref().map(Query::id) else {
                return Ok(());
            };
            operation.results.items.clear();
            (query_id, operation.state)
        };

        let native = self
            .broadcast
            .abort_search(query_id)
            .map_err(|err| self.bridge_failure(err));

        if state == SearchState::Idle {
            debug!("MetadataSearch: query {} is not running", query_id);
        } else if let Err(err) =
            self.handle_event(&MetadataSearchEvent::new(query_id, SearchStatus::Aborted))
        {
            debug!("MetadataSearch: {}", err);
        }
        native
    }
}

/// A metadata search created by a [`SearchManager`](crate::SearchManager).
///
/// Progress events are received for as long as the search lives; dropping it
/// releases its bridge subscription.
pub struct MetadataSearch {
    core: Rc<SearchCore>,
    _subscription: Subscription,
}

impl MetadataSearch {
    pub(crate) fn new(id: SearchId, target: u32, manager: &Rc<ManagerCore>) -> Self {
        let core = Rc::new(SearchCore {
            id,
            target,
            config: manager.config().clone(),
            manager: Rc::downgrade(manager),
            broadcast: manager.broadcast().clone(),
            operation: RefCell::new(SearchOperation {
                query: None,
                channel_constraints: Vec::new(),
                state: SearchState::Idle,
                results: ResultSet::default(),
                correlation: CorrelationBroker::new(),
            }),
        });

        let weak_core = Rc::downgrade(&core);
        let subscription = manager.events().subscribe(
            METADATA_SEARCH_EVENT,
            Rc::new(move |event: &BridgeEvent| {
                let Some(core) = weak_core.upgrade() else {
                    return;
                };
                match event.decode::<MetadataSearchEvent>() {
                    Ok(event) => {
                        if let Err(err) = core.handle_event(&event) {
                            debug!("MetadataSearch: {}", err);
                        }
                    }
                    Err(err) => warn!("MetadataSearch: undecodable event: {}", err),
                }
            }),
        );

        Self {
            core,
            _subscription: subscription,
        }
    }

    pub fn id(&self) -> SearchId {
        self.core.id
    }

    pub fn state(&self) -> SearchState {
        self.core.state()
    }

    pub fn query(&self) -> Option<Query> {
        self.core.operation.borrow().query.clone()
    }

    pub fn channel_constraints(&self) -> Vec<String> {
        self.core.operation.borrow().channel_constraints.clone()
    }

    pub fn search_target(&self) -> Result<u32, SearchError> {
        self.core.check_broadcast_related()?;
        Ok(self.core.target)
    }

    pub fn result(&self) -> Result<SearchResults, SearchError> {
        self.core.check_broadcast_related()?;
        Ok(SearchResults::new(Rc::downgrade(&self.core)))
    }

    pub fn set_query(&self, query: Query) -> Result<(), SearchError> {
        self.core.check_broadcast_related()?;
        self.core.install_query(query);
        Ok(())
    }

    /// Restrict the search to `channel`, or lift every restriction with
    /// `None`. The current query is reissued under a new id.
    pub fn add_channel_constraint(&self, channel: Option<&str>) -> Result<(), SearchError> {
        self.core.check_broadcast_related()?;
        let query = {
            let mut operation = self.core.operation.borrow_mut();
            match channel {
                None => operation.channel_constraints.clear(),
                Some(ccid) => {
                    if !operation.channel_constraints.iter().any(|c| c == ccid) {
                        operation.channel_constraints.push(ccid.to_string());
                    }
                }
            }
            operation.query.as_ref().map(Query::reissued)
        };
        if let Some(query) = query {
            self.core.install_query(query);
        }
        Ok(())
    }

    pub fn create_query(
        &self,
        field: &str,
        comparison: Comparison,
        value: impl Into<Value>,
    ) -> Result<Query, SearchError> {
        self.core.check_broadcast_related()?;
        let field = field.parse::<SearchField>().map_err(|err| {
            error!("MetadataSearch: {}", err);
            err
        })?;
        Ok(Query::new(field, comparison, value))
    }

    /// Search `channel` for programmes ending after `start_time` (seconds
    /// since the epoch), or after now
    pub fn find_programmes_from_stream(
        &self,
        channel: &str,
        start_time: Option<i64>,
    ) -> Result<(), SearchError> {
        self.core.check_broadcast_related()?;
        let start_time = start_time.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
                .unwrap_or_default()
        });
        self.core.operation.borrow_mut().channel_constraints = vec![channel.to_string()];
        self.core
            .install_query(Query::new(SearchField::EndTime, Comparison::Greater, start_time));
        Ok(())
    }

    /// Deliver a progress event. Events for any query but the active one are
    /// returned as [`SearchError::StaleCorrelation`] without side effects.
    pub fn handle_event(&self, event: &MetadataSearchEvent) -> Result<SearchState, SearchError> {
        self.core.handle_event(event)
    }
}
