use thiserror::Error;

use crate::{
    bridge::BridgeError,
    search::{
        metadata_search::{SearchState, SearchStatus},
        query::QueryId,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// The application is broadcast-independent and may not use metadata
    /// search
    #[error("SecurityError: broadcast-independent applications may not search")]
    Security,

    /// Queries may only compare against a known programme field
    #[error("Unsupported field to compare: {field}")]
    UnsupportedField { field: String },

    /// The native layer refused or failed a search request
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// A well-formed event that is not valid in the current state
    #[error("Received MetadataSearch status {status:?} while {state:?}")]
    UnhandledTransition {
        state: SearchState,
        status: SearchStatus,
    },

    /// The event belongs to a query that is no longer active
    #[error("Ignoring MetadataSearch event for inactive query {id}")]
    StaleCorrelation { id: QueryId },

    /// No query has been set on the search
    #[error("No query has been set")]
    NoQuery,

    /// The search behind a results handle no longer exists
    #[error("The search has been released")]
    SearchReleased,
}
