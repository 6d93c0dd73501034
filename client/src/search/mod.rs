mod error;
mod metadata_search;
mod programme;
mod query;
mod search_config;
mod search_manager;
mod search_results;


pub use error::SearchError;
pub use metadata_search::{
    next_state, MetadataSearch, MetadataSearchEvent, SearchState, SearchStatus,
    METADATA_SEARCH_EVENT,
};
pub use programme::Programme;
pub use query::{Comparison, Query, QueryExpr, QueryId, SearchField};
pub use search_config::SearchConfig;
pub use search_manager::{
    SearchId, SearchListener, SearchListenerId, SearchManager, SearchNotification,
};
pub use search_results::SearchResults;
