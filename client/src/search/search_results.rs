use std::rc::Weak;

use crate::search::{error::SearchError, metadata_search::SearchCore, programme::Programme};

/// Items, window offset and total size of the latest page of results
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct ResultSet {
    pub(crate) items: Vec<Programme>,
    pub(crate) offset: u32,
    pub(crate) total_size: u32,
}

impl ResultSet {
    pub(crate) fn set(&mut self, items: Vec<Programme>, offset: u32, total_size: u32) {
        self.items = items;
        self.offset = offset;
        self.total_size = total_size;
    }
}

/// View of the results of a [`MetadataSearch`](crate::MetadataSearch).
///
/// Holds no ownership over the search; once the search is dropped the view
/// reads as empty and its requests fail with
/// [`SearchError::SearchReleased`].
#[derive(Clone)]
pub struct SearchResults {
    search: Weak<SearchCore>,
}

impl SearchResults {
    pub(crate) fn new(search: Weak<SearchCore>) -> Self {
        Self { search }
    }

    fn read<R: Default>(&self, reader: impl FnOnce(&ResultSet) -> R) -> R {
        match self.search.upgrade() {
            Some(search) => search.with_results(reader),
            None => R::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.read(|results| results.items.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn offset(&self) -> u32 {
        self.read(|results| results.offset)
    }

    pub fn total_size(&self) -> u32 {
        self.read(|results| results.total_size)
    }

    pub fn item(&self, index: usize) -> Option<Programme> {
        self.read(|results| results.items.get(index).cloned())
    }

    pub fn items(&self) -> Vec<Programme> {
        self.read(|results| results.items.clone())
    }

    /// Clear the current page and request `count` results starting at
    /// `offset`. The page is filled in when the native layer reports them.
    pub fn get_results(&self, offset: u32, count: Option<u32>) -> Result<(), SearchError> {
        let search = self.search.upgrade().ok_or(SearchError::SearchReleased)?;
        search.get_results(offset, count)?;
        Ok(())
    }

    /// Stop the running search and clear the current page
    pub fn abort(&self) -> Result<(), SearchError> {
        let search = self.search.upgrade().ok_or(SearchError::SearchReleased)?;
        search.abort()
    }
}
