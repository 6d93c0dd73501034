/// Contains Config properties which will be used by a
/// [`SearchManager`](crate::SearchManager)
#[derive(Clone, Debug)]
pub struct SearchConfig {
    /// The only search target that yields a search (programme metadata)
    pub supported_target: u32,
    /// Number of results requested when `get_results` is called without a
    /// count
    pub default_count: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            supported_target: 1,
            default_count: 10,
        }
    }
}
