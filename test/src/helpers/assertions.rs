/// Assert that a search sits in `$state` with an untouched result page
#[macro_export]
macro_rules! assert_search_untouched {
    ($search:expr, $state:expr) => {
        assert_eq!($search.state(), $state, "search state changed");
        let results = $search.result().expect("broadcast related");
        assert!(results.is_empty(), "results were mutated");
        assert_eq!(results.offset(), 0, "offset was mutated");
        assert_eq!(results.total_size(), 0, "total size was mutated");
    };
}

/// Assert that nothing is queued or travelling between two contexts
#[macro_export]
macro_rules! assert_quiet {
    ($contexts:expr) => {
        assert_eq!($contexts.in_flight(), 0, "envelopes still in flight");
        assert_eq!(
            $contexts.main.pending_message_count(),
            0,
            "main has queued messages"
        );
        assert_eq!(
            $contexts.frame.pending_message_count(),
            0,
            "frame has queued messages"
        );
    };
}
