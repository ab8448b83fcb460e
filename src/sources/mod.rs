/// Listing sources feeding the descriptor pipeline
///
/// Three adapters turn remote content into candidates: the episode feed, the
/// season index page and keyword search pages. Retrieval itself goes through
/// the [`fetch`] capabilities so it can be swapped out in tests.

pub mod feed;
pub mod fetch;
pub mod listing;
pub mod search;

// Re-export main types
pub use feed::{parse_feed, FeedEntry};
pub use fetch::{HttpClient, HttpFetcher, PageRenderer};
pub use listing::{extract_candidates, ListingPage};
pub use search::{extract_stream_source, parse_search_results, SearchResult};
