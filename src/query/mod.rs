//! Async query and mutation state for data fetching.
//!
//! Inspired by TanStack Query:
//! - [`QueryCache`] holds one entry per key (data, fetch status, staleness,
//!   the in-flight request) and deduplicates concurrent fetches
//! - [`Mutation`] runs writes and reports their outcome once, so callers can
//!   invalidate or seed cache entries explicitly
//!
//! # Example
//!
//! ```ignore
//! let mut cache: QueryCache<StudentKey, StudentData> = QueryCache::new();
//!
//! // On mount
//! cache.read(key.clone(), fetcher, QueryOptions::stale_after(Duration::from_secs(5)));
//!
//! // In event loop tick
//! if cache.poll() {
//!     // Some entry changed, re-render
//! }
//!
//! // In render
//! match cache.get(&key) {
//!     Some(entry) if entry.is_loading() => render_spinner(),
//!     Some(entry) => render_data(entry.data()),
//!     None => {}
//! }
//! ```

mod cache;
mod mutation;

pub use cache::{
  fetcher, FetchStatus, Fetcher, InvalidateOptions, QueryCache, QueryKey, QueryOptions,
};
pub use mutation::{Mutation, MutationState};
