//! Keyed query cache with staleness, deduplication, invalidation and cancellation.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::api::ApiError;

/// A boxed future resolving to a fetch result
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send>>;

/// Shared factory for fetch futures. Receives the token that cancels the fetch.
pub type Fetcher<V> = Arc<dyn Fn(CancellationToken) -> BoxFuture<V> + Send + Sync>;

/// Wrap a closure into a [`Fetcher`]
pub fn fetcher<V, F, Fut>(f: F) -> Fetcher<V>
where
  F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
{
  Arc::new(move |token| Box::pin(f(token)))
}

/// Cache key: an operation name plus its parameters
pub trait QueryKey: Clone + Eq + Hash + Debug + Send + 'static {
  /// Operation shared by every key of the same kind, used for non-exact invalidation
  fn operation(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
  Idle,
  Fetching,
  Success,
  Error,
}

#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
  /// Data younger than this is served without refetching
  pub stale_time: Duration,
  /// Disabled queries never fetch
  pub enabled: bool,
}

impl Default for QueryOptions {
  fn default() -> Self {
    Self {
      stale_time: Duration::ZERO,
      enabled: true,
    }
  }
}

impl QueryOptions {
  pub fn stale_after(stale_time: Duration) -> Self {
    Self {
      stale_time,
      ..Default::default()
    }
  }

  #[cfg(test)]
  pub fn enabled(mut self, enabled: bool) -> Self {
    self.enabled = enabled;
    self
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InvalidateOptions {
  /// Only the given key, instead of every key of the same operation
  pub exact: bool,
}

impl InvalidateOptions {
  pub fn exact() -> Self {
    Self { exact: true }
  }
}

struct InFlight {
  id: u64,
  token: CancellationToken,
  /// Status to restore if the fetch is cancelled
  resume: FetchStatus,
}

/// State of one cached query
pub struct CacheEntry<V> {
  data: Option<V>,
  error: Option<ApiError>,
  status: FetchStatus,
  updated_at: Option<Instant>,
  fetch_seq: u64,
  invalidated: bool,
  observers: usize,
  last_accessed: Instant,
  in_flight: Option<InFlight>,
  fetcher: Option<Fetcher<V>>,
}

impl<V> CacheEntry<V> {
  fn new() -> Self {
    Self {
      data: None,
      error: None,
      status: FetchStatus::Idle,
      updated_at: None,
      fetch_seq: 0,
      invalidated: false,
      observers: 0,
      last_accessed: Instant::now(),
      in_flight: None,
      fetcher: None,
    }
  }

  pub fn data(&self) -> Option<&V> {
    self.data.as_ref()
  }

  /// Error of the last failed fetch, cleared by the next success
  pub fn error(&self) -> Option<&ApiError> {
    self.error.as_ref()
  }

  pub fn status(&self) -> FetchStatus {
    self.status
  }

  pub fn is_fetching(&self) -> bool {
    self.in_flight.is_some()
  }

  /// Fetching with nothing to show yet
  pub fn is_loading(&self) -> bool {
    self.is_fetching() && self.data.is_none()
  }

  /// Number of successful fetches so far; direct writes do not count
  pub fn fetch_seq(&self) -> u64 {
    self.fetch_seq
  }

  #[cfg(test)]
  pub fn is_invalidated(&self) -> bool {
    self.invalidated
  }

  #[cfg(test)]
  pub fn observers(&self) -> usize {
    self.observers
  }

  fn is_stale(&self, stale_time: Duration) -> bool {
    match self.updated_at {
      Some(at) => self.invalidated || at.elapsed() >= stale_time,
      None => true,
    }
  }
}

impl<V: Debug> Debug for CacheEntry<V> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CacheEntry")
      .field("data", &self.data)
      .field("status", &self.status)
      .field("fetch_seq", &self.fetch_seq)
      .field("invalidated", &self.invalidated)
      .field("observers", &self.observers)
      .field("fetching", &self.in_flight.is_some())
      .finish_non_exhaustive()
  }
}

struct Settled<K, V> {
  key: K,
  fetch_id: u64,
  result: Result<V, ApiError>,
  /// When the response arrived, not when it was polled
  at: Instant,
}

/// Query cache shared by every view of the app.
///
/// The cache is owned by one task and mutated through `&mut self`; fetches run
/// as spawned tasks and report back over a channel that [`poll`](Self::poll)
/// drains. At most one fetch per key is in flight.
pub struct QueryCache<K, V> {
  entries: HashMap<K, CacheEntry<V>>,
  tx: mpsc::UnboundedSender<Settled<K, V>>,
  rx: mpsc::UnboundedReceiver<Settled<K, V>>,
  next_fetch_id: u64,
  gc_time: Duration,
}

impl<K: QueryKey, V: Clone + Send + 'static> QueryCache<K, V> {
  pub fn new() -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self {
      entries: HashMap::new(),
      tx,
      rx,
      next_fetch_id: 0,
      gc_time: Duration::from_secs(5 * 60),
    }
  }

  /// How long an unobserved, idle entry is kept
  #[cfg(test)]
  pub fn with_gc_time(mut self, gc_time: Duration) -> Self {
    self.gc_time = gc_time;
    self
  }

  /// Peek at an entry without subscribing or fetching
  pub fn get(&self, key: &K) -> Option<&CacheEntry<V>> {
    self.entries.get(key)
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Subscribe to `key` and fetch if its data is missing, invalidated or stale.
  ///
  /// A fetch already in flight for the key is reused.
  pub fn read(&mut self, key: K, fetcher: Fetcher<V>, options: QueryOptions) -> &CacheEntry<V> {
    self.prepare(&key, fetcher).observers += 1;
    self.ensure_fresh(&key, options);
    &self.entries[&key]
  }

  /// Populate `key` ahead of a read, without subscribing
  pub fn prefetch(&mut self, key: K, fetcher: Fetcher<V>, options: QueryOptions) {
    self.prepare(&key, fetcher);
    self.ensure_fresh(&key, options);
  }

  /// Drop a subscription taken by [`read`](Self::read)
  pub fn unsubscribe(&mut self, key: &K) {
    if let Some(entry) = self.entries.get_mut(key) {
      entry.observers = entry.observers.saturating_sub(1);
      entry.last_accessed = Instant::now();
    }
  }

  /// Mark matching entries stale. Observed entries refetch right away.
  pub fn invalidate(&mut self, key: &K, options: InvalidateOptions) {
    let matching: Vec<K> = self
      .entries
      .keys()
      .filter(|k| {
        if options.exact {
          *k == key
        } else {
          k.operation() == key.operation()
        }
      })
      .cloned()
      .collect();

    for k in matching {
      let observed = match self.entries.get_mut(&k) {
        Some(entry) => {
          entry.invalidated = true;
          entry.observers > 0
        }
        None => continue,
      };
      debug!(key = ?k, observed, "invalidated query");

      if observed {
        // Results of a fetch started before the invalidation may already be outdated
        self.cancel(&k);
        self.start_fetch(&k);
      }
    }
  }

  /// Abort the in-flight fetch for `key`, leaving prior data untouched
  pub fn cancel(&mut self, key: &K) {
    let Some(entry) = self.entries.get_mut(key) else {
      return;
    };
    if let Some(in_flight) = entry.in_flight.take() {
      in_flight.token.cancel();
      entry.status = in_flight.resume;
      debug!(key = ?key, fetch_id = in_flight.id, "cancelled query");
    }
  }

  /// Seed `key` with data, without a network round-trip
  pub fn write(&mut self, key: K, data: V) {
    debug!(key = ?key, "writing query data");
    let entry = self.entries.entry(key).or_insert_with(CacheEntry::new);
    let now = Instant::now();
    entry.data = Some(data);
    entry.error = None;
    entry.status = FetchStatus::Success;
    entry.updated_at = Some(now);
    entry.invalidated = false;
    entry.last_accessed = now;
  }

  /// Apply settled fetches and collect idle entries.
  ///
  /// Returns `true` if any entry changed.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;

    while let Ok(settled) = self.rx.try_recv() {
      let Some(entry) = self.entries.get_mut(&settled.key) else {
        continue;
      };
      // Superseded or cancelled fetch
      if entry.in_flight.as_ref().map(|f| f.id) != Some(settled.fetch_id) {
        trace!(key = ?settled.key, fetch_id = settled.fetch_id, "dropping stale fetch result");
        continue;
      }
      entry.in_flight = None;

      match settled.result {
        Ok(data) => {
          debug!(key = ?settled.key, "query succeeded");
          entry.data = Some(data);
          entry.error = None;
          entry.status = FetchStatus::Success;
          entry.updated_at = Some(settled.at);
          entry.fetch_seq += 1;
          entry.invalidated = false;
        }
        Err(e) => {
          debug!(key = ?settled.key, error = %e, "query failed");
          entry.error = Some(e);
          entry.status = FetchStatus::Error;
        }
      }
      changed = true;
    }

    self.collect_garbage();
    changed
  }

  /// Cancel every in-flight fetch and drop all entries
  pub fn clear(&mut self) {
    for entry in self.entries.values_mut() {
      if let Some(in_flight) = entry.in_flight.take() {
        in_flight.token.cancel();
      }
    }
    self.entries.clear();
  }

  fn prepare(&mut self, key: &K, fetcher: Fetcher<V>) -> &mut CacheEntry<V> {
    let entry = self
      .entries
      .entry(key.clone())
      .or_insert_with(CacheEntry::new);
    entry.fetcher = Some(fetcher);
    entry.last_accessed = Instant::now();
    entry
  }

  fn ensure_fresh(&mut self, key: &K, options: QueryOptions) {
    if !options.enabled {
      return;
    }
    let Some(entry) = self.entries.get(key) else {
      return;
    };
    if entry.in_flight.is_some() {
      trace!(key = ?key, "reusing in-flight fetch");
      return;
    }
    if entry.data.is_some() && !entry.is_stale(options.stale_time) {
      trace!(key = ?key, "serving fresh data");
      return;
    }
    self.start_fetch(key);
  }

  fn start_fetch(&mut self, key: &K) {
    let fetch_id = self.next_fetch_id;
    let tx = self.tx.clone();
    let Some(entry) = self.entries.get_mut(key) else {
      return;
    };
    let Some(fetcher) = entry.fetcher.clone() else {
      return;
    };
    self.next_fetch_id += 1;

    let token = CancellationToken::new();
    entry.in_flight = Some(InFlight {
      id: fetch_id,
      token: token.clone(),
      resume: entry.status,
    });
    entry.status = FetchStatus::Fetching;
    debug!(key = ?key, fetch_id, "starting fetch");

    let future = fetcher(token.clone());
    let key = key.clone();
    tokio::spawn(async move {
      let result = tokio::select! {
        _ = token.cancelled() => return,
        result = future => result,
      };
      // Receiver is gone once the cache is dropped
      let _ = tx.send(Settled {
        key,
        fetch_id,
        result,
        at: Instant::now(),
      });
    });
  }

  fn collect_garbage(&mut self) {
    let gc_time = self.gc_time;
    self.entries.retain(|key, entry| {
      let keep = entry.observers > 0
        || entry.in_flight.is_some()
        || entry.last_accessed.elapsed() < gc_time;
      if !keep {
        trace!(key = ?key, "evicting idle query");
      }
      keep
    });
  }
}

impl<K: QueryKey, V: Clone + Send + 'static> Default for QueryCache<K, V> {
  fn default() -> Self {
    Self::new()
  }
}
