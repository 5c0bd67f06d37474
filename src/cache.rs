//! Query cache keyed by request identity
//!
//! Every `(kind, coin id)` pair owns one entry holding the last result, the
//! fetch in flight (at most one) and, for polled queries, a refetch timer.
//! Consumers register through [`QueryCache::get_or_fetch`] and receive a
//! [`QueryHandle`] backed by a `tokio::sync::watch` channel; awaiting
//! [`QueryHandle::changed`] is the re-render trigger.
//!
//! ```text
//! get_or_fetch(key) ──► Entry { state, in_flight, observers, refetch timer }
//!        │                     │
//!        ▼                     ▼ spawn
//!   QueryHandle ◄── watch ── fetch task (retry + backoff) ──► CoinDataProvider
//! ```
//!
//! Dropping the last handle for a key stops its refetch timer; the cached
//! result stays so a later mount renders immediately.

use crate::{
    constants::{INITIAL_BACKOFF_MS, MAX_BACKOFF_MS, MAX_RETRY_ATTEMPTS},
    error::{ProviderError, QueryError},
    metrics::{FetchMetrics, FetchStats},
    types::{CacheEvent, QueryData, QueryKey, QueryKind},
};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};

/// Capacity of the cache event channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Function producing one fetch of a query
pub type Fetcher =
    Arc<dyn Fn() -> BoxFuture<'static, Result<QueryData, ProviderError>> + Send + Sync>;

/// Retry behaviour of a single fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt, doubled afterwards
    pub initial_backoff: Duration,
    /// Upper bound for the delay between attempts
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRY_ATTEMPTS,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
            max_backoff: Duration::from_millis(MAX_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

/// Fetch policy of a query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    /// Refetch on this interval while at least one observer is registered
    pub refetch_interval: Option<Duration>,
    /// Age after which a new observer triggers a refetch (`None` = never stale)
    pub stale_time: Option<Duration>,
    /// Retry policy of every fetch
    pub retry: RetryPolicy,
}

impl QueryOptions {
    /// Coin metadata: fetched once, never considered stale
    pub fn metadata() -> Self {
        Self {
            refetch_interval: None,
            stale_time: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Price ticker: polled on `interval`, stale once a tick has been missed
    pub fn price(interval: Duration) -> Self {
        Self {
            refetch_interval: Some(interval),
            stale_time: Some(interval),
            retry: RetryPolicy::default(),
        }
    }

    /// OHLCV history: refreshed on mount when older than an hour
    pub fn history() -> Self {
        Self {
            refetch_interval: None,
            stale_time: Some(Duration::from_secs(3600)),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Lifecycle status of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// No result yet
    Pending,
    /// Data is available (possibly refetching in the background)
    Success,
    /// Every attempt failed and there is no data to fall back to
    Error,
}

/// Snapshot of a query entry, as seen by observers
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    pub status: QueryStatus,
    /// A fetch for this key is in flight
    pub is_fetching: bool,
    /// Last successful result
    pub data: Option<QueryData>,
    /// Error of the last fetch, cleared by the next success
    pub error: Option<QueryError>,
    /// When `data` was last replaced
    pub updated_at: Option<DateTime<Utc>>,
    /// Number of successful fetches
    pub fetch_count: u64,
    /// Number of failed fetches
    pub error_count: u64,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            status: QueryStatus::Pending,
            is_fetching: false,
            data: None,
            error: None,
            updated_at: None,
            fetch_count: 0,
            error_count: 0,
        }
    }
}

impl QueryState {
    pub fn is_pending(&self) -> bool {
        self.status == QueryStatus::Pending
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }
}

struct Entry {
    epoch: u64,
    tx: watch::Sender<QueryState>,
    fetcher: Fetcher,
    options: QueryOptions,
    observers: usize,
    in_flight: bool,
    fetched_at: Option<Instant>,
    refetch_task: Option<JoinHandle<()>>,
}

impl Entry {
    fn new(epoch: u64, fetcher: Fetcher, options: QueryOptions) -> Self {
        let (tx, _) = watch::channel(QueryState::default());
        Self {
            epoch,
            tx,
            fetcher,
            options,
            observers: 0,
            in_flight: false,
            fetched_at: None,
            refetch_task: None,
        }
    }

    fn is_stale(&self) -> bool {
        match (self.fetched_at, self.options.stale_time) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(at), Some(stale_time)) => at.elapsed() >= stale_time,
        }
    }

    fn stop_refetch(&mut self) {
        if let Some(task) = self.refetch_task.take() {
            task.abort();
        }
    }
}

impl Drop for Entry {
    fn drop(&mut self) {
        self.stop_refetch();
    }
}

struct Inner {
    entries: Mutex<HashMap<QueryKey, Entry>>,
    next_epoch: AtomicU64,
    metrics: FetchMetrics,
    events: broadcast::Sender<CacheEvent>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks the entry in flight and spawns the fetch task
    fn start_fetch(self: &Arc<Self>, key: &QueryKey, entry: &mut Entry) {
        entry.in_flight = true;
        entry.tx.send_modify(|state| state.is_fetching = true);

        let inner = Arc::clone(self);
        let key = key.clone();
        let fetcher = entry.fetcher.clone();
        let retry = entry.options.retry;
        let epoch = entry.epoch;

        tracing::debug!(key = %key, "Starting fetch");

        tokio::spawn(async move {
            let started = Instant::now();
            let result = run_with_retry(&key, &fetcher, retry).await;
            inner
                .metrics
                .record(key.kind, started.elapsed(), result.is_ok())
                .await;
            inner.finish_fetch(&key, epoch, result);
        });
    }

    fn finish_fetch(&self, key: &QueryKey, epoch: u64, result: Result<QueryData, ProviderError>) {
        let event = {
            let mut entries = self.lock();
            let Some(entry) = entries.get_mut(key).filter(|e| e.epoch == epoch) else {
                tracing::debug!(key = %key, "Discarding result for removed query");
                return;
            };
            entry.in_flight = false;

            match result {
                Ok(data) => {
                    entry.fetched_at = Some(Instant::now());
                    entry.tx.send_modify(|state| {
                        state.status = QueryStatus::Success;
                        state.is_fetching = false;
                        state.data = Some(data);
                        state.error = None;
                        state.updated_at = Some(Utc::now());
                        state.fetch_count += 1;
                    });
                    CacheEvent::succeeded(key.clone())
                }
                Err(err) => {
                    let error = QueryError::from(&err);
                    entry.tx.send_modify(|state| {
                        state.is_fetching = false;
                        state.error = Some(error.clone());
                        state.error_count += 1;
                        if state.data.is_none() {
                            state.status = QueryStatus::Error;
                        }
                    });
                    CacheEvent::failed(key.clone(), error.message)
                }
            }
        };

        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn release(&self, key: &QueryKey, epoch: u64) {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(key).filter(|e| e.epoch == epoch) else {
            return;
        };

        entry.observers = entry.observers.saturating_sub(1);
        if entry.observers == 0 && entry.refetch_task.is_some() {
            entry.stop_refetch();
            tracing::debug!(key = %key, "Stopped refetch timer, no observers left");
        }
    }
}

/// Runs a fetcher, retrying transient failures with exponential backoff
async fn run_with_retry(
    key: &QueryKey,
    fetcher: &Fetcher,
    retry: RetryPolicy,
) -> Result<QueryData, ProviderError> {
    let max_attempts = retry.max_attempts.max(1);
    let mut backoff = retry.initial_backoff;
    let mut attempt = 1;

    loop {
        match fetcher().await {
            Ok(data) => return Ok(data),
            Err(e) if attempt < max_attempts && e.is_retryable() => {
                tracing::warn!(
                    key = %key,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    error = %e,
                    "Fetch failed, retrying"
                );
                sleep(backoff).await;
                backoff = (backoff * 2).min(retry.max_backoff);
                attempt += 1;
            }
            Err(e) => {
                tracing::warn!(key = %key, attempt = attempt, error = %e, "Fetch failed");
                return Err(e);
            }
        }
    }
}

/// Spawns the periodic refetch loop of a polled entry
fn spawn_refetch(
    inner: &Arc<Inner>,
    key: QueryKey,
    epoch: u64,
    interval: Duration,
) -> JoinHandle<()> {
    let weak: Weak<Inner> = Arc::downgrade(inner);

    tracing::debug!(
        key = %key,
        interval_ms = interval.as_millis() as u64,
        "Starting refetch timer"
    );

    tokio::spawn(async move {
        loop {
            sleep(interval).await;

            let keep_going = {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let mut entries = inner.lock();
                match entries.get_mut(&key).filter(|e| e.epoch == epoch) {
                    Some(entry) => {
                        if entry.in_flight {
                            tracing::debug!(
                                key = %key,
                                "Previous fetch still in flight, skipping tick"
                            );
                        } else {
                            inner.start_fetch(&key, entry);
                        }
                        true
                    }
                    None => false,
                }
            };

            if !keep_going {
                break;
            }
        }
    })
}

/// Shared, cloneable query cache
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                next_epoch: AtomicU64::new(1),
                metrics: FetchMetrics::new(),
                events,
            }),
        }
    }

    /// Registers an observer for `key`, fetching when needed
    ///
    /// A fetch starts when the entry has no data (or its data is stale) and
    /// no fetch is already in flight for the key. If `options` carries a
    /// refetch interval the entry polls until its last handle is dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn get_or_fetch(
        &self,
        key: QueryKey,
        fetcher: Fetcher,
        options: QueryOptions,
    ) -> QueryHandle {
        let mut entries = self.inner.lock();
        let entry = entries.entry(key.clone()).or_insert_with(|| {
            let epoch = self.inner.next_epoch.fetch_add(1, Ordering::Relaxed);
            Entry::new(epoch, fetcher.clone(), options.clone())
        });

        entry.fetcher = fetcher;
        entry.options = options;
        entry.observers += 1;

        if !entry.in_flight && entry.is_stale() {
            self.inner.start_fetch(&key, entry);
        } else {
            tracing::trace!(key = %key, in_flight = entry.in_flight, "Reusing cached query");
        }
        let rx = entry.tx.subscribe();

        if let Some(interval) = entry.options.refetch_interval {
            if entry.refetch_task.is_none() {
                entry.refetch_task = Some(spawn_refetch(
                    &self.inner,
                    key.clone(),
                    entry.epoch,
                    interval,
                ));
            }
        }

        let epoch = entry.epoch;
        drop(entries);

        QueryHandle {
            key,
            epoch,
            rx,
            inner: Arc::clone(&self.inner),
        }
    }

    /// Marks a query stale and refetches it if anyone is observing it
    pub fn invalidate(&self, key: &QueryKey) {
        let mut entries = self.inner.lock();
        if let Some(entry) = entries.get_mut(key) {
            entry.fetched_at = None;
            if entry.observers > 0 && !entry.in_flight {
                self.inner.start_fetch(key, entry);
            }
        }
    }

    /// Drops a query entry; results of fetches still in flight are discarded
    pub fn remove(&self, key: &QueryKey) -> bool {
        self.inner.lock().remove(key).is_some()
    }

    /// Drops every entry
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Current state of a query, if cached
    pub fn state(&self, key: &QueryKey) -> Option<QueryState> {
        self.inner.lock().get(key).map(|e| e.tx.borrow().clone())
    }

    /// Number of live handles for a query
    pub fn observer_count(&self, key: &QueryKey) -> usize {
        self.inner.lock().get(key).map_or(0, |e| e.observers)
    }

    /// Whether a refetch timer is running for a query
    pub fn is_polling(&self, key: &QueryKey) -> bool {
        self.inner
            .lock()
            .get(key)
            .is_some_and(|e| e.refetch_task.is_some())
    }

    /// Subscribes to fetch outcome events
    pub fn subscribe_events(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    /// Fetch statistics for a query kind
    pub async fn metrics(&self, kind: QueryKind) -> FetchStats {
        self.inner.metrics.stats(kind).await
    }
}

/// Observer of one cached query
///
/// Dropping the handle unregisters the observer.
pub struct QueryHandle {
    key: QueryKey,
    epoch: u64,
    rx: watch::Receiver<QueryState>,
    inner: Arc<Inner>,
}

impl QueryHandle {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Current state snapshot
    pub fn state(&self) -> QueryState {
        self.rx.borrow().clone()
    }

    /// Last successful data, if any
    pub fn data(&self) -> Option<QueryData> {
        self.rx.borrow().data.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.rx.borrow().is_pending()
    }

    pub fn is_error(&self) -> bool {
        self.rx.borrow().is_error()
    }

    /// Waits for the next state change
    ///
    /// Returns `false` once the entry has been removed from the cache.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

impl Drop for QueryHandle {
    fn drop(&mut self) {
        self.inner.release(&self.key, self.epoch);
    }
}

impl std::fmt::Debug for QueryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryHandle")
            .field("key", &self.key)
            .field("status", &self.rx.borrow().status)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::{metadata, MockProvider};
    use crate::provider::CoinDataProvider;
    use crate::types::CoinId;
    use futures::FutureExt;

    fn price_fetcher(provider: &Arc<MockProvider>, id: &CoinId) -> Fetcher {
        let provider = Arc::clone(provider);
        let id = id.clone();
        Arc::new(move || {
            let provider = Arc::clone(&provider);
            let id = id.clone();
            async move {
                provider
                    .fetch_coin_tickers(&id)
                    .await
                    .map(|t| QueryData::Price(Arc::new(t)))
            }
            .boxed()
        })
    }

    fn info_fetcher(provider: &Arc<MockProvider>, id: &CoinId) -> Fetcher {
        let provider = Arc::clone(provider);
        let id = id.clone();
        Arc::new(move || {
            let provider = Arc::clone(&provider);
            let id = id.clone();
            async move {
                provider
                    .fetch_coin_info(&id)
                    .await
                    .map(|m| QueryData::Metadata(Arc::new(m)))
            }
            .boxed()
        })
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deduplicates_in_flight_fetches() {
        let provider = Arc::new(MockProvider::new());
        provider.set_coin("btc-bitcoin", "Bitcoin", "BTC", 42000.0);
        provider.set_delay(Duration::from_millis(500));
        let cache = QueryCache::new();
        let id = CoinId::new("btc-bitcoin").unwrap();
        let key = QueryKey::metadata(&id);

        let mut first = cache.get_or_fetch(
            key.clone(),
            info_fetcher(&provider, &id),
            QueryOptions::metadata(),
        );
        let second = cache.get_or_fetch(
            key.clone(),
            info_fetcher(&provider, &id),
            QueryOptions::metadata(),
        );
        settle().await;

        assert_eq!(provider.call_count(QueryKind::Metadata, "btc-bitcoin"), 1);
        assert!(first.is_pending());
        assert!(first.state().is_fetching);
        assert_eq!(cache.observer_count(&key), 2);

        while first.is_pending() {
            assert!(first.changed().await);
        }
        let state = second.state();
        assert!(state.is_success());
        assert_eq!(
            state.data.unwrap().as_metadata().unwrap(),
            &metadata("btc-bitcoin", "Bitcoin", "BTC")
        );
        assert_eq!(provider.call_count(QueryKind::Metadata, "btc-bitcoin"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_metadata_is_not_refetched_on_remount() {
        let provider = Arc::new(MockProvider::new());
        provider.set_coin("btc-bitcoin", "Bitcoin", "BTC", 42000.0);
        let cache = QueryCache::new();
        let id = CoinId::new("btc-bitcoin").unwrap();
        let key = QueryKey::metadata(&id);

        let handle = cache.get_or_fetch(
            key.clone(),
            info_fetcher(&provider, &id),
            QueryOptions::metadata(),
        );
        settle().await;
        drop(handle);

        let handle = cache.get_or_fetch(
            key.clone(),
            info_fetcher(&provider, &id),
            QueryOptions::metadata(),
        );
        settle().await;
        assert!(handle.state().is_success());
        assert_eq!(provider.call_count(QueryKind::Metadata, "btc-bitcoin"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_while_observed_and_stops_after_last_drop() {
        let provider = Arc::new(MockProvider::new());
        provider.set_coin("btc-bitcoin", "Bitcoin", "BTC", 42000.0);
        let cache = QueryCache::new();
        let id = CoinId::new("btc-bitcoin").unwrap();
        let key = QueryKey::price(&id);
        let options = QueryOptions::price(Duration::from_millis(10_000));

        let first = cache.get_or_fetch(key.clone(), price_fetcher(&provider, &id), options.clone());
        let second = cache.get_or_fetch(key.clone(), price_fetcher(&provider, &id), options);
        settle().await;
        assert_eq!(provider.call_count(QueryKind::Price, "btc-bitcoin"), 1);
        assert!(cache.is_polling(&key));

        sleep(Duration::from_millis(10_050)).await;
        settle().await;
        assert_eq!(provider.call_count(QueryKind::Price, "btc-bitcoin"), 2);

        drop(first);
        assert!(cache.is_polling(&key));
        sleep(Duration::from_millis(10_000)).await;
        settle().await;
        assert_eq!(provider.call_count(QueryKind::Price, "btc-bitcoin"), 3);
        assert_eq!(second.state().fetch_count, 3);

        drop(second);
        assert!(!cache.is_polling(&key));
        sleep(Duration::from_millis(60_000)).await;
        settle().await;
        assert_eq!(provider.call_count(QueryKind::Price, "btc-bitcoin"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_after_retries_becomes_error() {
        let provider = Arc::new(MockProvider::new());
        provider.set_info_error("btc-bitcoin", "HTTP 500");
        let cache = QueryCache::new();
        let id = CoinId::new("btc-bitcoin").unwrap();
        let key = QueryKey::metadata(&id);

        let mut handle = cache.get_or_fetch(
            key.clone(),
            info_fetcher(&provider, &id),
            QueryOptions::metadata(),
        );
        while handle.is_pending() {
            assert!(handle.changed().await);
        }

        let state = handle.state();
        assert!(state.is_error());
        assert_eq!(state.error.unwrap().message, "Provider API error: HTTP 500");
        assert_eq!(
            provider.call_count(QueryKind::Metadata, "btc-bitcoin"),
            MAX_RETRY_ATTEMPTS as usize
        );

        let stats = cache.metrics(QueryKind::Metadata).await;
        assert_eq!(stats.failed_fetches, 1);

        provider.set_coin("btc-bitcoin", "Bitcoin", "BTC", 42000.0);
        cache.invalidate(&key);
        while !handle.state().is_success() {
            assert!(handle.changed().await);
        }
        assert!(handle.state().error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_not_retried() {
        let provider = Arc::new(MockProvider::new());
        let cache = QueryCache::new();
        let id = CoinId::new("nope-nope").unwrap();

        let mut handle = cache.get_or_fetch(
            QueryKey::metadata(&id),
            info_fetcher(&provider, &id),
            QueryOptions::metadata(),
        );
        while handle.is_pending() {
            assert!(handle.changed().await);
        }
        assert!(handle.is_error());
        assert_eq!(provider.call_count(QueryKind::Metadata, "nope-nope"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetch_failure_keeps_last_data() {
        let provider = Arc::new(MockProvider::new());
        provider.set_coin("btc-bitcoin", "Bitcoin", "BTC", 42000.0);
        let cache = QueryCache::new();
        let id = CoinId::new("btc-bitcoin").unwrap();
        let options =
            QueryOptions::price(Duration::from_millis(10_000)).with_retry(RetryPolicy::none());

        let handle =
            cache.get_or_fetch(QueryKey::price(&id), price_fetcher(&provider, &id), options);
        settle().await;
        assert!(handle.state().is_success());

        provider.set_ticker_error("btc-bitcoin", "HTTP 502");
        sleep(Duration::from_millis(10_050)).await;
        settle().await;

        let state = handle.state();
        assert!(state.is_success());
        assert_eq!(state.error_count, 1);
        assert!(state.error.is_some());
        assert_eq!(state.data.unwrap().as_price().unwrap().price_usd(), 42000.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_discards_in_flight_result() {
        let provider = Arc::new(MockProvider::new());
        provider.set_coin("btc-bitcoin", "Bitcoin", "BTC", 42000.0);
        provider.set_delay(Duration::from_millis(500));
        let cache = QueryCache::new();
        let id = CoinId::new("btc-bitcoin").unwrap();
        let key = QueryKey::metadata(&id);
        let mut events = cache.subscribe_events();

        let mut handle = cache.get_or_fetch(
            key.clone(),
            info_fetcher(&provider, &id),
            QueryOptions::metadata(),
        );
        settle().await;
        assert!(cache.remove(&key));
        assert!(!handle.changed().await);

        sleep(Duration::from_millis(1000)).await;
        settle().await;
        assert!(cache.state(&key).is_none());
        assert!(events.try_recv().is_err());
    }
}
