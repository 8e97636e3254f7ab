//! campricer-core - upload-and-recognition result pipeline
//!
//! Wires the leaf services together: image preparation, the recognition
//! client, defensive response parsing, and the two result sinks (session
//! list and durable history). The binary in `main.rs` is a thin CLI over
//! this library; all pipeline behavior lives here so it can be exercised by
//! integration tests.

pub mod services;

use campricer_common::currency::RateTable;
use campricer_common::events::{EventBus, PricerEvent};
use campricer_common::storage::KvStore;
use campricer_common::{Error, Result};
use chrono::Utc;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::sync::Mutex;

use services::rate_fetcher::RateFetcher;
use services::recent_results::RecentResultsStore;
use services::recognition_client::RecognitionClient;
use services::result_store::ResultStore;

/// Event bus capacity; plenty for a single-user session
const EVENT_BUS_CAPACITY: usize = 100;

/// Application state shared across the pipeline
///
/// Each store sits behind its own async mutex: mutations are driven by one
/// user action at a time, but the lock guarantees a read-modify-persist
/// sequence is never interleaved even if the host races two actions.
pub struct AppState {
    /// Recognition service client
    pub client: RecognitionClient,
    /// Current session's display list
    pub results: Mutex<ResultStore>,
    /// Durable recent-results history
    pub recents: Mutex<RecentResultsStore>,
    /// Preference storage (camera mode toggle)
    pub settings: KvStore,
    /// Event bus for notification surfaces
    pub event_bus: EventBus,
    /// Caller-visible busy flag for the upload/search call chain
    pub loading: AtomicBool,
    /// Completed upload runs this session (review prompt trigger)
    pub upload_runs: AtomicU32,
}

impl AppState {
    /// Initialize state: open storage, load history, build the client
    pub async fn init(base_url: &str, source: &str, data_dir: &Path) -> Result<Self> {
        let client = RecognitionClient::new(base_url, source)
            .map_err(|e| Error::Internal(e.to_string()))?;
        let settings = KvStore::open(data_dir).await?;
        let event_bus = EventBus::new(EVENT_BUS_CAPACITY);
        let recents = RecentResultsStore::load(settings.clone(), event_bus.clone()).await;

        Ok(Self {
            client,
            results: Mutex::new(ResultStore::new()),
            recents: Mutex::new(recents),
            settings,
            event_bus,
            loading: AtomicBool::new(false),
            upload_runs: AtomicU32::new(0),
        })
    }

    /// Whether an upload or search is currently in flight
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Remove one record from the session list
    ///
    /// Cascade behavior (empty-group deletion, asset release) lives in the
    /// store; this wrapper only adds the lock scope.
    pub async fn remove_result(
        &self,
        group_index: usize,
        record_index: usize,
    ) -> Option<campricer_common::types::CameraRecord> {
        let mut results = self.results.lock().await;
        results.remove_record(group_index, record_index).await
    }

    /// Clear the session list, releasing backing assets, and announce it
    pub async fn clear_results(&self) {
        {
            let mut results = self.results.lock().await;
            results.clear().await;
        }
        self.event_bus
            .emit(PricerEvent::ResultsCleared {
                timestamp: Utc::now(),
            })
            .ok();
    }

    /// Refresh exchange rates, falling back to the static table
    pub async fn refresh_rates(&self) -> RateTable {
        let fetcher = match RateFetcher::new() {
            Ok(fetcher) => fetcher,
            Err(e) => {
                tracing::warn!(error = %e, "rate fetcher unavailable, using fallback table");
                return campricer_common::currency::fallback_rates();
            }
        };
        let (rates, live) = fetcher.fetch().await;
        self.event_bus
            .emit(PricerEvent::RatesRefreshed {
                live,
                timestamp: Utc::now(),
            })
            .ok();
        rates
    }
}

/// RAII guard for the busy flag
///
/// Set on acquire, cleared on drop, so the flag ends false on every exit
/// path out of an upload or search, including early error returns.
pub struct LoadingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> LoadingGuard<'a> {
    pub fn hold(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self { flag }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
