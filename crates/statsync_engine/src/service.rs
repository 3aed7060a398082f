//! Remote stats service abstraction.

use crate::error::{StatsError, StatsResult};
use parking_lot::Mutex;
use statsync_core::DocumentPayload;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

/// The remote stats service collaborator.
///
/// This trait abstracts the transport-level client that performs the
/// actual network request/response cycle. Both calls are idempotent from
/// the engine's perspective: it is always safe to re-fetch and push again.
pub trait StatsService: Send + Sync + 'static {
    /// Fetches the user's remote stat document.
    fn fetch_document(
        &self,
        user_id: &str,
    ) -> impl Future<Output = StatsResult<DocumentPayload>> + Send;

    /// Replaces the user's remote stat document with the given payload.
    fn update_document(
        &self,
        user_id: &str,
        document: DocumentPayload,
    ) -> impl Future<Output = StatsResult<()>> + Send;
}

#[derive(Default)]
struct MockServiceInner {
    offline: bool,
    fetch_results: VecDeque<StatsResult<DocumentPayload>>,
    update_results: VecDeque<StatsResult<()>>,
    fetches: Vec<String>,
    updates: Vec<(String, DocumentPayload)>,
}

/// A mock stats service for testing.
///
/// Responses are queued with [`MockStatsService::push_fetch_result`] and
/// [`MockStatsService::push_update_result`]; with nothing queued, fetches
/// return an empty document and updates succeed. Clones share state, so a
/// test can keep a handle for inspection after handing the service to a
/// manager.
#[derive(Clone, Default)]
pub struct MockStatsService {
    inner: Arc<Mutex<MockServiceInner>>,
}

impl MockStatsService {
    /// Creates a new mock service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a result for the next fetch.
    pub fn push_fetch_result(&self, result: StatsResult<DocumentPayload>) {
        self.inner.lock().fetch_results.push_back(result);
    }

    /// Queues a result for the next update.
    pub fn push_update_result(&self, result: StatsResult<()>) {
        self.inner.lock().update_results.push_back(result);
    }

    /// While set, every call fails with a connectivity-class error,
    /// regardless of queued results.
    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().offline = offline;
    }

    /// User ids of all fetches seen so far.
    pub fn fetches(&self) -> Vec<String> {
        self.inner.lock().fetches.clone()
    }

    /// All update calls seen so far.
    pub fn updates(&self) -> Vec<(String, DocumentPayload)> {
        self.inner.lock().updates.clone()
    }

    /// Number of update calls seen so far.
    pub fn update_count(&self) -> usize {
        self.inner.lock().updates.len()
    }
}

impl StatsService for MockStatsService {
    async fn fetch_document(&self, user_id: &str) -> StatsResult<DocumentPayload> {
        let mut inner = self.inner.lock();
        inner.fetches.push(user_id.to_string());
        if inner.offline {
            return Err(StatsError::service_connectivity("mock service offline"));
        }
        inner
            .fetch_results
            .pop_front()
            .unwrap_or_else(|| Ok(DocumentPayload::new()))
    }

    async fn update_document(&self, user_id: &str, document: DocumentPayload) -> StatsResult<()> {
        let mut inner = self.inner.lock();
        inner.updates.push((user_id.to_string(), document));
        if inner.offline {
            return Err(StatsError::service_connectivity("mock service offline"));
        }
        inner.update_results.pop_front().unwrap_or(Ok(()))
    }
}
